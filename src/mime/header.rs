//-
// Copyright (c) 2020, Jason Lingle
//
// This file is part of Crymime.
//
// Crymime is free software: you can  redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Crymime is distributed  in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Crymime. If not, see <http://www.gnu.org/licenses/>.

use std::borrow::Cow;
use std::str;

use encoding_rs::Encoding;

use super::encoding::trim_ascii;
use crate::support::diagnostic::{DiagnosticKind, DiagnosticSink};

/// Headers which RFC 5322 and RFC 2045 allow at most once per header block.
static SINGLETON_HEADERS: &[&str] = &[
    "bcc",
    "cc",
    "date",
    "from",
    "in-reply-to",
    "message-id",
    "references",
    "reply-to",
    "sender",
    "subject",
    "to",
    "content-type",
    "content-transfer-encoding",
    "content-disposition",
    "content-id",
    "content-description",
];

/// A single header field exactly as it appeared in the input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderRecord {
    /// Everything before the colon, including any blanks before it.
    pub raw_name: Vec<u8>,
    /// The name, trimmed and in lower case.
    pub normalized_name: String,
    /// Everything after the colon, including folds and the final line
    /// ending.
    pub raw_value: Vec<u8>,
    /// Stream offset of the first byte of the name, if known.
    pub offset: Option<u64>,
}

impl HeaderRecord {
    pub fn from_raw(
        raw_name: &[u8],
        raw_value: &[u8],
        offset: Option<u64>,
    ) -> Self {
        HeaderRecord {
            raw_name: raw_name.to_vec(),
            normalized_name: String::from_utf8_lossy(trim_ascii(raw_name))
                .to_ascii_lowercase(),
            raw_value: raw_value.to_vec(),
            offset,
        }
    }

    /// Build a record for a tree assembled in code. `value` must already be
    /// suitably encoded for use in a header.
    pub fn new(name: &str, value: &[u8]) -> Self {
        let mut raw_value = Vec::with_capacity(value.len() + 2);
        raw_value.push(b' ');
        raw_value.extend_from_slice(value);
        raw_value.push(b'\n');
        HeaderRecord::from_raw(name.as_bytes(), &raw_value, None)
    }

    pub fn is(&self, name: &str) -> bool {
        self.normalized_name.eq_ignore_ascii_case(name)
    }

    /// Whether this belongs to the MIME entity rather than to the message.
    pub fn is_content_header(&self) -> bool {
        self.normalized_name.starts_with("content-")
    }

    /// The value with line breaks removed and surrounding whitespace
    /// trimmed. Encoded words are left alone.
    pub fn unfolded_value(&self) -> Vec<u8> {
        let unfolded: Vec<u8> = self
            .raw_value
            .iter()
            .copied()
            .filter(|&b| b'\r' != b && b'\n' != b)
            .collect();
        trim_ascii(&unfolded).to_vec()
    }

    /// Decode the unfolded value to text. UTF-8 is accepted as is; other
    /// bytes are interpreted with the first of `charsets` which can decode
    /// them without error, and failing that, lossily.
    pub fn decode_value(&self, charsets: &[String]) -> String {
        let unfolded = self.unfolded_value();
        if let Ok(s) = str::from_utf8(&unfolded) {
            return s.to_owned();
        }

        charsets
            .iter()
            .filter_map(|label| Encoding::for_label(label.as_bytes()))
            .filter_map(|encoding| {
                encoding
                    .decode_without_bom_handling_and_without_replacement(
                        &unfolded,
                    )
                    .map(Cow::into_owned)
            })
            .next()
            .unwrap_or_else(|| String::from_utf8_lossy(&unfolded).into_owned())
    }
}

/// The header block of one entity, in source order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderList {
    records: Vec<HeaderRecord>,
}

impl HeaderList {
    pub fn new() -> Self {
        HeaderList::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderRecord> + '_ {
        self.records.iter()
    }

    /// The first header with the given name.
    pub fn get(&self, name: &str) -> Option<&HeaderRecord> {
        self.records.iter().find(|h| h.is(name))
    }

    pub fn get_all<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a HeaderRecord> + 'a {
        self.records.iter().filter(move |h| h.is(name))
    }

    pub fn push(&mut self, record: HeaderRecord) {
        self.records.push(record);
    }

    /// Replace the value of the first header named `name`, or append one.
    pub fn set(&mut self, name: &str, value: &[u8]) {
        let record = HeaderRecord::new(name, value);
        match self.records.iter_mut().find(|h| h.is(name)) {
            Some(existing) => {
                existing.raw_value = record.raw_value;
                existing.offset = None;
            }
            None => self.records.push(record),
        }
    }

    /// Remove every header named `name`, returning how many there were.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.records.len();
        self.records.retain(|h| !h.is(name));
        before - self.records.len()
    }

    /// Append a freshly-scanned header, reporting anything suspicious about
    /// it to `sink`.
    pub(crate) fn push_checked(
        &mut self,
        record: HeaderRecord,
        sink: &DiagnosticSink,
    ) {
        if record.raw_value.iter().any(|&b| b >= 0x80)
            && str::from_utf8(&record.raw_value).is_err()
        {
            sink.emit(
                record.offset,
                DiagnosticKind::Unencoded8bitHeader,
                record.normalized_name.clone(),
            );
        }

        if SINGLETON_HEADERS.contains(&&*record.normalized_name) {
            if let Some(existing) = self.get(&record.normalized_name) {
                let kind = if existing.raw_value == record.raw_value {
                    DiagnosticKind::DuplicatedHeader
                } else {
                    DiagnosticKind::ConflictingHeader
                };
                sink.emit(record.offset, kind, record.normalized_name.clone());
            }
        }

        self.records.push(record);
    }

    /// Split into the message-level headers and the `Content-*` headers
    /// which describe the message body.
    pub fn split_content(self) -> (HeaderList, HeaderList) {
        let (content, message): (Vec<_>, Vec<_>) = self
            .records
            .into_iter()
            .partition(HeaderRecord::is_content_header);
        (HeaderList { records: message }, HeaderList { records: content })
    }
}

impl IntoIterator for HeaderList {
    type Item = HeaderRecord;
    type IntoIter = std::vec::IntoIter<HeaderRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a HeaderList {
    type Item = &'a HeaderRecord;
    type IntoIter = std::slice::Iter<'a, HeaderRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Returns the length of the field name of `line`, up to but excluding the
/// colon, or `None` if the line does not start with a valid field name.
///
/// Blanks may appear between the name and the colon, but not within the
/// name; control characters may not appear at all.
pub(crate) fn field_name_len(line: &[u8]) -> Option<usize> {
    let mut seen_blank = false;
    let mut seen_name = false;
    for (ix, &b) in line.iter().enumerate() {
        match b {
            b':' if seen_name => return Some(ix),
            b':' => return None,
            b' ' | b'\t' => seen_blank = true,
            0..=31 | 127 => return None,
            _ if seen_blank => return None,
            _ => seen_name = true,
        }
    }

    None
}
