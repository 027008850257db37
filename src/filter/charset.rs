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

use std::fmt;

use encoding_rs::{CoderResult, Encoding};
use log::debug;

use super::{FilterStep, Output};

/// Converts text in some named charset to UTF-8.
///
/// Invalid sequences become U+FFFD. If the charset is not known, data passes
/// through unchanged.
pub struct CharsetFilter {
    encoding: Option<&'static Encoding>,
    decoder: Option<encoding_rs::Decoder>,
}

impl fmt::Debug for CharsetFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CharsetFilter")
            .field("encoding", &self.encoding.map(Encoding::name))
            .field("decoder", &self.decoder.as_ref().map(|_| "<decoder>"))
            .finish()
    }
}

impl CharsetFilter {
    pub fn new(charset: &str) -> Self {
        let encoding = Encoding::for_label_no_replacement(charset.as_bytes());
        if encoding.is_none() {
            debug!("Unknown charset {:?}, passing data through", charset);
        }

        CharsetFilter {
            encoding,
            decoder: encoding.map(Encoding::new_decoder),
        }
    }

    /// The canonical name of the source charset, if it is known.
    pub fn charset(&self) -> Option<&'static str> {
        self.encoding.map(Encoding::name)
    }

    fn decode(
        &mut self,
        mut input: &[u8],
        out: &mut Vec<u8>,
        last: bool,
    ) -> Output {
        let decoder = match self.decoder {
            Some(ref mut decoder) => decoder,
            None => return Output::Input(input.len()),
        };

        loop {
            let start = out.len();
            let room = decoder
                .max_utf8_buffer_length(input.len())
                .unwrap_or(input.len() * 3 + 16)
                .max(16);
            out.resize(start + room, 0);

            let (result, read, written, _) =
                decoder.decode_to_utf8(input, &mut out[start..], last);
            out.truncate(start + written);
            input = &input[read..];

            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => continue,
            }
        }

        Output::Buffer
    }
}

impl FilterStep for CharsetFilter {
    fn step(
        &mut self,
        input: &[u8],
        out: &mut Vec<u8>,
        _backup: &mut Vec<u8>,
    ) -> Output {
        self.decode(input, out, false)
    }

    fn complete(&mut self, input: &[u8], out: &mut Vec<u8>) -> Output {
        let output = self.decode(input, out, true);
        self.reset();
        output
    }

    fn reset(&mut self) {
        self.decoder = self.encoding.map(Encoding::new_decoder);
    }
}

#[cfg(test)]
mod test {
    use super::super::test_support::*;
    use super::super::{Filter, FilterKind};
    use super::*;

    #[test]
    fn latin1_to_utf8() {
        let mut f = Filter::new(CharsetFilter::new("ISO-8859-1"));
        assert_eq!(
            "caf\u{e9} cr\u{e8}me".as_bytes().to_vec(),
            f.filter_all(b"caf\xe9 cr\xe8me")
        );
    }

    #[test]
    fn multibyte_split_across_calls() {
        assert_chunking_transparent(
            || Filter::new(CharsetFilter::new("shift_jis")),
            b"\x82\xa0\x82\xa2\x82\xa4 abc \x93\xfa\x96\x7b",
        );
        assert_chunking_transparent(
            || Filter::new(CharsetFilter::new("utf-8")),
            "h\u{e9}llo \u{1F600}".as_bytes(),
        );
    }

    #[test]
    fn truncated_sequence_at_end() {
        let mut f = Filter::new(CharsetFilter::new("utf-8"));
        assert_eq!("ab\u{fffd}".as_bytes().to_vec(), f.filter_all(b"ab\xc3"));
    }

    #[test]
    fn unknown_charset_passes_through() {
        let mut f = Filter::new(CharsetFilter::new("x-no-such-charset"));
        match f.kind() {
            FilterKind::Charset(c) => assert_eq!(None, c.charset()),
            k => panic!("unexpected filter {:?}", k),
        }
        assert_eq!(b"\xff\xfe".to_vec(), f.filter_all(b"\xff\xfe"));
    }
}
