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

use bitflags::bitflags;
use encoding_rs::{DecoderResult, UTF_8};

use super::{FilterStep, Output};
use crate::mime::encoding::ContentEncoding;

bitflags! {
    /// Which statistics a `BestFilter` gathers.
    pub struct BestFlags: u32 {
        const CHARSET = 1 << 0;
        const ENCODING = 1 << 1;
    }
}

/// What the transport the content is headed for can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodingConstraint {
    SevenBit,
    EightBit,
    Binary,
}

/// RFC 5322 line length limit, excluding the line ending.
const MAX_LINE: usize = 998;

const FROM: &[u8] = b"From ";

/// Passes data through untouched while working out how it is best
/// transported.
pub struct BestFilter {
    flags: BestFlags,

    count0: u64,
    count8: u64,
    total: u64,
    maxline: usize,
    linelen: usize,
    hadfrom: bool,
    /// How much of `From ` the current line has matched, or `None` if the
    /// line can no longer be a `From ` line.
    from_progress: Option<usize>,

    utf8: encoding_rs::Decoder,
    utf8_valid: bool,
    scratch: Vec<u8>,
}

impl fmt::Debug for BestFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BestFilter")
            .field("flags", &self.flags)
            .field("count0", &self.count0)
            .field("count8", &self.count8)
            .field("total", &self.total)
            .field("maxline", &self.maxline)
            .field("hadfrom", &self.hadfrom)
            .field("utf8", &"<decoder>")
            .field("utf8_valid", &self.utf8_valid)
            .finish()
    }
}

impl BestFilter {
    pub fn new(flags: BestFlags) -> Self {
        BestFilter {
            flags,
            count0: 0,
            count8: 0,
            total: 0,
            maxline: 0,
            linelen: 0,
            hadfrom: false,
            from_progress: Some(0),
            utf8: UTF_8.new_decoder_without_bom_handling(),
            utf8_valid: true,
            scratch: vec![0u8; 1024],
        }
    }

    /// The number of NUL bytes seen.
    pub fn count0(&self) -> u64 {
        self.count0
    }

    /// The number of bytes with the high bit set.
    pub fn count8(&self) -> u64 {
        self.count8
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// The longest line seen, excluding its line ending.
    pub fn maxline(&self) -> usize {
        self.maxline.max(self.linelen)
    }

    /// Whether some line started with `From `.
    pub fn hadfrom(&self) -> bool {
        self.hadfrom
    }

    /// The narrowest charset describing everything seen so far: `us-ascii`,
    /// `utf-8`, or `None` if the data is neither.
    pub fn charset(&self) -> Option<&'static str> {
        if 0 == self.count8 {
            Some("us-ascii")
        } else if self.utf8_valid {
            Some("utf-8")
        } else {
            None
        }
    }

    /// Choose the lightest transfer encoding that can carry the data through
    /// a transport limited by `constraint`.
    pub fn best_encoding(
        &self,
        constraint: EncodingConstraint,
    ) -> ContentEncoding {
        if !self.flags.contains(BestFlags::ENCODING) {
            return ContentEncoding::Default;
        }

        let maxline = self.maxline();
        let mut encoding = match constraint {
            EncodingConstraint::SevenBit => {
                if self.count0 > 0 {
                    ContentEncoding::Base64
                } else if self.count8 > 0 {
                    if self.count8 >= self.total * 17 / 100 {
                        ContentEncoding::Base64
                    } else {
                        ContentEncoding::QuotedPrintable
                    }
                } else if maxline > MAX_LINE {
                    ContentEncoding::QuotedPrintable
                } else {
                    ContentEncoding::Default
                }
            }

            EncodingConstraint::EightBit => {
                if self.count0 > 0 {
                    ContentEncoding::Base64
                } else if maxline > MAX_LINE {
                    ContentEncoding::QuotedPrintable
                } else {
                    ContentEncoding::Default
                }
            }

            EncodingConstraint::Binary => {
                if self.count0 + self.count8 > 0 {
                    ContentEncoding::Binary
                } else {
                    ContentEncoding::Default
                }
            }
        };

        // A `From ` line would get mangled by any mbox along the way
        if ContentEncoding::Default == encoding && self.hadfrom {
            encoding = ContentEncoding::QuotedPrintable;
        }

        encoding
    }

    fn scan_charset(&mut self, mut input: &[u8], last: bool) {
        if !self.utf8_valid {
            return;
        }

        loop {
            let (result, read, _) = self.utf8.decode_to_utf8_without_replacement(
                input,
                &mut self.scratch,
                last,
            );
            input = &input[read..];

            match result {
                DecoderResult::InputEmpty => break,
                DecoderResult::OutputFull => continue,
                DecoderResult::Malformed(..) => {
                    self.utf8_valid = false;
                    break;
                }
            }
        }
    }

    fn scan_encoding(&mut self, input: &[u8]) {
        self.total += input.len() as u64;

        for &c in input {
            if b'\n' == c {
                self.maxline = self.maxline.max(self.linelen);
                self.linelen = 0;
                self.from_progress = Some(0);
                continue;
            }

            if 0 == c {
                self.count0 += 1;
            } else if c > 127 {
                self.count8 += 1;
            }
            self.linelen += 1;

            if let Some(progress) = self.from_progress {
                if FROM[progress] == c {
                    if FROM.len() == progress + 1 {
                        self.hadfrom = true;
                        self.from_progress = None;
                    } else {
                        self.from_progress = Some(progress + 1);
                    }
                } else {
                    self.from_progress = None;
                }
            }
        }
    }
}

impl FilterStep for BestFilter {
    fn step(
        &mut self,
        input: &[u8],
        _out: &mut Vec<u8>,
        _backup: &mut Vec<u8>,
    ) -> Output {
        if self.flags.contains(BestFlags::CHARSET) {
            self.scan_charset(input, false);
        }
        if self.flags.contains(BestFlags::ENCODING) {
            self.scan_encoding(input);
        }

        Output::Input(input.len())
    }

    fn complete(&mut self, input: &[u8], _out: &mut Vec<u8>) -> Output {
        if self.flags.contains(BestFlags::CHARSET) {
            self.scan_charset(input, true);
        }
        if self.flags.contains(BestFlags::ENCODING) {
            self.scan_encoding(input);
            self.maxline = self.maxline.max(self.linelen);
        }

        Output::Input(input.len())
    }

    fn reset(&mut self) {
        *self = BestFilter::new(self.flags);
    }
}

#[cfg(test)]
mod test {
    use super::super::{Filter, FilterKind};
    use super::*;

    fn best(data: &[u8]) -> BestFilter {
        let mut b = BestFilter::new(BestFlags::all());
        let mut out = Vec::new();
        let mut backup = Vec::new();
        assert_eq!(
            Output::Input(data.len()),
            b.step(data, &mut out, &mut backup)
        );
        assert_eq!(Output::Input(0), b.complete(&[], &mut out));
        assert!(out.is_empty());
        assert!(backup.is_empty());
        b
    }

    #[test]
    fn statistics() {
        let b = best(b"ab\x00c\n\xffxyz\nq");
        assert_eq!(1, b.count0());
        assert_eq!(1, b.count8());
        assert_eq!(11, b.total());
        assert_eq!(4, b.maxline());
        assert!(!b.hadfrom());
    }

    #[test]
    fn charsets() {
        assert_eq!(Some("us-ascii"), best(b"plain text\n").charset());
        assert_eq!(Some("utf-8"), best("caf\u{e9}\n".as_bytes()).charset());
        assert_eq!(None, best(b"caf\xe9\n").charset());
        // Truncated sequence at the very end
        assert_eq!(None, best(b"caf\xc3").charset());
    }

    #[test]
    fn seven_bit_choices() {
        use self::EncodingConstraint::SevenBit;

        assert_eq!(
            ContentEncoding::Default,
            best(b"hello\n").best_encoding(SevenBit)
        );
        assert_eq!(
            ContentEncoding::Base64,
            best(b"a\x00b").best_encoding(SevenBit)
        );
        assert_eq!(
            ContentEncoding::QuotedPrintable,
            best("mostly ascii with one \u{e9}\n".as_bytes())
                .best_encoding(SevenBit)
        );
        assert_eq!(
            ContentEncoding::Base64,
            best(b"\xff\xfe\xfd\xfcab").best_encoding(SevenBit)
        );
        assert_eq!(
            ContentEncoding::QuotedPrintable,
            best(&vec![b'x'; 1000]).best_encoding(SevenBit)
        );
        assert_eq!(
            ContentEncoding::QuotedPrintable,
            best(b"hi\nFrom me\n").best_encoding(SevenBit)
        );
    }

    #[test]
    fn eight_bit_and_binary_choices() {
        use self::EncodingConstraint::*;

        assert_eq!(
            ContentEncoding::Default,
            best(b"\xff\xfe").best_encoding(EightBit)
        );
        assert_eq!(
            ContentEncoding::Base64,
            best(b"\x00").best_encoding(EightBit)
        );
        assert_eq!(
            ContentEncoding::Binary,
            best(b"\x00").best_encoding(Binary)
        );
        assert_eq!(
            ContentEncoding::Default,
            best(b"abc").best_encoding(Binary)
        );
        assert_eq!(
            ContentEncoding::QuotedPrintable,
            best(b"From x").best_encoding(Binary)
        );
    }

    #[test]
    fn from_split_across_calls() {
        let mut f = Filter::new(BestFilter::new(BestFlags::ENCODING));
        f.filter(b"x\nFr");
        f.filter(b"om");
        f.complete(b" y");
        match f.kind() {
            FilterKind::Best(b) => assert!(b.hadfrom()),
            k => panic!("unexpected filter {:?}", k),
        }
    }
}
