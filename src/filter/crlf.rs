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

use super::{Direction, FilterStep, Output};

/// Converts between UNIX and DOS line endings, optionally with SMTP-style
/// dot-stuffing.
#[derive(Clone, Debug)]
pub struct CrlfFilter {
    direction: Direction,
    dots: bool,
    saw_cr: bool,
    /// Whether the next byte is at the start of a line.
    saw_lf: bool,
}

impl CrlfFilter {
    pub fn new(direction: Direction, dots: bool) -> Self {
        CrlfFilter {
            direction,
            dots,
            saw_cr: false,
            saw_lf: true,
        }
    }

    /// LF to CRLF; with `dots`, also double leading `.`.
    pub fn encoder(dots: bool) -> Self {
        CrlfFilter::new(Direction::Encode, dots)
    }

    /// CRLF to LF; with `dots`, also undouble leading `.`.
    pub fn decoder(dots: bool) -> Self {
        CrlfFilter::new(Direction::Decode, dots)
    }

    fn encode(&mut self, input: &[u8], out: &mut Vec<u8>) {
        out.reserve(input.len() + input.len() / 16);
        for &c in input {
            if b'\n' == c {
                if !self.saw_cr {
                    out.push(b'\r');
                }
                out.push(b'\n');
                self.saw_cr = false;
                self.saw_lf = true;
                continue;
            }

            if self.dots && self.saw_lf && b'.' == c {
                out.push(b'.');
            }

            out.push(c);
            self.saw_cr = b'\r' == c;
            self.saw_lf = false;
        }
    }

    fn decode(&mut self, input: &[u8], out: &mut Vec<u8>) {
        out.reserve(input.len());
        for &c in input {
            if self.saw_cr {
                self.saw_cr = false;
                if b'\n' == c {
                    out.push(b'\n');
                    self.saw_lf = true;
                    continue;
                }

                out.push(b'\r');
                self.saw_lf = false;
            }

            match c {
                b'\r' => self.saw_cr = true,
                b'\n' => {
                    out.push(b'\n');
                    self.saw_lf = true;
                }
                b'.' if self.dots && self.saw_lf => self.saw_lf = false,
                c => {
                    out.push(c);
                    self.saw_lf = false;
                }
            }
        }
    }
}

impl FilterStep for CrlfFilter {
    fn step(
        &mut self,
        input: &[u8],
        out: &mut Vec<u8>,
        _backup: &mut Vec<u8>,
    ) -> Output {
        match self.direction {
            Direction::Encode => self.encode(input, out),
            Direction::Decode => self.decode(input, out),
        }

        Output::Buffer
    }

    fn complete(&mut self, input: &[u8], out: &mut Vec<u8>) -> Output {
        let mut backup = Vec::new();
        self.step(input, out, &mut backup);
        if Direction::Decode == self.direction && self.saw_cr {
            out.push(b'\r');
            self.saw_cr = false;
        }

        Output::Buffer
    }

    fn reset(&mut self) {
        self.saw_cr = false;
        self.saw_lf = true;
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::super::test_support::*;
    use super::super::Filter;
    use super::*;

    fn encode(dots: bool, s: &[u8]) -> Vec<u8> {
        Filter::new(CrlfFilter::encoder(dots)).filter_all(s)
    }

    fn decode(dots: bool, s: &[u8]) -> Vec<u8> {
        Filter::new(CrlfFilter::decoder(dots)).filter_all(s)
    }

    #[test]
    fn encode_inserts_cr_before_bare_lf() {
        assert_eq!(b"a\r\nb\r\n".to_vec(), encode(false, b"a\nb\r\n"));
        assert_eq!(b"\r\n\r\n".to_vec(), encode(false, b"\n\n"));
        assert_eq!(b"a\rb".to_vec(), encode(false, b"a\rb"));
    }

    #[test]
    fn encode_dots() {
        assert_eq!(b"..a\r\n..\r\nb.c".to_vec(), encode(true, b".a\n.\nb.c"));
        assert_eq!(b".a\r\n".to_vec(), encode(false, b".a\n"));
    }

    #[test]
    fn decode_strips_cr_before_lf() {
        assert_eq!(b"a\nb\n".to_vec(), decode(false, b"a\r\nb\n"));
        assert_eq!(b"a\rb\r".to_vec(), decode(false, b"a\rb\r"));
        assert_eq!(b"\n".to_vec(), decode(false, b"\r\n"));
    }

    #[test]
    fn decode_dots() {
        assert_eq!(b".a\n.\nb.c".to_vec(), decode(true, b"..a\r\n..\r\nb.c"));
        assert_eq!(b"a\n".to_vec(), decode(true, b".a\r\n"));
    }

    #[test]
    fn cr_split_across_calls() {
        let mut f = Filter::new(CrlfFilter::decoder(false));
        assert_eq!(b"abc", f.filter(b"abc\r"));
        assert_eq!(b"\ndef", f.filter(b"\ndef"));
        assert_eq!(b"", f.filter(b"\r"));
        assert_eq!(b"\r", f.complete(b""));
    }

    #[test]
    fn chunking_examples() {
        for &dots in &[false, true] {
            assert_chunking_transparent(
                || Filter::new(CrlfFilter::encoder(dots)),
                b".x\n\r\n..y\rz\n.",
            );
            assert_chunking_transparent(
                || Filter::new(CrlfFilter::decoder(dots)),
                b".x\r\n\r\r\n..y\rz\n.\r",
            );
        }
    }

    proptest! {
        #[test]
        fn encode_chunking_transparent(
            s in "[a.\r\n]{0,40}",
            splits in prop::collection::vec(0usize..40, 0..5),
            dots in any::<bool>(),
        ) {
            let whole = encode(dots, s.as_bytes());
            let mut f = Filter::new(CrlfFilter::encoder(dots));
            prop_assert_eq!(whole, run_split(&mut f, s.as_bytes(), &splits));
        }

        #[test]
        fn decode_chunking_transparent(
            s in "[a.\r\n]{0,40}",
            splits in prop::collection::vec(0usize..40, 0..5),
            dots in any::<bool>(),
        ) {
            let whole = decode(dots, s.as_bytes());
            let mut f = Filter::new(CrlfFilter::decoder(dots));
            prop_assert_eq!(whole, run_split(&mut f, s.as_bytes(), &splits));
        }

        #[test]
        fn decode_inverts_encode_for_lf_text(
            s in "[a.\n]{0,40}",
            dots in any::<bool>(),
        ) {
            prop_assert_eq!(
                s.as_bytes().to_vec(),
                decode(dots, &encode(dots, s.as_bytes()))
            );
        }
    }
}
