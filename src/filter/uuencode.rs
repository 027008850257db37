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

//! Streaming uuencode.
//!
//! The encoder only produces the body lines and the terminating empty line;
//! the `begin` and `end` lines carry a file name and mode, which is the
//! writer's business.

/// Input bytes per line, giving the traditional 61-character lines.
const LINE_INPUT: usize = 45;

const BEGIN: &[u8] = b"begin ";

fn encode_char(sextet: u8) -> u8 {
    if 0 == sextet {
        b'`'
    } else {
        sextet + 32
    }
}

fn decode_char(c: u8) -> u8 {
    c.wrapping_sub(32) & 0x3F
}

#[derive(Clone, Debug, Default)]
pub struct UuEncoder {
    pending: Vec<u8>,
}

impl UuEncoder {
    pub fn new() -> Self {
        UuEncoder::default()
    }

    pub fn step(&mut self, mut input: &[u8], out: &mut Vec<u8>) {
        while !input.is_empty() {
            let take = (LINE_INPUT - self.pending.len()).min(input.len());
            self.pending.extend_from_slice(&input[..take]);
            input = &input[take..];

            if LINE_INPUT == self.pending.len() {
                encode_line(&self.pending, out);
                self.pending.clear();
            }
        }
    }

    pub fn finish(&mut self, out: &mut Vec<u8>) {
        if !self.pending.is_empty() {
            encode_line(&self.pending, out);
            self.pending.clear();
        }

        out.extend_from_slice(b"`\n");
    }

    pub fn reset(&mut self) {
        self.pending.clear();
    }
}

fn encode_line(bytes: &[u8], out: &mut Vec<u8>) {
    out.push(encode_char(bytes.len() as u8));
    for group in bytes.chunks(3) {
        let mut padded = [0u8; 3];
        padded[..group.len()].copy_from_slice(group);
        let [a, b, c] = padded;
        out.push(encode_char(a >> 2));
        out.push(encode_char((a << 4 | b >> 4) & 0x3F));
        out.push(encode_char((b << 2 | c >> 6) & 0x3F));
        out.push(encode_char(c & 0x3F));
    }
    out.push(b'\n');
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BodyState {
    LineStart,
    InLine { remaining: usize },
    SkipLine,
    End,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DecodeState {
    /// Looking for the `begin` line. `midline` is set while discarding the
    /// remainder of a line which isn't it.
    Begin { midline: bool },
    Body(BodyState),
}

/// Decodes uuencoded data, ignoring everything before the `begin` line and
/// everything after the zero-length line that ends the data.
#[derive(Clone, Debug)]
pub struct UuDecoder {
    state: DecodeState,
    group: [u8; 4],
    ngroup: usize,
}

impl Default for UuDecoder {
    fn default() -> Self {
        UuDecoder {
            state: DecodeState::Begin { midline: false },
            group: [0; 4],
            ngroup: 0,
        }
    }
}

impl UuDecoder {
    pub fn new() -> Self {
        UuDecoder::default()
    }

    /// Whether the end of the encoded data has been seen.
    pub fn is_done(&self) -> bool {
        DecodeState::Body(BodyState::End) == self.state
    }

    /// Decode `input`. A trailing partial line which could still turn out to
    /// be the `begin` line is pushed to `backup` if permitted, or dropped
    /// otherwise.
    pub fn step(
        &mut self,
        input: &[u8],
        out: &mut Vec<u8>,
        backup: Option<&mut Vec<u8>>,
    ) {
        let mut pos = 0;
        while let DecodeState::Begin { midline } = self.state {
            let rest = &input[pos..];
            let eol = memchr::memchr(b'\n', rest);

            if midline {
                match eol {
                    Some(eol) => {
                        pos += eol + 1;
                        self.state = DecodeState::Begin { midline: false };
                        continue;
                    }
                    None => return,
                }
            }

            match eol {
                Some(eol) => {
                    pos += eol + 1;
                    if rest.starts_with(BEGIN) {
                        self.state = DecodeState::Body(BodyState::LineStart);
                    }
                }

                None => {
                    let maybe_begin = rest.starts_with(BEGIN)
                        || BEGIN.starts_with(rest);
                    match backup {
                        Some(backup) if maybe_begin => {
                            backup.extend_from_slice(rest)
                        }
                        _ => {
                            self.state =
                                DecodeState::Begin { midline: !rest.is_empty() }
                        }
                    }
                    return;
                }
            }
        }

        self.body(&input[pos..], out);
    }

    pub fn finish(&mut self, out: &mut Vec<u8>) {
        if let DecodeState::Body(BodyState::InLine { remaining }) = self.state {
            self.flush_group(remaining, out);
        }
    }

    pub fn reset(&mut self) {
        *self = UuDecoder::default();
    }

    fn body(&mut self, input: &[u8], out: &mut Vec<u8>) {
        let mut state = match self.state {
            DecodeState::Body(state) => state,
            DecodeState::Begin { .. } => return,
        };

        for &c in input {
            if b'\r' == c {
                continue;
            }

            state = match state {
                BodyState::End => break,

                BodyState::LineStart if b'\n' == c => BodyState::LineStart,
                BodyState::LineStart => match usize::from(decode_char(c)) {
                    0 => BodyState::End,
                    len => BodyState::InLine { remaining: len },
                },

                BodyState::InLine { remaining } if b'\n' == c => {
                    // Lines sometimes lose their trailing spaces in transit
                    self.flush_group(remaining, out);
                    BodyState::LineStart
                }

                BodyState::InLine { remaining } => {
                    self.group[self.ngroup] = decode_char(c);
                    self.ngroup += 1;
                    if 4 == self.ngroup {
                        let n = self.flush_group(remaining, out);
                        if remaining == n {
                            BodyState::SkipLine
                        } else {
                            BodyState::InLine {
                                remaining: remaining - n,
                            }
                        }
                    } else {
                        state
                    }
                }

                BodyState::SkipLine if b'\n' == c => BodyState::LineStart,
                BodyState::SkipLine => BodyState::SkipLine,
            };
        }

        self.state = DecodeState::Body(state);
    }

    /// Output the bytes of the current group, up to `remaining`, padding a
    /// short group with zeroes. Returns the number of bytes output.
    fn flush_group(&mut self, remaining: usize, out: &mut Vec<u8>) -> usize {
        if 0 == self.ngroup {
            return 0;
        }

        for s in &mut self.group[self.ngroup..] {
            *s = 0;
        }
        let [a, b, c, d] = self.group;
        let bytes = [a << 2 | b >> 4, b << 4 | c >> 2, c << 6 | d];
        // A full group carries three bytes, a partial one a byte less than its
        // character count
        let n = if 4 == self.ngroup {
            remaining.min(3)
        } else {
            remaining.min(self.ngroup - 1)
        };
        out.extend_from_slice(&bytes[..n]);
        self.ngroup = 0;
        n
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    fn encode(data: &[u8]) -> Vec<u8> {
        let mut e = UuEncoder::new();
        let mut out = Vec::new();
        e.step(data, &mut out);
        e.finish(&mut out);
        out
    }

    fn decode(data: &[u8]) -> Vec<u8> {
        let mut d = UuDecoder::new();
        let mut out = Vec::new();
        d.step(data, &mut out, None);
        d.finish(&mut out);
        out
    }

    #[test]
    fn encode_known_value() {
        assert_eq!(b"#0V%T\n`\n".to_vec(), encode(b"Cat"));
        assert_eq!(b"`\n".to_vec(), encode(b""));
    }

    #[test]
    fn encode_line_length() {
        let encoded = encode(&[0xFFu8; 100]);
        let lines: Vec<&[u8]> =
            encoded.split(|&b| b'\n' == b).collect();
        assert_eq!(b'M', lines[0][0]);
        assert_eq!(61, lines[0].len());
        assert_eq!(61, lines[1].len());
        assert_eq!(b"`", lines[3]);
    }

    #[test]
    fn decode_requires_begin() {
        assert_eq!(Vec::<u8>::new(), decode(b"#0V%T\n`\nend\n"));
        assert_eq!(
            b"Cat".to_vec(),
            decode(b"junk\nbeginning\nbegin 644 cat.txt\n#0V%T\n`\nend\n")
        );
        assert_eq!(
            b"Cat".to_vec(),
            decode(b"begin 644 cat.txt\r\n#0V%T\r\n`\r\nend\r\n")
        );
    }

    #[test]
    fn decode_stops_at_end() {
        assert_eq!(
            b"Cat".to_vec(),
            decode(b"begin 644 x\n#0V%T\n`\n#0V%T\n")
        );
    }

    #[test]
    fn decode_tolerates_stripped_trailing_spaces() {
        // "C" encodes to "!0P``"; with spaces in place of backticks a
        // transport may strip the trailing ones
        assert_eq!(b"C".to_vec(), decode(b"begin 644 x\n!0P\n`\n"));
    }

    #[test]
    fn begin_line_backed_up() {
        let mut d = UuDecoder::new();
        let mut out = Vec::new();
        let mut backup = Vec::new();
        d.step(b"xyz\nbeg", &mut out, Some(&mut backup));
        assert_eq!(b"beg".to_vec(), backup);

        let mut input = backup.clone();
        input.extend_from_slice(b"in 644 x\n#0V%T\n");
        backup.clear();
        d.step(&input, &mut out, Some(&mut backup));
        assert!(backup.is_empty());
        assert_eq!(b"Cat".to_vec(), out);
    }

    proptest! {
        #[test]
        fn uu_round_trip(
            data in prop::collection::vec(prop::num::u8::ANY, 0..200)
        ) {
            let mut encoded = b"begin 644 data.bin\n".to_vec();
            encoded.extend_from_slice(&encode(&data));
            encoded.extend_from_slice(b"end\n");
            prop_assert_eq!(data, decode(&encoded));
        }
    }
}
