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

//! Streaming quoted-printable, as described by RFC 2045.

use super::push_hex;

/// Longest line, excluding the line ending, the encoder emits.
const MAX_LINE: usize = 76;

fn is_safe(c: u8) -> bool {
    c >= b'!' && c <= b'~' && c != b'='
}

fn is_blank(c: u8) -> bool {
    b' ' == c || b'\t' == c
}

/// Encodes quoted-printable.
///
/// Line structure is preserved: a LF or CRLF in the input is written through
/// as a hard line break. A CR not followed by LF is escaped, as are trailing
/// blanks and everything that isn't printable ASCII. Lines are soft-wrapped
/// so no line exceeds 76 characters.
#[derive(Clone, Debug, Default)]
pub struct QpEncoder {
    column: usize,
    /// A blank or CR whose encoding depends on the byte after it.
    pending: Option<u8>,
}

impl QpEncoder {
    pub fn new() -> Self {
        QpEncoder::default()
    }

    pub fn step(&mut self, input: &[u8], out: &mut Vec<u8>) {
        out.reserve(input.len() + input.len() / 8);
        for &c in input {
            if b'\n' == c {
                match self.pending.take() {
                    Some(b'\r') => out.push(b'\r'),
                    Some(blank) => self.escaped(blank, out),
                    None => (),
                }
                out.push(b'\n');
                self.column = 0;
                continue;
            }

            match self.pending.take() {
                Some(b'\r') => self.escaped(b'\r', out),
                Some(blank) => self.literal(blank, out),
                None => (),
            }

            if b'\r' == c || is_blank(c) {
                self.pending = Some(c);
            } else if is_safe(c) {
                self.literal(c, out);
            } else {
                self.escaped(c, out);
            }
        }
    }

    pub fn finish(&mut self, out: &mut Vec<u8>) {
        if let Some(c) = self.pending.take() {
            self.escaped(c, out);
        }

        // End on a soft break so a line ending added after the encoded text
        // isn't mistaken for data.
        if self.column > 0 {
            out.extend_from_slice(b"=\n");
        }

        self.column = 0;
    }

    pub fn reset(&mut self) {
        *self = QpEncoder::default();
    }

    fn literal(&mut self, c: u8, out: &mut Vec<u8>) {
        self.make_room(1, out);
        out.push(c);
        self.column += 1;
    }

    fn escaped(&mut self, c: u8, out: &mut Vec<u8>) {
        self.make_room(3, out);
        out.push(b'=');
        push_hex(out, c);
        self.column += 3;
    }

    fn make_room(&mut self, width: usize, out: &mut Vec<u8>) {
        // Leave room for the `=` of a soft break
        if self.column + width > MAX_LINE - 1 {
            out.extend_from_slice(b"=\n");
            self.column = 0;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DecodeState {
    Normal,
    /// After `=`.
    Escape,
    /// After `=` CR.
    EscapeCr,
    /// After `=` and one hex digit.
    EscapeHex(u8),
}

impl Default for DecodeState {
    fn default() -> Self {
        DecodeState::Normal
    }
}

/// Decodes quoted-printable.
///
/// Encoded bytes and soft line endings are both handled, the latter by
/// discarding. UNIX line endings are handled as well as DOS line endings.
///
/// This never fails. Invalid sequences are passed through untransformed.
/// Certain restrictions, such as not having trailing whitespace on a line, are
/// not enforced, and are passed through. 8-bit characters are passed through,
/// including invalid UTF-8.
#[derive(Clone, Debug, Default)]
pub struct QpDecoder {
    state: DecodeState,
}

impl QpDecoder {
    pub fn new() -> Self {
        QpDecoder::default()
    }

    pub fn step(&mut self, input: &[u8], out: &mut Vec<u8>) {
        out.reserve(input.len());
        let mut ix = 0;
        while ix < input.len() {
            let c = input[ix];
            match self.state {
                DecodeState::Normal => {
                    // Fast path over runs of plain text
                    let run = memchr::memchr(b'=', &input[ix..])
                        .unwrap_or(input.len() - ix);
                    out.extend_from_slice(&input[ix..ix + run]);
                    ix += run;
                    if ix < input.len() {
                        self.state = DecodeState::Escape;
                        ix += 1;
                    }
                    continue;
                }

                DecodeState::Escape => match c {
                    // Soft line break with UNIX ending, discard
                    b'\n' => self.state = DecodeState::Normal,
                    b'\r' => self.state = DecodeState::EscapeCr,
                    c if c.is_ascii_hexdigit() => {
                        self.state = DecodeState::EscapeHex(c)
                    }
                    _ => {
                        // Invalid; emit the `=` and reconsider this byte
                        out.push(b'=');
                        self.state = DecodeState::Normal;
                        continue;
                    }
                },

                DecodeState::EscapeCr => {
                    self.state = DecodeState::Normal;
                    if b'\n' != c {
                        out.extend_from_slice(b"=\r");
                        continue;
                    }
                    // Soft line break with DOS ending, discard
                }

                DecodeState::EscapeHex(hi) => {
                    self.state = DecodeState::Normal;
                    if c.is_ascii_hexdigit() {
                        out.push(hex_value(hi) << 4 | hex_value(c));
                    } else {
                        out.push(b'=');
                        out.push(hi);
                        continue;
                    }
                }
            }

            ix += 1;
        }
    }

    /// Any incomplete escape at the very end is passed through.
    pub fn finish(&mut self, out: &mut Vec<u8>) {
        match self.state {
            DecodeState::Normal => (),
            DecodeState::Escape => out.push(b'='),
            DecodeState::EscapeCr => out.extend_from_slice(b"=\r"),
            DecodeState::EscapeHex(hi) => {
                out.push(b'=');
                out.push(hi);
            }
        }

        self.state = DecodeState::Normal;
    }

    pub fn reset(&mut self) {
        self.state = DecodeState::Normal;
    }
}

fn hex_value(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        _ => c - b'A' + 10,
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    fn qp_decode(input: &[u8]) -> Vec<u8> {
        let mut d = QpDecoder::new();
        let mut out = Vec::new();
        d.step(input, &mut out);
        d.finish(&mut out);
        out
    }

    fn qp_encode(input: &[u8]) -> Vec<u8> {
        let mut e = QpEncoder::new();
        let mut out = Vec::new();
        e.step(input, &mut out);
        e.finish(&mut out);
        out
    }

    fn assert_qp(expected: &[u8], input: &[u8]) {
        assert_eq!(
            String::from_utf8_lossy(expected),
            String::from_utf8_lossy(&qp_decode(input))
        );
        assert_eq!(expected, &qp_decode(input)[..]);
    }

    #[test]
    fn test_qp_decode() {
        assert_qp(b"hello world", b"hello world");
        assert_qp(b"\xabfoo", b"=ABfoo");
        assert_qp(b"fo\xabo", b"fo=ABo");
        assert_qp(b"foo\xab", b"foo=AB");
        assert_qp(b"foo\xab", b"foo=ab");

        assert_qp(b"foo\xab\xcd", b"foo=AB=CD");
        assert_qp(b"foo\xabbar\xcd", b"foo=ABbar=CD");

        assert_qp(b"foo", b"foo=\n");
        assert_qp(b"foobar", b"foo=\nbar");
        assert_qp(b"foo", b"foo=\r\n");
        assert_qp(b"foobar", b"foo=\r\nbar");

        assert_qp(b"foo=()bar", b"foo=()bar");
        assert_qp(b"foo=\xabbar", b"foo==ABbar");
        assert_qp(b"foo=A\xabbar", b"foo=A=ABbar");
        assert_qp("foo=ゑbar".as_bytes(), "foo=ゑbar".as_bytes());
        assert_qp(b"foo=\x80\x80bar", b"foo=\x80\x80bar");
        assert_qp(b"foo=\rbar", b"foo=\rbar");

        assert_qp(b"foo=", b"foo=");
        assert_qp(b"foo=A", b"foo=A");
        assert_qp(b"foo=\r", b"foo=\r");
    }

    #[test]
    fn test_qp_encode() {
        assert_eq!(b"hello=\n".to_vec(), qp_encode(b"hello"));
        assert_eq!(b"hello\n".to_vec(), qp_encode(b"hello\n"));
        assert_eq!(b"a=3Db\r\n".to_vec(), qp_encode(b"a=b\r\n"));
        assert_eq!(b"a=20\n".to_vec(), qp_encode(b"a \n"));
        assert_eq!(b"a b=09\n".to_vec(), qp_encode(b"a b\t\n"));
        assert_eq!(b"a=0Db=\n".to_vec(), qp_encode(b"a\rb"));
        assert_eq!(b"=00=FF=\n".to_vec(), qp_encode(b"\x00\xff"));
        assert_eq!(b"x=20=\n".to_vec(), qp_encode(b"x "));
    }

    #[test]
    fn encode_wraps_long_lines() {
        let encoded = qp_encode(&[b'x'; 200]);
        for line in encoded.split(|&b| b'\n' == b) {
            assert!(line.len() <= MAX_LINE, "{}", line.len());
        }
        assert_eq!(vec![b'x'; 200], qp_decode(&encoded));

        let encoded = qp_encode(&[0xAA; 100]);
        for line in encoded.split(|&b| b'\n' == b) {
            assert!(line.len() <= MAX_LINE, "{}", line.len());
        }
        assert_eq!(vec![0xAA; 100], qp_decode(&encoded));
    }

    proptest! {
        #[test]
        fn qp_decode_never_fails_for_str(s in ".*") {
            qp_decode(s.as_bytes());
        }

        #[test]
        fn qp_decode_never_fails_for_bytes(
            s in prop::collection::vec(prop::num::u8::ANY, 0..20)
        ) {
            qp_decode(&s);
        }

        #[test]
        fn qp_round_trip(
            s in prop::collection::vec(prop::num::u8::ANY, 0..300)
        ) {
            prop_assert_eq!(s.clone(), qp_decode(&qp_encode(&s)));
        }

        #[test]
        fn qp_round_trip_text(s in "[ a=\t\r\n]{0,200}") {
            prop_assert_eq!(
                s.as_bytes().to_vec(),
                qp_decode(&qp_encode(s.as_bytes()))
            );
        }
    }
}
