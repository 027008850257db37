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

//! Streaming base64, as described by RFC 2045.

/// Input bytes per output line; 57 bytes make 76 characters.
const LINE_INPUT: usize = 57;

#[derive(Clone, Debug, Default)]
pub struct Base64Encoder {
    pending: Vec<u8>,
}

impl Base64Encoder {
    pub fn new() -> Self {
        Base64Encoder::default()
    }

    pub fn step(&mut self, mut input: &[u8], out: &mut Vec<u8>) {
        if !self.pending.is_empty() {
            let take = (LINE_INPUT - self.pending.len()).min(input.len());
            self.pending.extend_from_slice(&input[..take]);
            input = &input[take..];

            if LINE_INPUT == self.pending.len() {
                encode_line(&self.pending, out);
                self.pending.clear();
            }
        }

        let mut lines = input.chunks_exact(LINE_INPUT);
        for line in &mut lines {
            encode_line(line, out);
        }
        self.pending.extend_from_slice(lines.remainder());
    }

    pub fn finish(&mut self, out: &mut Vec<u8>) {
        if !self.pending.is_empty() {
            encode_line(&self.pending, out);
            self.pending.clear();
        }
    }

    pub fn reset(&mut self) {
        self.pending.clear();
    }
}

fn encode_line(bytes: &[u8], out: &mut Vec<u8>) {
    let start = out.len();
    out.resize(start + (bytes.len() + 2) / 3 * 4, 0);
    let n = base64::encode_config_slice(bytes, base64::STANDARD, &mut out[start..]);
    out.truncate(start + n);
    out.push(b'\n');
}

/// Decodes base64, skipping anything outside the alphabet.
///
/// Padding is honoured per quad, so concatenated padded runs decode
/// correctly.
#[derive(Clone, Debug, Default)]
pub struct Base64Decoder {
    /// Alphabet characters not yet making up a whole quad.
    pending: Vec<u8>,
}

impl Base64Decoder {
    pub fn new() -> Self {
        Base64Decoder::default()
    }

    pub fn step(&mut self, input: &[u8], out: &mut Vec<u8>) {
        let mut pushed_any = false;
        for &byte in input {
            match byte {
                b'0'..=b'9'
                | b'a'..=b'z'
                | b'A'..=b'Z'
                | b'+'
                | b'/'
                | b'=' => {
                    self.pending.push(byte);
                    pushed_any = true;
                }
                _ => (),
            }
        }

        if !pushed_any {
            return;
        }

        let usable_length = self.pending.len() / 4 * 4;
        // The crate only accepts padding at the very end of its input, so
        // each padded quad ends a run
        let mut run_start = 0;
        for quad_end in (4..=usable_length).step_by(4) {
            if b'=' == self.pending[quad_end - 1] || quad_end == usable_length
            {
                decode_run(&self.pending[run_start..quad_end], out);
                run_start = quad_end;
            }
        }

        self.pending.drain(..usable_length);
    }

    /// Incomplete trailing quads carry too few bits to be meaningful and are
    /// dropped.
    pub fn finish(&mut self, _out: &mut Vec<u8>) {
        self.reset();
    }

    pub fn reset(&mut self) {
        self.pending.clear();
    }
}

/// Decode whole quads into `out`. If the run as a whole is rejected, each
/// quad is tried on its own so that one bad quad loses only itself.
fn decode_run(run: &[u8], out: &mut Vec<u8>) {
    let start = out.len();
    if base64::decode_config_buf(run, base64::STANDARD, out).is_ok() {
        return;
    }

    out.truncate(start);
    for quad in run.chunks(4) {
        let quad_start = out.len();
        if base64::decode_config_buf(quad, base64::STANDARD, out).is_err() {
            out.truncate(quad_start);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn encode(data: &[u8]) -> Vec<u8> {
        let mut e = Base64Encoder::new();
        let mut out = Vec::new();
        e.step(data, &mut out);
        e.finish(&mut out);
        out
    }

    fn decode(data: &[u8]) -> Vec<u8> {
        let mut d = Base64Decoder::new();
        let mut out = Vec::new();
        d.step(data, &mut out);
        d.finish(&mut out);
        out
    }

    #[test]
    fn encode_wraps_at_76() {
        let data = vec![0u8; 60];
        let encoded = encode(&data);
        let lines: Vec<&[u8]> =
            encoded.split(|&b| b'\n' == b).collect();
        assert_eq!(76, lines[0].len());
        assert_eq!(b"AAAA", lines[1]);
        assert_eq!(b"", lines[2]);
        assert_eq!(3, lines.len());
    }

    #[test]
    fn encode_empty_is_empty() {
        assert_eq!(Vec::<u8>::new(), encode(b""));
    }

    #[test]
    fn decode_basics() {
        assert_eq!(b"hello".to_vec(), decode(b"aGVsbG8="));
        assert_eq!(b"hello".to_vec(), decode(b"aGVs\r\nbG8=\r\n"));
        assert_eq!(b"hi".to_vec(), decode(b"a G k ="));
        assert_eq!(b"h".to_vec(), decode(b"aA=="));
        // Concatenated padded runs
        assert_eq!(b"hih".to_vec(), decode(b"aGk=aA=="));
        // Garbage is skipped
        assert_eq!(b"hello".to_vec(), decode(b"*aGV!sbG8=*"));
        // A quad with misplaced padding is lost on its own
        assert_eq!(b"hih".to_vec(), decode(b"aGk=a=bcaA=="));
    }

    #[test]
    fn padding_split_across_calls() {
        let mut d = Base64Decoder::new();
        let mut out = Vec::new();
        d.step(b"aA=", &mut out);
        assert!(out.is_empty());
        d.step(b"=", &mut out);
        assert_eq!(b"h".to_vec(), out);
    }

    #[test]
    fn matches_base64_crate() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let encoded = encode(&data);
        let unwrapped: Vec<u8> =
            encoded.iter().copied().filter(|&b| b'\n' != b).collect();
        assert_eq!(base64::encode(&data).into_bytes(), unwrapped);
        assert_eq!(data, decode(&encoded));
    }
}
