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

use std::io;

use crate::stream::ByteStream;

/// How much is read from the source at a time. A line at least this long is
/// known not to be a delimiter and may be passed on before it is complete.
#[cfg(not(test))]
pub(crate) const SCAN_CHUNK: usize = 4096;
#[cfg(test)]
pub(crate) const SCAN_CHUNK: usize = 64;

/// The parser's read-ahead window over its source.
///
/// Data is read in chunks and consumed from the front. The buffer grows when
/// a caller needs more contiguous data than it currently holds (for example,
/// a very long header line) and is compacted before each read.
#[derive(Debug, Default)]
pub(crate) struct ScanBuffer {
    buf: Vec<u8>,
    start: usize,
    end: usize,
    eof: bool,
    consumed: u64,
}

impl ScanBuffer {
    pub fn new() -> Self {
        ScanBuffer::default()
    }

    /// Everything read but not yet consumed.
    pub fn data(&self) -> &[u8] {
        &self.buf[self.start..self.end]
    }

    /// The number of bytes consumed so far, i.e., the position of `data()`
    /// relative to where the source was when scanning began.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Whether the source has reported end of stream. There may still be
    /// unconsumed data.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Whether everything the source will ever produce has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.eof && self.start == self.end
    }

    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.end - self.start);
        self.start += n;
        self.consumed += n as u64;
    }

    /// Read one more chunk from `stream`. Returns the number of bytes added,
    /// which is 0 only at end of stream.
    pub fn fill(&mut self, stream: &mut dyn ByteStream) -> io::Result<usize> {
        if self.eof {
            return Ok(0);
        }

        if self.start > 0 {
            self.buf.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }

        if self.buf.len() - self.end < SCAN_CHUNK {
            self.buf.resize(self.end + SCAN_CHUNK, 0);
        }

        loop {
            match stream.read(&mut self.buf[self.end..]) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(0);
                }
                Ok(n) => {
                    self.end += n;
                    return Ok(n);
                }
                Err(e) if io::ErrorKind::Interrupted == e.kind() => (),
                Err(e) => return Err(e),
            }
        }
    }

    /// Make the next whole line available at the front of `data()`.
    ///
    /// Returns the length of the line including its LF and whether the LF
    /// was actually present (it is absent for the last line of an
    /// unterminated stream). Returns `None` if there is no more data at all.
    pub fn next_line(
        &mut self,
        stream: &mut dyn ByteStream,
    ) -> io::Result<Option<(usize, bool)>> {
        let mut searched = 0;
        loop {
            let data = self.data();
            if let Some(nl) = memchr::memchr(b'\n', &data[searched..]) {
                return Ok(Some((searched + nl + 1, true)));
            }

            searched = data.len();
            if self.eof {
                return Ok(if 0 == searched {
                    None
                } else {
                    Some((searched, false))
                });
            }

            self.fill(stream)?;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::stream::{MemStream, TrickleStream};

    #[test]
    fn lines_across_fills() {
        let mut long = vec![b'x'; SCAN_CHUNK * 3];
        long.push(b'\n');
        let mut input = b"one\r\ntwo\n".to_vec();
        input.extend_from_slice(&long);
        input.extend_from_slice(b"tail");

        let mut stream = TrickleStream {
            inner: MemStream::from_bytes(input),
            max_read: 5,
        };
        let mut buf = ScanBuffer::new();

        assert_eq!(Some((5, true)), buf.next_line(&mut stream).unwrap());
        assert_eq!(b"one\r\n", &buf.data()[..5]);
        buf.consume(5);
        assert_eq!(Some((4, true)), buf.next_line(&mut stream).unwrap());
        buf.consume(4);
        assert_eq!(9, buf.consumed());

        assert_eq!(
            Some((long.len(), true)),
            buf.next_line(&mut stream).unwrap()
        );
        assert_eq!(&long[..], &buf.data()[..long.len()]);
        buf.consume(long.len());

        assert_eq!(Some((4, false)), buf.next_line(&mut stream).unwrap());
        assert!(buf.is_eof());
        assert!(!buf.is_exhausted());
        buf.consume(4);
        assert!(buf.is_exhausted());
        assert_eq!(None, buf.next_line(&mut stream).unwrap());
        assert_eq!(0, buf.fill(&mut stream).unwrap());
    }
}
