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

use std::io::{self, SeekFrom};

use super::{Bounds, ByteStream};

/// A sink which discards everything written to it, only keeping count.
///
/// Reads always return end of stream.
#[derive(Clone, Debug, Default)]
pub struct NullStream {
    written: u64,
    position: u64,
}

impl NullStream {
    pub fn new() -> Self {
        NullStream::default()
    }

    /// The total number of bytes written.
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl ByteStream for NullStream {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Ok(0)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written += buf.len() as u64;
        self.position += buf.len() as u64;
        Ok(buf.len())
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let mut bounds = Bounds {
            start: 0,
            end: None,
            position: self.position,
        };
        self.position = bounds.seek(pos, self.written)?;
        Ok(self.position)
    }

    fn tell(&self) -> Option<u64> {
        Some(self.position)
    }

    fn reset(&mut self) -> io::Result<()> {
        self.position = 0;
        Ok(())
    }

    fn length(&self) -> Option<u64> {
        Some(self.written)
    }

    fn substream(
        &self,
        _start: u64,
        _end: Option<u64>,
    ) -> io::Result<Box<dyn ByteStream>> {
        Ok(Box::new(NullStream::new()))
    }

    fn eos(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn counts_writes() {
        let mut s = NullStream::new();
        s.write_all(b"hello").unwrap();
        s.write_all(b" world").unwrap();
        assert_eq!(11, s.written());
        assert_eq!(Some(11), s.tell());

        let mut buf = [0u8; 4];
        assert_eq!(0, s.read(&mut buf).unwrap());
    }
}
