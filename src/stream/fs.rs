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

use std::cell::RefCell;
use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::rc::Rc;

use super::{Bounds, ByteStream};

/// A stream backed by a file.
///
/// The file handle is shared between all substreams. Every operation seeks the
/// handle to this stream's own cursor first, so interleaved use of several
/// substreams is safe.
#[derive(Clone, Debug)]
pub struct FsStream {
    file: Rc<RefCell<fs::File>>,
    bounds: Bounds,
}

impl FsStream {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(FsStream::from_file(fs::File::open(path)?))
    }

    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(FsStream::from_file(
            fs::OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?,
        ))
    }

    pub fn from_file(file: fs::File) -> Self {
        FsStream {
            file: Rc::new(RefCell::new(file)),
            bounds: Bounds::new(0, None),
        }
    }

    fn backing_len(&self) -> u64 {
        self.file
            .borrow()
            .metadata()
            .map(|md| md.len())
            .unwrap_or(0)
    }
}

impl ByteStream for FsStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = self.backing_len();
        let n = self.bounds.readable(len).min(buf.len() as u64) as usize;
        if 0 == n {
            return Ok(0);
        }

        let mut file = self.file.borrow_mut();
        file.seek(SeekFrom::Start(self.bounds.position))?;
        let n = file.read(&mut buf[..n])?;
        self.bounds.position += n as u64;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.bounds.writable(buf.len());
        let mut file = self.file.borrow_mut();
        file.seek(SeekFrom::Start(self.bounds.position))?;
        let n = file.write(&buf[..n])?;
        self.bounds.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.borrow_mut().flush()
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self.backing_len();
        self.bounds.seek(pos, len)
    }

    fn tell(&self) -> Option<u64> {
        Some(self.bounds.position)
    }

    fn reset(&mut self) -> io::Result<()> {
        self.bounds.position = self.bounds.start;
        Ok(())
    }

    fn length(&self) -> Option<u64> {
        Some(self.bounds.length(self.backing_len()))
    }

    fn substream(
        &self,
        start: u64,
        end: Option<u64>,
    ) -> io::Result<Box<dyn ByteStream>> {
        Ok(Box::new(FsStream {
            file: Rc::clone(&self.file),
            bounds: self.bounds.sub(start, end)?,
        }))
    }

    fn eos(&self) -> bool {
        0 == self.bounds.readable(self.backing_len())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn file_round_trip_and_substreams() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("stream");

        let mut s = FsStream::create(&path).unwrap();
        s.write_all(b"From: foo\n\nbody text\n").unwrap();
        s.flush().unwrap();
        assert_eq!(Some(21), s.length());

        let mut body = s.substream(11, Some(20)).unwrap();
        let mut whole = FsStream::open(&path).unwrap();

        // Interleave reads on both handles
        let mut a = [0u8; 4];
        let mut b = [0u8; 4];
        assert_eq!(4, body.read(&mut a).unwrap());
        assert_eq!(4, whole.read(&mut b).unwrap());
        assert_eq!(b"body", &a);
        assert_eq!(b"From", &b);

        let mut rest = Vec::new();
        body.read_to_end(&mut rest).unwrap();
        assert_eq!(b" text".to_vec(), rest);
        assert!(body.eos());
    }
}
