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
use std::io::{self, SeekFrom};
use std::rc::Rc;

use super::{Bounds, ByteStream};

/// An in-memory stream.
///
/// Clones and substreams share the same underlying buffer, each with its own
/// cursor.
#[derive(Clone, Debug)]
pub struct MemStream {
    data: Rc<RefCell<Vec<u8>>>,
    bounds: Bounds,
}

impl Default for MemStream {
    fn default() -> Self {
        MemStream::new()
    }
}

impl MemStream {
    pub fn new() -> Self {
        MemStream::from_bytes(Vec::new())
    }

    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        MemStream {
            data: Rc::new(RefCell::new(data.into())),
            bounds: Bounds::new(0, None),
        }
    }

    /// Copy out the bytes within this stream's bounds, regardless of the
    /// cursor.
    pub fn to_vec(&self) -> Vec<u8> {
        let data = self.data.borrow();
        let end = self.bounds.effective_end(data.len() as u64) as usize;
        data[self.bounds.start as usize..end].to_vec()
    }

    fn backing_len(&self) -> u64 {
        self.data.borrow().len() as u64
    }
}

impl ByteStream for MemStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.data.borrow();
        let n = self.bounds.readable(data.len() as u64).min(buf.len() as u64)
            as usize;
        if 0 == n {
            return Ok(0);
        }

        let pos = self.bounds.position as usize;
        buf[..n].copy_from_slice(&data[pos..pos + n]);
        self.bounds.position += n as u64;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.bounds.writable(buf.len());
        let mut data = self.data.borrow_mut();
        let pos = self.bounds.position as usize;
        if data.len() < pos {
            data.resize(pos, 0);
        }

        let overlap = (data.len() - pos).min(n);
        data[pos..pos + overlap].copy_from_slice(&buf[..overlap]);
        data.extend_from_slice(&buf[overlap..n]);
        self.bounds.position += n as u64;
        Ok(n)
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
        Ok(Box::new(MemStream {
            data: Rc::clone(&self.data),
            bounds: self.bounds.sub(start, end)?,
        }))
    }

    fn eos(&self) -> bool {
        0 == self.bounds.readable(self.backing_len())
    }
}
