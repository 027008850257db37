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

//! Byte streams the parser reads from and the writer writes to.
//!
//! Positions reported by `tell()` and accepted by `substream()` are always
//! absolute offsets into the backing storage, even for substreams. This lets
//! the parser hand out substreams of substreams without tracking any base
//! offsets of its own.

use std::fmt;
use std::io::{self, SeekFrom};

use crate::support::error::Error;

pub mod filtered;
pub mod fs;
pub mod mem;
pub mod null;
pub mod pipe;

pub use self::filtered::FilteredStream;
pub use self::fs::FsStream;
pub use self::mem::MemStream;
pub use self::null::NullStream;
pub use self::pipe::{ReadPipe, WritePipe};

/// A possibly-seekable source or sink of bytes.
///
/// This mirrors `std::io::{Read, Write, Seek}`, plus the notion of a bounded
/// view (`substream`) sharing the same backing storage.
pub trait ByteStream: fmt::Debug {
    /// Read into `buf`. `Ok(0)` means end of stream.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write from `buf`, returning how much was accepted.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Move the position. Offsets given by `SeekFrom::Start` are absolute.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;

    /// The current absolute position, or `None` if the stream is not
    /// seekable.
    fn tell(&self) -> Option<u64>;

    /// Return to the start of the stream.
    fn reset(&mut self) -> io::Result<()>;

    /// The number of bytes between the start and end of the stream, if known.
    fn length(&self) -> Option<u64>;

    /// Create a view of `[start, end)` sharing this stream's storage. `None`
    /// for `end` means the view is unbounded.
    fn substream(
        &self,
        start: u64,
        end: Option<u64>,
    ) -> io::Result<Box<dyn ByteStream>>;

    /// Whether the position is known to be at the end.
    fn eos(&self) -> bool;

    fn write_all(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write(buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "stream refused further data",
                    ))
                }
                Ok(n) => buf = &buf[n..],
                Err(e) if io::ErrorKind::Interrupted == e.kind() => (),
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    /// Append everything remaining to `out`, returning the number of bytes
    /// read.
    fn read_to_end(&mut self, out: &mut Vec<u8>) -> io::Result<usize> {
        let mut buf = [0u8; 4096];
        let mut total = 0;
        loop {
            match self.read(&mut buf) {
                Ok(0) => return Ok(total),
                Ok(n) => {
                    out.extend_from_slice(&buf[..n]);
                    total += n;
                }
                Err(e) if io::ErrorKind::Interrupted == e.kind() => (),
                Err(e) => return Err(e),
            }
        }
    }

    /// Copy everything remaining into `dst`.
    fn write_to_stream(&mut self, dst: &mut dyn ByteStream) -> io::Result<u64> {
        let mut buf = [0u8; 4096];
        let mut total = 0u64;
        loop {
            match self.read(&mut buf) {
                Ok(0) => return Ok(total),
                Ok(n) => {
                    dst.write_all(&buf[..n])?;
                    total += n as u64;
                }
                Err(e) if io::ErrorKind::Interrupted == e.kind() => (),
                Err(e) => return Err(e),
            }
        }
    }
}

pub(crate) fn not_seekable() -> io::Error {
    Error::NotSeekable.into()
}

/// The bounds and cursor of a seekable stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Bounds {
    pub start: u64,
    pub end: Option<u64>,
    pub position: u64,
}

impl Bounds {
    pub fn new(start: u64, end: Option<u64>) -> Self {
        Bounds {
            start,
            end,
            position: start,
        }
    }

    /// The effective end, given the current size of the backing storage.
    pub fn effective_end(&self, backing_len: u64) -> u64 {
        match self.end {
            Some(end) => end.min(backing_len).max(self.start),
            None => backing_len.max(self.start),
        }
    }

    /// How much may be read right now.
    pub fn readable(&self, backing_len: u64) -> u64 {
        self.effective_end(backing_len).saturating_sub(self.position)
    }

    /// Clamp a write of `len` bytes to the upper bound, if any.
    pub fn writable(&self, len: usize) -> usize {
        match self.end {
            Some(end) => {
                (end.saturating_sub(self.position)).min(len as u64) as usize
            }
            None => len,
        }
    }

    pub fn seek(&mut self, pos: SeekFrom, backing_len: u64) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(off) => Some(off),
            SeekFrom::Current(delta) => offset_by(self.position, delta),
            SeekFrom::End(delta) => {
                offset_by(self.effective_end(backing_len), delta)
            }
        };

        match target {
            Some(target)
                if target >= self.start
                    && self.end.map_or(true, |end| target <= end) =>
            {
                self.position = target;
                Ok(target)
            }
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek outside stream bounds",
            )),
        }
    }

    pub fn length(&self, backing_len: u64) -> u64 {
        self.effective_end(backing_len) - self.start
    }

    /// Bounds of a substream, validated against these bounds.
    pub fn sub(&self, start: u64, end: Option<u64>) -> io::Result<Bounds> {
        let end = match (end, self.end) {
            (Some(e), Some(ours)) => Some(e.min(ours)),
            (Some(e), None) => Some(e),
            (None, ours) => ours,
        };

        if start < self.start || end.map_or(false, |end| end < start) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "substream outside stream bounds",
            ));
        }

        Ok(Bounds::new(start, end))
    }
}

fn offset_by(base: u64, delta: i64) -> Option<u64> {
    if delta >= 0 {
        base.checked_add(delta as u64)
    } else {
        base.checked_sub(delta.unsigned_abs())
    }
}

/// Wraps a stream so that no read returns more than a fixed number of bytes,
/// to push the parser through its refill paths.
#[cfg(test)]
#[derive(Debug)]
pub struct TrickleStream<S> {
    pub inner: S,
    pub max_read: usize,
}

#[cfg(test)]
impl<S: ByteStream> ByteStream for TrickleStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.max_read);
        self.inner.read(&mut buf[..n])
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }

    fn tell(&self) -> Option<u64> {
        self.inner.tell()
    }

    fn reset(&mut self) -> io::Result<()> {
        self.inner.reset()
    }

    fn length(&self) -> Option<u64> {
        self.inner.length()
    }

    fn substream(
        &self,
        start: u64,
        end: Option<u64>,
    ) -> io::Result<Box<dyn ByteStream>> {
        self.inner.substream(start, end)
    }

    fn eos(&self) -> bool {
        self.inner.eos()
    }
}
