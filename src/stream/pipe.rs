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

//! Adapters from `std::io` types to non-seekable streams.

use std::fmt;
use std::io::{self, Read, SeekFrom, Write};

use super::{not_seekable, ByteStream};

/// A non-seekable stream reading from any `Read`, such as stdin or a socket.
pub struct ReadPipe<R> {
    inner: R,
    eos: bool,
}

impl<R> fmt::Debug for ReadPipe<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ReadPipe").field("eos", &self.eos).finish()
    }
}

impl<R: Read> ReadPipe<R> {
    pub fn new(inner: R) -> Self {
        ReadPipe { inner, eos: false }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteStream for ReadPipe<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if 0 == n && !buf.is_empty() {
            self.eos = true;
        }
        Ok(n)
    }

    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "stream is read-only",
        ))
    }

    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Err(not_seekable())
    }

    fn tell(&self) -> Option<u64> {
        None
    }

    fn reset(&mut self) -> io::Result<()> {
        Err(not_seekable())
    }

    fn length(&self) -> Option<u64> {
        None
    }

    fn substream(
        &self,
        _start: u64,
        _end: Option<u64>,
    ) -> io::Result<Box<dyn ByteStream>> {
        Err(not_seekable())
    }

    fn eos(&self) -> bool {
        self.eos
    }
}

/// A non-seekable stream writing to any `Write`.
pub struct WritePipe<W> {
    inner: W,
    written: u64,
}

impl<W> fmt::Debug for WritePipe<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("WritePipe")
            .field("written", &self.written)
            .finish()
    }
}

impl<W: Write> WritePipe<W> {
    pub fn new(inner: W) -> Self {
        WritePipe { inner, written: 0 }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> ByteStream for WritePipe<W> {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Ok(0)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Err(not_seekable())
    }

    fn tell(&self) -> Option<u64> {
        None
    }

    fn reset(&mut self) -> io::Result<()> {
        Err(not_seekable())
    }

    fn length(&self) -> Option<u64> {
        None
    }

    fn substream(
        &self,
        _start: u64,
        _end: Option<u64>,
    ) -> io::Result<Box<dyn ByteStream>> {
        Err(not_seekable())
    }

    fn eos(&self) -> bool {
        true
    }
}
