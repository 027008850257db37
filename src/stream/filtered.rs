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

use super::{not_seekable, ByteStream};
use crate::filter::Filter;

const READ_CHUNK: usize = 4096;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LastOp {
    None,
    Read,
    Write,
}

/// A stream which passes everything read from or written to the underlying
/// stream through an ordered chain of filters.
///
/// Filtered streams cannot seek; the output of a filter chain has no useful
/// relationship to positions in the source.
#[derive(Debug)]
pub struct FilteredStream {
    source: Box<dyn ByteStream>,
    filters: Vec<Filter>,

    readbuf: Vec<u8>,
    readpos: usize,
    source_done: bool,
    last_op: LastOp,
}

impl FilteredStream {
    pub fn new(source: Box<dyn ByteStream>) -> Self {
        FilteredStream {
            source,
            filters: Vec::new(),
            readbuf: Vec::new(),
            readpos: 0,
            source_done: false,
            last_op: LastOp::None,
        }
    }

    /// Append `filter` to the end of the chain, returning its index.
    pub fn add(&mut self, filter: Filter) -> usize {
        self.filters.push(filter);
        self.filters.len() - 1
    }

    pub fn remove(&mut self, index: usize) -> Option<Filter> {
        if index < self.filters.len() {
            Some(self.filters.remove(index))
        } else {
            None
        }
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn source(&self) -> &dyn ByteStream {
        &*self.source
    }

    pub fn into_inner(self) -> Box<dyn ByteStream> {
        self.source
    }

    fn run_chain(&mut self, input: &[u8], complete: bool) -> Vec<u8> {
        let mut data = input.to_vec();
        for filter in &mut self.filters {
            data = if complete {
                filter.complete(&data).to_vec()
            } else {
                filter.filter(&data).to_vec()
            };
        }
        data
    }
}

impl ByteStream for FilteredStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.last_op = LastOp::Read;

        loop {
            if self.readpos < self.readbuf.len() {
                let n = buf.len().min(self.readbuf.len() - self.readpos);
                buf[..n].copy_from_slice(
                    &self.readbuf[self.readpos..self.readpos + n],
                );
                self.readpos += n;
                return Ok(n);
            }

            if self.source_done || buf.is_empty() {
                return Ok(0);
            }

            let mut chunk = [0u8; READ_CHUNK];
            let nread = self.source.read(&mut chunk)?;
            self.readbuf = if 0 == nread {
                self.source_done = true;
                self.run_chain(&[], true)
            } else {
                self.run_chain(&chunk[..nread], false)
            };
            self.readpos = 0;
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.last_op = LastOp::Write;
        let filtered = self.run_chain(buf, false);
        self.source.write_all(&filtered)?;
        Ok(buf.len())
    }

    /// Complete every filter, in order, writing what they release to the
    /// source. Nothing happens to the filters unless the last operation was
    /// a write.
    fn flush(&mut self) -> io::Result<()> {
        if LastOp::Write == self.last_op {
            let tail = self.run_chain(&[], true);
            self.source.write_all(&tail)?;
            self.last_op = LastOp::None;
        }

        self.source.flush()
    }

    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Err(not_seekable())
    }

    fn tell(&self) -> Option<u64> {
        None
    }

    fn reset(&mut self) -> io::Result<()> {
        for filter in &mut self.filters {
            filter.reset();
        }
        self.readbuf.clear();
        self.readpos = 0;
        self.source_done = false;
        self.last_op = LastOp::None;
        self.source.reset()
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
        self.source_done && self.readpos >= self.readbuf.len()
    }
}

#[cfg(test)]
mod test {
    use super::super::{MemStream, TrickleStream};
    use super::*;
    use crate::filter::{
        BasicFilter, ChecksumFilter, ChecksumKind, CrlfFilter, FilterKind,
    };
    use crate::mime::encoding::ContentEncoding;

    #[test]
    fn write_through_chain() {
        let sink = MemStream::new();
        let mut fs = FilteredStream::new(Box::new(sink.clone()));
        fs.add(Filter::new(CrlfFilter::encoder(false)));
        fs.add(Filter::new(BasicFilter::encoder(ContentEncoding::Base64)));

        fs.write_all(b"hel").unwrap();
        fs.write_all(b"lo\n").unwrap();
        fs.flush().unwrap();

        assert_eq!(b"aGVsbG8NCg==\n".to_vec(), sink.to_vec());
    }

    #[test]
    fn flush_after_read_does_not_complete() {
        let sink = MemStream::new();
        let mut fs = FilteredStream::new(Box::new(sink.clone()));
        fs.add(Filter::new(BasicFilter::encoder(ContentEncoding::Base64)));
        let mut buf = [0u8; 8];
        assert_eq!(0, fs.read(&mut buf).unwrap());
        fs.flush().unwrap();
        assert!(sink.to_vec().is_empty());
    }

    #[test]
    fn read_through_chain() {
        let source = TrickleStream {
            inner: MemStream::from_bytes(&b"caf=C3=A9 =\nau=\nlait=\r\n!"[..]),
            max_read: 3,
        };
        let mut fs = FilteredStream::new(Box::new(source));
        fs.add(Filter::new(BasicFilter::decoder(
            ContentEncoding::QuotedPrintable,
        )));
        fs.add(Filter::new(ChecksumFilter::new(ChecksumKind::Md5)));

        let mut out = Vec::new();
        fs.read_to_end(&mut out).unwrap();
        assert_eq!("caf\u{e9} aulait!".as_bytes().to_vec(), out);
        assert!(fs.eos());

        let expected = {
            let mut c = Filter::new(ChecksumFilter::new(ChecksumKind::Md5));
            c.filter_all(&out);
            match c.kind() {
                FilterKind::Checksum(c) => c.hex_digest(),
                k => panic!("unexpected filter {:?}", k),
            }
        };
        match fs.filters()[1].kind() {
            FilterKind::Checksum(c) => assert_eq!(expected, c.hex_digest()),
            k => panic!("unexpected filter {:?}", k),
        }
    }

    #[test]
    fn reset_rewinds() {
        let mut fs = FilteredStream::new(Box::new(MemStream::from_bytes(
            &b"aGk=\n"[..],
        )));
        fs.add(Filter::new(BasicFilter::decoder(ContentEncoding::Base64)));

        let mut out = Vec::new();
        fs.read_to_end(&mut out).unwrap();
        fs.reset().unwrap();
        fs.read_to_end(&mut out).unwrap();
        assert_eq!(b"hihi".to_vec(), out);
        assert!(fs.seek(SeekFrom::Start(0)).is_err());
        assert_eq!(None, fs.tell());
    }
}
