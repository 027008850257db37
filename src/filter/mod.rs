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

//! Streaming byte transforms.
//!
//! A `Filter` is fed input in arbitrary chunks via `filter()` and finally
//! `complete()`. The concatenated output never depends on how the input was
//! split up; filters carry whatever state they need between calls, and can
//! also push unconsumed input back (`backup`) to have it presented again at
//! the front of the next call.

use std::fmt;

pub mod base64;
pub mod basic;
pub mod best;
pub mod charset;
pub mod checksum;
pub mod crlf;
pub mod from;
pub mod gzip;
pub mod quoted_printable;
pub mod uuencode;

pub use self::basic::{BasicFilter, Direction};
pub use self::best::{BestFilter, BestFlags, EncodingConstraint};
pub use self::charset::CharsetFilter;
pub use self::checksum::{ChecksumFilter, ChecksumKind};
pub use self::crlf::CrlfFilter;
pub use self::from::{FromFilter, FromMode};
pub use self::gzip::GzipFilter;

/// What a `FilterStep` produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Output {
    /// The output is the first `n` bytes of the input, unchanged.
    Input(usize),
    /// The output was appended to the output buffer.
    Buffer,
}

/// The capability shared by all filter implementations.
pub trait FilterStep {
    /// Transform `input`, appending to `out` (which starts empty) or
    /// indicating pass-through. Anything appended to `backup` is prepended to
    /// the input of the next call.
    fn step(
        &mut self,
        input: &[u8],
        out: &mut Vec<u8>,
        backup: &mut Vec<u8>,
    ) -> Output;

    /// Like `step`, but this is the final input. Nothing may be backed up.
    fn complete(&mut self, input: &[u8], out: &mut Vec<u8>) -> Output;

    /// Discard all carried-over state.
    fn reset(&mut self);
}

/// The closed set of filter implementations.
#[derive(Debug)]
pub enum FilterKind {
    Crlf(CrlfFilter),
    Basic(BasicFilter),
    From(FromFilter),
    Best(BestFilter),
    Checksum(ChecksumFilter),
    Charset(CharsetFilter),
    Gzip(GzipFilter),
}

macro_rules! dispatch {
    ($this:expr, $f:ident => $body:expr) => {
        match $this {
            FilterKind::Crlf($f) => $body,
            FilterKind::Basic($f) => $body,
            FilterKind::From($f) => $body,
            FilterKind::Best($f) => $body,
            FilterKind::Checksum($f) => $body,
            FilterKind::Charset($f) => $body,
            FilterKind::Gzip($f) => $body,
        }
    };
}

impl FilterStep for FilterKind {
    fn step(
        &mut self,
        input: &[u8],
        out: &mut Vec<u8>,
        backup: &mut Vec<u8>,
    ) -> Output {
        dispatch!(self, f => f.step(input, out, backup))
    }

    fn complete(&mut self, input: &[u8], out: &mut Vec<u8>) -> Output {
        dispatch!(self, f => f.complete(input, out))
    }

    fn reset(&mut self) {
        dispatch!(self, f => f.reset())
    }
}

macro_rules! kind_from {
    ($variant:ident, $t:ty) => {
        impl From<$t> for FilterKind {
            fn from(f: $t) -> Self {
                FilterKind::$variant(f)
            }
        }
    };
}

kind_from!(Crlf, CrlfFilter);
kind_from!(Basic, BasicFilter);
kind_from!(From, FromFilter);
kind_from!(Best, BestFilter);
kind_from!(Checksum, ChecksumFilter);
kind_from!(Charset, CharsetFilter);
kind_from!(Gzip, GzipFilter);

/// A filter together with the buffers that carry data between calls.
pub struct Filter {
    kind: FilterKind,
    backbuf: Vec<u8>,
    inbuf: Vec<u8>,
    outbuf: Vec<u8>,
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Filter")
            .field("kind", &self.kind)
            .field("backbuf", &self.backbuf.len())
            .finish()
    }
}

impl Filter {
    pub fn new(kind: impl Into<FilterKind>) -> Self {
        Filter {
            kind: kind.into(),
            backbuf: Vec::new(),
            inbuf: Vec::new(),
            outbuf: Vec::new(),
        }
    }

    pub fn kind(&self) -> &FilterKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut FilterKind {
        &mut self.kind
    }

    /// Transform the next chunk of input.
    pub fn filter<'a>(&'a mut self, input: &'a [u8]) -> &'a [u8] {
        self.run(input, false)
    }

    /// Transform the final chunk of input and flush all retained state.
    pub fn complete<'a>(&'a mut self, input: &'a [u8]) -> &'a [u8] {
        self.run(input, true)
    }

    pub fn reset(&mut self) {
        self.backbuf.clear();
        self.kind.reset();
    }

    /// Arrange for `data` to be presented again before the next input.
    pub fn backup(&mut self, data: &[u8]) {
        self.backbuf.clear();
        self.backbuf.extend_from_slice(data);
    }

    /// Run a whole input through the filter, returning all output.
    pub fn filter_all(&mut self, input: &[u8]) -> Vec<u8> {
        let mut result = self.filter(input).to_vec();
        result.extend_from_slice(self.complete(&[]));
        result
    }

    fn run<'a>(&'a mut self, input: &'a [u8], complete: bool) -> &'a [u8] {
        let Filter {
            kind,
            backbuf,
            inbuf,
            outbuf,
        } = self;

        let input: &'a [u8] = if backbuf.is_empty() {
            input
        } else {
            inbuf.clear();
            inbuf.append(backbuf);
            inbuf.extend_from_slice(input);
            let inbuf: &'a Vec<u8> = inbuf;
            inbuf
        };

        outbuf.clear();
        let output = if complete {
            kind.complete(input, outbuf)
        } else {
            kind.step(input, outbuf, backbuf)
        };

        let outbuf: &'a Vec<u8> = outbuf;
        match output {
            Output::Input(len) => &input[..len],
            Output::Buffer => outbuf,
        }
    }
}

/// Push `bytes` as the value of `n` in two upper-case hex digits.
pub(crate) fn push_hex(out: &mut Vec<u8>, n: u8) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    out.push(HEX[(n >> 4) as usize]);
    out.push(HEX[(n & 0xF) as usize]);
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Run `input` through `filter`, splitting it at each of `splits` (which
    /// are clamped to the input length and sorted).
    pub fn run_split(
        filter: &mut Filter,
        input: &[u8],
        splits: &[usize],
    ) -> Vec<u8> {
        let mut splits: Vec<usize> =
            splits.iter().map(|&s| s.min(input.len())).collect();
        splits.sort_unstable();

        let mut result = Vec::new();
        let mut start = 0;
        for split in splits {
            result.extend_from_slice(filter.filter(&input[start..split]));
            start = split;
        }
        result.extend_from_slice(filter.filter(&input[start..]));
        result.extend_from_slice(filter.complete(&[]));
        result
    }

    /// Assert that every single split point gives the same output as running
    /// the input whole.
    pub fn assert_chunking_transparent(
        mut make: impl FnMut() -> Filter,
        input: &[u8],
    ) {
        let whole = make().filter_all(input);
        for split in 0..=input.len() {
            let mut f = make();
            assert_eq!(
                whole,
                run_split(&mut f, input, &[split]),
                "split at {} of {:?}",
                split,
                String::from_utf8_lossy(input),
            );
        }

        let mut f = make();
        let every: Vec<usize> = (0..=input.len()).collect();
        assert_eq!(whole, run_split(&mut f, input, &every), "bytewise");
    }
}

#[cfg(test)]
mod test {
    use super::test_support::*;
    use super::*;

    #[test]
    fn backup_is_prepended() {
        let mut f = Filter::new(CrlfFilter::decoder(false));
        f.backup(b"ab");
        assert_eq!(b"abcd", f.filter(b"cd"));
        assert_eq!(b"ef", f.filter(b"ef"));
    }

    #[test]
    fn reset_drops_state() {
        let mut f = Filter::new(FromFilter::new(FromMode::Escape));
        assert_eq!(b"", f.filter(b"Fr"));
        f.reset();
        assert_eq!(b"om x", f.filter(b"om x"));
    }

    #[test]
    fn split_helper() {
        let mut f = Filter::new(CrlfFilter::encoder(false));
        assert_eq!(
            b"a\r\nb\r\n".to_vec(),
            run_split(&mut f, b"a\nb\n", &[1, 9, 0])
        );
    }
}
