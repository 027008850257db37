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

use std::fmt;
use std::io::Write;
use std::mem;

use flate2::write::{GzDecoder, GzEncoder};
use flate2::Compression;
use log::warn;

use super::{Direction, FilterStep, Output};

enum Codec {
    Compress(GzEncoder<Vec<u8>>),
    Decompress(GzDecoder<Vec<u8>>),
}

/// Gzip compression or decompression.
///
/// Corrupt input to the decompressor truncates the output at the point of
/// corruption and is logged; it is not an error as far as the filter chain
/// is concerned.
pub struct GzipFilter {
    direction: Direction,
    level: Compression,
    codec: Codec,
    failed: bool,
}

impl fmt::Debug for GzipFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("GzipFilter")
            .field("direction", &self.direction)
            .field("level", &self.level.level())
            .field("failed", &self.failed)
            .finish()
    }
}

impl GzipFilter {
    pub fn new(direction: Direction, level: Compression) -> Self {
        GzipFilter {
            direction,
            level,
            codec: Self::codec(direction, level),
            failed: false,
        }
    }

    pub fn compressor() -> Self {
        GzipFilter::new(Direction::Encode, Compression::default())
    }

    pub fn decompressor() -> Self {
        GzipFilter::new(Direction::Decode, Compression::default())
    }

    fn codec(direction: Direction, level: Compression) -> Codec {
        match direction {
            Direction::Encode => {
                Codec::Compress(GzEncoder::new(Vec::new(), level))
            }
            Direction::Decode => Codec::Decompress(GzDecoder::new(Vec::new())),
        }
    }

    fn run(&mut self, input: &[u8], out: &mut Vec<u8>, finish: bool) {
        if self.failed {
            return;
        }

        let result = match self.codec {
            Codec::Compress(ref mut c) => c
                .write_all(input)
                .and_then(|()| if finish { c.try_finish() } else { Ok(()) })
                .map(|()| mem::take(c.get_mut())),
            Codec::Decompress(ref mut c) => c
                .write_all(input)
                .and_then(|()| if finish { c.try_finish() } else { Ok(()) })
                .map(|()| mem::take(c.get_mut())),
        };

        match result {
            Ok(produced) => out.extend_from_slice(&produced),
            Err(e) => {
                warn!("Gzip {:?} failed: {}", self.direction, e);
                self.failed = true;
            }
        }
    }
}

impl FilterStep for GzipFilter {
    fn step(
        &mut self,
        input: &[u8],
        out: &mut Vec<u8>,
        _backup: &mut Vec<u8>,
    ) -> Output {
        self.run(input, out, false);
        Output::Buffer
    }

    fn complete(&mut self, input: &[u8], out: &mut Vec<u8>) -> Output {
        self.run(input, out, true);
        Output::Buffer
    }

    fn reset(&mut self) {
        self.codec = Self::codec(self.direction, self.level);
        self.failed = false;
    }
}
