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

use super::{FilterStep, Output};

const FROM: &[u8] = b"From ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FromMode {
    /// `From ` becomes `>From `, as mbox writers do.
    Escape,
    /// `From ` becomes `=46rom `, which survives quoted-printable decoding
    /// unchanged and keeps signed content stable (RFC 3156 section 3).
    Armor,
}

/// Protects lines beginning with `From `.
#[derive(Clone, Debug)]
pub struct FromFilter {
    mode: FromMode,
    midline: bool,
}

impl FromFilter {
    pub fn new(mode: FromMode) -> Self {
        FromFilter {
            mode,
            midline: false,
        }
    }

    fn run(
        &mut self,
        input: &[u8],
        out: &mut Vec<u8>,
        mut backup: Option<&mut Vec<u8>>,
    ) {
        out.reserve(input.len() + 8);

        let mut pos = 0;
        while pos < input.len() {
            let mut rest = &input[pos..];

            if !self.midline {
                if rest.len() < FROM.len() && FROM.starts_with(rest) {
                    if let Some(backup) = backup.take() {
                        backup.extend_from_slice(rest);
                        return;
                    }
                } else if rest.starts_with(FROM) {
                    match self.mode {
                        FromMode::Escape => out.push(b'>'),
                        FromMode::Armor => {
                            out.extend_from_slice(b"=46");
                            pos += 1;
                            rest = &rest[1..];
                        }
                    }
                }

                self.midline = true;
            }

            match memchr::memchr(b'\n', rest) {
                Some(eol) => {
                    out.extend_from_slice(&rest[..=eol]);
                    pos += eol + 1;
                    self.midline = false;
                }
                None => {
                    out.extend_from_slice(rest);
                    pos = input.len();
                }
            }
        }
    }
}

impl FilterStep for FromFilter {
    fn step(
        &mut self,
        input: &[u8],
        out: &mut Vec<u8>,
        backup: &mut Vec<u8>,
    ) -> Output {
        self.run(input, out, Some(backup));
        Output::Buffer
    }

    fn complete(&mut self, input: &[u8], out: &mut Vec<u8>) -> Output {
        self.run(input, out, None);
        self.midline = false;
        Output::Buffer
    }

    fn reset(&mut self) {
        self.midline = false;
    }
}
