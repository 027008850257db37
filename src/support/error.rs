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

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid header field name at offset {}", fmt_offset(.offset))]
    InvalidHeaderName { offset: Option<u64> },
    #[error("End of stream inside header field name at offset {}", fmt_offset(.offset))]
    TruncatedHeader { offset: Option<u64> },
    #[error("No message in input")]
    EmptyInput,
    #[error("Message separator not found")]
    MarkerNotFound,
    #[error("Parser already failed")]
    ParserFailed,
    #[error("Stream is not seekable")]
    NotSeekable,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

fn fmt_offset(offset: &Option<u64>) -> String {
    match *offset {
        Some(offset) => offset.to_string(),
        None => "?".to_owned(),
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(e) => e,
            e => io::Error::new(io::ErrorKind::Other, e),
        }
    }
}
