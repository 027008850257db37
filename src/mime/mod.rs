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


//! The MIME part tree and everything needed to build, walk and write it.

pub mod boundary;
pub mod content_type;
pub mod encoding;
pub mod header;
pub mod iter;
pub mod openpgp;
pub mod parser;
pub mod part;
mod scan;
pub mod writer;

pub use self::content_type::{ContentType, Param};
pub use self::encoding::ContentEncoding;
pub use self::header::{HeaderList, HeaderRecord};
pub use self::iter::PartIter;
pub use self::openpgp::OpenPgpData;
pub use self::parser::{Parser, ParserState};
pub use self::part::{DataWrapper, Leaf, MessageWrapper, Multipart, PartNode};
