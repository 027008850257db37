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

/// A two-part multipart with a plain text part and a base64 part.
pub static SIMPLE_MULTIPART: &[u8] = include_bytes!("simple_multipart.eml");

/// A message whose first part has a header block interrupted by a line
/// which is not a header.
pub static NESTED_BAD_HEADER: &[u8] = include_bytes!("nested_bad_header.eml");

/// A clearsigned text part followed by a part with an unterminated armored
/// message.
pub static PGP_SIGNED: &[u8] = include_bytes!("pgp_signed.eml");

/// Three messages in mbox format, the second one multipart.
pub static MBOX: &[u8] = include_bytes!("three.mbox");
