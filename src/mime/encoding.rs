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

/// The value of a `Content-Transfer-Encoding` header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentEncoding {
    /// No header, or one we don't understand. Treated like 7bit.
    Default,
    SevenBit,
    EightBit,
    Binary,
    Base64,
    QuotedPrintable,
    Uuencode,
}

impl Default for ContentEncoding {
    fn default() -> Self {
        ContentEncoding::Default
    }
}

impl ContentEncoding {
    /// Interpret a raw header value. Never fails; anything unrecognised is
    /// `Default`.
    pub fn parse(raw: &[u8]) -> Self {
        let trimmed = trim_ascii(raw);
        let known: &[(&[u8], ContentEncoding)] = &[
            (b"7bit", ContentEncoding::SevenBit),
            (b"7-bit", ContentEncoding::SevenBit),
            (b"8bit", ContentEncoding::EightBit),
            (b"8-bit", ContentEncoding::EightBit),
            (b"binary", ContentEncoding::Binary),
            (b"base64", ContentEncoding::Base64),
            (b"quoted-printable", ContentEncoding::QuotedPrintable),
            (b"uuencode", ContentEncoding::Uuencode),
            (b"x-uuencode", ContentEncoding::Uuencode),
            (b"x-uue", ContentEncoding::Uuencode),
        ];

        known
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(trimmed))
            .map(|&(_, enc)| enc)
            .unwrap_or(ContentEncoding::Default)
    }

    /// The canonical header value, or `None` for `Default`.
    pub fn name(self) -> Option<&'static str> {
        match self {
            ContentEncoding::Default => None,
            ContentEncoding::SevenBit => Some("7bit"),
            ContentEncoding::EightBit => Some("8bit"),
            ContentEncoding::Binary => Some("binary"),
            ContentEncoding::Base64 => Some("base64"),
            ContentEncoding::QuotedPrintable => Some("quoted-printable"),
            ContentEncoding::Uuencode => Some("x-uuencode"),
        }
    }

    /// Whether the body must be decoded to get at the actual content.
    pub fn is_encoded(self) -> bool {
        match self {
            ContentEncoding::Base64
            | ContentEncoding::QuotedPrintable
            | ContentEncoding::Uuencode => true,
            _ => false,
        }
    }
}

impl fmt::Display for ContentEncoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name().unwrap_or("7bit"))
    }
}

pub(crate) fn trim_ascii(mut s: &[u8]) -> &[u8] {
    while let Some((first, rest)) = s.split_first() {
        if !first.is_ascii_whitespace() {
            break;
        }
        s = rest;
    }
    while let Some((last, rest)) = s.split_last() {
        if !last.is_ascii_whitespace() {
            break;
        }
        s = rest;
    }
    s
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_encodings() {
        assert_eq!(ContentEncoding::Base64, ContentEncoding::parse(b" BASE64\r\n"));
        assert_eq!(
            ContentEncoding::QuotedPrintable,
            ContentEncoding::parse(b"Quoted-Printable")
        );
        assert_eq!(ContentEncoding::SevenBit, ContentEncoding::parse(b"7-bit"));
        assert_eq!(ContentEncoding::EightBit, ContentEncoding::parse(b"8bit"));
        assert_eq!(ContentEncoding::Binary, ContentEncoding::parse(b"binary"));
        assert_eq!(ContentEncoding::Uuencode, ContentEncoding::parse(b"x-uue"));
        assert_eq!(ContentEncoding::Default, ContentEncoding::parse(b"rot13"));
        assert_eq!(ContentEncoding::Default, ContentEncoding::parse(b""));
    }

    #[test]
    fn encoded_ness() {
        assert!(ContentEncoding::Base64.is_encoded());
        assert!(ContentEncoding::Uuencode.is_encoded());
        assert!(!ContentEncoding::EightBit.is_encoded());
        assert!(!ContentEncoding::Default.is_encoded());
        assert_eq!("7bit", ContentEncoding::Default.to_string());
    }
}
