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

//! The `Content-Type` header, per RFC 2045 section 5.1.

use std::fmt;

use nom::{
    branch::alt,
    bytes::complete::{is_a, is_not, tag, take, take_while1},
    combinator::map,
    multi::{fold_many0, many0_count},
    sequence::{delimited, preceded, tuple},
    IResult,
};

use crate::support::diagnostic::{DiagnosticKind, DiagnosticSink};

/// A parameter of a `Content-Type`. The value is kept as raw bytes; RFC 2231
/// continuations and charsets are not interpreted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub value: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentType {
    /// Lower-case top-level type, e.g. `text`.
    pub media_type: String,
    /// Lower-case subtype, e.g. `plain`.
    pub subtype: String,
    pub params: Vec<Param>,
    /// Whether this came from a header rather than from the defaulting rules.
    pub existed_in_source: bool,
}

impl ContentType {
    pub fn new(media_type: &str, subtype: &str) -> Self {
        ContentType {
            media_type: media_type.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params: Vec::new(),
            existed_in_source: false,
        }
    }

    /// The type of a part without a `Content-Type` header: `text/plain`,
    /// except directly inside a `multipart/digest`, where it is
    /// `message/rfc822`.
    pub fn default_for(parent_is_digest: bool) -> Self {
        if parent_is_digest {
            ContentType::new("message", "rfc822")
        } else {
            ContentType::new("text", "plain")
        }
    }

    /// Case-insensitive match; either argument may be `*`.
    pub fn is(&self, media_type: &str, subtype: &str) -> bool {
        ("*" == media_type || self.media_type.eq_ignore_ascii_case(media_type))
            && ("*" == subtype || self.subtype.eq_ignore_ascii_case(subtype))
    }

    pub fn is_multipart(&self) -> bool {
        self.is("multipart", "*")
    }

    /// Whether this is one of the types whose content is a complete message.
    pub fn is_message(&self) -> bool {
        self.is("message", "rfc822")
            || self.is("message", "rfc2822")
            || self.is("message", "news")
            || self.is("message", "global")
    }

    pub fn param(&self, name: &str) -> Option<&[u8]> {
        self.params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| &p.value[..])
    }

    /// Set `name` to `value`, replacing any existing value.
    pub fn set_param(&mut self, name: &str, value: impl Into<Vec<u8>>) {
        let value = value.into();
        match self
            .params
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(name))
        {
            Some(p) => p.value = value,
            None => self.params.push(Param {
                name: name.to_owned(),
                value,
            }),
        }
    }

    /// The multipart `boundary` parameter, if present and non-empty.
    pub fn boundary(&self) -> Option<&[u8]> {
        self.param("boundary").filter(|b| !b.is_empty())
    }

    /// Parse a raw header value. Returns `None` if not even the
    /// `type/subtype` part is intelligible; problems with parameters are
    /// reported to `sink` and the offending parameters skipped.
    pub fn parse(
        raw: &[u8],
        offset: Option<u64>,
        sink: &DiagnosticSink,
    ) -> Option<Self> {
        let (mut rest, (media_type, subtype)) = media_type(raw).ok()?;
        let mut ct = ContentType::new(
            &String::from_utf8_lossy(media_type),
            &String::from_utf8_lossy(subtype),
        );
        ct.existed_in_source = true;

        // Anything between parameters which isn't a parameter is skipped
        while let Some(semi) = memchr::memchr(b';', rest) {
            rest = &rest[semi + 1..];
            if rest.iter().all(u8::is_ascii_whitespace) {
                break;
            }

            match parameter(rest) {
                Ok((tail, (name, value))) => {
                    ct.add_parsed_param(name, value, offset, sink);
                    rest = tail;
                }
                Err(_) => {
                    let end = memchr::memchr(b';', rest).unwrap_or(rest.len());
                    sink.emit(
                        offset,
                        DiagnosticKind::InvalidParameter,
                        String::from_utf8_lossy(&rest[..end]).trim(),
                    );
                }
            }
        }

        Some(ct)
    }

    fn add_parsed_param(
        &mut self,
        name: &[u8],
        value: Vec<u8>,
        offset: Option<u64>,
        sink: &DiagnosticSink,
    ) {
        let name = String::from_utf8_lossy(name).into_owned();
        match self.param(&name) {
            Some(existing) if existing == &value[..] => {
                sink.emit(offset, DiagnosticKind::DuplicatedParameter, name)
            }
            Some(_) => {
                sink.emit(offset, DiagnosticKind::ConflictingParameter, name)
            }
            None => self.params.push(Param { name, value }),
        }
    }

    /// Render as a header value, quoting parameter values as needed.
    pub fn to_header_value(&self) -> Vec<u8> {
        let mut out = format!("{}/{}", self.media_type, self.subtype)
            .into_bytes();
        for param in &self.params {
            out.extend_from_slice(b"; ");
            out.extend_from_slice(param.name.as_bytes());
            out.push(b'=');
            if !param.value.is_empty()
                && param.value.iter().copied().all(is_token_char)
            {
                out.extend_from_slice(&param.value);
            } else {
                out.push(b'"');
                for &b in &param.value {
                    if b'"' == b || b'\\' == b {
                        out.push(b'\\');
                    }
                    out.push(b);
                }
                out.push(b'"');
            }
        }
        out
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.media_type, self.subtype)
    }
}

// RFC 2045 5.1 "token": any CHAR except SPACE, CTLs, or tspecials.
// 8-bit bytes are tolerated since they are common in the wild.
fn is_token_char(b: u8) -> bool {
    match b {
        0..=b' ' | 127 => false,
        b'(' | b')' | b'<' | b'>' | b'@' | b',' | b';' | b':' | b'\\'
        | b'"' | b'/' | b'[' | b']' | b'?' | b'=' => false,
        _ => true,
    }
}

fn token(i: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(is_token_char)(i)
}

// Unquoted parameter values frequently contain tspecials like '/' or '?'.
// Accept anything up to the next delimiter.
fn loose_token(i: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(|b| match b {
        b';' | b'"' | b'(' | b' ' | b'\t' | b'\r' | b'\n' => false,
        _ => true,
    })(i)
}

fn quoted_pair(i: &[u8]) -> IResult<&[u8], &[u8]> {
    preceded(tag("\\"), take(1usize))(i)
}

// RFC 822 comment, which nests.
fn comment(i: &[u8]) -> IResult<&[u8], ()> {
    map(
        delimited(
            tag("("),
            many0_count(alt((
                map(is_not("()\\"), |_| ()),
                map(quoted_pair, |_| ()),
                comment,
            ))),
            tag(")"),
        ),
        |_| (),
    )(i)
}

// Comments or folding white space
fn cfws(i: &[u8]) -> IResult<&[u8], ()> {
    map(
        many0_count(alt((map(is_a(" \t\r\n"), |_| ()), comment))),
        |_| (),
    )(i)
}

fn quoted_string(i: &[u8]) -> IResult<&[u8], Vec<u8>> {
    delimited(
        tag("\""),
        fold_many0(
            alt((is_not("\"\\"), quoted_pair)),
            Vec::new(),
            |mut acc: Vec<u8>, piece: &[u8]| {
                // Unfold
                acc.extend(piece.iter().copied().filter(|&b| b != b'\r' && b != b'\n'));
                acc
            },
        ),
        tag("\""),
    )(i)
}

fn value(i: &[u8]) -> IResult<&[u8], Vec<u8>> {
    alt((quoted_string, map(loose_token, <[u8]>::to_vec)))(i)
}

fn parameter(i: &[u8]) -> IResult<&[u8], (&[u8], Vec<u8>)> {
    map(
        tuple((cfws, token, cfws, tag("="), cfws, value, cfws)),
        |(_, name, _, _, _, value, _)| (name, value),
    )(i)
}

fn media_type(i: &[u8]) -> IResult<&[u8], (&[u8], &[u8])> {
    map(
        tuple((cfws, token, cfws, tag("/"), cfws, token)),
        |(_, media_type, _, _, _, subtype)| (media_type, subtype),
    )(i)
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::support::diagnostic::Diagnostic;

    fn parse_collecting(
        raw: &str,
    ) -> (Option<ContentType>, Vec<DiagnosticKind>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen2 = Rc::clone(&seen);
        let sink = DiagnosticSink::new(Some(Rc::new(move |d: &Diagnostic| {
            seen2.borrow_mut().push(d.kind)
        })));
        let ct = ContentType::parse(raw.as_bytes(), Some(0), &sink);
        let seen = seen.borrow().clone();
        (ct, seen)
    }

    #[test]
    fn parse_simple() {
        let (ct, diags) =
            parse_collecting(" Multipart/Mixed; boundary=\"AA\"\r\n");
        let ct = ct.unwrap();
        assert!(diags.is_empty());
        assert_eq!("multipart", ct.media_type);
        assert_eq!("mixed", ct.subtype);
        assert_eq!(Some(&b"AA"[..]), ct.boundary());
        assert!(ct.existed_in_source);
        assert!(ct.is_multipart());
        assert!(ct.is("MULTIPART", "*"));
    }

    #[test]
    fn parse_comments_and_folding() {
        let (ct, diags) = parse_collecting(
            "text (a comment (nested)) / plain;\r\n\tcharset=us-ascii \
             (Plain text);\r\n name=\"foo \\\"bar\\\".txt\"",
        );
        let ct = ct.unwrap();
        assert!(diags.is_empty());
        assert!(ct.is("text", "plain"));
        assert_eq!(Some(&b"us-ascii"[..]), ct.param("CHARSET"));
        assert_eq!(Some(&b"foo \"bar\".txt"[..]), ct.param("name"));
    }

    #[test]
    fn parse_loose_values() {
        let (ct, diags) = parse_collecting(
            "application/octet-stream; name=a/b?c.bin; x-mac-type=\"\"",
        );
        let ct = ct.unwrap();
        assert!(diags.is_empty());
        assert_eq!(Some(&b"a/b?c.bin"[..]), ct.param("name"));
        assert_eq!(Some(&b""[..]), ct.param("x-mac-type"));
    }

    #[test]
    fn parse_failures() {
        assert_eq!(None, parse_collecting("text").0);
        assert_eq!(None, parse_collecting("text/").0);
        assert_eq!(None, parse_collecting("/plain").0);
        assert_eq!(None, parse_collecting("").0);
    }

    #[test]
    fn parameter_problems() {
        let (ct, diags) = parse_collecting(
            "text/plain; charset=utf-8; =bad; charset=utf-8; charset=latin1;",
        );
        let ct = ct.unwrap();
        assert_eq!(Some(&b"utf-8"[..]), ct.param("charset"));
        assert_eq!(
            vec![
                DiagnosticKind::InvalidParameter,
                DiagnosticKind::DuplicatedParameter,
                DiagnosticKind::ConflictingParameter,
            ],
            diags
        );
    }

    #[test]
    fn junk_after_subtype_is_skipped() {
        let (ct, _) = parse_collecting("text/html garbage; charset=x");
        let ct = ct.unwrap();
        assert!(ct.is("text", "html"));
        assert_eq!(Some(&b"x"[..]), ct.param("charset"));
    }

    #[test]
    fn empty_boundary_is_no_boundary() {
        let (ct, _) = parse_collecting("multipart/mixed; boundary=\"\"");
        assert_eq!(None, ct.unwrap().boundary());
    }

    #[test]
    fn defaults() {
        assert!(ContentType::default_for(false).is("text", "plain"));
        assert!(ContentType::default_for(true).is("message", "rfc822"));
        assert!(ContentType::default_for(true).is_message());
        assert!(!ContentType::default_for(true).existed_in_source);
    }

    #[test]
    fn header_value_round_trip() {
        let mut ct = ContentType::new("Multipart", "Mixed");
        ct.set_param("boundary", &b"=_a b"[..]);
        ct.set_param("charset", &b"utf-8"[..]);
        ct.set_param("title", &b"say \"hi\""[..]);
        let rendered = ct.to_header_value();
        assert_eq!(
            &b"multipart/mixed; boundary=\"=_a b\"; charset=utf-8; \
               title=\"say \\\"hi\\\"\""[..],
            &rendered[..]
        );

        let (parsed, diags) =
            parse_collecting(&String::from_utf8(rendered).unwrap());
        assert!(diags.is_empty());
        let mut parsed = parsed.unwrap();
        parsed.existed_in_source = false;
        assert_eq!(ct, parsed);
    }
}
