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

//! Serialising part trees.
//!
//! Output is laid out so that parsing it again produces the same tree: the
//! line ending before a delimiter belongs to the delimiter, so one is always
//! written before each delimiter line except at the very start of a body.

use std::io;

use super::encoding::ContentEncoding;
use super::header::HeaderList;
use super::part::{Leaf, MessageWrapper, Multipart, PartNode};
use crate::filter::{CrlfFilter, Filter};
use crate::stream::{ByteStream, MemStream};
use crate::support::config::{FormatOptions, NewlineStyle};
use crate::support::error::Error;

enum Item<'a> {
    Node(&'a mut PartNode),
    Raw(Vec<u8>),
}

struct Emitter<'s> {
    out: &'s mut dyn ByteStream,
    crlf: Option<Filter>,
}

impl<'s> Emitter<'s> {
    fn new(out: &'s mut dyn ByteStream, style: NewlineStyle) -> Self {
        Emitter {
            out,
            crlf: match style {
                NewlineStyle::Unix => None,
                NewlineStyle::Dos => Some(Filter::new(CrlfFilter::encoder(false))),
            },
        }
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        match self.crlf {
            Some(ref mut crlf) => self.out.write_all(crlf.filter(data)),
            None => self.out.write_all(data),
        }
    }

    fn finish(mut self) -> io::Result<()> {
        if let Some(ref mut crlf) = self.crlf {
            self.out.write_all(crlf.complete(&[]))?;
        }
        self.out.flush()
    }
}

impl PartNode {
    /// Serialise this node and everything beneath it to `out`.
    pub fn write_to(
        &mut self,
        out: &mut dyn ByteStream,
        options: &FormatOptions,
    ) -> Result<(), Error> {
        let mut emitter = Emitter::new(out, options.newline_style);
        let mut stack = vec![Item::Node(self)];

        while let Some(item) = stack.pop() {
            match item {
                Item::Raw(data) => emitter.write(&data)?,
                Item::Node(PartNode::Leaf(leaf)) => {
                    write_leaf(&mut emitter, leaf, options)?
                }
                Item::Node(PartNode::Multipart(mp)) => {
                    write_multipart(&mut emitter, &mut stack, mp, options)?
                }
                Item::Node(PartNode::Message(msg)) => {
                    write_message(&mut emitter, &mut stack, msg, options)?
                }
            }
        }

        emitter.finish()?;
        Ok(())
    }

    pub fn to_bytes(&mut self, options: &FormatOptions) -> Result<Vec<u8>, Error> {
        let out = MemStream::new();
        self.write_to(&mut out.clone(), options)?;
        Ok(out.to_vec())
    }
}

fn write_headers(
    emitter: &mut Emitter<'_>,
    headers: &HeaderList,
    options: &FormatOptions,
) -> io::Result<()> {
    for header in headers {
        if options.is_hidden(&header.raw_name) {
            continue;
        }

        emitter.write(&header.raw_name)?;
        emitter.write(b":")?;
        emitter.write(&header.raw_value)?;
        if !header.raw_value.ends_with(b"\n") {
            emitter.write(b"\n")?;
        }
    }

    Ok(())
}

fn write_leaf(
    emitter: &mut Emitter<'_>,
    leaf: &mut Leaf,
    options: &FormatOptions,
) -> Result<(), Error> {
    write_headers(emitter, &leaf.headers, options)?;
    emitter.write(b"\n")?;

    if ContentEncoding::Uuencode == leaf.encoding {
        let body = leaf.content.raw()?;
        if body.starts_with(b"begin ") {
            emitter.write(&body)?;
        } else {
            emitter.write(b"begin 0644 ")?;
            emitter.write(
                leaf.content_type.param("name").unwrap_or(b"attachment"),
            )?;
            emitter.write(b"\n")?;
            emitter.write(&body)?;
            if !body.is_empty() && !body.ends_with(b"\n") {
                emitter.write(b"\n")?;
            }
            emitter.write(b"end\n")?;
        }
        return Ok(());
    }

    let stream = leaf.content.stream_mut();
    stream.reset()?;
    let mut buf = [0u8; 4096];
    loop {
        let nread = stream.read(&mut buf)?;
        if 0 == nread {
            break;
        }
        emitter.write(&buf[..nread])?;
    }

    Ok(())
}

fn write_multipart<'a>(
    emitter: &mut Emitter<'_>,
    stack: &mut Vec<Item<'a>>,
    mp: &'a mut Multipart,
    options: &FormatOptions,
) -> Result<(), Error> {
    let Multipart {
        ref headers,
        ref boundary,
        ref prologue,
        ref epilogue,
        ref mut children,
        ..
    } = *mp;

    write_headers(emitter, headers, options)?;
    emitter.write(b"\n")?;
    if let Some(ref prologue) = *prologue {
        emitter.write(prologue)?;
    }

    let boundary = match *boundary {
        Some(ref boundary) => boundary,
        // Without a boundary the prologue is the whole body
        None => return Ok(()),
    };

    let delimiter = |first: bool, last: bool| {
        let mut d = Vec::with_capacity(boundary.len() + 6);
        if !first {
            d.push(b'\n');
        }
        d.extend_from_slice(b"--");
        d.extend_from_slice(boundary);
        if last {
            d.extend_from_slice(b"--");
        }
        d.push(b'\n');
        d
    };

    let mut close = delimiter(children.is_empty() && prologue.is_none(), true);
    if let Some(ref epilogue) = *epilogue {
        close.extend_from_slice(epilogue);
    }
    stack.push(Item::Raw(close));

    for (ix, child) in children.iter_mut().enumerate().rev() {
        stack.push(Item::Node(child));
        stack.push(Item::Raw(delimiter(0 == ix && prologue.is_none(), false)));
    }
    Ok(())
}

fn write_message<'a>(
    emitter: &mut Emitter<'_>,
    stack: &mut Vec<Item<'a>>,
    msg: &'a mut MessageWrapper,
    options: &FormatOptions,
) -> Result<(), Error> {
    if msg.content_type.is_some() {
        write_headers(emitter, &msg.part_headers, options)?;
        emitter.write(b"\n")?;
    }

    if let Some(ref marker) = msg.marker {
        emitter.write(marker)?;
        emitter.write(b"\n")?;
    }

    // The message headers and the Content-* headers of the body form one
    // header block
    write_headers(emitter, &msg.headers, options)?;
    match msg.inner {
        Some(ref mut inner) => stack.push(Item::Node(&mut **inner)),
        None => emitter.write(b"\n")?,
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mime::content_type::ContentType;
    use crate::mime::header::HeaderRecord;
    use crate::mime::parser::Parser;
    use crate::mime::part::DataWrapper;
    use crate::support::config::ParserOptions;
    use crate::test_data;

    fn parse(input: &[u8]) -> PartNode {
        Parser::new(
            Box::new(MemStream::from_bytes(input)),
            ParserOptions::default(),
        )
        .construct_message()
        .unwrap()
    }

    fn parse_part(input: &[u8]) -> PartNode {
        Parser::new(
            Box::new(MemStream::from_bytes(input)),
            ParserOptions::default(),
        )
        .construct_part()
        .unwrap()
    }

    #[test]
    fn parsed_messages_are_reproduced() {
        for &input in &[test_data::SIMPLE_MULTIPART, test_data::PGP_SIGNED] {
            let written =
                parse(input).to_bytes(&FormatOptions::default()).unwrap();
            assert_eq!(
                String::from_utf8_lossy(input),
                String::from_utf8_lossy(&written)
            );
        }
    }

    #[test]
    fn prologue_epilogue_and_embedded_message() {
        let input: &[u8] = b"Subject: outer\n\
                             Content-Type: multipart/mixed; boundary=b\n\
                             \n\
                             prologue\n\
                             --b\n\
                             Content-Type: message/rfc822\n\
                             \n\
                             Subject: inner\n\
                             \n\
                             inner body\n\
                             --b--\n\
                             epilogue\n";
        let written = parse(input).to_bytes(&FormatOptions::default()).unwrap();
        assert_eq!(
            String::from_utf8_lossy(input),
            String::from_utf8_lossy(&written)
        );
    }

    #[test]
    fn multipart_without_boundary_keeps_body() {
        let input: &[u8] = b"Content-Type: multipart/mixed\n\n--x\nbody\n";
        let written = parse(input).to_bytes(&FormatOptions::default()).unwrap();
        assert_eq!(input, &written[..]);
    }

    #[test]
    fn dos_newlines_and_hidden_headers() {
        let mut leaf = PartNode::Leaf(Leaf::from_decoded(
            ContentType::new("text", "plain"),
            b"one\ntwo\r\n",
            ContentEncoding::Default,
        ));
        if let PartNode::Leaf(ref mut leaf) = leaf {
            leaf.headers.push(HeaderRecord::new("X-Secret", b"hunter2"));
        }

        let options = FormatOptions::from_toml(
            r#"
newline_style = "dos"
hidden_headers = ["x-secret"]
"#,
        )
        .unwrap();
        assert_eq!(
            b"Content-Type: text/plain\r\n\r\none\r\ntwo\r\n".to_vec(),
            leaf.to_bytes(&options).unwrap()
        );
    }

    #[test]
    fn bare_uuencode_body_gets_begin_and_end() {
        let mut ct = ContentType::new("application", "octet-stream");
        ct.set_param("name", &b"cat.txt"[..]);
        let mut leaf = PartNode::Leaf(Leaf {
            headers: HeaderList::new(),
            content_type: ct,
            encoding: ContentEncoding::Uuencode,
            content: DataWrapper::new(
                Box::new(MemStream::from_bytes(&b"#0V%T\n`\n"[..])),
                ContentEncoding::Uuencode,
            ),
            openpgp: Default::default(),
        });

        assert_eq!(
            b"\nbegin 0644 cat.txt\n#0V%T\n`\nend\n".to_vec(),
            leaf.to_bytes(&FormatOptions::default()).unwrap()
        );
    }

    fn build_tree(depth: usize, width: usize) -> PartNode {
        let mut mp = Multipart::new("mixed", format!("b{}", depth).as_bytes());
        for ix in 0..width {
            if depth > 1 && 0 == ix {
                mp.children.push(build_tree(depth - 1, width));
            } else {
                let encoding = if 0 == ix % 2 {
                    ContentEncoding::Base64
                } else {
                    ContentEncoding::QuotedPrintable
                };
                mp.children.push(
                    Leaf::from_decoded(
                        ContentType::new("text", "plain"),
                        format!("leaf {} at depth {}\n", ix, depth).as_bytes(),
                        encoding,
                    )
                    .into(),
                );
            }
        }

        mp.into()
    }

    fn shape(node: &mut PartNode, out: &mut Vec<(String, usize, Vec<u8>)>) {
        let ct = node.content_type().map(ToString::to_string);
        let count = node.child_count();
        let data = match *node {
            PartNode::Leaf(ref mut leaf) => leaf.content.raw().unwrap(),
            _ => Vec::new(),
        };
        out.push((ct.unwrap_or_default(), count, data));
        for ix in 0..count {
            shape(node.child_mut(ix).unwrap(), out);
        }
    }

    #[test]
    fn nesting_round_trip() {
        let mut tree = build_tree(12, 3);
        let written = tree.to_bytes(&FormatOptions::default()).unwrap();
        let mut reparsed = parse_part(&written);

        let mut expected = Vec::new();
        shape(&mut tree, &mut expected);
        let mut actual = Vec::new();
        shape(&mut reparsed, &mut actual);
        assert_eq!(expected, actual);

        // And the second generation is byte-identical
        assert_eq!(
            written,
            reparsed.to_bytes(&FormatOptions::default()).unwrap()
        );
    }
}
