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

//! The tree produced by the parser and consumed by the writer.

use super::content_type::ContentType;
use super::encoding::ContentEncoding;
use super::header::{HeaderList, HeaderRecord};
use super::openpgp::OpenPgpData;
use crate::filter::{BasicFilter, Filter};
use crate::stream::{ByteStream, MemStream};
use crate::support::error::Error;

/// The body of a leaf, still in its transfer encoding.
#[derive(Debug)]
pub struct DataWrapper {
    stream: Box<dyn ByteStream>,
    encoding: ContentEncoding,
}

impl DataWrapper {
    pub fn new(stream: Box<dyn ByteStream>, encoding: ContentEncoding) -> Self {
        DataWrapper { stream, encoding }
    }

    pub fn encoding(&self) -> ContentEncoding {
        self.encoding
    }

    pub fn stream(&self) -> &dyn ByteStream {
        &*self.stream
    }

    pub fn stream_mut(&mut self) -> &mut dyn ByteStream {
        &mut *self.stream
    }

    pub fn into_stream(self) -> Box<dyn ByteStream> {
        self.stream
    }

    /// The length of the encoded body, if the stream knows it.
    pub fn len(&self) -> Option<u64> {
        self.stream.length()
    }

    /// The body exactly as it appeared in the input.
    pub fn raw(&mut self) -> Result<Vec<u8>, Error> {
        self.stream.reset()?;
        let mut data = Vec::new();
        self.stream.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Write the decoded body to `sink`, returning the number of bytes
    /// written.
    pub fn decode_to(&mut self, sink: &mut dyn ByteStream) -> Result<u64, Error> {
        self.stream.reset()?;

        let mut decoder = Filter::new(BasicFilter::decoder(self.encoding));
        let mut buf = [0u8; 4096];
        let mut total = 0u64;
        loop {
            let nread = self.stream.read(&mut buf)?;
            let out = if 0 == nread {
                decoder.complete(&[])
            } else {
                decoder.filter(&buf[..nread])
            };

            sink.write_all(out)?;
            total += out.len() as u64;

            if 0 == nread {
                break;
            }
        }

        Ok(total)
    }

    pub fn decoded(&mut self) -> Result<Vec<u8>, Error> {
        let sink = MemStream::new();
        self.decode_to(&mut sink.clone())?;
        Ok(sink.to_vec())
    }
}

/// A part with actual content.
#[derive(Debug)]
pub struct Leaf {
    pub content_type: ContentType,
    pub headers: HeaderList,
    pub encoding: ContentEncoding,
    pub content: DataWrapper,
    pub openpgp: OpenPgpData,
}

impl Leaf {
    /// Build a leaf holding `data`, which is encoded with `encoding` here.
    ///
    /// Uuencoded content gets `begin` and `end` lines, using the `name`
    /// parameter of the content type as the file name.
    pub fn from_decoded(
        content_type: ContentType,
        data: &[u8],
        encoding: ContentEncoding,
    ) -> Self {
        let mut headers = HeaderList::new();
        headers.push(HeaderRecord::new(
            "Content-Type",
            &content_type.to_header_value(),
        ));
        if let Some(name) = encoding.name() {
            headers.push(HeaderRecord::new(
                "Content-Transfer-Encoding",
                name.as_bytes(),
            ));
        }

        let mut encoded = Vec::new();
        if ContentEncoding::Uuencode == encoding {
            encoded.extend_from_slice(b"begin 0644 ");
            encoded.extend_from_slice(
                content_type.param("name").unwrap_or(b"attachment"),
            );
            encoded.push(b'\n');
        }
        encoded.extend(Filter::new(BasicFilter::encoder(encoding)).filter_all(data));
        if ContentEncoding::Uuencode == encoding {
            encoded.extend_from_slice(b"end\n");
        }

        Leaf {
            content_type,
            headers,
            encoding,
            content: DataWrapper::new(
                Box::new(MemStream::from_bytes(encoded)),
                encoding,
            ),
            openpgp: OpenPgpData::None,
        }
    }
}

/// A `multipart/*` entity.
#[derive(Debug)]
pub struct Multipart {
    pub content_type: ContentType,
    pub headers: HeaderList,
    /// The boundary parameter. A multipart without one cannot have
    /// children; everything in its body is prologue.
    pub boundary: Option<Vec<u8>>,
    pub prologue: Option<Vec<u8>>,
    pub epilogue: Option<Vec<u8>>,
    pub children: Vec<PartNode>,
}

impl Multipart {
    /// An empty `multipart/<subtype>` delimited by `boundary`.
    pub fn new(subtype: &str, boundary: &[u8]) -> Self {
        let mut content_type = ContentType::new("multipart", subtype);
        content_type.set_param("boundary", boundary);

        let mut headers = HeaderList::new();
        headers.push(HeaderRecord::new(
            "Content-Type",
            &content_type.to_header_value(),
        ));

        Multipart {
            content_type,
            headers,
            boundary: Some(boundary.to_vec()),
            prologue: None,
            epilogue: None,
            children: Vec::new(),
        }
    }
}

/// An RFC 5322 message, either the outermost message of a parse or one
/// embedded as a `message/rfc822` part.
#[derive(Debug, Default)]
pub struct MessageWrapper {
    /// The type of the enclosing part for an embedded message; `None` for
    /// the outermost message.
    pub content_type: Option<ContentType>,
    /// Headers of the enclosing part for an embedded message. Always empty
    /// for the outermost message.
    pub part_headers: HeaderList,
    /// The message's own header block, less the `Content-*` fields which
    /// belong to `inner`.
    pub headers: HeaderList,
    /// An mbox-style `From ` line found before the headers.
    pub marker: Option<Vec<u8>>,
    pub inner: Option<Box<PartNode>>,
}

#[derive(Debug)]
pub enum PartNode {
    Leaf(Leaf),
    Multipart(Multipart),
    Message(MessageWrapper),
}

impl PartNode {
    /// The header block most directly describing this node.
    pub fn headers(&self) -> &HeaderList {
        match *self {
            PartNode::Leaf(ref leaf) => &leaf.headers,
            PartNode::Multipart(ref mp) => &mp.headers,
            PartNode::Message(ref msg) => {
                if msg.content_type.is_some() {
                    &msg.part_headers
                } else {
                    &msg.headers
                }
            }
        }
    }

    pub fn content_type(&self) -> Option<&ContentType> {
        match *self {
            PartNode::Leaf(ref leaf) => Some(&leaf.content_type),
            PartNode::Multipart(ref mp) => Some(&mp.content_type),
            PartNode::Message(ref msg) => msg.content_type.as_ref(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(*self, PartNode::Leaf(..))
    }

    pub fn is_multipart(&self) -> bool {
        matches!(*self, PartNode::Multipart(..))
    }

    pub fn is_message(&self) -> bool {
        matches!(*self, PartNode::Message(..))
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match *self {
            PartNode::Leaf(ref leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut Leaf> {
        match *self {
            PartNode::Leaf(ref mut leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn as_multipart(&self) -> Option<&Multipart> {
        match *self {
            PartNode::Multipart(ref mp) => Some(mp),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&MessageWrapper> {
        match *self {
            PartNode::Message(ref msg) => Some(msg),
            _ => None,
        }
    }

    /// The number of direct children: the parts of a multipart, or the body
    /// of a message.
    pub fn child_count(&self) -> usize {
        match *self {
            PartNode::Leaf(..) => 0,
            PartNode::Multipart(ref mp) => mp.children.len(),
            PartNode::Message(ref msg) => msg.inner.is_some() as usize,
        }
    }

    pub fn child(&self, ix: usize) -> Option<&PartNode> {
        match *self {
            PartNode::Leaf(..) => None,
            PartNode::Multipart(ref mp) => mp.children.get(ix),
            PartNode::Message(ref msg) => {
                msg.inner.as_deref().filter(|_| 0 == ix)
            }
        }
    }

    pub fn child_mut(&mut self, ix: usize) -> Option<&mut PartNode> {
        match *self {
            PartNode::Leaf(..) => None,
            PartNode::Multipart(ref mut mp) => mp.children.get_mut(ix),
            PartNode::Message(ref mut msg) => {
                msg.inner.as_deref_mut().filter(|_| 0 == ix)
            }
        }
    }
}

impl From<Leaf> for PartNode {
    fn from(leaf: Leaf) -> Self {
        PartNode::Leaf(leaf)
    }
}

impl From<Multipart> for PartNode {
    fn from(mp: Multipart) -> Self {
        PartNode::Multipart(mp)
    }
}

impl From<MessageWrapper> for PartNode {
    fn from(msg: MessageWrapper) -> Self {
        PartNode::Message(msg)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn leaf_from_decoded() {
        let mut leaf = Leaf::from_decoded(
            ContentType::new("application", "octet-stream"),
            b"hello",
            ContentEncoding::Base64,
        );
        assert_eq!(b"aGVsbG8=\n".to_vec(), leaf.content.raw().unwrap());
        assert_eq!(b"hello".to_vec(), leaf.content.decoded().unwrap());
        assert_eq!(Some(9), leaf.content.len());
        assert_eq!(
            b" base64\n".to_vec(),
            leaf.headers
                .get("content-transfer-encoding")
                .unwrap()
                .raw_value
        );
        // Reading again starts over
        assert_eq!(b"hello".to_vec(), leaf.content.decoded().unwrap());
    }

    #[test]
    fn uuencoded_leaf_has_begin_and_end() {
        let mut ct = ContentType::new("application", "octet-stream");
        ct.set_param("name", &b"cat.txt"[..]);
        let mut leaf =
            Leaf::from_decoded(ct, b"Cat", ContentEncoding::Uuencode);
        let raw = leaf.content.raw().unwrap();
        assert!(raw.starts_with(b"begin 0644 cat.txt\n"));
        assert!(raw.ends_with(b"`\nend\n"));
        assert_eq!(b"Cat".to_vec(), leaf.content.decoded().unwrap());
    }

    #[test]
    fn identity_encoding_has_no_cte_header() {
        let mut leaf = Leaf::from_decoded(
            ContentType::new("text", "plain"),
            b"hi\n",
            ContentEncoding::Default,
        );
        assert_eq!(1, leaf.headers.len());
        assert_eq!(b"hi\n".to_vec(), leaf.content.decoded().unwrap());
    }

    #[test]
    fn node_navigation() {
        let mut mp = Multipart::new("mixed", b"b");
        assert_eq!(Some(&b"b"[..]), mp.content_type.boundary());
        mp.children.push(
            Leaf::from_decoded(
                ContentType::new("text", "plain"),
                b"a",
                ContentEncoding::Default,
            )
            .into(),
        );
        let msg = PartNode::Message(MessageWrapper {
            inner: Some(Box::new(mp.into())),
            ..MessageWrapper::default()
        });

        assert_eq!(1, msg.child_count());
        assert!(msg.child(1).is_none());
        let body = msg.child(0).unwrap();
        assert!(body.is_multipart());
        assert_eq!(1, body.child_count());
        assert!(body.child(0).unwrap().is_leaf());
        assert!(body.content_type().unwrap().is("multipart", "mixed"));
        assert!(msg.content_type().is_none());
    }
}
