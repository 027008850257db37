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

//! The incremental MIME parser.
//!
//! The parser makes a single forward pass over its source. Header blocks are
//! scanned line by line; bodies are scanned for delimiter lines belonging to
//! any multipart (or mbox/MMDF message) currently open, and everything else
//! is passed to a sink. The tree is built without recursion so that
//! pathologically deep input cannot exhaust the stack.

use std::fmt;

use log::debug;
use regex::{Regex, RegexBuilder};

use super::boundary::{BoundaryMatch, BoundaryStack, MBOX_MARKER, MMDF_MARKER};
use super::content_type::ContentType;
use super::encoding::{trim_ascii, ContentEncoding};
use super::header::{field_name_len, HeaderList, HeaderRecord};
use super::openpgp::{OpenPgpData, OpenPgpTracker};
use super::part::{DataWrapper, Leaf, MessageWrapper, Multipart, PartNode};
use super::scan::{ScanBuffer, SCAN_CHUNK};
use crate::stream::{ByteStream, MemStream, NullStream};
use crate::support::config::{InputFormat, ParserOptions};
use crate::support::diagnostic::{DiagnosticKind, DiagnosticSink};
use crate::support::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParserState {
    Init,
    /// Looking for an mbox `From ` line.
    From,
    /// Looking for an MMDF separator.
    Mmdf,
    /// Scanning the header block of the outermost message or entity.
    MessageHeaders,
    /// Scanning the header block of a nested entity.
    Headers,
    HeadersEnd,
    Content,
    Complete,
    Error,
}

/// The result of scanning one body.
struct ContentScan {
    found: BoundaryMatch,
    written: u64,
    openpgp: OpenPgpData,
}

/// A container whose children are still being parsed.
enum Frame {
    Multipart(Multipart),
    Message(MessageWrapper),
}

/// The next thing for the tree builder to do.
enum Step {
    /// Build a part whose header block has been read.
    Start { headers: HeaderList, in_digest: bool },
    /// Continue a multipart, given how its last child (or prologue) ended.
    Resume(Multipart, BoundaryMatch),
    /// A node is complete; attach it to its container.
    Finish(PartNode, BoundaryMatch),
}

type HeaderCallback = Box<dyn FnMut(&HeaderRecord)>;

pub struct Parser {
    stream: Box<dyn ByteStream>,
    options: ParserOptions,
    sink: DiagnosticSink,
    header_regex: Option<(Regex, HeaderCallback)>,

    buf: ScanBuffer,
    /// Position of the source when parsing began, if seekable.
    base: Option<u64>,
    state: ParserState,
    bounds: BoundaryStack,

    mbox_marker: Option<Vec<u8>>,
    marker_offset: Option<u64>,
    headers_begin: Option<u64>,
    headers_end: Option<u64>,
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Parser")
            .field("stream", &self.stream)
            .field("options", &self.options)
            .field(
                "header_regex",
                &self.header_regex.as_ref().map(|&(ref re, _)| re.as_str()),
            )
            .field("state", &self.state)
            .field("offset", &self.offset())
            .finish()
    }
}

impl Parser {
    pub fn new(stream: Box<dyn ByteStream>, options: ParserOptions) -> Self {
        let base = stream.tell();
        let sink = options.diagnostic_sink();
        Parser {
            stream,
            options,
            sink,
            header_regex: None,
            buf: ScanBuffer::new(),
            base,
            state: ParserState::Init,
            bounds: BoundaryStack::new(),
            mbox_marker: None,
            marker_offset: None,
            headers_begin: None,
            headers_end: None,
        }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// The stream offset of the next unconsumed byte, if the source is
    /// seekable.
    pub fn tell(&self) -> Option<u64> {
        self.offset()
    }

    /// Whether the source has been consumed completely.
    pub fn eos(&self) -> bool {
        self.buf.is_exhausted()
    }

    /// The `From ` line which introduced the most recent mbox message,
    /// without its line ending.
    pub fn mbox_marker(&self) -> Option<&[u8]> {
        self.mbox_marker.as_deref()
    }

    /// The offset of the most recent mbox or MMDF separator line.
    pub fn mbox_marker_offset(&self) -> Option<u64> {
        self.marker_offset
    }

    /// The offset of the first header of the most recent outermost header
    /// block.
    pub fn headers_begin(&self) -> Option<u64> {
        self.headers_begin
    }

    /// The offset just past the blank line ending the most recent outermost
    /// header block.
    pub fn headers_end(&self) -> Option<u64> {
        self.headers_end
    }

    /// Arrange for `callback` to be called with every header whose name
    /// matches `pattern` (case-insensitively) as soon as it is scanned.
    pub fn set_header_regex(
        &mut self,
        pattern: &str,
        callback: impl FnMut(&HeaderRecord) + 'static,
    ) -> Result<(), Error> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        self.header_regex = Some((regex, Box::new(callback)));
        Ok(())
    }

    pub fn clear_header_regex(&mut self) {
        self.header_regex = None;
    }

    /// Parse the next message from the source.
    ///
    /// For mbox and MMDF input, each call consumes one message; call
    /// repeatedly until `eos()` to walk the whole file.
    pub fn construct_message(&mut self) -> Result<PartNode, Error> {
        self.guarded(Parser::message)
    }

    /// Parse a standalone MIME entity, which has no message-level headers.
    pub fn construct_part(&mut self) -> Result<PartNode, Error> {
        self.guarded(Parser::entity)
    }

    fn guarded(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<PartNode, Error>,
    ) -> Result<PartNode, Error> {
        if ParserState::Error == self.state {
            return Err(Error::ParserFailed);
        }

        let result = f(self);
        if result.is_err() {
            self.state = ParserState::Error;
        }
        result
    }

    fn message(&mut self) -> Result<PartNode, Error> {
        self.begin_top_level()?;

        self.state = ParserState::MessageHeaders;
        let (headers, marker) = self.scan_top_headers()?;
        self.apply_content_length(&headers);

        let (message_headers, content_headers) = headers.split_content();
        let (inner, found) = self.build(content_headers)?;
        self.end_top_level(found)?;

        Ok(PartNode::Message(MessageWrapper {
            content_type: None,
            part_headers: HeaderList::new(),
            headers: message_headers,
            marker,
            inner: Some(Box::new(inner)),
        }))
    }

    fn entity(&mut self) -> Result<PartNode, Error> {
        self.begin_top_level()?;

        self.state = ParserState::MessageHeaders;
        let (headers, _) = self.scan_top_headers()?;
        self.apply_content_length(&headers);

        let (node, found) = self.build(headers)?;
        self.end_top_level(found)?;
        Ok(node)
    }

    /// Find the separator which starts the next message, if the format has
    /// one, and open its frame.
    fn begin_top_level(&mut self) -> Result<(), Error> {
        self.headers_begin = None;
        self.headers_end = None;

        match self.options.format {
            InputFormat::Message => (),
            InputFormat::Mbox => {
                self.state = ParserState::From;
                self.find_marker(MBOX_MARKER)?;
                self.bounds.push_mbox(None);
            }
            InputFormat::Mmdf => {
                self.state = ParserState::Mmdf;
                self.find_marker(MMDF_MARKER)?;
                self.bounds.push_mmdf();
            }
        }

        Ok(())
    }

    fn end_top_level(&mut self, found: BoundaryMatch) -> Result<(), Error> {
        match self.options.format {
            InputFormat::Message => (),
            InputFormat::Mbox => self.bounds.pop(),
            InputFormat::Mmdf => {
                self.bounds.pop();
                // The separator after an MMDF message closes it, unlike mbox
                // where it opens the next one.
                if BoundaryMatch::ImmediateEnd == found {
                    self.skip_line()?;
                }
            }
        }

        debug_assert!(self.bounds.is_empty());
        // Find out whether anything follows so that eos() is accurate
        self.buf.next_line(&mut *self.stream)?;
        self.state = ParserState::Complete;
        Ok(())
    }

    fn find_marker(&mut self, marker: &[u8]) -> Result<(), Error> {
        loop {
            let (len, complete) = match self.buf.next_line(&mut *self.stream)? {
                Some(line) => line,
                None => return Err(Error::MarkerNotFound),
            };

            let line = &self.buf.data()[..len];
            if line.starts_with(marker) {
                self.marker_offset = self.offset();
                if MBOX_MARKER == marker {
                    let text = &line[..len - complete as usize];
                    self.mbox_marker =
                        Some(text.strip_suffix(b"\r").unwrap_or(text).to_vec());
                }
                self.buf.consume(len);
                return Ok(());
            }

            debug!("Skipping non-separator line at {:?}", self.offset());
            self.buf.consume(len);
        }
    }

    /// With `respect_content_length` in mbox mode, replace the open mbox
    /// frame with one which ends after the declared body length.
    fn apply_content_length(&mut self, headers: &HeaderList) {
        if InputFormat::Mbox != self.options.format
            || !self.options.respect_content_length
        {
            return;
        }

        let length = headers.get("content-length").and_then(|h| {
            std::str::from_utf8(&h.unfolded_value())
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
        });

        if let Some(length) = length {
            let end = self.logical_offset() + length;
            debug!("Content-Length {} puts end of message at {}", length, end);
            self.bounds.pop();
            self.bounds.push_mbox(Some(end));
        }
    }

    fn offset(&self) -> Option<u64> {
        self.base.map(|base| base + self.buf.consumed())
    }

    /// Like `offset()`, but counting from 0 when the source is not seekable.
    fn logical_offset(&self) -> u64 {
        self.base.unwrap_or(0) + self.buf.consumed()
    }

    fn skip_line(&mut self) -> Result<(), Error> {
        if let Some((len, _)) = self.buf.next_line(&mut *self.stream)? {
            self.buf.consume(len);
        }
        Ok(())
    }

    /// Classify the line at the current position without consuming it.
    fn peek_boundary(&mut self) -> Result<BoundaryMatch, Error> {
        match self.buf.next_line(&mut *self.stream)? {
            None => Ok(BoundaryMatch::EndOfStream),
            Some((len, complete)) => {
                let line = &self.buf.data()[..len - complete as usize];
                Ok(self.bounds.classify(line, self.logical_offset()))
            }
        }
    }

    fn scan_top_headers(
        &mut self,
    ) -> Result<(HeaderList, Option<Vec<u8>>), Error> {
        if self.buf.next_line(&mut *self.stream)?.is_none() {
            return Err(Error::EmptyInput);
        }

        self.headers_begin = self.offset();
        let result = self.scan_headers(true)?;
        self.headers_end = self.offset();
        Ok(result)
    }

    /// Scan a header block, leaving the position at the start of the body.
    ///
    /// Returns the headers and any mbox-style `From ` line found in place
    /// of the first header.
    fn scan_headers(
        &mut self,
        top_level: bool,
    ) -> Result<(HeaderList, Option<Vec<u8>>), Error> {
        let mut headers = HeaderList::new();
        let mut current: Option<HeaderRecord> = None;
        let mut preheader: Option<Vec<u8>> = None;

        self.state = if top_level {
            ParserState::MessageHeaders
        } else {
            ParserState::Headers
        };

        loop {
            let (len, complete) = match self.buf.next_line(&mut *self.stream)? {
                Some(line) => line,
                None => break,
            };
            let offset = self.offset();
            let logical_offset = self.logical_offset();
            let line = &self.buf.data()[..len];

            if complete && (b"\n" == line || b"\r\n" == line) {
                self.buf.consume(len);
                break;
            }

            let continuation = line.starts_with(b" ") || line.starts_with(b"\t");
            if let Some(cur) = current.as_mut().filter(|_| continuation) {
                cur.raw_value.extend_from_slice(line);
                self.buf.consume(len);
                if !complete {
                    self.sink.emit(
                        offset,
                        DiagnosticKind::TruncatedMessage,
                        "end of stream inside header",
                    );
                }
                continue;
            }

            // Anything else starts a new field, or ends the header block
            if let Some(record) = current.take() {
                Parser::accept_header(
                    &mut self.header_regex,
                    &self.sink,
                    &mut headers,
                    record,
                );
            }

            let unterminated = &line[..len - complete as usize];
            if self.bounds.classify(unterminated, logical_offset).is_boundary() {
                // A delimiter with no blank line before it; the body is
                // empty.
                break;
            }

            if let Some(name_len) = field_name_len(line) {
                current = Some(HeaderRecord::from_raw(
                    &line[..name_len],
                    &line[name_len + 1..],
                    offset,
                ));
                self.buf.consume(len);

                if !complete {
                    self.sink.emit(
                        offset,
                        DiagnosticKind::TruncatedMessage,
                        "end of stream inside header",
                    );
                }
                continue;
            }

            if !complete {
                if trim_ascii(line).is_empty() {
                    self.buf.consume(len);
                    break;
                }

                return Err(Error::TruncatedHeader { offset });
            }

            let context = String::from_utf8_lossy(trim_ascii(line)).into_owned();
            if top_level && headers.is_empty() {
                if preheader.is_none() && is_preheader(line) {
                    self.sink.emit(
                        offset,
                        DiagnosticKind::InvalidHeaderName,
                        context,
                    );
                    preheader = Some(trim_ascii(line).to_vec());
                    self.buf.consume(len);
                    continue;
                }

                return Err(Error::InvalidHeaderName { offset });
            }

            // Probably a body which isn't separated from the headers by a
            // blank line
            self.sink
                .emit(offset, DiagnosticKind::InvalidHeaderName, context);
            break;
        }

        if let Some(record) = current.take() {
            Parser::accept_header(
                &mut self.header_regex,
                &self.sink,
                &mut headers,
                record,
            );
        }

        self.state = ParserState::HeadersEnd;
        Ok((headers, preheader))
    }

    fn accept_header(
        header_regex: &mut Option<(Regex, HeaderCallback)>,
        sink: &DiagnosticSink,
        headers: &mut HeaderList,
        record: HeaderRecord,
    ) {
        if let Some((ref regex, ref mut callback)) = *header_regex {
            if regex.is_match(&record.normalized_name) {
                callback(&record);
            }
        }

        headers.push_checked(record, sink);
    }

    fn content_type_of(
        &self,
        headers: &HeaderList,
        in_digest: bool,
    ) -> ContentType {
        let header = match headers.get("content-type") {
            Some(header) => header,
            None => return ContentType::default_for(in_digest),
        };

        ContentType::parse(&header.raw_value, header.offset, &self.sink)
            .unwrap_or_else(|| {
                self.sink.emit(
                    header.offset,
                    DiagnosticKind::InvalidContentType,
                    String::from_utf8_lossy(trim_ascii(&header.raw_value)),
                );
                ContentType::default_for(in_digest)
            })
    }

    /// Build the part whose headers are `headers`, together with everything
    /// beneath it.
    fn build(
        &mut self,
        headers: HeaderList,
    ) -> Result<(PartNode, BoundaryMatch), Error> {
        let mut stack: Vec<Frame> = Vec::new();
        let mut step = Step::Start {
            headers,
            in_digest: false,
        };

        loop {
            step = match step {
                Step::Start { headers, in_digest } => {
                    self.start_part(&mut stack, headers, in_digest)?
                }

                Step::Resume(mp, found) => {
                    self.resume_multipart(&mut stack, mp, found)?
                }

                Step::Finish(node, found) => match stack.pop() {
                    None => return Ok((node, found)),
                    Some(Frame::Message(mut msg)) => {
                        msg.inner = Some(Box::new(node));
                        Step::Finish(PartNode::Message(msg), found)
                    }
                    Some(Frame::Multipart(mut mp)) => {
                        mp.children.push(node);
                        Step::Resume(mp, found)
                    }
                },
            };
        }
    }

    fn start_part(
        &mut self,
        stack: &mut Vec<Frame>,
        headers: HeaderList,
        in_digest: bool,
    ) -> Result<Step, Error> {
        let content_type = self.content_type_of(&headers, in_digest);
        let encoding = headers
            .get("content-transfer-encoding")
            .map(|h| ContentEncoding::parse(&h.raw_value))
            .unwrap_or_default();
        let too_deep = stack.len() >= self.options.max_depth;
        let ctype_offset = headers.get("content-type").and_then(|h| h.offset);

        if content_type.is_multipart() {
            let boundary = content_type.boundary().map(<[u8]>::to_vec);
            let mut mp = Multipart {
                content_type,
                headers,
                boundary: boundary.clone(),
                prologue: None,
                epilogue: None,
                children: Vec::new(),
            };

            match boundary {
                Some(ref boundary) if !too_deep => {
                    self.bounds.push(boundary);
                    let (prologue, found) = self.scan_to_memory()?;
                    mp.prologue = prologue;
                    Ok(Step::Resume(mp, found))
                }

                _ => {
                    if too_deep {
                        debug!("Nesting overflow at depth {}", stack.len());
                        self.sink.emit(
                            ctype_offset,
                            DiagnosticKind::NestingOverflow,
                            mp.content_type.to_string(),
                        );
                    } else {
                        self.sink.emit(
                            ctype_offset,
                            DiagnosticKind::MultipartWithoutBoundary,
                            mp.content_type.to_string(),
                        );
                    }

                    let (prologue, found) = self.scan_to_memory()?;
                    mp.prologue = prologue;
                    Ok(Step::Finish(PartNode::Multipart(mp), found))
                }
            }
        } else if content_type.is_message() && !encoding.is_encoded() {
            if too_deep {
                debug!("Nesting overflow at depth {}", stack.len());
                self.sink.emit(
                    ctype_offset,
                    DiagnosticKind::NestingOverflow,
                    content_type.to_string(),
                );
                return self.leaf(content_type, headers, encoding);
            }

            let offset = self.offset();
            let (inner_headers, marker) = self.scan_headers(false)?;
            if inner_headers.is_empty() {
                self.sink.emit(
                    offset,
                    DiagnosticKind::MalformedMessage,
                    content_type.to_string(),
                );
            }

            let (message_headers, content_headers) =
                inner_headers.split_content();
            stack.push(Frame::Message(MessageWrapper {
                content_type: Some(content_type),
                part_headers: headers,
                headers: message_headers,
                marker,
                inner: None,
            }));

            Ok(Step::Start {
                headers: content_headers,
                in_digest: false,
            })
        } else {
            self.leaf(content_type, headers, encoding)
        }
    }

    fn resume_multipart(
        &mut self,
        stack: &mut Vec<Frame>,
        mut mp: Multipart,
        found: BoundaryMatch,
    ) -> Result<Step, Error> {
        match found {
            BoundaryMatch::Immediate => {
                self.skip_line()?;
                let in_digest = mp.content_type.is("multipart", "digest");
                stack.push(Frame::Multipart(mp));
                let (headers, _) = self.scan_headers(false)?;
                Ok(Step::Start { headers, in_digest })
            }

            BoundaryMatch::ImmediateEnd => {
                self.skip_line()?;
                self.bounds.pop();
                let (epilogue, found) = self.scan_to_memory()?;
                mp.epilogue = epilogue;
                Ok(Step::Finish(PartNode::Multipart(mp), found))
            }

            BoundaryMatch::EndOfStream => {
                self.sink.emit(
                    self.offset(),
                    DiagnosticKind::TruncatedMessage,
                    "end of stream inside multipart",
                );
                self.bounds.pop();
                Ok(Step::Finish(
                    PartNode::Multipart(mp),
                    BoundaryMatch::EndOfStream,
                ))
            }

            BoundaryMatch::Parent
            | BoundaryMatch::ParentEnd
            | BoundaryMatch::None => {
                self.sink.emit(
                    mp.headers.get("content-type").and_then(|h| h.offset),
                    DiagnosticKind::MalformedMultipart,
                    mp.content_type.to_string(),
                );
                self.bounds.pop();
                // Whatever ended this multipart now needs to be judged
                // against what remains open
                let found = self.peek_boundary()?;
                Ok(Step::Finish(PartNode::Multipart(mp), found))
            }
        }
    }

    fn leaf(
        &mut self,
        content_type: ContentType,
        headers: HeaderList,
        encoding: ContentEncoding,
    ) -> Result<Step, Error> {
        let start = self.offset().filter(|_| self.options.persist_stream);

        let (stream, scan): (Box<dyn ByteStream>, ContentScan) = match start {
            Some(start) => {
                let scan = self.scan_content(&mut NullStream::new())?;
                let stream =
                    self.stream.substream(start, Some(start + scan.written))?;
                (stream, scan)
            }
            None => {
                let mut mem = MemStream::new();
                let scan = self.scan_content(&mut mem)?;
                mem.reset()?;
                (Box::new(mem), scan)
            }
        };

        Ok(Step::Finish(
            PartNode::Leaf(Leaf {
                content_type,
                headers,
                encoding,
                content: DataWrapper::new(stream, encoding),
                openpgp: scan.openpgp,
            }),
            scan.found,
        ))
    }

    /// Scan a prologue or epilogue.
    fn scan_to_memory(
        &mut self,
    ) -> Result<(Option<Vec<u8>>, BoundaryMatch), Error> {
        let mem = MemStream::new();
        let scan = self.scan_content(&mut mem.clone())?;
        let data = mem.to_vec();
        Ok((Some(data).filter(|d| !d.is_empty()), scan.found))
    }

    /// Pass body bytes to `sink` until a delimiter line or the end of the
    /// source. The delimiter line is left unconsumed, and the line ending
    /// before it is not part of the body.
    fn scan_content(
        &mut self,
        sink: &mut dyn ByteStream,
    ) -> Result<ContentScan, Error> {
        self.state = ParserState::Content;

        let mut pending_eol: &'static [u8] = b"";
        // Whether the start of the current line was already passed on
        let mut midline = false;
        let mut openpgp = OpenPgpTracker::default();
        let mut written = 0u64;
        let mut out = Vec::new();

        let found = loop {
            out.clear();
            let line_base = self.logical_offset();
            let data = self.buf.data();
            let mut pos = 0;
            let mut found = None;

            while let Some(nl) = memchr::memchr(b'\n', &data[pos..]) {
                let line = &data[pos..pos + nl];
                if !midline {
                    let m = self.bounds.classify(line, line_base + pos as u64);
                    if m.is_boundary() {
                        found = Some(m);
                        break;
                    }
                    openpgp.observe(line);
                }

                midline = false;
                let (content, eol) = split_eol(line);
                out.extend_from_slice(pending_eol);
                out.extend_from_slice(content);
                pending_eol = eol;
                pos += nl + 1;
            }

            let rest = &data[pos..];
            if found.is_none() && !rest.is_empty() {
                if self.buf.is_eof() {
                    let m = if midline {
                        BoundaryMatch::None
                    } else {
                        self.bounds.classify(rest, line_base + pos as u64)
                    };

                    if m.is_boundary() {
                        found = Some(m);
                    } else {
                        if !midline {
                            openpgp.observe(rest);
                        }
                        out.extend_from_slice(pending_eol);
                        out.extend_from_slice(rest);
                        pending_eol = b"";
                        pos += rest.len();
                    }
                } else if rest.len() >= SCAN_CHUNK.max(self.bounds.max_len() + 2)
                    && (midline
                        || !self
                            .bounds
                            .classify(rest, line_base + pos as u64)
                            .is_boundary())
                {
                    // Too long to be a delimiter (a delimiter padded with
                    // whitespace still classifies as one and waits for its
                    // LF). Hold back a trailing CR in case an LF follows.
                    let n = rest.len() - rest.ends_with(b"\r") as usize;
                    out.extend_from_slice(pending_eol);
                    out.extend_from_slice(&rest[..n]);
                    pending_eol = b"";
                    pos += n;
                    midline = true;
                }
            }

            let at_end =
                found.is_none() && self.buf.is_eof() && pos == data.len();
            sink.write_all(&out)?;
            written += out.len() as u64;
            self.buf.consume(pos);

            if let Some(found) = found {
                break found;
            }

            if at_end {
                sink.write_all(pending_eol)?;
                written += pending_eol.len() as u64;
                break BoundaryMatch::EndOfStream;
            }

            self.buf.fill(&mut *self.stream)?;
        };

        Ok(ContentScan {
            found,
            written,
            openpgp: openpgp.result(),
        })
    }
}

/// Split a line without its LF into its content and the line ending it had.
fn split_eol(line: &[u8]) -> (&[u8], &'static [u8]) {
    match line.strip_suffix(b"\r") {
        Some(content) => (content, b"\r\n"),
        None => (line, b"\n"),
    }
}

fn is_preheader(line: &[u8]) -> bool {
    line.starts_with(b"From ") || line.starts_with(b">From ")
}
