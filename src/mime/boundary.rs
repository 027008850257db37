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

//! The stack of delimiters active at the current point of a parse.

use log::debug;

pub(crate) const MBOX_MARKER: &[u8] = b"From ";
pub(crate) const MMDF_MARKER: &[u8] = b"\x01\x01\x01\x01";

/// How a line relates to the delimiters on the stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryMatch {
    /// Not a delimiter line.
    None,
    /// The input ran out.
    EndOfStream,
    /// `--boundary` of the innermost multipart.
    Immediate,
    /// `--boundary--` of the innermost multipart, or the innermost message
    /// separator.
    ImmediateEnd,
    /// `--boundary` of an enclosing multipart.
    Parent,
    /// `--boundary--` of an enclosing multipart, or an enclosing message
    /// separator.
    ParentEnd,
}

impl BoundaryMatch {
    /// Whether this ends the content of the current part.
    pub fn is_boundary(self) -> bool {
        BoundaryMatch::None != self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FrameKind {
    Mime,
    /// An mbox message. With Content-Length in effect, `content_end` is the
    /// offset at which the message ends no matter what the lines look like.
    Mbox { content_end: Option<u64> },
    Mmdf,
}

#[derive(Clone, Debug)]
struct Frame {
    kind: FrameKind,
    /// `--boundary`, or the separator marker.
    delimiter: Vec<u8>,
    final_len: usize,
    /// The longest `final_len` of this frame and everything beneath it.
    max_len: usize,
}

impl Frame {
    fn plain_len(&self) -> usize {
        self.delimiter.len()
    }

    /// Returns `Some(true)` for a final match, `Some(false)` for a plain one.
    fn matches(&self, line: &[u8], offset: u64) -> Option<bool> {
        match self.kind {
            FrameKind::Mime => {
                let rest = line.strip_prefix(&self.delimiter[..])?;
                if let Some(after) = rest.strip_prefix(b"--") {
                    if is_blank(after) {
                        return Some(true);
                    }
                }

                if is_blank(rest) {
                    Some(false)
                } else {
                    None
                }
            }

            FrameKind::Mbox {
                content_end: Some(end),
            } => {
                if offset >= end {
                    Some(true)
                } else {
                    None
                }
            }

            FrameKind::Mbox { content_end: None } | FrameKind::Mmdf => {
                if line.starts_with(&self.delimiter) {
                    Some(true)
                } else {
                    None
                }
            }
        }
    }
}

fn is_blank(s: &[u8]) -> bool {
    s.iter().all(|&b| b' ' == b || b'\t' == b)
}

#[derive(Clone, Debug, Default)]
pub struct BoundaryStack {
    frames: Vec<Frame>,
}

impl BoundaryStack {
    pub fn new() -> Self {
        BoundaryStack::default()
    }

    /// Push the delimiter for a multipart with the given `boundary`
    /// parameter.
    pub fn push(&mut self, boundary: &[u8]) {
        let mut delimiter = Vec::with_capacity(boundary.len() + 2);
        delimiter.extend_from_slice(b"--");
        delimiter.extend_from_slice(boundary);
        let final_len = delimiter.len() + 2;
        self.push_frame(FrameKind::Mime, delimiter, final_len);
    }

    /// Push an mbox message separator. If `content_end` is given, the message
    /// ends there instead of at the next `From ` line.
    pub fn push_mbox(&mut self, content_end: Option<u64>) {
        self.push_frame(
            FrameKind::Mbox { content_end },
            MBOX_MARKER.to_vec(),
            MBOX_MARKER.len(),
        );
    }

    pub fn push_mmdf(&mut self) {
        self.push_frame(
            FrameKind::Mmdf,
            MMDF_MARKER.to_vec(),
            MMDF_MARKER.len(),
        );
    }

    fn push_frame(
        &mut self,
        kind: FrameKind,
        delimiter: Vec<u8>,
        final_len: usize,
    ) {
        let max_len = self
            .frames
            .last()
            .map_or(final_len, |top| top.max_len.max(final_len));
        self.frames.push(Frame {
            kind,
            delimiter,
            final_len,
            max_len,
        });
    }

    /// Remove the innermost frame. Popping an empty stack does nothing.
    pub fn pop(&mut self) {
        if self.frames.pop().is_none() {
            debug!("Boundary stack underflow ignored");
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The length of the longest delimiter line on the stack, excluding
    /// trailing whitespace and line ending.
    pub fn max_len(&self) -> usize {
        self.frames.last().map_or(0, |top| top.max_len)
    }

    /// The plain and final delimiter lengths of the innermost frame.
    pub fn top_lens(&self) -> Option<(usize, usize)> {
        self.frames
            .last()
            .map(|top| (top.plain_len(), top.final_len))
    }

    /// Cheap pre-check: can `line` possibly be a delimiter line?
    fn possible(&self, line: &[u8]) -> bool {
        line.starts_with(b"--")
            || self.frames.iter().any(|f| match f.kind {
                FrameKind::Mime => false,
                FrameKind::Mbox {
                    content_end: Some(_),
                } => true,
                FrameKind::Mbox { content_end: None } | FrameKind::Mmdf => {
                    line.starts_with(&f.delimiter)
                }
            })
    }

    /// Classify the line starting at stream offset `offset`. `line` excludes
    /// the LF but may include a CR before it.
    pub fn classify(&self, line: &[u8], offset: u64) -> BoundaryMatch {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if !self.possible(line) {
            return BoundaryMatch::None;
        }

        let mut mbox_shadowed = false;
        for (ix, frame) in self.frames.iter().enumerate().rev() {
            let innermost = ix + 1 == self.frames.len();

            // With Content-Length, `From ` lines before the end aren't
            // separators for any enclosing mbox frame either
            if let FrameKind::Mbox {
                content_end: Some(end),
            } = frame.kind
            {
                if offset < end {
                    mbox_shadowed = true;
                    continue;
                }
            }
            if mbox_shadowed
                && matches!(frame.kind, FrameKind::Mbox { content_end: None })
            {
                continue;
            }

            match (frame.matches(line, offset), innermost) {
                (None, _) => continue,
                (Some(true), true) => return BoundaryMatch::ImmediateEnd,
                (Some(false), true) => return BoundaryMatch::Immediate,
                (Some(true), false) => return BoundaryMatch::ParentEnd,
                (Some(false), false) => return BoundaryMatch::Parent,
            }
        }

        BoundaryMatch::None
    }
}
