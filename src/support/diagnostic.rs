//-
// Copyright (c) 2022, Jason Lingle
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

//! Structured reports of recoverable problems found while parsing.

use std::fmt;
use std::rc::Rc;

use log::warn;

/// The kinds of malformed input the parser recovers from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    DuplicatedHeader,
    DuplicatedParameter,
    Unencoded8bitHeader,
    InvalidContentType,
    InvalidParameter,
    MalformedMultipart,
    TruncatedMessage,
    MalformedMessage,
    InvalidHeaderName,
    ConflictingHeader,
    ConflictingParameter,
    MultipartWithoutBoundary,
    NestingOverflow,
}

impl DiagnosticKind {
    pub fn name(self) -> &'static str {
        match self {
            DiagnosticKind::DuplicatedHeader => "duplicated-header",
            DiagnosticKind::DuplicatedParameter => "duplicated-parameter",
            DiagnosticKind::Unencoded8bitHeader => "unencoded-8bit-header",
            DiagnosticKind::InvalidContentType => "invalid-content-type",
            DiagnosticKind::InvalidParameter => "invalid-parameter",
            DiagnosticKind::MalformedMultipart => "malformed-multipart",
            DiagnosticKind::TruncatedMessage => "truncated-message",
            DiagnosticKind::MalformedMessage => "malformed-message",
            DiagnosticKind::InvalidHeaderName => "invalid-header-name",
            DiagnosticKind::ConflictingHeader => "conflicting-header",
            DiagnosticKind::ConflictingParameter => "conflicting-parameter",
            DiagnosticKind::MultipartWithoutBoundary => {
                "multipart-without-boundary"
            }
            DiagnosticKind::NestingOverflow => "nesting-overflow",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single recoverable problem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Stream offset of the offending input, if the stream is seekable.
    pub offset: Option<u64>,
    pub kind: DiagnosticKind,
    /// Free-form context, usually the offending header name or value.
    pub context: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.offset {
            Some(offset) => write!(f, "{} at {}", self.kind, offset)?,
            None => write!(f, "{}", self.kind)?,
        }

        if !self.context.is_empty() {
            write!(f, ": {}", self.context)?;
        }

        Ok(())
    }
}

/// The callback type registered through `ParserOptions`.
pub type WarningCallback = Rc<dyn Fn(&Diagnostic)>;

/// Logs diagnostics and forwards them to the registered callback, if any.
#[derive(Clone, Default)]
pub struct DiagnosticSink {
    callback: Option<WarningCallback>,
}

impl fmt::Debug for DiagnosticSink {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DiagnosticSink")
            .field("callback", &self.callback.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl DiagnosticSink {
    pub fn new(callback: Option<WarningCallback>) -> Self {
        DiagnosticSink { callback }
    }

    /// Whether anyone beyond the log is listening.
    pub fn is_registered(&self) -> bool {
        self.callback.is_some()
    }

    pub fn emit(
        &self,
        offset: Option<u64>,
        kind: DiagnosticKind,
        context: impl Into<String>,
    ) {
        let diagnostic = Diagnostic {
            offset,
            kind,
            context: context.into(),
        };
        warn!("{}", diagnostic);

        if let Some(ref callback) = self.callback {
            callback(&diagnostic);
        }
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;

    use super::*;

    #[test]
    fn display_forms() {
        let d = Diagnostic {
            offset: Some(42),
            kind: DiagnosticKind::ConflictingHeader,
            context: "Subject".to_owned(),
        };
        assert_eq!("conflicting-header at 42: Subject", d.to_string());

        let d = Diagnostic {
            offset: None,
            kind: DiagnosticKind::NestingOverflow,
            context: String::new(),
        };
        assert_eq!("nesting-overflow", d.to_string());
    }

    #[test]
    fn sink_forwards_in_order() {
        crate::init_test_log();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen2 = Rc::clone(&seen);
        let sink = DiagnosticSink::new(Some(Rc::new(move |d: &Diagnostic| {
            seen2.borrow_mut().push(d.kind)
        })));
        assert!(sink.is_registered());

        sink.emit(Some(1), DiagnosticKind::TruncatedMessage, "");
        sink.emit(None, DiagnosticKind::MalformedMultipart, "x");
        assert_eq!(
            vec![
                DiagnosticKind::TruncatedMessage,
                DiagnosticKind::MalformedMultipart
            ],
            *seen.borrow()
        );

        // No callback is fine too
        DiagnosticSink::default().emit(
            None,
            DiagnosticKind::MalformedMessage,
            "",
        );
    }
}
