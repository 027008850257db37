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

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::diagnostic::{DiagnosticSink, WarningCallback};
use super::error::Error;

/// The overall framing of the input handed to the parser.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// A single RFC 5322 message or MIME entity.
    Message,
    /// Messages concatenated with `From ` separator lines.
    Mbox,
    /// Messages delimited by lines of four `^A` bytes.
    Mmdf,
}

impl Default for InputFormat {
    fn default() -> Self {
        InputFormat::Message
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rfc2047Compliance {
    Loose,
    Strict,
}

impl Default for Rfc2047Compliance {
    fn default() -> Self {
        Rfc2047Compliance::Loose
    }
}

/// Configuration for a `Parser`.
///
/// Any subset of the fields can be written in TOML; see `from_toml`.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Charsets to try, in order, when a header value is not valid UTF-8.
    ///
    /// This only affects `HeaderRecord::decode_value`; body parsing never
    /// looks at charsets.
    pub fallback_charsets: Vec<String>,

    /// How strictly encoded-words in headers are to be interpreted by header
    /// decoders.
    pub rfc2047_compliance: Rfc2047Compliance,

    /// The framing of the input.
    pub format: InputFormat,

    /// If true and the input stream is seekable, leaf bodies are sliced out
    /// of the input as substreams instead of being copied into memory.
    pub persist_stream: bool,

    /// If true, the `Content-Length` header of mbox messages determines where
    /// each message ends.
    ///
    /// This has no effect for other formats.
    pub respect_content_length: bool,

    /// The deepest nesting of multiparts and embedded messages which is
    /// parsed structurally. Anything deeper is kept as opaque content.
    pub max_depth: usize,

    /// Receives every diagnostic, in the order found.
    #[serde(skip)]
    pub warning_callback: Option<WarningCallback>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            fallback_charsets: vec!["utf-8".to_owned(), "iso-8859-1".to_owned()],
            rfc2047_compliance: Rfc2047Compliance::default(),
            format: InputFormat::default(),
            persist_stream: true,
            respect_content_length: false,
            max_depth: 1024,
            warning_callback: None,
        }
    }
}

impl fmt::Debug for ParserOptions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ParserOptions")
            .field("fallback_charsets", &self.fallback_charsets)
            .field("rfc2047_compliance", &self.rfc2047_compliance)
            .field("format", &self.format)
            .field("persist_stream", &self.persist_stream)
            .field("respect_content_length", &self.respect_content_length)
            .field("max_depth", &self.max_depth)
            .field(
                "warning_callback",
                &self.warning_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl ParserOptions {
    pub fn from_toml(s: &str) -> Result<Self, Error> {
        Ok(toml::from_str(s)?)
    }

    pub fn with_warning_callback(
        mut self,
        callback: impl Fn(&super::diagnostic::Diagnostic) + 'static,
    ) -> Self {
        self.warning_callback = Some(std::rc::Rc::new(callback));
        self
    }

    pub(crate) fn diagnostic_sink(&self) -> DiagnosticSink {
        DiagnosticSink::new(self.warning_callback.clone())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NewlineStyle {
    Unix,
    Dos,
}

impl Default for NewlineStyle {
    fn default() -> Self {
        NewlineStyle::Unix
    }
}

/// Configuration for serialising a part tree.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FormatOptions {
    /// The line ending written on output.
    pub newline_style: NewlineStyle,

    /// Names of headers which are not written out, matched
    /// case-insensitively.
    pub hidden_headers: BTreeSet<String>,
}

impl FormatOptions {
    pub fn from_toml(s: &str) -> Result<Self, Error> {
        Ok(toml::from_str(s)?)
    }

    pub fn is_hidden(&self, name: &[u8]) -> bool {
        self.hidden_headers
            .iter()
            .any(|h| h.as_bytes().eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parser_options_from_toml() {
        let options = ParserOptions::from_toml(
            r#"
format = "mbox"
respect_content_length = true
fallback_charsets = ["windows-1252"]
"#,
        )
        .unwrap();

        assert_eq!(InputFormat::Mbox, options.format);
        assert!(options.respect_content_length);
        assert!(options.persist_stream);
        assert_eq!(1024, options.max_depth);
        assert_eq!(vec!["windows-1252".to_owned()], options.fallback_charsets);
        assert_eq!(Rfc2047Compliance::Loose, options.rfc2047_compliance);
    }

    #[test]
    fn parser_options_reject_unknown_format() {
        assert_matches!(
            Err(Error::Toml(..)),
            ParserOptions::from_toml("format = \"maildir\"")
        );
    }

    #[test]
    fn format_options_from_toml() {
        let options = FormatOptions::from_toml(
            r#"
newline_style = "dos"
hidden_headers = ["Bcc"]
"#,
        )
        .unwrap();

        assert_eq!(NewlineStyle::Dos, options.newline_style);
        assert!(options.is_hidden(b"bcc"));
        assert!(!options.is_hidden(b"To"));
    }
}
