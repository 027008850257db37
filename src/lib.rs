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


//! Crymime is a streaming, incremental MIME parser and encoder.
//!
//! A `Parser` reads a message (or an mbox/MMDF file of them) from any
//! `ByteStream` in a single forward pass and builds a tree of `PartNode`s.
//! Malformed input is tolerated wherever possible; each problem is reported
//! as a `Diagnostic` and parsing continues. Leaf bodies are left in their
//! transfer encoding and decoded on demand through the `filter` module, and
//! trees can be walked with `PartIter` and written back out.

#[cfg(test)]
macro_rules! assert_matches {
    ($expected:pat, $actual:expr) => {
        match $actual {
            $expected => (),
            unexpected => panic!(
                "Expected {} matches {}, got {:?}",
                stringify!($expected),
                stringify!($actual),
                unexpected
            ),
        }
    };
}

pub mod filter;
pub mod mime;
pub mod stream;
pub mod support;

#[cfg(test)]
mod test_data;

pub use crate::mime::{
    ContentType, HeaderList, HeaderRecord, Leaf, MessageWrapper, Multipart,
    PartIter, PartNode, Parser,
};
pub use crate::stream::ByteStream;
pub use crate::support::config::{FormatOptions, ParserOptions};
pub use crate::support::diagnostic::{Diagnostic, DiagnosticKind};
pub use crate::support::error::Error;

#[cfg(test)]
static INIT_TEST_LOG: std::sync::Once = std::sync::Once::new();

#[cfg(test)]
fn init_test_log() {
    use log4rs::append::console::{ConsoleAppender, Target};
    use log4rs::config::{Appender, Config, Root};
    use log4rs::encode::pattern::PatternEncoder;

    INIT_TEST_LOG.call_once(|| {
        let stderr = ConsoleAppender::builder()
            .target(Target::Stderr)
            .encoder(Box::new(PatternEncoder::new(
                "{d(%H:%M:%S%.3f)} [{l}][{t}] {m}{n}",
            )))
            .build();
        let config = Config::builder()
            .appender(Appender::builder().build("stderr", Box::new(stderr)))
            .build(
                Root::builder()
                    .appender("stderr")
                    .build(log::LevelFilter::Debug),
            )
            .unwrap();
        log4rs::init_config(config).unwrap();
    })
}
