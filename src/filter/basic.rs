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

use super::base64::{Base64Decoder, Base64Encoder};
use super::quoted_printable::{QpDecoder, QpEncoder};
use super::uuencode::{UuDecoder, UuEncoder};
use super::{FilterStep, Output};
use crate::mime::encoding::ContentEncoding;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Encode,
    Decode,
}

#[derive(Clone, Debug)]
enum Codec {
    PassThrough,
    Base64Encode(Base64Encoder),
    Base64Decode(Base64Decoder),
    QpEncode(QpEncoder),
    QpDecode(QpDecoder),
    UuEncode(UuEncoder),
    UuDecode(UuDecoder),
}

/// Applies or removes a content transfer encoding.
///
/// The identity encodings (7bit, 8bit, binary) pass data through untouched.
#[derive(Clone, Debug)]
pub struct BasicFilter {
    encoding: ContentEncoding,
    direction: Direction,
    codec: Codec,
}

impl BasicFilter {
    pub fn new(encoding: ContentEncoding, direction: Direction) -> Self {
        let codec = match (encoding, direction) {
            (ContentEncoding::Base64, Direction::Encode) => {
                Codec::Base64Encode(Base64Encoder::new())
            }
            (ContentEncoding::Base64, Direction::Decode) => {
                Codec::Base64Decode(Base64Decoder::new())
            }
            (ContentEncoding::QuotedPrintable, Direction::Encode) => {
                Codec::QpEncode(QpEncoder::new())
            }
            (ContentEncoding::QuotedPrintable, Direction::Decode) => {
                Codec::QpDecode(QpDecoder::new())
            }
            (ContentEncoding::Uuencode, Direction::Encode) => {
                Codec::UuEncode(UuEncoder::new())
            }
            (ContentEncoding::Uuencode, Direction::Decode) => {
                Codec::UuDecode(UuDecoder::new())
            }
            _ => Codec::PassThrough,
        };

        BasicFilter {
            encoding,
            direction,
            codec,
        }
    }

    pub fn encoder(encoding: ContentEncoding) -> Self {
        BasicFilter::new(encoding, Direction::Encode)
    }

    pub fn decoder(encoding: ContentEncoding) -> Self {
        BasicFilter::new(encoding, Direction::Decode)
    }

    pub fn encoding(&self) -> ContentEncoding {
        self.encoding
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl FilterStep for BasicFilter {
    fn step(
        &mut self,
        input: &[u8],
        out: &mut Vec<u8>,
        backup: &mut Vec<u8>,
    ) -> Output {
        match self.codec {
            Codec::PassThrough => return Output::Input(input.len()),
            Codec::Base64Encode(ref mut c) => c.step(input, out),
            Codec::Base64Decode(ref mut c) => c.step(input, out),
            Codec::QpEncode(ref mut c) => c.step(input, out),
            Codec::QpDecode(ref mut c) => c.step(input, out),
            Codec::UuEncode(ref mut c) => c.step(input, out),
            Codec::UuDecode(ref mut c) => c.step(input, out, Some(backup)),
        }

        Output::Buffer
    }

    fn complete(&mut self, input: &[u8], out: &mut Vec<u8>) -> Output {
        match self.codec {
            Codec::PassThrough => return Output::Input(input.len()),
            Codec::Base64Encode(ref mut c) => {
                c.step(input, out);
                c.finish(out);
            }
            Codec::Base64Decode(ref mut c) => {
                c.step(input, out);
                c.finish(out);
            }
            Codec::QpEncode(ref mut c) => {
                c.step(input, out);
                c.finish(out);
            }
            Codec::QpDecode(ref mut c) => {
                c.step(input, out);
                c.finish(out);
            }
            Codec::UuEncode(ref mut c) => {
                c.step(input, out);
                c.finish(out);
            }
            Codec::UuDecode(ref mut c) => {
                c.step(input, out, None);
                c.finish(out);
            }
        }

        Output::Buffer
    }

    fn reset(&mut self) {
        match self.codec {
            Codec::PassThrough => (),
            Codec::Base64Encode(ref mut c) => c.reset(),
            Codec::Base64Decode(ref mut c) => c.reset(),
            Codec::QpEncode(ref mut c) => c.reset(),
            Codec::QpDecode(ref mut c) => c.reset(),
            Codec::UuEncode(ref mut c) => c.reset(),
            Codec::UuDecode(ref mut c) => c.reset(),
        }
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::super::test_support::*;
    use super::super::Filter;
    use super::*;

    const ALL_ENCODINGS: &[ContentEncoding] = &[
        ContentEncoding::Default,
        ContentEncoding::SevenBit,
        ContentEncoding::EightBit,
        ContentEncoding::Binary,
        ContentEncoding::Base64,
        ContentEncoding::QuotedPrintable,
        ContentEncoding::Uuencode,
    ];

    fn round_trip(encoding: ContentEncoding, data: &[u8]) -> Vec<u8> {
        let mut encoded =
            Filter::new(BasicFilter::encoder(encoding)).filter_all(data);
        if ContentEncoding::Uuencode == encoding {
            encoded.splice(0..0, b"begin 644 f\n".iter().copied());
            encoded.extend_from_slice(b"end\n");
        }
        Filter::new(BasicFilter::decoder(encoding)).filter_all(&encoded)
    }

    #[test]
    fn identity_encodings_pass_through() {
        let mut f = Filter::new(BasicFilter::decoder(ContentEncoding::Binary));
        assert_eq!(b"\x00\xff=\n", f.filter(b"\x00\xff=\n"));
        assert_eq!(b"", f.complete(b""));
    }

    #[test]
    fn decoders_chunking_transparent() {
        assert_chunking_transparent(
            || Filter::new(BasicFilter::decoder(ContentEncoding::Base64)),
            b"aGVs\r\nbG8g\nd29y bGQ=\naA==\n",
        );
        assert_chunking_transparent(
            || {
                Filter::new(BasicFilter::decoder(
                    ContentEncoding::QuotedPrintable,
                ))
            },
            b"caf=C3=A9 =\r\nau lait=\n=3D=3d=ZZ=\r=",
        );
        assert_chunking_transparent(
            || Filter::new(BasicFilter::decoder(ContentEncoding::Uuencode)),
            b"preamble\nbegin 644 cat\n#0V%T\n`\nend\n",
        );
    }

    #[test]
    fn encoders_chunking_transparent() {
        let data: Vec<u8> = (0..=255u8)
            .chain(b"From \n \n\r\n".iter().copied())
            .collect();
        for &encoding in ALL_ENCODINGS {
            assert_chunking_transparent(
                || Filter::new(BasicFilter::encoder(encoding)),
                &data,
            );
        }
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(
            data in prop::collection::vec(prop::num::u8::ANY, 0..300),
            ix in 0usize..7,
        ) {
            let encoding = ALL_ENCODINGS[ix];
            prop_assert_eq!(data.clone(), round_trip(encoding, &data));
        }

        #[test]
        fn decode_chunking_transparent(
            data in prop::collection::vec(prop::num::u8::ANY, 0..100),
            splits in prop::collection::vec(0usize..200, 0..6),
            ix in 0usize..7,
        ) {
            let encoding = ALL_ENCODINGS[ix];
            let mut encoded =
                Filter::new(BasicFilter::encoder(encoding)).filter_all(&data);
            if ContentEncoding::Uuencode == encoding {
                encoded.splice(0..0, b"begin 644 f\n".iter().copied());
            }

            let mut f = Filter::new(BasicFilter::decoder(encoding));
            prop_assert_eq!(data, run_split(&mut f, &encoded, &splits));
        }
    }
}
