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
use std::fmt::Write as _;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tiny_keccak::{Hasher, Sha3};

use super::{FilterStep, Output};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChecksumKind {
    Md5,
    Sha1,
    Sha256,
    Sha3_256,
}

#[derive(Clone)]
enum Digester {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha3_256(Sha3),
}

impl Digester {
    fn new(kind: ChecksumKind) -> Self {
        match kind {
            ChecksumKind::Md5 => Digester::Md5(Md5::new()),
            ChecksumKind::Sha1 => Digester::Sha1(Sha1::new()),
            ChecksumKind::Sha256 => Digester::Sha256(Sha256::new()),
            ChecksumKind::Sha3_256 => Digester::Sha3_256(Sha3::v256()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match *self {
            Digester::Md5(ref mut d) => Digest::update(d, data),
            Digester::Sha1(ref mut d) => Digest::update(d, data),
            Digester::Sha256(ref mut d) => Digest::update(d, data),
            Digester::Sha3_256(ref mut d) => Hasher::update(d, data),
        }
    }

    fn digest(&self) -> Vec<u8> {
        match *self {
            Digester::Md5(ref d) => d.clone().finalize().to_vec(),
            Digester::Sha1(ref d) => d.clone().finalize().to_vec(),
            Digester::Sha256(ref d) => d.clone().finalize().to_vec(),
            Digester::Sha3_256(ref d) => {
                let mut out = vec![0u8; 32];
                d.clone().finalize(&mut out);
                out
            }
        }
    }
}

/// Passes data through untouched while computing a digest of it.
#[derive(Clone)]
pub struct ChecksumFilter {
    kind: ChecksumKind,
    digester: Digester,
}

impl fmt::Debug for ChecksumFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ChecksumFilter")
            .field("kind", &self.kind)
            .field("digester", &"<digester>")
            .finish()
    }
}

impl ChecksumFilter {
    pub fn new(kind: ChecksumKind) -> Self {
        ChecksumFilter {
            kind,
            digester: Digester::new(kind),
        }
    }

    pub fn kind(&self) -> ChecksumKind {
        self.kind
    }

    /// The digest of everything filtered so far.
    pub fn digest(&self) -> Vec<u8> {
        self.digester.digest()
    }

    /// `digest()` as lowercase hex.
    pub fn hex_digest(&self) -> String {
        let mut s = String::with_capacity(64);
        for b in self.digest() {
            let _ = write!(s, "{:02x}", b);
        }
        s
    }
}

impl FilterStep for ChecksumFilter {
    fn step(
        &mut self,
        input: &[u8],
        _out: &mut Vec<u8>,
        _backup: &mut Vec<u8>,
    ) -> Output {
        self.digester.update(input);
        Output::Input(input.len())
    }

    fn complete(&mut self, input: &[u8], _out: &mut Vec<u8>) -> Output {
        self.digester.update(input);
        Output::Input(input.len())
    }

    fn reset(&mut self) {
        self.digester = Digester::new(self.kind);
    }
}

#[cfg(test)]
mod test {
    use super::super::{Filter, FilterKind};
    use super::*;

    fn hex_of(kind: ChecksumKind, chunks: &[&[u8]]) -> String {
        let mut f = Filter::new(ChecksumFilter::new(kind));
        for chunk in chunks {
            assert_eq!(*chunk, f.filter(chunk));
        }
        f.complete(b"");

        match f.kind() {
            FilterKind::Checksum(c) => c.hex_digest(),
            k => panic!("unexpected filter {:?}", k),
        }
    }

    #[test]
    fn known_digests() {
        assert_eq!(
            "900150983cd24fb0d6963f7d28e17f72",
            hex_of(ChecksumKind::Md5, &[b"a", b"bc"])
        );
        assert_eq!(
            "a9993e364706816aba3e25717850c26c9cd0d89d",
            hex_of(ChecksumKind::Sha1, &[b"ab", b"c"])
        );
        assert_eq!(
            "ba7816bf8f01cfea414140de5dae2223\
             b00361a396177a9cb410ff61f20015ad",
            hex_of(ChecksumKind::Sha256, &[b"abc"])
        );
        assert_eq!(
            "3a985da74fe225b2045c172d6bd390bd\
             855f086e3e9d525b46bfe24511431532",
            hex_of(ChecksumKind::Sha3_256, &[b"", b"abc"])
        );
    }

    #[test]
    fn reset_starts_over() {
        let mut c = ChecksumFilter::new(ChecksumKind::Md5);
        let mut out = Vec::new();
        let mut backup = Vec::new();
        c.step(b"garbage", &mut out, &mut backup);
        c.reset();
        c.complete(b"abc", &mut out);
        assert_eq!("900150983cd24fb0d6963f7d28e17f72", c.hex_digest());
        assert_eq!(16, c.digest().len());
    }
}
