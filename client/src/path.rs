// Polkadot app acceptance tests and supporting software libraries
//
// Copyright (C) 2024 The polkadot-app-harness developers
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use serde::{Deserialize, Serialize};

/// High bit marking a hardened path component.
pub const HARDENED: u32 = 0x8000_0000;

const PURPOSE: u32 = 44 | HARDENED;
const COIN_TYPE: u32 = 354 | HARDENED;

/// Key path of the app: purpose and coin type are fixed, the remaining
/// three components come from the caller and may carry the hardened bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationPath {
    pub account: u32,
    pub change: u32,
    pub index: u32,
}

impl DerivationPath {
    pub fn new(account: u32, change: u32, index: u32) -> Self {
        DerivationPath {
            account,
            change,
            index,
        }
    }

    pub fn components(&self) -> [u32; 5] {
        [PURPOSE, COIN_TYPE, self.account, self.change, self.index]
    }

    /// Wire serialization: five little-endian words.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(20);
        for component in self.components() {
            out.extend_from_slice(&component.to_le_bytes());
        }
        out
    }

    /// Parse the wire form, checking the fixed purpose and coin type.
    pub fn from_wire(data: &[u8]) -> Option<Self> {
        if data.len() != 20 {
            return None;
        }
        let mut words = [0u32; 5];
        for (i, chunk) in data.chunks(4).enumerate() {
            words[i] = u32::from_le_bytes(chunk.try_into().ok()?);
        }
        if words[0] != PURPOSE || words[1] != COIN_TYPE {
            return None;
        }
        Some(DerivationPath {
            account: words[2],
            change: words[3],
            index: words[4],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_roundtrip() {
        let path = DerivationPath::new(HARDENED, HARDENED, HARDENED | 7);
        let wire = path.serialize();
        assert_eq!(wire.len(), 20);
        assert_eq!(DerivationPath::from_wire(&wire), Some(path));
    }

    #[test]
    fn rejects_foreign_purpose() {
        let mut wire = DerivationPath::new(0, 0, 0).serialize();
        wire[0] = 0x2D;
        assert_eq!(DerivationPath::from_wire(&wire), None);
        assert_eq!(DerivationPath::from_wire(&wire[..16]), None);
    }
}
