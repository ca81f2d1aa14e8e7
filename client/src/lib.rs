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

pub mod apdu;
pub mod app;
pub mod path;
pub mod transport;

pub use apdu::{ApduAnswer, ApduCommand, StatusWord};
pub use app::{AddressResponse, SignResponse, VersionResponse, WalletApp};
pub use path::DerivationPath;
pub use transport::{TcpTransport, Transport, TransportError};

/// Application class byte of the wallet app.
pub const CLA: u8 = 0x90;

pub const INS_GET_VERSION: u8 = 0x00;
pub const INS_GET_ADDRESS: u8 = 0x01;
pub const INS_SIGN: u8 = 0x02;

/// Chunk position markers for the chunked sign protocol.
pub const P1_SIGN_INIT: u8 = 0x00;
pub const P1_SIGN_ADD: u8 = 0x01;
pub const P1_SIGN_LAST: u8 = 0x02;

/// Largest payload carried by a single sign chunk.
pub const SIGN_CHUNK_SIZE: usize = 250;

/// Leading byte of every signature reply: the signature scheme tag.
pub const SIG_SCHEME_ED25519: u8 = 0x00;
