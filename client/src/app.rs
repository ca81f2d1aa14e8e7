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

use std::sync::Arc;

use crate::apdu::{ApduAnswer, ApduCommand, StatusWord};
use crate::path::DerivationPath;
use crate::transport::{Transport, TransportError};
use crate::{
    CLA, INS_GET_ADDRESS, INS_GET_VERSION, INS_SIGN, P1_SIGN_ADD, P1_SIGN_INIT, P1_SIGN_LAST,
    SIGN_CHUNK_SIZE,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionResponse {
    pub return_code: u16,
    pub error_message: String,
    pub test_mode: bool,
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressResponse {
    pub return_code: u16,
    pub error_message: String,
    /// Hex-encoded account public key.
    pub pub_key: String,
    /// SS58 account identifier.
    pub address: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignResponse {
    pub return_code: u16,
    pub error_message: String,
    /// Scheme tag followed by the signature proper. Empty unless the
    /// command succeeded.
    pub signature: Vec<u8>,
}

/// Client for the wallet app running on the device.
///
/// A non-success status word is not an `Err`: rejections and malformed
/// input are expected outcomes, reported through `return_code` and the
/// derived `error_message`.
pub struct WalletApp<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> WalletApp<T> {
    pub fn new(transport: Arc<T>) -> Self {
        WalletApp { transport }
    }

    pub async fn get_version(&self) -> Result<VersionResponse, TransportError> {
        let command = ApduCommand {
            cla: CLA,
            ins: INS_GET_VERSION,
            p1: 0,
            p2: 0,
            data: vec![],
        };
        let answer = self.transport.exchange(&command).await?;

        let status = answer.status();
        let mut response = VersionResponse {
            return_code: status.code(),
            error_message: status.message().to_string(),
            test_mode: false,
            major: 0,
            minor: 0,
            patch: 0,
        };
        if status == StatusWord::Success && answer.data.len() >= 4 {
            response.test_mode = answer.data[0] != 0;
            response.major = answer.data[1];
            response.minor = answer.data[2];
            response.patch = answer.data[3];
        }
        Ok(response)
    }

    pub async fn get_address(
        &self,
        path: DerivationPath,
        require_confirmation: bool,
    ) -> Result<AddressResponse, TransportError> {
        let command = ApduCommand {
            cla: CLA,
            ins: INS_GET_ADDRESS,
            p1: require_confirmation as u8,
            p2: 0,
            data: path.serialize(),
        };
        let answer = self.transport.exchange(&command).await?;

        let status = answer.status();
        let mut response = AddressResponse {
            return_code: status.code(),
            error_message: status.message().to_string(),
            pub_key: String::new(),
            address: String::new(),
        };
        if status == StatusWord::Success && answer.data.len() > 32 {
            response.pub_key = hex::encode(&answer.data[..32]);
            response.address = String::from_utf8_lossy(&answer.data[32..]).into_owned();
        }
        Ok(response)
    }

    /// Chunked signing: the first chunk carries the path, the payload
    /// follows in order, and the answer to the last chunk (produced once
    /// the user resolved the on-device review) carries the signature.
    pub async fn sign(
        &self,
        path: DerivationPath,
        payload: &[u8],
    ) -> Result<SignResponse, TransportError> {
        let init = ApduCommand {
            cla: CLA,
            ins: INS_SIGN,
            p1: P1_SIGN_INIT,
            p2: 0,
            data: path.serialize(),
        };
        let mut answer = self.transport.exchange(&init).await?;

        if answer.status() == StatusWord::Success {
            let chunks: Vec<&[u8]> = if payload.is_empty() {
                vec![&[]]
            } else {
                payload.chunks(SIGN_CHUNK_SIZE).collect()
            };
            let total = chunks.len();

            for (i, chunk) in chunks.into_iter().enumerate() {
                let p1 = if i + 1 == total { P1_SIGN_LAST } else { P1_SIGN_ADD };
                let command = ApduCommand {
                    cla: CLA,
                    ins: INS_SIGN,
                    p1,
                    p2: 0,
                    data: chunk.to_vec(),
                };
                answer = self.transport.exchange(&command).await?;
                if answer.status() != StatusWord::Success {
                    break;
                }
            }
        }

        Ok(sign_response(answer))
    }
}

fn sign_response(answer: ApduAnswer) -> SignResponse {
    let status = answer.status();
    SignResponse {
        return_code: status.code(),
        error_message: status.message().to_string(),
        signature: if status == StatusWord::Success {
            answer.data
        } else {
            vec![]
        },
    }
}
