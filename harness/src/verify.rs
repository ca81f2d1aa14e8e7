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

use std::convert::TryFrom;

use blake2::digest::{Update, VariableOutput};
use blake2::VarBlake2b;

use ed25519_dalek::{PublicKey, Signature, Verifier};

use crate::Error;

/// Longest message the signature scheme processes directly. Anything
/// larger is signed over its digest instead; a message of exactly this
/// length is still signed raw.
pub const RAW_SIGN_LIMIT: usize = 256;

/// Size of the pre-hash digest.
pub const DIGEST_LEN: usize = 32;

/// Digest used by the pre-hash rule.
pub fn prehash_digest(message: &[u8]) -> Result<[u8; DIGEST_LEN], Error> {
    let mut hasher = VarBlake2b::new(DIGEST_LEN).map_err(|_| "Invalid digest size")?;
    hasher.update(message);

    let mut out = [0u8; DIGEST_LEN];
    hasher.finalize_variable(|digest| out.copy_from_slice(digest));
    Ok(out)
}

/// Check a device signature against the message it approved.
///
/// The first signature byte is the scheme tag, not part of the signature
/// proper. Messages longer than [`RAW_SIGN_LIMIT`] bytes are verified
/// against their [`prehash_digest`].
pub fn verify_signature(signature: &[u8], message: &[u8], public_key: &[u8]) -> Result<bool, Error> {
    let (_scheme, signature) = signature.split_first().ok_or("Empty signature")?;

    let signature = match Signature::try_from(signature) {
        Ok(signature) => signature,
        Err(_) => return Ok(false),
    };
    let public_key = match PublicKey::from_bytes(public_key) {
        Ok(public_key) => public_key,
        Err(_) => return Ok(false),
    };

    let verified = if message.len() > RAW_SIGN_LIMIT {
        let digest = prehash_digest(message)?;
        public_key.verify(&digest, &signature).is_ok()
    } else {
        public_key.verify(message, &signature).is_ok()
    };
    Ok(verified)
}
