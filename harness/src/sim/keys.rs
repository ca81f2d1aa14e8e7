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

//! Key material of the simulated device: seed derivation, hardened
//! ed25519 child keys, SS58 addresses and pre-hashed signing.

use ed25519_dalek::{ExpandedSecretKey, PublicKey, SecretKey};

use hmac::{Hmac, Mac, NewMac};

use sha2::Sha512;

use client::path::HARDENED;
use client::DerivationPath;

use crate::verify::{prehash_digest, RAW_SIGN_LIMIT};

type HmacSha512 = Hmac<Sha512>;

const SEED_ROUNDS: u32 = 2048;
const CURVE_KEY: &[u8] = b"ed25519 seed";

/// Main-network SS58 identifier.
const SS58_PREFIX: u8 = 0;
const SS58_CHECKSUM_PREAMBLE: &[u8] = b"SS58PRE";

/// 64-byte master seed from a mnemonic phrase, empty passphrase.
pub fn master_seed(phrase: &str) -> [u8; 64] {
    let mut seed = [0u8; 64];
    pbkdf2::pbkdf2::<HmacSha512>(phrase.as_bytes(), b"mnemonic", SEED_ROUNDS, &mut seed);
    seed
}

fn hmac_sha512(key: &[u8], data: &[u8]) -> [u8; 64] {
    let mut mac = HmacSha512::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);

    let mut out = [0u8; 64];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// Hardened-only ed25519 child derivation over the five path components.
/// The curve does not support public derivation, so every component is
/// forced hardened regardless of its marker bit.
pub fn derive_secret(seed: &[u8; 64], path: &DerivationPath) -> [u8; 32] {
    let mut node = hmac_sha512(CURVE_KEY, seed);
    for component in path.components() {
        let mut data = Vec::with_capacity(37);
        data.push(0x00);
        data.extend_from_slice(&node[..32]);
        data.extend_from_slice(&(component | HARDENED).to_be_bytes());
        node = hmac_sha512(&node[32..], &data);
    }

    let mut secret = [0u8; 32];
    secret.copy_from_slice(&node[..32]);
    secret
}

pub fn public_key(seed: &[u8; 64], path: &DerivationPath) -> [u8; 32] {
    let secret = derive_secret(seed, path);
    let secret = SecretKey::from_bytes(&secret).expect("32-byte ed25519 secret");
    PublicKey::from(&secret).to_bytes()
}

/// Sign the way the device does: ed25519 over the payload, pre-hashed when
/// it exceeds the direct-signing limit. The scheme tag is prepended by the
/// caller.
pub fn sign(seed: &[u8; 64], path: &DerivationPath, payload: &[u8]) -> [u8; 64] {
    let secret = derive_secret(seed, path);
    let secret = SecretKey::from_bytes(&secret).expect("32-byte ed25519 secret");
    let public = PublicKey::from(&secret);
    let expanded = ExpandedSecretKey::from(&secret);

    let signature = if payload.len() > RAW_SIGN_LIMIT {
        let digest = prehash_digest(payload).expect("digest of any payload");
        expanded.sign(&digest, &public)
    } else {
        expanded.sign(payload, &public)
    };
    signature.to_bytes()
}

/// SS58 text form of an account public key.
pub fn ss58_encode(public_key: &[u8; 32]) -> String {
    let mut payload = Vec::with_capacity(35);
    payload.push(SS58_PREFIX);
    payload.extend_from_slice(public_key);

    let mut preimage = Vec::with_capacity(SS58_CHECKSUM_PREAMBLE.len() + payload.len());
    preimage.extend_from_slice(SS58_CHECKSUM_PREAMBLE);
    preimage.extend_from_slice(&payload);
    let checksum = checksum(&preimage);
    payload.extend_from_slice(&checksum[..2]);

    bs58::encode(payload).into_string()
}

fn checksum(preimage: &[u8]) -> [u8; 64] {
    use blake2::{Blake2b, Digest};

    let mut hasher = Blake2b::new();
    hasher.update(preimage);

    let mut out = [0u8; 64];
    out.copy_from_slice(&hasher.finalize());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::verify::verify_signature;

    const PHRASE: &str = "equip will roof matter pink blind book anxiety banner elbow sun young";

    fn hardened_path() -> DerivationPath {
        DerivationPath::new(HARDENED, HARDENED, HARDENED)
    }

    #[test]
    fn ss58_known_account() {
        let mut public_key = [0u8; 32];
        hex::decode_to_slice(
            "e1b4d72d27b3e91b9b6116555b4ea17138ddc12ca7cdbab30e2e0509bd848419",
            &mut public_key,
        )
        .unwrap();

        assert_eq!(
            ss58_encode(&public_key),
            "166wVhuQsKFeb7bd1faydHgVvX1bZU2rUuY7FJmWApNz2fQY"
        );
    }

    #[test]
    fn derivation_is_deterministic() {
        let seed = master_seed(PHRASE);
        let path = hardened_path();

        assert_eq!(public_key(&seed, &path), public_key(&seed, &path));

        let sibling = DerivationPath::new(HARDENED, HARDENED, HARDENED | 1);
        assert_ne!(public_key(&seed, &path), public_key(&seed, &sibling));

        let other_seed = master_seed("abandon art");
        assert_ne!(public_key(&seed, &path), public_key(&other_seed, &path));
    }

    #[test]
    fn signatures_verify_under_the_derived_key() {
        let seed = master_seed(PHRASE);
        let path = hardened_path();
        let public = public_key(&seed, &path);

        for len in [0usize, 68, RAW_SIGN_LIMIT, RAW_SIGN_LIMIT + 1, 757] {
            let payload = vec![0x05u8; len];
            let mut tagged = vec![client::SIG_SCHEME_ED25519];
            tagged.extend_from_slice(&sign(&seed, &path, &payload));
            assert!(
                verify_signature(&tagged, &payload, &public).unwrap(),
                "payload of {} bytes",
                len
            );
        }
    }
}
