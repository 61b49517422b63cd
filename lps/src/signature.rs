//! Ethereum style message signatures over quote hashes, and signed
//! records.
//!
//! Signatures are 65 bytes, `r || s || v`, where `v` is the recovery id
//! offset by 27. The signed digest is the EIP-191 personal message hash of
//! the 32-byte quote hash:
//!
//! ```text
//! keccak256("\x19Ethereum Signed Message:\n32" || hash)
//! ```

use alloy_primitives::keccak256;
use alloy_primitives::Address;
use alloy_primitives::B256;
use secp256k1::ecdsa::RecoverableSignature;
use secp256k1::ecdsa::RecoveryId;
use secp256k1::Message;
use secp256k1::PublicKey;
use secp256k1::SecretKey;
use secp256k1::SECP256K1;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::wei::Wei;

const PERSONAL_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// The length of a signature, including the recovery byte.
pub const SIGNATURE_LENGTH: usize = 65;

/// The EIP-191 personal message digest of a 32-byte hash.
pub fn personal_message_digest(hash: &[u8; 32]) -> B256 {
    let mut message = Vec::with_capacity(PERSONAL_MESSAGE_PREFIX.len() + hash.len());
    message.extend_from_slice(PERSONAL_MESSAGE_PREFIX);
    message.extend_from_slice(hash);
    keccak256(message)
}

/// The Rootstock address controlled by a public key.
pub fn public_key_address(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.serialize_uncompressed();
    let digest = keccak256(&uncompressed[1..]);
    Address::from_slice(&digest[12..])
}

/// Sign a 32-byte hash as a personal message.
pub fn sign_hash(secret_key: &SecretKey, hash: &[u8; 32]) -> [u8; SIGNATURE_LENGTH] {
    let digest = personal_message_digest(hash);
    let message = Message::from_digest(digest.0);
    let (recovery_id, compact) = SECP256K1
        .sign_ecdsa_recoverable(&message, secret_key)
        .serialize_compact();

    let mut signature = [0u8; SIGNATURE_LENGTH];
    signature[..64].copy_from_slice(&compact);
    signature[64] = recovery_id.to_i32() as u8 + 27;
    signature
}

/// Recover the address that signed the hash. A recovery byte of 27 or 28
/// is normalized to 0 or 1.
pub fn recover_signer(hash: &[u8; 32], signature: &[u8]) -> Result<Address, Error> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(Error::InvalidSignatureLength(signature.len()));
    }
    let mut v = signature[64];
    if v >= 27 {
        v -= 27;
    }
    let recovery_id = RecoveryId::from_i32(v as i32)?;
    let signature = RecoverableSignature::from_compact(&signature[..64], recovery_id)?;
    let digest = personal_message_digest(hash);
    let public_key = SECP256K1.recover_ecdsa(&Message::from_digest(digest.0), &signature)?;
    Ok(public_key_address(&public_key))
}

/// Recover the address that signed the hash, both given as hex strings.
pub fn recover_signer_hex(hash: &str, signature: &str) -> Result<Address, Error> {
    let hash = crate::quote::decode_quote_hash(hash)?;
    let signature = hex::decode(signature.trim_start_matches("0x"))?;
    recover_signer(&hash, &signature)
}

/// A record together with the hash of its JSON form and a signature over
/// that hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signed<T> {
    pub value: T,
    /// Hex encoded keccak256 of the JSON serialization of `value`.
    pub hash: String,
    /// Hex encoded signature over `hash`.
    pub signature: String,
}

impl<T: Serialize> Signed<T> {
    /// Hash and sign the value.
    pub fn new(value: T, secret_key: &SecretKey) -> Result<Self, Error> {
        let hash = keccak256(serde_json::to_vec(&value)?);
        let signature = sign_hash(secret_key, &hash.0);
        Ok(Self {
            value,
            hash: hex::encode(hash),
            signature: hex::encode(signature),
        })
    }

    /// Whether the stored hash still matches the value.
    pub fn check_integrity(&self) -> Result<bool, Error> {
        let hash = keccak256(serde_json::to_vec(&self.value)?);
        Ok(hex::encode(hash) == self.hash.trim_start_matches("0x"))
    }
}

/// An account allowed to lock liquidity up to the given caps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustedAccountDetails {
    pub address: Address,
    pub name: String,
    pub btc_locking_cap: Wei,
    pub rbtc_locking_cap: Wei,
}
