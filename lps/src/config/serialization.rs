use alloy_primitives::Address;
use secp256k1::SecretKey;
use serde::Deserialize;
use serde::Deserializer;

use crate::rootstock::is_rsk_address;

use super::error::LpsConfigError;

/// A deserializer for the provider [`SecretKey`]. Returns an error if the
/// private key is not valid hex or is not the correct length. A `0x`
/// prefix is accepted.
pub fn private_key_deserializer<'de, D>(deserializer: D) -> Result<SecretKey, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.trim_start_matches("0x");

    if s.len() != 64 {
        return Err(serde::de::Error::custom(
            LpsConfigError::InvalidPrivateKeyLength(s.len()),
        ));
    }
    let bytes = hex::decode(s).map_err(|err| {
        serde::de::Error::custom(LpsConfigError::InvalidPrivateKey(err.to_string()))
    })?;
    SecretKey::from_slice(&bytes).map_err(|err| {
        serde::de::Error::custom(LpsConfigError::InvalidPrivateKey(err.to_string()))
    })
}

/// A deserializer for Rootstock addresses, which must be `0x` followed by
/// 40 hex characters.
pub fn rsk_address_deserializer<'de, D>(deserializer: D) -> Result<Address, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    if !is_rsk_address(&s) {
        return Err(serde::de::Error::custom(LpsConfigError::InvalidRskAddress(s)));
    }
    s.parse()
        .map_err(|_| serde::de::Error::custom(LpsConfigError::InvalidRskAddress(s.clone())))
}
