//! Contains functionality for interacting with the Rootstock network, its
//! bridge and the liquidity bridge contract.

use std::future::Future;

use alloy_primitives::Address;
use alloy_primitives::Bytes;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::wei::Wei;

pub mod bridge;
pub mod lbc;

/// The receipt of a mined Rootstock transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    /// Hex encoded transaction hash.
    pub tx_hash: String,
    pub gas_used: u64,
    pub gas_price: Wei,
}

/// Value and gas parameters of a contract call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionConfig {
    /// Value attached to the transaction.
    pub value: Wei,
    /// Gas limit of the transaction. When absent the client estimates it.
    pub gas_limit: Option<u64>,
}

impl TransactionConfig {
    /// A config with the given value and gas limit.
    pub fn new(value: Wei, gas_limit: u64) -> Self {
        Self { value, gas_limit: Some(gas_limit) }
    }
}

/// Represents the ability to query the Rootstock network through its RPC
/// interface.
#[cfg_attr(any(test, feature = "testing"), mockall::automock())]
pub trait RskInteract {
    /// Estimate the gas needed to send `value` with `data` to `to`.
    fn estimate_gas(
        &self,
        to: &Address,
        value: Wei,
        data: &Bytes,
    ) -> impl Future<Output = Result<u64, Error>> + Send;

    /// The current gas price.
    fn gas_price(&self) -> impl Future<Output = Result<Wei, Error>> + Send;

    /// The network balance of an account.
    fn get_balance(&self, address: &Address) -> impl Future<Output = Result<Wei, Error>> + Send;
}

/// Whether the string is a Rootstock address: `0x` followed by 40 hex
/// characters.
pub fn is_rsk_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(hex) => hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// Parse a Rootstock address, failing with
/// [`Error::RskAddressNotSupported`].
pub fn parse_rsk_address(address: &str) -> Result<Address, Error> {
    if !is_rsk_address(address) {
        return Err(Error::RskAddressNotSupported(address.to_string()));
    }
    address
        .parse()
        .map_err(|_| Error::RskAddressNotSupported(address.to_string()))
}
