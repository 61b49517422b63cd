//! The Rootstock bridge, the native contract that holds the federation
//! funds and validates peg-in deposits.

use std::future::Future;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::wei::Wei;

/// The active federation as reported by the bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationInfo {
    pub fed_size: i64,
    pub fed_threshold: i64,
    pub pub_keys: Vec<String>,
    pub fed_address: String,
    pub active_fed_block_height: i64,
    pub iris_activation_height: i64,
    pub erp_keys: Vec<String>,
}

/// Inputs to the derivation of a quote specific deposit address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlyoverDerivationArgs {
    pub fed_info: FederationInfo,
    /// The LBC address bytes, without the `0x` prefix.
    pub lbc_address: Vec<u8>,
    /// The decoded user refund address.
    pub user_btc_refund_address: Vec<u8>,
    /// The decoded provider Bitcoin address.
    pub lp_btc_address: Vec<u8>,
    pub quote_hash: [u8; 32],
}

/// A derived deposit address and the script that unlocks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlyoverDerivation {
    pub address: String,
    pub redeem_script: String,
}

/// Represents the ability to query the Rootstock bridge.
#[cfg_attr(any(test, feature = "testing"), mockall::automock())]
pub trait BridgeInteract {
    /// The active federation.
    fn fetch_federation_info(&self) -> impl Future<Output = Result<FederationInfo, Error>> + Send;

    /// Derive the deposit address bound to a quote.
    fn get_flyover_derivation_address(
        &self,
        args: FlyoverDerivationArgs,
    ) -> impl Future<Output = Result<FlyoverDerivation, Error>> + Send;

    /// The current federation Bitcoin address.
    fn get_fed_address(&self) -> impl Future<Output = Result<String, Error>> + Send;

    /// The smallest deposit the bridge accepts.
    fn get_minimum_lock_tx_value(&self) -> impl Future<Output = Result<Wei, Error>> + Send;

    /// Bitcoin confirmations the bridge requires before it accepts a
    /// deposit proof.
    fn get_required_tx_confirmations(&self) -> impl Future<Output = Result<u64, Error>> + Send;

    /// The DAO fee, in whole percent of the peg-in value.
    fn dao_fee_percentage(&self) -> impl Future<Output = Result<u64, Error>> + Send;
}
