//! Contains functionality for interacting with the Bitcoin blockchain

use std::collections::BTreeMap;
use std::future::Future;
use std::str::FromStr as _;

use bitcoin::address::NetworkUnchecked;
use bitcoin::AddressType;
use bitcoin::BlockHash;
use bitcoin::Txid;

use crate::error::Error;
use crate::wei::Wei;

/// Confirmation status and outputs of a Bitcoin transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitcoinTxInfo {
    pub txid: Txid,
    pub confirmations: u64,
    /// The amounts of the outputs of the transaction, grouped by the address
    /// they pay to.
    pub outputs: BTreeMap<String, Vec<Wei>>,
}

impl BitcoinTxInfo {
    /// The amounts paid to the given address.
    pub fn utxos_to_address(&self, address: &str) -> &[Wei] {
        self.outputs
            .get(address)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The total amount paid to the given address.
    pub fn amount_to_address(&self, address: &str) -> Result<Wei, Error> {
        Wei::sum(self.utxos_to_address(address))
    }
}

/// The block a Bitcoin transaction was included in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitcoinBlockInfo {
    pub hash: BlockHash,
    pub height: u64,
}

/// Represents the ability to interact with the bitcoin blockchain
#[cfg_attr(any(test, feature = "testing"), mockall::automock())]
pub trait BitcoinInteract {
    /// Validate that the address is a supported address of the configured
    /// network.
    fn validate_address(&self, address: &str) -> impl Future<Output = Result<(), Error>> + Send;

    /// Decode an address into the bytes the bridge expects.
    fn decode_address(&self, address: &str)
        -> impl Future<Output = Result<Vec<u8>, Error>> + Send;

    /// Get the confirmations and outputs of a transaction.
    fn get_transaction_info(
        &self,
        txid: &Txid,
    ) -> impl Future<Output = Result<BitcoinTxInfo, Error>> + Send;

    /// Get the block that includes a transaction.
    fn get_transaction_block_info(
        &self,
        txid: &Txid,
    ) -> impl Future<Output = Result<BitcoinBlockInfo, Error>> + Send;

    /// Get the consensus serialization of a transaction, without witness.
    fn get_raw_transaction(
        &self,
        txid: &Txid,
    ) -> impl Future<Output = Result<Vec<u8>, Error>> + Send;

    /// Get the serialized partial merkle tree that proves the inclusion of a
    /// transaction in its block.
    fn get_partial_merkle_tree(
        &self,
        txid: &Txid,
    ) -> impl Future<Output = Result<Vec<u8>, Error>> + Send;
}

/// Whether the address is a pay-to-script-hash address of the network.
pub fn is_p2sh_address(address: &str, network: bitcoin::Network) -> bool {
    bitcoin::Address::<NetworkUnchecked>::from_str(address)
        .ok()
        .and_then(|address| address.require_network(network).ok())
        .is_some_and(|address| address.address_type() == Some(AddressType::P2sh))
}
