//! The liquidity bridge contract (LBC) that settles peg-ins between the
//! provider and the user.

use std::future::Future;

use alloy_primitives::Address;

use crate::error::Error;
use crate::quote::PeginQuote;
use crate::rootstock::TransactionConfig;
use crate::rootstock::TransactionReceipt;
use crate::wei::Wei;

/// The proof of a Bitcoin deposit submitted to the LBC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterPeginParams {
    /// The provider signature over the quote hash.
    pub quote_signature: Vec<u8>,
    /// The serialized deposit transaction.
    pub bitcoin_raw_transaction: Vec<u8>,
    /// The serialized partial merkle tree of the deposit block.
    pub partial_merkle_tree: Vec<u8>,
    pub block_height: u64,
    pub quote: PeginQuote,
}

/// Represents the ability to interact with the liquidity bridge contract.
///
/// Methods that send a transaction fail with [`Error::ContractReverted`]
/// when the contract rejects it. The error carries the receipt when the
/// transaction was mined.
#[cfg_attr(any(test, feature = "testing"), mockall::automock())]
pub trait LbcInteract {
    /// The address of the contract.
    fn address(&self) -> Address;

    /// The hash of a quote as computed by the contract, hex encoded.
    fn hash_pegin_quote(&self, quote: &PeginQuote)
        -> impl Future<Output = Result<String, Error>> + Send;

    /// Perform the call on behalf of the user.
    fn call_for_user(
        &self,
        config: TransactionConfig,
        quote: &PeginQuote,
    ) -> impl Future<Output = Result<TransactionReceipt, Error>> + Send;

    /// Submit the proof of the user deposit.
    fn register_pegin(
        &self,
        params: RegisterPeginParams,
    ) -> impl Future<Output = Result<TransactionReceipt, Error>> + Send;

    /// The peg-in collateral of a provider.
    fn get_collateral(&self, address: &Address)
        -> impl Future<Output = Result<Wei, Error>> + Send;

    /// The collateral every provider has to hold.
    fn get_minimum_collateral(&self) -> impl Future<Output = Result<Wei, Error>> + Send;

    /// Add peg-in collateral from the provider wallet.
    fn add_collateral(&self, amount: Wei) -> impl Future<Output = Result<(), Error>> + Send;

    /// Withdraw the provider's peg-in collateral.
    fn withdraw_collateral(&self) -> impl Future<Output = Result<(), Error>> + Send;

    /// The balance an account holds inside the contract.
    fn get_balance(&self, address: &Address) -> impl Future<Output = Result<Wei, Error>> + Send;
}
