//! Capabilities of the liquidity provider that the use cases rely on.

use std::future::Future;

use alloy_primitives::Address;

use crate::config::PeginConfig;
use crate::error::Error;
use crate::wei::Wei;

pub mod local;

pub use local::LocalLiquidityProvider;

/// The provider's accounts and signing capability.
pub trait LiquidityProvider {
    /// The provider's Rootstock account.
    fn rsk_address(&self) -> Address;

    /// The Bitcoin address the provider is refunded to.
    fn btc_address(&self) -> String;

    /// Sign a hex encoded quote hash, returning the hex encoded signature.
    fn sign_quote(&self, quote_hash: &str) -> impl Future<Output = Result<String, Error>> + Send;

    /// The Bitcoin confirmations required for a deposit of the given value.
    fn bitcoin_confirmations_for_value(&self, value: Wei) -> u16;
}

/// The provider's peg-in limits and liquidity.
pub trait PeginLiquidityProvider {
    /// The peg-in quoting parameters.
    fn pegin_configuration(&self) -> PeginConfig;

    /// Succeeds when the provider can lock `amount` for a new peg-in, and
    /// fails with [`Error::NoLiquidity`] otherwise.
    fn has_pegin_liquidity(&self, amount: Wei) -> impl Future<Output = Result<(), Error>> + Send;

    /// The liquidity not yet locked by accepted quotes.
    fn available_pegin_liquidity(&self) -> impl Future<Output = Result<Wei, Error>> + Send;
}
