//! # Peg-in use cases
//!
//! Each step of the peg-in lifecycle is a use case that wraps a
//! [`Context`]. Use cases are invoked independently, by the API layer or by
//! a watcher, and are safe to retry:
//!
//! 1. [`get_quote`] prices a peg-in and stores the quote.
//! 2. [`accept_quote`] locks liquidity for the quote and hands out the
//!    deposit address.
//! 3. [`call_for_user`] validates the deposit and performs the call on
//!    behalf of the user.
//! 4. [`register_pegin`] submits the deposit proof to get refunded.
//!
//! Errors returned before anything happens on chain leave the storage
//! untouched. Errors returned after a transaction was sent are flagged as
//! non recoverable, since the chain and the storage may now disagree.

pub mod accept_quote;
pub mod call_for_user;
pub mod collateral;
pub mod expired;
pub mod get_quote;
pub mod recommended;
pub mod register_pegin;
pub mod report;
pub mod status;

use crate::context::Context;
use crate::context::LpsEvent;
use crate::error::Error;
use crate::quote::PeginQuote;
use crate::rootstock::bridge::BridgeInteract;
use crate::wei::Wei;
use crate::CALL_FOR_USER_EXTRA_GAS;

/// Publish an event on the application channel. Nobody listening is not
/// an error for the publisher.
fn publish<C: Context>(context: &C, event: impl Into<LpsEvent>) {
    if let Err(error) = context.signal(event.into()) {
        tracing::debug!(%error, "event was not delivered");
    }
}

/// The liquidity the provider has to lock for a quote:
/// `(gas_limit + CALL_FOR_USER_EXTRA_GAS) * gas_price + value`.
pub fn required_liquidity(quote: &PeginQuote, gas_price: Wei) -> Result<Wei, Error> {
    let gas = Wei::new(quote.gas_limit as u64 + CALL_FOR_USER_EXTRA_GAS);
    gas.checked_mul(gas_price)?.checked_add(quote.value)
}

/// The DAO fee percentage, in whole percent, expressed in the fee scale.
pub fn scaled_dao_percentage(dao_percentage: u64, scale: u64) -> Result<Wei, Error> {
    Wei::new(dao_percentage).mul_div(Wei::new(scale), Wei::new(100))
}

/// Fail with [`Error::TxBelowMinimum`] when the amount is below the
/// smallest deposit the bridge accepts.
async fn validate_minimum_lock_value<B>(bridge: &B, value: Wei) -> Result<(), Error>
where
    B: BridgeInteract,
{
    let minimum = bridge.get_minimum_lock_tx_value().await?;
    if value < minimum {
        return Err(Error::TxBelowMinimum { value, minimum });
    }
    Ok(())
}
