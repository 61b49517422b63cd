//! Performing the call on behalf of the user.
//!
//! Once the user's deposit is confirmed, the provider funds the call the
//! user asked for out of its own liquidity. This is the first step that
//! moves funds on chain, so every error after the call is attempted leaves
//! the retained quote in a terminal state and is reported as non
//! recoverable.

use time::OffsetDateTime;

use crate::bitcoin::BitcoinInteract as _;
use crate::context::CallForUserCompletedEvent;
use crate::context::Context;
use crate::error::Error;
use crate::error::ErrorArgs;
use crate::error::UseCaseId;
use crate::provider::LiquidityProvider as _;
use crate::quote::PeginQuote;
use crate::quote::PeginState;
use crate::quote::RetainedPeginQuote;
use crate::rootstock::lbc::LbcInteract as _;
use crate::rootstock::RskInteract as _;
use crate::rootstock::TransactionConfig;
use crate::storage::DbRead as _;
use crate::storage::DbWrite as _;
use crate::wei::Wei;
use crate::CALL_FOR_USER_EXTRA_GAS;

use super::publish;

/// Calls the user's destination contract once their deposit is confirmed.
#[derive(Debug, Clone)]
pub struct CallForUserUseCase<C> {
    context: C,
}

impl<C: Context> CallForUserUseCase<C> {
    pub fn new(context: C) -> Self {
        Self { context }
    }

    /// Validate the deposit of the retained quote and perform the call,
    /// returning the updated retained quote.
    #[tracing::instrument(skip_all, fields(quote_hash = %retained.quote_hash))]
    pub async fn run(&self, retained: RetainedPeginQuote) -> Result<RetainedPeginQuote, Error> {
        let args = ErrorArgs::new().with("quoteHash", &retained.quote_hash);
        self.call_for_user(retained)
            .await
            .map_err(|error| error.or_in_use_case_with(UseCaseId::CallForUser, args))
    }

    async fn call_for_user(
        &self,
        mut retained: RetainedPeginQuote,
    ) -> Result<RetainedPeginQuote, Error> {
        if retained.state != PeginState::WaitingForDepositConfirmations {
            return Err(Error::WrongState(retained.state));
        }
        let user_btc_tx_hash = retained
            .user_btc_tx_hash
            .ok_or(Error::IllegalQuoteState("no user bitcoin transaction"))?;

        let storage = self.context.get_storage_mut();
        let quote = storage
            .get_pegin_quote(&retained.quote_hash)
            .await?
            .ok_or(Error::QuoteNotFound)?;
        if quote.is_expired() {
            return Err(Error::ExpiredQuote);
        }

        let tx_info = self
            .context
            .get_bitcoin_client()
            .get_transaction_info(&user_btc_tx_hash)
            .await?;
        if tx_info.confirmations < quote.confirmations as u64 {
            return Err(Error::NoEnoughConfirmations {
                actual: tx_info.confirmations,
                required: quote.confirmations as u64,
            });
        }

        let required = quote.total()?;
        let sent = tx_info.amount_to_address(&retained.deposit_address)?;
        if sent < required {
            let error = Error::InsufficientAmount { sent, required };
            tracing::warn!(%sent, %required, "deposit does not cover the quote");

            retained.transition_to(PeginState::CallForUserFailed)?;
            self.publish(&quote, &retained, Some(&error));
            if let Err(write_error) = storage.update_retained_pegin_quote(&retained).await {
                return Err(Error::NonRecoverable(vec![error, write_error]));
            }
            return Err(error);
        }

        // Held until the outcome is stored, so a concurrent or stale run
        // sees the quote already settled.
        let guard = self.context.rsk_wallet_lock().acquire().await;
        let mut retained = storage
            .get_retained_pegin_quote(&retained.quote_hash)
            .await?
            .ok_or(Error::QuoteNotAccepted)?;
        if retained.state != PeginState::WaitingForDepositConfirmations {
            tracing::debug!(state = %retained.state, "call for user already performed");
            return Err(Error::WrongState(retained.state));
        }

        let value_to_send = self.value_to_send(&quote).await?;
        let config = TransactionConfig::new(
            value_to_send,
            quote.gas_limit as u64 + CALL_FOR_USER_EXTRA_GAS,
        );
        let result = self.context.get_lbc().call_for_user(config, &quote).await;

        let call_error = match result {
            Ok(receipt) => {
                tracing::info!(tx_hash = %receipt.tx_hash, %value_to_send, "call for user succeeded");
                retained.record_call_for_user(&receipt);
                retained.transition_to(PeginState::CallForUserSucceeded)?;
                None
            }
            Err(error) => {
                tracing::error!(%error, "call for user failed");
                if let Some(receipt) = error.attempted_receipt() {
                    retained.record_call_for_user(receipt);
                }
                retained.transition_to(PeginState::CallForUserFailed)?;
                Some(error)
            }
        };

        self.publish(&quote, &retained, call_error.as_ref());

        let write_error = storage.update_retained_pegin_quote(&retained).await.err();
        drop(guard);
        let errors: Vec<Error> = call_error.into_iter().chain(write_error).collect();
        if !errors.is_empty() {
            return Err(Error::NonRecoverable(errors));
        }
        Ok(retained)
    }

    /// The part of the quote value the provider's LBC balance does not
    /// cover, which has to be sent along with the call. The provider's
    /// account must hold it.
    async fn value_to_send(&self, quote: &PeginQuote) -> Result<Wei, Error> {
        let address = self.context.get_liquidity_provider().rsk_address();
        let lbc_balance = self.context.get_lbc().get_balance(&address).await?;
        let value_to_send = quote.value.saturating_sub(lbc_balance);
        if value_to_send.is_zero() {
            return Ok(value_to_send);
        }

        let network_balance = self.context.get_rsk_client().get_balance(&address).await?;
        if network_balance < value_to_send {
            tracing::warn!(%network_balance, %value_to_send, "cannot top up the LBC balance");
            return Err(Error::NoLiquidity);
        }
        Ok(value_to_send)
    }

    fn publish(&self, quote: &PeginQuote, retained: &RetainedPeginQuote, error: Option<&Error>) {
        let event = CallForUserCompletedEvent {
            quote: quote.clone(),
            retained_quote: retained.clone(),
            error: error.map(ToString::to_string),
            created_at: OffsetDateTime::now_utc(),
        };
        publish(&self.context, event);
    }
}
