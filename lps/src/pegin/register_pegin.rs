//! Registering the user's deposit with the bridge.
//!
//! After the call on behalf of the user, the provider proves the deposit to
//! the LBC, which releases the deposit to the provider through the bridge.
//! The bridge may not have processed the deposit's block yet, in which
//! case registration is retried later without touching the quote.

use time::OffsetDateTime;

use crate::bitcoin::BitcoinInteract as _;
use crate::context::Context;
use crate::context::RegisterPeginCompletedEvent;
use crate::error::Error;
use crate::error::ErrorArgs;
use crate::error::UseCaseId;
use crate::quote::PeginState;
use crate::quote::RetainedPeginQuote;
use crate::rootstock::bridge::BridgeInteract as _;
use crate::rootstock::lbc::LbcInteract as _;
use crate::rootstock::lbc::RegisterPeginParams;
use crate::storage::DbRead as _;
use crate::storage::DbWrite as _;

use super::publish;

/// Submits deposit proofs of quotes the provider already paid out.
#[derive(Debug, Clone)]
pub struct RegisterPeginUseCase<C> {
    context: C,
}

impl<C: Context> RegisterPeginUseCase<C> {
    pub fn new(context: C) -> Self {
        Self { context }
    }

    /// Register the deposit of the retained quote, returning the updated
    /// retained quote.
    ///
    /// Fails with [`Error::WaitingForBridge`] somewhere in the error chain
    /// when the bridge is behind the Bitcoin chain. The quote is untouched
    /// and the registration can be retried.
    #[tracing::instrument(skip_all, fields(quote_hash = %retained.quote_hash))]
    pub async fn run(&self, retained: RetainedPeginQuote) -> Result<RetainedPeginQuote, Error> {
        let mut args = ErrorArgs::new().with("quoteHash", &retained.quote_hash);
        if let Some(txid) = &retained.user_btc_tx_hash {
            args = args.with("btcTx", txid);
        }
        self.register(retained)
            .await
            .map_err(|error| error.or_in_use_case_with(UseCaseId::RegisterPegin, args))
    }

    async fn register(
        &self,
        retained: RetainedPeginQuote,
    ) -> Result<RetainedPeginQuote, Error> {
        if retained.state != PeginState::CallForUserSucceeded {
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

        let bitcoin_client = self.context.get_bitcoin_client();
        let bridge = self.context.get_bridge();
        let (tx_info, required_confirmations) = futures::try_join!(
            bitcoin_client.get_transaction_info(&user_btc_tx_hash),
            bridge.get_required_tx_confirmations(),
        )?;
        if tx_info.confirmations < required_confirmations {
            return Err(Error::NoEnoughConfirmations {
                actual: tx_info.confirmations,
                required: required_confirmations,
            });
        }

        let quote_signature = hex::decode(retained.signature.trim_start_matches("0x"))?;
        let (bitcoin_raw_transaction, partial_merkle_tree, block_info) = futures::try_join!(
            bitcoin_client.get_raw_transaction(&user_btc_tx_hash),
            bitcoin_client.get_partial_merkle_tree(&user_btc_tx_hash),
            bitcoin_client.get_transaction_block_info(&user_btc_tx_hash),
        )?;
        let params = RegisterPeginParams {
            quote_signature,
            bitcoin_raw_transaction,
            partial_merkle_tree,
            block_height: block_info.height,
            quote,
        };

        // Held until the outcome is stored, so a concurrent or stale run
        // sees the quote already registered.
        let guard = self.context.rsk_wallet_lock().acquire().await;
        let mut retained = storage
            .get_retained_pegin_quote(&retained.quote_hash)
            .await?
            .ok_or(Error::QuoteNotAccepted)?;
        if retained.state != PeginState::CallForUserSucceeded {
            tracing::debug!(state = %retained.state, "peg-in already registered");
            return Err(Error::WrongState(retained.state));
        }

        let result = self.context.get_lbc().register_pegin(params).await;

        let register_error = match result {
            Ok(receipt) => {
                tracing::info!(tx_hash = %receipt.tx_hash, "registered peg-in");
                retained.record_register_pegin(&receipt);
                retained.transition_to(PeginState::RegisterPeginSucceeded)?;
                None
            }
            Err(error) if error.is_waiting_for_bridge() => {
                tracing::info!("bridge has not processed the deposit block yet");
                return Err(error);
            }
            Err(error) => {
                tracing::error!(%error, "peg-in registration failed");
                if let Some(receipt) = error.attempted_receipt() {
                    retained.record_register_pegin(receipt);
                }
                retained.transition_to(PeginState::RegisterPeginFailed)?;
                Some(error)
            }
        };

        publish(
            &self.context,
            RegisterPeginCompletedEvent {
                retained_quote: retained.clone(),
                error: register_error.as_ref().map(ToString::to_string),
                created_at: OffsetDateTime::now_utc(),
            },
        );

        let write_error = storage.update_retained_pegin_quote(&retained).await.err();
        drop(guard);
        let errors: Vec<Error> = register_error.into_iter().chain(write_error).collect();
        if !errors.is_empty() {
            return Err(Error::NonRecoverable(errors));
        }
        Ok(retained)
    }
}
