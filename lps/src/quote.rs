//! Quote entities shared by the peg-in use cases.
//!
//! A [`PeginQuote`] holds the terms agreed with the user and never changes
//! after it is stored. The matching [`RetainedPeginQuote`] tracks the
//! settlement progress of an accepted quote through the [`PeginState`]
//! machine.

use std::fmt;

use alloy_primitives::Address;
use alloy_primitives::Bytes;
use bitcoin::Txid;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::rootstock::TransactionReceipt;
use crate::wei::Wei;

/// The settlement state of an accepted peg-in quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeginState {
    /// The quote was accepted and the user has not deposited yet.
    WaitingForDeposit,
    /// A deposit was observed and is waiting for confirmations.
    WaitingForDepositConfirmations,
    /// The deposit window elapsed without a deposit.
    TimeForDepositElapsed,
    /// The provider performed the call on behalf of the user.
    CallForUserSucceeded,
    /// The call on behalf of the user could not be performed.
    CallForUserFailed,
    /// The deposit proof was accepted by the bridge.
    #[serde(rename = "RegisterPegInSucceeded")]
    RegisterPeginSucceeded,
    /// The deposit proof was rejected.
    #[serde(rename = "RegisterPegInFailed")]
    RegisterPeginFailed,
}

impl PeginState {
    /// States that still lock provider liquidity.
    pub const LOCKING: [PeginState; 2] = [
        PeginState::WaitingForDeposit,
        PeginState::WaitingForDepositConfirmations,
    ];

    /// Whether no further transition leaves this state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PeginState::TimeForDepositElapsed
                | PeginState::CallForUserFailed
                | PeginState::RegisterPeginSucceeded
                | PeginState::RegisterPeginFailed
        )
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: PeginState) -> bool {
        use PeginState::*;
        matches!(
            (self, next),
            (WaitingForDeposit, WaitingForDepositConfirmations)
                | (WaitingForDeposit, TimeForDepositElapsed)
                | (WaitingForDepositConfirmations, CallForUserSucceeded)
                | (WaitingForDepositConfirmations, CallForUserFailed)
                | (CallForUserSucceeded, RegisterPeginSucceeded)
                | (CallForUserSucceeded, RegisterPeginFailed)
        )
    }
}

impl fmt::Display for PeginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PeginState::WaitingForDeposit => "WaitingForDeposit",
            PeginState::WaitingForDepositConfirmations => "WaitingForDepositConfirmations",
            PeginState::TimeForDepositElapsed => "TimeForDepositElapsed",
            PeginState::CallForUserSucceeded => "CallForUserSucceeded",
            PeginState::CallForUserFailed => "CallForUserFailed",
            PeginState::RegisterPeginSucceeded => "RegisterPegInSucceeded",
            PeginState::RegisterPeginFailed => "RegisterPegInFailed",
        };
        f.write_str(name)
    }
}

/// The terms of a peg-in agreed between the user and the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeginQuote {
    pub fed_btc_address: String,
    pub lbc_address: Address,
    pub lp_rsk_address: Address,
    pub btc_refund_address: String,
    pub rsk_refund_address: Address,
    pub lp_btc_address: String,
    pub call_fee: Wei,
    pub penalty_fee: Wei,
    /// The destination of the call performed on behalf of the user.
    pub contract_address: Address,
    pub data: Bytes,
    pub gas_limit: u32,
    pub nonce: i64,
    pub value: Wei,
    /// Unix timestamp, in seconds, of the moment the quote was created.
    pub agreement_timestamp: u32,
    /// Seconds the user has to make the deposit.
    pub time_for_deposit: u32,
    /// Seconds the provider has to perform the call after the deposit.
    pub lp_call_time: u32,
    /// Bitcoin confirmations required before the provider acts.
    pub confirmations: u16,
    pub call_on_register: bool,
    pub gas_fee: Wei,
    pub product_fee_amount: Wei,
    pub chain_id: u64,
}

impl PeginQuote {
    /// The amount the user has to deposit: value plus every fee.
    pub fn total(&self) -> Result<Wei, Error> {
        self.value
            .checked_add(self.call_fee)?
            .checked_add(self.product_fee_amount)?
            .checked_add(self.gas_fee)
    }

    /// Unix timestamp after which the deposit window is closed.
    pub fn expire_time(&self) -> u64 {
        self.agreement_timestamp as u64 + self.time_for_deposit as u64
    }

    /// Whether the deposit window is closed at the given unix timestamp.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.expire_time() as i64
    }

    /// Whether the deposit window is closed now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(time::OffsetDateTime::now_utc().unix_timestamp())
    }
}

/// The fee parameters in force when a quote was created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeginCreationData {
    pub gas_price: Wei,
    pub fee_percentage: f64,
    pub fixed_fee: Wei,
}

/// A quote as it is stored by the quoting use case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPeginQuote {
    pub hash: String,
    pub quote: PeginQuote,
    pub creation_data: PeginCreationData,
}

/// The settlement record of an accepted quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetainedPeginQuote {
    pub quote_hash: String,
    /// The Bitcoin address derived for this quote.
    pub deposit_address: String,
    /// Hex encoded provider signature over the quote hash.
    pub signature: String,
    /// Liquidity locked by the quote until it is settled.
    pub required_liquidity: Wei,
    pub state: PeginState,
    pub user_btc_tx_hash: Option<Txid>,
    pub call_for_user_tx_hash: Option<String>,
    pub call_for_user_gas_used: u64,
    pub call_for_user_gas_price: Wei,
    pub register_pegin_tx_hash: Option<String>,
    pub register_pegin_gas_used: u64,
    pub register_pegin_gas_price: Wei,
    /// The trusted account that accepted the quote, if any.
    pub owner_account_address: Option<Address>,
}

impl RetainedPeginQuote {
    /// Move to the next state, refusing transitions the state machine does
    /// not allow.
    pub fn transition_to(&mut self, next: PeginState) -> Result<(), Error> {
        if !self.state.can_transition_to(next) {
            return Err(Error::WrongState(self.state));
        }
        self.state = next;
        Ok(())
    }

    /// Record the metrics of a call-for-user transaction.
    pub fn record_call_for_user(&mut self, receipt: &TransactionReceipt) {
        self.call_for_user_tx_hash = Some(receipt.tx_hash.clone());
        self.call_for_user_gas_used = receipt.gas_used;
        self.call_for_user_gas_price = receipt.gas_price;
    }

    /// Record the metrics of a register-pegin transaction.
    pub fn record_register_pegin(&mut self, receipt: &TransactionReceipt) {
        self.register_pegin_tx_hash = Some(receipt.tx_hash.clone());
        self.register_pegin_gas_used = receipt.gas_used;
        self.register_pegin_gas_price = receipt.gas_price;
    }
}

/// What the user gets back after accepting a quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedQuote {
    pub signature: String,
    pub deposit_address: String,
}

/// Everything known about a quote.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchedPeginQuote {
    pub pegin_quote: PeginQuote,
    pub retained_quote: RetainedPeginQuote,
    pub creation_data: PeginCreationData,
}

/// Decode a hex quote hash into its 32 bytes.
pub fn decode_quote_hash(hash: &str) -> Result<[u8; 32], Error> {
    let bytes = hex::decode(hash.trim_start_matches("0x"))?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| Error::InvalidHashLength(len))
}
