//! Top-level error type for the liquidity provider engine.

use std::collections::BTreeMap;
use std::fmt;

use crate::quote::PeginState;
use crate::rootstock::TransactionReceipt;
use crate::wei::Wei;

/// Identifies the use case an error was returned from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UseCaseId {
    GetPeginQuote,
    AcceptPeginQuote,
    CallForUser,
    RegisterPegin,
    RecommendedPegin,
    AddCollateral,
    GetCollateral,
    WithdrawCollateral,
    ExpiredPeginQuote,
    PeginQuoteStatus,
    GetPeginReport,
}

impl UseCaseId {
    /// The identifier as it is rendered in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetPeginQuote => "GetPeginQuote",
            Self::AcceptPeginQuote => "AcceptPeginQuote",
            Self::CallForUser => "CallForUser",
            Self::RegisterPegin => "RegisterPegin",
            Self::RecommendedPegin => "RecommendedPegin",
            Self::AddCollateral => "AddCollateral",
            Self::GetCollateral => "GetCollateral",
            Self::WithdrawCollateral => "WithdrawCollateral",
            Self::ExpiredPeginQuote => "ExpiredPeginQuote",
            Self::PeginQuoteStatus => "PeginQuoteStatus",
            Self::GetPeginReport => "GetPeginReport",
        }
    }
}

impl fmt::Display for UseCaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured key/value context attached to a use-case error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorArgs(BTreeMap<String, String>);

impl ErrorArgs {
    /// Create an empty set of arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument, returning the updated set.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.0.insert(key.into(), value.to_string());
        self
    }

    /// Look up an argument.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The rendered suffix appended to a use-case error message.
    fn suffix(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        match serde_json::to_string(&self.0) {
            Ok(json) => format!(". Args: {json}"),
            Err(_) => String::new(),
        }
    }
}

/// Top-level liquidity provider error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The quote is not present in the quote repository.
    #[error("quote not found")]
    QuoteNotFound,

    /// The quote exists but was never accepted.
    #[error("quote not accepted")]
    QuoteNotAccepted,

    /// The deposit window of the quote has elapsed.
    #[error("expired quote")]
    ExpiredQuote,

    /// The provider cannot cover the requested amount.
    #[error("not enough liquidity")]
    NoLiquidity,

    /// Accepting the quote would exceed the trusted account's locking cap.
    #[error("locking cap exceeded: {requested} > {cap}")]
    LockingCapExceeded { requested: Wei, cap: Wei },

    /// The amount sent or provided is below what is required.
    #[error("insufficient amount: {sent} < {required}")]
    InsufficientAmount { sent: Wei, required: Wei },

    /// The transaction does not have enough confirmations yet.
    #[error("not enough confirmations for transaction: {actual} < {required}")]
    NoEnoughConfirmations { actual: u64, required: u64 },

    /// The retained quote is not in the state the operation requires.
    #[error("quote with wrong state: {0}")]
    WrongState(PeginState),

    /// The retained quote is inconsistent with the operation.
    #[error("illegal quote state: {0}")]
    IllegalQuoteState(&'static str),

    /// The address is not a Rootstock address.
    #[error("rsk address not supported: {0}")]
    RskAddressNotSupported(String),

    /// The address is not a supported Bitcoin address.
    #[error("btc address not supported: {0}")]
    BtcAddressNotSupported(String),

    /// The amount is below the bridge's minimum lock value.
    #[error("requested amount below bridge's min transaction value: {value} < {minimum}")]
    TxBelowMinimum { value: Wei, minimum: Wei },

    /// The amount is outside of the configured bounds.
    #[error("amount out of range: {amount} not in [{min}, {max}]")]
    AmountOutOfRange { amount: Wei, min: Wei, max: Wei },

    /// Collateral can only be withdrawn after resigning.
    #[error("provider hasn't completed resignation process")]
    ProviderNotResigned,

    /// The bridge has not processed the Bitcoin block yet.
    #[error("waiting for rootstock bridge")]
    WaitingForBridge,

    /// The signature does not belong to a trusted account.
    #[error("trusted account not found: {0}")]
    TrustedAccountNotFound(String),

    /// The stored trusted account does not match its hash.
    #[error("trusted account {0} failed its integrity check")]
    TamperedTrustedAccount(String),

    /// An error wrapped with the use case it was returned from.
    #[error("{id}: {source}{}", .args.suffix())]
    UseCase {
        id: UseCaseId,
        args: ErrorArgs,
        source: Box<Error>,
    },

    /// The on-chain and off-chain views may disagree, operator intervention
    /// is required.
    #[error("non recoverable: {}", join(.0))]
    NonRecoverable(Vec<Error>),

    /// Error from the Bitcoin network collaborator.
    #[error("bitcoin network error: {0}")]
    BitcoinRpc(String),

    /// Error from the Rootstock RPC collaborator.
    #[error("rootstock rpc error: {0}")]
    RskRpc(String),

    /// A contract call reverted. The receipt is present when the
    /// transaction was mined.
    #[error("contract call reverted: {reason}")]
    ContractReverted {
        reason: String,
        receipt: Option<Box<TransactionReceipt>>,
    },

    /// Error from the storage collaborator.
    #[error("storage error: {0}")]
    Storage(String),

    /// A value could not be decoded from hex.
    #[error("could not decode hex: {0}")]
    DecodeHex(#[from] hex::FromHexError),

    /// Signature recovery or creation failed.
    #[error("secp256k1 error: {0}")]
    Secp256k1(#[from] secp256k1::Error),

    /// The signature does not have the expected size.
    #[error("invalid signature length, expected 65 bytes, got {0}")]
    InvalidSignatureLength(usize),

    /// The hash does not have the expected size.
    #[error("invalid hash length, expected 32 bytes, got {0}")]
    InvalidHashLength(usize),

    /// Could not serialize or deserialize JSON.
    #[error("json error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// A Wei operation overflowed or underflowed.
    #[error("wei arithmetic overflow during {0}")]
    WeiOverflow(&'static str),

    /// A string is not a valid amount.
    #[error("invalid wei amount: {0}")]
    InvalidWei(String),

    /// A value does not fit the field it is stored in.
    #[error("could not convert {0} into the target type")]
    TypeConversion(&'static str),

    /// The federation address is not a P2SH address.
    #[error("only P2SH addresses are supported for federation address: {0}")]
    FederationAddressNotP2sh(String),

    /// Bitcoin address parsing failed.
    #[error("bitcoin address parse error: {0}")]
    BitcoinAddressParse(#[from] bitcoin::address::ParseError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// An event was published while nobody was listening.
    #[error("no subscribers for the application event channel")]
    NoEventSubscribers,

    /// Random error, used in tests.
    #[cfg(any(test, feature = "testing"))]
    #[error("dummy error")]
    Dummy,
}

fn join(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Wrap the error with the use case it was returned from.
    pub fn in_use_case(self, id: UseCaseId) -> Self {
        self.in_use_case_with(id, ErrorArgs::new())
    }

    /// Wrap the error with the use case it was returned from and some
    /// structured context.
    pub fn in_use_case_with(self, id: UseCaseId, args: ErrorArgs) -> Self {
        Error::UseCase { id, args, source: Box::new(self) }
    }

    /// Like [`Error::in_use_case_with`], but leaves errors that already
    /// name their use case untouched.
    pub fn or_in_use_case_with(self, id: UseCaseId, args: ErrorArgs) -> Self {
        match self {
            Error::UseCase { .. } => self,
            _ => self.in_use_case_with(id, args),
        }
    }

    /// Whether this error, or any error it wraps, satisfies the predicate.
    pub fn contains<F>(&self, predicate: F) -> bool
    where
        F: Fn(&Error) -> bool + Copy,
    {
        if predicate(self) {
            return true;
        }
        match self {
            Error::UseCase { source, .. } => source.contains(predicate),
            Error::NonRecoverable(errors) => errors.iter().any(|error| error.contains(predicate)),
            _ => false,
        }
    }

    /// Whether operator intervention is required.
    pub fn is_non_recoverable(&self) -> bool {
        self.contains(|error| matches!(error, Error::NonRecoverable(_)))
    }

    /// Whether the bridge is still catching up with the Bitcoin chain.
    pub fn is_waiting_for_bridge(&self) -> bool {
        self.contains(|error| matches!(error, Error::WaitingForBridge))
    }

    /// The use case an error was returned from, if it was wrapped.
    pub fn use_case(&self) -> Option<UseCaseId> {
        match self {
            Error::UseCase { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// The receipt of a transaction that was mined but failed.
    pub fn attempted_receipt(&self) -> Option<&TransactionReceipt> {
        match self {
            Error::ContractReverted { receipt, .. } => receipt.as_deref(),
            Error::UseCase { source, .. } => source.attempted_receipt(),
            Error::NonRecoverable(errors) => errors.iter().find_map(Error::attempted_receipt),
            _ => None,
        }
    }
}
