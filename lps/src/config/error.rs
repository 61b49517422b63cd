/// Configuration error variants.
#[derive(Debug, thiserror::Error)]
pub enum LpsConfigError {
    /// The provider private key is not a valid secp256k1 secret key
    #[error("The provider private key provided is invalid, it must be 64 hex characters, got {0} characters")]
    InvalidPrivateKeyLength(usize),

    /// The provider private key is not a valid secp256k1 secret key
    #[error("The provider private key provided is invalid: {0}")]
    InvalidPrivateKey(String),

    /// The address is not a Rootstock address
    #[error("Invalid Rootstock address, expected 0x followed by 40 hex characters: '{0}'")]
    InvalidRskAddress(String),

    /// The provider Bitcoin address does not belong to the configured network
    #[error("The provider Bitcoin address '{0}' is not valid for the configured network")]
    InvalidBtcAddress(String),

    /// The minimum peg-in value is above the maximum
    #[error("[pegin] min_value ({min}) must not be greater than max_value ({max})")]
    InvalidValueRange { min: String, max: String },

    /// The fee scale must be a positive multiple of 100
    #[error("[lps] fee_scale must be a positive multiple of 100, got {0}")]
    InvalidFeeScale(u64),

    /// The fee percentage must not be negative
    #[error("[pegin] fee_percentage must not be negative, got {0}")]
    NegativeFeePercentage(f64),

    /// At least one confirmation threshold is required
    #[error("[general] btc_confirmations must contain at least one entry")]
    EmptyConfirmations,
}
