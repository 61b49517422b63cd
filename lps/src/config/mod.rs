//! Configuration management for the liquidity provider

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr as _;

use alloy_primitives::Address;
use bitcoin::address::NetworkUnchecked;
use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use secp256k1::SecretKey;
use serde::Deserialize;
use serde::Serialize;

use crate::config::error::LpsConfigError;
use crate::config::serialization::private_key_deserializer;
use crate::config::serialization::rsk_address_deserializer;
use crate::error::Error;
use crate::wei::Wei;

pub mod error;
mod serialization;

/// Default seconds a user has to deposit after a quote is created.
pub const DEFAULT_TIME_FOR_DEPOSIT: u32 = 3600;

/// Default seconds the provider has to perform the call.
pub const DEFAULT_CALL_TIME: u32 = 7200;

/// Default fixed point scale used for fee percentages.
pub const DEFAULT_FEE_SCALE: u64 = 10_000;

/// Trait for validating configuration values.
trait Validatable {
    /// Validate the configuration values.
    fn validate(&self, cfg: &Settings) -> Result<(), ConfigError>;
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(any(test, feature = "testing"), derive(Serialize))]
#[serde(rename_all = "lowercase")]
/// The Bitcoin and Rootstock networks to use.
pub enum NetworkKind {
    /// The mainnet network
    Mainnet,
    /// The testnet network
    Testnet,
    /// The regtest network.
    Regtest,
}

impl From<NetworkKind> for bitcoin::Network {
    fn from(network: NetworkKind) -> Self {
        match network {
            NetworkKind::Mainnet => bitcoin::Network::Bitcoin,
            NetworkKind::Testnet => bitcoin::Network::Testnet,
            NetworkKind::Regtest => bitcoin::Network::Regtest,
        }
    }
}

/// Top-level configuration for the liquidity provider
#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    /// Provider identity and fee scale
    pub lps: LpsConfig,
    /// Peg-in quoting parameters
    pub pegin: PeginConfig,
    /// Settings shared by every flow
    pub general: GeneralConfig,
}

/// Provider identity
#[derive(Deserialize, Clone, Debug)]
pub struct LpsConfig {
    /// The network the provider operates on.
    pub network: NetworkKind,
    /// The chain id of the Rootstock network.
    pub chain_id: u64,
    /// The DAO fee collector.
    #[serde(deserialize_with = "rsk_address_deserializer")]
    pub fee_collector_address: Address,
    /// The fixed point scale fee percentages are expressed in. Must be a
    /// positive multiple of 100.
    pub fee_scale: u64,
    /// The key of the provider's Rootstock account, also used to sign
    /// quotes.
    #[serde(deserialize_with = "private_key_deserializer")]
    pub private_key: SecretKey,
    /// The Bitcoin address the provider is refunded to.
    pub btc_address: String,
}

impl Validatable for LpsConfig {
    fn validate(&self, _: &Settings) -> Result<(), ConfigError> {
        if self.fee_scale == 0 || self.fee_scale % 100 != 0 {
            let err = LpsConfigError::InvalidFeeScale(self.fee_scale);
            return Err(ConfigError::Message(err.to_string()));
        }

        let is_valid_btc_address = bitcoin::Address::<NetworkUnchecked>::from_str(&self.btc_address)
            .is_ok_and(|address| address.is_valid_for_network(self.network.into()));
        if !is_valid_btc_address {
            let err = LpsConfigError::InvalidBtcAddress(self.btc_address.clone());
            return Err(ConfigError::Message(err.to_string()));
        }

        Ok(())
    }
}

/// Peg-in quoting parameters
#[derive(Deserialize, Clone, Debug)]
pub struct PeginConfig {
    /// Seconds the user has to make the deposit.
    pub time_for_deposit: u32,
    /// Seconds the provider has to perform the call after the deposit.
    pub call_time: u32,
    /// The penalty the provider pays for not performing the call.
    pub penalty_fee: Wei,
    /// The flat part of the provider fee.
    pub fixed_fee: Wei,
    /// The proportional part of the provider fee, in percent of the value.
    pub fee_percentage: f64,
    /// The smallest value the provider quotes.
    pub min_value: Wei,
    /// The largest value the provider quotes.
    pub max_value: Wei,
}

impl PeginConfig {
    /// Check that the amount is within the configured bounds.
    pub fn validate_amount(&self, amount: Wei) -> Result<(), Error> {
        if amount < self.min_value || amount > self.max_value {
            return Err(Error::AmountOutOfRange {
                amount,
                min: self.min_value,
                max: self.max_value,
            });
        }
        Ok(())
    }

    /// The fee percentage as an integer in the given fixed point scale,
    /// rounded to the nearest integer.
    pub fn scaled_fee_percentage(&self, scale: u64) -> Wei {
        let scaled = (self.fee_percentage / 100.0 * scale as f64).round();
        Wei::new(scaled.max(0.0) as u64)
    }
}

impl Validatable for PeginConfig {
    fn validate(&self, _: &Settings) -> Result<(), ConfigError> {
        if self.min_value > self.max_value {
            let err = LpsConfigError::InvalidValueRange {
                min: self.min_value.to_string(),
                max: self.max_value.to_string(),
            };
            return Err(ConfigError::Message(err.to_string()));
        }
        if self.fee_percentage < 0.0 {
            let err = LpsConfigError::NegativeFeePercentage(self.fee_percentage);
            return Err(ConfigError::Message(err.to_string()));
        }
        Ok(())
    }
}

/// Settings shared by every flow
#[derive(Deserialize, Clone, Debug)]
pub struct GeneralConfig {
    /// The Bitcoin confirmations required per deposit amount.
    pub btc_confirmations: ConfirmationsPerAmount,
}

impl Validatable for GeneralConfig {
    fn validate(&self, _: &Settings) -> Result<(), ConfigError> {
        if self.btc_confirmations.is_empty() {
            let err = LpsConfigError::EmptyConfirmations;
            return Err(ConfigError::Message(err.to_string()));
        }
        Ok(())
    }
}

/// Maps an amount threshold to the Bitcoin confirmations required for
/// deposits up to that amount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfirmationsPerAmount(BTreeMap<Wei, u16>);

impl ConfirmationsPerAmount {
    pub fn new(entries: impl IntoIterator<Item = (Wei, u16)>) -> Self {
        Self(entries.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The confirmations of the smallest threshold that is at least
    /// `value`, or those of the largest threshold when `value` exceeds them
    /// all. Zero when the table is empty.
    pub fn for_value(&self, value: Wei) -> u16 {
        self.0
            .range(value..)
            .next()
            .or_else(|| self.0.iter().next_back())
            .map(|(_, confirmations)| *confirmations)
            .unwrap_or_default()
    }

    /// The largest number of confirmations in the table.
    pub fn max(&self) -> u16 {
        self.0.values().copied().max().unwrap_or_default()
    }
}

impl Settings {
    /// Initializing the global config first with default values and then
    /// with provided/overwritten environment variables. The explicit
    /// separator with double underscores is needed to correctly parse the
    /// nested config structure.
    ///
    /// The environment variables are prefixed with `LPS_` and the nested
    /// fields are separated with double underscores (`__`). For example,
    /// `LPS_PEGIN__FIXED_FEE` overrides `pegin.fixed_fee`.
    pub fn new(config_path: Option<impl AsRef<Path>>) -> Result<Self, ConfigError> {
        let env = Environment::with_prefix("LPS")
            .separator("__")
            .try_parsing(true)
            .prefix_separator("_");

        let mut cfg_builder = Config::builder();

        cfg_builder = cfg_builder.set_default("pegin.time_for_deposit", DEFAULT_TIME_FOR_DEPOSIT)?;
        cfg_builder = cfg_builder.set_default("pegin.call_time", DEFAULT_CALL_TIME)?;
        cfg_builder = cfg_builder.set_default("lps.fee_scale", DEFAULT_FEE_SCALE)?;

        if let Some(path) = config_path {
            cfg_builder = cfg_builder.add_source(File::from(path.as_ref()));
        }
        cfg_builder = cfg_builder.add_source(env);

        let cfg = cfg_builder.build()?;

        let settings: Settings = cfg.try_deserialize()?;

        settings.validate()?;

        Ok(settings)
    }

    /// Perform validation on the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.lps.validate(self)?;
        self.pegin.validate(self)?;
        self.general.validate(self)?;

        Ok(())
    }
}
