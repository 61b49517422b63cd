//! A liquidity provider whose key and balances are managed by this process.

use std::sync::Arc;

use alloy_primitives::Address;
use secp256k1::SecretKey;
use secp256k1::SECP256K1;

use crate::config::PeginConfig;
use crate::config::Settings;
use crate::error::Error;
use crate::quote::decode_quote_hash;
use crate::quote::PeginState;
use crate::rootstock::lbc::LbcInteract;
use crate::rootstock::RskInteract;
use crate::signature::public_key_address;
use crate::signature::sign_hash;
use crate::storage::DbRead;
use crate::wei::Wei;

use super::LiquidityProvider;
use super::PeginLiquidityProvider;

/// A provider that signs with a local key and holds its liquidity in its
/// Rootstock account and in the LBC.
#[derive(Debug, Clone)]
pub struct LocalLiquidityProvider<RSK, LBC, S> {
    settings: Arc<Settings>,
    secret_key: SecretKey,
    address: Address,
    rsk_client: RSK,
    lbc: LBC,
    storage: S,
}

impl<RSK, LBC, S> LocalLiquidityProvider<RSK, LBC, S> {
    pub fn new(settings: Arc<Settings>, rsk_client: RSK, lbc: LBC, storage: S) -> Self {
        let secret_key = settings.lps.private_key;
        let address = public_key_address(&secret_key.public_key(SECP256K1));
        Self {
            settings,
            secret_key,
            address,
            rsk_client,
            lbc,
            storage,
        }
    }
}

impl<RSK, LBC, S> LiquidityProvider for LocalLiquidityProvider<RSK, LBC, S>
where
    RSK: Sync + Send,
    LBC: Sync + Send,
    S: Sync + Send,
{
    fn rsk_address(&self) -> Address {
        self.address
    }

    fn btc_address(&self) -> String {
        self.settings.lps.btc_address.clone()
    }

    async fn sign_quote(&self, quote_hash: &str) -> Result<String, Error> {
        let hash = decode_quote_hash(quote_hash)?;
        Ok(hex::encode(sign_hash(&self.secret_key, &hash)))
    }

    fn bitcoin_confirmations_for_value(&self, value: Wei) -> u16 {
        self.settings.general.btc_confirmations.for_value(value)
    }
}

impl<RSK, LBC, S> PeginLiquidityProvider for LocalLiquidityProvider<RSK, LBC, S>
where
    RSK: RskInteract + Sync + Send,
    LBC: LbcInteract + Sync + Send,
    S: DbRead + Sync + Send,
{
    fn pegin_configuration(&self) -> PeginConfig {
        self.settings.pegin.clone()
    }

    async fn has_pegin_liquidity(&self, amount: Wei) -> Result<(), Error> {
        let available = self.available_pegin_liquidity().await?;
        if available < amount {
            tracing::debug!(%available, %amount, "not enough peg-in liquidity");
            return Err(Error::NoLiquidity);
        }
        Ok(())
    }

    async fn available_pegin_liquidity(&self) -> Result<Wei, Error> {
        let (network_balance, lbc_balance, locked_quotes) = futures::try_join!(
            self.rsk_client.get_balance(&self.address),
            self.lbc.get_balance(&self.address),
            self.storage.get_retained_quotes_by_state(&PeginState::LOCKING),
        )?;

        let locked: Vec<Wei> = locked_quotes
            .iter()
            .map(|retained| retained.required_liquidity)
            .collect();
        let locked = Wei::sum(&locked)?;

        Ok(network_balance
            .checked_add(lbc_balance)?
            .saturating_sub(locked))
    }
}
