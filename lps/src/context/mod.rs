//! Context module for the liquidity provider.

pub mod messaging;

use std::sync::Arc;

use tokio::sync::broadcast::Sender;

use crate::bitcoin::BitcoinInteract;
use crate::config::Settings;
use crate::error::Error;
use crate::locks::ResourceLock;
use crate::locks::PEGIN_LIQUIDITY;
use crate::locks::RSK_WALLET;
use crate::provider::LiquidityProvider;
use crate::provider::LocalLiquidityProvider;
use crate::provider::PeginLiquidityProvider;
use crate::rootstock::bridge::BridgeInteract;
use crate::rootstock::lbc::LbcInteract;
use crate::rootstock::RskInteract;
use crate::storage::DbRead;
use crate::storage::DbWrite;
pub use messaging::*;

/// Context trait that is implemented by the [`LpsContext`].
pub trait Context: Clone + Sync + Send {
    /// Get the current configuration for the provider.
    fn config(&self) -> &Settings;
    /// Subscribe to the application signalling channel, returning a receiver
    /// which can be used to listen for events.
    fn get_signal_receiver(&self) -> tokio::sync::broadcast::Receiver<LpsEvent>;
    /// Get an owned application signalling channel sender.
    fn get_signal_sender(&self) -> tokio::sync::broadcast::Sender<LpsEvent>;
    /// Send an event to the application signalling channel.
    fn signal(&self, event: LpsEvent) -> Result<(), Error>;
    /// Get a read-only handle to the quote storage.
    fn get_storage(&self) -> impl DbRead + Clone + Sync + Send;
    /// Get a read-write handle to the quote storage.
    fn get_storage_mut(&self) -> impl DbRead + DbWrite + Clone + Sync + Send;
    /// Get a handle to a Bitcoin client.
    fn get_bitcoin_client(&self) -> impl BitcoinInteract + Clone + Sync + Send;
    /// Get a handle to a Rootstock RPC client.
    fn get_rsk_client(&self) -> impl RskInteract + Clone + Sync + Send;
    /// Get a handle to the Rootstock bridge.
    fn get_bridge(&self) -> impl BridgeInteract + Clone + Sync + Send;
    /// Get a handle to the liquidity bridge contract.
    fn get_lbc(&self) -> impl LbcInteract + Clone + Sync + Send;
    /// Get the liquidity provider.
    fn get_liquidity_provider(
        &self,
    ) -> impl LiquidityProvider + PeginLiquidityProvider + Clone + Sync + Send;
    /// The lock over accepting peg-in quotes.
    fn pegin_liquidity_lock(&self) -> &ResourceLock;
    /// The lock over spending from the provider wallet.
    fn rsk_wallet_lock(&self) -> &ResourceLock;
}

/// Liquidity provider context which is passed to every use case.
#[derive(Debug, Clone)]
pub struct LpsContext<S, BC, RSK, BR, LBC> {
    config: Arc<Settings>,
    // Handle to the app signalling channel. This keeps the channel alive
    // for the duration of the program and is used both to send messages
    // and to hand out new receivers.
    signal_tx: Sender<LpsEvent>,
    /// Handle to the quote storage.
    storage: S,
    /// Handle to a Bitcoin client.
    bitcoin_client: BC,
    /// Handle to a Rootstock RPC client.
    rsk_client: RSK,
    bridge: BR,
    lbc: LBC,
    provider: LocalLiquidityProvider<RSK, LBC, S>,
    pegin_liquidity_lock: ResourceLock,
    rsk_wallet_lock: ResourceLock,
}

impl<S, BC, RSK, BR, LBC> LpsContext<S, BC, RSK, BR, LBC>
where
    S: DbRead + DbWrite + Clone + Sync + Send,
    BC: BitcoinInteract + Clone + Sync + Send,
    RSK: RskInteract + Clone + Sync + Send,
    BR: BridgeInteract + Clone + Sync + Send,
    LBC: LbcInteract + Clone + Sync + Send,
{
    /// Create a new liquidity provider context.
    pub fn new(
        config: Settings,
        storage: S,
        bitcoin_client: BC,
        rsk_client: RSK,
        bridge: BR,
        lbc: LBC,
    ) -> Self {
        // NOTE: Event consumers that need processing time should move the
        // events into their own queue, slow receivers lag and lose events.
        let (signal_tx, _) = tokio::sync::broadcast::channel(128);
        let config = Arc::new(config);
        let provider = LocalLiquidityProvider::new(
            config.clone(),
            rsk_client.clone(),
            lbc.clone(),
            storage.clone(),
        );

        Self {
            config,
            signal_tx,
            storage,
            bitcoin_client,
            rsk_client,
            bridge,
            lbc,
            provider,
            pegin_liquidity_lock: ResourceLock::new(PEGIN_LIQUIDITY),
            rsk_wallet_lock: ResourceLock::new(RSK_WALLET),
        }
    }
}

impl<S, BC, RSK, BR, LBC> Context for LpsContext<S, BC, RSK, BR, LBC>
where
    S: DbRead + DbWrite + Clone + Sync + Send,
    BC: BitcoinInteract + Clone + Sync + Send,
    RSK: RskInteract + Clone + Sync + Send,
    BR: BridgeInteract + Clone + Sync + Send,
    LBC: LbcInteract + Clone + Sync + Send,
{
    fn config(&self) -> &Settings {
        &self.config
    }

    fn get_signal_receiver(&self) -> tokio::sync::broadcast::Receiver<LpsEvent> {
        self.signal_tx.subscribe()
    }

    fn get_signal_sender(&self) -> tokio::sync::broadcast::Sender<LpsEvent> {
        self.signal_tx.clone()
    }

    /// Send an event to the application signalling channel.
    fn signal(&self, event: LpsEvent) -> Result<(), Error> {
        self.signal_tx
            .send(event)
            .map_err(|_| {
                tracing::warn!("failed to send event to the application, no receivers present.");
                Error::NoEventSubscribers
            })
            .map(|_| ())
    }

    fn get_storage(&self) -> impl DbRead + Clone + Sync + Send {
        self.storage.clone()
    }

    fn get_storage_mut(&self) -> impl DbRead + DbWrite + Clone + Sync + Send {
        self.storage.clone()
    }

    fn get_bitcoin_client(&self) -> impl BitcoinInteract + Clone + Sync + Send {
        self.bitcoin_client.clone()
    }

    fn get_rsk_client(&self) -> impl RskInteract + Clone + Sync + Send {
        self.rsk_client.clone()
    }

    fn get_bridge(&self) -> impl BridgeInteract + Clone + Sync + Send {
        self.bridge.clone()
    }

    fn get_lbc(&self) -> impl LbcInteract + Clone + Sync + Send {
        self.lbc.clone()
    }

    fn get_liquidity_provider(
        &self,
    ) -> impl LiquidityProvider + PeginLiquidityProvider + Clone + Sync + Send {
        self.provider.clone()
    }

    fn pegin_liquidity_lock(&self) -> &ResourceLock {
        &self.pegin_liquidity_lock
    }

    fn rsk_wallet_lock(&self) -> &ResourceLock {
        &self.rsk_wallet_lock
    }
}
