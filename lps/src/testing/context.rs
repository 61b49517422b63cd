//! Test Context implementation

use std::ops::Deref;
use std::sync::Arc;

use alloy_primitives::Address;
use alloy_primitives::Bytes;
use bitcoin::Txid;
use tokio::sync::Mutex;

use crate::bitcoin::BitcoinBlockInfo;
use crate::bitcoin::BitcoinInteract;
use crate::bitcoin::BitcoinTxInfo;
use crate::bitcoin::MockBitcoinInteract;
use crate::config::Settings;
use crate::context::Context;
use crate::context::LpsContext;
use crate::context::LpsEvent;
use crate::error::Error;
use crate::locks::ResourceLock;
use crate::provider::LiquidityProvider;
use crate::provider::PeginLiquidityProvider;
use crate::quote::PeginQuote;
use crate::rootstock::bridge::BridgeInteract;
use crate::rootstock::bridge::FederationInfo;
use crate::rootstock::bridge::FlyoverDerivation;
use crate::rootstock::bridge::FlyoverDerivationArgs;
use crate::rootstock::bridge::MockBridgeInteract;
use crate::rootstock::lbc::LbcInteract;
use crate::rootstock::lbc::MockLbcInteract;
use crate::rootstock::lbc::RegisterPeginParams;
use crate::rootstock::MockRskInteract;
use crate::rootstock::RskInteract;
use crate::rootstock::TransactionConfig;
use crate::rootstock::TransactionReceipt;
use crate::storage::in_memory::SharedStore;
use crate::storage::in_memory::Store;
use crate::storage::DbRead;
use crate::storage::DbWrite;
use crate::wei::Wei;

/// A [`TestContext`] whose collaborators are all mocks.
pub type MockedContext<S = SharedStore> = TestContext<
    S,
    WrappedMock<MockBitcoinInteract>,
    WrappedMock<MockRskInteract>,
    WrappedMock<MockBridgeInteract>,
    WrappedMock<MockLbcInteract>,
>;

/// A [`Context`] which can be used for testing.
///
/// This context also provides you raw access to both the inner
/// [`LpsContext`] as well as the different clients, so you can modify
/// their behavior as needed.
#[derive(Clone)]
pub struct TestContext<S, BC, RSK, BR, LBC> {
    /// The inner [`LpsContext`] which this context wraps.
    pub inner: LpsContext<S, BC, RSK, BR, LBC>,
    /// The storage, shared with the inner context.
    pub storage: S,
    /// The bitcoin client.
    pub bitcoin_client: BC,
    /// The Rootstock RPC client.
    pub rsk_client: RSK,
    /// The Rootstock bridge.
    pub bridge: BR,
    /// The liquidity bridge contract.
    pub lbc: LBC,
}

impl<S, BC, RSK, BR, LBC> TestContext<S, BC, RSK, BR, LBC>
where
    S: DbRead + DbWrite + Clone + Sync + Send,
    BC: BitcoinInteract + Clone + Sync + Send,
    RSK: RskInteract + Clone + Sync + Send,
    BR: BridgeInteract + Clone + Sync + Send,
    LBC: LbcInteract + Clone + Sync + Send,
{
    /// Create a new test context.
    pub fn new(
        settings: Settings,
        storage: S,
        bitcoin_client: BC,
        rsk_client: RSK,
        bridge: BR,
        lbc: LBC,
    ) -> Self {
        let inner = LpsContext::new(
            settings,
            storage.clone(),
            bitcoin_client.clone(),
            rsk_client.clone(),
            bridge.clone(),
            lbc.clone(),
        );
        Self {
            inner,
            storage,
            bitcoin_client,
            rsk_client,
            bridge,
            lbc,
        }
    }
}

impl MockedContext {
    /// A context over an empty in-memory store, with default mocks and the
    /// default configuration.
    pub fn default_mocked() -> Self {
        Self::mocked(Store::new_shared())
    }
}

impl<S> MockedContext<S>
where
    S: DbRead + DbWrite + Clone + Sync + Send,
{
    /// A context over the given storage, with default mocks and the default
    /// configuration.
    pub fn mocked(storage: S) -> Self {
        let settings = Settings::new_from_default_config().unwrap();
        Self::new(
            settings,
            storage,
            WrappedMock::default(),
            WrappedMock::default(),
            WrappedMock::default(),
            WrappedMock::default(),
        )
    }

    /// Execute a closure with a mutable reference to the inner mocked
    /// bitcoin client.
    pub async fn with_bitcoin_client<F>(&self, f: F)
    where
        F: FnOnce(&mut MockBitcoinInteract),
    {
        let mut client = self.bitcoin_client.lock().await;
        f(&mut client);
    }

    /// Execute a closure with a mutable reference to the inner mocked
    /// Rootstock RPC client.
    pub async fn with_rsk_client<F>(&self, f: F)
    where
        F: FnOnce(&mut MockRskInteract),
    {
        let mut client = self.rsk_client.lock().await;
        f(&mut client);
    }

    /// Execute a closure with a mutable reference to the inner mocked
    /// bridge.
    pub async fn with_bridge<F>(&self, f: F)
    where
        F: FnOnce(&mut MockBridgeInteract),
    {
        let mut client = self.bridge.lock().await;
        f(&mut client);
    }

    /// Execute a closure with a mutable reference to the inner mocked LBC.
    pub async fn with_lbc<F>(&self, f: F)
    where
        F: FnOnce(&mut MockLbcInteract),
    {
        let mut client = self.lbc.lock().await;
        f(&mut client);
    }
}

impl<S, BC, RSK, BR, LBC> Context for TestContext<S, BC, RSK, BR, LBC>
where
    S: DbRead + DbWrite + Clone + Sync + Send,
    BC: BitcoinInteract + Clone + Sync + Send,
    RSK: RskInteract + Clone + Sync + Send,
    BR: BridgeInteract + Clone + Sync + Send,
    LBC: LbcInteract + Clone + Sync + Send,
{
    fn config(&self) -> &Settings {
        self.inner.config()
    }

    fn get_signal_receiver(&self) -> tokio::sync::broadcast::Receiver<LpsEvent> {
        self.inner.get_signal_receiver()
    }

    fn get_signal_sender(&self) -> tokio::sync::broadcast::Sender<LpsEvent> {
        self.inner.get_signal_sender()
    }

    fn signal(&self, event: LpsEvent) -> Result<(), Error> {
        self.inner.signal(event)
    }

    fn get_storage(&self) -> impl DbRead + Clone + Sync + Send {
        self.inner.get_storage()
    }

    fn get_storage_mut(&self) -> impl DbRead + DbWrite + Clone + Sync + Send {
        self.inner.get_storage_mut()
    }

    fn get_bitcoin_client(&self) -> impl BitcoinInteract + Clone + Sync + Send {
        self.inner.get_bitcoin_client()
    }

    fn get_rsk_client(&self) -> impl RskInteract + Clone + Sync + Send {
        self.inner.get_rsk_client()
    }

    fn get_bridge(&self) -> impl BridgeInteract + Clone + Sync + Send {
        self.inner.get_bridge()
    }

    fn get_lbc(&self) -> impl LbcInteract + Clone + Sync + Send {
        self.inner.get_lbc()
    }

    fn get_liquidity_provider(
        &self,
    ) -> impl LiquidityProvider + PeginLiquidityProvider + Clone + Sync + Send {
        self.inner.get_liquidity_provider()
    }

    fn pegin_liquidity_lock(&self) -> &ResourceLock {
        self.inner.pegin_liquidity_lock()
    }

    fn rsk_wallet_lock(&self) -> &ResourceLock {
        self.inner.rsk_wallet_lock()
    }
}

/// A wrapper around a mock which can be cloned and shared between threads.
pub struct WrappedMock<T> {
    inner: Arc<Mutex<T>>,
}

impl<T> Clone for WrappedMock<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T> WrappedMock<T> {
    /// Create a new wrapped mock.
    pub fn new(mock: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(mock)),
        }
    }
}

impl<T> Deref for WrappedMock<T> {
    type Target = Mutex<T>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Default for WrappedMock<T>
where
    T: Default,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl BitcoinInteract for WrappedMock<MockBitcoinInteract> {
    async fn validate_address(&self, address: &str) -> Result<(), Error> {
        self.inner.lock().await.validate_address(address).await
    }

    async fn decode_address(&self, address: &str) -> Result<Vec<u8>, Error> {
        self.inner.lock().await.decode_address(address).await
    }

    async fn get_transaction_info(&self, txid: &Txid) -> Result<BitcoinTxInfo, Error> {
        self.inner.lock().await.get_transaction_info(txid).await
    }

    async fn get_transaction_block_info(&self, txid: &Txid) -> Result<BitcoinBlockInfo, Error> {
        self.inner.lock().await.get_transaction_block_info(txid).await
    }

    async fn get_raw_transaction(&self, txid: &Txid) -> Result<Vec<u8>, Error> {
        self.inner.lock().await.get_raw_transaction(txid).await
    }

    async fn get_partial_merkle_tree(&self, txid: &Txid) -> Result<Vec<u8>, Error> {
        self.inner.lock().await.get_partial_merkle_tree(txid).await
    }
}

impl RskInteract for WrappedMock<MockRskInteract> {
    async fn estimate_gas(&self, to: &Address, value: Wei, data: &Bytes) -> Result<u64, Error> {
        self.inner.lock().await.estimate_gas(to, value, data).await
    }

    async fn gas_price(&self) -> Result<Wei, Error> {
        self.inner.lock().await.gas_price().await
    }

    async fn get_balance(&self, address: &Address) -> Result<Wei, Error> {
        self.inner.lock().await.get_balance(address).await
    }
}

impl BridgeInteract for WrappedMock<MockBridgeInteract> {
    async fn fetch_federation_info(&self) -> Result<FederationInfo, Error> {
        self.inner.lock().await.fetch_federation_info().await
    }

    async fn get_flyover_derivation_address(
        &self,
        args: FlyoverDerivationArgs,
    ) -> Result<FlyoverDerivation, Error> {
        self.inner
            .lock()
            .await
            .get_flyover_derivation_address(args)
            .await
    }

    async fn get_fed_address(&self) -> Result<String, Error> {
        self.inner.lock().await.get_fed_address().await
    }

    async fn get_minimum_lock_tx_value(&self) -> Result<Wei, Error> {
        self.inner.lock().await.get_minimum_lock_tx_value().await
    }

    async fn get_required_tx_confirmations(&self) -> Result<u64, Error> {
        self.inner.lock().await.get_required_tx_confirmations().await
    }

    async fn dao_fee_percentage(&self) -> Result<u64, Error> {
        self.inner.lock().await.dao_fee_percentage().await
    }
}

impl LbcInteract for WrappedMock<MockLbcInteract> {
    fn address(&self) -> Address {
        self.inner
            .try_lock()
            .expect("the LBC mock is locked")
            .address()
    }

    async fn hash_pegin_quote(&self, quote: &PeginQuote) -> Result<String, Error> {
        self.inner.lock().await.hash_pegin_quote(quote).await
    }

    async fn call_for_user(
        &self,
        config: TransactionConfig,
        quote: &PeginQuote,
    ) -> Result<TransactionReceipt, Error> {
        self.inner.lock().await.call_for_user(config, quote).await
    }

    async fn register_pegin(&self, params: RegisterPeginParams) -> Result<TransactionReceipt, Error> {
        self.inner.lock().await.register_pegin(params).await
    }

    async fn get_collateral(&self, address: &Address) -> Result<Wei, Error> {
        self.inner.lock().await.get_collateral(address).await
    }

    async fn get_minimum_collateral(&self) -> Result<Wei, Error> {
        self.inner.lock().await.get_minimum_collateral().await
    }

    async fn add_collateral(&self, amount: Wei) -> Result<(), Error> {
        self.inner.lock().await.add_collateral(amount).await
    }

    async fn withdraw_collateral(&self) -> Result<(), Error> {
        self.inner.lock().await.withdraw_collateral().await
    }

    async fn get_balance(&self, address: &Address) -> Result<Wei, Error> {
        self.inner.lock().await.get_balance(address).await
    }
}
