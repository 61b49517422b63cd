//! Storage helpers for tests.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use alloy_primitives::Address;
use time::OffsetDateTime;

use crate::error::Error;
use crate::quote::CreatedPeginQuote;
use crate::quote::PeginCreationData;
use crate::quote::PeginQuote;
use crate::quote::PeginState;
use crate::quote::RetainedPeginQuote;
use crate::signature::Signed;
use crate::signature::TrustedAccountDetails;
use crate::storage::in_memory::SharedStore;
use crate::storage::in_memory::Store;
use crate::storage::DbRead;
use crate::storage::DbWrite;

/// An in-memory store whose retained quote updates can be made to fail.
#[derive(Debug, Clone)]
pub struct FaultyStore {
    /// The store reads and successful writes go to.
    pub inner: SharedStore,
    fail_updates: Arc<AtomicBool>,
}

impl Default for FaultyStore {
    fn default() -> Self {
        Self {
            inner: Store::new_shared(),
            fail_updates: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl FaultyStore {
    /// Make every following retained quote update fail, or succeed again.
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

impl DbRead for FaultyStore {
    async fn get_pegin_quote(&self, hash: &str) -> Result<Option<PeginQuote>, Error> {
        self.inner.get_pegin_quote(hash).await
    }

    async fn get_retained_pegin_quote(
        &self,
        hash: &str,
    ) -> Result<Option<RetainedPeginQuote>, Error> {
        self.inner.get_retained_pegin_quote(hash).await
    }

    async fn get_retained_quotes_for_address(
        &self,
        address: &Address,
        states: &[PeginState],
    ) -> Result<Vec<RetainedPeginQuote>, Error> {
        self.inner
            .get_retained_quotes_for_address(address, states)
            .await
    }

    async fn get_retained_quotes_by_state(
        &self,
        states: &[PeginState],
    ) -> Result<Vec<RetainedPeginQuote>, Error> {
        self.inner.get_retained_quotes_by_state(states).await
    }

    async fn get_quotes_by_hashes_and_date(
        &self,
        hashes: &[String],
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> Result<Vec<(String, PeginQuote)>, Error> {
        self.inner
            .get_quotes_by_hashes_and_date(hashes, from, to)
            .await
    }

    async fn get_pegin_creation_data(&self, hash: &str) -> Result<PeginCreationData, Error> {
        self.inner.get_pegin_creation_data(hash).await
    }

    async fn get_trusted_account(
        &self,
        address: &Address,
    ) -> Result<Option<Signed<TrustedAccountDetails>>, Error> {
        self.inner.get_trusted_account(address).await
    }
}

impl DbWrite for FaultyStore {
    async fn insert_pegin_quote(&self, quote: &CreatedPeginQuote) -> Result<(), Error> {
        self.inner.insert_pegin_quote(quote).await
    }

    async fn insert_retained_pegin_quote(&self, retained: &RetainedPeginQuote) -> Result<(), Error> {
        self.inner.insert_retained_pegin_quote(retained).await
    }

    async fn update_retained_pegin_quote(&self, retained: &RetainedPeginQuote) -> Result<(), Error> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(Error::Storage("connection reset".to_string()));
        }
        self.inner.update_retained_pegin_quote(retained).await
    }

    async fn upsert_trusted_account(
        &self,
        account: &Signed<TrustedAccountDetails>,
    ) -> Result<(), Error> {
        self.inner.upsert_trusted_account(account).await
    }
}
