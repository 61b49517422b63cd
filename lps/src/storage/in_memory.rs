//! In-memory store implementation - useful for tests

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::Address;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::error::Error;
use crate::quote::CreatedPeginQuote;
use crate::quote::PeginCreationData;
use crate::quote::PeginQuote;
use crate::quote::PeginState;
use crate::quote::RetainedPeginQuote;
use crate::signature::Signed;
use crate::signature::TrustedAccountDetails;

/// A store wrapped in an Arc<Mutex<...>> for interior mutability
pub type SharedStore = Arc<Mutex<Store>>;

/// In-memory store
#[derive(Debug, Default)]
pub struct Store {
    /// Peg-in quotes by hash
    pub pegin_quotes: HashMap<String, PeginQuote>,

    /// Creation data by quote hash
    pub pegin_creation_data: HashMap<String, PeginCreationData>,

    /// Retained quotes by quote hash
    pub retained_pegin_quotes: HashMap<String, RetainedPeginQuote>,

    /// Trusted accounts
    pub trusted_accounts: HashMap<Address, Signed<TrustedAccountDetails>>,
}

impl Store {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store wrapped in an Arc<Mutex<...>>
    pub fn new_shared() -> SharedStore {
        Arc::new(Mutex::new(Self::new()))
    }

    fn retained_matching<F>(&self, predicate: F) -> Vec<RetainedPeginQuote>
    where
        F: Fn(&RetainedPeginQuote) -> bool,
    {
        let mut quotes: Vec<_> = self
            .retained_pegin_quotes
            .values()
            .filter(|retained| predicate(retained))
            .cloned()
            .collect();
        quotes.sort_by(|a, b| a.quote_hash.cmp(&b.quote_hash));
        quotes
    }
}

impl super::DbRead for SharedStore {
    async fn get_pegin_quote(&self, hash: &str) -> Result<Option<PeginQuote>, Error> {
        Ok(self.lock().await.pegin_quotes.get(hash).cloned())
    }

    async fn get_retained_pegin_quote(
        &self,
        hash: &str,
    ) -> Result<Option<RetainedPeginQuote>, Error> {
        Ok(self.lock().await.retained_pegin_quotes.get(hash).cloned())
    }

    async fn get_retained_quotes_for_address(
        &self,
        address: &Address,
        states: &[PeginState],
    ) -> Result<Vec<RetainedPeginQuote>, Error> {
        let store = self.lock().await;
        Ok(store.retained_matching(|retained| {
            retained.owner_account_address.as_ref() == Some(address)
                && states.contains(&retained.state)
        }))
    }

    async fn get_retained_quotes_by_state(
        &self,
        states: &[PeginState],
    ) -> Result<Vec<RetainedPeginQuote>, Error> {
        let store = self.lock().await;
        Ok(store.retained_matching(|retained| states.contains(&retained.state)))
    }

    async fn get_quotes_by_hashes_and_date(
        &self,
        hashes: &[String],
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> Result<Vec<(String, PeginQuote)>, Error> {
        let store = self.lock().await;
        let range = from.unix_timestamp()..=to.unix_timestamp();
        let mut quotes: Vec<_> = hashes
            .iter()
            .filter_map(|hash| {
                let quote = store.pegin_quotes.get(hash)?;
                range
                    .contains(&(quote.agreement_timestamp as i64))
                    .then(|| (hash.clone(), quote.clone()))
            })
            .collect();
        quotes.sort_by(|a, b| a.0.cmp(&b.0));
        quotes.dedup_by(|a, b| a.0 == b.0);
        Ok(quotes)
    }

    async fn get_pegin_creation_data(&self, hash: &str) -> Result<PeginCreationData, Error> {
        Ok(self
            .lock()
            .await
            .pegin_creation_data
            .get(hash)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_trusted_account(
        &self,
        address: &Address,
    ) -> Result<Option<Signed<TrustedAccountDetails>>, Error> {
        Ok(self.lock().await.trusted_accounts.get(address).cloned())
    }
}

impl super::DbWrite for SharedStore {
    async fn insert_pegin_quote(&self, quote: &CreatedPeginQuote) -> Result<(), Error> {
        let mut store = self.lock().await;
        store
            .pegin_quotes
            .insert(quote.hash.clone(), quote.quote.clone());
        store
            .pegin_creation_data
            .insert(quote.hash.clone(), quote.creation_data.clone());
        Ok(())
    }

    async fn insert_retained_pegin_quote(&self, retained: &RetainedPeginQuote) -> Result<(), Error> {
        let mut store = self.lock().await;
        if store.retained_pegin_quotes.contains_key(&retained.quote_hash) {
            return Err(Error::Storage(format!(
                "retained quote {} already exists",
                retained.quote_hash
            )));
        }
        store
            .retained_pegin_quotes
            .insert(retained.quote_hash.clone(), retained.clone());
        Ok(())
    }

    async fn update_retained_pegin_quote(&self, retained: &RetainedPeginQuote) -> Result<(), Error> {
        let mut store = self.lock().await;
        match store.retained_pegin_quotes.get_mut(&retained.quote_hash) {
            Some(existing) => {
                *existing = retained.clone();
                Ok(())
            }
            None => Err(Error::Storage(format!(
                "retained quote {} does not exist",
                retained.quote_hash
            ))),
        }
    }

    async fn upsert_trusted_account(
        &self,
        account: &Signed<TrustedAccountDetails>,
    ) -> Result<(), Error> {
        self.lock()
            .await
            .trusted_accounts
            .insert(account.value.address, account.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use fake::Fake as _;
    use fake::Faker;
    use time::Duration;

    use crate::storage::DbRead as _;
    use crate::storage::DbWrite as _;

    fn retained(hash: &str, state: PeginState, owner: Option<Address>) -> RetainedPeginQuote {
        let mut retained: RetainedPeginQuote = Faker.fake();
        retained.quote_hash = hash.to_string();
        retained.state = state;
        retained.owner_account_address = owner;
        retained
    }

    #[tokio::test]
    async fn retained_quotes_are_inserted_once_and_updated_in_place() {
        let store = Store::new_shared();
        let mut quote = retained("aa", PeginState::WaitingForDeposit, None);

        store.insert_retained_pegin_quote(&quote).await.unwrap();
        assert!(store.insert_retained_pegin_quote(&quote).await.is_err());

        quote.state = PeginState::WaitingForDepositConfirmations;
        store.update_retained_pegin_quote(&quote).await.unwrap();
        let stored = store.get_retained_pegin_quote("aa").await.unwrap().unwrap();
        assert_eq!(stored, quote);

        let missing = retained("bb", PeginState::WaitingForDeposit, None);
        assert!(store.update_retained_pegin_quote(&missing).await.is_err());
    }

    #[tokio::test]
    async fn retained_quotes_are_filtered_by_owner_and_state() {
        let store = Store::new_shared();
        let owner = Address::repeat_byte(1);
        let quotes = [
            retained("a", PeginState::WaitingForDeposit, Some(owner)),
            retained("b", PeginState::WaitingForDepositConfirmations, Some(owner)),
            retained("c", PeginState::CallForUserSucceeded, Some(owner)),
            retained("d", PeginState::WaitingForDeposit, None),
        ];
        for quote in quotes.iter() {
            store.insert_retained_pegin_quote(quote).await.unwrap();
        }

        let owned = store
            .get_retained_quotes_for_address(&owner, &PeginState::LOCKING)
            .await
            .unwrap();
        let hashes: Vec<_> = owned.iter().map(|q| q.quote_hash.as_str()).collect();
        assert_eq!(hashes, ["a", "b"]);

        let waiting = store
            .get_retained_quotes_by_state(&[PeginState::WaitingForDeposit])
            .await
            .unwrap();
        let hashes: Vec<_> = waiting.iter().map(|q| q.quote_hash.as_str()).collect();
        assert_eq!(hashes, ["a", "d"]);
    }

    #[tokio::test]
    async fn quotes_are_filtered_by_date() {
        let store = Store::new_shared();
        let now = OffsetDateTime::now_utc();
        for (hash, offset) in [("old", -10), ("inside", 0), ("future", 10)] {
            let mut quote: PeginQuote = Faker.fake();
            quote.agreement_timestamp = (now + Duration::days(offset)).unix_timestamp() as u32;
            let created = CreatedPeginQuote {
                hash: hash.to_string(),
                quote,
                creation_data: PeginCreationData::default(),
            };
            store.insert_pegin_quote(&created).await.unwrap();
        }

        let hashes = ["old", "inside", "future", "unknown"].map(String::from);
        let quotes = store
            .get_quotes_by_hashes_and_date(&hashes, now - Duration::days(1), now + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].0, "inside");
    }

    #[tokio::test]
    async fn missing_creation_data_reads_as_zero() {
        let store = Store::new_shared();
        let data = store.get_pegin_creation_data("nope").await.unwrap();
        assert_eq!(data, PeginCreationData::default());
    }
}
