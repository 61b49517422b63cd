//! Reading back everything known about an accepted quote.

use crate::context::Context;
use crate::error::Error;
use crate::error::ErrorArgs;
use crate::error::UseCaseId;
use crate::quote::WatchedPeginQuote;
use crate::storage::DbRead as _;

#[derive(Debug, Clone)]
pub struct PeginStatusUseCase<C> {
    context: C,
}

impl<C: Context> PeginStatusUseCase<C> {
    pub fn new(context: C) -> Self {
        Self { context }
    }

    pub async fn run(&self, hash: &str) -> Result<WatchedPeginQuote, Error> {
        self.status(hash).await.map_err(|error| {
            error.in_use_case_with(
                UseCaseId::PeginQuoteStatus,
                ErrorArgs::new().with("quoteHash", hash),
            )
        })
    }

    async fn status(&self, hash: &str) -> Result<WatchedPeginQuote, Error> {
        let storage = self.context.get_storage();
        let pegin_quote = storage
            .get_pegin_quote(hash)
            .await?
            .ok_or(Error::QuoteNotFound)?;
        let retained_quote = storage
            .get_retained_pegin_quote(hash)
            .await?
            .ok_or(Error::QuoteNotAccepted)?;
        let creation_data = storage.get_pegin_creation_data(hash).await?;

        Ok(WatchedPeginQuote {
            pegin_quote,
            retained_quote,
            creation_data,
        })
    }
}
