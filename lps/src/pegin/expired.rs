//! Closing accepted quotes whose deposit window elapsed.

use crate::context::Context;
use crate::error::Error;
use crate::error::ErrorArgs;
use crate::error::UseCaseId;
use crate::quote::PeginState;
use crate::quote::RetainedPeginQuote;
use crate::storage::DbRead as _;
use crate::storage::DbWrite as _;

/// Moves accepted quotes that never got a deposit to
/// [`PeginState::TimeForDepositElapsed`], which releases their liquidity.
#[derive(Debug, Clone)]
pub struct ExpiredPeginQuoteUseCase<C> {
    context: C,
}

impl<C: Context> ExpiredPeginQuoteUseCase<C> {
    pub fn new(context: C) -> Self {
        Self { context }
    }

    /// Expire a single retained quote. Quotes that already expired are
    /// returned as they are.
    #[tracing::instrument(skip_all, fields(quote_hash = %retained.quote_hash))]
    pub async fn run(&self, retained: RetainedPeginQuote) -> Result<RetainedPeginQuote, Error> {
        let args = ErrorArgs::new().with("quoteHash", &retained.quote_hash);
        self.expire(retained)
            .await
            .map_err(|error| error.or_in_use_case_with(UseCaseId::ExpiredPeginQuote, args))
    }

    async fn expire(&self, mut retained: RetainedPeginQuote) -> Result<RetainedPeginQuote, Error> {
        match retained.state {
            PeginState::TimeForDepositElapsed => return Ok(retained),
            PeginState::WaitingForDeposit => {}
            _ => return Err(Error::IllegalQuoteState("only quotes waiting for a deposit expire")),
        }

        let storage = self.context.get_storage_mut();
        let quote = storage
            .get_pegin_quote(&retained.quote_hash)
            .await?
            .ok_or(Error::IllegalQuoteState("retained quote without a quote"))?;
        if !quote.is_expired() {
            return Err(Error::IllegalQuoteState("quote has not expired"));
        }

        retained.transition_to(PeginState::TimeForDepositElapsed)?;
        storage.update_retained_pegin_quote(&retained).await?;
        tracing::info!("deposit window elapsed");
        Ok(retained)
    }

    /// Expire every accepted quote whose deposit window elapsed, returning
    /// the hashes of the quotes that were expired. A quote that fails to
    /// expire is logged and left for the next sweep.
    #[tracing::instrument(skip_all)]
    pub async fn sweep(&self) -> Result<Vec<String>, Error> {
        let storage = self.context.get_storage();
        let waiting = storage
            .get_retained_quotes_by_state(&[PeginState::WaitingForDeposit])
            .await
            .map_err(|error| error.in_use_case(UseCaseId::ExpiredPeginQuote))?;

        let mut expired = Vec::new();
        for retained in waiting {
            let is_expired = storage
                .get_pegin_quote(&retained.quote_hash)
                .await
                .map_err(|error| error.in_use_case(UseCaseId::ExpiredPeginQuote))?
                .is_some_and(|quote| quote.is_expired());
            if !is_expired {
                continue;
            }

            let hash = retained.quote_hash.clone();
            match self.run(retained).await {
                Ok(_) => expired.push(hash),
                Err(error) => tracing::warn!(%error, quote_hash = %hash, "could not expire quote"),
            }
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use fake::Fake as _;
    use fake::Faker;

    use crate::quote::PeginQuote;
    use crate::testing::context::MockedContext;
    use crate::testing::dummy;
    use crate::testing::storage::FaultyStore;

    async fn store(context: &MockedContext, quote: PeginQuote, state: PeginState) -> RetainedPeginQuote {
        let mut retained: RetainedPeginQuote = Faker.fake();
        retained.state = state;
        let mut store = context.storage.lock().await;
        store.pegin_quotes.insert(retained.quote_hash.clone(), quote);
        store
            .retained_pegin_quotes
            .insert(retained.quote_hash.clone(), retained.clone());
        retained
    }

    #[tokio::test]
    async fn elapsed_deposit_windows_expire_the_quote() {
        let context = MockedContext::default_mocked();
        let quote = dummy::expired_quote(&mut rand::thread_rng());
        let retained = store(&context, quote, PeginState::WaitingForDeposit).await;

        let expired = ExpiredPeginQuoteUseCase::new(context.clone())
            .run(retained.clone())
            .await
            .unwrap();

        assert_eq!(expired.state, PeginState::TimeForDepositElapsed);
        let store = context.storage.lock().await;
        assert_eq!(
            store.retained_pegin_quotes[&retained.quote_hash].state,
            PeginState::TimeForDepositElapsed
        );
    }

    #[tokio::test]
    async fn expiring_twice_is_a_no_op() {
        let context = MockedContext::default_mocked();
        let quote = dummy::expired_quote(&mut rand::thread_rng());
        let retained = store(&context, quote, PeginState::TimeForDepositElapsed).await;

        let result = ExpiredPeginQuoteUseCase::new(context)
            .run(retained.clone())
            .await
            .unwrap();
        assert_eq!(result, retained);
    }

    #[tokio::test]
    async fn quotes_in_their_deposit_window_do_not_expire() {
        let context = MockedContext::default_mocked();
        let retained = store(&context, Faker.fake(), PeginState::WaitingForDeposit).await;

        let error = ExpiredPeginQuoteUseCase::new(context.clone())
            .run(retained.clone())
            .await
            .unwrap_err();

        assert!(error.contains(|e| matches!(e, Error::IllegalQuoteState(_))));
        let store = context.storage.lock().await;
        assert_eq!(
            store.retained_pegin_quotes[&retained.quote_hash].state,
            PeginState::WaitingForDeposit
        );
    }

    #[tokio::test]
    async fn only_quotes_waiting_for_a_deposit_expire() {
        let context = MockedContext::default_mocked();
        let quote = dummy::expired_quote(&mut rand::thread_rng());
        let retained = store(&context, quote, PeginState::CallForUserSucceeded).await;

        let error = ExpiredPeginQuoteUseCase::new(context)
            .run(retained)
            .await
            .unwrap_err();
        assert!(error.contains(|e| matches!(e, Error::IllegalQuoteState(_))));
        assert_eq!(error.use_case(), Some(UseCaseId::ExpiredPeginQuote));
    }

    #[test_log::test(tokio::test)]
    async fn sweeping_expires_only_elapsed_quotes() {
        let context = MockedContext::default_mocked();
        let mut rng = rand::thread_rng();
        let elapsed = store(&context, dummy::expired_quote(&mut rng), PeginState::WaitingForDeposit).await;
        let open = store(&context, Faker.fake(), PeginState::WaitingForDeposit).await;
        let confirming = store(
            &context,
            dummy::expired_quote(&mut rng),
            PeginState::WaitingForDepositConfirmations,
        )
        .await;

        let expired = ExpiredPeginQuoteUseCase::new(context.clone())
            .sweep()
            .await
            .unwrap();

        assert_eq!(expired, vec![elapsed.quote_hash.clone()]);
        let store = context.storage.lock().await;
        assert_eq!(
            store.retained_pegin_quotes[&open.quote_hash].state,
            PeginState::WaitingForDeposit
        );
        assert_eq!(
            store.retained_pegin_quotes[&confirming.quote_hash].state,
            PeginState::WaitingForDepositConfirmations
        );
    }

    #[tokio::test]
    async fn sweeping_skips_quotes_that_fail_to_expire() {
        let faulty = FaultyStore::default();
        let context = MockedContext::<FaultyStore>::mocked(faulty.clone());
        let mut retained: RetainedPeginQuote = Faker.fake();
        retained.state = PeginState::WaitingForDeposit;
        {
            let mut store = faulty.inner.lock().await;
            store
                .pegin_quotes
                .insert(retained.quote_hash.clone(), dummy::expired_quote(&mut rand::thread_rng()));
            store
                .retained_pegin_quotes
                .insert(retained.quote_hash.clone(), retained);
        }
        faulty.fail_updates(true);

        let expired = ExpiredPeginQuoteUseCase::new(context).sweep().await.unwrap();
        assert!(expired.is_empty());
    }
}
