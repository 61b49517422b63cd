//! Accepting a peg-in quote.
//!
//! Accepting a quote commits the provider to it: the quote's liquidity is
//! locked, a deposit address bound to the quote hash is derived and the
//! provider signs the hash. The user gets the signature and the deposit
//! address back.

use time::OffsetDateTime;

use crate::bitcoin::BitcoinInteract as _;
use crate::context::AcceptedPeginQuoteEvent;
use crate::context::Context;
use crate::error::Error;
use crate::error::ErrorArgs;
use crate::error::UseCaseId;
use crate::provider::LiquidityProvider as _;
use crate::provider::PeginLiquidityProvider as _;
use crate::quote::decode_quote_hash;
use crate::quote::AcceptedQuote;
use crate::quote::PeginQuote;
use crate::quote::PeginState;
use crate::quote::RetainedPeginQuote;
use crate::rootstock::bridge::BridgeInteract as _;
use crate::rootstock::bridge::FlyoverDerivation;
use crate::rootstock::bridge::FlyoverDerivationArgs;
use crate::rootstock::lbc::LbcInteract as _;
use crate::rootstock::RskInteract as _;
use crate::signature::recover_signer_hex;
use crate::signature::TrustedAccountDetails;
use crate::storage::DbRead as _;
use crate::storage::DbWrite as _;
use crate::wei::Wei;

use super::publish;
use super::required_liquidity;

/// Accepts peg-in quotes on behalf of users, or of trusted accounts when
/// the request is signed.
#[derive(Debug, Clone)]
pub struct AcceptQuoteUseCase<C> {
    context: C,
}

impl<C: Context> AcceptQuoteUseCase<C> {
    pub fn new(context: C) -> Self {
        Self { context }
    }

    /// Accept the quote with the given hash.
    ///
    /// Accepting an already accepted quote returns the original signature
    /// and deposit address without doing anything else. When a signature
    /// is given, the signer must be a trusted account with enough locking
    /// cap left.
    #[tracing::instrument(skip_all, fields(quote_hash = %quote_hash, trusted = signature.is_some()))]
    pub async fn run(
        &self,
        quote_hash: &str,
        signature: Option<&str>,
    ) -> Result<AcceptedQuote, Error> {
        self.accept(quote_hash, signature).await.map_err(|error| {
            let args = ErrorArgs::new().with("quoteHash", quote_hash);
            error.or_in_use_case_with(UseCaseId::AcceptPeginQuote, args)
        })
    }

    async fn accept(
        &self,
        quote_hash: &str,
        signature: Option<&str>,
    ) -> Result<AcceptedQuote, Error> {
        let storage = self.context.get_storage_mut();

        let quote = storage
            .get_pegin_quote(quote_hash)
            .await?
            .ok_or(Error::QuoteNotFound)?;
        if quote.is_expired() {
            return Err(Error::ExpiredQuote);
        }

        let trusted_account = match signature {
            Some(signature) => Some(self.trusted_account(quote_hash, signature).await?),
            None => None,
        };

        let _guard = self.context.pegin_liquidity_lock().acquire().await;

        if let Some(retained) = storage.get_retained_pegin_quote(quote_hash).await? {
            tracing::debug!(state = %retained.state, "quote was already accepted");
            return Ok(AcceptedQuote {
                signature: retained.signature,
                deposit_address: retained.deposit_address,
            });
        }

        if let Some(account) = &trusted_account {
            self.check_locking_cap(account, &quote).await?;
        }

        let derivation = self.derive_deposit_address(quote_hash, &quote).await?;

        let gas_price = self.context.get_rsk_client().gas_price().await?;
        let required_liquidity = required_liquidity(&quote, gas_price)?;

        let provider = self.context.get_liquidity_provider();
        if let Err(error) = provider.has_pegin_liquidity(required_liquidity).await {
            let args = ErrorArgs::new()
                .with("quoteHash", quote_hash)
                .with("amount", required_liquidity);
            return Err(error.in_use_case_with(UseCaseId::AcceptPeginQuote, args));
        }

        let signature = provider.sign_quote(quote_hash).await?;

        let retained = RetainedPeginQuote {
            quote_hash: quote_hash.to_string(),
            deposit_address: derivation.address.clone(),
            signature: signature.clone(),
            required_liquidity,
            state: PeginState::WaitingForDeposit,
            user_btc_tx_hash: None,
            call_for_user_tx_hash: None,
            call_for_user_gas_used: 0,
            call_for_user_gas_price: Wei::ZERO,
            register_pegin_tx_hash: None,
            register_pegin_gas_used: 0,
            register_pegin_gas_price: Wei::ZERO,
            owner_account_address: trusted_account.map(|account| account.address),
        };
        storage.insert_retained_pegin_quote(&retained).await?;

        tracing::info!(
            deposit_address = %retained.deposit_address,
            %required_liquidity,
            "accepted peg-in quote"
        );

        publish(
            &self.context,
            AcceptedPeginQuoteEvent {
                quote,
                retained_quote: retained,
                created_at: OffsetDateTime::now_utc(),
            },
        );

        Ok(AcceptedQuote {
            signature,
            deposit_address: derivation.address,
        })
    }

    /// Recover the account that signed the quote hash and load its
    /// verified details.
    async fn trusted_account(
        &self,
        quote_hash: &str,
        signature: &str,
    ) -> Result<TrustedAccountDetails, Error> {
        let address = recover_signer_hex(quote_hash, signature)?;
        let account = self
            .context
            .get_storage()
            .get_trusted_account(&address)
            .await?
            .ok_or_else(|| Error::TrustedAccountNotFound(address.to_string()))?;

        if !account.check_integrity()? {
            tracing::warn!(%address, "trusted account record does not match its hash");
            return Err(Error::TamperedTrustedAccount(address.to_string()));
        }
        Ok(account.value)
    }

    /// The liquidity already locked by the account plus the new quote must
    /// stay within the account's RBTC locking cap.
    async fn check_locking_cap(
        &self,
        account: &TrustedAccountDetails,
        quote: &PeginQuote,
    ) -> Result<(), Error> {
        let locked_quotes = self
            .context
            .get_storage()
            .get_retained_quotes_for_address(&account.address, &PeginState::LOCKING)
            .await?;

        let locked: Vec<Wei> = locked_quotes
            .iter()
            .map(|retained| retained.required_liquidity)
            .collect();
        let requested = Wei::sum(&locked)?
            .checked_add(quote.value)?
            .checked_add(quote.gas_fee)?;

        if requested > account.rbtc_locking_cap {
            return Err(Error::LockingCapExceeded {
                requested,
                cap: account.rbtc_locking_cap,
            });
        }
        Ok(())
    }

    async fn derive_deposit_address(
        &self,
        quote_hash: &str,
        quote: &PeginQuote,
    ) -> Result<FlyoverDerivation, Error> {
        let hash = decode_quote_hash(quote_hash)?;
        let bitcoin_client = self.context.get_bitcoin_client();
        let bridge = self.context.get_bridge();

        let (user_btc_refund_address, lp_btc_address, fed_info) = futures::try_join!(
            bitcoin_client.decode_address(&quote.btc_refund_address),
            bitcoin_client.decode_address(&quote.lp_btc_address),
            bridge.fetch_federation_info(),
        )?;

        let args = FlyoverDerivationArgs {
            fed_info,
            lbc_address: self.context.get_lbc().address().to_vec(),
            user_btc_refund_address,
            lp_btc_address,
            quote_hash: hash,
        };
        bridge.get_flyover_derivation_address(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use alloy_primitives::Address;
    use fake::Fake as _;
    use fake::Faker;
    use secp256k1::SecretKey;
    use secp256k1::SECP256K1;

    use crate::context::LpsEvent;
    use crate::rootstock::bridge::FederationInfo;
    use crate::signature::public_key_address;
    use crate::signature::sign_hash;
    use crate::signature::Signed;
    use crate::testing::context::MockedContext;
    use crate::testing::dummy;

    const DEPOSIT_ADDRESS: &str = "2N9uQUBMVS8y5t2fUBTN7UbL3GEY8GUqYBW";

    fn federation_info() -> FederationInfo {
        FederationInfo {
            fed_size: 3,
            fed_threshold: 2,
            pub_keys: vec!["02aa".into(), "02bb".into(), "02cc".into()],
            fed_address: "2N5muMepJizJE1gR7FbHJU6CD18V3BpNF9p".into(),
            active_fed_block_height: 500,
            iris_activation_height: 0,
            erp_keys: vec![],
        }
    }

    /// A context whose collaborators can accept any quote, with the given
    /// balance in the provider's account.
    async fn context(balance: u64) -> MockedContext {
        let context = MockedContext::default_mocked();
        let lbc_address = Address::repeat_byte(0x11);

        context
            .with_bitcoin_client(|client| {
                client.expect_decode_address().returning(|address| {
                    let bytes = address.as_bytes().to_vec();
                    Box::pin(async move { Ok(bytes) })
                });
            })
            .await;
        context
            .with_bridge(|bridge| {
                bridge
                    .expect_fetch_federation_info()
                    .returning(|| Box::pin(async { Ok(federation_info()) }));
                bridge
                    .expect_get_flyover_derivation_address()
                    .returning(move |args| {
                        assert_eq!(args.lbc_address, lbc_address.to_vec());
                        Box::pin(async {
                            Ok(FlyoverDerivation {
                                address: DEPOSIT_ADDRESS.to_string(),
                                redeem_script: "a914".to_string(),
                            })
                        })
                    });
            })
            .await;
        context
            .with_rsk_client(|client| {
                client
                    .expect_gas_price()
                    .returning(|| Box::pin(async { Ok(Wei::new(50)) }));
                client
                    .expect_get_balance()
                    .returning(move |_| Box::pin(async move { Ok(Wei::new(balance)) }));
            })
            .await;
        context
            .with_lbc(|lbc| {
                lbc.expect_address().return_const(lbc_address);
                lbc.expect_get_balance()
                    .returning(|_| Box::pin(async { Ok(Wei::ZERO) }));
            })
            .await;
        context
    }

    async fn store_quote(context: &MockedContext, quote: PeginQuote) -> String {
        let hash = dummy::quote_hash(&mut rand::thread_rng());
        context
            .storage
            .lock()
            .await
            .pegin_quotes
            .insert(hash.clone(), quote);
        hash
    }

    fn quote(value: u64, gas_fee: u64) -> PeginQuote {
        let mut quote: PeginQuote = Faker.fake();
        quote.gas_limit = 5000;
        quote.value = Wei::new(value);
        quote.gas_fee = Wei::new(gas_fee);
        quote
    }

    struct TrustedSigner {
        key: SecretKey,
        address: Address,
    }

    impl TrustedSigner {
        fn new() -> Self {
            let key = SecretKey::new(&mut rand::thread_rng());
            let address = public_key_address(&key.public_key(SECP256K1));
            Self { key, address }
        }

        fn sign(&self, quote_hash: &str) -> String {
            let hash = decode_quote_hash(quote_hash).unwrap();
            hex::encode(sign_hash(&self.key, &hash))
        }

        async fn register(&self, context: &MockedContext, rbtc_locking_cap: u64) {
            let details = TrustedAccountDetails {
                address: self.address,
                name: "trusted".to_string(),
                btc_locking_cap: Wei::new(rbtc_locking_cap),
                rbtc_locking_cap: Wei::new(rbtc_locking_cap),
            };
            let signed = Signed::new(details, &self.key).unwrap();
            context
                .storage
                .lock()
                .await
                .trusted_accounts
                .insert(self.address, signed);
        }
    }

    #[test_log::test(tokio::test)]
    async fn accepting_locks_liquidity_and_publishes() {
        let context = context(1_000_000_000).await;
        let mut events = context.get_signal_receiver();
        let hash = store_quote(&context, quote(30000, 1)).await;

        let accepted = AcceptQuoteUseCase::new(context.clone())
            .run(&hash, None)
            .await
            .unwrap();
        assert_eq!(accepted.deposit_address, DEPOSIT_ADDRESS);

        let provider = context.get_liquidity_provider();
        assert_eq!(
            recover_signer_hex(&hash, &accepted.signature).unwrap(),
            provider.rsk_address()
        );

        let store = context.storage.lock().await;
        let retained = store.retained_pegin_quotes.get(&hash).unwrap();
        assert_eq!(retained.state, PeginState::WaitingForDeposit);
        assert_eq!(retained.required_liquidity, Wei::new(9_280_000));
        assert_eq!(retained.signature, accepted.signature);
        assert_eq!(retained.owner_account_address, None);
        drop(store);

        let LpsEvent::AcceptedPeginQuote(event) = events.try_recv().unwrap() else {
            panic!("expected an accepted quote event");
        };
        assert_eq!(event.retained_quote.quote_hash, hash);
    }

    #[tokio::test]
    async fn accepting_twice_returns_the_first_acceptance() {
        let context = context(1_000_000_000).await;
        let mut events = context.get_signal_receiver();
        let hash = store_quote(&context, quote(30000, 1)).await;
        let use_case = AcceptQuoteUseCase::new(context.clone());

        let first = use_case.run(&hash, None).await.unwrap();
        let second = use_case.run(&hash, None).await.unwrap();
        assert_eq!(first, second);

        assert!(events.try_recv().is_ok());
        assert!(events.try_recv().is_err());
        assert_eq!(context.storage.lock().await.retained_pegin_quotes.len(), 1);
    }

    #[tokio::test]
    async fn unknown_quotes_are_not_accepted() {
        let context = context(1_000_000_000).await;
        let error = AcceptQuoteUseCase::new(context.clone())
            .run(&"00".repeat(32), None)
            .await
            .unwrap_err();

        assert!(error.contains(|e| matches!(e, Error::QuoteNotFound)));
        assert_eq!(error.use_case(), Some(UseCaseId::AcceptPeginQuote));
    }

    #[tokio::test]
    async fn expired_quotes_are_not_accepted() {
        let context = context(1_000_000_000).await;
        let mut events = context.get_signal_receiver();
        let hash = store_quote(&context, dummy::expired_quote(&mut rand::thread_rng())).await;

        let error = AcceptQuoteUseCase::new(context.clone())
            .run(&hash, None)
            .await
            .unwrap_err();

        assert!(error.contains(|e| matches!(e, Error::ExpiredQuote)));
        assert!(context.storage.lock().await.retained_pegin_quotes.is_empty());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn missing_liquidity_names_the_amount() {
        let context = context(1000).await;
        let hash = store_quote(&context, quote(30000, 1)).await;

        let error = AcceptQuoteUseCase::new(context.clone())
            .run(&hash, None)
            .await
            .unwrap_err();

        assert!(error.contains(|e| matches!(e, Error::NoLiquidity)));
        let Error::UseCase { args, .. } = &error else {
            panic!("expected a use case error");
        };
        assert_eq!(args.get("amount"), Some("9280000"));
        assert_eq!(args.get("quoteHash"), Some(hash.as_str()));
        assert!(context.storage.lock().await.retained_pegin_quotes.is_empty());
    }

    #[tokio::test]
    async fn trusted_accounts_record_ownership() {
        let context = context(1_000_000_000).await;
        let signer = TrustedSigner::new();
        signer.register(&context, 100_000_000).await;
        let hash = store_quote(&context, quote(30000, 20000)).await;

        AcceptQuoteUseCase::new(context.clone())
            .run(&hash, Some(&signer.sign(&hash)))
            .await
            .unwrap();

        let store = context.storage.lock().await;
        let retained = store.retained_pegin_quotes.get(&hash).unwrap();
        assert_eq!(retained.owner_account_address, Some(signer.address));
    }

    #[tokio::test]
    async fn trusted_accounts_cannot_exceed_their_cap() {
        let context = context(1_000_000_000).await;
        let signer = TrustedSigner::new();
        signer.register(&context, 100_000).await;

        for required in [40_000, 50_000] {
            let mut retained: RetainedPeginQuote = Faker.fake();
            retained.required_liquidity = Wei::new(required);
            retained.owner_account_address = Some(signer.address);
            context
                .storage
                .lock()
                .await
                .retained_pegin_quotes
                .insert(retained.quote_hash.clone(), retained);
        }
        let hash = store_quote(&context, quote(30000, 20000)).await;

        let error = AcceptQuoteUseCase::new(context.clone())
            .run(&hash, Some(&signer.sign(&hash)))
            .await
            .unwrap_err();

        assert!(error.contains(|e| matches!(
            e,
            Error::LockingCapExceeded { requested, cap }
                if *requested == Wei::new(140_000) && *cap == Wei::new(100_000)
        )));
        assert!(!context
            .storage
            .lock()
            .await
            .retained_pegin_quotes
            .contains_key(&hash));
    }

    #[tokio::test]
    async fn unknown_signers_are_rejected() {
        let context = context(1_000_000_000).await;
        let signer = TrustedSigner::new();
        let hash = store_quote(&context, quote(30000, 1)).await;

        let error = AcceptQuoteUseCase::new(context.clone())
            .run(&hash, Some(&signer.sign(&hash)))
            .await
            .unwrap_err();

        assert!(error.contains(|e| matches!(e, Error::TrustedAccountNotFound(_))));
    }

    #[tokio::test]
    async fn tampered_trusted_accounts_are_rejected() {
        let context = context(1_000_000_000).await;
        let signer = TrustedSigner::new();
        signer.register(&context, 100).await;
        context
            .storage
            .lock()
            .await
            .trusted_accounts
            .get_mut(&signer.address)
            .unwrap()
            .value
            .rbtc_locking_cap = Wei::new(u64::MAX);
        let hash = store_quote(&context, quote(30000, 1)).await;

        let error = AcceptQuoteUseCase::new(context.clone())
            .run(&hash, Some(&signer.sign(&hash)))
            .await
            .unwrap_err();

        assert!(error.contains(|e| matches!(e, Error::TamperedTrustedAccount(_))));
        assert!(context.storage.lock().await.retained_pegin_quotes.is_empty());
    }
}
