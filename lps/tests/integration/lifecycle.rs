use lps::context::Context as _;
use lps::context::LpsEvent;
use lps::error::Error;
use lps::pegin::accept_quote::AcceptQuoteUseCase;
use lps::pegin::call_for_user::CallForUserUseCase;
use lps::pegin::expired::ExpiredPeginQuoteUseCase;
use lps::pegin::register_pegin::RegisterPeginUseCase;
use lps::pegin::report::GetPeginReportUseCase;
use lps::pegin::status::PeginStatusUseCase;
use lps::quote::PeginState;
use lps::signature::recover_signer_hex;
use lps::wei::Wei;
use time::Duration;
use time::OffsetDateTime;

use crate::setup;

const VALUE: u64 = 100_000_000_000_000_000;
const BALANCE: u64 = 10_000_000_000_000_000_000;

#[test_log::test(tokio::test)]
async fn a_pegin_settles_from_quote_to_registration() {
    let context = setup::context(BALANCE).await;
    let mut events = context.get_signal_receiver();

    let quote = setup::quote(&context, VALUE).await;
    assert_eq!(quote.quote.gas_limit as u64, setup::CALL_GAS);

    let accepted = AcceptQuoteUseCase::new(context.clone())
        .run(&quote.hash, None)
        .await
        .unwrap();
    assert_eq!(accepted.deposit_address, setup::DEPOSIT_ADDRESS);
    let signer = recover_signer_hex(&quote.hash, &accepted.signature).unwrap();
    assert_eq!(signer, quote.quote.lp_rsk_address);

    let retained = setup::retained(&context, &quote.hash).await;
    assert_eq!(retained.state, PeginState::WaitingForDeposit);
    assert_eq!(
        retained.required_liquidity,
        Wei::new(setup::required_liquidity(VALUE))
    );

    let retained = setup::observe_deposit(&context, &quote.hash).await;
    let retained = CallForUserUseCase::new(context.clone())
        .run(retained)
        .await
        .unwrap();
    assert_eq!(retained.state, PeginState::CallForUserSucceeded);
    assert_eq!(retained.call_for_user_tx_hash.as_deref(), Some("0xca11"));

    let retained = RegisterPeginUseCase::new(context.clone())
        .run(retained)
        .await
        .unwrap();
    assert_eq!(retained.state, PeginState::RegisterPeginSucceeded);
    assert_eq!(retained.register_pegin_tx_hash.as_deref(), Some("0x5e61"));

    let watched = PeginStatusUseCase::new(context.clone())
        .run(&quote.hash)
        .await
        .unwrap();
    assert_eq!(watched.pegin_quote, quote.quote);
    assert_eq!(watched.retained_quote, retained);
    assert_eq!(watched.creation_data.gas_price, Wei::new(setup::GAS_PRICE));

    let now = OffsetDateTime::now_utc();
    let report = GetPeginReportUseCase::new(context.clone())
        .run(now - Duration::hours(1), now + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(report.number_of_quotes, 1);
    assert_eq!(report.total_fees_collected, quote.quote.call_fee);
    assert_eq!(report.average_quote_value, Wei::new(VALUE));

    let accepted_event = events.recv().await.unwrap();
    assert!(matches!(accepted_event, LpsEvent::AcceptedPeginQuote(_)));
    match events.recv().await.unwrap() {
        LpsEvent::CallForUserCompleted(event) => assert!(event.error.is_none()),
        event => panic!("unexpected event {event:?}"),
    }
    match events.recv().await.unwrap() {
        LpsEvent::RegisterPeginCompleted(event) => assert!(event.error.is_none()),
        event => panic!("unexpected event {event:?}"),
    }
}

#[tokio::test]
async fn accepting_again_returns_the_first_acceptance() {
    let context = setup::context(BALANCE).await;
    let quote = setup::quote(&context, VALUE).await;
    let use_case = AcceptQuoteUseCase::new(context.clone());

    let first = use_case.run(&quote.hash, None).await.unwrap();
    let second = use_case.run(&quote.hash, None).await.unwrap();

    assert_eq!(first, second);
    let store = context.storage.lock().await;
    assert_eq!(store.retained_pegin_quotes.len(), 1);
}

#[tokio::test]
async fn quotes_without_a_deposit_expire_and_release_liquidity() {
    let context = setup::context(setup::required_liquidity(VALUE)).await;
    let quote = setup::quote(&context, VALUE).await;
    AcceptQuoteUseCase::new(context.clone())
        .run(&quote.hash, None)
        .await
        .unwrap();

    // The whole balance is locked by the first quote.
    let second = setup::quote(&context, VALUE).await;
    let error = AcceptQuoteUseCase::new(context.clone())
        .run(&second.hash, None)
        .await
        .unwrap_err();
    assert!(error.contains(|e| matches!(e, Error::NoLiquidity)));

    // Move the agreement of the first quote past its deposit window.
    {
        let mut store = context.storage.lock().await;
        let stored = store.pegin_quotes.get_mut(&quote.hash).unwrap();
        stored.agreement_timestamp -= 2 * stored.time_for_deposit;
    }

    let expired = ExpiredPeginQuoteUseCase::new(context.clone())
        .sweep()
        .await
        .unwrap();
    assert_eq!(expired, vec![quote.hash.clone()]);
    let retained = setup::retained(&context, &quote.hash).await;
    assert_eq!(retained.state, PeginState::TimeForDepositElapsed);

    let error = CallForUserUseCase::new(context.clone())
        .run(retained)
        .await
        .unwrap_err();
    assert!(error.contains(|e| matches!(e, Error::WrongState(PeginState::TimeForDepositElapsed))));

    AcceptQuoteUseCase::new(context.clone())
        .run(&second.hash, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn registration_waits_for_the_bridge_confirmations() {
    let context = setup::context(BALANCE).await;
    context
        .with_bitcoin_client(|client| {
            client.checkpoint();
            client
                .expect_validate_address()
                .returning(|_| Box::pin(async { Ok(()) }));
            client.expect_decode_address().returning(|address| {
                let bytes = address.as_bytes().to_vec();
                Box::pin(async move { Ok(bytes) })
            });
            client.expect_get_transaction_info().returning(|txid| {
                let info = lps::bitcoin::BitcoinTxInfo {
                    txid: *txid,
                    confirmations: setup::BRIDGE_CONFIRMATIONS - 1,
                    outputs: [(
                        setup::DEPOSIT_ADDRESS.to_string(),
                        vec![Wei::new(setup::DEPOSIT)],
                    )]
                    .into(),
                };
                Box::pin(async move { Ok(info) })
            });
        })
        .await;

    let quote = setup::quote(&context, VALUE).await;
    AcceptQuoteUseCase::new(context.clone())
        .run(&quote.hash, None)
        .await
        .unwrap();
    let retained = setup::observe_deposit(&context, &quote.hash).await;
    let retained = CallForUserUseCase::new(context.clone())
        .run(retained)
        .await
        .unwrap();

    let error = RegisterPeginUseCase::new(context.clone())
        .run(retained)
        .await
        .unwrap_err();

    assert!(error.contains(|e| matches!(
        e,
        Error::NoEnoughConfirmations { actual, required }
            if *actual == setup::BRIDGE_CONFIRMATIONS - 1 && *required == setup::BRIDGE_CONFIRMATIONS
    )));
    let retained = setup::retained(&context, &quote.hash).await;
    assert_eq!(retained.state, PeginState::CallForUserSucceeded);
}
