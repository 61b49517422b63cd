use lps::error::Error;
use lps::pegin::accept_quote::AcceptQuoteUseCase;
use lps::pegin::call_for_user::CallForUserUseCase;
use lps::quote::PeginState;

use crate::setup;

const VALUE: u64 = 100_000_000_000_000_000;

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn concurrent_acceptances_never_overcommit_liquidity() {
    let balance = 2 * setup::required_liquidity(VALUE) + 1;
    let context = setup::context(balance).await;

    let mut hashes = Vec::new();
    for _ in 0..5 {
        hashes.push(setup::quote(&context, VALUE).await.hash);
    }

    let handles: Vec<_> = hashes
        .iter()
        .cloned()
        .map(|hash| {
            let use_case = AcceptQuoteUseCase::new(context.clone());
            tokio::spawn(async move { use_case.run(&hash, None).await })
        })
        .collect();
    let results = futures::future::join_all(handles).await;

    let mut accepted = 0;
    for result in results {
        match result.unwrap() {
            Ok(_) => accepted += 1,
            Err(error) => assert!(error.contains(|e| matches!(e, Error::NoLiquidity))),
        }
    }
    assert_eq!(accepted, 2);

    let store = context.storage.lock().await;
    let waiting = store
        .retained_pegin_quotes
        .values()
        .filter(|retained| retained.state == PeginState::WaitingForDeposit)
        .count();
    assert_eq!(waiting, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_acceptances_of_one_quote_retain_it_once() {
    let context = setup::context(10 * setup::required_liquidity(VALUE)).await;
    let hash = setup::quote(&context, VALUE).await.hash;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let use_case = AcceptQuoteUseCase::new(context.clone());
            let hash = hash.clone();
            tokio::spawn(async move { use_case.run(&hash, None).await })
        })
        .collect();

    let mut accepted = Vec::new();
    for result in futures::future::join_all(handles).await {
        accepted.push(result.unwrap().unwrap());
    }
    assert!(accepted.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(context.storage.lock().await.retained_pegin_quotes.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn calls_for_different_users_are_all_performed() {
    let context = setup::context(10 * setup::required_liquidity(VALUE)).await;

    let mut retained = Vec::new();
    for _ in 0..3 {
        let hash = setup::quote(&context, VALUE).await.hash;
        AcceptQuoteUseCase::new(context.clone())
            .run(&hash, None)
            .await
            .unwrap();
        retained.push(setup::observe_deposit(&context, &hash).await);
    }

    let handles: Vec<_> = retained
        .into_iter()
        .map(|retained| {
            let use_case = CallForUserUseCase::new(context.clone());
            tokio::spawn(async move { use_case.run(retained).await })
        })
        .collect();

    for result in futures::future::join_all(handles).await {
        let retained = result.unwrap().unwrap();
        assert_eq!(retained.state, PeginState::CallForUserSucceeded);
    }
}
