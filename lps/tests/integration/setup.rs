//! A mocked chain environment in which every peg-in step succeeds.

use std::collections::BTreeMap;

use alloy_primitives::Address;
use alloy_primitives::Bytes;
use bitcoin::hashes::Hash as _;
use bitcoin::BlockHash;
use bitcoin::Txid;
use lps::bitcoin::BitcoinBlockInfo;
use lps::bitcoin::BitcoinTxInfo;
use lps::context::Context as _;
use lps::pegin::get_quote::GetPeginQuoteUseCase;
use lps::pegin::get_quote::GetPeginQuoteResult;
use lps::pegin::get_quote::PeginQuoteRequest;
use lps::quote::PeginState;
use lps::quote::RetainedPeginQuote;
use lps::rootstock::bridge::FederationInfo;
use lps::rootstock::bridge::FlyoverDerivation;
use lps::rootstock::TransactionReceipt;
use lps::storage::DbRead as _;
use lps::storage::DbWrite as _;
use lps::testing::context::MockedContext;
use lps::testing::dummy;
use lps::wei::Wei;

pub const DEPOSIT_ADDRESS: &str = "2N9uQUBMVS8y5t2fUBTN7UbL3GEY8GUqYBW";
pub const FEDERATION_ADDRESS: &str = "2N5muMepJizJE1gR7FbHJU6CD18V3BpNF9p";
pub const USER_BTC_ADDRESS: &str = "mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn";
pub const DESTINATION: &str = "0x79568c2989232dca1840087d73d403602364c0d5";

pub const CALL_GAS: u64 = 30_000;
pub const GAS_PRICE: u64 = 60_000_000;
pub const BRIDGE_CONFIRMATIONS: u64 = 10;

/// What the user deposits, enough for any quote the tests create.
pub const DEPOSIT: u64 = 1_000_000_000_000_000_000;

/// The liquidity a quote of the given value locks.
pub fn required_liquidity(value: u64) -> u64 {
    (CALL_GAS + lps::CALL_FOR_USER_EXTRA_GAS) * GAS_PRICE + value
}

/// A context whose collaborators accept every step of a peg-in, with the
/// given balance in the provider's account.
pub async fn context(balance: u64) -> MockedContext {
    let context = MockedContext::default_mocked();
    let lbc_address = Address::repeat_byte(0x42);

    context
        .with_bitcoin_client(|client| {
            client
                .expect_validate_address()
                .returning(|_| Box::pin(async { Ok(()) }));
            client.expect_decode_address().returning(|address| {
                let bytes = address.as_bytes().to_vec();
                Box::pin(async move { Ok(bytes) })
            });
            client.expect_get_transaction_info().returning(|txid: &Txid| {
                let info = BitcoinTxInfo {
                    txid: *txid,
                    confirmations: 50,
                    outputs: BTreeMap::from([(DEPOSIT_ADDRESS.to_string(), vec![Wei::new(DEPOSIT)])]),
                };
                Box::pin(async move { Ok(info) })
            });
            client
                .expect_get_raw_transaction()
                .returning(|_| Box::pin(async { Ok(vec![0x02, 0x00, 0x00, 0x00]) }));
            client
                .expect_get_partial_merkle_tree()
                .returning(|_| Box::pin(async { Ok(vec![0x01, 0x00]) }));
            client.expect_get_transaction_block_info().returning(|_| {
                Box::pin(async {
                    Ok(BitcoinBlockInfo {
                        hash: BlockHash::all_zeros(),
                        height: 2_800_000,
                    })
                })
            });
        })
        .await;

    context
        .with_rsk_client(|client| {
            client
                .expect_estimate_gas()
                .returning(|_, _, _| Box::pin(async { Ok(CALL_GAS) }));
            client
                .expect_gas_price()
                .returning(|| Box::pin(async { Ok(Wei::new(GAS_PRICE)) }));
            client
                .expect_get_balance()
                .returning(move |_| Box::pin(async move { Ok(Wei::new(balance)) }));
        })
        .await;

    context
        .with_bridge(|bridge| {
            bridge
                .expect_dao_fee_percentage()
                .returning(|| Box::pin(async { Ok(0) }));
            bridge
                .expect_get_fed_address()
                .returning(|| Box::pin(async { Ok(FEDERATION_ADDRESS.to_string()) }));
            bridge
                .expect_get_minimum_lock_tx_value()
                .returning(|| Box::pin(async { Ok(Wei::from_satoshis(500_000)) }));
            bridge
                .expect_get_required_tx_confirmations()
                .returning(|| Box::pin(async { Ok(BRIDGE_CONFIRMATIONS) }));
            bridge.expect_fetch_federation_info().returning(|| {
                Box::pin(async {
                    Ok(FederationInfo {
                        fed_size: 3,
                        fed_threshold: 2,
                        pub_keys: vec!["02aa".into(), "02bb".into(), "02cc".into()],
                        fed_address: FEDERATION_ADDRESS.into(),
                        active_fed_block_height: 1000,
                        iris_activation_height: 0,
                        erp_keys: vec![],
                    })
                })
            });
            bridge.expect_get_flyover_derivation_address().returning(|_| {
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
        .with_lbc(|lbc| {
            lbc.expect_address().return_const(lbc_address);
            lbc.expect_hash_pegin_quote().returning(|quote| {
                let hash = format!("{:064x}", quote.nonce);
                Box::pin(async move { Ok(hash) })
            });
            lbc.expect_get_balance()
                .returning(|_| Box::pin(async { Ok(Wei::ZERO) }));
            lbc.expect_call_for_user().returning(|_, _| {
                Box::pin(async {
                    Ok(TransactionReceipt {
                        tx_hash: "0xca11".to_string(),
                        gas_used: 120_000,
                        gas_price: Wei::new(GAS_PRICE),
                    })
                })
            });
            lbc.expect_register_pegin().returning(|_| {
                Box::pin(async {
                    Ok(TransactionReceipt {
                        tx_hash: "0x5e61".to_string(),
                        gas_used: 250_000,
                        gas_price: Wei::new(GAS_PRICE),
                    })
                })
            });
        })
        .await;

    context
}

pub async fn quote(context: &MockedContext, value: u64) -> GetPeginQuoteResult {
    GetPeginQuoteUseCase::new(context.clone())
        .run(PeginQuoteRequest {
            destination: DESTINATION.to_string(),
            data: Bytes::new(),
            value: Wei::new(value),
            rsk_refund_address: DESTINATION.to_string(),
            btc_refund_address: USER_BTC_ADDRESS.to_string(),
        })
        .await
        .unwrap()
}

pub async fn retained(context: &MockedContext, hash: &str) -> RetainedPeginQuote {
    context
        .get_storage()
        .get_retained_pegin_quote(hash)
        .await
        .unwrap()
        .unwrap()
}

/// Record a deposit for the quote the way the deposit watcher does.
pub async fn observe_deposit(context: &MockedContext, hash: &str) -> RetainedPeginQuote {
    let mut retained = retained(context, hash).await;
    retained
        .transition_to(PeginState::WaitingForDepositConfirmations)
        .unwrap();
    retained.user_btc_tx_hash = Some(dummy::txid(&mut rand::thread_rng()));
    context
        .get_storage_mut()
        .update_retained_pegin_quote(&retained)
        .await
        .unwrap();
    retained
}
