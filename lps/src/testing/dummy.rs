//! Dummy values of the quote entities.

use alloy_primitives::Address;
use alloy_primitives::Bytes;
use bitcoin::hashes::Hash as _;
use fake::Dummy;
use fake::Fake;
use fake::Faker;
use rand::Rng;

use crate::quote::PeginQuote;
use crate::quote::PeginState;
use crate::quote::RetainedPeginQuote;
use crate::wei::Wei;

/// A random Rootstock address.
pub fn rsk_address<R: Rng + ?Sized>(rng: &mut R) -> Address {
    Address::from(rng.gen::<[u8; 20]>())
}

/// A random hex encoded quote hash.
pub fn quote_hash<R: Rng + ?Sized>(rng: &mut R) -> String {
    hex::encode(rng.gen::<[u8; 32]>())
}

/// A random Bitcoin transaction id.
pub fn txid<R: Rng + ?Sized>(rng: &mut R) -> bitcoin::Txid {
    bitcoin::Txid::from_byte_array(rng.gen())
}

impl Dummy<Faker> for PeginQuote {
    fn dummy_with_rng<R: Rng + ?Sized>(config: &Faker, rng: &mut R) -> Self {
        let agreement_timestamp = time::OffsetDateTime::now_utc().unix_timestamp() as u32;
        PeginQuote {
            fed_btc_address: "2N5muMepJizJE1gR7FbHJU6CD18V3BpNF9p".to_string(),
            lbc_address: rsk_address(rng),
            lp_rsk_address: rsk_address(rng),
            btc_refund_address: "mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn".to_string(),
            rsk_refund_address: rsk_address(rng),
            lp_btc_address: "mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn".to_string(),
            call_fee: config.fake_with_rng(rng),
            penalty_fee: config.fake_with_rng(rng),
            contract_address: rsk_address(rng),
            data: Bytes::from(rng.gen::<[u8; 4]>().to_vec()),
            gas_limit: rng.gen_range(21_000..100_000),
            nonce: rng.gen_range(1..i64::MAX),
            value: config.fake_with_rng(rng),
            agreement_timestamp,
            time_for_deposit: 3600,
            lp_call_time: 7200,
            confirmations: rng.gen_range(1..20),
            call_on_register: false,
            gas_fee: config.fake_with_rng(rng),
            product_fee_amount: Wei::ZERO,
            chain_id: 31,
        }
    }
}

impl Dummy<Faker> for RetainedPeginQuote {
    fn dummy_with_rng<R: Rng + ?Sized>(config: &Faker, rng: &mut R) -> Self {
        RetainedPeginQuote {
            quote_hash: quote_hash(rng),
            deposit_address: "2N5muMepJizJE1gR7FbHJU6CD18V3BpNF9p".to_string(),
            signature: hex::encode([0u8; 65]),
            required_liquidity: config.fake_with_rng(rng),
            state: PeginState::WaitingForDeposit,
            user_btc_tx_hash: None,
            call_for_user_tx_hash: None,
            call_for_user_gas_used: 0,
            call_for_user_gas_price: Wei::ZERO,
            register_pegin_tx_hash: None,
            register_pegin_gas_used: 0,
            register_pegin_gas_price: Wei::ZERO,
            owner_account_address: None,
        }
    }
}

/// A random quote that expired an hour ago.
pub fn expired_quote<R: Rng + ?Sized>(rng: &mut R) -> PeginQuote {
    let mut quote: PeginQuote = Faker.fake_with_rng(rng);
    quote.agreement_timestamp -= 2 * quote.time_for_deposit;
    quote
}
