//! Pricing and storing peg-in quotes.

use alloy_primitives::Address;
use alloy_primitives::Bytes;
use rand::Rng as _;
use time::OffsetDateTime;

use crate::bitcoin::is_p2sh_address;
use crate::bitcoin::BitcoinInteract as _;
use crate::context::Context;
use crate::error::Error;
use crate::error::ErrorArgs;
use crate::error::UseCaseId;
use crate::provider::LiquidityProvider as _;
use crate::provider::PeginLiquidityProvider as _;
use crate::quote::CreatedPeginQuote;
use crate::quote::PeginCreationData;
use crate::quote::PeginQuote;
use crate::rootstock::bridge::BridgeInteract as _;
use crate::rootstock::lbc::LbcInteract as _;
use crate::rootstock::parse_rsk_address;
use crate::rootstock::RskInteract as _;
use crate::storage::DbWrite as _;
use crate::wei::Wei;

use super::validate_minimum_lock_value;

/// What a user asks a quote for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeginQuoteRequest {
    /// The account or contract the provider calls on behalf of the user.
    pub destination: String,
    pub data: Bytes,
    /// The value sent along with the call.
    pub value: Wei,
    pub rsk_refund_address: String,
    pub btc_refund_address: String,
}

/// A stored quote and its hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetPeginQuoteResult {
    pub quote: PeginQuote,
    pub hash: String,
}

/// The DAO fee charged on a peg-in and the gas needed to pay it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DaoAmounts {
    fee: Wei,
    gas: u64,
}

/// Quotes peg-ins with the provider's current fees.
#[derive(Debug, Clone)]
pub struct GetPeginQuoteUseCase<C> {
    context: C,
}

impl<C: Context> GetPeginQuoteUseCase<C> {
    pub fn new(context: C) -> Self {
        Self { context }
    }

    /// Price the request, then store the quote under the hash computed by
    /// the LBC.
    #[tracing::instrument(skip_all, fields(destination = %request.destination, value = %request.value))]
    pub async fn run(&self, request: PeginQuoteRequest) -> Result<GetPeginQuoteResult, Error> {
        self.get_quote(request)
            .await
            .map_err(|error| error.or_in_use_case_with(UseCaseId::GetPeginQuote, ErrorArgs::new()))
    }

    async fn get_quote(&self, request: PeginQuoteRequest) -> Result<GetPeginQuoteResult, Error> {
        let (destination, rsk_refund_address) = self.validate_request(&request).await?;

        let rsk_client = self.context.get_rsk_client();
        let call_gas = rsk_client
            .estimate_gas(&destination, request.value, &request.data)
            .await?;
        let gas_price = rsk_client.gas_price().await?;
        let dao = self.dao_amounts(request.value).await?;
        let fed_btc_address = self.federation_address().await?;

        let total_gas = call_gas
            .checked_add(dao.gas)
            .ok_or(Error::WeiOverflow("gas addition"))?;
        let gas_limit = u32::try_from(total_gas).map_err(|_| Error::TypeConversion("gas limit"))?;
        let gas_fee = Wei::new(total_gas).checked_mul(gas_price)?;

        let settings = self.context.config();
        let provider = self.context.get_liquidity_provider();
        let pegin = provider.pegin_configuration();
        let scale = Wei::new(settings.lps.fee_scale);
        let call_fee = request
            .value
            .mul_div(pegin.scaled_fee_percentage(settings.lps.fee_scale), scale)?
            .checked_add(pegin.fixed_fee)?;

        let agreement_timestamp = u32::try_from(OffsetDateTime::now_utc().unix_timestamp())
            .map_err(|_| Error::TypeConversion("agreement timestamp"))?;

        let quote = PeginQuote {
            fed_btc_address,
            lbc_address: self.context.get_lbc().address(),
            lp_rsk_address: provider.rsk_address(),
            btc_refund_address: request.btc_refund_address,
            rsk_refund_address,
            lp_btc_address: provider.btc_address(),
            call_fee,
            penalty_fee: pegin.penalty_fee,
            contract_address: destination,
            data: request.data,
            gas_limit,
            nonce: rand::thread_rng().gen_range(1..i64::MAX),
            value: request.value,
            agreement_timestamp,
            time_for_deposit: pegin.time_for_deposit,
            lp_call_time: pegin.call_time,
            confirmations: provider.bitcoin_confirmations_for_value(request.value),
            call_on_register: false,
            gas_fee,
            product_fee_amount: dao.fee,
            chain_id: settings.lps.chain_id,
        };

        let total = quote.total()?;
        validate_minimum_lock_value(&self.context.get_bridge(), total).await?;

        let hash = self.context.get_lbc().hash_pegin_quote(&quote).await?;
        let created = CreatedPeginQuote {
            hash: hash.clone(),
            quote,
            creation_data: PeginCreationData {
                gas_price,
                fee_percentage: pegin.fee_percentage,
                fixed_fee: pegin.fixed_fee,
            },
        };
        self.context
            .get_storage_mut()
            .insert_pegin_quote(&created)
            .await?;

        tracing::info!(quote_hash = %hash, %total, "created peg-in quote");
        Ok(GetPeginQuoteResult { quote: created.quote, hash })
    }

    /// Check the request, returning the parsed destination and refund
    /// addresses.
    async fn validate_request(&self, request: &PeginQuoteRequest) -> Result<(Address, Address), Error> {
        let tag = |error: Error, key: &str, value: &str| {
            let args = ErrorArgs::new().with(key, value);
            error.in_use_case_with(UseCaseId::GetPeginQuote, args)
        };

        self.context
            .get_bitcoin_client()
            .validate_address(&request.btc_refund_address)
            .await
            .map_err(|error| tag(error, "btcAddress", &request.btc_refund_address))?;

        let rsk_refund_address = parse_rsk_address(&request.rsk_refund_address)
            .map_err(|error| tag(error, "rskAddress", &request.rsk_refund_address))?;
        let destination = parse_rsk_address(&request.destination)
            .map_err(|error| tag(error, "rskAddress", &request.destination))?;

        self.context
            .get_liquidity_provider()
            .pegin_configuration()
            .validate_amount(request.value)?;

        Ok((destination, rsk_refund_address))
    }

    async fn dao_amounts(&self, value: Wei) -> Result<DaoAmounts, Error> {
        let dao_percentage = self.context.get_bridge().dao_fee_percentage().await?;
        if dao_percentage == 0 {
            return Ok(DaoAmounts { fee: Wei::ZERO, gas: 0 });
        }

        let fee = value.mul_div(Wei::new(dao_percentage), Wei::new(100))?;
        let fee_collector = self.context.config().lps.fee_collector_address;
        let gas = self
            .context
            .get_rsk_client()
            .estimate_gas(&fee_collector, fee, &Bytes::new())
            .await?;
        Ok(DaoAmounts { fee, gas })
    }

    async fn federation_address(&self) -> Result<String, Error> {
        let address = self.context.get_bridge().get_fed_address().await?;
        if !is_p2sh_address(&address, self.context.config().lps.network.into()) {
            return Err(Error::FederationAddressNotP2sh(address));
        }
        Ok(address)
    }
}
