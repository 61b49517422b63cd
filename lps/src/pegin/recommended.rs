//! Recommending the largest peg-in value a user budget can pay for.

use alloy_primitives::Address;
use alloy_primitives::Bytes;

use crate::context::Context;
use crate::error::Error;
use crate::error::UseCaseId;
use crate::provider::PeginLiquidityProvider as _;
use crate::rootstock::bridge::BridgeInteract as _;
use crate::rootstock::is_rsk_address;
use crate::rootstock::parse_rsk_address;
use crate::rootstock::RskInteract as _;
use crate::wei::Wei;

use super::scaled_dao_percentage;
use super::validate_minimum_lock_value;

/// The value to quote so that the quote total fits the budget, and the
/// fees estimated for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecommendedPegin {
    pub recommended_value: Wei,
    pub estimated_gas_fee: Wei,
    pub estimated_call_fee: Wei,
    pub estimated_product_fee: Wei,
}

/// Inverts the quoting fee formula.
#[derive(Debug, Clone)]
pub struct RecommendedPeginUseCase<C> {
    context: C,
}

impl<C: Context> RecommendedPeginUseCase<C> {
    pub fn new(context: C) -> Self {
        Self { context }
    }

    /// The largest value whose quote total is at most `budget`. A
    /// destination that is not a Rootstock address is estimated as the
    /// zero address.
    #[tracing::instrument(skip_all, fields(%budget, %destination))]
    pub async fn run(
        &self,
        budget: Wei,
        destination: &str,
        data: &Bytes,
    ) -> Result<RecommendedPegin, Error> {
        self.recommend(budget, destination, data)
            .await
            .map_err(|error| error.in_use_case(UseCaseId::RecommendedPegin))
    }

    async fn recommend(
        &self,
        budget: Wei,
        destination: &str,
        data: &Bytes,
    ) -> Result<RecommendedPegin, Error> {
        let destination = if is_rsk_address(destination) {
            parse_rsk_address(destination)?
        } else {
            Address::ZERO
        };

        let settings = self.context.config();
        let provider = self.context.get_liquidity_provider();
        let pegin = provider.pegin_configuration();
        let scale = Wei::new(settings.lps.fee_scale);

        let dao_percentage = self.context.get_bridge().dao_fee_percentage().await?;
        let scaled_product = scaled_dao_percentage(dao_percentage, settings.lps.fee_scale)?;
        let scaled_call = pegin.scaled_fee_percentage(settings.lps.fee_scale);

        let gas_fee = self
            .estimate_gas_fee(&destination, budget, data, budget.mul_div(scaled_product, scale)?)
            .await?;

        let fixed_costs = gas_fee.checked_add(pegin.fixed_fee)?;
        if fixed_costs > budget {
            return Err(Error::AmountOutOfRange {
                amount: budget,
                min: fixed_costs,
                max: pegin.max_value,
            });
        }
        let divisor = scale.checked_add(scaled_product)?.checked_add(scaled_call)?;
        let recommended_value = budget.checked_sub(fixed_costs)?.mul_div(scale, divisor)?;

        pegin.validate_amount(recommended_value)?;
        if let Err(error) = provider.has_pegin_liquidity(recommended_value).await {
            tracing::debug!(%error, %recommended_value, "cannot cover the recommended value");
            return Err(Error::NoLiquidity);
        }
        validate_minimum_lock_value(&self.context.get_bridge(), recommended_value).await?;

        Ok(RecommendedPegin {
            recommended_value,
            estimated_gas_fee: gas_fee,
            estimated_call_fee: recommended_value
                .mul_div(scaled_call, scale)?
                .checked_add(pegin.fixed_fee)?,
            estimated_product_fee: recommended_value.mul_div(scaled_product, scale)?,
        })
    }

    /// The gas fee of the call itself plus the DAO fee transfer, when there
    /// is one.
    async fn estimate_gas_fee(
        &self,
        destination: &Address,
        budget: Wei,
        data: &Bytes,
        dao_fee_estimate: Wei,
    ) -> Result<Wei, Error> {
        let rsk_client = self.context.get_rsk_client();
        let fee_collector = self.context.config().lps.fee_collector_address;

        let dao_gas = if dao_fee_estimate.is_zero() {
            0
        } else {
            rsk_client
                .estimate_gas(&fee_collector, dao_fee_estimate, &Bytes::new())
                .await?
        };
        let call_gas = rsk_client.estimate_gas(destination, budget, data).await?;
        let gas_price = rsk_client.gas_price().await?;

        let gas = dao_gas
            .checked_add(call_gas)
            .ok_or(Error::WeiOverflow("gas addition"))?;
        Wei::new(gas).checked_mul(gas_price)
    }
}
