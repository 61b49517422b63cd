//! Managing the provider's peg-in collateral in the LBC.

use crate::context::Context;
use crate::error::Error;
use crate::error::UseCaseId;
use crate::provider::LiquidityProvider as _;
use crate::rootstock::lbc::LbcInteract as _;
use crate::wei::Wei;

/// Revert reasons of a withdrawal attempted before the provider resigned,
/// or before the resignation delay elapsed.
const NOT_RESIGNED_REASONS: [&str; 2] = ["notresigned", "resignationdelaynotmet"];

/// Adds collateral from the provider wallet.
#[derive(Debug, Clone)]
pub struct AddCollateralUseCase<C> {
    context: C,
}

impl<C: Context> AddCollateralUseCase<C> {
    pub fn new(context: C) -> Self {
        Self { context }
    }

    /// Add `amount` to the provider's collateral, returning the new
    /// collateral. The result must reach the LBC minimum, otherwise nothing
    /// is sent.
    #[tracing::instrument(skip_all, fields(%amount))]
    pub async fn run(&self, amount: Wei) -> Result<Wei, Error> {
        self.add(amount)
            .await
            .map_err(|error| error.in_use_case(UseCaseId::AddCollateral))
    }

    async fn add(&self, amount: Wei) -> Result<Wei, Error> {
        let lbc = self.context.get_lbc();
        let address = self.context.get_liquidity_provider().rsk_address();

        let (minimum, current) =
            futures::try_join!(lbc.get_minimum_collateral(), lbc.get_collateral(&address))?;
        let collateral = current.checked_add(amount)?;
        if collateral < minimum {
            return Err(Error::InsufficientAmount {
                sent: collateral,
                required: minimum,
            });
        }

        lbc.add_collateral(amount).await?;
        tracing::info!(%collateral, "added peg-in collateral");
        Ok(collateral)
    }
}

/// Reads the provider's collateral.
#[derive(Debug, Clone)]
pub struct GetCollateralUseCase<C> {
    context: C,
}

impl<C: Context> GetCollateralUseCase<C> {
    pub fn new(context: C) -> Self {
        Self { context }
    }

    pub async fn run(&self) -> Result<Wei, Error> {
        let address = self.context.get_liquidity_provider().rsk_address();
        self.context
            .get_lbc()
            .get_collateral(&address)
            .await
            .map_err(|error| error.in_use_case(UseCaseId::GetCollateral))
    }
}

/// Withdraws the collateral of a resigned provider.
#[derive(Debug, Clone)]
pub struct WithdrawCollateralUseCase<C> {
    context: C,
}

impl<C: Context> WithdrawCollateralUseCase<C> {
    pub fn new(context: C) -> Self {
        Self { context }
    }

    /// Withdraw the whole collateral. Fails with
    /// [`Error::ProviderNotResigned`] until the provider has resigned and
    /// the resignation delay has elapsed.
    #[tracing::instrument(skip_all)]
    pub async fn run(&self) -> Result<(), Error> {
        let result = self.context.get_lbc().withdraw_collateral().await;
        result
            .map_err(|error| match error {
                Error::ContractReverted { ref reason, .. } if is_not_resigned(reason) => {
                    Error::ProviderNotResigned
                }
                error => error,
            })
            .map_err(|error| error.in_use_case(UseCaseId::WithdrawCollateral))
    }
}

fn is_not_resigned(reason: &str) -> bool {
    let reason = reason.to_lowercase();
    NOT_RESIGNED_REASONS
        .iter()
        .any(|expected| reason.contains(expected))
}
