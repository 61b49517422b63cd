//! Aggregates over the peg-ins the provider settled.

use serde::Serialize;
use time::OffsetDateTime;

use crate::context::Context;
use crate::error::Error;
use crate::error::ErrorArgs;
use crate::error::UseCaseId;
use crate::quote::PeginQuote;
use crate::quote::PeginState;
use crate::storage::DbRead as _;
use crate::wei::Wei;

/// Figures over the quotes settled within a period.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeginReport {
    pub number_of_quotes: u64,
    pub minimum_quote_value: Wei,
    pub maximum_quote_value: Wei,
    pub average_quote_value: Wei,
    pub total_fees_collected: Wei,
    pub average_fee_per_quote: Wei,
}

impl PeginReport {
    fn from_quotes<'a, I>(quotes: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = &'a PeginQuote>,
    {
        let mut report = PeginReport::default();
        let mut total_value = Wei::ZERO;
        for quote in quotes {
            if report.number_of_quotes == 0 || quote.value < report.minimum_quote_value {
                report.minimum_quote_value = quote.value;
            }
            report.maximum_quote_value = report.maximum_quote_value.max(quote.value);
            total_value = total_value.checked_add(quote.value)?;
            report.total_fees_collected = report.total_fees_collected.checked_add(quote.call_fee)?;
            report.number_of_quotes += 1;
        }

        if report.number_of_quotes > 0 {
            let count = Wei::new(report.number_of_quotes);
            report.average_quote_value = total_value.checked_div(count)?;
            report.average_fee_per_quote = report.total_fees_collected.checked_div(count)?;
        }
        Ok(report)
    }
}

#[derive(Debug, Clone)]
pub struct GetPeginReportUseCase<C> {
    context: C,
}

impl<C: Context> GetPeginReportUseCase<C> {
    pub fn new(context: C) -> Self {
        Self { context }
    }

    /// Report on the quotes whose peg-in was registered and whose agreement
    /// timestamp lies within `[from, to]`.
    #[tracing::instrument(skip_all, fields(%from, %to))]
    pub async fn run(&self, from: OffsetDateTime, to: OffsetDateTime) -> Result<PeginReport, Error> {
        self.report(from, to).await.map_err(|error| {
            let args = ErrorArgs::new()
                .with("from", from.unix_timestamp())
                .with("to", to.unix_timestamp());
            error.in_use_case_with(UseCaseId::GetPeginReport, args)
        })
    }

    async fn report(&self, from: OffsetDateTime, to: OffsetDateTime) -> Result<PeginReport, Error> {
        let storage = self.context.get_storage();
        let hashes: Vec<String> = storage
            .get_retained_quotes_by_state(&[PeginState::RegisterPeginSucceeded])
            .await?
            .into_iter()
            .map(|retained| retained.quote_hash)
            .collect();
        if hashes.is_empty() {
            return Ok(PeginReport::default());
        }

        let quotes = storage
            .get_quotes_by_hashes_and_date(&hashes, from, to)
            .await?;
        let report = PeginReport::from_quotes(quotes.iter().map(|(_, quote)| quote))?;
        tracing::debug!(quotes = report.number_of_quotes, "built peg-in report");
        Ok(report)
    }
}
