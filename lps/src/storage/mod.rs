//! # Quote storage
//!
//! This module contains the `DbRead` and `DbWrite` traits representing
//! the interface between the use cases and the quote repository.
//!
//! The [`in_memory::Store`] is the implementation used in tests and by the
//! development binary. Production deployments provide their own.

pub mod in_memory;

use std::future::Future;

use alloy_primitives::Address;
use time::OffsetDateTime;

use crate::error::Error;
use crate::quote::CreatedPeginQuote;
use crate::quote::PeginCreationData;
use crate::quote::PeginQuote;
use crate::quote::PeginState;
use crate::quote::RetainedPeginQuote;
use crate::signature::Signed;
use crate::signature::TrustedAccountDetails;

/// Represents the ability to read data from the quote repository.
#[cfg_attr(any(test, feature = "testing"), mockall::automock())]
pub trait DbRead {
    /// Get the peg-in quote with the given hash.
    fn get_pegin_quote(
        &self,
        hash: &str,
    ) -> impl Future<Output = Result<Option<PeginQuote>, Error>> + Send;

    /// Get the retained quote with the given hash.
    fn get_retained_pegin_quote(
        &self,
        hash: &str,
    ) -> impl Future<Output = Result<Option<RetainedPeginQuote>, Error>> + Send;

    /// Get the retained quotes owned by a trusted account that are in one
    /// of the given states.
    fn get_retained_quotes_for_address(
        &self,
        address: &Address,
        states: &[PeginState],
    ) -> impl Future<Output = Result<Vec<RetainedPeginQuote>, Error>> + Send;

    /// Get the retained quotes in one of the given states.
    fn get_retained_quotes_by_state(
        &self,
        states: &[PeginState],
    ) -> impl Future<Output = Result<Vec<RetainedPeginQuote>, Error>> + Send;

    /// Get the quotes with one of the given hashes whose agreement
    /// timestamp lies within `[from, to]`, keyed by their hash.
    fn get_quotes_by_hashes_and_date(
        &self,
        hashes: &[String],
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> impl Future<Output = Result<Vec<(String, PeginQuote)>, Error>> + Send;

    /// Get the creation data of a quote. A missing record reads as zeroed
    /// data.
    fn get_pegin_creation_data(
        &self,
        hash: &str,
    ) -> impl Future<Output = Result<PeginCreationData, Error>> + Send;

    /// Get the signed details of a trusted account.
    fn get_trusted_account(
        &self,
        address: &Address,
    ) -> impl Future<Output = Result<Option<Signed<TrustedAccountDetails>>, Error>> + Send;
}

/// Represents the ability to write data to the quote repository.
#[cfg_attr(any(test, feature = "testing"), mockall::automock())]
pub trait DbWrite {
    /// Insert a quote together with its creation data.
    fn insert_pegin_quote(
        &self,
        quote: &CreatedPeginQuote,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Insert a retained quote. Fails if one exists for the same hash.
    fn insert_retained_pegin_quote(
        &self,
        retained: &RetainedPeginQuote,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Replace an existing retained quote.
    fn update_retained_pegin_quote(
        &self,
        retained: &RetainedPeginQuote,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Insert or replace the details of a trusted account.
    fn upsert_trusted_account(
        &self,
        account: &Signed<TrustedAccountDetails>,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}
