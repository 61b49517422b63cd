//! # Liquidity provider peg-in engine
//!
//! The peg-in side of a Rootstock flyover liquidity provider. The provider
//! quotes a fee for fronting funds on Rootstock against a Bitcoin deposit,
//! performs the call on behalf of the user once the deposit is confirmed,
//! and registers the deposit proof with the bridge to get refunded.
//!
//! Every step lives in [`pegin`] as a use case that runs against a
//! [`context::Context`], which hands out the storage, the chain clients,
//! the liquidity provider and the locks that serialize spending.

pub mod bitcoin;
pub mod config;
pub mod context;
pub mod error;
pub mod locks;
pub mod logging;
pub mod pegin;
pub mod provider;
pub mod quote;
pub mod rootstock;
pub mod signature;
pub mod storage;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod wei;

/// Gas added on top of the quote gas limit for the overhead of the LBC call
/// on behalf of the user.
pub const CALL_FOR_USER_EXTRA_GAS: u64 = 180_000;

/// The crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
