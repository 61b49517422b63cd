//! Named mutual exclusion for the observe-then-act sections of the use
//! cases.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::sync::OwnedMutexGuard;

/// Name of the lock that guards accepting peg-in quotes.
pub const PEGIN_LIQUIDITY: &str = "pegin-liquidity";

/// Name of the lock that guards spending from the provider wallet.
pub const RSK_WALLET: &str = "rsk-wallet";

/// An async lock over a named resource.
///
/// Clones share the underlying lock. The lock is held until the guard
/// returned by [`ResourceLock::acquire`] is dropped, so it is released on
/// every exit path, including cancellation of the holding future.
#[derive(Debug, Clone)]
pub struct ResourceLock {
    name: &'static str,
    inner: Arc<Mutex<()>>,
}

impl ResourceLock {
    pub fn new(name: &'static str) -> Self {
        Self { name, inner: Arc::new(Mutex::new(())) }
    }

    /// Wait until the resource is free and take it.
    pub async fn acquire(&self) -> OwnedMutexGuard<()> {
        let guard = self.inner.clone().lock_owned().await;
        tracing::trace!(resource = self.name, "acquired resource lock");
        guard
    }

    /// Whether the resource is currently held.
    pub fn is_locked(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}
