//! The referendum core.
//!
//! Every operation takes the caller's [`Session`](crate::model::auth::Session)
//! explicitly, checks its role, and runs as one all-or-nothing store
//! transaction. Mutations that fail transiently are re-run from the start.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rocket::tokio::time::{sleep, Instant};

use crate::config::Config;
use crate::error::Result;
use crate::model::store::Store;

mod access;
mod lifecycle;
mod repository;
mod voting;

/// First pause after a transient failure; doubles with each further failure.
const BACKOFF_BASE: Duration = Duration::from_millis(5);
/// Longest pause between attempts.
const BACKOFF_MAX: Duration = Duration::from_millis(250);

/// Handle on the core, shared by every request through managed state.
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn Store>,
    config: Arc<Config>,
}

impl Engine {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// Run `attempt` until it succeeds, fails permanently, or is still failing
    /// transiently once the configured retry window has passed.
    ///
    /// Attempts are spaced by jittered exponential backoff, so writers that
    /// conflicted on one referendum spread out instead of colliding again.
    /// Each attempt must begin its own transaction.
    async fn retrying<T, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        let deadline = Instant::now() + self.config.transaction_retry_window();
        let mut failures = 0;
        loop {
            match attempt().await {
                Err(e) if e.is_transient() && Instant::now() < deadline => {
                    failures += 1;
                    let delay = backoff(failures);
                    warn!(
                        "{operation} failed transiently (retry {failures} in {}ms): {e}",
                        delay.as_millis()
                    );
                    sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}

/// Pause before the retry that follows the `failures`th failure: between half
/// and all of `BACKOFF_BASE * 2^failures`, capped at `BACKOFF_MAX`.
fn backoff(failures: u32) -> Duration {
    let ceiling = BACKOFF_BASE
        .saturating_mul(1_u32 << failures.min(16))
        .min(BACKOFF_MAX);
    let nanos = ceiling.as_nanos() as u64;
    Duration::from_nanos(rand::thread_rng().gen_range(nanos / 2..=nanos))
}
