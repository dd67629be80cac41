//! Boot-time checks. These are the only failures allowed to halt the process.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;
use crate::pricing::PricingError;

/// Default deadline for each backend connectivity probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{backend} is unreachable: {reason}")]
    Unreachable { backend: String, reason: String },

    #[error("{backend} did not answer within {timeout:?}")]
    Timeout { backend: String, timeout: Duration },

    #[error("pricing model: {0}")]
    PricingModel(#[from] PricingError),

    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Run a connectivity probe against `backend` with a hard deadline.
pub async fn probe_backend<F, E>(
    backend: &str,
    deadline: Duration,
    probe: F,
) -> Result<(), StartupError>
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(deadline, probe).await {
        Ok(Ok(())) => {
            tracing::info!(backend = %backend, "Backend reachable");
            Ok(())
        }
        Ok(Err(e)) => Err(StartupError::Unreachable {
            backend: backend.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Err(StartupError::Timeout {
            backend: backend.to_string(),
            timeout: deadline,
        }),
    }
}
