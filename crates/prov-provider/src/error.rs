use thiserror::Error;

/// Errors raised by a `Provider`. Opaque by design — tasks only need to
/// know that a call failed, not which HTTP status or XML error code caused
/// it; the message carries that detail for the logs.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider call failed: {0}")]
    CallFailed(String),

    #[error("provider not configured: {0}")]
    NotConfigured(String),
}
