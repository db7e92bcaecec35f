use thiserror::Error;

/// Error taxonomy shared by every crate in the workspace, grouped by the
/// outcome it maps to at the HTTP boundary (spec §7), not by where it was
/// thrown.
#[derive(Debug, Error)]
pub enum CrmError {
    #[error("input error: {0}")]
    Input(String),

    #[error("authentication required")]
    AuthRequired,

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("session state unrecoverable: {0}")]
    SessionUnrecoverable(String),

    #[error("domain error in {domain}: {message}")]
    Domain { domain: String, message: String },

    #[error("planner error: {0}")]
    Planner(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CrmError>;
