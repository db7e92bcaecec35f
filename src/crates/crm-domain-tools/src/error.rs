use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainToolError {
    #[error("request build failed: {0}")]
    Request(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("response was not valid JSON: {0}")]
    Decode(String),
}

impl From<DomainToolError> for crm_types::CrmError {
    fn from(err: DomainToolError) -> Self {
        crm_types::CrmError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DomainToolError>;
