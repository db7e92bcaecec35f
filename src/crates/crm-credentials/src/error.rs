use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no credential on file for this session")]
    NotFound,

    #[error("oauth code exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
}

impl From<CredentialError> for crm_types::CrmError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::NotFound => crm_types::CrmError::AuthRequired,
            CredentialError::ExchangeFailed(msg) => crm_types::CrmError::Input(msg),
            // The refresh failure reason is logged by the caller; AuthRequired
            // itself carries no payload.
            CredentialError::RefreshFailed(_) => crm_types::CrmError::AuthRequired,
        }
    }
}

pub type Result<T> = std::result::Result<T, CredentialError>;
