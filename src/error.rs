use thiserror::Error;
use tokio::io;

pub type ServiceResult<T> = core::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("network error: {0}")]
    Network(String),
    #[error("the session has expired, please log in again")]
    SessionExpired,
    #[error("{0}")]
    Api(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("{0}")]
    IoError(#[from] io::Error),
    #[error("{0}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("{0}")]
    InvalidInput(String),
}

impl ServiceError {
    /// Classify a non-2xx reply. A 401, or a server message that talks about an
    /// expired token, means the user has to sign in again.
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        let expired = message
            .as_deref()
            .map(|m| m.to_ascii_lowercase().contains("expired"))
            .unwrap_or(false);
        if status == 401 || expired {
            return ServiceError::SessionExpired;
        }
        ServiceError::Api(message.unwrap_or_else(|| format!("Status {status}")))
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ServiceError::SessionExpired)
    }
}
