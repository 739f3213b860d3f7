use eventscout_api::TransportError;
use thiserror::Error;

/// What the user sees for any fetch failure. The details go to the logs.
pub const NETWORK_ERROR_MESSAGE: &str = "Network response error.";

/// Fetch failures as the domain sees them
///
/// Same taxonomy as the transport layer, just on our side of the fence so
/// nothing above the repository has to know reqwest exists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Authentication error")]
    AuthenticationError,

    #[error("Bad request")]
    BadRequest,

    #[error("The request is outdated")]
    Outdated,

    #[error("Request failed: {0}")]
    Failed(String),

    #[error("Response returned with no data")]
    NoData,

    #[error("Unable to decode the response: {0}")]
    UnableToDecode(String),
}

impl DomainError {
    /// None of these are the user's problem to diagnose
    pub fn user_message(&self) -> &'static str {
        NETWORK_ERROR_MESSAGE
    }
}

impl From<TransportError> for DomainError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::AuthenticationError => DomainError::AuthenticationError,
            TransportError::BadRequest => DomainError::BadRequest,
            TransportError::Outdated => DomainError::Outdated,
            TransportError::Failed(detail) => DomainError::Failed(detail),
            TransportError::NoData => DomainError::NoData,
            TransportError::UnableToDecode(detail) => DomainError::UnableToDecode(detail),
        }
    }
}

/// Everything else that can go wrong in EventScout
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Domain(#[from] DomainError),
}
