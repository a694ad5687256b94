//! Error taxonomy shared by components, parsers and configuration loading.

use thiserror::Error;

/// Errors that can occur while collecting signals or loading configuration.
///
/// Component failures never leave the crate as errors: they are folded into
/// "no value" by [`Component::produce`](crate::Component::produce).
#[derive(Error, Debug)]
pub enum DeviceIdError {
    #[error("Signal unavailable: {0}")]
    SignalUnavailable(String),
    #[error("Malformed external data: {0}")]
    MalformedExternalData(String),
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeviceIdError {
    pub(crate) fn unavailable(what: impl Into<String>) -> Self {
        Self::SignalUnavailable(what.into())
    }

    pub(crate) fn malformed(what: impl Into<String>) -> Self {
        Self::MalformedExternalData(what.into())
    }
}
