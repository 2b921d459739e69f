use std::sync::Arc;

/// Represents a result type for operations in the FeatureGate SDK.
///
/// This `Result` type is a standard Rust `Result` type where the error variant is defined by the
/// SDK-specific [`Error`] enum.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing possible errors that can occur in the FeatureGate SDK.
///
/// Note that toggle evaluation is not represented here: evaluation never fails. Every abnormal
/// evaluation input degrades to the caller-supplied default value plus a diagnostic reason
/// string.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Invalid remote URL configuration.
    #[error("invalid remote url configuration")]
    InvalidBaseUrl(#[source] url::ParseError),

    /// The request was unauthorized, possibly due to an invalid server SDK key.
    #[error("unauthorized, server sdk key is likely invalid")]
    Unauthorized,

    /// The first snapshot did not arrive within the configured wait timeout. The client keeps
    /// serving caller defaults until a snapshot lands.
    #[error("timed out waiting for the first snapshot")]
    InitializationTimeout,

    /// Indicates that the synchronizer thread panicked. This should normally never happen.
    #[error("synchronizer thread panicked")]
    SyncThreadPanicked,

    /// An I/O error.
    #[error(transparent)]
    // std::io::Error is not clonable, so we're wrapping it in an Arc.
    Io(Arc<std::io::Error>),

    /// Network error.
    #[error(transparent)]
    Network(Arc<reqwest::Error>),
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Network(Arc::new(value.without_url()))
    }
}
