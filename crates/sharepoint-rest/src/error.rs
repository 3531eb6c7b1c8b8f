//! Error type shared by every client operation.

use std::path::PathBuf;

/// Errors returned by [`SharePointClient`](crate::SharePointClient).
///
/// Precondition failures (configuration, missing token, empty arguments,
/// token origin) are raised locally before any request is sent. API failures
/// carry the message the server put in its `error` payload. The remaining
/// variants wrap transport and decoding failures.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SharePointError {
    /// The client configuration is missing or malformed.
    #[error("{0}")]
    Config(String),

    /// No access token has been acquired yet.
    #[error("access token missing; call token_from_user() or token_from_app() first")]
    MissingToken,

    /// A required argument was empty.
    #[error("{0} is empty or not set")]
    MissingArgument(&'static str),

    /// An argument was present but malformed.
    #[error("{0}")]
    InvalidArgument(String),

    /// The operation needs a token that was issued to a user.
    #[error("this operation requires an access token that originated from a user")]
    TokenOrigin,

    /// The server answered with an `error` payload.
    #[error("{0}")]
    Api(String),

    /// An extra-field mapping referenced a field the record does not have.
    #[error("invalid property: {0}")]
    InvalidProperty(String),

    /// The context token could not be decoded.
    #[error("failed to decode context token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// The `appctx` claim of the context token is not valid JSON.
    #[error("failed to decode app context: {0}")]
    AppContext(#[source] serde_json::Error),

    /// The request could not be sent or the response could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body is not the JSON shape the operation expects.
    #[error("failed to parse response (HTTP {status}): {source}")]
    Parse {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    /// The file to upload could not be read.
    #[error("failed to read {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = SharePointError> = std::result::Result<T, E>;
