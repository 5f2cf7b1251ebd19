//! OAuth2-specific error types.

use std::io;
use std::path::PathBuf;

use http::StatusCode;

/// Errors raised by a [`TokenStore`](super::TokenStore).
#[derive(Debug, derive_more::Error, derive_more::Display)]
pub enum TokenStoreError {
    /// The store holds no token.
    #[display("No access token stored")]
    NotFound,

    /// The backing file could not be read, written or removed.
    #[display("Token store I/O error on '{}': {source}", path.display())]
    Io {
        /// The path of the token file.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The stored content is not a serialized access token.
    #[display("Token store content at '{}' is not a valid access token: {source}", path.display())]
    Decode {
        /// The path of the token file.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// The access token could not be serialized.
    #[display("Could not serialize access token: {source}")]
    Encode {
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

/// Errors that can occur during the OAuth2 token lifecycle.
#[derive(Debug, derive_more::Error, derive_more::Display)]
pub enum OAuth2Error {
    /// A configured OAuth2 URL is invalid.
    #[display("Invalid OAuth2 URL '{url}': {source}")]
    InvalidUrl {
        /// The invalid URL that was provided.
        url: String,
        /// Why the URL could not be parsed.
        source: url::ParseError,
    },

    /// The token request could not be built.
    #[display("Could not build token request: {reason}")]
    RequestBuild {
        /// Description of the failure.
        reason: String,
    },

    /// The token request could not be sent.
    #[display("Could not send token request: {source}")]
    Transport {
        /// The underlying HTTP client error.
        source: reqwest::Error,
    },

    /// The token endpoint answered with a status other than `200 OK`.
    #[display("Could not obtain access token, received a non successful status code {status}: {body}")]
    NonSuccessStatus {
        /// The status returned by the token endpoint.
        status: StatusCode,
        /// The (possibly truncated) response body.
        body: String,
    },

    /// The token response body could not be read.
    #[display("Could not read token response body: {source}")]
    BodyRead {
        /// The underlying HTTP client error.
        source: reqwest::Error,
    },

    /// The token response body is not a valid token document.
    #[display("Could not decode access token: {source}")]
    Decode {
        /// The decoding error, including the JSON path that failed.
        source: serde_path_to_error::Error<serde_json::Error>,
    },

    /// The token response did not contain an access token.
    #[display("Token response does not contain an access token")]
    MissingAccessToken,

    /// No access token is stored and none could be fetched.
    #[display("Found no access token, please obtain an access token before making a request: {source}")]
    NoToken {
        /// Why the client credentials fetch failed.
        source: Box<OAuth2Error>,
    },

    /// The access token could not be refreshed.
    #[display("Could not refresh access token: {source}")]
    Refresh {
        /// Why the refresh grant failed.
        source: Box<OAuth2Error>,
    },

    /// A freshly obtained token could not be persisted.
    #[display("Could not persist access token: {source}")]
    Persist {
        /// The token store failure.
        source: TokenStoreError,
    },
}
