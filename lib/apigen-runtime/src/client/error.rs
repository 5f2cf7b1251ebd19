use super::AuthenticationError;

/// Errors that can occur when using the `ApiClient`.
///
/// Authentication failures only surface here when the OAuth2 failure policy is
/// [`AuthFailurePolicy::Propagate`](super::AuthFailurePolicy::Propagate), or
/// when credentials are rejected while building the client.
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum ApiClientError {
    /// HTTP client error from the underlying reqwest library.
    ///
    /// Occurs when network requests fail, timeouts occur, or connection issues arise.
    ReqwestError(reqwest::Error),

    /// URL parsing error when constructing request URLs.
    UrlError(url::ParseError),

    /// Invalid HTTP header value, e.g. a `User-Agent` with control characters.
    InvalidHeaderValue(http::header::InvalidHeaderValue),

    /// The credentials could not be turned into an authenticator, or the
    /// authenticator refused to sign a request.
    Authentication(AuthenticationError),

    /// Invalid base URL configuration.
    ///
    /// Occurs when the base URL cannot be used to resolve request paths.
    #[display("Invalid base URL '{url}': {reason}")]
    #[from(skip)]
    InvalidBaseUrl {
        /// The rejected URL.
        url: String,
        /// Description of why the URL is invalid.
        reason: String,
    },
}
