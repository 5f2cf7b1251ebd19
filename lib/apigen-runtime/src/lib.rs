//! # Apigen Runtime
//!
//! Authentication and transport runtime shared by generated API client SDKs.
//!
//! A generated client declares which [`Credentials`] an API accepts; this crate
//! turns them into an [`Authenticator`] that signs every outgoing request, and
//! owns the OAuth2 token lifecycle (acquisition, persistence, refresh).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use apigen_runtime::{ApiClient, Credentials};
//! use http::Method;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::builder()
//!     .with_base_url("https://api.example.com/v1")?
//!     .with_credentials(Credentials::http_bearer("my-token"))
//!     .with_version(env!("CARGO_PKG_VERSION"))
//!     .build()?;
//!
//! // `User-Agent`, `Accept: application/json` and `Authorization` are added here
//! let request = client.request(Method::GET, "/users/123")?;
//! let response = client.execute(request).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Credentials
//!
//! | Credentials                       | Effect on each request                        |
//! |-----------------------------------|-----------------------------------------------|
//! | [`Credentials::Anonymous`]        | none                                          |
//! | [`Credentials::HttpBasic`]        | `Authorization: Basic base64(user:password)`  |
//! | [`Credentials::HttpBearer`]       | `Authorization: Bearer <token>`               |
//! | [`Credentials::ApiKey`]           | `<name>: <token>` header (or query, cookie)   |
//! | [`Credentials::OAuth2`]           | `Authorization: Bearer <access token>`        |
//!
//! Credentials can be loaded from configuration with [`Credentials::from_json`]:
//!
//! ```rust
//! use apigen_runtime::Credentials;
//!
//! let credentials = Credentials::from_json(r#"{"type": "http_bearer", "token": "abc"}"#)?;
//! assert_eq!(credentials.kind(), "http_bearer");
//! # Ok::<(), apigen_runtime::AuthenticationError>(())
//! ```
//!
//! ## OAuth2
//!
//! With [`Credentials::OAuth2`], a token is fetched with the client-credentials
//! grant on first use, stored in the configured [`TokenStore`]
//! ([`MemoryTokenStore`] by default, or [`FileTokenStore`] to survive restarts),
//! and refreshed when it gets within [`DEFAULT_EXPIRE_THRESHOLD`] of expiry.
//!
//! The authorization-code flow is driven through [`ApiClient::oauth2`]:
//!
//! ```rust,no_run
//! # async fn example(client: apigen_runtime::ApiClient) -> Result<(), Box<dyn std::error::Error>> {
//! let oauth2 = client.oauth2().ok_or("not an OAuth2 client")?;
//! let redirect = oauth2.build_redirect_url(Some("https://app.example.com/callback"), &["read"], Some("state"))?;
//! // ... send the user to `redirect`, receive `code` on the callback ...
//! # let code = "code";
//! oauth2.fetch_access_token_by_code(code).await?;
//! # Ok(())
//! # }
//! ```
//!
//! When no token can be obtained, requests are sent without `Authorization`
//! and the server answers `401`. Use
//! [`AuthFailurePolicy::Propagate`] to get the error instead.
//!
//! ## Error Handling
//!
//! - [`ApiClientError`] - client construction and request sending
//! - [`AuthenticationError`] - credentials that cannot be turned into headers
//! - [`OAuth2Error`] - token endpoint and token lifecycle failures
//! - [`TokenStoreError`] - token persistence failures
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events: requests at `debug`, token
//! acquisition at `debug`, swallowed authentication failures at `warn`.
//! Secrets are redacted from every `Debug` output.

mod client;

pub use self::client::{
    AccessToken, ApiClient, ApiClientBuilder, ApiClientError, ApiKeyAuthenticator,
    ApiKeyLocation, AuthFailurePolicy, AuthenticationError, Authenticator, AuthenticatorFactory,
    Credentials, DEFAULT_EXPIRE_THRESHOLD, DEFAULT_USER_AGENT_PRODUCT, FileTokenStore,
    HttpBasicAuthenticator, HttpBearerAuthenticator, MemoryTokenStore, OAuth2Authenticator,
    OAuth2Credentials, OAuth2Error, SecureString, SharedTokenStore, TIMESTAMP_THRESHOLD,
    TokenStore, TokenStoreError, Transport, user_agent,
};

pub use self::client::oauth2;
