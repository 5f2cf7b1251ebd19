//! OAuth2 support for generated API clients.
//!
//! Tokens are obtained from the token endpoint with the client-credentials,
//! authorization-code or refresh-token grants, and kept in a [`TokenStore`].
//!
//! # Supported Flows
//!
//! - **Client Credentials**: used automatically when no valid token is stored
//! - **Authorization Code**: [`OAuth2Authenticator::build_redirect_url`] then
//!   [`OAuth2Authenticator::fetch_access_token_by_code`]
//! - **Refresh Token**: used automatically when the token is close to expiry
//!
//! # Example
//!
//! ```rust,no_run
//! use apigen_runtime::{ApiClient, Credentials, FileTokenStore, OAuth2Credentials};
//! use http::Method;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let oauth2 = OAuth2Credentials::new(
//!     "client-id",
//!     "client-secret",
//!     "https://auth.example.com/token",
//! )
//! .with_token_store(FileTokenStore::new("token.json"))
//! .add_scope("read:users");
//!
//! let client = ApiClient::builder()
//!     .with_base_url("https://api.example.com/v1")?
//!     .with_credentials(Credentials::OAuth2(oauth2))
//!     .build()?;
//!
//! // Token acquired on first request
//! let request = client.request(Method::GET, "/users")?;
//! let response = client.execute(request).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod provider;
mod store;
mod token;

pub use self::config::OAuth2Credentials;
pub use self::error::{OAuth2Error, TokenStoreError};
pub use self::provider::OAuth2Authenticator;
pub use self::store::{FileTokenStore, MemoryTokenStore, SharedTokenStore, TokenStore};
pub use self::token::{AccessToken, TIMESTAMP_THRESHOLD};
