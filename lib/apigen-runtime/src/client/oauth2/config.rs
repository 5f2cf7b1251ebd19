//! OAuth2 credentials.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use super::error::OAuth2Error;
use super::store::SharedTokenStore;
use crate::client::SecureString;

/// OAuth2 client configuration shared by the authorization-code and
/// client-credentials grants.
///
/// The token store is not part of the serialized form; credentials loaded
/// from configuration start with an empty in-memory store.
///
/// # Example
///
/// ```rust
/// use apigen_runtime::{FileTokenStore, OAuth2Credentials};
///
/// let credentials = OAuth2Credentials::new(
///     "client-id",
///     "client-secret",
///     "https://auth.example.com/token",
/// )
/// .with_authorization_url("https://auth.example.com/authorize")
/// .with_token_store(FileTokenStore::new("/var/lib/my-app/token.json"))
/// .add_scope("read:users");
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuth2Credentials {
    pub(crate) client_id: String,
    pub(crate) client_secret: SecureString,
    pub(crate) token_url: String,
    #[serde(default)]
    pub(crate) authorization_url: String,
    #[serde(default)]
    pub(crate) scopes: Vec<String>,
    #[serde(skip)]
    pub(crate) token_store: SharedTokenStore,
}

impl OAuth2Credentials {
    /// Creates credentials with an in-memory token store.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<SecureString>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: token_url.into(),
            authorization_url: String::new(),
            scopes: Vec::new(),
            token_store: SharedTokenStore::default(),
        }
    }

    /// Sets the authorization endpoint used by the authorization-code flow.
    #[must_use]
    pub fn with_authorization_url(mut self, authorization_url: impl Into<String>) -> Self {
        self.authorization_url = authorization_url.into();
        self
    }

    /// Sets the token store.
    #[must_use]
    pub fn with_token_store(mut self, token_store: impl Into<SharedTokenStore>) -> Self {
        self.token_store = token_store.into();
        self
    }

    /// Adds a scope.
    #[must_use]
    pub fn add_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    /// Adds multiple scopes.
    #[must_use]
    pub fn add_scopes(mut self, scopes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.scopes.extend(scopes.into_iter().map(Into::into));
        self
    }

    /// Returns the client id.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the token endpoint URL as configured.
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Returns the authorization endpoint URL as configured.
    pub fn authorization_url(&self) -> &str {
        &self.authorization_url
    }

    /// Returns the requested scopes.
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Returns the token store.
    pub fn token_store(&self) -> &SharedTokenStore {
        &self.token_store
    }

    pub(crate) fn parsed_token_url(&self) -> Result<Url, OAuth2Error> {
        parse_url(&self.token_url)
    }

    pub(crate) fn parsed_authorization_url(&self) -> Result<Url, OAuth2Error> {
        parse_url(&self.authorization_url)
    }
}

fn parse_url(url: &str) -> Result<Url, OAuth2Error> {
    Url::parse(url).map_err(|source| OAuth2Error::InvalidUrl {
        url: url.to_string(),
        source,
    })
}

impl fmt::Debug for OAuth2Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("token_url", &self.token_url)
            .field("authorization_url", &self.authorization_url)
            .field("scopes", &self.scopes)
            .field("token_store", &self.token_store)
            .finish()
    }
}
