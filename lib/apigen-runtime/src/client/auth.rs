use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::oauth2::{OAuth2Credentials, OAuth2Error};

/// Errors that can occur while turning credentials into request headers.
#[derive(Debug, derive_more::Error, derive_more::Display)]
pub enum AuthenticationError {
    /// Bearer token contains invalid characters for HTTP headers.
    #[display("Bearer token contains invalid characters: {message}")]
    InvalidBearerToken {
        /// Description of the invalid characters or format issue.
        message: String,
    },

    /// Basic authentication user name contains invalid characters.
    #[display("Basic auth user name contains invalid characters: {message}")]
    InvalidUserName {
        /// Description of the invalid characters or format issue.
        message: String,
    },

    /// Basic authentication password contains invalid characters.
    #[display("Basic auth password contains invalid characters: {message}")]
    InvalidPassword {
        /// Description of the invalid characters or format issue.
        message: String,
    },

    /// API key name is invalid for its location.
    #[display("Invalid API key name '{name}': {message}")]
    InvalidApiKeyName {
        /// The invalid name that was provided.
        name: String,
        /// Description of why the name is invalid.
        message: String,
    },

    /// API key value contains invalid characters for its location.
    #[display("API key contains invalid characters: {message}")]
    InvalidApiKey {
        /// Description of the invalid characters or format issue.
        message: String,
    },

    /// Credentials declare a scheme this runtime does not know.
    #[display("Unknown credentials type '{kind}'")]
    UnknownCredentials {
        /// The unrecognized scheme tag.
        kind: String,
    },

    /// Credentials could not be read from configuration.
    #[display("Invalid credentials configuration: {source}")]
    InvalidConfiguration {
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// OAuth2 token acquisition failed.
    #[display("OAuth2 error: {source}")]
    OAuth2 {
        /// The token lifecycle failure.
        source: OAuth2Error,
    },
}

impl From<OAuth2Error> for AuthenticationError {
    fn from(source: OAuth2Error) -> Self {
        Self::OAuth2 { source }
    }
}

/// Secure wrapper for sensitive string data that zeroes its memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecureString(String);

impl SecureString {
    /// Creates a new secure string from the provided value.
    pub fn new(value: String) -> Self {
        Self(value)
    }

    /// Returns a reference to the inner string value.
    ///
    /// The returned reference should not be stored for extended periods.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks if the secure string equals the given string slice.
    pub fn equals_str(&self, other: &str) -> bool {
        self.0 == other
    }

    /// Masks sensitive data for display/logging purposes.
    fn mask_sensitive(value: &str) -> String {
        match (value.get(..4), value.get(value.len().saturating_sub(4)..)) {
            (Some(head), Some(tail)) if value.len() > 8 => format!("{head}...{tail}"),
            _ => "***".to_string(),
        }
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureString")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Display for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Self::mask_sensitive(&self.0))
    }
}

impl From<String> for SecureString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecureString {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl Serialize for SecureString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecureString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// Where an API key is placed on the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyLocation {
    /// `<name>: <key>` request header.
    #[default]
    Header,
    /// `?<name>=<key>` query parameter.
    Query,
    /// `<name>=<key>` pair in the `Cookie` header.
    Cookie,
}

/// The authentication scheme of a client, with its secrets and endpoints.
///
/// Credentials are immutable once built. They are turned into an
/// [`Authenticator`](super::Authenticator) by the
/// [`AuthenticatorFactory`](super::AuthenticatorFactory).
///
/// # Examples
///
/// ```rust
/// use apigen_runtime::{ApiKeyLocation, Credentials};
///
/// let bearer = Credentials::http_bearer("my-api-token");
/// let basic = Credentials::http_basic("user", "pass");
/// let api_key = Credentials::api_key("X-API-Key", "secret-key");
/// let in_query = Credentials::api_key_in("api_key", "secret-key", ApiKeyLocation::Query);
/// ```
///
/// Credentials can also be read from configuration, tagged by `type`:
///
/// ```rust
/// use apigen_runtime::Credentials;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let credentials = Credentials::from_json(r#"{"type":"http_bearer","token":"my-api-token"}"#)?;
/// assert_eq!(credentials.kind(), "http_bearer");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    /// No credentials at all.
    #[default]
    Anonymous,

    /// HTTP Basic authentication (RFC 7617).
    HttpBasic {
        /// The user name.
        user_name: String,
        /// The password.
        password: SecureString,
    },

    /// HTTP Bearer authentication (RFC 6750).
    HttpBearer {
        /// The bearer token.
        token: SecureString,
    },

    /// API key authentication.
    ApiKey {
        /// The header, query parameter or cookie name.
        name: String,
        /// The API key value.
        token: SecureString,
        /// Where the key is placed.
        #[serde(default, rename = "in")]
        location: ApiKeyLocation,
    },

    /// OAuth2 client authentication with token lifecycle management.
    #[serde(rename = "oauth2")]
    OAuth2(OAuth2Credentials),
}

impl Credentials {
    const KINDS: [&'static str; 5] = ["anonymous", "http_basic", "http_bearer", "api_key", "oauth2"];

    /// HTTP Basic credentials.
    pub fn http_basic(user_name: impl Into<String>, password: impl Into<SecureString>) -> Self {
        Self::HttpBasic {
            user_name: user_name.into(),
            password: password.into(),
        }
    }

    /// HTTP Bearer credentials.
    pub fn http_bearer(token: impl Into<SecureString>) -> Self {
        Self::HttpBearer {
            token: token.into(),
        }
    }

    /// API key credentials sent as a request header.
    pub fn api_key(name: impl Into<String>, token: impl Into<SecureString>) -> Self {
        Self::api_key_in(name, token, ApiKeyLocation::Header)
    }

    /// API key credentials at the given location.
    pub fn api_key_in(
        name: impl Into<String>,
        token: impl Into<SecureString>,
        location: ApiKeyLocation,
    ) -> Self {
        Self::ApiKey {
            name: name.into(),
            token: token.into(),
            location,
        }
    }

    /// Reads credentials from a JSON document tagged by `type`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthenticationError::UnknownCredentials`] for an unrecognized `type` tag,
    /// and [`AuthenticationError::InvalidConfiguration`] for any other malformed document.
    pub fn from_json(json: &str) -> Result<Self, AuthenticationError> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|source| AuthenticationError::InvalidConfiguration { source })?;

        if let Some(kind) = value.get("type").and_then(serde_json::Value::as_str)
            && !Self::KINDS.contains(&kind)
        {
            return Err(AuthenticationError::UnknownCredentials {
                kind: kind.to_string(),
            });
        }

        serde_json::from_value(value)
            .map_err(|source| AuthenticationError::InvalidConfiguration { source })
    }

    /// Returns the scheme tag of these credentials.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::HttpBasic { .. } => "http_basic",
            Self::HttpBearer { .. } => "http_bearer",
            Self::ApiKey { .. } => "api_key",
            Self::OAuth2(_) => "oauth2",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::HttpBasic { user_name, .. } => f
                .debug_struct("HttpBasic")
                .field("user_name", user_name)
                .field("password", &"[REDACTED]")
                .finish(),
            Self::HttpBearer { .. } => f
                .debug_struct("HttpBearer")
                .field("token", &"[REDACTED]")
                .finish(),
            Self::ApiKey { name, location, .. } => f
                .debug_struct("ApiKey")
                .field("name", name)
                .field("token", &"[REDACTED]")
                .field("location", location)
                .finish(),
            Self::OAuth2(credentials) => f.debug_tuple("OAuth2").field(credentials).finish(),
        }
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "Anonymous"),
            Self::HttpBasic { user_name, .. } => write!(f, "HttpBasic (user name: {user_name})"),
            Self::HttpBearer { token } => write!(f, "HttpBearer {token}"),
            Self::ApiKey { name, token, .. } => write!(f, "ApiKey ({name}: {token})"),
            Self::OAuth2(credentials) => {
                write!(f, "OAuth2 (client_id: {})", credentials.client_id())
            }
        }
    }
}
