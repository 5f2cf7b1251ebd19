use std::fmt;
use std::time::Duration;

use base64::Engine;
use http::HeaderValue;
use reqwest::Request;
use reqwest::header::{AUTHORIZATION, COOKIE, HeaderName};
use zeroize::Zeroize;

use super::auth::{ApiKeyLocation, AuthenticationError, Credentials, SecureString};
use super::oauth2::OAuth2Authenticator;

/// Safety margin applied to the token expiry before a refresh is attempted.
pub const DEFAULT_EXPIRE_THRESHOLD: Duration = Duration::from_secs(600);

/// What to do with a request when the OAuth2 access token cannot be obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthFailurePolicy {
    /// Send the request without an `Authorization` header.
    #[default]
    ProceedUnauthenticated,
    /// Fail the request with the acquisition error.
    Propagate,
}

/// Signs outgoing requests according to one authentication scheme.
#[derive(Debug)]
pub enum Authenticator {
    /// Adds nothing.
    Anonymous,
    /// `Authorization: Basic ...`.
    HttpBasic(HttpBasicAuthenticator),
    /// `Authorization: Bearer ...`.
    HttpBearer(HttpBearerAuthenticator),
    /// API key header, query parameter or cookie.
    ApiKey(ApiKeyAuthenticator),
    /// `Authorization: Bearer ...` with a managed OAuth2 access token.
    OAuth2(OAuth2Authenticator),
}

impl Authenticator {
    /// Adds the scheme credentials to the request.
    ///
    /// # Errors
    ///
    /// Only the OAuth2 scheme can fail here, and only with
    /// [`AuthFailurePolicy::Propagate`].
    pub async fn intercept(&self, request: &mut Request) -> Result<(), AuthenticationError> {
        match self {
            Self::Anonymous => {}
            Self::HttpBasic(authenticator) => authenticator.sign(request),
            Self::HttpBearer(authenticator) => authenticator.sign(request),
            Self::ApiKey(authenticator) => authenticator.sign(request),
            Self::OAuth2(authenticator) => authenticator.sign(request).await?,
        }
        Ok(())
    }

    /// Returns the OAuth2 authenticator, if this is one.
    pub fn as_oauth2(&self) -> Option<&OAuth2Authenticator> {
        match self {
            Self::OAuth2(authenticator) => Some(authenticator),
            _ => None,
        }
    }
}

/// HTTP Basic authenticator.
#[derive(Clone)]
pub struct HttpBasicAuthenticator {
    header: HeaderValue,
}

impl HttpBasicAuthenticator {
    /// Creates the authenticator, validating the credentials once.
    ///
    /// # Errors
    ///
    /// Fails if the user name contains a colon or the credentials cannot be
    /// encoded into a header value.
    pub fn new(user_name: &str, password: &SecureString) -> Result<Self, AuthenticationError> {
        if user_name.contains(':') {
            return Err(AuthenticationError::InvalidUserName {
                message: "User name cannot contain colon (:) character".to_string(),
            });
        }

        let credentials = format!("{user_name}:{}", password.as_str());
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        let header = sensitive_value(&format!("Basic {encoded}")).map_err(|message| {
            AuthenticationError::InvalidPassword { message }
        })?;

        Ok(Self { header })
    }

    pub(crate) fn sign(&self, request: &mut Request) {
        request
            .headers_mut()
            .insert(AUTHORIZATION, self.header.clone());
    }
}

impl fmt::Debug for HttpBasicAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBasicAuthenticator")
            .field("header", &"[REDACTED]")
            .finish()
    }
}

/// HTTP Bearer authenticator.
#[derive(Clone)]
pub struct HttpBearerAuthenticator {
    header: HeaderValue,
}

impl HttpBearerAuthenticator {
    /// Creates the authenticator, validating the token once.
    ///
    /// # Errors
    ///
    /// Fails if the token contains characters not allowed in a header value.
    pub fn new(token: &SecureString) -> Result<Self, AuthenticationError> {
        let header = bearer_value(token.as_str())?;
        Ok(Self { header })
    }

    pub(crate) fn sign(&self, request: &mut Request) {
        request
            .headers_mut()
            .insert(AUTHORIZATION, self.header.clone());
    }
}

impl fmt::Debug for HttpBearerAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBearerAuthenticator")
            .field("header", &"[REDACTED]")
            .finish()
    }
}

/// API key authenticator.
#[derive(Clone)]
pub struct ApiKeyAuthenticator {
    placement: ApiKeyPlacement,
}

#[derive(Clone)]
enum ApiKeyPlacement {
    Header(HeaderName, HeaderValue),
    Query { name: String, token: SecureString },
    Cookie { name: String, pair: SecureString },
}

impl ApiKeyAuthenticator {
    /// Creates the authenticator, validating name and key for their location.
    ///
    /// # Errors
    ///
    /// Fails if the name or key cannot be used at the requested location.
    pub fn new(
        name: &str,
        token: &SecureString,
        location: ApiKeyLocation,
    ) -> Result<Self, AuthenticationError> {
        let placement = match location {
            ApiKeyLocation::Header => {
                let header = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                    AuthenticationError::InvalidApiKeyName {
                        name: name.to_string(),
                        message: err.to_string(),
                    }
                })?;
                let value = sensitive_value(token.as_str())
                    .map_err(|message| AuthenticationError::InvalidApiKey { message })?;
                ApiKeyPlacement::Header(header, value)
            }
            ApiKeyLocation::Query => {
                if name.is_empty() {
                    return Err(AuthenticationError::InvalidApiKeyName {
                        name: name.to_string(),
                        message: "query parameter name cannot be empty".to_string(),
                    });
                }
                ApiKeyPlacement::Query {
                    name: name.to_string(),
                    token: token.clone(),
                }
            }
            ApiKeyLocation::Cookie => {
                if name.is_empty() || name.contains(['=', ';', ' ']) {
                    return Err(AuthenticationError::InvalidApiKeyName {
                        name: name.to_string(),
                        message: "cookie name cannot be empty or contain '=', ';' or spaces"
                            .to_string(),
                    });
                }
                let pair = SecureString::new(format!("{name}={}", token.as_str()));
                // validated once here, appended to the Cookie header per request
                sensitive_value(pair.as_str())
                    .map_err(|message| AuthenticationError::InvalidApiKey { message })?;
                ApiKeyPlacement::Cookie {
                    name: name.to_string(),
                    pair,
                }
            }
        };

        Ok(Self { placement })
    }

    pub(crate) fn sign(&self, request: &mut Request) {
        match &self.placement {
            ApiKeyPlacement::Header(name, value) => {
                request.headers_mut().insert(name.clone(), value.clone());
            }
            ApiKeyPlacement::Query { name, token } => {
                request
                    .url_mut()
                    .query_pairs_mut()
                    .append_pair(name, token.as_str());
            }
            ApiKeyPlacement::Cookie { pair, .. } => {
                let headers = request.headers_mut();
                let mut cookie = Vec::new();
                if let Some(existing) = headers.get(COOKIE).filter(|value| !value.is_empty()) {
                    cookie.extend_from_slice(existing.as_bytes());
                    cookie.extend_from_slice(b"; ");
                }
                cookie.extend_from_slice(pair.as_str().as_bytes());

                // existing value and pair are both valid header bytes
                let value = HeaderValue::from_bytes(&cookie);
                cookie.zeroize();
                if let Ok(mut value) = value {
                    value.set_sensitive(true);
                    headers.insert(COOKIE, value);
                }
            }
        }
    }
}

impl fmt::Debug for ApiKeyAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, location) = match &self.placement {
            ApiKeyPlacement::Header(name, _) => (name.as_str(), ApiKeyLocation::Header),
            ApiKeyPlacement::Query { name, .. } => (name.as_str(), ApiKeyLocation::Query),
            ApiKeyPlacement::Cookie { name, .. } => (name.as_str(), ApiKeyLocation::Cookie),
        };
        f.debug_struct("ApiKeyAuthenticator")
            .field("name", &name)
            .field("location", &location)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Builds the [`Authenticator`] matching a set of [`Credentials`].
///
/// The factory owns the HTTP client used by OAuth2 authenticators to reach
/// their token endpoint, so no process-wide client is ever shared implicitly.
#[derive(Debug, Clone)]
pub struct AuthenticatorFactory {
    client: reqwest::Client,
    user_agent: HeaderValue,
    failure_policy: AuthFailurePolicy,
    expire_threshold: Duration,
    automatic_refresh: bool,
}

impl AuthenticatorFactory {
    /// Creates a factory using `client` for token endpoint calls.
    pub fn new(client: reqwest::Client, user_agent: HeaderValue) -> Self {
        Self {
            client,
            user_agent,
            failure_policy: AuthFailurePolicy::default(),
            expire_threshold: DEFAULT_EXPIRE_THRESHOLD,
            automatic_refresh: true,
        }
    }

    /// Sets what OAuth2 authenticators do when no token can be obtained.
    #[must_use]
    pub fn with_failure_policy(mut self, failure_policy: AuthFailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Sets how long before expiry an OAuth2 token is refreshed.
    #[must_use]
    pub fn with_expire_threshold(mut self, expire_threshold: Duration) -> Self {
        self.expire_threshold = expire_threshold;
        self
    }

    /// Sets whether OAuth2 tokens close to expiry are refreshed automatically.
    #[must_use]
    pub fn with_automatic_refresh(mut self, automatic_refresh: bool) -> Self {
        self.automatic_refresh = automatic_refresh;
        self
    }

    /// Builds the authenticator for `credentials`.
    ///
    /// # Errors
    ///
    /// Fails if the credentials cannot be turned into valid headers, or if
    /// the OAuth2 token URL is malformed.
    pub fn build(&self, credentials: Credentials) -> Result<Authenticator, AuthenticationError> {
        let authenticator = match credentials {
            Credentials::Anonymous => Authenticator::Anonymous,
            Credentials::HttpBasic {
                user_name,
                password,
            } => Authenticator::HttpBasic(HttpBasicAuthenticator::new(&user_name, &password)?),
            Credentials::HttpBearer { token } => {
                Authenticator::HttpBearer(HttpBearerAuthenticator::new(&token)?)
            }
            Credentials::ApiKey {
                name,
                token,
                location,
            } => Authenticator::ApiKey(ApiKeyAuthenticator::new(&name, &token, location)?),
            Credentials::OAuth2(credentials) => Authenticator::OAuth2(
                OAuth2Authenticator::new(credentials, self.client.clone(), self.user_agent.clone())?
                    .with_failure_policy(self.failure_policy)
                    .with_expire_threshold(self.expire_threshold)
                    .with_automatic_refresh(self.automatic_refresh),
            ),
        };
        Ok(authenticator)
    }
}

pub(crate) fn bearer_value(token: &str) -> Result<HeaderValue, AuthenticationError> {
    sensitive_value(&format!("Bearer {token}"))
        .map_err(|message| AuthenticationError::InvalidBearerToken { message })
}

fn sensitive_value(value: &str) -> Result<HeaderValue, String> {
    let mut value = HeaderValue::from_str(value).map_err(|err| err.to_string())?;
    value.set_sensitive(true);
    Ok(value)
}
