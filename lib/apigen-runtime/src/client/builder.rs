use std::time::Duration;

use url::Url;

use super::authenticator::DEFAULT_EXPIRE_THRESHOLD;
use super::transport::{DEFAULT_USER_AGENT_PRODUCT, Transport, user_agent};
use super::{ApiClient, ApiClientError, AuthFailurePolicy, AuthenticatorFactory, Credentials};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1/";

/// Builder for creating `ApiClient` instances.
///
/// # Default Configuration
///
/// - **Base URL**: `http://127.0.0.1/`
/// - **Credentials**: [`Credentials::Anonymous`]
/// - **User-Agent**: `apigen` (`apigen/<version>` once a version is set)
/// - **OAuth2**: tokens refreshed automatically 600 seconds before expiry,
///   requests sent unauthenticated when no token can be obtained
///
/// # Example
///
/// ```rust
/// use apigen_runtime::{ApiClient, Credentials};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ApiClient::builder()
///     .with_base_url("https://api.example.com/v1")?
///     .with_credentials(Credentials::http_bearer("my-token"))
///     .with_version("1.2.0")
///     .build()?;
///
/// assert_eq!(client.url("/users")?.as_str(), "https://api.example.com/v1/users");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClientBuilder {
    client: Option<reqwest::Client>,
    base_url: Option<Url>,
    credentials: Credentials,
    product: String,
    version: Option<String>,
    failure_policy: AuthFailurePolicy,
    expire_threshold: Duration,
    automatic_refresh: bool,
}

impl ApiClientBuilder {
    /// Builds the final `ApiClient` instance.
    ///
    /// # Errors
    ///
    /// Fails if the `User-Agent` cannot be built from the product and version,
    /// or if the credentials are rejected by the [`AuthenticatorFactory`].
    pub fn build(self) -> Result<ApiClient, ApiClientError> {
        let Self {
            client,
            base_url,
            credentials,
            product,
            version,
            failure_policy,
            expire_threshold,
            automatic_refresh,
        } = self;

        let base_url = match base_url {
            Some(base_url) => base_url,
            None => Url::parse(DEFAULT_BASE_URL)?,
        };
        let client = client.unwrap_or_default();
        let user_agent = user_agent(&product, version.as_deref())?;

        let authenticator = AuthenticatorFactory::new(client.clone(), user_agent.clone())
            .with_failure_policy(failure_policy)
            .with_expire_threshold(expire_threshold)
            .with_automatic_refresh(automatic_refresh)
            .build(credentials)?;

        Ok(ApiClient {
            base_url,
            transport: Transport::new(client, authenticator, user_agent),
        })
    }

    /// Sets the base URL request paths are resolved against.
    ///
    /// Query and fragment are discarded.
    ///
    /// # Errors
    ///
    /// Fails if the URL is malformed or cannot be a base (e.g. `mailto:`).
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Result<Self, ApiClientError> {
        let base_url = base_url.as_ref();
        let mut url = Url::parse(base_url)?;
        if url.cannot_be_a_base() {
            return Err(ApiClientError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "URL cannot be a base".to_string(),
            });
        }

        url.set_query(None);
        url.set_fragment(None);
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        self.base_url = Some(url);
        Ok(self)
    }

    /// Sets the credentials used to sign every request.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Sets the HTTP client, e.g. to configure timeouts or proxies.
    ///
    /// The same client is used for API calls and OAuth2 token requests.
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Sets the product name of the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent_product(mut self, product: impl Into<String>) -> Self {
        self.product = product.into();
        self
    }

    /// Sets the version appended to the `User-Agent` header.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets what happens to a request when no OAuth2 token can be obtained.
    #[must_use]
    pub fn with_auth_failure_policy(mut self, failure_policy: AuthFailurePolicy) -> Self {
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
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            base_url: None,
            credentials: Credentials::default(),
            product: DEFAULT_USER_AGENT_PRODUCT.to_string(),
            version: None,
            failure_policy: AuthFailurePolicy::default(),
            expire_threshold: DEFAULT_EXPIRE_THRESHOLD,
            automatic_refresh: true,
        }
    }
}
