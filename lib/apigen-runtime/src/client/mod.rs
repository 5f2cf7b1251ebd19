use http::Method;
use reqwest::{Request, Response};
use url::Url;

mod builder;
pub use self::builder::ApiClientBuilder;

mod auth;
pub use self::auth::{ApiKeyLocation, AuthenticationError, Credentials, SecureString};

mod authenticator;
pub use self::authenticator::{
    ApiKeyAuthenticator, AuthFailurePolicy, Authenticator, AuthenticatorFactory,
    DEFAULT_EXPIRE_THRESHOLD, HttpBasicAuthenticator, HttpBearerAuthenticator,
};

pub mod oauth2;
pub use self::oauth2::{
    AccessToken, FileTokenStore, MemoryTokenStore, OAuth2Authenticator, OAuth2Credentials,
    OAuth2Error, SharedTokenStore, TIMESTAMP_THRESHOLD, TokenStore, TokenStoreError,
};

mod transport;
pub use self::transport::{DEFAULT_USER_AGENT_PRODUCT, Transport, user_agent};

mod error;
pub use self::error::ApiClientError;

/// Runtime core of a generated API client.
///
/// `ApiClient` resolves operation paths against a base URL and sends requests
/// through a [`Transport`] that adds the standard headers and the configured
/// credentials. Use [`ApiClientBuilder`] to create instances.
///
/// Cloning is cheap and clones share the same authenticator, and therefore
/// the same OAuth2 token.
///
/// # Example
///
/// ```rust,no_run
/// use apigen_runtime::{ApiClient, Credentials};
/// use http::Method;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ApiClient::builder()
///     .with_base_url("https://petstore.example.com/api")?
///     .with_credentials(Credentials::api_key("X-API-Key", "secret"))
///     .build()?;
///
/// let request = client.request(Method::GET, "/pets?limit=10")?;
/// let response = client.execute(request).await?;
/// println!("{}", response.status());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    transport: Transport,
}

impl ApiClient {
    /// Creates a builder with the default configuration.
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Returns the base URL, always ending with `/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the transport sending the requests.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Returns the authenticator signing the requests.
    pub fn authenticator(&self) -> &Authenticator {
        self.transport.authenticator()
    }

    /// Returns the OAuth2 authenticator, to drive the authorization-code flow.
    pub fn oauth2(&self) -> Option<&OAuth2Authenticator> {
        self.authenticator().as_oauth2()
    }

    /// Resolves `path` (optionally with a query string) against the base URL.
    ///
    /// # Errors
    ///
    /// Fails if the resulting URL is malformed.
    pub fn url(&self, path: &str) -> Result<Url, ApiClientError> {
        let url = self.base_url.join(path.trim_start_matches('/'))?;
        Ok(url)
    }

    /// Creates an unsigned request for `path`.
    ///
    /// # Errors
    ///
    /// Fails if the resulting URL is malformed.
    pub fn request(&self, method: Method, path: &str) -> Result<Request, ApiClientError> {
        let url = self.url(path)?;
        Ok(Request::new(method, url))
    }

    /// Signs and sends `request` through the transport.
    ///
    /// # Errors
    ///
    /// See [`Transport::execute`].
    pub async fn execute(&self, request: Request) -> Result<Response, ApiClientError> {
        self.transport.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn client(base_url: &str) -> ApiClient {
        ApiClient::builder()
            .with_base_url(base_url)
            .expect("valid base url")
            .build()
            .expect("client")
    }

    #[rstest]
    #[case("https://api.example.com/v1", "/users", "https://api.example.com/v1/users")]
    #[case("https://api.example.com/v1", "users/42", "https://api.example.com/v1/users/42")]
    #[case("https://api.example.com/v1/", "/users?limit=5", "https://api.example.com/v1/users?limit=5")]
    #[case("https://api.example.com", "/", "https://api.example.com/")]
    fn test_url_resolution(#[case] base_url: &str, #[case] path: &str, #[case] expected: &str) {
        let client = client(base_url);
        assert_eq!(client.url(path).expect("valid url").as_str(), expected);
    }

    #[test]
    fn test_request_is_unsigned() {
        let client = ApiClient::builder()
            .with_credentials(Credentials::http_bearer("token"))
            .build()
            .expect("client");

        let request = client.request(Method::DELETE, "/pets/1").expect("request");
        assert_eq!(request.method(), Method::DELETE);
        assert_eq!(request.url().as_str(), "http://127.0.0.1/pets/1");
        assert!(request.headers().is_empty());
    }

    #[test]
    fn test_no_oauth2_for_static_credentials() {
        let client = ApiClient::builder()
            .with_credentials(Credentials::http_basic("user", "pass"))
            .build()
            .expect("client");

        assert!(client.oauth2().is_none());
        assert!(matches!(client.authenticator(), Authenticator::HttpBasic(_)));
    }
}
