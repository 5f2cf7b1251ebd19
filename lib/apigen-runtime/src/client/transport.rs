use std::sync::Arc;

use http::HeaderValue;
use http::header::{ACCEPT, InvalidHeaderValue, USER_AGENT};
use reqwest::{Request, Response};
use tracing::debug;

use super::{ApiClientError, AuthenticationError, Authenticator};

/// Product name sent in the `User-Agent` header when none is configured.
pub const DEFAULT_USER_AGENT_PRODUCT: &str = "apigen";

/// Builds the `User-Agent` value, `<product>` or `<product>/<version>`.
///
/// # Errors
///
/// Fails if product or version contain characters not allowed in a header value.
pub fn user_agent(product: &str, version: Option<&str>) -> Result<HeaderValue, InvalidHeaderValue> {
    match version.filter(|version| !version.is_empty()) {
        Some(version) => HeaderValue::from_str(&format!("{product}/{version}")),
        None => HeaderValue::from_str(product),
    }
}

pub(crate) fn apply_standard_headers(request: &mut Request, user_agent: &HeaderValue) {
    let headers = request.headers_mut();
    headers.insert(USER_AGENT, user_agent.clone());
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
}

/// The send path of an API client.
///
/// Every request goes through [`Transport::intercept`] before dispatch: the
/// standard `User-Agent` and `Accept` headers are set, then the
/// [`Authenticator`] adds its credentials.
///
/// Cloning is cheap: the HTTP client and the authenticator are shared.
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    authenticator: Arc<Authenticator>,
    user_agent: HeaderValue,
}

impl Transport {
    /// Creates a transport sending through `client`.
    pub fn new(client: reqwest::Client, authenticator: Authenticator, user_agent: HeaderValue) -> Self {
        Self {
            client,
            authenticator: Arc::new(authenticator),
            user_agent,
        }
    }

    /// Returns the authenticator signing the requests.
    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    /// Returns the `User-Agent` value.
    pub fn user_agent(&self) -> &HeaderValue {
        &self.user_agent
    }

    /// Adds the standard headers and the credentials to `request`.
    ///
    /// # Errors
    ///
    /// Fails only when the authenticator refuses to sign the request.
    pub async fn intercept(&self, request: &mut Request) -> Result<(), AuthenticationError> {
        apply_standard_headers(request, &self.user_agent);
        self.authenticator.intercept(request).await
    }

    /// Signs and sends `request`.
    ///
    /// The request is attempted exactly once.
    ///
    /// # Errors
    ///
    /// Fails if the request cannot be signed or sent.
    pub async fn execute(&self, mut request: Request) -> Result<Response, ApiClientError> {
        self.intercept(&mut request).await?;

        debug!(?request, "sending...");
        let response = self.client.execute(request).await?;
        debug!(?response, "...receiving");

        Ok(response)
    }
}
