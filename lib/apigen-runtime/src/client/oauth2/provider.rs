//! OAuth2 authenticator: token acquisition, refresh and request signing.

use std::fmt;
use std::time::Duration;

use headers::{ContentType, HeaderMapExt};
use http::{HeaderValue, Method, StatusCode};
use reqwest::header::AUTHORIZATION;
use reqwest::{Body, Request, Response};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use super::config::OAuth2Credentials;
use super::error::OAuth2Error;
use super::store::SharedTokenStore;
use super::token::AccessToken;
use crate::client::authenticator::{
    AuthFailurePolicy, DEFAULT_EXPIRE_THRESHOLD, HttpBasicAuthenticator, bearer_value,
};
use crate::client::transport::apply_standard_headers;
use crate::client::AuthenticationError;

const BODY_MAX_LENGTH: usize = 1024;

/// Authenticator for OAuth2 credentials.
///
/// Owns the token lifecycle: the current token lives in the credentials'
/// [`TokenStore`](super::TokenStore), is fetched with the client-credentials
/// grant when missing or expired, and refreshed when it gets close to expiry.
///
/// Token endpoint calls are authenticated with HTTP Basic using the client id
/// and secret, and attempted exactly once. Token acquisition is serialised per
/// authenticator, so concurrent requests trigger at most one fetch or refresh.
pub struct OAuth2Authenticator {
    credentials: OAuth2Credentials,
    token_url: Url,
    client: reqwest::Client,
    user_agent: HeaderValue,
    client_authentication: HttpBasicAuthenticator,
    failure_policy: AuthFailurePolicy,
    expire_threshold: Duration,
    automatic_refresh: bool,
    token_gate: Mutex<()>,
}

impl OAuth2Authenticator {
    /// Creates the authenticator, sending token requests through `client`.
    ///
    /// # Errors
    ///
    /// Fails if the token URL is malformed or the client id and secret cannot
    /// be used for HTTP Basic authentication.
    pub fn new(
        credentials: OAuth2Credentials,
        client: reqwest::Client,
        user_agent: HeaderValue,
    ) -> Result<Self, OAuth2Error> {
        let token_url = credentials.parsed_token_url()?;
        let client_authentication =
            HttpBasicAuthenticator::new(&credentials.client_id, &credentials.client_secret)
                .map_err(|err| OAuth2Error::RequestBuild {
                    reason: err.to_string(),
                })?;

        Ok(Self {
            credentials,
            token_url,
            client,
            user_agent,
            client_authentication,
            failure_policy: AuthFailurePolicy::default(),
            expire_threshold: DEFAULT_EXPIRE_THRESHOLD,
            automatic_refresh: true,
            token_gate: Mutex::new(()),
        })
    }

    /// Sets what happens to a request when no token can be obtained.
    #[must_use]
    pub fn with_failure_policy(mut self, failure_policy: AuthFailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Sets how long before expiry a token is refreshed.
    #[must_use]
    pub fn with_expire_threshold(mut self, expire_threshold: Duration) -> Self {
        self.expire_threshold = expire_threshold;
        self
    }

    /// Sets whether tokens close to expiry are refreshed automatically.
    #[must_use]
    pub fn with_automatic_refresh(mut self, automatic_refresh: bool) -> Self {
        self.automatic_refresh = automatic_refresh;
        self
    }

    /// Returns the credentials.
    pub fn credentials(&self) -> &OAuth2Credentials {
        &self.credentials
    }

    /// Returns the token store.
    pub fn token_store(&self) -> &SharedTokenStore {
        &self.credentials.token_store
    }

    /// Returns the failure policy.
    pub fn failure_policy(&self) -> AuthFailurePolicy {
        self.failure_policy
    }

    /// Builds the URL the user agent is redirected to for the
    /// authorization-code flow.
    ///
    /// Appends `response_type=code`, `client_id`, and when provided
    /// `redirect_uri`, `scopes` (comma separated) and `state`.
    ///
    /// # Errors
    ///
    /// Fails if the configured authorization URL is malformed or missing.
    pub fn build_redirect_url(
        &self,
        redirect_url: Option<&str>,
        scopes: &[&str],
        state: Option<&str>,
    ) -> Result<Url, OAuth2Error> {
        let mut url = self.credentials.parsed_authorization_url()?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.credentials.client_id);
            if let Some(redirect_url) = redirect_url.filter(|it| !it.is_empty()) {
                query.append_pair("redirect_uri", redirect_url);
            }
            if !scopes.is_empty() {
                query.append_pair("scopes", &scopes.join(","));
            }
            if let Some(state) = state.filter(|it| !it.is_empty()) {
                query.append_pair("state", state);
            }
        }

        Ok(url)
    }

    /// Exchanges an authorization code for a token, and persists it.
    ///
    /// # Errors
    ///
    /// Fails if the token endpoint cannot be reached, rejects the request,
    /// answers with an invalid token, or the token cannot be persisted.
    pub async fn fetch_access_token_by_code(&self, code: &str) -> Result<AccessToken, OAuth2Error> {
        self.request_token(&[("grant_type", "authorization_code"), ("code", code)])
            .await
    }

    /// Fetches a token with the client-credentials grant, and persists it.
    ///
    /// Configured scopes are sent comma separated.
    ///
    /// # Errors
    ///
    /// Same as [`fetch_access_token_by_code`](Self::fetch_access_token_by_code).
    pub async fn fetch_access_token_by_client_credentials(
        &self,
    ) -> Result<AccessToken, OAuth2Error> {
        let scope = self.credentials.scopes.join(",");
        let mut form = vec![("grant_type", "client_credentials")];
        if !scope.is_empty() {
            form.push(("scope", scope.as_str()));
        }
        self.request_token(&form).await
    }

    /// Exchanges a refresh token for a new token, and persists it.
    ///
    /// # Errors
    ///
    /// Same as [`fetch_access_token_by_code`](Self::fetch_access_token_by_code).
    pub async fn fetch_access_token_by_refresh(
        &self,
        refresh_token: &str,
    ) -> Result<AccessToken, OAuth2Error> {
        self.request_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    /// Returns a usable access token with the configured refresh settings.
    ///
    /// # Errors
    ///
    /// See [`get_access_token`](Self::get_access_token).
    pub async fn access_token(&self) -> Result<String, OAuth2Error> {
        self.get_access_token(self.automatic_refresh, self.expire_threshold)
            .await
    }

    /// Returns a usable access token.
    ///
    /// 1. The stored token is used unless the store read fails or the token
    ///    already expired; otherwise a token is fetched with the
    ///    client-credentials grant.
    /// 2. A token expiring after `now + expire_threshold` is returned as is.
    /// 3. Otherwise, with `automatic_refresh` and a refresh token, the token
    ///    is refreshed and the new one returned.
    /// 4. Otherwise the token is returned even though it is about to expire.
    ///
    /// # Errors
    ///
    /// Returns [`OAuth2Error::NoToken`] when no token is stored and the
    /// client-credentials fetch fails, and [`OAuth2Error::Refresh`] when the
    /// refresh grant fails.
    pub async fn get_access_token(
        &self,
        automatic_refresh: bool,
        expire_threshold: Duration,
    ) -> Result<String, OAuth2Error> {
        let _gate = self.token_gate.lock().await;

        let now = unix_now();
        let threshold = i64::try_from(expire_threshold.as_secs()).unwrap_or(i64::MAX);

        let token = match self.credentials.token_store.get().await {
            Ok(token) if !token.is_expired_at(now) => token,
            stored => {
                match stored {
                    Ok(_) => debug!("stored access token has expired"),
                    Err(error) => debug!(%error, "no usable stored access token"),
                }
                self.fetch_access_token_by_client_credentials()
                    .await
                    .map_err(|source| OAuth2Error::NoToken {
                        source: Box::new(source),
                    })?
            }
        };

        if token.expires_at(now) > now.saturating_add(threshold) {
            return Ok(token.access_token().to_string());
        }

        if automatic_refresh && let Some(refresh_token) = token.refresh_token() {
            debug!(
                expires_at = token.expires_at(now),
                "access token close to expiry, refreshing"
            );
            let refreshed = self
                .fetch_access_token_by_refresh(refresh_token)
                .await
                .map_err(|source| OAuth2Error::Refresh {
                    source: Box::new(source),
                })?;
            return Ok(refreshed.access_token().to_string());
        }

        Ok(token.access_token().to_string())
    }

    /// Turns a token endpoint response into a token, and persists it.
    ///
    /// A duration `expires_in` is anchored to the current time before the
    /// token is persisted.
    ///
    /// # Errors
    ///
    /// Fails if the status is not `200 OK`, the body cannot be read or
    /// decoded, the access token is empty, or persisting fails.
    pub async fn parse_token_response(&self, response: Response) -> Result<AccessToken, OAuth2Error> {
        let status = response.status();
        if status != StatusCode::OK {
            let body = response
                .text()
                .await
                .map(truncate_body)
                .unwrap_or_else(|err| format!("<unable to read response body: {err}>"));
            return Err(OAuth2Error::NonSuccessStatus { status, body });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| OAuth2Error::BodyRead { source })?;

        let mut deserializer = serde_json::Deserializer::from_slice(&bytes);
        let token: AccessToken = serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|source| OAuth2Error::Decode { source })?;

        if token.access_token().is_empty() {
            return Err(OAuth2Error::MissingAccessToken);
        }

        let token = token.anchored_at(unix_now());
        self.credentials
            .token_store
            .persist(token.clone())
            .await
            .map_err(|source| OAuth2Error::Persist { source })?;

        Ok(token)
    }

    pub(crate) async fn sign(&self, request: &mut Request) -> Result<(), AuthenticationError> {
        let header = match self.access_token().await {
            Ok(token) => bearer_value(&token),
            Err(error) => Err(error.into()),
        };

        match header {
            Ok(value) => {
                request.headers_mut().insert(AUTHORIZATION, value);
                Ok(())
            }
            Err(error) => match self.failure_policy {
                AuthFailurePolicy::ProceedUnauthenticated => {
                    warn!(%error, "no access token available, sending request without authorization");
                    Ok(())
                }
                AuthFailurePolicy::Propagate => Err(error),
            },
        }
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<AccessToken, OAuth2Error> {
        let grant = form
            .iter()
            .find_map(|(name, value)| (*name == "grant_type").then_some(*value))
            .unwrap_or_default();
        debug!(grant, token_url = %self.token_url, "requesting access token");

        let body = serde_urlencoded::to_string(form).map_err(|err| OAuth2Error::RequestBuild {
            reason: err.to_string(),
        })?;

        let mut request = Request::new(Method::POST, self.token_url.clone());
        request
            .headers_mut()
            .typed_insert(ContentType::form_url_encoded());
        *request.body_mut() = Some(Body::from(body));
        apply_standard_headers(&mut request, &self.user_agent);
        self.client_authentication.sign(&mut request);

        debug!(?request, "sending...");
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|source| OAuth2Error::Transport { source })?;
        debug!(?response, "...receiving");

        self.parse_token_response(response).await
    }
}

impl fmt::Debug for OAuth2Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Authenticator")
            .field("credentials", &self.credentials)
            .field("failure_policy", &self.failure_policy)
            .field("expire_threshold", &self.expire_threshold)
            .field("automatic_refresh", &self.automatic_refresh)
            .finish_non_exhaustive()
    }
}

fn unix_now() -> i64 {
    jiff::Timestamp::now().as_second()
}

fn truncate_body(mut text: String) -> String {
    if text.len() > BODY_MAX_LENGTH {
        let mut end = BODY_MAX_LENGTH;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
        text.push_str("... (truncated)");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::oauth2::{MemoryTokenStore, TokenStoreError};

    fn authenticator(credentials: OAuth2Credentials) -> OAuth2Authenticator {
        OAuth2Authenticator::new(
            credentials,
            reqwest::Client::new(),
            HeaderValue::from_static("apigen"),
        )
        .expect("valid credentials")
    }

    fn credentials() -> OAuth2Credentials {
        // nothing listens on the discard port: any token request fails fast
        OAuth2Credentials::new("my-client", "my-secret", "http://127.0.0.1:9/token")
            .with_authorization_url("https://auth.example.com/authorize")
    }

    #[test]
    fn should_build_full_redirect_url() {
        let authenticator = authenticator(credentials());

        let url = authenticator
            .build_redirect_url(
                Some("https://app.example.com/callback"),
                &["read", "write"],
                Some("xyz"),
            )
            .expect("valid redirect url");

        insta::assert_snapshot!(url, @"https://auth.example.com/authorize?response_type=code&client_id=my-client&redirect_uri=https%3A%2F%2Fapp.example.com%2Fcallback&scopes=read%2Cwrite&state=xyz");
    }

    #[test]
    fn should_build_minimal_redirect_url() {
        let authenticator = authenticator(credentials());

        let url = authenticator
            .build_redirect_url(None, &[], None)
            .expect("valid redirect url");

        assert_eq!(
            url.as_str(),
            "https://auth.example.com/authorize?response_type=code&client_id=my-client"
        );
    }

    #[test]
    fn should_keep_existing_authorization_query() {
        let credentials = credentials().with_authorization_url("https://auth.example.com/authorize?tenant=acme");
        let authenticator = authenticator(credentials);

        let url = authenticator
            .build_redirect_url(None, &[], Some("s"))
            .expect("valid redirect url");

        assert_eq!(url.query(), Some("tenant=acme&response_type=code&client_id=my-client&state=s"));
    }

    #[test]
    fn should_fail_on_malformed_authorization_url() {
        let credentials = credentials().with_authorization_url("::not a url::");
        let authenticator = authenticator(credentials);

        let result = authenticator.build_redirect_url(None, &[], None);
        assert!(matches!(result, Err(OAuth2Error::InvalidUrl { .. })));
    }

    #[test]
    fn should_reject_malformed_token_url() {
        let credentials = OAuth2Credentials::new("my-client", "my-secret", "not a url");
        let result = OAuth2Authenticator::new(
            credentials,
            reqwest::Client::new(),
            HeaderValue::from_static("apigen"),
        );
        assert!(matches!(result, Err(OAuth2Error::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn should_use_valid_stored_token_without_fetching() {
        let token = AccessToken::new("stored").with_expires_in(unix_now() + 3600);
        let credentials = credentials().with_token_store(MemoryTokenStore::with_token(token));
        let authenticator = authenticator(credentials);

        let access_token = authenticator
            .get_access_token(true, Duration::from_secs(600))
            .await
            .expect("stored token is fresh");
        assert_eq!(access_token, "stored");
    }

    #[tokio::test]
    async fn should_return_stale_token_without_refresh_token() {
        let token = AccessToken::new("stale").with_expires_in(unix_now() + 60);
        let credentials = credentials().with_token_store(MemoryTokenStore::with_token(token));
        let authenticator = authenticator(credentials);

        let access_token = authenticator
            .get_access_token(true, Duration::from_secs(600))
            .await
            .expect("stale token is still returned");
        assert_eq!(access_token, "stale");
    }

    #[tokio::test]
    async fn should_return_stale_token_when_refresh_disabled() {
        let token = AccessToken::new("stale")
            .with_expires_in(unix_now() + 60)
            .with_refresh_token("refresh");
        let credentials = credentials().with_token_store(MemoryTokenStore::with_token(token));
        let authenticator = authenticator(credentials);

        let access_token = authenticator
            .get_access_token(false, Duration::from_secs(600))
            .await
            .expect("no refresh attempted");
        assert_eq!(access_token, "stale");
    }

    #[tokio::test]
    async fn should_report_no_token_when_endpoint_unreachable() {
        let authenticator = authenticator(credentials());

        let result = authenticator
            .get_access_token(true, Duration::from_secs(600))
            .await;
        match result {
            Err(OAuth2Error::NoToken { source }) => {
                assert!(matches!(*source, OAuth2Error::Transport { .. }));
            }
            other => panic!("Expected NoToken error, got {other:?}"),
        }

        assert!(matches!(
            authenticator.token_store().get().await,
            Err(TokenStoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn should_sign_without_authorization_when_failing_open() {
        let authenticator = authenticator(credentials());
        let url = Url::parse("http://localhost/").expect("valid url");
        let mut request = Request::new(Method::GET, url);

        authenticator.sign(&mut request).await.expect("fail open");
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn should_propagate_failure_when_configured() {
        let authenticator =
            authenticator(credentials()).with_failure_policy(AuthFailurePolicy::Propagate);
        let url = Url::parse("http://localhost/").expect("valid url");
        let mut request = Request::new(Method::GET, url);

        let result = authenticator.sign(&mut request).await;
        assert!(matches!(
            result,
            Err(AuthenticationError::OAuth2 {
                source: OAuth2Error::NoToken { .. }
            })
        ));
    }

    #[test]
    fn should_truncate_long_bodies_on_char_boundary() {
        let body = "é".repeat(BODY_MAX_LENGTH);
        let truncated = truncate_body(body);
        assert!(truncated.ends_with("... (truncated)"));
        assert!(truncated.len() <= BODY_MAX_LENGTH + "... (truncated)".len());

        assert_eq!(truncate_body("short".to_string()), "short");
    }

    #[test]
    fn should_redact_debug_output() {
        let authenticator = authenticator(credentials());
        let debug_str = format!("{authenticator:?}");
        assert!(debug_str.contains("my-client"));
        assert!(!debug_str.contains("my-secret"));
    }
}
