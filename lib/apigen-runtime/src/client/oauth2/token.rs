//! OAuth2 access token and expiry arithmetic.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Unix timestamp of 1986-10-09.
///
/// An `expires_in` value below this threshold is a duration in seconds,
/// anything above is already an absolute unix timestamp.
pub const TIMESTAMP_THRESHOLD: i64 = 529_196_400;

/// An OAuth2 access token as returned by a token endpoint.
///
/// The serialized form is the token endpoint document:
/// `{ token_type, access_token, expires_in, refresh_token, scope }`.
/// Missing or `null` fields decode to their empty value.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct AccessToken {
    #[zeroize(skip)]
    #[serde(default, deserialize_with = "null_as_default")]
    token_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    access_token: String,
    #[zeroize(skip)]
    #[serde(default, deserialize_with = "null_as_default")]
    expires_in: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    refresh_token: String,
    #[zeroize(skip)]
    #[serde(default, deserialize_with = "null_as_default")]
    scope: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl AccessToken {
    /// Creates a bearer token without expiry information.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            token_type: "Bearer".to_string(),
            access_token: access_token.into(),
            expires_in: 0,
            refresh_token: String::new(),
            scope: String::new(),
        }
    }

    /// Sets the token type.
    #[must_use]
    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = token_type.into();
        self
    }

    /// Sets the raw `expires_in` value, either a duration in seconds or a unix timestamp.
    #[must_use]
    pub fn with_expires_in(mut self, expires_in: i64) -> Self {
        self.expires_in = expires_in;
        self
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = refresh_token.into();
        self
    }

    /// Sets the granted scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Returns the token type, usually `Bearer`.
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Returns the access token value.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the raw `expires_in` field.
    pub fn expires_in(&self) -> i64 {
        self.expires_in
    }

    /// Returns the refresh token, if any.
    pub fn refresh_token(&self) -> Option<&str> {
        Some(self.refresh_token.as_str()).filter(|token| !token.is_empty())
    }

    /// Returns the granted scope, if any.
    pub fn scope(&self) -> Option<&str> {
        Some(self.scope.as_str()).filter(|scope| !scope.is_empty())
    }

    /// Returns the absolute expiry as a unix timestamp, relative to `now`.
    ///
    /// The result depends on `now` whenever `expires_in` is a duration,
    /// so it must be recomputed rather than cached.
    pub fn expires_at(&self, now: i64) -> i64 {
        if self.expires_in < TIMESTAMP_THRESHOLD {
            now.saturating_add(self.expires_in)
        } else {
            self.expires_in
        }
    }

    /// Returns `true` if the token expired before `now`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at(now) < now
    }

    /// Rewrites a duration `expires_in` into the absolute timestamp it denotes at `now`.
    ///
    /// Tokens already carrying a timestamp are returned unchanged.
    #[must_use]
    pub fn anchored_at(mut self, now: i64) -> Self {
        self.expires_in = self.expires_at(now);
        self
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token_type", &self.token_type)
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field(
                "refresh_token",
                &self.refresh_token().map(|_| "[REDACTED]"),
            )
            .field("scope", &self.scope)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[rstest]
    #[case::zero(0)]
    #[case::one_hour(3600)]
    #[case::negative(-10)]
    #[case::just_below(TIMESTAMP_THRESHOLD - 1)]
    fn should_treat_small_values_as_duration(#[case] expires_in: i64) {
        let token = AccessToken::new("token").with_expires_in(expires_in);
        assert_eq!(token.expires_at(NOW), NOW + expires_in);
    }

    #[rstest]
    #[case::threshold(TIMESTAMP_THRESHOLD)]
    #[case::past(1_600_000_000)]
    #[case::future(2_000_000_000)]
    fn should_treat_large_values_as_timestamp(#[case] expires_in: i64) {
        let token = AccessToken::new("token").with_expires_in(expires_in);
        assert_eq!(token.expires_at(NOW), expires_in);
    }

    #[test]
    fn should_derive_expiry_on_demand() {
        let token = AccessToken::new("token").with_expires_in(60);
        assert_ne!(token.expires_at(NOW), token.expires_at(NOW + 1));
    }

    #[test]
    fn should_detect_expired_timestamp() {
        let token = AccessToken::new("token").with_expires_in(NOW - 1);
        assert!(token.is_expired_at(NOW));

        let token = AccessToken::new("token").with_expires_in(NOW);
        assert!(!token.is_expired_at(NOW));
    }

    #[test]
    fn should_anchor_duration_to_timestamp() {
        let token = AccessToken::new("token").with_expires_in(3600).anchored_at(NOW);
        assert_eq!(token.expires_in(), NOW + 3600);
        assert_eq!(token.expires_at(NOW + 100), NOW + 3600);

        let token = AccessToken::new("token")
            .with_expires_in(2_000_000_000)
            .anchored_at(NOW);
        assert_eq!(token.expires_in(), 2_000_000_000);
    }

    #[test]
    fn should_decode_partial_token_response() {
        let token: AccessToken =
            serde_json::from_str(r#"{"access_token":"abc","expires_in":3600}"#)
                .expect("valid token document");

        assert_eq!(token.access_token(), "abc");
        assert_eq!(token.expires_in(), 3600);
        assert_eq!(token.token_type(), "");
        assert!(token.refresh_token().is_none());
        assert!(token.scope().is_none());
    }

    #[test]
    fn should_decode_null_fields_as_empty() {
        let token: AccessToken = serde_json::from_str(
            r#"{"access_token":"abc","token_type":null,"expires_in":null,"refresh_token":null,"scope":null}"#,
        )
        .expect("null fields are accepted");

        assert_eq!(token.access_token(), "abc");
        assert_eq!(token.token_type(), "");
        assert_eq!(token.expires_in(), 0);
        assert!(token.refresh_token().is_none());
        assert!(token.scope().is_none());
    }

    #[test]
    fn should_round_trip_through_json() {
        let token = AccessToken::new("abc")
            .with_expires_in(1_700_003_600)
            .with_refresh_token("def");

        let json = serde_json::to_string(&token).expect("serializable token");
        let decoded: AccessToken = serde_json::from_str(&json).expect("valid token document");
        assert_eq!(decoded, token);
    }

    #[test]
    fn should_serialize_wire_field_names() {
        let token = AccessToken::new("abc")
            .with_expires_in(3600)
            .with_refresh_token("def")
            .with_scope("read");

        let json = serde_json::to_value(&token).expect("serializable token");
        assert_eq!(
            json,
            serde_json::json!({
                "token_type": "Bearer",
                "access_token": "abc",
                "expires_in": 3600,
                "refresh_token": "def",
                "scope": "read",
            })
        );
    }

    #[test]
    fn should_redact_debug_output() {
        let token = AccessToken::new("secret-token").with_refresh_token("secret-refresh");
        let debug_str = format!("{token:?}");
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("secret-token"));
        assert!(!debug_str.contains("secret-refresh"));
    }
}
