//! Access tokens and their validity math.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Window before expiry in which a token is considered stale.
pub const DEFAULT_REFRESH_BUFFER: Duration = Duration::from_secs(5 * 60);

/// Minimum remaining lifetime for a token to be handed out at all.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);

// ============================================================================
// Access Token
// ============================================================================

/// A bearer token as returned by a credential source.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    /// The secret token value.
    pub token: String,
    /// Token type, always `Bearer` for the sources in this workspace.
    pub token_type: String,
    /// Absolute expiry. `None` means the token never expires (e.g. an API key).
    pub expiry_time: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Creates a bearer token with the given expiry.
    pub fn bearer(token: impl Into<String>, expiry_time: Option<DateTime<Utc>>) -> Self {
        Self {
            token: token.into(),
            token_type: "Bearer".to_string(),
            expiry_time,
        }
    }

    /// Creates a bearer token that never expires.
    pub fn non_expiring(token: impl Into<String>) -> Self {
        Self::bearer(token, None)
    }

    /// Creates a bearer token expiring `lifetime` from now.
    pub fn expiring_in(token: impl Into<String>, lifetime: chrono::Duration) -> Self {
        Self::bearer(token, Some(Utc::now() + lifetime))
    }

    /// Value for an `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.token)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expiry_time", &self.expiry_time)
            .finish()
    }
}

// ============================================================================
// Cached Token
// ============================================================================

/// An immutable cached token with refresh-ahead and grace-period math.
#[derive(Debug, Clone)]
pub struct CachedToken {
    token: AccessToken,
    refresh_buffer: Duration,
    grace_period: Duration,
}

impl CachedToken {
    /// Wraps a token using the default refresh buffer and grace period.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_CREDENTIALS` if the token has already expired.
    pub fn new(token: AccessToken) -> Result<Self, AuthError> {
        Self::with_windows(token, DEFAULT_REFRESH_BUFFER, DEFAULT_GRACE_PERIOD)
    }

    /// Wraps a token with explicit refresh buffer and grace period.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_CREDENTIALS` if the token has already expired.
    pub fn with_windows(
        token: AccessToken,
        refresh_buffer: Duration,
        grace_period: Duration,
    ) -> Result<Self, AuthError> {
        if let Some(expiry) = token.expiry_time {
            if expiry <= Utc::now() {
                return Err(AuthError::invalid_credentials(format!(
                    "Cannot cache a token that expired at {}",
                    expiry.to_rfc3339()
                )));
            }
        }

        Ok(Self {
            token,
            refresh_buffer,
            grace_period,
        })
    }

    /// The wrapped token.
    pub fn token(&self) -> &AccessToken {
        &self.token
    }

    /// Absolute expiry, if the token expires.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.token.expiry_time
    }

    /// Remaining lifetime at `now`. `None` for non-expiring tokens.
    pub fn time_until_expiry_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.token
            .expiry_time
            .map(|expiry| (expiry - now).to_std().unwrap_or(Duration::ZERO))
    }

    /// Remaining lifetime right now.
    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.time_until_expiry_at(Utc::now())
    }

    /// True if the token may be handed to a caller at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.time_until_expiry_at(now)
            .is_none_or(|remaining| remaining >= self.grace_period)
    }

    /// True if the token may be handed to a caller right now.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// True if the token is inside the refresh-ahead window at `now`.
    pub fn needs_refresh_at(&self, now: DateTime<Utc>) -> bool {
        self.time_until_expiry_at(now)
            .is_some_and(|remaining| remaining < self.refresh_buffer)
    }

    /// True if the token is inside the refresh-ahead window right now.
    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh_at(Utc::now())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthErrorCode;

    #[test]
    fn test_non_expiring_always_valid() {
        let cached = CachedToken::new(AccessToken::non_expiring("key")).unwrap();
        let far_future = Utc::now() + chrono::Duration::days(3650);
        assert!(cached.is_valid_at(far_future));
        assert!(!cached.needs_refresh_at(far_future));
        assert!(cached.time_until_expiry().is_none());
    }

    #[test]
    fn test_past_expiry_rejected() {
        let token = AccessToken::expiring_in("t", chrono::Duration::seconds(-1));
        let err = CachedToken::new(token).unwrap_err();
        assert_eq!(err.code, AuthErrorCode::InvalidCredentials);
    }

    #[test]
    fn test_windows() {
        let now = Utc::now();
        let cached =
            CachedToken::new(AccessToken::bearer("t", Some(now + chrono::Duration::minutes(10))))
                .unwrap();

        assert!(cached.is_valid_at(now));
        assert!(!cached.needs_refresh_at(now));

        // Six minutes later: stale but still usable.
        let stale = now + chrono::Duration::minutes(6);
        assert!(cached.is_valid_at(stale));
        assert!(cached.needs_refresh_at(stale));

        // Twenty seconds before expiry: inside the grace floor.
        let floor = now + chrono::Duration::seconds(580);
        assert!(!cached.is_valid_at(floor));
        assert!(cached.needs_refresh_at(floor));
    }

    #[test]
    fn test_time_until_expiry_saturates() {
        let now = Utc::now();
        let cached =
            CachedToken::new(AccessToken::bearer("t", Some(now + chrono::Duration::minutes(1))))
                .unwrap();
        let later = now + chrono::Duration::minutes(2);
        assert_eq!(cached.time_until_expiry_at(later), Some(Duration::ZERO));
    }

    #[test]
    fn test_debug_redacts_token() {
        let token = AccessToken::non_expiring("ya29.secret");
        let debug = format!("{token:?}");
        assert!(!debug.contains("ya29.secret"));
        assert_eq!(token.authorization_header(), "Bearer ya29.secret");
    }
}
