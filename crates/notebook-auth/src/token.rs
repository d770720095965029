//! Bearer tokens.

use crate::AuthError;
use notebook_commerce::ids::AdminId;
use serde::{Deserialize, Serialize};

/// Default bearer token lifetime: 24 hours.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Token type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Admin API access token.
    ApiAccess,
}

impl TokenType {
    /// Get token type as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::ApiAccess => "api_access",
        }
    }

    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "api_access" => Some(TokenType::ApiAccess),
            _ => None,
        }
    }

    /// Get default expiration time for this token type (in seconds).
    pub fn default_expiry_secs(&self) -> i64 {
        match self {
            TokenType::ApiAccess => DEFAULT_TOKEN_TTL_SECS,
        }
    }
}

/// An issued token, as stored server-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthToken {
    /// The token value.
    pub token: String,
    /// Token type.
    pub token_type: TokenType,
    /// Account this token belongs to.
    pub admin_id: AdminId,
    /// Unix timestamp when token was created.
    pub created_at: i64,
    /// Unix timestamp when token expires.
    pub expires_at: i64,
}

impl AuthToken {
    /// Generate a new token.
    pub fn generate(token_type: TokenType, admin_id: AdminId) -> Self {
        Self::generate_with_expiry(token_type, admin_id, token_type.default_expiry_secs())
    }

    /// Generate token with custom expiry.
    pub fn generate_with_expiry(token_type: TokenType, admin_id: AdminId, expiry_secs: i64) -> Self {
        let now = current_timestamp();
        Self {
            token: generate_token_string(),
            token_type,
            admin_id,
            created_at: now,
            expires_at: now.saturating_add(expiry_secs),
        }
    }

    /// Check if token is expired.
    pub fn is_expired(&self) -> bool {
        current_timestamp() >= self.expires_at
    }

    /// Validate the token.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.is_expired() {
            return Err(AuthError::TokenExpired);
        }
        Ok(())
    }

    /// Get time until expiration in seconds.
    pub fn time_to_expiry(&self) -> i64 {
        (self.expires_at - current_timestamp()).max(0)
    }

    /// Get cache key for this token.
    pub fn cache_key(&self) -> String {
        Self::cache_key_for(self.token_type, &self.token)
    }

    /// Get cache key by token string.
    pub fn cache_key_for(token_type: TokenType, token: &str) -> String {
        format!("token:{}:{}", token_type.as_str(), token)
    }
}

/// Generate a cryptographically secure token string.
fn generate_token_string() -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use rand::Rng;

    let bytes: [u8; 24] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Get current Unix timestamp.
pub(crate) fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
