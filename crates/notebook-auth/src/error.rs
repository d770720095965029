//! Authentication errors.

use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Invalid credentials provided.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A required field was empty.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Username or email already taken.
    #[error("user already exists: {0}")]
    UserAlreadyExists(String),

    /// No bearer token on the request.
    #[error("access token required")]
    MissingToken,

    /// Token unknown, revoked, or its account is gone.
    #[error("token invalid or expired")]
    InvalidToken,

    /// Token expired.
    #[error("token expired")]
    TokenExpired,

    /// Password too weak.
    #[error("password too weak: {0}")]
    WeakPassword(String),

    /// Malformed account data.
    #[error("invalid account: {0}")]
    InvalidAccount(String),

    /// Insufficient permissions.
    #[error("insufficient permissions")]
    InsufficientPermissions,

    /// Cache error.
    #[error("cache error: {0}")]
    Cache(#[from] notebook_cache::CacheError),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Check if this is an authentication failure.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::MissingToken
                | AuthError::InvalidToken
                | AuthError::TokenExpired
        )
    }

    /// Check if this is a permission error.
    pub fn is_permission_error(&self) -> bool {
        matches!(self, AuthError::InsufficientPermissions)
    }

    /// Check if the caller sent bad input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AuthError::MissingField(_)
                | AuthError::UserAlreadyExists(_)
                | AuthError::WeakPassword(_)
                | AuthError::InvalidAccount(_)
        )
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(e: argon2::password_hash::Error) -> Self {
        AuthError::Internal(format!("password hash: {e}"))
    }
}
