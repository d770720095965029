//! Authentication for the notebook store admin panel.
//!
//! Provides admin accounts with argon2-hashed passwords, bearer token
//! issuance and resolution, and role checks.

mod account;
mod authenticator;
mod error;
mod password;
mod token;

pub use account::{AdminAccount, AdminProfile, NewAdmin, Role};
pub use authenticator::{extract_bearer, Authenticator, LoginOutcome, ACCOUNTS_STORAGE_KEY};
pub use error::AuthError;
pub use password::{PasswordHasher, MIN_PASSWORD_LEN};
pub use token::{AuthToken, TokenType, DEFAULT_TOKEN_TTL_SECS};
