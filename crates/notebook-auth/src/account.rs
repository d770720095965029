//! Admin accounts.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::token::current_timestamp;
use crate::AuthError;
use notebook_commerce::ids::AdminId;

/// Admin role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Store administrator.
    #[default]
    Admin,
    /// Can also manage other admin accounts.
    SuperAdmin,
}

impl Role {
    /// Get role as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Check if this role has at least the given permission level.
    pub fn has_permission(&self, required: Role) -> bool {
        self.level() >= required.level()
    }

    /// Get permission level (higher = more permissions).
    pub fn level(&self) -> u8 {
        match self {
            Role::Admin => 1,
            Role::SuperAdmin => 2,
        }
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "super_admin" => Ok(Role::SuperAdmin),
            other => Err(AuthError::InvalidAccount(format!("unknown role: {other}"))),
        }
    }
}

/// A stored admin account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminAccount {
    pub id: AdminId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub last_login: Option<i64>,
    pub created_at: i64,
}

impl AdminAccount {
    /// Create an active account with a pre-hashed password.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: AdminId::generate(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            role,
            is_active: true,
            last_login: None,
            created_at: current_timestamp(),
        }
    }

    /// Whether `identifier` is this account's username or email.
    pub fn matches_login(&self, identifier: &str) -> bool {
        self.username == identifier || self.email.eq_ignore_ascii_case(identifier)
    }

    /// Record a successful login.
    pub fn touch_login(&mut self) {
        self.last_login = Some(current_timestamp());
    }

    /// The public view of this account.
    pub fn profile(&self) -> AdminProfile {
        AdminProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            last_login: self.last_login,
            created_at: self.created_at,
        }
    }
}

/// Account data safe to return to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    pub id: AdminId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub last_login: Option<i64>,
    pub created_at: i64,
}

impl AdminProfile {
    /// Check if this admin has at least the given role.
    pub fn has_permission(&self, required: Role) -> bool {
        self.role.has_permission(required)
    }
}

/// Request to create a new admin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl NewAdmin {
    /// Check required fields and their shape.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.username.trim().is_empty() {
            return Err(AuthError::MissingField("username"));
        }
        if self.email.trim().is_empty() {
            return Err(AuthError::MissingField("email"));
        }
        if self.password.is_empty() {
            return Err(AuthError::MissingField("password"));
        }
        if !self.email.contains('@') {
            return Err(AuthError::InvalidAccount(format!(
                "invalid email: {}",
                self.email
            )));
        }
        Ok(())
    }
}
