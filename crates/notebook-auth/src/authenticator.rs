//! The auth gate: admin login, bearer-token resolution and account
//! management.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use notebook_cache::Cache;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::account::{AdminAccount, AdminProfile, NewAdmin, Role};
use crate::password::PasswordHasher;
use crate::token::{AuthToken, TokenType, DEFAULT_TOKEN_TTL_SECS};
use crate::AuthError;

/// Storage key of the persisted admin accounts.
pub const ACCOUNTS_STORAGE_KEY: &str = "auth:admins";

/// Successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub token: String,
    pub expires_at: i64,
    pub admin: AdminProfile,
}

/// Resolves credentials and bearer tokens to admin accounts.
///
/// Accounts live in memory and are written through to the cache; tokens are
/// stored only in the cache under `token:api_access:<token>`.
pub struct Authenticator {
    accounts: RwLock<Vec<AdminAccount>>,
    cache: Cache,
    hasher: PasswordHasher,
    token_ttl_secs: i64,
}

impl Authenticator {
    /// Load accounts persisted in `cache`.
    pub fn open(cache: Cache, token_ttl_secs: i64) -> Result<Self, AuthError> {
        let accounts: Vec<AdminAccount> = cache.get(ACCOUNTS_STORAGE_KEY)?.unwrap_or_default();
        debug!(accounts = accounts.len(), "Loaded admin accounts");

        Ok(Self {
            accounts: RwLock::new(accounts),
            cache,
            hasher: PasswordHasher::new(),
            token_ttl_secs: token_ttl_secs.max(1),
        })
    }

    /// An authenticator with no persistence beyond this process.
    pub fn in_memory() -> Self {
        Self {
            accounts: RwLock::new(Vec::new()),
            cache: Cache::memory(),
            hasher: PasswordHasher::new(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
        }
    }

    /// Lifetime of newly issued tokens.
    pub fn token_ttl_secs(&self) -> i64 {
        self.token_ttl_secs
    }

    /// Create a super admin from configuration when none exists yet.
    ///
    /// Returns the new profile, or `None` if a super admin was already there.
    pub fn ensure_bootstrap_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<AdminProfile>, AuthError> {
        if self
            .read_accounts()?
            .iter()
            .any(|a| a.role == Role::SuperAdmin)
        {
            return Ok(None);
        }

        let profile = self.create_account(NewAdmin {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: Role::SuperAdmin,
        })?;
        info!(username = %profile.username, "Created bootstrap super admin");
        Ok(Some(profile))
    }

    /// Check credentials and issue a token.
    ///
    /// `identifier` may be the username or the email. Unknown users, wrong
    /// passwords and inactive accounts are all `InvalidCredentials`.
    pub fn login(&self, identifier: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(AuthError::MissingField("username"));
        }
        if password.is_empty() {
            return Err(AuthError::MissingField("password"));
        }

        // Argon2 verification is slow; run it with no lock on the table.
        let (account_id, password_hash) = {
            let accounts = self.read_accounts()?;
            let Some(account) = accounts
                .iter()
                .find(|a| a.is_active && a.matches_login(identifier))
            else {
                debug!(identifier, "Login for unknown or inactive account");
                return Err(AuthError::InvalidCredentials);
            };
            (account.id.clone(), account.password_hash.clone())
        };

        if !self.hasher.verify(password, &password_hash)? {
            debug!(identifier, "Login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let admin = {
            let mut accounts = self.write_accounts()?;
            // Deactivated while the password was being checked.
            let account = accounts
                .iter_mut()
                .find(|a| a.id == account_id && a.is_active)
                .ok_or(AuthError::InvalidCredentials)?;
            account.touch_login();
            let admin = account.profile();
            self.cache.set(ACCOUNTS_STORAGE_KEY, &*accounts)?;
            admin
        };

        let token =
            AuthToken::generate_with_expiry(TokenType::ApiAccess, admin.id.clone(), self.token_ttl_secs);
        self.cache.set(&token.cache_key(), &token)?;
        info!(username = %admin.username, "Admin logged in");

        Ok(LoginOutcome {
            token: token.token,
            expires_at: token.expires_at,
            admin,
        })
    }

    /// Resolve a bearer token to an active admin.
    pub fn authenticate(&self, token: &str) -> Result<AdminProfile, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let key = AuthToken::cache_key_for(TokenType::ApiAccess, token);
        let stored: AuthToken = self.cache.get(&key)?.ok_or(AuthError::InvalidToken)?;

        if let Err(e) = stored.validate() {
            self.cache.delete(&key)?;
            return Err(e);
        }

        self.read_accounts()?
            .iter()
            .find(|a| a.id == stored.admin_id && a.is_active)
            .map(AdminAccount::profile)
            .ok_or(AuthError::InvalidToken)
    }

    /// Revoke `token`. Unknown tokens are ignored.
    pub fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.cache
            .delete(&AuthToken::cache_key_for(TokenType::ApiAccess, token))?;
        Ok(())
    }

    /// Create a new admin on behalf of `actor`, who must be a super admin.
    pub fn register(&self, actor: &AdminProfile, request: NewAdmin) -> Result<AdminProfile, AuthError> {
        if !actor.has_permission(Role::SuperAdmin) {
            warn!(username = %actor.username, "Admin without super admin role tried to register an account");
            return Err(AuthError::InsufficientPermissions);
        }

        let profile = self.create_account(request)?;
        info!(username = %profile.username, created_by = %actor.username, "Registered admin");
        Ok(profile)
    }

    /// Profile of the account with `username`.
    pub fn find_by_username(&self, username: &str) -> Result<Option<AdminProfile>, AuthError> {
        Ok(self
            .read_accounts()?
            .iter()
            .find(|a| a.username == username)
            .map(AdminAccount::profile))
    }

    /// Delete stored tokens that have expired. Returns how many were removed.
    pub fn purge_expired_tokens(&self) -> Result<usize, AuthError> {
        let prefix = format!("token:{}:", TokenType::ApiAccess.as_str());
        let mut purged = 0;
        for key in self.cache.keys_with_prefix(&prefix)? {
            let expired = match self.cache.get::<AuthToken>(&key) {
                Ok(Some(token)) => token.is_expired(),
                Ok(None) => false,
                Err(_) => true,
            };
            if expired {
                self.cache.delete(&key)?;
                purged += 1;
            }
        }
        Ok(purged)
    }

    fn create_account(&self, request: NewAdmin) -> Result<AdminProfile, AuthError> {
        request.validate()?;
        PasswordHasher::validate_password(&request.password)?;

        let username = request.username.trim().to_string();
        let email = request.email.trim().to_lowercase();

        let taken = |accounts: &[AdminAccount]| {
            accounts
                .iter()
                .any(|a| a.username == username || a.email.eq_ignore_ascii_case(&email))
        };
        if taken(&self.read_accounts()?) {
            return Err(AuthError::UserAlreadyExists(username.clone()));
        }

        let hash = self.hasher.hash(&request.password)?;

        let mut accounts = self.write_accounts()?;
        if taken(&accounts) {
            return Err(AuthError::UserAlreadyExists(username.clone()));
        }
        let account = AdminAccount::new(username, email, hash, request.role);
        let profile = account.profile();
        accounts.push(account);

        if let Err(e) = self.cache.set(ACCOUNTS_STORAGE_KEY, &*accounts) {
            accounts.pop();
            return Err(e.into());
        }
        Ok(profile)
    }

    fn read_accounts(&self) -> Result<RwLockReadGuard<'_, Vec<AdminAccount>>, AuthError> {
        self.accounts
            .read()
            .map_err(|_| AuthError::Internal("account table lock poisoned".to_string()))
    }

    fn write_accounts(&self) -> Result<RwLockWriteGuard<'_, Vec<AdminAccount>>, AuthError> {
        self.accounts
            .write()
            .map_err(|_| AuthError::Internal("account table lock poisoned".to_string()))
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .finish_non_exhaustive()
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn extract_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSWORD: &str = "admin123";

    fn with_root() -> Authenticator {
        let auth = Authenticator::in_memory();
        auth.ensure_bootstrap_admin("admin", "admin@notebook.store", PASSWORD)
            .unwrap();
        auth
    }

    #[test]
    fn test_bootstrap_once() {
        let auth = with_root();
        let again = auth
            .ensure_bootstrap_admin("other", "other@notebook.store", PASSWORD)
            .unwrap();
        assert!(again.is_none());
        assert!(auth.find_by_username("other").unwrap().is_none());
    }

    #[test]
    fn test_login_by_username_or_email() {
        let auth = with_root();
        let outcome = auth.login("admin", PASSWORD).unwrap();
        assert_eq!(outcome.admin.role, Role::SuperAdmin);
        assert!(outcome.admin.last_login.is_some());

        assert!(auth.login("admin@notebook.store", PASSWORD).is_ok());
    }

    #[test]
    fn test_login_failures() {
        let auth = with_root();
        assert!(matches!(
            auth.login("admin", "wrong-password"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("ghost", PASSWORD),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(auth.login("", PASSWORD), Err(AuthError::MissingField(_))));
    }

    #[test]
    fn test_authenticate_and_logout() {
        let auth = with_root();
        let outcome = auth.login("admin", PASSWORD).unwrap();

        let profile = auth.authenticate(&outcome.token).unwrap();
        assert_eq!(profile.username, "admin");

        auth.logout(&outcome.token).unwrap();
        assert!(matches!(
            auth.authenticate(&outcome.token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_unknown_and_missing_token() {
        let auth = with_root();
        assert!(matches!(auth.authenticate(""), Err(AuthError::MissingToken)));
        assert!(matches!(
            auth.authenticate("made-up"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_is_rejected_and_removed() {
        let auth = with_root();
        let admin = auth.find_by_username("admin").unwrap().unwrap();
        let token = AuthToken::generate_with_expiry(TokenType::ApiAccess, admin.id, -1);
        auth.cache.set(&token.cache_key(), &token).unwrap();

        assert!(matches!(
            auth.authenticate(&token.token),
            Err(AuthError::TokenExpired)
        ));
        assert!(!auth.cache.exists(&token.cache_key()).unwrap());
    }

    #[test]
    fn test_inactive_account_loses_access() {
        let auth = with_root();
        let outcome = auth.login("admin", PASSWORD).unwrap();
        for account in auth.accounts.write().unwrap().iter_mut() {
            account.is_active = false;
        }

        assert!(auth.authenticate(&outcome.token).is_err());
        assert!(matches!(
            auth.login("admin", PASSWORD),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_password_check_needs_only_shared_access() {
        use std::sync::{mpsc, Arc};
        use std::time::Duration;

        let auth = Arc::new(with_root());
        let outcome = auth.login("admin", PASSWORD).unwrap();
        let reader = auth.accounts.read().unwrap();

        let (tx, rx) = mpsc::channel();
        let worker = Arc::clone(&auth);
        std::thread::spawn(move || {
            let wrong = worker.login("admin", "wrong-password");
            let resolved = worker.authenticate(&outcome.token);
            let _ = tx.send((wrong, resolved));
        });

        let (wrong, resolved) = rx
            .recv_timeout(Duration::from_secs(30))
            .expect("login blocked on the account table");
        drop(reader);

        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
        assert_eq!(resolved.unwrap().username, "admin");
    }

    #[test]
    fn test_login_persists_last_login() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        let first = {
            let auth = Authenticator::open(Cache::open_file(&path).unwrap(), 60).unwrap();
            auth.ensure_bootstrap_admin("admin", "admin@notebook.store", PASSWORD)
                .unwrap();
            auth.login("admin", PASSWORD).unwrap().admin.last_login
        };

        let auth = Authenticator::open(Cache::open_file(&path).unwrap(), 60).unwrap();
        let stored = auth.find_by_username("admin").unwrap().unwrap();
        assert!(first.is_some());
        assert_eq!(stored.last_login, first);
    }

    #[test]
    fn test_register_requires_super_admin() {
        let auth = with_root();
        let root = auth.login("admin", PASSWORD).unwrap().admin;

        let editor = auth
            .register(
                &root,
                NewAdmin {
                    username: "editor".to_string(),
                    email: "editor@notebook.store".to_string(),
                    password: "editor123".to_string(),
                    role: Role::Admin,
                },
            )
            .unwrap();
        assert_eq!(editor.role, Role::Admin);

        let denied = auth.register(
            &editor,
            NewAdmin {
                username: "intern".to_string(),
                email: "intern@notebook.store".to_string(),
                password: "intern123".to_string(),
                role: Role::Admin,
            },
        );
        assert!(matches!(denied, Err(AuthError::InsufficientPermissions)));
    }

    #[test]
    fn test_register_rejects_duplicates_and_weak_passwords() {
        let auth = with_root();
        let root = auth.login("admin", PASSWORD).unwrap().admin;

        let dup = auth.register(
            &root,
            NewAdmin {
                username: "someone".to_string(),
                email: "ADMIN@notebook.store".to_string(),
                password: "password123".to_string(),
                role: Role::Admin,
            },
        );
        assert!(matches!(dup, Err(AuthError::UserAlreadyExists(_))));

        let weak = auth.register(
            &root,
            NewAdmin {
                username: "weak".to_string(),
                email: "weak@notebook.store".to_string(),
                password: "123".to_string(),
                role: Role::Admin,
            },
        );
        assert!(matches!(weak, Err(AuthError::WeakPassword(_))));
    }

    #[test]
    fn test_accounts_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        {
            let auth = Authenticator::open(Cache::open_file(&path).unwrap(), 60).unwrap();
            auth.ensure_bootstrap_admin("admin", "admin@notebook.store", PASSWORD)
                .unwrap();
        }

        let auth = Authenticator::open(Cache::open_file(&path).unwrap(), 60).unwrap();
        let outcome = auth.login("admin", PASSWORD).unwrap();
        assert!(outcome.expires_at - outcome.admin.last_login.unwrap() <= 60);
    }

    #[test]
    fn test_purge_expired_tokens() {
        let auth = with_root();
        let admin = auth.find_by_username("admin").unwrap().unwrap();
        let stale = AuthToken::generate_with_expiry(TokenType::ApiAccess, admin.id.clone(), -10);
        auth.cache.set(&stale.cache_key(), &stale).unwrap();
        let live = auth.login("admin", PASSWORD).unwrap();

        assert_eq!(auth.purge_expired_tokens().unwrap(), 1);
        assert!(auth.authenticate(&live.token).is_ok());
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer("bearer   abc123 "), Some("abc123"));
        assert_eq!(extract_bearer("Basic abc123"), None);
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("abc123"), None);
    }
}
