// Vehicle Parts Tracker - Auth Gate
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Username/password check against the users collection, one active identity
// per AuthGate, and a static role → permission table. The persisted session
// token is re-validated against the stored user on startup.

use crate::config::{AdminSeed, InventoryConfig};
use crate::error::StoreResult;
use crate::models::{Role, User};
use crate::session::SessionToken;
use crate::storage::SessionStorage;
use crate::store::InventoryStore;
use anyhow::Result;
use chrono::{Duration, Utc};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Read,
    Write,
    Delete,
    Export,
    Import,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::Delete => "delete",
            Permission::Export => "export",
            Permission::Import => "import",
        }
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Permission::Read),
            "write" => Ok(Permission::Write),
            "delete" => Ok(Permission::Delete),
            "export" => Ok(Permission::Export),
            "import" => Ok(Permission::Import),
            other => Err(format!("unknown permission '{}'", other)),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission set for a role
pub fn permissions_for(role: Role) -> &'static [Permission] {
    use Permission::*;
    match role {
        Role::Admin => &[Read, Write, Delete, Export, Import],
        Role::User => &[Read, Write],
        Role::Viewer => &[Read],
    }
}

/// Active identity plus what is needed to check and persist it
pub struct AuthGate<'a> {
    store: &'a InventoryStore,
    sessions: SessionStorage,
    secret: String,
    ttl: Duration,
    current: Option<User>,
}

impl<'a> AuthGate<'a> {
    /// Ensure the default admin exists, then restore a persisted session if it
    /// still checks out.
    pub fn start(store: &'a InventoryStore, sessions: SessionStorage, config: &InventoryConfig) -> Result<Self> {
        let secret = sessions.install_secret()?;
        let mut gate = Self {
            store,
            sessions,
            secret,
            ttl: config.session_ttl(),
            current: None,
        };
        if let Err(e) = gate.ensure_default_admin(&config.default_admin) {
            log::error!("auth: default admin bootstrap failed: {}", e);
        }
        gate.restore();
        Ok(gate)
    }

    /// Insert the admin account unless its id or its username is already
    /// taken. Returns true if it was created.
    pub fn ensure_default_admin(&self, seed: &AdminSeed) -> StoreResult<bool> {
        if let Some(existing) = self.store.get_user_by_id(&seed.id)? {
            log::debug!("auth: admin id '{}' already held by '{}'", seed.id, existing.username);
            return Ok(false);
        }
        if self.store.get_user(&seed.username)?.is_some() {
            log::debug!("auth: admin '{}' already present", seed.username);
            return Ok(false);
        }

        let mut admin = User::new(&seed.id, &seed.username, &seed.password, Role::Admin);
        admin.name = seed.name.clone();
        admin.email = seed.email.clone();
        self.store.add_user(&admin)?;
        log::info!("auth: default admin '{}' created", seed.username);
        Ok(true)
    }

    /// Adopt the persisted token only if it verifies against the stored user.
    /// A rejected or unreadable token is discarded.
    fn restore(&mut self) {
        let token = match self.sessions.load_session() {
            Ok(Some(token)) => token,
            Ok(None) => return,
            Err(e) => {
                log::warn!("auth: unreadable session discarded: {}", e);
                self.discard_session();
                return;
            }
        };

        match self.store.get_user(&token.username) {
            Ok(Some(user)) => match token.verify(&user, &self.secret, Utc::now()) {
                Ok(()) => {
                    log::info!("auth: session restored for '{}'", user.username);
                    self.current = Some(user);
                }
                Err(reason) => {
                    log::warn!("auth: session for '{}' rejected: {:?}", token.username, reason);
                    self.discard_session();
                }
            },
            Ok(None) => {
                log::warn!("auth: session names unknown user '{}'", token.username);
                self.discard_session();
            }
            Err(e) => log::error!("auth: session lookup failed: {}", e),
        }
    }

    /// True iff `username` exists and `password` matches exactly. Every
    /// failure mode, including storage errors, comes back as false.
    pub fn login(&mut self, username: &str, password: &str) -> bool {
        let user = match self.store.get_user(username) {
            Ok(Some(user)) if user.password == password => user,
            Ok(_) => {
                log::warn!("auth: login failed for '{}'", username);
                return false;
            }
            Err(e) => {
                log::error!("auth: login lookup for '{}' failed: {}", username, e);
                return false;
            }
        };

        let token = SessionToken::issue(&user, &self.secret, self.ttl);
        if let Err(e) = self.sessions.save_session(&token) {
            log::error!("auth: could not persist session for '{}': {}", username, e);
            return false;
        }

        log::info!("auth: '{}' logged in as {}", user.username, user.role);
        self.current = Some(user);
        true
    }

    /// Clear the identity and the persisted session. Never fails.
    pub fn logout(&mut self) {
        if let Some(user) = self.current.take() {
            log::info!("auth: '{}' logged out", user.username);
        }
        self.discard_session();
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        match &self.current {
            Some(user) => permissions_for(user.role).contains(&permission),
            None => false,
        }
    }

    /// String form of has_permission. Unknown action names are never granted.
    pub fn allows(&self, action: &str) -> bool {
        action.parse::<Permission>().map(|p| self.has_permission(p)).unwrap_or(false)
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current.as_ref()
    }

    fn discard_session(&self) {
        if let Err(e) = self.sessions.clear_session() {
            log::error!("auth: could not clear session: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _dir: TempDir,
        config: InventoryConfig,
    }

    impl Fixture {
        fn new() -> Result<Self> {
            let dir = tempdir()?;
            let config = InventoryConfig::with_data_dir(dir.path());
            Ok(Self { _dir: dir, config })
        }

        fn store(&self) -> Result<InventoryStore> {
            Ok(InventoryStore::open(&self.config.inventory_path(), 10 * 1024 * 1024)?)
        }

        fn sessions(&self) -> Result<SessionStorage> {
            SessionStorage::open(&self.config.session_path())
        }
    }

    #[test]
    fn permission_table() {
        assert_eq!(permissions_for(Role::Admin).len(), 5);
        assert_eq!(permissions_for(Role::User), &[Permission::Read, Permission::Write]);
        assert_eq!(permissions_for(Role::Viewer), &[Permission::Read]);
        assert!("purge".parse::<Permission>().is_err());
    }

    #[test]
    fn default_admin_can_log_in_after_start() -> Result<()> {
        let fx = Fixture::new()?;
        let store = fx.store()?;
        let mut gate = AuthGate::start(&store, fx.sessions()?, &fx.config)?;

        assert!(gate.current_user().is_none());
        assert!(gate.login("admin", "admin123"));
        let user = gate.current_user().map(|u| (u.username.clone(), u.role));
        assert_eq!(user, Some(("admin".to_string(), Role::Admin)));
        Ok(())
    }

    #[test]
    fn bad_credentials_return_false() -> Result<()> {
        let fx = Fixture::new()?;
        let store = fx.store()?;
        let mut gate = AuthGate::start(&store, fx.sessions()?, &fx.config)?;

        assert!(!gate.login("admin", "wrong"));
        assert!(!gate.login("nouser", "x"));
        assert!(gate.current_user().is_none());
        Ok(())
    }

    #[test]
    fn ensure_default_admin_is_idempotent() -> Result<()> {
        let fx = Fixture::new()?;
        let store = fx.store()?;
        let gate = AuthGate::start(&store, fx.sessions()?, &fx.config)?;

        assert!(!gate.ensure_default_admin(&fx.config.default_admin)?);
        assert_eq!(store.users_by_role(Role::Admin)?.len(), 1);
        Ok(())
    }

    #[test]
    fn renamed_admin_does_not_block_restart() -> Result<()> {
        let fx = Fixture::new()?;
        let store = fx.store()?;
        AuthGate::start(&store, fx.sessions()?, &fx.config)?;

        let mut admin = store.get_user_by_id("admin")?.expect("admin seeded");
        admin.username = "boss".to_string();
        store.update_user(&admin)?;

        let mut gate = AuthGate::start(&store, fx.sessions()?, &fx.config)?;
        assert!(store.get_user("admin")?.is_none());
        assert_eq!(store.get_all_users()?.len(), 1);
        assert!(gate.login("boss", "admin123"));
        assert!(gate.has_permission(Permission::Import));
        Ok(())
    }

    #[test]
    fn delete_only_for_admin() -> Result<()> {
        let fx = Fixture::new()?;
        let store = fx.store()?;
        store.add_user(&User::new("u1", "clerk", "pw", Role::User))?;
        store.add_user(&User::new("u2", "auditor", "pw", Role::Viewer))?;
        let mut gate = AuthGate::start(&store, fx.sessions()?, &fx.config)?;

        assert!(!gate.has_permission(Permission::Delete));
        assert!(!gate.has_permission(Permission::Read));

        assert!(gate.login("clerk", "pw"));
        assert!(gate.has_permission(Permission::Write));
        assert!(!gate.has_permission(Permission::Delete));

        assert!(gate.login("auditor", "pw"));
        assert!(gate.has_permission(Permission::Read));
        assert!(!gate.has_permission(Permission::Write));
        assert!(!gate.allows("delete"));

        assert!(gate.login("admin", "admin123"));
        assert!(gate.has_permission(Permission::Delete));
        assert!(gate.allows("import"));
        assert!(!gate.allows("launch_missiles"));
        Ok(())
    }

    #[test]
    fn logout_clears_identity_and_blob() -> Result<()> {
        let fx = Fixture::new()?;
        let store = fx.store()?;
        let mut gate = AuthGate::start(&store, fx.sessions()?, &fx.config)?;

        assert!(gate.login("admin", "admin123"));
        assert!(gate.sessions.load_session()?.is_some());
        gate.logout();
        assert!(gate.current_user().is_none());
        assert!(!gate.has_permission(Permission::Read));
        assert!(gate.sessions.load_session()?.is_none());

        // Logging out twice is fine
        gate.logout();
        Ok(())
    }

    #[test]
    fn session_survives_restart() -> Result<()> {
        let fx = Fixture::new()?;
        let store = fx.store()?;
        {
            let mut gate = AuthGate::start(&store, fx.sessions()?, &fx.config)?;
            assert!(gate.login("admin", "admin123"));
        }

        let gate = AuthGate::start(&store, fx.sessions()?, &fx.config)?;
        assert_eq!(gate.current_user().map(|u| u.id.as_str()), Some("admin"));
        assert!(gate.has_permission(Permission::Export));
        Ok(())
    }

    #[test]
    fn session_dropped_after_password_change() -> Result<()> {
        let fx = Fixture::new()?;
        let store = fx.store()?;
        {
            let mut gate = AuthGate::start(&store, fx.sessions()?, &fx.config)?;
            assert!(gate.login("admin", "admin123"));
        }

        let mut admin = store.get_user("admin")?.expect("admin exists");
        admin.password = "changed".to_string();
        store.update_user(&admin)?;

        let gate = AuthGate::start(&store, fx.sessions()?, &fx.config)?;
        assert!(gate.current_user().is_none());
        assert!(gate.sessions.load_session()?.is_none());
        Ok(())
    }

    #[test]
    fn expired_session_not_restored() -> Result<()> {
        let fx = Fixture::new()?;
        let store = fx.store()?;
        let mut config = fx.config.clone();
        config.session_ttl_hours = 0;
        {
            let mut gate = AuthGate::start(&store, fx.sessions()?, &config)?;
            assert!(gate.login("admin", "admin123"));
        }

        let gate = AuthGate::start(&store, fx.sessions()?, &fx.config)?;
        assert!(gate.current_user().is_none());
        Ok(())
    }

    #[test]
    fn forged_session_not_restored() -> Result<()> {
        let fx = Fixture::new()?;
        let store = fx.store()?;
        store.add_user(&User::new("u1", "clerk", "pw", Role::User))?;
        {
            let sessions = fx.sessions()?;
            let victim = store.get_user("admin")?.expect("admin exists");
            // Right claims, wrong key: an attacker without the install secret
            let forged = SessionToken::issue(&victim, "guessed-secret", Duration::hours(1));
            sessions.save_session(&forged)?;
        }

        let gate = AuthGate::start(&store, fx.sessions()?, &fx.config)?;
        assert!(gate.current_user().is_none());
        Ok(())
    }
}
