// Vehicle Parts Tracker - Session LMDB
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Persists the single active session token to LMDB at <data_dir>/SESSION.DB.
// Also holds the per-install secret that session signatures are keyed on.
//
// The secret lives next to the token it signs. It rejects tokens written by
// hand or copied from another install, not a writer who can read this
// directory: protect SESSION.DB with file permissions.

use crate::session::SessionToken;
use anyhow::Result;
use heed::types::*;
use heed::{Database, Env, EnvOpenOptions};
use rand::Rng;
use std::path::Path;

/// LMDB storage for the session blob
pub struct SessionStorage {
    env: Env,
    /// String keys → JSON / hex values
    db: Database<Str, Str>,
}

const SESSION_KEY: &str = "current_session";
const SECRET_KEY: &str = "install_secret";
const MAX_DB_SIZE: usize = 1024 * 1024; // 1MB — one token and one secret

impl SessionStorage {
    /// Open or create LMDB at the given path
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(MAX_DB_SIZE)
                .max_dbs(2)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let db = env.create_database(&mut wtxn, Some("session"))?;
        wtxn.commit()?;

        log::info!("SESSION LMDB opened at {:?}", path);
        Ok(Self { env, db })
    }

    /// Save the active session token
    pub fn save_session(&self, token: &SessionToken) -> Result<()> {
        let json = serde_json::to_string(token)?;
        let mut wtxn = self.env.write_txn()?;
        self.db.put(&mut wtxn, SESSION_KEY, &json)?;
        wtxn.commit()?;
        Ok(())
    }

    /// Load the persisted session token, if any
    pub fn load_session(&self) -> Result<Option<SessionToken>> {
        let rtxn = self.env.read_txn()?;
        match self.db.get(&rtxn, SESSION_KEY)? {
            Some(json) => {
                let token: SessionToken = serde_json::from_str(json)?;
                Ok(Some(token))
            }
            None => Ok(None),
        }
    }

    /// Remove the persisted session. Returns whether one existed.
    pub fn clear_session(&self) -> Result<bool> {
        let mut wtxn = self.env.write_txn()?;
        let deleted = self.db.delete(&mut wtxn, SESSION_KEY)?;
        wtxn.commit()?;
        Ok(deleted)
    }

    /// Per-install signing secret, generated on first use
    pub fn install_secret(&self) -> Result<String> {
        let mut wtxn = self.env.write_txn()?;
        if let Some(secret) = self.db.get(&wtxn, SECRET_KEY)? {
            return Ok(secret.to_string());
        }

        let bytes: [u8; 32] = rand::thread_rng().gen();
        let secret = hex::encode(bytes);

        self.db.put(&mut wtxn, SECRET_KEY, &secret)?;
        wtxn.commit()?;
        log::info!("SESSION install secret generated");
        Ok(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, User};
    use chrono::Duration;
    use tempfile::tempdir;

    #[test]
    fn save_load_clear() -> Result<()> {
        let dir = tempdir()?;
        let storage = SessionStorage::open(dir.path())?;
        assert!(storage.load_session()?.is_none());

        let user = User::new("u1", "emre", "pw", Role::Viewer);
        let token = SessionToken::issue(&user, "s", Duration::hours(1));
        storage.save_session(&token)?;
        assert_eq!(storage.load_session()?, Some(token));

        assert!(storage.clear_session()?);
        assert!(storage.load_session()?.is_none());
        assert!(!storage.clear_session()?);
        Ok(())
    }

    #[test]
    fn install_secret_is_stable() -> Result<()> {
        let dir = tempdir()?;
        let storage = SessionStorage::open(dir.path())?;
        let first = storage.install_secret()?;
        assert_eq!(first.len(), 64);
        assert_eq!(storage.install_secret()?, first);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        Ok(())
    }

    #[test]
    fn install_secrets_differ_between_installs() -> Result<()> {
        let a = tempdir()?;
        let b = tempdir()?;
        let first = SessionStorage::open(a.path())?.install_secret()?;
        let second = SessionStorage::open(b.path())?.install_secret()?;
        assert_ne!(first, second);
        Ok(())
    }
}
