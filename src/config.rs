// Vehicle Parts Tracker - Configuration
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Data location, LMDB sizing, session lifetime and the default admin seed.
// Defaults live here; an optional JSON file overrides any subset of them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_MAP_SIZE: usize = 64 * 1024 * 1024; // 64MB — records are small JSON
const DEFAULT_SESSION_TTL_HOURS: i64 = 12;

/// Master configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Root directory holding INVENTORY.DB and SESSION.DB
    pub data_dir: PathBuf,
    /// LMDB map size for the inventory environment
    pub map_size: usize,
    /// Hours before a persisted session stops being honored
    pub session_ttl_hours: i64,
    pub default_admin: AdminSeed,
}

/// Administrative account guaranteed to exist after startup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdminSeed {
    pub id: String,
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
}

impl Default for AdminSeed {
    fn default() -> Self {
        Self {
            id: "admin".to_string(),
            username: "admin".to_string(),
            password: "admin123".to_string(),
            name: "System Administrator".to_string(),
            email: "admin@parcatakip.com".to_string(),
        }
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            data_dir: crate::paths::data_root().to_path_buf(),
            map_size: DEFAULT_MAP_SIZE,
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            default_admin: AdminSeed::default(),
        }
    }
}

impl InventoryConfig {
    /// Defaults rooted at `data_dir`
    pub fn with_data_dir(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            ..Self::default()
        }
    }

    /// Read a JSON config file. A missing file yields defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("Invalid JSON in config file {:?}", path))?;
        log::info!("Config loaded from {:?}", path);
        Ok(config)
    }

    pub fn inventory_path(&self) -> PathBuf {
        crate::paths::inventory_db(&self.data_dir)
    }

    pub fn session_path(&self) -> PathBuf {
        crate::paths::session_db(&self.data_dir)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours.max(0))
    }
}
