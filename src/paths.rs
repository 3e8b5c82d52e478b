// Vehicle Parts Tracker - Path Resolution
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Single source of truth for where the tracker keeps its LMDB environments.
// Cached via OnceLock for zero-overhead repeated access.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static DATA_ROOT_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// Directory name used under $HOME when INVENTORY_HOME is not set
const DEFAULT_DIR_NAME: &str = ".vehicle-parts-tracker";

/// Root directory for all tracker state.
///
/// Resolution order:
///   1. INVENTORY_HOME environment variable
///   2. HOME env + /.vehicle-parts-tracker
///   3. Current directory + /.vehicle-parts-tracker
pub fn data_root() -> &'static Path {
    DATA_ROOT_CACHE.get_or_init(|| {
        if let Ok(root) = std::env::var("INVENTORY_HOME") {
            if !root.is_empty() {
                return PathBuf::from(root);
            }
        }

        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(DEFAULT_DIR_NAME);
        }

        PathBuf::from(".").join(DEFAULT_DIR_NAME)
    })
}

/// Inventory database directory under a data root
pub fn inventory_db(root: &Path) -> PathBuf {
    root.join("INVENTORY.DB")
}

/// Session blob directory under a data root
pub fn session_db(root: &Path) -> PathBuf {
    root.join("SESSION.DB")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_dirs_live_under_root() {
        let root = Path::new("/srv/tracker");
        assert_eq!(inventory_db(root), PathBuf::from("/srv/tracker/INVENTORY.DB"));
        assert_eq!(session_db(root), PathBuf::from("/srv/tracker/SESSION.DB"));
    }
}
