// Vehicle Parts Tracker - Library Root
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// All modules exported here for use by the binary and tests.

pub mod paths;
pub mod config;
pub mod error;
pub mod models;
pub mod auth;
pub mod session;

// ============================================================================
// LMDB MODULES - 2-Environment Architecture
// ============================================================================

/// Indexed collections over LMDB named databases
pub mod collection;

/// INVENTORY: vehicles, parts, sales, users
pub mod store;

/// SESSION: persisted session token
pub mod storage;
