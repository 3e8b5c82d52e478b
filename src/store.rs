// Vehicle Parts Tracker - Inventory LMDB
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Versioned LMDB environment with four collections: vehicles, parts, sales,
// users. Every operation except the replay import runs in exactly one
// transaction, which either commits fully or is dropped (aborted) on the
// first error.
//
// Database: INVENTORY
// Storage: <data_dir>/INVENTORY.DB/

use crate::collection::{db_count, Collection, Record};
use crate::error::{StoreError, StoreResult};
use crate::models::{ExportBundle, Part, Role, Sale, User, Vehicle, VehicleStatus};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use heed::types::*;
use heed::{Database, Env, EnvOpenOptions, RwTxn};
use serde::Serialize;
use std::path::Path;

/// Schema version written to the meta database on creation/upgrade
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_KEY: &str = "schema_version";

/// Record counts per collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub vehicles: u64,
    pub parts: u64,
    pub sales: u64,
    pub users: u64,
}

/// Records written by an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub vehicles: usize,
    pub parts: usize,
    pub sales: usize,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.vehicles + self.parts + self.sales
    }
}

/// What a cascading vehicle purge removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeSummary {
    pub vehicle_removed: bool,
    pub parts_removed: usize,
}

/// LMDB-backed inventory store
pub struct InventoryStore {
    env: Env,
    /// Schema metadata: "schema_version" → "1"
    meta: Database<Str, Str>,
    vehicles: Collection<Vehicle>,
    parts: Collection<Part>,
    sales: Collection<Sale>,
    users: Collection<User>,
}

impl InventoryStore {
    /// Open or create the inventory LMDB at the given path.
    ///
    /// Collections and indexes are created when the stored schema version is
    /// absent or older than SCHEMA_VERSION. A newer stored version is refused.
    pub fn open(path: &Path, map_size: usize) -> StoreResult<Self> {
        std::fs::create_dir_all(path)?;

        let max_dbs = 1
            + db_count::<Vehicle>()
            + db_count::<Part>()
            + db_count::<Sale>()
            + db_count::<User>();

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let meta: Database<Str, Str> = env.create_database(&mut wtxn, Some("meta"))?;

        let found = match meta.get(&wtxn, SCHEMA_KEY)? {
            Some(v) => v.parse::<u32>().unwrap_or(0),
            None => 0,
        };
        if found > SCHEMA_VERSION {
            return Err(StoreError::SchemaTooNew { found, supported: SCHEMA_VERSION });
        }

        let vehicles = Collection::create(&env, &mut wtxn)?;
        let parts = Collection::create(&env, &mut wtxn)?;
        let sales = Collection::create(&env, &mut wtxn)?;
        let users = Collection::create(&env, &mut wtxn)?;

        if found < SCHEMA_VERSION {
            meta.put(&mut wtxn, SCHEMA_KEY, &SCHEMA_VERSION.to_string())?;
            log::info!("INVENTORY schema v{} -> v{}: collections created", found, SCHEMA_VERSION);
        }
        wtxn.commit()?;

        log::info!("INVENTORY LMDB opened at {:?}", path);
        Ok(Self { env, meta, vehicles, parts, sales, users })
    }

    /// Schema version recorded in the database
    pub fn schema_version(&self) -> StoreResult<u32> {
        let rtxn = self.env.read_txn()?;
        Ok(self.meta.get(&rtxn, SCHEMA_KEY)?.and_then(|v| v.parse().ok()).unwrap_or(0))
    }

    // ========================================================================
    // GENERIC TRANSACTION WRAPPERS
    // ========================================================================

    fn insert<T: Record>(&self, collection: &Collection<T>, record: &T) -> StoreResult<()> {
        let mut wtxn = self.env.write_txn()?;
        if let Err(e) = collection.insert(&mut wtxn, record) {
            if e.is_constraint_violation() {
                log::warn!("{}: add rejected: {}", T::COLLECTION, e);
            }
            return Err(e);
        }
        wtxn.commit()?;
        log::debug!("{}: added {}", T::COLLECTION, record.id());
        Ok(())
    }

    fn upsert<T: Record>(&self, collection: &Collection<T>, record: &T) -> StoreResult<()> {
        let mut wtxn = self.env.write_txn()?;
        let replaced = match collection.upsert(&mut wtxn, record) {
            Ok(replaced) => replaced,
            Err(e) => {
                if e.is_constraint_violation() {
                    log::warn!("{}: update rejected: {}", T::COLLECTION, e);
                }
                return Err(e);
            }
        };
        wtxn.commit()?;
        log::debug!(
            "{}: {} {}",
            T::COLLECTION,
            if replaced { "replaced" } else { "inserted" },
            record.id()
        );
        Ok(())
    }

    fn remove<T: Record>(&self, collection: &Collection<T>, id: &str) -> StoreResult<bool> {
        let mut wtxn = self.env.write_txn()?;
        let removed = collection.remove(&mut wtxn, id)?.is_some();
        wtxn.commit()?;
        log::debug!("{}: delete {} (present: {})", T::COLLECTION, id, removed);
        Ok(removed)
    }

    fn get<T: Record>(&self, collection: &Collection<T>, id: &str) -> StoreResult<Option<T>> {
        let rtxn = self.env.read_txn()?;
        collection.get(&rtxn, id)
    }

    fn all<T: Record>(&self, collection: &Collection<T>) -> StoreResult<Vec<T>> {
        let rtxn = self.env.read_txn()?;
        collection.all(&rtxn)
    }

    fn find<T: Record>(&self, collection: &Collection<T>, index: &str, value: &str) -> StoreResult<Vec<T>> {
        let rtxn = self.env.read_txn()?;
        collection.find_by(&rtxn, index, value)
    }

    // ========================================================================
    // VEHICLES
    // ========================================================================

    pub fn add_vehicle(&self, vehicle: &Vehicle) -> StoreResult<()> {
        self.insert(&self.vehicles, vehicle)
    }

    pub fn update_vehicle(&self, vehicle: &Vehicle) -> StoreResult<()> {
        self.upsert(&self.vehicles, vehicle)
    }

    pub fn get_vehicle(&self, id: &str) -> StoreResult<Option<Vehicle>> {
        self.get(&self.vehicles, id)
    }

    pub fn get_all_vehicles(&self) -> StoreResult<Vec<Vehicle>> {
        self.all(&self.vehicles)
    }

    /// Remove a vehicle only. Its parts and sales are left in place.
    pub fn delete_vehicle(&self, id: &str) -> StoreResult<bool> {
        self.remove(&self.vehicles, id)
    }

    pub fn find_vehicle_by_vin(&self, vin: &str) -> StoreResult<Option<Vehicle>> {
        Ok(self.find(&self.vehicles, "vin", vin)?.into_iter().next())
    }

    pub fn vehicles_by_brand(&self, brand: &str) -> StoreResult<Vec<Vehicle>> {
        self.find(&self.vehicles, "brand", brand)
    }

    pub fn vehicles_by_status(&self, status: VehicleStatus) -> StoreResult<Vec<Vehicle>> {
        self.find(&self.vehicles, "status", status.as_str())
    }

    /// Remove a vehicle and every part that references it, atomically.
    /// Sales stay as history.
    pub fn purge_vehicle(&self, id: &str) -> StoreResult<PurgeSummary> {
        let mut wtxn = self.env.write_txn()?;

        let part_ids: Vec<String> = self
            .parts
            .find_by(&wtxn, "vehicleId", id)?
            .into_iter()
            .map(|p| p.id)
            .collect();
        for part_id in &part_ids {
            self.parts.remove(&mut wtxn, part_id)?;
        }
        let vehicle_removed = self.vehicles.remove(&mut wtxn, id)?.is_some();
        wtxn.commit()?;

        let summary = PurgeSummary { vehicle_removed, parts_removed: part_ids.len() };
        log::info!("vehicles: purged {} ({} parts)", id, summary.parts_removed);
        Ok(summary)
    }

    // ========================================================================
    // PARTS
    // ========================================================================

    pub fn add_part(&self, part: &Part) -> StoreResult<()> {
        self.insert(&self.parts, part)
    }

    pub fn update_part(&self, part: &Part) -> StoreResult<()> {
        self.upsert(&self.parts, part)
    }

    pub fn get_part(&self, id: &str) -> StoreResult<Option<Part>> {
        self.get(&self.parts, id)
    }

    pub fn get_all_parts(&self) -> StoreResult<Vec<Part>> {
        self.all(&self.parts)
    }

    pub fn delete_part(&self, id: &str) -> StoreResult<bool> {
        self.remove(&self.parts, id)
    }

    pub fn get_vehicle_parts(&self, vehicle_id: &str) -> StoreResult<Vec<Part>> {
        self.find(&self.parts, "vehicleId", vehicle_id)
    }

    pub fn parts_by_name(&self, name: &str) -> StoreResult<Vec<Part>> {
        self.find(&self.parts, "name", name)
    }

    // ========================================================================
    // SALES
    // ========================================================================

    pub fn add_sale(&self, sale: &Sale) -> StoreResult<()> {
        self.insert(&self.sales, sale)
    }

    pub fn update_sale(&self, sale: &Sale) -> StoreResult<()> {
        self.upsert(&self.sales, sale)
    }

    pub fn get_sale(&self, id: &str) -> StoreResult<Option<Sale>> {
        self.get(&self.sales, id)
    }

    pub fn get_all_sales(&self) -> StoreResult<Vec<Sale>> {
        self.all(&self.sales)
    }

    pub fn delete_sale(&self, id: &str) -> StoreResult<bool> {
        self.remove(&self.sales, id)
    }

    pub fn get_vehicle_sales(&self, vehicle_id: &str) -> StoreResult<Vec<Sale>> {
        self.find(&self.sales, "vehicleId", vehicle_id)
    }

    /// Sales whose date string is exactly `date`
    pub fn sales_on_date(&self, date: &str) -> StoreResult<Vec<Sale>> {
        self.find(&self.sales, "date", date)
    }

    /// Sales dated within [start, end], both ends inclusive.
    /// Sales whose date does not parse are left out.
    pub fn get_sales_report(&self, start: &str, end: &str) -> StoreResult<Vec<Sale>> {
        let from = parse_timestamp(start).ok_or_else(|| StoreError::InvalidDate(start.to_string()))?;
        let to = parse_timestamp(end).ok_or_else(|| StoreError::InvalidDate(end.to_string()))?;

        let sales = self.get_all_sales()?;
        let total = sales.len();
        let report: Vec<Sale> = sales
            .into_iter()
            .filter(|sale| match parse_timestamp(&sale.date) {
                Some(at) => at >= from && at <= to,
                None => {
                    log::warn!("sales: {} has unparseable date '{}'", sale.id, sale.date);
                    false
                }
            })
            .collect();

        log::debug!("sales report {}..{}: {}/{} sales", start, end, report.len(), total);
        Ok(report)
    }

    // ========================================================================
    // USERS
    // ========================================================================

    pub fn add_user(&self, user: &User) -> StoreResult<()> {
        self.insert(&self.users, user)
    }

    pub fn update_user(&self, user: &User) -> StoreResult<()> {
        self.upsert(&self.users, user)
    }

    /// Look up a user by username
    pub fn get_user(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self.find(&self.users, "username", username)?.into_iter().next())
    }

    pub fn get_user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        self.get(&self.users, id)
    }

    pub fn get_all_users(&self) -> StoreResult<Vec<User>> {
        self.all(&self.users)
    }

    pub fn users_by_role(&self, role: Role) -> StoreResult<Vec<User>> {
        self.find(&self.users, "role", role.as_str())
    }

    pub fn delete_user(&self, id: &str) -> StoreResult<bool> {
        self.remove(&self.users, id)
    }

    // ========================================================================
    // EXPORT / IMPORT
    // ========================================================================

    /// Snapshot vehicles, parts and sales. Users are never exported.
    pub fn export_data(&self) -> StoreResult<ExportBundle> {
        let rtxn = self.env.read_txn()?;
        let bundle = ExportBundle {
            vehicles: self.vehicles.all(&rtxn)?,
            parts: self.parts.all(&rtxn)?,
            sales: self.sales.all(&rtxn)?,
            export_date: Utc::now(),
        };
        log::info!("export: {} records", bundle.record_count());
        Ok(bundle)
    }

    /// Replay the bundle as individual adds: vehicles, then parts, then sales.
    ///
    /// Stops at the first failing add. Everything added before that point stays
    /// committed; the error reports how many records that was.
    pub fn import_data(&self, bundle: &ExportBundle) -> StoreResult<ImportSummary> {
        let mut summary = ImportSummary::default();

        let result = (|| -> StoreResult<()> {
            for vehicle in &bundle.vehicles {
                self.add_vehicle(vehicle)?;
                summary.vehicles += 1;
            }
            for part in &bundle.parts {
                self.add_part(part)?;
                summary.parts += 1;
            }
            for sale in &bundle.sales {
                self.add_sale(sale)?;
                summary.sales += 1;
            }
            Ok(())
        })();

        match result {
            Ok(()) => {
                log::info!("import: {} records restored", summary.total());
                Ok(summary)
            }
            Err(e) => {
                log::error!("import: aborted after {} records: {}", summary.total(), e);
                Err(StoreError::ImportAborted { committed: summary.total(), source: Box::new(e) })
            }
        }
    }

    /// Same replay as `import_data`, inside one write transaction.
    /// Any failure leaves the store untouched.
    pub fn import_data_atomic(&self, bundle: &ExportBundle) -> StoreResult<ImportSummary> {
        let mut wtxn = self.env.write_txn()?;
        let summary = self.replay(&mut wtxn, bundle).map_err(|e| {
            log::error!("import (atomic): rolled back: {}", e);
            e
        })?;
        wtxn.commit()?;
        log::info!("import (atomic): {} records restored", summary.total());
        Ok(summary)
    }

    fn replay(&self, wtxn: &mut RwTxn, bundle: &ExportBundle) -> StoreResult<ImportSummary> {
        for vehicle in &bundle.vehicles {
            self.vehicles.insert(wtxn, vehicle)?;
        }
        for part in &bundle.parts {
            self.parts.insert(wtxn, part)?;
        }
        for sale in &bundle.sales {
            self.sales.insert(wtxn, sale)?;
        }
        Ok(ImportSummary {
            vehicles: bundle.vehicles.len(),
            parts: bundle.parts.len(),
            sales: bundle.sales.len(),
        })
    }

    /// Get database stats
    pub fn stats(&self) -> StoreResult<StoreStats> {
        let rtxn = self.env.read_txn()?;
        Ok(StoreStats {
            vehicles: self.vehicles.len(&rtxn)?,
            parts: self.parts.len(&rtxn)?,
            sales: self.sales.len(&rtxn)?,
            users: self.users.len(&rtxn)?,
        })
    }
}

/// Parse an RFC 3339 timestamp, a naive "YYYY-MM-DDTHH:MM:SS" (taken as UTC)
/// or a bare "YYYY-MM-DD" (midnight UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}
