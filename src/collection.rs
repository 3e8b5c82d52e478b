// Vehicle Parts Tracker - Indexed Collections
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// One LMDB database per collection (id → JSON record) plus one database per
// secondary index. Unique indexes map value → id. Non-unique indexes map
// "value\0id" → id and are read with a prefix scan.
//
// LMDB keys must be non-empty and at most 511 bytes. Index values are stored
// tagged: "=" + value when short and free of NUL, otherwise "#" + SHA-256 hex
// of the value. Record ids are stored raw and capped at MAX_ID_LEN bytes.
//
// Every method takes the caller's transaction; InventoryStore decides where
// transactions begin and end.

use crate::error::{StoreError, StoreResult};
use crate::models::{Part, Sale, User, Vehicle};
use heed::types::*;
use heed::{Database, Env, RoTxn, RwTxn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::marker::PhantomData;

const INDEX_SEP: char = '\0';

/// Longest record id accepted. Leaves room for a hashed index value in the
/// same key.
pub const MAX_ID_LEN: usize = 256;

/// Index values longer than this are stored hashed
const MAX_RAW_VALUE: usize = 200;

/// Secondary index declaration
#[derive(Debug, Clone, Copy)]
pub struct IndexDef {
    pub name: &'static str,
    pub unique: bool,
}

/// A record type that lives in its own collection
pub trait Record: Serialize + DeserializeOwned {
    const COLLECTION: &'static str;
    const INDEXES: &'static [IndexDef];

    fn id(&self) -> &str;

    /// Key value for the named index
    fn index_value(&self, index: &str) -> Option<String>;
}

impl Record for Vehicle {
    const COLLECTION: &'static str = "vehicles";
    const INDEXES: &'static [IndexDef] = &[
        IndexDef { name: "brand", unique: false },
        IndexDef { name: "vin", unique: true },
        IndexDef { name: "status", unique: false },
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn index_value(&self, index: &str) -> Option<String> {
        match index {
            "brand" => Some(self.brand.clone()),
            "vin" => self.vin.clone().filter(|vin| !vin.is_empty()),
            "status" => Some(self.status.as_str().to_string()),
            _ => None,
        }
    }
}

impl Record for Part {
    const COLLECTION: &'static str = "parts";
    const INDEXES: &'static [IndexDef] = &[
        IndexDef { name: "vehicleId", unique: false },
        IndexDef { name: "name", unique: false },
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn index_value(&self, index: &str) -> Option<String> {
        match index {
            "vehicleId" => Some(self.vehicle_id.clone()),
            "name" => Some(self.name.clone()),
            _ => None,
        }
    }
}

impl Record for Sale {
    const COLLECTION: &'static str = "sales";
    const INDEXES: &'static [IndexDef] = &[
        IndexDef { name: "vehicleId", unique: false },
        IndexDef { name: "date", unique: false },
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn index_value(&self, index: &str) -> Option<String> {
        match index {
            "vehicleId" => Some(self.vehicle_id.clone()),
            "date" => Some(self.date.clone()),
            _ => None,
        }
    }
}

impl Record for User {
    const COLLECTION: &'static str = "users";
    const INDEXES: &'static [IndexDef] = &[
        IndexDef { name: "username", unique: true },
        IndexDef { name: "role", unique: false },
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn index_value(&self, index: &str) -> Option<String> {
        match index {
            "username" => Some(self.username.clone()),
            "role" => Some(self.role.as_str().to_string()),
            _ => None,
        }
    }
}

/// Number of named LMDB databases a collection of `T` occupies
pub fn db_count<T: Record>() -> u32 {
    1 + T::INDEXES.len() as u32
}

struct Index {
    def: IndexDef,
    db: Database<Str, Str>,
}

/// Index-key form of a value: non-empty, NUL-free, at most MAX_RAW_VALUE + 1 bytes
fn encode_value(value: &str) -> String {
    if value.len() <= MAX_RAW_VALUE && !value.contains(INDEX_SEP) {
        format!("={}", value)
    } else {
        format!("#{}", hex::encode(Sha256::digest(value.as_bytes())))
    }
}

impl Index {
    fn entry_key(&self, value: &str, id: &str) -> String {
        if self.def.unique {
            encode_value(value)
        } else {
            format!("{}{}{}", encode_value(value), INDEX_SEP, id)
        }
    }
}

fn storable_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_ID_LEN
}

fn check_id<T: Record>(id: &str) -> StoreResult<()> {
    if id.is_empty() {
        return Err(StoreError::InvalidId { collection: T::COLLECTION, reason: "id is empty".to_string() });
    }
    if id.len() > MAX_ID_LEN {
        return Err(StoreError::InvalidId {
            collection: T::COLLECTION,
            reason: format!("id is {} bytes, limit is {}", id.len(), MAX_ID_LEN),
        });
    }
    Ok(())
}

/// Typed handle over a collection and its index databases
pub struct Collection<T> {
    records: Database<Str, Str>,
    indexes: Vec<Index>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> Collection<T> {
    /// Create the collection's databases if absent, or open them
    pub fn create(env: &Env, wtxn: &mut RwTxn) -> StoreResult<Self> {
        let records = env.create_database(wtxn, Some(T::COLLECTION))?;

        let mut indexes = Vec::with_capacity(T::INDEXES.len());
        for def in T::INDEXES {
            let name = format!("{}.{}", T::COLLECTION, def.name);
            let db = env.create_database(wtxn, Some(name.as_str()))?;
            indexes.push(Index { def: *def, db });
        }

        Ok(Self { records, indexes, _record: PhantomData })
    }

    pub fn get(&self, rtxn: &RoTxn, id: &str) -> StoreResult<Option<T>> {
        if !storable_id(id) {
            return Ok(None);
        }
        match self.records.get(rtxn, id)? {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, rtxn: &RoTxn, id: &str) -> StoreResult<bool> {
        if !storable_id(id) {
            return Ok(false);
        }
        Ok(self.records.get(rtxn, id)?.is_some())
    }

    /// All records in primary-key order
    pub fn all(&self, rtxn: &RoTxn) -> StoreResult<Vec<T>> {
        let mut records = Vec::new();
        for result in self.records.iter(rtxn)? {
            let (_, json) = result?;
            records.push(serde_json::from_str(json)?);
        }
        Ok(records)
    }

    pub fn len(&self, rtxn: &RoTxn) -> StoreResult<u64> {
        Ok(self.records.len(rtxn)?)
    }

    /// Records whose `index` equals `value`. At most one for unique indexes.
    pub fn find_by(&self, rtxn: &RoTxn, index: &str, value: &str) -> StoreResult<Vec<T>> {
        let index = self.index(index)?;

        let mut ids = Vec::new();
        if index.def.unique {
            if let Some(id) = index.db.get(rtxn, &encode_value(value))? {
                ids.push(id.to_string());
            }
        } else {
            let prefix = format!("{}{}", encode_value(value), INDEX_SEP);
            for result in index.db.prefix_iter(rtxn, &prefix)? {
                let (_, id) = result?;
                ids.push(id.to_string());
            }
        }

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get(rtxn, &id)? {
                Some(record) => records.push(record),
                None => log::warn!("{}.{} points at missing id {}", T::COLLECTION, index.def.name, id),
            }
        }
        Ok(records)
    }

    /// Insert a new record. Fails on duplicate id or duplicate unique value.
    pub fn insert(&self, wtxn: &mut RwTxn, record: &T) -> StoreResult<()> {
        let id = record.id();
        check_id::<T>(id)?;
        if self.contains(wtxn, id)? {
            return Err(StoreError::ConstraintViolation {
                collection: T::COLLECTION,
                field: "id",
                value: id.to_string(),
            });
        }
        self.check_unique(wtxn, record)?;
        self.write(wtxn, record)
    }

    /// Insert or replace by id. Returns true if a record was replaced.
    pub fn upsert(&self, wtxn: &mut RwTxn, record: &T) -> StoreResult<bool> {
        check_id::<T>(record.id())?;
        let previous = self.get(wtxn, record.id())?;
        self.check_unique(wtxn, record)?;
        if let Some(old) = &previous {
            self.unindex(wtxn, old)?;
        }
        self.write(wtxn, record)?;
        Ok(previous.is_some())
    }

    /// Remove by id. Returns the removed record, or None if it was absent.
    pub fn remove(&self, wtxn: &mut RwTxn, id: &str) -> StoreResult<Option<T>> {
        let existing = self.get(wtxn, id)?;
        if let Some(old) = &existing {
            self.unindex(wtxn, old)?;
            self.records.delete(wtxn, id)?;
        }
        Ok(existing)
    }

    fn index(&self, name: &str) -> StoreResult<&Index> {
        self.indexes
            .iter()
            .find(|i| i.def.name == name)
            .ok_or_else(|| StoreError::UnknownIndex { collection: T::COLLECTION, index: name.to_string() })
    }

    /// A unique value may only be held by the record with the same id
    fn check_unique(&self, rtxn: &RoTxn, record: &T) -> StoreResult<()> {
        for index in self.indexes.iter().filter(|i| i.def.unique) {
            let Some(value) = record.index_value(index.def.name) else {
                continue;
            };
            if let Some(owner) = index.db.get(rtxn, &encode_value(&value))? {
                if owner != record.id() {
                    return Err(StoreError::ConstraintViolation {
                        collection: T::COLLECTION,
                        field: index.def.name,
                        value,
                    });
                }
            }
        }
        Ok(())
    }

    fn write(&self, wtxn: &mut RwTxn, record: &T) -> StoreResult<()> {
        let json = serde_json::to_string(record)?;
        self.records.put(wtxn, record.id(), &json)?;
        for index in &self.indexes {
            if let Some(value) = record.index_value(index.def.name) {
                let key = index.entry_key(&value, record.id());
                index.db.put(wtxn, &key, record.id())?;
            }
        }
        Ok(())
    }

    fn unindex(&self, wtxn: &mut RwTxn, record: &T) -> StoreResult<()> {
        for index in &self.indexes {
            if let Some(value) = record.index_value(index.def.name) {
                let key = index.entry_key(&value, record.id());
                index.db.delete(wtxn, &key)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_values_fit_lmdb_keys() {
        assert_eq!(encode_value(""), "=");
        assert_eq!(encode_value("Fiat"), "=Fiat");

        let long = encode_value(&"x".repeat(600));
        assert!(long.starts_with('#'));
        assert_eq!(long.len(), 65);

        // NUL would break the non-unique prefix scan
        assert!(encode_value("a\0b").starts_with('#'));
        // A raw value that looks like a hash cannot collide with one
        assert_ne!(encode_value(&long), long);
    }

    #[test]
    fn id_limits() {
        assert!(check_id::<Part>("p1").is_ok());
        assert!(matches!(check_id::<Part>(""), Err(StoreError::InvalidId { collection: "parts", .. })));
        assert!(check_id::<Part>(&"p".repeat(MAX_ID_LEN + 1)).is_err());
        assert!(!storable_id(""));
    }
}
