// Vehicle Parts Tracker - Record Types
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Vehicles, parts, sales and users as stored in LMDB and as written to
// export bundles. Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a vehicle on the lot. Stored as free text: the four
/// named states are the ones the CLI offers, anything else is kept as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(from = "String", into = "String")]
pub enum VehicleStatus {
    /// Intact, can be sold whole
    #[default]
    Available,
    /// Being stripped for parts
    Dismantling,
    Sold,
    Scrapped,
    Other(String),
}

impl VehicleStatus {
    pub fn as_str(&self) -> &str {
        match self {
            VehicleStatus::Available => "available",
            VehicleStatus::Dismantling => "dismantling",
            VehicleStatus::Sold => "sold",
            VehicleStatus::Scrapped => "scrapped",
            VehicleStatus::Other(s) => s,
        }
    }
}

impl From<String> for VehicleStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "available" => VehicleStatus::Available,
            "dismantling" => VehicleStatus::Dismantling,
            "sold" => VehicleStatus::Sold,
            "scrapped" => VehicleStatus::Scrapped,
            _ => VehicleStatus::Other(s),
        }
    }
}

impl From<VehicleStatus> for String {
    fn from(status: VehicleStatus) -> Self {
        match status {
            VehicleStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for VehicleStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Ok(match VehicleStatus::from(lower) {
            VehicleStatus::Other(_) => VehicleStatus::Other(s.to_string()),
            known => known,
        })
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    pub brand: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub year: Option<i32>,
    /// Unique when present. Vehicles without one stay out of the VIN index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
    #[serde(default)]
    pub plate: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub mileage: Option<u64>,
    #[serde(default)]
    pub status: VehicleStatus,
    #[serde(default)]
    pub purchase_price: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Any other descriptive fields, kept verbatim through export/import
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Vehicle {
    /// An empty `vin` means the vehicle has none
    pub fn new(id: &str, brand: &str, vin: &str) -> Self {
        Self {
            id: id.to_string(),
            brand: brand.to_string(),
            model: String::new(),
            year: None,
            vin: (!vin.is_empty()).then(|| vin.to_string()),
            plate: None,
            color: None,
            mileage: None,
            status: VehicleStatus::Available,
            purchase_price: None,
            notes: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub id: String,
    pub vehicle_id: String,
    pub name: String,
    #[serde(default)]
    pub part_number: Option<String>,
    /// Free text: "used", "refurbished", "damaged", ...
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Shelf / bin location
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_quantity() -> u32 {
    1
}

impl Part {
    pub fn new(id: &str, vehicle_id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            vehicle_id: vehicle_id.to_string(),
            name: name.to_string(),
            part_number: None,
            condition: None,
            price: None,
            quantity: default_quantity(),
            location: None,
            notes: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub vehicle_id: String,
    /// ISO date or timestamp, parsed only when reporting
    pub date: String,
    pub amount: f64,
    #[serde(default)]
    pub part_id: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Sale {
    pub fn new(id: &str, vehicle_id: &str, date: &str, amount: f64) -> Self {
        Self {
            id: id.to_string(),
            vehicle_id: vehicle_id.to_string(),
            date: date.to_string(),
            amount,
            part_id: None,
            customer: None,
            notes: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Viewer => "viewer",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            "viewer" => Ok(Role::Viewer),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Login identity. Password is stored as plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: &str, username: &str, password: &str, role: Role) -> Self {
        Self {
            id: id.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            role,
            name: String::new(),
            email: String::new(),
            created_at: Utc::now(),
        }
    }
}

/// Backup bundle. Users are never part of an export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default)]
    pub sales: Vec<Sale>,
    pub export_date: DateTime<Utc>,
}

impl ExportBundle {
    pub fn record_count(&self) -> usize {
        self.vehicles.len() + self.parts.len() + self.sales.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_keeps_unknown_fields() {
        let json = r#"{"id":"v1","brand":"Fiat","vin":"ZFA123","status":"sold","engine":"1.3 Multijet"}"#;
        let vehicle: Vehicle = serde_json::from_str(json).unwrap();
        assert_eq!(vehicle.status, VehicleStatus::Sold);
        assert_eq!(vehicle.extra.get("engine"), Some(&Value::from("1.3 Multijet")));

        let back = serde_json::to_value(&vehicle).unwrap();
        assert_eq!(back["engine"], "1.3 Multijet");
        assert_eq!(back["vin"], "ZFA123");
    }

    #[test]
    fn unknown_status_and_missing_vin_are_accepted() {
        let json = r#"{"id":"v9","brand":"Lada","status":"awaiting-inspection"}"#;
        let vehicle: Vehicle = serde_json::from_str(json).unwrap();
        assert_eq!(vehicle.vin, None);
        assert_eq!(vehicle.status, VehicleStatus::Other("awaiting-inspection".to_string()));
        assert!(vehicle.extra.is_empty());

        let back = serde_json::to_value(&vehicle).unwrap();
        assert_eq!(back["status"], "awaiting-inspection");
        assert!(back.get("vin").is_none());
    }

    #[test]
    fn status_parses_known_names_case_insensitively() {
        assert_eq!("SOLD".parse::<VehicleStatus>(), Ok(VehicleStatus::Sold));
        assert_eq!("On Hold".parse::<VehicleStatus>(), Ok(VehicleStatus::Other("On Hold".to_string())));
        assert_eq!(Vehicle::new("v1", "Fiat", "").vin, None);
    }

    #[test]
    fn part_uses_camel_case_and_default_quantity() {
        let part: Part = serde_json::from_str(r#"{"id":"p1","vehicleId":"v1","name":"Alternator"}"#).unwrap();
        assert_eq!(part.vehicle_id, "v1");
        assert_eq!(part.quantity, 1);
        assert!(part.extra.is_empty());
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("viewer".parse::<Role>(), Ok(Role::Viewer));
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn export_bundle_field_names() {
        let bundle = ExportBundle {
            vehicles: vec![],
            parts: vec![],
            sales: vec![Sale::new("s1", "v1", "2024-06-15", 1200.0)],
            export_date: Utc::now(),
        };
        let value = serde_json::to_value(&bundle).unwrap();
        assert!(value.get("exportDate").is_some());
        assert_eq!(value["sales"][0]["vehicleId"], "v1");
        assert_eq!(bundle.record_count(), 1);
    }
}
