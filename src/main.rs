// Vehicle Parts Tracker - Main Entry Point
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// CLI over the inventory store. Every command runs behind the auth gate.
// Usage:
//   vehicle-parts-tracker login <username> <password>          # Start a session
//   vehicle-parts-tracker vehicle add --brand Fiat --vin ZFA…  # Needs write
//   vehicle-parts-tracker report 2024-01-01 2024-12-31         # Sales in range
//   vehicle-parts-tracker export backup.json                   # Needs export
//   vehicle-parts-tracker import backup.json [--atomic]        # Needs import

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;
use vehicle_parts_tracker::{
    auth::{AuthGate, Permission},
    config::InventoryConfig,
    error::StoreError,
    models::{ExportBundle, Part, Role, Sale, User, Vehicle, VehicleStatus},
    storage::SessionStorage,
    store::InventoryStore,
};

#[derive(Parser)]
#[command(name = "vehicle-parts-tracker")]
#[command(author = "Joseph Stone")]
#[command(version = "1.0.0")]
#[command(about = "Vehicle Parts Tracker - vehicles, parts and sales in a local LMDB store")]
struct Cli {
    /// JSON config file (missing file = defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory holding INVENTORY.DB and SESSION.DB (overrides config)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and persist a session
    Login { username: String, password: String },

    /// End the current session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Show store status and record counts
    Status,

    /// Vehicle records
    #[command(subcommand)]
    Vehicle(VehicleCmd),

    /// Part records
    #[command(subcommand)]
    Part(PartCmd),

    /// Sale records
    #[command(subcommand)]
    Sale(SaleCmd),

    /// User accounts (admin only)
    #[command(subcommand)]
    User(UserCmd),

    /// Sales dated within [start, end], inclusive
    Report { start: String, end: String },

    /// Write vehicles, parts and sales to a JSON bundle
    Export { json_file: PathBuf },

    /// Load a JSON bundle produced by export
    Import {
        json_file: PathBuf,

        /// All-or-nothing: roll back everything on the first failure
        #[arg(long)]
        atomic: bool,
    },
}

#[derive(Args)]
struct VehicleFields {
    /// Record id (generated when omitted)
    #[arg(long)]
    id: Option<String>,
    #[arg(long)]
    brand: String,
    /// Leave out for vehicles without a VIN
    #[arg(long, default_value = "")]
    vin: String,
    #[arg(long, default_value = "")]
    model: String,
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    plate: Option<String>,
    #[arg(long)]
    color: Option<String>,
    #[arg(long)]
    mileage: Option<u64>,
    /// available | dismantling | sold | scrapped, or any other label
    #[arg(long, default_value = "available")]
    status: VehicleStatus,
    #[arg(long)]
    price: Option<f64>,
    #[arg(long)]
    notes: Option<String>,
}

impl VehicleFields {
    fn into_vehicle(self) -> Vehicle {
        let id = self.id.unwrap_or_else(|| new_id("v"));
        let mut vehicle = Vehicle::new(&id, &self.brand, &self.vin);
        vehicle.model = self.model;
        vehicle.year = self.year;
        vehicle.plate = self.plate;
        vehicle.color = self.color;
        vehicle.mileage = self.mileage;
        vehicle.status = self.status;
        vehicle.purchase_price = self.price;
        vehicle.notes = self.notes;
        vehicle
    }
}

#[derive(Subcommand)]
enum VehicleCmd {
    /// Add a new vehicle (fails on duplicate id or VIN)
    Add(VehicleFields),
    /// Insert or replace a vehicle by id
    Update(VehicleFields),
    /// List vehicles, optionally filtered
    List {
        #[arg(long)]
        brand: Option<String>,
        #[arg(long)]
        status: Option<VehicleStatus>,
    },
    /// Show one vehicle by id or VIN, with its parts and sales
    Show { key: String },
    /// Delete a vehicle; its parts and sales are kept
    Delete { id: String },
    /// Delete a vehicle and all of its parts
    Purge { id: String },
}

#[derive(Subcommand)]
enum PartCmd {
    Add {
        #[arg(long)]
        id: Option<String>,
        #[arg(long = "vehicle")]
        vehicle_id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        part_number: Option<String>,
        #[arg(long)]
        condition: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
        #[arg(long)]
        location: Option<String>,
    },
    List {
        #[arg(long = "vehicle")]
        vehicle_id: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
    Delete { id: String },
}

#[derive(Subcommand)]
enum SaleCmd {
    Add {
        #[arg(long)]
        id: Option<String>,
        #[arg(long = "vehicle")]
        vehicle_id: String,
        /// ISO date, defaults to now
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        amount: f64,
        #[arg(long = "part")]
        part_id: Option<String>,
        #[arg(long)]
        customer: Option<String>,
    },
    List {
        #[arg(long = "vehicle")]
        vehicle_id: Option<String>,
    },
    Delete { id: String },
}

#[derive(Subcommand)]
enum UserCmd {
    Add {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// admin | user | viewer
        #[arg(long, default_value = "viewer")]
        role: Role,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        email: String,
    },
    List,
    Delete { id: String },
}

/// Random v4 UUID behind a one-letter collection prefix
fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn require(gate: &AuthGate, permission: Permission) -> Result<()> {
    match gate.current_user() {
        None => bail!("Not logged in. Run `vehicle-parts-tracker login <username> <password>`"),
        Some(user) if !gate.has_permission(permission) => {
            bail!("Permission denied: role '{}' lacks '{}'", user.role, permission)
        }
        Some(_) => Ok(()),
    }
}

fn require_admin(gate: &AuthGate) -> Result<()> {
    match gate.current_user() {
        Some(user) if user.role == Role::Admin => Ok(()),
        Some(user) => bail!("Permission denied: user management needs admin, '{}' is {}", user.username, user.role),
        None => bail!("Not logged in"),
    }
}

fn main() -> Result<()> {
    // Initialize logging (safe if already init)
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => InventoryConfig::load_or_default(path)?,
        None => InventoryConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }

    let store = InventoryStore::open(&config.inventory_path(), config.map_size)
        .with_context(|| format!("Failed to open inventory at {:?}", config.inventory_path()))?;
    let sessions = SessionStorage::open(&config.session_path())
        .with_context(|| format!("Failed to open session store at {:?}", config.session_path()))?;
    let mut gate = AuthGate::start(&store, sessions, &config)?;

    match cli.command {
        Commands::Login { username, password } => {
            if !gate.login(&username, &password) {
                eprintln!("Login failed.");
                std::process::exit(1);
            }
            println!("Logged in as {}.", username);
        }

        Commands::Logout => {
            gate.logout();
            println!("Logged out.");
        }

        Commands::Whoami => match gate.current_user() {
            Some(user) => println!("{} ({}) role={}", user.username, user.name, user.role),
            None => println!("Not logged in."),
        },

        Commands::Status => {
            let stats = store.stats()?;
            println!("Vehicle Parts Tracker v1.0.0");
            println!("Data: {:?}", config.data_dir);
            println!("Schema: v{}", store.schema_version()?);
            println!(
                "User: {}",
                gate.current_user().map(|u| u.username.as_str()).unwrap_or("(none)")
            );
            println!();
            println!("Vehicles: {}", stats.vehicles);
            println!("Parts:    {}", stats.parts);
            println!("Sales:    {}", stats.sales);
            println!("Users:    {}", stats.users);
        }

        Commands::Vehicle(cmd) => match cmd {
            VehicleCmd::Add(fields) => {
                require(&gate, Permission::Write)?;
                let vehicle = fields.into_vehicle();
                store.add_vehicle(&vehicle)?;
                println!("Added vehicle {}.", vehicle.id);
            }
            VehicleCmd::Update(fields) => {
                require(&gate, Permission::Write)?;
                let vehicle = fields.into_vehicle();
                store.update_vehicle(&vehicle)?;
                println!("Saved vehicle {}.", vehicle.id);
            }
            VehicleCmd::List { brand, status } => {
                require(&gate, Permission::Read)?;
                let vehicles = match (brand, status) {
                    (Some(brand), _) => store.vehicles_by_brand(&brand)?,
                    (None, Some(status)) => store.vehicles_by_status(status)?,
                    (None, None) => store.get_all_vehicles()?,
                };
                print_json(&vehicles)?;
            }
            VehicleCmd::Show { key } => {
                require(&gate, Permission::Read)?;
                let vehicle = match store.get_vehicle(&key)? {
                    Some(v) => Some(v),
                    None => store.find_vehicle_by_vin(&key)?,
                };
                let Some(vehicle) = vehicle else {
                    bail!("No vehicle with id or VIN '{}'", key);
                };
                let parts = store.get_vehicle_parts(&vehicle.id)?;
                let sales = store.get_vehicle_sales(&vehicle.id)?;
                print_json(&serde_json::json!({
                    "vehicle": vehicle,
                    "parts": parts,
                    "sales": sales,
                }))?;
            }
            VehicleCmd::Delete { id } => {
                require(&gate, Permission::Delete)?;
                if store.delete_vehicle(&id)? {
                    println!("Deleted vehicle {}.", id);
                } else {
                    println!("No vehicle {} (nothing to delete).", id);
                }
            }
            VehicleCmd::Purge { id } => {
                require(&gate, Permission::Delete)?;
                let summary = store.purge_vehicle(&id)?;
                println!(
                    "Purged vehicle {} (removed: {}, parts removed: {}).",
                    id, summary.vehicle_removed, summary.parts_removed
                );
            }
        },

        Commands::Part(cmd) => match cmd {
            PartCmd::Add { id, vehicle_id, name, part_number, condition, price, quantity, location } => {
                require(&gate, Permission::Write)?;
                let id = id.unwrap_or_else(|| new_id("p"));
                let mut part = Part::new(&id, &vehicle_id, &name);
                part.part_number = part_number;
                part.condition = condition;
                part.price = price;
                part.quantity = quantity;
                part.location = location;
                if store.get_vehicle(&vehicle_id)?.is_none() {
                    log::warn!("part {} references unknown vehicle {}", id, vehicle_id);
                }
                store.add_part(&part)?;
                println!("Added part {}.", id);
            }
            PartCmd::List { vehicle_id, name } => {
                require(&gate, Permission::Read)?;
                let parts = match (vehicle_id, name) {
                    (Some(vehicle_id), _) => store.get_vehicle_parts(&vehicle_id)?,
                    (None, Some(name)) => store.parts_by_name(&name)?,
                    (None, None) => store.get_all_parts()?,
                };
                print_json(&parts)?;
            }
            PartCmd::Delete { id } => {
                require(&gate, Permission::Delete)?;
                let removed = store.delete_part(&id)?;
                println!("Part {}: {}.", id, if removed { "deleted" } else { "not found" });
            }
        },

        Commands::Sale(cmd) => match cmd {
            SaleCmd::Add { id, vehicle_id, date, amount, part_id, customer } => {
                require(&gate, Permission::Write)?;
                let id = id.unwrap_or_else(|| new_id("s"));
                let date = date.unwrap_or_else(|| Utc::now().to_rfc3339());
                if vehicle_parts_tracker::store::parse_timestamp(&date).is_none() {
                    return Err(StoreError::InvalidDate(date).into());
                }
                let mut sale = Sale::new(&id, &vehicle_id, &date, amount);
                sale.part_id = part_id;
                sale.customer = customer;
                store.add_sale(&sale)?;
                println!("Added sale {}.", id);
            }
            SaleCmd::List { vehicle_id } => {
                require(&gate, Permission::Read)?;
                let sales = match vehicle_id {
                    Some(vehicle_id) => store.get_vehicle_sales(&vehicle_id)?,
                    None => store.get_all_sales()?,
                };
                print_json(&sales)?;
            }
            SaleCmd::Delete { id } => {
                require(&gate, Permission::Delete)?;
                let removed = store.delete_sale(&id)?;
                println!("Sale {}: {}.", id, if removed { "deleted" } else { "not found" });
            }
        },

        Commands::User(cmd) => {
            require_admin(&gate)?;
            match cmd {
                UserCmd::Add { id, username, password, role, name, email } => {
                    let id = id.unwrap_or_else(|| new_id("u"));
                    let mut user = User::new(&id, &username, &password, role);
                    user.name = name;
                    user.email = email;
                    store.add_user(&user)?;
                    println!("Added user {} ({}).", username, role);
                }
                UserCmd::List => {
                    for user in store.get_all_users()? {
                        println!("{:<12} {:<16} {:<7} {}", user.id, user.username, user.role, user.email);
                    }
                }
                UserCmd::Delete { id } => {
                    if gate.current_user().map(|u| u.id == id).unwrap_or(false) {
                        bail!("Refusing to delete the logged-in user");
                    }
                    let removed = store.delete_user(&id)?;
                    println!("User {}: {}.", id, if removed { "deleted" } else { "not found" });
                }
            }
        }

        Commands::Report { start, end } => {
            require(&gate, Permission::Read)?;
            let sales = store.get_sales_report(&start, &end)?;
            let total: f64 = sales.iter().map(|s| s.amount).sum();
            print_json(&sales)?;
            println!("{} sale(s), total {:.2}", sales.len(), total);
        }

        Commands::Export { json_file } => {
            require(&gate, Permission::Export)?;
            let bundle = store.export_data()?;

            if let Some(parent) = json_file.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let json_str = serde_json::to_string_pretty(&bundle)?;
            std::fs::write(&json_file, &json_str)
                .with_context(|| format!("Failed to write export: {:?}", json_file))?;

            println!("export: -> {:?}", json_file);
            println!(
                "  {} vehicles, {} parts, {} sales",
                bundle.vehicles.len(),
                bundle.parts.len(),
                bundle.sales.len()
            );
            println!("  {} bytes written", json_str.len());
        }

        Commands::Import { json_file, atomic } => {
            require(&gate, Permission::Import)?;
            let json_str = std::fs::read_to_string(&json_file)
                .with_context(|| format!("Failed to read bundle: {:?}", json_file))?;
            let bundle: ExportBundle = serde_json::from_str(&json_str)
                .with_context(|| "Invalid JSON in export bundle")?;

            println!("import: {:?} (exported {})", json_file, bundle.export_date.to_rfc3339());
            let result = if atomic {
                store.import_data_atomic(&bundle)
            } else {
                store.import_data(&bundle)
            };
            match result {
                Ok(summary) => println!(
                    "  {} vehicles, {} parts, {} sales restored",
                    summary.vehicles, summary.parts, summary.sales
                ),
                Err(StoreError::ImportAborted { committed, source }) => {
                    eprintln!("  FAILED: {}", source);
                    eprintln!("  {} record(s) were committed before the failure and remain.", committed);
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("  FAILED: {} (nothing was written)", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
