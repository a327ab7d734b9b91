//! # Seed Data Generator
//!
//! Populates a back office database with reference data and stock for
//! development.
//!
//! ## Usage
//! ```bash
//! # Default catalog, 50 units per product per location
//! cargo run -p backoffice-db --bin seed
//!
//! # Custom stock level
//! cargo run -p backoffice-db --bin seed -- --stock 200
//!
//! # Specify database path
//! cargo run -p backoffice-db --bin seed -- --db ./data/backoffice.db
//! ```
//!
//! ## Generated Data
//! - Locations: two open stores, one warehouse, one closed store
//! - Employees: sales staff and delivery staff
//! - Payment methods, one delivery vendor, two promotions
//! - Products: every catalog name in three sizes
//! - Stock for each active product at each open location

use std::env;

use chrono::{Duration, Utc};

use backoffice_core::{
    ActiveStatus, DeliveryVendor, Employee, EmployeeRole, Location, LocationStatus, PaymentMethod,
    Product, Promotion,
};
use backoffice_db::repository::{new_id, reference};
use backoffice_db::{init_tracing, BackofficeConfig, Database, InventoryLedger};

/// Product names per category code.
const CATALOG: &[(&str, &[&str])] = &[
    ("APP", &["Rice Cooker", "Kettle", "Blender", "Toaster", "Fan"]),
    ("HOM", &["Bath Towel", "Pillow", "Bed Sheet", "Curtain", "Rug"]),
    ("KIT", &["Frying Pan", "Stock Pot", "Knife Set", "Cutting Board", "Mug"]),
];

/// Size name and price multiplier in percent.
const SIZES: &[(&str, i64)] = &[("S", 100), ("M", 140), ("L", 185)];

const LOCATIONS: &[(&str, LocationStatus)] = &[
    ("Downtown Store", LocationStatus::Open),
    ("Riverside Store", LocationStatus::Open),
    ("Central Warehouse", LocationStatus::Open),
    ("Old Market Store", LocationStatus::Closed),
];

const EMPLOYEES: &[(&str, &str, EmployeeRole)] = &[
    ("Lan", "Nguyen", EmployeeRole::Sales),
    ("Minh", "Tran", EmployeeRole::Sales),
    ("Hoa", "Le", EmployeeRole::Manager),
    ("Tuan", "Pham", EmployeeRole::Delivery),
    ("Khoa", "Vo", EmployeeRole::Delivery),
];

const PAYMENT_METHODS: &[&str] = &["Cash", "Card", "Bank Transfer"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut stock: i64 = 50;
    let mut db_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--stock" | "-s" => {
                if i + 1 < args.len() {
                    stock = args[i + 1].parse().unwrap_or(50);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Back Office Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --stock <N>    Units per product per open location (default: 50)");
                println!("  -d, --db <PATH>    Database file path (default: from backoffice.toml)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = BackofficeConfig::load_or_default(None);
    if let Some(path) = db_path {
        config.database.path = path.into();
    }

    println!("Back Office Seed Data Generator");
    println!("===============================");
    println!("Database: {}", config.database.path.display());
    println!("Stock:    {} per product per location", stock);
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let mut tx = db.pool().begin().await?;

    if reference::count_products(&mut tx).await? > 0 {
        println!("⚠ Database already has products");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    let mut open_locations = Vec::new();
    for (name, status) in LOCATIONS {
        let location = Location {
            id: new_id(),
            name: name.to_string(),
            status: *status,
        };
        reference::insert_location(&mut tx, &location).await?;
        if location.is_open() {
            open_locations.push(location.id);
        }
    }
    println!("✓ {} locations", LOCATIONS.len());

    for (first, last, role) in EMPLOYEES {
        let employee = Employee {
            id: new_id(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            role: *role,
            is_inactive: false,
        };
        reference::insert_employee(&mut tx, &employee).await?;
    }
    println!("✓ {} employees", EMPLOYEES.len());

    for name in PAYMENT_METHODS {
        let method = PaymentMethod {
            id: new_id(),
            name: name.to_string(),
        };
        reference::insert_payment_method(&mut tx, &method).await?;
    }

    let vendor = DeliveryVendor {
        id: new_id(),
        name: "Express Couriers".to_string(),
    };
    reference::insert_vendor(&mut tx, &vendor).await?;

    for promotion in promotions() {
        reference::insert_promotion(&mut tx, &promotion).await?;
    }
    println!("✓ Payment methods, vendor and promotions");

    let mut generated = 0;
    let now = Utc::now();
    for (category_idx, (category, names)) in CATALOG.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (size, multiplier) in SIZES {
                let product = generate_product(category, name, size, *multiplier, category_idx * 100 + name_idx);
                reference::insert_product(&mut tx, &product).await?;

                for location_id in &open_locations {
                    InventoryLedger::set_quantity(&mut tx, &product.id, location_id, stock, now).await?;
                }
                generated += 1;
            }
        }
    }

    tx.commit().await?;

    let elapsed = start.elapsed();
    println!("✓ Generated {} products in {:?}", generated, elapsed);
    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// One product with a deterministic price.
fn generate_product(category: &str, name: &str, size: &str, multiplier: i64, seed: usize) -> Product {
    let sku = format!("{}-{}-{}", category, name.replace(' ', "").to_uppercase(), size);

    // 50_000 - 499_000 base, scaled by size
    let base_price = 50_000 + ((seed * 37_000) % 450_000) as i64;

    Product {
        id: new_id(),
        sku,
        name: format!("{} ({})", name, size),
        unit_price_cents: base_price * multiplier / 100,
        status: ActiveStatus::Active,
    }
}

/// A standing 10% promotion and a 30-day fixed-value campaign.
fn promotions() -> Vec<Promotion> {
    let today = Utc::now().date_naive();

    vec![
        Promotion {
            id: new_id(),
            code: "MEMBER10".to_string(),
            discount_percent_bps: Some(1_000),
            discount_value_cents: None,
            status: ActiveStatus::Active,
            campaign_name: None,
            start_date: None,
            end_date: None,
        },
        Promotion {
            id: new_id(),
            code: "SEASON20K".to_string(),
            discount_percent_bps: None,
            discount_value_cents: Some(20_000),
            status: ActiveStatus::Active,
            campaign_name: Some("Seasonal sale".to_string()),
            start_date: Some(today),
            end_date: Some(today + Duration::days(30)),
        },
    ]
}
