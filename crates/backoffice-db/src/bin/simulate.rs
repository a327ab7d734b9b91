//! # Order Workload Simulator
//!
//! Runs concurrent sales against a seeded database and checks that stock
//! never goes negative.
//!
//! ## Usage
//! ```bash
//! cargo run -p backoffice-db --bin seed -- --stock 20
//! cargo run -p backoffice-db --bin simulate -- --workers 8 --orders 25
//! ```
//!
//! Each worker creates orders of one to three products at the first open
//! store and confirms them through [`retry_on_conflict`]. Confirmations that
//! run out of stock are counted, not retried.

use std::env;
use std::time::Instant;

use backoffice_core::{
    Actor, CoreError, CustomerDetails, DeliveryContact, EmployeeRole, NewOrder, Product,
};
use backoffice_db::repository::reference;
use backoffice_db::{init_tracing, retry_on_conflict, BackofficeConfig, Database, RetryPolicy};

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    confirmed: usize,
    out_of_stock: usize,
    failed: usize,
}

impl std::ops::AddAssign for Tally {
    fn add_assign(&mut self, other: Tally) {
        self.confirmed += other.confirmed;
        self.out_of_stock += other.out_of_stock;
        self.failed += other.failed;
    }
}

/// Ids every worker shares.
#[derive(Clone)]
struct Workload {
    db: Database,
    policy: RetryPolicy,
    location_id: String,
    employee_id: String,
    payment_method_id: String,
    products: Vec<Product>,
    orders_per_worker: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut workers: usize = 4;
    let mut orders: usize = 20;
    let mut db_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--workers" | "-w" => {
                if i + 1 < args.len() {
                    workers = args[i + 1].parse().unwrap_or(4);
                    i += 1;
                }
            }
            "--orders" | "-n" => {
                if i + 1 < args.len() {
                    orders = args[i + 1].parse().unwrap_or(20);
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
                println!("Back Office Order Workload Simulator");
                println!();
                println!("Usage: simulate [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -w, --workers <N>  Concurrent workers (default: 4)");
                println!("  -n, --orders <N>   Orders per worker (default: 20)");
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

    let db = Database::new(config.db_config())
        .await?
        .with_order_settings(config.orders.clone());

    let workload = {
        let mut conn = db.pool().acquire().await?;

        let location = reference::list_open_locations(&mut conn).await?.into_iter().next();
        let employee = reference::list_employees(&mut conn, EmployeeRole::Sales)
            .await?
            .into_iter()
            .next();
        let method = reference::list_payment_methods(&mut conn).await?.into_iter().next();
        let products = reference::list_active_products(&mut conn).await?;

        match (location, employee, method) {
            (Some(location), Some(employee), Some(method)) if !products.is_empty() => Workload {
                db: db.clone(),
                policy: RetryPolicy::from(&config.retry),
                location_id: location.id,
                employee_id: employee.id,
                payment_method_id: method.id,
                products,
                orders_per_worker: orders,
            },
            _ => {
                eprintln!("Database has no reference data. Run the seed binary first.");
                return Ok(());
            }
        }
    };

    println!("Back Office Order Workload Simulator");
    println!("====================================");
    println!("Database: {}", config.database.path.display());
    println!("Workers:  {} x {} orders", workers, orders);
    println!("Products: {}", workload.products.len());
    println!();

    let start = Instant::now();

    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            let workload = workload.clone();
            tokio::spawn(async move { run_worker(worker, workload).await })
        })
        .collect();

    let mut tally = Tally::default();
    for handle in handles {
        tally += handle.await?;
    }

    let elapsed = start.elapsed();
    println!("✓ Confirmed:    {}", tally.confirmed);
    println!("  Out of stock: {}", tally.out_of_stock);
    println!("  Failed:       {}", tally.failed);
    println!(
        "  Rate: {:.0} orders/second",
        (tally.confirmed + tally.out_of_stock + tally.failed) as f64 / elapsed.as_secs_f64()
    );

    let mut negative = 0;
    for product in &workload.products {
        if db.available_stock(&product.id, &workload.location_id).await? < 0 {
            negative += 1;
        }
    }
    if negative == 0 {
        println!("✓ No negative stock");
    } else {
        println!("✗ {} products with negative stock", negative);
    }

    db.close().await;
    Ok(())
}

async fn run_worker(worker: usize, workload: Workload) -> Tally {
    let actor = Actor::new(format!("sim-{worker}"), "sales");
    let orders = workload.db.orders();
    let mut tally = Tally::default();

    for n in 0..workload.orders_per_worker {
        let seed = worker * 7919 + n * 31;

        let customer = CustomerDetails {
            phone: format!("09{:08}", worker * 1000 + n % 50),
            first_name: format!("Customer{n}"),
            last_name: format!("Worker{worker}"),
            email: None,
            address: format!("{} Market Street", n + 1),
        };
        let request = NewOrder {
            delivery: DeliveryContact::from_customer(&customer),
            customer,
            employee_id: workload.employee_id.clone(),
            location_id: workload.location_id.clone(),
            note: None,
        };

        let order_id = match retry_on_conflict(&workload.policy, || {
            orders.create_order(&actor, request.clone())
        })
        .await
        {
            Ok(order) => order.order.id,
            Err(e) => {
                tracing::warn!(worker, error = %e, "Order creation failed");
                tally.failed += 1;
                continue;
            }
        };

        let lines = 1 + seed % 3;
        let mut added = 0;
        for line in 0..lines {
            let product = &workload.products[(seed + line * 13) % workload.products.len()];
            let quantity = 1 + ((seed + line) % 3) as i64;
            match retry_on_conflict(&workload.policy, || {
                orders.add_item(&actor, &order_id, &product.id, quantity, None)
            })
            .await
            {
                Ok(_) => added += 1,
                // advisory stock check or a product picked twice
                Err(CoreError::InsufficientStock { .. }) | Err(CoreError::DuplicateItem { .. }) => {}
                Err(e) => tracing::warn!(worker, order_id = %order_id, error = %e, "Add item failed"),
            }
        }

        if added == 0 {
            let _ = orders.cancel_order(&actor, &order_id).await;
            tally.out_of_stock += 1;
            continue;
        }

        match retry_on_conflict(&workload.policy, || {
            orders.confirm_order(&actor, &order_id, &workload.payment_method_id)
        })
        .await
        {
            Ok(_) => tally.confirmed += 1,
            Err(CoreError::InsufficientStock { .. }) => {
                let _ = orders.cancel_order(&actor, &order_id).await;
                tally.out_of_stock += 1;
            }
            Err(e) => {
                tracing::warn!(worker, order_id = %order_id, error = %e, "Confirmation failed");
                tally.failed += 1;
            }
        }
    }

    tally
}
