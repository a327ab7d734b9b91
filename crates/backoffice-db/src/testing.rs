//! Shared fixture for service and repository tests.

use std::path::Path;

use chrono::NaiveDate;

use backoffice_core::{
    ActiveStatus, Actor, CustomerDetails, DeliveryContact, DeliveryVendor, Employee, EmployeeRole,
    Location, LocationStatus, NewOrder, PaymentMethod, Product, Promotion, ReturnReceipt,
    ReturnRequest, SaleDetail,
};

use crate::repository::{new_id, reference};
use crate::{Database, DbConfig};

/// A database seeded with one of every kind of reference row.
pub(crate) struct Fixture {
    pub db: Database,
    pub actor: Actor,
    pub store: String,
    pub warehouse: String,
    pub closed_store: String,
    pub seller: String,
    pub courier: String,
    pub inactive_employee: String,
    /// Unit price 25_000.
    pub product_a: String,
    /// Unit price 100.
    pub product_b: String,
    pub retired_product: String,
    pub cash: String,
    pub card: String,
    pub vendor: String,
    /// 10% off, no campaign window.
    pub promo_10: String,
    pub expired_promo: String,
}

impl Fixture {
    pub async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Self::seed(db).await
    }

    /// File-backed database allowing concurrent connections.
    pub async fn on_disk(dir: &Path) -> Self {
        let db = Database::new(DbConfig::new(dir.join("backoffice.db")).max_connections(4))
            .await
            .unwrap();
        Self::seed(db).await
    }

    async fn seed(db: Database) -> Self {
        let mut conn = db.pool().acquire().await.unwrap();

        let location = |name: &str, status| Location {
            id: new_id(),
            name: name.to_string(),
            status,
        };
        let store = location("Main Street", LocationStatus::Open);
        let warehouse = location("Warehouse", LocationStatus::Open);
        let closed_store = location("Old Town", LocationStatus::Closed);
        for l in [&store, &warehouse, &closed_store] {
            reference::insert_location(&mut conn, l).await.unwrap();
        }

        let employee = |first: &str, role, is_inactive| Employee {
            id: new_id(),
            first_name: first.to_string(),
            last_name: "Tran".to_string(),
            role,
            is_inactive,
        };
        let seller = employee("Linh", EmployeeRole::Sales, false);
        let courier = employee("Bao", EmployeeRole::Delivery, false);
        let inactive_employee = employee("Quan", EmployeeRole::Sales, true);
        for e in [&seller, &courier, &inactive_employee] {
            reference::insert_employee(&mut conn, e).await.unwrap();
        }

        let product = |sku: &str, cents, status| Product {
            id: new_id(),
            sku: sku.to_string(),
            name: format!("Product {sku}"),
            unit_price_cents: cents,
            status,
        };
        let product_a = product("SKU-A", 25_000, ActiveStatus::Active);
        let product_b = product("SKU-B", 100, ActiveStatus::Active);
        let retired_product = product("SKU-R", 500, ActiveStatus::Inactive);
        for p in [&product_a, &product_b, &retired_product] {
            reference::insert_product(&mut conn, p).await.unwrap();
        }

        let cash = PaymentMethod { id: new_id(), name: "Cash".to_string() };
        let card = PaymentMethod { id: new_id(), name: "Card".to_string() };
        for m in [&cash, &card] {
            reference::insert_payment_method(&mut conn, m).await.unwrap();
        }

        let vendor = DeliveryVendor { id: new_id(), name: "FastShip".to_string() };
        reference::insert_vendor(&mut conn, &vendor).await.unwrap();

        let promo_10 = Promotion {
            id: new_id(),
            code: "TEN".to_string(),
            discount_percent_bps: Some(1000),
            discount_value_cents: None,
            status: ActiveStatus::Active,
            campaign_name: None,
            start_date: None,
            end_date: None,
        };
        let expired_promo = Promotion {
            id: new_id(),
            code: "WINTER".to_string(),
            discount_percent_bps: None,
            discount_value_cents: Some(50),
            status: ActiveStatus::Active,
            campaign_name: Some("Winter sale".to_string()),
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2020, 1, 31),
        };
        for p in [&promo_10, &expired_promo] {
            reference::insert_promotion(&mut conn, p).await.unwrap();
        }

        drop(conn);

        Fixture {
            db,
            actor: Actor::new("u-1", "admin"),
            store: store.id,
            warehouse: warehouse.id,
            closed_store: closed_store.id,
            seller: seller.id,
            courier: courier.id,
            inactive_employee: inactive_employee.id,
            product_a: product_a.id,
            product_b: product_b.id,
            retired_product: retired_product.id,
            cash: cash.id,
            card: card.id,
            vendor: vendor.id,
            promo_10: promo_10.id,
            expired_promo: expired_promo.id,
        }
    }

    pub async fn stock(&self, product_id: &str, location_id: &str, quantity: i64) {
        self.db.set_stock(product_id, location_id, quantity).await.unwrap();
    }

    /// Inserts an active product and returns its id.
    pub async fn product(&self, sku: &str, unit_price_cents: i64) -> String {
        let product = Product {
            id: new_id(),
            sku: sku.to_string(),
            name: format!("Product {sku}"),
            unit_price_cents,
            status: ActiveStatus::Active,
        };
        let mut conn = self.db.pool().acquire().await.unwrap();
        reference::insert_product(&mut conn, &product).await.unwrap();
        product.id
    }

    pub async fn available(&self, product_id: &str, location_id: &str) -> i64 {
        self.db.available_stock(product_id, location_id).await.unwrap()
    }

    /// A valid order request at the main store.
    pub fn new_order(&self) -> NewOrder {
        let customer = CustomerDetails {
            phone: "0901234567".to_string(),
            first_name: "Mai".to_string(),
            last_name: "Pham".to_string(),
            email: Some("mai@example.com".to_string()),
            address: "12 Hang Bac, Hanoi".to_string(),
        };
        NewOrder {
            delivery: DeliveryContact::from_customer(&customer),
            customer,
            employee_id: self.seller.clone(),
            location_id: self.store.clone(),
            note: None,
        }
    }

    /// Creates an OPEN order at the main store holding `lines`.
    pub async fn open_order<S: AsRef<str>>(&self, lines: &[(S, i64)]) -> String {
        let orders = self.db.orders();
        let order = orders.create_order(&self.actor, self.new_order()).await.unwrap();
        for (product_id, quantity) in lines {
            orders
                .add_item(&self.actor, &order.order.id, product_id.as_ref(), *quantity, None)
                .await
                .unwrap();
        }
        order.order.id
    }

    /// Creates and confirms an order paid in cash.
    pub async fn invoice<S: AsRef<str>>(&self, lines: &[(S, i64)]) -> SaleDetail {
        let order_id = self.open_order(lines).await;
        self.db
            .orders()
            .confirm_order(&self.actor, &order_id, &self.cash)
            .await
            .unwrap()
    }

    pub async fn invoice_with_promo(&self, product_id: &str, quantity: i64, promotion_id: &str) -> SaleDetail {
        let orders = self.db.orders();
        let order = orders.create_order(&self.actor, self.new_order()).await.unwrap();
        orders
            .add_item(&self.actor, &order.order.id, product_id, quantity, Some(promotion_id))
            .await
            .unwrap();
        orders
            .confirm_order(&self.actor, &order.order.id, &self.cash)
            .await
            .unwrap()
    }

    /// Returns one unit to the main store.
    pub async fn return_one(&self, sale_id: &str, product_id: &str) -> ReturnReceipt {
        self.db
            .returns()
            .process_return(
                &self.actor,
                ReturnRequest {
                    original_sale_id: sale_id.to_string(),
                    product_id: product_id.to_string(),
                    quantity: 1,
                    refund_payment_method_id: self.cash.clone(),
                    return_location_id: self.store.clone(),
                },
            )
            .await
            .unwrap()
    }
}
