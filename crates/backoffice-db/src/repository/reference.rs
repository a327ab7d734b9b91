//! # Reference Data Repository
//!
//! Reads of the rows the lifecycle depends on but does not own: employees,
//! locations, products, payment methods, delivery vendors and promotions.
//! Administration of these tables happens elsewhere; the listings and
//! inserts here serve the binaries and tests.

use sqlx::SqliteConnection;
use tracing::debug;

use backoffice_core::validation::{validate_product, validate_promotion};
use backoffice_core::{
    CoreResult, DeliveryVendor, Employee, EmployeeRole, Location, PaymentMethod, Product, Promotion,
};

use crate::error::{DbError, DbResult};

// =============================================================================
// Reads
// =============================================================================

pub async fn get_employee(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Employee>> {
    let employee = sqlx::query_as::<_, Employee>(
        "SELECT id, first_name, last_name, role, is_inactive FROM employees WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(employee)
}

pub async fn get_location(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Location>> {
    let location =
        sqlx::query_as::<_, Location>("SELECT id, name, status FROM locations WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    Ok(location)
}

pub async fn get_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        "SELECT id, sku, name, unit_price_cents, status FROM products WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(product)
}

pub async fn get_payment_method(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<PaymentMethod>> {
    let method = sqlx::query_as::<_, PaymentMethod>("SELECT id, name FROM payment_methods WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(method)
}

pub async fn get_vendor(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<DeliveryVendor>> {
    let vendor = sqlx::query_as::<_, DeliveryVendor>("SELECT id, name FROM delivery_vendors WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(vendor)
}

pub async fn get_promotion(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Promotion>> {
    let promotion = sqlx::query_as::<_, Promotion>(
        r#"
        SELECT id, code, discount_percent_bps, discount_value_cents, status,
               campaign_name, start_date, end_date
        FROM promotions
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(promotion)
}

// =============================================================================
// Listings
// =============================================================================

pub async fn count_products(conn: &mut SqliteConnection) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(&mut *conn)
        .await?;

    Ok(count)
}

pub async fn list_active_products(conn: &mut SqliteConnection) -> DbResult<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT id, sku, name, unit_price_cents, status FROM products WHERE status = 'ACTIVE' ORDER BY sku",
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(products)
}

pub async fn list_open_locations(conn: &mut SqliteConnection) -> DbResult<Vec<Location>> {
    let locations =
        sqlx::query_as::<_, Location>("SELECT id, name, status FROM locations WHERE status = 'OPEN' ORDER BY name")
            .fetch_all(&mut *conn)
            .await?;

    Ok(locations)
}

/// Active employees holding `role`.
pub async fn list_employees(conn: &mut SqliteConnection, role: EmployeeRole) -> DbResult<Vec<Employee>> {
    let employees = sqlx::query_as::<_, Employee>(
        r#"
        SELECT id, first_name, last_name, role, is_inactive
        FROM employees
        WHERE role = ?1 AND is_inactive = 0
        ORDER BY last_name, first_name
        "#,
    )
    .bind(role)
    .fetch_all(&mut *conn)
    .await?;

    Ok(employees)
}

pub async fn list_payment_methods(conn: &mut SqliteConnection) -> DbResult<Vec<PaymentMethod>> {
    let methods = sqlx::query_as::<_, PaymentMethod>("SELECT id, name FROM payment_methods ORDER BY name")
        .fetch_all(&mut *conn)
        .await?;

    Ok(methods)
}

// =============================================================================
// Inserts (seeding)
// =============================================================================

pub async fn insert_employee(conn: &mut SqliteConnection, employee: &Employee) -> DbResult<()> {
    debug!(id = %employee.id, role = %employee.role, "Inserting employee");

    sqlx::query(
        "INSERT INTO employees (id, first_name, last_name, role, is_inactive) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(&employee.id)
    .bind(&employee.first_name)
    .bind(&employee.last_name)
    .bind(employee.role)
    .bind(employee.is_inactive)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn insert_location(conn: &mut SqliteConnection, location: &Location) -> DbResult<()> {
    debug!(id = %location.id, name = %location.name, "Inserting location");

    sqlx::query("INSERT INTO locations (id, name, status) VALUES (?1, ?2, ?3)")
        .bind(&location.id)
        .bind(&location.name)
        .bind(location.status)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Inserts a product after checking its SKU, name and price.
pub async fn insert_product(conn: &mut SqliteConnection, product: &Product) -> CoreResult<()> {
    validate_product(product)?;
    debug!(id = %product.id, sku = %product.sku, "Inserting product");

    sqlx::query(
        "INSERT INTO products (id, sku, name, unit_price_cents, status) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(&product.id)
    .bind(&product.sku)
    .bind(&product.name)
    .bind(product.unit_price_cents)
    .bind(product.status)
    .execute(&mut *conn)
    .await
    .map_err(DbError::from)?;

    Ok(())
}

pub async fn insert_payment_method(conn: &mut SqliteConnection, method: &PaymentMethod) -> DbResult<()> {
    sqlx::query("INSERT INTO payment_methods (id, name) VALUES (?1, ?2)")
        .bind(&method.id)
        .bind(&method.name)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn insert_vendor(conn: &mut SqliteConnection, vendor: &DeliveryVendor) -> DbResult<()> {
    sqlx::query("INSERT INTO delivery_vendors (id, name) VALUES (?1, ?2)")
        .bind(&vendor.id)
        .bind(&vendor.name)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Inserts a promotion after checking its discount terms and campaign window.
pub async fn insert_promotion(conn: &mut SqliteConnection, promotion: &Promotion) -> CoreResult<()> {
    validate_promotion(promotion)?;
    debug!(id = %promotion.id, code = %promotion.code, "Inserting promotion");

    sqlx::query(
        r#"
        INSERT INTO promotions (
            id, code, discount_percent_bps, discount_value_cents, status,
            campaign_name, start_date, end_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&promotion.id)
    .bind(&promotion.code)
    .bind(promotion.discount_percent_bps)
    .bind(promotion.discount_value_cents)
    .bind(promotion.status)
    .bind(&promotion.campaign_name)
    .bind(promotion.start_date)
    .bind(promotion.end_date)
    .execute(&mut *conn)
    .await
    .map_err(DbError::from)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    #[tokio::test]
    async fn test_listings_skip_retired_rows() {
        let fx = Fixture::new().await;
        let mut conn = fx.db.pool().acquire().await.unwrap();

        assert_eq!(count_products(&mut conn).await.unwrap(), 3);

        let products = list_active_products(&mut conn).await.unwrap();
        assert_eq!(products.len(), 2);
        assert!(products.iter().all(|p| p.id != fx.retired_product));

        let locations = list_open_locations(&mut conn).await.unwrap();
        assert_eq!(locations.len(), 2);
        assert!(locations.iter().all(|l| l.id != fx.closed_store));

        let sellers = list_employees(&mut conn, EmployeeRole::Sales).await.unwrap();
        assert_eq!(sellers.len(), 1);
        assert_eq!(sellers[0].id, fx.seller);
        assert!(sellers.iter().all(|e| e.id != fx.inactive_employee));

        let couriers = list_employees(&mut conn, EmployeeRole::Delivery).await.unwrap();
        assert_eq!(couriers[0].id, fx.courier);

        assert_eq!(list_payment_methods(&mut conn).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_out_of_range_rows_are_not_stored() {
        let fx = Fixture::new().await;
        let mut conn = fx.db.pool().acquire().await.unwrap();

        let negative_price = Product {
            id: "p-neg".to_string(),
            sku: "SKU-NEG".to_string(),
            name: "Broken".to_string(),
            unit_price_cents: -1,
            status: backoffice_core::ActiveStatus::Active,
        };
        let err = insert_product(&mut conn, &negative_price).await.unwrap_err();
        assert!(matches!(err, backoffice_core::CoreError::Validation(_)));
        assert!(get_product(&mut conn, "p-neg").await.unwrap().is_none());
        assert_eq!(count_products(&mut conn).await.unwrap(), 3);

        let over_discount = Promotion {
            id: "promo-150".to_string(),
            code: "HALFAGAIN".to_string(),
            discount_percent_bps: Some(15_000),
            discount_value_cents: None,
            status: backoffice_core::ActiveStatus::Active,
            campaign_name: None,
            start_date: None,
            end_date: None,
        };
        let err = insert_promotion(&mut conn, &over_discount).await.unwrap_err();
        assert!(matches!(err, backoffice_core::CoreError::Validation(_)));
        assert!(get_promotion(&mut conn, "promo-150").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_promotion_round_trips_campaign_window() {
        let fx = Fixture::new().await;
        let mut conn = fx.db.pool().acquire().await.unwrap();

        let promo = get_promotion(&mut conn, &fx.expired_promo).await.unwrap().unwrap();
        assert_eq!(promo.discount_value_cents, Some(50));
        assert_eq!(promo.end_date, chrono::NaiveDate::from_ymd_opt(2020, 1, 31));
        assert!(get_vendor(&mut conn, &fx.vendor).await.unwrap().is_some());
    }
}
