use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use super::on_unique_violation;
use crate::{
    db_types::{NewVendor, Vendor, VendorId},
    traits::InventoryError,
};

pub async fn insert_vendor(vendor: NewVendor, conn: &mut SqliteConnection) -> Result<Vendor, InventoryError> {
    let now = Utc::now();
    let email = vendor.email.clone();
    let vendor: Vendor = sqlx::query_as(
        r#"
            INSERT INTO vendors (store, owner, email, notify_new_orders, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(vendor.store)
    .bind(vendor.owner)
    .bind(vendor.email)
    .bind(vendor.notify_new_orders)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await
    .map_err(|e| on_unique_violation(e, || InventoryError::VendorAlreadyExists(email)))?;
    debug!("🗃️ Vendor '{}' inserted with id {}", vendor.store, vendor.id.value());
    Ok(vendor)
}

pub async fn fetch_vendor(vendor_id: VendorId, conn: &mut SqliteConnection) -> Result<Option<Vendor>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM vendors WHERE id = $1").bind(vendor_id).fetch_optional(conn).await
}

pub async fn fetch_vendor_by_account(
    account_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Vendor>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM vendors WHERE connected_account_id = $1")
        .bind(account_id)
        .fetch_optional(conn)
        .await
}

/// Links a connected account to the vendor. The account is marked inactive until the processor says otherwise.
pub async fn set_connected_account(
    vendor_id: VendorId,
    account_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Vendor>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE vendors
            SET connected_account_id = $1, connected_account_active = FALSE, updated_at = $2
            WHERE id = $3
            RETURNING *;
        "#,
    )
    .bind(account_id)
    .bind(Utc::now())
    .bind(vendor_id)
    .fetch_optional(conn)
    .await
}

pub async fn set_connected_account_status(
    account_id: &str,
    active: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<Vendor>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE vendors SET connected_account_active = $1, updated_at = $2
            WHERE connected_account_id = $3
            RETURNING *;
        "#,
    )
    .bind(active)
    .bind(Utc::now())
    .bind(account_id)
    .fetch_optional(conn)
    .await
}
