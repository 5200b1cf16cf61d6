use chrono::Utc;
use log::debug;
use sqlx::{types::Json, SqliteConnection};

use crate::db_types::{
    NewProduct,
    NewVariation,
    Product,
    ProductId,
    ProductUpdate,
    Variation,
    VariationId,
    VendorId,
};

pub async fn insert_product(
    vendor_id: VendorId,
    product: NewProduct,
    conn: &mut SqliteConnection,
) -> Result<Product, sqlx::Error> {
    let product: Product = sqlx::query_as(
        r#"
            INSERT INTO products (vendor_id, name, description, tags, images, active, external_product_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(vendor_id)
    .bind(product.name)
    .bind(product.description)
    .bind(Json(product.tags))
    .bind(Json(product.images))
    .bind(product.active)
    .bind(product.external_product_id)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Product '{}' inserted with id {}", product.name, product.id.value());
    Ok(product)
}

pub async fn fetch_product(product_id: ProductId, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await
}

/// Applies the non-empty fields of `update`. Returns `None` if the product does not exist.
pub async fn update_product(
    product_id: ProductId,
    update: ProductUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE products SET
                name = COALESCE($1, name),
                description = COALESCE($2, description),
                tags = COALESCE($3, tags),
                images = COALESCE($4, images),
                active = COALESCE($5, active)
            WHERE id = $6
            RETURNING *;
        "#,
    )
    .bind(update.name)
    .bind(update.description)
    .bind(update.tags.map(Json))
    .bind(update.images.map(Json))
    .bind(update.active)
    .bind(product_id)
    .fetch_optional(conn)
    .await
}

pub async fn archive_product(product_id: ProductId, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("UPDATE products SET archived = TRUE WHERE id = $1 RETURNING *;")
        .bind(product_id)
        .fetch_optional(conn)
        .await
}

/// The vendor's products that have not been archived, optionally leaving out inactive ones.
pub async fn fetch_products_for_vendor(
    vendor_id: VendorId,
    include_inactive: bool,
    conn: &mut SqliteConnection,
) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT * FROM products
            WHERE vendor_id = $1 AND archived = FALSE AND (active = TRUE OR $2 = TRUE)
            ORDER BY id;
        "#,
    )
    .bind(vendor_id)
    .bind(include_inactive)
    .fetch_all(conn)
    .await
}

pub async fn insert_variation(
    product_id: ProductId,
    variation: NewVariation,
    conn: &mut SqliteConnection,
) -> Result<Variation, sqlx::Error> {
    let variation: Variation = sqlx::query_as(
        r#"
            INSERT INTO variations (product_id, descriptor, price, shipping, quantity, purchase_option, external_price_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(product_id)
    .bind(variation.descriptor)
    .bind(variation.price)
    .bind(variation.shipping)
    .bind(variation.quantity)
    .bind(variation.purchase_option)
    .bind(variation.external_price_id)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Variation '{}' added to {product_id}", variation.descriptor);
    Ok(variation)
}

/// Overwrites the variation's catalog fields. Returns `None` if the variation does not exist.
pub async fn update_variation(
    variation_id: VariationId,
    variation: NewVariation,
    conn: &mut SqliteConnection,
) -> Result<Option<Variation>, sqlx::Error> {
    let variation: Option<Variation> = sqlx::query_as(
        r#"
            UPDATE variations SET descriptor = $1, price = $2, shipping = $3, quantity = $4, purchase_option = $5
            WHERE id = $6
            RETURNING *;
        "#,
    )
    .bind(variation.descriptor)
    .bind(variation.price)
    .bind(variation.shipping)
    .bind(variation.quantity)
    .bind(variation.purchase_option)
    .bind(variation_id)
    .fetch_optional(conn)
    .await?;
    if let Some(v) = &variation {
        debug!("🗃️ Variation {variation_id} of {} updated", v.product_id);
    }
    Ok(variation)
}

pub async fn archive_variation(
    variation_id: VariationId,
    conn: &mut SqliteConnection,
) -> Result<Option<Variation>, sqlx::Error> {
    sqlx::query_as("UPDATE variations SET archived = TRUE WHERE id = $1 RETURNING *;")
        .bind(variation_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_variation(
    variation_id: VariationId,
    conn: &mut SqliteConnection,
) -> Result<Option<Variation>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM variations WHERE id = $1").bind(variation_id).fetch_optional(conn).await
}

pub async fn fetch_variations_for_product(
    product_id: ProductId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Variation>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM variations WHERE product_id = $1 ORDER BY id")
        .bind(product_id)
        .fetch_all(conn)
        .await
}

/// Takes `quantity` units out of the variation's stock, provided there is enough stock left and the variation is
/// still on sale. Returns `false` if the stock was not touched.
pub async fn reserve_stock(
    variation_id: VariationId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE variations SET quantity = quantity - $1
            WHERE id = $2 AND quantity >= $3 AND archived = FALSE AND purchase_option IN ('ship', 'buy');
        "#,
    )
    .bind(quantity)
    .bind(variation_id)
    .bind(quantity)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
