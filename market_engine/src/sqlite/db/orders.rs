use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};

use super::refunds;
use crate::{
    db_types::{AccessToken, Cents, CustomerInfo, NewOrder, Order, OrderId, OrderItem, OrderStatusType, VendorId},
    order_objects::{OrderQueryFilter, OrderSummary},
};

/// The flat `orders` row. Line items and refunds live in their own tables and are attached by [`assemble`].
#[derive(Debug, Clone, FromRow)]
struct OrderRow {
    id: OrderId,
    vendor_id: VendorId,
    order_number: String,
    access_token: AccessToken,
    customer_name: String,
    customer_address: String,
    customer_email: String,
    sub_total: Cents,
    shipping: Cents,
    total: Cents,
    status: OrderStatusType,
    vendor_note: Option<String>,
    payment_intent: String,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

async fn assemble(row: OrderRow, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let items = fetch_order_items(row.id, conn).await?;
    let refunds = refunds::fetch_refunds_for_order(row.id, conn).await?;
    Ok(Order {
        id: row.id,
        vendor_id: row.vendor_id,
        order_number: row.order_number,
        access_token: row.access_token,
        customer: CustomerInfo {
            name: row.customer_name,
            address: row.customer_address,
            email: row.customer_email,
        },
        items,
        sub_total: row.sub_total,
        shipping: row.shipping,
        total: row.total,
        status: row.status,
        vendor_note: row.vendor_note,
        payment_intent: row.payment_intent,
        paid_at: row.paid_at,
        refunds,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// Inserts the order and its line items. This is not atomic. Embed the call in a transaction (and pass `&mut tx`) when
/// the order must be stored together with other changes.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<OrderId, sqlx::Error> {
    let (id,): (OrderId,) = sqlx::query_as(
        r#"
            INSERT INTO orders (
                vendor_id,
                order_number,
                access_token,
                customer_name,
                customer_address,
                customer_email,
                sub_total,
                shipping,
                total,
                payment_intent,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id;
        "#,
    )
    .bind(order.vendor_id)
    .bind(&order.order_number)
    .bind(order.access_token)
    .bind(order.customer.name)
    .bind(order.customer.address)
    .bind(order.customer.email)
    .bind(order.sub_total)
    .bind(order.shipping)
    .bind(order.total)
    .bind(order.payment_intent)
    .bind(order.created_at)
    .bind(order.created_at)
    .fetch_one(&mut *conn)
    .await?;
    for (position, item) in order.items.into_iter().enumerate() {
        insert_order_item(id, position as i64, item, conn).await?;
    }
    debug!("🗃️ Order {} inserted with id {}", order.order_number, id.value());
    Ok(id)
}

async fn insert_order_item(
    order_id: OrderId,
    position: i64,
    item: OrderItem,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO order_items (
                order_id,
                position,
                product_id,
                variation_id,
                product_name,
                descriptor,
                unit_price,
                unit_shipping,
                quantity
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9);
        "#,
    )
    .bind(order_id)
    .bind(position)
    .bind(item.product_id)
    .bind(item.variation_id)
    .bind(item.product_name)
    .bind(item.descriptor)
    .bind(item.unit_price)
    .bind(item.unit_shipping)
    .bind(item.quantity)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_order_items(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT product_id, variation_id, product_name, descriptor, unit_price, unit_shipping, quantity
            FROM order_items WHERE order_id = $1 ORDER BY position;
        "#,
    )
    .bind(order_id)
    .fetch_all(conn)
    .await
}

pub async fn fetch_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let row: Option<OrderRow> =
        sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(&mut *conn).await?;
    match row {
        Some(row) => Ok(Some(assemble(row, conn).await?)),
        None => Ok(None),
    }
}

pub async fn fetch_order_by_payment_intent(
    payment_intent: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let row: Option<OrderRow> = sqlx::query_as("SELECT * FROM orders WHERE payment_intent = $1")
        .bind(payment_intent)
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => Ok(Some(assemble(row, conn).await?)),
        None => Ok(None),
    }
}

/// Returns `false` if no order has the given id.
pub async fn update_order_status(
    order_id: OrderId,
    status: OrderStatusType,
    note: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET status = $1, vendor_note = COALESCE($2, vendor_note), updated_at = $3 WHERE id = $4",
    )
    .bind(status)
    .bind(note)
    .bind(Utc::now())
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Records the time of the first confirmed payment. Later calls leave the original time in place.
pub async fn mark_paid(order_id: OrderId, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    let now = Utc::now();
    sqlx::query("UPDATE orders SET paid_at = COALESCE(paid_at, $1), updated_at = $2 WHERE id = $3")
        .bind(now)
        .bind(now)
        .bind(order_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Fetches the vendor's orders according to the criteria in the `OrderQueryFilter`, newest first.
pub async fn search_orders(
    vendor_id: VendorId,
    query: OrderQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderSummary>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new(
        r#"
    SELECT
        id,
        order_number,
        customer_name,
        customer_email,
        total,
        (SELECT COALESCE(SUM(amount), 0) FROM refunds WHERE refunds.order_id = orders.id) AS refunded,
        status,
        created_at
    FROM orders
    WHERE vendor_id = "#,
    );
    builder.push_bind(vendor_id);
    if let Some(since) = query.since {
        builder.push(" AND julianday(created_at) >= julianday(");
        builder.push_bind(since);
        builder.push(")");
    }
    if let Some(until) = query.until {
        builder.push(" AND julianday(created_at) < julianday(");
        builder.push_bind(until);
        builder.push(")");
    }
    if let Some(statuses) = query.status.filter(|s| !s.is_empty()) {
        builder.push(" AND status IN (");
        let mut list = builder.separated(", ");
        for status in statuses {
            list.push_bind(status);
        }
        list.push_unseparated(")");
    }
    builder.push(" ORDER BY julianday(created_at) DESC, id DESC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<OrderSummary>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_orders: {}", orders.len());
    Ok(orders)
}
