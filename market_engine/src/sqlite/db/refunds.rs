use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{Cents, OrderId, Refund};

/// Inserts a pending refund of `amount`, but only if the order total minus all existing refunds covers it.
/// The guard and the insert are one statement. Returns `None` if the guard failed.
pub async fn reserve_refund(
    order_id: OrderId,
    amount: Cents,
    conn: &mut SqliteConnection,
) -> Result<Option<Refund>, sqlx::Error> {
    let refund: Option<Refund> = sqlx::query_as(
        r#"
            INSERT INTO refunds (order_id, amount, status, created_at)
            SELECT $1, $2, 'pending', $3 FROM orders
            WHERE orders.id = $4
              AND orders.total - (SELECT COALESCE(SUM(amount), 0) FROM refunds WHERE refunds.order_id = $5) >= $6
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(amount)
    .bind(Utc::now())
    .bind(order_id)
    .bind(order_id)
    .bind(amount)
    .fetch_optional(conn)
    .await?;
    match &refund {
        Some(r) => debug!("🗃️ Refund #{} of {amount} reserved against {order_id}", r.id),
        None => debug!("🗃️ Refund of {amount} against {order_id} exceeds what is left to refund"),
    }
    Ok(refund)
}

pub async fn confirm_refund(
    refund_id: i64,
    external_refund_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Refund>, sqlx::Error> {
    let refund: Option<Refund> = sqlx::query_as(
        r#"
            UPDATE refunds SET status = 'issued', external_refund_id = $1
            WHERE id = $2 AND status = 'pending'
            RETURNING *;
        "#,
    )
    .bind(external_refund_id)
    .bind(refund_id)
    .fetch_optional(conn)
    .await?;
    if let Some(r) = &refund {
        debug!("🗃️ Refund #{} of {} against {} issued as {external_refund_id}", r.id, r.amount, r.order_id);
    }
    Ok(refund)
}

/// Deletes a pending refund. Returns `false` if there was no pending refund with this id.
pub async fn delete_pending_refund(refund_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM refunds WHERE id = $1 AND status = 'pending'")
        .bind(refund_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn fetch_refunds_for_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Vec<Refund>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM refunds WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(conn).await
}

pub async fn fetch_pending_refunds(
    created_before: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Refund>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM refunds WHERE status = 'pending' AND created_at < $1 ORDER BY id")
        .bind(created_before)
        .fetch_all(conn)
        .await
}
