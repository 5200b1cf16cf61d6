use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{db_types::OrderId, traits::PaymentEvent};

/// Records that the event has been applied to the order. Returns `false` if the event id was already recorded.
pub async fn record_event(
    event: &PaymentEvent,
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            INSERT INTO payment_events (event_id, order_id, kind, received_at) VALUES ($1, $2, $3, $4)
            ON CONFLICT (event_id) DO NOTHING;
        "#,
    )
    .bind(&event.id)
    .bind(order_id)
    .bind(format!("{:?}", event.kind))
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
