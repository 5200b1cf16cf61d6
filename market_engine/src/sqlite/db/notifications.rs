use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::FailedNotification;

pub async fn insert_failed_notification(
    payload: &str,
    error: &str,
    conn: &mut SqliteConnection,
) -> Result<i64, sqlx::Error> {
    let now = Utc::now();
    let (id,): (i64,) = sqlx::query_as(
        r#"
            INSERT INTO failed_notifications (payload, last_error, attempts, created_at, last_attempt_at)
            VALUES ($1, $2, 1, $3, $4)
            RETURNING id;
        "#,
    )
    .bind(payload)
    .bind(error)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn fetch_failed_notifications(
    max_attempts: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<FailedNotification>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM failed_notifications WHERE attempts < $1 ORDER BY id")
        .bind(max_attempts)
        .fetch_all(conn)
        .await
}

pub async fn delete_failed_notification(id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM failed_notifications WHERE id = $1").bind(id).execute(conn).await?;
    Ok(())
}

pub async fn increment_attempts(id: i64, error: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            UPDATE failed_notifications SET attempts = attempts + 1, last_error = $1, last_attempt_at = $2
            WHERE id = $3;
        "#,
    )
    .bind(error)
    .bind(Utc::now())
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}
