//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interactions are simple functions (rather than stateful structs) that accept a `&mut SqliteConnection`
//! argument. Callers can obtain a connection from a pool, or open an atomic transaction as the need arises and call
//! through to the functions without any other changes.
use std::{env, str::FromStr};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod notifications;
pub mod orders;
pub mod payment_events;
pub mod products;
pub mod refunds;
pub mod vendors;

const SQLITE_DB_URL: &str = "sqlite://data/market.db";

pub fn db_url() -> String {
    let result = env::var("MKT_DATABASE_URL").unwrap_or_else(|_| {
        info!("MKT_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true).foreign_keys(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

/// Maps a unique-constraint violation onto a domain error, and passes every other error through.
pub(crate) fn on_unique_violation<E, F>(err: SqlxError, f: F) -> E
where
    E: From<SqlxError>,
    F: FnOnce() -> E,
{
    match &err {
        SqlxError::Database(db_err) if db_err.is_unique_violation() => f(),
        _ => E::from(err),
    }
}
