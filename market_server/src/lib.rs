//! # Marketplace server
//! This crate hosts the HTTP server for the marketplace. It is responsible for:
//! * Taking checkouts from the storefront and opening payment intents with the payment processor.
//! * Receiving the payment processor's webhooks and reconciling orders with them.
//! * Serving orders to customers (by access token) and vendors (by session).
//! * Letting vendors manage their orders, products and payment account.
//! * Delivering e-mail notifications, and retrying the ones that failed in the background.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! See [routes](routes/index.html) for the list of routes and the authentication each one requires.
pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod retry_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
