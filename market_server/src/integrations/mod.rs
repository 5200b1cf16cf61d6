//! Adapters between the engine's external-collaborator traits and the services the server talks to.
pub mod email;
pub mod stripe;
