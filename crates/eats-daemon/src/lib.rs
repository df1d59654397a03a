//! eats-daemon library target.
//!
//! Exposes the router, schema and state for integration tests.
//! The binary `main.rs` depends on this library target.

pub mod api_types;
pub mod graphql;
pub mod routes;
pub mod state;
