//! chime HTTP server.
//!
//! Wires the trigger service to PostgreSQL and exposes it over axum.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
