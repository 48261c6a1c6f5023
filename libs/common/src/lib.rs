//! Common library for the quiz backend
//!
//! This crate holds the datastore plumbing shared by services: connection
//! configuration, pooling, health checks, schema migrations and the database
//! error taxonomy.

pub mod database;
pub mod error;

pub use error::{DatabaseError, DatabaseResult};
