//! Core database infrastructure
//!
//! This module provides the foundational database components:
//! - `DatabaseConn`: SQLite connection wrapper with configuration
//! - `SchemaManager`: Version stamping, status checks and destructive resets
//! - `DatabaseSchema`: Schema description bound to a database builder

mod connection;
mod schema;

pub use connection::DatabaseConn;
pub use schema::{BundledSchema, DatabaseSchema, SchemaManager, SchemaStatus};
