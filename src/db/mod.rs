//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows and their wire shapes
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: the `DeskStorage` query layer

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{
    DbAdminUser, DbMessage, DbSession, DbUser, MessageType, MessageWithSession, SessionWithUser,
    SystemStatus, UserSummary,
};
pub use schema::SQLITE_INIT;
pub use sqlite::{DeskStorage, SqlitePool};
