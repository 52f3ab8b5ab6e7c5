//! Generic CRUD data store over a single SQLite connection.
//!
//! # Intention
//!
//! - Provide one small API for table-level create, read, update, delete and
//!   count against a file-backed SQLite database.
//! - Keep raw `execute` / `fetch` available for everything else.
//! - Return schema-less [`Row`] values so callers need no generated types.
//!
//! # Architectural Boundaries
//!
//! - Only SQLite/database code belongs here.
//! - No schema management, migrations, pooling or transactions.
//! - Table and column names are interpolated into SQL text. Data values are
//!   always bound as named parameters. See [`IdentifierPolicy`].

pub mod config;
pub mod error;
pub mod sqlite;
pub mod value;

pub use config::{DataStoreConfig, IdentifierPolicy};
pub use error::{DataStoreError, Result};
pub use sqlite::DataStore;
pub use value::{Row, Value};
