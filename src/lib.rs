pub mod config;
pub mod models;
pub mod query;
pub mod repository;
pub mod service;

pub use config::config::Config;
pub use repository::database::{Database, DbConn, DbPool, IsolationLevel, TxOptions, MIGRATIONS};
pub use repository::error::{ConstraintKind, StoreError};
