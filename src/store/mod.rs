//! Persistence layer: libSQL-backed post storage.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{NewPost, Post, PostStore};
