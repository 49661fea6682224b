//! SQLite-Backend

pub mod pool;
pub mod taverns;

pub use pool::SqliteStore;
