//! tavern-db – Persistenz fuer Tavern-/Channel-Metadaten
//!
//! Zwei Backends hinter dem [`TavernStore`]-Trait:
//! - [`MemoryStore`]: fluechtig, fuer Tests und kurzlebige Deployments
//! - [`SqliteStore`]: dauerhaft, WAL-Modus, Cascade von Channel zu Tavern
//!
//! Live-Mitgliedschaften werden hier nie gespeichert.

pub mod error;
pub mod memory;
pub mod models;
pub mod sqlite;
pub mod store;

pub use error::{DbError, DbResult};
pub use memory::MemoryStore;
pub use models::{ChannelRecord, TavernPatch, TavernRecord};
pub use sqlite::SqliteStore;
pub use store::TavernStore;
