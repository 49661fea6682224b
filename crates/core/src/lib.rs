//! tavern-core – Gemeinsame Typen
//!
//! Dieses Crate stellt die Id-Typen und die Identitaet bereit, die von allen
//! anderen Tavern-Crates gemeinsam genutzt werden.

pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use types::{ChannelId, ConnId, Identity, TavernId};
