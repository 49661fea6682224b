//! Status-Quelle fuer Health und Metriken
//!
//! Der Relay implementiert [`StatusQuelle`]; dieses Crate kennt nur den
//! Trait und bleibt so frei von Abhaengigkeiten auf den Signaling-Teil.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Momentaufnahme der Relay-Kennzahlen (`GET /metrics`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetrikSnapshot {
    pub connected_peers: u64,
    pub active_taverns: u64,
    pub total_taverns: u64,
    /// Sekunden seit Prozessstart
    pub uptime: u64,
    pub messages_per_second: u64,
}

/// Liefert die Zahlen fuer `/health` und `/metrics`
#[async_trait]
pub trait StatusQuelle: Send + Sync {
    /// Anzahl bekannter Taverns
    async fn tavern_anzahl(&self) -> u64;

    async fn snapshot(&self) -> MetrikSnapshot;
}
