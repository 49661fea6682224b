//! Datensaetze des Stores
//!
//! Reine Metadaten: die Live-Mitgliedschaft von Peers wird nie persistiert,
//! nur was noetig ist um die Tavern-/Channel-Huelle nach einem Neustart
//! wiederherzustellen.

use chrono::{DateTime, Utc};
use tavern_core::types::{ChannelId, TavernId};

// ---------------------------------------------------------------------------
// Taverns
// ---------------------------------------------------------------------------

/// Tavern-Datensatz
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TavernRecord {
    pub id: TavernId,
    pub name: String,
    /// Leerer String wenn kein Icon gesetzt ist
    pub icon: String,
    pub creator_public_key: String,
    pub signaling_url: String,
    pub created_at: DateTime<Utc>,
}

/// Teilaktualisierung einer Tavern; `None` laesst das Feld unveraendert
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TavernPatch {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub creator_public_key: Option<String>,
    pub signaling_url: Option<String>,
}

impl TavernPatch {
    /// true wenn kein Feld gesetzt ist
    pub fn ist_leer(&self) -> bool {
        self.name.is_none()
            && self.icon.is_none()
            && self.creator_public_key.is_none()
            && self.signaling_url.is_none()
    }

    /// Wendet den Patch auf einen vorhandenen Datensatz an
    pub fn anwenden(&self, record: &mut TavernRecord) {
        if let Some(name) = &self.name {
            record.name = name.clone();
        }
        if let Some(icon) = &self.icon {
            record.icon = icon.clone();
        }
        if let Some(creator) = &self.creator_public_key {
            record.creator_public_key = creator.clone();
        }
        if let Some(url) = &self.signaling_url {
            record.signaling_url = url.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

/// Channel-Datensatz
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    pub id: ChannelId,
    pub tavern_id: TavernId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
