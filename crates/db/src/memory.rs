//! Fluechtiges Backend (Tests, kurzlebige Deployments)

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tavern_core::types::{ChannelId, TavernId};

use crate::error::{DbError, DbResult};
use crate::models::{ChannelRecord, TavernPatch, TavernRecord};
use crate::store::TavernStore;

#[derive(Default)]
struct Inhalt {
    taverns: HashMap<TavernId, TavernRecord>,
    channels: HashMap<TavernId, Vec<ChannelRecord>>,
}

/// In-Memory-Store; Daten gehen beim Neustart verloren
#[derive(Default)]
pub struct MemoryStore {
    inhalt: Mutex<Inhalt>,
}

impl MemoryStore {
    pub fn neu() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TavernStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create_tavern(&self, tavern: &TavernRecord) -> DbResult<()> {
        let mut inhalt = self.inhalt.lock();
        inhalt.taverns.insert(tavern.id.clone(), tavern.clone());
        inhalt.channels.entry(tavern.id.clone()).or_default();
        Ok(())
    }

    async fn get_tavern(&self, id: &TavernId) -> DbResult<Option<TavernRecord>> {
        Ok(self.inhalt.lock().taverns.get(id).cloned())
    }

    async fn list_taverns(&self) -> DbResult<Vec<TavernRecord>> {
        let mut liste: Vec<TavernRecord> = self.inhalt.lock().taverns.values().cloned().collect();
        liste.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(liste)
    }

    async fn update_tavern(&self, id: &TavernId, patch: TavernPatch) -> DbResult<()> {
        if let Some(record) = self.inhalt.lock().taverns.get_mut(id) {
            patch.anwenden(record);
        }
        Ok(())
    }

    async fn delete_tavern(&self, id: &TavernId) -> DbResult<()> {
        let mut inhalt = self.inhalt.lock();
        inhalt.taverns.remove(id);
        inhalt.channels.remove(id);
        Ok(())
    }

    async fn create_channel(&self, tavern_id: &TavernId, channel: &ChannelRecord) -> DbResult<()> {
        let mut inhalt = self.inhalt.lock();
        if !inhalt.taverns.contains_key(tavern_id) {
            return Err(DbError::nicht_gefunden(format!("Tavern {tavern_id}")));
        }
        let liste = inhalt.channels.entry(tavern_id.clone()).or_default();
        liste.retain(|c| c.id != channel.id);
        liste.push(channel.clone());
        Ok(())
    }

    async fn get_channels(&self, tavern_id: &TavernId) -> DbResult<Vec<ChannelRecord>> {
        let mut liste = self
            .inhalt
            .lock()
            .channels
            .get(tavern_id)
            .cloned()
            .unwrap_or_default();
        liste.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(liste)
    }

    async fn delete_channel(&self, tavern_id: &TavernId, channel_id: &ChannelId) -> DbResult<()> {
        if let Some(liste) = self.inhalt.lock().channels.get_mut(tavern_id) {
            liste.retain(|c| &c.id != channel_id);
        }
        Ok(())
    }
}
