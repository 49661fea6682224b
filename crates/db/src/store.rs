//! Store-Trait
//!
//! Beide Backends implementieren denselben Vertrag. Der Presence-Core haelt
//! den Store als `Arc<dyn TavernStore>` und kennt das konkrete Backend nicht.

use async_trait::async_trait;
use tavern_core::types::{ChannelId, TavernId};
use tracing::warn;

use crate::error::DbResult;
use crate::models::{ChannelRecord, TavernPatch, TavernRecord};

/// Persistenz fuer Tavern- und Channel-Metadaten
#[async_trait]
pub trait TavernStore: Send + Sync {
    /// Name des Backends (fuer Logs)
    fn backend_name(&self) -> &'static str;

    async fn create_tavern(&self, tavern: &TavernRecord) -> DbResult<()>;

    async fn get_tavern(&self, id: &TavernId) -> DbResult<Option<TavernRecord>>;

    /// Alle Taverns, aelteste zuerst
    async fn list_taverns(&self) -> DbResult<Vec<TavernRecord>>;

    /// No-op wenn die Tavern fehlt oder der Patch leer ist
    async fn update_tavern(&self, id: &TavernId, patch: TavernPatch) -> DbResult<()>;

    /// Loescht die Tavern samt aller Channels
    async fn delete_tavern(&self, id: &TavernId) -> DbResult<()>;

    async fn create_channel(&self, tavern_id: &TavernId, channel: &ChannelRecord) -> DbResult<()>;

    /// Channels einer Tavern, aelteste zuerst
    async fn get_channels(&self, tavern_id: &TavernId) -> DbResult<Vec<ChannelRecord>>;

    async fn delete_channel(&self, tavern_id: &TavernId, channel_id: &ChannelId) -> DbResult<()>;

    /// Speichert Tavern und Default-Channel als eine Einheit
    ///
    /// Standard: sequentiell schreiben, bei Fehler des Channels die Tavern
    /// wieder entfernen. Backends mit Transaktionen ueberschreiben das.
    async fn create_tavern_with_channel(
        &self,
        tavern: &TavernRecord,
        channel: &ChannelRecord,
    ) -> DbResult<()> {
        self.create_tavern(tavern).await?;
        if let Err(e) = self.create_channel(&tavern.id, channel).await {
            if let Err(rollback) = self.delete_tavern(&tavern.id).await {
                warn!(
                    tavern_id = %tavern.id,
                    fehler = %rollback,
                    "Tavern konnte nach fehlgeschlagenem Channel nicht entfernt werden"
                );
            }
            return Err(e);
        }
        Ok(())
    }

    /// Schliesst das Handle; danach keine weiteren Aufrufe
    async fn close(&self) -> DbResult<()> {
        Ok(())
    }
}
