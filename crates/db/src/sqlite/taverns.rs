//! SQLite-Implementierung des TavernStore

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row as _;
use tavern_core::types::{ChannelId, TavernId};
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::models::{ChannelRecord, TavernPatch, TavernRecord};
use crate::sqlite::pool::SqliteStore;
use crate::store::TavernStore;

/// Feste Breite, damit `ORDER BY created_at` der Zeitordnung entspricht
fn zeit_text(zeit: &DateTime<Utc>) -> String {
    zeit.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn zeit_parsen(text: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|z| z.with_timezone(&Utc))
        .map_err(|e| DbError::ungueltige_daten(format!("Ungueltige created_at '{text}': {e}")))
}

#[async_trait]
impl TavernStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn create_tavern(&self, tavern: &TavernRecord) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO taverns (id, name, icon, creator_public_key, signaling_url, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(tavern.id.as_str())
        .bind(&tavern.name)
        .bind(&tavern.icon)
        .bind(&tavern.creator_public_key)
        .bind(&tavern.signaling_url)
        .bind(zeit_text(&tavern.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_tavern(&self, id: &TavernId) -> DbResult<Option<TavernRecord>> {
        let row = sqlx::query(
            "SELECT id, name, icon, creator_public_key, signaling_url, created_at
             FROM taverns WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_tavern(&r)).transpose()
    }

    async fn list_taverns(&self) -> DbResult<Vec<TavernRecord>> {
        let rows = sqlx::query(
            "SELECT id, name, icon, creator_public_key, signaling_url, created_at
             FROM taverns ORDER BY created_at, rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_tavern).collect()
    }

    async fn update_tavern(&self, id: &TavernId, patch: TavernPatch) -> DbResult<()> {
        if patch.ist_leer() {
            return Ok(());
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut werte: Vec<String> = Vec::new();

        if let Some(name) = patch.name {
            sets.push("name = ?");
            werte.push(name);
        }
        if let Some(icon) = patch.icon {
            sets.push("icon = ?");
            werte.push(icon);
        }
        if let Some(creator) = patch.creator_public_key {
            sets.push("creator_public_key = ?");
            werte.push(creator);
        }
        if let Some(url) = patch.signaling_url {
            sets.push("signaling_url = ?");
            werte.push(url);
        }

        let sql = format!("UPDATE taverns SET {} WHERE id = ?", sets.join(", "));
        let mut q = sqlx::query(&sql);
        for wert in werte {
            q = q.bind(wert);
        }
        q.bind(id.as_str()).execute(&self.pool).await?;
        Ok(())
    }

    async fn delete_tavern(&self, id: &TavernId) -> DbResult<()> {
        sqlx::query("DELETE FROM taverns WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_channel(&self, tavern_id: &TavernId, channel: &ChannelRecord) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO channels (id, tavern_id, name, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(channel.id.as_str())
        .bind(tavern_id.as_str())
        .bind(&channel.name)
        .bind(zeit_text(&channel.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_channels(&self, tavern_id: &TavernId) -> DbResult<Vec<ChannelRecord>> {
        let rows = sqlx::query(
            "SELECT id, tavern_id, name, created_at
             FROM channels WHERE tavern_id = ? ORDER BY created_at, rowid",
        )
        .bind(tavern_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_channel).collect()
    }

    async fn delete_channel(&self, tavern_id: &TavernId, channel_id: &ChannelId) -> DbResult<()> {
        sqlx::query("DELETE FROM channels WHERE id = ? AND tavern_id = ?")
            .bind(channel_id.as_str())
            .bind(tavern_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Tavern und Default-Channel in einer Transaktion
    async fn create_tavern_with_channel(
        &self,
        tavern: &TavernRecord,
        channel: &ChannelRecord,
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO taverns (id, name, icon, creator_public_key, signaling_url, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(tavern.id.as_str())
        .bind(&tavern.name)
        .bind(&tavern.icon)
        .bind(&tavern.creator_public_key)
        .bind(&tavern.signaling_url)
        .bind(zeit_text(&tavern.created_at))
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO channels (id, tavern_id, name, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(channel.id.as_str())
        .bind(tavern.id.as_str())
        .bind(&channel.name)
        .bind(zeit_text(&channel.created_at))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn close(&self) -> DbResult<()> {
        self.pool.close().await;
        info!("SQLite-Store geschlossen");
        Ok(())
    }
}

fn row_to_tavern(row: &sqlx::sqlite::SqliteRow) -> DbResult<TavernRecord> {
    let created_at: String = row.try_get("created_at")?;
    let icon: Option<String> = row.try_get("icon")?;
    let signaling_url: Option<String> = row.try_get("signaling_url")?;
    let id: String = row.try_get("id")?;

    Ok(TavernRecord {
        id: TavernId(id),
        name: row.try_get("name")?,
        icon: icon.unwrap_or_default(),
        creator_public_key: row.try_get("creator_public_key")?,
        signaling_url: signaling_url.unwrap_or_default(),
        created_at: zeit_parsen(&created_at)?,
    })
}

fn row_to_channel(row: &sqlx::sqlite::SqliteRow) -> DbResult<ChannelRecord> {
    let created_at: String = row.try_get("created_at")?;
    let id: String = row.try_get("id")?;
    let tavern_id: String = row.try_get("tavern_id")?;

    Ok(ChannelRecord {
        id: ChannelId(id),
        tavern_id: TavernId(tavern_id),
        name: row.try_get("name")?,
        created_at: zeit_parsen(&created_at)?,
    })
}
