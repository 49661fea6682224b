//! SQLite-Store: Connection Pool mit WAL-Modus

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::error::DbError;

/// Dauerhafter Store auf SQLite-Basis
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pub(crate) pool: SqlitePool,
}

impl SqliteStore {
    /// Oeffnet (oder erstellt) die Datenbankdatei und fuehrt Migrationen aus
    ///
    /// Das Elternverzeichnis wird bei Bedarf angelegt.
    pub async fn oeffnen(pfad: impl AsRef<Path>) -> Result<Self, DbError> {
        let pfad = pfad.as_ref();
        if let Some(eltern) = pfad.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(eltern).await?;
        }

        let opts = SqliteConnectOptions::new()
            .filename(pfad)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await?;

        info!(pfad = %pfad.display(), "SQLite-Store geoeffnet (WAL)");

        let store = Self { pool };
        store.migrationen_ausfuehren().await?;
        Ok(store)
    }

    /// Erstellt eine In-Memory-Datenbank fuer Tests
    pub async fn in_memory() -> Result<Self, DbError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            // In-Memory benoetigt genau eine dauerhafte Verbindung
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrationen_ausfuehren().await?;
        Ok(store)
    }

    /// Fuehrt alle ausstehenden Migrationen aus
    pub async fn migrationen_ausfuehren(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Datenbank-Migrationen abgeschlossen");
        Ok(())
    }

    /// Gibt den internen Pool zurueck (fuer Tests)
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
