//! tavern-server – Bibliotheks-Root
//!
//! Verdrahtet Store, Signaling-Zustand, Heartbeat und WebSocket-Listener
//! und stellt den oeffentlichen Einstiegspunkt fuer Integrationstests bereit.

pub mod config;

use anyhow::{Context, Result};
use config::{ServerConfig, SpeicherBackend};
use std::net::SocketAddr;
use std::sync::Arc;
use tavern_db::{MemoryStore, SqliteStore, TavernStore};
use tavern_observability::TavernMetriken;
use tavern_signaling::{heartbeat, shutdown, SignalingServer, SignalingState};
use tokio::task::JoinHandle;

/// Haelt den Server-Zustand bis zum Start zusammen
pub struct Server {
    pub config: ServerConfig,
}

/// Ein hochgefahrener Relay mit allen Hintergrund-Tasks
pub struct LaufenderServer {
    pub state: Arc<SignalingState>,
    listener: SignalingServer,
    heartbeat: JoinHandle<()>,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Store oeffnen und Taverns laden (mit Zeitlimit)
    /// 2. Heartbeat-Task starten
    /// 3. WebSocket-Listener starten
    /// 4. Auf Ctrl-C / SIGTERM warten
    /// 5. Geordnet herunterfahren
    pub async fn starten(self) -> Result<()> {
        let laufend = self.hochfahren().await?;

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C / SIGTERM)...");
        shutdown_signal_abwarten().await?;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");

        laufend.herunterfahren().await;
        Ok(())
    }

    /// Faehrt den Relay hoch ohne auf ein Signal zu warten
    pub async fn hochfahren(self) -> Result<LaufenderServer> {
        let config = self.config;
        let bind_addr = config.bind_adresse()?;
        let frist = config.store_init_timeout();

        tracing::info!(
            adresse = %bind_addr,
            backend = %config.speicher.backend,
            "Server startet"
        );

        let store = tokio::time::timeout(frist, store_oeffnen(&config))
            .await
            .with_context(|| {
                format!("Store nicht innerhalb von {} ms bereit", frist.as_millis())
            })??;

        let metriken = TavernMetriken::neu()?;
        let state = SignalingState::neu(config.signaling_config(), store, metriken);

        tokio::time::timeout(frist, async {
            state.hub.lock().await.presence.init().await
        })
        .await
        .with_context(|| format!("Taverns nicht innerhalb von {} ms geladen", frist.as_millis()))?
        .context("Taverns konnten nicht geladen werden")?;

        let heartbeat = heartbeat::starten(state.clone(), state.shutdown_empfaenger());
        let listener = SignalingServer::starten(state.clone(), bind_addr)
            .await
            .context("WebSocket-Listener konnte nicht gestartet werden")?;

        Ok(LaufenderServer {
            state,
            listener,
            heartbeat,
        })
    }
}

impl LaufenderServer {
    /// Tatsaechlich gebundene Adresse
    pub fn lokale_adresse(&self) -> SocketAddr {
        self.listener.lokale_adresse()
    }

    /// Verabschiedet alle Verbindungen und beendet die Hintergrund-Tasks
    pub async fn herunterfahren(self) {
        shutdown::herunterfahren(&self.state, Some(self.listener)).await;
        if let Err(e) = self.heartbeat.await {
            tracing::warn!(fehler = %e, "Heartbeat-Task abgebrochen");
        }
    }
}

async fn store_oeffnen(config: &ServerConfig) -> Result<Arc<dyn TavernStore>> {
    match config.speicher.backend {
        SpeicherBackend::Memory => {
            tracing::info!("In-Memory-Store aktiv, Taverns ueberleben keinen Neustart");
            Ok(Arc::new(MemoryStore::neu()))
        }
        SpeicherBackend::Sqlite => {
            let store = SqliteStore::oeffnen(&config.speicher.pfad)
                .await
                .with_context(|| format!("SQLite-Store '{}' nicht oeffenbar", config.speicher.pfad))?;
            Ok(Arc::new(store))
        }
    }
}

/// Wartet auf Ctrl-C oder (unter Unix) SIGTERM
async fn shutdown_signal_abwarten() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).context("SIGTERM-Handler nicht installierbar")?;
        tokio::select! {
            ergebnis = tokio::signal::ctrl_c() => ergebnis.context("Ctrl-C-Handler fehlgeschlagen")?,
            _ = sigterm.recv() => tracing::debug!("SIGTERM empfangen"),
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .context("Ctrl-C-Handler fehlgeschlagen")?;

    Ok(())
}
