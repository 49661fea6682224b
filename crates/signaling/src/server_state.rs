//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt den Hub (hinter einem Mutex), den Broadcaster und die Metriken als
//! Arc-geteilten Zustand fuer alle Verbindungs-Tasks.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tavern_db::TavernStore;
use tavern_observability::{MetrikSnapshot, StatusQuelle, TavernMetriken};
use tokio::sync::{watch, Mutex};

use crate::broadcast::EventBroadcaster;
use crate::hub::Hub;
use crate::rate_limit::RateLimitKonfig;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Maximale Peers pro Channel
    pub max_peers_per_channel: usize,
    /// Maximale Peers pro Legacy-Raum
    pub max_peers_per_room: usize,
    pub rate_limit: RateLimitKonfig,
    /// Abstand der Heartbeat-Ticks
    pub heartbeat_intervall: Duration,
    /// Mindestalter eines unbeantworteten Pings vor der Trennung
    pub heartbeat_timeout: Duration,
    /// Wartezeit auf den Listener beim Herunterfahren
    pub shutdown_frist: Duration,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            max_peers_per_channel: 8,
            max_peers_per_room: 8,
            rate_limit: RateLimitKonfig::default(),
            heartbeat_intervall: Duration::from_secs(30),
            heartbeat_timeout: Duration::from_secs(30),
            shutdown_frist: Duration::from_secs(5),
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    pub config: SignalingConfig,
    /// Aller veraenderliche Relay-Zustand; ein Lock fuer alles
    pub hub: Mutex<Hub>,
    /// Send-Queues der Verbindungen (ausserhalb des Hub-Locks)
    pub broadcaster: EventBroadcaster,
    pub metriken: TavernMetriken,
    pub start_time: Instant,
    store: Arc<dyn TavernStore>,
    draining: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
}

impl SignalingState {
    pub fn neu(
        config: SignalingConfig,
        store: Arc<dyn TavernStore>,
        metriken: TavernMetriken,
    ) -> Arc<Self> {
        let hub = Hub::neu(
            store.clone(),
            config.max_peers_per_channel,
            config.max_peers_per_room,
            config.rate_limit.clone(),
        );
        let (shutdown_tx, _) = watch::channel(false);
        Arc::new(Self {
            config,
            hub: Mutex::new(hub),
            broadcaster: EventBroadcaster::neu(),
            metriken,
            start_time: Instant::now(),
            store,
            draining: AtomicBool::new(false),
            shutdown_tx,
        })
    }

    pub fn store(&self) -> &Arc<dyn TavernStore> {
        &self.store
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Neue Upgrades werden abgelehnt solange der Server herunterfaehrt
    pub fn ist_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    pub(crate) fn draining_setzen(&self) {
        self.draining.store(true, Ordering::SeqCst);
    }

    /// Empfaenger fuer das Shutdown-Signal (Heartbeat, Listener, Verbindungen)
    pub fn shutdown_empfaenger(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    pub(crate) fn shutdown_ausloesen(&self) {
        self.shutdown_tx.send_replace(true);
    }
}

#[async_trait]
impl StatusQuelle for SignalingState {
    async fn tavern_anzahl(&self) -> u64 {
        self.hub.lock().await.presence.tavern_anzahl() as u64
    }

    async fn snapshot(&self) -> MetrikSnapshot {
        let mut hub = self.hub.lock().await;
        let snapshot = MetrikSnapshot {
            connected_peers: hub.verbindungen.len() as u64,
            active_taverns: hub.presence.aktive_tavern_anzahl() as u64,
            total_taverns: hub.presence.tavern_anzahl() as u64,
            uptime: self.uptime_sek(),
            messages_per_second: hub.nachrichten_pro_sekunde_at(Instant::now()),
        };
        drop(hub);
        self.metriken.snapshot_uebernehmen(&snapshot);
        snapshot
    }
}
