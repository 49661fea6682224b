//! Heartbeat – Erkennung halboffener Verbindungen
//!
//! Zwei-Takt-Pruefung: jeder Tick loescht das `lebendig`-Flag und sendet
//! einen WebSocket-Ping. Ist das Flag beim naechsten Tick noch nicht durch
//! einen Pong gesetzt und der Ping mindestens `timeout` alt, wird die
//! Verbindung hart getrennt.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tavern_core::types::ConnId;
use tokio::sync::watch;

use crate::broadcast::Ausgehend;
use crate::server_state::SignalingState;

/// Liveness-Zustand einer Verbindung
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerbindungsZustand {
    pub lebendig: bool,
    pub letzter_ping: Option<Instant>,
}

impl VerbindungsZustand {
    pub fn neu() -> Self {
        Self {
            lebendig: true,
            letzter_ping: None,
        }
    }

    /// Pong empfangen
    pub fn pong(&mut self) {
        self.lebendig = true;
    }
}

impl Default for VerbindungsZustand {
    fn default() -> Self {
        Self::neu()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAktion {
    Ping,
    Terminieren,
}

/// Berechnet die Aktionen eines Ticks und aktualisiert die Zustaende
pub fn planen<'a>(
    zustaende: impl Iterator<Item = (&'a ConnId, &'a mut VerbindungsZustand)>,
    jetzt: Instant,
    timeout: Duration,
) -> Vec<(ConnId, HeartbeatAktion)> {
    let mut aktionen = Vec::new();
    for (conn_id, zustand) in zustaende {
        if !zustand.lebendig {
            let abgelaufen = zustand
                .letzter_ping
                .map_or(true, |ping| jetzt.duration_since(ping) >= timeout);
            if abgelaufen {
                aktionen.push((*conn_id, HeartbeatAktion::Terminieren));
            }
            continue;
        }
        zustand.lebendig = false;
        zustand.letzter_ping = Some(jetzt);
        aktionen.push((*conn_id, HeartbeatAktion::Ping));
    }
    aktionen
}

/// Fuehrt einen Heartbeat-Tick aus
pub async fn tick(state: &SignalingState, jetzt: Instant) -> Vec<(ConnId, HeartbeatAktion)> {
    let mut hub = state.hub.lock().await;
    let aktionen = planen(
        hub.verbindungen
            .iter_mut()
            .map(|(id, v)| (id, &mut v.heartbeat)),
        jetzt,
        state.config.heartbeat_timeout,
    );
    hub.limiter.aufraeumen_at(jetzt);
    drop(hub);

    for (conn_id, aktion) in &aktionen {
        match aktion {
            HeartbeatAktion::Ping => {
                state.broadcaster.element_senden(conn_id, Ausgehend::Ping);
            }
            HeartbeatAktion::Terminieren => {
                tracing::warn!(conn_id = %conn_id, "Keine Pong-Antwort – Verbindung getrennt");
                state.metriken.heartbeat_terminations_total.inc();
                state.broadcaster.terminieren(conn_id);
            }
        }
    }
    aktionen
}

/// Startet den Heartbeat-Task; endet wenn das Shutdown-Signal feuert
pub fn starten(
    state: Arc<SignalingState>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut intervall = tokio::time::interval(state.config.heartbeat_intervall);
        intervall.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // Erster Tick feuert sofort
        intervall.tick().await;

        loop {
            tokio::select! {
                _ = intervall.tick() => {
                    tick(&state, Instant::now()).await;
                }
                _ = shutdown_rx.changed() => {
                    tracing::debug!("Heartbeat beendet (Shutdown)");
                    break;
                }
            }
        }
    })
}
