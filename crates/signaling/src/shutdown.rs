//! Shutdown-Koordinator
//!
//! Ablauf beim Herunterfahren:
//! 1. Draining setzen (neue Upgrades -> 503)
//! 2. `server-shutdown` an alle offenen Verbindungen, danach Close 1001
//! 3. Shutdown-Signal ausloesen (Heartbeat, Listener, Verbindungs-Tasks)
//! 4. Begrenzt auf den Listener warten
//! 5. Store schliessen

use tavern_protocol::ServerMessage;

use crate::broadcast::CLOSE_GOING_AWAY;
use crate::server_state::SignalingState;
use crate::ws::SignalingServer;

/// Benachrichtigt und schliesst alle Verbindungen; gibt die Anzahl zurueck
pub fn verbindungen_verabschieden(state: &SignalingState) -> usize {
    state.draining_setzen();

    let benachrichtigt = state
        .broadcaster
        .an_alle_senden(&ServerMessage::ServerShutdown {});
    for conn_id in state.broadcaster.conn_ids() {
        state
            .broadcaster
            .schliessen(&conn_id, CLOSE_GOING_AWAY, "server-shutdown");
    }
    benachrichtigt
}

/// Faehrt den Relay geordnet herunter
pub async fn herunterfahren(state: &SignalingState, server: Option<SignalingServer>) {
    let benachrichtigt = verbindungen_verabschieden(state);
    tracing::info!(verbindungen = benachrichtigt, "Shutdown-Notiz gesendet");

    state.shutdown_ausloesen();

    if let Some(server) = server {
        match tokio::time::timeout(state.config.shutdown_frist, server.beendet()).await {
            Ok(Ok(())) => tracing::debug!("Listener beendet"),
            Ok(Err(e)) => tracing::warn!(fehler = %e, "Listener mit Fehler beendet"),
            Err(_) => tracing::warn!(
                frist_ms = state.config.shutdown_frist.as_millis() as u64,
                "Listener nicht rechtzeitig beendet"
            ),
        }
    }

    if let Err(e) = state.store().close().await {
        tracing::warn!(fehler = %e, "Store konnte nicht sauber geschlossen werden");
    }
    tracing::info!("Shutdown abgeschlossen");
}
