//! Message-Dispatcher – Routet Client-Nachrichten an die richtigen Handler
//!
//! Der Dispatcher ist der einzige Weg, auf dem Verbindungs-Tasks den Hub
//! veraendern: Verbinden, Text-Frame, Pong, Trennen. Jeder Aufruf nimmt den
//! Hub-Lock genau einmal und haelt ihn bis zum Ende der Verarbeitung.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;
use tavern_core::types::ConnId;
use tavern_protocol::{decode_client_message, ClientMessage};

use crate::broadcast::ClientEmpfang;
use crate::handlers::signal_handler::{self, Signal};
use crate::handlers::{channel_handler, room_handler, tavern_handler, HandlerKontext};
use crate::server_state::SignalingState;

/// Zentraler Message-Dispatcher
#[derive(Clone)]
pub struct MessageDispatcher {
    state: Arc<SignalingState>,
}

impl MessageDispatcher {
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<SignalingState> {
        &self.state
    }

    /// Registriert eine neue Verbindung
    pub async fn verbinden(&self, conn_id: ConnId, ip: IpAddr) -> ClientEmpfang {
        let empfang = self.state.broadcaster.client_registrieren(conn_id);
        self.state.hub.lock().await.verbindung_anlegen(conn_id, ip);
        tracing::info!(conn_id = %conn_id, ip = %ip, "Client verbunden");
        empfang
    }

    /// Verarbeitet einen eingehenden Text-Frame
    pub async fn text_verarbeiten(&self, conn_id: ConnId, raw: &str) {
        let mut hub = self.state.hub.lock().await;

        // Verdraengte Verbindungen haben keinen Zustand mehr
        if !hub.verbindungen.contains_key(&conn_id) {
            tracing::debug!(conn_id = %conn_id, "Frame nach Bereinigung verworfen");
            return;
        }

        let mut ctx = HandlerKontext {
            conn_id,
            hub: &mut *hub,
            state: &self.state,
        };

        if !ctx.hub.limiter.nachricht_pruefen(conn_id) {
            tracing::debug!(conn_id = %conn_id, "Nachrichtenrate ueberschritten");
            ctx.rate_limit_verstoss();
            return;
        }
        ctx.hub.nachricht_zaehlen_at(Instant::now());
        self.state.metriken.messages_total.inc();

        let Some(nachricht) = decode_client_message(raw) else {
            tracing::debug!(conn_id = %conn_id, laenge = raw.len(), "Ungueltiger Frame verworfen");
            return;
        };
        tracing::trace!(conn_id = %conn_id, typ = nachricht.typ(), "Nachricht empfangen");

        match nachricht {
            ClientMessage::Join { room, identity } => {
                room_handler::handle_join(&mut ctx, room, identity);
            }
            ClientMessage::CreateTavern { name, icon } => {
                tavern_handler::handle_create_tavern(&mut ctx, name, icon).await;
            }
            ClientMessage::GetTavernInfo { tavern_id } => {
                tavern_handler::handle_tavern_info(&mut ctx, tavern_id);
            }
            ClientMessage::CreateChannel { tavern_id, name } => {
                tavern_handler::handle_create_channel(&mut ctx, tavern_id, name).await;
            }
            ClientMessage::JoinChannel {
                tavern_id,
                channel_id,
                identity,
            } => {
                channel_handler::handle_join_channel(&mut ctx, tavern_id, channel_id, identity);
            }
            ClientMessage::LeaveChannel {
                tavern_id,
                channel_id,
            } => {
                channel_handler::handle_leave_channel(&mut ctx, tavern_id, channel_id);
            }
            ClientMessage::UpdateIdentity { identity } => {
                channel_handler::handle_update_identity(&mut ctx, identity);
            }
            signal @ (ClientMessage::Offer { .. }
            | ClientMessage::Answer { .. }
            | ClientMessage::IceCandidate { .. }) => {
                if let Some(signal) = Signal::aus_nachricht(signal) {
                    signal_handler::handle_relay(&mut ctx, signal);
                }
            }
        }
    }

    /// Pong empfangen: Verbindung gilt wieder als lebendig
    pub async fn pong(&self, conn_id: ConnId) {
        if let Some(verbindung) = self.state.hub.lock().await.verbindungen.get_mut(&conn_id) {
            verbindung.heartbeat.pong();
        }
    }

    /// Bereinigt eine getrennte Verbindung
    ///
    /// Wird vom Verbindungs-Task genau einmal nach Ende der Lese-Schleife
    /// aufgerufen, auch wenn die Verbindung vorher verdraengt wurde.
    pub async fn trennen(&self, conn_id: ConnId) {
        let bereinigung = {
            let mut hub = self.state.hub.lock().await;
            hub.verbindung_bereinigen(conn_id, &self.state.broadcaster)
        };
        self.state.broadcaster.client_entfernen(&conn_id);
        tracing::info!(
            conn_id = %conn_id,
            channel = bereinigung.channel_verlassen,
            raum = bereinigung.raum_verlassen,
            "Client getrennt"
        );
    }
}
