//! Event-Broadcaster – Send-Queues aller verbundenen Clients
//!
//! Der Broadcaster liegt ausserhalb des Hub-Locks und bildet nur
//! `ConnId -> ClientSender` ab. Zustellung ist best effort: volle oder
//! geschlossene Queues verwerfen die Nachricht, es gibt keine Wiederholung.
//!
//! Jeder Sender hat zusaetzlich ein Abbruch-Signal (`watch`), mit dem eine
//! Verbindung sofort hart getrennt werden kann, auch wenn ihre Queue voll ist.

use dashmap::DashMap;
use std::sync::Arc;
use tavern_core::types::{ChannelId, ConnId, TavernId};
use tavern_protocol::ServerMessage;
use tokio::sync::{mpsc, watch};

use crate::presence::PresenceCore;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Groesse der Send-Queue pro Client
const SEND_QUEUE_GROESSE: usize = 64;

/// Close-Code: Server faehrt herunter
pub const CLOSE_GOING_AWAY: u16 = 1001;
/// Close-Code: Rate-Limit-Eskalation
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;
/// Close-Code: Session durch neue Verbindung ersetzt
pub const CLOSE_SESSION_REPLACED: u16 = 4000;

// ---------------------------------------------------------------------------
// Ausgehende Elemente
// ---------------------------------------------------------------------------

/// Alles was der Verbindungs-Task an den Socket schreiben kann
#[derive(Debug, Clone, PartialEq)]
pub enum Ausgehend {
    /// JSON-Nachricht als Text-Frame
    Nachricht(ServerMessage),
    /// WebSocket-Ping (Heartbeat)
    Ping,
    /// Close-Frame senden und Verbindung beenden
    Schliessen { code: u16, grund: String },
}

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue eines verbundenen Clients
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub conn_id: ConnId,
    tx: mpsc::Sender<Ausgehend>,
    abbruch: Arc<watch::Sender<bool>>,
}

impl ClientSender {
    /// Reiht ein Element nicht-blockierend ein
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, element: Ausgehend) -> bool {
        match self.tx.try_send(element) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.conn_id, "Send-Queue voll – Nachricht verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(conn_id = %self.conn_id, "Send-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }

    /// Offen solange der Verbindungs-Task die Queue noch liest
    pub fn ist_offen(&self) -> bool {
        !self.tx.is_closed() && !*self.abbruch.borrow()
    }
}

/// Empfangsseite fuer den Verbindungs-Task
pub struct ClientEmpfang {
    pub ausgehend: mpsc::Receiver<Ausgehend>,
    pub abbruch: watch::Receiver<bool>,
}

// ---------------------------------------------------------------------------
// EventBroadcaster
// ---------------------------------------------------------------------------

/// Zentrale Registry der Send-Queues
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone, Default)]
pub struct EventBroadcaster {
    clients: Arc<DashMap<ConnId, ClientSender>>,
}

impl EventBroadcaster {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Registriert einen neuen Client und gibt seine Empfangsseite zurueck
    pub fn client_registrieren(&self, conn_id: ConnId) -> ClientEmpfang {
        let (tx, ausgehend) = mpsc::channel(SEND_QUEUE_GROESSE);
        let (abbruch_tx, abbruch) = watch::channel(false);
        let sender = ClientSender {
            conn_id,
            tx,
            abbruch: Arc::new(abbruch_tx),
        };
        self.clients.insert(conn_id, sender);
        tracing::debug!(conn_id = %conn_id, "Client im Broadcaster registriert");
        ClientEmpfang { ausgehend, abbruch }
    }

    /// Entfernt einen Client aus dem Broadcaster
    pub fn client_entfernen(&self, conn_id: &ConnId) {
        self.clients.remove(conn_id);
        tracing::debug!(conn_id = %conn_id, "Client aus Broadcaster entfernt");
    }

    pub fn sender(&self, conn_id: &ConnId) -> Option<ClientSender> {
        self.clients.get(conn_id).map(|s| s.clone())
    }

    /// Prueft ob der Transport einer Verbindung offen ist
    pub fn ist_offen(&self, conn_id: &ConnId) -> bool {
        self.clients
            .get(conn_id)
            .map(|s| s.ist_offen())
            .unwrap_or(false)
    }

    /// Sendet eine Nachricht an eine einzelne Verbindung
    pub fn an_verbindung_senden(&self, conn_id: &ConnId, nachricht: ServerMessage) -> bool {
        self.element_senden(conn_id, Ausgehend::Nachricht(nachricht))
    }

    /// Reiht ein beliebiges Element fuer eine offene Verbindung ein
    pub fn element_senden(&self, conn_id: &ConnId, element: Ausgehend) -> bool {
        match self.clients.get(conn_id) {
            Some(sender) if sender.ist_offen() => sender.senden(element),
            Some(_) => false,
            None => {
                tracing::debug!(conn_id = %conn_id, "Senden an unbekannte Verbindung");
                false
            }
        }
    }

    /// Sendet einen Close-Frame (nach allen bereits eingereihten Nachrichten)
    ///
    /// Laesst sich der Close-Frame nicht einreihen, wird hart getrennt.
    pub fn schliessen(&self, conn_id: &ConnId, code: u16, grund: &str) {
        let eingereiht = self.element_senden(
            conn_id,
            Ausgehend::Schliessen {
                code,
                grund: grund.to_string(),
            },
        );
        if !eingereiht {
            self.terminieren(conn_id);
        }
    }

    /// Trennt eine Verbindung sofort ohne Close-Frame
    pub fn terminieren(&self, conn_id: &ConnId) {
        if let Some(sender) = self.clients.get(conn_id) {
            sender.abbruch.send_replace(true);
        }
    }

    /// Sendet an alle Mitglieder eines Channels ausser `ausser`
    ///
    /// Gibt die Anzahl zugestellter Nachrichten zurueck.
    pub fn an_channel_senden(
        &self,
        presence: &PresenceCore,
        tavern_id: &TavernId,
        channel_id: &ChannelId,
        nachricht: &ServerMessage,
        ausser: Option<&ConnId>,
    ) -> usize {
        presence
            .peer_ids_in_channel(tavern_id, channel_id)
            .iter()
            .filter(|id| Some(*id) != ausser)
            .filter(|id| self.an_verbindung_senden(id, nachricht.clone()))
            .count()
    }

    /// Sendet an alle offenen Verbindungen
    pub fn an_alle_senden(&self, nachricht: &ServerMessage) -> usize {
        self.conn_ids()
            .iter()
            .filter(|id| self.an_verbindung_senden(id, nachricht.clone()))
            .count()
    }

    /// Alle registrierten Verbindungen
    pub fn conn_ids(&self) -> Vec<ConnId> {
        self.clients.iter().map(|e| *e.key()).collect()
    }

    /// Anzahl offener Verbindungen
    pub fn offene_anzahl(&self) -> usize {
        self.clients.iter().filter(|e| e.value().ist_offen()).count()
    }

    pub fn ist_registriert(&self, conn_id: &ConnId) -> bool {
        self.clients.contains_key(conn_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
