//! Handler fuer alle Client-Nachrichten
//!
//! Jeder Handler ist fuer eine Gruppe von Nachrichtentypen zustaendig und
//! laeuft komplett unter dem Hub-Lock, den der Dispatcher haelt.

pub mod channel_handler;
pub mod room_handler;
pub mod signal_handler;
pub mod tavern_handler;

use tavern_core::types::ConnId;
use tavern_protocol::ServerMessage;

use crate::broadcast::CLOSE_POLICY_VIOLATION;
use crate::hub::Hub;
use crate::rate_limit::Verstoss;
use crate::server_state::SignalingState;

/// Fehlermeldung bei ueberschrittenem Rate-Limit
pub const RATE_LIMITED: &str = "rate-limited";

/// Alles was ein Handler fuer eine Nachricht braucht
pub struct HandlerKontext<'a> {
    pub conn_id: ConnId,
    pub hub: &'a mut Hub,
    pub state: &'a SignalingState,
}

impl HandlerKontext<'_> {
    /// Antwortet dem Absender
    pub fn antworten(&self, nachricht: ServerMessage) -> bool {
        self.state
            .broadcaster
            .an_verbindung_senden(&self.conn_id, nachricht)
    }

    /// Antwortet dem Absender mit `error{message}`
    pub fn fehler(&self, message: impl Into<String>) -> bool {
        self.antworten(ServerMessage::error(message))
    }

    /// Zaehlt einen Rate-Limit-Verstoss und eskaliert ab der Schwelle
    pub fn rate_limit_verstoss(&mut self) {
        self.state.metriken.rate_limit_violations_total.inc();
        self.fehler(RATE_LIMITED);

        if self.hub.limiter.verstoss_melden(self.conn_id) == Verstoss::Trennen {
            tracing::warn!(
                conn_id = %self.conn_id,
                verstoesse = self.hub.limiter.verstoesse(&self.conn_id),
                "Verstoss-Schwelle erreicht – Verbindung wird geschlossen"
            );
            self.state
                .broadcaster
                .schliessen(&self.conn_id, CLOSE_POLICY_VIOLATION, "rate-limit-exceeded");
        }
    }
}
