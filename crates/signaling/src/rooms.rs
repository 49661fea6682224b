//! Legacy-Raeume fuer Clients ohne Tavern-Kontext
//!
//! Ein Raum ist nur eine ID plus Mitgliederliste. Jede Verbindung ist in
//! hoechstens einem Raum; leere Raeume werden sofort entfernt.
//! Teilt keine IDs mit dem [`crate::presence::PresenceCore`].

use std::collections::HashMap;
use tavern_core::types::{ConnId, Identity};
use tavern_protocol::ServerMessage;

use crate::broadcast::{Ausgehend, ClientSender};
use crate::error::RoomJoinRejection;

/// Ergebnis von [`RoomRegistry::raum_verlassen`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomLeave {
    pub room_id: String,
    pub remaining_peer_ids: Vec<ConnId>,
}

#[derive(Debug)]
struct RaumMitglied {
    conn_id: ConnId,
    sender: ClientSender,
}

/// Registry der Legacy-Raeume
pub struct RoomRegistry {
    max_peers_per_room: usize,
    raeume: HashMap<String, Vec<RaumMitglied>>,
    peer_zu_raum: HashMap<ConnId, String>,
    identitaeten: HashMap<ConnId, Identity>,
}

impl RoomRegistry {
    pub fn neu(max_peers_per_room: usize) -> Self {
        Self {
            max_peers_per_room,
            raeume: HashMap::new(),
            peer_zu_raum: HashMap::new(),
            identitaeten: HashMap::new(),
        }
    }

    pub fn raum_beitreten(
        &mut self,
        room_id: &str,
        conn_id: ConnId,
        sender: ClientSender,
    ) -> Result<(), RoomJoinRejection> {
        if self.peer_zu_raum.contains_key(&conn_id) {
            return Err(RoomJoinRejection::BereitsBeigetreten);
        }

        let mitglieder = self.raeume.entry(room_id.to_string()).or_default();
        if mitglieder.len() >= self.max_peers_per_room {
            if mitglieder.is_empty() {
                self.raeume.remove(room_id);
            }
            return Err(RoomJoinRejection::RaumVoll);
        }

        mitglieder.push(RaumMitglied { conn_id, sender });
        self.peer_zu_raum.insert(conn_id, room_id.to_string());
        Ok(())
    }

    /// Verlaesst den aktuellen Raum; `None` wenn die Verbindung in keinem ist
    pub fn raum_verlassen(&mut self, conn_id: ConnId) -> Option<RoomLeave> {
        let room_id = self.peer_zu_raum.remove(&conn_id)?;

        let mut remaining_peer_ids = Vec::new();
        if let Some(mitglieder) = self.raeume.get_mut(&room_id) {
            mitglieder.retain(|m| m.conn_id != conn_id);
            remaining_peer_ids = mitglieder.iter().map(|m| m.conn_id).collect();
            if mitglieder.is_empty() {
                self.raeume.remove(&room_id);
                tracing::debug!(room = %room_id, "Leerer Raum entfernt");
            }
        }

        Some(RoomLeave {
            room_id,
            remaining_peer_ids,
        })
    }

    pub fn raum_fuer_peer(&self, conn_id: &ConnId) -> Option<&str> {
        self.peer_zu_raum.get(conn_id).map(String::as_str)
    }

    pub fn peer_ids(&self, room_id: &str) -> Vec<ConnId> {
        self.raeume
            .get(room_id)
            .map(|m| m.iter().map(|m| m.conn_id).collect())
            .unwrap_or_default()
    }

    /// Sendet an alle offenen Mitglieder ausser `ausser`
    pub fn an_raum_senden(
        &self,
        room_id: &str,
        nachricht: &ServerMessage,
        ausser: Option<&ConnId>,
    ) -> usize {
        let Some(mitglieder) = self.raeume.get(room_id) else {
            return 0;
        };
        mitglieder
            .iter()
            .filter(|m| Some(&m.conn_id) != ausser)
            .filter(|m| m.sender.ist_offen())
            .filter(|m| m.sender.senden(Ausgehend::Nachricht(nachricht.clone())))
            .count()
    }

    /// Unicast; `false` wenn das Ziel fehlt oder nicht offen ist
    pub fn an_peer_senden(&self, room_id: &str, ziel: &ConnId, nachricht: ServerMessage) -> bool {
        self.raeume
            .get(room_id)
            .and_then(|m| m.iter().find(|m| &m.conn_id == ziel))
            .filter(|m| m.sender.ist_offen())
            .map(|m| m.sender.senden(Ausgehend::Nachricht(nachricht)))
            .unwrap_or(false)
    }

    // -----------------------------------------------------------------------
    // Identitaeten der Legacy-Peers
    // -----------------------------------------------------------------------

    pub fn identitaet_setzen(&mut self, conn_id: ConnId, identitaet: Identity) {
        self.identitaeten.insert(conn_id, identitaet);
    }

    pub fn identitaet(&self, conn_id: &ConnId) -> Option<&Identity> {
        self.identitaeten.get(conn_id)
    }

    pub fn identitaet_entfernen(&mut self, conn_id: &ConnId) -> Option<Identity> {
        self.identitaeten.remove(conn_id)
    }
}
