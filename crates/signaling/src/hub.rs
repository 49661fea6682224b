//! Hub – der gesamte veraenderliche Relay-Zustand hinter einem Lock
//!
//! Presence-Core, Legacy-Raeume, Session-Zuordnung, Rate-Limit-Fenster und
//! Verbindungszustand liegen gemeinsam in einem [`Hub`]. Jeder Handler haelt
//! den Hub-Lock vom Lesen bis zum Schreiben; Verlagerung und Verdraengung
//! werden dadurch von anderen Verbindungen nur als Ganzes beobachtet.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tavern_core::types::{ConnId, Identity};
use tavern_db::TavernStore;
use tavern_protocol::ServerMessage;

use crate::broadcast::EventBroadcaster;
use crate::heartbeat::VerbindungsZustand;
use crate::presence::PresenceCore;
use crate::rate_limit::{RateLimitKonfig, RateLimiter};
use crate::rooms::RoomRegistry;
use crate::session::SessionRegistry;

const DURCHSATZ_FENSTER: Duration = Duration::from_secs(1);

/// Zustand einer verbundenen WebSocket-Verbindung
#[derive(Debug)]
pub struct Verbindung {
    pub ip: IpAddr,
    pub heartbeat: VerbindungsZustand,
    /// Zuletzt per `join-channel` oder `update-identity` gemeldete Identitaet
    pub letzte_identitaet: Option<Identity>,
}

/// Was beim Bereinigen einer Verbindung tatsaechlich entfernt wurde
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Bereinigung {
    pub channel_verlassen: bool,
    pub raum_verlassen: bool,
    pub verbindung_entfernt: bool,
}

pub struct Hub {
    pub presence: PresenceCore,
    pub rooms: RoomRegistry,
    pub sessions: SessionRegistry,
    pub limiter: RateLimiter,
    pub verbindungen: HashMap<ConnId, Verbindung>,
    durchsatz: VecDeque<Instant>,
}

impl Hub {
    pub fn neu(
        store: Arc<dyn TavernStore>,
        max_peers_per_channel: usize,
        max_peers_per_room: usize,
        rate_limit: RateLimitKonfig,
    ) -> Self {
        Self {
            presence: PresenceCore::neu(store, max_peers_per_channel),
            rooms: RoomRegistry::neu(max_peers_per_room),
            sessions: SessionRegistry::neu(),
            limiter: RateLimiter::neu(rate_limit),
            verbindungen: HashMap::new(),
            durchsatz: VecDeque::new(),
        }
    }

    pub fn verbindung_anlegen(&mut self, conn_id: ConnId, ip: IpAddr) {
        self.verbindungen.insert(
            conn_id,
            Verbindung {
                ip,
                heartbeat: VerbindungsZustand::neu(),
                letzte_identitaet: None,
            },
        );
    }

    // -----------------------------------------------------------------------
    // Durchsatz (messagesPerSecond)
    // -----------------------------------------------------------------------

    pub fn nachricht_zaehlen_at(&mut self, jetzt: Instant) {
        self.durchsatz_beschneiden(jetzt);
        self.durchsatz.push_back(jetzt);
    }

    pub fn nachrichten_pro_sekunde_at(&mut self, jetzt: Instant) -> u64 {
        self.durchsatz_beschneiden(jetzt);
        self.durchsatz.len() as u64
    }

    fn durchsatz_beschneiden(&mut self, jetzt: Instant) {
        while let Some(&erster) = self.durchsatz.front() {
            if jetzt.duration_since(erster) >= DURCHSATZ_FENSTER {
                self.durchsatz.pop_front();
            } else {
                break;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Bereinigung
    // -----------------------------------------------------------------------

    /// Entfernt allen Zustand einer Verbindung und benachrichtigt die Peers
    ///
    /// Idempotent: ein zweiter Aufruf findet nichts mehr und sendet nichts.
    /// Die Send-Queue im Broadcaster bleibt registriert, bis der
    /// Verbindungs-Task endet.
    pub fn verbindung_bereinigen(
        &mut self,
        conn_id: ConnId,
        broadcaster: &EventBroadcaster,
    ) -> Bereinigung {
        let mut ergebnis = Bereinigung::default();

        if let Some((ort, peer)) = self.presence.aktuellen_channel_verlassen(conn_id) {
            let nachricht = ServerMessage::PeerLeftChannel {
                tavern_id: ort.tavern_id.clone(),
                channel_id: ort.channel_id.clone(),
                public_key_hex: peer.public_key_hex,
            };
            broadcaster.an_channel_senden(
                &self.presence,
                &ort.tavern_id,
                &ort.channel_id,
                &nachricht,
                None,
            );
            ergebnis.channel_verlassen = true;
        }

        let identitaet = self.rooms.identitaet_entfernen(&conn_id);
        if let Some(leave) = self.rooms.raum_verlassen(conn_id) {
            let nachricht = ServerMessage::PeerLeft {
                peer_id: conn_id.to_string(),
                identity: identitaet,
            };
            self.rooms.an_raum_senden(&leave.room_id, &nachricht, None);
            ergebnis.raum_verlassen = true;
        }

        self.sessions.freigeben_fuer(&conn_id);
        self.limiter.verbindung_entfernen(&conn_id);
        ergebnis.verbindung_entfernt = self.verbindungen.remove(&conn_id).is_some();

        ergebnis
    }
}
