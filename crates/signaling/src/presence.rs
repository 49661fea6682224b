//! Presence-Core – Taverns, Channels und wer sich wo befindet
//!
//! Haelt den Laufzeit-Index `Tavern -> Channel -> Mitglieder` und die
//! Rueckwaertsabbildung `ConnId -> PeerLocation`. Beide werden nur gemeinsam
//! veraendert: eine Verbindung steht genau dann in der Mitgliederliste eines
//! Channels, wenn ihre Location auf diesen Channel zeigt.
//!
//! Der Core selbst ist nicht synchronisiert; er lebt im [`crate::hub::Hub`]
//! hinter dem einen Hub-Mutex. Einzige Suspension-Points sind Store-Aufrufe.

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tavern_core::types::{ChannelId, ConnId, Identity, TavernId};
use tavern_db::{ChannelRecord, TavernRecord, TavernStore};
use tavern_protocol::{ChannelView, PeerInfo, TavernView};

use crate::error::{JoinRejection, PresenceError};

/// Name des Channels der mit jeder Tavern angelegt wird
pub const STANDARD_CHANNEL: &str = "General";

// ---------------------------------------------------------------------------
// Laufzeit-Zustand
// ---------------------------------------------------------------------------

/// Aktueller Aufenthaltsort einer Verbindung
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerLocation {
    pub tavern_id: TavernId,
    pub channel_id: ChannelId,
}

#[derive(Debug, Clone)]
struct Mitglied {
    conn_id: ConnId,
    peer: PeerInfo,
}

#[derive(Debug)]
struct ChannelState {
    id: ChannelId,
    name: String,
    /// In Beitrittsreihenfolge
    mitglieder: Vec<Mitglied>,
}

impl ChannelState {
    fn neu(id: ChannelId, name: String) -> Self {
        Self {
            id,
            name,
            mitglieder: Vec::new(),
        }
    }

    fn mitglied(&self, conn_id: &ConnId) -> Option<&PeerInfo> {
        self.mitglieder
            .iter()
            .find(|m| &m.conn_id == conn_id)
            .map(|m| &m.peer)
    }

    fn mitglied_mut(&mut self, conn_id: &ConnId) -> Option<&mut PeerInfo> {
        self.mitglieder
            .iter_mut()
            .find(|m| &m.conn_id == conn_id)
            .map(|m| &mut m.peer)
    }

    fn entfernen(&mut self, conn_id: &ConnId) -> Option<PeerInfo> {
        let pos = self.mitglieder.iter().position(|m| &m.conn_id == conn_id)?;
        Some(self.mitglieder.remove(pos).peer)
    }

    fn peers(&self) -> Vec<PeerInfo> {
        self.mitglieder.iter().map(|m| m.peer.clone()).collect()
    }

    fn view(&self) -> ChannelView {
        ChannelView {
            id: self.id.clone(),
            name: self.name.clone(),
            peers: self.peers(),
        }
    }
}

#[derive(Debug)]
struct TavernState {
    id: TavernId,
    name: String,
    icon: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    /// In Erstellungsreihenfolge
    channels: Vec<ChannelState>,
}

impl TavernState {
    fn channel(&self, id: &ChannelId) -> Option<&ChannelState> {
        self.channels.iter().find(|c| &c.id == id)
    }

    fn channel_mut(&mut self, id: &ChannelId) -> Option<&mut ChannelState> {
        self.channels.iter_mut().find(|c| &c.id == id)
    }

    fn view(&self) -> TavernView {
        TavernView {
            id: self.id.clone(),
            name: self.name.clone(),
            icon: self.icon.clone(),
            channels: self.channels.iter().map(ChannelState::view).collect(),
            created_by: self.created_by.clone(),
            created_at: self.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Ergebnis eines erfolgreichen `join-channel`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Vorheriger Channel bei impliziter Verlagerung
    pub previous_location: Option<PeerLocation>,
    /// Mitglieder vor dem Beitritt, ohne den Beitretenden
    pub existing_peers: Vec<PeerInfo>,
    pub joined_peer: PeerInfo,
    /// Wiederholter Beitritt in denselben Channel; keine Broadcasts
    pub already_joined: bool,
}

fn leeres_icon_zu_none(icon: String) -> Option<String> {
    if icon.is_empty() {
        None
    } else {
        Some(icon)
    }
}

// ---------------------------------------------------------------------------
// PresenceCore
// ---------------------------------------------------------------------------

/// In-Memory-Index aller Taverns, Channels und Channel-Mitglieder
pub struct PresenceCore {
    store: Arc<dyn TavernStore>,
    max_peers_per_channel: usize,
    taverns: HashMap<TavernId, TavernState>,
    peer_locations: HashMap<ConnId, PeerLocation>,
}

impl PresenceCore {
    pub fn neu(store: Arc<dyn TavernStore>, max_peers_per_channel: usize) -> Self {
        Self {
            store,
            max_peers_per_channel,
            taverns: HashMap::new(),
            peer_locations: HashMap::new(),
        }
    }

    /// Der zugrunde liegende Store
    pub fn store(&self) -> &Arc<dyn TavernStore> {
        &self.store
    }

    /// Laedt alle Taverns und Channels aus dem Store (ohne Mitglieder)
    ///
    /// Einmal beim Start, bevor Verbindungen angenommen werden.
    pub async fn init(&mut self) -> Result<(), PresenceError> {
        let records = self.store.list_taverns().await?;

        for record in records {
            let channels = self
                .store
                .get_channels(&record.id)
                .await?
                .into_iter()
                .map(|c| ChannelState::neu(c.id, c.name))
                .collect();

            self.taverns.insert(
                record.id.clone(),
                TavernState {
                    id: record.id,
                    name: record.name,
                    icon: leeres_icon_zu_none(record.icon),
                    created_by: record.creator_public_key,
                    created_at: record.created_at,
                    channels,
                },
            );
        }

        tracing::info!(
            taverns = self.taverns.len(),
            backend = self.store.backend_name(),
            "Presence-Core aus Store geladen"
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Taverns und Channels
    // -----------------------------------------------------------------------

    /// Legt eine Tavern samt Standard-Channel "General" an
    pub async fn tavern_erstellen(
        &mut self,
        name: &str,
        icon: Option<String>,
        ersteller: &str,
    ) -> Result<TavernView, PresenceError> {
        let jetzt = Utc::now();
        let tavern_id = TavernId::generieren();
        let channel_id = ChannelId::generieren();

        let tavern_record = TavernRecord {
            id: tavern_id.clone(),
            name: name.to_string(),
            icon: icon.clone().unwrap_or_default(),
            creator_public_key: ersteller.to_string(),
            signaling_url: String::new(),
            created_at: jetzt,
        };
        let channel_record = ChannelRecord {
            id: channel_id.clone(),
            tavern_id: tavern_id.clone(),
            name: STANDARD_CHANNEL.to_string(),
            created_at: jetzt,
        };

        self.store
            .create_tavern_with_channel(&tavern_record, &channel_record)
            .await?;

        let state = TavernState {
            id: tavern_id.clone(),
            name: name.to_string(),
            icon: icon.filter(|i| !i.is_empty()),
            created_by: ersteller.to_string(),
            created_at: jetzt,
            channels: vec![ChannelState::neu(channel_id, STANDARD_CHANNEL.to_string())],
        };
        let view = state.view();
        self.taverns.insert(tavern_id, state);
        Ok(view)
    }

    pub fn tavern_info(&self, tavern_id: &TavernId) -> Option<TavernView> {
        self.taverns.get(tavern_id).map(TavernState::view)
    }

    /// Legt einen weiteren Channel in einer bestehenden Tavern an
    pub async fn channel_erstellen(
        &mut self,
        tavern_id: &TavernId,
        name: &str,
    ) -> Result<ChannelView, PresenceError> {
        if !self.taverns.contains_key(tavern_id) {
            return Err(PresenceError::TavernNichtGefunden);
        }

        let record = ChannelRecord {
            id: ChannelId::generieren(),
            tavern_id: tavern_id.clone(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.store.create_channel(tavern_id, &record).await?;

        // Die Tavern kann waehrend des Store-Aufrufs nicht verschwinden
        // (Hub-Lock), trotzdem nicht blind indizieren.
        let tavern = self
            .taverns
            .get_mut(tavern_id)
            .ok_or(PresenceError::TavernNichtGefunden)?;
        let channel = ChannelState::neu(record.id, record.name);
        let view = channel.view();
        tavern.channels.push(channel);
        Ok(view)
    }

    /// Loescht einen Channel; gibt die bisherigen Mitglieder zurueck
    ///
    /// Der letzte Channel einer Tavern kann nicht geloescht werden.
    pub async fn channel_loeschen(
        &mut self,
        tavern_id: &TavernId,
        channel_id: &ChannelId,
    ) -> Result<Vec<ConnId>, PresenceError> {
        let tavern = self
            .taverns
            .get(tavern_id)
            .ok_or(PresenceError::TavernNichtGefunden)?;
        if tavern.channel(channel_id).is_none() {
            return Err(PresenceError::ChannelNichtGefunden);
        }
        if tavern.channels.len() <= 1 {
            return Err(PresenceError::LetzterChannel);
        }

        self.store.delete_channel(tavern_id, channel_id).await?;

        let mut mitglieder = Vec::new();
        if let Some(tavern) = self.taverns.get_mut(tavern_id) {
            if let Some(pos) = tavern.channels.iter().position(|c| &c.id == channel_id) {
                let channel = tavern.channels.remove(pos);
                mitglieder = channel.mitglieder.into_iter().map(|m| m.conn_id).collect();
            }
        }
        for conn_id in &mitglieder {
            self.peer_locations.remove(conn_id);
        }
        Ok(mitglieder)
    }

    /// Loescht eine Tavern samt Channels; gibt alle bisherigen Mitglieder zurueck
    pub async fn tavern_loeschen(
        &mut self,
        tavern_id: &TavernId,
    ) -> Result<Vec<ConnId>, PresenceError> {
        if !self.taverns.contains_key(tavern_id) {
            return Err(PresenceError::TavernNichtGefunden);
        }

        self.store.delete_tavern(tavern_id).await?;

        let mitglieder: Vec<ConnId> = self
            .taverns
            .remove(tavern_id)
            .map(|t| {
                t.channels
                    .into_iter()
                    .flat_map(|c| c.mitglieder.into_iter().map(|m| m.conn_id))
                    .collect()
            })
            .unwrap_or_default();
        for conn_id in &mitglieder {
            self.peer_locations.remove(conn_id);
        }
        Ok(mitglieder)
    }

    // -----------------------------------------------------------------------
    // Mitgliedschaft
    // -----------------------------------------------------------------------

    /// Tritt einem Channel bei
    ///
    /// Ablauf: Ziel aufloesen, idempotenter Wiederbeitritt, Kapazitaet pruefen,
    /// aus altem Channel entfernen, Kapazitaet erneut pruefen, einfuegen.
    /// Eine Ablehnung laesst den Zustand unveraendert.
    pub fn channel_beitreten(
        &mut self,
        conn_id: ConnId,
        tavern_id: &TavernId,
        channel_id: &ChannelId,
        identitaet: &Identity,
    ) -> Result<JoinOutcome, JoinRejection> {
        let max = self.max_peers_per_channel;

        let tavern = self
            .taverns
            .get(tavern_id)
            .ok_or(JoinRejection::TavernNichtGefunden)?;
        let channel = tavern
            .channel(channel_id)
            .ok_or(JoinRejection::ChannelNichtGefunden)?;

        let aktuelle = self.peer_locations.get(&conn_id).cloned();

        if let Some(ort) = &aktuelle {
            if &ort.tavern_id == tavern_id && &ort.channel_id == channel_id {
                if let Some(ich) = channel.mitglied(&conn_id) {
                    let existing_peers = channel
                        .mitglieder
                        .iter()
                        .filter(|m| m.peer.public_key_hex != ich.public_key_hex)
                        .map(|m| m.peer.clone())
                        .collect();
                    return Ok(JoinOutcome {
                        previous_location: None,
                        existing_peers,
                        joined_peer: ich.clone(),
                        already_joined: true,
                    });
                }
            }
        }

        // Eine Verlagerung gibt im Ziel keinen Platz frei; volle Ziele werden
        // daher vor dem Verlassen des alten Channels abgelehnt.
        if channel.mitglieder.len() >= max {
            return Err(JoinRejection::ChannelVoll);
        }

        if let Some(ort) = &aktuelle {
            self.channel_verlassen(conn_id, &ort.tavern_id, &ort.channel_id);
        }

        let channel = self
            .taverns
            .get_mut(tavern_id)
            .and_then(|t| t.channel_mut(channel_id))
            .ok_or(JoinRejection::ChannelNichtGefunden)?;

        if channel.mitglieder.len() >= max {
            return Err(JoinRejection::ChannelVoll);
        }

        let peer = PeerInfo {
            public_key_hex: identitaet.public_key_hex.clone(),
            display_name: identitaet.anzeigename(),
            tavern_id: tavern_id.clone(),
            channel_id: channel_id.clone(),
            is_speaking: false,
            tag: Some(identitaet.tag.clone()),
        };

        let existing_peers = channel.peers();
        channel.mitglieder.push(Mitglied {
            conn_id,
            peer: peer.clone(),
        });
        self.peer_locations.insert(
            conn_id,
            PeerLocation {
                tavern_id: tavern_id.clone(),
                channel_id: channel_id.clone(),
            },
        );

        Ok(JoinOutcome {
            previous_location: aktuelle,
            existing_peers,
            joined_peer: peer,
            already_joined: false,
        })
    }

    /// Verlaesst einen Channel; `None` wenn die Verbindung dort nicht Mitglied ist
    pub fn channel_verlassen(
        &mut self,
        conn_id: ConnId,
        tavern_id: &TavernId,
        channel_id: &ChannelId,
    ) -> Option<PeerInfo> {
        let peer = self
            .taverns
            .get_mut(tavern_id)?
            .channel_mut(channel_id)?
            .entfernen(&conn_id)?;
        self.peer_locations.remove(&conn_id);
        Some(peer)
    }

    /// Verlaesst den aktuellen Channel (Disconnect-Pfad)
    pub fn aktuellen_channel_verlassen(&mut self, conn_id: ConnId) -> Option<(PeerLocation, PeerInfo)> {
        let ort = self.peer_locations.get(&conn_id)?.clone();
        let peer = self.channel_verlassen(conn_id, &ort.tavern_id, &ort.channel_id)?;
        Some((ort, peer))
    }

    /// Ueberschreibt Identitaetsfelder des Mitglieds-Datensatzes an Ort und Stelle
    ///
    /// Gibt `(alt, neu)` zurueck. Keine Eindeutigkeitspruefung des neuen
    /// Schluessels gegen andere Mitglieder.
    pub fn identitaet_aktualisieren(
        &mut self,
        conn_id: ConnId,
        identitaet: &Identity,
    ) -> Option<(PeerInfo, PeerInfo)> {
        let ort = self.peer_locations.get(&conn_id)?.clone();
        let peer = self
            .taverns
            .get_mut(&ort.tavern_id)?
            .channel_mut(&ort.channel_id)?
            .mitglied_mut(&conn_id)?;

        let alt = peer.clone();
        peer.public_key_hex = identitaet.public_key_hex.clone();
        peer.display_name = identitaet.anzeigename();
        peer.tag = Some(identitaet.tag.clone());
        Some((alt, peer.clone()))
    }

    // -----------------------------------------------------------------------
    // Lesezugriffe
    // -----------------------------------------------------------------------

    /// Sucht die Verbindung mit diesem Schluessel in einem Channel
    pub fn peer_id_per_schluessel(
        &self,
        tavern_id: &TavernId,
        channel_id: &ChannelId,
        public_key_hex: &str,
    ) -> Option<ConnId> {
        self.taverns
            .get(tavern_id)?
            .channel(channel_id)?
            .mitglieder
            .iter()
            .find(|m| m.peer.public_key_hex == public_key_hex)
            .map(|m| m.conn_id)
    }

    pub fn peer_ids_in_channel(&self, tavern_id: &TavernId, channel_id: &ChannelId) -> Vec<ConnId> {
        self.taverns
            .get(tavern_id)
            .and_then(|t| t.channel(channel_id))
            .map(|c| c.mitglieder.iter().map(|m| m.conn_id).collect())
            .unwrap_or_default()
    }

    pub fn peer_info(&self, conn_id: &ConnId) -> Option<PeerInfo> {
        let ort = self.peer_locations.get(conn_id)?;
        self.taverns
            .get(&ort.tavern_id)?
            .channel(&ort.channel_id)?
            .mitglied(conn_id)
            .cloned()
    }

    pub fn peer_location(&self, conn_id: &ConnId) -> Option<PeerLocation> {
        self.peer_locations.get(conn_id).cloned()
    }

    pub fn tavern_anzahl(&self) -> usize {
        self.taverns.len()
    }

    /// Taverns mit mindestens einem Mitglied in irgendeinem Channel
    pub fn aktive_tavern_anzahl(&self) -> usize {
        self.taverns
            .values()
            .filter(|t| t.channels.iter().any(|c| !c.mitglieder.is_empty()))
            .count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tavern_db::MemoryStore;

    fn neuer_core(max: usize) -> PresenceCore {
        PresenceCore::neu(Arc::new(MemoryStore::neu()), max)
    }

    fn identitaet(schluessel: &str) -> Identity {
        Identity {
            public_key_hex: schluessel.to_string(),
            tag: format!("TVN-{schluessel}"),
            display_name: Some(format!("Peer {schluessel}")),
        }
    }

    async fn tavern_mit_channel(core: &mut PresenceCore) -> (TavernId, ChannelId) {
        let tavern = core.tavern_erstellen("X", None, "").await.unwrap();
        (tavern.id, tavern.channels[0].id.clone())
    }

    #[tokio::test]
    async fn tavern_hat_genau_einen_general_channel() {
        let mut core = neuer_core(8);
        let tavern = core.tavern_erstellen("X", Some("🍺".into()), "pk").await.unwrap();

        assert_eq!(tavern.channels.len(), 1);
        assert_eq!(tavern.channels[0].name, "General");
        assert!(tavern.channels[0].peers.is_empty());
        assert_eq!(tavern.icon.as_deref(), Some("🍺"));
        assert_eq!(tavern.created_by, "pk");

        let kanaele = core.store().get_channels(&tavern.id).await.unwrap();
        assert_eq!(kanaele.len(), 1);
        assert_eq!(kanaele[0].name, "General");
    }

    #[tokio::test]
    async fn kapazitaet_acht_neunter_abgelehnt() {
        let mut core = neuer_core(8);
        let (t, c) = tavern_mit_channel(&mut core).await;

        for i in 0..8 {
            let ergebnis = core.channel_beitreten(ConnId::new(), &t, &c, &identitaet(&i.to_string()));
            assert!(ergebnis.is_ok(), "Beitritt {i} muss gelingen");
        }
        let neunter = core.channel_beitreten(ConnId::new(), &t, &c, &identitaet("9"));
        assert_eq!(neunter, Err(JoinRejection::ChannelVoll));
        assert_eq!(core.peer_ids_in_channel(&t, &c).len(), 8);
    }

    #[tokio::test]
    async fn unbekannte_ziele() {
        let mut core = neuer_core(8);
        let (t, _) = tavern_mit_channel(&mut core).await;
        let conn = ConnId::new();

        assert_eq!(
            core.channel_beitreten(conn, &TavernId::from("fehlt"), &ChannelId::from("c"), &identitaet("a")),
            Err(JoinRejection::TavernNichtGefunden)
        );
        assert_eq!(
            core.channel_beitreten(conn, &t, &ChannelId::from("fehlt"), &identitaet("a")),
            Err(JoinRejection::ChannelNichtGefunden)
        );
        assert!(core.peer_location(&conn).is_none());
    }

    #[tokio::test]
    async fn wiederholter_beitritt_ist_idempotent() {
        let mut core = neuer_core(8);
        let (t, c) = tavern_mit_channel(&mut core).await;
        let anderer = ConnId::new();
        let ich = ConnId::new();
        core.channel_beitreten(anderer, &t, &c, &identitaet("b")).unwrap();

        let erster = core.channel_beitreten(ich, &t, &c, &identitaet("a")).unwrap();
        let zweiter = core.channel_beitreten(ich, &t, &c, &identitaet("a")).unwrap();

        assert!(!erster.already_joined);
        assert!(zweiter.already_joined);
        assert!(zweiter.previous_location.is_none());
        for ergebnis in [&erster, &zweiter] {
            assert_eq!(ergebnis.existing_peers.len(), 1);
            assert_eq!(ergebnis.existing_peers[0].public_key_hex, "b");
        }
        assert_eq!(core.peer_ids_in_channel(&t, &c).len(), 2);
    }

    #[tokio::test]
    async fn beitritt_verlagert_aus_altem_channel() {
        let mut core = neuer_core(8);
        let (t, a) = tavern_mit_channel(&mut core).await;
        let b = core.channel_erstellen(&t, "Voice").await.unwrap().id;
        let conn = ConnId::new();

        core.channel_beitreten(conn, &t, &a, &identitaet("k")).unwrap();
        let ergebnis = core.channel_beitreten(conn, &t, &b, &identitaet("k")).unwrap();

        assert_eq!(
            ergebnis.previous_location,
            Some(PeerLocation {
                tavern_id: t.clone(),
                channel_id: a.clone()
            })
        );
        assert!(core.peer_ids_in_channel(&t, &a).is_empty());
        assert_eq!(core.peer_ids_in_channel(&t, &b), vec![conn]);
        assert_eq!(core.peer_location(&conn).unwrap().channel_id, b);
    }

    #[tokio::test]
    async fn verlagerung_in_vollen_channel_abgelehnt() {
        let mut core = neuer_core(1);
        let (t, a) = tavern_mit_channel(&mut core).await;
        let b = core.channel_erstellen(&t, "Voice").await.unwrap().id;
        let belegt = ConnId::new();
        let conn = ConnId::new();

        core.channel_beitreten(belegt, &t, &b, &identitaet("x")).unwrap();
        core.channel_beitreten(conn, &t, &a, &identitaet("k")).unwrap();

        let ergebnis = core.channel_beitreten(conn, &t, &b, &identitaet("k"));
        assert_eq!(ergebnis, Err(JoinRejection::ChannelVoll));
        assert_eq!(core.peer_location(&conn).unwrap().channel_id, a);
        assert_eq!(core.peer_ids_in_channel(&t, &a), vec![conn]);
    }

    #[tokio::test]
    async fn beitreten_verlassen_beitreten_stellt_menge_wieder_her() {
        let mut core = neuer_core(8);
        let (t, c) = tavern_mit_channel(&mut core).await;
        let conns: Vec<ConnId> = (0..3).map(|_| ConnId::new()).collect();
        for (i, conn) in conns.iter().enumerate() {
            core.channel_beitreten(*conn, &t, &c, &identitaet(&i.to_string())).unwrap();
        }
        let vorher: HashSet<ConnId> = core.peer_ids_in_channel(&t, &c).into_iter().collect();

        assert!(core.channel_verlassen(conns[0], &t, &c).is_some());
        assert!(core.channel_verlassen(conns[0], &t, &c).is_none());
        core.channel_beitreten(conns[0], &t, &c, &identitaet("0")).unwrap();

        let nachher: HashSet<ConnId> = core.peer_ids_in_channel(&t, &c).into_iter().collect();
        assert_eq!(vorher, nachher);
    }

    #[tokio::test]
    async fn aktuellen_channel_verlassen() {
        let mut core = neuer_core(8);
        let (t, c) = tavern_mit_channel(&mut core).await;
        let conn = ConnId::new();
        assert!(core.aktuellen_channel_verlassen(conn).is_none());

        core.channel_beitreten(conn, &t, &c, &identitaet("k")).unwrap();
        let (ort, peer) = core.aktuellen_channel_verlassen(conn).unwrap();
        assert_eq!(ort.channel_id, c);
        assert_eq!(peer.public_key_hex, "k");
        assert!(core.peer_info(&conn).is_none());
    }

    #[tokio::test]
    async fn identitaet_an_ort_und_stelle() {
        let mut core = neuer_core(8);
        let (t, c) = tavern_mit_channel(&mut core).await;
        let conn = ConnId::new();
        core.channel_beitreten(conn, &t, &c, &identitaet("alt")).unwrap();

        let neu = Identity {
            public_key_hex: "neu".into(),
            tag: "TVN-neu".into(),
            display_name: Some("  ".into()),
        };
        let (vorher, nachher) = core.identitaet_aktualisieren(conn, &neu).unwrap();
        assert_eq!(vorher.public_key_hex, "alt");
        assert_eq!(nachher.public_key_hex, "neu");
        assert_eq!(nachher.display_name, "TVN-neu");
        assert_eq!(core.peer_id_per_schluessel(&t, &c, "neu"), Some(conn));
        assert_eq!(core.peer_id_per_schluessel(&t, &c, "alt"), None);

        assert!(core.identitaet_aktualisieren(ConnId::new(), &neu).is_none());
    }

    #[tokio::test]
    async fn anzeigename_faellt_auf_tag_zurueck() {
        let mut core = neuer_core(8);
        let (t, c) = tavern_mit_channel(&mut core).await;
        let ohne_namen = Identity {
            public_key_hex: "k".into(),
            tag: "TVN-1234-5678".into(),
            display_name: None,
        };
        let ergebnis = core.channel_beitreten(ConnId::new(), &t, &c, &ohne_namen).unwrap();
        assert_eq!(ergebnis.joined_peer.display_name, "TVN-1234-5678");
        assert_eq!(ergebnis.joined_peer.tag.as_deref(), Some("TVN-1234-5678"));
        assert!(!ergebnis.joined_peer.is_speaking);
    }

    #[tokio::test]
    async fn channel_erstellen_unbekannte_tavern() {
        let mut core = neuer_core(8);
        let ergebnis = core.channel_erstellen(&TavernId::from("fehlt"), "Voice").await;
        assert!(matches!(ergebnis, Err(PresenceError::TavernNichtGefunden)));
    }

    #[tokio::test]
    async fn init_laedt_huelle_aus_store() {
        let store: Arc<dyn TavernStore> = Arc::new(MemoryStore::neu());
        let tavern_id = {
            let mut erster = PresenceCore::neu(store.clone(), 8);
            let tavern = erster.tavern_erstellen("Persistent", None, "pk").await.unwrap();
            erster.channel_erstellen(&tavern.id, "Voice").await.unwrap();
            tavern.id
        };

        let mut zweiter = PresenceCore::neu(store, 8);
        zweiter.init().await.unwrap();

        let info = zweiter.tavern_info(&tavern_id).unwrap();
        assert_eq!(info.name, "Persistent");
        let namen: Vec<&str> = info.channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(namen, vec!["General", "Voice"]);
        assert!(info.channels.iter().all(|c| c.peers.is_empty()));
        assert_eq!(zweiter.aktive_tavern_anzahl(), 0);
    }

    #[tokio::test]
    async fn aktive_taverns_zaehlen_nur_mit_mitgliedern() {
        let mut core = neuer_core(8);
        let (t, c) = tavern_mit_channel(&mut core).await;
        tavern_mit_channel(&mut core).await;
        assert_eq!(core.tavern_anzahl(), 2);
        assert_eq!(core.aktive_tavern_anzahl(), 0);

        core.channel_beitreten(ConnId::new(), &t, &c, &identitaet("k")).unwrap();
        assert_eq!(core.aktive_tavern_anzahl(), 1);
    }

    #[tokio::test]
    async fn tavern_loeschen_raeumt_mitglieder_und_store() {
        let mut core = neuer_core(8);
        let (t, c) = tavern_mit_channel(&mut core).await;
        let conn = ConnId::new();
        core.channel_beitreten(conn, &t, &c, &identitaet("k")).unwrap();

        let betroffen = core.tavern_loeschen(&t).await.unwrap();
        assert_eq!(betroffen, vec![conn]);
        assert!(core.tavern_info(&t).is_none());
        assert!(core.peer_location(&conn).is_none());
        assert!(core.store().get_channels(&t).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn channel_loeschen() {
        let mut core = neuer_core(8);
        let (t, general) = tavern_mit_channel(&mut core).await;
        assert!(matches!(
            core.channel_loeschen(&t, &general).await,
            Err(PresenceError::LetzterChannel)
        ));

        let voice = core.channel_erstellen(&t, "Voice").await.unwrap().id;
        let conn = ConnId::new();
        core.channel_beitreten(conn, &t, &voice, &identitaet("k")).unwrap();

        let betroffen = core.channel_loeschen(&t, &voice).await.unwrap();
        assert_eq!(betroffen, vec![conn]);
        assert!(core.peer_location(&conn).is_none());
        assert_eq!(core.tavern_info(&t).unwrap().channels.len(), 1);
        assert_eq!(core.store().get_channels(&t).await.unwrap().len(), 1);
    }
}
