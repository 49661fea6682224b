//! Control-Protokoll (WebSocket, JSON)
//!
//! Definiert alle Nachrichten die zwischen Client und Relay ausgetauscht
//! werden.
//!
//! ## Design
//! - Jeder Frame ist ein JSON-Objekt mit `type`-Diskriminator
//! - Tagged Enums fuer typsichere Nachrichtentypen, Felder in camelCase
//! - SDP- und ICE-Payloads sind opake Strings und werden nie interpretiert

use serde::{Deserialize, Serialize};
use tavern_core::types::{ChannelId, Identity, TavernId};

// ---------------------------------------------------------------------------
// Oeffentliche Sichten (Views)
// ---------------------------------------------------------------------------

/// Mitgliedschafts-Datensatz eines Peers in einem Channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    pub public_key_hex: String,
    pub display_name: String,
    pub tavern_id: TavernId,
    pub channel_id: ChannelId,
    pub is_speaking: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Channel mit seinen aktuellen Peers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelView {
    pub id: ChannelId,
    pub name: String,
    pub peers: Vec<PeerInfo>,
}

/// Tavern mit allen Channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TavernView {
    pub id: TavernId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub channels: Vec<ChannelView>,
    pub created_by: String,
    pub created_at: String,
}

/// Eintrag der Legacy-Peer-Liste
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPeer {
    pub peer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
}

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Alle Nachrichten die ein Client senden darf
///
/// Unbekannte Felder werden ignoriert. Die inhaltliche Validierung (nicht
/// leere Strings) erfolgt in [`crate::codec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Legacy: einem Raum ohne Tavern-Kontext beitreten
    Join {
        room: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        identity: Option<Identity>,
    },
    CreateTavern {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        icon: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    JoinChannel {
        tavern_id: TavernId,
        channel_id: ChannelId,
        identity: Identity,
    },
    #[serde(rename_all = "camelCase")]
    LeaveChannel {
        tavern_id: TavernId,
        channel_id: ChannelId,
    },
    #[serde(rename_all = "camelCase")]
    GetTavernInfo { tavern_id: TavernId },
    #[serde(rename_all = "camelCase")]
    CreateChannel { tavern_id: TavernId, name: String },
    UpdateIdentity { identity: Identity },
    #[serde(rename_all = "camelCase")]
    Offer {
        sdp: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tavern_id: Option<TavernId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        channel_id: Option<ChannelId>,
    },
    #[serde(rename_all = "camelCase")]
    Answer {
        sdp: String,
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tavern_id: Option<TavernId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        channel_id: Option<ChannelId>,
    },
    #[serde(rename_all = "camelCase")]
    IceCandidate {
        candidate: String,
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tavern_id: Option<TavernId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        channel_id: Option<ChannelId>,
    },
}

impl ClientMessage {
    /// Der `type`-String der Nachricht (fuer Logs)
    pub fn typ(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::CreateTavern { .. } => "create-tavern",
            Self::JoinChannel { .. } => "join-channel",
            Self::LeaveChannel { .. } => "leave-channel",
            Self::GetTavernInfo { .. } => "get-tavern-info",
            Self::CreateChannel { .. } => "create-channel",
            Self::UpdateIdentity { .. } => "update-identity",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::IceCandidate { .. } => "ice-candidate",
        }
    }
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Alle Nachrichten die der Relay an Clients sendet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    Error {
        message: String,
    },
    TavernCreated {
        tavern: TavernView,
    },
    TavernInfo {
        tavern: TavernView,
    },
    #[serde(rename_all = "camelCase")]
    ChannelCreated {
        tavern_id: TavernId,
        channel: ChannelView,
    },
    #[serde(rename_all = "camelCase")]
    ChannelJoined {
        tavern_id: TavernId,
        channel_id: ChannelId,
        peers: Vec<PeerInfo>,
    },
    #[serde(rename_all = "camelCase")]
    PeerJoinedChannel {
        tavern_id: TavernId,
        channel_id: ChannelId,
        peer: PeerInfo,
    },
    #[serde(rename_all = "camelCase")]
    PeerLeftChannel {
        tavern_id: TavernId,
        channel_id: ChannelId,
        public_key_hex: String,
    },
    #[serde(rename_all = "camelCase")]
    PeerIdentityUpdated {
        peer_id: String,
        identity: Identity,
    },
    SessionReplaced {},
    ServerShutdown {},

    // --- Legacy-Raeume ---
    PeerList {
        peers: Vec<RoomPeer>,
    },
    #[serde(rename_all = "camelCase")]
    PeerJoined {
        peer_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        identity: Option<Identity>,
    },
    #[serde(rename_all = "camelCase")]
    PeerLeft {
        peer_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        identity: Option<Identity>,
    },

    // --- Weitergeleitete Signalisierung ---
    Offer {
        from: String,
        sdp: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        identity: Option<Identity>,
    },
    Answer {
        from: String,
        sdp: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        identity: Option<Identity>,
    },
    IceCandidate {
        from: String,
        candidate: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        identity: Option<Identity>,
    },
}

impl ServerMessage {
    /// Erstellt eine Fehlernachricht
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn identitaet() -> Identity {
        Identity {
            public_key_hex: "aa11".into(),
            tag: "TVN-0001-0001".into(),
            display_name: Some("Alice".into()),
        }
    }

    #[test]
    fn join_channel_aus_json() {
        let json = json!({
            "type": "join-channel",
            "tavernId": "t1",
            "channelId": "c1",
            "identity": { "publicKeyHex": "aa11", "tag": "TVN-0001-0001", "displayName": "Alice" }
        });
        let nachricht: ClientMessage = serde_json::from_value(json).unwrap();
        assert_eq!(
            nachricht,
            ClientMessage::JoinChannel {
                tavern_id: TavernId::from("t1"),
                channel_id: ChannelId::from("c1"),
                identity: identitaet(),
            }
        );
        assert_eq!(nachricht.typ(), "join-channel");
    }

    #[test]
    fn offer_ohne_kontext() {
        let nachricht: ClientMessage =
            serde_json::from_value(json!({ "type": "offer", "sdp": "v=0" })).unwrap();
        assert!(matches!(
            nachricht,
            ClientMessage::Offer { target: None, tavern_id: None, channel_id: None, .. }
        ));
    }

    #[test]
    fn session_replaced_ist_nur_typ() {
        let json = serde_json::to_value(ServerMessage::SessionReplaced {}).unwrap();
        assert_eq!(json, json!({ "type": "session-replaced" }));
        let json = serde_json::to_value(ServerMessage::ServerShutdown {}).unwrap();
        assert_eq!(json, json!({ "type": "server-shutdown" }));
    }

    #[test]
    fn peer_left_channel_felder_camel_case() {
        let json = serde_json::to_value(ServerMessage::PeerLeftChannel {
            tavern_id: TavernId::from("t"),
            channel_id: ChannelId::from("c"),
            public_key_hex: "bbb".into(),
        })
        .unwrap();
        assert_eq!(
            json,
            json!({ "type": "peer-left-channel", "tavernId": "t", "channelId": "c", "publicKeyHex": "bbb" })
        );
    }

    #[test]
    fn tavern_view_ohne_icon_laesst_feld_weg() {
        let view = TavernView {
            id: TavernId::from("t"),
            name: "Schenke".into(),
            icon: None,
            channels: vec![ChannelView {
                id: ChannelId::from("c"),
                name: "General".into(),
                peers: vec![],
            }],
            created_by: "".into(),
            created_at: "2024-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("icon").is_none());
        assert_eq!(json["createdBy"], "");
        assert_eq!(json["channels"][0]["name"], "General");
    }

    #[test]
    fn relay_nachricht_traegt_from() {
        let json = serde_json::to_value(ServerMessage::IceCandidate {
            from: "alice_pk".into(),
            candidate: "candidate:1".into(),
            identity: None,
        })
        .unwrap();
        assert_eq!(
            json,
            json!({ "type": "ice-candidate", "from": "alice_pk", "candidate": "candidate:1" })
        );
    }
}
