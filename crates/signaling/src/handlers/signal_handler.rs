//! Signal-Handler – Weiterleitung von Offer, Answer und ICE-Kandidaten
//!
//! SDP- und ICE-Payloads werden nie interpretiert. Mit Tavern-Kontext wird
//! das Ziel per `publicKeyHex` im Channel aufgeloest, ohne Kontext ueber den
//! Legacy-Raum des Absenders.

use tavern_core::types::{ChannelId, Identity, TavernId};
use tavern_protocol::{ClientMessage, ServerMessage};

use super::channel_handler::OHNE_RAUM;
use super::HandlerKontext;

pub const NICHT_IM_CHANNEL: &str = "Not in channel";
pub const ZIEL_NICHT_GEFUNDEN: &str = "Target peer not found";

/// Payload eines weiterzuleitenden Signals
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalInhalt {
    Offer { sdp: String },
    Answer { sdp: String },
    IceCandidate { candidate: String },
}

impl SignalInhalt {
    fn weiterleitung(self, from: String, identity: Option<Identity>) -> ServerMessage {
        match self {
            Self::Offer { sdp } => ServerMessage::Offer { from, sdp, identity },
            Self::Answer { sdp } => ServerMessage::Answer { from, sdp, identity },
            Self::IceCandidate { candidate } => ServerMessage::IceCandidate {
                from,
                candidate,
                identity,
            },
        }
    }
}

/// Ein Signal samt optionalem Ziel und Kontext
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub inhalt: SignalInhalt,
    pub target: Option<String>,
    pub tavern_id: Option<TavernId>,
    pub channel_id: Option<ChannelId>,
}

impl Signal {
    /// Extrahiert das Signal aus einer Client-Nachricht
    pub fn aus_nachricht(nachricht: ClientMessage) -> Option<Self> {
        let signal = match nachricht {
            ClientMessage::Offer {
                sdp,
                target,
                tavern_id,
                channel_id,
            } => Self {
                inhalt: SignalInhalt::Offer { sdp },
                target,
                tavern_id,
                channel_id,
            },
            ClientMessage::Answer {
                sdp,
                target,
                tavern_id,
                channel_id,
            } => Self {
                inhalt: SignalInhalt::Answer { sdp },
                target: Some(target),
                tavern_id,
                channel_id,
            },
            ClientMessage::IceCandidate {
                candidate,
                target,
                tavern_id,
                channel_id,
            } => Self {
                inhalt: SignalInhalt::IceCandidate { candidate },
                target: Some(target),
                tavern_id,
                channel_id,
            },
            _ => return None,
        };
        Some(signal)
    }
}

/// Verarbeitet `offer`, `answer` und `ice-candidate`
pub fn handle_relay(ctx: &mut HandlerKontext<'_>, signal: Signal) {
    match (signal.tavern_id.clone(), signal.channel_id.clone()) {
        (Some(tavern_id), Some(channel_id)) => {
            im_channel_weiterleiten(ctx, tavern_id, channel_id, signal.inhalt, signal.target)
        }
        _ => im_raum_weiterleiten(ctx, signal.inhalt, signal.target),
    }
}

fn im_channel_weiterleiten(
    ctx: &mut HandlerKontext<'_>,
    tavern_id: TavernId,
    channel_id: ChannelId,
    inhalt: SignalInhalt,
    target: Option<String>,
) {
    let absender = ctx
        .hub
        .presence
        .peer_info(&ctx.conn_id)
        .filter(|p| p.tavern_id == tavern_id && p.channel_id == channel_id);
    let Some(absender) = absender else {
        ctx.fehler(NICHT_IM_CHANNEL);
        return;
    };

    let identitaet = ctx
        .hub
        .verbindungen
        .get(&ctx.conn_id)
        .and_then(|v| v.letzte_identitaet.clone());
    let nachricht = inhalt.weiterleitung(absender.public_key_hex, identitaet);

    match target {
        Some(ziel) => {
            let Some(ziel_id) = ctx
                .hub
                .presence
                .peer_id_per_schluessel(&tavern_id, &channel_id, &ziel)
            else {
                tracing::debug!(conn_id = %ctx.conn_id, ziel = %ziel, "Signal-Ziel nicht im Channel");
                ctx.fehler(ZIEL_NICHT_GEFUNDEN);
                return;
            };
            ctx.state.broadcaster.an_verbindung_senden(&ziel_id, nachricht);
        }
        None => {
            ctx.state.broadcaster.an_channel_senden(
                &ctx.hub.presence,
                &tavern_id,
                &channel_id,
                &nachricht,
                Some(&ctx.conn_id),
            );
        }
    }
}

fn im_raum_weiterleiten(ctx: &mut HandlerKontext<'_>, inhalt: SignalInhalt, target: Option<String>) {
    let Some(room_id) = ctx.hub.rooms.raum_fuer_peer(&ctx.conn_id).map(str::to_string) else {
        tracing::debug!(conn_id = %ctx.conn_id, "Signal ohne Raum abgelehnt");
        ctx.fehler(OHNE_RAUM);
        return;
    };

    let identitaet = ctx.hub.rooms.identitaet(&ctx.conn_id).cloned();
    let nachricht = inhalt.weiterleitung(ctx.conn_id.to_string(), identitaet);

    match target {
        Some(ziel) => {
            // Unbekannte Ziele werden im Legacy-Modus still verworfen
            let ziel_id = ctx
                .hub
                .rooms
                .peer_ids(&room_id)
                .into_iter()
                .find(|id| id.to_string() == ziel);
            if let Some(ziel_id) = ziel_id {
                ctx.hub.rooms.an_peer_senden(&room_id, &ziel_id, nachricht);
            }
        }
        None => {
            ctx.hub
                .rooms
                .an_raum_senden(&room_id, &nachricht, Some(&ctx.conn_id));
        }
    }
}
