//! Room-Handler – Legacy-`join` ohne Tavern-Kontext

use tavern_core::types::Identity;
use tavern_protocol::{RoomPeer, ServerMessage};

use super::HandlerKontext;
use crate::error::RoomJoinRejection;

/// Verarbeitet `join`
///
/// Ein zweiter `join` derselben Verbindung wird ohne Antwort verworfen.
pub fn handle_join(ctx: &mut HandlerKontext<'_>, room: String, identitaet: Option<Identity>) {
    let room_id = room.trim().to_string();
    let Some(sender) = ctx.state.broadcaster.sender(&ctx.conn_id) else {
        return;
    };

    if let Err(ablehnung) = ctx.hub.rooms.raum_beitreten(&room_id, ctx.conn_id, sender) {
        if ablehnung == RoomJoinRejection::RaumVoll {
            ctx.fehler(ablehnung.to_string());
        }
        tracing::debug!(
            conn_id = %ctx.conn_id,
            room = %room_id,
            grund = ablehnung.grund(),
            "Raum-Beitritt abgelehnt"
        );
        return;
    }

    match identitaet {
        Some(identitaet) => ctx.hub.rooms.identitaet_setzen(ctx.conn_id, identitaet),
        None => {
            ctx.hub.rooms.identitaet_entfernen(&ctx.conn_id);
        }
    }

    let peers = ctx
        .hub
        .rooms
        .peer_ids(&room_id)
        .into_iter()
        .filter(|id| *id != ctx.conn_id)
        .map(|id| RoomPeer {
            peer_id: id.to_string(),
            identity: ctx.hub.rooms.identitaet(&id).cloned(),
        })
        .collect();
    ctx.antworten(ServerMessage::PeerList { peers });

    let beigetreten = ServerMessage::PeerJoined {
        peer_id: ctx.conn_id.to_string(),
        identity: ctx.hub.rooms.identitaet(&ctx.conn_id).cloned(),
    };
    ctx.hub
        .rooms
        .an_raum_senden(&room_id, &beigetreten, Some(&ctx.conn_id));

    tracing::info!(conn_id = %ctx.conn_id, room = %room_id, "Raum beigetreten");
}
