//! Channel-Handler – Join, Leave, Identitaets-Update
//!
//! `join-channel` gleicht vor dem Beitritt die Session ab: haelt eine andere
//! offene Verbindung denselben Schluessel, wird sie verdraengt und komplett
//! bereinigt, bevor die Kapazitaet des Ziels geprueft wird.

use tavern_core::types::{ChannelId, ConnId, Identity, TavernId};
use tavern_protocol::ServerMessage;

use super::HandlerKontext;
use crate::broadcast::CLOSE_SESSION_REPLACED;

/// Fehlermeldung fuer Identitaets-Updates ohne Channel oder Raum
pub const OHNE_RAUM: &str = "Join a room before signaling";

/// Verdraengt eine andere offene Verbindung mit derselben Identitaet
fn session_abgleichen(ctx: &mut HandlerKontext<'_>, public_key_hex: &str) {
    let Some(alt) = ctx.hub.sessions.zuordnen(public_key_hex, ctx.conn_id) else {
        return;
    };
    if !ctx.state.broadcaster.ist_offen(&alt) {
        return;
    }

    tracing::info!(
        conn_id = %ctx.conn_id,
        verdraengt = %alt,
        "Identitaet bereits verbunden – alte Session wird ersetzt"
    );
    ctx.state
        .broadcaster
        .an_verbindung_senden(&alt, ServerMessage::SessionReplaced {});
    ctx.state
        .broadcaster
        .schliessen(&alt, CLOSE_SESSION_REPLACED, "session-replaced");
    ctx.hub.verbindung_bereinigen(alt, &ctx.state.broadcaster);
    ctx.state.metriken.session_replacements_total.inc();
}

/// Verarbeitet `join-channel`
pub fn handle_join_channel(
    ctx: &mut HandlerKontext<'_>,
    tavern_id: TavernId,
    channel_id: ChannelId,
    identitaet: Identity,
) {
    session_abgleichen(ctx, &identitaet.public_key_hex);

    let ergebnis = match ctx
        .hub
        .presence
        .channel_beitreten(ctx.conn_id, &tavern_id, &channel_id, &identitaet)
    {
        Ok(ergebnis) => ergebnis,
        Err(ablehnung) => {
            tracing::debug!(
                conn_id = %ctx.conn_id,
                tavern_id = %tavern_id,
                channel_id = %channel_id,
                grund = ablehnung.grund(),
                "Channel-Beitritt abgelehnt"
            );
            ctx.fehler(ablehnung.to_string());
            return;
        }
    };

    if let Some(vorher) = &ergebnis.previous_location {
        let verlassen = ServerMessage::PeerLeftChannel {
            tavern_id: vorher.tavern_id.clone(),
            channel_id: vorher.channel_id.clone(),
            public_key_hex: ergebnis.joined_peer.public_key_hex.clone(),
        };
        ctx.state.broadcaster.an_channel_senden(
            &ctx.hub.presence,
            &vorher.tavern_id,
            &vorher.channel_id,
            &verlassen,
            Some(&ctx.conn_id),
        );
    }

    ctx.antworten(ServerMessage::ChannelJoined {
        tavern_id: tavern_id.clone(),
        channel_id: channel_id.clone(),
        peers: ergebnis.existing_peers,
    });

    if !ergebnis.already_joined {
        let beigetreten = ServerMessage::PeerJoinedChannel {
            tavern_id: tavern_id.clone(),
            channel_id: channel_id.clone(),
            peer: ergebnis.joined_peer,
        };
        ctx.state.broadcaster.an_channel_senden(
            &ctx.hub.presence,
            &tavern_id,
            &channel_id,
            &beigetreten,
            Some(&ctx.conn_id),
        );
        tracing::info!(
            conn_id = %ctx.conn_id,
            tavern_id = %tavern_id,
            channel_id = %channel_id,
            "Channel beigetreten"
        );
    }

    if let Some(verbindung) = ctx.hub.verbindungen.get_mut(&ctx.conn_id) {
        verbindung.letzte_identitaet = Some(identitaet);
    }
}

/// Verarbeitet `leave-channel`
pub fn handle_leave_channel(ctx: &mut HandlerKontext<'_>, tavern_id: TavernId, channel_id: ChannelId) {
    let Some(peer) = ctx
        .hub
        .presence
        .channel_verlassen(ctx.conn_id, &tavern_id, &channel_id)
    else {
        tracing::debug!(conn_id = %ctx.conn_id, channel_id = %channel_id, "Leave ohne Mitgliedschaft ignoriert");
        return;
    };

    let nachricht = ServerMessage::PeerLeftChannel {
        tavern_id: tavern_id.clone(),
        channel_id: channel_id.clone(),
        public_key_hex: peer.public_key_hex,
    };
    ctx.state
        .broadcaster
        .an_channel_senden(&ctx.hub.presence, &tavern_id, &channel_id, &nachricht, None);
    tracing::info!(conn_id = %ctx.conn_id, tavern_id = %tavern_id, channel_id = %channel_id, "Channel verlassen");
}

/// Verarbeitet `update-identity`
///
/// Im Channel: Mitglieds-Datensatz an Ort und Stelle aendern, Broadcast mit
/// dem bisherigen Schluessel als `peerId`. Im Legacy-Raum: Broadcast mit der
/// Verbindungs-ID als `peerId`. Beides kann gleichzeitig zutreffen.
pub fn handle_update_identity(ctx: &mut HandlerKontext<'_>, identitaet: Identity) {
    let conn_id: ConnId = ctx.conn_id;
    let mut zugestellt = false;

    if let Some((alt, _neu)) = ctx.hub.presence.identitaet_aktualisieren(conn_id, &identitaet) {
        if ctx
            .hub
            .sessions
            .beanspruchen_falls_frei(&identitaet.public_key_hex, conn_id)
        {
            tracing::debug!(conn_id = %conn_id, "Neuer Schluessel fuer Session beansprucht");
        }

        let nachricht = ServerMessage::PeerIdentityUpdated {
            peer_id: alt.public_key_hex,
            identity: identitaet.clone(),
        };
        ctx.state.broadcaster.an_channel_senden(
            &ctx.hub.presence,
            &alt.tavern_id,
            &alt.channel_id,
            &nachricht,
            Some(&conn_id),
        );
        zugestellt = true;
    }

    if let Some(room_id) = ctx.hub.rooms.raum_fuer_peer(&conn_id).map(str::to_string) {
        ctx.hub.rooms.identitaet_setzen(conn_id, identitaet.clone());
        let nachricht = ServerMessage::PeerIdentityUpdated {
            peer_id: conn_id.to_string(),
            identity: identitaet.clone(),
        };
        ctx.hub.rooms.an_raum_senden(&room_id, &nachricht, Some(&conn_id));
        zugestellt = true;
    }

    if !zugestellt {
        ctx.fehler(OHNE_RAUM);
        return;
    }

    if let Some(verbindung) = ctx.hub.verbindungen.get_mut(&conn_id) {
        verbindung.letzte_identitaet = Some(identitaet);
    }
}
