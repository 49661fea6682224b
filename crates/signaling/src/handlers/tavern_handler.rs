//! Tavern-Handler – Create Tavern, Tavern Info, Create Channel

use tavern_core::types::TavernId;
use tavern_protocol::ServerMessage;

use super::HandlerKontext;
use crate::error::PresenceError;

/// Verarbeitet `create-tavern`
///
/// Prueft zuerst das Erstellungsfenster der Quell-IP. Ersteller ist der
/// zuletzt von dieser Verbindung gemeldete Schluessel (sonst leer).
pub async fn handle_create_tavern(ctx: &mut HandlerKontext<'_>, name: String, icon: Option<String>) {
    let Some(verbindung) = ctx.hub.verbindungen.get(&ctx.conn_id) else {
        return;
    };
    let ip = verbindung.ip;
    let ersteller = verbindung
        .letzte_identitaet
        .as_ref()
        .map(|i| i.public_key_hex.clone())
        .unwrap_or_default();

    if !ctx.hub.limiter.erstellung_pruefen(ip) {
        tracing::info!(conn_id = %ctx.conn_id, ip = %ip, "Tavern-Erstellung gedrosselt");
        ctx.rate_limit_verstoss();
        return;
    }

    match ctx.hub.presence.tavern_erstellen(&name, icon, &ersteller).await {
        Ok(tavern) => {
            tracing::info!(
                conn_id = %ctx.conn_id,
                tavern_id = %tavern.id,
                name = %tavern.name,
                "Tavern erstellt"
            );
            ctx.antworten(ServerMessage::TavernCreated { tavern });
        }
        Err(e) => {
            tracing::warn!(conn_id = %ctx.conn_id, fehler = %e, "Tavern konnte nicht erstellt werden");
        }
    }
}

/// Verarbeitet `get-tavern-info`
pub fn handle_tavern_info(ctx: &mut HandlerKontext<'_>, tavern_id: TavernId) {
    match ctx.hub.presence.tavern_info(&tavern_id) {
        Some(tavern) => {
            ctx.antworten(ServerMessage::TavernInfo { tavern });
        }
        None => {
            tracing::debug!(conn_id = %ctx.conn_id, tavern_id = %tavern_id, "Tavern-Info: unbekannte Tavern");
            ctx.fehler(PresenceError::TavernNichtGefunden.to_string());
        }
    }
}

/// Verarbeitet `create-channel`
pub async fn handle_create_channel(ctx: &mut HandlerKontext<'_>, tavern_id: TavernId, name: String) {
    match ctx.hub.presence.channel_erstellen(&tavern_id, &name).await {
        Ok(channel) => {
            tracing::info!(
                conn_id = %ctx.conn_id,
                tavern_id = %tavern_id,
                channel_id = %channel.id,
                "Channel erstellt"
            );
            ctx.antworten(ServerMessage::ChannelCreated { tavern_id, channel });
        }
        Err(PresenceError::Store(e)) => {
            tracing::warn!(conn_id = %ctx.conn_id, tavern_id = %tavern_id, fehler = %e, "Channel konnte nicht erstellt werden");
        }
        Err(e) => {
            ctx.fehler(e.to_string());
        }
    }
}
