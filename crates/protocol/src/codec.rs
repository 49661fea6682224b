//! Frame-Codec: JSON-Text <-> Nachrichten
//!
//! Eingehende Frames werden geparst und inhaltlich validiert. Alles was
//! nicht als gueltige [`ClientMessage`] erkannt wird liefert `None`; der
//! Aufrufer verwirft solche Frames ohne Antwort.

use tavern_core::types::Identity;
use thiserror::Error;

use crate::control::{ClientMessage, ServerMessage};

/// Fehler beim Kodieren ausgehender Nachrichten
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("JSON-Fehler: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parst und validiert einen eingehenden Text-Frame
///
/// Gibt `None` zurueck bei ungueltigem JSON, unbekanntem `type` oder wenn
/// Pflichtfelder leer sind.
pub fn decode_client_message(raw: &str) -> Option<ClientMessage> {
    let nachricht: ClientMessage = serde_json::from_str(raw).ok()?;
    if nachricht_gueltig(&nachricht) {
        Some(nachricht)
    } else {
        None
    }
}

/// Serialisiert eine ausgehende Nachricht als JSON-Text
pub fn encode_server_message(nachricht: &ServerMessage) -> Result<String, CodecError> {
    Ok(serde_json::to_string(nachricht)?)
}

fn nicht_leer(wert: &str) -> bool {
    !wert.trim().is_empty()
}

fn optional_nicht_leer(wert: Option<&str>) -> bool {
    wert.map_or(true, nicht_leer)
}

fn identitaet_gueltig(identitaet: &Identity) -> bool {
    nicht_leer(&identitaet.public_key_hex) && nicht_leer(&identitaet.tag)
}

/// Inhaltliche Pruefung der Pflichtfelder
fn nachricht_gueltig(nachricht: &ClientMessage) -> bool {
    match nachricht {
        ClientMessage::Join { room, identity } => {
            nicht_leer(room) && identity.as_ref().map_or(true, identitaet_gueltig)
        }
        ClientMessage::CreateTavern { name, .. } => nicht_leer(name),
        ClientMessage::JoinChannel {
            tavern_id,
            channel_id,
            identity,
        } => {
            nicht_leer(tavern_id.as_str())
                && nicht_leer(channel_id.as_str())
                && identitaet_gueltig(identity)
        }
        ClientMessage::LeaveChannel {
            tavern_id,
            channel_id,
        } => nicht_leer(tavern_id.as_str()) && nicht_leer(channel_id.as_str()),
        ClientMessage::GetTavernInfo { tavern_id } => nicht_leer(tavern_id.as_str()),
        ClientMessage::CreateChannel { tavern_id, name } => {
            nicht_leer(tavern_id.as_str()) && nicht_leer(name)
        }
        ClientMessage::UpdateIdentity { identity } => identitaet_gueltig(identity),
        ClientMessage::Offer {
            sdp,
            target,
            tavern_id,
            channel_id,
        } => {
            nicht_leer(sdp)
                && optional_nicht_leer(target.as_deref())
                && optional_nicht_leer(tavern_id.as_ref().map(|t| t.as_str()))
                && optional_nicht_leer(channel_id.as_ref().map(|c| c.as_str()))
        }
        ClientMessage::Answer {
            sdp,
            target,
            tavern_id,
            channel_id,
        } => {
            nicht_leer(sdp)
                && nicht_leer(target)
                && optional_nicht_leer(tavern_id.as_ref().map(|t| t.as_str()))
                && optional_nicht_leer(channel_id.as_ref().map(|c| c.as_str()))
        }
        ClientMessage::IceCandidate {
            candidate,
            target,
            tavern_id,
            channel_id,
        } => {
            nicht_leer(candidate)
                && nicht_leer(target)
                && optional_nicht_leer(tavern_id.as_ref().map(|t| t.as_str()))
                && optional_nicht_leer(channel_id.as_ref().map(|c| c.as_str()))
        }
    }
}
