//! Fehlertypen fuer den Signaling-Service

use tavern_db::DbError;
use tavern_protocol::CodecError;
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (Listener, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Persistenz fehlgeschlagen
    #[error("Store-Fehler: {0}")]
    Store(#[from] DbError),

    /// Ausgehende Nachricht nicht kodierbar
    #[error("Codec-Fehler: {0}")]
    Codec(#[from] CodecError),

    /// Interner Fehler
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl SignalingError {
    /// Erstellt einen internen Fehler
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;

/// Fehler bei Tavern-/Channel-Verwaltung im Presence-Core
#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("Tavern not found")]
    TavernNichtGefunden,

    #[error("Channel not found")]
    ChannelNichtGefunden,

    /// Eine Tavern behaelt immer mindestens einen Channel
    #[error("Cannot delete the last channel of a tavern")]
    LetzterChannel,

    #[error("Store-Fehler: {0}")]
    Store(#[from] DbError),
}

/// Grund fuer einen abgelehnten `join-channel`
///
/// Der Display-Text ist die Fehlermeldung an den Client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum JoinRejection {
    #[error("Tavern not found")]
    TavernNichtGefunden,

    #[error("Channel not found")]
    ChannelNichtGefunden,

    #[error("Channel full")]
    ChannelVoll,
}

impl JoinRejection {
    /// Kurzform fuer Logs
    pub fn grund(&self) -> &'static str {
        match self {
            Self::TavernNichtGefunden => "tavern-not-found",
            Self::ChannelNichtGefunden => "channel-not-found",
            Self::ChannelVoll => "channel-full",
        }
    }
}

/// Grund fuer einen abgelehnten Legacy-`join`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RoomJoinRejection {
    #[error("Already joined")]
    BereitsBeigetreten,

    #[error("Room full")]
    RaumVoll,
}

impl RoomJoinRejection {
    pub fn grund(&self) -> &'static str {
        match self {
            Self::BereitsBeigetreten => "already-joined",
            Self::RaumVoll => "room-full",
        }
    }
}
