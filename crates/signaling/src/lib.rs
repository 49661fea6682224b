//! tavern-signaling – WebSocket Presence- und Signaling-Relay
//!
//! Dieser Crate verwaltet WebSocket-Verbindungen, Taverns und Channels,
//! Legacy-Raeume und leitet WebRTC-Signalisierung zwischen Peers weiter.
//! Medien laufen nie ueber den Relay.
//!
//! ## Architektur
//!
//! ```text
//! WebSocket Listener (SignalingServer, axum)
//!     |
//!     v
//! Verbindungs-Task (pro Verbindung ein Task)
//!     |  Lesen: Text -> Dispatcher, Pong -> Heartbeat
//!     |  Schreiben: Send-Queue aus dem Broadcaster
//!     v
//! MessageDispatcher (Rate-Limit, Codec, ein Hub-Lock pro Frame)
//!     |
//!     +-- TavernHandler  (Create Tavern, Info, Create Channel)
//!     +-- ChannelHandler (Join, Leave, Identity, Session-Abgleich)
//!     +-- RoomHandler    (Legacy-Join)
//!     +-- SignalHandler  (Offer, Answer, ICE)
//!
//! Hub              – PresenceCore, Raeume, Sessions, Rate-Limits
//! EventBroadcaster – Send-Queues aller Verbindungen
//! Heartbeat        – Ping/Pong-Liveness
//! ```

pub mod broadcast;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod heartbeat;
pub mod hub;
pub mod presence;
pub mod rate_limit;
pub mod rooms;
pub mod server_state;
pub mod session;
pub mod shutdown;
pub mod ws;

// Bequeme Re-Exporte
pub use broadcast::{Ausgehend, EventBroadcaster};
pub use dispatcher::MessageDispatcher;
pub use error::{JoinRejection, PresenceError, RoomJoinRejection, SignalingError, SignalingResult};
pub use presence::PresenceCore;
pub use rate_limit::RateLimitKonfig;
pub use server_state::{SignalingConfig, SignalingState};
pub use ws::SignalingServer;
