//! tavern-protocol – Protokoll-Definitionen
//!
//! Dieses Crate definiert alle JSON-Frames die zwischen Client und Relay
//! ueber die WebSocket-Verbindung ausgetauscht werden, sowie den Codec der
//! eingehende Frames parst und validiert.

pub mod codec;
pub mod control;

pub use codec::{decode_client_message, encode_server_message, CodecError};
pub use control::{
    ChannelView, ClientMessage, PeerInfo, RoomPeer, ServerMessage, TavernView,
};
