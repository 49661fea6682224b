//! Gemeinsame Identifikationstypen fuer den Tavern-Relay
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.
//!
//! Tavern- und Channel-IDs sind opake Strings: Clients duerfen beliebige
//! Werte senden, unbekannte IDs fuehren zu einem "not found"-Fehler und nicht
//! zu einem verworfenen Frame.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Verbindungs-ID (serverseitig vergeben, eine pro WebSocket)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnId(pub Uuid);

impl ConnId {
    /// Erstellt eine neue zufaellige ConnId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tavern-ID (Community)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TavernId(pub String);

impl TavernId {
    /// Erzeugt eine neue zufaellige TavernId (UUID v4)
    pub fn generieren() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TavernId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for TavernId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Channel-ID (Raum innerhalb einer Tavern)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub String);

impl ChannelId {
    /// Erzeugt eine neue zufaellige ChannelId (UUID v4)
    pub fn generieren() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kryptografische Identitaet eines Peers
///
/// Wird von einem externen Identitaetssystem erzeugt; der Relay behandelt
/// alle Felder als opake Werte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub public_key_hex: String,
    pub tag: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Identity {
    /// Anzeigename: getrimmter `display_name`, sonst der `tag`
    pub fn anzeigename(&self) -> String {
        match self.display_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.tag.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conn_id_eindeutig() {
        let a = ConnId::new();
        let b = ConnId::new();
        assert_ne!(a, b, "Zwei neue ConnIds muessen verschieden sein");
    }

    #[test]
    fn tavern_id_generieren_ist_uuid() {
        let id = TavernId::generieren();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
        assert_ne!(id, TavernId::generieren());
    }

    #[test]
    fn ids_sind_transparent_serialisiert() {
        let id = ChannelId::from("c1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"c1\"");
        let zurueck: ChannelId = serde_json::from_str("\"c1\"").unwrap();
        assert_eq!(zurueck, id);
    }

    #[test]
    fn anzeigename_faellt_auf_tag_zurueck() {
        let mut identitaet = Identity {
            public_key_hex: "abc".into(),
            tag: "TVN-1234-5678".into(),
            display_name: Some("  Alice  ".into()),
        };
        assert_eq!(identitaet.anzeigename(), "Alice");

        identitaet.display_name = Some("   ".into());
        assert_eq!(identitaet.anzeigename(), "TVN-1234-5678");

        identitaet.display_name = None;
        assert_eq!(identitaet.anzeigename(), "TVN-1234-5678");
    }

    #[test]
    fn identity_camel_case() {
        let json = r#"{"publicKeyHex":"aa","tag":"TVN-0000-0000","displayName":null}"#;
        let identitaet: Identity = serde_json::from_str(json).unwrap();
        assert_eq!(identitaet.public_key_hex, "aa");
        assert!(identitaet.display_name.is_none());
    }
}
