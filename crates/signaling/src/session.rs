//! Session-Abgleich: hoechstens eine lebende Verbindung pro Identitaet
//!
//! Bildet `publicKeyHex -> ConnId` ab. Ob eine alte Verbindung noch offen
//! ist und verdraengt werden muss, entscheidet der Aufrufer.

use std::collections::HashMap;
use tavern_core::types::ConnId;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    inhaber: HashMap<String, ConnId>,
}

impl SessionRegistry {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Ordnet den Schluessel der Verbindung zu
    ///
    /// Gibt den bisherigen Inhaber zurueck, falls es eine andere Verbindung war.
    pub fn zuordnen(&mut self, public_key_hex: &str, conn_id: ConnId) -> Option<ConnId> {
        self.inhaber
            .insert(public_key_hex.to_string(), conn_id)
            .filter(|alt| *alt != conn_id)
    }

    /// Ordnet nur zu wenn der Schluessel frei ist oder schon dieser Verbindung gehoert
    pub fn beanspruchen_falls_frei(&mut self, public_key_hex: &str, conn_id: ConnId) -> bool {
        match self.inhaber.get(public_key_hex) {
            Some(inhaber) if *inhaber != conn_id => false,
            _ => {
                self.inhaber.insert(public_key_hex.to_string(), conn_id);
                true
            }
        }
    }

    pub fn inhaber(&self, public_key_hex: &str) -> Option<ConnId> {
        self.inhaber.get(public_key_hex).copied()
    }

    /// Gibt alle Schluessel der Verbindung frei
    pub fn freigeben_fuer(&mut self, conn_id: &ConnId) -> usize {
        let vorher = self.inhaber.len();
        self.inhaber.retain(|_, inhaber| inhaber != conn_id);
        vorher - self.inhaber.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zuordnen_liefert_anderen_vorbesitzer() {
        let mut sessions = SessionRegistry::neu();
        let a = ConnId::new();
        let b = ConnId::new();

        assert_eq!(sessions.zuordnen("pk", a), None);
        assert_eq!(sessions.zuordnen("pk", a), None);
        assert_eq!(sessions.zuordnen("pk", b), Some(a));
        assert_eq!(sessions.inhaber("pk"), Some(b));
    }

    #[test]
    fn beanspruchen_nur_wenn_frei() {
        let mut sessions = SessionRegistry::neu();
        let a = ConnId::new();
        let b = ConnId::new();

        assert!(sessions.beanspruchen_falls_frei("pk", a));
        assert!(sessions.beanspruchen_falls_frei("pk", a));
        assert!(!sessions.beanspruchen_falls_frei("pk", b));
        assert_eq!(sessions.inhaber("pk"), Some(a));
    }

    #[test]
    fn freigeben_entfernt_alle_schluessel() {
        let mut sessions = SessionRegistry::neu();
        let a = ConnId::new();
        let b = ConnId::new();
        sessions.zuordnen("alt", a);
        sessions.zuordnen("neu", a);
        sessions.zuordnen("fremd", b);

        assert_eq!(sessions.freigeben_fuer(&a), 2);
        assert_eq!(sessions.inhaber("alt"), None);
        assert_eq!(sessions.inhaber("fremd"), Some(b));
    }
}
