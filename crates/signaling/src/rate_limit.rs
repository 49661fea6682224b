//! Rate Limiter fuer den Tavern-Relay
//!
//! Gleitende Fenster aus Zeitstempeln:
//! - Nachrichten pro Verbindung (Fenster 1 s)
//! - Tavern-Erstellungen pro Quell-IP (Fenster 60 s)
//!
//! Jede Ueberschreitung zaehlt als Verstoss der Verbindung. Ab der
//! konfigurierten Schwelle wird die Verbindung getrennt. Der Limiter lebt im
//! Hub und ist daher selbst nicht synchronisiert.

use std::{
    collections::{HashMap, VecDeque},
    net::IpAddr,
    time::{Duration, Instant},
};
use tavern_core::types::ConnId;

const NACHRICHTEN_FENSTER: Duration = Duration::from_secs(1);
const ERSTELLUNGS_FENSTER: Duration = Duration::from_secs(60);

/// Konfiguration fuer den Rate Limiter
#[derive(Debug, Clone)]
pub struct RateLimitKonfig {
    /// Maximale Nachrichten pro Sekunde pro Verbindung
    pub nachrichten_pro_sekunde: u32,
    /// Maximale Tavern-Erstellungen pro Minute pro IP
    pub taverns_pro_minute: u32,
    /// Verstoesse bis zur Zwangstrennung
    pub verstoss_schwelle: u32,
}

impl Default for RateLimitKonfig {
    fn default() -> Self {
        Self {
            nachrichten_pro_sekunde: 50,
            taverns_pro_minute: 10,
            verstoss_schwelle: 10,
        }
    }
}

/// Folge eines gemeldeten Verstosses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verstoss {
    /// `rate-limited` senden, Verbindung bleibt bestehen
    Warnung,
    /// Schwelle erreicht: Verbindung mit 1008 schliessen
    Trennen,
}

/// Gleitendes Fenster aus Zeitstempeln
#[derive(Debug, Default)]
struct Fenster {
    zeitpunkte: VecDeque<Instant>,
}

impl Fenster {
    fn beschneiden(&mut self, jetzt: Instant, dauer: Duration) {
        while let Some(&erster) = self.zeitpunkte.front() {
            if jetzt.duration_since(erster) >= dauer {
                self.zeitpunkte.pop_front();
            } else {
                break;
            }
        }
    }

    /// Zeichnet einen Versuch auf, falls noch Platz im Fenster ist
    fn versuchen(&mut self, jetzt: Instant, dauer: Duration, max: u32) -> bool {
        self.beschneiden(jetzt, dauer);
        if self.zeitpunkte.len() >= max as usize {
            return false;
        }
        self.zeitpunkte.push_back(jetzt);
        true
    }
}

/// Rate Limiter mit gleitenden Fenstern
pub struct RateLimiter {
    konfig: RateLimitKonfig,
    nachrichten: HashMap<ConnId, Fenster>,
    erstellungen: HashMap<IpAddr, Fenster>,
    verstoesse: HashMap<ConnId, u32>,
}

impl RateLimiter {
    pub fn neu(konfig: RateLimitKonfig) -> Self {
        Self {
            konfig,
            nachrichten: HashMap::new(),
            erstellungen: HashMap::new(),
            verstoesse: HashMap::new(),
        }
    }

    /// Prueft das Nachrichtenfenster einer Verbindung
    pub fn nachricht_pruefen(&mut self, conn_id: ConnId) -> bool {
        self.nachricht_pruefen_at(conn_id, Instant::now())
    }

    pub fn nachricht_pruefen_at(&mut self, conn_id: ConnId, jetzt: Instant) -> bool {
        self.nachrichten.entry(conn_id).or_default().versuchen(
            jetzt,
            NACHRICHTEN_FENSTER,
            self.konfig.nachrichten_pro_sekunde,
        )
    }

    /// Prueft das Erstellungsfenster einer Quell-IP
    pub fn erstellung_pruefen(&mut self, ip: IpAddr) -> bool {
        self.erstellung_pruefen_at(ip, Instant::now())
    }

    pub fn erstellung_pruefen_at(&mut self, ip: IpAddr, jetzt: Instant) -> bool {
        self.erstellungen.entry(ip).or_default().versuchen(
            jetzt,
            ERSTELLUNGS_FENSTER,
            self.konfig.taverns_pro_minute,
        )
    }

    /// Zaehlt einen Verstoss der Verbindung
    pub fn verstoss_melden(&mut self, conn_id: ConnId) -> Verstoss {
        let zaehler = self.verstoesse.entry(conn_id).or_insert(0);
        *zaehler += 1;
        if *zaehler >= self.konfig.verstoss_schwelle {
            Verstoss::Trennen
        } else {
            Verstoss::Warnung
        }
    }

    pub fn verstoesse(&self, conn_id: &ConnId) -> u32 {
        self.verstoesse.get(conn_id).copied().unwrap_or(0)
    }

    /// Verwirft alle verbindungsbezogenen Zaehler
    pub fn verbindung_entfernen(&mut self, conn_id: &ConnId) {
        self.nachrichten.remove(conn_id);
        self.verstoesse.remove(conn_id);
    }

    /// Entfernt abgelaufene IP-Fenster (Speicher-Management)
    pub fn aufraeumen(&mut self) {
        self.aufraeumen_at(Instant::now());
    }

    pub fn aufraeumen_at(&mut self, jetzt: Instant) {
        self.erstellungen.retain(|_, fenster| {
            fenster.beschneiden(jetzt, ERSTELLUNGS_FENSTER);
            !fenster.zeitpunkte.is_empty()
        });
    }

    pub fn ip_fenster_anzahl(&self) -> usize {
        self.erstellungen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn limiter(nachrichten: u32, taverns: u32, schwelle: u32) -> RateLimiter {
        RateLimiter::neu(RateLimitKonfig {
            nachrichten_pro_sekunde: nachrichten,
            taverns_pro_minute: taverns,
            verstoss_schwelle: schwelle,
        })
    }

    #[test]
    fn nachrichten_bis_limit_erlaubt() {
        let mut limiter = limiter(5, 10, 10);
        let conn = ConnId::new();
        let t0 = Instant::now();
        for _ in 0..5 {
            assert!(limiter.nachricht_pruefen_at(conn, t0), "Nachricht sollte erlaubt sein");
        }
        assert!(!limiter.nachricht_pruefen_at(conn, t0), "6. Nachricht sollte abgelehnt werden");
    }

    #[test]
    fn fenster_gleitet() {
        let mut limiter = limiter(2, 10, 10);
        let conn = ConnId::new();
        let t0 = Instant::now();
        assert!(limiter.nachricht_pruefen_at(conn, t0));
        assert!(limiter.nachricht_pruefen_at(conn, t0 + Duration::from_millis(500)));
        assert!(!limiter.nachricht_pruefen_at(conn, t0 + Duration::from_millis(900)));
        // Erster Zeitstempel faellt heraus
        assert!(limiter.nachricht_pruefen_at(conn, t0 + Duration::from_millis(1000)));
        assert!(!limiter.nachricht_pruefen_at(conn, t0 + Duration::from_millis(1100)));
    }

    #[test]
    fn abgelehnte_versuche_zaehlen_nicht() {
        let mut limiter = limiter(1, 10, 10);
        let conn = ConnId::new();
        let t0 = Instant::now();
        assert!(limiter.nachricht_pruefen_at(conn, t0));
        for i in 1..10 {
            assert!(!limiter.nachricht_pruefen_at(conn, t0 + Duration::from_millis(i * 90)));
        }
        assert!(limiter.nachricht_pruefen_at(conn, t0 + Duration::from_secs(1)));
    }

    #[test]
    fn erstellungen_pro_ip() {
        let mut limiter = limiter(50, 10, 10);
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let andere = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let t0 = Instant::now();
        for _ in 0..10 {
            assert!(limiter.erstellung_pruefen_at(ip, t0));
        }
        assert!(!limiter.erstellung_pruefen_at(ip, t0 + Duration::from_secs(30)));
        assert!(limiter.erstellung_pruefen_at(andere, t0));
        assert!(limiter.erstellung_pruefen_at(ip, t0 + Duration::from_secs(60)));
    }

    #[test]
    fn verstoesse_eskalieren() {
        let mut limiter = limiter(50, 10, 3);
        let conn = ConnId::new();
        assert_eq!(limiter.verstoss_melden(conn), Verstoss::Warnung);
        assert_eq!(limiter.verstoss_melden(conn), Verstoss::Warnung);
        assert_eq!(limiter.verstoss_melden(conn), Verstoss::Trennen);
        assert_eq!(limiter.verstoesse(&conn), 3);

        limiter.verbindung_entfernen(&conn);
        assert_eq!(limiter.verstoesse(&conn), 0);
        assert_eq!(limiter.verstoss_melden(conn), Verstoss::Warnung);
    }

    #[test]
    fn aufraeumen_entfernt_abgelaufene_ip_fenster() {
        let mut limiter = limiter(50, 10, 10);
        let t0 = Instant::now();
        limiter.erstellung_pruefen_at(IpAddr::V4(Ipv4Addr::LOCALHOST), t0);
        limiter.aufraeumen_at(t0 + Duration::from_secs(30));
        assert_eq!(limiter.ip_fenster_anzahl(), 1);
        limiter.aufraeumen_at(t0 + Duration::from_secs(61));
        assert_eq!(limiter.ip_fenster_anzahl(), 0);
    }
}
