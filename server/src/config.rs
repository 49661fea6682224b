//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen und danach von
//! Umgebungsvariablen ueberschrieben. Alle Felder haben sinnvolle
//! Standardwerte, sodass der Relay ohne Konfigurationsdatei lauffaehig ist.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use tavern_observability::{log_format_gueltig, log_level_gueltig};
use tavern_signaling::{RateLimitKonfig, SignalingConfig};

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Persistenz der Tavern-Huellen
    pub speicher: SpeicherEinstellungen,
    /// Liveness-Pruefung
    pub heartbeat: HeartbeatEinstellungen,
    /// Rate-Limits und Kapazitaeten
    pub limits: LimitEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer WebSocket und HTTP
    pub bind_adresse: String,
    pub port: u16,
    /// Wartezeit auf den Listener beim Herunterfahren
    pub shutdown_frist_ms: u64,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 8080,
            shutdown_frist_ms: 5000,
        }
    }
}

/// Speicher-Backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeicherBackend {
    /// Fluechtig, nur fuer die Laufzeit des Prozesses
    #[default]
    Memory,
    /// Dauerhaft in einer SQLite-Datei
    Sqlite,
}

impl FromStr for SpeicherBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            anderes => bail!("Unbekanntes Speicher-Backend '{anderes}' (erlaubt: memory, sqlite)"),
        }
    }
}

impl std::fmt::Display for SpeicherBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Sqlite => f.write_str("sqlite"),
        }
    }
}

/// Speicher-Einstellungen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeicherEinstellungen {
    pub backend: SpeicherBackend,
    /// Pfad der SQLite-Datei (nur fuer `sqlite`)
    pub pfad: String,
    /// Zeitlimit fuer Oeffnen und Laden beim Start
    pub init_timeout_ms: u64,
}

impl Default for SpeicherEinstellungen {
    fn default() -> Self {
        Self {
            backend: SpeicherBackend::Memory,
            pfad: "data/tavern.db".into(),
            init_timeout_ms: 10_000,
        }
    }
}

/// Heartbeat-Einstellungen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatEinstellungen {
    pub intervall_ms: u64,
    pub timeout_ms: u64,
}

impl Default for HeartbeatEinstellungen {
    fn default() -> Self {
        Self {
            intervall_ms: 30_000,
            timeout_ms: 30_000,
        }
    }
}

/// Rate-Limits und Kapazitaeten
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitEinstellungen {
    pub nachrichten_pro_sekunde: u32,
    pub taverns_pro_minute: u32,
    /// Verstoesse bis zur Zwangstrennung (Close 1008)
    pub verstoss_schwelle: u32,
    pub max_peers_per_channel: usize,
    pub max_peers_per_room: usize,
}

impl Default for LimitEinstellungen {
    fn default() -> Self {
        Self {
            nachrichten_pro_sekunde: 50,
            taverns_pro_minute: 10,
            verstoss_schwelle: 10,
            max_peers_per_channel: 8,
            max_peers_per_room: 8,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

fn zahl<T>(name: &str, wert: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    wert.trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Ungueltiger Wert fuer {name}='{wert}': {e}"))
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei und wendet die
    /// Umgebungsvariablen an.
    /// Verwendet Standardwerte wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let mut config = Self::aus_datei(pfad)?;
        config.umgebung_anwenden(|name| std::env::var(name).ok())?;
        config.validieren()?;
        Ok(config)
    }

    fn aus_datei(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Ueberschreibt Felder aus Umgebungsvariablen
    ///
    /// `lookup` liefert den Wert einer Variable; in Tests eine Map statt
    /// der Prozessumgebung.
    pub fn umgebung_anwenden<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(wert) = lookup("PORT") {
            self.netzwerk.port = zahl("PORT", &wert)?;
        }
        if let Some(wert) = lookup("TAVERN_BIND") {
            self.netzwerk.bind_adresse = wert;
        }
        if let Some(wert) = lookup("TAVERN_STORE") {
            self.speicher.backend = wert.parse()?;
        }
        if let Some(wert) = lookup("TAVERN_DB_PATH") {
            self.speicher.pfad = wert;
        }
        if let Some(wert) = lookup("TAVERN_STORE_INIT_TIMEOUT_MS") {
            self.speicher.init_timeout_ms = zahl("TAVERN_STORE_INIT_TIMEOUT_MS", &wert)?;
        }
        if let Some(wert) = lookup("TAVERN_HEARTBEAT_INTERVAL_MS") {
            self.heartbeat.intervall_ms = zahl("TAVERN_HEARTBEAT_INTERVAL_MS", &wert)?;
        }
        if let Some(wert) = lookup("TAVERN_HEARTBEAT_TIMEOUT_MS") {
            self.heartbeat.timeout_ms = zahl("TAVERN_HEARTBEAT_TIMEOUT_MS", &wert)?;
        }
        if let Some(wert) = lookup("TAVERN_RATE_MESSAGES_PER_SEC") {
            self.limits.nachrichten_pro_sekunde = zahl("TAVERN_RATE_MESSAGES_PER_SEC", &wert)?;
        }
        if let Some(wert) = lookup("TAVERN_RATE_CREATE_TAVERN_PER_MIN") {
            self.limits.taverns_pro_minute = zahl("TAVERN_RATE_CREATE_TAVERN_PER_MIN", &wert)?;
        }
        if let Some(wert) = lookup("TAVERN_RATE_VIOLATION_THRESHOLD") {
            self.limits.verstoss_schwelle = zahl("TAVERN_RATE_VIOLATION_THRESHOLD", &wert)?;
        }
        if let Some(wert) = lookup("TAVERN_MAX_PEERS_PER_CHANNEL") {
            self.limits.max_peers_per_channel = zahl("TAVERN_MAX_PEERS_PER_CHANNEL", &wert)?;
        }
        if let Some(wert) = lookup("TAVERN_MAX_PEERS_PER_ROOM") {
            self.limits.max_peers_per_room = zahl("TAVERN_MAX_PEERS_PER_ROOM", &wert)?;
        }
        if let Some(wert) = lookup("TAVERN_LOG_LEVEL") {
            self.logging.level = wert;
        }
        if let Some(wert) = lookup("TAVERN_LOG_FORMAT") {
            self.logging.format = wert;
        }
        Ok(())
    }

    /// Prueft die Werte auf Plausibilitaet
    pub fn validieren(&self) -> anyhow::Result<()> {
        self.bind_adresse()?;

        let pflicht_positiv = [
            ("heartbeat.intervall_ms", self.heartbeat.intervall_ms),
            ("heartbeat.timeout_ms", self.heartbeat.timeout_ms),
            ("speicher.init_timeout_ms", self.speicher.init_timeout_ms),
            ("limits.nachrichten_pro_sekunde", self.limits.nachrichten_pro_sekunde as u64),
            ("limits.taverns_pro_minute", self.limits.taverns_pro_minute as u64),
            ("limits.verstoss_schwelle", self.limits.verstoss_schwelle as u64),
            ("limits.max_peers_per_channel", self.limits.max_peers_per_channel as u64),
            ("limits.max_peers_per_room", self.limits.max_peers_per_room as u64),
        ];
        for (name, wert) in pflicht_positiv {
            if wert == 0 {
                bail!("{name} muss groesser als 0 sein");
            }
        }

        if self.speicher.backend == SpeicherBackend::Sqlite && self.speicher.pfad.trim().is_empty() {
            bail!("speicher.pfad darf fuer das sqlite-Backend nicht leer sein");
        }
        if !log_level_gueltig(&self.logging.level) {
            bail!("Unbekanntes Log-Level '{}'", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            bail!("Unbekanntes Log-Format '{}' (erlaubt: text, json)", self.logging.format);
        }
        Ok(())
    }

    /// Socket-Adresse fuer den Listener
    pub fn bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr = self
            .netzwerk
            .bind_adresse
            .trim()
            .parse()
            .with_context(|| format!("Ungueltige Bind-Adresse '{}'", self.netzwerk.bind_adresse))?;
        Ok(SocketAddr::new(ip, self.netzwerk.port))
    }

    pub fn store_init_timeout(&self) -> Duration {
        Duration::from_millis(self.speicher.init_timeout_ms)
    }

    /// Konfiguration fuer den Signaling-Service
    pub fn signaling_config(&self) -> SignalingConfig {
        SignalingConfig {
            max_peers_per_channel: self.limits.max_peers_per_channel,
            max_peers_per_room: self.limits.max_peers_per_room,
            rate_limit: RateLimitKonfig {
                nachrichten_pro_sekunde: self.limits.nachrichten_pro_sekunde,
                taverns_pro_minute: self.limits.taverns_pro_minute,
                verstoss_schwelle: self.limits.verstoss_schwelle,
            },
            heartbeat_intervall: Duration::from_millis(self.heartbeat.intervall_ms),
            heartbeat_timeout: Duration::from_millis(self.heartbeat.timeout_ms),
            shutdown_frist: Duration::from_millis(self.netzwerk.shutdown_frist_ms),
        }
    }
}
