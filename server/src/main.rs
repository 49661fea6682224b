//! Tavern Server – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den Relay.

use anyhow::Result;
use tavern_server::{config::ServerConfig, Server};

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("TAVERN_CONFIG").unwrap_or_else(|_| "tavern.toml".into());

    // Konfiguration laden (Standardwerte falls Datei fehlt, danach Umgebung)
    let config = ServerConfig::laden(&config_pfad)?;

    tavern_observability::logging_initialisieren(&config.logging.level, &config.logging.format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "Tavern Server wird initialisiert"
    );

    Server::neu(config).starten().await
}
