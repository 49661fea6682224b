//! Integrationstests: Hochfahren, Health-Endpunkt, Neustart mit SQLite

use tavern_server::config::{ServerConfig, SpeicherBackend};
use tavern_server::Server;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.netzwerk.bind_adresse = "127.0.0.1".into();
    config.netzwerk.port = 0;
    config.netzwerk.shutdown_frist_ms = 2000;
    config
}

async fn http_get(adresse: std::net::SocketAddr, pfad: &str) -> String {
    let mut stream = TcpStream::connect(adresse).await.unwrap();
    let anfrage = format!("GET {pfad} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(anfrage.as_bytes()).await.unwrap();
    let mut antwort = String::new();
    stream.read_to_string(&mut antwort).await.unwrap();
    antwort
}

#[tokio::test]
async fn health_nach_dem_start() {
    let laufend = Server::neu(test_config()).hochfahren().await.unwrap();
    let adresse = laufend.lokale_adresse();
    assert_ne!(adresse.port(), 0);

    let antwort = http_get(adresse, "/health").await;
    assert!(antwort.starts_with("HTTP/1.1 200"), "{antwort}");
    assert!(antwort.contains(r#"{"status":"ok","taverns":0}"#), "{antwort}");

    laufend.herunterfahren().await;
    assert!(TcpStream::connect(adresse).await.is_err());
}

#[tokio::test]
async fn taverns_ueberleben_neustart_mit_sqlite() {
    let verzeichnis = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.speicher.backend = SpeicherBackend::Sqlite;
    config.speicher.pfad = verzeichnis
        .path()
        .join("daten/tavern.db")
        .to_string_lossy()
        .into_owned();

    let laufend = Server::neu(config.clone()).hochfahren().await.unwrap();
    let view = laufend
        .state
        .hub
        .lock()
        .await
        .presence
        .tavern_erstellen("Stammtisch", None, "abc123")
        .await
        .unwrap();
    laufend.herunterfahren().await;

    let laufend = Server::neu(config).hochfahren().await.unwrap();
    {
        let hub = laufend.state.hub.lock().await;
        let geladen = hub.presence.tavern_info(&view.id).unwrap();
        assert_eq!(geladen.name, "Stammtisch");
        assert_eq!(geladen.channels.len(), 1);
        assert_eq!(geladen.channels[0].name, "General");
        assert!(geladen.channels[0].peers.is_empty());
    }

    let antwort = http_get(laufend.lokale_adresse(), "/health").await;
    assert!(antwort.contains(r#""taverns":1"#), "{antwort}");
    laufend.herunterfahren().await;
}

#[tokio::test]
async fn ungueltige_bind_adresse_scheitert() {
    let mut config = test_config();
    config.netzwerk.bind_adresse = "nirgendwo".into();
    assert!(Server::neu(config).hochfahren().await.is_err());
}
