//! Metriken: JSON-Snapshot und Prometheus-Export
//!
//! Registrierte Prometheus-Metriken:
//! - `tavern_connected_peers` – Gauge: offene WebSocket-Verbindungen
//! - `tavern_active_taverns` – Gauge: Taverns mit mindestens einem Peer
//! - `tavern_total_taverns` – Gauge: alle bekannten Taverns
//! - `tavern_messages_total` – Counter: verarbeitete Client-Frames
//! - `tavern_rate_limit_violations_total` – Counter: Rate-Limit-Verstoesse
//! - `tavern_session_replacements_total` – Counter: verdraengte Sessions
//! - `tavern_heartbeat_terminations_total` – Counter: per Heartbeat getrennte Verbindungen

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::status::MetrikSnapshot;
use crate::ObservabilityState;

/// Alle Tavern-Prometheus-Metriken
#[derive(Clone)]
pub struct TavernMetriken {
    pub registry: Arc<Registry>,

    pub connected_peers: IntGauge,
    pub active_taverns: IntGauge,
    pub total_taverns: IntGauge,

    pub messages_total: IntCounter,
    pub rate_limit_violations_total: IntCounter,
    pub session_replacements_total: IntCounter,
    pub heartbeat_terminations_total: IntCounter,
}

fn gauge(registry: &Registry, name: &str, hilfe: &str) -> Result<IntGauge> {
    let g = IntGauge::with_opts(Opts::new(name, hilfe))?;
    registry.register(Box::new(g.clone()))?;
    Ok(g)
}

fn counter(registry: &Registry, name: &str, hilfe: &str) -> Result<IntCounter> {
    let c = IntCounter::with_opts(Opts::new(name, hilfe))?;
    registry.register(Box::new(c.clone()))?;
    Ok(c)
}

impl TavernMetriken {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let connected_peers = gauge(
            &registry,
            "tavern_connected_peers",
            "Anzahl offener WebSocket-Verbindungen",
        )?;
        let active_taverns = gauge(
            &registry,
            "tavern_active_taverns",
            "Taverns mit mindestens einem Peer in einem Channel",
        )?;
        let total_taverns = gauge(&registry, "tavern_total_taverns", "Anzahl bekannter Taverns")?;

        let messages_total = counter(
            &registry,
            "tavern_messages_total",
            "Gesamtanzahl verarbeiteter Client-Nachrichten",
        )?;
        let rate_limit_violations_total = counter(
            &registry,
            "tavern_rate_limit_violations_total",
            "Gesamtanzahl Rate-Limit-Verstoesse",
        )?;
        let session_replacements_total = counter(
            &registry,
            "tavern_session_replacements_total",
            "Gesamtanzahl verdraengter Sessions",
        )?;
        let heartbeat_terminations_total = counter(
            &registry,
            "tavern_heartbeat_terminations_total",
            "Per Heartbeat getrennte Verbindungen",
        )?;

        Ok(Self {
            registry: Arc::new(registry),
            connected_peers,
            active_taverns,
            total_taverns,
            messages_total,
            rate_limit_violations_total,
            session_replacements_total,
            heartbeat_terminations_total,
        })
    }

    /// Uebernimmt die Gauges aus einem Snapshot
    pub fn snapshot_uebernehmen(&self, snapshot: &MetrikSnapshot) {
        self.connected_peers.set(snapshot.connected_peers as i64);
        self.active_taverns.set(snapshot.active_taverns as i64);
        self.total_taverns.set(snapshot.total_taverns as i64);
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// `GET /metrics` – JSON-Snapshot
pub(crate) async fn metrics_json_handler(
    State(state): State<ObservabilityState>,
) -> Json<MetrikSnapshot> {
    Json(state.quelle.snapshot().await)
}

/// `GET /metrics/prometheus` – Prometheus scrape format
pub(crate) async fn metrics_prometheus_handler(
    State(state): State<ObservabilityState>,
) -> impl IntoResponse {
    let snapshot = state.quelle.snapshot().await;
    state.metriken.snapshot_uebernehmen(&snapshot);

    match state.metriken.exportieren() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metriken_erstellen_erfolgreich() {
        let metriken = TavernMetriken::neu().unwrap();
        assert!(!metriken.registry.gather().is_empty());
    }

    #[test]
    fn snapshot_setzt_gauges() {
        let metriken = TavernMetriken::neu().unwrap();
        metriken.snapshot_uebernehmen(&MetrikSnapshot {
            connected_peers: 4,
            active_taverns: 1,
            total_taverns: 2,
            uptime: 10,
            messages_per_second: 0,
        });
        assert_eq!(metriken.connected_peers.get(), 4);
        assert_eq!(metriken.active_taverns.get(), 1);
        assert_eq!(metriken.total_taverns.get(), 2);
    }

    #[test]
    fn export_prometheus_format() {
        let metriken = TavernMetriken::neu().unwrap();
        metriken.messages_total.inc_by(3);
        metriken.session_replacements_total.inc();

        let output = metriken.exportieren().unwrap();
        assert!(output.contains("tavern_messages_total 3"));
        assert!(output.contains("tavern_session_replacements_total 1"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn snapshot_json_camel_case() {
        let json = serde_json::to_value(MetrikSnapshot {
            connected_peers: 1,
            active_taverns: 0,
            total_taverns: 0,
            uptime: 5,
            messages_per_second: 2,
        })
        .unwrap();
        assert_eq!(json["connectedPeers"], 1);
        assert_eq!(json["messagesPerSecond"], 2);
        assert!(json.get("uptime").is_some());
    }
}
