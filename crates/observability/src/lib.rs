//! # tavern-observability
//!
//! Observability fuer den Tavern-Relay:
//! - Health-Check-Endpunkt (`/health`)
//! - JSON-Metriken (`/metrics`) und Prometheus-Export (`/metrics/prometheus`)
//! - Structured Logging via tracing-subscriber
//! - HTTP-Request-Tracing

pub mod health;
pub mod logging;
pub mod metrics;
pub mod status;

pub use health::HealthResponse;
pub use logging::{log_format_gueltig, log_level_gueltig, logging_initialisieren};
pub use metrics::TavernMetriken;
pub use status::{MetrikSnapshot, StatusQuelle};

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::TraceLayer;

/// Geteilter Zustand der Observability-Handler
#[derive(Clone)]
pub struct ObservabilityState {
    pub quelle: Arc<dyn StatusQuelle>,
    pub metriken: TavernMetriken,
}

/// Router mit `/health`, `/metrics` und `/metrics/prometheus`
///
/// Wird in den Haupt-Router des Relays gemerged (gleicher Port).
pub fn observability_router(quelle: Arc<dyn StatusQuelle>, metriken: TavernMetriken) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/metrics", get(metrics::metrics_json_handler))
        .route("/metrics/prometheus", get(metrics::metrics_prometheus_handler))
        .with_state(ObservabilityState { quelle, metriken })
}

/// Tracing-Layer fuer HTTP-Anfragen (Methode, Pfad, Status, Dauer)
pub fn http_trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    struct FesteQuelle;

    #[async_trait]
    impl StatusQuelle for FesteQuelle {
        async fn tavern_anzahl(&self) -> u64 {
            2
        }

        async fn snapshot(&self) -> MetrikSnapshot {
            MetrikSnapshot {
                connected_peers: 3,
                active_taverns: 1,
                total_taverns: 2,
                uptime: 42,
                messages_per_second: 7,
            }
        }
    }

    fn router() -> Router {
        observability_router(Arc::new(FesteQuelle), TavernMetriken::neu().unwrap())
    }

    async fn body_json(antwort: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(antwort.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_liefert_tavern_anzahl() {
        let antwort = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::OK);
        assert_eq!(
            body_json(antwort).await,
            serde_json::json!({ "status": "ok", "taverns": 2 })
        );
    }

    #[tokio::test]
    async fn metrics_json_felder() {
        let antwort = router()
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(antwort).await;
        assert_eq!(json["connectedPeers"], 3);
        assert_eq!(json["activeTaverns"], 1);
        assert_eq!(json["totalTaverns"], 2);
        assert_eq!(json["uptime"], 42);
        assert_eq!(json["messagesPerSecond"], 7);
    }

    #[tokio::test]
    async fn metrics_prometheus_text() {
        let antwort = router()
            .oneshot(
                Request::get("/metrics/prometheus")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(antwort.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("tavern_connected_peers 3"));
        assert!(text.contains("tavern_total_taverns 2"));
    }
}
