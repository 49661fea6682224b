//! Health-Check-Endpunkt
//!
//! Endpoint: `GET /health`
//! Response: `{"status":"ok","taverns":N}`

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::ObservabilityState;

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub taverns: u64,
}

impl HealthResponse {
    pub fn ok(taverns: u64) -> Self {
        Self {
            status: "ok".into(),
            taverns,
        }
    }
}

/// `GET /health`
pub(crate) async fn health_handler(State(state): State<ObservabilityState>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(state.quelle.tavern_anzahl().await))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_format() {
        let json = serde_json::to_value(HealthResponse::ok(3)).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "ok", "taverns": 3 }));
    }
}
