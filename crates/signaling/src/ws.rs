//! WebSocket-Listener – Bindet Socket, nimmt Upgrades an
//!
//! Der `SignalingServer` bedient WebSocket-Upgrades auf `/` und `/ws` sowie
//! die Observability-Routen auf demselben Port. Jede Verbindung laeuft in
//! einem eigenen tokio-Task.
//!
//! ## Shutdown
//! Der Listener endet ueber `with_graceful_shutdown`, sobald das
//! Shutdown-Signal im [`SignalingState`] ausgeloest wird. Waehrend des
//! Herunterfahrens werden neue Upgrades mit 503 abgelehnt.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tavern_observability::{http_trace_layer, observability_router, StatusQuelle};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::connection::verbindung_bedienen;
use crate::dispatcher::MessageDispatcher;
use crate::error::SignalingResult;
use crate::server_state::SignalingState;

async fn ws_handler(
    State(state): State<Arc<SignalingState>>,
    ws: WebSocketUpgrade,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
) -> Response {
    if state.ist_draining() {
        tracing::debug!(peer = %peer_addr, "Upgrade waehrend Shutdown abgelehnt");
        return (StatusCode::SERVICE_UNAVAILABLE, "server shutting down").into_response();
    }

    let shutdown_rx = state.shutdown_empfaenger();
    let dispatcher = MessageDispatcher::neu(state);
    ws.on_upgrade(move |socket| verbindung_bedienen(socket, peer_addr, dispatcher, shutdown_rx))
}

/// Router mit WebSocket- und Observability-Routen
pub fn router(state: Arc<SignalingState>) -> Router {
    let quelle: Arc<dyn StatusQuelle> = state.clone();
    let metriken = state.metriken.clone();

    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .with_state(state)
        .merge(observability_router(quelle, metriken))
        .layer(http_trace_layer())
}

/// Laufender WebSocket-Server
pub struct SignalingServer {
    lokale_adresse: SocketAddr,
    handle: JoinHandle<std::io::Result<()>>,
}

impl SignalingServer {
    /// Bindet den Listener und startet die Accept-Schleife im Hintergrund
    pub async fn starten(state: Arc<SignalingState>, bind_addr: SocketAddr) -> SignalingResult<Self> {
        let listener = TcpListener::bind(bind_addr).await?;
        let lokale_adresse = listener.local_addr()?;
        let app = router(state.clone());
        let mut shutdown_rx = state.shutdown_empfaenger();

        tracing::info!(adresse = %lokale_adresse, "WebSocket Signaling-Server gestartet");

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|aktiv| *aktiv).await;
            })
            .await
        });

        Ok(Self {
            lokale_adresse,
            handle,
        })
    }

    /// Tatsaechlich gebundene Adresse (relevant bei Port 0)
    pub fn lokale_adresse(&self) -> SocketAddr {
        self.lokale_adresse
    }

    /// Wartet bis der Listener beendet ist
    pub async fn beendet(self) -> SignalingResult<()> {
        match self.handle.await {
            Ok(ergebnis) => Ok(ergebnis?),
            Err(e) => Err(crate::error::SignalingError::intern(format!(
                "Listener-Task abgebrochen: {e}"
            ))),
        }
    }
}
