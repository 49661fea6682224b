//! Client-Connection – Verwaltet eine einzelne WebSocket-Verbindung
//!
//! Jede Verbindung laeuft in einem eigenen tokio-Task. Die Schleife liest
//! Frames vom Socket, reicht Text-Frames an den Dispatcher und schreibt alles
//! was ueber die Send-Queue des Broadcasters ankommt.
//!
//! ## Lebenszyklus
//! ```text
//! Verbunden -> [Raum | Channel]* -> Getrennt
//! ```
//! Getrennt ist endgueltig: Socket-Close, Heartbeat-Timeout, Verdraengung,
//! Rate-Limit-Eskalation und Shutdown enden alle in `dispatcher.trennen`.

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::StreamExt;
use std::net::SocketAddr;
use tavern_core::types::ConnId;
use tavern_protocol::encode_server_message;
use tokio::sync::watch;

use crate::broadcast::Ausgehend;
use crate::dispatcher::MessageDispatcher;

/// Ergebnis eines Schreibvorgangs
enum Schreiben {
    Weiter,
    Beenden,
}

async fn ausgehend_schreiben(socket: &mut WebSocket, conn_id: ConnId, element: Ausgehend) -> Schreiben {
    let nachricht = match element {
        Ausgehend::Nachricht(nachricht) => match encode_server_message(&nachricht) {
            Ok(text) => Message::Text(text),
            Err(e) => {
                tracing::warn!(conn_id = %conn_id, fehler = %e, "Nachricht nicht kodierbar");
                return Schreiben::Weiter;
            }
        },
        Ausgehend::Ping => Message::Ping(Vec::new()),
        Ausgehend::Schliessen { code, grund } => {
            tracing::debug!(conn_id = %conn_id, code, grund = %grund, "Close-Frame wird gesendet");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code,
                    reason: grund.into(),
                })))
                .await;
            return Schreiben::Beenden;
        }
    };

    match socket.send(nachricht).await {
        Ok(()) => Schreiben::Weiter,
        Err(e) => {
            tracing::warn!(conn_id = %conn_id, fehler = %e, "Senden fehlgeschlagen");
            Schreiben::Beenden
        }
    }
}

/// Bedient eine WebSocket-Verbindung bis sie getrennt wird
pub async fn verbindung_bedienen(
    mut socket: WebSocket,
    peer_addr: SocketAddr,
    dispatcher: MessageDispatcher,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let conn_id = ConnId::new();
    let mut empfang = dispatcher.verbinden(conn_id, peer_addr.ip()).await;

    loop {
        // Reihenfolge: harte Trennung vor eingereihten Nachrichten vor neuen
        // Frames. Ein Shutdown reiht Notiz und Close vor dem Signal ein.
        tokio::select! {
            biased;

            Ok(()) = empfang.abbruch.changed() => {
                if *empfang.abbruch.borrow() {
                    tracing::warn!(conn_id = %conn_id, "Verbindung hart getrennt");
                    break;
                }
            }

            Some(element) = empfang.ausgehend.recv() => {
                if let Schreiben::Beenden = ausgehend_schreiben(&mut socket, conn_id, element).await {
                    break;
                }
            }

            frame = socket.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        dispatcher.text_verarbeiten(conn_id, &text).await;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        dispatcher.pong(conn_id).await;
                    }
                    Some(Ok(Message::Ping(_))) => {
                        // Pong beantwortet axum selbst
                    }
                    Some(Ok(Message::Binary(daten))) => {
                        tracing::debug!(conn_id = %conn_id, laenge = daten.len(), "Binaer-Frame verworfen");
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(conn_id = %conn_id, "Verbindung vom Client geschlossen");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::debug!(conn_id = %conn_id, fehler = %e, "Lesefehler");
                        break;
                    }
                }
            }

            Ok(()) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!(conn_id = %conn_id, "Shutdown-Signal – Verbindung wird getrennt");
                    break;
                }
            }
        }
    }

    dispatcher.trennen(conn_id).await;
}
