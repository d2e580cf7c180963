//! Per-connection handler: frame decoding and event dispatch.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Spawn a writer pump: outbound channel → socket
//!   2. Loop: read frames → decode `ClientMessage` → dispatch to the registry
//!   3. On reader exit: reap the player (and possibly their room)
//!
//! There is no handshake and no idle timeout — a party connection lives as
//! long as the client keeps it open, and identity is just the pseudo carried
//! in `join_room`.

use std::sync::Arc;

use sipforge_protocol::{ClientMessage, Codec, ServerMessage};
use sipforge_room::{OutboundSender, RoomError};
use sipforge_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::SipforgeError;
use crate::server::ServerState;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), SipforgeError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    // Outbound path: room actors (and this handler) push onto the channel,
    // the pump serializes and writes. Fire-and-forget — a slow socket backs
    // up its own channel, never a room.
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let writer = tokio::spawn({
        let conn = conn.clone();
        let state = Arc::clone(&state);
        async move {
            while let Some(msg) = rx.recv().await {
                let bytes = match state.codec.encode(&msg) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!(%conn_id, error = %e, "failed to encode outbound message");
                        continue;
                    }
                };
                if conn.send(&bytes).await.is_err() {
                    break;
                }
            }
        }
    });

    // Inbound path: decode and dispatch until the peer goes away.
    loop {
        match conn.recv().await {
            Ok(Some(data)) => {
                let msg: ClientMessage = match state.codec.decode(&data) {
                    Ok(msg) => msg,
                    Err(e) => {
                        // A malformed frame is the sender's problem, not the
                        // room's: drop it and keep reading.
                        tracing::debug!(%conn_id, error = %e, "undecodable frame dropped");
                        continue;
                    }
                };
                dispatch(&state, conn_id, &tx, msg).await;
            }
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        }
    }

    // Reap: remove the player record, shrink (or destroy) their room.
    state.registry.lock().await.disconnect(conn_id).await;
    writer.abort();

    Ok(())
}

/// Routes one inbound event to the registry and reports failures back to
/// the originating connection only.
///
/// Error posture per event:
/// - `join_room` — every rejection (blank pseudo, taken pseudo, second
///   room) is reported to the joiner;
/// - `start_game` / `next_round` — a missing room or empty queue earns an
///   error so the host's client can react;
/// - everything else — best-effort: a stale room reference is silently
///   dropped, matching the ephemeral nature of a party.
async fn dispatch<C: Codec>(
    state: &Arc<ServerState<C>>,
    origin: ConnectionId,
    origin_tx: &OutboundSender,
    msg: ClientMessage,
) {
    match msg {
        ClientMessage::JoinRoom {
            code,
            pseudo,
            avatar,
        } => {
            let result = state
                .registry
                .lock()
                .await
                .join(code, pseudo, avatar, origin, origin_tx.clone())
                .await;
            if let Err(e) = result {
                send_error(origin_tx, &e);
            }
        }

        msg @ (ClientMessage::StartGame { .. } | ClientMessage::NextRound { .. }) => {
            let code = msg.code().clone();
            let delivered = state
                .registry
                .lock()
                .await
                .deliver(origin, origin_tx, msg)
                .await;
            if !delivered {
                send_error(origin_tx, &RoomError::NotFound(code));
            }
        }

        msg => {
            // PERF: the registry lock is held across the room send. Fine at
            // party scale; cache the handle per-connection if it ever shows.
            state
                .registry
                .lock()
                .await
                .deliver(origin, origin_tx, msg)
                .await;
        }
    }
}

/// Queues an `error` event for the originating connection.
fn send_error(origin_tx: &OutboundSender, err: &RoomError) {
    let _ = origin_tx.send(ServerMessage::Error {
        message: err.to_string(),
    });
}
