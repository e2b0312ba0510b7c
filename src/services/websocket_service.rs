use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::ws::{CloseFrame, Message, WebSocket, close_code},
};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    dto::{
        snapshot::StateUpdate,
        ws::{ClientMessage, ErrorMessage, JoinedMessage, ServerMessage, VoteRequest},
    },
    error::ServiceError,
    services::room_service::{self, JoinedRoom},
    state::{
        SHUTDOWN_REASON, SharedState,
        participant::{ParticipantId, new_participant_id},
        room::{RoomEvent, RoomSnapshot},
        room_id::RoomId,
    },
};

/// Internal error type for participant socket handling.
#[derive(Debug, Error)]
enum SessionError {
    /// Writer channel closed - connection should be terminated immediately.
    #[error("connection closed")]
    ConnectionClosed,
    /// The room is gone; the participant can no longer act in it.
    #[error("room no longer available: {0}")]
    RoomGone(ServiceError),
}

/// What the read loop should do after handling one client frame.
enum Flow {
    Continue,
    Stop,
}

/// Handle the full lifecycle of a participant WebSocket connection to `raw_room_id`.
pub async fn handle_socket(state: SharedState, socket: WebSocket, raw_room_id: String) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if sender.send(message).await.is_err() || closing {
                break;
            }
        }
    });

    let room_id = match room_service::parse_room_id(&state, &raw_room_id) {
        Ok(room_id) => room_id,
        Err(err) => {
            warn!(room = %raw_room_id, error = %err, "rejecting malformed room id");
            reject(&outbound_tx, &err);
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let config = state.config();
    let initial_message = match time::timeout(config.join_timeout, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) | Ok(None) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            reject(
                &outbound_tx,
                &ServiceError::NotJoined("first message must be a `join`".into()),
            );
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Err(_) => {
            warn!(room_id = %room_id, "websocket join timed out");
            reject(&outbound_tx, &ServiceError::Timeout);
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let name = match ClientMessage::from_json_str(&initial_message) {
        Ok(ClientMessage::Join(join)) => join.name,
        Ok(_) => {
            warn!(room_id = %room_id, "first message was not a join");
            reject(
                &outbound_tx,
                &ServiceError::NotJoined("first message must be a `join`".into()),
            );
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Err(err) => {
            warn!(room_id = %room_id, error = %err, "failed to parse or validate join message");
            reject(&outbound_tx, &ServiceError::InvalidInput(err.to_string()));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let participant_id = new_participant_id();
    let JoinedRoom { room, mut updates } =
        match room_service::join(&state, &room_id, participant_id.clone(), name).await {
            Ok(joined) => joined,
            Err(err) => {
                warn!(room_id = %room_id, error = %err, "join rejected");
                reject(&outbound_tx, &err);
                finalize(writer_task, outbound_tx).await;
                return;
            }
        };
    let room_id = room.id().clone();

    let ack = ServerMessage::Joined(JoinedMessage {
        room_id: room_id.clone(),
        participant_id: participant_id.clone(),
    });
    if send_message(&outbound_tx, &ack).is_err() {
        disconnect(&state, &participant_id).await;
        finalize(writer_task, outbound_tx).await;
        return;
    }

    let mut shutdown = state.shutdown_watcher();
    let mut heartbeat = time::interval_at(
        Instant::now() + config.heartbeat_interval,
        config.heartbeat_interval,
    );
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_seen = Instant::now();

    if *shutdown.borrow_and_update() {
        let _ = outbound_tx.send(going_away());
    } else {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!(participant_id = %participant_id, "closing participant socket for shutdown");
                    let _ = outbound_tx.send(going_away());
                    break;
                }
                update = updates.recv() => match update {
                    Ok(snapshot) => {
                        if send_update(&outbound_tx, &snapshot, &participant_id).is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // Every snapshot is complete; the next one catches the client up.
                        debug!(participant_id = %participant_id, skipped, "participant lagging behind room updates");
                    }
                    Err(RecvError::Closed) => {
                        info!(room_id = %room_id, participant_id = %participant_id, "room closed");
                        let _ = outbound_tx.send(Message::Close(None));
                        break;
                    }
                },
                _ = heartbeat.tick() => {
                    if last_seen.elapsed() > config.heartbeat_timeout {
                        warn!(participant_id = %participant_id, "participant heartbeat timed out");
                        let _ = outbound_tx.send(Message::Close(None));
                        break;
                    }
                    if outbound_tx.send(Message::Ping(Bytes::new())).is_err() {
                        break;
                    }
                }
                message = receiver.next() => {
                    last_seen = Instant::now();
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            debug!(participant_id = %participant_id, payload = %text, "received participant message");
                            match handle_client_text(&state, &room_id, &participant_id, &text, &outbound_tx).await {
                                Ok(Flow::Continue) => {}
                                Ok(Flow::Stop) => break,
                                Err(err) => {
                                    warn!(participant_id = %participant_id, error = %err, "terminating participant session");
                                    let _ = outbound_tx.send(Message::Close(None));
                                    break;
                                }
                            }
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            let _ = outbound_tx.send(Message::Pong(payload));
                        }
                        Some(Ok(Message::Close(frame))) => {
                            info!(participant_id = %participant_id, "participant closed socket");
                            let _ = outbound_tx.send(Message::Close(frame));
                            break;
                        }
                        Some(Ok(Message::Binary(_))) | Some(Ok(Message::Pong(_))) => {}
                        Some(Err(err)) => {
                            warn!(participant_id = %participant_id, error = %err, "websocket error");
                            break;
                        }
                        None => break,
                    }
                }
            }
        }
    }

    disconnect(&state, &participant_id).await;
    info!(room_id = %room_id, participant_id = %participant_id, "participant disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Dispatch one text frame from a joined participant.
async fn handle_client_text(
    state: &SharedState,
    room_id: &RoomId,
    participant_id: &str,
    text: &str,
    tx: &mpsc::UnboundedSender<Message>,
) -> Result<Flow, SessionError> {
    let message = match ClientMessage::from_json_str(text) {
        Ok(message) => message,
        Err(err) => {
            warn!(participant_id = %participant_id, error = %err, "failed to parse or validate participant message");
            send_error(tx, &ServiceError::InvalidInput(err.to_string()))?;
            return Ok(Flow::Continue);
        }
    };

    let result = match message {
        ClientMessage::Join(_) => {
            debug!(participant_id = %participant_id, "ignoring duplicate join");
            return Ok(Flow::Continue);
        }
        ClientMessage::Leave => {
            disconnect(state, participant_id).await;
            let _ = tx.send(Message::Close(None));
            return Ok(Flow::Stop);
        }
        ClientMessage::Unknown => {
            send_error(
                tx,
                &ServiceError::InvalidInput("unknown message type".into()),
            )?;
            return Ok(Flow::Continue);
        }
        ClientMessage::Vote(VoteRequest { value }) => {
            room_service::vote(state, room_id, participant_id, value).await
        }
        ClientMessage::Reveal => room_service::handle_event(state, room_id, RoomEvent::Reveal).await,
        ClientMessage::Reset => room_service::handle_event(state, room_id, RoomEvent::Reset).await,
    };

    match result {
        Ok(_) => Ok(Flow::Continue),
        Err(err @ (ServiceError::NotFound(_) | ServiceError::RoomClosed)) => {
            send_error(tx, &err)?;
            Err(SessionError::RoomGone(err))
        }
        Err(err) => {
            send_error(tx, &err)?;
            Ok(Flow::Continue)
        }
    }
}

/// Release the participant's binding, leaving the room at most once.
async fn disconnect(state: &SharedState, participant_id: &str) {
    if let Err(err) = room_service::leave(state, participant_id).await {
        debug!(participant_id = %participant_id, error = %err, "leave skipped");
    }
}

/// Render `snapshot` for the receiving participant and queue it.
fn send_update(
    tx: &mpsc::UnboundedSender<Message>,
    snapshot: &Arc<RoomSnapshot>,
    participant_id: &ParticipantId,
) -> Result<(), SessionError> {
    let update = StateUpdate::for_viewer(snapshot, Some(participant_id.as_str()));
    send_message(tx, &ServerMessage::StateUpdate(update))
}

fn send_error(tx: &mpsc::UnboundedSender<Message>, err: &ServiceError) -> Result<(), SessionError> {
    send_message(
        tx,
        &ServerMessage::Error(ErrorMessage {
            code: err.code().to_string(),
            message: err.to_string(),
        }),
    )
}

/// Send an `error` message followed by a Close frame.
fn reject(tx: &mpsc::UnboundedSender<Message>, err: &ServiceError) {
    let _ = send_error(tx, err);
    let _ = tx.send(Message::Close(None));
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Serialization failures are logged and swallowed; only a closed writer is reported.
fn send_message(
    tx: &mpsc::UnboundedSender<Message>,
    message: &ServerMessage,
) -> Result<(), SessionError> {
    let payload = match serde_json::to_string(message) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{message:?}`");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| SessionError::ConnectionClosed)
}

fn going_away() -> Message {
    Message::Close(Some(CloseFrame {
        code: close_code::AWAY,
        reason: SHUTDOWN_REASON.into(),
    }))
}

async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
