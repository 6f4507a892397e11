use crate::domain::PlayerId;
use crate::interface_adapters::protocol::{
    ClientMessage, GameStateDto, IdentityDto, JoinRejectedDto, ServerMessage,
};
use crate::interface_adapters::state::{AppState, OutboundFrame};
use crate::interface_adapters::utils::ids::next_connection_id;
use crate::use_cases::{GameBroadcast, GameEvent, RoundSummary};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::timeout;
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Why a connection ended; only ever logged.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    UpdatesClosed,
    JoinTimeout,
    JoinRejected,
    InvalidMessages,
    Unsupported,
    ClosedBeforeJoin,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_JOIN_ATTEMPTS: u32 = 5;

pub async fn broadcast_serializer(
    mut game_rx: broadcast::Receiver<GameBroadcast>,
    frames_tx: broadcast::Sender<OutboundFrame>,
    latest_update_tx: watch::Sender<Utf8Bytes>,
) {
    // Serialize each broadcast once and fan the shared bytes out to all clients.
    loop {
        match game_rx.recv().await {
            Ok(broadcast) => {
                let is_update = matches!(broadcast, GameBroadcast::Update(_));
                let skip_player = match &broadcast {
                    GameBroadcast::PlayerJoined { player_id, .. } => Some(*player_id),
                    _ => None,
                };

                let msg = ServerMessage::from(broadcast);
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize broadcast");
                        continue;
                    }
                };

                let text = Utf8Bytes::from(txt);
                if is_update {
                    // Stored even with no subscribers so late joiners can recover from it.
                    latest_update_tx.send_replace(text.clone());
                }
                let _ = frames_tx.send(OutboundFrame { skip_player, text });
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "serializer lagged; skipping to latest broadcast");
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("game broadcast channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        let conn_id = next_connection_id();
        handle_socket(socket, state, conn_id).instrument(info_span!("conn", conn_id))
    })
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, conn_id: PlayerId) {
    let mut ctx = match bootstrap_connection(&mut socket, &state, conn_id).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeJoin) => {
            info!("client disconnected before join handshake");
            return;
        }
        Err(e) => {
            warn!(error = ?e, "failed to bootstrap connection");
            // The join may have been accepted just before the failure; Leave is a no-op otherwise.
            let _ = state
                .input_tx
                .send(GameEvent::Leave { player_id: conn_id })
                .await;
            let _ = socket.close().await;
            return;
        }
    };

    info!(
        player_id = ctx.player_id,
        username = %ctx.username,
        "client joined"
    );

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

struct ConnCtx {
    pub player_id: PlayerId,
    pub username: String,
    pub input_tx: mpsc::Sender<GameEvent>,
    pub frames_rx: broadcast::Receiver<OutboundFrame>,
    pub latest_update_rx: watch::Receiver<Utf8Bytes>,
    // Snapshots sent in place of frames this client fell behind on.
    pub lag_recovery_count: u64,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_json: u32,

    pub last_input_full_log: Instant,
    pub last_frame_lag_log: Instant,
    pub last_invalid_input_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

#[derive(Debug)]
struct JoinHandshake {
    username: String,
    summary: RoundSummary,
    frames_rx: broadcast::Receiver<OutboundFrame>,
    bytes_in: u64,
    msgs_in: u64,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    state: &AppState,
    player_id: PlayerId,
) -> Result<ConnCtx, NetError> {
    let join = match timeout(
        state.join_timeout,
        read_join_handshake(socket, &state.input_tx, &state.frames_tx, player_id),
    )
    .await
    {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };

    // Tell the client "This is who you are", then which round it is looking at.
    let identity_msg = ServerMessage::Identity(IdentityDto {
        player_id: player_id.to_string(),
    });
    let mut bytes_out = send_message(socket, &identity_msg).await? as u64;
    let state_msg = ServerMessage::GameState(GameStateDto::from(join.summary));
    bytes_out += send_message(socket, &state_msg).await? as u64;

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        player_id,
        username: join.username,
        input_tx: state.input_tx.clone(),
        frames_rx: join.frames_rx,
        latest_update_rx: state.latest_update_tx.subscribe(),
        lag_recovery_count: 0,

        msgs_in: join.msgs_in,
        msgs_out: 2,
        bytes_in: join.bytes_in,
        bytes_out,

        invalid_json: 0,

        last_input_full_log: now,
        last_frame_lag_log: now,
        last_invalid_input_log: now,

        close_frame: None,
    })
}

async fn read_join_handshake(
    socket: &mut WebSocket,
    input_tx: &mpsc::Sender<GameEvent>,
    frames_tx: &broadcast::Sender<OutboundFrame>,
    player_id: PlayerId,
) -> Result<JoinHandshake, NetError> {
    let mut bytes_in: u64 = 0;
    let mut msgs_in: u64 = 0;
    let mut invalid_json: u32 = 0;
    let mut rejected: u32 = 0;

    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        let message = incoming.map_err(NetError::Ws)?;
        let text = match message {
            Message::Text(text) => text,
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::Unsupported);
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        };
        bytes_in += text.len() as u64;
        msgs_in += 1;

        let username = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Join(username)) => username,
            Ok(other) => {
                // Gameplay before joining references no player; drop it.
                debug!(message = ?other, "message before join ignored");
                continue;
            }
            Err(e) => {
                invalid_json += 1;
                debug!(error = %e, "failed to parse handshake message");
                if invalid_json > MAX_INVALID_JSON {
                    let _ = send_close_with_reason(
                        socket,
                        close_code::POLICY,
                        "too many invalid messages",
                    )
                    .await;
                    return Err(NetError::InvalidMessages);
                }
                continue;
            }
        };

        // Subscribe *before* the world task sees the join so no broadcast after the ack is missed.
        let frames_rx = frames_tx.subscribe();
        let (reply, reply_rx) = oneshot::channel();
        input_tx
            .send(GameEvent::Join {
                player_id,
                username: username.clone(),
                reply,
            })
            .await
            .map_err(|_| NetError::InputClosed)?;

        match reply_rx.await {
            Ok(Ok(summary)) => {
                return Ok(JoinHandshake {
                    username: username.trim().to_string(),
                    summary,
                    frames_rx,
                    bytes_in,
                    msgs_in,
                });
            }
            Ok(Err(e)) => {
                rejected += 1;
                let msg = ServerMessage::JoinRejected(JoinRejectedDto {
                    reason: e.reason().to_string(),
                });
                send_message(socket, &msg).await?;
                if rejected >= MAX_JOIN_ATTEMPTS {
                    let _ = send_close_with_reason(socket, close_code::POLICY, "join rejected")
                        .await;
                    return Err(NetError::JoinRejected);
                }
            }
            Err(_) => return Err(NetError::InputClosed),
        }
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

fn forward_event(ctx: &mut ConnCtx, event: GameEvent) -> Result<LoopControl, NetError> {
    match ctx.input_tx.try_send(event) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_evt)) => {
            if should_log(&mut ctx.last_input_full_log) {
                warn!(player_id = ctx.player_id, "input channel full; dropping input");
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_evt)) => Err(NetError::InputClosed),
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let player_id = ctx.player_id;
    let mut fatal: Option<NetError> = None;

    loop {
        let disconnect: bool = tokio::select! {
            // client -> world
            incoming = socket.recv() => {
                match handle_incoming_ws(incoming, ctx) {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // world -> client
            frame = ctx.frames_rx.recv() => {
                match frame {
                    Ok(frame) if frame.skip_player == Some(player_id) => false,
                    Ok(frame) => match forward_frame(frame.text, socket, ctx).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(&mut ctx.last_frame_lag_log) {
                            warn!(missed = n, "broadcasts lagged; sending snapshot");
                        }

                        // Resync strategy: the latest snapshot carries phase and seed too.
                        let latest = ctx.latest_update_rx.borrow().clone();
                        if latest.is_empty() {
                            false
                        } else {
                            ctx.lag_recovery_count += 1;
                            match forward_frame(latest, socket, ctx).await {
                                LoopControl::Continue => false,
                                LoopControl::Disconnect => true,
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::UpdatesClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(ctx).await {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    let player_id = ctx.player_id;
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(_)) => {
                        // One player per socket.
                        if should_log(&mut ctx.last_invalid_input_log) {
                            warn!(player_id, "duplicate join ignored");
                        }
                        Ok(LoopControl::Continue)
                    }
                    Ok(ClientMessage::Jump) => forward_event(ctx, GameEvent::Jump { player_id }),
                    Ok(ClientMessage::Dead) => forward_event(ctx, GameEvent::Dead { player_id }),
                    Ok(ClientMessage::Restart) => {
                        forward_event(ctx, GameEvent::Restart { player_id })
                    }
                    Ok(ClientMessage::UpdateScore(score)) => {
                        forward_event(ctx, GameEvent::ReportScore { player_id, score })
                    }
                    Err(parse_err) => {
                        ctx.invalid_json += 1;
                        if should_log(&mut ctx.last_invalid_input_log) {
                            warn!(
                                player_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if ctx.invalid_json > MAX_INVALID_JSON {
                            ctx.close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(player_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(player_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_frame(text: Utf8Bytes, socket: &mut WebSocket, ctx: &mut ConnCtx) -> LoopControl {
    let bytes_len = text.len();
    match socket.send(Message::Text(text)).await.map_err(NetError::Ws) {
        Ok(()) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            warn!(error = ?err, "failed to send frame");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &ConnCtx) -> Result<(), NetError> {
    ctx.input_tx
        .send(GameEvent::Leave {
            player_id: ctx.player_id,
        })
        .await
        .map_err(|_| NetError::InputClosed)?;

    debug!(
        player_id = ctx.player_id,
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_json = ctx.invalid_json,
        lag_recovery_count = ctx.lag_recovery_count,
        "connection stats"
    );
    info!(player_id = ctx.player_id, "client disconnected");
    Ok(())
}
