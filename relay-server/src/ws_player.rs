//! The concrete [`engine::Player`] backing a live WebSocket connection.
//!
//! Grounded on the split-stream-behind-`Arc<Mutex<..>>` pattern used in the
//! original `relay-server/src/main.rs`'s `websocket()` (sink needs exclusive
//! access for its single writer; here the receive side is wrapped the same
//! way since the trait takes `&self`, even though in practice only one
//! reader task ever calls `read`). Close-code selection on error is
//! generalized from `hand_shake.rs::send_closing_message`'s "send a last
//! message, then `Message::Close`" shape to a code-per-failure-kind table.

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message as WsMessage, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use protocol::{CLOSE_ABNORMAL, CLOSE_APPLICATION_ERROR, CLOSE_NORMAL, Message, REASON_GAME_COMPLETION};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use engine::{EngineError, PlayerError};

pub struct WebSocketPlayer {
    id: String,
    ctx: CancellationToken,
    sender: Mutex<SplitSink<WebSocket, WsMessage>>,
    receiver: Mutex<SplitStream<WebSocket>>,
}

impl WebSocketPlayer {
    pub fn new(
        id: String,
        ctx: CancellationToken,
        sender: SplitSink<WebSocket, WsMessage>,
        receiver: SplitStream<WebSocket>,
    ) -> Self {
        WebSocketPlayer { id, ctx, sender: Mutex::new(sender), receiver: Mutex::new(receiver) }
    }

    async fn send_close(&self, code: u16, reason: &str) {
        let frame = CloseFrame { code, reason: reason.to_string().into() };
        let mut sender = self.sender.lock().await;
        let _ = sender.send(WsMessage::Close(Some(frame))).await;
    }
}

/// Picks the WebSocket close code for a terminal [`EngineError`]: a protocol
/// or authorization problem is the caller's fault (application error),
/// everything else is an abnormal server-side termination.
fn close_code_for(err: &EngineError) -> u16 {
    match err {
        EngineError::BadMessage(_) => CLOSE_APPLICATION_ERROR,
        EngineError::GameNotFound | EngineError::GameFull | EngineError::Unauthorized(_) => {
            CLOSE_APPLICATION_ERROR
        }
        _ => CLOSE_ABNORMAL,
    }
}

#[async_trait]
impl engine::Player for WebSocketPlayer {
    fn id(&self) -> &str {
        &self.id
    }

    fn ctx(&self) -> &CancellationToken {
        &self.ctx
    }

    async fn read(&self) -> Result<Message, PlayerError> {
        let mut receiver = self.receiver.lock().await;
        loop {
            let next = receiver.next().await;
            match next {
                None => return Err(PlayerError::ConnectionClosed),
                Some(Err(_)) => return Err(PlayerError::ConnectionClosed),
                Some(Ok(WsMessage::Text(text))) => {
                    return serde_json::from_str::<Message>(&text)
                        .map_err(|e| PlayerError::BadMessage(e.to_string()));
                }
                Some(Ok(WsMessage::Close(_))) => return Err(PlayerError::ConnectionClosed),
                // Ping/Pong/Binary carry no application frame; keep reading.
                Some(Ok(_)) => continue,
            }
        }
    }

    async fn write(&self, msg: Message) -> Result<(), PlayerError> {
        let encoded =
            serde_json::to_string(&msg).map_err(|e| PlayerError::BadMessage(e.to_string()))?;
        let sent = {
            let mut sender = self.sender.lock().await;
            tokio::select! {
                biased;
                _ = self.ctx.cancelled() => return Err(PlayerError::ContextCancelled),
                sent = sender.send(WsMessage::Text(encoded.into())) => sent,
            }
        };
        if let Err(e) = sent {
            // Contract: a write failure MUST close the connection before
            // returning, so the driver never retries a half-dead socket.
            let reason = e.to_string();
            self.ctx.cancel();
            self.send_close(CLOSE_ABNORMAL, &reason).await;
            return Err(PlayerError::BadMessage(reason));
        }
        Ok(())
    }

    async fn close(&self) {
        self.ctx.cancel();
        self.send_close(CLOSE_NORMAL, REASON_GAME_COMPLETION).await;
    }

    async fn close_with_error(&self, err: &EngineError) {
        self.ctx.cancel();
        self.send_close(close_code_for(err), &err.to_string()).await;
    }
}
