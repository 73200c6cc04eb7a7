//! The typed contract exposed to the embedding application: `init`, `tick`,
//! and a completion callback, plus [`GameHandle`] — the narrow view of a
//! running [`crate::instance::GameInstance`] those callbacks are given.
//!
//! Per the design notes, callbacks get a handle that exposes only what they
//! need (the instance id, a typed user-data slot, its tracing span) rather
//! than the full mutable state the driver itself holds (the player
//! registry, the inbound channel) — that state stays internal to the
//! driver so user code cannot violate the invariants in the data model.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use protocol::Message;
use tokio::sync::MutexGuard;
use uuid::Uuid;

use crate::errors::EngineError;
use crate::instance::GameInstance;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// One frame accumulated between ticks, tagged with the id of the player
/// whose reader task produced it (or, for `PLAYER_JOINED`/`PLAYER_LEFT`,
/// the id the signal names). The wire format itself carries no sender
/// field — the driver attaches it because it already knows which player's
/// reader pushed the frame; games that need to know who moved would
/// otherwise have to smuggle the id into every payload themselves.
#[derive(Debug, Clone)]
pub struct InboundFrame {
    pub player_id: String,
    pub message: Message,
}

/// Outcome of one `tick` invocation: whether the game is now complete, and
/// the outbound batch to deliver before the next tick (or before teardown).
#[derive(Debug, Default)]
pub struct TickOutcome {
    pub complete: bool,
    pub outbound: HashMap<String, Vec<Message>>,
}

impl TickOutcome {
    pub fn continuing(outbound: HashMap<String, Vec<Message>>) -> Self {
        TickOutcome { complete: false, outbound }
    }

    pub fn finished(outbound: HashMap<String, Vec<Message>>) -> Self {
        TickOutcome { complete: true, outbound }
    }
}

/// A cheap, cloneable handle to a running game instance, handed to `init`,
/// `tick`, and the completion callback. Exposes the instance id, its typed
/// user-data slot, and its tracing span — nothing that would let user code
/// bypass the driver's player-registry or channel invariants.
pub struct GameHandle<D> {
    instance: Arc<GameInstance<D>>,
}

impl<D> GameHandle<D> {
    pub(crate) fn new(instance: Arc<GameInstance<D>>) -> Self {
        GameHandle { instance }
    }

    pub fn id(&self) -> Uuid {
        self.instance.id()
    }

    pub fn capacity(&self) -> usize {
        self.instance.capacity()
    }

    pub fn span(&self) -> &tracing::Span {
        self.instance.span()
    }

    /// Locks the opaque user-data slot for the duration of the guard.
    pub async fn user_data(&self) -> MutexGuard<'_, D> {
        self.instance.user_data().await
    }
}

impl<D> Clone for GameHandle<D> {
    fn clone(&self) -> Self {
        GameHandle { instance: self.instance.clone() }
    }
}

/// Called exactly once, when quorum is reached, with the set of player ids
/// that make up the quorum. Returns messages to deliver to players before
/// the first tick.
pub type GameInit<D> = Arc<
    dyn Fn(GameHandle<D>, Vec<String>) -> BoxFuture<Result<HashMap<String, Vec<Message>>, EngineError>>
        + Send
        + Sync,
>;

/// Called once per tick with the batch of frames accumulated since the
/// previous tick (or since `init`, for the first tick), each tagged with
/// its sender's player id.
pub type GameTick<D> = Arc<
    dyn Fn(GameHandle<D>, Vec<InboundFrame>) -> BoxFuture<Result<TickOutcome, EngineError>>
        + Send
        + Sync,
>;

/// Invoked exactly once per game, on every terminal transition, with the
/// terminal error (if any) and a handle for inspecting final state.
pub type GameCompletedCallback<D> = Arc<dyn Fn(Option<EngineError>, GameHandle<D>) + Send + Sync>;
