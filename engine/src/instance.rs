//! The game-instance driver: the state machine that takes a newly created
//! instance from `Waiting` (for quorum) through `Running` (ticking) to
//! `Completed` (teardown), exactly once, regardless of which path it exits
//! by.
//!
//! The three states are not reified as an enum; they are phases of
//! [`GameInstance::run`]. Nothing outside this module observes a partially
//! torn-down instance: [`crate::host::Host`] only sees the instance
//! disappear from its registry once `run` returns.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use protocol::{Message, PLAYER_JOINED, PLAYER_LEFT};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::Span;
use uuid::Uuid;

use crate::callbacks::{GameCompletedCallback, GameHandle, GameInit, GameTick, InboundFrame};
use crate::errors::EngineError;
use crate::player::Player;

/// The fan-in channel's capacity. A true rendezvous (zero-buffer) channel
/// has no direct tokio equivalent; capacity 1 is the nearest native
/// primitive and is what every reader task actually blocks on, so fan-in
/// stays synchronous with the driver rather than letting senders race
/// ahead of it.
const INBOUND_CHANNEL_CAPACITY: usize = 1;

/// One running (or about-to-run) game. Owns the player registry, the
/// fan-in channel all reader tasks feed, and an opaque slot of
/// caller-defined state threaded through `init`/`tick`.
pub struct GameInstance<D> {
    id: Uuid,
    capacity: usize,
    players: RwLock<HashMap<String, Arc<dyn Player>>>,
    inbound_tx: mpsc::Sender<InboundFrame>,
    inbound_rx: Mutex<Option<mpsc::Receiver<InboundFrame>>>,
    token: CancellationToken,
    user_data: Mutex<D>,
    span: Span,
}

impl<D> GameInstance<D>
where
    D: Send + 'static,
{
    /// Builds a new instance with its own cancellation scope and a fresh
    /// id. `capacity` is the quorum target `wait_for_players` waits for and
    /// the ceiling `add_player` enforces.
    pub fn new(capacity: usize, user_data: D) -> Arc<Self> {
        let id = Uuid::new_v4();
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        Arc::new(GameInstance {
            id,
            capacity,
            players: RwLock::new(HashMap::new()),
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            token: CancellationToken::new(),
            user_data: Mutex::new(user_data),
            span: tracing::info_span!("game_instance", game_id = %id),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// This instance's cancellation scope. Player tokens are independent
    /// roots, not children of this one: each reader task `select!`s over
    /// both its player's token and this one, so cancelling this token still
    /// unblocks every outstanding read. A pending write races only against
    /// its own player's token (see `ws_player.rs`'s `write`), so cancelling
    /// this instance token alone does not unblock one.
    pub fn ctx(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancels the instance. The driver observes this on its next
    /// `select!` iteration and tears down as if `tick` had returned an
    /// error.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub async fn user_data(&self) -> tokio::sync::MutexGuard<'_, D> {
        self.user_data.lock().await
    }

    /// Current number of registered players. Racy the instant it's
    /// returned — for diagnostics and advisory capacity checks only.
    pub async fn player_count(&self) -> usize {
        self.players.read().await.len()
    }

    /// Registers `player`, spawns its reader task, and emits the
    /// `PLAYER_JOINED` signal onto the fan-in channel. The reader task is
    /// live before the signal is sent, so `wait_for_players` can never
    /// observe a join signal for a player nothing is reading from yet.
    ///
    /// Re-adding an id already present replaces the registry entry rather
    /// than failing; `GamePlayerAlreadyExists` is reserved for a caller that
    /// wants to distinguish that case; the driver itself treats it as a
    /// reconnection.
    pub async fn add_player(self: &Arc<Self>, player: Arc<dyn Player>) -> Result<(), EngineError> {
        let id = player.id().to_string();
        {
            let mut players = self.players.write().await;
            if players.len() >= self.capacity && !players.contains_key(&id) {
                return Err(EngineError::GameFull);
            }
            players.insert(id.clone(), player.clone());
        }
        self.spawn_reader(player);
        let frame = InboundFrame { player_id: id.clone(), message: Message::player_joined(&id) };
        let _ = self.inbound_tx.send(frame).await;
        Ok(())
    }

    /// Removes `player_id` from the registry, closes its connection, and
    /// emits `PLAYER_LEFT`. A no-op if the id is already absent (removal
    /// from a bad-message close races with a client-initiated disconnect).
    pub async fn remove_player(self: &Arc<Self>, player_id: &str) {
        let removed = self.players.write().await.remove(player_id);
        if let Some(player) = removed {
            player.close().await;
            let frame = InboundFrame {
                player_id: player_id.to_string(),
                message: Message::player_left(player_id),
            };
            let _ = self.inbound_tx.send(frame).await;
        }
    }

    /// On a read error the reader logs and exits but does NOT call
    /// `remove_player` itself — the player stays registered (permitting
    /// reconnection by id) until the Host or the tick loop's own disconnect
    /// handling removes it, or the game ends and teardown closes everything.
    /// This is a deliberate choice, not an oversight: see DESIGN.md.
    fn spawn_reader(self: &Arc<Self>, player: Arc<dyn Player>) {
        let instance = self.clone();
        tokio::spawn(async move {
            loop {
                let read = tokio::select! {
                    biased;
                    _ = player.ctx().cancelled() => break,
                    _ = instance.token.cancelled() => break,
                    read = player.read() => read,
                };
                match read {
                    Ok(msg) => {
                        let frame = InboundFrame { player_id: player.id().to_string(), message: msg };
                        let sent = tokio::select! {
                            biased;
                            _ = instance.token.cancelled() => break,
                            sent = instance.inbound_tx.send(frame) => sent,
                        };
                        if sent.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        instance.span.in_scope(|| {
                            tracing::info!(player = player.id(), error = %err, "reader task exiting")
                        });
                        break;
                    }
                }
            }
        });
    }

    /// Drives the instance through its full lifecycle: waits for quorum,
    /// runs `init`, ticks until `tick` reports completion or a hard error,
    /// tears down, then invokes `on_complete` exactly once. Never panics on
    /// a caller error; every failure path flows through `on_complete`'s
    /// `Option<EngineError>`.
    pub async fn run(
        self: Arc<Self>,
        init: GameInit<D>,
        tick: GameTick<D>,
        tick_interval: Duration,
        wait_timeout: Duration,
        on_complete: GameCompletedCallback<D>,
    ) {
        let outcome = self.drive(init, tick, tick_interval, wait_timeout).await;
        let err = outcome.err();
        self.teardown(err.clone()).await;
        (on_complete.as_ref())(err, GameHandle::new(self.clone()));
    }

    async fn drive(
        self: &Arc<Self>,
        init: GameInit<D>,
        tick: GameTick<D>,
        tick_interval: Duration,
        wait_timeout: Duration,
    ) -> Result<(), EngineError> {
        let mut rx = {
            let mut guard = self.inbound_rx.lock().await;
            guard.take().expect("GameInstance::run invoked more than once")
        };

        let quorum = self.wait_for_players(&mut rx, wait_timeout).await?;
        let handle = GameHandle::new(self.clone());

        self.span.in_scope(|| {
            tracing::info!(quorum = quorum.len(), "quorum reached, running init")
        });
        let init_outbound = (init.as_ref())(handle.clone(), quorum).await?;
        self.deliver(init_outbound).await?;

        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; consume it so the caller's
        // cadence starts counting from when the instance actually began
        // ticking, not from construction.
        ticker.tick().await;

        let mut batch: Vec<InboundFrame> = Vec::new();
        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => return Err(EngineError::ContextCancelled),
                _ = ticker.tick() => {
                    let outcome = (tick.as_ref())(handle.clone(), std::mem::take(&mut batch)).await?;
                    self.deliver(outcome.outbound).await?;
                    if outcome.complete {
                        return Ok(());
                    }
                }
                maybe_frame = rx.recv() => {
                    match maybe_frame {
                        Some(frame) => batch.push(frame),
                        None => return Err(EngineError::ConnectionClosed),
                    }
                }
            }
        }
    }

    /// Tracks distinct joined-but-not-since-left player ids until `capacity`
    /// of them are present, or `wait_timeout` elapses. Ordinary gameplay
    /// frames cannot arrive here: nothing emits anything but join/leave
    /// signals onto the channel before `init` has run.
    async fn wait_for_players(
        self: &Arc<Self>,
        rx: &mut mpsc::Receiver<InboundFrame>,
        wait_timeout: Duration,
    ) -> Result<Vec<String>, EngineError> {
        let mut present: HashSet<String> = HashSet::new();
        if self.capacity == 0 {
            return Ok(Vec::new());
        }
        let deadline = tokio::time::sleep(wait_timeout);
        tokio::pin!(deadline);

        loop {
            if present.len() >= self.capacity {
                return Ok(present.into_iter().collect());
            }
            tokio::select! {
                biased;
                _ = self.token.cancelled() => return Err(EngineError::ContextCancelled),
                _ = &mut deadline => return Err(EngineError::TimedOutWaitingForPlayers),
                maybe_frame = rx.recv() => {
                    match maybe_frame {
                        Some(frame) if frame.message.code == PLAYER_JOINED => {
                            present.insert(frame.player_id);
                        }
                        Some(frame) if frame.message.code == PLAYER_LEFT => {
                            present.remove(&frame.player_id);
                        }
                        Some(_) => {}
                        None => return Err(EngineError::ConnectionClosed),
                    }
                }
            }
        }
    }

    /// Delivers one outbound batch. Aborts on the first failure — a single
    /// unreachable or unknown player fails the whole tick rather than
    /// silently dropping part of the batch.
    async fn deliver(self: &Arc<Self>, outbound: HashMap<String, Vec<Message>>) -> Result<(), EngineError> {
        if outbound.is_empty() {
            return Ok(());
        }
        let players = self.players.read().await;
        for (player_id, messages) in outbound {
            let player = players
                .get(&player_id)
                .ok_or_else(|| EngineError::NoSuchPlayer(player_id.clone()))?;
            for msg in messages {
                player.write(msg).await?;
            }
        }
        Ok(())
    }

    async fn teardown(self: &Arc<Self>, err: Option<EngineError>) {
        self.token.cancel();
        let mut players = self.players.write().await;
        for (_, player) in players.drain() {
            match &err {
                Some(e) => player.close_with_error(e).await,
                None => player.close().await,
            }
        }
        self.span.in_scope(|| match &err {
            Some(e) => tracing::warn!(error = %e, "game instance completed with error"),
            None => tracing::info!("game instance completed"),
        });
    }
}
