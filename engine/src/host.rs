//! Process-wide registry: game-id → instance, player-id → session.
//!
//! `Host` creates instances, routes joiners to them, and garbage-collects
//! completed games. It never reaches into a `GameInstance`'s internals
//! beyond the public contract in [`crate::instance`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::callbacks::{GameCompletedCallback, GameInit, GameTick};
use crate::errors::EngineError;
use crate::instance::GameInstance;
use crate::player::Player;

/// A process-wide record of a player that has authenticated but may or may
/// not currently be attached to a game. Caching only; no datastore fetch
/// happens here (`original_source/game/handlers.go`'s `connect` endpoint
/// behaves identically — it records the session and nothing else).
#[derive(Debug, Clone)]
pub struct Session {
    pub player_id: String,
}

/// The `Waiting`/`Running` configuration a `Host` applies to every game it
/// creates: the caller-supplied `init`/`tick` pair and the tick cadence.
pub struct Host<D> {
    games: RwLock<HashMap<Uuid, Arc<GameInstance<D>>>>,
    players: RwLock<HashMap<String, Session>>,
    init: GameInit<D>,
    tick: GameTick<D>,
    tick_interval: Duration,
}

impl<D> Host<D>
where
    D: Send + Sync + 'static,
{
    pub fn new(init: GameInit<D>, tick: GameTick<D>, tick_interval: Duration) -> Arc<Self> {
        Arc::new(Host {
            games: RwLock::new(HashMap::new()),
            players: RwLock::new(HashMap::new()),
            init,
            tick,
            tick_interval,
        })
    }

    /// Idempotently caches a session for `player_id`. Returns without error
    /// even if a session already exists.
    pub async fn connect(&self, player_id: &str) {
        self.players
            .write()
            .await
            .entry(player_id.to_string())
            .or_insert_with(|| Session { player_id: player_id.to_string() });
    }

    /// Current number of live (not-yet-completed) games. Diagnostic only.
    pub async fn active_game_count(&self) -> usize {
        self.games.read().await.len()
    }

    /// Allocates a new instance, registers it, and spawns the task that
    /// drives it to completion. Returns once the instance is visible in the
    /// registry, so the caller can hand its id out to clients immediately
    /// afterward, before quorum is reached.
    pub async fn create_game(
        self: &Arc<Self>,
        capacity: usize,
        wait_timeout: Duration,
        user_data: D,
        on_complete: GameCompletedCallback<D>,
    ) -> Arc<GameInstance<D>>
    where
        D: 'static,
    {
        let instance = GameInstance::new(capacity, user_data);
        let id = instance.id();
        self.games.write().await.insert(id, instance.clone());

        let host = self.clone();
        let driven = instance.clone();
        let init = self.init.clone();
        let tick = self.tick.clone();
        let tick_interval = self.tick_interval;
        tokio::spawn(async move {
            driven
                .clone()
                .run(init, tick, tick_interval, wait_timeout, on_complete)
                .await;
            host.games.write().await.remove(&id);
        });

        instance
    }

    /// Looks up `game_id`, performs an advisory capacity check under the
    /// instance's shared lock, then attaches `player`. The capacity check
    /// is advisory only — `add_player`'s own check under its exclusive lock
    /// is the authoritative gate (there's an inherent TOCTOU window here
    /// against other concurrent joiners).
    pub async fn join_game(&self, game_id: Uuid, player: Arc<dyn Player>) -> Result<(), EngineError> {
        let instance = {
            let games = self.games.read().await;
            games.get(&game_id).cloned().ok_or(EngineError::GameNotFound)?
        };
        if instance.player_count().await >= instance.capacity() {
            return Err(EngineError::GameFull);
        }
        instance.add_player(player).await
    }
}
