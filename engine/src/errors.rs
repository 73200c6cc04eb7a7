//! The error taxonomy for the engine.
//!
//! Covers join-time failures (`GameNotFound`, `GameFull`), driver failures
//! (`TimedOutWaitingForPlayers`, errors bubbled up from `init`/`tick`), and
//! per-player I/O failures (`ContextCancelled`, `ConnectionClosed`,
//! `BadMessage`). Reader-task errors and outbound-delivery errors share the
//! same `PlayerError` so a single match arm in the driver can turn either
//! into the terminal `EngineError` that completes the game.

use thiserror::Error;

/// Errors a [`crate::player::Player`] implementation can return from `read`
/// or `write`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlayerError {
    /// The player's (or the instance's) cancellation token fired.
    #[error("context cancelled")]
    ContextCancelled,
    /// The transport reported a clean EOF / close.
    #[error("connection closed")]
    ConnectionClosed,
    /// The frame failed to decode, or a write to the transport failed.
    #[error("bad message: {0}")]
    BadMessage(String),
}

/// Errors surfaced by the engine's game-instance driver and registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// `join_game` targeted an id with no registered instance.
    #[error("game not found")]
    GameNotFound,
    /// `join_game` targeted an instance already at capacity.
    #[error("game is full")]
    GameFull,
    /// Reserved: the engine currently treats a duplicate `add_player` as a
    /// reconnection and never raises this variant.
    #[error("player already exists in game")]
    GamePlayerAlreadyExists,
    /// The wait-for-players deadline elapsed before quorum was reached.
    #[error("timed out waiting for players")]
    TimedOutWaitingForPlayers,
    /// A player's own cancellation token or the instance's fired.
    #[error("context cancelled")]
    ContextCancelled,
    /// A player's transport reported a clean close.
    #[error("connection closed")]
    ConnectionClosed,
    /// A frame failed to decode, or a write to a player failed.
    #[error("bad message: {0}")]
    BadMessage(String),
    /// Outbound delivery named a player id absent from the registry.
    #[error("no player in game with id: {0}")]
    NoSuchPlayer(String),
    /// The caller-supplied `init` callback returned an error.
    #[error("error in game init: {0}")]
    Init(String),
    /// The caller-supplied `tick` callback returned an error.
    #[error("error in game tick: {0}")]
    Tick(String),
    /// The auth provider rejected the request.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl From<PlayerError> for EngineError {
    fn from(err: PlayerError) -> Self {
        match err {
            PlayerError::ContextCancelled => EngineError::ContextCancelled,
            PlayerError::ConnectionClosed => EngineError::ConnectionClosed,
            PlayerError::BadMessage(reason) => EngineError::BadMessage(reason),
        }
    }
}
