//! The game-instance lifecycle engine: quorum-wait, per-tick message
//! fan-in/fan-out, player registry management, and deterministic teardown.
//!
//! This crate is transport- and game-rule-agnostic. Embedding it means
//! providing a [`player::Player`] implementation for your transport and a
//! [`callbacks::GameInit`]/[`callbacks::GameTick`] pair for your game rules;
//! [`host::Host`] and [`instance::GameInstance`] handle the rest.

pub mod callbacks;
pub mod errors;
pub mod host;
pub mod instance;
pub mod player;

pub use callbacks::{GameCompletedCallback, GameHandle, GameInit, GameTick, InboundFrame, TickOutcome};
pub use errors::{EngineError, PlayerError};
pub use host::{Host, Session};
pub use instance::GameInstance;
pub use player::Player;
