//! The datastore interface: user-profile lookup used only by the `connect`
//! path for caching, never on the hot path.
//!
//! Grounded on `original_source/datastore/datastore.go`, which likewise
//! declares the interface with no production backend in this slice of the
//! source. `NoopDatastore` is the same kind of stub `matchmaking/handlers.go`
//! leans on: `connect` records the session and fetches nothing (see
//! DESIGN.md's Open Question 3).

use async_trait::async_trait;
use engine::EngineError;

#[derive(Debug, Clone)]
pub struct User {
    pub player_id: String,
}

#[derive(Debug, Clone)]
pub struct MatchmakingData {
    pub player_id: String,
}

#[async_trait]
pub trait Datastore: Send + Sync {
    async fn find_user(&self, player_id: &str) -> Result<User, EngineError>;
    async fn find_matchmaking_data(&self, player_id: &str) -> Result<MatchmakingData, EngineError>;
}

/// Fetches nothing; every lookup fails. Wired in but never called from the
/// `connect` handler, matching the original's documented placeholder
/// behaviour (see DESIGN.md's Open Question 3).
pub struct NoopDatastore;

#[async_trait]
impl Datastore for NoopDatastore {
    async fn find_user(&self, player_id: &str) -> Result<User, EngineError> {
        Err(EngineError::Unauthorized(format!("no datastore backend for {player_id}")))
    }

    async fn find_matchmaking_data(&self, player_id: &str) -> Result<MatchmakingData, EngineError> {
        Err(EngineError::Unauthorized(format!("no datastore backend for {player_id}")))
    }
}
