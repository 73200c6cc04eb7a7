//! Wire types shared between the relay server and its clients.
//!
//! The frame format is a UTF-8 JSON object per WebSocket text/binary message:
//! `{"code": <u16>, "data": <any JSON>}`. Codes below 100 are reserved for the
//! engine; codes >= 100 are defined by the embedding game. Unknown top-level
//! fields on the wire are rejected (`serde(deny_unknown_fields)`).

use serde::{Deserialize, Serialize};

/// The signal emitted onto a game's inbound channel when a player has been
/// added to the registry. `data` carries the player id as a JSON string.
pub const PLAYER_JOINED: u16 = 10;

/// The signal emitted onto a game's inbound channel when a player has been
/// removed from the registry. `data` carries the player id as a JSON string.
pub const PLAYER_LEFT: u16 = 11;

/// Lowest code an embedding game is allowed to define for its own payloads.
pub const FIRST_USER_CODE: u16 = 100;

/// One frame on the wire: a numeric code plus an opaque JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Message {
    pub code: u16,
    pub data: serde_json::Value,
}

impl Message {
    pub fn new(code: u16, data: serde_json::Value) -> Self {
        Message { code, data }
    }

    /// Builds the internal `PLAYER_JOINED` signal for `player_id`.
    pub fn player_joined(player_id: &str) -> Self {
        Message::new(PLAYER_JOINED, serde_json::Value::String(player_id.to_string()))
    }

    /// Builds the internal `PLAYER_LEFT` signal for `player_id`.
    pub fn player_left(player_id: &str) -> Self {
        Message::new(PLAYER_LEFT, serde_json::Value::String(player_id.to_string()))
    }

    /// The player id carried by a `PLAYER_JOINED`/`PLAYER_LEFT` signal, if this
    /// message is one of those and the payload is shaped as expected.
    pub fn signal_player_id(&self) -> Option<&str> {
        if self.code != PLAYER_JOINED && self.code != PLAYER_LEFT {
            return None;
        }
        self.data.as_str()
    }
}

/// WebSocket close codes used by the relay server. Normal completion uses
/// 1000, abnormal termination (write failure, bad frame) uses 1011, and
/// application-specific protocol/parameter errors use 4000.
pub const CLOSE_NORMAL: u16 = 1000;
pub const CLOSE_ABNORMAL: u16 = 1011;
pub const CLOSE_APPLICATION_ERROR: u16 = 4000;

/// Reason string sent alongside [`CLOSE_NORMAL`] on ordinary game completion.
pub const REASON_GAME_COMPLETION: &str = "game completion";

fn default_wait_for_players_timeout() -> u64 {
    60
}

/// Body of `POST /game/create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGameRequest {
    #[serde(rename = "numPlayers")]
    pub num_players: u32,
    #[serde(rename = "waitForPlayersTimeout", default = "default_wait_for_players_timeout")]
    pub wait_for_players_timeout: u64,
}

/// Response body of `POST /game/create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGameResponse {
    #[serde(rename = "gameID")]
    pub game_id: String,
}

/// Query parameters accepted by `GET /game/join`.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinGameQuery {
    pub id: String,
}

/// Generic JSON error body returned by the HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorResponse { error: message.into() }
    }
}

/// Maximum accepted HTTP request body size for `/connect`, `/game/create`,
/// and `/game/join`: 512 KiB.
pub const MAX_REQUEST_BODY_BYTES: usize = 512 * 1024;
