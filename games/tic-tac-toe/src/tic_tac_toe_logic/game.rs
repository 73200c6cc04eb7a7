//! Wires [`ViewState`]'s board logic into the engine's `GameInit`/`GameTick`
//! contract: two joined players are assigned cross/circle, moves arrive as
//! `StonePlacement` frames in the tick batch, and the instance completes the
//! moment the board reaches a terminal [`GameState`].
//!
//! Grounded on `backend.rs`'s superseded `TicTacToeLogic` (which called
//! `check_legality`/`apply_delta` from a client-polled `BackEndArchitecture`
//! impl) — the board logic is the same, re-hosted under a server-authoritative
//! tick loop instead of a frontend-driven poll, since this engine owns the
//! tick rather than being ticked by a GUI frame.

use std::collections::HashMap;
use std::sync::Arc;

use engine::callbacks::BoxFuture;
use engine::{EngineError, GameInit, GameTick, InboundFrame, TickOutcome};
use protocol::Message;

use super::traits_implementation::{GameState, StonePlacement, ViewState};

/// Codes this game defines on top of the engine-reserved range (`>= 100`).
pub const MOVE: u16 = 100;
pub const BOARD_STATE: u16 = 101;

/// Per-instance state threaded through `init`/`tick`: the board plus which
/// joined player id plays which side. Cross moves first.
pub struct TicTacToeState {
    view: ViewState,
    cross: String,
    circle: String,
}

impl TicTacToeState {
    /// The value `Host::create_game` needs before quorum is known; `init`
    /// overwrites every field once the two player ids are assigned.
    pub fn placeholder() -> Self {
        TicTacToeState { view: ViewState::new(true), cross: String::new(), circle: String::new() }
    }

    fn player_index(&self, player_id: &str) -> Option<u16> {
        if player_id == self.cross {
            Some(0)
        } else if player_id == self.circle {
            Some(1)
        } else {
            None
        }
    }

    fn broadcast(&self) -> HashMap<String, Vec<Message>> {
        let msg = Message::new(BOARD_STATE, serde_json::to_value(&self.view).expect("ViewState serializes"));
        HashMap::from([(self.cross.clone(), vec![msg.clone()]), (self.circle.clone(), vec![msg])])
    }
}

/// Assigns cross/circle deterministically (lexicographically smallest id
/// plays cross) and delivers the initial board to both players.
pub fn init() -> GameInit<TicTacToeState> {
    Arc::new(move |handle, quorum| {
        Box::pin(async move {
            if quorum.len() != 2 {
                return Err(EngineError::Init(format!(
                    "tic-tac-toe requires exactly 2 players, got {}",
                    quorum.len()
                )));
            }
            let mut ids = quorum;
            ids.sort();
            let cross = ids.remove(0);
            let circle = ids.remove(0);
            let view = ViewState::new(true);

            let mut data = handle.user_data().await;
            *data = TicTacToeState { view, cross, circle };
            Ok(data.broadcast())
        }) as BoxFuture<_>
    })
}

/// Applies every legal `MOVE` frame in arrival order, broadcasts the board
/// if it changed, and completes once the game reaches a terminal state.
pub fn tick() -> GameTick<TicTacToeState> {
    Arc::new(move |handle, batch| {
        Box::pin(async move {
            let mut data = handle.user_data().await;
            let mut changed = false;

            for frame in batch {
                let InboundFrame { player_id, message } = frame;
                if message.code != MOVE {
                    continue;
                }
                let Some(player_index) = data.player_index(&player_id) else { continue };
                let placement: StonePlacement = match serde_json::from_value(message.data) {
                    Ok(p) => p,
                    Err(_) => continue,
                };
                if !data.view.check_legality(&placement, player_index) {
                    continue;
                }
                data.view.apply_delta(&super::traits_implementation::ViewStateDelta {
                    is_circle: player_index == 1,
                    column: placement.column,
                    row: placement.row,
                });
                changed = true;
            }

            let outbound = if changed { data.broadcast() } else { HashMap::new() };
            let complete = data.view.game_state != GameState::Pending;
            if complete {
                Ok(TickOutcome::finished(outbound))
            } else {
                Ok(TickOutcome::continuing(outbound))
            }
        }) as BoxFuture<_>
    })
}
