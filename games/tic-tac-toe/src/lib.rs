//! A two-player tic-tac-toe implementation of the engine's `GameInit`/
//! `GameTick` contract. Exercises the lifecycle engine the way
//! `relay-server` embeds any game: supply a capacity, an `init`, a `tick`,
//! and a completion callback to `engine::Host`.

pub mod tic_tac_toe_logic;

pub use tic_tac_toe_logic::game::{init, tick, TicTacToeState, BOARD_STATE, MOVE};
