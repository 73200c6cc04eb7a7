//! The module for the tic-tac-toe logic: the board/winner-check model in
//! [`traits_implementation`], and its `GameInit`/`GameTick` wiring in
//! [`game`].

pub mod game;
pub mod traits_implementation;
