//! # Game Server Library
//!
//! Authoritative server for the multiplayer board game. Clients never
//! mutate game state directly; they submit actions, the server executes
//! them against the authoritative model and fans the executed actions out
//! to every subscribed listener, which apply them to their local replicas.
//!
//! ## Dispatch Model
//!
//! Every client identity is routed to exactly one controller at a time:
//!
//! - **Matchmaking** while browsing and requesting lobbies
//! - **Lobby** while waiting for a match to fill up
//! - **Game** once the match has started
//!
//! Each controller wraps a [`dispatcher::Dispatcher`], which holds its
//! model and listener list behind a single lock. That lock gives every
//! controller a total order of actions; listeners registered to the same
//! controller all observe that same order.
//!
//! ## Module Organization
//!
//! - [`listener`]: local and remote listener variants plus remote liveness
//! - [`dispatcher`]: the generic single-writer dispatch core
//! - [`lobby_controller`], [`game_controller`], [`matchmaking_controller`]:
//!   per-phase controllers built on the dispatcher
//! - [`server_dispatcher`]: identity routing and lobby-to-game migration
//! - [`network`]: TCP accept loop, per-connection tasks, heartbeats

pub mod dispatcher;
pub mod game_controller;
pub mod listener;
pub mod lobby_controller;
pub mod matchmaking_controller;
pub mod network;
pub mod server_dispatcher;
