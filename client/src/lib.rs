//! # Game Client Library
//!
//! Thin client for the multiplayer board game. The client never mutates
//! game state on its own: it submits actions through the
//! [`network::ClientController`] and applies whatever the server fans back
//! out onto its local [`shared::ClientState`] replica. Rendering is a
//! callback fired after every replica change, so any frontend can sit on
//! top of the network layer.

pub mod network;
