use crate::chat::PlayerChat;
use crate::lobby::{Lobby, Pawn};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_HAND_SIZE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameId(pub u64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// A playing card. Card data (artwork, scoring) lives outside this core;
/// the dispatch layer only needs a stable identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPosition {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedCard {
    pub card: Card,
    pub position: FieldPosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    InProgress,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub nickname: String,
    pub identity: String,
    pub pawn: Pawn,
    pub hand: Vec<Card>,
    pub placed: Vec<PlacedCard>,
    pub score: u32,
    pub chat: PlayerChat,
    pub connected: bool,
}

impl Player {
    pub fn has_in_hand(&self, card: Card) -> bool {
        self.hand.contains(&card)
    }

    pub fn occupies(&self, position: FieldPosition) -> bool {
        self.placed.iter().any(|p| p.position == position)
    }
}

/// Authoritative game model. One instance per running game, owned by the
/// game controller on the server; clients hold a replica mutated only
/// through `Action::reflect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    id: GameId,
    players: Vec<Player>,
    deck: Vec<Card>,
    state: GameState,
    turn: usize,
    self_nickname: Option<String>,
}

impl Game {
    /// Builds a game from a started lobby. The deck is pre-shuffled by the
    /// caller so every replica draws the same sequence.
    pub fn from_lobby(id: GameId, lobby: &Lobby, deck: Vec<Card>) -> Self {
        let roster: Vec<String> = lobby.players().iter().map(|p| p.nickname.clone()).collect();

        let mut players = Vec::with_capacity(lobby.player_count());
        let mut deck = deck;

        for lobby_player in lobby.players() {
            let mut hand = Vec::with_capacity(MAX_HAND_SIZE);
            for _ in 0..MAX_HAND_SIZE {
                if let Some(card) = deck.pop() {
                    hand.push(card);
                }
            }

            players.push(Player {
                nickname: lobby_player.nickname.clone(),
                identity: lobby_player.identity.clone(),
                // A started lobby guarantees every pawn is set.
                pawn: lobby_player.pawn.unwrap_or(Pawn::Red),
                hand,
                placed: Vec::new(),
                score: 0,
                chat: PlayerChat::new(&lobby_player.nickname, roster.clone()),
                connected: true,
            });
        }

        Self {
            id,
            players,
            deck,
            state: GameState::InProgress,
            turn: 0,
            self_nickname: None,
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn end(&mut self) {
        self.state = GameState::Ended;
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, nickname: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.nickname == nickname)
    }

    pub fn player_mut(&mut self, nickname: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.nickname == nickname)
    }

    pub fn player_by_identity(&self, identity: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.identity == identity)
    }

    pub fn current_player(&self) -> &Player {
        &self.players[self.turn % self.players.len()]
    }

    pub fn advance_turn(&mut self) {
        self.turn = (self.turn + 1) % self.players.len();
    }

    pub fn deck_len(&self) -> usize {
        self.deck.len()
    }

    /// Pops the next card off the deck. Deterministic so that server and
    /// client replicas draw identically.
    pub fn draw_card(&mut self) -> Option<Card> {
        self.deck.pop()
    }

    pub fn mark_disconnected(&mut self, identity: &str) -> Option<&Player> {
        let player = self.players.iter_mut().find(|p| p.identity == identity)?;
        player.connected = false;
        Some(player)
    }

    /// Reattaches a player after a reconnect. The player keeps their seat
    /// and hand; the identity is rebound to the new connection.
    pub fn mark_reconnected(&mut self, nickname: &str, identity: &str) -> Option<&Player> {
        let player = self.players.iter_mut().find(|p| p.nickname == nickname)?;
        player.connected = true;
        player.identity = identity.to_string();
        Some(player)
    }

    pub fn all_connected(&self) -> bool {
        self.players.iter().all(|p| p.connected)
    }

    /// The client's "which player am I" marker. Client-local; replacing the
    /// model wholesale does not carry it over, `ClientState` re-applies it.
    pub fn set_self_nickname(&mut self, nickname: Option<String>) {
        self.self_nickname = nickname;
    }

    pub fn self_nickname(&self) -> Option<&str> {
        self.self_nickname.as_deref()
    }

    pub fn self_player(&self) -> Option<&Player> {
        let nickname = self.self_nickname.as_deref()?;
        self.player(nickname)
    }

    pub fn self_player_mut(&mut self) -> Option<&mut Player> {
        let nickname = self.self_nickname.clone()?;
        self.player_mut(&nickname)
    }
}
