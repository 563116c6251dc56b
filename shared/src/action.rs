use crate::chat::ChatMessage;
use crate::client_state::{ClientState, PlayerPhase};
use crate::game::{Card, FieldPosition, Game, GameState, PlacedCard, MAX_HAND_SIZE};
use crate::lobby::{Lobby, LobbyId, Pawn};
use crate::matchmaking::{Matchmaking, MatchmakingRequest};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity attached to server-originated actions.
pub const SERVER_IDENTITY: &str = "server";

/// Contract violation while applying an action. Business-rule rejections are
/// never reported here; they are recorded on the action itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// The action was executed against a model kind it does not support.
    UnsupportedModel {
        action: &'static str,
        model: &'static str,
    },
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionError::UnsupportedModel { action, model } => {
                write!(f, "action {action} cannot execute against a {model} model")
            }
        }
    }
}

impl std::error::Error for ActionError {}

/// Payload of an action: one variant per player or server event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionKind {
    // Player-originated.
    ChatSend {
        message: ChatMessage,
    },
    CreateLobby {
        nickname: String,
        pawn: Pawn,
        /// Filled in by the server before notifying the creator.
        created_lobby: Option<Lobby>,
    },
    JoinLobby {
        nickname: String,
        lobby_id: LobbyId,
        pawn: Option<Pawn>,
    },
    StartGame {
        nickname: String,
    },
    PlaceCard {
        nickname: String,
        card: Card,
        position: FieldPosition,
    },
    PickCard {
        nickname: String,
    },
    RequestReconnect {
        nickname: String,
    },
    Debug,

    // Server-originated.
    Error {
        message: String,
    },
    LobbyStateSync {
        lobby: Lobby,
    },
    LobbyList {
        lobbies: Vec<Lobby>,
    },
    GameStarted {
        game: Game,
    },
    GameStateSync {
        game: Game,
    },
    ResumeGame {
        game: Game,
        all_clients_ready: bool,
    },
    HangGame,
}

impl ActionKind {
    fn name(&self) -> &'static str {
        match self {
            ActionKind::ChatSend { .. } => "ChatSend",
            ActionKind::CreateLobby { .. } => "CreateLobby",
            ActionKind::JoinLobby { .. } => "JoinLobby",
            ActionKind::StartGame { .. } => "StartGame",
            ActionKind::PlaceCard { .. } => "PlaceCard",
            ActionKind::PickCard { .. } => "PickCard",
            ActionKind::RequestReconnect { .. } => "RequestReconnect",
            ActionKind::Debug => "Debug",
            ActionKind::Error { .. } => "Error",
            ActionKind::LobbyStateSync { .. } => "LobbyStateSync",
            ActionKind::LobbyList { .. } => "LobbyList",
            ActionKind::GameStarted { .. } => "GameStarted",
            ActionKind::GameStateSync { .. } => "GameStateSync",
            ActionKind::ResumeGame { .. } => "ResumeGame",
            ActionKind::HangGame => "HangGame",
        }
    }
}

/// A serializable command describing one player or server event. Applied
/// authoritatively on the server via the `execute_on_*` entry points and
/// projected onto client replicas via `reflect`.
///
/// The identity is bound at construction and has no setter: a player action
/// can never be re-attributed after the fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    identity: String,
    pub executed_correctly: bool,
    pub error_message: Option<String>,
    pub kind: ActionKind,
}

impl Action {
    pub fn new(kind: ActionKind, identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
            executed_correctly: true,
            error_message: None,
            kind,
        }
    }

    /// Constructor for actions the server itself originates.
    pub fn server(kind: ActionKind) -> Self {
        Self::new(kind, SERVER_IDENTITY)
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn reject(&mut self, message: impl Into<String>) {
        self.executed_correctly = false;
        self.error_message = Some(message.into());
    }

    fn unsupported(&self, model: &'static str) -> ActionError {
        ActionError::UnsupportedModel {
            action: self.kind.name(),
            model,
        }
    }

    /// Authoritative application against a lobby model.
    pub fn execute_on_lobby(&mut self, lobby: &mut Lobby) -> Result<(), ActionError> {
        match &self.kind {
            ActionKind::StartGame { .. } => {
                let first_identity = lobby.first_player().map(|p| p.identity.clone());
                if first_identity.as_deref() != Some(self.identity.as_str()) {
                    self.reject("Only the first player can start the game");
                    return Ok(());
                }

                if let Err(err) = lobby.start_game() {
                    self.reject(err.to_string());
                }
                Ok(())
            }
            // State carried by the action itself; nothing to apply here.
            ActionKind::LobbyStateSync { .. } => Ok(()),
            ActionKind::HangGame => {
                debug!("connection lost for {} while in lobby", self.identity);
                Ok(())
            }
            ActionKind::Debug => {
                debug!("debug action executed against lobby {}", lobby.id());
                Ok(())
            }
            _ => Err(self.unsupported("lobby")),
        }
    }

    /// Authoritative application against a game model.
    pub fn execute_on_game(&mut self, game: &mut Game) -> Result<(), ActionError> {
        let kind = self.kind.clone();
        match &kind {
            ActionKind::ChatSend { message } => {
                for player in game
                    .players()
                    .iter()
                    .map(|p| p.nickname.clone())
                    .collect::<Vec<_>>()
                {
                    // The sender keeps a copy of their own messages too.
                    if message.is_for(&player) || message.sender_nickname == player {
                        if let Some(player) = game.player_mut(&player) {
                            player.chat.insert_message(message.clone());
                        }
                    }
                }
                Ok(())
            }
            ActionKind::PlaceCard {
                nickname,
                card,
                position,
            } => {
                if let Err(reason) = apply_place_card(game, nickname, *card, *position) {
                    self.reject(reason);
                }
                Ok(())
            }
            ActionKind::PickCard { nickname } => {
                if let Err(reason) = apply_pick_card(game, nickname) {
                    self.reject(reason);
                }
                Ok(())
            }
            ActionKind::HangGame => {
                apply_hang_game(game, &self.identity);
                Ok(())
            }
            // Sync payloads carry the state; the authoritative model is
            // already up to date.
            ActionKind::GameStarted { .. }
            | ActionKind::GameStateSync { .. }
            | ActionKind::ResumeGame { .. } => Ok(()),
            ActionKind::Debug => {
                debug!("debug action executed against game {}", game.id());
                Ok(())
            }
            _ => Err(self.unsupported("game")),
        }
    }

    /// Authoritative application against the matchmaking model.
    pub fn execute_on_matchmaking(&mut self, matchmaking: &mut Matchmaking) -> Result<(), ActionError> {
        match &self.kind {
            ActionKind::CreateLobby { nickname, pawn, .. } => {
                matchmaking.record_request(MatchmakingRequest::CreateLobby {
                    nickname: nickname.clone(),
                    pawn: *pawn,
                });
                Ok(())
            }
            ActionKind::JoinLobby {
                nickname,
                lobby_id,
                pawn,
            } => {
                matchmaking.record_request(MatchmakingRequest::JoinLobby {
                    nickname: nickname.clone(),
                    lobby_id: *lobby_id,
                    pawn: *pawn,
                });
                Ok(())
            }
            ActionKind::RequestReconnect { nickname } => {
                matchmaking.record_request(MatchmakingRequest::Reconnect {
                    nickname: nickname.clone(),
                });
                Ok(())
            }
            // The list travels on the action; the model was already updated
            // by the broadcaster.
            ActionKind::LobbyList { .. } => Ok(()),
            ActionKind::HangGame => {
                debug!("connection lost for {} while matchmaking", self.identity);
                Ok(())
            }
            ActionKind::Debug => {
                debug!("debug action executed against matchmaking");
                Ok(())
            }
            _ => Err(self.unsupported("matchmaking")),
        }
    }

    /// Projects the action onto a client replica. Safe to call on every
    /// listener: actions that only concern their originator check identity
    /// equality themselves.
    pub fn reflect(&self, state: &mut ClientState) {
        match &self.kind {
            ActionKind::ChatSend { message } => {
                let Some(game) = state.game_model_mut() else {
                    return;
                };
                let is_mine = game
                    .self_nickname()
                    .map(|n| message.is_for(n) || message.sender_nickname == n)
                    .unwrap_or(false);
                if is_mine {
                    if let Some(player) = game.self_player_mut() {
                        player.chat.insert_message(message.clone());
                    }
                    state.notify_update();
                }
            }
            ActionKind::CreateLobby {
                nickname,
                created_lobby,
                ..
            } => {
                // Only meaningful on the creator, once the server has filled
                // in the lobby it built.
                let Some(lobby) = created_lobby else { return };
                if state.identity() != self.identity {
                    return;
                }
                state.set_nickname(nickname);
                state.set_lobby_model(lobby);
                state.set_phase(PlayerPhase::AdminWaitingForPlayers);
                state.notify_update();
            }
            ActionKind::JoinLobby { nickname, .. } => {
                // Phase stays untouched until the server confirms the seat
                // with a roster sync; a failed join must not strand the
                // client outside lobby selection.
                if state.identity() == self.identity {
                    state.set_nickname(nickname);
                    state.notify_update();
                }
            }
            ActionKind::StartGame { .. } => {
                // A start rejection is shown only to the player who tried.
                if state.identity() == self.identity && !self.executed_correctly {
                    if let Some(message) = &self.error_message {
                        state.set_error_message(message);
                    }
                    state.notify_update();
                }
            }
            ActionKind::PlaceCard {
                nickname,
                card,
                position,
            } => {
                if !self.executed_correctly {
                    self.reflect_rejection(state);
                    return;
                }
                if let Some(game) = state.game_model_mut() {
                    if let Err(reason) = apply_place_card(game, nickname, *card, *position) {
                        warn!("place-card replica diverged: {reason}");
                    }
                }
                if state.identity() == self.identity {
                    state.set_phase(PlayerPhase::PickingCard);
                }
                state.notify_update();
            }
            ActionKind::PickCard { nickname } => {
                if !self.executed_correctly {
                    self.reflect_rejection(state);
                    return;
                }
                if let Some(game) = state.game_model_mut() {
                    if let Err(reason) = apply_pick_card(game, nickname) {
                        warn!("pick-card replica diverged: {reason}");
                    }
                }
                self.refresh_turn_phase(state);
                state.notify_update();
            }
            ActionKind::RequestReconnect { .. } => {}
            ActionKind::Debug => {
                debug!("debug action reflected on {}", state.identity());
            }
            ActionKind::Error { message } => {
                state.set_error_message(message);
                state.notify_update();
            }
            ActionKind::LobbyStateSync { lobby } => {
                state.set_lobby_model(lobby);
                // A roster sync naming us is the server confirming our seat.
                if state.phase() == PlayerPhase::SelectingLobby {
                    let seated = state
                        .nickname()
                        .map(|me| lobby.players().iter().any(|p| p.nickname == me))
                        .unwrap_or(false);
                    if seated {
                        state.set_phase(PlayerPhase::WaitingForPlayers);
                    }
                }
                state.notify_update();
            }
            ActionKind::LobbyList { lobbies } => {
                state.set_available_lobbies(lobbies.clone());
                state.notify_update();
            }
            ActionKind::GameStarted { game } => {
                state.set_game_model(game);
                self.refresh_turn_phase(state);
                state.notify_update();
            }
            ActionKind::GameStateSync { game } => {
                state.set_game_model(game);
                state.notify_update();
            }
            ActionKind::ResumeGame {
                game,
                all_clients_ready,
            } => {
                state.set_game_model(game);
                if *all_clients_ready {
                    self.refresh_turn_phase(state);
                } else {
                    state.set_phase(PlayerPhase::Sleeping);
                }
                state.notify_update();
            }
            ActionKind::HangGame => {
                if state.identity() == self.identity {
                    state.set_phase(PlayerPhase::Disconnected);
                } else {
                    let hung = if let Some(game) = state.game_model_mut() {
                        apply_hang_game(game, &self.identity);
                        true
                    } else {
                        false
                    };
                    if hung {
                        self.refresh_turn_phase(state);
                    }
                }
                state.notify_update();
            }
        }
    }

    /// Surfaces a rejected player action to its originator only.
    fn reflect_rejection(&self, state: &mut ClientState) {
        if state.identity() != self.identity {
            return;
        }
        if let Some(message) = &self.error_message {
            state.set_error_message(message);
        }
        state.notify_update();
    }

    /// Recomputes the local phase from whose turn it is on the replica.
    fn refresh_turn_phase(&self, state: &mut ClientState) {
        let Some(game) = state.game_model() else { return };
        if game.state() == GameState::Ended {
            state.set_phase(PlayerPhase::GameEnded);
            return;
        }
        let current = game.current_player().nickname.clone();
        let me = game.self_nickname().map(str::to_string);

        let phase = match me {
            Some(me) if me == current => {
                let must_place = game
                    .player(&me)
                    .map(|p| p.hand.len() == MAX_HAND_SIZE)
                    .unwrap_or(true);
                if must_place {
                    PlayerPhase::PlacingCard
                } else {
                    PlayerPhase::PickingCard
                }
            }
            _ => PlayerPhase::Sleeping,
        };
        state.set_phase(phase);
    }
}

fn apply_place_card(
    game: &mut Game,
    nickname: &str,
    card: Card,
    position: FieldPosition,
) -> Result<(), String> {
    if game.current_player().nickname != nickname {
        return Err("It is not your turn".to_string());
    }

    let player = game
        .player_mut(nickname)
        .ok_or_else(|| format!("Unknown player {nickname}"))?;

    if !player.has_in_hand(card) {
        return Err("Card is not in your hand".to_string());
    }
    if player.occupies(position) {
        return Err("Position is already occupied".to_string());
    }

    player.hand.retain(|c| *c != card);
    player.placed.push(PlacedCard { card, position });
    Ok(())
}

fn apply_pick_card(game: &mut Game, nickname: &str) -> Result<(), String> {
    if game.current_player().nickname != nickname {
        return Err("It is not your turn".to_string());
    }

    {
        let player = game
            .player(nickname)
            .ok_or_else(|| format!("Unknown player {nickname}"))?;
        if player.hand.len() >= MAX_HAND_SIZE {
            return Err("You must place a card before picking".to_string());
        }
    }

    let card = game.draw_card().ok_or("The deck is empty")?;
    if let Some(player) = game.player_mut(nickname) {
        player.hand.push(card);
    }
    if game.deck_len() == 0 {
        // The last card decides the match.
        game.end();
    } else {
        game.advance_turn();
    }
    Ok(())
}

fn apply_hang_game(game: &mut Game, identity: &str) {
    let was_current = game
        .player_by_identity(identity)
        .map(|p| p.nickname == game.current_player().nickname)
        .unwrap_or(false);

    if game.mark_disconnected(identity).is_some() {
        if game.players().iter().all(|p| !p.connected) {
            // Nobody is left at the table.
            game.end();
        } else if was_current {
            // Skip the disconnected player's turn so the game keeps moving.
            game.advance_turn();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameId;

    fn two_player_lobby() -> Lobby {
        let mut lobby = Lobby::new(LobbyId(9));
        lobby
            .add_new_player("alice", "id-a", Some(Pawn::Red))
            .unwrap();
        lobby
            .add_new_player("bob", "id-b", Some(Pawn::Blue))
            .unwrap();
        lobby
    }

    fn running_game() -> Game {
        let mut lobby = two_player_lobby();
        lobby.start_game().unwrap();
        Game::from_lobby(GameId(1), &lobby, (0..20).map(Card).collect())
    }

    fn client(identity: &str, nickname: &str, game: &Game) -> ClientState {
        let mut state = ClientState::new(identity, None);
        state.set_nickname(nickname);
        state.set_game_model(game);
        state
    }

    #[test]
    fn start_by_non_first_player_is_rejected() {
        let mut lobby = two_player_lobby();
        let mut action = Action::new(
            ActionKind::StartGame {
                nickname: "bob".to_string(),
            },
            "id-b",
        );

        action.execute_on_lobby(&mut lobby).unwrap();

        assert!(!action.executed_correctly);
        assert!(action.error_message.is_some());
        assert!(!lobby.ready_to_start());
    }

    #[test]
    fn start_with_too_few_players_is_rejected() {
        let mut lobby = Lobby::new(LobbyId(2));
        lobby
            .add_new_player("alice", "id-a", Some(Pawn::Red))
            .unwrap();

        let mut action = Action::new(
            ActionKind::StartGame {
                nickname: "alice".to_string(),
            },
            "id-a",
        );
        action.execute_on_lobby(&mut lobby).unwrap();

        assert!(!action.executed_correctly);
        assert!(!lobby.ready_to_start());
    }

    #[test]
    fn start_by_first_player_with_enough_players_succeeds() {
        let mut lobby = two_player_lobby();
        let mut action = Action::new(
            ActionKind::StartGame {
                nickname: "alice".to_string(),
            },
            "id-a",
        );

        action.execute_on_lobby(&mut lobby).unwrap();

        assert!(action.executed_correctly);
        assert!(lobby.ready_to_start());
    }

    #[test]
    fn start_rejection_is_shown_only_to_the_offender() {
        let mut lobby = two_player_lobby();
        let mut action = Action::new(
            ActionKind::StartGame {
                nickname: "bob".to_string(),
            },
            "id-b",
        );
        action.execute_on_lobby(&mut lobby).unwrap();

        let mut offender = ClientState::new("id-b", None);
        let mut bystander = ClientState::new("id-a", None);

        action.reflect(&mut offender);
        action.reflect(&mut bystander);

        assert!(offender.take_error_message().is_some());
        assert!(bystander.take_error_message().is_none());
    }

    #[test]
    fn unsupported_model_fails_fast() {
        let mut lobby = two_player_lobby();
        let mut action = Action::new(
            ActionKind::PickCard {
                nickname: "alice".to_string(),
            },
            "id-a",
        );

        let err = action.execute_on_lobby(&mut lobby).unwrap_err();
        assert_eq!(
            err,
            ActionError::UnsupportedModel {
                action: "PickCard",
                model: "lobby",
            }
        );
    }

    #[test]
    fn chat_is_delivered_to_the_recipients_encoded_in_the_message() {
        let mut game = running_game();
        let message = game
            .player("alice")
            .unwrap()
            .chat
            .private_message("bob", "hi bob");

        let mut action = Action::new(
            ActionKind::ChatSend {
                message: message.clone(),
            },
            "id-a",
        );
        action.execute_on_game(&mut game).unwrap();

        assert_eq!(game.player("bob").unwrap().chat.messages().len(), 1);
        // The sender keeps a copy as well.
        assert_eq!(game.player("alice").unwrap().chat.messages().len(), 1);
    }

    #[test]
    fn chat_reflect_keeps_sender_and_receivers_in_sync() {
        let game = running_game();
        let message = game
            .player("alice")
            .unwrap()
            .chat
            .broadcast_message("hello all");
        let action = Action::new(
            ActionKind::ChatSend { message },
            "id-a",
        );

        let mut sender = client("id-a", "alice", &game);
        let mut receiver = client("id-b", "bob", &game);

        action.reflect(&mut sender);
        action.reflect(&mut receiver);

        let sender_chat = sender
            .game_model()
            .unwrap()
            .self_player()
            .unwrap()
            .chat
            .messages();
        let receiver_chat = receiver
            .game_model()
            .unwrap()
            .self_player()
            .unwrap()
            .chat
            .messages();
        assert_eq!(sender_chat.len(), 1);
        assert_eq!(receiver_chat.len(), 1);
        assert_eq!(sender_chat[0].body, "hello all");
    }

    #[test]
    fn place_card_out_of_turn_is_rejected() {
        let mut game = running_game();
        let card = game.player("bob").unwrap().hand[0];

        let mut action = Action::new(
            ActionKind::PlaceCard {
                nickname: "bob".to_string(),
                card,
                position: FieldPosition { x: 0, y: 0 },
            },
            "id-b",
        );
        action.execute_on_game(&mut game).unwrap();

        assert!(!action.executed_correctly);
        assert_eq!(game.player("bob").unwrap().hand.len(), MAX_HAND_SIZE);
    }

    #[test]
    fn place_then_pick_advances_the_turn_on_both_sides() {
        let mut game = running_game();
        let card = game.player("alice").unwrap().hand[0];

        let mut replica_holder = client("id-a", "alice", &game);

        let mut place = Action::new(
            ActionKind::PlaceCard {
                nickname: "alice".to_string(),
                card,
                position: FieldPosition { x: 1, y: 1 },
            },
            "id-a",
        );
        place.execute_on_game(&mut game).unwrap();
        assert!(place.executed_correctly);
        place.reflect(&mut replica_holder);
        assert_eq!(replica_holder.phase(), PlayerPhase::PickingCard);

        let mut pick = Action::new(
            ActionKind::PickCard {
                nickname: "alice".to_string(),
            },
            "id-a",
        );
        pick.execute_on_game(&mut game).unwrap();
        assert!(pick.executed_correctly);
        pick.reflect(&mut replica_holder);

        assert_eq!(game.current_player().nickname, "bob");
        let replica = replica_holder.game_model().unwrap();
        assert_eq!(replica.current_player().nickname, "bob");
        assert_eq!(replica.deck_len(), game.deck_len());
        assert_eq!(replica_holder.phase(), PlayerPhase::Sleeping);
    }

    #[test]
    fn action_round_trips_through_the_wire_format() {
        let game = running_game();
        let message = game
            .player("alice")
            .unwrap()
            .chat
            .broadcast_message("round trip");
        let actions = vec![
            Action::new(
                ActionKind::ChatSend { message },
                "id-a",
            ),
            Action::new(
                ActionKind::JoinLobby {
                    nickname: "bob".to_string(),
                    lobby_id: LobbyId(42),
                    pawn: Some(Pawn::Blue),
                },
                "id-b",
            ),
            Action::server(ActionKind::GameStateSync { game: game.clone() }),
            Action::server(ActionKind::Error {
                message: "nope".to_string(),
            }),
        ];

        for action in actions {
            let bytes = bincode::serialize(&action).unwrap();
            let decoded: Action = bincode::deserialize(&bytes).unwrap();
            assert_eq!(decoded, action);
            assert_eq!(decoded.identity(), action.identity());
        }
    }

    #[test]
    fn hang_game_skips_the_disconnected_players_turn() {
        let mut game = running_game();
        assert_eq!(game.current_player().nickname, "alice");

        let mut action = Action::new(ActionKind::HangGame, "id-a");
        action.execute_on_game(&mut game).unwrap();

        assert!(!game.player("alice").unwrap().connected);
        assert_eq!(game.current_player().nickname, "bob");
    }

    #[test]
    fn join_reflects_without_committing_to_a_seat() {
        let mut state = ClientState::new("id-b", None);
        assert_eq!(state.phase(), PlayerPhase::SelectingLobby);

        let join = Action::new(
            ActionKind::JoinLobby {
                nickname: "bob".to_string(),
                lobby_id: LobbyId(9),
                pawn: Some(Pawn::Blue),
            },
            "id-b",
        );
        join.reflect(&mut state);

        // The join alone only records the nickname; the seat is not
        // ours until the server says so.
        assert_eq!(state.phase(), PlayerPhase::SelectingLobby);
        assert_eq!(state.nickname(), Some("bob"));

        // A roster sync without us changes nothing.
        let mut strangers = Lobby::new(LobbyId(9));
        strangers
            .add_new_player("alice", "id-a", Some(Pawn::Red))
            .unwrap();
        Action::server(ActionKind::LobbyStateSync { lobby: strangers }).reflect(&mut state);
        assert_eq!(state.phase(), PlayerPhase::SelectingLobby);

        // A roster sync naming us confirms the seat.
        Action::server(ActionKind::LobbyStateSync {
            lobby: two_player_lobby(),
        })
        .reflect(&mut state);
        assert_eq!(state.phase(), PlayerPhase::WaitingForPlayers);
    }

    #[test]
    fn drawing_the_last_card_ends_the_game() {
        let mut game = running_game();
        while game.deck_len() > 1 {
            game.draw_card();
        }
        let card = game.player("alice").unwrap().hand[0];
        let mut replica_holder = client("id-b", "bob", &game);

        let mut place = Action::new(
            ActionKind::PlaceCard {
                nickname: "alice".to_string(),
                card,
                position: FieldPosition { x: 2, y: 2 },
            },
            "id-a",
        );
        place.execute_on_game(&mut game).unwrap();
        place.reflect(&mut replica_holder);

        let mut pick = Action::new(
            ActionKind::PickCard {
                nickname: "alice".to_string(),
            },
            "id-a",
        );
        pick.execute_on_game(&mut game).unwrap();
        pick.reflect(&mut replica_holder);

        assert!(pick.executed_correctly);
        assert_eq!(game.state(), GameState::Ended);
        assert_eq!(replica_holder.phase(), PlayerPhase::GameEnded);
    }

    #[test]
    fn game_ends_when_the_last_player_disconnects() {
        let mut game = running_game();

        let mut first = Action::new(ActionKind::HangGame, "id-a");
        first.execute_on_game(&mut game).unwrap();
        assert_eq!(game.state(), GameState::InProgress);

        let mut second = Action::new(ActionKind::HangGame, "id-b");
        second.execute_on_game(&mut game).unwrap();
        assert_eq!(game.state(), GameState::Ended);
    }

    #[test]
    fn lobby_list_passes_through_the_matchmaking_model() {
        let mut matchmaking = Matchmaking::new();
        let mut action = Action::server(ActionKind::LobbyList {
            lobbies: vec![two_player_lobby()],
        });

        action.execute_on_matchmaking(&mut matchmaking).unwrap();
        assert!(action.executed_correctly);
    }

    #[test]
    fn error_action_reflects_on_every_state() {
        let action = Action::server(ActionKind::Error {
            message: "lobby not found".to_string(),
        });

        let mut state = ClientState::new("anyone", None);
        action.reflect(&mut state);
        assert_eq!(state.take_error_message().as_deref(), Some("lobby not found"));
    }
}
