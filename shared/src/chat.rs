use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A single chat message. The recipient set is fixed when the message is
/// created; delivery never re-derives it from the current roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender_nickname: String,
    pub receiver_nicknames: Vec<String>,
    pub body: String,
    pub timestamp_ms: u64,
}

impl ChatMessage {
    pub fn new(sender_nickname: &str, receiver_nicknames: Vec<String>, body: &str) -> Self {
        Self {
            sender_nickname: sender_nickname.to_string(),
            receiver_nicknames,
            body: body.to_string(),
            timestamp_ms: now_ms(),
        }
    }

    pub fn is_for(&self, nickname: &str) -> bool {
        self.receiver_nicknames.iter().any(|n| n == nickname)
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Per-player chat history, kept sorted by message timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerChat {
    nickname: String,
    participants: Vec<String>,
    messages: Vec<ChatMessage>,
}

impl PlayerChat {
    pub fn new(nickname: &str, participants: Vec<String>) -> Self {
        Self {
            nickname: nickname.to_string(),
            participants,
            messages: Vec::new(),
        }
    }

    /// Builds a message addressed to every participant.
    pub fn broadcast_message(&self, body: &str) -> ChatMessage {
        ChatMessage::new(&self.nickname, self.participants.clone(), body)
    }

    pub fn private_message(&self, receiver: &str, body: &str) -> ChatMessage {
        ChatMessage::new(&self.nickname, vec![receiver.to_string()], body)
    }

    /// Inserts a message keeping the history ordered by timestamp, even when
    /// messages arrive out of order.
    pub fn insert_message(&mut self, message: ChatMessage) {
        let at = self
            .messages
            .iter()
            .rposition(|m| m.timestamp_ms <= message.timestamp_ms)
            .map(|i| i + 1)
            .unwrap_or(0);
        self.messages.insert(at, message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last_messages(&self, n: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn participants(&self) -> &[String] {
        &self.participants
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_at(body: &str, timestamp_ms: u64) -> ChatMessage {
        ChatMessage {
            sender_nickname: "alice".to_string(),
            receiver_nicknames: vec!["bob".to_string()],
            body: body.to_string(),
            timestamp_ms,
        }
    }

    #[test]
    fn broadcast_recipients_are_fixed_at_creation() {
        let chat = PlayerChat::new("alice", vec!["bob".to_string(), "carol".to_string()]);
        let message = chat.broadcast_message("hello");

        assert_eq!(message.sender_nickname, "alice");
        assert_eq!(
            message.receiver_nicknames,
            vec!["bob".to_string(), "carol".to_string()]
        );
        assert!(message.is_for("bob"));
        assert!(!message.is_for("dave"));
    }

    #[test]
    fn private_message_targets_single_receiver() {
        let chat = PlayerChat::new("alice", vec!["bob".to_string(), "carol".to_string()]);
        let message = chat.private_message("bob", "psst");

        assert_eq!(message.receiver_nicknames, vec!["bob".to_string()]);
    }

    #[test]
    fn out_of_order_insertion_retrieves_in_timestamp_order() {
        let mut chat = PlayerChat::new("bob", vec!["alice".to_string()]);

        let message1 = message_at("first", 100);
        let message2 = message_at("second", 200);
        let message3 = message_at("third", 300);

        chat.insert_message(message3.clone());
        chat.insert_message(message1.clone());
        chat.insert_message(message2.clone());

        let bodies: Vec<&str> = chat.messages().iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second", "third"]);
    }

    #[test]
    fn equal_timestamps_preserve_insertion_order() {
        let mut chat = PlayerChat::new("bob", vec![]);

        chat.insert_message(message_at("a", 100));
        chat.insert_message(message_at("b", 100));

        let bodies: Vec<&str> = chat.messages().iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["a", "b"]);
    }

    #[test]
    fn last_messages_returns_tail() {
        let mut chat = PlayerChat::new("bob", vec![]);
        for i in 0..5 {
            chat.insert_message(message_at(&format!("m{i}"), i));
        }

        let tail = chat.last_messages(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].body, "m3");
        assert_eq!(tail[1].body, "m4");

        assert_eq!(chat.last_messages(10).len(), 5);
    }
}
