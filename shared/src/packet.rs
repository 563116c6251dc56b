use crate::action::Action;
use serde::{Deserialize, Serialize};

/// Self-describing transport envelope. The first packet on any connection
/// must be `Identity`; after that the channel carries actions and
/// heartbeats in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    Identity { identity: String },
    Action(Action),
    Heartbeat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionKind;

    #[test]
    fn packet_round_trip_preserves_the_variant() {
        let packets = vec![
            Packet::Identity {
                identity: "id-a".to_string(),
            },
            Packet::Action(Action::new(
                ActionKind::StartGame {
                    nickname: "alice".to_string(),
                },
                "id-a",
            )),
            Packet::Heartbeat,
        ];

        for packet in packets {
            let bytes = bincode::serialize(&packet).unwrap();
            let decoded: Packet = bincode::deserialize(&bytes).unwrap();
            assert_eq!(decoded, packet);
        }
    }
}
