//! Room protocol messages and the outbound transport seam.
//!
//! The session never owns a socket. Outbound messages go through a
//! [`Transport`]; the [`Outbox`] implementation simply queues them as JSON
//! strings for whatever connection the host drives.

use crate::lenient;
use crate::operation::WireOperation;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from encoding or decoding protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Failed to decode server message: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("Failed to encode client message: {0}")]
    Encode(#[source] serde_json::Error),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Messages sent to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Submit one drawing operation. `canvas` is omitted for the single shared board.
    DrawOp {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        canvas: Option<String>,
        op: WireOperation,
    },
    /// Ask for a full room snapshot
    Snapshot,
}

/// Remaining strokes per team board, e.g. `{"A": 3, "B": 5}`.
///
/// Counts are read leniently: `3.0` and `"3"` both count as 3, and an entry
/// that is not a number (`null` included) is treated as unreported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Budget(pub BTreeMap<String, i64>);

impl Budget {
    pub fn from_value(value: &Value) -> Self {
        let entries = value
            .as_object()
            .map(|obj| {
                obj.iter()
                    .filter_map(|(board, left)| Some((board.clone(), lenient::number(left)?.floor() as i64)))
                    .collect()
            })
            .unwrap_or_default();
        Budget(entries)
    }

    /// Remaining strokes for a board, if the server reported one.
    pub fn remaining(&self, board: &str) -> Option<i64> {
        self.0.get(board).copied()
    }
}

impl<'de> Deserialize<'de> for Budget {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Budget::from_value(&value))
    }
}

/// Game fields carried by a room snapshot. Unknown fields are ignored and
/// badly typed ones read as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameState {
    #[serde(deserialize_with = "lenient::deserialize_string")]
    pub phase: Option<String>,
    pub budget: Option<Budget>,
    /// Server time at which drawing ends.
    #[serde(deserialize_with = "lenient::deserialize_number")]
    pub draw_end_at: Option<f64>,
    /// Server time at which guessing ends.
    #[serde(deserialize_with = "lenient::deserialize_number")]
    pub guess_end_at: Option<f64>,
    /// Server time at which voting ends.
    #[serde(deserialize_with = "lenient::deserialize_number")]
    pub vote_end_at: Option<f64>,
}

/// `game` is advisory: anything that is not an object reads as absent.
fn deserialize_game<'de, D>(deserializer: D) -> Result<Option<GameState>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match serde_json::from_value(value) {
        Ok(game) => Some(game),
        Err(e) => {
            log::debug!("Ignoring unreadable game state: {}", e);
            None
        }
    }))
}

impl GameState {
    /// Deadline governing the given phase, if the server sent one.
    ///
    /// A zero deadline means "not set" on the wire.
    pub fn deadline_for(&self, phase: &str) -> Option<f64> {
        let deadline = match phase.to_ascii_uppercase().as_str() {
            "DRAW" | "DRAWING" => self.draw_end_at,
            "GUESS" | "GUESSING" => self.guess_end_at,
            "VOTE" | "VOTING" => self.vote_end_at,
            _ => None,
        };
        deadline.filter(|d| *d > 0.0)
    }
}

/// Messages received from the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Authoritative full state
    RoomSnapshot {
        /// Raw operation entries; decoded leniently by the session.
        #[serde(default, deserialize_with = "lenient::deserialize_list")]
        ops: Vec<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::deserialize_number")]
        server_ts: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_game")]
        game: Option<GameState>,
    },
    /// One operation relayed to every participant, the sender included
    OpBroadcast {
        op: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        by: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        canvas: Option<String>,
    },
    BudgetUpdate {
        #[serde(default)]
        budget: Budget,
    },
    PhaseChanged {
        #[serde(default, deserialize_with = "lenient::deserialize_string")]
        phase: Option<String>,
    },
    /// Server-assigned participant id
    Hello { pid: String },
    Error {
        #[serde(default)]
        message: Option<String>,
    },
    /// Any message type this client does not handle
    #[serde(other)]
    Unknown,
}

/// Parse one inbound JSON message.
pub fn parse_server_message(json: &str) -> ProtocolResult<ServerMessage> {
    serde_json::from_str(json).map_err(ProtocolError::Decode)
}

/// Encode one outbound message.
pub fn encode_client_message(message: &ClientMessage) -> ProtocolResult<String> {
    serde_json::to_string(message).map_err(ProtocolError::Encode)
}

/// Outbound side of the room connection.
pub trait Transport {
    fn send(&self, message: &ClientMessage);
}

impl<F> Transport for F
where
    F: Fn(&ClientMessage),
{
    fn send(&self, message: &ClientMessage) {
        self(message)
    }
}

/// Transport that queues encoded messages until the host drains them.
#[derive(Debug, Default)]
pub struct Outbox {
    outgoing: RefCell<Vec<String>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take pending outgoing messages (drains the queue).
    pub fn take_outgoing(&self) -> Vec<String> {
        std::mem::take(&mut *self.outgoing.borrow_mut())
    }

    /// Check if there are pending outgoing messages.
    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.borrow().is_empty()
    }
}

impl Transport for Outbox {
    fn send(&self, message: &ClientMessage) {
        match encode_client_message(message) {
            Ok(json) => self.outgoing.borrow_mut().push(json),
            Err(e) => log::warn!("Dropping outgoing message: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_snapshot() {
        let msg = parse_server_message(
            r#"{"type":"room_snapshot","ops":[{"t":"clear"}],"server_ts":1700000000,
                "game":{"phase":"DRAW","budget":{"A":3,"B":0},"draw_end_at":1700000060,"round":2}}"#,
        )
        .unwrap();
        match msg {
            ServerMessage::RoomSnapshot { ops, server_ts, game } => {
                assert_eq!(ops.len(), 1);
                assert_eq!(server_ts, Some(1_700_000_000.0));
                let game = game.unwrap();
                assert_eq!(game.budget.as_ref().unwrap().remaining("B"), Some(0));
                assert_eq!(game.deadline_for("DRAW"), Some(1_700_000_060.0));
                assert_eq!(game.deadline_for("GUESS"), None);
            }
            other => panic!("Wrong message: {:?}", other),
        }
    }

    #[test]
    fn test_loosely_typed_game_state_keeps_ops() {
        let msg = parse_server_message(
            r#"{"type":"room_snapshot","ops":[{"t":"clear"}],"server_ts":"1700000000",
                "game":{"phase":"DRAW","budget":{"A":3.0,"B":null,"C":"2"},"draw_end_at":1700000060.5,"guess_end_at":null}}"#,
        )
        .unwrap();
        match msg {
            ServerMessage::RoomSnapshot { ops, server_ts, game } => {
                assert_eq!(ops.len(), 1);
                assert_eq!(server_ts, Some(1_700_000_000.0));
                let game = game.unwrap();
                let budget = game.budget.clone().unwrap();
                assert_eq!(budget.remaining("A"), Some(3));
                assert_eq!(budget.remaining("B"), None);
                assert_eq!(budget.remaining("C"), Some(2));
                assert_eq!(game.deadline_for("DRAW"), Some(1_700_000_060.5));
                assert_eq!(game.deadline_for("GUESS"), None);
            }
            other => panic!("Wrong message: {:?}", other),
        }

        let msg = parse_server_message(r#"{"type":"room_snapshot","ops":[{"t":"clear"}],"game":"lobby"}"#).unwrap();
        assert!(matches!(msg, ServerMessage::RoomSnapshot { ref ops, game: None, .. } if ops.len() == 1));
    }

    #[test]
    fn test_budget_update_reads_floats() {
        let msg = parse_server_message(r#"{"type":"budget_update","budget":{"A":2.9,"B":"0"}}"#).unwrap();
        match msg {
            ServerMessage::BudgetUpdate { budget } => {
                assert_eq!(budget.remaining("A"), Some(2));
                assert_eq!(budget.remaining("B"), Some(0));
            }
            other => panic!("Wrong message: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_ignored() {
        let msg = parse_server_message(r#"{"type":"guess_chat","text":"cat?"}"#).unwrap();
        assert_eq!(msg, ServerMessage::Unknown);
    }

    #[test]
    fn test_invalid_json_is_decode_error() {
        assert!(matches!(parse_server_message("{not json"), Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_draw_op_encoding() {
        let single = ClientMessage::DrawOp {
            canvas: None,
            op: WireOperation::from_operation(&crate::operation::Operation::Clear, None),
        };
        let value: Value = serde_json::from_str(&encode_client_message(&single).unwrap()).unwrap();
        assert_eq!(value, json!({"type": "draw_op", "op": {"t": "clear", "p": {"clear": 1}}}));

        let snapshot = encode_client_message(&ClientMessage::Snapshot).unwrap();
        assert_eq!(snapshot, r#"{"type":"snapshot"}"#);
    }

    #[test]
    fn test_outbox_drains() {
        let outbox = Outbox::new();
        assert!(!outbox.has_outgoing());
        outbox.send(&ClientMessage::Snapshot);
        assert!(outbox.has_outgoing());
        assert_eq!(outbox.take_outgoing().len(), 1);
        assert!(!outbox.has_outgoing());
    }

    #[test]
    fn test_closure_transport() {
        let seen = RefCell::new(0);
        let transport = |_: &ClientMessage| *seen.borrow_mut() += 1;
        transport.send(&ClientMessage::Snapshot);
        assert_eq!(*seen.borrow(), 1);
    }
}
