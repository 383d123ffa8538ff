//! The wire envelope (spec.md §3, §6) and its type-specific argument shapes.
//!
//! `Envelope` carries `arguments` as a raw [`serde_json::Value`]; callers
//! parse it into the matching `*Args` struct once the message type is known.
//! This keeps decode a two-step process (envelope shape, then argument
//! shape) so the two failure modes in spec.md §4.1 — `MalformedJSON` and
//! `MalformedEnvelope` — stay distinguishable from a downstream
//! "arguments didn't match this type's schema" failure.

use serde::{Deserialize, Serialize};

/// `type` tag of the wire envelope (spec.md §3, extended with `Cancel` per
/// SPEC_FULL.md §4.7.1 / §9).
///
/// `Unknown` carries any tag value outside 0-4: spec.md §4.1 only fails
/// decode on a missing `type` field, not an unrecognized one — an
/// unrecognized value still reaches the Dispatcher's default arm, which
/// replies `INCORRECT_TYPE` (spec.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Initialization,
    Info,
    Error,
    Task,
    Cancel,
    Unknown(u8),
}

impl MessageType {
    pub fn as_u8(self) -> u8 {
        match self {
            MessageType::Initialization => 0,
            MessageType::Info => 1,
            MessageType::Error => 2,
            MessageType::Task => 3,
            MessageType::Cancel => 4,
            MessageType::Unknown(raw) => raw,
        }
    }
}

impl From<u8> for MessageType {
    fn from(value: u8) -> Self {
        match value {
            0 => MessageType::Initialization,
            1 => MessageType::Info,
            2 => MessageType::Error,
            3 => MessageType::Task,
            4 => MessageType::Cancel,
            other => MessageType::Unknown(other),
        }
    }
}

impl Serialize for MessageType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for MessageType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = u8::deserialize(deserializer)?;
        Ok(MessageType::from(raw))
    }
}

/// The envelope on the wire: `{ id, client, type, arguments }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub id: String,
    pub client: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub arguments: serde_json::Value,
}

impl Envelope {
    pub fn new(
        id: impl Into<String>,
        client: impl Into<String>,
        message_type: MessageType,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            client: client.into(),
            message_type,
            arguments,
        }
    }
}

/// INITIALIZATION arguments (spec.md §6). Unknown keys are rejected, matching
/// the spec's "additional keys are rejected" clause.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InitializationArgs {
    pub enable_overdue: bool,
}

/// INFO reply arguments. `responce` keeps the spelling from the original
/// protocol (spec.md §6) rather than "correcting" it — the wire contract is
/// the wire contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoArgs {
    pub responce: i32,
}

impl InfoArgs {
    pub const OK: i32 = 0;

    pub fn ok() -> Self {
        Self { responce: Self::OK }
    }
}

/// ERROR reply arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorArgs {
    pub error_code: i32,
    pub message: String,
}

/// TASK submission arguments. All blob fields are base64 of the codec's
/// binary encoding (spec.md §4.1, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskArgs {
    pub lifetime: i64,
    pub function: String,
    pub args: String,
    pub kwargs: String,
    pub time_to_start: String,
    pub hard: bool,
}

/// CANCEL submission arguments (SPEC_FULL.md §4.7.1, §6.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelArgs {
    pub task_id: String,
}
