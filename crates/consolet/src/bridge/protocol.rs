//! Wire envelope types for the file channel.
//!
//! Both sides exchange whole-file UTF-8 JSON: the client replaces
//! `command.json` with a [`CommandEnvelope`], the host-side listener
//! answers by writing a [`ResponseEnvelope`] to `response.json`. The
//! correlation id is the only thing binding the two together.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unique correlation id for one command.
///
/// UUID v4, generated fresh per call and never reused. A response is only
/// accepted if its id equals the outstanding command's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(uuid::Uuid);

impl CommandId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        let uuid = uuid::Uuid::parse_str(s)?;
        Ok(Self(uuid))
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One command from the client to the host.
///
/// `action` is opaque to the channel; `params` is an open JSON bag - the
/// channel enforces no schema, that belongs to the dispatch layer above.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub id: CommandId,
    pub action: String,
    pub params: Map<String, Value>,
}

impl CommandEnvelope {
    /// Build an envelope with a fresh correlation id.
    pub fn new(action: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            id: CommandId::new(),
            action: action.into(),
            params,
        }
    }
}

/// One reply from the host to the client.
///
/// `result` is meaningful only when `success` is true, `error` only when
/// it is false. Absent fields are omitted on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub id: CommandId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    pub fn ok(id: CommandId, result: Value) -> Self {
        Self {
            id,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: CommandId, error: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }
}
