//! Transport-agnostic request/response envelope.
//!
//! A request is `{type, id, params}`; its response echoes `type` and `id`
//! and flattens the [`CommandResult`] next to them.

use serde::{Deserialize, Serialize};

use crate::command::{Command, CommandResult};
use crate::CanvasResult;

/// An incoming command request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Command discriminant.
    #[serde(rename = "type")]
    pub kind: String,
    /// Opaque correlation id, echoed back.
    #[serde(default)]
    pub id: serde_json::Value,
    /// Command parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

impl CommandRequest {
    /// Build a request.
    #[must_use]
    pub fn new(kind: impl Into<String>, id: serde_json::Value, params: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            id,
            params,
        }
    }

    /// Decode the typed command.
    ///
    /// # Errors
    ///
    /// See [`Command::parse`].
    pub fn command(&self) -> CanvasResult<Command> {
        Command::parse(&self.kind, self.params.clone())
    }
}

/// The answer to a [`CommandRequest`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResponse {
    /// Echoed discriminant.
    #[serde(rename = "type")]
    pub kind: String,
    /// Echoed correlation id.
    pub id: serde_json::Value,
    /// The outcome.
    #[serde(flatten)]
    pub result: CommandResult,
}

impl CommandResponse {
    /// Pair a result with the request it answers.
    #[must_use]
    pub fn new(request: &CommandRequest, result: CommandResult) -> Self {
        Self {
            kind: request.kind.clone(),
            id: request.id.clone(),
            result,
        }
    }

    /// A failure answer to a request that never reached execution.
    #[must_use]
    pub fn rejected(request: &CommandRequest, message: impl Into<String>) -> Self {
        Self::new(request, CommandResult::failed(message))
    }
}
