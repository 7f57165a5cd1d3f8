//! Typed commands and their execution against an element list.
//!
//! ```text
//!   elements ──► Scene ──► transform ──► Scene ──► elements'
//!                             │
//!                             └──► CommandResult { success, error?, fields }
//! ```
//!
//! [`execute`] performs no I/O. The caller owns the authoritative buffer and
//! decides what to do with the returned elements.

use serde::{Deserialize, Serialize};

use crate::edit::{self, ElementPatch, NewElement};
use crate::export::{self, CompactScene, ExportOptions};
use crate::transform::{self, ResizeEdges};
use crate::{CanvasError, CanvasResult, Element, IdGenerator, Scene};

/// Parameters of `move`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveParams {
    /// Elements to move.
    pub element_ids: Vec<String>,
    /// Horizontal offset.
    #[serde(default)]
    pub delta_x: f64,
    /// Vertical offset.
    #[serde(default)]
    pub delta_y: f64,
}

/// Parameters of `rotate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateParams {
    /// Elements to rotate.
    pub element_ids: Vec<String>,
    /// Clockwise rotation in degrees.
    pub angle: f64,
}

/// Parameters of `resize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeParams {
    /// Elements to resize.
    pub element_ids: Vec<String>,
    /// Top edge growth.
    #[serde(default)]
    pub top: f64,
    /// Bottom edge growth.
    #[serde(default)]
    pub bottom: f64,
    /// Left edge growth.
    #[serde(default)]
    pub left: f64,
    /// Right edge growth.
    #[serde(default)]
    pub right: f64,
}

impl ResizeParams {
    fn edges(&self) -> ResizeEdges {
        ResizeEdges {
            top: self.top,
            bottom: self.bottom,
            left: self.left,
            right: self.right,
        }
    }
}

/// Parameters of `group` and `delete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetParams {
    /// Targeted elements.
    pub element_ids: Vec<String>,
}

/// Parameters of `ungroup`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UngroupParams {
    /// The single element to ungroup.
    pub element_id: String,
}

/// Shape of a `read` result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadFormat {
    /// Classified, rounded buckets.
    #[default]
    Compact,
    /// Visible elements as stored.
    Full,
}

/// Parameters of `read`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadParams {
    /// Include style fields in the compact form.
    #[serde(default)]
    pub with_style: bool,
    /// Compact (default) or full.
    #[serde(default)]
    pub format: ReadFormat,
}

/// A command against the scene, one variant per kind.
#[derive(Debug, Clone)]
pub enum Command {
    /// Create an element.
    Add(NewElement),
    /// Translate elements.
    Move(MoveParams),
    /// Rotate elements and their groups.
    Rotate(RotateParams),
    /// Resize box elements.
    Resize(ResizeParams),
    /// Group elements.
    Group(TargetParams),
    /// Drop one element's latest group.
    Ungroup(UngroupParams),
    /// Tombstone elements.
    Delete(TargetParams),
    /// Edit text, note or style.
    Update(ElementPatch),
    /// Empty the scene.
    Clear,
    /// Read the scene back.
    Read(ReadParams),
}

impl Command {
    /// Decode a command from its wire discriminant and parameters.
    ///
    /// # Errors
    ///
    /// - [`CanvasError::UnknownCommand`] for an unrecognised `kind`.
    /// - [`CanvasError::InvalidParams`] if `params` do not fit the kind.
    pub fn parse(kind: &str, params: serde_json::Value) -> CanvasResult<Self> {
        let params = if params.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            params
        };
        let command = match kind {
            "add" => Self::Add(decode(params)?),
            "move" => Self::Move(decode(params)?),
            "rotate" => Self::Rotate(decode(params)?),
            "resize" => Self::Resize(decode(params)?),
            "group" => Self::Group(decode(params)?),
            "ungroup" => Self::Ungroup(decode(params)?),
            "delete" => Self::Delete(decode(params)?),
            "update" => Self::Update(decode(params)?),
            "clear" => Self::Clear,
            "read" => Self::Read(decode(params)?),
            other => return Err(CanvasError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }

    /// Wire discriminant.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Move(_) => "move",
            Self::Rotate(_) => "rotate",
            Self::Resize(_) => "resize",
            Self::Group(_) => "group",
            Self::Ungroup(_) => "ungroup",
            Self::Delete(_) => "delete",
            Self::Update(_) => "update",
            Self::Clear => "clear",
            Self::Read(_) => "read",
        }
    }

    /// Whether a successful run changes the scene.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        !matches!(self, Self::Read(_))
    }
}

fn decode<T: serde::de::DeserializeOwned>(params: serde_json::Value) -> CanvasResult<T> {
    serde_json::from_value(params).map_err(|e| CanvasError::InvalidParams(e.to_string()))
}

/// Kind-specific success fields, flattened into the response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandOutput {
    /// `add`.
    Added {
        /// New element id.
        #[serde(rename = "elementId")]
        element_id: String,
        /// Bound caption id.
        #[serde(rename = "labelId", skip_serializing_if = "Option::is_none")]
        label_id: Option<String>,
    },
    /// `move`.
    Moved {
        /// Elements moved.
        #[serde(rename = "movedCount")]
        moved_count: usize,
    },
    /// `rotate`.
    Rotated {
        /// Non-label elements rotated.
        #[serde(rename = "rotatedCount")]
        rotated_count: usize,
    },
    /// `resize`.
    Resized {
        /// Containers resized.
        #[serde(rename = "resizedCount")]
        resized_count: usize,
    },
    /// `group`.
    Grouped {
        /// The new group id.
        #[serde(rename = "groupId")]
        group_id: String,
    },
    /// `delete`.
    Deleted {
        /// Elements tombstoned.
        #[serde(rename = "deletedCount")]
        deleted_count: usize,
    },
    /// `update`.
    Updated {
        /// The edited element.
        #[serde(rename = "elementId")]
        element_id: String,
    },
    /// `clear`.
    Cleared {
        /// Visible elements removed.
        #[serde(rename = "clearedCount")]
        cleared_count: usize,
    },
    /// `read` in compact form.
    Compact(CompactScene),
    /// `read` in full form.
    Full {
        /// Visible elements as stored.
        elements: Vec<Element>,
    },
}

/// Outcome of one command: always `success`, then `error` or fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResult {
    /// Whether the command applied.
    pub success: bool,
    /// Failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Success fields.
    #[serde(flatten)]
    pub output: Option<CommandOutput>,
}

impl CommandResult {
    /// A success, with optional fields.
    #[must_use]
    pub fn ok(output: Option<CommandOutput>) -> Self {
        Self {
            success: true,
            error: None,
            output,
        }
    }

    /// A failure with a message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            output: None,
        }
    }
}

/// New elements plus the result of producing them.
#[derive(Debug, Clone)]
pub struct Execution {
    /// The element list after the command; equal to the input on failure.
    pub elements: Vec<Element>,
    /// What to report to the controller.
    pub result: CommandResult,
    changed: bool,
}

impl Execution {
    /// Whether `elements` differs from the input and should be written back.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.changed
    }
}

/// Apply a command to an element list without touching the input.
///
/// Errors are reported in the result, never returned: a failed command
/// hands back an unchanged copy of `elements`.
#[must_use]
pub fn execute(
    elements: &[Element],
    command: &Command,
    idgen: &mut dyn IdGenerator,
) -> Execution {
    let mut scene = Scene::from_elements(elements.to_vec());
    match apply(&mut scene, command, idgen) {
        Ok(output) => Execution {
            elements: scene.into_elements(),
            result: CommandResult::ok(output),
            changed: command.is_mutation(),
        },
        Err(e) => {
            tracing::debug!("Command {} failed: {e}", command.name());
            Execution {
                elements: elements.to_vec(),
                result: CommandResult::failed(e.to_string()),
                changed: false,
            }
        }
    }
}

/// Apply a command to a scene in place.
///
/// On error the scene may only have been read, never written: every
/// transform validates before it mutates.
///
/// # Errors
///
/// Returns whatever the dispatched operation rejects.
pub fn apply(
    scene: &mut Scene,
    command: &Command,
    idgen: &mut dyn IdGenerator,
) -> CanvasResult<Option<CommandOutput>> {
    let output = match command {
        Command::Add(spec) => {
            let added = edit::add_element(scene, spec, idgen)?;
            CommandOutput::Added {
                element_id: added.element_id,
                label_id: added.label_id,
            }
        }
        Command::Move(p) => CommandOutput::Moved {
            moved_count: transform::move_elements(
                scene,
                &p.element_ids,
                p.delta_x,
                p.delta_y,
                idgen,
            )?,
        },
        Command::Rotate(p) => CommandOutput::Rotated {
            rotated_count: transform::rotate_elements(scene, &p.element_ids, p.angle, idgen)?,
        },
        Command::Resize(p) => CommandOutput::Resized {
            resized_count: transform::resize_elements(scene, &p.element_ids, p.edges(), idgen)?,
        },
        Command::Group(p) => CommandOutput::Grouped {
            group_id: transform::group_elements(scene, &p.element_ids, idgen)?,
        },
        Command::Ungroup(p) => {
            transform::ungroup_element(scene, &p.element_id, idgen)?;
            return Ok(None);
        }
        Command::Delete(p) => CommandOutput::Deleted {
            deleted_count: transform::delete_elements(scene, &p.element_ids, idgen)?,
        },
        Command::Update(patch) => {
            edit::update_element(scene, patch, idgen)?;
            CommandOutput::Updated {
                element_id: patch.element_id.clone(),
            }
        }
        Command::Clear => CommandOutput::Cleared {
            cleared_count: scene.clear(),
        },
        Command::Read(p) => match p.format {
            ReadFormat::Compact => CommandOutput::Compact(export::compact(
                scene,
                ExportOptions {
                    with_style: p.with_style,
                },
            )),
            ReadFormat::Full => CommandOutput::Full {
                elements: scene.visible().cloned().collect(),
            },
        },
    };
    Ok(Some(output))
}
