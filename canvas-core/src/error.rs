//! Error types for scene operations.

use thiserror::Error;

use crate::ElementType;

/// Result type for scene operations.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Errors that can occur while applying commands to a scene.
///
/// The `Display` text of each variant is what a controller sees in the
/// `error` field of a failed command response.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// None of the targeted elements exist (or all are deleted).
    #[error("No elements found")]
    NoElementsFound,

    /// A single addressed element does not exist.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// An element with this id is already in the scene.
    #[error("Duplicate element id: {0}")]
    DuplicateId(String),

    /// Command parameters failed validation before any mutation.
    #[error("{0}")]
    Validation(String),

    /// Resize was requested on an element type that has no box geometry.
    #[error(
        "Cannot resize element {id}: type '{kind}' is not one of rectangle, ellipse, diamond, image"
    )]
    UnsupportedResize {
        /// Offending element id.
        id: String,
        /// Its element type.
        kind: ElementType,
    },

    /// Resize would collapse or invert a dimension.
    #[error("Resize would make {dimension} of element {id} <= 0 (got {value})")]
    InvalidDimension {
        /// Offending element id.
        id: String,
        /// `"width"` or `"height"`.
        dimension: &'static str,
        /// The rejected resulting value.
        value: f64,
    },

    /// Ungroup on an element with no group membership.
    #[error("Element {0} is not in any group")]
    NotGrouped(String),

    /// The command discriminant is not recognised.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Command parameters could not be decoded.
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Scene serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
