//! # Saorsa Canvas Core
//!
//! Scene command engine for a whiteboard drawing.
//! Pure functions over an element list: no I/O, no clock, no global state.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 canvas-core                 │
//! ├─────────────────────────────────────────────┤
//! │  Protocol        │  Command Executor        │
//! │  - Requests      │  - Parse & dispatch      │
//! │  - Responses     │  - Structured results    │
//! ├─────────────────────────────────────────────┤
//! │  Transforms      │  Export                  │
//! │  - Move/Rotate   │  - Compact buckets       │
//! │  - Resize/Group  │  - Rounding              │
//! ├─────────────────────────────────────────────┤
//! │  Scene Store     │  Element Model           │
//! │  - Id index      │  - Bindings & groups     │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod command;
pub mod edit;
pub mod element;
pub mod error;
pub mod export;
pub mod ids;
pub mod protocol;
pub mod scene;
pub mod schema;
pub mod transform;

pub use command::{execute, Command, CommandOutput, CommandResult, Execution, ReadFormat};
pub use edit::{ElementPatch, NewElement, StylePatch};
pub use element::{BindingKind, BoundElement, Element, ElementType};
pub use error::{CanvasError, CanvasResult};
pub use export::{compact, CompactScene, ExportOptions};
pub use ids::{IdGenerator, RandomIds, SequentialIds};
pub use protocol::{CommandRequest, CommandResponse};
pub use scene::Scene;
pub use schema::SceneSnapshot;
pub use transform::ResizeEdges;

/// Canvas core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
