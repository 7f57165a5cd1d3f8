//! # Saorsa Canvas Host
//!
//! Runs the canvas command engine against a live scene: holds the
//! authoritative element buffer, serializes command application, persists
//! changes in the background and notifies subscribers.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              CommandDispatcher              │
//! ├─────────────────────────────────────────────┤
//! │  SceneBuffer     │  SceneRepository         │
//! │  - MemoryBuffer  │  - FileRepository        │
//! │                  │  - MemoryRepository      │
//! ├─────────────────────────────────────────────┤
//! │                canvas-core                  │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod buffer;
pub mod dispatcher;
pub mod error;
pub mod repository;

pub use buffer::{MemoryBuffer, SceneBuffer};
pub use dispatcher::{CommandDispatcher, SceneEvent};
pub use error::{HostError, HostResult};
pub use repository::{load_with_timeout, FileRepository, MemoryRepository, SceneRepository};
