//! Ordered command dispatch against a shared scene.
//!
//! ```text
//!   request ─► parse ─► lock ─► buffer.get ─► execute ─► buffer.apply ─► unlock ─► response
//!                                                             │
//!                                   save worker ◄─────────────┤ (latest wins, off the hot path)
//!                                   subscribers ◄─────────────┘ SceneEvent
//! ```
//!
//! Commands are applied one at a time, in the order they take the lock.
//! Persistence is queued to a single background task so saves land in the
//! same order as the commands that produced them, without delaying the next
//! command. Snapshots queued behind a slow write collapse into the newest.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use canvas_core::{
    execute, CommandRequest, CommandResponse, CommandResult, Element, IdGenerator, SceneSnapshot,
};
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};

use crate::buffer::{MemoryBuffer, SceneBuffer};
use crate::repository::{load_with_timeout, SceneRepository};
use crate::HostResult;

/// Capacity of the scene event channel.
const EVENT_CAPACITY: usize = 100;

/// Message used when a panic payload carries no text.
const UNKNOWN_ERROR: &str = "Unknown error";

/// Notification sent after a command changed the scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneEvent {
    /// The command that produced the change.
    pub command: &'static str,
    /// Non-deleted elements after the change.
    pub element_count: usize,
}

enum SaveJob {
    Save(SceneSnapshot),
    Flush(oneshot::Sender<()>),
}

/// Persistence target of a dispatcher plus the host state stored beside the elements.
struct Saver {
    tx: mpsc::UnboundedSender<SaveJob>,
    app_state: serde_json::Value,
    files: serde_json::Value,
}

impl Saver {
    fn spawn(
        repository: Arc<dyn SceneRepository>,
        key: String,
        app_state: serde_json::Value,
        files: serde_json::Value,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(save_worker(repository, key, rx));
        Self {
            tx,
            app_state,
            files,
        }
    }

    fn enqueue(&self, elements: Vec<Element>) {
        let snapshot = SceneSnapshot {
            elements,
            app_state: self.app_state.clone(),
            files: self.files.clone(),
        };
        if self.tx.send(SaveJob::Save(snapshot)).is_err() {
            tracing::warn!("Save worker stopped; scene change not persisted");
        }
    }
}

/// Write queued snapshots in order.
///
/// Jobs that piled up during a write are drained together: only the newest
/// snapshot is written, then every flush waiting behind it is released.
async fn save_worker(
    repository: Arc<dyn SceneRepository>,
    key: String,
    mut rx: mpsc::UnboundedReceiver<SaveJob>,
) {
    while let Some(job) = rx.recv().await {
        let mut latest = None;
        let mut waiters = Vec::new();
        let mut next = Some(job);
        while let Some(job) = next {
            match job {
                SaveJob::Save(snapshot) => latest = Some(snapshot),
                SaveJob::Flush(done) => waiters.push(done),
            }
            next = rx.try_recv().ok();
        }

        if let Some(snapshot) = latest {
            if let Err(e) = repository.save_scene(&key, &snapshot).await {
                tracing::warn!("Failed to persist scene {key}: {e}");
            }
        }
        for done in waiters {
            let _ = done.send(());
        }
    }
    tracing::debug!("Save worker for scene {key} exiting");
}

/// Applies commands to one scene, one at a time.
///
/// There is no global instance: each dispatcher is an explicit handle onto
/// its buffer, optional repository and id source.
pub struct CommandDispatcher {
    buffer: Arc<dyn SceneBuffer>,
    ids: Mutex<Box<dyn IdGenerator + Send>>,
    saver: Option<Saver>,
    events: broadcast::Sender<SceneEvent>,
}

impl CommandDispatcher {
    /// Create a dispatcher over a buffer, without persistence.
    #[must_use]
    pub fn new(buffer: Arc<dyn SceneBuffer>, ids: Box<dyn IdGenerator + Send>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            buffer,
            ids: Mutex::new(ids),
            saver: None,
            events,
        }
    }

    /// Load a stored scene and open a dispatcher that persists back to it.
    ///
    /// A missing scene starts empty. Bindings are reconciled once on load;
    /// commands never do it again. Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or exceeds `load_timeout`.
    pub async fn open(
        repository: Arc<dyn SceneRepository>,
        key: impl Into<String>,
        mut ids: Box<dyn IdGenerator + Send>,
        load_timeout: Duration,
    ) -> HostResult<Self> {
        let key = key.into();
        let snapshot = load_with_timeout(repository.as_ref(), &key, load_timeout)
            .await?
            .unwrap_or_default();

        let mut scene = snapshot.to_scene();
        let repaired = scene.reconcile_bindings(&mut *ids);
        if repaired > 0 {
            tracing::info!("Reconciled {repaired} bindings in scene {key}");
        }
        tracing::info!(
            "Opened scene {key} with {} visible elements",
            scene.visible_count()
        );

        let buffer = MemoryBuffer::new(scene.into_elements());
        let saver = Saver::spawn(repository, key, snapshot.app_state, snapshot.files);
        let mut dispatcher = Self::new(Arc::new(buffer), ids);
        dispatcher.saver = Some(saver);
        Ok(dispatcher)
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SceneEvent> {
        self.events.subscribe()
    }

    /// Current elements, tombstones included.
    pub async fn elements(&self) -> Vec<Element> {
        self.buffer.get_elements().await
    }

    /// Apply one request and answer it.
    ///
    /// Never fails: parse errors, rejected commands and engine panics all
    /// come back as `success: false` responses.
    pub async fn dispatch(&self, request: CommandRequest) -> CommandResponse {
        let command = match request.command() {
            Ok(command) => command,
            Err(e) => return CommandResponse::rejected(&request, e.to_string()),
        };
        tracing::debug!("Dispatching {} {:?}", command.name(), request.id);

        let mut ids = self.ids.lock().await;
        let elements = self.buffer.get_elements().await;

        let outcome = {
            let idgen: &mut dyn IdGenerator = &mut **ids;
            std::panic::catch_unwind(AssertUnwindSafe(|| execute(&elements, &command, idgen)))
        };
        let execution = match outcome {
            Ok(execution) => execution,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!("Command {} panicked: {message}", command.name());
                return CommandResponse::new(&request, CommandResult::failed(message));
            }
        };

        if execution.changed() {
            let element_count = execution.elements.iter().filter(|e| !e.is_deleted).count();
            if let Some(saver) = &self.saver {
                saver.enqueue(execution.elements.clone());
            }
            self.buffer.apply_elements(execution.elements).await;
            // No subscribers is fine.
            let _ = self.events.send(SceneEvent {
                command: command.name(),
                element_count,
            });
        }
        drop(ids);

        CommandResponse::new(&request, execution.result)
    }

    /// Parse a raw JSON request and dispatch it.
    ///
    /// Malformed JSON yields a failure response with a null id.
    pub async fn dispatch_json(&self, raw: &str) -> CommandResponse {
        match serde_json::from_str::<CommandRequest>(raw) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => {
                tracing::debug!("Rejected malformed request: {e}");
                let request = CommandRequest::new(
                    String::new(),
                    serde_json::Value::Null,
                    serde_json::Value::Null,
                );
                CommandResponse::rejected(&request, format!("Invalid request: {e}"))
            }
        }
    }

    /// Wait until every save queued so far has been written.
    pub async fn flush(&self) {
        let Some(saver) = &self.saver else {
            return;
        };
        let (done_tx, done_rx) = oneshot::channel();
        if saver.tx.send(SaveJob::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("persistent", &self.saver.is_some())
            .field("subscribers", &self.events.receiver_count())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        UNKNOWN_ERROR.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_core::SequentialIds;

    #[test]
    fn test_panic_message_variants() {
        let boxed: Box<dyn Any + Send> = Box::new("static text");
        assert_eq!(panic_message(boxed.as_ref()), "static text");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned text"));
        assert_eq!(panic_message(boxed.as_ref()), "owned text");

        let boxed: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(boxed.as_ref()), "Unknown error");
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let dispatcher = CommandDispatcher::new(
            Arc::new(MemoryBuffer::default()),
            Box::new(SequentialIds::new()),
        );
        let response = dispatcher.dispatch_json("{ not json").await;
        assert!(!response.result.success);
        assert!(response
            .result
            .error
            .as_deref()
            .unwrap_or_default()
            .starts_with("Invalid request"));
        assert!(response.id.is_null());
    }

    #[tokio::test]
    async fn test_flush_without_persistence_returns() {
        let dispatcher = CommandDispatcher::new(
            Arc::new(MemoryBuffer::default()),
            Box::new(SequentialIds::new()),
        );
        dispatcher.flush().await;
    }
}
