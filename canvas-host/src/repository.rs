//! Scene persistence.
//!
//! A [`SceneRepository`] loads and saves whole [`SceneSnapshot`]s by key.
//! [`FileRepository`] keeps one pretty-printed JSON file per scene under a
//! data directory; [`MemoryRepository`] keeps them in a map.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use canvas_core::SceneSnapshot;
use tokio::sync::RwLock;

use crate::{HostError, HostResult};

/// Load/save access to stored scenes.
#[async_trait]
pub trait SceneRepository: Send + Sync {
    /// Load a scene, or `None` if nothing is stored under `key`.
    async fn load_scene(&self, key: &str) -> HostResult<Option<SceneSnapshot>>;

    /// Store a scene under `key`, replacing any previous one.
    async fn save_scene(&self, key: &str, snapshot: &SceneSnapshot) -> HostResult<()>;
}

/// Load a scene, giving up after `timeout`.
///
/// # Errors
///
/// Returns [`HostError::Timeout`] if the load does not finish in time, or
/// whatever the repository itself reports.
pub async fn load_with_timeout(
    repository: &dyn SceneRepository,
    key: &str,
    timeout: Duration,
) -> HostResult<Option<SceneSnapshot>> {
    tokio::time::timeout(timeout, repository.load_scene(key))
        .await
        .map_err(|_| HostError::Timeout {
            key: key.to_string(),
            timeout,
        })?
}

/// Scenes stored as `<data_dir>/<sanitized key>.json`.
#[derive(Debug, Clone)]
pub struct FileRepository {
    data_dir: PathBuf,
}

impl FileRepository {
    /// Create a repository rooted at `data_dir`.
    ///
    /// The directory is created if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Io`] if the directory cannot be created.
    pub fn new(data_dir: impl Into<PathBuf>) -> HostResult<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    /// The data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the file backing `key`.
    #[must_use]
    pub fn scene_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", sanitize_key(key)))
    }

    /// Keys of every scene file in the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory can't be read.
    pub async fn scene_keys(&self) -> HostResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.data_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl SceneRepository for FileRepository {
    async fn load_scene(&self, key: &str) -> HostResult<Option<SceneSnapshot>> {
        let path = self.scene_path(key);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot = SceneSnapshot::from_json(&contents)?;
        tracing::info!(
            "Loaded scene {key} from {} ({} elements)",
            path.display(),
            snapshot.elements.len()
        );
        Ok(Some(snapshot))
    }

    async fn save_scene(&self, key: &str, snapshot: &SceneSnapshot) -> HostResult<()> {
        let path = self.scene_path(key);
        let json = snapshot.to_json()?;
        // Readers never observe a half-written file.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::debug!("Saved scene {key} to {}", path.display());
        Ok(())
    }
}

/// Scenes kept in memory, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    scenes: Arc<RwLock<HashMap<String, SceneSnapshot>>>,
}

impl MemoryRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a scene.
    pub async fn insert(&self, key: impl Into<String>, snapshot: SceneSnapshot) {
        self.scenes.write().await.insert(key.into(), snapshot);
    }

    /// The stored scene under `key`, if any.
    pub async fn get(&self, key: &str) -> Option<SceneSnapshot> {
        self.scenes.read().await.get(key).cloned()
    }
}

#[async_trait]
impl SceneRepository for MemoryRepository {
    async fn load_scene(&self, key: &str) -> HostResult<Option<SceneSnapshot>> {
        Ok(self.get(key).await)
    }

    async fn save_scene(&self, key: &str, snapshot: &SceneSnapshot) -> HostResult<()> {
        self.insert(key, snapshot.clone()).await;
        Ok(())
    }
}

/// Sanitize a scene key for use as a filename.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
