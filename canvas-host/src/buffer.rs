//! The authoritative in-memory element list a dispatcher reads and writes.

use std::sync::Arc;

use async_trait::async_trait;
use canvas_core::Element;
use tokio::sync::RwLock;

/// Where the live element list lives.
///
/// A browser bridge, a native renderer or a plain vector can all sit behind
/// this trait; the dispatcher only ever reads the whole list and writes a
/// whole new one back.
#[async_trait]
pub trait SceneBuffer: Send + Sync {
    /// Current elements, tombstones included.
    async fn get_elements(&self) -> Vec<Element>;

    /// Replace the elements.
    async fn apply_elements(&self, elements: Vec<Element>);
}

/// A [`SceneBuffer`] over a shared vector.
#[derive(Debug, Clone, Default)]
pub struct MemoryBuffer {
    elements: Arc<RwLock<Vec<Element>>>,
}

impl MemoryBuffer {
    /// Create a buffer holding `elements`.
    #[must_use]
    pub fn new(elements: Vec<Element>) -> Self {
        Self {
            elements: Arc::new(RwLock::new(elements)),
        }
    }
}

#[async_trait]
impl SceneBuffer for MemoryBuffer {
    async fn get_elements(&self) -> Vec<Element> {
        self.elements.read().await.clone()
    }

    async fn apply_elements(&self, elements: Vec<Element>) {
        *self.elements.write().await = elements;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_core::ElementType;

    #[tokio::test]
    async fn test_clones_share_the_same_list() {
        let buffer = MemoryBuffer::default();
        let view = buffer.clone();

        buffer
            .apply_elements(vec![Element::new("a", ElementType::Rectangle, 0.0, 0.0)])
            .await;

        let elements = view.get_elements().await;
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].id, "a");
    }
}
