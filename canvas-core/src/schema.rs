//! Canonical serialized scene snapshot shared with persistence layers.

use serde::{Deserialize, Serialize};

use crate::{CanvasError, CanvasResult, Element, Scene};

/// A persisted scene: its elements plus host state the engine does not read.
///
/// `elements` keeps tombstones so that a delete survives save cycles that
/// land out of order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSnapshot {
    /// Elements in z-order, tombstones included.
    #[serde(default)]
    pub elements: Vec<Element>,
    /// Opaque host view state.
    #[serde(default)]
    pub app_state: serde_json::Value,
    /// Opaque host binary-file table.
    #[serde(default)]
    pub files: serde_json::Value,
}

impl SceneSnapshot {
    /// Snapshot of a bare element list.
    #[must_use]
    pub fn from_elements(elements: Vec<Element>) -> Self {
        Self {
            elements,
            ..Self::default()
        }
    }

    /// Non-deleted elements.
    pub fn visible_elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| !e.is_deleted)
    }

    /// Materialise the elements as a [`Scene`].
    #[must_use]
    pub fn to_scene(&self) -> Scene {
        Scene::from_elements(self.elements.clone())
    }

    /// Serialize the snapshot to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CanvasResult<String> {
        serde_json::to_string_pretty(self).map_err(CanvasError::Serialization)
    }

    /// Deserialize a snapshot from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_json(json: &str) -> CanvasResult<Self> {
        serde_json::from_str(json).map_err(CanvasError::Serialization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ElementType;

    #[test]
    fn test_snapshot_json_round_trip_keeps_tombstones() {
        let mut gone = Element::new("gone", ElementType::Ellipse, 0.0, 0.0);
        gone.is_deleted = true;
        let mut snapshot = SceneSnapshot::from_elements(vec![
            Element::new("r", ElementType::Rectangle, 1.0, 2.0).with_size(3.0, 4.0),
            gone,
        ]);
        snapshot.app_state = serde_json::json!({ "viewBackgroundColor": "#ffffff" });

        let json = snapshot.to_json().expect("serialize");
        let restored = SceneSnapshot::from_json(&json).expect("deserialize");

        assert_eq!(restored, snapshot);
        assert_eq!(restored.elements.len(), 2);
        assert_eq!(restored.visible_elements().count(), 1);
    }

    #[test]
    fn test_snapshot_accepts_host_file_layout() {
        let json = r#"{
            "type": "excalidraw",
            "version": 2,
            "elements": [{ "id": "a", "type": "diamond", "x": 0, "y": 0 }],
            "appState": {},
            "files": {}
        }"#;
        let snapshot = SceneSnapshot::from_json(json).expect("parse");
        assert_eq!(snapshot.to_scene().len(), 1);
    }

    #[test]
    fn test_invalid_json_is_serialization_error() {
        assert!(matches!(
            SceneSnapshot::from_json("{ not json"),
            Err(CanvasError::Serialization(_))
        ));
    }
}
