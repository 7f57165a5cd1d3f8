//! Scene store: the ordered element collection with id and group indexes.

use std::cell::OnceCell;
use std::collections::{BTreeSet, HashMap};

use crate::{CanvasError, CanvasResult, Element, ElementType, IdGenerator};

/// The current elements of a drawing, in z-order.
///
/// Elements are addressed by their string id through an index kept in step
/// with the backing vector. Group membership is derived from `groupIds` and
/// cached until the next mutable access.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// All elements, tombstones included, in z-order.
    elements: Vec<Element>,
    /// Element id -> position in `elements`.
    index: HashMap<String, usize>,
    /// Group id -> member positions in scan order, built on demand.
    groups: OnceCell<HashMap<String, Vec<usize>>>,
}

impl Scene {
    /// Create an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a scene from an element list, keeping its order.
    ///
    /// If an id appears twice only the first occurrence is addressable.
    #[must_use]
    pub fn from_elements(elements: Vec<Element>) -> Self {
        let mut index = HashMap::with_capacity(elements.len());
        for (pos, element) in elements.iter().enumerate() {
            if index.contains_key(&element.id) {
                tracing::warn!("Duplicate element id in scene: {}", element.id);
                continue;
            }
            index.insert(element.id.clone(), pos);
        }
        Self {
            elements,
            index,
            groups: OnceCell::new(),
        }
    }

    /// Give back the element list.
    #[must_use]
    pub fn into_elements(self) -> Vec<Element> {
        self.elements
    }

    /// All elements, tombstones included.
    #[must_use]
    pub fn as_slice(&self) -> &[Element] {
        &self.elements
    }

    /// Append an element on top of the z-order.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::DuplicateId`] if the id is already taken.
    pub fn push(&mut self, element: Element) -> CanvasResult<()> {
        if self.index.contains_key(&element.id) {
            return Err(CanvasError::DuplicateId(element.id));
        }
        self.groups.take();
        self.index.insert(element.id.clone(), self.elements.len());
        self.elements.push(element);
        Ok(())
    }

    /// Get an element by id, tombstones included.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Element> {
        self.index.get(id).map(|&pos| &self.elements[pos])
    }

    /// Get a mutable reference to an element by id, tombstones included.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Element> {
        let pos = *self.index.get(id)?;
        self.groups.take();
        Some(&mut self.elements[pos])
    }

    /// Get a non-deleted element by id.
    #[must_use]
    pub fn live(&self, id: &str) -> Option<&Element> {
        self.get(id).filter(|e| !e.is_deleted)
    }

    /// Get a mutable reference to a non-deleted element by id.
    pub fn live_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.get_mut(id).filter(|e| !e.is_deleted)
    }

    /// Whether an element with this id exists, deleted or not.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All elements, tombstones included.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    /// Non-deleted elements.
    pub fn visible(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| !e.is_deleted)
    }

    /// Number of elements, tombstones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Number of non-deleted elements.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.visible().count()
    }

    /// Check if the scene holds no elements at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Members of a group in scan order, tombstones included.
    pub fn group_members(&self, group_id: &str) -> impl Iterator<Item = &Element> {
        self.group_index()
            .get(group_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|&pos| &self.elements[pos])
    }

    fn group_index(&self) -> &HashMap<String, Vec<usize>> {
        self.groups.get_or_init(|| {
            let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
            for (pos, element) in self.elements.iter().enumerate() {
                for group_id in &element.group_ids {
                    groups.entry(group_id.clone()).or_default().push(pos);
                }
            }
            groups
        })
    }

    /// Drop every element outright. Returns how many were visible.
    pub fn clear(&mut self) -> usize {
        let visible = self.visible_count();
        self.elements.clear();
        self.index.clear();
        self.groups.take();
        visible
    }

    /// Make the container side of text bindings authoritative.
    ///
    /// - `boundElements` entries pointing at missing elements are dropped.
    /// - Text listed by a container gets `containerId` set to it.
    /// - Text whose `containerId` is not backed by a listing container is unbound.
    ///
    /// Every element touched is bumped, in scene order. Returns the number of
    /// elements changed.
    pub fn reconcile_bindings(&mut self, ids: &mut dyn IdGenerator) -> usize {
        let mut changed: BTreeSet<usize> = BTreeSet::new();

        let index = &self.index;
        for (pos, element) in self.elements.iter_mut().enumerate() {
            let before = element.bound_elements.len();
            element
                .bound_elements
                .retain(|bound| index.contains_key(&bound.id));
            if element.bound_elements.len() != before {
                changed.insert(pos);
            }
        }

        let mut owners: HashMap<String, String> = HashMap::new();
        for element in &self.elements {
            for text_id in element.bound_text_ids() {
                owners
                    .entry(text_id.to_string())
                    .or_insert_with(|| element.id.clone());
            }
        }

        for (pos, element) in self.elements.iter_mut().enumerate() {
            if element.kind != ElementType::Text {
                continue;
            }
            let owner = owners.get(&element.id);
            if element.container_id.as_ref() != owner {
                element.container_id = owner.cloned();
                changed.insert(pos);
            }
        }

        for &pos in &changed {
            self.elements[pos].bump(ids.nonce());
        }
        if !changed.is_empty() {
            self.groups.take();
            tracing::debug!("Reconciled bindings on {} elements", changed.len());
        }
        changed.len()
    }
}

impl From<Vec<Element>> for Scene {
    fn from(elements: Vec<Element>) -> Self {
        Self::from_elements(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoundElement, SequentialIds};

    fn rect(id: &str) -> Element {
        Element::new(id, ElementType::Rectangle, 0.0, 0.0).with_size(100.0, 50.0)
    }

    #[test]
    fn test_scene_push_and_lookup() {
        let mut scene = Scene::new();
        assert!(scene.is_empty());

        scene.push(rect("a")).expect("push a");
        scene.push(rect("b")).expect("push b");

        assert_eq!(scene.len(), 2);
        assert!(scene.get("a").is_some());
        assert!(scene.get("missing").is_none());
        let order: Vec<_> = scene.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn test_push_rejects_duplicate_id() {
        let mut scene = Scene::new();
        scene.push(rect("a")).expect("push");
        assert!(matches!(
            scene.push(rect("a")),
            Err(CanvasError::DuplicateId(id)) if id == "a"
        ));
    }

    #[test]
    fn test_live_skips_tombstones() {
        let mut deleted = rect("gone");
        deleted.is_deleted = true;
        let scene = Scene::from_elements(vec![rect("a"), deleted]);

        assert!(scene.get("gone").is_some());
        assert!(scene.live("gone").is_none());
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.visible_count(), 1);
    }

    #[test]
    fn test_group_members_in_scan_order() {
        let scene = Scene::from_elements(vec![
            rect("a").with_groups(["g1"]),
            rect("b"),
            rect("c").with_groups(["g2", "g1"]),
        ]);
        let members: Vec<_> = scene.group_members("g1").map(|e| e.id.as_str()).collect();
        assert_eq!(members, vec!["a", "c"]);
        assert_eq!(scene.group_members("nope").count(), 0);
    }

    #[test]
    fn test_group_index_invalidated_on_mutation() {
        let mut scene = Scene::from_elements(vec![rect("a").with_groups(["g1"]), rect("b")]);
        assert_eq!(scene.group_members("g1").count(), 1);

        scene
            .get_mut("b")
            .expect("b exists")
            .group_ids
            .push("g1".to_string());
        assert_eq!(scene.group_members("g1").count(), 2);
    }

    #[test]
    fn test_clear_empties_without_tombstones() {
        let mut scene = Scene::from_elements(vec![rect("a"), rect("b")]);
        assert_eq!(scene.clear(), 2);
        assert!(scene.is_empty());
        assert!(!scene.contains("a"));
    }

    #[test]
    fn test_reconcile_sets_container_from_bound_elements() {
        let mut ids = SequentialIds::new();
        let mut scene = Scene::from_elements(vec![
            rect("box").with_bound(BoundElement::text("label")),
            Element::new("label", ElementType::Text, 0.0, 0.0).with_text("hi"),
        ]);

        assert_eq!(scene.reconcile_bindings(&mut ids), 1);
        let label = scene.get("label").expect("label");
        assert_eq!(label.container_id.as_deref(), Some("box"));
        assert_eq!(label.version, 2);
    }

    #[test]
    fn test_reconcile_clears_unbacked_container_and_dangling_binding() {
        let mut ids = SequentialIds::new();
        let mut scene = Scene::from_elements(vec![
            rect("box").with_bound(BoundElement::text("ghost")),
            Element::new("orphan", ElementType::Text, 0.0, 0.0)
                .with_text("hi")
                .with_container("box"),
        ]);

        assert_eq!(scene.reconcile_bindings(&mut ids), 2);
        assert!(scene.get("box").expect("box").bound_elements.is_empty());
        assert!(scene.get("orphan").expect("orphan").container_id.is_none());
    }

    #[test]
    fn test_reconcile_consistent_scene_is_untouched() {
        let mut ids = SequentialIds::new();
        let mut scene = Scene::from_elements(vec![
            rect("box").with_bound(BoundElement::text("label")),
            Element::new("label", ElementType::Text, 0.0, 0.0).with_container("box"),
        ]);
        assert_eq!(scene.reconcile_bindings(&mut ids), 0);
        assert_eq!(scene.get("box").expect("box").version, 1);
    }

    #[test]
    fn test_reconcile_assigns_nonces_in_scene_order() {
        let mut ids = SequentialIds::new();
        let mut scene = Scene::from_elements(vec![
            rect("a").with_bound(BoundElement::text("gone-a")),
            rect("b").with_bound(BoundElement::text("gone-b")),
            rect("c").with_bound(BoundElement::text("gone-c")),
            Element::new("stray", ElementType::Text, 0.0, 0.0).with_container("c"),
        ]);

        assert_eq!(scene.reconcile_bindings(&mut ids), 4);
        let nonces: Vec<u32> = ["a", "b", "c", "stray"]
            .iter()
            .map(|id| scene.get(id).expect("element").version_nonce)
            .collect();
        assert_eq!(nonces, vec![1, 2, 3, 4]);
    }
}
