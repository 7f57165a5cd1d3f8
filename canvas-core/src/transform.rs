//! Geometric transforms over a [`Scene`].
//!
//! Each transform is a single pass over the scene. Validation always
//! completes before the first element is touched, so a failed transform
//! leaves the scene as it was. Tombstoned elements are never targets.
//!
//! Transforms accumulate: applying the same move twice moves twice.

use std::collections::HashSet;
use std::f64::consts::{PI, SQRT_2};

use crate::{CanvasError, CanvasResult, Element, ElementType, IdGenerator, Scene};

/// Padding between a container's edge and its label, per edge.
pub const LABEL_PADDING: f64 = 5.0;

/// Edge offsets for a resize. Positive grows, negative shrinks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResizeEdges {
    /// Growth of the top edge (upwards).
    pub top: f64,
    /// Growth of the bottom edge (downwards).
    pub bottom: f64,
    /// Growth of the left edge (leftwards).
    pub left: f64,
    /// Growth of the right edge (rightwards).
    pub right: f64,
}

impl ResizeEdges {
    /// True when no edge moves.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_zero(&self) -> bool {
        self.top == 0.0 && self.bottom == 0.0 && self.left == 0.0 && self.right == 0.0
    }
}

/// Ordered, de-duplicated id list.
#[derive(Default)]
struct TargetSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl TargetSet {
    fn insert(&mut self, id: &str) {
        if self.seen.insert(id.to_string()) {
            self.order.push(id.to_string());
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }
}

/// Given ids plus the bound dependents of each given element.
fn with_bound_dependents(scene: &Scene, ids: &[String]) -> TargetSet {
    let mut targets = TargetSet::default();
    for id in ids {
        targets.insert(id);
        if let Some(element) = scene.live(id) {
            for bound in element.bound_ids() {
                targets.insert(bound);
            }
        }
    }
    targets
}

/// Translate elements and their bound dependents.
///
/// Returns the number of live targets moved.
///
/// # Errors
///
/// Returns [`CanvasError::NoElementsFound`] if nothing was moved.
pub fn move_elements(
    scene: &mut Scene,
    ids: &[String],
    delta_x: f64,
    delta_y: f64,
    idgen: &mut dyn IdGenerator,
) -> CanvasResult<usize> {
    let targets = with_bound_dependents(scene, ids);
    let mut moved = 0;
    for id in &targets.order {
        if let Some(element) = scene.live_mut(id) {
            element.x += delta_x;
            element.y += delta_y;
            element.bump(idgen.nonce());
            moved += 1;
        }
    }
    if moved == 0 {
        return Err(CanvasError::NoElementsFound);
    }
    tracing::debug!("Moved {moved} elements by ({delta_x}, {delta_y})");
    Ok(moved)
}

/// Rotate elements, together with everything sharing a group with them.
///
/// The group closure is one hop: members of any group a given element
/// belongs to. Labels are not rotated by the delta; each rotated element's
/// bound text is set to that element's new absolute angle instead.
///
/// Returns the number of non-label elements rotated.
///
/// # Errors
///
/// Returns [`CanvasError::NoElementsFound`] if nothing was rotated.
pub fn rotate_elements(
    scene: &mut Scene,
    ids: &[String],
    degrees: f64,
    idgen: &mut dyn IdGenerator,
) -> CanvasResult<usize> {
    let delta = degrees * PI / 180.0;

    let mut targets = TargetSet::default();
    for id in ids {
        let Some(element) = scene.live(id) else {
            continue;
        };
        targets.insert(id);
        for group_id in &element.group_ids {
            for member in scene.group_members(group_id) {
                if !member.is_deleted {
                    targets.insert(&member.id);
                }
            }
        }
    }

    let mut labels: HashSet<String> = HashSet::new();
    for id in &targets.order {
        let Some(element) = scene.get(id) else {
            continue;
        };
        labels.extend(element.bound_text_ids().map(str::to_string));
        if element
            .container_id
            .as_deref()
            .is_some_and(|owner| element.kind == ElementType::Text && targets.contains(owner))
        {
            labels.insert(id.clone());
        }
    }

    let mut rotated = 0;
    let mut label_angles: Vec<(String, f64)> = Vec::new();
    for id in targets.order.iter().filter(|id| !labels.contains(*id)) {
        let Some(element) = scene.live_mut(id) else {
            continue;
        };
        element.angle += delta;
        element.bump(idgen.nonce());
        rotated += 1;
        let angle = element.angle;
        label_angles.extend(element.bound_text_ids().map(|t| (t.to_string(), angle)));
    }

    for (label_id, angle) in label_angles {
        if let Some(label) = scene.live_mut(&label_id) {
            if label.kind == ElementType::Text {
                label.angle = angle;
                label.bump(idgen.nonce());
            }
        }
    }

    if rotated == 0 {
        return Err(CanvasError::NoElementsFound);
    }
    tracing::debug!("Rotated {rotated} elements by {degrees} degrees");
    Ok(rotated)
}

/// Grow or shrink box elements edge by edge.
///
/// The untouched edges stay fixed on screen regardless of rotation: the
/// origin shift `(-left, -top)` is rotated by the element's angle. Bound
/// labels are re-centred inside the resized container.
///
/// Returns the number of containers resized (labels are not counted).
///
/// # Errors
///
/// - [`CanvasError::Validation`] if every edge offset is zero.
/// - [`CanvasError::NoElementsFound`] if no target exists.
/// - [`CanvasError::UnsupportedResize`] if a target is not a box type.
/// - [`CanvasError::InvalidDimension`] if a size would drop to zero or below.
pub fn resize_elements(
    scene: &mut Scene,
    ids: &[String],
    edges: ResizeEdges,
    idgen: &mut dyn IdGenerator,
) -> CanvasResult<usize> {
    if edges.is_zero() {
        return Err(CanvasError::Validation(
            "At least one of top, bottom, left, right must be non-zero".to_string(),
        ));
    }

    let mut targets = TargetSet::default();
    for id in ids {
        if scene.live(id).is_some() {
            targets.insert(id);
        }
    }
    if targets.order.is_empty() {
        return Err(CanvasError::NoElementsFound);
    }

    let mut plan: Vec<(String, Option<f64>, Option<f64>)> = Vec::with_capacity(targets.order.len());
    for id in &targets.order {
        let Some(element) = scene.live(id) else {
            continue;
        };
        if !element.kind.is_resizable() {
            return Err(CanvasError::UnsupportedResize {
                id: id.clone(),
                kind: element.kind.clone(),
            });
        }
    }
    for id in &targets.order {
        let Some(element) = scene.live(id) else {
            continue;
        };
        let width = resized_dimension(id, "width", element.width, edges.left + edges.right)?;
        let height = resized_dimension(id, "height", element.height, edges.top + edges.bottom)?;
        plan.push((id.clone(), width, height));
    }

    let mut resized = 0;
    for (id, width, height) in plan {
        let Some(element) = scene.live_mut(&id) else {
            continue;
        };
        let (sin, cos) = element.angle.sin_cos();
        let (dx, dy) = (-edges.left, -edges.top);
        element.x += dx * cos - dy * sin;
        element.y += dx * sin + dy * cos;
        element.width = width;
        element.height = height;
        element.bump(idgen.nonce());
        resized += 1;

        let container = element.clone();
        for label_id in container.bound_text_ids() {
            if let Some(label) = scene.live_mut(label_id) {
                layout_label(&container, label);
                label.bump(idgen.nonce());
            }
        }
    }

    tracing::debug!("Resized {resized} elements by {edges:?}");
    Ok(resized)
}

/// New size of one dimension, or the old one if no edge on that axis moves.
///
/// An unknown size counts as zero once it is grown or shrunk.
#[allow(clippy::float_cmp)]
fn resized_dimension(
    id: &str,
    dimension: &'static str,
    current: Option<f64>,
    growth: f64,
) -> CanvasResult<Option<f64>> {
    if growth == 0.0 {
        return Ok(current);
    }
    let value = current.unwrap_or(0.0) + growth;
    if value <= 0.0 {
        return Err(CanvasError::InvalidDimension {
            id: id.to_string(),
            dimension,
            value,
        });
    }
    Ok(Some(value))
}

/// Extra inset keeping a label inside the inscribed area of a container.
fn shape_inset(kind: &ElementType, width: f64, height: f64) -> (f64, f64) {
    match kind {
        ElementType::Ellipse => {
            let factor = 1.0 - SQRT_2 / 2.0;
            (width / 2.0 * factor, height / 2.0 * factor)
        }
        ElementType::Diamond => (width / 4.0, height / 4.0),
        _ => (0.0, 0.0),
    }
}

/// Centre a label inside its container's padded, inset text area.
pub fn layout_label(container: &Element, label: &mut Element) {
    let width = container.width.unwrap_or(0.0);
    let height = container.height.unwrap_or(0.0);
    let (inset_x, inset_y) = shape_inset(&container.kind, width, height);

    let area_x = container.x + LABEL_PADDING + inset_x;
    let area_y = container.y + LABEL_PADDING + inset_y;
    let area_width = width - 2.0 * (LABEL_PADDING + inset_x);
    let area_height = height - 2.0 * (LABEL_PADDING + inset_y);

    label.x = area_x + (area_width - label.width.unwrap_or(0.0)) / 2.0;
    label.y = area_y + (area_height - label.height.unwrap_or(0.0)) / 2.0;
}

/// Put elements into one fresh group.
///
/// Returns the new group id.
///
/// # Errors
///
/// - [`CanvasError::Validation`] if fewer than two ids are given. Ids are
///   counted as given; a repeated id is grouped once.
/// - [`CanvasError::NoElementsFound`] if none of them exist.
pub fn group_elements(
    scene: &mut Scene,
    ids: &[String],
    idgen: &mut dyn IdGenerator,
) -> CanvasResult<String> {
    if ids.len() < 2 {
        return Err(CanvasError::Validation(
            "At least 2 elements required for grouping".to_string(),
        ));
    }
    let mut targets = TargetSet::default();
    for id in ids {
        targets.insert(id);
    }
    if !targets.order.iter().any(|id| scene.live(id).is_some()) {
        return Err(CanvasError::NoElementsFound);
    }

    let group_id = idgen.group_id();
    for id in &targets.order {
        if let Some(element) = scene.live_mut(id) {
            element.group_ids.push(group_id.clone());
            element.bump(idgen.nonce());
        }
    }
    tracing::debug!("Created group {group_id}");
    Ok(group_id)
}

/// Remove the most recently added group from a single element.
///
/// Other members of that group keep their membership.
///
/// Returns the group id that was removed.
///
/// # Errors
///
/// - [`CanvasError::ElementNotFound`] if the element does not exist.
/// - [`CanvasError::NotGrouped`] if it belongs to no group.
pub fn ungroup_element(
    scene: &mut Scene,
    id: &str,
    idgen: &mut dyn IdGenerator,
) -> CanvasResult<String> {
    let element = scene
        .live_mut(id)
        .ok_or_else(|| CanvasError::ElementNotFound(id.to_string()))?;
    let group_id = element
        .group_ids
        .pop()
        .ok_or_else(|| CanvasError::NotGrouped(id.to_string()))?;
    element.bump(idgen.nonce());
    tracing::debug!("Removed {id} from group {group_id}");
    Ok(group_id)
}

/// Tombstone elements and their bound dependents.
///
/// Returns the number of elements flipped to deleted.
///
/// # Errors
///
/// Returns [`CanvasError::NoElementsFound`] if nothing was flipped.
pub fn delete_elements(
    scene: &mut Scene,
    ids: &[String],
    idgen: &mut dyn IdGenerator,
) -> CanvasResult<usize> {
    let targets = with_bound_dependents(scene, ids);
    let mut deleted = 0;
    for id in &targets.order {
        if let Some(element) = scene.live_mut(id) {
            element.is_deleted = true;
            element.bump(idgen.nonce());
            deleted += 1;
        }
    }
    if deleted == 0 {
        return Err(CanvasError::NoElementsFound);
    }
    tracing::debug!("Deleted {deleted} elements");
    Ok(deleted)
}
