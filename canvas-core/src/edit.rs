//! Element creation and property edits.

use serde::{Deserialize, Serialize};

use crate::transform::layout_label;
use crate::{
    BoundElement, CanvasError, CanvasResult, Element, ElementType, IdGenerator, Scene,
};

/// Font size used when none is given.
pub const DEFAULT_FONT_SIZE: f64 = 20.0;
/// Box size used for shapes and images created without one.
pub const DEFAULT_SHAPE_SIZE: f64 = 100.0;
/// Approximate glyph advance as a fraction of the font size.
const CHAR_WIDTH_FACTOR: f64 = 0.6;
/// Line height as a multiple of the font size.
const LINE_HEIGHT: f64 = 1.25;

/// Description of an element to create.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewElement {
    /// Element type.
    #[serde(rename = "type")]
    pub kind: ElementType,
    /// Origin X.
    #[serde(default)]
    pub x: f64,
    /// Origin Y.
    #[serde(default)]
    pub y: f64,
    /// Box width (shapes and images).
    #[serde(default)]
    pub width: Option<f64>,
    /// Box height (shapes and images).
    #[serde(default)]
    pub height: Option<f64>,
    /// Local points (lines and arrows); must start at `[0, 0]`.
    #[serde(default)]
    pub points: Option<Vec<[f64; 2]>>,
    /// Text content (required for text).
    #[serde(default)]
    pub text: Option<String>,
    /// Font size for text and labels.
    #[serde(default)]
    pub font_size: Option<f64>,
    /// Image content reference (required for images).
    #[serde(default)]
    pub file_id: Option<String>,
    /// Style overrides.
    #[serde(flatten)]
    pub style: StylePatch,
    /// Free-form note stored in `customData.note`.
    #[serde(default)]
    pub note: Option<String>,
    /// Caption to bind inside a rectangle, ellipse or diamond.
    #[serde(default)]
    pub label: Option<String>,
}

impl NewElement {
    /// A bare description of the given type at the origin.
    #[must_use]
    pub fn new(kind: ElementType) -> Self {
        Self {
            kind,
            x: 0.0,
            y: 0.0,
            width: None,
            height: None,
            points: None,
            text: None,
            font_size: None,
            file_id: None,
            style: StylePatch::default(),
            note: None,
            label: None,
        }
    }
}

/// Optional style fields; absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylePatch {
    /// Stroke colour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    /// Fill colour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    /// Stroke width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    /// Stroke style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_style: Option<String>,
    /// Fill style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_style: Option<String>,
}

impl StylePatch {
    /// True when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn apply(&self, element: &mut Element) {
        if let Some(color) = &self.stroke_color {
            element.stroke_color.clone_from(color);
        }
        if let Some(color) = &self.background_color {
            element.background_color.clone_from(color);
        }
        if let Some(width) = self.stroke_width {
            element.stroke_width = width;
        }
        if let Some(style) = &self.stroke_style {
            element.stroke_style.clone_from(style);
        }
        if let Some(style) = &self.fill_style {
            element.fill_style.clone_from(style);
        }
    }
}

/// Changes to an existing element.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementPatch {
    /// Element to edit.
    pub element_id: String,
    /// New text content (text elements only).
    #[serde(default)]
    pub text: Option<String>,
    /// New note.
    #[serde(default)]
    pub note: Option<String>,
    /// Style overrides.
    #[serde(flatten)]
    pub style: StylePatch,
}

/// Ids produced by [`add_element`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Added {
    /// The new element.
    pub element_id: String,
    /// Its bound caption, if one was requested.
    pub label_id: Option<String>,
}

/// Estimated box of rendered text.
#[allow(clippy::cast_precision_loss)]
fn measure_text(text: &str, font_size: f64) -> (f64, f64) {
    let lines = text.lines().count().max(1);
    let widest = text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
    (
        widest as f64 * font_size * CHAR_WIDTH_FACTOR,
        lines as f64 * font_size * LINE_HEIGHT,
    )
}

fn text_element(id: String, text: &str, font_size: f64, x: f64, y: f64) -> Element {
    let (width, height) = measure_text(text, font_size);
    let mut element = Element::new(id, ElementType::Text, x, y).with_size(width, height);
    element.text = Some(text.to_string());
    element.font_size = Some(font_size);
    element
}

fn positive(value: Option<f64>, name: &str) -> CanvasResult<Option<f64>> {
    match value {
        Some(v) if v <= 0.0 => Err(CanvasError::Validation(format!(
            "{name} must be > 0 (got {v})"
        ))),
        other => Ok(other),
    }
}

fn unsupported_type(kind: &str) -> CanvasError {
    CanvasError::Validation(format!("Cannot add elements of type '{kind}'"))
}

/// Create an element with a fresh id and default style.
///
/// Shapes and images default to a 100x100 box, lines and arrows to a single
/// 100-unit horizontal segment, and text is sized from its content.
///
/// # Errors
///
/// Returns [`CanvasError::Validation`] when required content is missing,
/// sizes are not positive, points do not start at `[0, 0]`, or a label is
/// requested on a type that cannot hold one. Types outside the seven the
/// engine knows are rejected.
pub fn add_element(
    scene: &mut Scene,
    spec: &NewElement,
    idgen: &mut dyn IdGenerator,
) -> CanvasResult<Added> {
    let width = positive(spec.width, "width")?;
    let height = positive(spec.height, "height")?;
    let font_size = positive(spec.font_size, "fontSize")?.unwrap_or(DEFAULT_FONT_SIZE);
    if let ElementType::Other(kind) = &spec.kind {
        return Err(unsupported_type(kind));
    }
    if spec.label.is_some() && !spec.kind.can_contain_text() {
        return Err(CanvasError::Validation(format!(
            "Element type '{}' cannot hold a label",
            spec.kind
        )));
    }

    let id = idgen.element_id();
    let mut element = match &spec.kind {
        ElementType::Text => {
            let text = spec.text.as_deref().ok_or_else(|| {
                CanvasError::Validation("Text elements require 'text'".to_string())
            })?;
            text_element(id, text, font_size, spec.x, spec.y)
        }
        ElementType::Line | ElementType::Arrow => {
            let points = spec
                .points
                .clone()
                .unwrap_or_else(|| vec![[0.0, 0.0], [DEFAULT_SHAPE_SIZE, 0.0]]);
            if points.len() < 2 {
                return Err(CanvasError::Validation(
                    "Lines require at least 2 points".to_string(),
                ));
            }
            if points[0] != [0.0, 0.0] {
                return Err(CanvasError::Validation(
                    "The first point must be [0, 0]".to_string(),
                ));
            }
            let (min_x, max_x, min_y, max_y) = points.iter().fold(
                (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
                |(lx, hx, ly, hy), p| (lx.min(p[0]), hx.max(p[0]), ly.min(p[1]), hy.max(p[1])),
            );
            Element::new(id, spec.kind.clone(), spec.x, spec.y)
                .with_size(max_x - min_x, max_y - min_y)
                .with_points(points)
        }
        ElementType::Image => {
            let file_id = spec.file_id.clone().ok_or_else(|| {
                CanvasError::Validation("Image elements require 'fileId'".to_string())
            })?;
            let mut element = Element::new(id, spec.kind.clone(), spec.x, spec.y).with_size(
                width.unwrap_or(DEFAULT_SHAPE_SIZE),
                height.unwrap_or(DEFAULT_SHAPE_SIZE),
            );
            element.file_id = Some(file_id);
            element
        }
        ElementType::Rectangle | ElementType::Ellipse | ElementType::Diamond => {
            Element::new(id, spec.kind.clone(), spec.x, spec.y).with_size(
                width.unwrap_or(DEFAULT_SHAPE_SIZE),
                height.unwrap_or(DEFAULT_SHAPE_SIZE),
            )
        }
        ElementType::Other(kind) => return Err(unsupported_type(kind)),
    };
    spec.style.apply(&mut element);
    if let Some(note) = &spec.note {
        element.set_note(note.clone());
    }
    element.version_nonce = idgen.nonce();

    let label = match &spec.label {
        Some(caption) => {
            let mut label = text_element(idgen.element_id(), caption, font_size, 0.0, 0.0);
            label.container_id = Some(element.id.clone());
            label.version_nonce = idgen.nonce();
            element.bound_elements.push(BoundElement::text(label.id.clone()));
            layout_label(&element, &mut label);
            Some(label)
        }
        None => None,
    };

    let added = Added {
        element_id: element.id.clone(),
        label_id: label.as_ref().map(|l| l.id.clone()),
    };
    scene.push(element)?;
    if let Some(label) = label {
        scene.push(label)?;
    }
    tracing::debug!("Added {} {}", spec.kind, added.element_id);
    Ok(added)
}

/// Edit text, note or style of a live element.
///
/// Changing a label's text re-measures it and re-centres it in its container.
///
/// # Errors
///
/// - [`CanvasError::Validation`] if the patch is empty or sets text on a non-text element.
/// - [`CanvasError::ElementNotFound`] if the element does not exist.
pub fn update_element(
    scene: &mut Scene,
    patch: &ElementPatch,
    idgen: &mut dyn IdGenerator,
) -> CanvasResult<()> {
    if patch.text.is_none() && patch.note.is_none() && patch.style.is_empty() {
        return Err(CanvasError::Validation("Nothing to update".to_string()));
    }
    let current = scene
        .live(&patch.element_id)
        .ok_or_else(|| CanvasError::ElementNotFound(patch.element_id.clone()))?;
    if patch.text.is_some() && current.kind != ElementType::Text {
        return Err(CanvasError::Validation(format!(
            "Element {} is a {}, only text can take 'text'",
            patch.element_id, current.kind
        )));
    }
    let container = current
        .container_id
        .as_deref()
        .and_then(|owner| scene.live(owner))
        .cloned();

    let element = scene
        .live_mut(&patch.element_id)
        .ok_or_else(|| CanvasError::ElementNotFound(patch.element_id.clone()))?;
    if let Some(text) = &patch.text {
        let (width, height) =
            measure_text(text, element.font_size.unwrap_or(DEFAULT_FONT_SIZE));
        element.text = Some(text.clone());
        element.width = Some(width);
        element.height = Some(height);
        if let Some(container) = &container {
            layout_label(container, element);
        }
    }
    if let Some(note) = &patch.note {
        element.set_note(note.clone());
    }
    patch.style.apply(element);
    element.bump(idgen.nonce());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SequentialIds;

    #[test]
    fn test_add_rectangle_with_defaults() {
        let mut scene = Scene::new();
        let mut idgen = SequentialIds::new();
        let added = add_element(&mut scene, &NewElement::new(ElementType::Rectangle), &mut idgen)
            .expect("add");

        assert_eq!(added.element_id, "el-1");
        assert!(added.label_id.is_none());
        let element = scene.get("el-1").expect("element");
        assert_eq!(element.width, Some(DEFAULT_SHAPE_SIZE));
        assert_eq!(element.stroke_style, "solid");
        assert_eq!(element.version, 1);
    }

    #[test]
    fn test_add_with_label_binds_both_sides() {
        let mut scene = Scene::new();
        let mut idgen = SequentialIds::new();
        let mut spec = NewElement::new(ElementType::Diamond);
        spec.label = Some("Decision".to_string());
        spec.note = Some("entry point".to_string());

        let added = add_element(&mut scene, &spec, &mut idgen).expect("add");
        let label_id = added.label_id.expect("label");
        let container = scene.get(&added.element_id).expect("container");
        assert_eq!(container.bound_text_ids().collect::<Vec<_>>(), vec![label_id.as_str()]);
        assert_eq!(container.note(), Some("entry point"));
        let label = scene.get(&label_id).expect("label");
        assert_eq!(label.container_id.as_deref(), Some(added.element_id.as_str()));
        assert_eq!(label.text.as_deref(), Some("Decision"));
    }

    #[test]
    fn test_add_label_on_line_rejected() {
        let mut scene = Scene::new();
        let mut idgen = SequentialIds::new();
        let mut spec = NewElement::new(ElementType::Line);
        spec.label = Some("nope".to_string());
        assert!(add_element(&mut scene, &spec, &mut idgen).is_err());
        assert!(scene.is_empty());
    }

    #[test]
    fn test_add_line_requires_origin_point() {
        let mut scene = Scene::new();
        let mut idgen = SequentialIds::new();
        let mut spec = NewElement::new(ElementType::Arrow);
        spec.points = Some(vec![[5.0, 5.0], [10.0, 10.0]]);
        let err = add_element(&mut scene, &spec, &mut idgen).unwrap_err();
        assert!(err.to_string().contains("[0, 0]"));
    }

    #[test]
    fn test_add_line_sizes_from_points() {
        let mut scene = Scene::new();
        let mut idgen = SequentialIds::new();
        let mut spec = NewElement::new(ElementType::Line);
        spec.points = Some(vec![[0.0, 0.0], [40.0, -10.0], [20.0, 30.0]]);
        add_element(&mut scene, &spec, &mut idgen).expect("add");
        let line = scene.get("el-1").expect("line");
        assert_eq!(line.width, Some(40.0));
        assert_eq!(line.height, Some(40.0));
    }

    #[test]
    fn test_add_text_and_image_require_content() {
        let mut scene = Scene::new();
        let mut idgen = SequentialIds::new();
        assert!(add_element(&mut scene, &NewElement::new(ElementType::Text), &mut idgen).is_err());
        assert!(add_element(&mut scene, &NewElement::new(ElementType::Image), &mut idgen).is_err());
    }

    #[test]
    fn test_add_rejects_foreign_type_without_using_an_id() {
        let mut scene = Scene::new();
        let mut idgen = SequentialIds::new();
        let spec = NewElement::new(ElementType::Other("freedraw".to_string()));
        let err = add_element(&mut scene, &spec, &mut idgen).unwrap_err();
        assert!(err.to_string().contains("freedraw"));
        assert!(scene.is_empty());

        let added =
            add_element(&mut scene, &NewElement::new(ElementType::Ellipse), &mut idgen).expect("add");
        assert_eq!(added.element_id, "el-1");
    }

    #[test]
    fn test_update_label_text_recentres() {
        let mut scene = Scene::new();
        let mut idgen = SequentialIds::new();
        let mut spec = NewElement::new(ElementType::Rectangle);
        spec.width = Some(200.0);
        spec.label = Some("a".to_string());
        let added = add_element(&mut scene, &spec, &mut idgen).expect("add");
        let label_id = added.label_id.expect("label");

        let patch = ElementPatch {
            element_id: label_id.clone(),
            text: Some("longer caption".to_string()),
            note: None,
            style: StylePatch::default(),
        };
        update_element(&mut scene, &patch, &mut idgen).expect("update");

        let label = scene.get(&label_id).expect("label");
        let width = label.width.expect("measured");
        assert!((label.x + width / 2.0 - 100.0).abs() < 1e-9);
        assert_eq!(label.version, 2);
    }

    #[test]
    fn test_update_rejects_text_on_shape_and_empty_patch() {
        let mut scene = Scene::new();
        let mut idgen = SequentialIds::new();
        add_element(&mut scene, &NewElement::new(ElementType::Ellipse), &mut idgen).expect("add");

        let mut patch = ElementPatch {
            element_id: "el-1".to_string(),
            text: None,
            note: None,
            style: StylePatch::default(),
        };
        assert!(update_element(&mut scene, &patch, &mut idgen).is_err());

        patch.text = Some("x".to_string());
        assert!(update_element(&mut scene, &patch, &mut idgen).is_err());

        patch.text = None;
        patch.style.background_color = Some("#ffc9c9".to_string());
        update_element(&mut scene, &patch, &mut idgen).expect("style update");
        assert_eq!(scene.get("el-1").expect("el").background_color, "#ffc9c9");
    }
}
