//! Scene elements - the building blocks of a drawing.

use serde::{Deserialize, Deserializer, Serialize};

/// Default stroke colour for new elements.
pub const DEFAULT_STROKE_COLOR: &str = "#1e1e1e";
/// Default background colour for new elements.
pub const DEFAULT_BACKGROUND_COLOR: &str = "transparent";
/// Default stroke width for new elements.
pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;
/// Default stroke and fill style for new elements.
pub const DEFAULT_STYLE: &str = "solid";

/// Key under `customData` that carries a free-form note.
const NOTE_KEY: &str = "note";

/// The kind of drawable an element is.
///
/// Types the engine has no rules for (`freedraw`, `frame`, ...) load as
/// [`ElementType::Other`] and serialize back under their original name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementType {
    /// Axis-aligned box (before rotation).
    Rectangle,
    /// Ellipse inscribed in its box.
    Ellipse,
    /// Rhombus inscribed in its box.
    Diamond,
    /// Polyline through `points`.
    Line,
    /// Polyline through `points` with an arrowhead.
    Arrow,
    /// Standalone text or a container label.
    Text,
    /// Bitmap referenced by `fileId`.
    Image,
    /// Any other host type, carried through untouched.
    Other(String),
}

impl ElementType {
    /// Wire name of the type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Ellipse => "ellipse",
            Self::Diamond => "diamond",
            Self::Line => "line",
            Self::Arrow => "arrow",
            Self::Text => "text",
            Self::Image => "image",
            Self::Other(name) => name.as_str(),
        }
    }

    /// Whether resize is legal on this type.
    #[must_use]
    pub fn is_resizable(&self) -> bool {
        matches!(
            self,
            Self::Rectangle | Self::Ellipse | Self::Diamond | Self::Image
        )
    }

    /// Whether the geometry is described by `points`.
    #[must_use]
    pub fn is_linear(&self) -> bool {
        matches!(self, Self::Line | Self::Arrow)
    }

    /// Whether the type can own a text label.
    #[must_use]
    pub fn can_contain_text(&self) -> bool {
        matches!(self, Self::Rectangle | Self::Ellipse | Self::Diamond)
    }
}

impl From<String> for ElementType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "rectangle" => Self::Rectangle,
            "ellipse" => Self::Ellipse,
            "diamond" => Self::Diamond,
            "line" => Self::Line,
            "arrow" => Self::Arrow,
            "text" => Self::Text,
            "image" => Self::Image,
            _ => Self::Other(name),
        }
    }
}

impl From<ElementType> for String {
    fn from(kind: ElementType) -> Self {
        match kind {
            ElementType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a dependent bound to a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    /// A caption living inside the container.
    Text,
    /// An arrow attached to the container.
    Arrow,
}

/// Reference from a container to one of its dependents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundElement {
    /// Id of the dependent element.
    pub id: String,
    /// What the dependent is.
    #[serde(rename = "type")]
    pub kind: BindingKind,
}

impl BoundElement {
    /// Binding to a text label.
    #[must_use]
    pub fn text(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: BindingKind::Text,
        }
    }

    /// Binding to an arrow.
    #[must_use]
    pub fn arrow(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: BindingKind::Arrow,
        }
    }
}

/// A drawable scene element with geometry, style and relations.
///
/// Fields the engine does not interpret (for example `seed` or `roundness`
/// written by the host canvas) are kept in [`Element::extra`] so that a
/// lossless read returns exactly what was loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// Opaque unique identifier.
    pub id: String,
    /// Element type.
    #[serde(rename = "type")]
    pub kind: ElementType,
    /// Origin X.
    pub x: f64,
    /// Origin Y.
    pub y: f64,
    /// Box width, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Box height, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Rotation in radians, clockwise positive.
    #[serde(default)]
    pub angle: f64,
    /// Local offsets from the origin for lines and arrows; the first is `[0, 0]`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<[f64; 2]>,
    /// Group membership, most recently added last.
    #[serde(default)]
    pub group_ids: Vec<String>,
    /// Dependents owned by this element.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub bound_elements: Vec<BoundElement>,
    /// Owning container of a bound text element.
    #[serde(default)]
    pub container_id: Option<String>,
    /// Text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Font size of text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    /// Image content reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    /// Stroke colour.
    #[serde(default = "default_stroke_color")]
    pub stroke_color: String,
    /// Fill colour.
    #[serde(default = "default_background_color")]
    pub background_color: String,
    /// Stroke width.
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
    /// Stroke style (`solid`, `dashed`, `dotted`).
    #[serde(default = "default_style")]
    pub stroke_style: String,
    /// Fill style (`solid`, `hachure`, ...).
    #[serde(default = "default_style")]
    pub fill_style: String,
    /// Opaque controller data; may carry a `note` string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<serde_json::Map<String, serde_json::Value>>,
    /// Tombstone flag.
    #[serde(default)]
    pub is_deleted: bool,
    /// Bumped on every mutation.
    #[serde(default = "initial_version")]
    pub version: u64,
    /// Re-randomised on every mutation.
    #[serde(default)]
    pub version_nonce: u32,
    /// Host fields passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_stroke_color() -> String {
    DEFAULT_STROKE_COLOR.to_string()
}

fn default_background_color() -> String {
    DEFAULT_BACKGROUND_COLOR.to_string()
}

const fn default_stroke_width() -> f64 {
    DEFAULT_STROKE_WIDTH
}

fn default_style() -> String {
    DEFAULT_STYLE.to_string()
}

const fn initial_version() -> u64 {
    1
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Element {
    /// Create an element with default style at the given origin.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: ElementType, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            kind,
            x,
            y,
            width: None,
            height: None,
            angle: 0.0,
            points: Vec::new(),
            group_ids: Vec::new(),
            bound_elements: Vec::new(),
            container_id: None,
            text: None,
            font_size: None,
            file_id: None,
            stroke_color: default_stroke_color(),
            background_color: default_background_color(),
            stroke_width: DEFAULT_STROKE_WIDTH,
            stroke_style: default_style(),
            fill_style: default_style(),
            custom_data: None,
            is_deleted: false,
            version: initial_version(),
            version_nonce: 0,
            extra: serde_json::Map::new(),
        }
    }

    /// Set the box size.
    #[must_use]
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Set the rotation in radians.
    #[must_use]
    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }

    /// Set the polyline points.
    #[must_use]
    pub fn with_points(mut self, points: Vec<[f64; 2]>) -> Self {
        self.points = points;
        self
    }

    /// Set the text content.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set group membership.
    #[must_use]
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_ids = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Add a dependent binding.
    #[must_use]
    pub fn with_bound(mut self, bound: BoundElement) -> Self {
        self.bound_elements.push(bound);
        self
    }

    /// Set the owning container.
    #[must_use]
    pub fn with_container(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    /// The `customData.note` string, if any.
    #[must_use]
    pub fn note(&self) -> Option<&str> {
        self.custom_data
            .as_ref()
            .and_then(|data| data.get(NOTE_KEY))
            .and_then(serde_json::Value::as_str)
    }

    /// Set `customData.note`, creating `customData` if needed.
    pub fn set_note(&mut self, note: impl Into<String>) {
        self.custom_data
            .get_or_insert_with(serde_json::Map::new)
            .insert(NOTE_KEY.to_string(), serde_json::Value::String(note.into()));
    }

    /// Whether this is text bound to a container.
    #[must_use]
    pub fn is_label(&self) -> bool {
        self.kind == ElementType::Text && self.container_id.is_some()
    }

    /// Ids of every bound dependent.
    pub fn bound_ids(&self) -> impl Iterator<Item = &str> {
        self.bound_elements.iter().map(|b| b.id.as_str())
    }

    /// Ids of bound text labels.
    pub fn bound_text_ids(&self) -> impl Iterator<Item = &str> {
        self.bound_elements
            .iter()
            .filter(|b| b.kind == BindingKind::Text)
            .map(|b| b.id.as_str())
    }

    /// Record a mutation: bump `version` and replace `versionNonce`.
    pub fn bump(&mut self, nonce: u32) {
        self.version += 1;
        self.version_nonce = nonce;
    }
}
