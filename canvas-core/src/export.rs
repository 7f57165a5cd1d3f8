//! Compact, classified export of a scene.
//!
//! Every non-deleted element lands in exactly one bucket: shapes, lines,
//! labels, texts or images. Groups are derived separately. Coordinates are
//! rounded here and only here; the scene itself is never touched.

use std::collections::HashMap;
use std::f64::consts::PI;

use serde::Serialize;

use crate::{Element, ElementType, Scene};

/// A `line` whose ends are at most this far apart (with 3+ points) is a polygon.
pub const POLYGON_CLOSE_DISTANCE: f64 = 8.0;

/// Export switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Include `stroke` / `bg` on shapes and `stroke` on texts.
    pub with_style: bool,
}

/// Token-efficient view of a scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompactScene {
    /// Boxes, closed polygons and element types without a bucket of their own.
    pub shapes: Vec<ShapeRecord>,
    /// Open lines and arrows.
    pub lines: Vec<LineRecord>,
    /// Text bound to a container.
    pub labels: Vec<LabelRecord>,
    /// Standalone text.
    pub texts: Vec<TextRecord>,
    /// Images.
    pub images: Vec<ImageRecord>,
    /// Derived groups.
    pub groups: Vec<GroupRecord>,
}

/// A rectangle, ellipse, diamond or polygon.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeRecord {
    /// Element id.
    pub id: String,
    /// `rectangle`, `ellipse`, `diamond`, `polygon`, or a foreign type name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Rounded X.
    pub x: i64,
    /// Rounded Y.
    pub y: i64,
    /// Rounded width.
    pub w: Option<i64>,
    /// Rounded height.
    pub h: Option<i64>,
    /// Rotation in whole degrees.
    pub angle: i64,
    /// First bound text label.
    pub label_id: Option<String>,
    /// `customData.note`.
    pub note: Option<String>,
    /// Stroke colour, only when style was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    /// Background colour, only when style was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg: Option<String>,
}

/// An open line or arrow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRecord {
    /// Element id.
    pub id: String,
    /// `line` or `arrow`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Rounded start X.
    pub x: i64,
    /// Rounded start Y.
    pub y: i64,
    /// Rounded absolute end X.
    pub end_x: i64,
    /// Rounded absolute end Y.
    pub end_y: i64,
    /// Interior points as `x,y,x,y,...`, absolute and rounded.
    pub via: Option<String>,
    /// Rotation in whole degrees.
    pub angle: i64,
    /// `customData.note`.
    pub note: Option<String>,
}

/// Text inside a container.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelRecord {
    /// Element id.
    pub id: String,
    /// Owning container.
    pub container_id: String,
    /// Text content.
    pub content: String,
    /// Rounded X.
    pub x: i64,
    /// Rounded Y.
    pub y: i64,
    /// Rounded width.
    pub w: Option<i64>,
    /// Rounded height.
    pub h: Option<i64>,
}

/// Standalone text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRecord {
    /// Element id.
    pub id: String,
    /// Text content.
    pub content: String,
    /// Rounded X.
    pub x: i64,
    /// Rounded Y.
    pub y: i64,
    /// Rounded width.
    pub w: Option<i64>,
    /// Rounded height.
    pub h: Option<i64>,
    /// Rotation in whole degrees.
    pub angle: i64,
    /// `customData.note`.
    pub note: Option<String>,
    /// Stroke colour, only when style was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
}

/// An image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    /// Element id.
    pub id: String,
    /// Rounded X.
    pub x: i64,
    /// Rounded Y.
    pub y: i64,
    /// Rounded width.
    pub w: Option<i64>,
    /// Rounded height.
    pub h: Option<i64>,
    /// Rotation in whole degrees.
    pub angle: i64,
    /// Image content reference.
    pub file_id: Option<String>,
    /// `customData.note`.
    pub note: Option<String>,
}

/// A group and its members.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecord {
    /// Group id.
    pub id: String,
    /// Member ids in scan order, comma-joined.
    pub element_ids: String,
}

/// Round half up, so `-2.5` becomes `-2`.
///
/// `f64::round` is exact but breaks ties away from zero; only negative ties
/// need moving back up.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn round(value: f64) -> i64 {
    let nearest = value.round();
    if value - nearest == 0.5 {
        (nearest + 1.0) as i64
    } else {
        nearest as i64
    }
}

fn degrees(angle: f64) -> i64 {
    round(angle * 180.0 / PI)
}

fn note(element: &Element) -> Option<String> {
    element.note().map(str::to_string)
}

/// Build the compact export of a scene.
#[must_use]
pub fn compact(scene: &Scene, options: ExportOptions) -> CompactScene {
    let mut out = CompactScene::default();

    for element in scene.visible() {
        match &element.kind {
            ElementType::Text => match &element.container_id {
                Some(container_id) => out.labels.push(LabelRecord {
                    id: element.id.clone(),
                    container_id: container_id.clone(),
                    content: element.text.clone().unwrap_or_default(),
                    x: round(element.x),
                    y: round(element.y),
                    w: element.width.map(round),
                    h: element.height.map(round),
                }),
                None => out.texts.push(TextRecord {
                    id: element.id.clone(),
                    content: element.text.clone().unwrap_or_default(),
                    x: round(element.x),
                    y: round(element.y),
                    w: element.width.map(round),
                    h: element.height.map(round),
                    angle: degrees(element.angle),
                    note: note(element),
                    stroke: options.with_style.then(|| element.stroke_color.clone()),
                }),
            },
            ElementType::Line | ElementType::Arrow => {
                if is_closed_polygon(element) {
                    out.shapes.push(polygon_record(element, options));
                } else {
                    out.lines.push(line_record(element));
                }
            }
            ElementType::Image => out.images.push(ImageRecord {
                id: element.id.clone(),
                x: round(element.x),
                y: round(element.y),
                w: element.width.map(round),
                h: element.height.map(round),
                angle: degrees(element.angle),
                file_id: element.file_id.clone(),
                note: note(element),
            }),
            ElementType::Rectangle
            | ElementType::Ellipse
            | ElementType::Diamond
            | ElementType::Other(_) => {
                out.shapes.push(ShapeRecord {
                    id: element.id.clone(),
                    kind: element.kind.as_str().to_string(),
                    x: round(element.x),
                    y: round(element.y),
                    w: element.width.map(round),
                    h: element.height.map(round),
                    angle: degrees(element.angle),
                    label_id: first_label(element),
                    note: note(element),
                    stroke: options.with_style.then(|| element.stroke_color.clone()),
                    bg: options.with_style.then(|| element.background_color.clone()),
                });
            }
        }
    }

    out.groups = collect_groups(scene);
    out
}

/// Id of the first bound text; bound arrows never count.
fn first_label(element: &Element) -> Option<String> {
    element.bound_text_ids().next().map(str::to_string)
}

/// A `line` with 3+ points whose ends nearly meet.
fn is_closed_polygon(element: &Element) -> bool {
    if element.kind != ElementType::Line || element.points.len() < 3 {
        return false;
    }
    let (Some(first), Some(last)) = (element.points.first(), element.points.last()) else {
        return false;
    };
    (last[0] - first[0]).hypot(last[1] - first[1]) <= POLYGON_CLOSE_DISTANCE
}

fn polygon_record(element: &Element, options: ExportOptions) -> ShapeRecord {
    let (min_x, max_x, min_y, max_y) = element.points.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(lx, hx, ly, hy), p| (lx.min(p[0]), hx.max(p[0]), ly.min(p[1]), hy.max(p[1])),
    );
    ShapeRecord {
        id: element.id.clone(),
        kind: "polygon".to_string(),
        x: round(element.x + min_x),
        y: round(element.y + min_y),
        w: Some(round(max_x - min_x)),
        h: Some(round(max_y - min_y)),
        angle: degrees(element.angle),
        label_id: first_label(element),
        note: note(element),
        stroke: options.with_style.then(|| element.stroke_color.clone()),
        bg: options.with_style.then(|| element.background_color.clone()),
    }
}

fn line_record(element: &Element) -> LineRecord {
    let [end_x, end_y] = element.points.last().copied().unwrap_or([0.0, 0.0]);
    let via = (element.points.len() > 2).then(|| {
        element.points[1..element.points.len() - 1]
            .iter()
            .map(|p| {
                format!(
                    "{},{}",
                    round(element.x + p[0]),
                    round(element.y + p[1])
                )
            })
            .collect::<Vec<_>>()
            .join(",")
    });
    LineRecord {
        id: element.id.clone(),
        kind: element.kind.as_str().to_string(),
        x: round(element.x),
        y: round(element.y),
        end_x: round(element.x + end_x),
        end_y: round(element.y + end_y),
        via,
        angle: degrees(element.angle),
        note: note(element),
    }
}

/// Groups over all elements, tombstones included, in first-seen order.
fn collect_groups(scene: &Scene) -> Vec<GroupRecord> {
    let mut order: Vec<&str> = Vec::new();
    let mut members: HashMap<&str, Vec<&str>> = HashMap::new();
    for element in scene.iter() {
        for group_id in &element.group_ids {
            let entry = members.entry(group_id.as_str()).or_insert_with(|| {
                order.push(group_id.as_str());
                Vec::new()
            });
            entry.push(element.id.as_str());
        }
    }
    order
        .into_iter()
        .map(|group_id| GroupRecord {
            id: group_id.to_string(),
            element_ids: members
                .get(group_id)
                .map(|ids| ids.join(","))
                .unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoundElement;

    #[test]
    fn test_round_half_up() {
        assert_eq!(round(100.4), 100);
        assert_eq!(round(200.6), 201);
        assert_eq!(round(50.5), 51);
        assert_eq!(round(-2.5), -2);
        assert_eq!(round(-2.6), -3);
        assert_eq!(round(0.499_999_999_999_999_94), 0);
    }

    #[test]
    fn test_label_and_text_kept_apart() {
        let scene = Scene::from_elements(vec![
            Element::new("box", ElementType::Rectangle, 0.0, 0.0)
                .with_size(100.0, 50.0)
                .with_bound(BoundElement::arrow("arr"))
                .with_bound(BoundElement::text("cap")),
            Element::new("cap", ElementType::Text, 10.0, 10.0)
                .with_text("Caption")
                .with_container("box"),
            Element::new("free", ElementType::Text, 0.0, 90.0).with_text("Free"),
        ]);
        let out = compact(&scene, ExportOptions::default());

        assert_eq!(out.shapes[0].label_id.as_deref(), Some("cap"));
        assert_eq!(out.labels.len(), 1);
        assert_eq!(out.labels[0].container_id, "box");
        assert!(out.labels[0].w.is_none());
        assert_eq!(out.texts.len(), 1);
        assert_eq!(out.texts[0].content, "Free");
    }

    #[test]
    fn test_bound_arrow_does_not_populate_label() {
        let scene = Scene::from_elements(vec![Element::new("box", ElementType::Ellipse, 0.0, 0.0)
            .with_bound(BoundElement::arrow("arr"))]);
        let out = compact(&scene, ExportOptions::default());
        assert!(out.shapes[0].label_id.is_none());
    }

    #[test]
    fn test_line_via_and_endpoint() {
        let scene = Scene::from_elements(vec![Element::new("l", ElementType::Arrow, 10.0, 10.0)
            .with_points(vec![[0.0, 0.0], [20.4, 0.0], [20.0, 30.6], [50.0, 30.0]])]);
        let out = compact(&scene, ExportOptions::default());
        let line = &out.lines[0];
        assert_eq!(line.kind, "arrow");
        assert_eq!((line.end_x, line.end_y), (60, 40));
        assert_eq!(line.via.as_deref(), Some("30,10,30,41"));
    }

    #[test]
    fn test_two_point_line_has_null_via() {
        let scene = Scene::from_elements(vec![Element::new("l", ElementType::Line, 0.0, 0.0)
            .with_points(vec![[0.0, 0.0], [5.0, 5.0]])]);
        let out = compact(&scene, ExportOptions::default());
        assert!(out.lines[0].via.is_none());
        let json = serde_json::to_value(&out.lines[0]).expect("serialize");
        assert!(json["via"].is_null());
    }

    #[test]
    fn test_closed_arrow_stays_a_line() {
        let scene = Scene::from_elements(vec![Element::new("a", ElementType::Arrow, 0.0, 0.0)
            .with_points(vec![[0.0, 0.0], [100.0, 0.0], [50.0, 80.0], [0.0, 0.0]])]);
        let out = compact(&scene, ExportOptions::default());
        assert!(out.shapes.is_empty());
        assert_eq!(out.lines.len(), 1);
    }

    #[test]
    fn test_style_fields_only_on_request() {
        let scene = Scene::from_elements(vec![
            Element::new("r", ElementType::Rectangle, 0.0, 0.0),
            Element::new("t", ElementType::Text, 0.0, 0.0).with_text("x"),
        ]);

        let plain = serde_json::to_value(compact(&scene, ExportOptions::default())).expect("json");
        assert!(plain["shapes"][0].get("stroke").is_none());
        assert!(plain["shapes"][0].get("bg").is_none());
        assert!(plain["shapes"][0]["w"].is_null());

        let styled = serde_json::to_value(compact(&scene, ExportOptions { with_style: true }))
            .expect("json");
        assert_eq!(styled["shapes"][0]["stroke"], "#1e1e1e");
        assert_eq!(styled["shapes"][0]["bg"], "transparent");
        assert_eq!(styled["texts"][0]["stroke"], "#1e1e1e");
    }

    #[test]
    fn test_groups_include_deleted_members_in_scan_order() {
        let mut deleted = Element::new("b", ElementType::Rectangle, 0.0, 0.0).with_groups(["g2", "g1"]);
        deleted.is_deleted = true;
        let scene = Scene::from_elements(vec![
            Element::new("a", ElementType::Rectangle, 0.0, 0.0).with_groups(["g1"]),
            deleted,
            Element::new("c", ElementType::Ellipse, 0.0, 0.0).with_groups(["g1"]),
        ]);
        let out = compact(&scene, ExportOptions::default());

        assert_eq!(out.shapes.len(), 2);
        assert_eq!(
            out.groups,
            vec![
                GroupRecord {
                    id: "g1".to_string(),
                    element_ids: "a,b,c".to_string()
                },
                GroupRecord {
                    id: "g2".to_string(),
                    element_ids: "b".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_foreign_type_exports_as_shape() {
        let scene = Scene::from_elements(vec![
            Element::new("f", ElementType::Other("freedraw".to_string()), 10.4, 20.6)
                .with_size(30.0, 40.0),
        ]);
        let out = compact(&scene, ExportOptions::default());
        assert_eq!(out.shapes.len(), 1);
        assert_eq!(out.shapes[0].kind, "freedraw");
        assert_eq!(out.shapes[0].x, 10);
        assert_eq!(out.shapes[0].y, 21);
        assert!(out.lines.is_empty());
    }

    #[test]
    fn test_note_and_angle_exported() {
        let mut element =
            Element::new("r", ElementType::Diamond, 0.0, 0.0).with_angle(PI / 4.0);
        element.set_note("start here");
        let out = compact(&Scene::from_elements(vec![element]), ExportOptions::default());
        assert_eq!(out.shapes[0].angle, 45);
        assert_eq!(out.shapes[0].note.as_deref(), Some("start here"));
    }
}
