//! Connector path construction.
//!
//! Paths are emitted as SVG path data so the board and the overlay can draw
//! them directly.

use std::fmt::Write as _;

use smallvec::SmallVec;

use super::geometry::{AnchorPair, AnchorPoint, Point};
use super::state::ConnectStyle;

/// Fraction of the horizontal gap used to push Bézier control points out.
const CONTROL_OFFSET_RATIO: f64 = 0.5;

/// Build the SVG path for a connector between two anchors.
#[must_use]
pub fn build_path(source: &AnchorPoint, target: &AnchorPoint, style: ConnectStyle) -> String {
    match style {
        ConnectStyle::Smooth => smooth_path(source, target),
        ConnectStyle::Orthogonal => orthogonal_path(source, target),
    }
}

/// Convenience wrapper taking the output of `best_anchor_pair`.
#[must_use]
pub fn build_pair_path(pair: &AnchorPair, style: ConnectStyle) -> String {
    build_path(&pair.source, &pair.target, style)
}

/// Cubic Bézier whose control points leave each anchor along its outward axis.
#[must_use]
pub fn smooth_path(source: &AnchorPoint, target: &AnchorPoint) -> String {
    let start = source.point;
    let end = target.point;
    let offset = (end.x - start.x).abs() * CONTROL_OFFSET_RATIO;

    let c1 = project(start, source, offset);
    let c2 = project(end, target, offset);

    format!(
        "M {} {} C {} {}, {} {}, {} {}",
        num(start.x),
        num(start.y),
        num(c1.x),
        num(c1.y),
        num(c2.x),
        num(c2.y),
        num(end.x),
        num(end.y),
    )
}

/// Right-angle polyline between two anchors.
///
/// Anchors on the same axis meet on a shared midline; mixed axes use a
/// single elbow.
#[must_use]
pub fn orthogonal_path(source: &AnchorPoint, target: &AnchorPoint) -> String {
    let mut out = String::new();
    for (i, p) in orthogonal_points(source, target).iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let command = if i == 0 { 'M' } else { 'L' };
        let _ = write!(out, "{command} {} {}", num(p.x), num(p.y));
    }
    out
}

/// The vertices of the orthogonal polyline, endpoints included.
#[must_use]
pub fn orthogonal_points(source: &AnchorPoint, target: &AnchorPoint) -> SmallVec<[Point; 4]> {
    let start = source.point;
    let end = target.point;
    let mut points: SmallVec<[Point; 4]> = SmallVec::new();
    points.push(start);

    match (source.anchor.is_horizontal(), target.anchor.is_horizontal()) {
        (true, true) => {
            let mid_x = (start.x + end.x) / 2.0;
            points.push(Point::new(mid_x, start.y));
            points.push(Point::new(mid_x, end.y));
        }
        (false, false) => {
            let mid_y = (start.y + end.y) / 2.0;
            points.push(Point::new(start.x, mid_y));
            points.push(Point::new(end.x, mid_y));
        }
        (true, false) => points.push(Point::new(end.x, start.y)),
        (false, true) => points.push(Point::new(start.x, end.y)),
    }

    points.push(end);
    points
}

fn project(point: Point, anchor: &AnchorPoint, offset: f64) -> Point {
    let (dx, dy) = anchor.anchor.outward();
    Point::new(point.x + dx * offset, point.y + dy * offset)
}

/// Shortest round-trip formatting with negative zero folded to zero.
fn num(value: f64) -> String {
    if value == 0.0 { "0".to_string() } else { value.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::board::geometry::{Anchor, best_anchor_pair};
    use crate::modules::board::state::Rect;

    fn anchor(x: f64, y: f64, anchor: Anchor) -> AnchorPoint {
        AnchorPoint { point: Point::new(x, y), anchor }
    }

    #[test]
    fn test_smooth_path_projects_along_anchor_axis() {
        let path = smooth_path(&anchor(300.0, 100.0, Anchor::Right), &anchor(500.0, 90.0, Anchor::Left));
        assert_eq!(path, "M 300 100 C 400 100, 400 90, 500 90");
    }

    #[test]
    fn test_smooth_path_vertical_anchors() {
        let path = smooth_path(&anchor(100.0, 200.0, Anchor::Bottom), &anchor(140.0, 400.0, Anchor::Top));
        // Offset derives from the horizontal gap only.
        assert_eq!(path, "M 100 200 C 100 220, 140 380, 140 400");
    }

    #[test]
    fn test_orthogonal_same_axis_uses_midline() {
        let path = orthogonal_path(&anchor(300.0, 100.0, Anchor::Right), &anchor(500.0, 90.0, Anchor::Left));
        assert_eq!(path, "M 300 100 L 400 100 L 400 90 L 500 90");
    }

    #[test]
    fn test_orthogonal_vertical_axis_uses_midline() {
        let points =
            orthogonal_points(&anchor(150.0, 200.0, Anchor::Bottom), &anchor(150.0, 500.0, Anchor::Top));
        assert_eq!(points.len(), 4);
        assert_eq!(points[1], Point::new(150.0, 350.0));
    }

    #[test]
    fn test_orthogonal_mixed_axes_single_elbow() {
        let points =
            orthogonal_points(&anchor(300.0, 100.0, Anchor::Right), &anchor(600.0, 400.0, Anchor::Top));
        assert_eq!(points.as_slice(), &[
            Point::new(300.0, 100.0),
            Point::new(600.0, 100.0),
            Point::new(600.0, 400.0)
        ]);

        let points =
            orthogonal_points(&anchor(300.0, 100.0, Anchor::Bottom), &anchor(600.0, 400.0, Anchor::Left));
        assert_eq!(points[1], Point::new(300.0, 400.0));
    }

    #[test]
    fn test_fractional_coordinates_format() {
        let path = orthogonal_path(&anchor(0.5, 0.0, Anchor::Right), &anchor(10.0, -0.0, Anchor::Left));
        assert_eq!(path, "M 0.5 0 L 5.25 0 L 5.25 0 L 10 0");
    }

    #[test]
    fn test_build_path_from_pair() {
        let pair = best_anchor_pair(
            &Rect::new(0.0, 0.0, 300.0, 200.0),
            &Rect::new(500.0, 0.0, 280.0, 180.0),
        );
        assert!(build_pair_path(&pair, ConnectStyle::Smooth).starts_with("M 300 100 C"));
        assert!(build_pair_path(&pair, ConnectStyle::Orthogonal).starts_with("M 300 100 L"));
    }
}
