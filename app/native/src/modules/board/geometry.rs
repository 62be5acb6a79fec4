//! Connector geometry and grid snapping.
//!
//! Everything here is pure and deterministic: given two rectangles the same
//! anchor pair is chosen on every call, so connectors never flicker between
//! sides while windows stay put.

use serde::{Deserialize, Serialize};

use super::state::Rect;

/// Score penalty for a candidate whose axis disagrees with the dominant
/// separation between the two rectangles.
pub const AXIS_BIAS: f64 = 8.0;

/// Default distance within which a value snaps to the grid.
pub const DEFAULT_SNAP_THRESHOLD: f64 = 6.0;

/// Smallest note size reachable through a resize handle.
pub const MIN_NOTE_WIDTH: f64 = 120.0;
pub const MIN_NOTE_HEIGHT: f64 = 80.0;

// ============================================================================
// Points and anchors
// ============================================================================

/// A point in board coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self { Self { x, y } }
}

/// One of a rectangle's four edge midpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Top,
    Bottom,
    Left,
    Right,
}

impl Anchor {
    /// Left and right anchors leave the rectangle horizontally.
    #[must_use]
    pub const fn is_horizontal(self) -> bool { matches!(self, Self::Left | Self::Right) }

    /// Unit direction pointing out of the rectangle.
    #[must_use]
    pub const fn outward(self) -> (f64, f64) {
        match self {
            Self::Top => (0.0, -1.0),
            Self::Bottom => (0.0, 1.0),
            Self::Left => (-1.0, 0.0),
            Self::Right => (1.0, 0.0),
        }
    }
}

/// A point on a rectangle together with the side it sits on.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnchorPoint {
    pub point: Point,
    pub anchor: Anchor,
}

/// The four edge midpoints of a rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnchorPoints {
    pub top: Point,
    pub bottom: Point,
    pub left: Point,
    pub right: Point,
}

impl AnchorPoints {
    #[must_use]
    pub const fn get(&self, anchor: Anchor) -> Point {
        match anchor {
            Anchor::Top => self.top,
            Anchor::Bottom => self.bottom,
            Anchor::Left => self.left,
            Anchor::Right => self.right,
        }
    }
}

/// Selected source and target anchors for a connector.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnchorPair {
    pub source: AnchorPoint,
    pub target: AnchorPoint,
}

#[must_use]
pub fn center(rect: &Rect) -> Point {
    Point::new(rect.x + rect.width / 2.0, rect.y + rect.height / 2.0)
}

#[must_use]
pub fn anchor_points(rect: &Rect) -> AnchorPoints {
    let mid_x = rect.x + rect.width / 2.0;
    let mid_y = rect.y + rect.height / 2.0;
    AnchorPoints {
        top: Point::new(mid_x, rect.y),
        bottom: Point::new(mid_x, rect.y + rect.height),
        left: Point::new(rect.x, mid_y),
        right: Point::new(rect.x + rect.width, mid_y),
    }
}

#[must_use]
pub fn manhattan(a: Point, b: Point) -> f64 { (a.x - b.x).abs() + (a.y - b.y).abs() }

#[must_use]
pub fn distance(a: Point, b: Point) -> f64 { (b.x - a.x).hypot(b.y - a.y) }

/// Candidate order; earlier entries win ties.
const CANDIDATES: [(Anchor, Anchor); 4] = [
    (Anchor::Right, Anchor::Left),
    (Anchor::Left, Anchor::Right),
    (Anchor::Bottom, Anchor::Top),
    (Anchor::Top, Anchor::Bottom),
];

/// Choose the anchor pair used to connect `a` to `b`.
///
/// Each candidate is scored by the Manhattan distance between its points,
/// plus [`AXIS_BIAS`] when the candidate's axis differs from the dominant
/// separation axis. The lowest score wins; ties go to the earlier candidate.
#[must_use]
pub fn best_anchor_pair(a: &Rect, b: &Rect) -> AnchorPair {
    let from = anchor_points(a);
    let to = anchor_points(b);

    let ca = center(a);
    let cb = center(b);
    let horizontal_first = (ca.x - cb.x).abs() > (ca.y - cb.y).abs();

    let mut best: Option<(f64, AnchorPair)> = None;
    for (source, target) in CANDIDATES {
        let pair = AnchorPair {
            source: AnchorPoint { point: from.get(source), anchor: source },
            target: AnchorPoint { point: to.get(target), anchor: target },
        };
        let bias = if source.is_horizontal() == horizontal_first { 0.0 } else { AXIS_BIAS };
        let score = manhattan(pair.source.point, pair.target.point) + bias;

        // Strict comparison keeps the earlier candidate on ties.
        if best.is_none_or(|(best_score, _)| score < best_score) {
            best = Some((score, pair));
        }
    }

    best.map_or_else(
        || AnchorPair {
            source: AnchorPoint { point: from.right, anchor: Anchor::Right },
            target: AnchorPoint { point: to.left, anchor: Anchor::Left },
        },
        |(_, pair)| pair,
    )
}

// ============================================================================
// Grid snapping
// ============================================================================

/// Round `value` to the nearest grid line.
#[must_use]
pub fn snap(value: f64, grid: f64) -> f64 {
    if grid <= 0.0 {
        return value;
    }
    (value / grid).round() * grid
}

/// Snap only when the nearest grid line is within `threshold`.
///
/// Outside the threshold the value is kept, or floored to the grid when
/// `prefer_floor` is set.
#[must_use]
pub fn snap_with_threshold(value: f64, grid: f64, threshold: f64, prefer_floor: bool) -> f64 {
    if grid <= 0.0 {
        return value;
    }

    let snapped = snap(value, grid);
    if (snapped - value).abs() <= threshold {
        snapped
    } else if prefer_floor {
        (value / grid).floor() * grid
    } else {
        value
    }
}

/// Snap the top-left corner when it is within `threshold` of a grid line.
#[must_use]
pub fn snap_rect_position(rect: Rect, grid: f64, threshold: f64) -> Rect {
    Rect {
        x: snap_with_threshold(rect.x, grid, threshold, false),
        y: snap_with_threshold(rect.y, grid, threshold, false),
        ..rect
    }
}

/// Snap a size, never going below four by three grid cells.
#[must_use]
pub fn snap_rect_size(rect: Rect, grid: f64, threshold: f64) -> Rect {
    let min_width = grid * 4.0;
    let min_height = grid * 3.0;
    Rect {
        width: min_width.max(snap_with_threshold(rect.width, grid, threshold, true)),
        height: min_height.max(snap_with_threshold(rect.height, grid, threshold, true)),
        ..rect
    }
}

/// Snap every edge of a rectangle to the grid.
#[must_use]
pub fn snap_rect_full(rect: Rect, grid: f64) -> Rect {
    let x = snap(rect.x, grid);
    let y = snap(rect.y, grid);
    let right = snap(rect.right(), grid);
    let bottom = snap(rect.bottom(), grid);
    Rect {
        x,
        y,
        width: (right - x).max(grid),
        height: (bottom - y).max(grid),
    }
}

// ============================================================================
// Resize handles
// ============================================================================

/// A resize grip on a note frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeHandle {
    N,
    S,
    E,
    W,
    Ne,
    Nw,
    Se,
    Sw,
}

impl ResizeHandle {
    const fn moves_north(self) -> bool { matches!(self, Self::N | Self::Ne | Self::Nw) }

    const fn moves_south(self) -> bool { matches!(self, Self::S | Self::Se | Self::Sw) }

    const fn moves_west(self) -> bool { matches!(self, Self::W | Self::Nw | Self::Sw) }

    const fn moves_east(self) -> bool { matches!(self, Self::E | Self::Ne | Self::Se) }
}

/// Apply a pointer delta to `base` through `handle`.
///
/// Edges opposite the handle stay fixed, and the result never shrinks
/// below [`MIN_NOTE_WIDTH`] by [`MIN_NOTE_HEIGHT`].
#[must_use]
pub fn resize_from_handle(base: Rect, dx: f64, dy: f64, handle: ResizeHandle) -> Rect {
    let mut rect = base;

    if handle.moves_east() {
        rect.width = (base.width + dx).max(MIN_NOTE_WIDTH);
    }
    if handle.moves_west() {
        let width = (base.width - dx).max(MIN_NOTE_WIDTH);
        rect.x = base.right() - width;
        rect.width = width;
    }
    if handle.moves_south() {
        rect.height = (base.height + dy).max(MIN_NOTE_HEIGHT);
    }
    if handle.moves_north() {
        let height = (base.height - dy).max(MIN_NOTE_HEIGHT);
        rect.y = base.bottom() - height;
        rect.height = height;
    }

    rect
}
