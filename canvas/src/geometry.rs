//! Geometry engine: pure resize, rotation, and clamping math.
//!
//! Everything here works in editor space (card pixels, top-left origin,
//! rotation clockwise in degrees around the element center) and has no
//! side effects. The interaction controller in [`crate::engine`] feeds it the
//! gesture's start geometry plus the pointer delta on every move, so each
//! result is computed from scratch rather than accumulated.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

use serde::{Deserialize, Serialize};

use crate::consts::MIN_ELEMENT_SIZE;
use crate::viewport::{Bounds, Point};

/// Position, size, and rotation of an element in editor space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Left edge of the unrotated box.
    pub x: f64,
    /// Top edge of the unrotated box.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Clockwise rotation in degrees around the box center.
    #[serde(default)]
    pub rotation: f64,
}

impl Geometry {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height, rotation: 0.0 }
    }

    /// Center of the box; the rotation pivot.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Map a card-space point into the element's unrotated frame, relative
    /// to its center.
    #[must_use]
    pub fn to_local(&self, p: Point) -> Point {
        let c = self.center();
        let (sin, cos) = (-self.rotation.to_radians()).sin_cos();
        let dx = p.x - c.x;
        let dy = p.y - c.y;
        Point::new(dx * cos - dy * sin, dx * sin + dy * cos)
    }

    /// Map a point relative to the element center (unrotated frame) back
    /// into card space.
    #[must_use]
    pub fn to_card(&self, local: Point) -> Point {
        let c = self.center();
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        Point::new(c.x + local.x * cos - local.y * sin, c.y + local.x * sin + local.y * cos)
    }

    /// Whether `p` lies inside the rotated box.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        let local = self.to_local(p);
        local.x.abs() <= self.width / 2.0 && local.y.abs() <= self.height / 2.0
    }

    /// True when both dimensions respect the minimum element size.
    #[must_use]
    pub fn meets_minimum(&self) -> bool {
        self.width >= MIN_ELEMENT_SIZE && self.height >= MIN_ELEMENT_SIZE
    }
}

/// One of the eight resize handles, named by compass direction.
///
/// Corners (`Nw` top-left, `Ne` top-right, `Sw` bottom-left, `Se`
/// bottom-right) resize with a locked aspect ratio; edges (`N`, `E`, `S`,
/// `W`) move a single side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizeHandle {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

impl ResizeHandle {
    /// All handles in clockwise order starting at `N`.
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::N,
        ResizeHandle::Ne,
        ResizeHandle::E,
        ResizeHandle::Se,
        ResizeHandle::S,
        ResizeHandle::Sw,
        ResizeHandle::W,
        ResizeHandle::Nw,
    ];

    /// Direction the handle drags each axis: `-1` moves the left/top edge,
    /// `1` the right/bottom edge, `0` leaves the axis alone.
    #[must_use]
    pub fn axes(self) -> (f64, f64) {
        match self {
            Self::N => (0.0, -1.0),
            Self::Ne => (1.0, -1.0),
            Self::E => (1.0, 0.0),
            Self::Se => (1.0, 1.0),
            Self::S => (0.0, 1.0),
            Self::Sw => (-1.0, 1.0),
            Self::W => (-1.0, 0.0),
            Self::Nw => (-1.0, -1.0),
        }
    }

    #[must_use]
    pub fn is_corner(self) -> bool {
        matches!(self, Self::Ne | Self::Se | Self::Sw | Self::Nw)
    }

    /// Cursor name shown while hovering or dragging this handle.
    #[must_use]
    pub fn cursor(self) -> &'static str {
        match self {
            Self::N | Self::S => "ns-resize",
            Self::E | Self::W => "ew-resize",
            Self::Ne | Self::Sw => "nesw-resize",
            Self::Se | Self::Nw => "nwse-resize",
        }
    }
}

/// Resize with the aspect ratio locked on corner handles.
///
/// Corners follow the dominant axis of the pointer delta: when `|dx| > |dy|`
/// the width is driven by `dx` and the height derived from the start ratio,
/// otherwise the reverse. The corner opposite the dragged handle stays
/// fixed. Edge handles change only their own dimension.
///
/// A dimension that would fall below [`MIN_ELEMENT_SIZE`] is rejected on its
/// axis alone: that axis keeps its start size and position while the other
/// axis still updates.
#[must_use]
pub fn compute_aspect_resize(handle: ResizeHandle, start: &Geometry, dx: f64, dy: f64) -> Geometry {
    let (sx, sy) = handle.axes();
    let ratio = if start.height > 0.0 { start.width / start.height } else { 1.0 };

    let (width, height) = if handle.is_corner() {
        if dx.abs() > dy.abs() {
            let w = sx.mul_add(dx, start.width);
            (w, w / ratio)
        } else {
            let h = sy.mul_add(dy, start.height);
            (h * ratio, h)
        }
    } else {
        (sx.mul_add(dx, start.width), sy.mul_add(dy, start.height))
    };

    let mut out = *start;
    apply_axis(&mut out.x, &mut out.width, start.x, start.width, width, sx, false);
    apply_axis(&mut out.y, &mut out.height, start.y, start.height, height, sy, false);
    out
}

/// Resize each axis independently.
///
/// Every handle moves its own edges; dimensions are clamped up to
/// [`MIN_ELEMENT_SIZE`] while the opposite edge stays anchored.
#[must_use]
pub fn compute_free_resize(handle: ResizeHandle, start: &Geometry, dx: f64, dy: f64) -> Geometry {
    let (sx, sy) = handle.axes();
    let mut out = *start;
    apply_axis(&mut out.x, &mut out.width, start.x, start.width, sx.mul_add(dx, start.width), sx, true);
    apply_axis(&mut out.y, &mut out.height, start.y, start.height, sy.mul_add(dy, start.height), sy, true);
    out
}

/// Apply a candidate size on one axis.
///
/// `dir < 0` means the leading edge moves, so the position is re-derived
/// from the fixed trailing edge. With `clamp` a short candidate is raised to
/// the minimum; without it the axis keeps its start values.
fn apply_axis(pos: &mut f64, size: &mut f64, start_pos: f64, start_size: f64, candidate: f64, dir: f64, clamp: bool) {
    if dir == 0.0 {
        *pos = start_pos;
        *size = start_size.max(MIN_ELEMENT_SIZE);
        return;
    }
    let new_size = if candidate >= MIN_ELEMENT_SIZE {
        candidate
    } else if clamp {
        MIN_ELEMENT_SIZE
    } else {
        *pos = start_pos;
        *size = start_size.max(MIN_ELEMENT_SIZE);
        return;
    };
    *size = new_size;
    *pos = if dir < 0.0 { start_pos + start_size - new_size } else { start_pos };
}

/// Absolute pointer bearing around `center`, in degrees.
///
/// `atan2(pointer.y - center.y, pointer.x - center.x)`; not incremental, so
/// the same pointer position always yields the same angle.
#[must_use]
pub fn compute_rotation_angle(center: Point, pointer: Point) -> f64 {
    (pointer.y - center.y).atan2(pointer.x - center.x).to_degrees()
}

/// Normalise an angle into `[0, 360)`.
#[must_use]
pub fn normalize_degrees(deg: f64) -> f64 {
    let n = deg.rem_euclid(360.0);
    if n >= 360.0 { 0.0 } else { n }
}

/// Keep the unrotated box inside `bounds`, clamping each axis on its own.
///
/// A box wider (or taller) than the bounds is pinned to the left (or top).
#[must_use]
pub fn clamp_to_content_box(geom: &Geometry, bounds: &Bounds) -> Geometry {
    let mut out = *geom;
    out.x = clamp_axis(geom.x, geom.width, bounds.left, bounds.right);
    out.y = clamp_axis(geom.y, geom.height, bounds.top, bounds.bottom);
    out
}

fn clamp_axis(pos: f64, size: f64, min: f64, max: f64) -> f64 {
    let upper = max - size;
    if upper < min { min } else { pos.clamp(min, upper) }
}
