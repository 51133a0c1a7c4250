#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::consts::{
    DRAG_Z_INDEX, HANDLE_RADIUS_PX, QR_SELECTED_Z_INDEX, QR_Z_INDEX, ROTATE_HANDLE_OFFSET_PX, SELECTED_Z_INDEX,
};
use crate::design::CardSide;
use crate::element::{Element, ElementId};
use crate::geometry::{Geometry, ResizeHandle};
use crate::viewport::Point;

/// Which part of an element was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    Resize(ResizeHandle),
    Rotate,
}

/// Result of a hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub element_id: ElementId,
    pub part: HitPart,
}

/// Card-space position of a resize handle on a (possibly rotated) box.
#[must_use]
pub fn handle_position(geom: &Geometry, handle: ResizeHandle) -> Point {
    let (sx, sy) = handle.axes();
    geom.to_card(Point::new(sx * geom.width / 2.0, sy * geom.height / 2.0))
}

/// Card-space position of the rotate handle, above the top edge.
#[must_use]
pub fn rotate_handle_position(geom: &Geometry) -> Point {
    geom.to_card(Point::new(0.0, -geom.height / 2.0 - ROTATE_HANDLE_OFFSET_PX))
}

/// Stacking priority as the preview shows it.
///
/// The dragged element sits above everything but the QR code; a selected
/// element is lifted to a fixed boost. QR codes keep their own baseline and
/// go one higher when selected. None of this is stored on the element.
#[must_use]
pub fn effective_z_index(element: &Element, selected: Option<ElementId>, dragging: Option<ElementId>) -> i64 {
    let id = element.id();
    if element.is_qr() {
        return if selected == Some(id) { QR_SELECTED_Z_INDEX } else { QR_Z_INDEX };
    }
    if dragging == Some(id) {
        DRAG_Z_INDEX
    } else if selected == Some(id) {
        SELECTED_Z_INDEX.max(element.z_index())
    } else {
        element.z_index()
    }
}

/// Elements of `side` in paint order (back to front). Ties keep insertion order.
#[must_use]
pub fn paint_order(side: &CardSide, selected: Option<ElementId>, dragging: Option<ElementId>) -> Vec<&Element> {
    let mut out: Vec<&Element> = side.iter().collect();
    out.sort_by_key(|e| effective_z_index(e, selected, dragging));
    out
}

/// Test which element (if any) is under `pt`.
///
/// Handles of the selected element are checked first, the rotate handle
/// before the resize handles. Bodies are then tested front to back, so the
/// topmost element wins.
#[must_use]
pub fn hit_test(pt: Point, side: &CardSide, selected: Option<ElementId>) -> Option<Hit> {
    if let Some(sel) = selected.and_then(|id| side.get(id)) {
        let geom = sel.geometry();
        if rotate_handle_position(geom).distance(pt) <= HANDLE_RADIUS_PX {
            return Some(Hit { element_id: sel.id(), part: HitPart::Rotate });
        }
        for handle in ResizeHandle::ALL {
            if handle_position(geom, handle).distance(pt) <= HANDLE_RADIUS_PX {
                return Some(Hit { element_id: sel.id(), part: HitPart::Resize(handle) });
            }
        }
    }

    paint_order(side, selected, None)
        .into_iter()
        .rev()
        .find(|e| e.geometry().contains(pt))
        .map(|e| Hit { element_id: e.id(), part: HitPart::Body })
}
