//! Input model: modifier keys, mouse buttons, pointer targets, and the gesture state machine.
//!
//! `InputState` is the active gesture being tracked between pointer-down and
//! pointer-up. Each active variant carries everything needed to recompute the
//! element's geometry from scratch on every pointer-move: the pointer and
//! geometry at gesture start, or the fixed rotation pivot.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::consts::{DRAG_OPACITY, DRAG_Z_INDEX};
use crate::design::Side;
use crate::element::ElementId;
use crate::geometry::{Geometry, ResizeHandle};
use crate::viewport::Point;

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Alt / Option key is held.
    pub alt: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Command on macOS.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

/// A keyboard key as reported by the browser (e.g. `"Delete"`, `"z"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

/// Where a pointer-down landed.
///
/// The host classifies DOM targets: the card surface is `Canvas`; the
/// property panel, modals, and popups are `Chrome`. Chrome clicks never
/// change the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerTarget {
    #[default]
    Canvas,
    Chrome,
    /// Anywhere else on the page.
    Outside,
}

/// A text click waiting out the debounce before opening the inline editor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingTextEdit {
    pub id: ElementId,
    /// Page-space pointer position at pointer-down.
    pub origin: Point,
    /// Host clock (ms) at which the editor opens if nothing cancels it.
    pub fire_at_ms: f64,
}

/// Transient visual feedback while dragging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragFeedback {
    pub id: ElementId,
    pub opacity: f64,
    pub z_index: i64,
}

impl DragFeedback {
    #[must_use]
    pub fn for_element(id: ElementId) -> Self {
        Self { id, opacity: DRAG_OPACITY, z_index: DRAG_Z_INDEX }
    }
}

/// Per-face flip angle of the 3D card preview, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlipState {
    pub front_deg: f64,
    pub back_deg: f64,
}

impl Default for FlipState {
    fn default() -> Self {
        Self::showing(Side::Front)
    }
}

impl FlipState {
    /// Both faces square to the viewer, as captured for print.
    pub const FLAT: Self = Self { front_deg: 0.0, back_deg: 0.0 };

    /// Flip angles with `side` facing the viewer.
    #[must_use]
    pub fn showing(side: Side) -> Self {
        match side {
            Side::Front => Self { front_deg: 0.0, back_deg: 180.0 },
            Side::Back => Self { front_deg: 180.0, back_deg: 0.0 },
        }
    }

    #[must_use]
    pub fn angle(&self, side: Side) -> f64 {
        match side {
            Side::Front => self.front_deg,
            Side::Back => self.back_deg,
        }
    }

    /// Horizontal scale of `side` projected onto the canvas: the cosine of
    /// its flip angle. `1.0` is flat, `-1.0` is turned away and mirrored.
    #[must_use]
    pub fn face_scale_x(&self, side: Side) -> f64 {
        self.angle(side).to_radians().cos()
    }

    /// True when neither face carries a 3D transform.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.front_deg == 0.0 && self.back_deg == 0.0
    }
}

/// Persistent UI state visible to the renderer.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// The id of the currently selected element, if any.
    pub selected_id: Option<ElementId>,
    /// Side currently shown and edited.
    pub active_side: Side,
    /// Element whose inline text editor is open.
    pub editing_text: Option<ElementId>,
    /// Drag feedback applied until pointer-up.
    pub drag_feedback: Option<DragFeedback>,
    pub flip: FlipState,
    /// Cursor hint for the host, e.g. `"move"` or a resize cursor.
    pub cursor: Option<&'static str>,
}

/// Internal state for the input state machine.
///
/// Exactly one variant is active. A new gesture may start only from `Idle`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// The user is moving an element across the card.
    Dragging {
        /// Id of the element being dragged.
        id: ElementId,
        /// Page-space pointer position at gesture start.
        start_pointer: Point,
        /// Element geometry at gesture start.
        start: Geometry,
    },
    /// The user is resizing an element by dragging one of its eight handles.
    Resizing {
        id: ElementId,
        /// Which corner/edge handle is being dragged.
        handle: ResizeHandle,
        start_pointer: Point,
        start: Geometry,
    },
    /// The user is rotating an element by dragging the rotate handle.
    Rotating {
        id: ElementId,
        /// Card-space center at gesture start; the pivot for the whole gesture.
        center: Point,
    },
}

impl InputState {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// The element the active gesture targets.
    #[must_use]
    pub fn target(&self) -> Option<ElementId> {
        match self {
            Self::Idle => None,
            Self::Dragging { id, .. } | Self::Resizing { id, .. } | Self::Rotating { id, .. } => Some(*id),
        }
    }

    /// Cursor name for the active gesture.
    #[must_use]
    pub fn cursor(&self) -> Option<&'static str> {
        match self {
            Self::Idle => None,
            Self::Dragging { .. } => Some("move"),
            Self::Resizing { handle, .. } => Some(handle.cursor()),
            Self::Rotating { .. } => Some("grabbing"),
        }
    }
}
