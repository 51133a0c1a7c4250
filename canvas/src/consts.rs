//! Shared numeric constants for the canvas crate.

// ── Editor space ────────────────────────────────────────────────

/// Nominal width of the on-screen card canvas, in editor pixels.
pub const EDITOR_WIDTH: f64 = 500.0;

/// Nominal height of the on-screen card canvas, in editor pixels.
pub const EDITOR_HEIGHT: f64 = 316.0;

/// Smallest width or height any element may be resized to.
pub const MIN_ELEMENT_SIZE: f64 = 20.0;

// ── Stacking ────────────────────────────────────────────────────

/// Baseline z-index for QR codes; keeps them above ordinary elements.
pub const QR_Z_INDEX: i64 = 9999;

/// Z-index of a selected QR code.
pub const QR_SELECTED_Z_INDEX: i64 = 10_000;

/// Transient z-index of a selected (non-QR) element.
pub const SELECTED_Z_INDEX: i64 = 1000;

/// Transient z-index of the element being dragged.
pub const DRAG_Z_INDEX: i64 = 1001;

/// Opacity applied to the element being dragged.
pub const DRAG_OPACITY: f64 = 0.7;

// ── Interaction ─────────────────────────────────────────────────

/// Screen-space hit slop in pixels for resize handles.
pub const HANDLE_RADIUS_PX: f64 = 6.0;

/// Distance from the top edge of an element to its rotate handle.
pub const ROTATE_HANDLE_OFFSET_PX: f64 = 24.0;

/// Bearing of the rotate handle relative to the element center (12 o'clock).
pub const ROTATE_HANDLE_BEARING_DEG: f64 = 90.0;

/// Delay before a click on a text element opens the inline editor.
pub const TEXT_EDIT_DEBOUNCE_MS: f64 = 150.0;

/// Pointer travel that turns a pending text click into a drag.
pub const CLICK_MOVE_THRESHOLD_PX: f64 = 3.0;

// ── History ─────────────────────────────────────────────────────

/// Maximum number of retained history entries.
pub const MAX_HISTORY: usize = 50;

// ── Text ────────────────────────────────────────────────────────

/// Line advance as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f64 = 1.2;

// ── Uploads ─────────────────────────────────────────────────────

/// Largest accepted image upload, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Box a freshly uploaded image is fitted into.
pub const IMAGE_FIT_WIDTH: f64 = 200.0;
pub const IMAGE_FIT_HEIGHT: f64 = 150.0;

/// Default QR code edge length.
pub const QR_SIZE: f64 = 80.0;

/// Gap between a default-placed QR code and the content box edge.
pub const QR_MARGIN: f64 = 12.0;
