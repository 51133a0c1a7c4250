//! Card design editor engine.
//!
//! This crate is compiled to WebAssembly and runs in the browser. It owns the
//! editing model of a two-sided card: translating raw pointer input into
//! element mutations, enforcing material/template restrictions, keeping a
//! snapshot undo history, and painting the live preview. The host JavaScript
//! layer wires DOM events to the engine and posts the resulting
//! [`design::DesignData`] to the server.
//!
//! The server links this crate too: the element wire schema, the material
//! rules, and the editor→print scale transform in [`print`] are shared so the
//! 300 DPI render reproduces exactly what the editor shows.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`element`] | Placed elements, styles, and their serialized form |
//! | [`design`] | Sides, material/template mode state, submission payload |
//! | [`geometry`] | Pure resize/rotate/clamp math |
//! | [`history`] | Snapshot undo/redo |
//! | [`input`] | Input event types and the gesture state machine |
//! | [`hit`] | Hit-testing against rotated elements and handles |
//! | [`jobs`] | Generation tickets for async results |
//! | [`print`] | Editor-space → print-space transform and draw order |
//! | [`render`] | Preview painting on a 2D canvas context |
//! | [`viewport`] | Page ↔ card coordinate conversion |
//! | [`consts`] | Shared numeric constants (minimum sizes, z sentinels, etc.) |

pub mod consts;
pub mod design;
pub mod element;
pub mod engine;
pub mod geometry;
pub mod hit;
pub mod history;
pub mod input;
pub mod jobs;
pub mod print;
pub mod render;
pub mod viewport;
