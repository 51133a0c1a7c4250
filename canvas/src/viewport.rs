#[cfg(test)]
#[path = "viewport_test.rs"]
mod viewport_test;

use serde::{Deserialize, Serialize};

use crate::consts::{EDITOR_HEIGHT, EDITOR_WIDTH};

/// A point in either page or card space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Placement of the card canvas on the page.
///
/// `origin_x` / `origin_y` are the page coordinates of the card's top-left
/// corner. `padding` insets the content box that dragged elements are kept in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { origin_x: 0.0, origin_y: 0.0, width: EDITOR_WIDTH, height: EDITOR_HEIGHT, padding: 0.0 }
    }
}

/// Axis-aligned rectangle used for the content box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Viewport {
    /// Convert a page-space point to card coordinates.
    #[must_use]
    pub fn page_to_card(&self, page: Point) -> Point {
        Point { x: page.x - self.origin_x, y: page.y - self.origin_y }
    }

    /// Convert a card-space point to page coordinates.
    #[must_use]
    pub fn card_to_page(&self, card: Point) -> Point {
        Point { x: card.x + self.origin_x, y: card.y + self.origin_y }
    }

    /// The region elements may occupy: the card minus its padding.
    #[must_use]
    pub fn content_box(&self) -> Bounds {
        Bounds {
            left: self.padding,
            top: self.padding,
            right: (self.width - self.padding).max(self.padding),
            bottom: (self.height - self.padding).max(self.padding),
        }
    }
}
