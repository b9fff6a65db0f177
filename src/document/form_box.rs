//! Axis-aligned ruled boxes found on a form page.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle detected on a page.
///
/// `area` is always `width * height`; the only way to build a box is
/// [`FormBox::new`], which derives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    area: i64,
}

impl FormBox {
    #[inline]
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            area: i64::from(width) * i64::from(height),
        }
    }

    #[inline]
    pub fn area(&self) -> i64 {
        self.area
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Returns a box shrunk by the given insets on each side. A negative
    /// inset grows that side.
    ///
    /// Width and height never drop below 1.
    pub fn inset(&self, left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(
            self.x + left,
            self.y + top,
            (self.width - left - right).max(1),
            (self.height - top - bottom).max(1),
        )
    }
}

/// How a group of boxes is ordered before positions are bound to fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoxOrder {
    /// Descending area, ties broken by ascending `y`
    Area,
    /// Ascending `y`
    Top,
    /// Ascending `x`
    Left,
}

impl Default for BoxOrder {
    fn default() -> Self {
        Self::Area
    }
}
