//! Basic geometry types.
//!
//! The bridge works in a single logical coordinate space that maps one-to-one
//! onto pixels of the host display, so these types are plain `i32` carriers
//! without a coordinate-kind marker.

use std::ops::{Add, Sub};

/// A point in compositor space.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

impl Point {
    /// Build a point from its coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

impl From<(i32, i32)> for Point {
    #[inline]
    fn from((x, y): (i32, i32)) -> Self {
        Point::new(x, y)
    }
}

/// A two-dimensional extent.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    /// Width.
    pub w: i32,
    /// Height.
    pub h: i32,
}

impl Size {
    /// Build a size from width and height.
    pub const fn new(w: i32, h: i32) -> Self {
        Self { w, h }
    }
}

impl From<(i32, i32)> for Size {
    #[inline]
    fn from((w, h): (i32, i32)) -> Self {
        Size::new(w, h)
    }
}

/// An axis-aligned rectangle, stored as a location and a size.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rectangle {
    /// Top-left corner.
    pub loc: Point,
    /// Extent.
    pub size: Size,
}

impl Rectangle {
    /// Build a rectangle from its location and size.
    pub const fn new(loc: Point, size: Size) -> Self {
        Self { loc, size }
    }

    /// Build a rectangle from raw coordinates.
    pub const fn from_coords(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self::new(Point::new(x, y), Size::new(w, h))
    }
}
