//! Plain 2D value types shared by the scene graph.

use crate::error::SceneError;

/// A point in some coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Approximate equality, used when comparing transformed coordinates.
    pub fn approx_eq(&self, other: Point, epsilon: f32) -> bool {
        (self.x - other.x).abs() <= epsilon && (self.y - other.y).abs() <= epsilon
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

/// A per-axis factor: scale, anchor point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ONE: Self = Self { x: 1.0, y: 1.0 };
    pub const CENTER: Self = Self { x: 0.5, y: 0.5 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn uniform(v: f32) -> Self {
        Self { x: v, y: v }
    }
}

impl Default for Vec2 {
    fn default() -> Self {
        Self::ONE
    }
}

impl From<f32> for Vec2 {
    fn from(v: f32) -> Self {
        Self::uniform(v)
    }
}

impl From<(f32, f32)> for Vec2 {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl From<[f32; 2]> for Vec2 {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

/// Width and height of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl From<(f32, f32)> for Size {
    fn from((width, height): (f32, f32)) -> Self {
        Self { width, height }
    }
}

impl From<[f32; 2]> for Size {
    fn from([width, height]: [f32; 2]) -> Self {
        Self { width, height }
    }
}

/// Reads an argument slice as an (x, y) pair. One value is sugar for (v, v).
pub(crate) fn pair_from_args(property: &'static str, args: &[f32]) -> Result<(f32, f32), SceneError> {
    match *args {
        [v] => Ok((v, v)),
        [x, y] => Ok((x, y)),
        _ => Err(SceneError::InvalidArity {
            property,
            expected: "1 or 2",
            got: args.len(),
        }),
    }
}

/// Reads an argument slice holding exactly one value.
pub(crate) fn scalar_from_args(property: &'static str, args: &[f32]) -> Result<f32, SceneError> {
    match *args {
        [v] => Ok(v),
        _ => Err(SceneError::InvalidArity {
            property,
            expected: "1",
            got: args.len(),
        }),
    }
}

/// An axis-aligned rectangle stored by its edges.
///
/// Used both for a node's local frame and for bounding boxes in parent
/// space. `top` is the smaller y coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Frame {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Frame {
    pub fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// True when the frame has no area on either axis.
    pub fn is_degenerate(&self) -> bool {
        self.left == self.right || self.top == self.bottom
    }

    /// Edge-inclusive containment test.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }

    /// Grow this frame so it also covers `other`.
    pub fn expand_to_include(&mut self, other: &Frame) {
        self.top = self.top.min(other.top);
        self.left = self.left.min(other.left);
        self.bottom = self.bottom.max(other.bottom);
        self.right = self.right.max(other.right);
    }
}
