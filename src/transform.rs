//! Coordinate conversions between a node's local space and its parent's.
//!
//! A node's placement maps a local point outward by rotating it, scaling
//! it, then translating it by the node's position. Positive angles turn
//! local +x toward +y, so a node rotated by 90 degrees maps (1, 0) to
//! (0, 1). [`Placement::parent_to_local`] is the exact inverse.

use crate::geometry::{Frame, Point, Size, Vec2};

/// A 2D affine matrix stored in row-major order.
///
/// ```text
/// | a  b  tx |
/// | c  d  ty |
/// | 0  0  1  |
/// ```
///
/// Backends use it to compose the world transform of raster-painted
/// descendants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// `[a, b, tx, c, d, ty]`
    pub data: [f32; 6],
}

impl Transform {
    pub const IDENTITY: Self = Self {
        data: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
    };

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn translate(x: f32, y: f32) -> Self {
        Self {
            data: [1.0, 0.0, x, 0.0, 1.0, y],
        }
    }

    /// Rotation about the origin; positive angles turn +x toward +y.
    pub fn rotate(angle_radians: f32) -> Self {
        let cos = angle_radians.cos();
        let sin = angle_radians.sin();
        Self {
            data: [cos, -sin, 0.0, sin, cos, 0.0],
        }
    }

    pub fn rotate_degrees(angle_degrees: f32) -> Self {
        Self::rotate(angle_degrees.to_radians())
    }

    pub fn scale_xy(sx: f32, sy: f32) -> Self {
        Self {
            data: [sx, 0.0, 0.0, 0.0, sy, 0.0],
        }
    }

    /// Compose with another transform: `self * other`.
    /// Applies `other` first, then `self`.
    pub fn then(&self, other: &Transform) -> Transform {
        let [a1, b1, tx1, c1, d1, ty1] = self.data;
        let [a2, b2, tx2, c2, d2, ty2] = other.data;
        Transform {
            data: [
                a1 * a2 + b1 * c2,
                a1 * b2 + b1 * d2,
                a1 * tx2 + b1 * ty2 + tx1,
                c1 * a2 + d1 * c2,
                c1 * b2 + d1 * d2,
                c1 * tx2 + d1 * ty2 + ty1,
            ],
        }
    }

    /// Inverse of this transform. A degenerate matrix (zero scale) has no
    /// inverse and yields the identity.
    pub fn inverse(&self) -> Transform {
        let [a, b, tx, c, d, ty] = self.data;
        let det = a * d - b * c;
        if det.abs() < 1e-10 {
            return Self::IDENTITY;
        }
        let inv_det = 1.0 / det;
        Transform {
            data: [
                d * inv_det,
                -b * inv_det,
                (-d * tx + b * ty) * inv_det,
                -c * inv_det,
                a * inv_det,
                (c * tx - a * ty) * inv_det,
            ],
        }
    }

    pub fn transform_point(&self, p: Point) -> Point {
        let [a, b, tx, c, d, ty] = self.data;
        Point::new(a * p.x + b * p.y + tx, c * p.x + d * p.y + ty)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// The geometric state that places a node inside its parent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub position: Point,
    pub scale: Vec2,
    /// Degrees.
    pub rotation: f32,
}

impl Placement {
    pub fn new(position: Point, scale: Vec2, rotation: f32) -> Self {
        Self {
            position,
            scale,
            rotation,
        }
    }

    pub fn local_to_parent(&self, p: Point) -> Point {
        let mut p = p;
        if self.rotation != 0.0 {
            let (sin, cos) = self.rotation.to_radians().sin_cos();
            p = Point::new(p.x * cos - p.y * sin, p.x * sin + p.y * cos);
        }
        Point::new(
            p.x * self.scale.x + self.position.x,
            p.y * self.scale.y + self.position.y,
        )
    }

    pub fn parent_to_local(&self, p: Point) -> Point {
        let p = Point::new(
            (p.x - self.position.x) / self.scale.x,
            (p.y - self.position.y) / self.scale.y,
        );
        if self.rotation == 0.0 {
            return p;
        }
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        Point::new(p.x * cos + p.y * sin, -p.x * sin + p.y * cos)
    }

    /// Matrix form of [`Placement::local_to_parent`].
    pub fn to_transform(&self) -> Transform {
        let outer = Transform::translate(self.position.x, self.position.y)
            .then(&Transform::scale_xy(self.scale.x, self.scale.y));
        if self.rotation == 0.0 {
            outer
        } else {
            outer.then(&Transform::rotate_degrees(self.rotation))
        }
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::new(Point::ZERO, Vec2::ONE, 0.0)
    }
}

/// Local rectangle derived from size and anchor point.
pub fn frame(size: Size, anchor: Vec2) -> Frame {
    Frame {
        top: -size.height * anchor.y,
        right: size.width * (1.0 - anchor.x),
        bottom: size.height * (1.0 - anchor.y),
        left: -size.width * anchor.x,
    }
}

/// Axis-aligned box in parent space covering `frame` after placement,
/// widened outward to whole pixels.
pub fn bounding_box(placement: &Placement, frame: &Frame) -> Frame {
    let corners = [
        Point::new(frame.left, frame.top),
        Point::new(frame.right, frame.top),
        Point::new(frame.right, frame.bottom),
        Point::new(frame.left, frame.bottom),
    ]
    .map(|c| placement.local_to_parent(c));

    let mut min = corners[0];
    let mut max = corners[0];
    for c in &corners[1..] {
        min.x = min.x.min(c.x);
        min.y = min.y.min(c.y);
        max.x = max.x.max(c.x);
        max.y = max.y.max(c.y);
    }

    Frame {
        top: min.y.floor(),
        right: max.x.ceil(),
        bottom: max.y.ceil(),
        left: min.x.floor(),
    }
}
