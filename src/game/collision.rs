//! Static arena geometry: rectangle containment and struck-face detection

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle, origin top-left
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// Velocity components to flip after a bullet strikes a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reflection {
    /// Left or right face (or side wall): flip vx
    X,
    /// Top or bottom face (or top/bottom wall): flip vy
    Y,
    /// Corner: flip both
    Both,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Positive, finite extent
    pub fn is_well_formed(&self) -> bool {
        [self.x, self.y, self.w, self.h].iter().all(|v| v.is_finite())
            && self.w > 0.0
            && self.h > 0.0
    }

    /// Point strictly inside the rectangle (edges excluded)
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x > self.x && x < self.x + self.w && y > self.y && y < self.y + self.h
    }

    /// Point strictly inside the rectangle grown by `radius` on all four sides.
    ///
    /// This is a Minkowski-expanded AABB test: a circle of `radius` near a
    /// corner counts as colliding even when its edge does not touch the corner.
    pub fn contains_expanded(&self, x: f32, y: f32, radius: f32) -> bool {
        x > self.x - radius
            && x < self.x + self.w + radius
            && y > self.y - radius
            && y < self.y + self.h + radius
    }

    /// `x` lies within the horizontal extent, edges included
    pub fn spans_x(&self, x: f32) -> bool {
        x >= self.x && x <= self.x + self.w
    }

    /// `y` lies within the vertical extent, edges included
    pub fn spans_y(&self, y: f32) -> bool {
        y >= self.y && y <= self.y + self.h
    }

    /// Infer which face was crossed by a point that moved from `(prev_x, prev_y)`
    /// (outside) to somewhere inside this rectangle.
    ///
    /// A pre-step point inside the x-range can only have entered through the top
    /// or bottom face; inside the y-range, through a side face. Neither means the
    /// step cut across a corner.
    pub fn struck_face(&self, prev_x: f32, prev_y: f32) -> Reflection {
        if self.spans_x(prev_x) {
            Reflection::Y
        } else if self.spans_y(prev_y) {
            Reflection::X
        } else {
            Reflection::Both
        }
    }
}

/// Static collision world: square arena bounds plus obstacles
#[derive(Debug, Clone, Copy)]
pub struct ArenaGeometry<'a> {
    pub map_size: f32,
    pub obstacles: &'a [Rect],
}

impl<'a> ArenaGeometry<'a> {
    pub fn new(map_size: f32, obstacles: &'a [Rect]) -> Self {
        Self {
            map_size,
            obstacles,
        }
    }

    /// Whether a body of `radius` centered at `(x, y)` is blocked.
    ///
    /// Bounds are checked on the center point only; obstacles are grown by
    /// `radius`.
    pub fn collides(&self, x: f32, y: f32, radius: f32) -> bool {
        if x < 0.0 || x > self.map_size || y < 0.0 || y > self.map_size {
            return true;
        }
        self.obstacles
            .iter()
            .any(|obs| obs.contains_expanded(x, y, radius))
    }

    /// Boundary reflection for a point at or past an arena wall.
    /// Side walls take precedence over top/bottom walls.
    pub fn boundary_reflection(&self, x: f32, y: f32) -> Option<Reflection> {
        if x <= 0.0 || x >= self.map_size {
            Some(Reflection::X)
        } else if y <= 0.0 || y >= self.map_size {
            Some(Reflection::Y)
        } else {
            None
        }
    }

    /// First obstacle strictly containing the point
    pub fn obstacle_at(&self, x: f32, y: f32) -> Option<&'a Rect> {
        self.obstacles.iter().find(|obs| obs.contains(x, y))
    }
}
