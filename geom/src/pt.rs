use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Angle, EPSILON_DIST};

/// A point in world-space, in meters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pt2D {
    x: f64,
    y: f64,
}

impl Pt2D {
    pub fn new(x: f64, y: f64) -> Pt2D {
        if !x.is_finite() || !y.is_finite() {
            panic!("Bad Pt2D {}, {}", x, y);
        }

        Pt2D { x, y }
    }

    pub fn x(self) -> f64 {
        self.x
    }

    pub fn y(self) -> f64 {
        self.y
    }

    /// Moves `dist` in the direction of `theta`. A negative distance moves the opposite way.
    pub fn project_away(self, dist: f64, theta: Angle) -> Pt2D {
        let (sin, cos) = theta.sin_cos();
        Pt2D::new(self.x + dist * cos, self.y + dist * sin)
    }

    pub fn angle_to(self, to: Pt2D) -> Angle {
        Angle::new_rads((to.y - self.y).atan2(to.x - self.x))
    }

    pub fn dist_to(self, to: Pt2D) -> f64 {
        (self.x - to.x).hypot(self.y - to.y)
    }

    /// Interprets `(u, v)` in a frame whose origin is `self` and whose +u axis points along
    /// `heading`, and returns the point in the global frame.
    pub fn local_to_global(self, heading: Angle, u: f64, v: f64) -> Pt2D {
        let (sin, cos) = heading.sin_cos();
        Pt2D::new(self.x + u * cos - v * sin, self.y + u * sin + v * cos)
    }

    /// The inverse of `local_to_global`.
    pub fn global_to_local(self, heading: Angle, pt: Pt2D) -> (f64, f64) {
        let (sin, cos) = heading.sin_cos();
        let dx = pt.x - self.x;
        let dy = pt.y - self.y;
        (dx * cos + dy * sin, -dx * sin + dy * cos)
    }

    /// `self + t * (other - self)`
    pub fn lerp(self, other: Pt2D, t: f64) -> Pt2D {
        Pt2D::new(
            self.x + t * (other.x - self.x),
            self.y + t * (other.y - self.y),
        )
    }

    /// Reflects `self` through `center`.
    pub fn reflect_through(self, center: Pt2D) -> Pt2D {
        Pt2D::new(2.0 * center.x - self.x, 2.0 * center.y - self.y)
    }

    pub fn approx_eq(self, other: Pt2D, threshold: f64) -> bool {
        self.dist_to(other) <= threshold
    }

    pub fn is_same(self, other: Pt2D) -> bool {
        self.approx_eq(other, EPSILON_DIST)
    }

    pub fn to_array(self) -> [f64; 2] {
        [self.x, self.y]
    }
}

impl From<[f64; 2]> for Pt2D {
    fn from(pair: [f64; 2]) -> Pt2D {
        Pt2D::new(pair[0], pair[1])
    }
}

impl fmt::Display for Pt2D {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Pt2D({0}, {1})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_frame_round_trip() {
        let origin = Pt2D::new(10.0, -3.0);
        let heading = Angle::new_degs(30.0);
        let pt = origin.local_to_global(heading, 4.0, 2.5);
        let (u, v) = origin.global_to_local(heading, pt);
        assert!((u - 4.0).abs() < 1e-12);
        assert!((v - 2.5).abs() < 1e-12);
    }

    #[test]
    fn project_and_reflect() {
        let pt = Pt2D::new(1.0, 1.0).project_away(-2.0, Angle::ZERO);
        assert!(pt.approx_eq(Pt2D::new(-1.0, 1.0), 1e-12));
        assert_eq!(
            Pt2D::new(0.0, 0.0).reflect_through(Pt2D::new(1.0, 2.0)),
            Pt2D::new(2.0, 4.0)
        );
        assert_eq!(Pt2D::new(3.0, 4.0).dist_to(Pt2D::new(0.0, 0.0)), 5.0);
    }
}
