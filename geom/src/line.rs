use crate::{Angle, Pt2D, EPSILON_DIST};

/// A line segment between two points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line(Pt2D, Pt2D);

impl Line {
    pub fn new(pt1: Pt2D, pt2: Pt2D) -> Line {
        Line(pt1, pt2)
    }

    pub fn pt1(&self) -> Pt2D {
        self.0
    }

    pub fn pt2(&self) -> Pt2D {
        self.1
    }

    pub fn length(&self) -> f64 {
        self.0.dist_to(self.1)
    }

    pub fn angle(&self) -> Angle {
        self.0.angle_to(self.1)
    }

    /// The point `dist` along the line, clamped to the endpoints. A degenerate line returns its
    /// first point.
    pub fn dist_along(&self, dist: f64) -> Pt2D {
        let len = self.length();
        if len < EPSILON_DIST {
            return self.0;
        }
        self.0.lerp(self.1, (dist / len).clamp(0.0, 1.0))
    }

    pub fn reversed(&self) -> Line {
        Line(self.1, self.0)
    }
}

/// Sums the lengths of consecutive segments.
pub fn polyline_length(pts: &[Pt2D]) -> f64 {
    pts.windows(2).map(|pair| pair[0].dist_to(pair[1])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dist_along_clamps() {
        let line = Line::new(Pt2D::new(0.0, 0.0), Pt2D::new(10.0, 0.0));
        assert_eq!(line.dist_along(2.5), Pt2D::new(2.5, 0.0));
        assert_eq!(line.dist_along(12.0), Pt2D::new(10.0, 0.0));
        assert_eq!(line.reversed().dist_along(0.0), Pt2D::new(10.0, 0.0));
        assert_eq!(
            polyline_length(&[Pt2D::new(0.0, 0.0), Pt2D::new(3.0, 4.0), Pt2D::new(3.0, 5.0)]),
            6.0
        );
    }
}
