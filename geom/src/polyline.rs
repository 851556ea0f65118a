use crate::{Angle, Line, Pt2D, EPSILON_DIST};

/// An ordered sequence of points, with the distance along the line to every vertex cached, so
/// that `dist_along` is a binary search.
#[derive(Clone, Debug, PartialEq)]
pub struct PolyLine {
    pts: Vec<Pt2D>,
    cumulative: Vec<f64>,
}

impl PolyLine {
    /// Repeated points are kept; they just contribute zero length. None if there are fewer than 2
    /// points.
    pub fn new(pts: Vec<Pt2D>) -> Option<PolyLine> {
        if pts.len() < 2 {
            return None;
        }
        let mut cumulative = Vec::with_capacity(pts.len());
        let mut so_far = 0.0;
        cumulative.push(so_far);
        for pair in pts.windows(2) {
            so_far += pair[0].dist_to(pair[1]);
            cumulative.push(so_far);
        }
        Some(PolyLine { pts, cumulative })
    }

    pub fn length(&self) -> f64 {
        self.cumulative[self.cumulative.len() - 1]
    }

    /// Distance along the line to each vertex, starting with 0.
    pub fn cumulative_lengths(&self) -> &[f64] {
        &self.cumulative
    }

    /// Clamped to the endpoints. The angle is the direction of the segment containing the point.
    pub fn dist_along(&self, dist: f64) -> (Pt2D, Angle) {
        let idx = self.segment_idx(dist);
        let line = Line::new(self.pts[idx], self.pts[idx + 1]);
        (line.dist_along(dist - self.cumulative[idx]), line.angle())
    }

    // Index of the segment starting at or before `dist`, skipping zero-length segments when
    // possible.
    fn segment_idx(&self, dist: f64) -> usize {
        let last_segment = self.pts.len() - 2;
        let idx = self.cumulative.partition_point(|x| *x <= dist);
        let mut idx = idx.saturating_sub(1).min(last_segment);
        while idx < last_segment && self.cumulative[idx + 1] - self.cumulative[idx] < EPSILON_DIST
        {
            idx += 1;
        }
        idx
    }
}
