//! Planar geometry shared by the OpenDRIVE and spline crates. Everything is in meters and
//! radians, in a right-handed frame (x east, y north, headings counter-clockwise from +x).

mod angle;
mod line;
mod polyline;
mod pt;
mod stats;

pub use crate::angle::Angle;
pub use crate::line::{polyline_length, Line};
pub use crate::polyline::PolyLine;
pub use crate::pt::Pt2D;
pub use crate::stats::{Statistic, Stats};

/// Below this, two points are considered the same.
pub const EPSILON_DIST: f64 = 1e-9;
