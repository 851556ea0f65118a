//! A planar subset of [OpenDRIVE](https://www.asam.net/standards/detail/opendrive/): the
//! reference line of each road (`planView`), lane offsets and widths from the first lane section,
//! and enough of the lane structure to pick one lane and trace its centerline.
//!
//! Reading happens once: every `<geometry>` element becomes a `Primitive` variant, and
//! downstream code never looks at XML again.

#[macro_use]
extern crate log;

mod centerline;
mod error;
mod model;
mod primitive;
mod reader;
mod spiral;
mod writer;

pub use crate::centerline::{reference_line, sample, sample_positions};
pub use crate::error::{Error, RoadError};
pub use crate::model::{
    GeometrySegment, InnerLane, LaneProfile, LaneWidth, ParamRange, Pose, Primitive, Road,
    SamplePoint, Side,
};
pub use crate::primitive::segment;
pub use crate::reader::{read_document, Document, ExtractOptions, LaneSelection};
pub use crate::writer::write_document;

/// The default tolerance when checking that segment lengths add up to the road length, in meters.
pub const DEFAULT_LENGTH_TOLERANCE: f64 = 1e-3;

/// Used when a road has no lane of its own to write
pub const DEFAULT_LANE_WIDTH: f64 = 3.5;

/// Coordinates and lengths further than this from zero, in meters, are rejected. Anything
/// computed from bounded inputs stays finite.
pub const MAX_COORDINATE: f64 = 1e9;
