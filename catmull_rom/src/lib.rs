//! Catmull-Rom splines through lane centerlines: fitting them to sampled roads, the JSON
//! interchange format, and turning them back into OpenDRIVE geometry.

#[macro_use]
extern crate log;

mod fit;
mod interchange;
mod reconstruct;
mod spline;

pub use crate::fit::{fit, SplineOptions, SplineRoad, MIN_FIT_POINTS};
pub use crate::interchange::{from_json, to_json};
pub use crate::reconstruct::{reconstruct, ReconstructOptions};
pub use crate::spline::{ArcLengthTable, CatmullRom, PhantomPolicy, DEFAULT_ALPHA};
