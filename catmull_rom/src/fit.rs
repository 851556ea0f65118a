use geom::Pt2D;
use opendrive::{Error, LaneWidth, Road, SamplePoint};

use crate::spline::{check_alpha, CatmullRom, PhantomPolicy, DEFAULT_ALPHA};

/// A spline needs a span on each side of an interior point to be worth fitting.
pub const MIN_FIT_POINTS: usize = 4;

#[derive(Clone, Debug, PartialEq)]
pub struct SplineOptions {
    pub phantom: PhantomPolicy,
    pub alpha: f64,
}

impl Default for SplineOptions {
    fn default() -> SplineOptions {
        SplineOptions {
            phantom: PhantomPolicy::Extrapolate,
            alpha: DEFAULT_ALPHA,
        }
    }
}

/// One road in the interchange format: the control points of its centerline spline, plus enough
/// lane data to rebuild the road.
#[derive(Clone, Debug, PartialEq)]
pub struct SplineRoad {
    pub id: String,
    /// The length of the original road's reference line
    pub length: f64,
    pub control_points: Vec<Pt2D>,
    /// The traced lane's width records, with absolute `s`. For lane 0, the width of the whole
    /// carriageway, if there is one.
    pub lane_widths: Vec<LaneWidth>,
    /// The lane that was traced, or 0 for the reference line or the middle of the carriageway
    pub lane_id: i32,
    pub lane_sections_ignored: usize,
    pub phantom: PhantomPolicy,
    pub alpha: f64,
}

impl SplineRoad {
    pub fn curve(&self) -> Result<CatmullRom, Error> {
        CatmullRom::new(&self.control_points, self.alpha, self.phantom)
    }
}

/// Uses the centerline samples directly as control points, so the spline passes through every
/// one of them.
pub fn fit(road: &Road, samples: &[SamplePoint], opts: &SplineOptions) -> Result<SplineRoad, Error> {
    check_alpha(opts.alpha)?;
    if samples.len() < MIN_FIT_POINTS {
        return Err(Error::InsufficientPoints {
            required: MIN_FIT_POINTS,
            got: samples.len(),
        });
    }

    let spline = SplineRoad {
        id: road.id.clone(),
        length: road.length,
        control_points: samples.iter().map(|sample| sample.pt).collect(),
        lane_widths: road.lane.widths.clone(),
        lane_id: road.lane.lane_id,
        lane_sections_ignored: road.lane_sections_ignored,
        phantom: opts.phantom,
        alpha: opts.alpha,
    };
    debug!(
        "Fit road {} with {} control points",
        spline.id,
        spline.control_points.len()
    );
    Ok(spline)
}
