use serde::{Deserialize, Serialize};

use geom::Pt2D;
use opendrive::{Error, LaneWidth};

use crate::spline::{PhantomPolicy, DEFAULT_ALPHA};
use crate::SplineRoad;

// The on-disk shape. Only the first four fields are required; the rest describe how the spline
// was made and fall back to what `fit` does by default.
#[derive(Serialize, Deserialize)]
struct RawSplineRoad {
    id: String,
    length: f64,
    control_points: Vec<[f64; 2]>,
    #[serde(default)]
    lane_widths: Vec<LaneWidth>,
    #[serde(default = "default_lane_id")]
    lane_id: i32,
    #[serde(default)]
    lane_sections_ignored: usize,
    #[serde(default)]
    phantom: PhantomPolicy,
    #[serde(default = "default_alpha")]
    alpha: f64,
}

fn default_lane_id() -> i32 {
    -1
}

fn default_alpha() -> f64 {
    DEFAULT_ALPHA
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<RawSplineRoad>),
    One(RawSplineRoad),
}

/// A pretty-printed JSON array with one object per road
pub fn to_json(roads: &[SplineRoad]) -> Result<String, Error> {
    let raw: Vec<RawSplineRoad> = roads
        .iter()
        .map(|road| RawSplineRoad {
            id: road.id.clone(),
            length: road.length,
            control_points: road.control_points.iter().map(|pt| pt.to_array()).collect(),
            lane_widths: road.lane_widths.clone(),
            lane_id: road.lane_id,
            lane_sections_ignored: road.lane_sections_ignored,
            phantom: road.phantom,
            alpha: road.alpha,
        })
        .collect();
    serde_json::to_string_pretty(&raw)
        .map_err(|err| Error::MalformedDocument(format!("couldn't serialize splines: {}", err)))
}

/// Accepts an array of roads or a single road object.
pub fn from_json(raw: &str) -> Result<Vec<SplineRoad>, Error> {
    let parsed: OneOrMany = serde_json::from_str(raw)
        .map_err(|err| Error::MalformedDocument(format!("bad spline JSON: {}", err)))?;
    let roads = match parsed {
        OneOrMany::Many(roads) => roads,
        OneOrMany::One(road) => vec![road],
    };
    Ok(roads
        .into_iter()
        .map(|road| SplineRoad {
            id: road.id,
            length: road.length,
            control_points: road.control_points.into_iter().map(Pt2D::from).collect(),
            lane_widths: road.lane_widths,
            lane_id: road.lane_id,
            lane_sections_ignored: road.lane_sections_ignored,
            phantom: road.phantom,
            alpha: road.alpha,
        })
        .collect())
}
