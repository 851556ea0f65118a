use serde::{Deserialize, Serialize};

use catmull_rom::SplineRoad;
use geom::{PolyLine, Pt2D, Stats, EPSILON_DIST};
use opendrive::{sample, sample_positions, Document, Error, Road, RoadError};
use roadutil::Timer;

use crate::ConvertOptions;

// The original centerline's own length is measured this many times more finely than it's sampled.
const MEASURE_REFINEMENT: f64 = 10.0;

/// How far one road's spline strays from its original centerline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadAccuracy {
    pub id: String,
    /// `(s, deviation)`, with `s` along the original road's reference line
    pub deviations: Vec<(f64, f64)>,
    pub stats: Stats,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadFailure {
    pub road: String,
    pub kind: String,
    pub error: String,
}

impl From<&RoadError> for RoadFailure {
    fn from(err: &RoadError) -> RoadFailure {
        RoadFailure {
            road: err.road.clone(),
            kind: err.error.kind().to_string(),
            error: err.error.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub roads: Vec<RoadAccuracy>,
    pub errors: Vec<RoadFailure>,
    /// Over every deviation of every road that could be evaluated. None if no road could.
    pub overall: Option<Stats>,
}

impl AccuracyReport {
    fn new(results: Vec<Result<RoadAccuracy, RoadError>>) -> AccuracyReport {
        let mut roads = Vec::new();
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(road) => roads.push(road),
                Err(err) => {
                    warn!("{}", err);
                    errors.push(RoadFailure::from(&err));
                }
            }
        }
        let overall = Stats::new(
            roads
                .iter()
                .flat_map(|road| road.deviations.iter().map(|(_, dev)| *dev)),
        );
        if let Some(ref stats) = overall {
            info!(
                "Evaluated {} roads ({} failed): {}",
                roads.len(),
                errors.len(),
                stats.describe()
            );
        }
        AccuracyReport {
            roads,
            errors,
            overall,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Compares the original centerline against the spline, evaluated through its own basis. Points
/// are matched by the fraction of each curve's arc length.
pub fn evaluate_road(
    original: &Road,
    spline: &SplineRoad,
    opts: &ConvertOptions,
) -> Result<RoadAccuracy, Error> {
    if (original.length - spline.length).abs() > opts.length_tolerance {
        return Err(Error::LengthMismatch {
            original: original.length,
            converted: spline.length,
        });
    }
    let table = spline
        .curve()?
        .arc_length_table(opts.reconstruct.arc_length_samples);
    compare(original, opts, |fraction| table.pt_at_fraction(fraction))
}

/// Compares the original centerline against the centerline of the road rebuilt from its spline.
/// The rebuilt road's length is whatever the spline measured, so lengths aren't checked.
pub fn evaluate_reconstruction(
    original: &Road,
    rebuilt: &Road,
    opts: &ConvertOptions,
) -> Result<RoadAccuracy, Error> {
    let rebuilt_line = measured_centerline(rebuilt, opts.resolution / MEASURE_REFINEMENT)?;
    compare(original, opts, |fraction| {
        rebuilt_line
            .line
            .dist_along(fraction * rebuilt_line.line.length())
            .0
    })
}

fn compare<F: Fn(f64) -> Pt2D>(
    original: &Road,
    opts: &ConvertOptions,
    converted_at_fraction: F,
) -> Result<RoadAccuracy, Error> {
    let samples = sample(original, opts.resolution)?;
    let measured = measured_centerline(original, opts.resolution / MEASURE_REFINEMENT)?;

    let deviations: Vec<(f64, f64)> = samples
        .iter()
        .map(|sample| {
            let converted = converted_at_fraction(measured.fraction_at(sample.s));
            (sample.s, sample.pt.dist_to(converted))
        })
        .collect();
    let stats = Stats::new(deviations.iter().map(|(_, dev)| *dev)).ok_or(
        Error::InsufficientPoints {
            required: 1,
            got: 0,
        },
    )?;
    debug!("Road {}: {}", original.id, stats.describe());

    Ok(RoadAccuracy {
        id: original.id.clone(),
        deviations,
        stats,
    })
}

// A finely sampled centerline, remembering the road position of every point.
struct MeasuredCenterline {
    positions: Vec<f64>,
    line: PolyLine,
}

fn measured_centerline(road: &Road, resolution: f64) -> Result<MeasuredCenterline, Error> {
    let positions = sample_positions(road.length, resolution)?;
    let mut pts = Vec::with_capacity(positions.len());
    for s in &positions {
        pts.push(road.centerline_pose(*s)?.pt);
    }
    let line = PolyLine::new(pts).ok_or(Error::InsufficientPoints {
        required: 2,
        got: positions.len(),
    })?;
    Ok(MeasuredCenterline { positions, line })
}

impl MeasuredCenterline {
    /// How far along the centerline the road position `s` is, from 0 to 1
    fn fraction_at(&self, s: f64) -> f64 {
        let total = self.line.length();
        let last = self.positions.len() - 1;
        if total < EPSILON_DIST {
            return s / self.positions[last];
        }
        let idx = self
            .positions
            .partition_point(|x| *x <= s)
            .saturating_sub(1)
            .min(last - 1);
        let (s1, s2) = (self.positions[idx], self.positions[idx + 1]);
        let cumulative = self.line.cumulative_lengths();
        let t = ((s - s1) / (s2 - s1)).clamp(0.0, 1.0);
        let dist = cumulative[idx] + t * (cumulative[idx + 1] - cumulative[idx]);
        (dist / total).clamp(0.0, 1.0)
    }
}

/// Pairs every spline with the original road of the same ID and evaluates each pair. Roads that
/// failed to extract, splines without an original, and length mismatches are reported as errors.
pub fn evaluate_document(
    originals: &Document,
    splines: &[SplineRoad],
    opts: &ConvertOptions,
    timer: &mut Timer,
) -> AccuracyReport {
    let results = timer.parallelize(
        "evaluate accuracy",
        opts.parallelism(),
        splines.iter().collect(),
        |spline| {
            let original = match originals.roads.iter().find(|(id, _)| id == &spline.id) {
                Some((_, Ok(road))) => road,
                Some((_, Err(err))) => return Err(err.clone().for_road(spline.id.clone())),
                None => {
                    return Err(Error::MalformedDocument(
                        "no road with this ID in the original document".to_string(),
                    )
                    .for_road(spline.id.clone()))
                }
            };
            evaluate_road(original, spline, opts).map_err(|err| err.for_road(spline.id.clone()))
        },
    );
    AccuracyReport::new(results)
}

/// Evaluates every rebuilt road against the original road of the same ID.
pub fn evaluate_reconstructions(
    originals: &Document,
    rebuilt: &[Road],
    opts: &ConvertOptions,
    timer: &mut Timer,
) -> AccuracyReport {
    let results = timer.parallelize(
        "evaluate reconstruction",
        opts.parallelism(),
        rebuilt.iter().collect(),
        |road| {
            let original = match originals.roads.iter().find(|(id, _)| id == &road.id) {
                Some((_, Ok(original))) => original,
                Some((_, Err(err))) => return Err(err.clone().for_road(road.id.clone())),
                None => {
                    return Err(Error::MalformedDocument(
                        "no road with this ID in the original document".to_string(),
                    )
                    .for_road(road.id.clone()))
                }
            };
            evaluate_reconstruction(original, road, opts)
                .map_err(|err| err.for_road(road.id.clone()))
        },
    );
    AccuracyReport::new(results)
}
