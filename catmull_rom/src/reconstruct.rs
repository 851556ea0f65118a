use nalgebra::{DMatrix, DVector};

use geom::{polyline_length, Angle, Pt2D, EPSILON_DIST};
use opendrive::{
    Error, GeometrySegment, LaneProfile, LaneWidth, ParamRange, Primitive, Road, Side,
    DEFAULT_LANE_WIDTH,
};

use crate::spline::CatmullRom;
use crate::SplineRoad;

#[derive(Clone, Debug, PartialEq)]
pub struct ReconstructOptions {
    /// How many points of each span the cubics are fit to. At least 4.
    pub samples_per_span: usize,
    /// How finely each span is walked to measure its length
    pub arc_length_samples: usize,
}

impl Default for ReconstructOptions {
    fn default() -> ReconstructOptions {
        ReconstructOptions {
            samples_per_span: 16,
            arc_length_samples: 64,
        }
    }
}

/// Rebuilds an OpenDRIVE road from a spline, one normalized `paramPoly3` per span. The reference
/// line follows the spline, and a single lane is centered on it, on the same side as the lane
/// that was originally traced. Its widths are stretched to the new length.
pub fn reconstruct(spline: &SplineRoad, opts: &ReconstructOptions) -> Result<Road, Error> {
    if opts.samples_per_span < 4 || opts.arc_length_samples < 1 {
        return Err(Error::InvalidConfiguration(format!(
            "reconstruction needs at least 4 samples per span and 1 arc length sample, not {} \
             and {}",
            opts.samples_per_span, opts.arc_length_samples
        )));
    }
    if !(spline.length > 0.0) {
        return Err(Error::MalformedDocument(format!(
            "declared length must be positive, not {}",
            spline.length
        )));
    }
    let curve = spline.curve()?;

    let mut segments = Vec::new();
    let mut s0 = 0.0;
    let mut heading = Angle::ZERO;
    let mut worst_residual: f64 = 0.0;
    for span in 0..curve.spans() {
        let [_, start, end, _] = curve.span_points(span);
        // Keep the previous heading through repeated points
        if start.dist_to(end) > EPSILON_DIST {
            heading = start.angle_to(end);
        }

        let length = span_length(&curve, span, opts.arc_length_samples);
        if length < EPSILON_DIST {
            debug!("Skipping span {} of road {}; it has no length", span, spline.id);
            continue;
        }

        let (kind, residual) = fit_span(&curve, span, start, heading, opts.samples_per_span)?;
        worst_residual = worst_residual.max(residual);
        segments.push(GeometrySegment {
            s0,
            origin: start,
            heading,
            length,
            kind,
        });
        s0 += length;
    }
    if segments.is_empty() {
        return Err(Error::MalformedDocument(format!(
            "road {} has no length; all {} control points are the same",
            spline.id,
            spline.control_points.len()
        )));
    }
    debug!(
        "Rebuilt road {} from {} spans, {}m long (declared {}m). Worst fit residual is {}m",
        spline.id,
        segments.len(),
        s0,
        spline.length,
        worst_residual
    );

    let (lane, lane_offset) = centered_lane(spline, s0 / spline.length);
    Ok(Road {
        id: spline.id.clone(),
        length: s0,
        segments,
        lane_offset,
        lane,
        lane_sections_ignored: spline.lane_sections_ignored,
    })
}

fn span_length(curve: &CatmullRom, span: usize, steps: usize) -> f64 {
    let pts: Vec<Pt2D> = (0..=steps)
        .map(|i| curve.eval(span, (i as f64) / (steps as f64)))
        .collect();
    polyline_length(&pts)
}

// Least squares cubics through the span in the frame at its start. A Catmull-Rom span is itself a
// cubic in its parameter, so the residual only reflects floating point error.
fn fit_span(
    curve: &CatmullRom,
    span: usize,
    origin: Pt2D,
    heading: Angle,
    samples: usize,
) -> Result<(Primitive, f64), Error> {
    let params: Vec<f64> = (0..samples)
        .map(|i| (i as f64) / ((samples - 1) as f64))
        .collect();
    let mut us = DVector::<f64>::zeros(samples);
    let mut vs = DVector::<f64>::zeros(samples);
    for (i, p) in params.iter().enumerate() {
        let (u, v) = origin.global_to_local(heading, curve.eval(span, *p));
        us[i] = u;
        vs[i] = v;
    }

    let vandermonde = DMatrix::<f64>::from_fn(samples, 4, |row, col| params[row].powi(col as i32));
    let svd = vandermonde.clone().svd(true, true);
    let u_coeffs = svd
        .solve(&us, 1e-12)
        .map_err(|err| Error::MalformedDocument(format!("couldn't fit span {}: {}", span, err)))?;
    let v_coeffs = svd
        .solve(&vs, 1e-12)
        .map_err(|err| Error::MalformedDocument(format!("couldn't fit span {}: {}", span, err)))?;

    let u_residual = (&vandermonde * &u_coeffs - &us).amax();
    let v_residual = (&vandermonde * &v_coeffs - &vs).amax();

    Ok((
        Primitive::ParamPoly3 {
            au: u_coeffs[0],
            bu: u_coeffs[1],
            cu: u_coeffs[2],
            du: u_coeffs[3],
            av: v_coeffs[0],
            bv: v_coeffs[1],
            cv: v_coeffs[2],
            dv: v_coeffs[3],
            p_range: ParamRange::Normalized,
        },
        u_residual.max(v_residual),
    ))
}

// The rebuilt reference line is the traced centerline, so a lane offset of half the width puts
// the lane's center right back on it.
fn centered_lane(spline: &SplineRoad, stretch: f64) -> (LaneProfile, Vec<LaneWidth>) {
    let side = Side::of_lane(spline.lane_id).unwrap_or(Side::Right);
    let widths: Vec<LaneWidth> = if spline.lane_widths.is_empty() {
        vec![LaneWidth::constant(0.0, DEFAULT_LANE_WIDTH)]
    } else {
        spline
            .lane_widths
            .iter()
            .map(|record| record.rescaled(stretch))
            .collect()
    };
    let lane_offset = widths
        .iter()
        .map(|record| record.scaled_by(-0.5 * side.sign()))
        .collect();
    let lane = LaneProfile {
        lane_id: match side {
            Side::Left => 1,
            Side::Right => -1,
        },
        widths,
        inner: Vec::new(),
    };
    (lane, lane_offset)
}
