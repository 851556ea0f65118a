use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use geom::{PolyLine, Pt2D};
use opendrive::{Error, MAX_COORDINATE};

/// Centripetal parameterization
pub const DEFAULT_ALPHA: f64 = 0.5;

// Knot intervals shorter than this are stretched, so repeated points don't divide by zero.
const MIN_KNOT_INTERVAL: f64 = 1e-6;

/// How the virtual point beyond each end of the control points is made up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhantomPolicy {
    /// Mirror the neighbor through the endpoint: `P[-1] = 2 P[0] - P[1]`
    Extrapolate,
    /// Repeat the endpoint: `P[-1] = P[0]`
    Duplicate,
}

impl Default for PhantomPolicy {
    fn default() -> PhantomPolicy {
        PhantomPolicy::Extrapolate
    }
}

impl fmt::Display for PhantomPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PhantomPolicy::Extrapolate => write!(f, "extrapolate"),
            PhantomPolicy::Duplicate => write!(f, "duplicate"),
        }
    }
}

impl FromStr for PhantomPolicy {
    type Err = Error;

    fn from_str(x: &str) -> Result<PhantomPolicy, Error> {
        match x {
            "extrapolate" => Ok(PhantomPolicy::Extrapolate),
            "duplicate" => Ok(PhantomPolicy::Duplicate),
            _ => Err(Error::InvalidConfiguration(format!(
                "phantom policy must be extrapolate or duplicate, not {}",
                x
            ))),
        }
    }
}

/// A Catmull-Rom spline passing through every control point, in order. Span `i` runs from
/// control point `i` to `i + 1`.
#[derive(Clone, Debug)]
pub struct CatmullRom {
    // The control points with one phantom on each end
    pts: Vec<Pt2D>,
    alpha: f64,
}

impl CatmullRom {
    /// `alpha` picks the knot parameterization: 0 is uniform, 0.5 centripetal, 1 chordal.
    pub fn new(control_pts: &[Pt2D], alpha: f64, phantom: PhantomPolicy) -> Result<CatmullRom, Error> {
        if control_pts.len() < 2 {
            return Err(Error::InsufficientPoints {
                required: 2,
                got: control_pts.len(),
            });
        }
        check_alpha(alpha)?;
        // Phantoms and knot intervals stay finite as long as the points are bounded
        for (idx, pt) in control_pts.iter().enumerate() {
            if pt.x().abs() > MAX_COORDINATE || pt.y().abs() > MAX_COORDINATE {
                return Err(Error::MalformedDocument(format!(
                    "control point {} at {} is too far from the origin",
                    idx, pt
                )));
            }
        }

        let n = control_pts.len();
        let (before, after) = match phantom {
            PhantomPolicy::Extrapolate => (
                control_pts[1].reflect_through(control_pts[0]),
                control_pts[n - 2].reflect_through(control_pts[n - 1]),
            ),
            PhantomPolicy::Duplicate => (control_pts[0], control_pts[n - 1]),
        };
        let mut pts = Vec::with_capacity(n + 2);
        pts.push(before);
        pts.extend_from_slice(control_pts);
        pts.push(after);
        Ok(CatmullRom { pts, alpha })
    }

    pub fn spans(&self) -> usize {
        self.pts.len() - 3
    }

    /// Without the phantoms
    pub fn control_points(&self) -> &[Pt2D] {
        &self.pts[1..self.pts.len() - 1]
    }

    /// The 4 points controlling a span, phantoms included
    pub fn span_points(&self, span: usize) -> [Pt2D; 4] {
        [
            self.pts[span],
            self.pts[span + 1],
            self.pts[span + 2],
            self.pts[span + 3],
        ]
    }

    /// The point at `u` in `[0, 1]` along `span`. `u = 0` is exactly control point `span`, and
    /// `u = 1` is exactly control point `span + 1`.
    pub fn eval(&self, span: usize, u: f64) -> Pt2D {
        assert!(span < self.spans(), "span {} of {}", span, self.spans());
        let u = u.clamp(0.0, 1.0);
        let [p0, p1, p2, p3] = self.span_points(span);
        if u == 0.0 {
            return p1;
        }
        if u == 1.0 {
            return p2;
        }

        // Barry and Goldman's pyramid
        let t0 = 0.0;
        let t1 = t0 + self.knot_interval(p0, p1);
        let t2 = t1 + self.knot_interval(p1, p2);
        let t3 = t2 + self.knot_interval(p2, p3);
        let t = t1 + u * (t2 - t1);

        let a1 = p0.lerp(p1, (t - t0) / (t1 - t0));
        let a2 = p1.lerp(p2, (t - t1) / (t2 - t1));
        let a3 = p2.lerp(p3, (t - t2) / (t3 - t2));
        let b1 = a1.lerp(a2, (t - t0) / (t2 - t0));
        let b2 = a2.lerp(a3, (t - t1) / (t3 - t1));
        b1.lerp(b2, (t - t1) / (t2 - t1))
    }

    fn knot_interval(&self, from: Pt2D, to: Pt2D) -> f64 {
        from.dist_to(to).powf(self.alpha).max(MIN_KNOT_INTERVAL)
    }

    /// `per_span` evenly spaced values of `u` for every span, plus the very last control point.
    /// Every control point is included exactly.
    pub fn densify(&self, per_span: usize) -> Vec<Pt2D> {
        let per_span = per_span.max(1);
        let mut pts = Vec::with_capacity(self.spans() * per_span + 1);
        for span in 0..self.spans() {
            for i in 0..per_span {
                pts.push(self.eval(span, (i as f64) / (per_span as f64)));
            }
        }
        pts.push(self.pts[self.pts.len() - 2]);
        pts
    }

    pub fn arc_length_table(&self, per_span: usize) -> ArcLengthTable {
        ArcLengthTable::new(self, per_span)
    }
}

pub(crate) fn check_alpha(alpha: f64) -> Result<(), Error> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(Error::InvalidConfiguration(format!(
            "alpha must be in [0, 1], not {}",
            alpha
        )));
    }
    Ok(())
}

/// Approximates distance along a spline by a dense polyline through it.
#[derive(Clone, Debug)]
pub struct ArcLengthTable {
    line: PolyLine,
}

impl ArcLengthTable {
    fn new(curve: &CatmullRom, per_span: usize) -> ArcLengthTable {
        // The spline has at least 1 span, so there are always at least 2 points.
        let pts = curve.densify(per_span);
        let line = match PolyLine::new(pts) {
            Some(line) => line,
            None => unreachable!("a spline with 1 span densifies to at least 2 points"),
        };
        ArcLengthTable { line }
    }

    pub fn length(&self) -> f64 {
        self.line.length()
    }

    /// Clamped to the ends of the spline
    pub fn pt_at(&self, dist: f64) -> Pt2D {
        self.line.dist_along(dist).0
    }

    /// `fraction` of the way along the spline, by arc length
    pub fn pt_at_fraction(&self, fraction: f64) -> Pt2D {
        self.pt_at(fraction * self.length())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: &[[f64; 2]]) -> Vec<Pt2D> {
        raw.iter().map(|pair| Pt2D::from(*pair)).collect()
    }

    #[test]
    fn interpolates_control_points() {
        let control = pts(&[[0.0, 0.0], [3.0, 1.0], [5.0, 5.0], [6.0, 9.0], [10.0, 10.0]]);
        for alpha in [0.0, 0.5, 1.0] {
            for phantom in [PhantomPolicy::Extrapolate, PhantomPolicy::Duplicate] {
                let curve = CatmullRom::new(&control, alpha, phantom).unwrap();
                assert_eq!(curve.spans(), 4);
                for span in 0..curve.spans() {
                    assert!(curve.eval(span, 0.0).is_same(control[span]));
                    assert!(curve.eval(span, 1.0).is_same(control[span + 1]));
                    // Nearly at the ends too, not just exactly
                    assert!(curve.eval(span, 1e-9).approx_eq(control[span], 1e-6));
                    assert!(curve.eval(span, 1.0 - 1e-9).approx_eq(control[span + 1], 1e-6));
                }
            }
        }
    }

    #[test]
    fn collinear_points_stay_on_the_line() {
        let control = pts(&[[0.0, 0.0], [1.0, 0.0], [2.5, 0.0], [4.0, 0.0]]);
        let curve = CatmullRom::new(&control, DEFAULT_ALPHA, PhantomPolicy::Extrapolate).unwrap();
        for pt in curve.densify(10) {
            assert!(pt.y().abs() < 1e-12);
        }
        // Evenly spaced points with extrapolated phantoms trace the line at constant speed
        let even = pts(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [3.0, 0.0]]);
        let curve = CatmullRom::new(&even, DEFAULT_ALPHA, PhantomPolicy::Extrapolate).unwrap();
        assert!(curve.eval(0, 0.25).approx_eq(Pt2D::new(0.25, 0.0), 1e-12));
        assert!(curve.eval(2, 0.5).approx_eq(Pt2D::new(2.5, 0.0), 1e-12));
    }

    #[test]
    fn repeated_points() {
        let control = pts(&[[0.0, 0.0], [0.0, 0.0], [1.0, 1.0], [1.0, 1.0]]);
        let curve = CatmullRom::new(&control, DEFAULT_ALPHA, PhantomPolicy::Duplicate).unwrap();
        for pt in curve.densify(8) {
            assert!(pt.x().is_finite() && pt.y().is_finite());
        }
    }

    #[test]
    fn arc_length() {
        let control = pts(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [3.0, 0.0]]);
        let curve = CatmullRom::new(&control, DEFAULT_ALPHA, PhantomPolicy::Extrapolate).unwrap();
        let table = curve.arc_length_table(16);
        assert!((table.length() - 3.0).abs() < 1e-12);
        assert!(table.pt_at(1.5).approx_eq(Pt2D::new(1.5, 0.0), 1e-12));
        assert!(table.pt_at_fraction(1.0).is_same(Pt2D::new(3.0, 0.0)));
        assert!(table.pt_at(-1.0).is_same(Pt2D::new(0.0, 0.0)));
    }

    #[test]
    fn bad_input() {
        let one = pts(&[[0.0, 0.0]]);
        assert_eq!(
            CatmullRom::new(&one, 0.5, PhantomPolicy::Extrapolate).unwrap_err(),
            Error::InsufficientPoints {
                required: 2,
                got: 1
            }
        );
        let two = pts(&[[0.0, 0.0], [1.0, 0.0]]);
        assert!(CatmullRom::new(&two, 1.5, PhantomPolicy::Extrapolate).is_err());
        assert_eq!(CatmullRom::new(&two, 0.5, PhantomPolicy::Duplicate).unwrap().spans(), 1);
        assert_eq!("duplicate".parse::<PhantomPolicy>().unwrap(), PhantomPolicy::Duplicate);
        assert!("mirror".parse::<PhantomPolicy>().is_err());

        // Mirroring these would overflow
        let huge = pts(&[[1e308, 0.0], [-1e308, 0.0], [2.0, 0.0], [3.0, 0.0]]);
        let err = CatmullRom::new(&huge, 0.5, PhantomPolicy::Extrapolate).unwrap_err();
        assert_eq!(err.kind(), "MalformedDocument");
    }
}
