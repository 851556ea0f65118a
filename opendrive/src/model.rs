use serde::{Deserialize, Serialize};

use geom::{Angle, Pt2D};

/// One road, as extracted from a document. Roads don't change after extraction; every later
/// stage produces new values.
#[derive(Clone, Debug, PartialEq)]
pub struct Road {
    pub id: String,
    /// The declared length of the reference line, in meters
    pub length: f64,
    /// Contiguous and in order of increasing `s0`, covering `[0, length]`
    pub segments: Vec<GeometrySegment>,
    /// Shifts every lane sideways, relative to the reference line. Positive is to the left.
    pub lane_offset: Vec<LaneWidth>,
    /// The single lane whose centerline represents this road
    pub lane: LaneProfile,
    /// Only the first lane section is used. This counts the ones after it that were skipped.
    pub lane_sections_ignored: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GeometrySegment {
    /// Where this segment starts along the road's reference line
    pub s0: f64,
    pub origin: Pt2D,
    pub heading: Angle,
    pub length: f64,
    pub kind: Primitive,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Line,
    /// Positive curvature turns left
    Arc {
        curvature: f64,
    },
    /// Curvature changes linearly from start to end over the segment (a clothoid)
    Spiral {
        curv_start: f64,
        curv_end: f64,
    },
    /// `v = a + b*u + c*u^2 + d*u^3` in the segment's local frame
    Poly3 {
        a: f64,
        b: f64,
        c: f64,
        d: f64,
    },
    /// `u(p)` and `v(p)` are independent cubics
    ParamPoly3 {
        au: f64,
        bu: f64,
        cu: f64,
        du: f64,
        av: f64,
        bv: f64,
        cv: f64,
        dv: f64,
        p_range: ParamRange,
    },
}

impl Primitive {
    /// The OpenDRIVE element name
    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Line => "line",
            Primitive::Arc { .. } => "arc",
            Primitive::Spiral { .. } => "spiral",
            Primitive::Poly3 { .. } => "poly3",
            Primitive::ParamPoly3 { .. } => "paramPoly3",
        }
    }
}

/// What the parameter `p` of a paramPoly3 ranges over
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamRange {
    /// `p` is the distance along the segment, in [0, length]
    ArcLength,
    /// `p` is in [0, 1]
    Normalized,
}

impl ParamRange {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamRange::ArcLength => "arcLength",
            ParamRange::Normalized => "normalized",
        }
    }
}

/// A cubic polynomial in `ds = s - self.s`, valid from `s` until the next record. Used for lane
/// widths and lane offsets.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneWidth {
    /// Where this record starts along the road's reference line. This is absolute, not relative to
    /// the lane section.
    pub s: f64,
    pub a: f64,
    #[serde(default)]
    pub b: f64,
    #[serde(default)]
    pub c: f64,
    #[serde(default)]
    pub d: f64,
}

impl LaneWidth {
    pub fn constant(s: f64, a: f64) -> LaneWidth {
        LaneWidth {
            s,
            a,
            b: 0.0,
            c: 0.0,
            d: 0.0,
        }
    }

    pub fn eval(&self, s: f64) -> f64 {
        let ds = s - self.s;
        self.a + ds * (self.b + ds * (self.c + ds * self.d))
    }

    /// Evaluates the record in effect at `s`: the last one starting at or before `s`. Before the
    /// first record, the first one applies. No records means zero.
    pub fn eval_records(records: &[LaneWidth], s: f64) -> f64 {
        if records.is_empty() {
            return 0.0;
        }
        let idx = records.partition_point(|r| r.s <= s).saturating_sub(1);
        records[idx].eval(s)
    }

    /// The same polynomial, but for a road whose `s` axis is stretched by `factor`.
    pub fn rescaled(&self, factor: f64) -> LaneWidth {
        LaneWidth {
            s: self.s * factor,
            a: self.a,
            b: self.b / factor,
            c: self.c / factor.powi(2),
            d: self.d / factor.powi(3),
        }
    }

    /// The same polynomial, expanded around `s` instead of `self.s`
    pub fn shifted_to(&self, s: f64) -> LaneWidth {
        let h = s - self.s;
        LaneWidth {
            s,
            a: self.eval(s),
            b: self.b + h * (2.0 * self.c + 3.0 * h * self.d),
            c: self.c + 3.0 * h * self.d,
            d: self.d,
        }
    }

    /// Adds up several sets of records, each sorted by `s`, into one. The result starts a new
    /// record wherever any of the inputs does.
    pub fn sum_records(sets: &[Vec<LaneWidth>]) -> Vec<LaneWidth> {
        let mut breaks: Vec<f64> = sets.iter().flatten().map(|r| r.s).collect();
        breaks.sort_by(|a, b| a.total_cmp(b));
        breaks.dedup();
        breaks
            .into_iter()
            .map(|s| {
                let mut sum = LaneWidth::constant(s, 0.0);
                for records in sets {
                    if records.is_empty() {
                        continue;
                    }
                    let idx = records.partition_point(|r| r.s <= s).saturating_sub(1);
                    let piece = records[idx].shifted_to(s);
                    sum.a += piece.a;
                    sum.b += piece.b;
                    sum.c += piece.c;
                    sum.d += piece.d;
                }
                sum
            })
            .collect()
    }

    pub fn scaled_by(&self, coefficient: f64) -> LaneWidth {
        LaneWidth {
            s: self.s,
            a: self.a * coefficient,
            b: self.b * coefficient,
            c: self.c * coefficient,
            d: self.d * coefficient,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Positive lane IDs are left of the reference line
    pub fn of_lane(id: i32) -> Option<Side> {
        if id > 0 {
            Some(Side::Left)
        } else if id < 0 {
            Some(Side::Right)
        } else {
            None
        }
    }

    /// +1 to the left, -1 to the right
    pub fn sign(self) -> f64 {
        match self {
            Side::Left => 1.0,
            Side::Right => -1.0,
        }
    }

    pub fn element_name(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

/// The line being traced: one lane's centerline, the middle of the whole carriageway, or the
/// reference line itself.
#[derive(Clone, Debug, PartialEq)]
pub struct LaneProfile {
    /// 0 means no single lane. Then `inner` holds every lane of the carriageway, or nothing to
    /// trace the reference line.
    pub lane_id: i32,
    /// The traced lane's widths. For lane 0, the total width of the carriageway.
    pub widths: Vec<LaneWidth>,
    /// For a single lane, the lanes between it and the reference line, ordered outwards
    pub inner: Vec<InnerLane>,
}

impl LaneProfile {
    pub fn reference_line() -> LaneProfile {
        LaneProfile {
            lane_id: 0,
            widths: Vec::new(),
            inner: Vec::new(),
        }
    }

    pub fn side(&self) -> Option<Side> {
        Side::of_lane(self.lane_id)
    }

    /// Signed distance from the (already offset) lane reference to the traced line at `s`.
    /// Positive is to the left.
    pub fn center_offset(&self, s: f64) -> f64 {
        match self.side() {
            Some(side) => {
                let inner: f64 = self.inner.iter().map(|lane| lane.width_at(s)).sum();
                side.sign() * (inner + 0.5 * LaneWidth::eval_records(&self.widths, s))
            }
            // Halfway between the outer edge of the left lanes and that of the right lanes
            None => {
                0.5 * self
                    .inner
                    .iter()
                    .map(|lane| lane.side().map(Side::sign).unwrap_or(0.0) * lane.width_at(s))
                    .sum::<f64>()
            }
        }
    }
}

/// A lane that isn't traced, but that the traced line is measured across
#[derive(Clone, Debug, PartialEq)]
pub struct InnerLane {
    pub id: i32,
    /// Like `driving` or `sidewalk`
    pub lane_type: String,
    pub widths: Vec<LaneWidth>,
}

impl InnerLane {
    pub fn side(&self) -> Option<Side> {
        Side::of_lane(self.id)
    }

    pub fn width_at(&self, s: f64) -> f64 {
        LaneWidth::eval_records(&self.widths, s)
    }
}

/// A position and direction
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub pt: Pt2D,
    pub heading: Angle,
}

/// A point on a centerline, tagged with where it is along the road's reference line
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplePoint {
    pub s: f64,
    pub pt: Pt2D,
    pub heading: Angle,
}
