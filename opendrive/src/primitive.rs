use geom::{Angle, Pt2D};

use crate::spiral;
use crate::{Error, GeometrySegment, ParamRange, Pose, Primitive, MAX_COORDINATE};

// Below this, an arc is treated as a line, avoiding the division by curvature.
const STRAIGHT_CURVATURE: f64 = 1e-12;

impl GeometrySegment {
    /// The pose `local_s` meters along this segment, `0 <= local_s <= length`. Values barely
    /// outside of that range from floating point noise are clamped.
    pub fn evaluate(&self, local_s: f64) -> Result<Pose, Error> {
        let slack = 1e-9 * self.length.max(1.0);
        if !local_s.is_finite() || local_s < -slack || local_s > self.length + slack {
            return Err(Error::ParameterOutOfRange {
                value: local_s,
                min: 0.0,
                max: self.length,
            });
        }
        let local_s = local_s.clamp(0.0, self.length);
        self.check_winding()?;

        let (u, v, dheading) = self.kind.local_pose(local_s, self.length);
        // Keeps the global point finite, since the origin is bounded too
        if !(u.abs() <= MAX_COORDINATE && v.abs() <= MAX_COORDINATE && dheading.is_finite()) {
            return Err(Error::MalformedDocument(format!(
                "{} at s={} evaluates to ({}, {}), too far from its origin",
                self.kind.name(),
                self.s0 + local_s,
                u,
                v
            )));
        }
        Ok(Pose {
            pt: self.origin.local_to_global(self.heading, u, v),
            heading: self.heading.rotate_rads(dheading),
        })
    }

    /// Rejects spirals that turn too far to evaluate in reasonable time.
    pub(crate) fn check_winding(&self) -> Result<(), Error> {
        if let Primitive::Spiral {
            curv_start,
            curv_end,
        } = self.kind
        {
            let turn = self.length * curv_start.abs().max(curv_end.abs());
            if !(turn <= spiral::MAX_TURN) {
                return Err(Error::MalformedDocument(format!(
                    "spiral at s={} could turn by {} radians; at most {} is supported",
                    self.s0,
                    turn,
                    spiral::MAX_TURN
                )));
            }
        }
        Ok(())
    }

    pub fn s1(&self) -> f64 {
        self.s0 + self.length
    }
}

impl Primitive {
    /// `(u, v, heading change)` in the frame whose origin is the start of the segment, with +u
    /// along the starting heading. Doesn't check range.
    fn local_pose(&self, ds: f64, length: f64) -> (f64, f64, f64) {
        match *self {
            Primitive::Line => (ds, 0.0, 0.0),
            Primitive::Arc { curvature } => {
                if curvature.abs() < STRAIGHT_CURVATURE {
                    return (ds, 0.0, 0.0);
                }
                let angle = curvature * ds;
                (
                    angle.sin() / curvature,
                    (1.0 - angle.cos()) / curvature,
                    angle,
                )
            }
            Primitive::Spiral {
                curv_start,
                curv_end,
            } => {
                let rate = if length > 0.0 {
                    (curv_end - curv_start) / length
                } else {
                    0.0
                };
                spiral::clothoid(curv_start, rate, ds)
            }
            Primitive::Poly3 { a, b, c, d } => {
                let v = a + ds * (b + ds * (c + ds * d));
                let slope = b + ds * (2.0 * c + ds * 3.0 * d);
                (ds, v, slope.atan())
            }
            Primitive::ParamPoly3 {
                au,
                bu,
                cu,
                du,
                av,
                bv,
                cv,
                dv,
                p_range,
            } => {
                let p = match p_range {
                    ParamRange::ArcLength => ds,
                    ParamRange::Normalized => {
                        if length > 0.0 {
                            ds / length
                        } else {
                            0.0
                        }
                    }
                };
                let u = au + p * (bu + p * (cu + p * du));
                let v = av + p * (bv + p * (cv + p * dv));
                let du_dp = bu + p * (2.0 * cu + p * 3.0 * du);
                let dv_dp = bv + p * (2.0 * cv + p * 3.0 * dv);
                let dheading = if du_dp == 0.0 && dv_dp == 0.0 {
                    0.0
                } else {
                    dv_dp.atan2(du_dp)
                };
                (u, v, dheading)
            }
        }
    }
}

/// Shorthand for building segments by hand
pub fn segment(
    s0: f64,
    x: f64,
    y: f64,
    hdg: f64,
    length: f64,
    kind: Primitive,
) -> GeometrySegment {
    GeometrySegment {
        s0,
        origin: Pt2D::new(x, y),
        heading: Angle::new_rads(hdg),
        length,
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_kinds() -> Vec<GeometrySegment> {
        vec![
            segment(0.0, 1.0, 2.0, 0.3, 10.0, Primitive::Line),
            segment(0.0, 1.0, 2.0, 0.3, 10.0, Primitive::Arc { curvature: -0.07 }),
            segment(
                0.0,
                1.0,
                2.0,
                0.3,
                10.0,
                Primitive::Spiral {
                    curv_start: 0.0,
                    curv_end: 0.08,
                },
            ),
            segment(
                0.0,
                1.0,
                2.0,
                0.3,
                10.0,
                Primitive::Poly3 {
                    a: 0.0,
                    b: 0.0,
                    c: 0.01,
                    d: -0.0005,
                },
            ),
            segment(
                0.0,
                1.0,
                2.0,
                0.3,
                10.0,
                Primitive::ParamPoly3 {
                    au: 0.0,
                    bu: 10.0,
                    cu: -0.5,
                    du: 0.1,
                    av: 0.0,
                    bv: 0.0,
                    cv: 1.2,
                    dv: -0.3,
                    p_range: ParamRange::Normalized,
                },
            ),
        ]
    }

    #[test]
    fn starts_at_origin() {
        for seg in all_kinds() {
            let pose = seg.evaluate(0.0).unwrap();
            assert!(pose.pt.approx_eq(seg.origin, 1e-12), "{}", seg.kind.name());
            assert!(pose.heading.approx_eq(seg.heading, 1e-12), "{}", seg.kind.name());
        }
    }

    fn assert_pose(seg: &GeometrySegment, local_s: f64, u: f64, v: f64, dheading: f64) {
        let pose = seg.evaluate(local_s).unwrap();
        let expected = seg.origin.local_to_global(seg.heading, u, v);
        assert!(
            pose.pt.approx_eq(expected, 1e-9),
            "{} at {}: {:?} vs {:?}",
            seg.kind.name(),
            local_s,
            pose.pt,
            expected
        );
        assert!(
            pose.heading.approx_eq(seg.heading.rotate_rads(dheading), 1e-12),
            "{} heading at {}",
            seg.kind.name(),
            local_s
        );
    }

    #[test]
    fn poly3_closed_form() {
        let (a, b, c, d) = (0.5, 0.1, 0.01, -0.0005);
        let seg = segment(0.0, 1.0, 2.0, 0.3, 10.0, Primitive::Poly3 { a, b, c, d });
        for u in [0.0, 2.5, 7.0, 10.0] {
            let v = a + b * u + c * u * u + d * u * u * u;
            let slope = b + 2.0 * c * u + 3.0 * d * u * u;
            assert_pose(&seg, u, u, v, slope.atan());
        }
        // At the end: v = 0.5 + 1 + 1 - 0.5, slope = 0.1 + 0.2 - 0.15
        assert_pose(&seg, 10.0, 10.0, 2.0, 0.15_f64.atan());
    }

    #[test]
    fn param_poly3_closed_form() {
        // p runs over [0, 1] across the 10m
        let seg = segment(
            0.0,
            1.0,
            2.0,
            0.3,
            10.0,
            Primitive::ParamPoly3 {
                au: 0.0,
                bu: 10.0,
                cu: -0.5,
                du: 0.1,
                av: 0.0,
                bv: 0.0,
                cv: 1.2,
                dv: -0.3,
                p_range: ParamRange::Normalized,
            },
        );
        // u = 10 - 0.5 + 0.1, v = 1.2 - 0.3, du/dp = 10 - 1 + 0.3, dv/dp = 2.4 - 0.9
        assert_pose(&seg, 10.0, 9.6, 0.9, 1.5_f64.atan2(9.3));
        // p = 0.5
        assert_pose(
            &seg,
            5.0,
            5.0 - 0.125 + 0.0125,
            0.3 - 0.0375,
            (1.2 - 0.225_f64).atan2(10.0 - 0.5 + 0.075),
        );

        let arc_length = segment(
            0.0,
            0.0,
            0.0,
            0.0,
            4.0,
            Primitive::ParamPoly3 {
                au: 0.0,
                bu: 1.0,
                cu: 0.0,
                du: 0.0,
                av: 0.0,
                bv: 0.0,
                cv: 0.1,
                dv: 0.0,
                p_range: ParamRange::ArcLength,
            },
        );
        assert_pose(&arc_length, 4.0, 4.0, 1.6, 0.8_f64.atan());
    }

    #[test]
    fn continuous_into_the_next_segment() {
        let poly3 = segment(
            0.0,
            1.0,
            2.0,
            0.3,
            10.0,
            Primitive::Poly3 {
                a: 0.0,
                b: 0.0,
                c: 0.01,
                d: -0.0005,
            },
        );
        let param_poly3 = segment(
            0.0,
            -4.0,
            7.0,
            -1.2,
            25.0,
            Primitive::ParamPoly3 {
                au: 0.0,
                bu: 24.0,
                cu: 1.0,
                du: -0.5,
                av: 0.0,
                bv: 0.0,
                cv: 3.0,
                dv: -1.0,
                p_range: ParamRange::Normalized,
            },
        );
        for seg in [poly3, param_poly3] {
            let end = seg.evaluate(seg.length).unwrap();
            let next = segment(
                seg.s1(),
                end.pt.x(),
                end.pt.y(),
                end.heading.radians(),
                5.0,
                Primitive::Line,
            );
            // A road made of both, sampled right at the boundary and just before it
            let start = next.evaluate(0.0).unwrap();
            assert!(start.pt.approx_eq(end.pt, 1e-12));
            let almost = seg.evaluate(seg.length - 1e-4).unwrap();
            assert!(almost.pt.approx_eq(end.pt, 2e-4), "{}", seg.kind.name());
            assert!(almost.heading.approx_eq(start.heading, 1e-3), "{}", seg.kind.name());
            // One step into the line continues straight along the end heading
            let step = next.evaluate(1e-4).unwrap();
            let ahead = end.pt.project_away(1e-4, end.heading);
            assert!(step.pt.approx_eq(ahead, 1e-12));
        }
    }

    #[test]
    fn winding_spiral_is_an_error() {
        let seg = segment(
            0.0,
            0.0,
            0.0,
            0.0,
            100.0,
            Primitive::Spiral {
                curv_start: 1e9,
                curv_end: 0.0,
            },
        );
        assert_eq!(seg.evaluate(0.0).unwrap_err().kind(), "MalformedDocument");
        assert_eq!(seg.evaluate(50.0).unwrap_err().kind(), "MalformedDocument");
    }

    #[test]
    fn overflow_is_an_error() {
        let seg = segment(
            0.0,
            0.0,
            0.0,
            0.0,
            1e3,
            Primitive::Poly3 {
                a: 0.0,
                b: 0.0,
                c: 0.0,
                d: 1e300,
            },
        );
        assert_eq!(seg.evaluate(1e3).unwrap_err().kind(), "MalformedDocument");
        assert!(seg.evaluate(0.0).is_ok());
    }

    #[test]
    fn arc_matches_circle() {
        let seg = segment(0.0, 0.0, 0.0, 0.0, 10.0, Primitive::Arc { curvature: 0.1 });
        let pose = seg.evaluate(10.0).unwrap();
        assert!((pose.pt.x() - 1.0_f64.sin() / 0.1).abs() < 1e-6);
        assert!((pose.pt.y() - (1.0 - 1.0_f64.cos()) / 0.1).abs() < 1e-6);
        assert!((pose.heading.radians() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn line_is_rotated() {
        let seg = segment(0.0, 5.0, 5.0, std::f64::consts::FRAC_PI_2, 3.0, Primitive::Line);
        let pose = seg.evaluate(3.0).unwrap();
        assert!(pose.pt.approx_eq(Pt2D::new(5.0, 8.0), 1e-12));
    }

    #[test]
    fn spiral_turns_by_average_curvature() {
        let seg = segment(
            0.0,
            0.0,
            0.0,
            0.0,
            20.0,
            Primitive::Spiral {
                curv_start: 0.02,
                curv_end: 0.06,
            },
        );
        let pose = seg.evaluate(20.0).unwrap();
        // theta = k0*s + (k1-k0)/L * s^2 / 2 = 0.4 + 0.4
        assert!((pose.heading.radians() - 0.8).abs() < 1e-12);

        // Compare against a brute-force midpoint sum.
        let n = 200_000;
        let h = 20.0 / (n as f64);
        let (mut x, mut y) = (0.0, 0.0);
        for i in 0..n {
            let s = (i as f64 + 0.5) * h;
            let theta = 0.02 * s + 0.5 * (0.04 / 20.0) * s * s;
            x += h * theta.cos();
            y += h * theta.sin();
        }
        assert!(pose.pt.approx_eq(Pt2D::new(x, y), 1e-7));
    }

    #[test]
    fn param_poly3_arc_length_range() {
        let seg = segment(
            0.0,
            0.0,
            0.0,
            0.0,
            4.0,
            Primitive::ParamPoly3 {
                au: 0.0,
                bu: 1.0,
                cu: 0.0,
                du: 0.0,
                av: 0.0,
                bv: 0.0,
                cv: 0.0,
                dv: 0.0,
                p_range: ParamRange::ArcLength,
            },
        );
        assert!(seg
            .evaluate(4.0)
            .unwrap()
            .pt
            .approx_eq(Pt2D::new(4.0, 0.0), 1e-12));
    }

    #[test]
    fn out_of_range() {
        let seg = segment(0.0, 0.0, 0.0, 0.0, 10.0, Primitive::Line);
        assert!(matches!(
            seg.evaluate(10.5),
            Err(Error::ParameterOutOfRange { .. })
        ));
        assert!(matches!(
            seg.evaluate(-0.1),
            Err(Error::ParameterOutOfRange { .. })
        ));
        assert!(seg.evaluate(10.0 + 1e-12).is_ok());
    }
}
