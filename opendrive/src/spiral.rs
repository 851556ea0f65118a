//! Position along a clothoid, by integrating the unit tangent.
//!
//! The heading along a clothoid starting with heading 0 is `theta(s) = k0*s + rate*s^2/2`, and
//! the position is `integral from 0 to s of (cos theta, sin theta)`. There's no elementary closed
//! form, so this uses adaptive Simpson quadrature. The interval is first split into pieces that
//! each turn by at most `MAX_TURN_PER_PIECE`, so the first estimate on each piece can't alias an
//! oscillation, then each piece is refined until the Richardson error estimate is below its share
//! of `TOLERANCE`.

/// Bound on the absolute error of each coordinate, in meters
pub const TOLERANCE: f64 = 1e-10;
const MAX_DEPTH: usize = 50;
const MAX_TURN_PER_PIECE: f64 = 0.5;
/// Spirals whose curvature adds up to more than this many radians over their length aren't
/// roads, and would take too long to integrate.
pub const MAX_TURN: f64 = 1e4;

/// Local `(u, v, theta)` after travelling `s` along a clothoid that starts at the origin heading
/// along +u with curvature `k0`, where curvature changes by `rate` per meter.
pub fn clothoid(k0: f64, rate: f64, s: f64) -> (f64, f64, f64) {
    let theta = |x: f64| k0 * x + 0.5 * rate * x * x;
    if s == 0.0 {
        return (0.0, 0.0, 0.0);
    }

    let max_curvature = k0.abs().max((k0 + rate * s).abs());
    let pieces = ((s * max_curvature / MAX_TURN_PER_PIECE).ceil() as usize).max(1);
    let tolerance = TOLERANCE / (pieces as f64);
    let step = s / (pieces as f64);

    let tangent = |x: f64| {
        let (sin, cos) = theta(x).sin_cos();
        [cos, sin]
    };
    let mut sum = [0.0, 0.0];
    for i in 0..pieces {
        let a = step * (i as f64);
        let b = if i == pieces - 1 { s } else { a + step };
        let piece = integrate(&tangent, a, b, tolerance);
        sum[0] += piece[0];
        sum[1] += piece[1];
    }
    (sum[0], sum[1], theta(s))
}

fn integrate<F: Fn(f64) -> [f64; 2]>(f: &F, a: f64, b: f64, tolerance: f64) -> [f64; 2] {
    let fa = f(a);
    let fb = f(b);
    let m = 0.5 * (a + b);
    let fm = f(m);
    let whole = simpson(a, b, fa, fm, fb);
    refine(f, a, b, fa, fm, fb, whole, tolerance, MAX_DEPTH)
}

fn simpson(a: f64, b: f64, fa: [f64; 2], fm: [f64; 2], fb: [f64; 2]) -> [f64; 2] {
    let h = (b - a) / 6.0;
    [
        h * (fa[0] + 4.0 * fm[0] + fb[0]),
        h * (fa[1] + 4.0 * fm[1] + fb[1]),
    ]
}

#[allow(clippy::too_many_arguments)]
fn refine<F: Fn(f64) -> [f64; 2]>(
    f: &F,
    a: f64,
    b: f64,
    fa: [f64; 2],
    fm: [f64; 2],
    fb: [f64; 2],
    whole: [f64; 2],
    tolerance: f64,
    depth: usize,
) -> [f64; 2] {
    let m = 0.5 * (a + b);
    let left_m = 0.5 * (a + m);
    let right_m = 0.5 * (m + b);
    let f_left_m = f(left_m);
    let f_right_m = f(right_m);
    let left = simpson(a, m, fa, f_left_m, fm);
    let right = simpson(m, b, fm, f_right_m, fb);
    let delta = [
        left[0] + right[0] - whole[0],
        left[1] + right[1] - whole[1],
    ];

    if depth == 0 || delta[0].abs().max(delta[1].abs()) <= 15.0 * tolerance {
        return [
            left[0] + right[0] + delta[0] / 15.0,
            left[1] + right[1] + delta[1] / 15.0,
        ];
    }

    let l = refine(f, a, m, fa, f_left_m, fm, left, 0.5 * tolerance, depth - 1);
    let r = refine(f, m, b, fm, f_right_m, fb, right, 0.5 * tolerance, depth - 1);
    [l[0] + r[0], l[1] + r[1]]
}
