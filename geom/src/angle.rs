use std::f64;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An angle, stored in radians. Unlike a raw f64, this is never confused with a distance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Angle(f64);

impl Angle {
    pub const ZERO: Angle = Angle(0.0);

    pub fn new_rads(rads: f64) -> Angle {
        Angle(rads)
    }

    pub fn new_degs(degs: f64) -> Angle {
        Angle(degs.to_radians())
    }

    /// The raw value, not wrapped to any range. OpenDRIVE headings are written like this.
    pub fn radians(self) -> f64 {
        self.0
    }

    pub fn rotate_rads(self, rads: f64) -> Angle {
        Angle(self.0 + rads)
    }

    /// The direction pointing 90 degrees to the left of this one.
    pub fn left_normal(self) -> Angle {
        self.rotate_rads(f64::consts::FRAC_PI_2)
    }

    /// Wrapped to [0, 2pi)
    pub fn normalized_radians(self) -> f64 {
        let rads = self.0 % (2.0 * f64::consts::PI);
        if rads < 0.0 {
            rads + 2.0 * f64::consts::PI
        } else {
            rads
        }
    }

    pub fn normalized_degrees(self) -> f64 {
        self.normalized_radians().to_degrees()
    }

    /// The smallest rotation (in radians, always >= 0) between the two directions.
    pub fn shortest_rotation_towards(self, other: Angle) -> f64 {
        let diff = (other.normalized_radians() - self.normalized_radians()).abs();
        diff.min(2.0 * f64::consts::PI - diff)
    }

    pub fn approx_eq(self, other: Angle, within_rads: f64) -> bool {
        self.shortest_rotation_towards(other) <= within_rads
    }

    pub fn sin_cos(self) -> (f64, f64) {
        self.0.sin_cos()
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Angle({} degrees)", self.normalized_degrees())
    }
}
