use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use catmull_rom::{PhantomPolicy, ReconstructOptions, SplineOptions};
use opendrive::{Error, ExtractOptions, LaneSelection, DEFAULT_LENGTH_TOLERANCE};
use roadutil::Parallelism;

/// Every tunable of the conversion. These are passed explicitly to each stage.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvertOptions {
    /// Distance between centerline samples, in meters
    pub resolution: f64,
    pub lane: LaneSelection,
    /// Allowed disagreement between declared and measured lengths, in meters
    pub length_tolerance: f64,
    pub spline: SplineOptions,
    pub reconstruct: ReconstructOptions,
    /// Convert roads on all CPUs
    pub parallel: bool,
}

impl Default for ConvertOptions {
    fn default() -> ConvertOptions {
        ConvertOptions {
            resolution: 1.0,
            lane: LaneSelection::FirstDriving,
            length_tolerance: DEFAULT_LENGTH_TOLERANCE,
            spline: SplineOptions::default(),
            reconstruct: ReconstructOptions::default(),
            parallel: true,
        }
    }
}

// The TOML file. Everything is optional; missing values keep their defaults.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConvertOptions {
    resolution: Option<f64>,
    lane: Option<RawLane>,
    length_tolerance: Option<f64>,
    phantom: Option<String>,
    alpha: Option<f64>,
    samples_per_span: Option<usize>,
    arc_length_samples: Option<usize>,
    parallel: Option<bool>,
}

// `lane = -1` and `lane = "road-center"` are both fine
#[derive(Deserialize)]
#[serde(untagged)]
enum RawLane {
    Id(i32),
    Name(String),
}

impl ConvertOptions {
    pub fn from_toml(raw: &str) -> Result<ConvertOptions> {
        let config: RawConvertOptions = toml::from_str(raw)?;
        let mut result = ConvertOptions::default();

        result.resolution = value_or_default(config.resolution, result.resolution);
        result.length_tolerance = value_or_default(config.length_tolerance, result.length_tolerance);
        result.spline.alpha = value_or_default(config.alpha, result.spline.alpha);
        result.reconstruct.samples_per_span =
            value_or_default(config.samples_per_span, result.reconstruct.samples_per_span);
        result.reconstruct.arc_length_samples =
            value_or_default(config.arc_length_samples, result.reconstruct.arc_length_samples);
        result.parallel = value_or_default(config.parallel, result.parallel);
        match config.lane {
            Some(RawLane::Id(id)) => {
                result.lane = id.to_string().parse()?;
            }
            Some(RawLane::Name(name)) => {
                result.lane = name.parse()?;
            }
            None => {}
        }
        if let Some(phantom) = config.phantom {
            result.spline.phantom = phantom.parse::<PhantomPolicy>()?;
        }

        result.validate()?;
        Ok(result)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<ConvertOptions> {
        let path = path.as_ref();
        let raw = roadutil::slurp_file(path)?;
        ConvertOptions::from_toml(&raw).with_context(|| format!("loading {}", path.display()))
    }

    /// Catches bad values up front, before any road is touched.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "resolution must be positive, not {}",
                self.resolution
            )));
        }
        if !self.length_tolerance.is_finite() || self.length_tolerance < 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "length tolerance must be non-negative, not {}",
                self.length_tolerance
            )));
        }
        if !(0.0..=1.0).contains(&self.spline.alpha) {
            return Err(Error::InvalidConfiguration(format!(
                "alpha must be in [0, 1], not {}",
                self.spline.alpha
            )));
        }
        if self.reconstruct.samples_per_span < 4 || self.reconstruct.arc_length_samples < 1 {
            return Err(Error::InvalidConfiguration(format!(
                "need at least 4 samples per span and 1 arc length sample, not {} and {}",
                self.reconstruct.samples_per_span, self.reconstruct.arc_length_samples
            )));
        }
        Ok(())
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            lane: self.lane,
            length_tolerance: self.length_tolerance,
        }
    }

    pub fn parallelism(&self) -> Parallelism {
        if self.parallel {
            Parallelism::Fastest
        } else {
            Parallelism::Sequential
        }
    }
}

fn value_or_default<T>(maybe_value: Option<T>, default: T) -> T {
    maybe_value.unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_means_defaults() {
        assert_eq!(
            ConvertOptions::from_toml("").unwrap(),
            ConvertOptions::default()
        );
    }

    #[test]
    fn partial_file() {
        let opts = ConvertOptions::from_toml(
            r#"
resolution = 0.5
lane = -2
phantom = "duplicate"
parallel = false
"#,
        )
        .unwrap();
        assert_eq!(opts.resolution, 0.5);
        assert_eq!(opts.lane, LaneSelection::ById(-2));
        assert_eq!(opts.spline.phantom, PhantomPolicy::Duplicate);
        assert_eq!(opts.spline.alpha, 0.5);
        assert_eq!(opts.parallelism(), Parallelism::Sequential);
        assert_eq!(opts.reconstruct, ReconstructOptions::default());

        let opts = ConvertOptions::from_toml("lane = \"reference\"").unwrap();
        assert_eq!(opts.lane, LaneSelection::ReferenceLine);
        let opts = ConvertOptions::from_toml("lane = \"road-center\"").unwrap();
        assert_eq!(opts.lane, LaneSelection::RoadCenter);
    }

    #[test]
    fn bad_files() {
        assert!(ConvertOptions::from_toml("resolution = -1.0").is_err());
        assert!(ConvertOptions::from_toml("alpha = 2.0").is_err());
        assert!(ConvertOptions::from_toml("phantom = \"mirror\"").is_err());
        assert!(ConvertOptions::from_toml("typo = 3").is_err());
        assert!(ConvertOptions::from_toml("samples_per_span = 2").is_err());
    }
}
