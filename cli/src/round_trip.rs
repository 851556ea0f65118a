use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use converter::{AccuracyReport, ConvertOptions};
use roadutil::Timer;

#[derive(Serialize)]
struct RoundTripReport<'a> {
    /// The original centerlines against the splines
    splines: &'a AccuracyReport,
    /// The original centerlines against the rebuilt OpenDRIVE roads
    reconstruction: &'a AccuracyReport,
}

pub fn run(input: String, output_dir: String, opts: ConvertOptions) -> Result<bool> {
    let mut timer = Timer::new(format!("round trip {}", input));
    let name = roadutil::basename(&input);
    let xml = roadutil::slurp_file(&input)?;

    let result = converter::round_trip(&xml, &format!("{}_rebuilt", name), &opts, &mut timer)?;

    let dir = Path::new(&output_dir);
    roadutil::write_string(dir.join(format!("{}.json", name)), &result.splines_json)?;
    roadutil::write_string(dir.join(format!("{}_rebuilt.xodr", name)), &result.rebuilt_xml)?;
    roadutil::write_json(
        dir.join(format!("{}_report.json", name)),
        &RoundTripReport {
            splines: &result.spline_accuracy,
            reconstruction: &result.reconstruction_accuracy,
        },
    )?;

    for (label, report) in [
        ("Splines", &result.spline_accuracy),
        ("Rebuilt OpenDRIVE", &result.reconstruction_accuracy),
    ] {
        match report.overall {
            Some(ref stats) => timer.note(format!("{}: {}", label, stats.describe())),
            None => timer.warn(format!("{}: no road could be evaluated", label)),
        }
    }
    Ok(result.is_clean())
}
