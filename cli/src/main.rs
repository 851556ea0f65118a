//! Converts road networks between OpenDRIVE and a JSON format made of Catmull-Rom spline control
//! points, and measures how much shape is lost along the way.

#[macro_use]
extern crate log;

mod round_trip;

use anyhow::{bail, Result};
use structopt::StructOpt;

use catmull_rom::PhantomPolicy;
use converter::ConvertOptions;
use opendrive::LaneSelection;
use roadutil::Timer;

#[derive(StructOpt)]
#[structopt(
    name = "xodr2spline",
    about = "Converts OpenDRIVE roads to and from Catmull-Rom splines"
)]
enum Command {
    /// Fits a spline through the lane centerline of every road in an OpenDRIVE file
    ToJson {
        /// The path to an .xodr file
        #[structopt(long)]
        input: String,
        /// The JSON file to write
        #[structopt(long)]
        output: String,
        #[structopt(flatten)]
        flags: Flags,
    },
    /// Rebuilds an OpenDRIVE file from splines, one paramPoly3 per span
    ToXodr {
        /// The path to a JSON file of splines
        #[structopt(long)]
        input: String,
        /// The .xodr file to write
        #[structopt(long)]
        output: String,
        #[structopt(flatten)]
        flags: Flags,
    },
    /// Measures how far converted splines stray from the roads they came from
    Evaluate {
        /// The path to the original .xodr file
        #[structopt(long)]
        original: String,
        /// The path to the JSON splines converted from it
        #[structopt(long)]
        converted: String,
        /// Write the full report as JSON here. Otherwise, only a summary is logged.
        #[structopt(long)]
        output: Option<String>,
        #[structopt(flatten)]
        flags: Flags,
    },
    /// Converts OpenDRIVE to splines and back, writing both and an accuracy report for each step
    RoundTrip {
        /// The path to an .xodr file
        #[structopt(long)]
        input: String,
        /// Everything is written here, named after the input
        #[structopt(long)]
        output_dir: String,
        #[structopt(flatten)]
        flags: Flags,
    },
}

/// Options shared by every command. Anything set here overrides the config file.
#[derive(StructOpt)]
struct Flags {
    /// A TOML file with conversion options
    #[structopt(long)]
    config: Option<String>,
    /// Distance between centerline samples, in meters
    #[structopt(long)]
    resolution: Option<f64>,
    /// Which lane to trace: first-driving, reference, road-center, or a lane ID
    #[structopt(long, allow_hyphen_values = true)]
    lane: Option<LaneSelection>,
    /// How to make up points beyond the ends of a spline: extrapolate or duplicate
    #[structopt(long)]
    phantom: Option<PhantomPolicy>,
    /// Knot parameterization of the spline: 0 is uniform, 0.5 centripetal, 1 chordal
    #[structopt(long)]
    alpha: Option<f64>,
    /// Convert roads one at a time, instead of on all CPUs
    #[structopt(long)]
    sequential: bool,
}

impl Flags {
    fn options(&self) -> Result<ConvertOptions> {
        let mut opts = match self.config {
            Some(ref path) => ConvertOptions::load(path)?,
            None => ConvertOptions::default(),
        };
        if let Some(resolution) = self.resolution {
            opts.resolution = resolution;
        }
        if let Some(lane) = self.lane {
            opts.lane = lane;
        }
        if let Some(phantom) = self.phantom {
            opts.spline.phantom = phantom;
        }
        if let Some(alpha) = self.alpha {
            opts.spline.alpha = alpha;
        }
        if self.sequential {
            opts.parallel = false;
        }
        opts.validate()?;
        Ok(opts)
    }
}

fn main() -> Result<()> {
    roadutil::logger::setup();

    let clean = match Command::from_args() {
        Command::ToJson {
            input,
            output,
            flags,
        } => to_json(input, output, flags.options()?)?,
        Command::ToXodr {
            input,
            output,
            flags,
        } => to_xodr(input, output, flags.options()?)?,
        Command::Evaluate {
            original,
            converted,
            output,
            flags,
        } => evaluate(original, converted, output, flags.options()?)?,
        Command::RoundTrip {
            input,
            output_dir,
            flags,
        } => round_trip::run(input, output_dir, flags.options()?)?,
    };
    if !clean {
        bail!("Some roads couldn't be converted; see the warnings above");
    }
    Ok(())
}

fn to_json(input: String, output: String, opts: ConvertOptions) -> Result<bool> {
    let mut timer = Timer::new(format!("convert {} to splines", input));
    let xml = roadutil::slurp_file(&input)?;
    let (_, splines) = converter::xodr_to_splines(&xml, &opts, &mut timer)?;
    roadutil::write_string(&output, &catmull_rom::to_json(&splines.roads)?)?;
    info!("Wrote {} splines to {}", splines.roads.len(), output);
    Ok(splines.is_clean())
}

fn to_xodr(input: String, output: String, opts: ConvertOptions) -> Result<bool> {
    let mut timer = Timer::new(format!("rebuild OpenDRIVE from {}", input));
    let splines = catmull_rom::from_json(&roadutil::slurp_file(&input)?)?;
    let (xml, rebuilt) =
        converter::splines_to_xodr(&splines, &roadutil::basename(&output), &opts, &mut timer)?;
    roadutil::write_string(&output, &xml)?;
    info!("Wrote {} roads to {}", rebuilt.roads.len(), output);
    Ok(rebuilt.is_clean())
}

fn evaluate(
    original: String,
    converted: String,
    output: Option<String>,
    opts: ConvertOptions,
) -> Result<bool> {
    let mut timer = Timer::new(format!("evaluate {} against {}", converted, original));
    let doc = opendrive::read_document(
        &roadutil::slurp_file(&original)?,
        &opts.extract_options(),
    )?;
    let splines = catmull_rom::from_json(&roadutil::slurp_file(&converted)?)?;
    let report = converter::evaluate_document(&doc, &splines, &opts, &mut timer);
    match report.overall {
        Some(ref stats) => timer.note(format!("Overall: {}", stats.describe())),
        None => timer.warn("No road could be evaluated"),
    }
    if let Some(path) = output {
        roadutil::write_json(path, &report)?;
    }
    Ok(report.is_clean())
}
