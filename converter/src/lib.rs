//! Runs whole documents through the conversion: OpenDRIVE to splines, splines back to OpenDRIVE,
//! and measuring how far the results stray from the original roads. Every road is converted
//! independently; one broken road is reported and skipped, never fatal for the rest.

#[macro_use]
extern crate log;

mod accuracy;
mod config;
mod pipeline;

pub use crate::accuracy::{
    evaluate_document, evaluate_reconstruction, evaluate_reconstructions, evaluate_road,
    AccuracyReport, RoadAccuracy, RoadFailure,
};
pub use crate::config::ConvertOptions;
pub use crate::pipeline::{round_trip, splines_to_xodr, xodr_to_splines, Converted, RoundTrip};
