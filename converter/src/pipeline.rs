use catmull_rom::{fit, reconstruct, SplineRoad};
use opendrive::{read_document, sample, write_document, Document, Error, Road, RoadError};
use roadutil::Timer;

use crate::accuracy::{evaluate_document, evaluate_reconstructions};
use crate::{AccuracyReport, ConvertOptions};

/// The roads that converted successfully, in input order, and the ones that didn't.
#[derive(Debug)]
pub struct Converted<T> {
    pub roads: Vec<T>,
    pub errors: Vec<RoadError>,
}

impl<T> Converted<T> {
    fn new(results: Vec<Result<T, RoadError>>) -> Converted<T> {
        let mut roads = Vec::new();
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(road) => roads.push(road),
                Err(err) => {
                    warn!("{}", err);
                    errors.push(err);
                }
            }
        }
        Converted { roads, errors }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Extracts every road of an OpenDRIVE document and fits a spline through its lane centerline.
/// Only a broken document fails as a whole.
pub fn xodr_to_splines(
    xml: &str,
    opts: &ConvertOptions,
    timer: &mut Timer,
) -> Result<(Document, Converted<SplineRoad>), Error> {
    opts.validate()?;
    timer.start("read OpenDRIVE");
    let doc = read_document(xml, &opts.extract_options());
    timer.stop("read OpenDRIVE");
    let doc = doc?;

    let results = timer.parallelize(
        "fit splines",
        opts.parallelism(),
        doc.roads.iter().collect(),
        |(id, road)| match road {
            Ok(road) => road_to_spline(road, opts).map_err(|err| err.for_road(id.clone())),
            Err(err) => Err(err.clone().for_road(id.clone())),
        },
    );
    let converted = Converted::new(results);
    info!(
        "Converted {} roads to splines, {} failed",
        converted.roads.len(),
        converted.errors.len()
    );
    Ok((doc, converted))
}

fn road_to_spline(road: &Road, opts: &ConvertOptions) -> Result<SplineRoad, Error> {
    if road.lane_sections_ignored > 0 {
        debug!(
            "Road {} has {} more lane sections that won't be used",
            road.id, road.lane_sections_ignored
        );
    }
    let samples = sample(road, opts.resolution)?;
    fit(road, &samples, &opts.spline)
}

/// Rebuilds an OpenDRIVE road from every spline, then writes all of the successful ones as one
/// document.
pub fn splines_to_xodr(
    splines: &[SplineRoad],
    name: &str,
    opts: &ConvertOptions,
    timer: &mut Timer,
) -> Result<(String, Converted<Road>), Error> {
    opts.validate()?;
    let results = timer.parallelize(
        "rebuild roads",
        opts.parallelism(),
        splines.iter().collect(),
        |spline| {
            reconstruct(spline, &opts.reconstruct).map_err(|err| err.for_road(spline.id.clone()))
        },
    );
    let converted = Converted::new(results);
    info!(
        "Rebuilt {} roads from splines, {} failed",
        converted.roads.len(),
        converted.errors.len()
    );
    let xml = write_document(name, &converted.roads)?;
    Ok((xml, converted))
}

/// Everything produced by converting a document to splines and back
pub struct RoundTrip {
    pub splines: Converted<SplineRoad>,
    pub splines_json: String,
    pub rebuilt: Converted<Road>,
    pub rebuilt_xml: String,
    /// Original centerlines against the splines
    pub spline_accuracy: AccuracyReport,
    /// Original centerlines against the rebuilt roads
    pub reconstruction_accuracy: AccuracyReport,
}

impl RoundTrip {
    pub fn is_clean(&self) -> bool {
        self.splines.is_clean()
            && self.rebuilt.is_clean()
            && self.spline_accuracy.is_clean()
            && self.reconstruction_accuracy.is_clean()
    }
}

/// OpenDRIVE to splines to OpenDRIVE, measuring how much each step loses.
pub fn round_trip(
    xml: &str,
    name: &str,
    opts: &ConvertOptions,
    timer: &mut Timer,
) -> Result<RoundTrip, Error> {
    let (doc, splines) = xodr_to_splines(xml, opts, timer)?;
    let splines_json = catmull_rom::to_json(&splines.roads)?;
    let (rebuilt_xml, rebuilt) = splines_to_xodr(&splines.roads, name, opts, timer)?;

    timer.start("evaluate");
    let spline_accuracy = evaluate_document(&doc, &splines.roads, opts, timer);
    let reconstruction_accuracy = evaluate_reconstructions(&doc, &rebuilt.roads, opts, timer);
    timer.stop("evaluate");

    Ok(RoundTrip {
        splines,
        splines_json,
        rebuilt,
        rebuilt_xml,
        spline_accuracy,
        reconstruction_accuracy,
    })
}
