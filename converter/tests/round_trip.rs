use catmull_rom::{from_json, to_json};
use converter::{evaluate_document, round_trip, splines_to_xodr, xodr_to_splines, ConvertOptions};
use opendrive::{read_document, sample, ExtractOptions};
use roadutil::Timer;

const LANES: &str = r#"
        <lanes>
            <laneSection s="0">
                <left>
                    <lane id="1" type="driving" level="false"><width sOffset="0" a="3.5" b="0" c="0" d="0"/></lane>
                </left>
                <center><lane id="0" type="none" level="false"/></center>
                <right>
                    <lane id="-1" type="driving" level="false"><width sOffset="0" a="3.25" b="0" c="0" d="0"/></lane>
                </right>
            </laneSection>
        </lanes>"#;

fn document(roads: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" standalone="yes"?>
<OpenDRIVE>
    <header revMajor="1" revMinor="6" name="fixture" version="1.00"/>
    {}
</OpenDRIVE>"#,
        roads.join("\n")
    )
}

fn road(id: &str, length: f64, geometry: &str) -> String {
    format!(
        r#"<road name="{id}" length="{length}" id="{id}" junction="-1">
        <planView>{geometry}</planView>{LANES}
    </road>"#,
        id = id,
        length = length,
        geometry = geometry,
        LANES = LANES
    )
}

fn straight_road(id: &str) -> String {
    road(
        id,
        50.0,
        r#"
            <geometry s="0" x="10" y="-4" hdg="0.3" length="30"><line/></geometry>
            <geometry s="30" x="38.66009467376818" y="4.865606199840187" hdg="0.3" length="20"><line/></geometry>"#,
    )
}

// Line from 0 to 20, arc with curvature 0.05 from 20 to 40, line from 40 to 60
fn line_arc_line(id: &str, declared_length: f64) -> String {
    let k: f64 = 0.05;
    let arc_end_x = 20.0 + (1.0_f64).sin() / k;
    let arc_end_y = (1.0 - (1.0_f64).cos()) / k;
    road(
        id,
        declared_length,
        &format!(
            r#"
            <geometry s="0" x="0" y="0" hdg="0" length="20"><line/></geometry>
            <geometry s="20" x="20" y="0" hdg="0" length="20"><arc curvature="{}"/></geometry>
            <geometry s="40" x="{}" y="{}" hdg="1" length="20"><line/></geometry>"#,
            k, arc_end_x, arc_end_y
        ),
    )
}

fn sequential() -> ConvertOptions {
    ConvertOptions {
        parallel: false,
        ..Default::default()
    }
}

#[test]
fn straight_roads_survive_the_round_trip() {
    let xml = document(&[straight_road("1")]);
    let result = round_trip(&xml, "rebuilt", &sequential(), &mut Timer::throwaway()).unwrap();
    assert!(result.is_clean());

    let spline_stats = result.spline_accuracy.overall.unwrap();
    assert!(spline_stats.max < 0.01, "{}", spline_stats.describe());
    let rebuilt_stats = result.reconstruction_accuracy.overall.unwrap();
    assert!(rebuilt_stats.max < 0.01, "{}", rebuilt_stats.describe());

    // The rebuilt document can be read like any other, and its default lane is the spline
    let reread = read_document(&result.rebuilt_xml, &ExtractOptions::default()).unwrap();
    let rebuilt = reread.successful_roads().next().unwrap();
    assert_eq!(rebuilt, &result.rebuilt.roads[0]);
    let spline = &result.splines.roads[0];
    let first = sample(rebuilt, 1.0).unwrap()[0].pt;
    assert!(first.approx_eq(spline.control_points[0], 1e-9));
}

#[test]
fn line_arc_line_scenario() {
    let xml = document(&[line_arc_line("curvy", 60.0)]);
    let (doc, splines) = xodr_to_splines(&xml, &sequential(), &mut Timer::throwaway()).unwrap();
    assert!(splines.is_clean());

    let original = doc.successful_roads().next().unwrap();
    assert_eq!(sample(original, 1.0).unwrap().len(), 61);
    let spline = &splines.roads[0];
    assert!(spline.control_points.len() >= 61);
    assert_eq!(spline.lane_id, -1);

    let report = evaluate_document(&doc, &splines.roads, &sequential(), &mut Timer::throwaway());
    let stats = report.roads[0].stats;
    assert!(stats.mean < 0.05, "{}", stats.describe());

    let result = round_trip(&xml, "rebuilt", &sequential(), &mut Timer::throwaway()).unwrap();
    let rebuilt_stats = result.reconstruction_accuracy.overall.unwrap();
    assert!(rebuilt_stats.mean < 0.05, "{}", rebuilt_stats.describe());
}

#[test]
fn one_bad_road_does_not_spoil_the_rest() {
    let xml = document(&[
        straight_road("good"),
        line_arc_line("wrong length", 61.0),
        line_arc_line("also good", 60.0),
    ]);
    let (_, splines) = xodr_to_splines(&xml, &sequential(), &mut Timer::throwaway()).unwrap();
    let ids: Vec<&str> = splines.roads.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["good", "also good"]);
    assert_eq!(splines.errors.len(), 1);
    assert_eq!(splines.errors[0].road, "wrong length");
    assert_eq!(splines.errors[0].error.kind(), "GeometryLengthMismatch");
}

#[test]
fn parallel_matches_sequential() {
    let xml = document(&[
        straight_road("a"),
        line_arc_line("b", 60.0),
        straight_road("c"),
        line_arc_line("d", 60.0),
    ]);
    let (_, sequential_splines) =
        xodr_to_splines(&xml, &sequential(), &mut Timer::throwaway()).unwrap();
    let (_, parallel_splines) =
        xodr_to_splines(&xml, &ConvertOptions::default(), &mut Timer::throwaway()).unwrap();
    assert_eq!(sequential_splines.roads, parallel_splines.roads);
}

#[test]
fn json_on_disk_and_declared_lengths() {
    let xml = document(&[line_arc_line("curvy", 60.0)]);
    let (doc, splines) = xodr_to_splines(&xml, &sequential(), &mut Timer::throwaway()).unwrap();
    let json = to_json(&splines.roads).unwrap();
    let mut reloaded = from_json(&json).unwrap();
    assert_eq!(reloaded, splines.roads);

    reloaded[0].length = 65.0;
    let report = evaluate_document(&doc, &reloaded, &sequential(), &mut Timer::throwaway());
    assert!(report.roads.is_empty());
    assert_eq!(report.errors[0].kind, "LengthMismatch");
    assert!(report.overall.is_none());
}

#[test]
fn left_lane() {
    let xml = document(&[line_arc_line("curvy", 60.0)]);
    let opts = ConvertOptions {
        lane: opendrive::LaneSelection::ById(1),
        ..sequential()
    };
    let result = round_trip(&xml, "rebuilt", &opts, &mut Timer::throwaway()).unwrap();
    assert!(result.is_clean());
    assert_eq!(result.splines.roads[0].lane_id, 1);
    assert_eq!(result.rebuilt.roads[0].lane.lane_id, 1);
    // 1.75m to the left of the start
    assert!(result.splines.roads[0].control_points[0].approx_eq(geom::Pt2D::new(0.0, 1.75), 1e-9));
    let stats = result.reconstruction_accuracy.overall.unwrap();
    assert!(stats.mean < 0.05, "{}", stats.describe());
}

#[test]
fn middle_of_the_carriageway() {
    let xml = document(&[line_arc_line("curvy", 60.0)]);
    let opts = ConvertOptions {
        lane: opendrive::LaneSelection::RoadCenter,
        ..sequential()
    };
    let result = round_trip(&xml, "rebuilt", &opts, &mut Timer::throwaway()).unwrap();
    assert!(result.is_clean());
    let spline = &result.splines.roads[0];
    assert_eq!(spline.lane_id, 0);
    // 3.5m of lanes on the left and 3.25m on the right
    assert!(spline.control_points[0].approx_eq(geom::Pt2D::new(0.0, 0.125), 1e-9));
    assert_eq!(spline.lane_widths.len(), 1);
    assert!((spline.lane_widths[0].a - 6.75).abs() < 1e-12);

    // Rebuilt as one lane as wide as the carriageway, centered on the spline
    let rebuilt = &result.rebuilt.roads[0];
    assert_eq!(rebuilt.lane.lane_id, -1);
    assert!(rebuilt.segments[0].origin.approx_eq(spline.control_points[0], 1e-9));
    let stats = result.reconstruction_accuracy.overall.unwrap();
    assert!(stats.mean < 0.05, "{}", stats.describe());
}

#[test]
fn far_away_spline_fails_alone() {
    let json = r#"[
        {"id": "ok", "length": 30, "control_points": [[0, 0], [10, 0], [20, 1], [30, 3]]},
        {"id": "huge", "length": 10, "control_points": [[1e308, 0], [-1e308, 0], [2, 0], [3, 0]]}
    ]"#;
    let splines = from_json(json).unwrap();
    // On all CPUs, so a panic would take down the pool
    let (xml, rebuilt) =
        splines_to_xodr(&splines, "partial", &ConvertOptions::default(), &mut Timer::throwaway())
            .unwrap();
    assert_eq!(rebuilt.roads.len(), 1);
    assert_eq!(rebuilt.roads[0].id, "ok");
    assert_eq!(rebuilt.errors.len(), 1);
    assert_eq!(rebuilt.errors[0].road, "huge");
    assert_eq!(rebuilt.errors[0].error.kind(), "MalformedDocument");

    let doc = read_document(&xml, &ExtractOptions::default()).unwrap();
    assert_eq!(doc.roads.len(), 1);
    assert!(doc.roads[0].1.is_ok());
}
