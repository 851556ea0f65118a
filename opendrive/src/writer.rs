use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;

use crate::{Error, GeometrySegment, LaneWidth, Primitive, Road, Side, DEFAULT_LANE_WIDTH};

/// Produces an OpenDRIVE document with one `<road>` per input, in order. Attributes are always
/// written in the same order, so the same roads produce byte-identical output.
pub fn write_document(name: &str, roads: &[Road]) -> Result<String, Error> {
    let mut out = XmlOut::new();
    out.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    out.start("OpenDRIVE", &[])?;
    out.empty(
        "header",
        &[
            ("revMajor", "1".to_string()),
            ("revMinor", "6".to_string()),
            ("name", name.to_string()),
            ("version", "1.00".to_string()),
        ],
    )?;

    for road in roads {
        write_road(&mut out, road)?;
    }

    out.end("OpenDRIVE")?;
    let xml = out.finish()?;
    info!("Wrote {} roads to OpenDRIVE", roads.len());
    Ok(xml)
}

fn write_road(out: &mut XmlOut, road: &Road) -> Result<(), Error> {
    out.start(
        "road",
        &[
            ("name", road.id.clone()),
            ("length", num(road.length)),
            ("id", road.id.clone()),
            ("junction", "-1".to_string()),
        ],
    )?;

    out.start("planView", &[])?;
    for seg in &road.segments {
        write_segment(out, seg)?;
    }
    out.end("planView")?;

    write_lanes(out, road)?;
    out.end("road")
}

fn write_segment(out: &mut XmlOut, seg: &GeometrySegment) -> Result<(), Error> {
    out.start(
        "geometry",
        &[
            ("s", num(seg.s0)),
            ("x", num(seg.origin.x())),
            ("y", num(seg.origin.y())),
            ("hdg", num(seg.heading.radians())),
            ("length", num(seg.length)),
        ],
    )?;
    match seg.kind {
        Primitive::Line => out.empty("line", &[])?,
        Primitive::Arc { curvature } => out.empty("arc", &[("curvature", num(curvature))])?,
        Primitive::Spiral {
            curv_start,
            curv_end,
        } => out.empty(
            "spiral",
            &[("curvStart", num(curv_start)), ("curvEnd", num(curv_end))],
        )?,
        Primitive::Poly3 { a, b, c, d } => out.empty(
            "poly3",
            &[("a", num(a)), ("b", num(b)), ("c", num(c)), ("d", num(d))],
        )?,
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
        } => out.empty(
            "paramPoly3",
            &[
                ("aU", num(au)),
                ("bU", num(bu)),
                ("cU", num(cu)),
                ("dU", num(du)),
                ("aV", num(av)),
                ("bV", num(bv)),
                ("cV", num(cv)),
                ("dV", num(dv)),
                ("pRange", p_range.as_str().to_string()),
            ],
        )?,
    }
    out.end("geometry")
}

fn write_lanes(out: &mut XmlOut, road: &Road) -> Result<(), Error> {
    out.start("lanes", &[])?;
    for record in &road.lane_offset {
        out.empty("laneOffset", &polynomial("s", record.s, record))?;
    }

    out.start("laneSection", &[("s", num(0.0))])?;
    out.start("center", &[])?;
    out.start(
        "lane",
        &[
            ("id", "0".to_string()),
            ("type", "none".to_string()),
            ("level", "false".to_string()),
        ],
    )?;
    road_mark(out)?;
    out.end("lane")?;
    out.end("center")?;

    let default_widths = [LaneWidth::constant(0.0, DEFAULT_LANE_WIDTH)];
    let mut lanes: Vec<(i32, &str, &[LaneWidth])> = road
        .lane
        .inner
        .iter()
        .map(|lane| (lane.id, lane.lane_type.as_str(), lane.widths.as_slice()))
        .collect();
    if road.lane.lane_id != 0 {
        lanes.push((road.lane.lane_id, "driving", road.lane.widths.as_slice()));
    }
    // Without any lanes, still give the road one driving lane on the right.
    if lanes.is_empty() {
        lanes.push((-1, "driving", &default_widths[..]));
    }

    for side in [Side::Left, Side::Right] {
        let mut on_side: Vec<&(i32, &str, &[LaneWidth])> = lanes
            .iter()
            .filter(|(id, _, _)| Side::of_lane(*id) == Some(side))
            .collect();
        if on_side.is_empty() {
            continue;
        }
        // Listed from left to right, like the center lane
        on_side.sort_by_key(|(id, _, _)| -id);
        out.start(side.element_name(), &[])?;
        for (id, lane_type, widths) in on_side {
            write_lane(out, *id, lane_type, widths)?;
        }
        out.end(side.element_name())?;
    }

    out.end("laneSection")?;
    out.end("lanes")
}

fn write_lane(
    out: &mut XmlOut,
    id: i32,
    lane_type: &str,
    widths: &[LaneWidth],
) -> Result<(), Error> {
    out.start(
        "lane",
        &[
            ("id", id.to_string()),
            ("type", lane_type.to_string()),
            ("level", "false".to_string()),
        ],
    )?;
    for record in widths {
        // Width records are relative to the lane section, which starts at 0
        out.empty("width", &polynomial("sOffset", record.s, record))?;
    }
    road_mark(out)?;
    out.end("lane")
}

fn road_mark(out: &mut XmlOut) -> Result<(), Error> {
    out.empty(
        "roadMark",
        &[
            ("sOffset", num(0.0)),
            ("type", "solid".to_string()),
            ("width", num(0.12)),
        ],
    )
}

fn polynomial(s_attr: &'static str, s: f64, record: &LaneWidth) -> Vec<(&'static str, String)> {
    vec![
        (s_attr, num(s)),
        ("a", num(record.a)),
        ("b", num(record.b)),
        ("c", num(record.c)),
        ("d", num(record.d)),
    ]
}

// Rust's shortest round-trip representation, so reading the output back gives the same f64.
fn num(x: f64) -> String {
    if x == 0.0 {
        // Avoid -0
        return "0".to_string();
    }
    format!("{:?}", x)
        .trim_end_matches(".0")
        .to_string()
}

struct XmlOut {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlOut {
    fn new() -> XmlOut {
        XmlOut {
            writer: Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 4),
        }
    }

    fn event(&mut self, ev: Event) -> Result<(), Error> {
        self.writer
            .write_event(ev)
            .map_err(|err| Error::MalformedDocument(format!("couldn't write XML: {}", err)))
    }

    fn element(name: &str, attribs: &[(&str, String)]) -> BytesStart<'static> {
        let mut elem = BytesStart::new(name.to_string());
        for (key, value) in attribs {
            elem.push_attribute((*key, value.as_str()));
        }
        elem
    }

    fn start(&mut self, name: &str, attribs: &[(&str, String)]) -> Result<(), Error> {
        self.event(Event::Start(XmlOut::element(name, attribs)))
    }

    fn empty(&mut self, name: &str, attribs: &[(&str, String)]) -> Result<(), Error> {
        self.event(Event::Empty(XmlOut::element(name, attribs)))
    }

    fn end(&mut self, name: &str) -> Result<(), Error> {
        self.event(Event::End(BytesEnd::new(name.to_string())))
    }

    fn finish(self) -> Result<String, Error> {
        String::from_utf8(self.writer.into_inner().into_inner())
            .map_err(|err| Error::MalformedDocument(format!("wrote invalid UTF-8: {}", err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        read_document, sample, segment, ExtractOptions, InnerLane, LaneProfile, LaneSelection,
        ParamRange,
    };

    fn road() -> Road {
        Road {
            id: "12".to_string(),
            length: 30.0,
            segments: vec![
                segment(0.0, 1.5, -2.0, 0.25, 10.0, Primitive::Line),
                segment(
                    10.0,
                    11.187,
                    0.474,
                    0.25,
                    20.0,
                    Primitive::ParamPoly3 {
                        au: 0.0,
                        bu: 20.0,
                        cu: 0.1,
                        du: -0.05,
                        av: 0.0,
                        bv: 0.0,
                        cv: 1.0 / 3.0,
                        dv: -0.125,
                        p_range: ParamRange::Normalized,
                    },
                ),
            ],
            lane_offset: vec![LaneWidth::constant(0.0, -1.75)],
            lane: LaneProfile {
                lane_id: -1,
                widths: vec![LaneWidth {
                    s: 0.0,
                    a: 3.5,
                    b: 0.01,
                    c: 0.0,
                    d: 0.0,
                }],
                inner: Vec::new(),
            },
            lane_sections_ignored: 0,
        }
    }

    #[test]
    fn numbers() {
        assert_eq!(num(0.0), "0");
        assert_eq!(num(-0.0), "0");
        assert_eq!(num(3.0), "3");
        assert_eq!(num(0.1), "0.1");
        assert_eq!(num(-2.5), "-2.5");
        assert_eq!(num(1.0 / 3.0).parse::<f64>().unwrap(), 1.0 / 3.0);
    }

    #[test]
    fn read_back() {
        let original = road();
        let xml = write_document("round trip", &[original.clone()]).unwrap();
        assert!(xml.contains("<paramPoly3 "));
        assert!(xml.contains("pRange=\"normalized\""));

        let doc = read_document(&xml, &ExtractOptions::default()).unwrap();
        assert_eq!(doc.name, Some("round trip".to_string()));
        let (id, result) = &doc.roads[0];
        assert_eq!(id, "12");
        assert_eq!(result.as_ref().unwrap(), &original);
    }

    #[test]
    fn deterministic() {
        let a = write_document("x", &[road()]).unwrap();
        let b = write_document("x", &[road()]).unwrap();
        assert_eq!(a, b);
        let road_attrs = a.lines().find(|l| l.contains("<road ")).unwrap();
        assert_eq!(
            road_attrs.trim(),
            r#"<road name="12" length="30" id="12" junction="-1">"#
        );
    }

    #[test]
    fn reference_line_road_gets_a_default_lane() {
        let mut r = road();
        r.lane = LaneProfile::reference_line();
        r.lane_offset.clear();
        let xml = write_document("x", &[r]).unwrap();
        assert!(xml.contains(r#"<lane id="-1" type="driving" level="false">"#));
    }

    #[test]
    fn inner_lanes_survive() {
        // The traced lane is behind a sidewalk, with one more lane on the other side
        let mut original = road();
        original.lane = LaneProfile {
            lane_id: -2,
            widths: vec![LaneWidth::constant(0.0, 3.0)],
            inner: vec![InnerLane {
                id: -1,
                lane_type: "sidewalk".to_string(),
                widths: vec![LaneWidth::constant(0.0, 2.0)],
            }],
        };
        let xml = write_document("x", &[original.clone()]).unwrap();
        assert!(xml.contains(r#"<lane id="-1" type="sidewalk" level="false">"#));

        let opts = ExtractOptions {
            lane: LaneSelection::ById(-2),
            ..Default::default()
        };
        let doc = read_document(&xml, &opts).unwrap();
        let reread = doc.roads[0].1.as_ref().unwrap();
        assert_eq!(reread, &original);
        let before = sample(&original, 2.0).unwrap();
        let after = sample(reread, 2.0).unwrap();
        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(after.iter()) {
            assert!(a.pt.approx_eq(b.pt, 1e-9), "{:?} vs {:?}", a.pt, b.pt);
        }

        // The default selection finds the same driving lane
        let doc = read_document(&xml, &ExtractOptions::default()).unwrap();
        assert_eq!(doc.roads[0].1.as_ref().unwrap().lane.lane_id, -2);
    }

    #[test]
    fn whole_carriageway_survives() {
        let mut original = road();
        let lane = |id: i32, lane_type: &str, width: f64| InnerLane {
            id,
            lane_type: lane_type.to_string(),
            widths: vec![LaneWidth::constant(0.0, width)],
        };
        original.lane = LaneProfile {
            lane_id: 0,
            widths: vec![LaneWidth::constant(0.0, 8.5)],
            inner: vec![
                lane(1, "driving", 3.5),
                lane(-1, "sidewalk", 2.0),
                lane(-2, "driving", 3.0),
            ],
        };
        let xml = write_document("x", &[original.clone()]).unwrap();
        let left = xml.find("<left>").unwrap();
        let right = xml.find("<right>").unwrap();
        assert!(left < right);
        assert!(xml.find(r#"<lane id="-1" "#).unwrap() < xml.find(r#"<lane id="-2" "#).unwrap());

        let opts = ExtractOptions {
            lane: LaneSelection::RoadCenter,
            ..Default::default()
        };
        let doc = read_document(&xml, &opts).unwrap();
        assert_eq!(doc.roads[0].1.as_ref().unwrap(), &original);
    }
}
