use std::fmt;
use std::str::FromStr;

use geom::{Angle, Pt2D};

use crate::{
    Error, GeometrySegment, InnerLane, LaneProfile, LaneWidth, ParamRange, Primitive, Road,
    DEFAULT_LENGTH_TOLERANCE, MAX_COORDINATE,
};

/// Which lane's centerline represents a road. A road can have many lanes, but the interchange
/// format only has one line per road.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaneSelection {
    /// The innermost `driving` lane on the right side, or failing that, on the left side
    FirstDriving,
    /// A specific lane ID in the first lane section
    ById(i32),
    /// No lane at all; trace the road's reference line
    ReferenceLine,
    /// Halfway between the outer edges of the left and right lanes
    RoadCenter,
}

impl Default for LaneSelection {
    fn default() -> LaneSelection {
        LaneSelection::FirstDriving
    }
}

impl fmt::Display for LaneSelection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LaneSelection::FirstDriving => write!(f, "first-driving"),
            LaneSelection::ById(id) => write!(f, "{}", id),
            LaneSelection::ReferenceLine => write!(f, "reference"),
            LaneSelection::RoadCenter => write!(f, "road-center"),
        }
    }
}

impl FromStr for LaneSelection {
    type Err = Error;

    fn from_str(x: &str) -> Result<LaneSelection, Error> {
        match x {
            "first-driving" => Ok(LaneSelection::FirstDriving),
            "reference" => Ok(LaneSelection::ReferenceLine),
            "road-center" => Ok(LaneSelection::RoadCenter),
            _ => match x.parse::<i32>() {
                Ok(0) => Ok(LaneSelection::ReferenceLine),
                Ok(id) => Ok(LaneSelection::ById(id)),
                Err(_) => Err(Error::InvalidConfiguration(format!(
                    "lane selection must be first-driving, reference, road-center, or a lane ID, not {}",
                    x
                ))),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExtractOptions {
    pub lane: LaneSelection,
    /// How far the summed segment lengths may stray from the declared road length, in meters
    pub length_tolerance: f64,
}

impl Default for ExtractOptions {
    fn default() -> ExtractOptions {
        ExtractOptions {
            lane: LaneSelection::FirstDriving,
            length_tolerance: DEFAULT_LENGTH_TOLERANCE,
        }
    }
}

/// Every road of a document, each extracted independently. A broken road doesn't stop its
/// siblings from being read.
pub struct Document {
    /// From the header, if there is one
    pub name: Option<String>,
    /// In document order, paired with the road ID. Roads without an ID are named by position.
    pub roads: Vec<(String, Result<Road, Error>)>,
}

impl Document {
    pub fn successful_roads(&self) -> impl Iterator<Item = &Road> {
        self.roads.iter().filter_map(|(_, r)| r.as_ref().ok())
    }
}

/// Parses an OpenDRIVE document. Fails as a whole only if the XML itself is broken or this isn't
/// an OpenDRIVE document; problems with individual roads are returned per road.
pub fn read_document(raw: &str, opts: &ExtractOptions) -> Result<Document, Error> {
    if opts.length_tolerance < 0.0 || !opts.length_tolerance.is_finite() {
        return Err(Error::InvalidConfiguration(format!(
            "length tolerance must be a finite non-negative number, not {}",
            opts.length_tolerance
        )));
    }

    let tree = roxmltree::Document::parse(raw)
        .map_err(|err| Error::MalformedDocument(format!("bad XML: {}", err)))?;
    let root = tree.root_element();
    if root.tag_name().name() != "OpenDRIVE" {
        return Err(Error::MalformedDocument(format!(
            "root element is <{}>, not <OpenDRIVE>",
            root.tag_name().name()
        )));
    }

    let name = child(root, "header")
        .and_then(|header| header.attribute("name"))
        .map(|x| x.to_string());

    let mut roads = Vec::new();
    for (idx, node) in children(root, "road").enumerate() {
        let id = node
            .attribute("id")
            .map(|x| x.to_string())
            .unwrap_or_else(|| format!("#{}", idx));
        let result = extract_road(node, opts);
        match result {
            Ok(ref road) => debug!(
                "Extracted road {} with {} segments, {}m long",
                id,
                road.segments.len(),
                road.length
            ),
            Err(ref err) => debug!("Couldn't extract road {}: {}", id, err),
        }
        roads.push((id, result));
    }
    info!("Read {} roads from OpenDRIVE", roads.len());

    Ok(Document { name, roads })
}

fn extract_road(node: roxmltree::Node, opts: &ExtractOptions) -> Result<Road, Error> {
    let id = node
        .attribute("id")
        .ok_or_else(|| Error::MalformedDocument("<road> is missing id".to_string()))?
        .to_string();
    let length = required_f64(node, "length")?;
    if length <= 0.0 {
        return Err(Error::MalformedDocument(format!(
            "road length must be positive, not {}",
            length
        )));
    }

    let plan_view = child(node, "planView")
        .ok_or_else(|| Error::MalformedDocument("<road> has no <planView>".to_string()))?;
    let mut segments = Vec::new();
    for geometry in children(plan_view, "geometry") {
        segments.push(extract_segment(geometry)?);
    }
    if segments.is_empty() {
        return Err(Error::MalformedDocument(
            "<planView> has no <geometry>".to_string(),
        ));
    }
    check_coverage(&segments, length, opts.length_tolerance)?;

    let (lane_offset, lane, lane_sections_ignored) = match child(node, "lanes") {
        Some(lanes) => extract_lanes(lanes, opts.lane)?,
        None => {
            if opts.lane != LaneSelection::ReferenceLine {
                return Err(Error::MalformedDocument(format!(
                    "<road> has no <lanes>, so lane selection {} can't be used",
                    opts.lane
                )));
            }
            (Vec::new(), LaneProfile::reference_line(), 0)
        }
    };

    Ok(Road {
        id,
        length,
        segments,
        lane_offset,
        lane,
        lane_sections_ignored,
    })
}

fn extract_segment(node: roxmltree::Node) -> Result<GeometrySegment, Error> {
    let s0 = required_f64(node, "s")?;
    let x = required_f64(node, "x")?;
    let y = required_f64(node, "y")?;
    let hdg = required_f64(node, "hdg")?;
    let length = required_f64(node, "length")?;
    if length <= 0.0 {
        return Err(Error::MalformedDocument(format!(
            "<geometry s=\"{}\"> has non-positive length {}",
            s0, length
        )));
    }
    for (name, value) in [("s", s0), ("x", x), ("y", y), ("length", length)] {
        if value.abs() > MAX_COORDINATE {
            return Err(Error::MalformedDocument(format!(
                "<geometry> has {}={}, too far from 0",
                name, value
            )));
        }
    }
    if s0 < 0.0 {
        return Err(Error::MalformedDocument(format!(
            "<geometry> starts at negative s={}",
            s0
        )));
    }

    let kinds: Vec<roxmltree::Node> = node.children().filter(|n| n.is_element()).collect();
    let kind_node = match kinds.as_slice() {
        [kind_node] => *kind_node,
        [] => {
            return Err(Error::UnsupportedGeometryKind(format!(
                "<geometry s=\"{}\"> without any kind",
                s0
            )))
        }
        _ => {
            return Err(Error::MalformedDocument(format!(
                "<geometry s=\"{}\"> has {} kinds, expected 1",
                s0,
                kinds.len()
            )))
        }
    };

    let kind = match kind_node.tag_name().name() {
        "line" => Primitive::Line,
        "arc" => Primitive::Arc {
            curvature: required_f64(kind_node, "curvature")?,
        },
        "spiral" => Primitive::Spiral {
            curv_start: required_f64(kind_node, "curvStart")?,
            curv_end: required_f64(kind_node, "curvEnd")?,
        },
        "poly3" => {
            check_degree(kind_node, |name| {
                name.len() == 1 && !matches!(name, "a" | "b" | "c" | "d")
            })?;
            Primitive::Poly3 {
                a: optional_f64(kind_node, "a", 0.0)?,
                b: optional_f64(kind_node, "b", 0.0)?,
                c: optional_f64(kind_node, "c", 0.0)?,
                d: optional_f64(kind_node, "d", 0.0)?,
            }
        }
        "paramPoly3" => {
            check_degree(kind_node, |name| {
                name.len() == 2
                    && (name.ends_with('U') || name.ends_with('V'))
                    && !matches!(&name[0..1], "a" | "b" | "c" | "d")
            })?;
            let p_range = match kind_node.attribute("pRange") {
                None | Some("arcLength") => ParamRange::ArcLength,
                Some("normalized") => ParamRange::Normalized,
                Some(x) => {
                    return Err(Error::MalformedDocument(format!(
                        "<paramPoly3> has unknown pRange {}",
                        x
                    )))
                }
            };
            Primitive::ParamPoly3 {
                au: optional_f64(kind_node, "aU", 0.0)?,
                bu: optional_f64(kind_node, "bU", 0.0)?,
                cu: optional_f64(kind_node, "cU", 0.0)?,
                du: optional_f64(kind_node, "dU", 0.0)?,
                av: optional_f64(kind_node, "aV", 0.0)?,
                bv: optional_f64(kind_node, "bV", 0.0)?,
                cv: optional_f64(kind_node, "cV", 0.0)?,
                dv: optional_f64(kind_node, "dV", 0.0)?,
                p_range,
            }
        }
        other => {
            return Err(Error::UnsupportedGeometryKind(format!(
                "geometry kind <{}>",
                other
            )))
        }
    };

    let seg = GeometrySegment {
        s0,
        origin: Pt2D::new(x, y),
        heading: Angle::new_rads(hdg),
        length,
        kind,
    };
    seg.check_winding()?;
    Ok(seg)
}

// A coefficient beyond the cubic ones means a polynomial of a different degree.
fn check_degree<F: Fn(&str) -> bool>(node: roxmltree::Node, is_extra: F) -> Result<(), Error> {
    for attr in node.attributes() {
        if is_extra(attr.name()) {
            return Err(Error::UnsupportedGeometryKind(format!(
                "<{}> with coefficient {}; only cubics are supported",
                node.tag_name().name(),
                attr.name()
            )));
        }
    }
    Ok(())
}

fn check_coverage(segments: &[GeometrySegment], length: f64, tolerance: f64) -> Result<(), Error> {
    if segments[0].s0.abs() > tolerance {
        return Err(Error::GeometryLengthMismatch(format!(
            "the first segment starts at s={}, not 0",
            segments[0].s0
        )));
    }
    for (idx, pair) in segments.windows(2).enumerate() {
        if (pair[1].s0 - pair[0].s1()).abs() > tolerance {
            return Err(Error::GeometryLengthMismatch(format!(
                "segment {} ends at s={}, but segment {} starts at s={}",
                idx,
                pair[0].s1(),
                idx + 1,
                pair[1].s0
            )));
        }
    }
    let total: f64 = segments.iter().map(|seg| seg.length).sum();
    if (total - length).abs() > tolerance {
        return Err(Error::GeometryLengthMismatch(format!(
            "declared length is {}m, but the segments add up to {}m",
            length, total
        )));
    }
    Ok(())
}

fn extract_lanes(
    lanes: roxmltree::Node,
    selection: LaneSelection,
) -> Result<(Vec<LaneWidth>, LaneProfile, usize), Error> {
    let mut lane_offset = Vec::new();
    for record in children(lanes, "laneOffset") {
        lane_offset.push(polynomial(record, "s", 0.0)?);
    }
    lane_offset.sort_by(|a, b| a.s.total_cmp(&b.s));

    let sections: Vec<roxmltree::Node> = children(lanes, "laneSection").collect();
    let section = match sections.first() {
        Some(section) => *section,
        None => {
            if selection == LaneSelection::ReferenceLine {
                return Ok((lane_offset, LaneProfile::reference_line(), 0));
            }
            return Err(Error::MalformedDocument(
                "<lanes> has no <laneSection>".to_string(),
            ));
        }
    };
    let ignored = sections.len() - 1;
    if ignored > 0 {
        debug!(
            "Only using the first of {} lane sections; the rest are ignored",
            sections.len()
        );
    }
    let section_s = optional_f64(section, "s", 0.0)?;

    let mut all_lanes: Vec<RawLane> = Vec::new();
    for side in ["left", "right"] {
        if let Some(side_node) = child(section, side) {
            for lane in children(side_node, "lane") {
                all_lanes.push(RawLane::parse(lane, section_s)?);
            }
        }
    }

    let lane_id = match selection {
        LaneSelection::ReferenceLine => {
            return Ok((lane_offset, LaneProfile::reference_line(), ignored));
        }
        LaneSelection::RoadCenter => {
            let mut lanes: Vec<&RawLane> = all_lanes.iter().filter(|l| l.id != 0).collect();
            if lanes.is_empty() {
                return Err(Error::MalformedDocument(
                    "the first lane section has no lanes to find the middle of".to_string(),
                ));
            }
            // Left then right, each from the reference line outwards
            lanes.sort_by_key(|l| (-l.id.signum(), l.id.abs()));
            let all_widths: Vec<Vec<LaneWidth>> = lanes.iter().map(|l| l.widths.clone()).collect();
            return Ok((
                lane_offset,
                LaneProfile {
                    lane_id: 0,
                    widths: LaneWidth::sum_records(&all_widths),
                    inner: lanes.into_iter().map(RawLane::to_inner).collect(),
                },
                ignored,
            ));
        }
        LaneSelection::ById(id) => id,
        LaneSelection::FirstDriving => {
            let mut right: Vec<&RawLane> = all_lanes
                .iter()
                .filter(|l| l.id < 0 && l.lane_type == "driving")
                .collect();
            right.sort_by_key(|l| -l.id);
            let mut left: Vec<&RawLane> = all_lanes
                .iter()
                .filter(|l| l.id > 0 && l.lane_type == "driving")
                .collect();
            left.sort_by_key(|l| l.id);
            match right.first().or_else(|| left.first()) {
                Some(lane) => lane.id,
                None => {
                    return Err(Error::MalformedDocument(
                        "the first lane section has no driving lane".to_string(),
                    ));
                }
            }
        }
    };

    let selected = all_lanes
        .iter()
        .find(|l| l.id == lane_id)
        .ok_or_else(|| {
            Error::MalformedDocument(format!("the first lane section has no lane {}", lane_id))
        })?;
    if selected.widths.is_empty() {
        return Err(Error::MalformedDocument(format!(
            "lane {} has no <width> records",
            lane_id
        )));
    }

    // Lanes between the reference line and the selected one, innermost first
    let mut inner: Vec<&RawLane> = all_lanes
        .iter()
        .filter(|l| l.id.signum() == lane_id.signum() && l.id.abs() < lane_id.abs())
        .collect();
    inner.sort_by_key(|l| l.id.abs());

    Ok((
        lane_offset,
        LaneProfile {
            lane_id,
            widths: selected.widths.clone(),
            inner: inner.into_iter().map(RawLane::to_inner).collect(),
        },
        ignored,
    ))
}

struct RawLane {
    id: i32,
    lane_type: String,
    widths: Vec<LaneWidth>,
}

impl RawLane {
    fn parse(node: roxmltree::Node, section_s: f64) -> Result<RawLane, Error> {
        let raw_id = node
            .attribute("id")
            .ok_or_else(|| Error::MalformedDocument("<lane> is missing id".to_string()))?;
        let id = raw_id
            .parse::<i32>()
            .map_err(|_| Error::MalformedDocument(format!("<lane> has bad id {}", raw_id)))?;
        let mut widths = Vec::new();
        for record in children(node, "width") {
            widths.push(polynomial(record, "sOffset", section_s)?);
        }
        widths.sort_by(|a, b| a.s.total_cmp(&b.s));
        Ok(RawLane {
            id,
            lane_type: node.attribute("type").unwrap_or("none").to_string(),
            widths,
        })
    }

    fn to_inner(&self) -> InnerLane {
        InnerLane {
            id: self.id,
            lane_type: self.lane_type.clone(),
            widths: self.widths.clone(),
        }
    }
}

fn polynomial(node: roxmltree::Node, s_attr: &str, base_s: f64) -> Result<LaneWidth, Error> {
    Ok(LaneWidth {
        s: base_s + optional_f64(node, s_attr, 0.0)?,
        a: optional_f64(node, "a", 0.0)?,
        b: optional_f64(node, "b", 0.0)?,
        c: optional_f64(node, "c", 0.0)?,
        d: optional_f64(node, "d", 0.0)?,
    })
}

fn child<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn children<'a, 'input: 'a>(
    node: roxmltree::Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = roxmltree::Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

fn required_f64(node: roxmltree::Node, attr: &str) -> Result<f64, Error> {
    match node.attribute(attr) {
        Some(_) => optional_f64(node, attr, 0.0),
        None => Err(Error::MalformedDocument(format!(
            "<{}> is missing {}",
            node.tag_name().name(),
            attr
        ))),
    }
}

fn optional_f64(node: roxmltree::Node, attr: &str, default: f64) -> Result<f64, Error> {
    match node.attribute(attr) {
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(x) if x.is_finite() => Ok(x),
            _ => Err(Error::MalformedDocument(format!(
                "<{}> has bad {}=\"{}\"",
                node.tag_name().name(),
                attr,
                raw
            ))),
        },
        None => Ok(default),
    }
}
