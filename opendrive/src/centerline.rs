use crate::{Error, GeometrySegment, LaneWidth, Pose, Road, SamplePoint};

/// Where to sample a road of `length`: every `resolution` meters from 0, plus the exact end. The
/// last interior sample is dropped if it'd land on the end anyway.
pub fn sample_positions(length: f64, resolution: f64) -> Result<Vec<f64>, Error> {
    if !resolution.is_finite() || resolution <= 0.0 {
        return Err(Error::InvalidConfiguration(format!(
            "sampling resolution must be positive, not {}",
            resolution
        )));
    }
    if !length.is_finite() || length <= 0.0 {
        return Err(Error::InvalidConfiguration(format!(
            "can't sample a road of length {}",
            length
        )));
    }

    let mut positions = Vec::new();
    let mut i = 0;
    loop {
        let s = (i as f64) * resolution;
        if s >= length - 1e-9 {
            break;
        }
        positions.push(s);
        i += 1;
    }
    positions.push(length);
    Ok(positions)
}

/// Traces the centerline of the road's selected lane.
pub fn sample(road: &Road, resolution: f64) -> Result<Vec<SamplePoint>, Error> {
    let mut pts = Vec::new();
    for s in sample_positions(road.length, resolution)? {
        let pose = road.centerline_pose(s)?;
        pts.push(SamplePoint {
            s,
            pt: pose.pt,
            heading: pose.heading,
        });
    }
    Ok(pts)
}

/// Like `sample`, but follows the reference line, ignoring lane offsets and widths.
pub fn reference_line(road: &Road, resolution: f64) -> Result<Vec<SamplePoint>, Error> {
    let mut pts = Vec::new();
    for s in sample_positions(road.length, resolution)? {
        let pose = road.reference_pose(s)?;
        pts.push(SamplePoint {
            s,
            pt: pose.pt,
            heading: pose.heading,
        });
    }
    Ok(pts)
}

impl Road {
    /// The segment containing `s`. On the boundary between two segments, the later one wins.
    pub fn segment_at(&self, s: f64) -> Result<&GeometrySegment, Error> {
        let slack = 1e-9 * self.length.max(1.0);
        if !s.is_finite() || s < -slack || s > self.length + slack {
            return Err(Error::ParameterOutOfRange {
                value: s,
                min: 0.0,
                max: self.length,
            });
        }
        let idx = self
            .segments
            .partition_point(|seg| seg.s0 <= s)
            .saturating_sub(1);
        self.segments.get(idx).ok_or_else(|| {
            Error::MalformedDocument(format!("road {} has no geometry", self.id))
        })
    }

    /// The pose on the reference line at `s`
    pub fn reference_pose(&self, s: f64) -> Result<Pose, Error> {
        let seg = self.segment_at(s)?;
        // Declared and summed lengths may disagree within tolerance, so the last segment absorbs
        // the difference.
        let local_s = (s - seg.s0).clamp(0.0, seg.length);
        seg.evaluate(local_s)
    }

    /// The pose on the selected lane's centerline at `s`. The heading is the reference line's.
    pub fn centerline_pose(&self, s: f64) -> Result<Pose, Error> {
        let pose = self.reference_pose(s)?;
        let offset = self.lateral_offset(s);
        if offset == 0.0 {
            return Ok(pose);
        }
        Ok(Pose {
            pt: pose.pt.project_away(offset, pose.heading.left_normal()),
            heading: pose.heading,
        })
    }

    /// Signed distance from the reference line to the selected lane's center. Positive is left.
    pub fn lateral_offset(&self, s: f64) -> f64 {
        LaneWidth::eval_records(&self.lane_offset, s) + self.lane.center_offset(s)
    }
}
