use std::{error, fmt};

/// Everything that can go wrong converting a road. All of these are fatal for the road they're
/// raised on, and never for its siblings.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// A geometry kind outside of line, arc, spiral, poly3, and paramPoly3, or a polynomial with
    /// the wrong degree
    UnsupportedGeometryKind(String),
    /// Evaluating a segment or road outside of its length
    ParameterOutOfRange { value: f64, min: f64, max: f64 },
    /// The segments don't tile the road's declared length
    GeometryLengthMismatch(String),
    InvalidConfiguration(String),
    /// Too few points to build a spline
    InsufficientPoints { required: usize, got: usize },
    /// The original road and its converted spline declare different lengths
    LengthMismatch { original: f64, converted: f64 },
    MalformedDocument(String),
}

impl Error {
    /// A stable name for the kind of error, independent of the details.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::UnsupportedGeometryKind(_) => "UnsupportedGeometryKind",
            Error::ParameterOutOfRange { .. } => "ParameterOutOfRange",
            Error::GeometryLengthMismatch(_) => "GeometryLengthMismatch",
            Error::InvalidConfiguration(_) => "InvalidConfiguration",
            Error::InsufficientPoints { .. } => "InsufficientPoints",
            Error::LengthMismatch { .. } => "LengthMismatch",
            Error::MalformedDocument(_) => "MalformedDocument",
        }
    }

    pub fn for_road<I: Into<String>>(self, road: I) -> RoadError {
        RoadError {
            road: road.into(),
            error: self,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: ", self.kind())?;
        match self {
            Error::UnsupportedGeometryKind(kind) => write!(f, "can't handle {}", kind),
            Error::ParameterOutOfRange { value, min, max } => {
                write!(f, "{} is outside of [{}, {}]", value, min, max)
            }
            Error::GeometryLengthMismatch(details) => write!(f, "{}", details),
            Error::InvalidConfiguration(details) => write!(f, "{}", details),
            Error::InsufficientPoints { required, got } => {
                write!(f, "need at least {} points, but only have {}", required, got)
            }
            Error::LengthMismatch {
                original,
                converted,
            } => write!(
                f,
                "original road is {}m long, but the converted one is {}m",
                original, converted
            ),
            Error::MalformedDocument(details) => write!(f, "{}", details),
        }
    }
}

impl error::Error for Error {}

/// An `Error` tagged with the road that it happened on.
#[derive(Clone, Debug, PartialEq)]
pub struct RoadError {
    pub road: String,
    pub error: Error,
}

impl fmt::Display for RoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "road {}: {}", self.road, self.error)
    }
}

impl error::Error for RoadError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.error)
    }
}
