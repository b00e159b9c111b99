//! Unified error handling for the track-insights library.
//!
//! Every fallible operation returns [`Result`]. Malformed activities and
//! degenerate inputs are reported as typed variants instead of panicking on
//! an out-of-range index.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for track-insights operations.
#[derive(Debug, Error)]
pub enum InsightsError {
    /// A file could not be opened or read
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// GPX document could not be parsed
    #[error("failed to parse GPX: {0}")]
    GpxParse(String),

    /// Activity has no first track or the track has no first segment
    #[error("activity {index} has no track segment")]
    MissingSegment { index: usize },

    /// Trajectory has fewer points than required
    #[error("trajectory {id} has {found} points, at least {required} required")]
    InsufficientPoints {
        id: usize,
        found: usize,
        required: usize,
    },

    /// A trajectory point carries no timestamp
    #[error("point {row} of trajectory {id} has no timestamp")]
    MissingTimestamp { id: usize, row: usize },

    /// An elevation needed for a difference is absent
    #[error("missing elevation: {0}")]
    MissingElevation(String),

    /// Stop-point table has no rows
    #[error("stop table is empty")]
    EmptyStopTable,

    /// Overpass returned no boundary for the queried place
    #[error("No boundaries were found for {place}. Try with another city or check your Overpass query limit.")]
    BoundaryNotFound { place: String },

    /// Transport or status failure talking to the map-data service
    #[error("HTTP error{}: {message}", .status_code.map(|c| format!(" ({})", c)).unwrap_or_default())]
    Http {
        message: String,
        status_code: Option<u16>,
    },

    /// Service answered with a body we could not interpret
    #[error("invalid Overpass response: {0}")]
    InvalidResponse(String),

    /// Chart backend failure
    #[error("plotting error: {0}")]
    Plot(String),

    /// Basemap image could not be decoded
    #[cfg(feature = "plot")]
    #[error("basemap image error: {0}")]
    Image(#[from] image::ImageError),

    /// Caller-supplied parameter out of range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl InsightsError {
    /// True for faults that come from the external map-data service,
    /// including an empty boundary result.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            InsightsError::BoundaryNotFound { .. } | InsightsError::Http { .. }
        )
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for InsightsError {
    fn from(e: reqwest::Error) -> Self {
        InsightsError::Http {
            status_code: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

/// Result type alias for track-insights operations.
pub type Result<T> = std::result::Result<T, InsightsError>;
