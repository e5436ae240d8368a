//! Core value types shared by every search component.
//!
//! All of these are created fresh per query and never mutated after
//! construction. Instants are `DateTime<Utc>` and serialize as RFC 3339.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::error::SkyError;

/// An absolute UTC time point (nanosecond resolution).
pub type Instant = DateTime<Utc>;

// ── Observer ────────────────────────────────────────────────────────────────

/// A fixed observing site on the Earth's surface.
///
/// No search component takes an observer. It exists for callers, who
/// capture it in the [`PositionProvider`](crate::PositionProvider) they
/// build, usually a [`from_fn`](crate::from_fn) closure.
///
/// ```
/// use chrono::Utc;
/// use sky_engine::{from_fn, AltitudeSampler, Body, HorizontalPosition, Observer};
///
/// // Polaris stands at roughly the site's latitude, due north.
/// let site = Observer::new(51.48, 0.0)?;
/// let provider = from_fn(move |_, _| Ok(HorizontalPosition::new(site.latitude_deg(), 0.0)));
///
/// let sample = AltitudeSampler::new(&provider).sample(&Body::new("Polaris"), Utc::now())?;
/// assert_eq!(sample.altitude_degrees, 51.48);
/// # Ok::<(), sky_engine::SkyError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observer {
    latitude_deg: f64,
    longitude_deg: f64,
    elevation_m: Option<f64>,
}

impl Observer {
    /// Build an observer, validating latitude in [-90, 90] and longitude in [-180, 180].
    ///
    /// # Errors
    ///
    /// Returns [`SkyError::Config`] for out-of-range or non-finite coordinates.
    pub fn new(latitude_deg: f64, longitude_deg: f64) -> Result<Self, SkyError> {
        if !latitude_deg.is_finite() || !(-90.0..=90.0).contains(&latitude_deg) {
            return Err(SkyError::Config(format!(
                "latitude {latitude_deg} outside [-90, 90]"
            )));
        }
        if !longitude_deg.is_finite() || !(-180.0..=180.0).contains(&longitude_deg) {
            return Err(SkyError::Config(format!(
                "longitude {longitude_deg} outside [-180, 180]"
            )));
        }
        Ok(Self {
            latitude_deg,
            longitude_deg,
            elevation_m: None,
        })
    }

    /// Attach an elevation above sea level in metres.
    pub fn with_elevation(mut self, elevation_m: f64) -> Result<Self, SkyError> {
        if !elevation_m.is_finite() {
            return Err(SkyError::Config(format!("elevation {elevation_m} is not finite")));
        }
        self.elevation_m = Some(elevation_m);
        Ok(self)
    }

    pub fn latitude_deg(&self) -> f64 {
        self.latitude_deg
    }

    pub fn longitude_deg(&self) -> f64 {
        self.longitude_deg
    }

    pub fn elevation_m(&self) -> Option<f64> {
        self.elevation_m
    }
}

// ── Body ────────────────────────────────────────────────────────────────────

/// Opaque body identifier, resolved only by the position provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Body(String);

impl Body {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Body {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Body {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ── Samples and events ──────────────────────────────────────────────────────

/// Horizontal position of a body at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AltitudeSample {
    pub time: Instant,
    /// Degrees above the horizon, [-90, 90].
    pub altitude_degrees: f64,
    /// Compass bearing in degrees, [0, 360).
    pub azimuth_degrees: f64,
}

/// Which way the altitude passes through the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    /// Below → above.
    #[serde(rename = "rise")]
    Rising,
    /// Above → below.
    #[serde(rename = "set")]
    Falling,
}

impl Direction {
    /// Interchange name: `"rise"` or `"set"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Direction::Rising => "rise",
            Direction::Falling => "set",
        }
    }
}

/// A refined threshold crossing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossingEvent {
    pub time: Instant,
    pub direction: Direction,
    pub body: Body,
}

/// A maximal above-threshold interval with its peak.
///
/// `start`/`end` sit on the threshold unless the matching boundary flag is
/// set, in which case they are the domain bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibilityWindow {
    pub start: Instant,
    pub end: Instant,
    pub best_time: Instant,
    pub best_altitude: f64,
    pub body: Body,
    /// The body was already above threshold at the domain start.
    pub opens_at_boundary: bool,
    /// The body was still above threshold at the domain end.
    pub closes_at_boundary: bool,
}

impl VisibilityWindow {
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    pub fn is_open_ended(&self) -> bool {
        self.opens_at_boundary || self.closes_at_boundary
    }
}

// ── Scan results ────────────────────────────────────────────────────────────

/// Domain-level outcome of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Found,
    NotFound,
    ProviderError,
}

/// Ordered windows for one body over one domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    pub body: Body,
    pub windows: Vec<VisibilityWindow>,
    pub status: ScanStatus,
}

impl ScanResult {
    /// Wrap windows, deriving `Found`/`NotFound` from whether any exist.
    pub fn from_windows(body: Body, windows: Vec<VisibilityWindow>) -> Self {
        let status = if windows.is_empty() {
            ScanStatus::NotFound
        } else {
            ScanStatus::Found
        };
        Self {
            body,
            windows,
            status,
        }
    }

    /// The window with the highest peak; earliest wins ties.
    pub fn best_window(&self) -> Option<&VisibilityWindow> {
        self.windows.iter().fold(None, |best, w| match best {
            Some(b) if b.best_altitude >= w.best_altitude => Some(b),
            _ => Some(w),
        })
    }
}
