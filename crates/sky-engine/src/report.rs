//! Report-ready views of search results.
//!
//! [`BodyReport`] is the JSON interchange document for one body:
//!
//! ```json
//! { "body": "Mars",
//!   "windows": [{"start": "…", "end": "…", "best_time": "…", "best_altitude": 41.2}],
//!   "events": [{"time": "…", "kind": "rise"}] }
//! ```
//!
//! Instants are RFC 3339 strings in UTC, to the second.

use chrono::SecondsFormat;
use serde::Serialize;

use crate::almanac::{compass_point, CompassRose};
use crate::error::SkyError;
use crate::provider::{AltitudeSampler, PositionProvider};
use crate::types::{Body, CrossingEvent, Instant, ScanResult, VisibilityWindow};

fn iso(t: Instant) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ── Interchange document ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowRecord {
    pub start: String,
    pub end: String,
    pub best_time: String,
    pub best_altitude: f64,
}

impl From<&VisibilityWindow> for WindowRecord {
    fn from(w: &VisibilityWindow) -> Self {
        Self {
            start: iso(w.start),
            end: iso(w.end),
            best_time: iso(w.best_time),
            best_altitude: w.best_altitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    pub time: String,
    /// `"rise"` or `"set"`.
    pub kind: String,
}

impl From<&CrossingEvent> for EventRecord {
    fn from(e: &CrossingEvent) -> Self {
        Self {
            time: iso(e.time),
            kind: e.direction.kind().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BodyReport {
    pub body: Body,
    pub windows: Vec<WindowRecord>,
    pub events: Vec<EventRecord>,
}

impl BodyReport {
    pub fn new(body: Body) -> Self {
        Self {
            body,
            windows: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Build a report from a window scan plus any crossings found for the
    /// same body. Events are listed in time order.
    pub fn from_scan(scan: &ScanResult, events: &[CrossingEvent]) -> Self {
        let mut sorted: Vec<&CrossingEvent> = events.iter().collect();
        sorted.sort_by_key(|e| e.time);
        Self {
            body: scan.body.clone(),
            windows: scan.windows.iter().map(WindowRecord::from).collect(),
            events: sorted.into_iter().map(EventRecord::from).collect(),
        }
    }

    pub fn push_window(&mut self, window: &VisibilityWindow) {
        self.windows.push(window.into());
    }

    pub fn push_event(&mut self, event: &CrossingEvent) {
        self.events.push(event.into());
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// ── Event description ───────────────────────────────────────────────────────

/// Where a body stands at the moment of a crossing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventDescription {
    pub body: Body,
    pub time: String,
    pub kind: String,
    pub altitude_degrees: f64,
    pub azimuth_degrees: f64,
    pub compass: &'static str,
}

/// Re-sample `event.body` at the crossing instant and describe its position.
///
/// # Errors
///
/// Propagates the provider's error.
pub fn describe_event<P: PositionProvider + ?Sized>(
    sampler: AltitudeSampler<'_, P>,
    event: &CrossingEvent,
    rose: CompassRose,
) -> Result<EventDescription, SkyError> {
    let sample = sampler.sample(&event.body, event.time)?;
    Ok(EventDescription {
        body: event.body.clone(),
        time: iso(event.time),
        kind: event.direction.kind().to_string(),
        altitude_degrees: sample.altitude_degrees,
        azimuth_degrees: sample.azimuth_degrees,
        compass: compass_point(sample.azimuth_degrees, rose),
    })
}

// ── Ranking ─────────────────────────────────────────────────────────────────

/// Order scan results by their best window's peak altitude, highest first.
/// Results without any window go last; ties keep their input order.
pub fn rank_by_altitude(results: &[ScanResult]) -> Vec<&ScanResult> {
    let peak = |r: &ScanResult| r.best_window().map(|w| w.best_altitude);
    let mut ranked: Vec<&ScanResult> = results.iter().collect();
    ranked.sort_by(|a, b| match (peak(a), peak(b)) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    ranked
}
