//! Contiguous above-threshold windows and their peaks.
//!
//! A two-state walk (below / above) over the coarse samples. Edges are
//! refined by the same bisection the crossing finder uses; the peak is
//! refined with a three-point parabola through the highest grid sample and
//! its neighbours, and the vertex is re-sampled so the reported altitude is
//! always one the provider actually returned.

use chrono::TimeDelta;
use log::debug;

use crate::config::SearchConfig;
use crate::crossing::{bisect_crossing, validate_threshold, Side};
use crate::error::SkyError;
use crate::provider::{AltitudeSampler, PositionProvider};
use crate::scan::{IntervalScanner, Samples};
use crate::types::{AltitudeSample, Body, Instant, ScanResult, VisibilityWindow};

pub struct VisibilityWindowFinder<'p, P: ?Sized> {
    scanner: IntervalScanner<'p, P>,
    config: SearchConfig,
}

impl<'p, P: PositionProvider + ?Sized> VisibilityWindowFinder<'p, P> {
    /// # Errors
    ///
    /// Returns [`SkyError::Config`] if the config fails validation.
    pub fn new(sampler: AltitudeSampler<'p, P>, config: &SearchConfig) -> Result<Self, SkyError> {
        config.validate()?;
        Ok(Self {
            scanner: IntervalScanner::new(sampler, config),
            config: *config,
        })
    }

    /// Find every window in `[start, end]` during which `body` is above
    /// `threshold`, sampling every `step`.
    ///
    /// A body that never rises above the threshold yields an empty
    /// [`ScanResult`] with status `NotFound`.
    ///
    /// # Errors
    ///
    /// [`SkyError::Config`] for a threshold outside [-90, 90],
    /// [`SkyError::Domain`] for a malformed range or step, and
    /// [`SkyError::Provider`] if any sample fails.
    pub fn find_windows(
        &self,
        body: &Body,
        start: Instant,
        end: Instant,
        step: TimeDelta,
        threshold: f64,
    ) -> Result<ScanResult, SkyError> {
        validate_threshold(threshold)?;
        let samples = self.scanner.scan(body, start, end, step)?;
        let windows = self.windows_in(samples, threshold)?;
        debug!(
            "{body}: {} window(s) above {threshold}° between {} and {}",
            windows.len(),
            start.to_rfc3339(),
            end.to_rfc3339()
        );
        Ok(ScanResult::from_windows(body.clone(), windows))
    }

    /// Build windows from an existing sample sequence.
    pub fn windows_in(
        &self,
        samples: Samples<'p, P>,
        threshold: f64,
    ) -> Result<Vec<VisibilityWindow>, SkyError> {
        validate_threshold(threshold)?;

        let sampler = samples.sampler();
        let body = samples.body().clone();
        let domain_start = samples.start();
        let domain_end = samples.end();

        let mut windows = Vec::new();
        let mut anchor: Option<(AltitudeSample, Side)> = None;
        let mut prev: Option<AltitudeSample> = None;
        let mut open: Option<OpenWindow> = None;

        for sample in samples {
            let sample = sample?;
            let side = Side::of(sample.altitude_degrees, threshold);

            if let Some(w) = open.as_mut() {
                w.observe(prev, sample);
            }

            if side != Side::Touch {
                match (anchor, side) {
                    (None, Side::Above) => {
                        open = Some(OpenWindow::new(domain_start, true, prev, sample));
                    }
                    (Some((a, Side::Below)), Side::Above) => {
                        let t = bisect_crossing(sampler, &body, threshold, &a, &sample, &self.config)?;
                        open = Some(OpenWindow::new(t, false, prev, sample));
                    }
                    (Some((a, Side::Above)), Side::Below) => {
                        let t = bisect_crossing(sampler, &body, threshold, &a, &sample, &self.config)?;
                        if let Some(w) = open.take() {
                            windows.push(w.close(sampler, &body, t, false)?);
                        }
                    }
                    _ => {}
                }
                anchor = Some((sample, side));
            }
            prev = Some(sample);
        }

        if let Some(w) = open.take() {
            windows.push(w.close(sampler, &body, domain_end, true)?);
        }

        Ok(windows)
    }
}

// ── Window under construction ───────────────────────────────────────────────

struct OpenWindow {
    start: Instant,
    opens_at_boundary: bool,
    peak: AltitudeSample,
    before_peak: Option<AltitudeSample>,
    after_peak: Option<AltitudeSample>,
}

impl OpenWindow {
    fn new(
        start: Instant,
        opens_at_boundary: bool,
        prev: Option<AltitudeSample>,
        first: AltitudeSample,
    ) -> Self {
        Self {
            start,
            opens_at_boundary,
            peak: first,
            before_peak: prev,
            after_peak: None,
        }
    }

    /// Track the highest sample and its grid neighbours.
    fn observe(&mut self, prev: Option<AltitudeSample>, sample: AltitudeSample) {
        if self.after_peak.is_none() && prev.map(|p| p.time) == Some(self.peak.time) {
            self.after_peak = Some(sample);
        }
        if sample.altitude_degrees > self.peak.altitude_degrees {
            self.peak = sample;
            self.before_peak = prev;
            self.after_peak = None;
        }
    }

    fn close<P: PositionProvider + ?Sized>(
        self,
        sampler: AltitudeSampler<'_, P>,
        body: &Body,
        end: Instant,
        closes_at_boundary: bool,
    ) -> Result<VisibilityWindow, SkyError> {
        let best = match (self.before_peak, self.after_peak) {
            (Some(before), Some(after)) => {
                refine_peak(sampler, body, &before, &self.peak, &after, self.start, end)?
            }
            _ => self.peak,
        };

        Ok(VisibilityWindow {
            start: self.start,
            end,
            best_time: best.time.clamp(self.start, end),
            best_altitude: best.altitude_degrees,
            body: body.clone(),
            opens_at_boundary: self.opens_at_boundary,
            closes_at_boundary,
        })
    }
}

/// Parabolic vertex through three equally spaced samples, re-sampled.
///
/// Keeps `peak` unless the provider confirms a higher altitude at the vertex.
fn refine_peak<P: PositionProvider + ?Sized>(
    sampler: AltitudeSampler<'_, P>,
    body: &Body,
    before: &AltitudeSample,
    peak: &AltitudeSample,
    after: &AltitudeSample,
    lower: Instant,
    upper: Instant,
) -> Result<AltitudeSample, SkyError> {
    let Some(h_ns) = (after.time - peak.time).num_nanoseconds() else {
        return Ok(*peak);
    };
    if (peak.time - before.time).num_nanoseconds() != Some(h_ns) {
        return Ok(*peak);
    }

    let (y0, y1, y2) = (
        before.altitude_degrees,
        peak.altitude_degrees,
        after.altitude_degrees,
    );
    let curvature = y0 - 2.0 * y1 + y2;
    if curvature >= 0.0 {
        return Ok(*peak);
    }

    let h = h_ns as f64;
    let offset_ns = (h * (y0 - y2) / (2.0 * curvature)).clamp(-h, h).round() as i64;
    if offset_ns == 0 {
        return Ok(*peak);
    }

    let vertex_time = (peak.time + TimeDelta::nanoseconds(offset_ns)).clamp(lower, upper);
    let vertex = sampler.sample(body, vertex_time)?;
    if vertex.altitude_degrees > peak.altitude_degrees {
        Ok(vertex)
    } else {
        Ok(*peak)
    }
}
