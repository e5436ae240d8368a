//! Fixed-step sampling over a time domain.
//!
//! [`IntervalScanner::scan`] validates the domain up front and hands back a
//! lazy [`Samples`] iterator. Nothing is sampled until the iterator is
//! advanced, so callers that stop early pay only for what they consumed.
//! Sample times are `start + k·step`, computed by multiplication so that
//! re-running a scan reproduces identical instants. When `end` is off the
//! grid, one last sample is taken at exactly `end`, so no part of the
//! domain goes unexamined.

use chrono::TimeDelta;
use log::debug;

use crate::config::SearchConfig;
use crate::error::SkyError;
use crate::provider::{AltitudeSampler, PositionProvider};
use crate::types::{AltitudeSample, Body, Instant};

pub struct IntervalScanner<'p, P: ?Sized> {
    sampler: AltitudeSampler<'p, P>,
    max_samples: usize,
}

impl<'p, P: PositionProvider + ?Sized> IntervalScanner<'p, P> {
    pub fn new(sampler: AltitudeSampler<'p, P>, config: &SearchConfig) -> Self {
        Self {
            sampler,
            max_samples: config.max_samples,
        }
    }

    /// Produce samples of `body` at `start`, `start + step`, … up to the
    /// last grid instant not after `end`, then at `end` itself if that
    /// instant was not already on the grid.
    ///
    /// # Errors
    ///
    /// Returns [`SkyError::Domain`] if `start >= end`, `step <= 0`, the span
    /// is too large to represent, or the scan would exceed the configured
    /// sample cap. Provider failures surface per item from the iterator.
    pub fn scan(
        &self,
        body: &Body,
        start: Instant,
        end: Instant,
        step: TimeDelta,
    ) -> Result<Samples<'p, P>, SkyError> {
        if start >= end {
            return Err(SkyError::Domain(format!(
                "start {} is not before end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        if step <= TimeDelta::zero() {
            return Err(SkyError::Domain(format!("step {step} must be positive")));
        }

        let span_ns = (end - start)
            .num_nanoseconds()
            .ok_or_else(|| SkyError::Domain("time range too large".to_string()))?;
        let step_ns = step
            .num_nanoseconds()
            .ok_or_else(|| SkyError::Domain(format!("step {step} too large")))?;

        let on_grid = span_ns % step_ns == 0;
        let grid = usize::try_from(span_ns / step_ns)
            .ok()
            .and_then(|n| n.checked_add(1))
            .ok_or_else(|| SkyError::Domain(format!("step {step} too small for range")))?;
        let count = grid
            .checked_add(usize::from(!on_grid))
            .filter(|&n| n <= self.max_samples)
            .ok_or_else(|| {
                SkyError::Domain(format!(
                    "scan of {body} with step {step} exceeds {} samples",
                    self.max_samples
                ))
            })?;

        debug!(
            "scan {body}: {} → {} step {step}, {count} samples",
            start.to_rfc3339(),
            end.to_rfc3339()
        );

        Ok(Samples {
            sampler: self.sampler,
            body: body.clone(),
            start,
            end,
            step_ns,
            grid,
            count,
            next: 0,
        })
    }

    pub fn sampler(&self) -> AltitudeSampler<'p, P> {
        self.sampler
    }
}

// ── Samples ─────────────────────────────────────────────────────────────────

/// Lazy, finite, restartable sample sequence. Fuses after the first error.
pub struct Samples<'p, P: ?Sized> {
    sampler: AltitudeSampler<'p, P>,
    body: Body,
    start: Instant,
    end: Instant,
    step_ns: i64,
    /// Samples on the `start + k·step` grid.
    grid: usize,
    /// `grid`, plus one when `end` is off the grid.
    count: usize,
    next: usize,
}

impl<P: ?Sized> Clone for Samples<'_, P> {
    fn clone(&self) -> Self {
        Self {
            sampler: self.sampler,
            body: self.body.clone(),
            start: self.start,
            end: self.end,
            step_ns: self.step_ns,
            grid: self.grid,
            count: self.count,
            next: self.next,
        }
    }
}

impl<'p, P: PositionProvider + ?Sized> Samples<'p, P> {
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Domain start (the first sample's time).
    pub fn start(&self) -> Instant {
        self.start
    }

    /// Domain end, always the time of the last sample.
    pub fn end(&self) -> Instant {
        self.end
    }

    pub fn step(&self) -> TimeDelta {
        TimeDelta::nanoseconds(self.step_ns)
    }

    pub fn sampler(&self) -> AltitudeSampler<'p, P> {
        self.sampler
    }

    /// Time of the `k`-th sample. Grid products stay within the span.
    fn time_at(&self, k: usize) -> Instant {
        if k >= self.grid {
            self.end
        } else {
            self.start + TimeDelta::nanoseconds(self.step_ns * k as i64)
        }
    }
}

impl<P: PositionProvider + ?Sized> Iterator for Samples<'_, P> {
    type Item = Result<AltitudeSample, SkyError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.count {
            return None;
        }
        let t = self.time_at(self.next);
        let sample = self.sampler.sample(&self.body, t);
        self.next = if sample.is_ok() { self.next + 1 } else { self.count };
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.count - self.next))
    }
}
