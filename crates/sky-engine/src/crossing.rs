//! Threshold crossing detection with bisection refinement.
//!
//! Coarse samples locate a bracket where `altitude - threshold` changes
//! sign; the bracket is then halved by sampling its midpoint until it is no
//! wider than the configured tolerance or the iteration cap is hit. Cost is
//! `O(samples + crossings · log2(step / tolerance))`, independent of the
//! precision asked for.
//!
//! A sample sitting exactly on the threshold is a *touch*. Touches take the
//! side of the neighbouring non-touch samples, so a body that grazes the
//! threshold and turns back produces no events, and one that passes through
//! an exact touch produces exactly one.

use log::trace;

use crate::config::SearchConfig;
use crate::error::SkyError;
use crate::provider::{AltitudeSampler, PositionProvider};
use crate::scan::Samples;
use crate::types::{AltitudeSample, Body, CrossingEvent, Direction, Instant};

/// Which side of the threshold a sample lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Below,
    Touch,
    Above,
}

impl Side {
    pub(crate) fn of(altitude: f64, threshold: f64) -> Self {
        if altitude > threshold {
            Side::Above
        } else if altitude < threshold {
            Side::Below
        } else {
            Side::Touch
        }
    }
}

/// Reject thresholds that no altitude could ever cross.
pub(crate) fn validate_threshold(threshold: f64) -> Result<(), SkyError> {
    if !threshold.is_finite() || !(-90.0..=90.0).contains(&threshold) {
        return Err(SkyError::Config(format!(
            "threshold {threshold} outside [-90, 90]"
        )));
    }
    Ok(())
}

/// Refine a crossing between two samples on opposite sides of `threshold`.
///
/// `lo` must be a non-touch sample earlier than `hi`. Returns the midpoint
/// of the final bracket.
pub(crate) fn bisect_crossing<P: PositionProvider + ?Sized>(
    sampler: AltitudeSampler<'_, P>,
    body: &Body,
    threshold: f64,
    lo: &AltitudeSample,
    hi: &AltitudeSample,
    config: &SearchConfig,
) -> Result<Instant, SkyError> {
    let lo_side = Side::of(lo.altitude_degrees, threshold);
    let tolerance = config.time_tolerance();
    let (mut a, mut b) = (lo.time, hi.time);

    for _ in 0..config.max_bisection_iterations {
        if b - a <= tolerance {
            break;
        }
        let mid = a + (b - a) / 2;
        let s = sampler.sample(body, mid)?;
        if Side::of(s.altitude_degrees, threshold) == lo_side {
            a = mid;
        } else {
            b = mid;
        }
    }

    let t = a + (b - a) / 2;
    trace!("{body} crosses {threshold} at {}", t.to_rfc3339());
    Ok(t)
}

// ── CrossingFinder ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct CrossingFinder {
    config: SearchConfig,
}

impl CrossingFinder {
    /// # Errors
    ///
    /// Returns [`SkyError::Config`] if the config fails validation.
    pub fn new(config: &SearchConfig) -> Result<Self, SkyError> {
        config.validate()?;
        Ok(Self { config: *config })
    }

    /// Lazily yield crossings of `threshold` along `samples`, in time order.
    ///
    /// # Errors
    ///
    /// Returns [`SkyError::Config`] for a threshold outside [-90, 90].
    /// Provider failures surface from the iterator, which then ends.
    pub fn crossings<'p, P: PositionProvider + ?Sized>(
        &self,
        samples: Samples<'p, P>,
        threshold: f64,
    ) -> Result<Crossings<'p, P>, SkyError> {
        validate_threshold(threshold)?;
        Ok(Crossings {
            samples,
            threshold,
            config: self.config,
            anchor: None,
            done: false,
        })
    }

    /// Collect every crossing of `threshold` along `samples`.
    ///
    /// An empty result means no crossing; that is not an error.
    pub fn find_crossings<P: PositionProvider + ?Sized>(
        &self,
        samples: Samples<'_, P>,
        threshold: f64,
    ) -> Result<Vec<CrossingEvent>, SkyError> {
        self.crossings(samples, threshold)?.collect()
    }
}

/// Lazy crossing stream over a [`Samples`] sequence.
pub struct Crossings<'p, P: ?Sized> {
    samples: Samples<'p, P>,
    threshold: f64,
    config: SearchConfig,
    /// Last non-touch sample and its side.
    anchor: Option<(AltitudeSample, Side)>,
    done: bool,
}

impl<P: PositionProvider + ?Sized> Iterator for Crossings<'_, P> {
    type Item = Result<CrossingEvent, SkyError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let sample = match self.samples.next() {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                Some(Ok(s)) => s,
            };

            let side = Side::of(sample.altitude_degrees, self.threshold);
            if side == Side::Touch {
                continue;
            }

            let Some((prev, prev_side)) = self.anchor.replace((sample, side)) else {
                continue;
            };
            if prev_side == side {
                continue;
            }

            let direction = if side == Side::Above {
                Direction::Rising
            } else {
                Direction::Falling
            };
            let body = self.samples.body().clone();
            let refined = bisect_crossing(
                self.samples.sampler(),
                &body,
                self.threshold,
                &prev,
                &sample,
                &self.config,
            );
            return match refined {
                Ok(time) => Some(Ok(CrossingEvent {
                    time,
                    direction,
                    body,
                })),
                Err(e) => {
                    self.done = true;
                    Some(Err(e))
                }
            };
        }
    }
}
