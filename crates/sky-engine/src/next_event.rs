//! Earliest upcoming event across several crossing generators.
//!
//! Each registered [`EventGenerator`] is a body, a threshold and a direction
//! filter. [`NextEventSelector::next_event`] walks every generator's crossing
//! stream lazily over `[after, after + horizon]`, keeps the first matching
//! event of each, and returns the earliest. Ties go to the generator that was
//! registered first. The horizon is mandatory and bounds every search; no
//! event inside it yields `NotFound`.

use chrono::TimeDelta;
use log::{debug, warn};
use serde::Serialize;

use crate::config::SearchConfig;
use crate::crossing::{validate_threshold, CrossingFinder};
use crate::error::SkyError;
use crate::provider::{AltitudeSampler, PositionProvider};
use crate::scan::IntervalScanner;
use crate::types::{Body, CrossingEvent, Direction, Instant, ScanStatus};

// ── Generators ──────────────────────────────────────────────────────────────

/// Which crossings a generator reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionFilter {
    Rising,
    Falling,
    Any,
}

impl DirectionFilter {
    pub fn accepts(&self, direction: Direction) -> bool {
        match self {
            DirectionFilter::Rising => direction == Direction::Rising,
            DirectionFilter::Falling => direction == Direction::Falling,
            DirectionFilter::Any => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventGenerator {
    pub body: Body,
    pub threshold: f64,
    pub filter: DirectionFilter,
}

impl EventGenerator {
    pub fn new(body: impl Into<Body>, threshold: f64, filter: DirectionFilter) -> Self {
        Self {
            body: body.into(),
            threshold,
            filter,
        }
    }

    pub fn rise(body: impl Into<Body>, threshold: f64) -> Self {
        Self::new(body, threshold, DirectionFilter::Rising)
    }

    pub fn set(body: impl Into<Body>, threshold: f64) -> Self {
        Self::new(body, threshold, DirectionFilter::Falling)
    }
}

// ── Results ─────────────────────────────────────────────────────────────────

/// The winning event and the registration index of its generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedEvent {
    pub generator: usize,
    pub event: CrossingEvent,
}

/// A generator whose provider failed during the search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratorFailure {
    pub generator: usize,
    pub body: Body,
    pub error: String,
}

/// Outcome of [`NextEventSelector::next_event`].
///
/// `status` is `Found` when an event was selected, `ProviderError` when
/// every generator failed, and `NotFound` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextEvent {
    pub selected: Option<SelectedEvent>,
    pub failures: Vec<GeneratorFailure>,
    pub status: ScanStatus,
}

impl NextEvent {
    pub fn event(&self) -> Option<&CrossingEvent> {
        self.selected.as_ref().map(|s| &s.event)
    }
}

// ── NextEventSelector ───────────────────────────────────────────────────────

pub struct NextEventSelector<'p, P: ?Sized> {
    scanner: IntervalScanner<'p, P>,
    finder: CrossingFinder,
    step: TimeDelta,
    generators: Vec<EventGenerator>,
}

impl<'p, P: PositionProvider + ?Sized> NextEventSelector<'p, P> {
    /// Create a selector sampling every `step` when searching.
    ///
    /// # Errors
    ///
    /// [`SkyError::Config`] if the config fails validation,
    /// [`SkyError::Domain`] if `step` is not positive.
    pub fn new(
        sampler: AltitudeSampler<'p, P>,
        config: &SearchConfig,
        step: TimeDelta,
    ) -> Result<Self, SkyError> {
        if step <= TimeDelta::zero() {
            return Err(SkyError::Domain(format!("step {step} must be positive")));
        }
        Ok(Self {
            scanner: IntervalScanner::new(sampler, config),
            finder: CrossingFinder::new(config)?,
            step,
            generators: Vec::new(),
        })
    }

    /// Register a generator and return its index. Earlier registrations win
    /// ties.
    ///
    /// # Errors
    ///
    /// Returns [`SkyError::Config`] for a threshold outside [-90, 90].
    pub fn register(&mut self, generator: EventGenerator) -> Result<usize, SkyError> {
        validate_threshold(generator.threshold)?;
        self.generators.push(generator);
        Ok(self.generators.len() - 1)
    }

    pub fn generators(&self) -> &[EventGenerator] {
        &self.generators
    }

    /// The earliest event strictly after `after` and no later than
    /// `after + horizon`, across all registered generators.
    ///
    /// # Errors
    ///
    /// [`SkyError::Config`] for a non-positive horizon, [`SkyError::Domain`]
    /// if the horizon overflows. Provider failures are recorded per
    /// generator in [`NextEvent::failures`].
    pub fn next_event(&self, after: Instant, horizon: TimeDelta) -> Result<NextEvent, SkyError> {
        if horizon <= TimeDelta::zero() {
            return Err(SkyError::Config(format!("horizon {horizon} must be positive")));
        }
        let end = after
            .checked_add_signed(horizon)
            .ok_or_else(|| SkyError::Domain(format!("horizon {horizon} overflows")))?;

        debug!(
            "next_event: {} generator(s) over {} → {}",
            self.generators.len(),
            after.to_rfc3339(),
            end.to_rfc3339()
        );

        let mut selected: Option<SelectedEvent> = None;
        let mut failures = Vec::new();

        for (index, generator) in self.generators.iter().enumerate() {
            let found = match self.first_event(generator, after, end) {
                Ok(found) => found,
                Err(e) if e.is_provider() => {
                    warn!("generator {index} ({}): {e}", generator.body);
                    failures.push(GeneratorFailure {
                        generator: index,
                        body: generator.body.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            if let Some(event) = found {
                let earlier = selected
                    .as_ref()
                    .is_none_or(|best| event.time < best.event.time);
                if earlier {
                    selected = Some(SelectedEvent {
                        generator: index,
                        event,
                    });
                }
            }
        }

        let status = if selected.is_some() {
            ScanStatus::Found
        } else if !failures.is_empty() && failures.len() == self.generators.len() {
            ScanStatus::ProviderError
        } else {
            ScanStatus::NotFound
        };

        Ok(NextEvent {
            selected,
            failures,
            status,
        })
    }

    fn first_event(
        &self,
        generator: &EventGenerator,
        after: Instant,
        end: Instant,
    ) -> Result<Option<CrossingEvent>, SkyError> {
        let samples = self.scanner.scan(&generator.body, after, end, self.step)?;
        for event in self.finder.crossings(samples, generator.threshold)? {
            let event = event?;
            if event.time > after && generator.filter.accepts(event.direction) {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }
}
