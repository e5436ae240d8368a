//! Position provider seam.
//!
//! The engine never computes an ephemeris. Callers inject anything that can
//! answer "where is this body at this instant" for a fixed observer, either
//! by implementing [`PositionProvider`] or by passing a closure.
//! [`AltitudeSampler`] wraps a provider, validates its answers, and is the
//! only thing the search components talk to.
//!
//! ```
//! use sky_engine::{from_fn, AltitudeSampler, Body, HorizontalPosition};
//! use chrono::{TimeZone, Utc};
//!
//! let provider = from_fn(|_body, _at| Ok(HorizontalPosition::new(30.0, 90.0)));
//! let sampler = AltitudeSampler::new(&provider);
//! let at = Utc.with_ymd_and_hms(2026, 6, 1, 22, 0, 0).unwrap();
//! assert_eq!(sampler.sample(&Body::new("Vega"), at).unwrap().altitude_degrees, 30.0);
//! ```

use crate::error::SkyError;
use crate::types::{AltitudeSample, Body, Instant};

/// Altitude and azimuth of a body, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizontalPosition {
    pub altitude_degrees: f64,
    pub azimuth_degrees: f64,
}

impl HorizontalPosition {
    pub fn new(altitude_degrees: f64, azimuth_degrees: f64) -> Self {
        Self {
            altitude_degrees,
            azimuth_degrees,
        }
    }
}

/// Answers `(body, instant) → (altitude, azimuth)` for one observer.
///
/// Implementations must be deterministic for the engine's results to be
/// reproducible. Out-of-range instants and unknown bodies should fail with
/// [`SkyError::Provider`].
pub trait PositionProvider {
    fn position(&self, body: &Body, at: Instant) -> Result<HorizontalPosition, SkyError>;
}

impl<P: PositionProvider + ?Sized> PositionProvider for &P {
    fn position(&self, body: &Body, at: Instant) -> Result<HorizontalPosition, SkyError> {
        (**self).position(body, at)
    }
}

/// Provider backed by a closure. Build one with [`from_fn`].
#[derive(Clone, Copy)]
pub struct FnProvider<F>(F);

impl<F> PositionProvider for FnProvider<F>
where
    F: Fn(&Body, Instant) -> Result<HorizontalPosition, SkyError>,
{
    fn position(&self, body: &Body, at: Instant) -> Result<HorizontalPosition, SkyError> {
        (self.0)(body, at)
    }
}

/// Wrap a closure as a [`PositionProvider`].
pub fn from_fn<F>(f: F) -> FnProvider<F>
where
    F: Fn(&Body, Instant) -> Result<HorizontalPosition, SkyError>,
{
    FnProvider(f)
}

// ── AltitudeSampler ─────────────────────────────────────────────────────────

/// Pure sampling adapter over a borrowed provider. No caching, no retries.
pub struct AltitudeSampler<'p, P: ?Sized> {
    provider: &'p P,
}

impl<P: ?Sized> Clone for AltitudeSampler<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P: ?Sized> Copy for AltitudeSampler<'_, P> {}

impl<'p, P: PositionProvider + ?Sized> AltitudeSampler<'p, P> {
    pub fn new(provider: &'p P) -> Self {
        Self { provider }
    }

    /// Sample `body` at `instant`.
    ///
    /// # Errors
    ///
    /// Propagates the provider's error, and returns [`SkyError::Provider`] if
    /// the provider answers with a non-finite value or an altitude outside
    /// [-90, 90].
    pub fn sample(&self, body: &Body, instant: Instant) -> Result<AltitudeSample, SkyError> {
        let pos = self.provider.position(body, instant)?;

        if !pos.altitude_degrees.is_finite() || !pos.azimuth_degrees.is_finite() {
            return Err(SkyError::Provider(format!(
                "non-finite position for {body} at {}",
                instant.to_rfc3339()
            )));
        }
        if !(-90.0..=90.0).contains(&pos.altitude_degrees) {
            return Err(SkyError::Provider(format!(
                "altitude {} for {body} at {} outside [-90, 90]",
                pos.altitude_degrees,
                instant.to_rfc3339()
            )));
        }

        Ok(AltitudeSample {
            time: instant,
            altitude_degrees: pos.altitude_degrees,
            azimuth_degrees: pos.azimuth_degrees.rem_euclid(360.0),
        })
    }

    pub fn provider(&self) -> &'p P {
        self.provider
    }
}
