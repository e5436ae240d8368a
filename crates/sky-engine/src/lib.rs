//! # sky-engine
//!
//! Deterministic altitude-threshold search for observational astronomy.
//!
//! Given any position provider (a closure or a [`PositionProvider`]
//! implementation answering "altitude and azimuth of this body at this
//! instant"), the engine finds threshold crossings, contiguous visibility
//! windows with their peak, the best night over a span of days, and the next
//! rise or set across several bodies. Coarse fixed-step sampling finds
//! brackets; bisection refines them, so cost does not grow with the
//! precision asked for.
//!
//! ## Modules
//!
//! - [`provider`] — Position provider seam and the validating [`AltitudeSampler`]
//! - [`scan`] — Lazy fixed-step sampling over a time domain
//! - [`crossing`] — Threshold crossings refined by bisection
//! - [`window`] — Above-threshold windows and their refined peak
//! - [`days`] — Day-by-day search with pluggable nightly bounds
//! - [`next_event`] — Earliest upcoming rise/set across several bodies
//! - [`almanac`] — Compass points, moon phase, daytime test, current snapshot
//! - [`report`] — JSON interchange documents and rankings
//! - [`config`] — Search tolerances and caps
//! - [`error`] — Error types
//!
//! ```
//! use chrono::{TimeDelta, TimeZone, Utc};
//! use sky_engine::{from_fn, AltitudeSampler, Body, HorizontalPosition, SearchConfig,
//!                  VisibilityWindowFinder};
//!
//! let t0 = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
//! let provider = from_fn(move |_, t| {
//!     let hours = (t - t0).num_seconds() as f64 / 3600.0;
//!     Ok(HorizontalPosition::new(30.0 - (hours - 12.0).abs() * 5.0, 180.0))
//! });
//!
//! let finder = VisibilityWindowFinder::new(AltitudeSampler::new(&provider), &SearchConfig::default())?;
//! let result = finder.find_windows(
//!     &Body::new("Mars"),
//!     t0,
//!     t0 + TimeDelta::days(1),
//!     TimeDelta::minutes(15),
//!     10.0,
//! )?;
//! assert_eq!(result.windows.len(), 1);
//! # Ok::<(), sky_engine::SkyError>(())
//! ```

pub mod almanac;
pub mod config;
pub mod crossing;
pub mod days;
pub mod error;
pub mod next_event;
pub mod provider;
pub mod report;
pub mod scan;
pub mod types;
pub mod window;

pub use almanac::{
    compass_point, is_daytime, lunation_fraction, moon_phase, visible_now, BodyPosition,
    CompassRose, MoonPhase,
};
pub use config::SearchConfig;
pub use crossing::{CrossingFinder, Crossings};
pub use days::{
    first_of_month_events, policy_from_fn, DayFailure, DayMatch, DayWindowPolicy,
    LocalHoursPolicy, MonthEvents, MultiDayScan, MultiDayScanner, NightEnd, TwilightPolicy,
    SUNSET_ALTITUDE_DEG,
};
pub use error::SkyError;
pub use next_event::{
    DirectionFilter, EventGenerator, GeneratorFailure, NextEvent, NextEventSelector,
    SelectedEvent,
};
pub use provider::{from_fn, AltitudeSampler, FnProvider, HorizontalPosition, PositionProvider};
pub use report::{describe_event, rank_by_altitude, BodyReport, EventDescription, EventRecord, WindowRecord};
pub use scan::{IntervalScanner, Samples};
pub use types::{
    AltitudeSample, Body, CrossingEvent, Direction, Instant, Observer, ScanResult, ScanStatus,
    VisibilityWindow,
};
pub use window::VisibilityWindowFinder;
