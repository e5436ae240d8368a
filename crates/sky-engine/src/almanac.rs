//! Small single-instant helpers that sit beside the search engine: compass
//! names, moon phase, day/night test and a snapshot of which bodies are up.

use chrono::{TimeZone, Utc};
use serde::Serialize;

use crate::crossing::validate_threshold;
use crate::error::SkyError;
use crate::provider::{AltitudeSampler, PositionProvider};
use crate::types::{Body, Instant};

// ── Compass ─────────────────────────────────────────────────────────────────

const EIGHT_WINDS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

const SIXTEEN_WINDS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Number of named points on the compass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompassRose {
    Eight,
    #[default]
    Sixteen,
}

/// Nearest compass point to an azimuth in degrees. Any finite azimuth is
/// accepted and wrapped into [0, 360).
pub fn compass_point(azimuth_degrees: f64, rose: CompassRose) -> &'static str {
    let names: &[&'static str] = match rose {
        CompassRose::Eight => &EIGHT_WINDS,
        CompassRose::Sixteen => &SIXTEEN_WINDS,
    };
    let sector = 360.0 / names.len() as f64;
    let index = (azimuth_degrees.rem_euclid(360.0) / sector).round() as usize % names.len();
    names[index]
}

// ── Moon phase ──────────────────────────────────────────────────────────────

/// Lunation fraction at the 2001-01-01 00:00 UTC epoch.
const LUNATION_AT_EPOCH: f64 = 0.20439731;
/// Mean lunations per day (1 / 29.530588…).
const LUNATIONS_PER_DAY: f64 = 0.03386319269;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoonPhase {
    NewMoon,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    FullMoon,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

impl MoonPhase {
    const ALL: [MoonPhase; 8] = [
        MoonPhase::NewMoon,
        MoonPhase::WaxingCrescent,
        MoonPhase::FirstQuarter,
        MoonPhase::WaxingGibbous,
        MoonPhase::FullMoon,
        MoonPhase::WaningGibbous,
        MoonPhase::LastQuarter,
        MoonPhase::WaningCrescent,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MoonPhase::NewMoon => "New Moon",
            MoonPhase::WaxingCrescent => "Waxing Crescent",
            MoonPhase::FirstQuarter => "First Quarter",
            MoonPhase::WaxingGibbous => "Waxing Gibbous",
            MoonPhase::FullMoon => "Full Moon",
            MoonPhase::WaningGibbous => "Waning Gibbous",
            MoonPhase::LastQuarter => "Last Quarter",
            MoonPhase::WaningCrescent => "Waning Crescent",
        }
    }
}

impl std::fmt::Display for MoonPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Position within the mean synodic month, in [0, 1). 0 is new moon.
pub fn lunation_fraction(at: Instant) -> f64 {
    let epoch = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).single();
    let days = epoch.map_or(0.0, |e| (at - e).num_seconds() as f64 / 86400.0);
    (LUNATION_AT_EPOCH + days * LUNATIONS_PER_DAY).rem_euclid(1.0)
}

/// Mean moon phase at `at`, one of eight named phases.
pub fn moon_phase(at: Instant) -> MoonPhase {
    let index = (lunation_fraction(at) * 8.0 + 0.5) as usize % 8;
    MoonPhase::ALL[index]
}

// ── Snapshots ───────────────────────────────────────────────────────────────

/// Whether the sun is above the geometric horizon at `at`.
///
/// # Errors
///
/// Propagates the provider's error for `sun`.
pub fn is_daytime<P: PositionProvider + ?Sized>(
    sampler: AltitudeSampler<'_, P>,
    sun: &Body,
    at: Instant,
) -> Result<bool, SkyError> {
    Ok(sampler.sample(sun, at)?.altitude_degrees > 0.0)
}

/// Where one body is at a single instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BodyPosition {
    pub body: Body,
    pub altitude_degrees: f64,
    pub azimuth_degrees: f64,
    /// Altitude strictly above the requested minimum.
    pub visible: bool,
}

/// Sample every body at `at` and order them highest first. Bodies with equal
/// altitude keep their input order.
///
/// # Errors
///
/// [`SkyError::Config`] for `min_altitude` outside [-90, 90]; the first
/// provider failure otherwise.
pub fn visible_now<P: PositionProvider + ?Sized>(
    sampler: AltitudeSampler<'_, P>,
    bodies: &[Body],
    at: Instant,
    min_altitude: f64,
) -> Result<Vec<BodyPosition>, SkyError> {
    validate_threshold(min_altitude)?;
    let mut positions = bodies
        .iter()
        .map(|body| {
            let s = sampler.sample(body, at)?;
            Ok(BodyPosition {
                body: body.clone(),
                altitude_degrees: s.altitude_degrees,
                azimuth_degrees: s.azimuth_degrees,
                visible: s.altitude_degrees > min_altitude,
            })
        })
        .collect::<Result<Vec<_>, SkyError>>()?;
    positions.sort_by(|a, b| b.altitude_degrees.total_cmp(&a.altitude_degrees));
    Ok(positions)
}
