//! Day-by-day visibility search.
//!
//! [`MultiDayScanner`] asks a [`DayWindowPolicy`] for each calendar day's
//! search bounds (evening hours, sunset to sunrise, …), runs one window
//! search per day and stops as soon as enough qualifying days are found.
//! A provider failure on one day is recorded and the scan moves on.
//!
//! Two policies are built in: [`LocalHoursPolicy`] (fixed local clock
//! bounds) and [`TwilightPolicy`] (bounds derived from the sun's own
//! crossings, found with the engine).

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use log::{debug, warn};
use serde::Serialize;

use crate::config::SearchConfig;
use crate::crossing::{validate_threshold, CrossingFinder};
use crate::error::SkyError;
use crate::provider::{AltitudeSampler, PositionProvider};
use crate::scan::IntervalScanner;
use crate::types::{Body, CrossingEvent, Direction, Instant, ScanStatus, VisibilityWindow};
use crate::window::VisibilityWindowFinder;

/// Conventional sunset/sunrise altitude of the sun's centre, in degrees.
pub const SUNSET_ALTITUDE_DEG: f64 = -0.833;

// ── DayWindowPolicy ─────────────────────────────────────────────────────────

/// Supplies the search sub-domain for one calendar day.
pub trait DayWindowPolicy {
    /// `Ok(None)` when the day has no sub-domain at all (e.g. no sunset).
    ///
    /// Failures that should be recorded against the day and skipped must be
    /// [`SkyError::Provider`]; anything else aborts the scan.
    fn bounds(&self, day: NaiveDate) -> Result<Option<(Instant, Instant)>, SkyError>;
}

impl<D: DayWindowPolicy + ?Sized> DayWindowPolicy for &D {
    fn bounds(&self, day: NaiveDate) -> Result<Option<(Instant, Instant)>, SkyError> {
        (**self).bounds(day)
    }
}

/// Policy backed by a closure. Build one with [`policy_from_fn`].
#[derive(Clone, Copy)]
pub struct FnPolicy<F>(F);

impl<F> DayWindowPolicy for FnPolicy<F>
where
    F: Fn(NaiveDate) -> Result<Option<(Instant, Instant)>, SkyError>,
{
    fn bounds(&self, day: NaiveDate) -> Result<Option<(Instant, Instant)>, SkyError> {
        (self.0)(day)
    }
}

pub fn policy_from_fn<F>(f: F) -> FnPolicy<F>
where
    F: Fn(NaiveDate) -> Result<Option<(Instant, Instant)>, SkyError>,
{
    FnPolicy(f)
}

// ── MultiDayScanner ─────────────────────────────────────────────────────────

/// The best window found on one qualifying day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayMatch {
    pub day: NaiveDate,
    pub window: VisibilityWindow,
}

/// A day that could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayFailure {
    pub day: NaiveDate,
    pub error: String,
}

/// Outcome of a multi-day scan.
///
/// `status` is `Found` when the quota was met, `ProviderError` when every
/// scanned day failed, and `NotFound` otherwise (matches may be partial).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiDayScan {
    pub body: Body,
    pub matches: Vec<DayMatch>,
    pub failures: Vec<DayFailure>,
    pub days_scanned: u32,
    pub status: ScanStatus,
}

pub struct MultiDayScanner<'p, P: ?Sized> {
    finder: VisibilityWindowFinder<'p, P>,
    config: SearchConfig,
}

impl<'p, P: PositionProvider + ?Sized> MultiDayScanner<'p, P> {
    /// # Errors
    ///
    /// Returns [`SkyError::Config`] if the config fails validation.
    pub fn new(sampler: AltitudeSampler<'p, P>, config: &SearchConfig) -> Result<Self, SkyError> {
        Ok(Self {
            finder: VisibilityWindowFinder::new(sampler, config)?,
            config: *config,
        })
    }

    /// Scan from `start_day` forward, one window search per day, until
    /// `match_quota` days qualify or `horizon_days` days have been examined.
    ///
    /// # Errors
    ///
    /// [`SkyError::Config`] for a bad threshold, a zero quota, or a horizon
    /// outside `1..=max_horizon_days`; [`SkyError::Domain`] for a
    /// non-positive step or a calendar overflow. Provider failures never
    /// abort the scan; they are listed in [`MultiDayScan::failures`].
    #[allow(clippy::too_many_arguments)]
    pub fn scan_days<D: DayWindowPolicy + ?Sized>(
        &self,
        body: &Body,
        policy: &D,
        start_day: NaiveDate,
        horizon_days: u32,
        match_quota: u32,
        threshold: f64,
        step: TimeDelta,
    ) -> Result<MultiDayScan, SkyError> {
        validate_threshold(threshold)?;
        if horizon_days == 0 || horizon_days > self.config.max_horizon_days {
            return Err(SkyError::Config(format!(
                "horizon_days {horizon_days} outside 1..={}",
                self.config.max_horizon_days
            )));
        }
        if match_quota == 0 {
            return Err(SkyError::Config("match_quota must be positive".to_string()));
        }
        if step <= TimeDelta::zero() {
            return Err(SkyError::Domain(format!("step {step} must be positive")));
        }

        debug!("scan_days {body}: from {start_day}, horizon {horizon_days}, quota {match_quota}");

        let mut matches = Vec::new();
        let mut failures = Vec::new();
        let mut days_scanned = 0u32;

        for offset in 0..horizon_days {
            let day = start_day
                .checked_add_days(Days::new(u64::from(offset)))
                .ok_or_else(|| SkyError::Domain(format!("{start_day} + {offset} days overflows")))?;
            days_scanned += 1;

            let bounds = match policy.bounds(day) {
                Ok(Some(bounds)) => bounds,
                Ok(None) => continue,
                Err(e) if e.is_provider() => {
                    warn!("{body} on {day}: day window unavailable: {e}");
                    failures.push(DayFailure {
                        day,
                        error: e.to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            match self.finder.find_windows(body, bounds.0, bounds.1, step, threshold) {
                Ok(result) => {
                    if let Some(best) = result.best_window() {
                        matches.push(DayMatch {
                            day,
                            window: best.clone(),
                        });
                    }
                }
                Err(e) if e.is_provider() => {
                    warn!("{body} on {day}: {e}");
                    failures.push(DayFailure {
                        day,
                        error: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }

            if matches.len() >= match_quota as usize {
                break;
            }
        }

        let status = if matches.len() >= match_quota as usize {
            ScanStatus::Found
        } else if matches.is_empty() && failures.len() == days_scanned as usize {
            ScanStatus::ProviderError
        } else {
            ScanStatus::NotFound
        };

        debug!(
            "scan_days {body}: {} match(es), {} failure(s) in {days_scanned} day(s)",
            matches.len(),
            failures.len()
        );

        Ok(MultiDayScan {
            body: body.clone(),
            matches,
            failures,
            days_scanned,
            status,
        })
    }
}

// ── Local time helpers ──────────────────────────────────────────────────────

/// Parse an IANA timezone string into `Tz`.
pub(crate) fn parse_timezone(s: &str) -> Result<Tz, SkyError> {
    s.parse::<Tz>()
        .map_err(|_| SkyError::Config(format!("invalid timezone '{s}'")))
}

/// Resolve a local wall-clock time to UTC. Ambiguous times take the earlier
/// instant; times inside a DST gap move forward by an hour.
pub(crate) fn local_to_utc(tz: &Tz, naive: NaiveDateTime) -> Result<Instant, SkyError> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            naive
                .checked_add_signed(TimeDelta::hours(1))
                .and_then(|shifted| tz.from_local_datetime(&shifted).earliest())
        })
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| SkyError::Domain(format!("local time {naive} does not exist in {tz}")))
}

fn next_day(day: NaiveDate) -> Result<NaiveDate, SkyError> {
    day.succ_opt()
        .ok_or_else(|| SkyError::Domain(format!("no day after {day}")))
}

// ── LocalHoursPolicy ────────────────────────────────────────────────────────

/// Fixed local clock bounds, e.g. 18:00 → 23:59. An end that is not after
/// the start falls on the following day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalHoursPolicy {
    tz: Tz,
    start: NaiveTime,
    end: NaiveTime,
}

impl LocalHoursPolicy {
    /// # Errors
    ///
    /// Returns [`SkyError::Config`] if `timezone` is not a valid IANA name.
    pub fn new(timezone: &str, start: NaiveTime, end: NaiveTime) -> Result<Self, SkyError> {
        Ok(Self {
            tz: parse_timezone(timezone)?,
            start,
            end,
        })
    }
}

impl DayWindowPolicy for LocalHoursPolicy {
    fn bounds(&self, day: NaiveDate) -> Result<Option<(Instant, Instant)>, SkyError> {
        let start = local_to_utc(&self.tz, day.and_time(self.start))?;
        let end_day = if self.end > self.start { day } else { next_day(day)? };
        let end = local_to_utc(&self.tz, end_day.and_time(self.end))?;
        Ok(Some((start, end)))
    }
}

// ── TwilightPolicy ──────────────────────────────────────────────────────────

/// Where a sunset-based night ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NightEnd {
    /// A fixed local clock time (the next day's if not after sunset).
    LocalTime(NaiveTime),
    /// The sun's next rising through the same horizon altitude.
    Sunrise,
}

/// Night bounds from the sun's own threshold crossings.
///
/// Sunset is the first falling crossing of `horizon_deg` after local noon.
/// Days without one (midnight sun, polar night) have no sub-domain.
pub struct TwilightPolicy<'p, P: ?Sized> {
    sampler: AltitudeSampler<'p, P>,
    sun: Body,
    tz: Tz,
    night_end: NightEnd,
    horizon_deg: f64,
    step: TimeDelta,
    config: SearchConfig,
}

impl<'p, P: PositionProvider + ?Sized> TwilightPolicy<'p, P> {
    /// # Errors
    ///
    /// Returns [`SkyError::Config`] for an invalid timezone or config.
    pub fn new(
        sampler: AltitudeSampler<'p, P>,
        sun: Body,
        timezone: &str,
        night_end: NightEnd,
        config: &SearchConfig,
    ) -> Result<Self, SkyError> {
        config.validate()?;
        Ok(Self {
            sampler,
            sun,
            tz: parse_timezone(timezone)?,
            night_end,
            horizon_deg: SUNSET_ALTITUDE_DEG,
            step: TimeDelta::minutes(10),
            config: *config,
        })
    }

    /// Use a different sun altitude, e.g. -18° for astronomical twilight.
    pub fn with_horizon(mut self, horizon_deg: f64) -> Result<Self, SkyError> {
        validate_threshold(horizon_deg)?;
        self.horizon_deg = horizon_deg;
        Ok(self)
    }

    /// Coarse step used when searching for the sun's crossings.
    pub fn with_step(mut self, step: TimeDelta) -> Result<Self, SkyError> {
        if step <= TimeDelta::zero() {
            return Err(SkyError::Domain(format!("step {step} must be positive")));
        }
        self.step = step;
        Ok(self)
    }

    fn first_crossing(
        &self,
        start: Instant,
        end: Instant,
        direction: Direction,
    ) -> Result<Option<Instant>, SkyError> {
        let scanner = IntervalScanner::new(self.sampler, &self.config);
        let samples = scanner.scan(&self.sun, start, end, self.step)?;
        let finder = CrossingFinder::new(&self.config)?;
        for event in finder.crossings(samples, self.horizon_deg)? {
            let event = event?;
            if event.direction == direction {
                return Ok(Some(event.time));
            }
        }
        Ok(None)
    }
}

impl<P: PositionProvider + ?Sized> DayWindowPolicy for TwilightPolicy<'_, P> {
    fn bounds(&self, day: NaiveDate) -> Result<Option<(Instant, Instant)>, SkyError> {
        let noon = NaiveTime::from_hms_opt(12, 0, 0)
            .ok_or_else(|| SkyError::Domain("invalid noon".to_string()))?;
        let tomorrow = next_day(day)?;
        let from = local_to_utc(&self.tz, day.and_time(noon))?;
        let to = local_to_utc(&self.tz, tomorrow.and_time(noon))?;

        let Some(sunset) = self.first_crossing(from, to, Direction::Falling)? else {
            debug!("{}: no sunset on {day}", self.sun);
            return Ok(None);
        };

        let end = match self.night_end {
            NightEnd::LocalTime(t) => {
                let same_day = local_to_utc(&self.tz, day.and_time(t))?;
                if same_day > sunset {
                    same_day
                } else {
                    local_to_utc(&self.tz, tomorrow.and_time(t))?
                }
            }
            NightEnd::Sunrise => {
                let limit = sunset
                    .checked_add_signed(TimeDelta::days(1))
                    .ok_or_else(|| SkyError::Domain(format!("no day after {day}")))?;
                self.first_crossing(sunset, limit, Direction::Rising)?
                    .unwrap_or(to)
            }
        };

        Ok(Some((sunset, end)))
    }
}

// ── Annual event table ──────────────────────────────────────────────────────

/// Rise and set of a body on the first day of one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthEvents {
    pub month: u32,
    pub day: NaiveDate,
    pub rise: Option<CrossingEvent>,
    pub set: Option<CrossingEvent>,
    /// Provider failure for this month, if any.
    pub error: Option<String>,
}

/// First rise and first set of `body` during the local calendar day of the
/// 1st of each month of `year`. Provider failures are recorded per month.
///
/// # Errors
///
/// [`SkyError::Config`] for a bad threshold, timezone or config;
/// [`SkyError::Domain`] for an unrepresentable year or non-positive step.
#[allow(clippy::too_many_arguments)]
pub fn first_of_month_events<P: PositionProvider + ?Sized>(
    sampler: AltitudeSampler<'_, P>,
    body: &Body,
    year: i32,
    timezone: &str,
    threshold: f64,
    step: TimeDelta,
    config: &SearchConfig,
) -> Result<Vec<MonthEvents>, SkyError> {
    validate_threshold(threshold)?;
    let tz = parse_timezone(timezone)?;
    let finder = CrossingFinder::new(config)?;
    let scanner = IntervalScanner::new(sampler, config);

    let mut table = Vec::with_capacity(12);
    for month in 1..=12 {
        let day = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| SkyError::Domain(format!("invalid date {year}-{month:02}-01")))?;
        let start = local_to_utc(&tz, day.and_time(NaiveTime::MIN))?;
        let end = local_to_utc(&tz, next_day(day)?.and_time(NaiveTime::MIN))?;

        let samples = scanner.scan(body, start, end, step)?;
        let mut entry = MonthEvents {
            month: day.month(),
            day,
            rise: None,
            set: None,
            error: None,
        };

        for event in finder.crossings(samples, threshold)? {
            match event {
                Ok(e) if e.direction == Direction::Rising && entry.rise.is_none() => {
                    entry.rise = Some(e)
                }
                Ok(e) if e.direction == Direction::Falling && entry.set.is_none() => {
                    entry.set = Some(e)
                }
                Ok(_) => {}
                Err(e) if e.is_provider() => {
                    warn!("{body} on {day}: {e}");
                    entry.error = Some(e.to_string());
                }
                Err(e) => return Err(e),
            }
            if entry.rise.is_some() && entry.set.is_some() {
                break;
            }
        }

        table.push(entry);
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{from_fn, HorizontalPosition};
    use chrono::Timelike;
    use std::cell::Cell;
    use std::f64::consts::PI;

    fn day0() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn hms(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn utc_on(day: NaiveDate, h: u32, m: u32) -> Instant {
        Utc.from_utc_datetime(&day.and_time(hms(h, m)))
    }

    fn day_index(t: Instant) -> i64 {
        (t.date_naive() - day0()).num_days()
    }

    /// 18:00–23:00 UTC every day.
    fn evening_policy() -> impl DayWindowPolicy {
        policy_from_fn(|day| Ok(Some((utc_on(day, 18, 0), utc_on(day, 23, 0)))))
    }

    /// Sun culminating at 12:00 UTC, 40° peak.
    fn seconds_of_day(t: Instant) -> f64 {
        f64::from(t.num_seconds_from_midnight()) + f64::from(t.nanosecond()) / 1e9
    }

    fn sun_altitude(t: Instant) -> f64 {
        40.0 * (2.0 * PI * (seconds_of_day(t) - 43200.0) / 86400.0).cos()
    }

    // ── scan_days ───────────────────────────────────────────────────────

    #[test]
    fn test_quota_stops_scan_early() {
        let calls = Cell::new(0u32);
        let provider = from_fn(|_, _| {
            calls.set(calls.get() + 1);
            Ok(HorizontalPosition::new(35.0, 180.0))
        });
        let scanner = MultiDayScanner::new(AltitudeSampler::new(&provider), &SearchConfig::default()).unwrap();
        let scan = scanner
            .scan_days(&Body::new("Mars"), &evening_policy(), day0(), 120, 5, 10.0, TimeDelta::minutes(15))
            .unwrap();

        assert_eq!(scan.status, ScanStatus::Found);
        assert_eq!(scan.days_scanned, 5);
        let days: Vec<i64> = scan.matches.iter().map(|m| (m.day - day0()).num_days()).collect();
        assert_eq!(days, vec![0, 1, 2, 3, 4]);
        // 5 evenings × 21 samples each, nothing more
        assert_eq!(calls.get(), 5 * 21);
    }

    #[test]
    fn test_periodic_visibility_picks_correct_days() {
        let provider = from_fn(|_, t| {
            let alt = if day_index(t) % 3 == 0 { 30.0 } else { -30.0 };
            Ok(HorizontalPosition::new(alt, 90.0))
        });
        let scanner = MultiDayScanner::new(AltitudeSampler::new(&provider), &SearchConfig::default()).unwrap();
        let scan = scanner
            .scan_days(&Body::new("Jupiter"), &evening_policy(), day0(), 120, 5, 10.0, TimeDelta::minutes(30))
            .unwrap();

        let days: Vec<i64> = scan.matches.iter().map(|m| (m.day - day0()).num_days()).collect();
        assert_eq!(days, vec![0, 3, 6, 9, 12]);
        assert_eq!(scan.days_scanned, 13);
        assert_eq!(scan.status, ScanStatus::Found);
    }

    #[test]
    fn test_horizon_exhausted_is_not_found_with_partial_matches() {
        let provider = from_fn(|_, t| {
            let alt = if day_index(t) == 2 { 30.0 } else { -30.0 };
            Ok(HorizontalPosition::new(alt, 90.0))
        });
        let scanner = MultiDayScanner::new(AltitudeSampler::new(&provider), &SearchConfig::default()).unwrap();
        let scan = scanner
            .scan_days(&Body::new("Venus"), &evening_policy(), day0(), 10, 5, 10.0, TimeDelta::minutes(30))
            .unwrap();

        assert_eq!(scan.status, ScanStatus::NotFound);
        assert_eq!(scan.matches.len(), 1);
        assert_eq!(scan.days_scanned, 10);
    }

    #[test]
    fn test_provider_failure_recorded_and_scan_continues() {
        let provider = from_fn(|_, t| {
            if day_index(t) == 1 {
                Err(SkyError::Provider("ephemeris gap".to_string()))
            } else {
                Ok(HorizontalPosition::new(30.0, 90.0))
            }
        });
        let scanner = MultiDayScanner::new(AltitudeSampler::new(&provider), &SearchConfig::default()).unwrap();
        let scan = scanner
            .scan_days(&Body::new("Saturn"), &evening_policy(), day0(), 30, 3, 10.0, TimeDelta::minutes(30))
            .unwrap();

        assert_eq!(scan.failures.len(), 1);
        assert_eq!(scan.failures[0].day, day0() + Days::new(1));
        let days: Vec<i64> = scan.matches.iter().map(|m| (m.day - day0()).num_days()).collect();
        assert_eq!(days, vec![0, 2, 3]);
    }

    #[test]
    fn test_all_days_failing_is_provider_error_status() {
        let provider = from_fn(|_, _| Err(SkyError::Provider("no kernel".to_string())));
        let scanner = MultiDayScanner::new(AltitudeSampler::new(&provider), &SearchConfig::default()).unwrap();
        let scan = scanner
            .scan_days(&Body::new("Mars"), &evening_policy(), day0(), 3, 1, 10.0, TimeDelta::minutes(30))
            .unwrap();
        assert_eq!(scan.status, ScanStatus::ProviderError);
        assert_eq!(scan.failures.len(), 3);
    }

    #[test]
    fn test_days_without_subdomain_are_skipped() {
        let provider = from_fn(|_, _| Ok(HorizontalPosition::new(30.0, 90.0)));
        let policy = policy_from_fn(|day: NaiveDate| {
            if day.day() % 2 == 0 {
                Ok(None)
            } else {
                Ok(Some((utc_on(day, 20, 0), utc_on(day, 22, 0))))
            }
        });
        let scanner = MultiDayScanner::new(AltitudeSampler::new(&provider), &SearchConfig::default()).unwrap();
        let scan = scanner
            .scan_days(&Body::new("Mars"), &policy, day0(), 10, 3, 10.0, TimeDelta::minutes(30))
            .unwrap();
        let days: Vec<u32> = scan.matches.iter().map(|m| m.day.day()).collect();
        assert_eq!(days, vec![1, 3, 5]);
    }

    #[test]
    fn test_scan_days_is_deterministic() {
        let provider = from_fn(|_, t| {
            let s = t.timestamp() as f64;
            Ok(HorizontalPosition::new(50.0 * (s / 20000.0).sin(), (s / 100.0) % 360.0))
        });
        let scanner = MultiDayScanner::new(AltitudeSampler::new(&provider), &SearchConfig::default()).unwrap();
        let run = || {
            scanner
                .scan_days(&Body::new("M13"), &evening_policy(), day0(), 30, 4, 10.0, TimeDelta::minutes(15))
                .unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_scan_days_rejects_bad_bounds() {
        let provider = from_fn(|_, _| Ok(HorizontalPosition::new(30.0, 90.0)));
        let scanner = MultiDayScanner::new(AltitudeSampler::new(&provider), &SearchConfig::default()).unwrap();
        let body = Body::new("Mars");
        let step = TimeDelta::minutes(15);
        let policy = evening_policy();

        assert!(matches!(
            scanner.scan_days(&body, &policy, day0(), 0, 5, 10.0, step),
            Err(SkyError::Config(_))
        ));
        assert!(matches!(
            scanner.scan_days(&body, &policy, day0(), 121, 5, 10.0, step),
            Err(SkyError::Config(_))
        ));
        assert!(matches!(
            scanner.scan_days(&body, &policy, day0(), 10, 0, 10.0, step),
            Err(SkyError::Config(_))
        ));
        assert!(matches!(
            scanner.scan_days(&body, &policy, day0(), 10, 5, 95.0, step),
            Err(SkyError::Config(_))
        ));
        assert!(matches!(
            scanner.scan_days(&body, &policy, day0(), 10, 5, 10.0, TimeDelta::zero()),
            Err(SkyError::Domain(_))
        ));
    }

    // ── LocalHoursPolicy ────────────────────────────────────────────────

    #[test]
    fn test_local_hours_policy_converts_to_utc() {
        let policy = LocalHoursPolicy::new("America/New_York", hms(18, 0), hms(23, 59)).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let (start, end) = policy.bounds(day).unwrap().unwrap();
        // January is EST (UTC-5)
        assert_eq!(start, utc_on(day, 23, 0));
        assert_eq!(end, utc_on(day.succ_opt().unwrap(), 4, 59));
    }

    #[test]
    fn test_local_hours_policy_rolls_end_to_next_day() {
        let policy = LocalHoursPolicy::new("UTC", hms(20, 0), hms(2, 0)).unwrap();
        let (start, end) = policy.bounds(day0()).unwrap().unwrap();
        assert_eq!(start, utc_on(day0(), 20, 0));
        assert_eq!(end, utc_on(day0().succ_opt().unwrap(), 2, 0));
    }

    #[test]
    fn test_local_hours_window_sees_set_after_last_grid_sample() {
        // Above until 23:50 UTC; 18:00 to 23:59 on a 15-minute grid.
        let provider = from_fn(|_, t: Instant| {
            let alt = if t.num_seconds_from_midnight() < 23 * 3600 + 50 * 60 { 30.0 } else { -30.0 };
            Ok(HorizontalPosition::new(alt, 90.0))
        });
        let policy = LocalHoursPolicy::new("UTC", hms(18, 0), hms(23, 59)).unwrap();
        let scanner = MultiDayScanner::new(AltitudeSampler::new(&provider), &SearchConfig::default()).unwrap();
        let scan = scanner
            .scan_days(&Body::new("Saturn"), &policy, day0(), 1, 1, 10.0, TimeDelta::minutes(15))
            .unwrap();

        assert_eq!(scan.status, ScanStatus::Found);
        let window = &scan.matches[0].window;
        assert!(!window.closes_at_boundary);
        assert!((window.end - utc_on(day0(), 23, 50)).num_seconds().abs() <= 30);
    }

    #[test]
    fn test_local_hours_policy_invalid_timezone() {
        let result = LocalHoursPolicy::new("Mars/Olympus_Mons", hms(20, 0), hms(23, 0));
        assert!(matches!(result, Err(SkyError::Config(_))));
    }

    #[test]
    fn test_local_to_utc_skips_dst_gap() {
        let tz = parse_timezone("America/New_York").unwrap();
        // 2026-03-08 02:30 does not exist; resolves to 03:30 EDT = 07:30 UTC
        let day = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();
        let t = local_to_utc(&tz, day.and_time(hms(2, 30))).unwrap();
        assert_eq!(t, utc_on(day, 7, 30));
    }

    // ── TwilightPolicy ──────────────────────────────────────────────────

    fn expected_sunset_seconds() -> f64 {
        // 40 cos(θ) = -0.833
        let theta = (SUNSET_ALTITUDE_DEG / 40.0).acos();
        43200.0 + theta / (2.0 * PI) * 86400.0
    }

    #[test]
    fn test_twilight_policy_sunset_to_sunrise() {
        let provider = from_fn(|_, t| Ok(HorizontalPosition::new(sun_altitude(t), 0.0)));
        let policy = TwilightPolicy::new(
            AltitudeSampler::new(&provider),
            Body::new("Sun"),
            "UTC",
            NightEnd::Sunrise,
            &SearchConfig::default(),
        )
        .unwrap();

        let (sunset, sunrise) = policy.bounds(day0()).unwrap().unwrap();
        let midnight = utc_on(day0(), 0, 0);
        let sunset_s = (sunset - midnight).num_milliseconds() as f64 / 1000.0;
        let sunrise_s = (sunrise - midnight).num_milliseconds() as f64 / 1000.0;

        assert!((sunset_s - expected_sunset_seconds()).abs() <= 30.0);
        let expected_sunrise = 86400.0 + (86400.0 - expected_sunset_seconds());
        assert!((sunrise_s - expected_sunrise).abs() <= 30.0);
    }

    #[test]
    fn test_twilight_policy_sunset_to_local_time() {
        let provider = from_fn(|_, t| Ok(HorizontalPosition::new(sun_altitude(t), 0.0)));
        let policy = TwilightPolicy::new(
            AltitudeSampler::new(&provider),
            Body::new("Sun"),
            "UTC",
            NightEnd::LocalTime(hms(23, 59)),
            &SearchConfig::default(),
        )
        .unwrap();

        let (_, end) = policy.bounds(day0()).unwrap().unwrap();
        assert_eq!(end, utc_on(day0(), 23, 59));
    }

    #[test]
    fn test_twilight_policy_no_sunset() {
        let provider = from_fn(|_, _| Ok(HorizontalPosition::new(25.0, 0.0)));
        let policy = TwilightPolicy::new(
            AltitudeSampler::new(&provider),
            Body::new("Sun"),
            "UTC",
            NightEnd::Sunrise,
            &SearchConfig::default(),
        )
        .unwrap();
        assert_eq!(policy.bounds(day0()).unwrap(), None);
    }

    #[test]
    fn test_twilight_policy_astronomical_horizon() {
        let provider = from_fn(|_, t| Ok(HorizontalPosition::new(sun_altitude(t), 0.0)));
        let policy = TwilightPolicy::new(
            AltitudeSampler::new(&provider),
            Body::new("Sun"),
            "UTC",
            NightEnd::Sunrise,
            &SearchConfig::default(),
        )
        .unwrap()
        .with_horizon(-18.0)
        .unwrap();
        let (dusk, _) = policy.bounds(day0()).unwrap().unwrap();
        let theta = (-18.0f64 / 40.0).acos();
        let expected = 43200.0 + theta / (2.0 * PI) * 86400.0;
        let got = (dusk - utc_on(day0(), 0, 0)).num_milliseconds() as f64 / 1000.0;
        assert!((got - expected).abs() <= 30.0);
    }

    #[test]
    fn test_twilight_policy_drives_multi_day_scan() {
        // Sun and a target that culminates at 22:00 UTC, 30° peak.
        let provider = from_fn(|body, t| {
            let alt = if body.as_str() == "Sun" {
                sun_altitude(t)
            } else {
                30.0 * (2.0 * PI * (seconds_of_day(t) - 79200.0) / 86400.0).cos()
            };
            Ok(HorizontalPosition::new(alt, 0.0))
        });
        let sampler = AltitudeSampler::new(&provider);
        let config = SearchConfig::default();
        let policy = TwilightPolicy::new(sampler, Body::new("Sun"), "UTC", NightEnd::Sunrise, &config).unwrap();
        let scanner = MultiDayScanner::new(sampler, &config).unwrap();
        let scan = scanner
            .scan_days(&Body::new("M31"), &policy, day0(), 7, 2, 10.0, TimeDelta::minutes(15))
            .unwrap();

        assert_eq!(scan.matches.len(), 2);
        let best = &scan.matches[0].window;
        assert!((best.best_altitude - 30.0).abs() < 1e-3);
        let culmination = utc_on(scan.matches[0].day, 22, 0);
        assert!((best.best_time - culmination).num_seconds().abs() < 120);
    }

    // ── first_of_month_events ───────────────────────────────────────────

    #[test]
    fn test_first_of_month_events() {
        let provider = from_fn(|_, t| Ok(HorizontalPosition::new(sun_altitude(t), 0.0)));
        let table = first_of_month_events(
            AltitudeSampler::new(&provider),
            &Body::new("Sun"),
            2026,
            "UTC",
            SUNSET_ALTITUDE_DEG,
            TimeDelta::minutes(10),
            &SearchConfig::default(),
        )
        .unwrap();

        assert_eq!(table.len(), 12);
        for (i, entry) in table.iter().enumerate() {
            assert_eq!(entry.month, i as u32 + 1);
            assert_eq!(entry.day.day(), 1);
            let rise = entry.rise.as_ref().unwrap();
            let set = entry.set.as_ref().unwrap();
            assert!(rise.time < set.time);
            assert_eq!(rise.time.hour(), 5);
            assert_eq!(set.time.hour(), 18);
            assert!(entry.error.is_none());
        }
    }

    #[test]
    fn test_first_of_month_events_records_provider_failure() {
        let provider = from_fn(|_, t| {
            if t.month() == 6 {
                Err(SkyError::Provider("June unavailable".to_string()))
            } else {
                Ok(HorizontalPosition::new(sun_altitude(t), 0.0))
            }
        });
        let table = first_of_month_events(
            AltitudeSampler::new(&provider),
            &Body::new("Sun"),
            2026,
            "UTC",
            SUNSET_ALTITUDE_DEG,
            TimeDelta::minutes(10),
            &SearchConfig::default(),
        )
        .unwrap();

        assert_eq!(table.len(), 12);
        assert!(table[5].error.is_some());
        assert!(table[5].rise.is_none());
        assert!(table[6].rise.is_some());
    }
}
