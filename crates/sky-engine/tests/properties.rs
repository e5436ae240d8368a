//! Property tests over synthetic sinusoidal altitude signals.

use std::f64::consts::PI;

use chrono::{TimeDelta, TimeZone, Utc};
use proptest::prelude::*;
use sky_engine::{
    from_fn, AltitudeSampler, Body, CrossingFinder, Direction, HorizontalPosition, Instant,
    IntervalScanner, SearchConfig, VisibilityWindowFinder,
};

fn t0() -> Instant {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

fn secs(t: Instant) -> f64 {
    (t - t0()).num_nanoseconds().unwrap() as f64 / 1e9
}

/// Analytic solutions of `a·sin(2πt/p) + b = threshold` in `[0, span]`.
fn analytic_crossings(a: f64, b: f64, p: f64, threshold: f64, span: f64) -> Vec<f64> {
    let s = ((threshold - b) / a).asin();
    let mut roots = Vec::new();
    let mut k = -1.0;
    while k * p <= span + p {
        for base in [s, PI - s] {
            let t = p * (base / (2.0 * PI) + k);
            if (0.0..=span).contains(&t) {
                roots.push(t);
            }
        }
        k += 1.0;
    }
    roots
}

/// Sinusoid parameters with `|threshold − b| < a` and altitudes inside ±90.
fn sinusoid() -> impl Strategy<Value = (f64, f64, f64, f64)> {
    (5.0..50.0f64, -35.0..35.0f64, 6.0..72.0f64, -0.95..0.95f64).prop_map(|(a, b, hours, frac)| {
        (a, b, hours * 3600.0, b + frac * a)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_crossings_within_tolerance((a, b, p, threshold) in sinusoid()) {
        let provider = from_fn(move |_, t| {
            Ok(HorizontalPosition::new(a * (2.0 * PI * secs(t) / p).sin() + b, 0.0))
        });
        let config = SearchConfig::default();
        let span = 3.0 * 86400.0;
        let scanner = IntervalScanner::new(AltitudeSampler::new(&provider), &config);
        let samples = scanner
            .scan(&Body::new("x"), t0(), t0() + TimeDelta::days(3), TimeDelta::minutes(10))
            .unwrap();
        let events = CrossingFinder::new(&config).unwrap().find_crossings(samples, threshold).unwrap();
        let roots = analytic_crossings(a, b, p, threshold, span);

        for event in &events {
            let t = secs(event.time);
            let nearest = roots
                .iter()
                .map(|r| (r - t).abs())
                .fold(f64::INFINITY, f64::min);
            prop_assert!(nearest <= 30.0, "crossing at {t} is {nearest}s from any root");

            let slope = (2.0 * PI * t / p).cos();
            let expected = if slope > 0.0 { Direction::Rising } else { Direction::Falling };
            if slope.abs() > 1e-3 {
                prop_assert_eq!(event.direction, expected);
            }
        }

        for pair in events.windows(2) {
            prop_assert!(pair[0].time < pair[1].time);
            prop_assert_ne!(pair[0].direction, pair[1].direction);
        }

        // Each arc lasts longer than a step, so every root off the domain
        // edges is bracketed and must be reported exactly once.
        for root in roots.iter().filter(|&&r| r > 1.0 && r < span - 1.0) {
            let hits = events.iter().filter(|e| (secs(e.time) - root).abs() <= 30.0).count();
            prop_assert_eq!(hits, 1, "root at {}s matched by {} crossings", root, hits);
        }
    }

    #[test]
    fn prop_windows_ordered_and_disjoint((a, b, p, threshold) in sinusoid()) {
        let provider = from_fn(move |_, t| {
            Ok(HorizontalPosition::new(a * (2.0 * PI * secs(t) / p).sin() + b, 0.0))
        });
        let finder = VisibilityWindowFinder::new(AltitudeSampler::new(&provider), &SearchConfig::default()).unwrap();
        let result = finder
            .find_windows(&Body::new("x"), t0(), t0() + TimeDelta::days(3), TimeDelta::minutes(10), threshold)
            .unwrap();

        for w in &result.windows {
            prop_assert!(w.start <= w.best_time && w.best_time <= w.end);
            prop_assert!(w.best_altitude >= threshold);
            prop_assert!(w.best_altitude <= a + b + 1e-9);
        }
        for pair in result.windows.windows(2) {
            prop_assert!(pair[0].end < pair[1].start);
        }
    }
}
