//! Trailing time-windowed averages over irregularly spaced samples.
//!
//! The window is measured in elapsed time, not in record count. A sample
//! stays in the window of `current` while `current - sample < window`, so
//! the window covers `(current - window, current]`.
//!
//! Until the first eviction the window is really "everything seen so far".
//! Those warm-up points are dropped from the output except the most recent
//! one, which joins the warm-up to the steady-state curve.

use std::collections::VecDeque;

use log::debug;
use time::Duration;

use crate::record::{ratio, Sample, Timestamp};
use crate::series::{Series, Timestamped};

/// One output point of the rolling average.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingPoint {
    pub timestamp: Timestamp,
    /// `sum(numerator) / sum(denominator)` over the window, 0 when the
    /// window has no denominator mass.
    pub average: f64,
}

impl Timestamped for RollingPoint {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

/// Result of pushing one sample into a [`RollingWindow`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushOutcome {
    /// Samples evicted from the front by this push.
    pub evicted: usize,
    /// True only for the push that caused the very first eviction.
    pub first_eviction: bool,
}

/// FIFO of in-window samples plus running sums.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    window: Duration,
    samples: VecDeque<Sample>,
    sum_numerator: i128,
    sum_denominator: i128,
    sliding: bool,
}

impl RollingWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            samples: VecDeque::new(),
            sum_numerator: 0,
            sum_denominator: 0,
            sliding: false,
        }
    }

    /// Append `sample` and evict everything at least one window older.
    /// Samples must arrive in non-decreasing timestamp order.
    pub fn push(&mut self, sample: Sample) -> PushOutcome {
        self.sum_numerator += i128::from(sample.numerator);
        self.sum_denominator += i128::from(sample.denominator);
        self.samples.push_back(sample);

        let mut evicted = 0;
        while let Some(front) = self.samples.front() {
            if sample.timestamp - front.timestamp < self.window {
                break;
            }
            self.sum_numerator -= i128::from(front.numerator);
            self.sum_denominator -= i128::from(front.denominator);
            self.samples.pop_front();
            evicted += 1;
        }

        let first_eviction = evicted > 0 && !self.sliding;
        if first_eviction {
            self.sliding = true;
        }
        PushOutcome {
            evicted,
            first_eviction,
        }
    }

    pub fn average(&self) -> f64 {
        ratio(self.sum_numerator as f64, self.sum_denominator as f64)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Whether the window has filled and started evicting.
    pub fn is_sliding(&self) -> bool {
        self.sliding
    }
}

/// Computes trailing averages with a fixed time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingAggregator {
    window: Duration,
}

impl RollingAggregator {
    /// Returns `None` for a zero or negative window: aggregation is
    /// disabled and the raw series is used on its own.
    pub fn new(window: Duration) -> Option<Self> {
        if window <= Duration::ZERO {
            return None;
        }
        Some(Self { window })
    }

    pub fn from_days(days: u32) -> Option<Self> {
        Self::new(Duration::days(i64::from(days)))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Single pass over `series`, one point per sample minus the trimmed
    /// warm-up prefix.
    pub fn aggregate(&self, series: &Series<Sample>) -> Vec<RollingPoint> {
        let initial = (
            RollingWindow::new(self.window),
            Vec::with_capacity(series.len()),
        );
        let (state, points) = series.iter().fold(initial, |(mut state, mut points), sample| {
            if state.push(*sample).first_eviction {
                let last_warmup = points.pop();
                points.clear();
                points.extend(last_warmup);
            }
            points.push(RollingPoint {
                timestamp: sample.timestamp,
                average: state.average(),
            });
            (state, points)
        });

        debug!(
            "rolling window {}: {} samples -> {} points (sliding: {})",
            self.window,
            series.len(),
            points.len(),
            state.is_sliding()
        );
        points
    }
}

/// Rolling average over `window_days` days, or `None` when disabled.
pub fn rolling_average(series: &Series<Sample>, window_days: u32) -> Option<Vec<RollingPoint>> {
    RollingAggregator::from_days(window_days).map(|aggregator| aggregator.aggregate(series))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn day(n: i64) -> Timestamp {
        datetime!(2024-01-01 0:00) + Duration::days(n)
    }

    fn series(rows: &[(i64, i64, i64)]) -> Series<Sample> {
        rows.iter()
            .map(|&(d, num, den)| Sample::new(day(d), num, den))
            .collect()
    }

    fn averages(points: &[RollingPoint]) -> Vec<f64> {
        points.iter().map(|p| p.average).collect()
    }

    #[test]
    fn zero_window_disables_aggregation() {
        let input = series(&[(0, 1, 1)]);
        assert!(rolling_average(&input, 0).is_none());
        assert!(RollingAggregator::new(Duration::days(-1)).is_none());
    }

    #[test]
    fn uniform_samples_reach_exact_steady_state() {
        let rows: Vec<(i64, i64, i64)> = (0..10).map(|d| (d, 1, 1)).collect();
        let points = rolling_average(&series(&rows), 3).unwrap();

        // First eviction happens on day 3; day 2 is the retained warm-up point.
        assert_eq!(points.len(), 8);
        assert_eq!(points[0].timestamp, day(2));
        assert!(points.iter().all(|p| p.average == 1.0));
    }

    #[test]
    fn sample_exactly_one_window_old_is_evicted() {
        let points = rolling_average(&series(&[(0, 10, 1), (5, 2, 1)]), 5).unwrap();
        assert_eq!(
            points,
            vec![
                RollingPoint {
                    timestamp: day(0),
                    average: 10.0
                },
                RollingPoint {
                    timestamp: day(5),
                    average: 2.0
                },
            ]
        );
    }

    #[test]
    fn sample_inside_window_is_retained() {
        let points = rolling_average(&series(&[(0, 10, 1), (4, 2, 1)]), 5).unwrap();
        assert_eq!(averages(&points), vec![10.0, 6.0]);
    }

    #[test]
    fn warmup_is_truncated_to_last_point() {
        let rows = [(0, 1, 1), (1, 2, 1), (2, 3, 1), (3, 4, 1), (10, 5, 1), (11, 6, 1)];
        let points = rolling_average(&series(&rows), 7).unwrap();

        let timestamps: Vec<Timestamp> = points.iter().map(|p| p.timestamp).collect();
        assert_eq!(timestamps, vec![day(3), day(10), day(11)]);
        assert_eq!(averages(&points), vec![2.5, 5.0, 5.5]);
    }

    #[test]
    fn no_eviction_keeps_every_point() {
        let points = rolling_average(&series(&[(0, 2, 1), (1, 4, 1), (2, 6, 1)]), 30).unwrap();
        assert_eq!(averages(&points), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn empty_denominator_window_averages_zero() {
        let points = rolling_average(&series(&[(0, 5, 0), (1, 7, 0), (10, 3, 0)]), 2).unwrap();
        assert_eq!(averages(&points), vec![0.0, 0.0]);
        assert!(points.iter().all(|p| p.average.is_finite()));
    }

    #[test]
    fn empty_series_yields_no_points() {
        let points = rolling_average(&Series::default(), 30).unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn depth_example() {
        let input = series(&[(0, 10, 2), (1, 20, 4), (9, 5, 1)]);
        let points = rolling_average(&input, 5).unwrap();
        assert_eq!(
            points,
            vec![
                RollingPoint {
                    timestamp: day(1),
                    average: 5.0
                },
                RollingPoint {
                    timestamp: day(9),
                    average: 5.0
                },
            ]
        );
    }

    #[test]
    fn duplicate_timestamps_share_a_window() {
        let points = rolling_average(&series(&[(0, 1, 1), (0, 3, 1), (2, 5, 1)]), 2).unwrap();
        // Day 2 evicts both day-0 samples at once.
        assert_eq!(averages(&points), vec![2.0, 5.0]);
    }

    #[test]
    fn window_reports_first_eviction_once() {
        let mut window = RollingWindow::new(Duration::days(1));
        assert_eq!(window.push(Sample::new(day(0), 1, 1)), PushOutcome::default());
        let outcome = window.push(Sample::new(day(1), 1, 1));
        assert_eq!(
            outcome,
            PushOutcome {
                evicted: 1,
                first_eviction: true
            }
        );
        let outcome = window.push(Sample::new(day(2), 1, 1));
        assert!(!outcome.first_eviction);
        assert_eq!(window.len(), 1);
        assert!(window.is_sliding());
    }
}
