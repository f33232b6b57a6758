//! Value-to-tone mapping
//!
//! Turns a series into a [`Schedule`]: one event per emitted point carrying
//! its time offset, frequency and pan. This is a pure function of the series
//! and the options, so a schedule can be recomputed at any time.

use tracing::debug;

use crate::chart::{SeriesSource, ValueRange};
use crate::options::SonificationOptions;
use super::types::{PlaybackEvent, PointRef, Schedule};

/// Per-point timing for a series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointTiming {
    /// Milliseconds per emitted point
    pub time_per_point: f64,
    /// Stride through the series
    pub point_skip: usize,
}

/// Work out how long each point plays and whether points must be skipped.
///
/// Each point gets `min(maxDuration / N, maxPointDuration)`. When that is
/// shorter than `minPointDuration` the series does not fit, so points are
/// played at `minPointDuration` and only every `pointSkip`-th point is kept,
/// with `pointSkip = ceil(N / (maxDuration / minPointDuration))`.
///
/// # Example
/// ```rust
/// use sonify::playback::point_timing;
/// use sonify::SonificationOptions;
///
/// let timing = point_timing(1000, &SonificationOptions::default());
/// assert_eq!(timing.time_per_point, 30.0);
/// assert_eq!(timing.point_skip, 6);
/// ```
pub fn point_timing(point_count: usize, options: &SonificationOptions) -> PointTiming {
    if point_count == 0 {
        return PointTiming {
            time_per_point: options.max_point_duration,
            point_skip: 1,
        };
    }

    let n = point_count as f64;
    let time_per_point = (options.max_duration / n).min(options.max_point_duration);
    if time_per_point >= options.min_point_duration {
        return PointTiming {
            time_per_point,
            point_skip: 1,
        };
    }

    // Same as N / (maxDuration / minPointDuration), without the inner rounding
    let point_skip = (n * options.min_point_duration / options.max_duration).ceil() as usize;
    PointTiming {
        time_per_point: options.min_point_duration,
        point_skip: point_skip.max(1),
    }
}

/// Range values are scaled from: the bound axis' data range when there is
/// one, otherwise the series' own data range.
pub fn value_range<S: SeriesSource + ?Sized>(series: &S) -> Option<ValueRange> {
    series.axis_range().or_else(|| series.data_range())
}

/// Map a value linearly from `range` onto `[minFrequency, maxFrequency]`.
///
/// A missing, degenerate or unbounded range maps every value to `minFrequency`.
pub fn frequency_for_value(
    value: f64,
    range: Option<ValueRange>,
    options: &SonificationOptions,
) -> f64 {
    match range {
        Some(range) if !range.is_degenerate() && range.span().is_finite() => {
            let step = (options.max_frequency - options.min_frequency) / range.span();
            options.min_frequency + (value - range.min) * step
        }
        _ => options.min_frequency,
    }
}

/// Pan for the point at `index` of `point_count`, sweeping linearly from
/// `-stereoRange` at the first point to `+stereoRange` at the last.
/// A lone point sits in the centre.
pub fn pan_for_index(index: usize, point_count: usize, stereo_range: f64) -> f64 {
    if point_count <= 1 {
        return 0.0;
    }
    -stereo_range + 2.0 * stereo_range * index as f64 / (point_count - 1) as f64
}

/// Build the schedule for one series.
///
/// # Parameters
/// - `series`: The series to play
/// - `series_index`: Its index on the chart, stored in every [`PointRef`]
/// - `options`: Resolved options for this series
///
/// # Example
/// ```rust
/// use sonify::playback::plan_series;
/// use sonify::{Series, SonificationOptions};
///
/// let options = SonificationOptions {
///     min_frequency: 100.0,
///     max_frequency: 200.0,
///     ..Default::default()
/// };
/// let schedule = plan_series(&Series::new(vec![10.0, 20.0, 30.0]), 0, &options);
///
/// let frequencies: Vec<f64> = schedule.events.iter().filter_map(|e| e.frequency).collect();
/// assert_eq!(frequencies, vec![100.0, 150.0, 200.0]);
/// ```
pub fn plan_series<S: SeriesSource + ?Sized>(
    series: &S,
    series_index: usize,
    options: &SonificationOptions,
) -> Schedule {
    let point_count = series.point_count();
    let timing = point_timing(point_count, options);
    let range = value_range(series);

    let events: Vec<PlaybackEvent> = (0..point_count)
        .step_by(timing.point_skip)
        .enumerate()
        .map(|(ordinal, index)| PlaybackEvent {
            point: PointRef::new(series_index, index),
            offset: ordinal as f64 * timing.time_per_point / 1000.0,
            frequency: series
                .point_value(index)
                .filter(|value| value.is_finite())
                .map(|value| frequency_for_value(value, range, options)),
            pan: options
                .stereo
                .then(|| pan_for_index(index, point_count, options.stereo_range)),
        })
        .collect();

    let duration = events.len() as f64 * timing.time_per_point / 1000.0;
    debug!(
        series = series_index,
        points = point_count,
        events = events.len(),
        point_skip = timing.point_skip,
        time_per_point = timing.time_per_point,
        duration,
        "planned series"
    );

    Schedule {
        series: series_index,
        events,
        time_per_point: timing.time_per_point,
        point_skip: timing.point_skip,
        duration,
        value_range: range,
    }
}
