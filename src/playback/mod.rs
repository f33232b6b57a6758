//! # Playback Module
//!
//! Turn chart series into tones and play them in time with point highlighting.
//!
//! ## Purpose
//! Playback has two halves:
//! 1. **Mapping** - each point's value becomes a frequency, its position in
//!    the series becomes a pan and a time offset
//! 2. **Scheduling** - the resulting events are programmed onto an audio
//!    voice and the matching points are highlighted as the engine clock
//!    reaches them
//!
//! ## Sub-modules
//! - `types` - PlaybackEvent, Schedule, PlaybackState, SonificationEvent
//! - `mapper` - Value-to-tone mapping and decimation
//! - `scheduler` - Playback of one series on one voice
//! - `chain` - Sequential playback of every series of a chart
//!
//! ## Entry Points
//! - [`plan_series()`] - Compute the schedule for a series
//! - [`sonify_series()`] - Start playing one series
//! - [`Sonifier::sonify_chart()`] - Start playing a whole chart
//!
//! ## Timing
//!
//! A series gets `min(maxDuration / N, maxPointDuration)` per point. If that
//! drops below `minPointDuration` the series is decimated: points play at
//! `minPointDuration` and only every `pointSkip`-th point is kept, which
//! bounds both the number of events and the total playback time.
//!
//! Events are spaced by their position in playback order, so a decimated
//! series still plays without gaps.
//!
//! After the last point the gain fades out (0.1 s time constant) and the
//! oscillator stops one second later; that is when the series completes.
//!
//! ## Clock
//!
//! Audio automation and highlights share one clock, the engine's. Nothing
//! uses timers: the driver renders (or waits) until
//! [`Sonifier::next_deadline()`] and then polls.
//!
//! ## Example
//! ```rust
//! use sonify::playback::plan_series;
//! use sonify::{Series, SonificationOptions};
//!
//! let series = Series::new((0..1000).map(|i| i as f64));
//! let schedule = plan_series(&series, 0, &SonificationOptions::default());
//!
//! assert_eq!(schedule.point_skip, 6);
//! assert_eq!(schedule.events.len(), 167);
//! assert_eq!(schedule.time_per_point, 30.0);
//! ```

mod types;
mod mapper;
mod scheduler;
mod chain;

#[cfg(test)]
mod tests;

pub use types::{
    PlaybackEvent, PlaybackState, PointRef, Schedule, SonificationEvent, TimelineEntry,
};
pub use mapper::{
    frequency_for_value, pan_for_index, plan_series, point_timing, value_range, PointTiming,
};
pub use scheduler::{sonify_series, SeriesPlayback, FADE_TIME_CONSTANT, STOP_MARGIN};
pub use chain::Sonifier;
