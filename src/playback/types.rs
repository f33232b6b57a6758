//! Playback type definitions
//!
//! This module defines the types shared by the mapper, the per-series
//! scheduler and the chart-level driver.

use serde::Serialize;

use crate::chart::ValueRange;

/// Reference to one point: series index plus point index within the series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PointRef {
    pub series: usize,
    pub point: usize,
}

impl PointRef {
    pub fn new(series: usize, point: usize) -> Self {
        Self { series, point }
    }
}

/// One scheduled point
///
/// # Fields
/// - `point`: The point to highlight when the event fires
/// - `offset`: Seconds from the start of the series playback
/// - `frequency`: Target frequency in Hz, `None` for null points (frequency is held)
/// - `pan`: Target pan in [-1, 1], `None` when stereo is off
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackEvent {
    pub point: PointRef,
    pub offset: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pan: Option<f64>,
}

/// Everything needed to play one series
///
/// # Fields
/// - `series`: Index of the series on its chart
/// - `events`: Emitted points in playback order
/// - `time_per_point`: Milliseconds between consecutive events
/// - `point_skip`: Stride through the series; 1 unless the series was decimated
/// - `duration`: Seconds from the first event to the end of the last point's slot
/// - `value_range`: Range used to scale values, `None` if the series has no values
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub series: usize,
    pub events: Vec<PlaybackEvent>,
    pub time_per_point: f64,
    pub point_skip: usize,
    pub duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_range: Option<ValueRange>,
}

impl Schedule {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_decimated(&self) -> bool {
        self.point_skip > 1
    }
}

/// Lifecycle of one series playback
///
/// `Idle → Scheduled → Playing → Fading → Stopped`, or `Cancelled` from any
/// started state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Created, nothing sent to the engine yet
    Idle,
    /// Audio programmed, clock not yet at the start time
    Scheduled,
    /// Between the first event and the start of the fade
    Playing,
    /// Gain is decaying, oscillator not yet stopped
    Fading,
    /// Oscillator stopped, voice closed, completion fired
    Stopped,
    /// Torn down early; completion is not fired
    Cancelled,
}

impl PlaybackState {
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            PlaybackState::Scheduled | PlaybackState::Playing | PlaybackState::Fading
        )
    }
}

/// Something observable that happened during playback
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum SonificationEvent {
    SeriesStarted { series: usize },
    PointHighlighted { point: PointRef },
    /// The host could not highlight the point; playback continued
    HighlightSkipped { point: PointRef, reason: String },
    SeriesCompleted { series: usize },
    ChartCompleted,
}

/// A [`SonificationEvent`] stamped with the engine time it was observed at
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub time: f64,
    #[serde(flatten)]
    pub event: SonificationEvent,
}
