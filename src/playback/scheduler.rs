//! Per-series playback
//!
//! [`SeriesPlayback`] programs one voice from a [`Schedule`] and then follows
//! the engine clock: every `poll` fires the point highlights that have come
//! due and moves the state machine along. Audio automation and highlights are
//! keyed to the same engine timestamps, so they cannot drift apart.

use tracing::{debug, info, warn};

use crate::audio::{AudioEngine, AutomationCommand, Transition, VoiceConfig, VoiceId};
use crate::chart::ChartHost;
use crate::error::SonifyError;
use crate::options::SonificationOptions;
use super::mapper::plan_series;
use super::types::{PlaybackState, Schedule, SonificationEvent};

/// Time constant of the closing gain fade (seconds)
pub const FADE_TIME_CONSTANT: f64 = 0.1;

/// How long the oscillator keeps running after the fade begins (seconds)
pub const STOP_MARGIN: f64 = 1.0;

// Clock values are frame-quantized; don't miss a cue over rounding
const CLOCK_EPSILON: f64 = 1e-9;

type CompletionCallback = Box<dyn FnOnce(usize)>;

/// Playback of one series on one voice
pub struct SeriesPlayback {
    schedule: Schedule,
    state: PlaybackState,
    voice: Option<VoiceId>,
    origin: f64,
    next_cue: usize,
    on_complete: Option<CompletionCallback>,
}

impl SeriesPlayback {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            schedule,
            state: PlaybackState::Idle,
            voice: None,
            origin: 0.0,
            next_cue: 0,
            on_complete: None,
        }
    }

    /// Run `callback` with the series index once playback reaches `Stopped`.
    pub fn on_complete<F: FnOnce(usize) + 'static>(mut self, callback: F) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn series(&self) -> usize {
        self.schedule.series
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn voice(&self) -> Option<VoiceId> {
        self.voice
    }

    /// Engine time the fade begins.
    pub fn fade_at(&self) -> f64 {
        self.origin + self.schedule.duration
    }

    /// Engine time the oscillator stops and completion fires.
    pub fn stop_at(&self) -> f64 {
        if self.schedule.is_empty() {
            self.origin
        } else {
            self.fade_at() + STOP_MARGIN
        }
    }

    /// Program the engine and move to `Scheduled`.
    ///
    /// Opens one voice, starts it now, queues a frequency (and pan) change
    /// per event, then the fade and the stop. An empty schedule opens no
    /// voice and completes on the next poll. If any command is refused the
    /// voice is closed again before the error is returned.
    ///
    /// # Errors
    /// - [`SonifyError::UnsupportedEnvironment`] when the engine cannot play audio
    /// - [`SonifyError::UnknownVoice`] if the engine lost the voice mid-setup
    pub fn start(
        &mut self,
        engine: &mut dyn AudioEngine,
        options: &SonificationOptions,
    ) -> Result<(), SonifyError> {
        if self.state != PlaybackState::Idle {
            debug!(series = self.series(), state = ?self.state, "playback already started");
            return Ok(());
        }

        self.origin = engine.current_time();
        if !self.schedule.is_empty() {
            let voice = engine.open_voice(VoiceConfig {
                wave_type: options.wave_type,
                volume: options.volume,
                stereo: options.stereo,
            })?;
            if let Err(e) = self.program(engine, voice, options) {
                engine.close_voice(voice);
                return Err(e);
            }
            self.voice = Some(voice);
        }

        self.state = PlaybackState::Scheduled;
        info!(
            series = self.series(),
            events = self.schedule.events.len(),
            duration = self.schedule.duration,
            "series playback scheduled"
        );
        Ok(())
    }

    fn program(
        &self,
        engine: &mut dyn AudioEngine,
        voice: VoiceId,
        options: &SonificationOptions,
    ) -> Result<(), SonifyError> {
        let transition = if options.smooth {
            Transition::Linear
        } else {
            Transition::Step
        };

        engine.schedule(voice, AutomationCommand::Start { at: self.origin })?;
        for event in &self.schedule.events {
            let at = self.origin + event.offset;
            if let Some(hz) = event.frequency {
                engine.schedule(voice, AutomationCommand::SetFrequency { hz, at, transition })?;
            }
            if let Some(pan) = event.pan {
                engine.schedule(voice, AutomationCommand::SetPan { pan, at })?;
            }
        }
        engine.schedule(
            voice,
            AutomationCommand::SetGainTarget {
                target: 0.0,
                at: self.fade_at(),
                time_constant: FADE_TIME_CONSTANT,
            },
        )?;
        engine.schedule(voice, AutomationCommand::Stop { at: self.stop_at() })?;
        Ok(())
    }

    /// Catch up with the engine clock.
    ///
    /// Fires due highlights in schedule order, then advances the state. On
    /// reaching the stop time the voice is closed, `SeriesCompleted` is
    /// reported and the completion callback runs. Highlights the host
    /// refuses are reported as `HighlightSkipped` and otherwise ignored.
    pub fn poll<H: ChartHost + ?Sized>(
        &mut self,
        engine: &mut dyn AudioEngine,
        host: &mut H,
        events: &mut Vec<SonificationEvent>,
    ) -> PlaybackState {
        if !self.state.is_active() {
            return self.state;
        }

        let now = engine.current_time() + CLOCK_EPSILON;
        while let Some(event) = self.schedule.events.get(self.next_cue) {
            if self.origin + event.offset > now {
                break;
            }
            let point = event.point;
            self.next_cue += 1;
            match host.highlight(point) {
                Ok(()) => events.push(SonificationEvent::PointHighlighted { point }),
                Err(reason) => {
                    warn!(series = point.series, point = point.point, %reason, "skipping highlight");
                    events.push(SonificationEvent::HighlightSkipped {
                        point,
                        reason: reason.to_string(),
                    });
                }
            }
        }

        if now >= self.stop_at() {
            self.finish(engine);
            events.push(SonificationEvent::SeriesCompleted {
                series: self.series(),
            });
            if let Some(callback) = self.on_complete.take() {
                callback(self.series());
            }
        } else if now >= self.fade_at() {
            self.state = PlaybackState::Fading;
        } else if now >= self.origin {
            self.state = PlaybackState::Playing;
        }
        self.state
    }

    fn finish(&mut self, engine: &mut dyn AudioEngine) {
        if let Some(voice) = self.voice.take() {
            engine.close_voice(voice);
        }
        self.next_cue = self.schedule.events.len();
        self.state = PlaybackState::Stopped;
        info!(series = self.series(), "series playback completed");
    }

    /// Tear playback down now: stop the oscillator, close the voice and drop
    /// pending highlights. Completion does not fire.
    pub fn cancel(&mut self, engine: &mut dyn AudioEngine) {
        if !self.state.is_active() {
            return;
        }
        if let Some(voice) = self.voice.take() {
            let at = engine.current_time();
            if let Err(e) = engine.schedule(voice, AutomationCommand::Stop { at }) {
                debug!(error = %e, "voice already gone while cancelling");
            }
            engine.close_voice(voice);
        }
        self.next_cue = self.schedule.events.len();
        self.on_complete = None;
        self.state = PlaybackState::Cancelled;
        warn!(series = self.series(), "series playback cancelled");
    }

    /// Next engine time at which `poll` has something to do.
    pub fn next_deadline(&self) -> Option<f64> {
        if !self.state.is_active() {
            return None;
        }
        let boundary = if self.state == PlaybackState::Fading {
            self.stop_at()
        } else if self.state == PlaybackState::Scheduled {
            self.origin
        } else {
            self.fade_at()
        };
        let cue = self
            .schedule
            .events
            .get(self.next_cue)
            .map(|e| self.origin + e.offset);
        Some(match cue {
            Some(cue) => cue.min(boundary),
            None => boundary,
        })
    }
}

/// Sonify one series of a chart with explicit options.
///
/// Plans the series, opens a voice and starts playback immediately. The
/// returned playback must be polled against the same engine to fire
/// highlights and complete.
///
/// # Errors
/// - [`SonifyError::SeriesNotFound`] for an index past the last series
/// - [`SonifyError::InvalidOptions`] if `options` do not validate
/// - [`SonifyError::UnsupportedEnvironment`] when the engine cannot play audio
///
/// # Example
/// ```rust
/// use sonify::audio::OfflineEngine;
/// use sonify::playback::sonify_series;
/// use sonify::{Chart, PlaybackState, Series, SonificationOptions};
///
/// let mut chart = Chart::new(vec![Series::new(vec![1.0, 2.0, 3.0])]);
/// let mut engine = OfflineEngine::new(8000, 2).unwrap();
///
/// let mut playback =
///     sonify_series(&mut engine, &chart, 0, &SonificationOptions::default()).unwrap();
/// assert_eq!(playback.state(), PlaybackState::Scheduled);
///
/// let mut events = Vec::new();
/// while let Some(deadline) = playback.next_deadline() {
///     engine.render_until(deadline);
///     playback.poll(&mut engine, &mut chart, &mut events);
/// }
/// assert_eq!(playback.state(), PlaybackState::Stopped);
/// ```
pub fn sonify_series<H: ChartHost + ?Sized>(
    engine: &mut dyn AudioEngine,
    chart: &H,
    series_index: usize,
    options: &SonificationOptions,
) -> Result<SeriesPlayback, SonifyError> {
    options.validate()?;
    let series = chart
        .series()
        .get(series_index)
        .ok_or(SonifyError::SeriesNotFound(series_index))?;
    let mut playback = SeriesPlayback::new(plan_series(series, series_index, options));
    playback.start(engine, options)?;
    Ok(playback)
}
