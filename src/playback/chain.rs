//! Chart-level chained playback
//!
//! A chart is played one series at a time, in index order, with each
//! series' `seriesDelay` of silence before it starts. The chain is an
//! explicit queue of series tasks consumed by [`Sonifier::poll`]; there are
//! no nested continuation callbacks and at most one series plays at a time.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::audio::AudioEngine;
use crate::chart::{ChartHost, SeriesSource};
use crate::error::SonifyError;
use crate::options::{resolve_options, SonificationOptions};
use super::mapper::plan_series;
use super::scheduler::SeriesPlayback;
use super::types::{PlaybackState, SonificationEvent};

#[derive(Debug, Clone)]
struct SeriesTask {
    series: usize,
    options: SonificationOptions,
}

/// Drives sonification of a whole chart.
///
/// Re-triggering while a chain is playing cancels it and starts over.
///
/// # Example
/// ```rust
/// use sonify::audio::OfflineEngine;
/// use sonify::{Chart, Series, SonificationEvent, Sonifier};
///
/// let mut chart = Chart::new(vec![
///     Series::new(vec![1.0, 2.0]),
///     Series::new(vec![3.0, 1.0]),
/// ]);
/// let mut engine = OfflineEngine::new(8000, 2).unwrap();
/// let mut sonifier = Sonifier::new();
///
/// sonifier.sonify_chart(&mut engine, &chart).unwrap();
/// let mut events = Vec::new();
/// while sonifier.is_active() {
///     events.extend(sonifier.poll(&mut engine, &mut chart).unwrap());
///     if let Some(deadline) = sonifier.next_deadline() {
///         engine.render_until(deadline);
///     }
/// }
/// assert_eq!(events.last(), Some(&SonificationEvent::ChartCompleted));
/// ```
#[derive(Default)]
pub struct Sonifier {
    queue: VecDeque<SeriesTask>,
    current: Option<SeriesPlayback>,
    pending_start: Option<f64>,
    outbox: Vec<SonificationEvent>,
}

impl Sonifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a series is playing or waiting for its delay.
    pub fn is_active(&self) -> bool {
        self.current.is_some() || !self.queue.is_empty()
    }

    /// Index of the series currently playing.
    pub fn current_series(&self) -> Option<usize> {
        self.current.as_ref().map(|p| p.series())
    }

    pub fn current_state(&self) -> Option<PlaybackState> {
        self.current.as_ref().map(|p| p.state())
    }

    /// Play every series of the chart in order.
    ///
    /// Options for each series are resolved up front (defaults, chart block,
    /// series block) so a bad option anywhere fails before anything plays.
    /// The first series starts immediately. A chart without series is a
    /// no-op.
    ///
    /// # Errors
    /// - [`SonifyError::InvalidOptions`] if any series resolves to invalid options
    /// - [`SonifyError::UnsupportedEnvironment`] when the engine cannot play audio
    pub fn sonify_chart<H: ChartHost + ?Sized>(
        &mut self,
        engine: &mut dyn AudioEngine,
        chart: &H,
    ) -> Result<(), SonifyError> {
        let tasks = chart
            .series()
            .iter()
            .enumerate()
            .map(|(series, s)| {
                resolve_options(chart.sonification(), s.sonification())
                    .map(|options| SeriesTask { series, options })
            })
            .collect::<Result<VecDeque<_>, _>>()?;

        self.restart(engine, tasks, chart)
    }

    /// Play a single series with explicit options, outside any chain.
    ///
    /// # Errors
    /// - [`SonifyError::SeriesNotFound`] for an index past the last series
    /// - [`SonifyError::InvalidOptions`] if `options` do not validate
    /// - [`SonifyError::UnsupportedEnvironment`] when the engine cannot play audio
    pub fn sonify_series<H: ChartHost + ?Sized>(
        &mut self,
        engine: &mut dyn AudioEngine,
        chart: &H,
        series: usize,
        options: &SonificationOptions,
    ) -> Result<(), SonifyError> {
        if series >= chart.series().len() {
            return Err(SonifyError::SeriesNotFound(series));
        }
        options.validate()?;
        let tasks = VecDeque::from(vec![SeriesTask {
            series,
            options: options.clone(),
        }]);
        self.restart(engine, tasks, chart)
    }

    fn restart<H: ChartHost + ?Sized>(
        &mut self,
        engine: &mut dyn AudioEngine,
        tasks: VecDeque<SeriesTask>,
        chart: &H,
    ) -> Result<(), SonifyError> {
        if self.is_active() {
            warn!("sonification re-triggered while playing, restarting");
            self.cancel(engine);
        }
        if tasks.is_empty() {
            debug!("chart has no series, nothing to sonify");
            return Ok(());
        }

        info!(series = tasks.len(), "starting sonification");
        self.queue = tasks;
        self.start_next(engine, chart)
    }

    fn start_next<H: ChartHost + ?Sized>(
        &mut self,
        engine: &mut dyn AudioEngine,
        chart: &H,
    ) -> Result<(), SonifyError> {
        let Some(task) = self.queue.pop_front() else {
            return Ok(());
        };
        self.pending_start = None;

        let result = chart
            .series()
            .get(task.series)
            .ok_or(SonifyError::SeriesNotFound(task.series))
            .and_then(|series| {
                let mut playback =
                    SeriesPlayback::new(plan_series(series, task.series, &task.options));
                playback.start(engine, &task.options)?;
                Ok(playback)
            });

        match result {
            Ok(playback) => {
                self.outbox.push(SonificationEvent::SeriesStarted {
                    series: task.series,
                });
                self.current = Some(playback);
                Ok(())
            }
            Err(e) => {
                // A series that cannot start ends the whole chain
                self.queue.clear();
                Err(e)
            }
        }
    }

    /// Catch up with the engine clock and report what happened.
    ///
    /// Highlights due on the current series fire; a finished series hands
    /// over to the next one once its delay has elapsed. `ChartCompleted` is
    /// reported after the last series stops.
    ///
    /// # Errors
    /// Propagates the failure of a series that could not start; the chain
    /// is abandoned in that case. Events observed before the failure are
    /// returned by the following poll.
    pub fn poll<H: ChartHost + ?Sized>(
        &mut self,
        engine: &mut dyn AudioEngine,
        chart: &mut H,
    ) -> Result<Vec<SonificationEvent>, SonifyError> {
        let mut events = std::mem::take(&mut self.outbox);

        loop {
            if let Some(playback) = self.current.as_mut() {
                if playback.poll(engine, chart, &mut events) != PlaybackState::Stopped {
                    break;
                }
                self.current = None;
                match self.queue.front() {
                    Some(next) => {
                        let delay = next.options.series_delay / 1000.0;
                        self.pending_start = Some(engine.current_time() + delay);
                        debug!(next = next.series, delay, "waiting before next series");
                    }
                    None => {
                        info!("sonification completed");
                        events.push(SonificationEvent::ChartCompleted);
                        break;
                    }
                }
            }

            match self.pending_start {
                Some(at) if engine.current_time() >= at => {
                    if let Err(e) = self.start_next(engine, &*chart) {
                        // Hand back what already happened on the next poll
                        self.outbox = events;
                        return Err(e);
                    }
                    events.append(&mut self.outbox);
                }
                _ => break,
            }
        }
        Ok(events)
    }

    /// Next engine time at which `poll` has something to do.
    pub fn next_deadline(&self) -> Option<f64> {
        match &self.current {
            Some(playback) => playback.next_deadline(),
            None => self.pending_start,
        }
    }

    /// Stop whatever is playing and forget the rest of the chain.
    pub fn cancel(&mut self, engine: &mut dyn AudioEngine) {
        if let Some(mut playback) = self.current.take() {
            playback.cancel(engine);
        }
        if !self.queue.is_empty() {
            debug!(remaining = self.queue.len(), "dropping queued series");
        }
        self.queue.clear();
        self.pending_start = None;
        self.outbox.clear();
    }
}
