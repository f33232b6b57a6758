pub mod audio;
pub mod chart;
pub mod error;
pub mod menu;
pub mod options;
pub mod playback;

pub use chart::{Axis, Chart, ChartHost, Series, SeriesSource, Tooltip, ValueRange};
pub use error::*;
pub use menu::{sonify_menu_item, MenuAction, MenuItem};
pub use options::{resolve_options, SonificationOptions, SonificationOverrides, WaveType};
pub use playback::{
    PlaybackEvent, PlaybackState, PointRef, Schedule, SonificationEvent, Sonifier, TimelineEntry,
};

use audio::{AudioEngine, OfflineEngine};

/// Compute the schedule of every series of a chart, with the options each
/// series would play with.
pub fn plan_chart<H: ChartHost + ?Sized>(chart: &H) -> Result<Vec<Schedule>, SonifyError> {
    chart
        .series()
        .iter()
        .enumerate()
        .map(|(index, series)| {
            let options = resolve_options(chart.sonification(), series.sonification())?;
            Ok(playback::plan_series(series, index, &options))
        })
        .collect()
}

/// Play a whole chart on an offline engine, start to finish.
/// This is the main entry point for rendering a sonification.
///
/// Returns every playback event stamped with the engine time it happened at.
/// The rendered audio stays in the engine.
pub fn render_chart<H: ChartHost + ?Sized>(
    chart: &mut H,
    engine: &mut OfflineEngine,
) -> Result<Vec<TimelineEntry>, SonifyError> {
    let mut sonifier = Sonifier::new();
    sonifier.sonify_chart(engine, &*chart)?;

    let mut timeline = Vec::new();
    let frame = 1.0 / engine.sample_rate() as f64;
    while sonifier.is_active() {
        let now = engine.current_time();
        timeline.extend(
            sonifier
                .poll(engine, chart)?
                .into_iter()
                .map(|event| TimelineEntry { time: now, event }),
        );
        if let Some(deadline) = sonifier.next_deadline() {
            engine.render_until(deadline.max(engine.current_time() + frame));
        }
    }
    Ok(timeline)
}
