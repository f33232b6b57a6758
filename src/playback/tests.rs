use std::cell::Cell;
use std::rc::Rc;

use super::*;
use crate::audio::{AudioEngine, AutomationCommand, OfflineEngine, Transition};
use crate::chart::{Axis, Chart, Series, ValueRange};
use crate::error::SonifyError;
use crate::options::{SonificationOptions, SonificationOverrides};

const RATE: u32 = 1000;

fn engine() -> OfflineEngine {
    OfflineEngine::new(RATE, 2).unwrap()
}

fn drive(sonifier: &mut Sonifier, engine: &mut OfflineEngine, chart: &mut Chart) -> Vec<TimelineEntry> {
    let mut timeline = Vec::new();
    let mut steps = 0;
    while sonifier.is_active() {
        for event in sonifier.poll(engine, chart).unwrap() {
            timeline.push(TimelineEntry {
                time: engine.current_time(),
                event,
            });
        }
        if let Some(deadline) = sonifier.next_deadline() {
            engine.render_until(deadline);
        }
        steps += 1;
        assert!(steps < 100_000, "playback did not terminate");
    }
    timeline
}

fn drive_series(
    playback: &mut SeriesPlayback,
    engine: &mut OfflineEngine,
    chart: &mut Chart,
) -> Vec<TimelineEntry> {
    let mut timeline = Vec::new();
    let mut events = Vec::new();
    while let Some(deadline) = playback.next_deadline() {
        engine.render_until(deadline);
        playback.poll(engine, chart, &mut events);
        let now = engine.current_time();
        timeline.extend(events.drain(..).map(|event| TimelineEntry { time: now, event }));
    }
    timeline
}

fn started_at(timeline: &[TimelineEntry], series: usize) -> f64 {
    timeline
        .iter()
        .find(|e| e.event == SonificationEvent::SeriesStarted { series })
        .map(|e| e.time)
        .unwrap()
}

fn completed_at(timeline: &[TimelineEntry], series: usize) -> f64 {
    timeline
        .iter()
        .find(|e| e.event == SonificationEvent::SeriesCompleted { series })
        .map(|e| e.time)
        .unwrap()
}

// ==================== MAPPING TESTS ====================

#[test]
fn test_frequency_linear_mapping() {
    let options = SonificationOptions {
        min_frequency: 100.0,
        max_frequency: 200.0,
        ..Default::default()
    };
    let schedule = plan_series(&Series::new(vec![10.0, 20.0, 30.0]), 0, &options);

    let frequencies: Vec<f64> = schedule.events.iter().filter_map(|e| e.frequency).collect();
    assert_eq!(frequencies, vec![100.0, 150.0, 200.0]);
    assert_eq!(schedule.value_range.map(|r| (r.min, r.max)), Some((10.0, 30.0)));
}

#[test]
fn test_frequency_monotonic_in_value() {
    let options = SonificationOptions::default();
    let values = vec![5.0, -3.0, 12.5, 0.0, 7.25, 12.5, -8.0];
    let schedule = plan_series(&Series::new(values.clone()), 0, &options);

    for (a, ea) in values.iter().zip(&schedule.events) {
        for (b, eb) in values.iter().zip(&schedule.events) {
            if a < b {
                assert!(ea.frequency.unwrap() <= eb.frequency.unwrap());
            }
        }
    }
    let min = schedule.events.iter().filter_map(|e| e.frequency).fold(f64::MAX, f64::min);
    let max = schedule.events.iter().filter_map(|e| e.frequency).fold(f64::MIN, f64::max);
    assert_eq!(min, options.min_frequency);
    assert!((max - options.max_frequency).abs() < 1e-9);
}

#[test]
fn test_degenerate_range_is_constant_frequency() {
    let options = SonificationOptions::default();
    let schedule = plan_series(&Series::new(vec![4.0, 4.0, 4.0]), 0, &options);
    assert!(schedule
        .events
        .iter()
        .all(|e| e.frequency == Some(options.min_frequency)));
}

#[test]
fn test_axis_range_preferred_over_series_range() {
    let chart = Chart::new(vec![
        Series::new(vec![0.0, 100.0]).with_axis(0),
        Series::new(vec![25.0, 50.0]).with_axis(0),
    ])
    .with_axes(vec![Axis::default()]);
    let options = SonificationOptions {
        min_frequency: 0.0,
        max_frequency: 1000.0,
        ..Default::default()
    };

    let schedule = plan_series(&chart.series[1], 1, &options);
    let frequencies: Vec<f64> = schedule.events.iter().filter_map(|e| e.frequency).collect();
    assert_eq!(frequencies, vec![250.0, 500.0]);
}

#[test]
fn test_axis_starting_at_zero_is_honored() {
    let chart = Chart::new(vec![
        Series::new(vec![0.0, 10.0]).with_axis(0),
        Series::new(vec![5.0, 10.0]).with_axis(0),
    ])
    .with_axes(vec![Axis::default()]);
    let range = value_range(&chart.series[1]).unwrap();
    assert_eq!(range.min, 0.0);
}

#[test]
fn test_null_points_hold_frequency_but_are_scheduled() {
    let series = Series {
        data: vec![Some(1.0), None, Some(3.0)],
        ..Default::default()
    };
    let schedule = plan_series(&series, 2, &SonificationOptions::default());

    assert_eq!(schedule.events.len(), 3);
    assert_eq!(schedule.events[1].frequency, None);
    assert_eq!(schedule.events[1].point, PointRef::new(2, 1));
    assert!(schedule.events[1].pan.is_some());
}

#[test]
fn test_non_finite_values_are_treated_as_null() {
    let options = SonificationOptions::default();
    let schedule = plan_series(&Series::new(vec![1.0, f64::INFINITY, 2.0]), 0, &options);
    let frequencies: Vec<Option<f64>> = schedule.events.iter().map(|e| e.frequency).collect();
    assert_eq!(frequencies, vec![Some(100.0), None, Some(2400.0)]);
    assert_eq!(schedule.value_range, Some(ValueRange::new(1.0, 2.0)));

    let schedule = plan_series(&Series::new(vec![f64::NAN, 5.0]), 0, &options);
    assert_eq!(schedule.events[0].frequency, None);
    assert_eq!(schedule.events[1].frequency, Some(100.0));

    // An unbounded range cannot be scaled
    let unbounded = Some(ValueRange::new(0.0, f64::INFINITY));
    assert_eq!(frequency_for_value(3.0, unbounded, &options), 100.0);
}

#[test]
fn test_all_null_series_maps_to_min_frequency() {
    assert_eq!(frequency_for_value(42.0, None, &SonificationOptions::default()), 100.0);
}

// ==================== TIMING TESTS ====================

#[test]
fn test_decimation_example() {
    let options = SonificationOptions {
        max_duration: 5000.0,
        min_point_duration: 30.0,
        max_point_duration: 300.0,
        ..Default::default()
    };
    let schedule = plan_series(&Series::new((0..1000).map(|i| i as f64)), 0, &options);

    assert_eq!(schedule.time_per_point, 30.0);
    assert_eq!(schedule.point_skip, 6);
    assert!(schedule.is_decimated());
    assert_eq!(schedule.events.len(), 167);
    for (ordinal, event) in schedule.events.iter().enumerate() {
        assert_eq!(event.point.point, ordinal * 6);
        assert!((event.offset - ordinal as f64 * 0.03).abs() < 1e-9);
    }
}

#[test]
fn test_no_decimation_when_points_fit() {
    let options = SonificationOptions::default();
    // 16 * 300 <= 5000
    let schedule = plan_series(&Series::new((0..16).map(|i| i as f64)), 0, &options);
    assert_eq!(schedule.point_skip, 1);
    assert_eq!(schedule.events.len(), 16);
    assert_eq!(schedule.time_per_point, 300.0);
    assert!((schedule.duration - 4.8).abs() < 1e-9);

    // 100 points: 50ms each, still above the minimum
    let timing = point_timing(100, &options);
    assert_eq!(timing, PointTiming { time_per_point: 50.0, point_skip: 1 });
}

#[test]
fn test_event_count_and_span_bounded() {
    let options = SonificationOptions::default();
    let max_events = (options.max_duration / options.min_point_duration).ceil() as usize;

    for n in [1usize, 2, 17, 166, 167, 168, 333, 500, 999, 1000, 1001, 4321, 20_000] {
        let schedule = plan_series(&Series::new((0..n).map(|i| i as f64)), 0, &options);
        let timing = point_timing(n, &options);

        assert!(schedule.events.len() <= max_events, "n = {}", n);
        let expected = (n + timing.point_skip - 1) / timing.point_skip;
        assert_eq!(schedule.events.len(), expected, "n = {}", n);

        let last = schedule.events.last().unwrap().offset * 1000.0;
        assert!(last <= options.max_duration, "n = {}", n);
        assert!(
            schedule.duration * 1000.0 <= options.max_duration + timing.time_per_point + 1e-6,
            "n = {}",
            n
        );
    }
}

#[test]
fn test_single_point_series() {
    let schedule = plan_series(&Series::new(vec![7.0]), 0, &SonificationOptions::default());
    assert_eq!(schedule.events.len(), 1);
    assert_eq!(schedule.events[0].offset, 0.0);
    assert_eq!(schedule.events[0].pan, Some(0.0));
}

#[test]
fn test_empty_series_schedule() {
    let schedule = plan_series(&Series::default(), 0, &SonificationOptions::default());
    assert!(schedule.is_empty());
    assert_eq!(schedule.duration, 0.0);
    assert_eq!(schedule.value_range, None);
}

// ==================== PAN TESTS ====================

#[test]
fn test_pan_spans_stereo_range() {
    let options = SonificationOptions {
        stereo_range: 0.6,
        ..Default::default()
    };
    let schedule = plan_series(&Series::new((0..5).map(|i| i as f64)), 0, &options);
    let pans: Vec<f64> = schedule.events.iter().map(|e| e.pan.unwrap()).collect();

    assert_eq!(pans[0], -0.6);
    assert!((pans[4] - 0.6).abs() < 1e-12);
    assert!((pans[2]).abs() < 1e-12);
    assert!(pans.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_pan_uses_original_index_when_decimated() {
    let options = SonificationOptions::default();
    let schedule = plan_series(&Series::new((0..1000).map(|i| i as f64)), 0, &options);
    let event = &schedule.events[10];
    assert_eq!(event.point.point, 60);
    assert_eq!(event.pan, Some(pan_for_index(60, 1000, 0.8)));
}

#[test]
fn test_no_pan_without_stereo() {
    let options = SonificationOptions {
        stereo: false,
        ..Default::default()
    };
    let schedule = plan_series(&Series::new(vec![1.0, 2.0]), 0, &options);
    assert!(schedule.events.iter().all(|e| e.pan.is_none()));
}

// ==================== SERIES PLAYBACK TESTS ====================

#[test]
fn test_series_playback_programs_engine() {
    let chart = Chart::new(vec![Series::new(vec![1.0, 2.0, 3.0])]);
    let mut engine = engine();
    let playback = sonify_series(&mut engine, &chart, 0, &SonificationOptions::default()).unwrap();

    let voice = playback.voice().unwrap();
    assert!(engine.is_open(voice));
    let commands: Vec<AutomationCommand> = engine.commands().iter().map(|(_, c)| *c).collect();

    assert_eq!(commands[0], AutomationCommand::Start { at: 0.0 });
    let steps = commands
        .iter()
        .filter(|c| matches!(c, AutomationCommand::SetFrequency { transition: Transition::Step, .. }))
        .count();
    let pans = commands
        .iter()
        .filter(|c| matches!(c, AutomationCommand::SetPan { .. }))
        .count();
    assert_eq!(steps, 3);
    assert_eq!(pans, 3);

    // 3 points at 300ms each, fade right after, stop a second later
    let fade = commands
        .iter()
        .find_map(|c| match c {
            AutomationCommand::SetGainTarget { target, at, time_constant } => {
                Some((*target, *at, *time_constant))
            }
            _ => None,
        })
        .unwrap();
    assert_eq!(fade.0, 0.0);
    assert!((fade.1 - 0.9).abs() < 1e-9);
    assert_eq!(fade.2, FADE_TIME_CONSTANT);
    match commands.last() {
        Some(AutomationCommand::Stop { at }) => assert!((at - 1.9).abs() < 1e-9),
        other => panic!("expected stop, got {:?}", other),
    }
}

#[test]
fn test_smooth_uses_linear_ramps() {
    let chart = Chart::new(vec![Series::new(vec![1.0, 2.0])]);
    let mut engine = engine();
    let options = SonificationOptions {
        smooth: true,
        stereo: false,
        ..Default::default()
    };
    sonify_series(&mut engine, &chart, 0, &options).unwrap();

    let commands: Vec<AutomationCommand> = engine.commands().iter().map(|(_, c)| *c).collect();
    assert!(commands
        .iter()
        .filter(|c| matches!(c, AutomationCommand::SetFrequency { .. }))
        .all(|c| matches!(c, AutomationCommand::SetFrequency { transition: Transition::Linear, .. })));
    assert!(!commands.iter().any(|c| matches!(c, AutomationCommand::SetPan { .. })));
}

#[test]
fn test_series_playback_state_machine() {
    let mut chart = Chart::new(vec![Series::new(vec![1.0, 2.0])]);
    let mut engine = engine();
    let mut playback =
        sonify_series(&mut engine, &chart, 0, &SonificationOptions::default()).unwrap();
    let mut events = Vec::new();

    assert_eq!(playback.state(), PlaybackState::Scheduled);
    assert_eq!(playback.poll(&mut engine, &mut chart, &mut events), PlaybackState::Playing);
    assert_eq!(events, vec![SonificationEvent::PointHighlighted { point: PointRef::new(0, 0) }]);

    engine.render_until(0.6);
    assert_eq!(playback.poll(&mut engine, &mut chart, &mut events), PlaybackState::Fading);
    assert_eq!(chart.highlighted_point, Some(PointRef::new(0, 1)));

    engine.render_until(1.61);
    let voice = playback.voice().unwrap();
    assert_eq!(playback.poll(&mut engine, &mut chart, &mut events), PlaybackState::Stopped);
    assert!(!engine.is_open(voice));
    assert_eq!(events.last(), Some(&SonificationEvent::SeriesCompleted { series: 0 }));
    assert_eq!(playback.next_deadline(), None);
}

#[test]
fn test_highlights_follow_audio_clock() {
    let mut chart = Chart::new(vec![Series::new((0..10).map(|i| (i * i) as f64))]);
    let mut engine = engine();
    let mut playback =
        sonify_series(&mut engine, &chart, 0, &SonificationOptions::default()).unwrap();
    let offsets: Vec<f64> = playback.schedule().events.iter().map(|e| e.offset).collect();

    let timeline = drive_series(&mut playback, &mut engine, &mut chart);
    let highlights: Vec<&TimelineEntry> = timeline
        .iter()
        .filter(|e| matches!(e.event, SonificationEvent::PointHighlighted { .. }))
        .collect();

    assert_eq!(highlights.len(), 10);
    for (i, (entry, offset)) in highlights.iter().zip(&offsets).enumerate() {
        assert_eq!(entry.event, SonificationEvent::PointHighlighted { point: PointRef::new(0, i) });
        assert!(entry.time >= offset - 1e-9);
        assert!(entry.time - offset <= 2.0 / RATE as f64);
    }
}

#[test]
fn test_completion_callback_fires_once() {
    let mut chart = Chart::new(vec![Series::new(vec![1.0]), Series::new(vec![1.0, 5.0])]);
    let mut engine = engine();
    let fired = Rc::new(Cell::new(0usize));
    let seen = Rc::clone(&fired);

    let mut playback = sonify_series(&mut engine, &chart, 1, &SonificationOptions::default())
        .unwrap()
        .on_complete(move |series| {
            assert_eq!(series, 1);
            seen.set(seen.get() + 1);
        });
    drive_series(&mut playback, &mut engine, &mut chart);
    let mut events = Vec::new();
    playback.poll(&mut engine, &mut chart, &mut events);

    assert_eq!(fired.get(), 1);
    assert!(events.is_empty());
}

#[test]
fn test_empty_series_completes_immediately() {
    let mut chart = Chart::new(vec![Series::default()]);
    let mut engine = engine();
    let mut playback =
        sonify_series(&mut engine, &chart, 0, &SonificationOptions::default()).unwrap();

    assert_eq!(playback.voice(), None);
    assert_eq!(engine.open_voices(), 0);
    let mut events = Vec::new();
    assert_eq!(playback.poll(&mut engine, &mut chart, &mut events), PlaybackState::Stopped);
    assert_eq!(events, vec![SonificationEvent::SeriesCompleted { series: 0 }]);
    assert_eq!(engine.current_time(), 0.0);
}

#[test]
fn test_disposed_chart_skips_highlights() {
    let mut chart = Chart::new(vec![Series::new(vec![1.0, 2.0, 3.0])]);
    let mut engine = engine();
    let mut playback =
        sonify_series(&mut engine, &chart, 0, &SonificationOptions::default()).unwrap();
    let mut events = Vec::new();
    playback.poll(&mut engine, &mut chart, &mut events);

    chart.dispose();
    let timeline = drive_series(&mut playback, &mut engine, &mut chart);
    let skipped = timeline
        .iter()
        .filter(|e| matches!(e.event, SonificationEvent::HighlightSkipped { .. }))
        .count();

    assert_eq!(skipped, 2);
    assert_eq!(playback.state(), PlaybackState::Stopped);
    assert_eq!(chart.highlighted_point, Some(PointRef::new(0, 0)));
}

#[test]
fn test_cancel_tears_down_voice() {
    let mut chart = Chart::new(vec![Series::new(vec![1.0, 2.0, 3.0])]);
    let mut engine = engine();
    let fired = Rc::new(Cell::new(false));
    let seen = Rc::clone(&fired);
    let mut playback = sonify_series(&mut engine, &chart, 0, &SonificationOptions::default())
        .unwrap()
        .on_complete(move |_| seen.set(true));
    let voice = playback.voice().unwrap();

    engine.render_until(0.1);
    let mut events = Vec::new();
    playback.poll(&mut engine, &mut chart, &mut events);
    playback.cancel(&mut engine);

    assert_eq!(playback.state(), PlaybackState::Cancelled);
    assert!(!engine.is_open(voice));
    assert_eq!(engine.commands().last().map(|(_, c)| *c), Some(AutomationCommand::Stop { at: 0.1 }));

    engine.render_until(5.0);
    events.clear();
    assert_eq!(playback.poll(&mut engine, &mut chart, &mut events), PlaybackState::Cancelled);
    assert!(events.is_empty());
    assert!(!fired.get());
    assert_eq!(playback.next_deadline(), None);
}

#[test]
fn test_unsupported_environment() {
    let chart = Chart::new(vec![Series::new(vec![1.0])]);
    let mut engine = OfflineEngine::disabled();
    let result = sonify_series(&mut engine, &chart, 0, &SonificationOptions::default());
    assert!(matches!(result, Err(SonifyError::UnsupportedEnvironment(_))));

    let mut sonifier = Sonifier::new();
    assert!(sonifier.sonify_chart(&mut engine, &chart).is_err());
    assert!(!sonifier.is_active());
}

#[test]
fn test_sonify_missing_series() {
    let chart = Chart::new(vec![Series::new(vec![1.0])]);
    let mut engine = engine();
    let result = sonify_series(&mut engine, &chart, 3, &SonificationOptions::default());
    assert!(matches!(result, Err(SonifyError::SeriesNotFound(3))));

    let mut sonifier = Sonifier::new();
    let result = sonifier.sonify_series(&mut engine, &chart, 1, &SonificationOptions::default());
    assert!(matches!(result, Err(SonifyError::SeriesNotFound(1))));
}

#[test]
fn test_nan_point_does_not_silence_later_points() {
    let mut chart = Chart::new(vec![Series::new(vec![1.0, f64::NAN, 2.0, 3.0, 4.0])]);
    let mut engine = OfflineEngine::new(8000, 1).unwrap();
    let mut playback =
        sonify_series(&mut engine, &chart, 0, &SonificationOptions::default()).unwrap();
    drive_series(&mut playback, &mut engine, &mut chart);

    let samples = engine.samples();
    assert!(samples.iter().all(|s| s.is_finite()));
    // Point 2 plays from 0.6s to 0.9s
    let segment = &samples[4800..7200];
    let peak = segment.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    assert!(peak > 0.5, "point 2 peak was {}", peak);
}

// ==================== CHAINED PLAYBACK TESTS ====================

#[test]
fn test_chain_visits_every_series_in_order() {
    let mut chart = Chart::new(vec![
        Series::new(vec![1.0, 2.0]),
        Series::new(vec![3.0]),
        Series::new(vec![4.0, 5.0, 6.0]),
    ]);
    let mut engine = engine();
    let mut sonifier = Sonifier::new();
    sonifier.sonify_chart(&mut engine, &chart).unwrap();
    assert_eq!(sonifier.current_series(), Some(0));

    let timeline = drive(&mut sonifier, &mut engine, &mut chart);
    let started: Vec<usize> = timeline
        .iter()
        .filter_map(|e| match e.event {
            SonificationEvent::SeriesStarted { series } => Some(series),
            _ => None,
        })
        .collect();
    let completed: Vec<usize> = timeline
        .iter()
        .filter_map(|e| match e.event {
            SonificationEvent::SeriesCompleted { series } => Some(series),
            _ => None,
        })
        .collect();

    assert_eq!(started, vec![0, 1, 2]);
    assert_eq!(completed, vec![0, 1, 2]);
    assert_eq!(timeline.last().map(|e| &e.event), Some(&SonificationEvent::ChartCompleted));

    // Never two series at once, and the default delay between them
    for series in 1..3 {
        let gap = started_at(&timeline, series) - completed_at(&timeline, series - 1);
        assert!(gap >= 0.8 - 1e-9, "gap before series {} was {}", series, gap);
    }
    assert_eq!(engine.open_voices(), 0);
}

#[test]
fn test_chain_uses_series_delay_and_merged_options() {
    let mut chart = Chart::new(vec![
        Series::new(vec![0.0, 10.0]),
        Series::new(vec![0.0, 10.0]).with_sonification(SonificationOverrides {
            series_delay: Some(2000.0),
            max_frequency: Some(500.0),
            ..Default::default()
        }),
    ])
    .with_sonification(SonificationOverrides {
        series_delay: Some(100.0),
        stereo: Some(false),
        ..Default::default()
    });
    let mut engine = engine();
    let mut sonifier = Sonifier::new();
    sonifier.sonify_chart(&mut engine, &chart).unwrap();

    let timeline = drive(&mut sonifier, &mut engine, &mut chart);
    let gap = started_at(&timeline, 1) - completed_at(&timeline, 0);
    assert!(gap >= 2.0 - 1e-9);
    assert!(gap < 2.0 + 0.01);

    let highest: Vec<f64> = engine
        .commands()
        .iter()
        .filter_map(|(_, c)| match c {
            AutomationCommand::SetFrequency { hz, .. } => Some(*hz),
            _ => None,
        })
        .collect();
    assert_eq!(highest, vec![100.0, 2400.0, 100.0, 500.0]);
    assert!(!engine
        .commands()
        .iter()
        .any(|(_, c)| matches!(c, AutomationCommand::SetPan { .. })));
}

#[test]
fn test_chain_without_series_is_noop() {
    let chart = Chart::default();
    let mut engine = engine();
    let mut sonifier = Sonifier::new();
    sonifier.sonify_chart(&mut engine, &chart).unwrap();
    assert!(!sonifier.is_active());
    assert_eq!(sonifier.next_deadline(), None);
    assert_eq!(engine.open_voices(), 0);
}

#[test]
fn test_chain_rejects_invalid_options_before_playing() {
    let chart = Chart::new(vec![
        Series::new(vec![1.0]),
        Series::new(vec![1.0]).with_sonification(SonificationOverrides {
            volume: Some(3.0),
            ..Default::default()
        }),
    ]);
    let mut engine = engine();
    let mut sonifier = Sonifier::new();
    let result = sonifier.sonify_chart(&mut engine, &chart);

    assert!(matches!(result, Err(SonifyError::InvalidOptions { field: "volume", .. })));
    assert!(!sonifier.is_active());
    assert!(engine.commands().is_empty());
}

#[test]
fn test_chain_retrigger_restarts() {
    let mut chart = Chart::new(vec![Series::new(vec![1.0, 2.0]), Series::new(vec![3.0])]);
    let mut engine = engine();
    let mut sonifier = Sonifier::new();
    sonifier.sonify_chart(&mut engine, &chart).unwrap();
    sonifier.poll(&mut engine, &mut chart).unwrap();
    engine.render_until(0.5);
    sonifier.poll(&mut engine, &mut chart).unwrap();

    sonifier.sonify_chart(&mut engine, &chart).unwrap();
    // The first voice is gone, a fresh one plays series 0 again
    assert_eq!(engine.open_voices(), 1);
    assert_eq!(sonifier.current_series(), Some(0));
    assert_eq!(sonifier.current_state(), Some(PlaybackState::Scheduled));

    let timeline = drive(&mut sonifier, &mut engine, &mut chart);
    assert_eq!(timeline[0].event, SonificationEvent::SeriesStarted { series: 0 });
    assert!(timeline[0].time >= 0.5);
    assert_eq!(timeline.last().map(|e| &e.event), Some(&SonificationEvent::ChartCompleted));
}

#[test]
fn test_chain_keeps_events_when_next_series_fails() {
    let mut chart = Chart::new(vec![Series::new(vec![1.0]), Series::new(vec![2.0])])
        .with_sonification(SonificationOverrides {
            series_delay: Some(0.0),
            ..Default::default()
        });
    let mut engine = engine();
    let mut sonifier = Sonifier::new();
    sonifier.sonify_chart(&mut engine, &chart).unwrap();
    // Series 1 vanishes while series 0 plays
    chart.series.truncate(1);

    let mut delivered = Vec::new();
    let mut steps = 0;
    let error = loop {
        match sonifier.poll(&mut engine, &mut chart) {
            Ok(events) => delivered.extend(events),
            Err(e) => break e,
        }
        if let Some(deadline) = sonifier.next_deadline() {
            engine.render_until(deadline);
        }
        steps += 1;
        assert!(steps < 1000, "chain never reached the missing series");
    };
    assert!(matches!(error, SonifyError::SeriesNotFound(1)));
    assert!(!delivered.contains(&SonificationEvent::SeriesCompleted { series: 0 }));

    delivered.extend(sonifier.poll(&mut engine, &mut chart).unwrap());
    assert!(delivered.contains(&SonificationEvent::SeriesCompleted { series: 0 }));
    assert!(!sonifier.is_active());
    assert_eq!(engine.open_voices(), 0);
}

#[test]
fn test_chain_cancel() {
    let mut chart = Chart::new(vec![Series::new(vec![1.0]), Series::new(vec![2.0])]);
    let mut engine = engine();
    let mut sonifier = Sonifier::new();
    sonifier.sonify_chart(&mut engine, &chart).unwrap();
    sonifier.poll(&mut engine, &mut chart).unwrap();

    sonifier.cancel(&mut engine);
    assert!(!sonifier.is_active());
    assert_eq!(engine.open_voices(), 0);

    engine.render_until(10.0);
    assert!(sonifier.poll(&mut engine, &mut chart).unwrap().is_empty());
}

#[test]
fn test_single_series_through_sonifier() {
    let mut chart = Chart::new(vec![Series::new(vec![1.0]), Series::new(vec![2.0, 3.0])]);
    let mut engine = engine();
    let mut sonifier = Sonifier::new();
    let options = SonificationOptions {
        volume: 0.3,
        ..Default::default()
    };
    sonifier.sonify_series(&mut engine, &chart, 1, &options).unwrap();

    let timeline = drive(&mut sonifier, &mut engine, &mut chart);
    let events: Vec<SonificationEvent> = timeline.into_iter().map(|e| e.event).collect();
    assert_eq!(
        events,
        vec![
            SonificationEvent::SeriesStarted { series: 1 },
            SonificationEvent::PointHighlighted { point: PointRef::new(1, 0) },
            SonificationEvent::PointHighlighted { point: PointRef::new(1, 1) },
            SonificationEvent::SeriesCompleted { series: 1 },
            SonificationEvent::ChartCompleted,
        ]
    );
}
