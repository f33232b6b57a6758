//! # Audio Engine
//!
//! The audio side of sonification is an injected [`AudioEngine`] handle.
//! Playback never reaches for a process-wide audio context; the caller owns
//! the engine and passes it to every operation that needs it.
//!
//! An engine hands out voices. A voice is one oscillator → gain → panner
//! chain connected to the engine output. Everything a voice does is driven
//! by timestamped [`AutomationCommand`]s against the engine clock, which is
//! also the clock playback uses to time point highlighting.
//!
//! ## Sub-modules
//! - `offline` - [`OfflineEngine`], a sample-accurate renderer into memory
//! - `wav` - 16-bit PCM WAV output for rendered audio

pub mod offline;
pub mod wav;

use serde::Serialize;

use crate::error::SonifyError;
use crate::options::WaveType;

pub use offline::OfflineEngine;

/// Handle to a voice opened on an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct VoiceId(pub u64);

/// How a voice is wired when it is opened
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceConfig {
    pub wave_type: WaveType,
    /// Initial gain
    pub volume: f64,
    /// Insert a stereo panner between gain and output
    pub stereo: bool,
}

/// Shape of a frequency change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    /// Jump to the new value at the given time
    Step,
    /// Ramp linearly from the previous value, arriving at the given time
    Linear,
}

/// A timestamped change to a voice. Times are absolute engine seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum AutomationCommand {
    Start { at: f64 },
    Stop { at: f64 },
    SetFrequency { hz: f64, at: f64, transition: Transition },
    SetPan { pan: f64, at: f64 },
    /// Exponential approach towards `target` starting at `at`
    SetGainTarget { target: f64, at: f64, time_constant: f64 },
}

impl AutomationCommand {
    pub fn at(&self) -> f64 {
        match *self {
            AutomationCommand::Start { at }
            | AutomationCommand::Stop { at }
            | AutomationCommand::SetFrequency { at, .. }
            | AutomationCommand::SetPan { at, .. }
            | AutomationCommand::SetGainTarget { at, .. } => at,
        }
    }
}

/// An audio output that can play scheduled voices.
///
/// Implementations:
/// - own a single clock, read with [`current_time`](AudioEngine::current_time)
/// - apply commands at their timestamps, not when they are received
/// - stop producing sound for a voice once it is closed
pub trait AudioEngine {
    /// Current time on the engine clock in seconds.
    fn current_time(&self) -> f64;

    /// Number of output channels.
    fn channels(&self) -> usize;

    /// Open an oscillator → gain → (panner) → output chain.
    ///
    /// # Errors
    /// [`SonifyError::UnsupportedEnvironment`] when the host cannot play audio.
    fn open_voice(&mut self, config: VoiceConfig) -> Result<VoiceId, SonifyError>;

    /// Queue a command for a voice.
    ///
    /// # Errors
    /// [`SonifyError::UnknownVoice`] when the voice is not open.
    fn schedule(&mut self, voice: VoiceId, command: AutomationCommand) -> Result<(), SonifyError>;

    /// Disconnect a voice. Closing an unknown voice does nothing.
    fn close_voice(&mut self, voice: VoiceId);
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ParamEvent {
    SetValue { value: f64, at: f64 },
    LinearRamp { value: f64, at: f64 },
    SetTarget { target: f64, at: f64, time_constant: f64 },
}

impl ParamEvent {
    fn at(&self) -> f64 {
        match *self {
            ParamEvent::SetValue { at, .. }
            | ParamEvent::LinearRamp { at, .. }
            | ParamEvent::SetTarget { at, .. } => at,
        }
    }
}

// State of a timeline once every event up to `at` has been applied
#[derive(Debug, Clone, Copy, PartialEq)]
struct Segment {
    value: f64,
    at: Option<f64>,
    // (start value, target, start time, time constant)
    target: Option<(f64, f64, f64, f64)>,
}

impl Segment {
    fn start(default: f64) -> Self {
        Self {
            value: default,
            at: None,
            target: None,
        }
    }

    fn apply(self, event: ParamEvent) -> Self {
        let at = event.at();
        let mut value = match self.target {
            Some((from, to, start, tc)) => approach(from, to, at - start, tc),
            None => self.value,
        };
        let mut target = None;
        match event {
            ParamEvent::SetValue { value: v, .. } | ParamEvent::LinearRamp { value: v, .. } => {
                value = v
            }
            ParamEvent::SetTarget {
                target: to,
                time_constant,
                ..
            } => target = Some((value, to, at, time_constant)),
        }
        Self {
            value,
            at: Some(at),
            target,
        }
    }

    fn value_at(&self, next: Option<&ParamEvent>, time: f64) -> f64 {
        if let Some((from, to, start, tc)) = self.target {
            return approach(from, to, time - start, tc);
        }
        match (next, self.at) {
            (Some(&ParamEvent::LinearRamp { value: end, at: until }), Some(start)) => {
                self.value + (end - self.value) * (time - start) / (until - start)
            }
            _ => self.value,
        }
    }
}

/// Automation timeline for one audio parameter.
///
/// Follows Web Audio `AudioParam` scheduling: events are kept in time order,
/// a linear ramp runs from the previous event to its own time, and a target
/// event approaches its target exponentially until the next event.
///
/// [`value_at`](ParamTimeline::value_at) evaluates any time from scratch.
/// [`advance`](ParamTimeline::advance) keeps a cursor and is constant time
/// per call while time moves forward, which is how the renderer reads it.
#[derive(Debug, Clone)]
pub struct ParamTimeline {
    default: f64,
    events: Vec<ParamEvent>,
    cursor: usize,
    segment: Segment,
}

impl ParamTimeline {
    pub fn new(default: f64) -> Self {
        Self {
            default,
            events: Vec::new(),
            cursor: 0,
            segment: Segment::start(default),
        }
    }

    pub fn set_value_at(&mut self, value: f64, at: f64) {
        self.insert(ParamEvent::SetValue { value, at });
    }

    pub fn linear_ramp_to(&mut self, value: f64, at: f64) {
        self.insert(ParamEvent::LinearRamp { value, at });
    }

    pub fn set_target_at(&mut self, target: f64, at: f64, time_constant: f64) {
        self.insert(ParamEvent::SetTarget {
            target,
            at,
            time_constant,
        });
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    // Events at equal times keep insertion order
    fn insert(&mut self, event: ParamEvent) {
        let pos = self.events.partition_point(|e| e.at() <= event.at());
        self.events.insert(pos, event);
        if pos < self.cursor {
            self.rewind();
        }
    }

    fn rewind(&mut self) {
        self.cursor = 0;
        self.segment = Segment::start(self.default);
    }

    /// Parameter value at `time`.
    pub fn value_at(&self, time: f64) -> f64 {
        let passed = self.events.partition_point(|e| e.at() <= time);
        let segment = self.events[..passed]
            .iter()
            .fold(Segment::start(self.default), |segment, event| segment.apply(*event));
        segment.value_at(self.events.get(passed), time)
    }

    /// Parameter value at `time`, moving the cursor forward. Going back in
    /// time rewinds to the first event.
    pub fn advance(&mut self, time: f64) -> f64 {
        if self.segment.at.map_or(false, |at| time < at) {
            self.rewind();
        }
        while let Some(event) = self.events.get(self.cursor) {
            if event.at() > time {
                break;
            }
            self.segment = self.segment.apply(*event);
            self.cursor += 1;
        }
        self.segment.value_at(self.events.get(self.cursor), time)
    }
}

fn approach(from: f64, to: f64, elapsed: f64, time_constant: f64) -> f64 {
    if time_constant <= 0.0 {
        return to;
    }
    to + (from - to) * (-elapsed.max(0.0) / time_constant).exp()
}
