//! Offline rendering engine
//!
//! Renders voices sample by sample into an interleaved buffer. Time only
//! moves when the caller renders, which makes the engine a deterministic
//! clock for driving playback in tests and in the CLI.

use std::f64::consts::{FRAC_PI_4, TAU};

use tracing::{debug, warn};

use super::{AudioEngine, AutomationCommand, ParamTimeline, Transition, VoiceConfig, VoiceId};
use crate::error::SonifyError;
use crate::options::WaveType;

struct OfflineVoice {
    id: VoiceId,
    wave_type: WaveType,
    panner: bool,
    frequency: ParamTimeline,
    gain: ParamTimeline,
    pan: ParamTimeline,
    start: Option<f64>,
    stop: Option<f64>,
    phase: f64,
}

impl OfflineVoice {
    fn is_sounding(&self, time: f64) -> bool {
        match self.start {
            Some(start) => time >= start && self.stop.map_or(true, |stop| time < stop),
            None => false,
        }
    }

    #[inline]
    fn next_sample(&mut self, time: f64, sample_rate: f64) -> f64 {
        let sample = oscillator(self.wave_type, self.phase);
        let step = self.frequency.advance(time) / sample_rate;
        // A bad frequency must not poison the phase for the rest of the voice
        if step.is_finite() {
            self.phase = (self.phase + step).fract();
        }
        sample * self.gain.advance(time)
    }
}

#[inline]
fn oscillator(wave_type: WaveType, phase: f64) -> f64 {
    match wave_type {
        WaveType::Sine => (phase * TAU).sin(),
        WaveType::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        WaveType::Sawtooth => 2.0 * phase - 1.0,
        WaveType::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
    }
}

/// Engine that renders into memory.
///
/// # Example
/// ```rust
/// use sonify::audio::{AudioEngine, AutomationCommand, OfflineEngine, VoiceConfig};
/// use sonify::WaveType;
///
/// let mut engine = OfflineEngine::new(8000, 2).unwrap();
/// let voice = engine
///     .open_voice(VoiceConfig { wave_type: WaveType::Sine, volume: 0.5, stereo: false })
///     .unwrap();
/// engine.schedule(voice, AutomationCommand::Start { at: 0.0 }).unwrap();
/// engine.render_for(0.5);
///
/// assert_eq!(engine.samples().len(), 4000 * 2);
/// ```
pub struct OfflineEngine {
    sample_rate: u32,
    channels: usize,
    enabled: bool,
    frame: u64,
    next_voice: u64,
    voices: Vec<OfflineVoice>,
    samples: Vec<f32>,
    commands: Vec<(VoiceId, AutomationCommand)>,
}

impl OfflineEngine {
    /// Create an engine with one or two output channels.
    ///
    /// # Errors
    /// [`SonifyError::UnsupportedEnvironment`] for a zero sample rate or an
    /// unsupported channel count.
    pub fn new(sample_rate: u32, channels: usize) -> Result<Self, SonifyError> {
        if sample_rate == 0 {
            return Err(SonifyError::UnsupportedEnvironment(
                "sample rate must be non-zero".to_string(),
            ));
        }
        if !(1..=2).contains(&channels) {
            return Err(SonifyError::UnsupportedEnvironment(format!(
                "{} output channels are not supported",
                channels
            )));
        }
        Ok(Self {
            sample_rate,
            channels,
            enabled: true,
            frame: 0,
            next_voice: 0,
            voices: Vec::new(),
            samples: Vec::new(),
            commands: Vec::new(),
        })
    }

    /// An engine standing in for a host without audio output.
    /// Its clock still advances but every voice request fails.
    pub fn disabled() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            enabled: false,
            frame: 0,
            next_voice: 0,
            voices: Vec::new(),
            samples: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Rendered audio, interleaved by channel.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Every command accepted so far, in arrival order.
    pub fn commands(&self) -> &[(VoiceId, AutomationCommand)] {
        &self.commands
    }

    /// Forget the command log. Long-running engines should call this once
    /// they are done inspecting it.
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn is_open(&self, voice: VoiceId) -> bool {
        self.voices.iter().any(|v| v.id == voice)
    }

    pub fn open_voices(&self) -> usize {
        self.voices.len()
    }

    /// Render until the clock reaches `time` (rounded up to a whole frame).
    pub fn render_until(&mut self, time: f64) {
        let sample_rate = self.sample_rate as f64;
        let target = (time * sample_rate).ceil().max(0.0) as u64;
        if target <= self.frame {
            return;
        }

        self.samples
            .reserve((target - self.frame) as usize * self.channels);
        let mut frame_out = [0.0f64; 2];
        for frame in self.frame..target {
            let t = frame as f64 / sample_rate;
            frame_out[0] = 0.0;
            frame_out[1] = 0.0;
            for voice in self.voices.iter_mut() {
                if !voice.is_sounding(t) {
                    continue;
                }
                let sample = voice.next_sample(t, sample_rate);
                if self.channels == 1 {
                    frame_out[0] += sample;
                } else if voice.panner {
                    // Equal-power pan of a mono source
                    let angle = (voice.pan.advance(t).clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
                    frame_out[0] += sample * angle.cos();
                    frame_out[1] += sample * angle.sin();
                } else {
                    frame_out[0] += sample;
                    frame_out[1] += sample;
                }
            }
            for out in frame_out.iter().take(self.channels) {
                self.samples.push(*out as f32);
            }
        }
        self.frame = target;
    }

    pub fn render_for(&mut self, seconds: f64) {
        let until = self.current_time() + seconds;
        self.render_until(until);
    }

    fn voice_mut(&mut self, voice: VoiceId) -> Result<&mut OfflineVoice, SonifyError> {
        self.voices
            .iter_mut()
            .find(|v| v.id == voice)
            .ok_or(SonifyError::UnknownVoice(voice.0))
    }
}

impl AudioEngine for OfflineEngine {
    fn current_time(&self) -> f64 {
        self.frame as f64 / self.sample_rate as f64
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn open_voice(&mut self, config: VoiceConfig) -> Result<VoiceId, SonifyError> {
        if !self.enabled {
            return Err(SonifyError::UnsupportedEnvironment(
                "no audio output is available".to_string(),
            ));
        }
        let panner = config.stereo && self.channels >= 2;
        if config.stereo && !panner {
            warn!(channels = self.channels, "stereo requested on a mono output, playing without panning");
        }

        let id = VoiceId(self.next_voice);
        self.next_voice += 1;
        self.voices.push(OfflineVoice {
            id,
            wave_type: config.wave_type,
            panner,
            frequency: ParamTimeline::new(0.0),
            gain: ParamTimeline::new(config.volume),
            pan: ParamTimeline::new(0.0),
            start: None,
            stop: None,
            phase: 0.0,
        });
        debug!(voice = id.0, wave = ?config.wave_type, panner, "opened voice");
        Ok(id)
    }

    fn schedule(&mut self, voice: VoiceId, command: AutomationCommand) -> Result<(), SonifyError> {
        let target = self.voice_mut(voice)?;
        match command {
            AutomationCommand::Start { at } => target.start = Some(at),
            AutomationCommand::Stop { at } => target.stop = Some(at),
            AutomationCommand::SetFrequency {
                hz,
                at,
                transition: Transition::Step,
            } => target.frequency.set_value_at(hz, at),
            AutomationCommand::SetFrequency {
                hz,
                at,
                transition: Transition::Linear,
            } => target.frequency.linear_ramp_to(hz, at),
            AutomationCommand::SetPan { pan, at } => {
                if target.panner {
                    target.pan.set_value_at(pan, at);
                }
            }
            AutomationCommand::SetGainTarget {
                target: value,
                at,
                time_constant,
            } => target.gain.set_target_at(value, at, time_constant),
        }
        self.commands.push((voice, command));
        Ok(())
    }

    fn close_voice(&mut self, voice: VoiceId) {
        let before = self.voices.len();
        self.voices.retain(|v| v.id != voice);
        if self.voices.len() < before {
            debug!(voice = voice.0, "closed voice");
        }
    }
}
