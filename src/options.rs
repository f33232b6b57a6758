//! # Sonification Options
//!
//! Configuration for turning a series into sound.
//!
//! Options come in two shapes:
//! - [`SonificationOptions`] - a complete, resolved set of values
//! - [`SonificationOverrides`] - a partial block (chart-level or series-level)
//!   where every field is optional
//!
//! Resolution always starts from [`SonificationOptions::default()`] and applies
//! the chart block, then the series block. The field names match the keys used
//! in chart documents (`seriesDelay`, `maxDuration`, `waveType`, ...).
//!
//! ## Example
//! ```rust
//! use sonify::{SonificationOptions, SonificationOverrides};
//!
//! let chart = SonificationOverrides::from_yaml("maxFrequency: 1200\nstereo: false").unwrap();
//! let series = SonificationOverrides::from_yaml("maxFrequency: 800").unwrap();
//!
//! let options = series.apply_to(&chart.apply_to(&SonificationOptions::default()));
//! assert_eq!(options.max_frequency, 800.0);
//! assert!(!options.stereo);
//! assert_eq!(options.min_frequency, 100.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SonifyError;

/// Oscillator waveform
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WaveType {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// Resolved sonification options
///
/// # Fields
/// - `series_delay`: Pause between two series in a chained playback (ms)
/// - `max_duration`: Upper bound on the playback time of one series (ms)
/// - `min_point_duration` / `max_point_duration`: Bounds on the time given to one point (ms)
/// - `min_frequency` / `max_frequency`: Output frequency range (Hz)
/// - `wave_type`: Oscillator waveform
/// - `smooth`: Ramp between point frequencies instead of stepping
/// - `stereo`: Sweep the pan from left to right across the series
/// - `stereo_range`: Factor in [0, 1] applied to the pan extremes
/// - `volume`: Initial gain in [0, 1]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SonificationOptions {
    pub series_delay: f64,
    pub max_duration: f64,
    pub min_point_duration: f64,
    pub max_point_duration: f64,
    pub min_frequency: f64,
    pub max_frequency: f64,
    pub wave_type: WaveType,
    pub smooth: bool,
    pub stereo: bool,
    pub stereo_range: f64,
    pub volume: f64,
}

impl Default for SonificationOptions {
    fn default() -> Self {
        Self {
            series_delay: 800.0,
            max_duration: 5000.0,
            min_point_duration: 30.0,
            max_point_duration: 300.0,
            min_frequency: 100.0,
            max_frequency: 2400.0,
            wave_type: WaveType::Sine,
            smooth: false,
            // Panning might not be accessible to mono users
            stereo: true,
            stereo_range: 0.8,
            volume: 0.9,
        }
    }
}

impl SonificationOptions {
    /// Check that the options describe a playable configuration.
    ///
    /// # Errors
    /// Returns [`SonifyError::InvalidOptions`] naming the first offending field.
    pub fn validate(&self) -> Result<(), SonifyError> {
        non_negative("seriesDelay", self.series_delay)?;
        positive("maxDuration", self.max_duration)?;
        positive("minPointDuration", self.min_point_duration)?;
        positive("maxPointDuration", self.max_point_duration)?;
        if self.min_point_duration > self.max_point_duration {
            return Err(SonifyError::InvalidOptions {
                field: "minPointDuration",
                message: format!(
                    "must not exceed maxPointDuration ({} > {})",
                    self.min_point_duration, self.max_point_duration
                ),
            });
        }
        non_negative("minFrequency", self.min_frequency)?;
        non_negative("maxFrequency", self.max_frequency)?;
        if self.min_frequency > self.max_frequency {
            return Err(SonifyError::InvalidOptions {
                field: "minFrequency",
                message: format!(
                    "must not exceed maxFrequency ({} > {})",
                    self.min_frequency, self.max_frequency
                ),
            });
        }
        unit_interval("stereoRange", self.stereo_range)?;
        unit_interval("volume", self.volume)?;
        Ok(())
    }

    /// Parse a complete options block; missing keys take their defaults.
    pub fn from_yaml(source: &str) -> Result<Self, SonifyError> {
        let options: SonificationOptions =
            serde_yaml::from_str(source).map_err(|e| SonifyError::ConfigError(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), SonifyError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SonifyError::InvalidOptions {
            field,
            message: format!("must be a positive number, got {}", value),
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), SonifyError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SonifyError::InvalidOptions {
            field,
            message: format!("must be zero or more, got {}", value),
        })
    }
}

fn unit_interval(field: &'static str, value: f64) -> Result<(), SonifyError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SonifyError::InvalidOptions {
            field,
            message: format!("must be within [0, 1], got {}", value),
        })
    }
}

/// Partial options block for a chart or a single series
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SonificationOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_delay: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_point_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_point_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_frequency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_frequency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wave_type: Option<WaveType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smooth: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stereo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stereo_range: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl SonificationOverrides {
    /// Merge this block over `base`. Present fields win.
    pub fn apply_to(&self, base: &SonificationOptions) -> SonificationOptions {
        SonificationOptions {
            series_delay: self.series_delay.unwrap_or(base.series_delay),
            max_duration: self.max_duration.unwrap_or(base.max_duration),
            min_point_duration: self.min_point_duration.unwrap_or(base.min_point_duration),
            max_point_duration: self.max_point_duration.unwrap_or(base.max_point_duration),
            min_frequency: self.min_frequency.unwrap_or(base.min_frequency),
            max_frequency: self.max_frequency.unwrap_or(base.max_frequency),
            wave_type: self.wave_type.unwrap_or(base.wave_type),
            smooth: self.smooth.unwrap_or(base.smooth),
            stereo: self.stereo.unwrap_or(base.stereo),
            stereo_range: self.stereo_range.unwrap_or(base.stereo_range),
            volume: self.volume.unwrap_or(base.volume),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn from_yaml(source: &str) -> Result<Self, SonifyError> {
        serde_yaml::from_str(source).map_err(|e| SonifyError::ConfigError(e.to_string()))
    }
}

/// Resolve the options a series plays with: defaults, then the chart block,
/// then the series block. The result is validated.
pub fn resolve_options(
    chart: &SonificationOverrides,
    series: &SonificationOverrides,
) -> Result<SonificationOptions, SonifyError> {
    let options = series.apply_to(&chart.apply_to(&SonificationOptions::default()));
    options.validate()?;
    Ok(options)
}
