//! # Error Types
//!
//! This module defines all error types for the sonification library.
//!
//! Sonification failures are always local: nothing here is meant to take
//! down the host chart. Highlight failures are reported by the host with
//! [`HighlightError`] and are skipped by the scheduler, never propagated.
//!
//! ## Error Types
//! - `UnsupportedEnvironment` - The host has no usable audio output
//! - `InvalidOptions` - An option value is out of range or inconsistent
//! - `ConfigError` - YAML/JSON chart or option documents failed to parse
//! - `SeriesNotFound` - A series index does not exist on the chart
//! - `UnknownVoice` - Automation was sent to a closed or unknown voice
//! - `Io` - Writing rendered audio failed
//!
//! ## Usage
//! ```rust
//! use sonify::{Chart, SonifyError};
//!
//! match Chart::from_yaml("series: [") {
//!     Ok(_) => println!("Loaded"),
//!     Err(SonifyError::ConfigError(message)) => eprintln!("Bad chart: {}", message),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SonifyError {
    /// The host environment cannot produce audio.
    ///
    /// # Example
    /// ```
    /// # use sonify::SonifyError;
    /// let err = SonifyError::UnsupportedEnvironment("no audio output".to_string());
    /// assert_eq!(err.to_string(), "Unsupported environment: no audio output");
    /// ```
    #[error("Unsupported environment: {0}")]
    UnsupportedEnvironment(String),

    /// An option failed validation.
    ///
    /// # Example
    /// ```
    /// # use sonify::SonifyError;
    /// let err = SonifyError::InvalidOptions {
    ///     field: "volume",
    ///     message: "must be within [0, 1], got 1.5".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Invalid option 'volume': must be within [0, 1], got 1.5");
    /// ```
    #[error("Invalid option '{field}': {message}")]
    InvalidOptions {
        field: &'static str,
        message: String,
    },

    /// A chart or options document could not be parsed.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// The requested series index is not on the chart.
    #[error("Series {0} does not exist")]
    SeriesNotFound(usize),

    /// Automation targeted a voice the engine does not know about.
    #[error("Voice {0} is not open")]
    UnknownVoice(u64),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Reasons a host could not highlight a point.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HighlightError {
    #[error("chart has been disposed")]
    Disposed,

    #[error("point {point} of series {series} does not exist")]
    MissingPoint { series: usize, point: usize },
}
