//! # Chart Model
//!
//! The host side of sonification. Playback only needs three things from a
//! charting library: read access to series values, the option blocks, and a
//! way to highlight a point. Those are the [`SeriesSource`] and [`ChartHost`]
//! traits; any charting library can implement them for its own types.
//!
//! [`Chart`], [`Series`], [`Axis`] and [`Tooltip`] are a small concrete model
//! implementing both traits. They load from YAML and keep just enough
//! interaction state (hover, focus, tooltip) to observe highlighting.
//!
//! ## Example
//! ```rust
//! use sonify::{Chart, ChartHost, PointRef};
//!
//! let mut chart = Chart::from_yaml(r#"
//! tooltip: { shared: false }
//! series:
//!   - data: [1, 2, null]
//! "#).unwrap();
//!
//! chart.highlight(PointRef::new(0, 1)).unwrap();
//! assert_eq!(chart.hover_point, Some(PointRef::new(0, 1)));
//! assert!(chart.tooltip.as_ref().unwrap().visible);
//!
//! // Null points hide the tooltip
//! chart.highlight(PointRef::new(0, 2)).unwrap();
//! assert!(!chart.tooltip.as_ref().unwrap().visible);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{HighlightError, SonifyError};
use crate::options::SonificationOverrides;
use crate::playback::PointRef;

/// Inclusive value range used to scale values onto frequencies
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Smallest range covering every finite value, or `None` when there are none.
    pub fn of_values<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        values.into_iter().filter(|v| v.is_finite()).fold(None, |range, v| match range {
            None => Some(Self::new(v, v)),
            Some(r) => Some(Self::new(r.min.min(v), r.max.max(v))),
        })
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// True when min == max, where linear scaling would divide by zero.
    pub fn is_degenerate(&self) -> bool {
        self.span() == 0.0
    }

    fn union(self, other: Self) -> Self {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }
}

/// Read access to one series
pub trait SeriesSource {
    fn point_count(&self) -> usize;

    /// Value of a point; `None` for null points. NaN and infinities count as null.
    fn point_value(&self, index: usize) -> Option<f64>;

    /// Data range of the axis this series is bound to, if any.
    fn axis_range(&self) -> Option<ValueRange>;

    /// Series-level options block.
    fn sonification(&self) -> &SonificationOverrides;

    /// Range of the series' own non-null values.
    fn data_range(&self) -> Option<ValueRange> {
        ValueRange::of_values((0..self.point_count()).filter_map(|i| self.point_value(i)))
    }
}

/// A chart as seen by the playback driver
pub trait ChartHost {
    type Series: SeriesSource;

    /// Series in index order.
    fn series(&self) -> &[Self::Series];

    /// Chart-level options block.
    fn sonification(&self) -> &SonificationOverrides;

    /// Show the hover state and tooltip for a point.
    ///
    /// Hosts report disposed charts or vanished points as errors; playback
    /// skips the highlight and carries on.
    fn highlight(&mut self, point: PointRef) -> Result<(), HighlightError>;
}

/// Value axis. The data range is derived from the series bound to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Axis {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(skip)]
    pub data_range: Option<ValueRange>,
}

/// One data series
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data: Vec<Option<f64>>,
    /// Index into the chart's `yAxis` list
    #[serde(default)]
    pub y_axis: Option<usize>,
    #[serde(default, skip_serializing_if = "SonificationOverrides::is_empty")]
    pub sonification: SonificationOverrides,
    #[serde(skip)]
    pub(crate) axis_range: Option<ValueRange>,
}

impl Series {
    pub fn new<I: IntoIterator<Item = f64>>(values: I) -> Self {
        Self {
            data: values.into_iter().map(Some).collect(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_axis(mut self, axis: usize) -> Self {
        self.y_axis = Some(axis);
        self
    }

    pub fn with_sonification(mut self, overrides: SonificationOverrides) -> Self {
        self.sonification = overrides;
        self
    }
}

impl SeriesSource for Series {
    fn point_count(&self) -> usize {
        self.data.len()
    }

    fn point_value(&self, index: usize) -> Option<f64> {
        self.data
            .get(index)
            .copied()
            .flatten()
            .filter(|v| v.is_finite())
    }

    fn axis_range(&self) -> Option<ValueRange> {
        self.axis_range
    }

    fn sonification(&self) -> &SonificationOverrides {
        &self.sonification
    }
}

/// Tooltip state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tooltip {
    #[serde(default)]
    pub shared: bool,
    #[serde(skip)]
    pub visible: bool,
    #[serde(skip)]
    pub points: Vec<PointRef>,
}

impl Tooltip {
    pub fn refresh(&mut self, points: Vec<PointRef>) {
        self.points = points;
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }
}

/// A chart with its series, axes and interaction state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub y_axis: Vec<Axis>,
    #[serde(default)]
    pub series: Vec<Series>,
    #[serde(default)]
    pub tooltip: Option<Tooltip>,
    #[serde(default, skip_serializing_if = "SonificationOverrides::is_empty")]
    pub sonification: SonificationOverrides,

    #[serde(skip)]
    pub hover_point: Option<PointRef>,
    #[serde(skip)]
    pub focused_point: Option<PointRef>,
    #[serde(skip)]
    pub highlighted_point: Option<PointRef>,
    #[serde(skip)]
    disposed: bool,
}

impl Chart {
    /// Build a chart from series and bind them to their axes.
    pub fn new(series: Vec<Series>) -> Self {
        let mut chart = Self {
            series,
            ..Default::default()
        };
        chart.bind_axes();
        chart
    }

    /// Load a chart document.
    ///
    /// # Errors
    /// Returns [`SonifyError::ConfigError`] if the YAML is malformed or a series
    /// refers to an axis that does not exist.
    pub fn from_yaml(source: &str) -> Result<Self, SonifyError> {
        let mut chart: Chart =
            serde_yaml::from_str(source).map_err(|e| SonifyError::ConfigError(e.to_string()))?;
        for (index, series) in chart.series.iter().enumerate() {
            if let Some(axis) = series.y_axis {
                if axis >= chart.y_axis.len() {
                    return Err(SonifyError::ConfigError(format!(
                        "series {} refers to yAxis {} but the chart has {}",
                        index,
                        axis,
                        chart.y_axis.len()
                    )));
                }
            }
        }
        chart.bind_axes();
        Ok(chart)
    }

    pub fn with_axes(mut self, axes: Vec<Axis>) -> Self {
        self.y_axis = axes;
        self.bind_axes();
        self
    }

    pub fn with_tooltip(mut self, tooltip: Tooltip) -> Self {
        self.tooltip = Some(tooltip);
        self
    }

    pub fn with_sonification(mut self, overrides: SonificationOverrides) -> Self {
        self.sonification = overrides;
        self
    }

    /// Recompute every axis' data range from the series bound to it.
    pub fn bind_axes(&mut self) {
        for axis in &mut self.y_axis {
            axis.data_range = None;
        }
        for series in &self.series {
            let Some(index) = series.y_axis else {
                continue;
            };
            let Some(axis) = self.y_axis.get_mut(index) else {
                continue;
            };
            if let Some(range) = series.data_range() {
                axis.data_range = Some(match axis.data_range {
                    Some(existing) => existing.union(range),
                    None => range,
                });
            }
        }
        let ranges: Vec<Option<ValueRange>> = self
            .series
            .iter()
            .map(|s| s.y_axis.and_then(|i| self.y_axis.get(i)).and_then(|a| a.data_range))
            .collect();
        for (series, range) in self.series.iter_mut().zip(ranges) {
            series.axis_range = range;
        }
    }

    /// Mark the chart as destroyed; later highlights are refused.
    pub fn dispose(&mut self) {
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl ChartHost for Chart {
    type Series = Series;

    fn series(&self) -> &[Series] {
        &self.series
    }

    fn sonification(&self) -> &SonificationOverrides {
        &self.sonification
    }

    fn highlight(&mut self, point: PointRef) -> Result<(), HighlightError> {
        if self.disposed {
            return Err(HighlightError::Disposed);
        }
        let series = self
            .series
            .get(point.series)
            .filter(|s| point.point < s.point_count())
            .ok_or(HighlightError::MissingPoint {
                series: point.series,
                point: point.point,
            })?;

        self.focused_point = Some(point);
        if series.point_value(point.point).is_some() {
            self.hover_point = Some(point);
            if let Some(tooltip) = self.tooltip.as_mut() {
                // Shared tooltips take a list of points; ours only ever holds one
                tooltip.refresh(vec![point]);
            }
        } else if let Some(tooltip) = self.tooltip.as_mut() {
            // Blurring here would steal focus from the chart container
            tooltip.hide();
        }
        self.highlighted_point = Some(point);
        Ok(())
    }
}
