use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// One census record per state. Numeric fields hold `NaN` when the source
/// text was empty or not a number.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
    pub state: String,
    pub abbr: String,
    pub poverty: f64,
    pub poverty_moe: f64,
    pub age: f64,
    pub age_moe: f64,
    pub income: f64,
    pub income_moe: f64,
    pub healthcare: f64,
    pub healthcare_low: f64,
    pub healthcare_high: f64,
    pub obesity: f64,
    pub obesity_low: f64,
    pub obesity_high: f64,
    pub smokes: f64,
    pub smokes_low: f64,
    pub smokes_high: f64,
}

impl DataRow {
    /// Row with the given identity and every measurement set to `NaN`.
    pub fn new(state: impl Into<String>, abbr: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            abbr: abbr.into(),
            poverty: f64::NAN,
            poverty_moe: f64::NAN,
            age: f64::NAN,
            age_moe: f64::NAN,
            income: f64::NAN,
            income_moe: f64::NAN,
            healthcare: f64::NAN,
            healthcare_low: f64::NAN,
            healthcare_high: f64::NAN,
            obesity: f64::NAN,
            obesity_low: f64::NAN,
            obesity_high: f64::NAN,
            smokes: f64::NAN,
            smokes_low: f64::NAN,
            smokes_high: f64::NAN,
        }
    }
}

pub type Dataset = Vec<DataRow>;

/// Size of the browser window the chart is drawn for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// Parses "960x600", used by the CLI `--size` flag.
impl FromStr for Viewport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
        let width = w.trim().parse().map_err(|_| format!("invalid width '{}'", w))?;
        let height = h.trim().parse().map_err(|_| format!("invalid height '{}'", h))?;
        Ok(Self { width, height })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Margin {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            top: 30.0,
            bottom: 50.0,
            left: 50.0,
            right: 200.0,
        }
    }
}

/// Drawing area derived from the viewport on every render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportGeometry {
    pub width: f64,
    pub height: f64,
    pub margin: Margin,
    pub chart_width: f64,
    pub chart_height: f64,
}

impl ViewportGeometry {
    pub fn new(viewport: Viewport, margin: Margin) -> Self {
        let width = f64::from(viewport.width);
        let height = f64::from(viewport.height);
        Self {
            width,
            height,
            margin,
            chart_width: width - margin.left - margin.right,
            chart_height: height - margin.top - margin.bottom,
        }
    }

    pub fn fits(&self) -> bool {
        self.chart_width > 0.0 && self.chart_height > 0.0
    }
}
