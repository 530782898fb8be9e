use crate::types::Margin;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub chart: ChartConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub data_csv: PathBuf,
}

/// Visual encoding constants. The defaults reproduce the look tuned for the
/// state-level census extract.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChartConfig {
    pub margin: Margin,
    pub radius_divisor: f64,
    /// Label position relative to the circle centre, in pixels.
    pub label_offset: [f64; 2],
    /// Tooltip offset as `[top, left]`, in pixels.
    pub tooltip_offset: [f64; 2],
    pub opacity: f64,
    /// Colour stops for min, mean and max obesity.
    pub colors: [String; 3],
    pub x_title: String,
    pub y_title: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            margin: Margin::default(),
            radius_divisor: 110_000_000.0,
            label_offset: [-11.0, 6.0],
            tooltip_offset: [0.0, 50.0],
            opacity: 0.7,
            colors: [
                "#008000".to_string(),
                "#ffff00".to_string(),
                "#ff0000".to_string(),
            ],
            x_title: "Poverty Index".to_string(),
            y_title: "Healthcare Index".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub svg: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            svg: PathBuf::from("chart.svg"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8000 }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}
