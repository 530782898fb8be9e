use crate::error::{ChartError, ChartResult};
use crate::types::{DataRow, Dataset};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::future::Future;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Header names expected in the census extract.
pub const COLUMNS: [&str; 17] = [
    "state",
    "abbr",
    "poverty",
    "povertyMoe",
    "age",
    "ageMoe",
    "income",
    "incomeMoe",
    "healthcare",
    "healthcareLow",
    "healthcareHigh",
    "obesity",
    "obesityLow",
    "obesityHigh",
    "smokes",
    "smokesLow",
    "smokesHigh",
];

/// Where a render pulls its dataset from. Every render loads afresh.
pub trait DataSource: Send + Sync + 'static {
    fn load(&self) -> impl Future<Output = ChartResult<Dataset>> + Send;
}

/// The census CSV on disk.
#[derive(Debug, Clone)]
pub struct CsvFile {
    pub path: PathBuf,
}

impl CsvFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataSource for CsvFile {
    async fn load(&self) -> ChartResult<Dataset> {
        load_dataset(&self.path).await
    }
}

/// A dataset already in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemory(pub Dataset);

impl DataSource for InMemory {
    async fn load(&self) -> ChartResult<Dataset> {
        Ok(self.0.clone())
    }
}

pub async fn load_dataset(path: &Path) -> ChartResult<Dataset> {
    debug!("Loading census data from {:?}", path);
    let path = path.to_path_buf();
    let rows = tokio::task::spawn_blocking(move || {
        let file = File::open(&path)?;
        parse_dataset(file)
    })
    .await??;
    info!("Loaded {} census rows", rows.len());
    Ok(rows)
}

/// Reads CSV records and coerces every numeric column to `f64`.
pub fn parse_dataset<R: Read>(reader: R) -> ChartResult<Dataset> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let col_indices: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h, i))
        .collect();

    let mut idx = [0usize; COLUMNS.len()];
    for (slot, name) in idx.iter_mut().zip(COLUMNS) {
        *slot = *col_indices
            .get(name)
            .ok_or_else(|| ChartError::MissingColumn(name.to_string()))?;
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let text = |i: usize| record.get(idx[i]).unwrap_or("");
        let num = |i: usize| coerce(text(i));

        rows.push(DataRow {
            state: text(0).to_string(),
            abbr: text(1).to_string(),
            poverty: num(2),
            poverty_moe: num(3),
            age: num(4),
            age_moe: num(5),
            income: num(6),
            income_moe: num(7),
            healthcare: num(8),
            healthcare_low: num(9),
            healthcare_high: num(10),
            obesity: num(11),
            obesity_low: num(12),
            obesity_high: num(13),
            smokes: num(14),
            smokes_low: num(15),
            smokes_high: num(16),
        });
    }

    Ok(rows)
}

/// Text to number; blank or non-numeric text becomes `NaN`. Float
/// spellings such as "inf" or "NaN" are not numerals and also give `NaN`.
pub fn coerce(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return f64::NAN;
    }
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(f64::NAN)
}
