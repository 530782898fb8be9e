use thiserror::Error;

pub type ChartResult<T> = Result<T, ChartError>;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("failed to read data file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("column '{0}' not found in data file")]
    MissingColumn(String),

    #[error("no finite values in column '{0}'")]
    EmptyDomain(&'static str),

    #[error("viewport {width}x{height} is smaller than the chart margins")]
    ViewportTooSmall { width: u32, height: u32 },

    #[error("data load task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ChartError {
    /// Errors caused by the data source rather than by the request.
    pub fn is_data_unavailable(&self) -> bool {
        !matches!(self, ChartError::ViewportTooSmall { .. })
    }
}
