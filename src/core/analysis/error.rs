use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid analysis range: start minute {start_minute} is after end minute {end_minute}")]
    InvalidRange { start_minute: u32, end_minute: u32 },
    #[error("sampling stride must be at least 1, got {0}")]
    InvalidStride(u32),
    #[error("video source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("sink write failed: {0}")]
    SinkWrite(String),
    #[error("report store write failed: {0}")]
    StoreWrite(String),
    #[error("analysis worker thread panicked")]
    WorkerPanic,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
