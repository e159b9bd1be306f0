use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::core::analysis::aggregator::ReportRecord;
use crate::core::analysis::error::AnalysisError;

/// Backing table for report rows. Implementations only promise append and
/// flush semantics; the pipeline never rewrites what is already persisted.
pub trait ReportStore: Send {
    /// Writes header metadata once per destination. Appending to an
    /// already-populated destination must leave it untouched.
    fn ensure_header(&mut self, categories: &[&'static str]) -> Result<(), AnalysisError>;

    fn append_row(&mut self, record: &ReportRecord) -> Result<(), AnalysisError>;

    fn flush(&mut self) -> Result<(), AnalysisError>;
}

/// Line-oriented JSON store: one header line carrying the category labels,
/// then one line per record. The file is opened for append, so a rerun
/// against an existing destination extends it instead of truncating.
pub struct JsonlReportStore {
    writer: BufWriter<std::fs::File>,
    fresh: bool,
}

impl JsonlReportStore {
    pub fn open(path: &Path) -> Result<Self, AnalysisError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let fresh = file.metadata()?.len() == 0;
        Ok(Self {
            writer: BufWriter::new(file),
            fresh,
        })
    }
}

fn store_write(err: std::io::Error) -> AnalysisError {
    AnalysisError::StoreWrite(err.to_string())
}

impl ReportStore for JsonlReportStore {
    fn ensure_header(&mut self, categories: &[&'static str]) -> Result<(), AnalysisError> {
        if !self.fresh {
            return Ok(());
        }
        let header = serde_json::json!({ "categories": categories });
        writeln!(self.writer, "{header}").map_err(store_write)?;
        self.writer.flush().map_err(store_write)?;
        self.fresh = false;
        Ok(())
    }

    fn append_row(&mut self, record: &ReportRecord) -> Result<(), AnalysisError> {
        let line = serde_json::to_string(record)
            .map_err(|err| AnalysisError::StoreWrite(err.to_string()))?;
        writeln!(self.writer, "{line}").map_err(store_write)
    }

    fn flush(&mut self) -> Result<(), AnalysisError> {
        self.writer.flush().map_err(store_write)
    }
}

#[derive(Debug, Default)]
struct MemoryStoreState {
    header: Option<Vec<String>>,
    rows: Vec<ReportRecord>,
    flushes: u32,
    fail_next_appends: u32,
}

/// In-memory store for tests. Clones share state, so a test can hand one
/// handle to the writer and keep another to inspect what was persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryReportStore {
    state: Arc<Mutex<MemoryStoreState>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(&self) -> Option<Vec<String>> {
        self.state.lock().unwrap().header.clone()
    }

    pub fn rows(&self) -> Vec<ReportRecord> {
        self.state.lock().unwrap().rows.clone()
    }

    pub fn flush_count(&self) -> u32 {
        self.state.lock().unwrap().flushes
    }

    /// The next `n` append attempts fail with a store write error.
    pub fn fail_next_appends(&self, n: u32) {
        self.state.lock().unwrap().fail_next_appends = n;
    }
}

impl ReportStore for MemoryReportStore {
    fn ensure_header(&mut self, categories: &[&'static str]) -> Result<(), AnalysisError> {
        let mut state = self.state.lock().unwrap();
        if state.header.is_none() {
            state.header = Some(categories.iter().map(|label| label.to_string()).collect());
        }
        Ok(())
    }

    fn append_row(&mut self, record: &ReportRecord) -> Result<(), AnalysisError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_next_appends > 0 {
            state.fail_next_appends -= 1;
            return Err(AnalysisError::StoreWrite("injected append failure".to_string()));
        }
        state.rows.push(*record);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), AnalysisError> {
        self.state.lock().unwrap().flushes += 1;
        Ok(())
    }
}
