//! Durable report writer: incremental appends with a guaranteed final
//! flush on every exit path.

use log::warn;

use crate::core::analysis::aggregator::ReportRecord;
use crate::core::analysis::category::DefectCategory;
use crate::core::analysis::error::AnalysisError;

use super::store::ReportStore;

/// Owns the backing store for one run. Records are persisted as they are
/// appended (append plus flush, never a rewrite of the history); a store
/// failure parks the record in a pending tail that `finalize` retries.
pub struct ReportWriter {
    store: Box<dyn ReportStore>,
    records: Vec<ReportRecord>,
    pending: Vec<ReportRecord>,
    finalized: bool,
}

impl ReportWriter {
    pub fn create(mut store: Box<dyn ReportStore>) -> Result<Self, AnalysisError> {
        store.ensure_header(&DefectCategory::labels())?;
        Ok(Self {
            store,
            records: Vec::new(),
            pending: Vec::new(),
            finalized: false,
        })
    }

    /// Never fails the run: a row that cannot be persisted right now is
    /// retried once immediately and otherwise kept for `finalize`.
    pub fn append(&mut self, record: ReportRecord) {
        self.records.push(record);
        self.finalized = false;

        if let Err(first) = self.store.append_row(&record) {
            if let Err(second) = self.store.append_row(&record) {
                warn!(
                    "report row append failed twice ({first}; {second}), retrying at finalize"
                );
                self.pending.push(record);
                return;
            }
        }

        if let Err(first) = self.store.flush() {
            if let Err(second) = self.store.flush() {
                // the row sits in the store's buffer; finalize flushes again
                warn!("report flush failed twice ({first}; {second})");
            }
        }
    }

    /// Drains the pending tail and flushes. Idempotent: a second call with
    /// nothing pending does no work and reports success.
    pub fn finalize(&mut self) -> Result<(), AnalysisError> {
        if self.finalized && self.pending.is_empty() {
            return Ok(());
        }

        let mut still_pending = Vec::new();
        for record in std::mem::take(&mut self.pending) {
            if let Err(err) = self.store.append_row(&record) {
                warn!("report row still unpersistable at finalize: {err}");
                still_pending.push(record);
            }
        }
        let lost = still_pending.len();
        self.pending = still_pending;

        let flush_result = self.store.flush();
        self.finalized = true;

        if lost > 0 {
            return Err(AnalysisError::StoreWrite(format!(
                "{lost} report record(s) could not be persisted"
            )));
        }
        flush_result
    }

    /// Number of records appended during this run.
    pub fn record_count(&self) -> u64 {
        self.records.len() as u64
    }
}

impl Drop for ReportWriter {
    fn drop(&mut self) {
        // last-resort flush so no exit path loses the in-memory tail
        if let Err(err) = self.finalize() {
            warn!("report finalize on drop failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analysis::category::CategoryCounts;
    use crate::core::report::store::MemoryReportStore;

    fn record(second: u32) -> ReportRecord {
        let mut counts = CategoryCounts::new();
        counts.increment(DefectCategory::Crack);
        ReportRecord {
            minute: 0,
            second,
            counts,
        }
    }

    #[test]
    fn test_create_writes_header() {
        let handle = MemoryReportStore::new();
        let _writer = ReportWriter::create(Box::new(handle.clone())).unwrap();
        assert_eq!(
            handle.header(),
            Some(vec![
                "pothole".to_string(),
                "alligator_cracking".to_string(),
                "crack".to_string()
            ])
        );
    }

    #[test]
    fn test_append_persists_and_flushes() {
        let handle = MemoryReportStore::new();
        let mut writer = ReportWriter::create(Box::new(handle.clone())).unwrap();

        writer.append(record(5));
        assert_eq!(handle.rows(), vec![record(5)]);
        assert!(handle.flush_count() >= 1);
        assert_eq!(writer.record_count(), 1);
    }

    #[test]
    fn test_single_failure_recovered_by_immediate_retry() {
        let handle = MemoryReportStore::new();
        let mut writer = ReportWriter::create(Box::new(handle.clone())).unwrap();

        handle.fail_next_appends(1);
        writer.append(record(9));
        assert_eq!(handle.rows(), vec![record(9)]);
    }

    #[test]
    fn test_double_failure_recovered_at_finalize() {
        let handle = MemoryReportStore::new();
        let mut writer = ReportWriter::create(Box::new(handle.clone())).unwrap();

        handle.fail_next_appends(2);
        writer.append(record(12));
        assert!(handle.rows().is_empty());

        writer.finalize().unwrap();
        assert_eq!(handle.rows(), vec![record(12)]);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let handle = MemoryReportStore::new();
        let mut writer = ReportWriter::create(Box::new(handle.clone())).unwrap();

        writer.append(record(3));
        writer.finalize().unwrap();
        writer.finalize().unwrap();
        assert_eq!(handle.rows(), vec![record(3)]);
    }

    #[test]
    fn test_drop_finalizes_pending_tail() {
        let handle = MemoryReportStore::new();
        {
            let mut writer = ReportWriter::create(Box::new(handle.clone())).unwrap();
            handle.fail_next_appends(2);
            writer.append(record(30));
            assert!(handle.rows().is_empty());
        }
        assert_eq!(handle.rows(), vec![record(30)]);
    }

    #[test]
    fn test_finalize_reports_unrecoverable_records() {
        let handle = MemoryReportStore::new();
        let mut writer = ReportWriter::create(Box::new(handle.clone())).unwrap();

        handle.fail_next_appends(3);
        writer.append(record(40));
        let err = writer.finalize().unwrap_err();
        assert!(matches!(err, AnalysisError::StoreWrite(_)));

        // a later finalize with a healthy store still lands the record
        writer.finalize().unwrap();
        assert_eq!(handle.rows(), vec![record(40)]);
    }
}
