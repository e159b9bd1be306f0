//! Turns sampled results into durable report records.

use serde::Serialize;

use super::category::CategoryCounts;
use super::dispatcher::SampleResult;

/// One dated report row. Only samples with at least one detection become
/// records, so the report never carries "nothing detected" rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportRecord {
    pub minute: u32,
    pub second: u32,
    pub counts: CategoryCounts,
}

pub fn aggregate(sample: &SampleResult) -> Option<ReportRecord> {
    if sample.counts.total() == 0 {
        return None;
    }
    let total_seconds = sample.media_time_ms / 1000;
    Some(ReportRecord {
        minute: (total_seconds / 60) as u32,
        second: (total_seconds % 60) as u32,
        counts: sample.counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analysis::category::DefectCategory;

    fn sample(media_time_ms: u64, counts: CategoryCounts) -> SampleResult {
        SampleResult {
            frame_index: 0,
            media_time_ms,
            counts,
            annotated: None,
        }
    }

    #[test]
    fn test_zero_counts_produce_no_record() {
        assert_eq!(aggregate(&sample(5_000, CategoryCounts::new())), None);
    }

    #[test]
    fn test_media_time_split_into_minute_second() {
        let mut counts = CategoryCounts::new();
        counts.increment(DefectCategory::Crack);

        let record = aggregate(&sample(83_500, counts)).unwrap();
        assert_eq!(record.minute, 1);
        assert_eq!(record.second, 23);
        assert_eq!(record.counts.get(DefectCategory::Crack), 1);
    }

    #[test]
    fn test_second_stays_below_sixty() {
        let mut counts = CategoryCounts::new();
        counts.increment(DefectCategory::Pothole);

        let record = aggregate(&sample(3_599_999, counts)).unwrap();
        assert_eq!(record.minute, 59);
        assert_eq!(record.second, 59);
    }
}
