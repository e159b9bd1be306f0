//! Durable persistence for detection report rows.

pub mod store;
pub mod writer;

pub use store::{JsonlReportStore, MemoryReportStore, ReportStore};
pub use writer::ReportWriter;
