pub mod analysis;

pub use analysis::{AnalysisHandle, VideoAnalyzer};
