//! Pavement analysis pipeline: samples a video stream for recurring
//! surface defects and persists dated detection counts.
//!
//! Core flow:
//! 1. Window resolve: map the requested minutes onto absolute frame indices
//! 2. Stride sampling: one inference per fixed stride, every frame forwarded
//! 3. Inference dispatch: flat-field normalize, detect, reduce to counts
//! 4. Aggregation: a dated record for every sample with detections
//! 5. Durable report: incremental append with a guaranteed final flush
//! 6. Progress fan-out: non-blocking updates for the presentation layer

pub mod aggregator;
pub mod category;
pub mod detector;
pub mod dispatcher;
pub mod error;
pub mod normalizer;
pub mod pipeline;
pub mod progress;
pub mod window;

pub use aggregator::{aggregate, ReportRecord};
pub use category::{CategoryCounts, DefectCategory};
pub use detector::{BoundingBox, DefectDetector, Detection, DetectorError, MockDefectDetector};
pub use dispatcher::{InferenceDispatcher, SampleResult};
pub use error::AnalysisError;
pub use normalizer::{FlatFieldNormalizer, FrameNormalizer, IdentityNormalizer};
pub use pipeline::{
    AnalysisPipeline, AnalysisRequest, CancelToken, PipelineRunState, RunStatus, RunSummary,
    DEFAULT_SAMPLING_STRIDE,
};
pub use progress::{
    progress_channel, AnalysisEvent, CoalescingSink, NullProgressSink, ProgressReporter,
    ProgressSink, SampleUpdate,
};
pub use window::{resolve, FrameIndexRange};
