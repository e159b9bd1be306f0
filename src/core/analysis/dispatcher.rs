//! Runs normalize, detect, and count reduction for one sampled frame.

use std::sync::Arc;

use log::warn;

use crate::core::media::Frame;

use super::category::{CategoryCounts, DefectCategory};
use super::detector::DefectDetector;
use super::normalizer::FrameNormalizer;

/// Outcome of inference on one sampled frame. Immutable once produced;
/// the annotation is absent when the detector failed on this sample.
#[derive(Debug, Clone)]
pub struct SampleResult {
    pub frame_index: u64,
    pub media_time_ms: u64,
    pub counts: CategoryCounts,
    pub annotated: Option<Frame>,
}

pub struct InferenceDispatcher {
    detector: Arc<dyn DefectDetector>,
    normalizer: Box<dyn FrameNormalizer>,
}

impl InferenceDispatcher {
    pub fn new(detector: Arc<dyn DefectDetector>, normalizer: Box<dyn FrameNormalizer>) -> Self {
        Self {
            detector,
            normalizer,
        }
    }

    /// A detector failure never aborts the run: the sample is logged and
    /// counted as all-zero, leaving the rest of the analysis intact.
    pub fn dispatch(&self, frame: &Frame) -> SampleResult {
        let normalized = self.normalizer.normalize(frame);

        match self.detector.detect(&normalized) {
            Ok(detections) => {
                let mut counts = CategoryCounts::new();
                for detection in &detections {
                    // unknown class ids are skipped: a newer model may emit
                    // classes this build does not know about
                    if let Some(category) = DefectCategory::from_id(detection.category_id) {
                        counts.increment(category);
                    }
                }
                let annotated = self.detector.render(&normalized, &detections);
                SampleResult {
                    frame_index: frame.frame_index,
                    media_time_ms: frame.media_time_ms(),
                    counts,
                    annotated: Some(annotated),
                }
            }
            Err(err) => {
                warn!("detector failed on frame {}: {}", frame.frame_index, err);
                SampleResult {
                    frame_index: frame.frame_index,
                    media_time_ms: frame.media_time_ms(),
                    counts: CategoryCounts::new(),
                    annotated: None,
                }
            }
        }
    }
}
