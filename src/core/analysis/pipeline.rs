//! The sampling pipeline: walks the resolved frame window, dispatches
//! inference every stride-th frame, persists dated counts, and forwards
//! every frame to the sink so the output video has no gaps.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::core::media::{Frame, FrameSink, FrameSource, MediaBackend};
use crate::core::report::{ReportStore, ReportWriter};

use super::aggregator::aggregate;
use super::category::CategoryCounts;
use super::detector::DefectDetector;
use super::dispatcher::InferenceDispatcher;
use super::error::AnalysisError;
use super::normalizer::FrameNormalizer;
use super::progress::{ProgressReporter, ProgressSink};
use super::window::{self, FrameIndexRange};

/// One inference per this many frames keeps detector cost bounded while a
/// defect passing through the camera view is still sampled at road speed.
pub const DEFAULT_SAMPLING_STRIDE: u32 = 20;

fn default_sampling_stride() -> u32 {
    DEFAULT_SAMPLING_STRIDE
}

/// Caller-facing configuration for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub source_path: PathBuf,
    pub sink_path: PathBuf,
    pub full_range: bool,
    pub start_minute: u32,
    pub end_minute: u32,
    #[serde(default = "default_sampling_stride")]
    pub sampling_stride: u32,
}

impl AnalysisRequest {
    /// Request covering the whole video.
    pub fn full(source_path: impl Into<PathBuf>, sink_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            sink_path: sink_path.into(),
            full_range: true,
            start_minute: 0,
            end_minute: 0,
            sampling_stride: DEFAULT_SAMPLING_STRIDE,
        }
    }

    /// Request restricted to `[start_minute, end_minute]`.
    pub fn window(
        source_path: impl Into<PathBuf>,
        sink_path: impl Into<PathBuf>,
        start_minute: u32,
        end_minute: u32,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            sink_path: sink_path.into(),
            full_range: false,
            start_minute,
            end_minute,
            sampling_stride: DEFAULT_SAMPLING_STRIDE,
        }
    }

    /// Where the detection report for this run lives.
    pub fn report_path(&self) -> PathBuf {
        self.sink_path.with_extension("report.jsonl")
    }

    /// Rejects malformed requests before any file is touched.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.sampling_stride == 0 {
            return Err(AnalysisError::InvalidStride(self.sampling_stride));
        }
        if !self.full_range && self.start_minute > self.end_minute {
            return Err(AnalysisError::InvalidRange {
                start_minute: self.start_minute,
                end_minute: self.end_minute,
            });
        }
        Ok(())
    }
}

/// Transient per-run state, owned and mutated by the pipeline thread only.
#[derive(Debug, Clone, Default)]
pub struct PipelineRunState {
    pub processed_samples: u64,
    pub total_samplable_frames: u64,
    pub last_annotated: Option<Frame>,
    pub last_counts: CategoryCounts,
}

/// What a completed run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub frames_written: u64,
    pub processed_samples: u64,
    pub records_appended: u64,
}

#[derive(Debug)]
pub enum RunStatus {
    Completed {
        output_path: PathBuf,
        summary: RunSummary,
    },
    Cancelled,
}

/// Cooperative cancellation flag, checked between frames.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

struct LoopOutcome {
    frames_written: u64,
    cancelled: bool,
}

pub struct AnalysisPipeline {
    dispatcher: InferenceDispatcher,
}

impl AnalysisPipeline {
    pub fn new(detector: Arc<dyn DefectDetector>, normalizer: Box<dyn FrameNormalizer>) -> Self {
        Self {
            dispatcher: InferenceDispatcher::new(detector, normalizer),
        }
    }

    /// Runs one analysis to completion, cancellation, or failure. On every
    /// exit path the report writer is finalized and the sink closed before
    /// anything propagates to the caller.
    pub fn run(
        &self,
        request: &AnalysisRequest,
        backend: &dyn MediaBackend,
        store: Box<dyn ReportStore>,
        progress: Arc<dyn ProgressSink>,
        cancel: &CancelToken,
    ) -> Result<RunStatus, AnalysisError> {
        request.validate()?;

        // source first: no sink file may exist until the source opened
        // and reported its geometry
        let mut source = backend.open_source(&request.source_path)?;
        let geometry = source.geometry();
        let range = window::resolve(
            request.full_range,
            request.start_minute,
            request.end_minute,
            geometry.fps,
            geometry.total_frames,
        )?;
        info!(
            "analysis window: frames {}..{} of {} at {} fps, stride {}",
            range.start, range.end, geometry.total_frames, geometry.fps, request.sampling_stride
        );

        let mut writer = ReportWriter::create(store)?;
        let mut sink = backend.create_sink(&request.sink_path, &geometry)?;
        source.seek(range.start)?;

        let stride = u64::from(request.sampling_stride);
        let mut state = PipelineRunState {
            total_samplable_frames: range.len().div_ceil(stride),
            ..Default::default()
        };
        let mut reporter = ProgressReporter::new(progress);

        let loop_result = self.run_loop(
            source.as_mut(),
            sink.as_mut(),
            &mut writer,
            &mut reporter,
            &mut state,
            &range,
            stride,
            cancel,
        );

        // structured cleanup on every path, then surface the first error
        let finalize_result = writer.finalize();
        let close_result = sink.close();
        let outcome = loop_result?;
        finalize_result?;
        close_result?;

        if outcome.cancelled {
            info!("analysis cancelled after {} frames", outcome.frames_written);
            return Ok(RunStatus::Cancelled);
        }

        let summary = RunSummary {
            frames_written: outcome.frames_written,
            processed_samples: state.processed_samples,
            records_appended: writer.record_count(),
        };
        info!(
            "analysis complete: {} frames written, {} samples, {} report records",
            summary.frames_written, summary.processed_samples, summary.records_appended
        );
        Ok(RunStatus::Completed {
            output_path: request.sink_path.clone(),
            summary,
        })
    }

    fn run_loop(
        &self,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
        writer: &mut ReportWriter,
        reporter: &mut ProgressReporter,
        state: &mut PipelineRunState,
        range: &FrameIndexRange,
        stride: u64,
        cancel: &CancelToken,
    ) -> Result<LoopOutcome, AnalysisError> {
        // zero-based count of frames read within the window; frame 0, K,
        // 2K, ... are the sampled ones
        let mut frame_count: u64 = 0;
        let mut frames_written: u64 = 0;

        while let Some(frame) = source.read_next()? {
            if frame.frame_index >= range.end {
                break;
            }
            if cancel.is_cancelled() {
                return Ok(LoopOutcome {
                    frames_written,
                    cancelled: true,
                });
            }

            if frame_count % stride == 0 {
                let sample = self.dispatcher.dispatch(&frame);
                state.processed_samples += 1;
                if let Some(annotated) = &sample.annotated {
                    state.last_annotated = Some(annotated.clone());
                }
                state.last_counts = sample.counts;
                if let Some(record) = aggregate(&sample) {
                    writer.append(record);
                }
                reporter.report_sample(Some(&sample), &frame, state);
                debug!(
                    "sample {} at frame {}: {} detection(s)",
                    state.processed_samples,
                    frame.frame_index,
                    sample.counts.total()
                );
            }

            // sticky annotation: non-sampled frames carry the most recent
            // overlay; before the first inference the raw frame passes through
            let output = state.last_annotated.as_ref().unwrap_or(&frame);
            sink.write_frame(output)?;
            frames_written += 1;
            frame_count += 1;
        }

        Ok(LoopOutcome {
            frames_written,
            cancelled: false,
        })
    }
}
