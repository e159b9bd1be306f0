//! Background analysis sessions for a presentation layer.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{error, info};

use crate::core::analysis::error::AnalysisError;
use crate::core::analysis::normalizer::{FlatFieldNormalizer, FrameNormalizer};
use crate::core::analysis::pipeline::{
    AnalysisPipeline, AnalysisRequest, CancelToken, RunStatus,
};
use crate::core::analysis::progress::{AnalysisEvent, ProgressSink};
use crate::core::analysis::DefectDetector;
use crate::core::media::MediaBackend;
use crate::core::report::{JsonlReportStore, ReportStore};

/// Front-door for driving analysis runs off the caller's thread. A GUI
/// keeps its own event loop responsive and receives sample updates plus
/// exactly one terminal event through the progress sink.
pub struct VideoAnalyzer {
    pipeline: Arc<AnalysisPipeline>,
    backend: Arc<dyn MediaBackend>,
}

impl VideoAnalyzer {
    pub fn new(detector: Arc<dyn DefectDetector>, backend: Arc<dyn MediaBackend>) -> Self {
        Self::with_normalizer(detector, backend, Box::new(FlatFieldNormalizer::new()))
    }

    pub fn with_normalizer(
        detector: Arc<dyn DefectDetector>,
        backend: Arc<dyn MediaBackend>,
        normalizer: Box<dyn FrameNormalizer>,
    ) -> Self {
        info!("🎬 VideoAnalyzer: created");
        Self {
            pipeline: Arc::new(AnalysisPipeline::new(detector, normalizer)),
            backend,
        }
    }

    /// Starts a run with the report stored next to the output video.
    pub fn start(
        &self,
        request: AnalysisRequest,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<AnalysisHandle, AnalysisError> {
        request.validate()?;
        let store = JsonlReportStore::open(&request.report_path())?;
        self.start_with_store(request, Box::new(store), progress)
    }

    pub fn start_with_store(
        &self,
        request: AnalysisRequest,
        store: Box<dyn ReportStore>,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<AnalysisHandle, AnalysisError> {
        request.validate()?;

        let cancel = CancelToken::new();
        let token = cancel.clone();
        let pipeline = self.pipeline.clone();
        let backend = self.backend.clone();

        let join = thread::spawn(move || {
            let result = pipeline.run(&request, backend.as_ref(), store, progress.clone(), &token);
            match &result {
                Ok(RunStatus::Completed {
                    output_path,
                    summary,
                }) => {
                    info!("processed video saved to {}", output_path.display());
                    progress.on_event(AnalysisEvent::Finished {
                        output_path: output_path.clone(),
                        summary: *summary,
                    });
                }
                Ok(RunStatus::Cancelled) => {
                    info!("analysis run cancelled");
                    progress.on_event(AnalysisEvent::Cancelled);
                }
                Err(err) => {
                    error!("analysis run failed: {err}");
                    progress.on_event(AnalysisEvent::Failed {
                        message: err.to_string(),
                    });
                }
            }
            result
        });

        Ok(AnalysisHandle { cancel, join })
    }
}

impl Drop for VideoAnalyzer {
    fn drop(&mut self) {
        info!("🗑️ VideoAnalyzer: released");
    }
}

/// Handle to one in-flight run.
#[derive(Debug)]
pub struct AnalysisHandle {
    cancel: CancelToken,
    join: JoinHandle<Result<RunStatus, AnalysisError>>,
}

impl AnalysisHandle {
    /// Asks the run to stop; the pipeline honors it between frames.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Blocks until the run ends and returns its status.
    pub fn wait(self) -> Result<RunStatus, AnalysisError> {
        self.join.join().map_err(|_| AnalysisError::WorkerPanic)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analysis::detector::{BoundingBox, Detection, MockDefectDetector};
    use crate::core::analysis::normalizer::IdentityNormalizer;
    use crate::core::analysis::progress::progress_channel;
    use crate::core::media::SyntheticBackend;
    use crate::core::report::MemoryReportStore;

    fn analyzer(detector: MockDefectDetector, backend: Arc<SyntheticBackend>) -> VideoAnalyzer {
        VideoAnalyzer::with_normalizer(Arc::new(detector), backend, Box::new(IdentityNormalizer))
    }

    #[test]
    fn test_background_run_emits_terminal_finished() {
        let backend = Arc::new(SyntheticBackend::new(40, 30.0, 8, 8));
        let detector = MockDefectDetector::with_detections_at(
            0,
            vec![Detection {
                category_id: 0,
                bbox: BoundingBox {
                    x: 0,
                    y: 0,
                    width: 2,
                    height: 2,
                },
                confidence: 0.9,
            }],
        );
        let analyzer = analyzer(detector, backend.clone());
        let store = MemoryReportStore::new();
        let (sink, rx) = progress_channel();

        let handle = analyzer
            .start_with_store(
                AnalysisRequest::full("in.mp4", "out.mp4"),
                Box::new(store.clone()),
                Arc::new(sink),
            )
            .unwrap();

        let status = handle.wait().unwrap();
        match status {
            RunStatus::Completed { summary, .. } => {
                assert_eq!(summary.frames_written, 40);
                assert_eq!(summary.processed_samples, 2);
            }
            RunStatus::Cancelled => panic!("run should complete"),
        }

        // the last queued event is the terminal one
        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        match last {
            Some(AnalysisEvent::Finished { output_path, summary }) => {
                assert_eq!(output_path, std::path::PathBuf::from("out.mp4"));
                assert_eq!(summary.records_appended, 1);
            }
            other => panic!("expected a finished event, got {other:?}"),
        }
        assert_eq!(store.rows().len(), 1);
        assert!(backend.sink_closed());
    }

    #[test]
    fn test_invalid_request_rejected_before_spawn() {
        let backend = Arc::new(SyntheticBackend::new(10, 30.0, 8, 8));
        let analyzer = analyzer(MockDefectDetector::new(), backend.clone());
        let (sink, _rx) = progress_channel();

        let err = analyzer
            .start_with_store(
                AnalysisRequest::window("in.mp4", "out.mp4", 3, 1),
                Box::new(MemoryReportStore::new()),
                Arc::new(sink),
            )
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidRange { .. }));
        assert_eq!(backend.sources_opened(), 0);
    }

    #[test]
    fn test_failed_run_emits_terminal_failed() {
        let backend = Arc::new(SyntheticBackend::unavailable());
        let analyzer = analyzer(MockDefectDetector::new(), backend);
        let (sink, rx) = progress_channel();

        let handle = analyzer
            .start_with_store(
                AnalysisRequest::full("missing.mp4", "out.mp4"),
                Box::new(MemoryReportStore::new()),
                Arc::new(sink),
            )
            .unwrap();

        assert!(matches!(
            handle.wait(),
            Err(AnalysisError::SourceUnavailable(_))
        ));
        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert!(matches!(last, Some(AnalysisEvent::Failed { .. })));
    }

    #[test]
    fn test_cancelled_run_emits_terminal_cancelled() {
        let backend = Arc::new(SyntheticBackend::new(200_000, 30.0, 8, 8));
        let analyzer = analyzer(MockDefectDetector::new(), backend);
        let (sink, rx) = progress_channel();

        let handle = analyzer
            .start_with_store(
                AnalysisRequest::full("in.mp4", "out.mp4"),
                Box::new(MemoryReportStore::new()),
                Arc::new(sink),
            )
            .unwrap();
        handle.cancel();

        match handle.wait().unwrap() {
            RunStatus::Cancelled => {}
            RunStatus::Completed { .. } => {
                // the run may legitimately win the race on a fast machine;
                // completion without a cancel event is still a clean exit
                return;
            }
        }
        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert!(matches!(last, Some(AnalysisEvent::Cancelled)));
    }
}
