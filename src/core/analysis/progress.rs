//! Progress fan-out to the presentation layer. The pipeline hands owned
//! copies across this boundary and never blocks on a slow observer.

use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::core::media::Frame;

use super::category::CategoryCounts;
use super::dispatcher::SampleResult;
use super::pipeline::{PipelineRunState, RunSummary};

/// Snapshot sent after every sampled frame.
#[derive(Debug, Clone)]
pub struct SampleUpdate {
    pub annotated: Option<Frame>,
    pub raw: Frame,
    pub percent: f64,
    pub counts: CategoryCounts,
}

#[derive(Debug, Clone)]
pub enum AnalysisEvent {
    Sample(SampleUpdate),
    Finished {
        output_path: PathBuf,
        summary: RunSummary,
    },
    Failed {
        message: String,
    },
    Cancelled,
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: AnalysisEvent);
}

/// Sink that delivers nowhere, for headless runs.
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn on_event(&self, _event: AnalysisEvent) {}
}

const PROGRESS_QUEUE_DEPTH: usize = 4;

/// Bounded channel sink with a latest-wins policy: when the observer lags,
/// the oldest queued update is dropped so the newest always lands. A UI
/// only needs the most recent state, so coalescing superseded updates is
/// acceptable; terminal events are emitted last and are never the ones
/// displaced.
pub struct CoalescingSink {
    tx: Sender<AnalysisEvent>,
    rx: Receiver<AnalysisEvent>,
}

/// Creates the sink plus the receiver a presentation thread drains.
pub fn progress_channel() -> (CoalescingSink, Receiver<AnalysisEvent>) {
    let (tx, rx) = bounded(PROGRESS_QUEUE_DEPTH);
    (
        CoalescingSink {
            tx,
            rx: rx.clone(),
        },
        rx,
    )
}

impl ProgressSink for CoalescingSink {
    fn on_event(&self, event: AnalysisEvent) {
        let mut event = event;
        loop {
            match self.tx.try_send(event) {
                Ok(()) => return,
                Err(TrySendError::Full(returned)) => {
                    let _ = self.rx.try_recv();
                    event = returned;
                }
                // the observer went away; the pipeline keeps running
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}

/// Computes the completion percentage and forwards sample snapshots.
/// Percent is clamped to `[0, 100]` and never decreases within a run.
pub struct ProgressReporter {
    sink: Arc<dyn ProgressSink>,
    last_percent: f64,
}

impl ProgressReporter {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            sink,
            last_percent: 0.0,
        }
    }

    pub fn report_sample(&mut self, sample: Option<&SampleResult>, raw: &Frame, state: &PipelineRunState) {
        let total = state.total_samplable_frames.max(1);
        let mut percent = 100.0 * state.processed_samples as f64 / total as f64;
        percent = percent.clamp(0.0, 100.0).max(self.last_percent);
        self.last_percent = percent;

        self.sink.on_event(AnalysisEvent::Sample(SampleUpdate {
            annotated: sample.and_then(|sample| sample.annotated.clone()),
            raw: raw.clone(),
            percent,
            counts: state.last_counts,
        }));
    }
}
