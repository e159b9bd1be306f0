//! In-memory source and sink implementations, for tests and dry runs.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::core::analysis::error::AnalysisError;

use super::frame::Frame;
use super::io::{FrameSink, FrameSource, MediaBackend, SourceGeometry};

/// Source that produces flat frames whose fill value encodes the frame
/// index, so tests can tell frames apart by content.
pub struct SyntheticFrameSource {
    geometry: SourceGeometry,
    position: u64,
}

impl SyntheticFrameSource {
    pub fn new(total_frames: u64, fps: f64, width: u32, height: u32) -> Self {
        Self {
            geometry: SourceGeometry {
                fps,
                width,
                height,
                total_frames,
            },
            position: 0,
        }
    }
}

impl FrameSource for SyntheticFrameSource {
    fn geometry(&self) -> SourceGeometry {
        self.geometry
    }

    fn seek(&mut self, frame_index: u64) -> Result<(), AnalysisError> {
        self.position = frame_index.min(self.geometry.total_frames);
        Ok(())
    }

    fn read_next(&mut self) -> Result<Option<Frame>, AnalysisError> {
        if self.position >= self.geometry.total_frames {
            return Ok(None);
        }
        let index = self.position;
        self.position += 1;
        let fill = (index % 251) as u8;
        Ok(Some(Frame::filled(
            self.geometry.width,
            self.geometry.height,
            fill,
            self.geometry.media_time_ms(index),
            index,
        )))
    }
}

/// Sink that records every written frame behind a shared handle.
pub struct MemoryFrameSink {
    frames: Arc<Mutex<Vec<Frame>>>,
    closed: Arc<AtomicBool>,
}

impl FrameSink for MemoryFrameSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), AnalysisError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AnalysisError::SinkWrite("sink already closed".to_string()));
        }
        self.frames.lock().unwrap().push(frame.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), AnalysisError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Backend over the synthetic source and memory sink. Tracks how many
/// sources were opened and sinks created so tests can assert the
/// fail-fast ordering.
pub struct SyntheticBackend {
    total_frames: u64,
    fps: f64,
    width: u32,
    height: u32,
    source_available: bool,
    written: Arc<Mutex<Vec<Frame>>>,
    sink_closed: Arc<AtomicBool>,
    sources_opened: AtomicU32,
    sinks_created: AtomicU32,
}

impl SyntheticBackend {
    pub fn new(total_frames: u64, fps: f64, width: u32, height: u32) -> Self {
        Self {
            total_frames,
            fps,
            width,
            height,
            source_available: true,
            written: Arc::new(Mutex::new(Vec::new())),
            sink_closed: Arc::new(AtomicBool::new(false)),
            sources_opened: AtomicU32::new(0),
            sinks_created: AtomicU32::new(0),
        }
    }

    /// Backend whose source cannot be opened.
    pub fn unavailable() -> Self {
        let mut backend = Self::new(0, 0.0, 0, 0);
        backend.source_available = false;
        backend
    }

    pub fn written_frames(&self) -> Vec<Frame> {
        self.written.lock().unwrap().clone()
    }

    pub fn sink_closed(&self) -> bool {
        self.sink_closed.load(Ordering::SeqCst)
    }

    pub fn sources_opened(&self) -> u32 {
        self.sources_opened.load(Ordering::SeqCst)
    }

    pub fn sinks_created(&self) -> u32 {
        self.sinks_created.load(Ordering::SeqCst)
    }
}

impl MediaBackend for SyntheticBackend {
    fn open_source(&self, path: &Path) -> Result<Box<dyn FrameSource>, AnalysisError> {
        if !self.source_available {
            return Err(AnalysisError::SourceUnavailable(path.display().to_string()));
        }
        self.sources_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SyntheticFrameSource::new(
            self.total_frames,
            self.fps,
            self.width,
            self.height,
        )))
    }

    fn create_sink(
        &self,
        _path: &Path,
        _geometry: &SourceGeometry,
    ) -> Result<Box<dyn FrameSink>, AnalysisError> {
        self.sinks_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryFrameSink {
            frames: self.written.clone(),
            closed: self.sink_closed.clone(),
        }))
    }
}
