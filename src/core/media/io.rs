use std::path::Path;

use crate::core::analysis::error::AnalysisError;

use super::frame::Frame;

/// Geometry reported by an opened source, fixed for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceGeometry {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub total_frames: u64,
}

impl SourceGeometry {
    /// Nominal media time of a frame index. The pipeline uses this single
    /// timestamp source; decoder-reported positions are never consulted.
    pub fn media_time_ms(&self, frame_index: u64) -> u64 {
        if self.fps <= 0.0 {
            return 0;
        }
        (frame_index as f64 * 1000.0 / self.fps) as u64
    }
}

/// Sequential decoder over an input video.
pub trait FrameSource: Send {
    fn geometry(&self) -> SourceGeometry;

    fn seek(&mut self, frame_index: u64) -> Result<(), AnalysisError>;

    /// Next frame in decode order, or `None` at end of stream.
    fn read_next(&mut self) -> Result<Option<Frame>, AnalysisError>;
}

/// Sequential encoder for the output video.
pub trait FrameSink: Send {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), AnalysisError>;

    fn close(&mut self) -> Result<(), AnalysisError>;
}

/// Opens sources and creates sinks. Keeping both behind one seam lets the
/// pipeline enforce its ordering: the source must open and report geometry
/// before any sink file exists on disk.
pub trait MediaBackend: Send + Sync {
    fn open_source(&self, path: &Path) -> Result<Box<dyn FrameSource>, AnalysisError>;

    fn create_sink(
        &self,
        path: &Path,
        geometry: &SourceGeometry,
    ) -> Result<Box<dyn FrameSink>, AnalysisError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nominal_media_time() {
        let geometry = SourceGeometry {
            fps: 30.0,
            width: 640,
            height: 480,
            total_frames: 600,
        };
        assert_eq!(geometry.media_time_ms(0), 0);
        assert_eq!(geometry.media_time_ms(30), 1_000);
        assert_eq!(geometry.media_time_ms(580), 19_333);
    }

    #[test]
    fn test_zero_fps_does_not_divide() {
        let geometry = SourceGeometry {
            fps: 0.0,
            width: 1,
            height: 1,
            total_frames: 0,
        };
        assert_eq!(geometry.media_time_ms(10), 0);
    }
}
