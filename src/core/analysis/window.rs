//! Converts the requested analysis range into absolute frame indices.

use super::error::AnalysisError;

/// Half-open window of decoder frame indices, derived once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameIndexRange {
    pub start: u64,
    pub end: u64,
}

impl FrameIndexRange {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Resolves minutes into `[start, end)` frame indices, clamped to the
/// source length. Fails when the requested window is inverted.
pub fn resolve(
    full_range: bool,
    start_minute: u32,
    end_minute: u32,
    fps: f64,
    total_frames: u64,
) -> Result<FrameIndexRange, AnalysisError> {
    if full_range {
        return Ok(FrameIndexRange {
            start: 0,
            end: total_frames,
        });
    }

    let to_frame = |minute: u32| (f64::from(minute) * 60.0 * fps) as u64;
    let start = to_frame(start_minute).min(total_frames);
    let end = to_frame(end_minute).min(total_frames);

    if start > end {
        return Err(AnalysisError::InvalidRange {
            start_minute,
            end_minute,
        });
    }

    Ok(FrameIndexRange { start, end })
}
