//! Defect detector seam. The model itself lives outside this crate; the
//! pipeline only needs classified detections and an annotated frame back.

use thiserror::Error;

use crate::core::media::Frame;

use super::category::DefectCategory;

#[derive(Debug, Error)]
#[error("defect detector failed: {0}")]
pub struct DetectorError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One classified detection as reported by the model.
#[derive(Debug, Clone)]
pub struct Detection {
    pub category_id: u32,
    pub bbox: BoundingBox,
    pub confidence: f32,
}

pub trait DefectDetector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, DetectorError>;

    /// Draw detections onto a copy of the frame. Detectors that plot
    /// their own overlays should override this.
    fn render(&self, frame: &Frame, detections: &[Detection]) -> Frame {
        draw_overlays(frame, detections)
    }
}

const BORDER_PX: u32 = 2;

fn category_color(category_id: u32) -> [u8; 3] {
    match DefectCategory::from_id(category_id) {
        Some(DefectCategory::Pothole) => [220, 40, 40],
        Some(DefectCategory::AlligatorCracking) => [240, 150, 30],
        Some(DefectCategory::Crack) => [230, 220, 50],
        None => [160, 160, 160],
    }
}

/// Fallback overlay renderer: a colored box border per detection.
pub fn draw_overlays(frame: &Frame, detections: &[Detection]) -> Frame {
    let mut out = frame.clone();
    for detection in detections {
        draw_box(&mut out, &detection.bbox, category_color(detection.category_id));
    }
    out
}

fn draw_box(frame: &mut Frame, bbox: &BoundingBox, color: [u8; 3]) {
    let x0 = bbox.x.min(frame.width);
    let y0 = bbox.y.min(frame.height);
    let x1 = bbox.x.saturating_add(bbox.width).min(frame.width);
    let y1 = bbox.y.saturating_add(bbox.height).min(frame.height);

    for y in y0..y1 {
        for x in x0..x1 {
            let on_border = x < x0 + BORDER_PX
                || x >= x1.saturating_sub(BORDER_PX)
                || y < y0 + BORDER_PX
                || y >= y1.saturating_sub(BORDER_PX);
            if !on_border {
                continue;
            }
            let idx = ((y * frame.width + x) * 4) as usize;
            frame.data[idx] = color[0];
            frame.data[idx + 1] = color[1];
            frame.data[idx + 2] = color[2];
            frame.data[idx + 3] = 255;
        }
    }
}

type DetectionPattern = Box<dyn Fn(u64) -> Vec<Detection> + Send + Sync>;
type FailurePattern = Box<dyn Fn(u64) -> bool + Send + Sync>;

/// Scripted detector for tests: detections per frame index, plus an
/// optional failure schedule.
pub struct MockDefectDetector {
    pattern: Option<DetectionPattern>,
    fail_on: Option<FailurePattern>,
}

impl MockDefectDetector {
    /// Detector that never reports anything.
    pub fn new() -> Self {
        Self {
            pattern: None,
            fail_on: None,
        }
    }

    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(u64) -> Vec<Detection> + Send + Sync + 'static,
    {
        Self {
            pattern: Some(Box::new(pattern)),
            fail_on: None,
        }
    }

    /// Fixed detections reported at exactly one frame index.
    pub fn with_detections_at(frame_index: u64, detections: Vec<Detection>) -> Self {
        Self::with_pattern(move |index| {
            if index == frame_index {
                detections.clone()
            } else {
                Vec::new()
            }
        })
    }

    pub fn failing_when<F>(fail_on: F) -> Self
    where
        F: Fn(u64) -> bool + Send + Sync + 'static,
    {
        Self {
            pattern: None,
            fail_on: Some(Box::new(fail_on)),
        }
    }
}

impl Default for MockDefectDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl DefectDetector for MockDefectDetector {
    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, DetectorError> {
        if let Some(fail_on) = &self.fail_on {
            if fail_on(frame.frame_index) {
                return Err(DetectorError(format!(
                    "scripted failure at frame {}",
                    frame.frame_index
                )));
            }
        }
        Ok(self
            .pattern
            .as_ref()
            .map(|pattern| pattern(frame.frame_index))
            .unwrap_or_default())
    }
}
