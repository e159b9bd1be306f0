use std::time::Duration;

/// Decoded RGBA frame plus its position in the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGBA
    pub timestamp: Duration,
    pub frame_index: u64,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>, media_time_ms: u64, frame_index: u64) -> Self {
        Self {
            width,
            height,
            data,
            timestamp: Duration::from_millis(media_time_ms),
            frame_index,
        }
    }

    /// Frame filled with a single value in every channel.
    pub fn filled(width: u32, height: u32, value: u8, media_time_ms: u64, frame_index: u64) -> Self {
        let data = vec![value; (width * height * 4) as usize];
        Self::new(width, height, data, media_time_ms, frame_index)
    }

    pub fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }

    pub fn media_time_ms(&self) -> u64 {
        self.timestamp.as_millis() as u64
    }
}
