//! Illumination flattening applied to each sampled frame before detection.

use image::RgbaImage;
use rayon::prelude::*;

use crate::core::media::Frame;

pub trait FrameNormalizer: Send + Sync {
    /// Returns a corrected frame with identical dimensions.
    fn normalize(&self, frame: &Frame) -> Frame;
}

/// Pass-through, for detectors trained on raw footage and for tests.
pub struct IdentityNormalizer;

impl FrameNormalizer for IdentityNormalizer {
    fn normalize(&self, frame: &Frame) -> Frame {
        frame.clone()
    }
}

/// Flat-field correction: per channel, subtracts a gaussian-blurred
/// background and re-centers on that background's mean. Flattens the
/// uneven lighting typical of road footage so surface texture stands out.
pub struct FlatFieldNormalizer {
    sigma: f32,
}

impl FlatFieldNormalizer {
    pub fn new() -> Self {
        Self { sigma: 40.0 }
    }

    pub fn with_sigma(sigma: f32) -> Self {
        Self { sigma }
    }
}

impl Default for FlatFieldNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameNormalizer for FlatFieldNormalizer {
    fn normalize(&self, frame: &Frame) -> Frame {
        let pixels = frame.pixel_count() as u64;
        if pixels == 0 {
            return frame.clone();
        }
        let img = match RgbaImage::from_raw(frame.width, frame.height, frame.data.clone()) {
            Some(img) => img,
            None => return frame.clone(),
        };

        let background = image::imageops::blur(&img, self.sigma).into_raw();

        let mut channel_sums = [0u64; 3];
        for pixel in background.chunks_exact(4) {
            for channel in 0..3 {
                channel_sums[channel] += u64::from(pixel[channel]);
            }
        }
        let channel_means = channel_sums.map(|sum| (sum / pixels) as i32);

        let row_bytes = frame.width as usize * 4;
        let src = &frame.data;
        let mut corrected = vec![0u8; src.len()];
        corrected
            .par_chunks_mut(row_bytes)
            .enumerate()
            .for_each(|(row_index, row)| {
                let base = row_index * row_bytes;
                for x in 0..frame.width as usize {
                    let offset = x * 4;
                    let idx = base + offset;
                    for channel in 0..3 {
                        let value = i32::from(src[idx + channel])
                            - i32::from(background[idx + channel])
                            + channel_means[channel];
                        row[offset + channel] = value.clamp(0, 255) as u8;
                    }
                    row[offset + 3] = src[idx + 3];
                }
            });

        Frame {
            width: frame.width,
            height: frame.height,
            data: corrected,
            timestamp: frame.timestamp,
            frame_index: frame.frame_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_passes_through() {
        let frame = Frame::filled(8, 8, 77, 100, 3);
        let out = IdentityNormalizer.normalize(&frame);
        assert_eq!(out, frame);
    }

    #[test]
    fn test_flat_field_preserves_uniform_frame() {
        // A flat frame is its own background: corrected = v - v + mean(v) = v.
        let frame = Frame::filled(16, 16, 120, 0, 0);
        let out = FlatFieldNormalizer::with_sigma(3.0).normalize(&frame);
        assert_eq!(out.width, frame.width);
        assert_eq!(out.height, frame.height);
        assert_eq!(out.data, frame.data);
    }

    #[test]
    fn test_flat_field_keeps_dimensions_and_alpha() {
        let mut frame = Frame::filled(12, 10, 0, 0, 0);
        for (i, value) in frame.data.iter_mut().enumerate() {
            *value = if i % 4 == 3 { 200 } else { (i % 256) as u8 };
        }
        let out = FlatFieldNormalizer::with_sigma(2.0).normalize(&frame);
        assert_eq!(out.data.len(), frame.data.len());
        for (i, value) in out.data.iter().enumerate() {
            if i % 4 == 3 {
                assert_eq!(*value, 200);
            }
        }
        assert_eq!(out.frame_index, frame.frame_index);
        assert_eq!(out.timestamp, frame.timestamp);
    }

    #[test]
    fn test_flat_field_handles_empty_frame() {
        let frame = Frame::new(0, 0, Vec::new(), 0, 0);
        let out = FlatFieldNormalizer::new().normalize(&frame);
        assert_eq!(out.data.len(), 0);
    }
}
