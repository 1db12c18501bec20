//! Video frame types and JPEG / data-URI codec

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, ImageReader, Limits, Rgb};
use std::io::Cursor;

use crate::{unix_time_ns, CameraError};

/// JPEG quality used for frames sent to the detection service.
/// Coarse EAR estimation tolerates lossy compression, payload size matters more.
pub const DEFAULT_JPEG_QUALITY: u8 = 60;

/// Largest width or height accepted when decoding an uploaded frame
pub const MAX_DECODE_DIMENSION: u32 = 4096;

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds since the Unix epoch)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        self.data
            .get(idx..idx + 3)
            .map(|p| [p[0], p[1], p[2]])
    }

    /// Resize frame (nearest neighbour)
    pub fn resize(&self, new_width: u32, new_height: u32) -> VideoFrame {
        let mut resized = Vec::with_capacity((new_width * new_height * 3) as usize);

        let x_ratio = self.width as f32 / new_width.max(1) as f32;
        let y_ratio = self.height as f32 / new_height.max(1) as f32;

        for y in 0..new_height {
            for x in 0..new_width {
                let src_x = (x as f32 * x_ratio).floor() as u32;
                let src_y = (y as f32 * y_ratio).floor() as u32;

                let pixel = self
                    .get_pixel(
                        src_x.min(self.width.saturating_sub(1)),
                        src_y.min(self.height.saturating_sub(1)),
                    )
                    .unwrap_or([0, 0, 0]);
                resized.extend_from_slice(&pixel);
            }
        }

        VideoFrame {
            data: resized,
            width: new_width,
            height: new_height,
            timestamp_ns: self.timestamp_ns,
            sequence: self.sequence,
        }
    }

    /// Compress the frame to JPEG at the given quality
    pub fn encode_jpeg(&self, quality: u8) -> Result<EncodedFrame, CameraError> {
        let img = ImageBuffer::<Rgb<u8>, _>::from_raw(self.width, self.height, &self.data[..])
            .ok_or_else(|| {
                CameraError::Format(format!(
                    "buffer of {} bytes does not hold a {}x{} RGB frame",
                    self.data.len(),
                    self.width,
                    self.height
                ))
            })?;

        let mut bytes = Vec::with_capacity(self.data.len() / 8);
        JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
            .encode_image(&img)
            .map_err(|e| CameraError::Codec(e.to_string()))?;

        Ok(EncodedFrame {
            width: self.width,
            height: self.height,
            bytes,
            mime: "image/jpeg",
            captured_at_ns: self.timestamp_ns,
            sequence: self.sequence,
        })
    }
}

/// Compressed frame, ready to be sent to the detection service
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub width: u32,
    pub height: u32,
    /// Encoded image bytes
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`
    pub mime: &'static str,
    /// Capture timestamp (nanoseconds since the Unix epoch)
    pub captured_at_ns: u64,
    pub sequence: u32,
}

impl EncodedFrame {
    /// Self-describing `data:<mime>;base64,<payload>` form
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

/// Decode a `data:<mime>;base64,<payload>` image into an RGB frame
pub fn decode_data_uri(uri: &str) -> Result<VideoFrame, CameraError> {
    decode_data_uri_within(uri, MAX_DECODE_DIMENSION)
}

/// Like [`decode_data_uri`], refusing images wider or taller than
/// `max_dimension` before any pixel buffer is allocated
pub fn decode_data_uri_within(uri: &str, max_dimension: u32) -> Result<VideoFrame, CameraError> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| CameraError::Format("data URI has no ',' separator".into()))?;

    if !header.starts_with("data:") || !header.ends_with(";base64") {
        return Err(CameraError::Format(format!(
            "unsupported data URI header '{}'",
            header
        )));
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| CameraError::Format(format!("invalid base64 payload: {}", e)))?;

    let mut limits = Limits::default();
    limits.max_image_width = Some(max_dimension);
    limits.max_image_height = Some(max_dimension);

    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CameraError::Codec(e.to_string()))?;
    reader.limits(limits);

    let rgb = reader
        .decode()
        .map_err(|e| CameraError::Codec(e.to_string()))?
        .to_rgb8();
    let (width, height) = rgb.dimensions();

    Ok(VideoFrame::new(rgb.into_raw(), width, height, unix_time_ns(), 0))
}
