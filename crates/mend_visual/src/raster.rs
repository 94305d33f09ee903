//! RGBA rasters and PNG decoding.

use png::{ColorType, Decoder, Transformations};
use tracing::debug;

use crate::error::{VisualError, VisualResult};

/// An 8-bit RGBA image, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    rgba: Vec<u8>,
}

impl Raster {
    /// Wrap raw RGBA bytes; the length must be `width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> VisualResult<Self> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(VisualError::RasterSize {
                width,
                height,
                expected,
                actual: rgba.len(),
            });
        }
        Ok(Self { width, height, rgba })
    }

    /// A raster filled with one color.
    pub fn filled(width: u32, height: u32, pixel: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut rgba = Vec::with_capacity(count * 4);
        for _ in 0..count {
            rgba.extend_from_slice(&pixel);
        }
        Self { width, height, rgba }
    }

    /// Decode a PNG of any bit depth and color type into RGBA8.
    pub fn decode_png(bytes: &[u8]) -> VisualResult<Self> {
        let mut decoder = Decoder::new(bytes);
        decoder.set_transformations(Transformations::normalize_to_color8());
        let mut reader = decoder.read_info()?;
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf)?;
        let data = &buf[..info.buffer_size()];

        let rgba: Vec<u8> = match info.color_type {
            ColorType::Rgba => data.to_vec(),
            ColorType::Rgb => data
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect(),
            ColorType::Grayscale => data.iter().flat_map(|&g| [g, g, g, 255]).collect(),
            ColorType::GrayscaleAlpha => data
                .chunks_exact(2)
                .flat_map(|p| [p[0], p[0], p[0], p[1]])
                .collect(),
            other => return Err(VisualError::UnsupportedColor(format!("{:?}", other))),
        };

        debug!("Decoded {}x{} screenshot ({:?})", info.width, info.height, info.color_type);
        Self::from_rgba(info.width, info.height, rgba)
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Pixels as `[r, g, b, a]`.
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.rgba.chunks_exact(4)
    }

    /// Set one pixel; out-of-range coordinates are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        self.rgba[offset..offset + 4].copy_from_slice(&pixel);
    }

    /// Encode as an RGBA PNG.
    pub fn encode_png(&self) -> VisualResult<Vec<u8>> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.rgba)?;
        }
        Ok(out)
    }
}
