//! Caller-owned pixel buffers and the polarity-aware luminance sampler.

use image::{DynamicImage, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::SectorError;

/// Spot polarity: which side of the brightness threshold counts as a spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Spots are darker than the background.
    #[default]
    Dark,
    /// Spots are brighter than the background.
    Light,
}

impl Polarity {
    /// Whether a luminance value is on the spot side of `threshold`.
    #[inline]
    pub fn is_target(self, luminance: f64, threshold: f64) -> bool {
        match self {
            Self::Dark => luminance < threshold,
            Self::Light => luminance > threshold,
        }
    }

    /// Map luminance to a signal where spots are always the bright side.
    #[inline]
    pub fn signal(self, luminance: f64) -> f64 {
        match self {
            Self::Dark => 255.0 - luminance,
            Self::Light => luminance,
        }
    }
}

/// Rec.601 luma of an RGB triple, in [0, 255].
#[inline]
pub fn luminance(rgb: [u8; 3]) -> f64 {
    0.299 * rgb[0] as f64 + 0.587 * rgb[1] as f64 + 0.114 * rgb[2] as f64
}

/// Row-major RGB or RGBA pixel data.
///
/// The core only reads buffers it is given; the remapper allocates a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw bytes, validating the channel count and length.
    pub fn new(
        width: u32,
        height: u32,
        channels: usize,
        data: Vec<u8>,
    ) -> Result<Self, SectorError> {
        if channels != 3 && channels != 4 {
            return Err(SectorError::UnsupportedChannels(channels));
        }
        if data.len() != width as usize * height as usize * channels {
            return Err(SectorError::InvalidBuffer {
                width,
                height,
                channels,
                len: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Fully transparent RGBA buffer.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            channels: 4,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Uniform RGB buffer.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let n = width as usize * height as usize;
        let mut data = Vec::with_capacity(n * 3);
        for _ in 0..n {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            channels: 3,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Number of pixels.
    pub fn len_pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.channels
    }

    /// RGB of pixel (x, y); panics when out of bounds.
    #[inline]
    pub fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        let o = self.offset(x, y);
        [self.data[o], self.data[o + 1], self.data[o + 2]]
    }

    /// RGBA of pixel (x, y); RGB buffers report alpha 255.
    #[inline]
    pub fn rgba(&self, x: u32, y: u32) -> [u8; 4] {
        let o = self.offset(x, y);
        let a = if self.channels == 4 {
            self.data[o + 3]
        } else {
            255
        };
        [self.data[o], self.data[o + 1], self.data[o + 2], a]
    }

    /// Luminance of pixel (x, y).
    #[inline]
    pub fn luminance(&self, x: u32, y: u32) -> f64 {
        luminance(self.rgb(x, y))
    }

    /// Luminance of every pixel in row-major order.
    pub fn luminance_plane(&self) -> Vec<f64> {
        self.data
            .chunks_exact(self.channels)
            .map(|px| luminance([px[0], px[1], px[2]]))
            .collect()
    }

    /// Composite onto an opaque `background`, yielding an RGB buffer.
    pub fn flatten(&self, background: [u8; 3]) -> PixelBuffer {
        let mut data = Vec::with_capacity(self.len_pixels() * 3);
        for px in self.data.chunks_exact(self.channels) {
            let a = if self.channels == 4 { px[3] as u32 } else { 255 };
            for c in 0..3 {
                let v = (px[c] as u32 * a + background[c] as u32 * (255 - a) + 127) / 255;
                data.push(v as u8);
            }
        }
        PixelBuffer {
            width: self.width,
            height: self.height,
            channels: 3,
            data,
        }
    }

    /// Copy into an owned `image::RgbaImage`.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut out = RgbaImage::new(self.width, self.height);
        for (x, y, p) in out.enumerate_pixels_mut() {
            p.0 = self.rgba(x, y);
        }
        out
    }
}

impl From<&RgbImage> for PixelBuffer {
    fn from(img: &RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            channels: 3,
            data: img.as_raw().clone(),
        }
    }
}

impl From<&RgbaImage> for PixelBuffer {
    fn from(img: &RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            channels: 4,
            data: img.as_raw().clone(),
        }
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            channels: 4,
            data: img.into_raw(),
        }
    }
}

impl From<&DynamicImage> for PixelBuffer {
    fn from(img: &DynamicImage) -> Self {
        match img {
            DynamicImage::ImageRgb8(rgb) => rgb.into(),
            DynamicImage::ImageRgba8(rgba) => rgba.into(),
            other => other.to_rgba8().into(),
        }
    }
}
