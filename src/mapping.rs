//! Brightness to character mapping.

use image::GrayImage;

use crate::error::ConfigError;

/// Glyphs ordered from least to most visually dense.
pub const DEFAULT_RAMP: &str = " .,:;!coOC#@";

/// An ordered, non-empty set of ASCII glyphs used to encode brightness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ramp {
    glyphs: Vec<u8>,
}

impl Ramp {
    /// Build a ramp from `chars`, which must be non-empty ASCII.
    pub fn new(chars: &str) -> Result<Self, ConfigError> {
        if chars.is_empty() {
            return Err(ConfigError::EmptyRamp);
        }
        if !chars.is_ascii() {
            return Err(ConfigError::NonAsciiRamp);
        }
        Ok(Self {
            glyphs: chars.as_bytes().to_vec(),
        })
    }

    /// Number of glyphs.
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Always false; construction rejects empty ramps.
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Linear index into the ramp: `floor(luma / 255 * (len - 1))`.
    #[inline]
    pub fn index(&self, luma: u8) -> usize {
        let last = self.glyphs.len() - 1;
        (luma as usize * last) / 255
    }

    /// Glyph for one luminance sample.
    #[inline]
    pub fn glyph(&self, luma: u8) -> char {
        self.glyphs[self.index(luma)] as char
    }

    /// The glyphs as a string, densest last.
    pub fn as_str(&self) -> &str {
        // Bytes came from a validated ASCII &str.
        std::str::from_utf8(&self.glyphs).unwrap_or_default()
    }
}

impl Default for Ramp {
    fn default() -> Self {
        Self {
            glyphs: DEFAULT_RAMP.as_bytes().to_vec(),
        }
    }
}

/// One frame worth of glyphs, row-major, without line breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiFrame {
    pub text: String,
    pub width: u32,
    pub height: u32,
}

impl AsciiFrame {
    /// Iterate over the frame's rows, each exactly `width` glyphs long.
    pub fn rows(&self) -> impl Iterator<Item = &str> {
        let width = self.width.max(1) as usize;
        // Ramps are ASCII, so byte offsets are char offsets.
        (0..self.height as usize).map(move |row| &self.text[row * width..(row + 1) * width])
    }
}

/// Map every luminance sample to a glyph, flattening the grid row by row.
pub fn map_frame(frame: &GrayImage, ramp: &Ramp) -> AsciiFrame {
    let (width, height) = frame.dimensions();
    let mut text = String::with_capacity(width as usize * height as usize);
    for px in frame.pixels() {
        text.push(ramp.glyph(px[0]));
    }
    AsciiFrame {
        text,
        width,
        height,
    }
}
