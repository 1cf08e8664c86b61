//! Block-sampled luminance to text conversion.

use std::fmt;

use crate::error::{Error, Result};
use crate::raster::Raster;

/// Default 16-step gradient, darkest first.
pub const DEFAULT_PALETTE: [char; 16] = [
    ' ', '.', '\'', ':', '-', '=', '+', '*', '!', '?', 'o', 'x', '%', '#', '&', '@',
];

/// Fixed, ordered set of characters from darkest to lightest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradientPalette {
    chars: Box<[char]>,
}

impl GradientPalette {
    /// Build a palette from `chars`, darkest first.
    ///
    /// Needs at least two characters, all printable ASCII (space allowed).
    /// Newlines would corrupt the row structure of a frame, so they are rejected.
    pub fn new(chars: &str) -> Result<Self> {
        if !chars.chars().all(|c| c == ' ' || c.is_ascii_graphic()) {
            return Err(Error::Config(
                "palette must contain only printable ASCII characters".into(),
            ));
        }
        let chars: Box<[char]> = chars.chars().collect();
        if chars.len() < 2 {
            return Err(Error::Config("palette needs at least two characters".into()));
        }
        Ok(Self { chars })
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn darkest(&self) -> char {
        self.chars[0]
    }

    pub fn lightest(&self) -> char {
        self.chars[self.chars.len() - 1]
    }

    /// `ceil((N-1) * L / 255)`, clamped to the palette.
    pub fn index_for(&self, luma: u8) -> usize {
        let last = self.chars.len() - 1;
        let idx = (last * luma as usize).div_ceil(255);
        idx.min(last)
    }

    pub fn char_for(&self, luma: u8) -> char {
        self.chars[self.index_for(luma)]
    }
}

impl Default for GradientPalette {
    fn default() -> Self {
        Self { chars: Box::new(DEFAULT_PALETTE) }
    }
}

/// One rendered frame: rows of equal width joined by `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiFrame {
    text: String,
    columns: usize,
    rows: usize,
}

impl AsciiFrame {
    /// Wrap text read back from a container record.
    pub fn from_text(text: String) -> Self {
        let (columns, rows) = if text.is_empty() {
            (0, 0)
        } else {
            let columns = text.split('\n').next().map_or(0, |r| r.chars().count());
            (columns, text.split('\n').count())
        };
        Self { text, columns, rows }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n').filter(|_| !self.text.is_empty())
    }
}

impl fmt::Display for AsciiFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Samples one pixel per `block_width` x `block_height` block.
#[derive(Debug, Clone)]
pub struct Rasterizer {
    block_width: u32,
    block_height: u32,
    palette: GradientPalette,
}

impl Rasterizer {
    pub fn new(block_width: u32, block_height: u32, palette: GradientPalette) -> Result<Self> {
        if block_width == 0 || block_height == 0 {
            return Err(Error::Config(format!(
                "block size must be non-zero, got {}x{}",
                block_width, block_height
            )));
        }
        Ok(Self { block_width, block_height, palette })
    }

    pub fn palette(&self) -> &GradientPalette {
        &self.palette
    }

    /// Grid size produced for a `width` x `height` raster, as (columns, rows).
    pub fn grid_size(&self, width: u32, height: u32) -> (u32, u32) {
        (width.div_ceil(self.block_width), height.div_ceil(self.block_height))
    }

    /// Render `raster` as text.
    ///
    /// Cell `(r, c)` takes the luminance of the pixel at the centre of its
    /// block, clamped to the last row/column for partial blocks. There is no
    /// averaging.
    pub fn rasterize<R: Raster + ?Sized>(&self, raster: &R) -> Result<AsciiFrame> {
        let (w, h) = (raster.width(), raster.height());
        if w == 0 || h == 0 {
            return Err(Error::decode(format!("empty raster ({}x{})", w, h)));
        }
        let (columns, rows) = self.grid_size(w, h);
        let (bw, bh) = (self.block_width, self.block_height);

        let mut text = String::with_capacity((columns as usize + 1) * rows as usize);
        for r in 0..rows {
            if r > 0 {
                text.push('\n');
            }
            let y = (r * bh + bh / 2).min(h - 1);
            for c in 0..columns {
                let x = (c * bw + bw / 2).min(w - 1);
                text.push(self.palette.char_for(raster.luminance(x, y)));
            }
        }

        Ok(AsciiFrame { text, columns: columns as usize, rows: rows as usize })
    }
}
