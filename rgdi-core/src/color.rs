//! Colour conversion from protocol colour depths to local pixels.
//!
//! Local surfaces store one `u32` per pixel laid out as `0x00RRGGBB`.
//! Protocol colours arrive at the session's source depth:
//!
//! | bpp | order colour                 | pixel data (little-endian)   |
//! |-----|------------------------------|------------------------------|
//! | 8   | palette index                | palette index                |
//! | 15  | RGB555                       | RGB555                       |
//! | 16  | RGB565                       | RGB565                       |
//! | 24  | `0x00BBGGRR` (R, G, B bytes) | B, G, R                      |
//! | 32  | `0x00BBGGRR` (R, G, B bytes) | B, G, R, X                   |

use serde::{Deserialize, Serialize};

use crate::error::GdiError;

/// Bits of a local pixel that carry colour.
pub const PIXEL_MASK: u32 = 0x00FF_FFFF;

/// Pack 8-bit channels into a local pixel.
pub const fn rgb(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

// ── ColorDepth ───────────────────────────────────────────────────

/// Colour depths the protocol can negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorDepth {
    Bpp8,
    Bpp15,
    Bpp16,
    Bpp24,
    Bpp32,
}

impl ColorDepth {
    pub fn from_bpp(bpp: u8) -> Result<Self, GdiError> {
        match bpp {
            8 => Ok(ColorDepth::Bpp8),
            15 => Ok(ColorDepth::Bpp15),
            16 => Ok(ColorDepth::Bpp16),
            24 => Ok(ColorDepth::Bpp24),
            32 => Ok(ColorDepth::Bpp32),
            other => Err(GdiError::UnsupportedColorDepth(other)),
        }
    }

    /// Bytes a single pixel occupies in packed pixel data.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            ColorDepth::Bpp8 => 1,
            ColorDepth::Bpp15 | ColorDepth::Bpp16 => 2,
            ColorDepth::Bpp24 => 3,
            ColorDepth::Bpp32 => 4,
        }
    }
}

// ── Palette ──────────────────────────────────────────────────────

/// One palette slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

/// The session palette used at 8 bpp. Indices past the end map to black.
#[derive(Debug, Clone, Default)]
pub struct Palette {
    entries: Vec<PaletteEntry>,
}

impl Palette {
    pub fn new(entries: Vec<PaletteEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, index: u8) -> u32 {
        self.entries
            .get(index as usize)
            .map(|e| rgb(e.red, e.green, e.blue))
            .unwrap_or(0)
    }
}

// ── ColorContext ─────────────────────────────────────────────────

/// Source depth plus the active palette.
#[derive(Debug, Clone)]
pub struct ColorContext {
    depth: ColorDepth,
    palette: Palette,
}

impl ColorContext {
    pub fn new(depth: ColorDepth) -> Self {
        Self {
            depth,
            palette: Palette::default(),
        }
    }

    pub fn depth(&self) -> ColorDepth {
        self.depth
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Replace the palette wholesale.
    pub fn set_palette(&mut self, entries: Vec<PaletteEntry>) {
        self.palette = Palette::new(entries);
    }

    /// Convert an order colour (pen, fill, brush fore/back) at the
    /// session depth.
    pub fn convert(&self, color: u32) -> u32 {
        match self.depth {
            ColorDepth::Bpp8 => self.palette.lookup(color as u8),
            ColorDepth::Bpp15 => expand_rgb555(color as u16),
            ColorDepth::Bpp16 => expand_rgb565(color as u16),
            ColorDepth::Bpp24 | ColorDepth::Bpp32 => {
                let [r, g, b, _] = color.to_le_bytes();
                rgb(r, g, b)
            }
        }
    }

    /// Convert packed pixel data at `bpp` into local pixels.
    ///
    /// `data` must hold at least `width * height` pixels.
    pub fn convert_pixels(
        &self,
        data: &[u8],
        bpp: u8,
        width: u32,
        height: u32,
    ) -> Result<Vec<u32>, GdiError> {
        let depth = ColorDepth::from_bpp(bpp)?;
        let step = depth.bytes_per_pixel();
        let count = width as usize * height as usize;
        let needed = count * step;
        if data.len() < needed {
            return Err(GdiError::malformed(format!(
                "pixel data too short: {} < {needed}",
                data.len()
            )));
        }

        let out = data[..needed]
            .chunks_exact(step)
            .map(|px| match depth {
                ColorDepth::Bpp8 => self.palette.lookup(px[0]),
                ColorDepth::Bpp15 => expand_rgb555(u16::from_le_bytes([px[0], px[1]])),
                ColorDepth::Bpp16 => expand_rgb565(u16::from_le_bytes([px[0], px[1]])),
                ColorDepth::Bpp24 | ColorDepth::Bpp32 => rgb(px[2], px[1], px[0]),
            })
            .collect();
        Ok(out)
    }
}

fn expand_rgb555(v: u16) -> u32 {
    let r = ((v >> 10) & 0x1F) as u8;
    let g = ((v >> 5) & 0x1F) as u8;
    let b = (v & 0x1F) as u8;
    rgb(expand5(r), expand5(g), expand5(b))
}

fn expand_rgb565(v: u16) -> u32 {
    let r = ((v >> 11) & 0x1F) as u8;
    let g = ((v >> 5) & 0x3F) as u8;
    let b = (v & 0x1F) as u8;
    rgb(expand5(r), (g << 2) | (g >> 4), expand5(b))
}

fn expand5(c: u8) -> u8 {
    (c << 3) | (c >> 2)
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_colour_24bpp_swaps_channels() {
        let ctx = ColorContext::new(ColorDepth::Bpp24);
        // R=0x11, G=0x22, B=0x33 read little-endian.
        assert_eq!(ctx.convert(0x0033_2211), 0x0011_2233);
    }

    #[test]
    fn order_colour_16bpp_expands() {
        let ctx = ColorContext::new(ColorDepth::Bpp16);
        assert_eq!(ctx.convert(0xF800), 0x00FF_0000);
        assert_eq!(ctx.convert(0x07E0), 0x0000_FF00);
        assert_eq!(ctx.convert(0x001F), 0x0000_00FF);
    }

    #[test]
    fn order_colour_15bpp_expands() {
        let ctx = ColorContext::new(ColorDepth::Bpp15);
        assert_eq!(ctx.convert(0x7C00), 0x00FF_0000);
    }

    #[test]
    fn palette_is_replaced_wholesale() {
        let mut ctx = ColorContext::new(ColorDepth::Bpp8);
        assert_eq!(ctx.convert(1), 0);
        ctx.set_palette(vec![
            PaletteEntry::default(),
            PaletteEntry { red: 0xFF, green: 0, blue: 0x80 },
        ]);
        assert_eq!(ctx.convert(1), 0x00FF_0080);
        ctx.set_palette(vec![PaletteEntry::default()]);
        assert_eq!(ctx.palette().len(), 1);
        assert_eq!(ctx.convert(1), 0);
    }

    #[test]
    fn pixel_data_is_bgr() {
        let ctx = ColorContext::new(ColorDepth::Bpp32);
        let px = ctx.convert_pixels(&[0x33, 0x22, 0x11, 0xFF], 32, 1, 1).unwrap();
        assert_eq!(px, vec![0x0011_2233]);
    }

    #[test]
    fn short_pixel_data_is_rejected() {
        let ctx = ColorContext::new(ColorDepth::Bpp24);
        assert!(matches!(
            ctx.convert_pixels(&[0; 5], 24, 2, 1),
            Err(GdiError::MalformedPayload(_))
        ));
        assert!(matches!(
            ctx.convert_pixels(&[0; 4], 12, 1, 1),
            Err(GdiError::UnsupportedColorDepth(12))
        ));
    }
}
