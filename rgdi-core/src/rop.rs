//! Raster operation translation.
//!
//! The protocol describes compositing with binary (ROP2, pen vs.
//! destination) and ternary (ROP3, pattern/source vs. destination)
//! operation codes. Locally every supported code collapses onto one of
//! sixteen two-operand boolean functions, [`RasterOp`].
//!
//! Ternary codes outside the known table cannot be expressed; the
//! translator then falls back according to an [`UnsupportedRopPolicy`].
//! The default policy clears the destination, which wipes the target
//! rectangle. That behaviour is inherited from the reference client and
//! is kept switchable because a no-op may have been the intent.

use serde::{Deserialize, Serialize};

use crate::color::PIXEL_MASK;
use crate::error::GdiError;

// ── RasterOp ─────────────────────────────────────────────────────

/// A two-operand boolean compositing function applied per pixel.
///
/// `src` is the pen, pattern, or source pixel; `dst` is the pixel
/// already on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RasterOp {
    /// `0`
    Clear,
    /// `src & dst`
    And,
    /// `src & !dst`
    AndReverse,
    /// `src`
    #[default]
    Copy,
    /// `!src & dst`
    AndInverted,
    /// `dst`
    Noop,
    /// `src ^ dst`
    Xor,
    /// `src | dst`
    Or,
    /// `!(src | dst)`
    Nor,
    /// `!src ^ dst`
    Equiv,
    /// `!dst`
    Invert,
    /// `src | !dst`
    OrReverse,
    /// `!src`
    CopyInverted,
    /// `!src | dst`
    OrInverted,
    /// `!(src & dst)`
    Nand,
    /// all bits set
    Set,
}

impl RasterOp {
    /// Combine one source and one destination pixel.
    #[inline]
    pub fn apply(self, src: u32, dst: u32) -> u32 {
        let out = match self {
            RasterOp::Clear => 0,
            RasterOp::And => src & dst,
            RasterOp::AndReverse => src & !dst,
            RasterOp::Copy => src,
            RasterOp::AndInverted => !src & dst,
            RasterOp::Noop => dst,
            RasterOp::Xor => src ^ dst,
            RasterOp::Or => src | dst,
            RasterOp::Nor => !(src | dst),
            RasterOp::Equiv => !src ^ dst,
            RasterOp::Invert => !dst,
            RasterOp::OrReverse => src | !dst,
            RasterOp::CopyInverted => !src,
            RasterOp::OrInverted => !src | dst,
            RasterOp::Nand => !(src & dst),
            RasterOp::Set => u32::MAX,
        };
        out & PIXEL_MASK
    }

    /// Map a ROP2 code in `1..=16` to its function.
    pub fn from_binary_code(code: u32) -> Result<Self, GdiError> {
        if !(1..=16).contains(&code) {
            return Err(GdiError::UnsupportedOperation {
                kind: "binary",
                code,
            });
        }
        Ok(ROP2_TABLE[code as usize - 1])
    }

    /// Map a known 24-bit ROP3 code to its function.
    pub fn from_ternary_code(code: u32) -> Option<Self> {
        ROP3_TABLE
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, op)| *op)
    }
}

/// ROP2 codes 1..=16, in order.
const ROP2_TABLE: [RasterOp; 16] = [
    RasterOp::Clear,        // 0
    RasterOp::Nor,          // DPon
    RasterOp::AndInverted,  // DPna
    RasterOp::CopyInverted, // Pn
    RasterOp::AndReverse,   // PDna
    RasterOp::Invert,       // Dn
    RasterOp::Xor,          // DPx
    RasterOp::Nand,         // DPan
    RasterOp::And,          // DPa
    RasterOp::Equiv,        // DPxn
    RasterOp::Noop,         // D
    RasterOp::OrInverted,   // DPno
    RasterOp::Copy,         // P
    RasterOp::OrReverse,    // PDno
    RasterOp::Or,           // DPo
    RasterOp::Set,          // 1
];

// ── ROP3 codes ───────────────────────────────────────────────────

/// Named ternary raster operation codes.
pub mod rop3 {
    pub const BLACKNESS: u32 = 0x0000_0042;
    pub const NOTSRCERASE: u32 = 0x0011_00A6;
    pub const DSNA: u32 = 0x0022_0326;
    pub const NOTSRCCOPY: u32 = 0x0033_0008;
    pub const SRCERASE: u32 = 0x0044_0328;
    pub const DSTINVERT: u32 = 0x0055_0009;
    pub const PATINVERT: u32 = 0x005A_0049;
    pub const SRCINVERT: u32 = 0x0066_0046;
    pub const SRCAND: u32 = 0x0088_00C6;
    pub const PDXN: u32 = 0x00A5_0065;
    pub const MERGEPAINT: u32 = 0x00BB_0226;
    pub const SRCCOPY: u32 = 0x00CC_0020;
    pub const SRCPAINT: u32 = 0x00EE_0086;
    pub const PATCOPY: u32 = 0x00F0_0021;
    pub const WHITENESS: u32 = 0x00FF_0062;
}

const ROP3_TABLE: [(u32, RasterOp); 28] = [
    (rop3::BLACKNESS, RasterOp::Clear),
    (0x0005_00A9, RasterOp::Nor),
    (0x000A_0329, RasterOp::AndInverted),
    (0x000F_0001, RasterOp::CopyInverted),
    (rop3::NOTSRCERASE, RasterOp::Nor),
    (rop3::DSNA, RasterOp::AndInverted),
    (rop3::NOTSRCCOPY, RasterOp::CopyInverted),
    (rop3::SRCERASE, RasterOp::AndReverse),
    (0x0050_0325, RasterOp::AndReverse),
    (rop3::DSTINVERT, RasterOp::Invert),
    (rop3::PATINVERT, RasterOp::Xor),
    (0x005F_00E9, RasterOp::Nand),
    (rop3::SRCINVERT, RasterOp::Xor),
    (0x0077_00E6, RasterOp::Nand),
    (rop3::SRCAND, RasterOp::And),
    (0x0099_0066, RasterOp::Equiv),
    (0x00A0_00C9, RasterOp::And),
    (rop3::PDXN, RasterOp::Equiv),
    (0x00AA_0029, RasterOp::Noop),
    (0x00AF_0229, RasterOp::OrInverted),
    (rop3::MERGEPAINT, RasterOp::OrInverted),
    (rop3::SRCCOPY, RasterOp::Copy),
    (0x00DD_0228, RasterOp::OrReverse),
    (rop3::SRCPAINT, RasterOp::Or),
    (rop3::PATCOPY, RasterOp::Copy),
    (0x00F5_0225, RasterOp::OrReverse),
    (0x00FA_0089, RasterOp::Or),
    (rop3::WHITENESS, RasterOp::Set),
];

/// Expand the one-byte ROP3 index carried by orders into its full
/// 24-bit code.
///
/// Indices missing from the local table expand to `index << 16`, which
/// the translator does not recognise, so the fallback policy applies.
pub fn expand_rop3_index(index: u8) -> u32 {
    let high = u32::from(index) << 16;
    ROP3_TABLE
        .iter()
        .map(|(code, _)| *code)
        .find(|code| code & 0x00FF_0000 == high)
        .unwrap_or(high)
}

// ── UnsupportedRopPolicy ─────────────────────────────────────────

/// What to composite with when a ternary code is not recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnsupportedRopPolicy {
    /// Clear the destination rectangle to zero.
    #[default]
    #[serde(rename = "clear")]
    ClearDestination,
    /// Leave the destination untouched.
    #[serde(rename = "noop")]
    LeaveDestination,
}

/// Fallback used for unknown ternary codes unless configured otherwise.
pub const DEFAULT_UNSUPPORTED_ROP3_POLICY: UnsupportedRopPolicy =
    UnsupportedRopPolicy::ClearDestination;

impl UnsupportedRopPolicy {
    pub fn fallback(self) -> RasterOp {
        match self {
            UnsupportedRopPolicy::ClearDestination => RasterOp::Clear,
            UnsupportedRopPolicy::LeaveDestination => RasterOp::Noop,
        }
    }
}

// ── RopTranslator ────────────────────────────────────────────────

/// Holds the compositing function selected for a single order.
///
/// A translator starts at [`RasterOp::Copy`]. Order handlers create a
/// fresh one per order, so nothing selected here outlives the order.
#[derive(Debug, Clone)]
pub struct RopTranslator {
    current: RasterOp,
    policy: UnsupportedRopPolicy,
}

impl RopTranslator {
    pub fn new(policy: UnsupportedRopPolicy) -> Self {
        Self {
            current: RasterOp::Copy,
            policy,
        }
    }

    /// The function selected so far.
    pub fn current(&self) -> RasterOp {
        self.current
    }

    /// Select a ROP2 function. Out-of-range codes leave the current
    /// function unchanged.
    pub fn set_binary_op(&mut self, code: u32) -> Result<RasterOp, GdiError> {
        self.current = RasterOp::from_binary_code(code)?;
        Ok(self.current)
    }

    /// Select a ROP3 function. Unknown codes force the policy fallback
    /// *and* report [`GdiError::UnsupportedOperation`].
    pub fn set_ternary_op(&mut self, code: u32) -> Result<RasterOp, GdiError> {
        match RasterOp::from_ternary_code(code) {
            Some(op) => {
                self.current = op;
                Ok(op)
            }
            None => {
                self.current = self.policy.fallback();
                Err(GdiError::UnsupportedOperation {
                    kind: "ternary",
                    code,
                })
            }
        }
    }

    /// Return to [`RasterOp::Copy`].
    pub fn reset(&mut self) {
        self.current = RasterOp::Copy;
    }
}

impl Default for RopTranslator {
    fn default() -> Self {
        Self::new(DEFAULT_UNSUPPORTED_ROP3_POLICY)
    }
}

// ── Tests ────────────────────────────────────────────────────────
