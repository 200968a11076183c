//! Baseline-image decoding backed by the `image` crate.

use image::ImageFormat;

use super::ImageDecoder;
use crate::error::GdiError;

/// Decodes a JPEG stream into B, G, R, X rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegDecoder;

impl ImageDecoder for JpegDecoder {
    fn decode_into(
        &mut self,
        data: &[u8],
        width: u32,
        height: u32,
        out: &mut [u8],
    ) -> Result<(), GdiError> {
        let decoded = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
            .map_err(|e| GdiError::decode("baseline-image", e))?
            .to_rgba8();

        if decoded.dimensions() != (width, height) {
            let (w, h) = decoded.dimensions();
            return Err(GdiError::decode(
                "baseline-image",
                format!("decoded {w}x{h}, expected {width}x{height}"),
            ));
        }
        let needed = width as usize * height as usize * 4;
        if out.len() < needed {
            return Err(GdiError::malformed(format!(
                "image buffer holds {} bytes, need {needed}",
                out.len()
            )));
        }

        for (dst, px) in out.chunks_exact_mut(4).zip(decoded.pixels()) {
            let [r, g, b, _] = px.0;
            dst.copy_from_slice(&[b, g, r, 0xFF]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ExtendedColorType;
    use image::codecs::jpeg::JpegEncoder;

    fn encode_solid(w: u32, h: u32, rgb: [u8; 3]) -> Vec<u8> {
        let data: Vec<u8> = (0..w * h).flat_map(|_| rgb).collect();
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, 100)
            .encode(&data, w, h, ExtendedColorType::Rgb8)
            .unwrap();
        buf
    }

    #[test]
    fn decodes_to_bgrx() {
        let jpeg = encode_solid(16, 8, [200, 40, 10]);
        let mut out = vec![0u8; 16 * 8 * 4];
        JpegDecoder.decode_into(&jpeg, 16, 8, &mut out).unwrap();
        let px = &out[..4];
        assert!(px[0].abs_diff(10) < 8, "blue {}", px[0]);
        assert!(px[1].abs_diff(40) < 8, "green {}", px[1]);
        assert!(px[2].abs_diff(200) < 8, "red {}", px[2]);
    }

    #[test]
    fn size_mismatch_is_decode_failure() {
        let jpeg = encode_solid(8, 8, [0, 0, 0]);
        let mut out = vec![0u8; 16 * 8 * 4];
        let err = JpegDecoder.decode_into(&jpeg, 16, 8, &mut out).unwrap_err();
        assert!(matches!(err, GdiError::DecodeFailure { codec: "baseline-image", .. }));
    }

    #[test]
    fn garbage_is_decode_failure() {
        let mut out = vec![0u8; 4];
        assert!(JpegDecoder.decode_into(&[1, 2, 3], 1, 1, &mut out).is_err());
    }
}
