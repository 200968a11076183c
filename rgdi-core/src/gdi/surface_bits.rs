//! Bulk surface updates: codec fan-out and frame acknowledgement.
//!
//! Surface updates draw with a plain copy and ignore the order clip.
//! Whatever the outcome, every command acknowledges the current frame
//! exactly once.

use tracing::{trace, warn};

use super::Gdi;
use crate::codec::{CodecId, MotionFlags, MotionHeader, TILE_SIZE};
use crate::error::GdiError;
use crate::frame::FrameAckSink;
use crate::order::SurfaceBitsCommand;
use crate::plan::{CompositingPlan, Replication};
use crate::surface::{DirtySink, DrawStyle, PixelView, RowOrder, SurfaceSet};
use crate::types::{Point, Rect};

impl Gdi {
    /// Decode and composite one surface-bits command, then acknowledge
    /// the current frame.
    pub fn surface_bits(
        &mut self,
        cmd: &SurfaceBitsCommand,
        dirty: &mut dyn DirtySink,
        acks: &mut dyn FrameAckSink,
    ) -> Result<(), GdiError> {
        let result = CodecId::from_wire(cmd.codec_id).and_then(|codec| {
            trace!(codec = codec.name(), dest = ?cmd.dest, bytes = cmd.payload.len(), "surface bits");
            match codec {
                CodecId::TileTransform => self.tile_transform(cmd, dirty),
                CodecId::ColorCell => self.color_cell(cmd, dirty),
                CodecId::BaselineImage => self.baseline_image(cmd, dirty),
                CodecId::Uncompressed => self.uncompressed(cmd, dirty),
                CodecId::Motion => self.motion_update(cmd, dirty),
            }
        });
        if let Err(e) = &result {
            warn!(codec_id = cmd.codec_id, error = %e, "surface update abandoned");
        }
        self.frames.acknowledge(acks);
        result
    }

    fn tile_transform(&mut self, cmd: &SurfaceBitsCommand, dirty: &mut dyn DirtySink) -> Result<(), GdiError> {
        let decoder = self
            .codecs
            .tile
            .as_mut()
            .ok_or(GdiError::MissingDecoder("tile-transform"))?;
        let message = decoder.decode(&cmd.payload)?;

        let tile_len = (TILE_SIZE * TILE_SIZE) as usize;
        if let Some(tile) = message.tiles.iter().find(|t| t.pixels.len() != tile_len) {
            return Err(GdiError::decode(
                "tile-transform",
                format!("tile at ({}, {}) has {} pixels", tile.x, tile.y, tile.pixels.len()),
            ));
        }

        let origin = cmd.dest.origin();
        let region: Vec<Rect> = message
            .rects
            .iter()
            .map(|r| r.offset(origin.x, origin.y))
            .collect();
        let plan = CompositingPlan::for_primary_update(&self.mode);
        let style = DrawStyle::COPY.clipped(Some(&region));

        let target = self.surfaces.get_mut(plan.target)?;
        for tile in &message.tiles {
            let view = PixelView::new(TILE_SIZE, TILE_SIZE, TILE_SIZE as usize, &tile.pixels)?;
            let at = Rect::new(tile.x + origin.x, tile.y + origin.y, TILE_SIZE, TILE_SIZE);
            trace!(x = at.x, y = at.y, "tile");
            target.blit(view, Point::default(), at, &style);
        }
        for &rect in &region {
            present(&mut self.surfaces, &plan, rect, dirty);
        }
        Ok(())
    }

    fn color_cell(&mut self, cmd: &SurfaceBitsCommand, dirty: &mut dyn DirtySink) -> Result<(), GdiError> {
        let (width, height) = (cmd.dest.width, cmd.dest.height);
        let decoder = self
            .codecs
            .color_cell
            .as_mut()
            .ok_or(GdiError::MissingDecoder("color-cell"))?;
        let data = decoder.decode(&cmd.payload, width, height)?;
        let plan = CompositingPlan::for_primary_update(&self.mode);
        put_frame(&mut self.surfaces, &plan, cmd.dest, &data, RowOrder::BottomUp, dirty)
    }

    fn uncompressed(&mut self, cmd: &SurfaceBitsCommand, dirty: &mut dyn DirtySink) -> Result<(), GdiError> {
        let plan = CompositingPlan::for_primary_update(&self.mode);
        put_frame(
            &mut self.surfaces,
            &plan,
            cmd.dest,
            &cmd.payload,
            RowOrder::BottomUp,
            dirty,
        )
    }

    fn baseline_image(&mut self, cmd: &SurfaceBitsCommand, dirty: &mut dyn DirtySink) -> Result<(), GdiError> {
        let payload = cmd.payload.as_slice();
        let [lo, hi, ..] = *payload else {
            return Err(GdiError::malformed("baseline image header length missing"));
        };
        let header_len = usize::from(u16::from_le_bytes([lo, hi]));
        let body = payload.get(2 + header_len..).ok_or_else(|| {
            GdiError::malformed(format!(
                "baseline image header of {header_len} bytes exceeds payload of {}",
                payload.len()
            ))
        })?;

        let (width, height) = (cmd.dest.width, cmd.dest.height);
        let decoder = self
            .codecs
            .image
            .as_mut()
            .ok_or(GdiError::MissingDecoder("baseline-image"))?;
        let out = self.scratch.acquire(width as usize * height as usize * 4);
        decoder.decode_into(body, width, height, out)?;

        let plan = CompositingPlan::for_direct_update(&self.mode);
        put_frame(&mut self.surfaces, &plan, cmd.dest, out, RowOrder::TopDown, dirty)
    }

    fn motion_update(&mut self, cmd: &SurfaceBitsCommand, dirty: &mut dyn DirtySink) -> Result<(), GdiError> {
        let header = MotionHeader::parse(&cmd.payload)?;
        if header.flags.contains(MotionFlags::DELETE) {
            self.motion.delete(header.session_id);
        }
        if header.data.is_empty() || header.rects.is_empty() {
            return Ok(());
        }

        let factory = self
            .codecs
            .motion
            .as_deref()
            .ok_or(GdiError::MissingDecoder("motion"))?;
        let decoder = self.motion.decoder_for(
            header.session_id,
            header.src_width,
            header.src_height,
            factory,
        )?;
        decoder.decode(header.data)?;

        if !header.is_same_size() {
            return Err(GdiError::UnsupportedStretch {
                src_width: header.src_width,
                src_height: header.src_height,
                dst_width: header.dst_width,
                dst_height: header.dst_height,
            });
        }
        let frame = decoder
            .frame()
            .ok_or_else(|| GdiError::decode("motion", "decoder produced no frame"))?;

        let dest = cmd.dest;
        let plan = CompositingPlan::for_direct_update(&self.mode);
        let target = self.surfaces.get_mut(plan.target)?;
        let mut written = Vec::with_capacity(header.rects.len());
        for r in &header.rects {
            let (x, y) = (dest.x + r.x, dest.y + r.y);
            let width = i64::from(r.width).min(i64::from(dest.right()) - i64::from(x));
            let height = i64::from(r.height).min(i64::from(dest.bottom()) - i64::from(y));
            if width <= 0 || height <= 0 {
                continue;
            }
            let area = Rect::new(x, y, width as u32, height as u32);
            target.blit(frame, Point::new(r.x, r.y), area, &DrawStyle::COPY);
            written.push(area);
        }
        for area in written {
            present(&mut self.surfaces, &plan, area, dirty);
        }
        Ok(())
    }
}

/// Write a whole B, G, R, X frame at `dest`, then replicate and report.
/// The length check runs before any pixel is written.
fn put_frame(
    surfaces: &mut SurfaceSet,
    plan: &CompositingPlan,
    dest: Rect,
    data: &[u8],
    order: RowOrder,
    dirty: &mut dyn DirtySink,
) -> Result<(), GdiError> {
    let stride = dest.width as usize * 4;
    surfaces
        .get_mut(plan.target)?
        .put_bgrx(dest, data, stride, order, &DrawStyle::COPY)?;
    present(surfaces, plan, dest, dirty);
    Ok(())
}

fn present(surfaces: &mut SurfaceSet, plan: &CompositingPlan, area: Rect, dirty: &mut dyn DirtySink) {
    if plan.replicate == Replication::FromPrimary {
        surfaces.mirror_primary(area, None);
    }
    if plan.invalidate {
        dirty.mark_dirty(area);
    }
}
