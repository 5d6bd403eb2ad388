//! Compositor: disposal of the previous frame + indexed-to-ARGB
//! compositing, with interlacing and integer downsampling.
//!
//! Grounded on the teacher's `parser.rs::construct_next_frame`, which
//! already tracks disposal/background/transparency and an interlacing
//! cycle inline while decoding; this module lifts that bookkeeping out
//! into its own stage that runs against an already-decoded indexed-pixel
//! buffer, and adds the spec's downsample averaging (which the teacher,
//! rendering 1:1 into a window, never needed).

use log::trace;

use crate::color::{pack_argb, ColorTable};
use crate::error::{GifError, Result};
use crate::header::{Dispose, Frame, Header};

/// Composites `indexed` (the current frame's `iw * ih` palette indices)
/// into `dest` (a `w * h` ARGB raster), applying `prev_frame`'s disposal
/// first. Returns whether a fully transparent pixel was written while
/// compositing frame 0 (the spec's conservative `first_frame_transparent`
/// signal, preserved as specified — see the design notes).
#[allow(clippy::too_many_arguments)]
pub fn composite(
    header: &Header,
    frame: &Frame,
    frame_index: usize,
    prev_frame: Option<&Frame>,
    indexed: &[u8],
    sample: usize,
    w: usize,
    h: usize,
    dest: &mut [u32],
    prev_snapshot: Option<&[u32]>,
) -> Result<bool> {
    let active_base = match frame.lct {
        Some(t) => t,
        None => match header.gct {
            Some(t) => t,
            None => return Err(GifError::NoColorTable),
        },
    };

    // Per-frame copy: the shared header/frame color tables are never
    // mutated to apply transparency.
    let mut active = active_base;
    if frame.transparency {
        active.set(frame.trans_index, 0);
    }

    let mut first_frame_transparent = false;

    apply_previous_disposal(header, frame, prev_frame, sample, w, h, dest, prev_snapshot, &mut first_frame_transparent);

    composite_current_frame(frame, frame_index, indexed, &active, sample, w, h, dest, &mut first_frame_transparent);

    trace!("composited frame {} (interlace={})", frame_index, frame.interlace);
    Ok(first_frame_transparent)
}

#[allow(clippy::too_many_arguments)]
fn apply_previous_disposal(
    header: &Header,
    frame: &Frame,
    prev_frame: Option<&Frame>,
    sample: usize,
    w: usize,
    h: usize,
    dest: &mut [u32],
    prev_snapshot: Option<&[u32]>,
    first_frame_transparent: &mut bool,
) {
    let prev = match prev_frame {
        None => {
            dest.iter_mut().for_each(|p| *p = 0);
            return;
        }
        Some(p) => p,
    };

    match prev.dispose {
        Dispose::None => {}
        Dispose::Background => {
            let c = if frame.lct.is_some() && frame.trans_index == header.bg_index {
                0
            } else if frame.transparency {
                0
            } else {
                header.bg_color
            };
            fill_rect(dest, w, h, prev, sample, c);
            if c == 0 {
                *first_frame_transparent = true;
            }
        }
        Dispose::Previous => match prev_snapshot {
            Some(snap) => copy_rect(dest, snap, w, h, prev, sample),
            None => fill_rect(dest, w, h, prev, sample, 0),
        },
    }
}

fn fill_rect(dest: &mut [u32], w: usize, h: usize, rect: &Frame, sample: usize, color: u32) {
    let dx0 = rect.ix as usize / sample;
    let dy0 = rect.iy as usize / sample;
    let dw = rect.iw as usize / sample;
    let dh = rect.ih as usize / sample;
    for y in dy0..(dy0 + dh).min(h) {
        for x in dx0..(dx0 + dw).min(w) {
            dest[y * w + x] = color;
        }
    }
}

fn copy_rect(dest: &mut [u32], src: &[u32], w: usize, h: usize, rect: &Frame, sample: usize) {
    let dx0 = rect.ix as usize / sample;
    let dy0 = rect.iy as usize / sample;
    let dw = rect.iw as usize / sample;
    let dh = rect.ih as usize / sample;
    for y in dy0..(dy0 + dh).min(h) {
        for x in dx0..(dx0 + dw).min(w) {
            dest[y * w + x] = src[y * w + x];
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn composite_current_frame(
    frame: &Frame,
    frame_index: usize,
    indexed: &[u8],
    active: &ColorTable,
    sample: usize,
    w: usize,
    h: usize,
    dest: &mut [u32],
    first_frame_transparent: &mut bool,
) {
    let iw = frame.iw as usize;
    let ih = frame.ih as usize;
    if iw == 0 || ih == 0 {
        return;
    }

    let dw = iw / sample;
    let dh = ih / sample;
    let dx0 = frame.ix as usize / sample;
    let dy0 = frame.iy as usize / sample;

    // Rows are consumed sequentially from `indexed` (bitstream order); for
    // interlaced frames the destination row each sequential chunk of
    // `sample` source rows lands on follows the classic 4-pass schedule.
    let mut pass = 0u8;
    let mut inc = 8usize;
    let mut iline = 0usize;

    for i in 0..dh {
        let oline = if frame.interlace {
            if iline >= dh {
                pass += 1;
                match pass {
                    1 => {
                        iline = 4;
                        inc = 8;
                    }
                    2 => {
                        iline = 2;
                        inc = 4;
                    }
                    3 => {
                        iline = 1;
                        inc = 2;
                    }
                    _ => {}
                }
            }
            let line = iline;
            iline += inc;
            line
        } else {
            i
        };

        let dest_row = dy0 + oline;
        if dest_row >= h {
            continue;
        }

        let src_row_base = i * sample;

        for dxi in 0..dw {
            let dest_col = dx0 + dxi;
            if dest_col >= w {
                continue;
            }
            let src_col_base = dxi * sample;

            let color = if sample == 1 {
                pixel_at(indexed, active, iw, ih, src_row_base, src_col_base)
            } else {
                averaged_pixel(indexed, active, iw, ih, src_row_base, src_col_base)
            };

            dest[dest_row * w + dest_col] = color;
            if color == 0 && frame_index == 0 {
                *first_frame_transparent = true;
            }
        }
    }
}

fn pixel_at(indexed: &[u8], active: &ColorTable, iw: usize, ih: usize, y: usize, x: usize) -> u32 {
    if y >= ih || x >= iw {
        return 0;
    }
    active.get(indexed[y * iw + x])
}

fn averaged_pixel(indexed: &[u8], active: &ColorTable, iw: usize, ih: usize, y0: usize, x0: usize) -> u32 {
    let (mut r, mut g, mut b, mut total) = (0u32, 0u32, 0u32, 0u32);
    for dy in 0..2 {
        let y = y0 + dy;
        if y >= ih {
            continue;
        }
        for dx in 0..2 {
            let x = x0 + dx;
            if x >= iw {
                continue;
            }
            let c = active.get(indexed[y * iw + x]);
            if c != 0 {
                r += (c >> 16) & 0xFF;
                g += (c >> 8) & 0xFF;
                b += c & 0xFF;
                total += 1;
            }
        }
    }
    if total == 0 {
        0
    } else {
        pack_argb((r / total) as u8, (g / total) as u8, (b / total) as u8)
    }
}
