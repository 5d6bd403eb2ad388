//! Decoder Facade: the single mutex-guarded entry point that ties the
//! Header Parser, LZW Decoder and Compositor together.
//!
//! Grounded on the teacher's `main.rs` frame-index/loop-left bookkeeping
//! and `frames_store.rs`'s loop-countdown logic, rewritten around a
//! pluggable [`BufferProvider`] and a `Status`-only public surface instead
//! of the teacher's direct `minifb` buffer writes and `eprintln!`s.

use std::sync::Mutex;

use log::{debug, trace, warn};

use crate::buffer_provider::{BufferProvider, PixelFormat, Raster};
use crate::byte_reader::ByteReader;
use crate::compositor;
use crate::error::Status;
use crate::header::{Dispose, Header, HeaderParser, LOOP_FOREVER};
use crate::lzw;

struct DecoderState {
    raw: Vec<u8>,
    header: Header,
    frame_pointer: i32,
    loop_index: u32,
    status: Status,
    sample_size: usize,
    width: usize,
    height: usize,
    scratch_raster: Vec<u32>,
    previous_snapshot: Option<Vec<u32>>,
    save_previous: bool,
}

impl DecoderState {
    fn empty() -> Self {
        DecoderState {
            raw: Vec::new(),
            header: Header {
                width: 0,
                height: 0,
                gct_flag: false,
                gct_size: 0,
                gct: None,
                bg_index: 0,
                bg_color: 0,
                pixel_aspect: 0,
                loop_count: 0,
                frames: Vec::new(),
                status: Status::OpenError,
                has_dispose_previous: false,
            },
            frame_pointer: -1,
            loop_index: 0,
            status: Status::OpenError,
            sample_size: 1,
            width: 0,
            height: 0,
            scratch_raster: Vec::new(),
            previous_snapshot: None,
            save_previous: false,
        }
    }

    fn frame_count(&self) -> usize {
        self.header.frames.len()
    }
}

/// Decodes one GIF stream at a time. Every mutating entry point locks an
/// internal mutex, so a single instance may be driven from more than one
/// thread, though the spec only requires serialization, not parallelism:
/// a caller animating off a worker thread still calls these one at a time.
///
/// `Header`/`Frame` data is immutable after parsing; several `Decoder`s may
/// share bytes for the same GIF by each calling `read` with a copy and
/// rendering independently.
pub struct Decoder<P: BufferProvider> {
    provider: P,
    state: Mutex<DecoderState>,
}

impl<P: BufferProvider> Decoder<P> {
    pub fn new(provider: P) -> Self {
        Decoder { provider, state: Mutex::new(DecoderState::empty()) }
    }

    /// Parses `bytes` as a GIF stream, replacing any previously loaded
    /// stream. Releases this decoder's old scratch buffers back to the
    /// provider before allocating new ones.
    pub fn read(&self, bytes: &[u8]) -> Status {
        let mut state = self.state.lock().unwrap();

        let old_raster = std::mem::take(&mut state.scratch_raster);
        self.provider.release_ints(old_raster);
        if let Some(snap) = state.previous_snapshot.take() {
            self.provider.release_ints(snap);
        }

        let owned = bytes.to_vec();
        let header = HeaderParser::set_data(&owned).parse_header();
        let status = header.status;
        let width = header.width as usize;
        let height = header.height as usize;
        let sample_size = valid_sample_size(width, height, state.sample_size);
        let w = if sample_size > 0 { width / sample_size } else { 0 };
        let h = if sample_size > 0 { height / sample_size } else { 0 };
        let save_previous = header.has_dispose_previous;

        debug!("read: {}x{} sample={} frames={}", width, height, sample_size, header.frames.len());

        *state = DecoderState {
            raw: owned,
            header,
            frame_pointer: -1,
            loop_index: 0,
            status,
            sample_size,
            width: w,
            height: h,
            scratch_raster: self.provider.obtain_ints(w * h),
            previous_snapshot: None,
            save_previous,
        };

        status
    }

    /// Sets the integer downsample factor for subsequently rendered
    /// frames. Rejected (returns `false`, leaving the previous sample size
    /// in place) unless `s` is a power of two no larger than the smaller
    /// logical screen dimension.
    ///
    /// Not named in the spec's illustrative callable surface, but the
    /// sample size has to be set through *some* entry point, and the spec
    /// explicitly marks that surface as illustrative rather than
    /// exhaustive.
    pub fn set_sample_size(&self, s: usize) -> bool {
        let mut state = self.state.lock().unwrap();
        let width = state.header.width as usize;
        let height = state.header.height as usize;
        if !is_power_of_two(s) || (width > 0 && s > width.min(height)) {
            return false;
        }
        state.sample_size = s;
        let w = if width > 0 { width / s } else { 0 };
        let h = if height > 0 { height / s } else { 0 };
        if w != state.width || h != state.height {
            let old = std::mem::replace(&mut state.scratch_raster, self.provider.obtain_ints(w * h));
            self.provider.release_ints(old);
            if let Some(snap) = state.previous_snapshot.take() {
                self.provider.release_ints(snap);
            }
            state.width = w;
            state.height = h;
        }
        true
    }

    /// Advances the frame pointer, wrapping around and counting loop
    /// iterations as it does. Returns `false` once the declared loop
    /// count is exhausted; a stream that loops forever never returns
    /// `false` here.
    pub fn advance(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        let frame_count = state.frame_count();
        if frame_count == 0 {
            return false;
        }
        if state.frame_pointer == frame_count as i32 - 1 {
            state.loop_index += 1;
            let loop_count = state.header.loop_count;
            if loop_count != LOOP_FOREVER && state.loop_index as i32 > loop_count {
                return false;
            }
        }
        state.frame_pointer = (state.frame_pointer + 1).rem_euclid(frame_count as i32);
        trace!("advance: frame {} (loop {})", state.frame_pointer, state.loop_index);
        true
    }

    /// Decodes and composites the frame at the current frame pointer.
    /// Returns `None` if no frame has been selected yet (`advance` was
    /// never called, or `set_frame_index(-1)` reset it) or a prior
    /// sticky error blocks rendering entirely.
    pub fn get_current_frame(&self) -> Option<Raster> {
        let mut state = self.state.lock().unwrap();

        if state.status == Status::PartialDecode {
            state.status = Status::Ok;
        }
        if state.frame_pointer < 0 || state.status.is_sticky() {
            return None;
        }

        let frame_pointer = state.frame_pointer as usize;
        let frame = state.header.frames[frame_pointer].clone();
        let prev_frame = if frame_pointer > 0 {
            Some(state.header.frames[frame_pointer - 1].clone())
        } else {
            None
        };
        let prev_snapshot = state.previous_snapshot.clone();
        let sample = state.sample_size.max(1);
        let (w, h) = (state.width, state.height);

        let n_pix = frame.iw as usize * frame.ih as usize;
        let mut indexed = self.provider.obtain_bytes(n_pix);
        {
            let mut rdr = ByteReader::new(&state.raw);
            let (decoded, truncated) = lzw::decode_frame(&mut rdr, &frame);
            let n = decoded.len().min(indexed.len());
            indexed[..n].copy_from_slice(&decoded[..n]);
            if truncated {
                state.status = Status::PartialDecode;
                warn!("partial decode at frame {}", frame_pointer);
            }
        }

        let result = compositor::composite(
            &state.header,
            &frame,
            frame_pointer,
            prev_frame.as_ref(),
            &indexed,
            sample,
            w,
            h,
            &mut state.scratch_raster,
            prev_snapshot.as_deref(),
        );
        self.provider.release_bytes(indexed);

        let first_frame_transparent = match result {
            Ok(v) => v,
            Err(err) => {
                warn!("compositing frame {} failed: {}", frame_pointer, err);
                state.status = Status::FormatError;
                return None;
            }
        };

        if state.save_previous && frame.dispose == Dispose::None {
            if state.previous_snapshot.is_none() {
                state.previous_snapshot = Some(self.provider.obtain_ints(w * h));
            }
            if let Some(snap) = state.previous_snapshot.as_mut() {
                snap.copy_from_slice(&state.scratch_raster);
            }
        }

        let format = if first_frame_transparent { PixelFormat::Argb8888 } else { PixelFormat::Rgb565 };
        let mut raster = self.provider.obtain_raster(w, h, format);
        raster.pixels.copy_from_slice(&state.scratch_raster);
        Some(raster)
    }

    pub fn delay(&self, i: usize) -> i32 {
        let state = self.state.lock().unwrap();
        state.header.frames.get(i).map(|f| f.delay_ms as i32).unwrap_or(-1)
    }

    pub fn next_delay(&self) -> i32 {
        let state = self.state.lock().unwrap();
        let frame_count = state.frame_count();
        if frame_count == 0 || state.frame_pointer < 0 {
            return -1;
        }
        let next = (state.frame_pointer + 1).rem_euclid(frame_count as i32) as usize;
        state.header.frames[next].delay_ms as i32
    }

    pub fn frame_count(&self) -> u32 {
        self.state.lock().unwrap().frame_count() as u32
    }

    pub fn current_frame_index(&self) -> i32 {
        self.state.lock().unwrap().frame_pointer
    }

    pub fn loop_count(&self) -> i32 {
        self.state.lock().unwrap().header.loop_count
    }

    pub fn loop_index(&self) -> u32 {
        self.state.lock().unwrap().loop_index
    }

    /// Sets the frame pointer directly. `-1` is a valid value, meaning "no
    /// frame selected yet" (the same state a freshly-read decoder starts
    /// in); any other value must be a valid frame index.
    pub fn set_frame_index(&self, i: i32) -> bool {
        let mut state = self.state.lock().unwrap();
        let frame_count = state.frame_count() as i32;
        if i < -1 || i >= frame_count {
            return false;
        }
        state.frame_pointer = i;
        true
    }

    pub fn reset_frame_index(&self) {
        self.state.lock().unwrap().frame_pointer = -1;
    }

    pub fn reset_loop_index(&self) {
        self.state.lock().unwrap().loop_index = 0;
    }

    pub fn get_width(&self) -> usize {
        self.state.lock().unwrap().width
    }

    pub fn get_height(&self) -> usize {
        self.state.lock().unwrap().height
    }

    pub fn get_byte_size(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.width * state.height * 4
    }

    pub fn status(&self) -> Status {
        self.state.lock().unwrap().status
    }

    /// Releases every scratch buffer back to the provider and forgets the
    /// currently loaded stream.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        let raster = std::mem::take(&mut state.scratch_raster);
        self.provider.release_ints(raster);
        if let Some(snap) = state.previous_snapshot.take() {
            self.provider.release_ints(snap);
        }
        *state = DecoderState::empty();
    }
}

fn is_power_of_two(n: usize) -> bool {
    n != 0 && (n & (n - 1)) == 0
}

fn valid_sample_size(width: usize, height: usize, requested: usize) -> usize {
    let min_dim = width.min(height);
    if min_dim > 0 && is_power_of_two(requested) && requested <= min_dim {
        requested
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer_provider::DefaultBufferProvider;

    fn gce(dispose: u8, transparency: bool, trans_index: u8) -> Vec<u8> {
        let mut v = vec![0x21, 0xF9, 4];
        v.push((dispose << 2) | if transparency { 1 } else { 0 });
        v.extend_from_slice(&10u16.to_le_bytes());
        v.push(trans_index);
        v.push(0);
        v
    }

    fn image_descriptor(ix: u16, iy: u16, iw: u16, ih: u16, lzw_data: &[u8]) -> Vec<u8> {
        let mut v = vec![0x2C];
        v.extend_from_slice(&ix.to_le_bytes());
        v.extend_from_slice(&iy.to_le_bytes());
        v.extend_from_slice(&iw.to_le_bytes());
        v.extend_from_slice(&ih.to_le_bytes());
        v.push(0x00);
        v.extend_from_slice(lzw_data);
        v
    }

    fn single_color_lzw(min_code_size: u8, color: u8, n_pixels: usize) -> Vec<u8> {
        // Encode `n_pixels` literal codes of the same palette index,
        // mirroring the growth-aware encoder used by the LZW decoder's own
        // tests.
        let clear = 1u32 << min_code_size;
        let eoi = clear + 1;
        let mut code_size = min_code_size as u32 + 1;
        let mut mask = (1u32 << code_size) - 1;
        let mut available = clear + 2;
        let mut datum = 0u32;
        let mut bits = 0u32;
        let mut bytes = Vec::new();
        let mut emit = |code: u32, width: u32, datum: &mut u32, bits: &mut u32, bytes: &mut Vec<u8>| {
            *datum |= code << *bits;
            *bits += width;
            while *bits >= 8 {
                bytes.push((*datum & 0xFF) as u8);
                *datum >>= 8;
                *bits -= 8;
            }
        };
        emit(clear, code_size, &mut datum, &mut bits, &mut bytes);
        for idx in 0..n_pixels {
            emit(color as u32, code_size, &mut datum, &mut bits, &mut bytes);
            if idx > 0 && available < 4096 {
                available += 1;
                if (available & mask) == 0 && available < 4096 {
                    code_size += 1;
                    mask += available;
                }
            }
        }
        emit(eoi, code_size, &mut datum, &mut bits, &mut bytes);
        if bits > 0 {
            bytes.push((datum & 0xFF) as u8);
        }
        let mut out = vec![min_code_size];
        for chunk in bytes.chunks(255) {
            out.push(chunk.len() as u8);
            out.extend_from_slice(chunk);
        }
        out.push(0);
        out
    }

    fn single_frame_gif() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"GIF89a");
        data.extend_from_slice(&2u16.to_le_bytes());
        data.extend_from_slice(&2u16.to_le_bytes());
        data.push(0x80);
        data.push(0);
        data.push(0);
        data.extend_from_slice(&[0, 0, 0, 255, 255, 255]);
        data.extend_from_slice(&image_descriptor(0, 0, 2, 2, &single_color_lzw(2, 1, 4)));
        data.push(0x3B);
        data
    }

    #[test]
    fn reads_and_renders_a_single_frame() {
        let decoder = Decoder::new(DefaultBufferProvider);
        let status = decoder.read(&single_frame_gif());
        assert_eq!(status, Status::Ok);
        assert_eq!(decoder.frame_count(), 1);
        assert!(decoder.advance());
        let raster = decoder.get_current_frame().expect("frame renders");
        assert_eq!(raster.width, 2);
        assert_eq!(raster.height, 2);
        assert_eq!(raster.pixels, vec![0xFFFF_FFFFu32; 4]);
        assert!(!decoder.advance());
    }

    #[test]
    fn bad_signature_yields_open_error_and_no_frames() {
        let decoder = Decoder::new(DefaultBufferProvider);
        let status = decoder.read(b"NOTAGIF89a");
        assert_eq!(status, Status::OpenError);
        assert_eq!(decoder.frame_count(), 0);
        assert!(decoder.get_current_frame().is_none());
    }

    #[test]
    fn set_frame_index_then_advance_replays_frame_zero() {
        let decoder = Decoder::new(DefaultBufferProvider);
        decoder.read(&single_frame_gif());
        decoder.advance();
        let first = decoder.get_current_frame().unwrap().pixels;
        assert!(decoder.set_frame_index(-1));
        assert!(decoder.advance());
        let replayed = decoder.get_current_frame().unwrap().pixels;
        assert_eq!(first, replayed);
    }

    #[test]
    fn clear_releases_buffers_and_resets_state() {
        let decoder = Decoder::new(DefaultBufferProvider);
        decoder.read(&single_frame_gif());
        decoder.advance();
        decoder.get_current_frame();
        decoder.clear();
        assert_eq!(decoder.frame_count(), 0);
        assert_eq!(decoder.current_frame_index(), -1);
    }

    #[test]
    fn dispose_previous_round_trip() {
        // Frame 0: opaque 2x2 white. Frame 1: dispose=PREVIOUS, draws a
        // single black pixel at (0,0). Frame 2: opaque 2x2 white again, no
        // sub-rect overlap concerns since frame 1's rect is restored first.
        let mut data = Vec::new();
        data.extend_from_slice(b"GIF89a");
        data.extend_from_slice(&2u16.to_le_bytes());
        data.extend_from_slice(&2u16.to_le_bytes());
        data.push(0x80);
        data.push(0);
        data.push(0);
        data.extend_from_slice(&[255, 255, 255, 0, 0, 0]); // gct: white, black

        data.extend_from_slice(&image_descriptor(0, 0, 2, 2, &single_color_lzw(2, 0, 4)));

        data.extend_from_slice(&gce(3, false, 0)); // dispose=PREVIOUS
        data.extend_from_slice(&image_descriptor(0, 0, 1, 1, &single_color_lzw(2, 1, 1)));

        data.extend_from_slice(&image_descriptor(0, 0, 2, 2, &single_color_lzw(2, 0, 4)));

        data.push(0x3B);

        let decoder = Decoder::new(DefaultBufferProvider);
        assert_eq!(decoder.read(&data), Status::Ok);
        assert_eq!(decoder.frame_count(), 3);

        decoder.advance();
        decoder.get_current_frame();
        decoder.advance();
        decoder.get_current_frame();
        decoder.advance();
        let frame2_via_full_sequence = decoder.get_current_frame().unwrap().pixels;

        // Render frame 0 (establishing the DISPOSE_PREVIOUS snapshot), then
        // jump straight to frame 2 without ever rendering frame 1.
        let direct = Decoder::new(DefaultBufferProvider);
        direct.read(&data);
        direct.advance();
        direct.get_current_frame();
        direct.set_frame_index(1);
        direct.advance();
        let frame2_direct = direct.get_current_frame().unwrap().pixels;

        assert_eq!(frame2_via_full_sequence, frame2_direct);
    }
}
