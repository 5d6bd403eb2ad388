//! Header Parser: walks the GIF content-block stream and enumerates
//! frames without decompressing any pixel data.
//!
//! Grounded on the teacher's `header.rs` (Logical Screen Descriptor +
//! Global Color Table) and the content-block loop in `parser.rs`'s
//! `decode_and_render`, restructured to *record* each frame's LZW offset
//! rather than decode it inline, per the spec's component split between
//! header parsing, LZW decode and compositing.

use log::{debug, trace, warn};

use crate::byte_reader::ByteReader;
use crate::color::{self, ColorTable};
use crate::error::{GifError, Result, Status};
use crate::sub_block::SubBlockReader;

const IMAGE_DESCRIPTOR_BLOCK_ID: u8 = 0x2C;
const TRAILER_BLOCK_ID: u8 = 0x3B;
const EXTENSION_INTRODUCER_ID: u8 = 0x21;
const GRAPHIC_CONTROL_EXTENSION_LABEL: u8 = 0xF9;
const APPLICATION_EXTENSION_LABEL: u8 = 0xFF;
const COMMENT_EXTENSION_LABEL: u8 = 0xFE;
const PLAIN_TEXT_EXTENSION_LABEL: u8 = 0x01;

/// Sentinel meaning "loop forever"; see [`Header::loop_count`].
pub const LOOP_FOREVER: i32 = -1;

/// Disposal method for the *previous* frame's area before the next frame
/// composites. Raw value `0` (unspecified) is normalized to `None` at
/// parse time, so only these three variants are ever observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispose {
    None = 1,
    Background = 2,
    Previous = 3,
}

/// One image descriptor's worth of metadata. Immutable after parsing; the
/// LZW decoder and compositor only ever read from it.
#[derive(Clone)]
pub struct Frame {
    pub ix: u16,
    pub iy: u16,
    pub iw: u16,
    pub ih: u16,
    pub interlace: bool,
    pub transparency: bool,
    pub trans_index: u8,
    pub dispose: Dispose,
    pub delay_ms: u32,
    pub lct: Option<ColorTable>,
    /// Offset into the raw stream of this frame's `lzw_min_code_size` byte.
    pub buffer_frame_start: usize,
}

/// Parsed GIF header plus every enumerated frame. Immutable after parsing
/// except for `bg_color`, which is resolved once during the header read.
pub struct Header {
    pub width: u16,
    pub height: u16,
    pub gct_flag: bool,
    pub gct_size: usize,
    pub gct: Option<ColorTable>,
    pub bg_index: u8,
    pub bg_color: u32,
    pub pixel_aspect: u8,
    /// `-1` (`LOOP_FOREVER`) when a NETSCAPE2.0 loop-count of `0` was seen.
    ///
    /// When no NETSCAPE2.0 extension is present at all, this is `0`, not
    /// `LOOP_FOREVER` — preserved from the source's behavior even though
    /// it disagrees with the de-facto "loop forever when absent" browser
    /// convention (see open question in the design notes): a decoder
    /// built against this header will play such a GIF exactly once.
    pub loop_count: i32,
    pub frames: Vec<Frame>,
    pub status: Status,
    /// Precomputed once: true if any frame declares `Dispose::Previous`.
    pub has_dispose_previous: bool,
}

/// Metadata accumulated from a Graphic Control Extension, carried forward
/// to the next Image Descriptor and then consumed.
struct PendingFrame {
    dispose: Dispose,
    transparency: bool,
    trans_index: u8,
    delay_ms: u32,
}

impl Default for PendingFrame {
    fn default() -> Self {
        PendingFrame { dispose: Dispose::None, transparency: false, trans_index: 0, delay_ms: 0 }
    }
}

/// Deterministic top-down recognizer over a GIF byte buffer.
pub struct HeaderParser<'a> {
    data: &'a [u8],
}

impl<'a> HeaderParser<'a> {
    pub fn set_data(data: &'a [u8]) -> Self {
        HeaderParser { data }
    }

    /// Parses the full stream: signature, Logical Screen Descriptor,
    /// optional Global Color Table, and every content block up to the
    /// trailer (or the first structural error).
    pub fn parse_header(&mut self) -> Header {
        self.parse_header_impl(None)
    }

    /// Stops after the second frame has been enumerated, for callers that
    /// only want to know whether a stream is animated without paying for
    /// a full parse.
    pub fn is_animated(&mut self) -> bool {
        self.parse_header_impl(Some(2)).frames.len() >= 2
    }

    fn parse_header_impl(&mut self, max_frames: Option<usize>) -> Header {
        let mut rdr = ByteReader::new(self.data);
        let result = Self::parse_prelude(&mut rdr).and_then(|prelude| {
            Self::parse_content_blocks(&mut rdr, max_frames, prelude)
        });

        match result {
            Ok(mut header) => {
                header.status = Status::Ok;
                header
            }
            Err((err, mut header)) => {
                warn!("GIF parse stopped early: {}", err);
                header.status = Status::from(&err);
                header
            }
        }
    }

    fn parse_prelude(rdr: &mut ByteReader) -> Result<PreludeResult> {
        let sig = rdr.read_ascii(3).map_err(|_| GifError::NotAGif)?;
        if sig != "GIF" {
            return Err(GifError::NotAGif);
        }
        let version = rdr.read_ascii(3).map_err(|_| GifError::UnsupportedVersion)?;
        if version != "89a" && version != "87a" {
            return Err(GifError::UnsupportedVersion);
        }

        let width = rdr.read_u16_le()?;
        let height = rdr.read_u16_le()?;
        let packed = rdr.read_u8()?;
        let gct_flag = packed & 0x80 != 0;
        let gct_size: usize = 2 << (packed & 0x07);
        let bg_index = rdr.read_u8()?;
        let pixel_aspect = rdr.read_u8()?;

        let gct = if gct_flag { Some(color::parse_color_table(rdr, gct_size)?) } else { None };
        let bg_color = gct.map(|t| t.get(bg_index)).unwrap_or(0);

        debug!("logical screen {}x{}, gct={}", width, height, gct_flag);

        Ok(PreludeResult { width, height, gct_flag, gct_size, gct, bg_index, bg_color, pixel_aspect })
    }

    fn parse_content_blocks(
        rdr: &mut ByteReader,
        max_frames: Option<usize>,
        prelude: PreludeResult,
    ) -> std::result::Result<Header, (GifError, Header)> {
        let mut header = Header {
            width: prelude.width,
            height: prelude.height,
            gct_flag: prelude.gct_flag,
            gct_size: prelude.gct_size,
            gct: prelude.gct,
            bg_index: prelude.bg_index,
            bg_color: prelude.bg_color,
            pixel_aspect: prelude.pixel_aspect,
            loop_count: 0,
            frames: Vec::new(),
            status: Status::Ok,
            has_dispose_previous: false,
        };

        let mut sub = SubBlockReader::new();
        let mut pending: Option<PendingFrame> = None;

        loop {
            if let Some(max) = max_frames {
                if header.frames.len() >= max {
                    break;
                }
            }

            let code = match rdr.read_u8() {
                Ok(c) => c,
                Err(err) => return Err((err, header)),
            };

            match code {
                IMAGE_DESCRIPTOR_BLOCK_ID => {
                    let p = pending.take().unwrap_or_default();
                    match Self::read_image_descriptor(rdr, p) {
                        Ok(frame) => {
                            trace!("frame #{} at ({},{}) {}x{}", header.frames.len(), frame.ix, frame.iy, frame.iw, frame.ih);
                            header.frames.push(frame);
                        }
                        Err(err) => return Err((err, header)),
                    }
                }
                TRAILER_BLOCK_ID => break,
                EXTENSION_INTRODUCER_ID => {
                    let sub_code = match rdr.read_u8() {
                        Ok(c) => c,
                        Err(err) => return Err((err, header)),
                    };
                    match sub_code {
                        GRAPHIC_CONTROL_EXTENSION_LABEL => match Self::read_gce(rdr) {
                            Ok(p) => pending = Some(p),
                            Err(err) => return Err((err, header)),
                        },
                        APPLICATION_EXTENSION_LABEL => match Self::read_application_ext(rdr, &mut sub) {
                            Ok(Some(loop_count)) => header.loop_count = loop_count,
                            Ok(None) => {}
                            Err(err) => return Err((err, header)),
                        },
                        COMMENT_EXTENSION_LABEL | PLAIN_TEXT_EXTENSION_LABEL => {
                            if let Err(err) = SubBlockReader::skip_blocks(rdr) {
                                return Err((err, header));
                            }
                        }
                        other => return Err((GifError::UnrecognizedExtension(other), header)),
                    }
                }
                other => {
                    return Err((
                        GifError::UnrecognizedBlock { code: other, position: rdr.position() - 1 },
                        header,
                    ));
                }
            }
        }

        header.has_dispose_previous =
            header.frames.iter().any(|f| f.dispose == Dispose::Previous);
        Ok(header)
    }

    fn read_gce(rdr: &mut ByteReader) -> Result<PendingFrame> {
        let block_size = rdr.read_u8()?;
        if block_size != 4 {
            return Err(GifError::UnexpectedLength {
                block_name: "Graphic Control Extension",
                expected: 4,
                got: block_size,
            });
        }
        let packed = rdr.read_u8()?;
        let mut raw_delay = rdr.read_u16_le()?;
        if raw_delay < 2 {
            raw_delay = 10;
        }
        let delay_ms = raw_delay as u32 * 10;
        let trans_index = rdr.read_u8()?;
        let terminator = rdr.read_u8()?;
        if terminator != 0 {
            return Err(GifError::ExpectedBlockTerminator { block_name: "Graphic Control Extension" });
        }

        let dispose = match (packed >> 2) & 0x07 {
            2 => Dispose::Background,
            3 => Dispose::Previous,
            _ => Dispose::None,
        };
        let transparency = packed & 0x01 != 0;

        Ok(PendingFrame { dispose, transparency, trans_index, delay_ms })
    }

    fn read_image_descriptor(rdr: &mut ByteReader, pending: PendingFrame) -> Result<Frame> {
        let ix = rdr.read_u16_le()?;
        let iy = rdr.read_u16_le()?;
        let iw = rdr.read_u16_le()?;
        let ih = rdr.read_u16_le()?;
        let packed = rdr.read_u8()?;
        let lct_flag = packed & 0x80 != 0;
        let interlace = packed & 0x40 != 0;
        let lct_size: usize = 2 << (packed & 0x07);

        let lct = if lct_flag { Some(color::parse_color_table(rdr, lct_size)?) } else { None };

        let buffer_frame_start = rdr.position();

        // Skip the LZW data itself: the minimum code size byte, then the
        // sub-block chain. The LZW decoder re-seeks here on demand.
        rdr.read_u8()?; // lzw_min_code_size
        SubBlockReader::skip_blocks(rdr)?;

        Ok(Frame {
            ix,
            iy,
            iw,
            ih,
            interlace,
            transparency: pending.transparency,
            trans_index: pending.trans_index,
            dispose: pending.dispose,
            delay_ms: pending.delay_ms,
            lct,
            buffer_frame_start,
        })
    }

    /// Reads an Application Extension. Returns `Some(loop_count)` only for
    /// a recognized NETSCAPE2.0 looping extension; all others (including
    /// unrecognized Netscape sub-blocks) are skipped and return `None`.
    fn read_application_ext(rdr: &mut ByteReader, sub: &mut SubBlockReader) -> Result<Option<i32>> {
        let n = sub.read_block(rdr)?;
        if n == 0 {
            return Ok(None);
        }
        let is_netscape = n == 11 && sub.block(n) == b"NETSCAPE2.0";
        if !is_netscape {
            SubBlockReader::skip_blocks(rdr)?;
            return Ok(None);
        }
        Self::read_netscape_ext(rdr, sub)
    }

    fn read_netscape_ext(rdr: &mut ByteReader, sub: &mut SubBlockReader) -> Result<Option<i32>> {
        let mut loop_count = None;
        loop {
            let n = sub.read_block(rdr)?;
            if n == 0 {
                break;
            }
            let block = sub.block(n);
            if n >= 3 && block[0] == 0x01 {
                let raw = u16::from_le_bytes([block[1], block[2]]);
                loop_count = Some(if raw == 0 { LOOP_FOREVER } else { raw as i32 });
            }
        }
        Ok(loop_count)
    }
}

struct PreludeResult {
    width: u16,
    height: u16,
    gct_flag: bool,
    gct_size: usize,
    gct: Option<ColorTable>,
    bg_index: u8,
    bg_color: u32,
    pixel_aspect: u8,
}
