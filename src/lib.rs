//! Core engine for decoding animated GIFs: a byte-stream parser, an LZW
//! decompressor, and a temporal compositor, tied together behind a small
//! mutex-guarded facade.
//!
//! Display, scheduling and I/O are deliberately out of scope — this crate
//! turns a fully-buffered GIF byte stream into packed-ARGB rasters, one
//! frame at a time, and leaves timing and presentation to the caller.

mod buffer_provider;
mod byte_reader;
mod color;
mod compositor;
mod decoder;
mod error;
mod header;
mod lzw;
mod sub_block;

pub use buffer_provider::{BufferProvider, DefaultBufferProvider, PixelFormat, Raster};
pub use color::ColorTable;
pub use decoder::Decoder;
pub use error::{GifError, Status};
pub use header::{Dispose, Frame, Header, HeaderParser, LOOP_FOREVER};
