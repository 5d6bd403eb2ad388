//! Pluggable allocation surface.
//!
//! The crate has no config file and no environment variable: construction
//! parameters, and this trait in particular, are the whole configuration
//! layer. A caller that wants pooled buffers (to avoid repeated large
//! allocations while animating) implements [`BufferProvider`] itself;
//! [`DefaultBufferProvider`] just allocates and drops.
//!
//! No direct teacher precedent for this component — the teacher renders
//! straight into a `minifb` window buffer it owns outright. Modeled on the
//! shape of the spec's own resource policy rather than lifted from any one
//! example file.

/// Pixel layout of a [`Raster`]. `Rgb565` is an optimization hint only:
/// every raster's backing storage is packed ARGB regardless of `format`,
/// so a caller that ignores the hint and always reads ARGB is still
/// correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Argb8888,
    Rgb565,
}

/// A `width * height` packed-ARGB raster, row-major.
pub struct Raster {
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
    pub pixels: Vec<u32>,
}

/// Caller-supplied allocator for the decoder's scratch buffers and output
/// rasters. Implementors may pool; [`DefaultBufferProvider`] does not.
pub trait BufferProvider {
    fn obtain_bytes(&self, size: usize) -> Vec<u8>;
    fn release_bytes(&self, buf: Vec<u8>);

    fn obtain_ints(&self, size: usize) -> Vec<u32>;
    fn release_ints(&self, buf: Vec<u32>);

    fn obtain_raster(&self, width: usize, height: usize, format: PixelFormat) -> Raster;
    fn release_raster(&self, raster: Raster);
}

/// Allocates fresh on every call and drops on release. Correct but not
/// tuned for repeated animation-loop allocation churn.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultBufferProvider;

impl BufferProvider for DefaultBufferProvider {
    fn obtain_bytes(&self, size: usize) -> Vec<u8> {
        vec![0u8; size]
    }

    fn release_bytes(&self, _buf: Vec<u8>) {}

    fn obtain_ints(&self, size: usize) -> Vec<u32> {
        vec![0u32; size]
    }

    fn release_ints(&self, _buf: Vec<u32>) {}

    fn obtain_raster(&self, width: usize, height: usize, format: PixelFormat) -> Raster {
        Raster { width, height, format, pixels: vec![0u32; width * height] }
    }

    fn release_raster(&self, _raster: Raster) {}
}
