//! Error types.
//!
//! As in most of this crate, there's no point reaching for a derive-macro
//! error crate here: the list of failure kinds is small and stable, so a
//! plain enum with a hand-written `Display` does the job.

use std::fmt;

/// Internal failure kind, used with `?` while parsing and decoding.
///
/// Never leaves the crate's public surface: [`crate::Decoder`] flattens
/// every `GifError` it encounters into a [`Status`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GifError {
    /// Input was empty, or didn't start with the `"GIF"` signature.
    NotAGif,
    /// Signature was `"GIF"` but the version wasn't `"87a"` or `"89a"`.
    UnsupportedVersion,
    /// A read went past the end of the buffer.
    UnexpectedEof,
    /// A block-size field didn't match what its block requires.
    UnexpectedLength { block_name: &'static str, expected: u8, got: u8 },
    /// A sub-block chain wasn't terminated the way its block requires.
    ExpectedBlockTerminator { block_name: &'static str },
    /// Neither a local nor a global color table is available for a frame.
    NoColorTable,
    /// A content block code wasn't one of the recognized block IDs.
    UnrecognizedBlock { code: u8, position: usize },
    /// An extension introducer was followed by an unrecognized sub-code.
    UnrecognizedExtension(u8),
    /// The LZW code stream referenced a dictionary entry that doesn't
    /// exist yet, or ran out of sub-blocks before producing every pixel.
    LzwTruncated,
}

impl fmt::Display for GifError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GifError::NotAGif => write!(f, "input does not start with a GIF signature"),
            GifError::UnsupportedVersion => write!(f, "unsupported GIF version"),
            GifError::UnexpectedEof => write!(f, "unexpected end of buffer"),
            GifError::UnexpectedLength { block_name, expected, got } => write!(
                f,
                "unexpected length for the \"{}\" block: expected {}, got {}",
                block_name, expected, got
            ),
            GifError::ExpectedBlockTerminator { block_name } => {
                write!(f, "expected a block terminator at the end of the \"{}\" block", block_name)
            }
            GifError::NoColorTable => write!(f, "no active color table for the current frame"),
            GifError::UnrecognizedBlock { code, position } => {
                write!(f, "unrecognized block 0x{:02x} at position {}", code, position)
            }
            GifError::UnrecognizedExtension(code) => {
                write!(f, "unrecognized extension sub-code 0x{:02x}", code)
            }
            GifError::LzwTruncated => write!(f, "LZW stream truncated or dictionary overflowed"),
        }
    }
}

impl std::error::Error for GifError {}

pub type Result<T> = std::result::Result<T, GifError>;

/// Public status code exposed by [`crate::Decoder`] and [`crate::Header`].
///
/// `FormatError` and `OpenError` are sticky: once set they stay set for the
/// life of the header/decoder. `PartialDecode` is not sticky: it is reset
/// at the start of every [`crate::Decoder::get_current_frame`] call, since
/// a later frame may decode cleanly even if an earlier one didn't.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0,
    FormatError = 1,
    OpenError = 2,
    PartialDecode = 3,
}

impl Status {
    pub fn is_sticky(self) -> bool {
        matches!(self, Status::FormatError | Status::OpenError)
    }
}

impl From<&GifError> for Status {
    fn from(err: &GifError) -> Status {
        match err {
            GifError::NotAGif => Status::OpenError,
            GifError::LzwTruncated => Status::PartialDecode,
            _ => Status::FormatError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sticky_statuses() {
        assert!(Status::FormatError.is_sticky());
        assert!(Status::OpenError.is_sticky());
        assert!(!Status::PartialDecode.is_sticky());
        assert!(!Status::Ok.is_sticky());
    }

    #[test]
    fn error_to_status_mapping() {
        assert_eq!(Status::from(&GifError::NotAGif), Status::OpenError);
        assert_eq!(Status::from(&GifError::LzwTruncated), Status::PartialDecode);
        assert_eq!(Status::from(&GifError::NoColorTable), Status::FormatError);
    }
}
