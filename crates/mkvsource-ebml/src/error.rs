//! Error types for mkvsource-ebml.

use thiserror::Error;

/// Result type for EBML decoding operations.
pub type Result<T> = std::result::Result<T, EbmlError>;

/// Error type for EBML decoding operations.
///
/// `Incomplete` is the routine "buffer ends mid-element" outcome. Every other
/// variant describes input that can never decode, no matter how many more
/// bytes arrive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EbmlError {
    /// The buffer ends before the value does.
    #[error("Incomplete data: need {needed} more bytes")]
    Incomplete { needed: usize },

    /// The first byte of a var-int has no length marker in its top 8 bits.
    #[error("Invalid var-int leading byte 0x{0:02X}")]
    InvalidVarInt(u8),

    /// A var-int was requested as both signed and with marker bits kept.
    #[error("Var-int cannot be read as signed while keeping marker bits")]
    ContradictoryVarInt,

    /// An element ID does not fit in four bytes.
    #[error("Element ID too long: {0} bytes")]
    IdTooLong(usize),

    /// A child element claims more bytes than its parent has left.
    #[error("Element 0x{id:X} of {size} bytes overruns its parent ({remaining} bytes left)")]
    ChildOverrun { id: u32, size: u64, remaining: u64 },

    /// An element with unknown size appeared where a sized one is required.
    #[error("Element 0x{0:X} has unknown size")]
    UnknownSize(u32),

    /// Master elements nested deeper than the reader allows.
    #[error("Element nesting deeper than {0} levels")]
    TooDeep(usize),

    /// Integer leaf longer than 8 bytes.
    #[error("Integer element 0x{id:X} is {len} bytes long")]
    IntegerTooLong { id: u32, len: u64 },

    /// Xiph lacing is not supported.
    #[error("Unsupported lacing: Xiph")]
    XiphLacing,

    /// A laced block holds more frames than the frame ring can take.
    #[error("Laced block has {count} frames, ring has room for {capacity}")]
    TooManyFrames { count: usize, capacity: usize },

    /// Block track numbers must fit a single-byte var-int.
    #[error("Unsupported multi-byte block track number (leading byte 0x{0:02X})")]
    UnsupportedTrackNumber(u8),

    /// Block or lace header is inconsistent with the block size.
    #[error("Malformed block: {0}")]
    MalformedBlock(String),
}

impl EbmlError {
    /// Create a malformed block error.
    pub fn malformed_block(msg: impl Into<String>) -> Self {
        Self::MalformedBlock(msg.into())
    }

    /// Whether this error only means more bytes are needed.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::Incomplete { .. })
    }

    /// Bytes still missing, for `Incomplete` errors.
    pub fn needed(&self) -> Option<usize> {
        match self {
            Self::Incomplete { needed } => Some(*needed),
            _ => None,
        }
    }
}
