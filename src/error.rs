//! Error types for mkvsource.

use crate::demux::SourceState;
use mkvsource_ebml::{EbmlError, ElementId};
use std::io;
use thiserror::Error;

/// Result type for demux operations.
pub type Result<T> = std::result::Result<T, DemuxError>;

/// Error type for demux operations.
#[derive(Debug, Error)]
pub enum DemuxError {
    /// I/O error from the byte source.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed EBML or block data.
    #[error("EBML error: {0}")]
    Ebml(#[from] EbmlError),

    /// The input does not start with an EBML header.
    #[error("Not a Matroska file: first element is {0}")]
    NotMatroska(ElementId),

    /// Header discovery ended without a Tracks element.
    #[error("Missing required element: Tracks")]
    MissingTracks,

    /// A metadata element is too large to buffer whole.
    #[error("Element {id} is {size} bytes, limit is {limit}")]
    ElementTooLarge { id: ElementId, size: u64, limit: u64 },

    /// A block produced more frames than the frame ring holds.
    #[error("Frame ring full (capacity {capacity})")]
    FrameRingFull { capacity: usize },

    /// Tried to consume more bytes than the window holds.
    #[error("Buffer underflow: need {need} bytes, have {have}")]
    BufferUnderflow { need: usize, have: usize },

    /// The byte source cannot seek.
    #[error("Byte source is not seekable")]
    NotSeekable,

    /// The byte source cannot be read.
    #[error("Byte source is not readable")]
    NotReadable,

    /// Operation requested after shutdown.
    #[error("Source is shut down")]
    Shutdown,

    /// Operation requires metadata that is still being discovered.
    #[error("Source is still opening")]
    NotReady,

    /// Operation not allowed in the current state.
    #[error("Cannot {operation} while {state}")]
    InvalidStateTransition {
        operation: &'static str,
        state: SourceState,
    },

    /// Seeking needs a Cues element.
    #[error("No cue index, cannot seek")]
    NoCueIndex,

    /// Track number not present in the Tracks element.
    #[error("Unknown track {0}")]
    UnknownTrack(u64),

    /// Track exists but is not selected.
    #[error("Track {0} is not selected")]
    TrackNotActive(u64),

    /// Track has delivered its last frame.
    #[error("Track {0} reached end of stream")]
    EndOfStream(u64),
}

impl DemuxError {
    /// Create an invalid state transition error.
    pub fn invalid_transition(operation: &'static str, state: SourceState) -> Self {
        Self::InvalidStateTransition { operation, state }
    }
}
