//! mkvsource - incremental Matroska/WebM demuxer
//!
//! The demuxer reads a Matroska container from any seekable byte source in
//! bounded chunks and hands out per-track elementary frames with
//! timestamps. Wire-level EBML decoding lives in the `mkvsource-ebml`
//! crate; this crate adds buffering, metadata extraction, the incremental
//! parser and the demux state machine.
//!
//! Two ways in:
//!
//! - [`DemuxSession`] is sans-IO: call [`DemuxSession::pump`], fulfil the
//!   returned [`ReadRequest`] however you like, and feed the bytes back with
//!   [`DemuxSession::complete_read`].
//! - [`MkvSource`] drives a session from an async [`ByteSource`].

pub mod avc;
pub mod config;
pub mod demux;
pub mod driver;
pub mod error;
pub mod frames;
pub mod metadata;
pub mod parser;
pub mod seek;
pub mod sink;
pub mod source;
pub mod window;

pub use config::DemuxConfig;
pub use demux::{DemuxSession, Pump, ReadRequest, SourceState};
pub use driver::MkvSource;
pub use error::{DemuxError, Result};
pub use metadata::{ContainerMetadata, TrackEntry, TrackKind};
pub use sink::{CollectingSink, DecodedFrame, FrameSink};
pub use source::{ByteSource, Capabilities, FileSource, MemorySource};
