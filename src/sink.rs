//! Frame output seam.

use crate::metadata::ContainerMetadata;
use bytes::Bytes;
use serde::Serialize;

/// One elementary frame ready for a decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedFrame {
    pub track_number: u64,
    /// Block timestamp in segment ticks.
    pub timestamp_ticks: i64,
    /// Block timestamp in nanoseconds.
    pub timestamp_ns: i64,
    /// The track's DefaultDuration, if it has one.
    pub duration_ns: Option<u64>,
    pub is_keyframe: bool,
    /// Length of the frame as stored in the container.
    pub byte_length: usize,
    /// Frame bytes; rewritten to Annex-B for AVC tracks when enabled.
    #[serde(skip)]
    pub data: Bytes,
}

/// Receives demuxer output.
///
/// All callbacks run on the thread driving the session.
pub trait FrameSink {
    /// Header discovery finished. Called once per session.
    fn on_streams_ready(&mut self, metadata: &ContainerMetadata);

    /// A frame for a started track with an outstanding request.
    fn on_frame(&mut self, frame: DecodedFrame);

    /// A track delivered its last frame. Called once per track.
    fn on_end_of_stream(&mut self, track_number: u64);

    /// Whether the driver should keep requesting frames.
    fn wants_more(&self) -> bool {
        true
    }
}

/// Sink that keeps everything it receives, optionally up to a frame limit.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub metadata: Option<ContainerMetadata>,
    pub frames: Vec<DecodedFrame>,
    pub ended: Vec<u64>,
    pub limit: Option<usize>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Frames of one track, in delivery order.
    pub fn track_frames(&self, track_number: u64) -> impl Iterator<Item = &DecodedFrame> {
        self.frames
            .iter()
            .filter(move |f| f.track_number == track_number)
    }
}

impl FrameSink for CollectingSink {
    fn on_streams_ready(&mut self, metadata: &ContainerMetadata) {
        self.metadata = Some(metadata.clone());
    }

    fn on_frame(&mut self, frame: DecodedFrame) {
        self.frames.push(frame);
    }

    fn on_end_of_stream(&mut self, track_number: u64) {
        self.ended.push(track_number);
    }

    fn wants_more(&self) -> bool {
        self.limit.map_or(true, |limit| self.frames.len() < limit)
    }
}
