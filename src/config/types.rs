use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub demux: DemuxConfig,
}

/// Buffering and delivery settings for a demux session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DemuxConfig {
    /// Minimum bytes requested per read
    #[serde(default = "default_read_size")]
    pub read_size: usize,

    /// Largest single read request
    #[serde(default = "default_max_read_size")]
    pub max_read_size: usize,

    /// Initial byte window allocation
    #[serde(default = "default_initial_buffer_size")]
    pub initial_buffer_size: usize,

    /// Frames each active stream keeps queued ahead of requests
    #[serde(default = "default_sample_queue")]
    pub sample_queue: usize,

    /// Pending frames one block may produce
    #[serde(default = "default_frame_ring_capacity")]
    pub frame_ring_capacity: usize,

    /// Largest metadata element (Tracks, Cues, ...) buffered whole
    #[serde(default = "default_max_element_size")]
    pub max_element_size: u64,

    /// Largest frame buffered for delivery
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: u64,

    /// Rewrite H.264 frames from length-prefixed to Annex-B start codes
    #[serde(default)]
    pub annexb: bool,
}

fn default_read_size() -> usize {
    4096
}

fn default_max_read_size() -> usize {
    4 * 1024 * 1024
}

fn default_initial_buffer_size() -> usize {
    4096
}

fn default_sample_queue() -> usize {
    2
}

fn default_frame_ring_capacity() -> usize {
    crate::frames::DEFAULT_RING_CAPACITY
}

fn default_max_element_size() -> u64 {
    64 * 1024 * 1024
}

fn default_max_frame_size() -> u64 {
    64 * 1024 * 1024
}

impl Default for DemuxConfig {
    fn default() -> Self {
        Self {
            read_size: default_read_size(),
            max_read_size: default_max_read_size(),
            initial_buffer_size: default_initial_buffer_size(),
            sample_queue: default_sample_queue(),
            frame_ring_capacity: default_frame_ring_capacity(),
            max_element_size: default_max_element_size(),
            max_frame_size: default_max_frame_size(),
            annexb: false,
        }
    }
}
