//! Per-track sample queue.

use super::state::StreamState;
use crate::sink::{DecodedFrame, FrameSink};
use std::collections::VecDeque;

/// Output side of one track: selection, queued frames and outstanding
/// requests.
#[derive(Debug)]
pub struct TrackStream {
    track_number: u64,
    active: bool,
    state: StreamState,
    queue: VecDeque<DecodedFrame>,
    queue_depth: usize,
    requests: usize,
    end_of_stream: bool,
    end_sent: bool,
    /// Running timestamp, advanced by the default duration per frame.
    position_ns: i64,
    delivered: u64,
}

impl TrackStream {
    pub fn new(track_number: u64, queue_depth: usize) -> Self {
        Self {
            track_number,
            active: false,
            state: StreamState::Stopped,
            queue: VecDeque::with_capacity(queue_depth),
            queue_depth,
            requests: 0,
            end_of_stream: false,
            end_sent: false,
            position_ns: 0,
            delivered: 0,
        }
    }

    pub fn track_number(&self) -> u64 {
        self.track_number
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn outstanding_requests(&self) -> usize {
        self.requests
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.end_of_stream
    }

    /// End of stream was reported to the sink.
    pub fn is_finished(&self) -> bool {
        self.end_sent
    }

    pub fn position_ns(&self) -> i64 {
        self.position_ns
    }

    /// Frames handed to the sink since the last reset.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Whether the demuxer should parse further on this stream's behalf.
    pub fn needs_data(&self) -> bool {
        self.active && !self.end_of_stream && self.queue.len() < self.queue_depth
    }

    pub fn start(&mut self) {
        self.state = StreamState::Started;
    }

    pub fn pause(&mut self) {
        if self.state == StreamState::Started {
            self.state = StreamState::Paused;
        }
    }

    pub fn stop(&mut self) {
        self.state = StreamState::Stopped;
        self.reset();
    }

    /// Drop queued frames and requests, as after a reposition.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.requests = 0;
        self.end_of_stream = false;
        self.end_sent = false;
        self.delivered = 0;
    }

    pub fn request(&mut self) {
        self.requests += 1;
    }

    /// Queue a frame and advance the running timestamp.
    pub fn push(&mut self, frame: DecodedFrame) {
        self.position_ns = frame.timestamp_ns + frame.duration_ns.unwrap_or(0) as i64;
        self.queue.push_back(frame);
    }

    pub fn end_of_stream(&mut self) {
        self.end_of_stream = true;
    }

    /// Hand queued frames to the sink while requests are outstanding, then
    /// report end of stream once the queue has drained.
    pub fn dispatch(&mut self, sink: &mut dyn FrameSink) {
        if self.state != StreamState::Started {
            return;
        }
        while self.requests > 0 {
            let Some(frame) = self.queue.pop_front() else {
                break;
            };
            self.requests -= 1;
            self.delivered += 1;
            tracing::trace!(
                track = self.track_number,
                timestamp_ns = frame.timestamp_ns,
                len = frame.byte_length,
                "Delivering frame"
            );
            sink.on_frame(frame);
        }
        if self.end_of_stream && self.queue.is_empty() && !self.end_sent {
            self.end_sent = true;
            tracing::debug!(track = self.track_number, "End of stream");
            sink.on_end_of_stream(self.track_number);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CollectingSink;
    use bytes::Bytes;

    fn frame(ts: i64) -> DecodedFrame {
        DecodedFrame {
            track_number: 1,
            timestamp_ticks: ts,
            timestamp_ns: ts * 1_000_000,
            duration_ns: Some(40_000_000),
            is_keyframe: false,
            byte_length: 4,
            data: Bytes::from_static(b"abcd"),
        }
    }

    #[test]
    fn test_needs_data_tracks_queue_depth() {
        let mut stream = TrackStream::new(1, 2);
        assert!(!stream.needs_data());
        stream.set_active(true);
        assert!(stream.needs_data());
        stream.push(frame(0));
        stream.push(frame(40));
        assert!(!stream.needs_data());
        assert_eq!(stream.position_ns(), 80_000_000);
    }

    #[test]
    fn test_dispatch_requires_start_and_request() {
        let mut sink = CollectingSink::new();
        let mut stream = TrackStream::new(1, 2);
        stream.set_active(true);
        stream.push(frame(0));

        stream.request();
        stream.dispatch(&mut sink);
        assert!(sink.frames.is_empty());

        stream.start();
        stream.dispatch(&mut sink);
        assert_eq!(sink.frames.len(), 1);
        assert_eq!(stream.outstanding_requests(), 0);
    }

    #[test]
    fn test_end_of_stream_fires_once_after_drain() {
        let mut sink = CollectingSink::new();
        let mut stream = TrackStream::new(1, 2);
        stream.set_active(true);
        stream.start();
        stream.push(frame(0));
        stream.end_of_stream();

        stream.dispatch(&mut sink);
        assert!(sink.ended.is_empty());

        stream.request();
        stream.dispatch(&mut sink);
        stream.dispatch(&mut sink);
        assert_eq!(sink.ended, vec![1]);
        assert!(stream.is_finished());
        assert!(!stream.needs_data());
    }

    #[test]
    fn test_stop_clears_queue() {
        let mut stream = TrackStream::new(1, 2);
        stream.set_active(true);
        stream.start();
        stream.push(frame(0));
        stream.request();
        stream.stop();
        assert_eq!(stream.queued(), 0);
        assert_eq!(stream.outstanding_requests(), 0);
        assert_eq!(stream.state(), StreamState::Stopped);
    }
}
