//! Incremental demux session.
//!
//! [`DemuxSession`] owns the parser, the byte window and the per-track
//! streams, and never performs I/O itself. The caller alternates between
//! [`pump`](DemuxSession::pump), which runs the control loop until it needs
//! bytes or has nothing left to do, and
//! [`complete_read`](DemuxSession::complete_read), which hands over the
//! bytes of the single outstanding [`ReadRequest`].
//!
//! Every read request carries the session generation. Repositioning the
//! session (stop, start with a position, shutdown) bumps the generation, so
//! a completion for a read issued before that is recognised as stale and
//! dropped.

mod state;
mod stream;

pub use state::{SourceState, StreamState};
pub use stream::TrackStream;

use crate::avc::AvcConfig;
use crate::config::DemuxConfig;
use crate::error::{DemuxError, Result};
use crate::metadata::ContainerMetadata;
use crate::parser::{Parser, Progress};
use crate::seek::resolve_cluster_offset;
use crate::sink::{DecodedFrame, FrameSink};
use crate::source::Capabilities;
use crate::window::ByteWindow;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

/// Bytes the session wants: `len` bytes starting at absolute `position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    pub generation: u64,
    pub position: u64,
    pub len: usize,
}

/// Outcome of [`DemuxSession::pump`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pump {
    /// No stream needs data right now.
    Idle,
    /// Fulfil this read, then call `complete_read`.
    Read(ReadRequest),
    /// A read is already outstanding.
    Waiting,
}

/// Effect of one control-loop step on the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Consumed(usize),
    NeedMore(usize),
    Jump(u64),
}

/// Matroska demux state machine over a position-addressed byte source.
#[derive(Debug)]
pub struct DemuxSession {
    config: DemuxConfig,
    state: SourceState,
    parser: Parser,
    window: ByteWindow,
    streams: BTreeMap<u64, TrackStream>,
    avc: HashMap<u64, AvcConfig>,
    /// AVC tracks that already got parameter sets since the last reposition.
    primed: HashSet<u64>,
    generation: u64,
    in_flight: Option<ReadRequest>,
    /// Seek target in ticks, resolved on the next pump.
    pending_start: Option<u64>,
    input_ended: bool,
    /// Absolute offset of the first cluster to deliver from.
    data_start: u64,
}

impl DemuxSession {
    /// Create a session for a source with the given capabilities.
    ///
    /// Header discovery starts with the first [`pump`](Self::pump).
    pub fn open(capabilities: Capabilities, config: DemuxConfig) -> Result<Self> {
        if !capabilities.seekable {
            return Err(DemuxError::NotSeekable);
        }
        if !capabilities.readable {
            return Err(DemuxError::NotReadable);
        }

        Ok(Self {
            parser: Parser::new(&config),
            window: ByteWindow::with_capacity(config.initial_buffer_size),
            config,
            state: SourceState::Opening,
            streams: BTreeMap::new(),
            avc: HashMap::new(),
            primed: HashSet::new(),
            generation: 0,
            in_flight: None,
            pending_start: None,
            input_ended: false,
            data_start: 0,
        })
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Container metadata, once header discovery has finished.
    pub fn metadata(&self) -> Option<&ContainerMetadata> {
        self.parser.metadata()
    }

    pub fn stream(&self, track_number: u64) -> Option<&TrackStream> {
        self.streams.get(&track_number)
    }

    pub fn streams(&self) -> impl Iterator<Item = &TrackStream> {
        self.streams.values()
    }

    /// Every selected track has reported end of stream.
    pub fn is_finished(&self) -> bool {
        self.streams
            .values()
            .filter(|s| s.is_active())
            .all(TrackStream::is_finished)
    }

    /// Some started stream still has queued frames or unserved requests.
    pub fn has_pending_delivery(&self) -> bool {
        self.streams.values().any(|s| {
            s.is_active()
                && !s.is_finished()
                && s.state() == StreamState::Started
                && (s.queued() > 0 || s.outstanding_requests() > 0)
        })
    }

    /// Whether the control loop should run.
    pub fn needs_data(&self) -> bool {
        match self.state {
            SourceState::Opening => true,
            SourceState::Shutdown => false,
            _ => self.streams.values().any(TrackStream::needs_data),
        }
    }

    /// Run the control loop until it needs bytes or nothing needs data.
    pub fn pump(&mut self, sink: &mut dyn FrameSink) -> Result<Pump> {
        // Requests made while paused are served on resume.
        for stream in self.streams.values_mut() {
            stream.dispatch(sink);
        }

        loop {
            if self.state == SourceState::Shutdown {
                return Ok(Pump::Idle);
            }
            if self.in_flight.is_some() {
                return Ok(Pump::Waiting);
            }
            if self.state == SourceState::Opening && self.parser.is_header_complete() {
                self.load_metadata(sink);
            }
            if !self.needs_data() {
                return Ok(Pump::Idle);
            }

            let step = if self.parser.is_end_of_stream() {
                self.signal_end_of_stream(sink);
                continue;
            } else if self.parser.has_frames() {
                self.read_payload(sink)?
            } else if let Some(target) = self.pending_start.take() {
                self.seek_to_cue(target)
            } else {
                match self.parser.parse(self.window.data(), self.window.position())? {
                    Progress::Progressed(n) => Step::Consumed(n),
                    Progress::NeedMoreData(n) => Step::NeedMore(n),
                    Progress::SeekRequired(offset) => Step::Jump(offset),
                }
            };

            match step {
                Step::Consumed(n) => self.window.move_start(n)?,
                Step::Jump(offset) => {
                    tracing::debug!(from = self.window.position(), to = offset, "Jumping");
                    self.window.reset_to(offset);
                    self.input_ended = false;
                }
                Step::NeedMore(n) if self.input_ended => self.handle_end_of_input(n)?,
                Step::NeedMore(n) => {
                    let request = ReadRequest {
                        generation: self.generation,
                        position: self.window.end_position(),
                        len: n
                            .max(self.config.read_size)
                            .min(self.config.max_read_size),
                    };
                    tracing::trace!(
                        position = request.position,
                        len = request.len,
                        "Requesting bytes"
                    );
                    self.in_flight = Some(request);
                    return Ok(Pump::Read(request));
                }
            }
        }
    }

    /// Deliver the bytes for an outstanding read. Empty `data` means end of
    /// input.
    ///
    /// Returns false when the completion is stale and was dropped.
    pub fn complete_read(&mut self, generation: u64, data: &[u8]) -> Result<bool> {
        let Some(request) = self.in_flight.take() else {
            tracing::warn!(generation, "Read completion without a pending read");
            return Ok(false);
        };
        if request.generation != generation || generation != self.generation {
            tracing::warn!(
                generation,
                current = self.generation,
                "Dropping stale read completion"
            );
            return Ok(false);
        }
        if self.state == SourceState::Shutdown {
            return Err(DemuxError::Shutdown);
        }

        if data.is_empty() {
            tracing::debug!(position = request.position, "End of input");
            self.input_ended = true;
        } else {
            self.window.extend_from_slice(data);
        }
        Ok(true)
    }

    /// Select tracks and start delivery.
    ///
    /// An empty `selection` selects every track. `position` seeks through
    /// the cue index; `Some(Duration::ZERO)` restarts from the first
    /// cluster without needing cues. Without a position, a paused session
    /// resumes where it was.
    pub fn start(&mut self, selection: &[u64], position: Option<Duration>) -> Result<()> {
        self.ensure_ready()?;
        let Some(metadata) = self.parser.metadata() else {
            return Err(DemuxError::NotReady);
        };

        if let Some(&unknown) = selection.iter().find(|&&t| metadata.track(t).is_none()) {
            return Err(DemuxError::UnknownTrack(unknown));
        }
        let target = position.map(|p| metadata.time_to_ticks(p));
        if target.is_some_and(|t| t > 0) && metadata.cues.is_empty() {
            return Err(DemuxError::NoCueIndex);
        }

        for stream in self.streams.values_mut() {
            let selected = selection.is_empty() || selection.contains(&stream.track_number());
            stream.set_active(selected);
            if selected {
                stream.start();
            } else {
                stream.stop();
            }
        }

        match target {
            Some(0) => {
                self.reposition();
                self.window.reset_to(self.data_start);
            }
            Some(ticks) => {
                self.reposition();
                self.pending_start = Some(ticks);
            }
            None => {}
        }

        tracing::debug!(?selection, ?position, "Source started");
        self.state = SourceState::Started;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        if self.state != SourceState::Started {
            return Err(DemuxError::invalid_transition("pause", self.state));
        }
        for stream in self.streams.values_mut() {
            stream.pause();
        }
        self.state = SourceState::Paused;
        Ok(())
    }

    /// Drop queued frames and rewind to the first cluster.
    pub fn stop(&mut self) -> Result<()> {
        self.ensure_ready()?;
        for stream in self.streams.values_mut() {
            stream.stop();
        }
        self.reposition();
        self.window.reset_to(self.data_start);
        self.state = SourceState::Stopped;
        tracing::debug!(generation = self.generation, "Source stopped");
        Ok(())
    }

    /// Release everything. No other operation succeeds afterwards.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.state == SourceState::Shutdown {
            return Err(DemuxError::Shutdown);
        }
        self.streams.clear();
        self.reposition();
        self.window = ByteWindow::default();
        self.state = SourceState::Shutdown;
        tracing::debug!("Source shut down");
        Ok(())
    }

    /// Ask for one more frame on `track_number`; queued frames are
    /// delivered immediately.
    pub fn request_sample(&mut self, track_number: u64, sink: &mut dyn FrameSink) -> Result<()> {
        self.ensure_ready()?;
        let stream = self
            .streams
            .get_mut(&track_number)
            .ok_or(DemuxError::UnknownTrack(track_number))?;
        if !stream.is_active() {
            return Err(DemuxError::TrackNotActive(track_number));
        }
        if stream.is_finished() {
            return Err(DemuxError::EndOfStream(track_number));
        }
        stream.request();
        stream.dispatch(sink);
        Ok(())
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            SourceState::Shutdown => Err(DemuxError::Shutdown),
            SourceState::Opening => Err(DemuxError::NotReady),
            _ => Ok(()),
        }
    }

    /// Forget everything tied to the current input position.
    fn reposition(&mut self) {
        self.generation += 1;
        self.parser.reset_stream();
        self.pending_start = None;
        self.input_ended = false;
        self.primed.clear();
        for stream in self.streams.values_mut() {
            stream.reset();
        }
    }

    fn load_metadata(&mut self, sink: &mut dyn FrameSink) {
        let Some(metadata) = self.parser.metadata() else {
            return;
        };

        for track in &metadata.tracks {
            self.streams.insert(
                track.track_number,
                TrackStream::new(track.track_number, self.config.sample_queue),
            );
            if self.config.annexb && track.is_avc() {
                match AvcConfig::parse(&track.codec_private) {
                    Some(avc) => {
                        self.avc.insert(track.track_number, avc);
                    }
                    None => tracing::warn!(
                        track = track.track_number,
                        "Invalid avcC CodecPrivate, passing frames through"
                    ),
                }
            }
        }

        self.data_start = self.parser.streaming_start();
        tracing::info!(
            tracks = metadata.tracks.len(),
            cues = metadata.cues.len(),
            data_start = self.data_start,
            "Streams ready"
        );
        sink.on_streams_ready(metadata);
        self.state = SourceState::Stopped;
    }

    fn signal_end_of_stream(&mut self, sink: &mut dyn FrameSink) {
        for stream in self.streams.values_mut().filter(|s| s.is_active()) {
            if !stream.is_end_of_stream() {
                stream.end_of_stream();
                stream.dispatch(sink);
            }
        }
    }

    /// Deliver or skip the frame at the head of the ring.
    fn read_payload(&mut self, sink: &mut dyn FrameSink) -> Result<Step> {
        let Some(frame) = self.parser.frames().peek().copied() else {
            return Ok(Step::Consumed(0));
        };
        let len = frame.byte_length;
        let available = self.window.len();

        let active = self
            .streams
            .get(&frame.track_number)
            .is_some_and(TrackStream::is_active);
        if !active {
            self.parser.pop_frame();
            if available >= len {
                return Ok(Step::Consumed(len));
            }
            tracing::trace!(track = frame.track_number, len, "Skipping unselected frame");
            return Ok(Step::Jump(self.window.position() + len as u64));
        }
        if available < len {
            return Ok(Step::NeedMore(len - available));
        }

        let (timestamp_ns, duration_ns) = match self.parser.metadata() {
            Some(metadata) => (
                metadata.ticks_to_ns(frame.timestamp_ticks),
                metadata
                    .track(frame.track_number)
                    .and_then(|t| t.default_duration_ns),
            ),
            None => (frame.timestamp_ticks, None),
        };

        let raw = &self.window.data()[..len];
        let data = match self.avc.get(&frame.track_number) {
            Some(avc) => {
                let annexb = avc.to_annexb(raw);
                let first = self.primed.insert(frame.track_number);
                if first || frame.is_keyframe {
                    Bytes::from(avc.prepend_parameter_sets(&annexb))
                } else {
                    Bytes::from(annexb)
                }
            }
            None => Bytes::copy_from_slice(raw),
        };

        let decoded = DecodedFrame {
            track_number: frame.track_number,
            timestamp_ticks: frame.timestamp_ticks,
            timestamp_ns,
            duration_ns,
            is_keyframe: frame.is_keyframe,
            byte_length: len,
            data,
        };
        if let Some(stream) = self.streams.get_mut(&frame.track_number) {
            stream.push(decoded);
            stream.dispatch(sink);
        }
        self.parser.pop_frame();
        Ok(Step::Consumed(len))
    }

    /// Jump to the cluster of the last cue at or before `target_ticks`.
    fn seek_to_cue(&mut self, target_ticks: u64) -> Step {
        let track = self
            .streams
            .values()
            .find(|s| s.is_active())
            .map(TrackStream::track_number);
        let offset = self
            .parser
            .metadata()
            .and_then(|m| {
                resolve_cluster_offset(&m.cues, target_ticks, track).map(|rel| m.segment_offset + rel)
            })
            .unwrap_or(self.data_start);

        tracing::debug!(target_ticks, offset, "Seeking via cues");
        self.parser.reset_stream();
        Step::Jump(offset)
    }

    /// The input ended while `needed` more bytes were wanted.
    fn handle_end_of_input(&mut self, needed: usize) -> Result<()> {
        if self.parser.has_frames() {
            tracing::warn!(needed, "Input ended inside a frame");
            self.parser.reset_stream();
        }
        if let Some(start) = self.parser.end_of_input()? {
            self.window.reset_to(start);
            self.input_ended = false;
        }
        Ok(())
    }
}
