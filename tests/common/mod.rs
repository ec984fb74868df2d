//! Shared helpers for integration tests.
//!
//! [`MkvBuilder`] writes small synthetic Matroska files with the crate's own
//! var-int encoders, and [`run_session`] drives a [`DemuxSession`] over an
//! in-memory buffer with a configurable read chunk size.

#![allow(dead_code)]

use mkvsource::{CollectingSink, DemuxConfig, DemuxSession, Pump, ReadRequest, Result};
use mkvsource::source::Capabilities;
use mkvsource_ebml::vint::{encode_id, encode_signed, encode_size, encode_unknown_size, encode_var_int};
use mkvsource_ebml::ElementId;

pub const AVC_CODEC: &str = "V_MPEG4/ISO/AVC";

pub fn element(id: ElementId, payload: &[u8]) -> Vec<u8> {
    let mut out = encode_id(id.0);
    out.extend(encode_size(payload.len() as u64));
    out.extend_from_slice(payload);
    out
}

pub fn unknown_size_element(id: ElementId, payload: &[u8]) -> Vec<u8> {
    let mut out = encode_id(id.0);
    out.extend(encode_unknown_size(8));
    out.extend_from_slice(payload);
    out
}

pub fn uint(id: ElementId, value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = (value.leading_zeros() / 8).min(7) as usize;
    element(id, &bytes[skip..])
}

/// Unsigned element always stored in 8 bytes, so its size does not depend
/// on the value.
pub fn uint_fixed(id: ElementId, value: u64) -> Vec<u8> {
    element(id, &value.to_be_bytes())
}

pub fn float(id: ElementId, value: f64) -> Vec<u8> {
    element(id, &value.to_be_bytes())
}

pub fn string(id: ElementId, value: &str) -> Vec<u8> {
    element(id, value.as_bytes())
}

/// Deterministic frame contents.
pub fn frame_bytes(seed: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add(i as u8)).collect()
}

/// SimpleBlock payload: 4-byte header followed by `body` (lace header and
/// frames).
pub fn block_payload(track: u8, timecode: i16, flags: u8, body: &[u8]) -> Vec<u8> {
    let mut out = vec![0x80 | track];
    out.extend(timecode.to_be_bytes());
    out.push(flags);
    out.extend_from_slice(body);
    out
}

pub fn simple_block(track: u8, timecode: i16, keyframe: bool, frame: &[u8]) -> Vec<u8> {
    let flags = if keyframe { 0x80 } else { 0x00 };
    element(ElementId::SIMPLE_BLOCK, &block_payload(track, timecode, flags, frame))
}

pub fn fixed_laced_block(track: u8, timecode: i16, frames: &[Vec<u8>]) -> Vec<u8> {
    let mut body = vec![(frames.len() - 1) as u8];
    for frame in frames {
        body.extend_from_slice(frame);
    }
    element(ElementId::SIMPLE_BLOCK, &block_payload(track, timecode, 0x04, &body))
}

pub fn ebml_laced_block(track: u8, timecode: i16, frames: &[Vec<u8>]) -> Vec<u8> {
    let mut body = vec![(frames.len() - 1) as u8];
    body.extend(encode_size(frames[0].len() as u64));
    for pair in frames[..frames.len() - 1].windows(2) {
        let delta = pair[1].len() as i64 - pair[0].len() as i64;
        body.extend(encode_signed(delta, signed_len(delta)));
    }
    for frame in frames {
        body.extend_from_slice(frame);
    }
    element(ElementId::SIMPLE_BLOCK, &block_payload(track, timecode, 0x06, &body))
}

fn signed_len(delta: i64) -> usize {
    (1..=8)
        .find(|&len| delta.unsigned_abs() < (1u64 << (7 * len - 1)) - 1)
        .unwrap_or(8)
}

/// Block inside a BlockGroup.
pub fn block_group(track: u8, timecode: i16, frame: &[u8]) -> Vec<u8> {
    let block = element(ElementId::BLOCK, &block_payload(track, timecode, 0x00, frame));
    element(ElementId::BLOCK_GROUP, &block)
}

/// `avcC` with 4-byte NAL lengths, one SPS and one PPS.
pub fn avcc() -> Vec<u8> {
    vec![
        0x01, 0x64, 0x00, 0x1F, 0xFF, 0xE1, 0x00, 0x03, 0x67, 0x64, 0x1F, 0x01, 0x00, 0x02, 0x68,
        0xEE,
    ]
}

#[derive(Debug, Clone)]
pub struct TrackSpec {
    pub number: u64,
    pub kind: u64,
    pub codec_id: String,
    pub codec_private: Vec<u8>,
    pub default_duration_ns: Option<u64>,
    pub video: Option<(u64, u64)>,
    pub audio: Option<(u64, f64)>,
}

impl TrackSpec {
    pub fn video(number: u64, width: u64, height: u64) -> Self {
        Self {
            number,
            kind: 1,
            codec_id: AVC_CODEC.to_string(),
            codec_private: Vec::new(),
            default_duration_ns: Some(40_000_000),
            video: Some((width, height)),
            audio: None,
        }
    }

    pub fn audio(number: u64) -> Self {
        Self {
            number,
            kind: 2,
            codec_id: "A_OPUS".to_string(),
            codec_private: Vec::new(),
            default_duration_ns: Some(20_000_000),
            video: None,
            audio: Some((2, 48000.0)),
        }
    }

    pub fn with_codec_private(mut self, data: Vec<u8>) -> Self {
        self.codec_private = data;
        self
    }

    fn encode(&self) -> Vec<u8> {
        let mut entry = uint(ElementId::TRACK_NUMBER, self.number);
        entry.extend(uint(ElementId::TRACK_UID, self.number * 1000));
        entry.extend(uint(ElementId::TRACK_TYPE, self.kind));
        entry.extend(string(ElementId::CODEC_ID, &self.codec_id));
        if !self.codec_private.is_empty() {
            entry.extend(element(ElementId::CODEC_PRIVATE, &self.codec_private));
        }
        if let Some(ns) = self.default_duration_ns {
            entry.extend(uint(ElementId::DEFAULT_DURATION, ns));
        }
        if let Some((width, height)) = self.video {
            let mut video = uint(ElementId::PIXEL_WIDTH, width);
            video.extend(uint(ElementId::PIXEL_HEIGHT, height));
            entry.extend(element(ElementId::VIDEO, &video));
        }
        if let Some((channels, rate)) = self.audio {
            let mut audio = uint(ElementId::CHANNELS, channels);
            audio.extend(float(ElementId::SAMPLING_FREQUENCY, rate));
            entry.extend(element(ElementId::AUDIO, &audio));
        }
        element(ElementId::TRACK_ENTRY, &entry)
    }
}

/// Where the Cues element goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CuePlacement {
    None,
    /// Before the first cluster.
    Front,
    /// After the last cluster, found through the SeekHead.
    End,
}

#[derive(Debug, Clone)]
pub struct ClusterSpec {
    pub timecode: u64,
    /// Encoded SimpleBlock / BlockGroup elements.
    pub blocks: Vec<Vec<u8>>,
}

/// Synthetic Matroska file writer.
#[derive(Debug, Clone)]
pub struct MkvBuilder {
    pub tracks: Vec<TrackSpec>,
    pub clusters: Vec<ClusterSpec>,
    pub cues: CuePlacement,
    pub timecode_scale: u64,
    pub unknown_sizes: bool,
    /// Void element of this payload size after Tracks.
    pub void_len: usize,
}

impl Default for MkvBuilder {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            clusters: Vec::new(),
            cues: CuePlacement::None,
            timecode_scale: 1_000_000,
            unknown_sizes: false,
            void_len: 0,
        }
    }
}

impl MkvBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(mut self, track: TrackSpec) -> Self {
        self.tracks.push(track);
        self
    }

    pub fn cluster(mut self, timecode: u64, blocks: Vec<Vec<u8>>) -> Self {
        self.clusters.push(ClusterSpec { timecode, blocks });
        self
    }

    pub fn cues(mut self, placement: CuePlacement) -> Self {
        self.cues = placement;
        self
    }

    pub fn unknown_sizes(mut self) -> Self {
        self.unknown_sizes = true;
        self
    }

    pub fn void(mut self, len: usize) -> Self {
        self.void_len = len;
        self
    }

    fn ebml_header() -> Vec<u8> {
        let mut header = uint(ElementId::EBML_VERSION, 1);
        header.extend(uint(ElementId::EBML_READ_VERSION, 1));
        header.extend(string(ElementId::DOC_TYPE, "matroska"));
        header.extend(uint(ElementId::DOC_TYPE_VERSION, 4));
        header.extend(uint(ElementId::DOC_TYPE_READ_VERSION, 2));
        element(ElementId::EBML, &header)
    }

    fn info(&self) -> Vec<u8> {
        let mut info = uint(ElementId::TIMECODE_SCALE, self.timecode_scale);
        let last = self.clusters.last().map_or(0, |c| c.timecode);
        info.extend(float(ElementId::DURATION, (last + 40) as f64));
        info.extend(string(ElementId::MUXING_APP, "mkvsource-tests"));
        info.extend(string(ElementId::WRITING_APP, "mkvsource-tests"));
        element(ElementId::INFO, &info)
    }

    fn tracks(&self) -> Vec<u8> {
        let entries: Vec<u8> = self.tracks.iter().flat_map(TrackSpec::encode).collect();
        element(ElementId::TRACKS, &entries)
    }

    fn seek_head(&self, cues_position: u64) -> Vec<u8> {
        let mut seek = element(ElementId::SEEK_ID, &encode_id(ElementId::CUES.0));
        seek.extend(uint_fixed(ElementId::SEEK_POSITION, cues_position));
        element(ElementId::SEEK_HEAD, &element(ElementId::SEEK, &seek))
    }

    fn cues_element(&self, cluster_offsets: &[u64]) -> Vec<u8> {
        let track = self.tracks.first().map_or(1, |t| t.number);
        let points: Vec<u8> = self
            .clusters
            .iter()
            .zip(cluster_offsets)
            .flat_map(|(cluster, &offset)| {
                let mut pos = uint(ElementId::CUE_TRACK, track);
                pos.extend(uint_fixed(ElementId::CUE_CLUSTER_POSITION, offset));
                let mut point = uint_fixed(ElementId::CUE_TIME, cluster.timecode);
                point.extend(element(ElementId::CUE_TRACK_POSITIONS, &pos));
                element(ElementId::CUE_POINT, &point)
            })
            .collect();
        element(ElementId::CUES, &points)
    }

    fn encode_cluster(&self, cluster: &ClusterSpec) -> Vec<u8> {
        let mut body = uint(ElementId::TIMECODE, cluster.timecode);
        for block in &cluster.blocks {
            body.extend_from_slice(block);
        }
        if self.unknown_sizes {
            unknown_size_element(ElementId::CLUSTER, &body)
        } else {
            element(ElementId::CLUSTER, &body)
        }
    }

    /// Segment offset, i.e. the length of everything before the Segment
    /// payload.
    pub fn segment_offset(&self) -> u64 {
        (Self::ebml_header().len() + 4 + 8) as u64
    }

    pub fn build(&self) -> Vec<u8> {
        let clusters: Vec<Vec<u8>> = self.clusters.iter().map(|c| self.encode_cluster(c)).collect();

        let mut head = Vec::new();
        if self.cues == CuePlacement::End {
            // Fixed-width position, so the size is known before the value.
            head.extend(self.seek_head(0));
        }
        head.extend(self.info());
        head.extend(self.tracks());
        if self.void_len > 0 {
            head.extend(element(ElementId::VOID, &vec![0u8; self.void_len]));
        }

        // Cue sizes do not depend on the offsets they hold.
        let cues_len = self.cues_element(&vec![0; self.clusters.len()]).len() as u64;
        let mut offset = head.len() as u64;
        if self.cues == CuePlacement::Front {
            offset += cues_len;
        }
        let mut cluster_offsets = Vec::with_capacity(clusters.len());
        for cluster in &clusters {
            cluster_offsets.push(offset);
            offset += cluster.len() as u64;
        }
        let cues = self.cues_element(&cluster_offsets);

        let mut payload = Vec::new();
        match self.cues {
            CuePlacement::End => {
                let seek_head = self.seek_head(offset);
                payload.extend(&seek_head);
                payload.extend(&head[seek_head.len()..]);
                payload.extend(clusters.concat());
                payload.extend(cues);
            }
            CuePlacement::Front => {
                payload.extend(head);
                payload.extend(cues);
                payload.extend(clusters.concat());
            }
            CuePlacement::None => {
                payload.extend(head);
                payload.extend(clusters.concat());
            }
        }

        let mut out = Self::ebml_header();
        out.extend(encode_id(ElementId::SEGMENT.0));
        if self.unknown_sizes {
            out.extend(encode_unknown_size(8));
        } else {
            out.extend(encode_var_int(payload.len() as u64, 8));
        }
        out.extend(payload);
        out
    }
}

/// One video track, one Cluster, one unlaced 100-byte SimpleBlock.
pub fn minimal_avc_file(keyframe: bool) -> Vec<u8> {
    MkvBuilder::new()
        .track(TrackSpec::video(1, 640, 480))
        .cluster(0, vec![simple_block(1, 0, keyframe, &frame_bytes(7, 96))])
        .build()
}

/// Video track 1 and audio track 2 over three clusters, with cues.
pub fn two_track_file(cues: CuePlacement) -> Vec<u8> {
    let mut builder = MkvBuilder::new()
        .track(TrackSpec::video(1, 320, 240))
        .track(TrackSpec::audio(2))
        .cues(cues);
    for (i, timecode) in [0u64, 1000, 2000].into_iter().enumerate() {
        let seed = (i * 50) as u8;
        builder = builder.cluster(
            timecode,
            vec![
                simple_block(1, 0, true, &frame_bytes(seed, 300)),
                simple_block(2, 0, true, &frame_bytes(seed + 1, 40)),
                simple_block(1, 40, false, &frame_bytes(seed + 2, 120)),
                simple_block(2, 20, true, &frame_bytes(seed + 3, 40)),
            ],
        );
    }
    builder.build()
}

/// Answer `request` from `data`, returning at most `chunk` bytes.
pub fn fulfil(session: &mut DemuxSession, data: &[u8], request: ReadRequest, chunk: usize) -> bool {
    let start = (request.position as usize).min(data.len());
    let end = (start + request.len.min(chunk)).min(data.len());
    session
        .complete_read(request.generation, &data[start..end])
        .unwrap()
}

/// Open a session over `data` and finish header discovery.
pub fn open_session(
    data: &[u8],
    config: DemuxConfig,
    chunk: usize,
    sink: &mut CollectingSink,
) -> Result<DemuxSession> {
    let mut session = DemuxSession::open(Capabilities::default(), config)?;
    while let Pump::Read(request) = session.pump(sink)? {
        fulfil(&mut session, data, request, chunk);
    }
    Ok(session)
}

/// Request and deliver frames until every selected track has ended.
pub fn run_session(
    session: &mut DemuxSession,
    data: &[u8],
    chunk: usize,
    sink: &mut CollectingSink,
) -> Result<()> {
    loop {
        let hungry: Vec<u64> = session
            .streams()
            .filter(|s| s.is_active() && !s.is_finished() && s.outstanding_requests() == 0)
            .map(|s| s.track_number())
            .collect();
        for track in hungry {
            session.request_sample(track, sink)?;
        }
        if session.is_finished() {
            return Ok(());
        }
        match session.pump(sink)? {
            Pump::Read(request) => {
                fulfil(session, data, request, chunk);
            }
            Pump::Idle if !session.has_pending_delivery() => return Ok(()),
            Pump::Idle => {}
            Pump::Waiting => panic!("read left outstanding"),
        }
    }
}

/// Open, select every track and demux the whole file.
pub fn demux_all(data: &[u8], config: DemuxConfig, chunk: usize) -> Result<CollectingSink> {
    let mut sink = CollectingSink::new();
    let mut session = open_session(data, config, chunk, &mut sink)?;
    session.start(&[], None)?;
    run_session(&mut session, data, chunk, &mut sink)?;
    Ok(sink)
}
