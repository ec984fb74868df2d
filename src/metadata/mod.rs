//! Container metadata model.
//!
//! Built once during header discovery by [`MetadataBuilder`] and treated
//! as immutable afterwards.

mod extract;

pub use extract::MetadataBuilder;

use serde::Serialize;
use std::time::Duration;

/// Default TimecodeScale: one tick is one millisecond.
pub const DEFAULT_TIMECODE_SCALE: u64 = 1_000_000;

/// Everything learned from the EBML header and the Segment's top-level
/// metadata elements.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContainerMetadata {
    pub ebml: EbmlHeader,
    /// Absolute offset of the Segment payload; seek and cue positions are
    /// relative to it.
    pub segment_offset: u64,
    pub info: SegmentInfo,
    pub seek_head: Vec<SeekHeadEntry>,
    pub tracks: Vec<TrackEntry>,
    pub cues: Vec<CuePoint>,
}

impl ContainerMetadata {
    /// Track with the given number.
    pub fn track(&self, track_number: u64) -> Option<&TrackEntry> {
        self.tracks.iter().find(|t| t.track_number == track_number)
    }

    /// Convert segment ticks to nanoseconds.
    pub fn ticks_to_ns(&self, ticks: i64) -> i64 {
        ticks.saturating_mul(self.info.timecode_scale as i64)
    }

    /// Convert a presentation time to segment ticks.
    pub fn time_to_ticks(&self, time: Duration) -> u64 {
        let scale = self.info.timecode_scale.max(1) as u128;
        (time.as_nanos() / scale) as u64
    }

    /// Segment duration, when the Info element declares one.
    pub fn duration(&self) -> Option<Duration> {
        let ticks = self.info.duration_ticks?;
        let nanos = ticks * self.info.timecode_scale as f64;
        (nanos.is_finite() && nanos >= 0.0).then(|| Duration::from_nanos(nanos as u64))
    }
}

/// Informational fields of the EBML header.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EbmlHeader {
    pub doc_type: String,
    pub doc_type_version: u64,
    pub doc_type_read_version: u64,
    pub ebml_read_version: u64,
}

/// Segment Info element.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentInfo {
    /// Nanoseconds per tick.
    pub timecode_scale: u64,
    pub duration_ticks: Option<f64>,
    pub muxing_app: String,
    pub writing_app: String,
    pub title: Option<String>,
    /// Seconds since the Unix epoch.
    pub date_utc: Option<i64>,
}

impl Default for SegmentInfo {
    fn default() -> Self {
        Self {
            timecode_scale: DEFAULT_TIMECODE_SCALE,
            duration_ticks: None,
            muxing_app: String::new(),
            writing_app: String::new(),
            title: None,
            date_utc: None,
        }
    }
}

/// One SeekHead entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeekHeadEntry {
    /// Catalog name of the referenced element.
    pub element_name: String,
    pub element_id: u32,
    /// Offset relative to the Segment payload.
    pub seek_position: u64,
}

/// Track type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
    Subtitle,
    Other(u64),
}

impl TrackKind {
    pub fn from_code(code: u64) -> Self {
        match code {
            1 => Self::Video,
            2 => Self::Audio,
            17 => Self::Subtitle,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> u64 {
        match self {
            Self::Video => 1,
            Self::Audio => 2,
            Self::Subtitle => 17,
            Self::Other(code) => code,
        }
    }
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Subtitle => write!(f, "subtitle"),
            Self::Other(code) => write!(f, "type {}", code),
        }
    }
}

/// One TrackEntry.
///
/// Video tracks always carry `video`, audio tracks always carry `audio`.
#[derive(Debug, Clone, Serialize)]
pub struct TrackEntry {
    pub track_number: u64,
    pub track_uid: Option<u64>,
    pub kind: TrackKind,
    pub codec_id: String,
    #[serde(skip)]
    pub codec_private: Vec<u8>,
    pub default_duration_ns: Option<u64>,
    pub name: Option<String>,
    pub language: Option<String>,
    pub enabled: bool,
    pub default: bool,
    pub forced: bool,
    pub video: Option<VideoParams>,
    pub audio: Option<AudioParams>,
}

impl TrackEntry {
    pub fn new(track_number: u64, kind: TrackKind) -> Self {
        Self {
            track_number,
            track_uid: None,
            kind,
            codec_id: String::new(),
            codec_private: Vec::new(),
            default_duration_ns: None,
            name: None,
            language: None,
            enabled: true,
            default: true,
            forced: false,
            video: None,
            audio: None,
        }
    }

    /// Human-readable codec name for well-known codec IDs.
    pub fn codec_name(&self) -> &str {
        match self.codec_id.as_str() {
            "V_MPEG4/ISO/AVC" => "H.264",
            "V_MPEGH/ISO/HEVC" => "HEVC",
            "V_AV1" => "AV1",
            "V_VP8" => "VP8",
            "V_VP9" => "VP9",
            "V_MPEG2" => "MPEG-2",
            "V_MPEG4/ISO/ASP" | "V_MPEG4/ISO/SP" => "MPEG-4 Part 2",
            "A_AAC" | "A_AAC/MPEG4/LC" | "A_AAC/MPEG2/LC" => "AAC",
            "A_AC3" => "AC-3",
            "A_EAC3" => "E-AC-3",
            "A_DTS" => "DTS",
            "A_TRUEHD" => "TrueHD",
            "A_FLAC" => "FLAC",
            "A_OPUS" => "Opus",
            "A_VORBIS" => "Vorbis",
            "A_MPEG/L3" => "MP3",
            "A_PCM/INT/LIT" | "A_PCM/INT/BIG" | "A_PCM/FLOAT/IEEE" => "PCM",
            "S_TEXT/UTF8" => "SubRip",
            "S_TEXT/ASS" | "S_TEXT/SSA" => "ASS",
            "S_TEXT/WEBVTT" => "WebVTT",
            "S_HDMV/PGS" => "PGS",
            "S_VOBSUB" => "VobSub",
            other => other,
        }
    }

    pub fn is_avc(&self) -> bool {
        self.codec_id == "V_MPEG4/ISO/AVC"
    }
}

/// Video settings of a track.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VideoParams {
    pub pixel_width: u64,
    pub pixel_height: u64,
    pub display_width: Option<u64>,
    pub display_height: Option<u64>,
    pub interlaced: bool,
}

/// Audio settings of a track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioParams {
    pub channels: u64,
    pub sampling_frequency: f64,
    pub output_sampling_frequency: Option<f64>,
    pub bit_depth: Option<u64>,
}

impl Default for AudioParams {
    fn default() -> Self {
        Self {
            channels: 1,
            sampling_frequency: 8000.0,
            output_sampling_frequency: None,
            bit_depth: None,
        }
    }
}

/// One cue index entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CuePoint {
    pub cue_time_ticks: u64,
    pub positions: Vec<CueTrackPosition>,
}

/// Where a track's data for a cue point starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CueTrackPosition {
    pub track_number: u64,
    /// Cluster offset relative to the Segment payload.
    pub cluster_offset: u64,
}
