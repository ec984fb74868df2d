//! Populate [`ContainerMetadata`] from decoded element subtrees.

use super::{
    AudioParams, ContainerMetadata, CuePoint, CueTrackPosition, EbmlHeader, SeekHeadEntry,
    SegmentInfo, TrackEntry, TrackKind, VideoParams,
};
use mkvsource_ebml::{Element, ElementId};

/// Collects top-level metadata elements as they are read.
#[derive(Debug, Default)]
pub struct MetadataBuilder {
    ebml: Option<EbmlHeader>,
    segment_offset: u64,
    info: Option<SegmentInfo>,
    seek_head: Vec<SeekHeadEntry>,
    tracks: Option<Vec<TrackEntry>>,
    cues: Option<Vec<CuePoint>>,
}

impl MetadataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_segment_offset(&mut self, offset: u64) {
        self.segment_offset = offset;
    }

    pub fn segment_offset(&self) -> u64 {
        self.segment_offset
    }

    pub fn has_info(&self) -> bool {
        self.info.is_some()
    }

    pub fn has_tracks(&self) -> bool {
        self.tracks.as_ref().is_some_and(|t| !t.is_empty())
    }

    pub fn has_cues(&self) -> bool {
        self.cues.as_ref().is_some_and(|c| !c.is_empty())
    }

    pub fn seek_head(&self) -> &[SeekHeadEntry] {
        &self.seek_head
    }

    /// Whether the element a SeekHead entry points at is already loaded.
    pub fn is_loaded(&self, id: ElementId) -> bool {
        match id {
            ElementId::INFO => self.has_info(),
            ElementId::TRACKS => self.has_tracks(),
            ElementId::CUES => self.has_cues(),
            _ => true,
        }
    }

    /// Route a completed top-level element. Returns false if the element is
    /// not one the model keeps.
    pub fn apply(&mut self, element: &Element) -> bool {
        match element.name() {
            "EBML" => self.ebml = Some(extract_ebml_header(element)),
            "Info" => self.info = Some(extract_info(element)),
            "Tracks" => self.tracks = Some(extract_tracks(element)),
            "SeekHead" => self.seek_head.extend(extract_seek_head(element)),
            "Cues" => self.cues = Some(extract_cues(element)),
            _ => return false,
        }
        tracing::debug!(element = element.name(), "Loaded metadata element");
        true
    }

    /// Snapshot of everything loaded so far.
    pub fn build(&self) -> ContainerMetadata {
        ContainerMetadata {
            ebml: self.ebml.clone().unwrap_or_default(),
            segment_offset: self.segment_offset,
            info: self.info.clone().unwrap_or_default(),
            seek_head: self.seek_head.clone(),
            tracks: self.tracks.clone().unwrap_or_default(),
            cues: self.cues.clone().unwrap_or_default(),
        }
    }
}

fn extract_ebml_header(element: &Element) -> EbmlHeader {
    let header = EbmlHeader {
        doc_type: element
            .child_str(ElementId::DOC_TYPE)
            .unwrap_or("matroska")
            .to_string(),
        doc_type_version: element.child_unsigned(ElementId::DOC_TYPE_VERSION).unwrap_or(1),
        doc_type_read_version: element
            .child_unsigned(ElementId::DOC_TYPE_READ_VERSION)
            .unwrap_or(1),
        ebml_read_version: element.child_unsigned(ElementId::EBML_READ_VERSION).unwrap_or(1),
    };

    // Informational only; demuxing continues regardless.
    if header.doc_type != "matroska" && header.doc_type != "webm" {
        tracing::warn!(doc_type = %header.doc_type, "Unexpected EBML DocType");
    }
    if header.ebml_read_version > 1 {
        tracing::warn!(version = header.ebml_read_version, "EBMLReadVersion above 1");
    }
    if header.doc_type_read_version > 2 {
        tracing::warn!(
            version = header.doc_type_read_version,
            "DocTypeReadVersion above 2"
        );
    }
    header
}

fn extract_info(element: &Element) -> SegmentInfo {
    let mut info = SegmentInfo::default();
    for child in element.children() {
        match child.name() {
            "TimecodeScale" => {
                if let Some(scale) = child.as_unsigned().filter(|&s| s > 0) {
                    info.timecode_scale = scale;
                }
            }
            "Duration" => info.duration_ticks = child.as_float(),
            "MuxingApp" => info.muxing_app = child.as_str().unwrap_or_default().to_string(),
            "WritingApp" => info.writing_app = child.as_str().unwrap_or_default().to_string(),
            "Title" => info.title = child.as_str().map(str::to_string),
            "DateUTC" => info.date_utc = child.as_date(),
            _ => {}
        }
    }
    info
}

fn extract_tracks(element: &Element) -> Vec<TrackEntry> {
    element
        .children_with(ElementId::TRACK_ENTRY)
        .filter_map(extract_track_entry)
        .collect()
}

fn extract_track_entry(entry: &Element) -> Option<TrackEntry> {
    let Some(number) = entry.child_unsigned(ElementId::TRACK_NUMBER) else {
        tracing::warn!("TrackEntry without TrackNumber, skipping");
        return None;
    };
    let kind = TrackKind::from_code(entry.child_unsigned(ElementId::TRACK_TYPE).unwrap_or(0));
    let mut track = TrackEntry::new(number, kind);

    for child in entry.children() {
        match child.name() {
            "TrackUID" => track.track_uid = child.as_unsigned(),
            "CodecID" => track.codec_id = child.as_str().unwrap_or_default().to_string(),
            "CodecPrivate" => {
                track.codec_private = child.as_binary().map(|b| b.to_vec()).unwrap_or_default()
            }
            "DefaultDuration" => track.default_duration_ns = child.as_unsigned(),
            "Name" => track.name = child.as_str().map(str::to_string),
            "Language" => track.language = child.as_str().map(str::to_string),
            "FlagEnabled" => track.enabled = child.as_unsigned() != Some(0),
            "FlagDefault" => track.default = child.as_unsigned() != Some(0),
            "FlagForced" => track.forced = child.as_unsigned() == Some(1),
            "Video" => track.video = Some(extract_video(child)),
            "Audio" => track.audio = Some(extract_audio(child)),
            _ => {}
        }
    }

    // Exactly the params block matching the track type.
    match kind {
        TrackKind::Video => {
            track.audio = None;
            track.video.get_or_insert_with(VideoParams::default);
        }
        TrackKind::Audio => {
            track.video = None;
            track.audio.get_or_insert_with(AudioParams::default);
        }
        _ => {
            track.video = None;
            track.audio = None;
        }
    }
    Some(track)
}

fn extract_video(video: &Element) -> VideoParams {
    let mut params = VideoParams::default();
    for child in video.children() {
        match child.name() {
            "PixelWidth" => params.pixel_width = child.as_unsigned().unwrap_or_default(),
            "PixelHeight" => params.pixel_height = child.as_unsigned().unwrap_or_default(),
            "DisplayWidth" => params.display_width = child.as_unsigned(),
            "DisplayHeight" => params.display_height = child.as_unsigned(),
            "FlagInterlaced" => params.interlaced = child.as_unsigned() == Some(1),
            _ => {}
        }
    }
    params
}

fn extract_audio(audio: &Element) -> AudioParams {
    let mut params = AudioParams::default();
    for child in audio.children() {
        match child.name() {
            "Channels" => params.channels = child.as_unsigned().unwrap_or(1),
            "SamplingFrequency" => {
                params.sampling_frequency = child.as_float().unwrap_or(params.sampling_frequency)
            }
            "OutputSamplingFrequency" => params.output_sampling_frequency = child.as_float(),
            "BitDepth" => params.bit_depth = child.as_unsigned(),
            _ => {}
        }
    }
    params
}

fn extract_seek_head(element: &Element) -> Vec<SeekHeadEntry> {
    element
        .children_with(ElementId::SEEK)
        .filter_map(|seek| {
            let raw_id = seek.child_binary(ElementId::SEEK_ID)?;
            if raw_id.is_empty() || raw_id.len() > 4 {
                tracing::warn!(len = raw_id.len(), "Invalid SeekID length, skipping entry");
                return None;
            }
            let id = ElementId(raw_id.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32));
            let seek_position = seek.child_unsigned(ElementId::SEEK_POSITION)?;
            Some(SeekHeadEntry {
                element_name: id.name().to_string(),
                element_id: id.0,
                seek_position,
            })
        })
        .collect()
}

fn extract_cues(element: &Element) -> Vec<CuePoint> {
    let mut cues: Vec<CuePoint> = element
        .children_with(ElementId::CUE_POINT)
        .filter_map(|point| {
            let cue_time_ticks = point.child_unsigned(ElementId::CUE_TIME)?;
            let positions = point
                .children_with(ElementId::CUE_TRACK_POSITIONS)
                .filter_map(|pos| {
                    Some(CueTrackPosition {
                        track_number: pos.child_unsigned(ElementId::CUE_TRACK)?,
                        cluster_offset: pos.child_unsigned(ElementId::CUE_CLUSTER_POSITION)?,
                    })
                })
                .collect::<Vec<_>>();
            (!positions.is_empty()).then_some(CuePoint {
                cue_time_ticks,
                positions,
            })
        })
        .collect();

    if cues.windows(2).any(|w| w[0].cue_time_ticks > w[1].cue_time_ticks) {
        tracing::warn!("Cue points out of order, sorting by time");
        cues.sort_by_key(|c| c.cue_time_ticks);
    }
    cues
}
