//! Incremental Matroska parser.
//!
//! The parser is fed the current byte window together with its absolute
//! input offset and makes one step of progress per call. It never reads
//! input itself: each step says how many bytes it consumed, how many more
//! it needs, or where the input should continue.
//!
//! Parsing runs in two phases. During header discovery the EBML header and
//! the Segment's metadata elements are read whole; when the first Cluster
//! shows up, SeekHead entries for Info, Tracks or Cues that have not been
//! seen yet are followed before the header is declared complete. During
//! streaming, Cluster and BlockGroup are descended into and every
//! SimpleBlock/Block header is turned into frames on the [`FrameRing`];
//! frame payloads are left in the window for the caller.

use crate::config::DemuxConfig;
use crate::error::{DemuxError, Result};
use crate::frames::{FrameDescriptor, FrameRing};
use crate::metadata::{ContainerMetadata, MetadataBuilder};
use mkvsource_ebml::element::read_unsigned;
use mkvsource_ebml::{
    parse_block_header, read_element_header, read_element_tree, EbmlError, Element, ElementHeader,
    ElementId, ElementValue,
};
use std::collections::HashMap;

/// Outcome of one parse step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// This many bytes from the front of the window were consumed.
    Progressed(usize),
    /// At least this many bytes beyond the window are needed.
    NeedMoreData(usize),
    /// Discard the window and continue at this absolute offset.
    SeekRequired(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Header,
    Streaming,
}

/// Step-wise Matroska parser.
#[derive(Debug)]
pub struct Parser {
    phase: Phase,
    builder: MetadataBuilder,
    metadata: Option<ContainerMetadata>,
    frames: FrameRing,
    max_element_size: u64,
    max_frame_size: u64,
    seen_ebml: bool,
    segment_end: Option<u64>,
    first_cluster: Option<u64>,
    detoured: bool,
    /// SeekHead targets already followed.
    visited: Vec<ElementId>,
    cluster_timecode: u64,
    /// Ticks between consecutive laced frames, per track.
    lace_steps: HashMap<u64, i64>,
    end_of_stream: bool,
}

impl Parser {
    pub fn new(config: &DemuxConfig) -> Self {
        Self {
            phase: Phase::Header,
            builder: MetadataBuilder::new(),
            metadata: None,
            frames: FrameRing::new(config.frame_ring_capacity),
            max_element_size: config.max_element_size,
            max_frame_size: config.max_frame_size,
            seen_ebml: false,
            segment_end: None,
            first_cluster: None,
            detoured: false,
            visited: Vec::new(),
            cluster_timecode: 0,
            lace_steps: HashMap::new(),
            end_of_stream: false,
        }
    }

    /// Whether header discovery has finished.
    pub fn is_header_complete(&self) -> bool {
        self.phase == Phase::Streaming
    }

    /// Final metadata, once header discovery has finished.
    pub fn metadata(&self) -> Option<&ContainerMetadata> {
        self.metadata.as_ref()
    }

    pub fn frames(&self) -> &FrameRing {
        &self.frames
    }

    pub fn has_frames(&self) -> bool {
        !self.frames.is_empty()
    }

    pub fn pop_frame(&mut self) -> Option<FrameDescriptor> {
        self.frames.pop()
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.end_of_stream
    }

    /// Absolute offset where frame delivery starts: the first cue's cluster,
    /// else the first cluster seen, else the start of the Segment payload.
    pub fn streaming_start(&self) -> u64 {
        let segment_offset = self.builder.segment_offset();
        self.metadata
            .as_ref()
            .and_then(|m| m.cues.first())
            .and_then(|cue| cue.positions.first())
            .map(|pos| segment_offset + pos.cluster_offset)
            .or(self.first_cluster)
            .unwrap_or(segment_offset)
    }

    /// Forget pending frames and cluster state before the input is
    /// repositioned.
    pub fn reset_stream(&mut self) {
        self.frames.clear();
        self.cluster_timecode = 0;
        self.end_of_stream = false;
    }

    /// The input has no more bytes.
    ///
    /// During header discovery this finishes the header with whatever was
    /// loaded and returns where streaming should start.
    pub fn end_of_input(&mut self) -> Result<Option<u64>> {
        match self.phase {
            Phase::Header => {
                if !self.builder.has_tracks() {
                    return Err(DemuxError::MissingTracks);
                }
                tracing::debug!("End of input during header discovery");
                self.complete_header();
                Ok(Some(self.streaming_start()))
            }
            Phase::Streaming => {
                self.end_of_stream = true;
                Ok(None)
            }
        }
    }

    /// Make one step of progress on `data`, which starts at absolute offset
    /// `position`.
    pub fn parse(&mut self, data: &[u8], position: u64) -> Result<Progress> {
        if self.phase == Phase::Streaming && self.segment_end.is_some_and(|end| position >= end) {
            tracing::debug!(position, "Reached end of segment");
            self.end_of_stream = true;
            return Ok(Progress::Progressed(0));
        }

        let header = match read_element_header(data) {
            Ok(header) => header,
            Err(EbmlError::Incomplete { needed }) => return Ok(Progress::NeedMoreData(needed)),
            Err(e) => return Err(e.into()),
        };

        if !self.seen_ebml && header.id != ElementId::EBML {
            return Err(DemuxError::NotMatroska(header.id));
        }

        match self.phase {
            Phase::Header => self.parse_header_element(data, position, header),
            Phase::Streaming => self.parse_stream_element(data, position, header),
        }
    }

    fn parse_header_element(
        &mut self,
        data: &[u8],
        position: u64,
        header: ElementHeader,
    ) -> Result<Progress> {
        match header.id {
            ElementId::SEGMENT => {
                let start = position + header.header_len as u64;
                self.builder.set_segment_offset(start);
                self.segment_end = header.size.map(|size| start + size);
                tracing::debug!(segment_offset = start, "Entering segment");
                Ok(Progress::Progressed(header.header_len))
            }
            ElementId::CLUSTER => {
                if self.first_cluster.is_none() {
                    self.first_cluster = Some(position);
                }
                if let Some(target) = self.next_detour() {
                    return Ok(Progress::SeekRequired(target));
                }
                self.complete_header();
                Ok(Progress::SeekRequired(self.streaming_start()))
            }
            ElementId::EBML
            | ElementId::SEEK_HEAD
            | ElementId::INFO
            | ElementId::TRACKS
            | ElementId::CUES => {
                let (element, total) = match self.read_master(data, &header)? {
                    Ok(read) => read,
                    Err(needed) => return Ok(Progress::NeedMoreData(needed)),
                };
                if element.id == ElementId::EBML {
                    self.seen_ebml = true;
                }
                self.builder.apply(&element);

                if self.detoured {
                    if let Some(target) = self.next_detour() {
                        return Ok(Progress::SeekRequired(target));
                    }
                    self.complete_header();
                    return Ok(Progress::SeekRequired(self.streaming_start()));
                }
                Ok(Progress::Progressed(total))
            }
            _ => skip(data, position, &header),
        }
    }

    fn parse_stream_element(
        &mut self,
        data: &[u8],
        position: u64,
        header: ElementHeader,
    ) -> Result<Progress> {
        match header.id {
            ElementId::SEGMENT | ElementId::BLOCK_GROUP => Ok(Progress::Progressed(header.header_len)),
            ElementId::CLUSTER => {
                tracing::trace!(position, "Cluster");
                self.cluster_timecode = 0;
                Ok(Progress::Progressed(header.header_len))
            }
            ElementId::TIMECODE => {
                let size = header.size.ok_or(EbmlError::UnknownSize(header.id.0))?;
                let total = header.header_len + size as usize;
                if data.len() < total {
                    return Ok(Progress::NeedMoreData(total - data.len()));
                }
                self.cluster_timecode = read_unsigned(header.id, &data[header.header_len..total])?;
                Ok(Progress::Progressed(total))
            }
            ElementId::SIMPLE_BLOCK | ElementId::BLOCK => self.parse_block(data, header),
            _ => skip(data, position, &header),
        }
    }

    /// Turn a block header into frames; the frame bytes stay unconsumed.
    fn parse_block(&mut self, data: &[u8], header: ElementHeader) -> Result<Progress> {
        let size = header.size.ok_or(EbmlError::UnknownSize(header.id.0))?;
        let body = &data[header.header_len..];
        let block = match parse_block_header(body, size, self.frames.remaining()) {
            Ok(block) => block,
            Err(EbmlError::Incomplete { needed }) => return Ok(Progress::NeedMoreData(needed)),
            Err(e) => return Err(e.into()),
        };

        if let Some(&length) = block
            .frame_lengths
            .iter()
            .find(|&&length| length > self.max_frame_size)
        {
            return Err(DemuxError::ElementTooLarge {
                id: header.id,
                size: length,
                limit: self.max_frame_size,
            });
        }

        let base = self.cluster_timecode as i64 + block.relative_timecode as i64;
        let step = self.lace_steps.get(&block.track_number).copied().unwrap_or(0);
        for (index, &length) in block.frame_lengths.iter().enumerate() {
            let byte_length = usize::try_from(length).map_err(|_| DemuxError::ElementTooLarge {
                id: header.id,
                size: length,
                limit: usize::MAX as u64,
            })?;
            self.frames.push(FrameDescriptor {
                track_number: block.track_number,
                byte_length,
                timestamp_ticks: base + index as i64 * step,
                is_keyframe: block.is_keyframe(),
            })?;
        }

        tracing::trace!(
            track = block.track_number,
            timecode = base,
            frames = block.frame_lengths.len(),
            lacing = ?block.lacing(),
            "Block"
        );
        Ok(Progress::Progressed(header.header_len + block.header_len))
    }

    /// Read a whole master element. `Err(n)` means `n` more bytes are needed.
    fn read_master(
        &self,
        data: &[u8],
        header: &ElementHeader,
    ) -> Result<std::result::Result<(Element, usize), usize>> {
        let size = header.size.ok_or(EbmlError::UnknownSize(header.id.0))?;
        if size > self.max_element_size {
            return Err(DemuxError::ElementTooLarge {
                id: header.id,
                size,
                limit: self.max_element_size,
            });
        }
        let total = header.header_len + size as usize;
        if data.len() < total {
            return Ok(Err(total - data.len()));
        }

        // The whole payload is resident, so a short child is malformed.
        let children = read_element_tree(&data[header.header_len..total], size).map_err(|e| match e {
            EbmlError::Incomplete { needed } => EbmlError::ChildOverrun {
                id: header.id.0,
                size: size + needed as u64,
                remaining: size,
            },
            e => e,
        })?;
        let element = Element {
            id: header.id,
            value: ElementValue::Master(children),
        };
        Ok(Ok((element, total)))
    }

    /// Next SeekHead target that is referenced but not loaded yet.
    fn next_detour(&mut self) -> Option<u64> {
        let segment_offset = self.builder.segment_offset();
        let entry = self.builder.seek_head().iter().find(|entry| {
            let id = ElementId(entry.element_id);
            matches!(id, ElementId::INFO | ElementId::TRACKS | ElementId::CUES)
                && !self.builder.is_loaded(id)
                && !self.visited.contains(&id)
        })?;

        let id = ElementId(entry.element_id);
        let target = segment_offset + entry.seek_position;
        self.visited.push(id);
        self.detoured = true;
        tracing::debug!(element = %id, target, "Following SeekHead entry");
        Some(target)
    }

    fn complete_header(&mut self) {
        let metadata = self.builder.build();
        self.lace_steps = metadata
            .tracks
            .iter()
            .filter_map(|track| {
                let duration = track.default_duration_ns?;
                let step = duration / metadata.info.timecode_scale.max(1);
                Some((track.track_number, step as i64))
            })
            .collect();

        tracing::debug!(
            tracks = metadata.tracks.len(),
            cues = metadata.cues.len(),
            "Header discovery complete"
        );
        self.metadata = Some(metadata);
        self.phase = Phase::Streaming;
    }
}

/// Skip an element the parser does not need. Unknown-size masters are
/// descended into; resident elements are consumed; anything else is jumped
/// over.
fn skip(data: &[u8], position: u64, header: &ElementHeader) -> Result<Progress> {
    match header.total_len() {
        None if header.kind().has_children() => Ok(Progress::Progressed(header.header_len)),
        None => Err(EbmlError::UnknownSize(header.id.0).into()),
        Some(total) if total <= data.len() as u64 => Ok(Progress::Progressed(total as usize)),
        Some(total) => {
            tracing::trace!(element = %header.id, size = total, "Jumping over element");
            Ok(Progress::SeekRequired(position + total))
        }
    }
}
