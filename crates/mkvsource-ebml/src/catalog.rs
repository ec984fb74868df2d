//! Static catalog of known Matroska element IDs.
//!
//! The catalog tells the tree reader how to decode each element and gives
//! every ID a stable name for logging and for routing values into the
//! container model. IDs not listed here are opaque binary.

use std::fmt;
use ElementKind::{Binary, Container, Date, Float, Master, Signed, TextAscii, TextUtf8, Unsigned};

/// Matroska element ID (marker bits included).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u32);

impl ElementId {
    pub const EBML: Self = Self(0x1A45_DFA3);
    pub const EBML_VERSION: Self = Self(0x4286);
    pub const EBML_READ_VERSION: Self = Self(0x42F7);
    pub const DOC_TYPE: Self = Self(0x4282);
    pub const DOC_TYPE_VERSION: Self = Self(0x4287);
    pub const DOC_TYPE_READ_VERSION: Self = Self(0x4285);
    pub const VOID: Self = Self(0xEC);
    pub const CRC32: Self = Self(0xBF);

    pub const SEGMENT: Self = Self(0x1853_8067);
    pub const SEEK_HEAD: Self = Self(0x114D_9B74);
    pub const SEEK: Self = Self(0x4DBB);
    pub const SEEK_ID: Self = Self(0x53AB);
    pub const SEEK_POSITION: Self = Self(0x53AC);

    pub const INFO: Self = Self(0x1549_A966);
    pub const TIMECODE_SCALE: Self = Self(0x2A_D7B1);
    pub const DURATION: Self = Self(0x4489);
    pub const DATE_UTC: Self = Self(0x4461);
    pub const TITLE: Self = Self(0x7BA9);
    pub const MUXING_APP: Self = Self(0x4D80);
    pub const WRITING_APP: Self = Self(0x5741);

    pub const CLUSTER: Self = Self(0x1F43_B675);
    pub const TIMECODE: Self = Self(0xE7);
    pub const SIMPLE_BLOCK: Self = Self(0xA3);
    pub const BLOCK_GROUP: Self = Self(0xA0);
    pub const BLOCK: Self = Self(0xA1);

    pub const TRACKS: Self = Self(0x1654_AE6B);
    pub const TRACK_ENTRY: Self = Self(0xAE);
    pub const TRACK_NUMBER: Self = Self(0xD7);
    pub const TRACK_UID: Self = Self(0x73C5);
    pub const TRACK_TYPE: Self = Self(0x83);
    pub const FLAG_ENABLED: Self = Self(0xB9);
    pub const FLAG_DEFAULT: Self = Self(0x88);
    pub const FLAG_FORCED: Self = Self(0x55AA);
    pub const FLAG_LACING: Self = Self(0x9C);
    pub const DEFAULT_DURATION: Self = Self(0x23_E383);
    pub const NAME: Self = Self(0x536E);
    pub const LANGUAGE: Self = Self(0x22_B59C);
    pub const CODEC_ID: Self = Self(0x86);
    pub const CODEC_PRIVATE: Self = Self(0x63A2);
    pub const CODEC_NAME: Self = Self(0x25_8688);
    pub const VIDEO: Self = Self(0xE0);
    pub const PIXEL_WIDTH: Self = Self(0xB0);
    pub const PIXEL_HEIGHT: Self = Self(0xBA);
    pub const DISPLAY_WIDTH: Self = Self(0x54B0);
    pub const DISPLAY_HEIGHT: Self = Self(0x54BA);
    pub const FLAG_INTERLACED: Self = Self(0x9A);
    pub const AUDIO: Self = Self(0xE1);
    pub const SAMPLING_FREQUENCY: Self = Self(0xB5);
    pub const OUTPUT_SAMPLING_FREQUENCY: Self = Self(0x78B5);
    pub const CHANNELS: Self = Self(0x9F);
    pub const BIT_DEPTH: Self = Self(0x6264);

    pub const CUES: Self = Self(0x1C53_BB6B);
    pub const CUE_POINT: Self = Self(0xBB);
    pub const CUE_TIME: Self = Self(0xB3);
    pub const CUE_TRACK_POSITIONS: Self = Self(0xB7);
    pub const CUE_TRACK: Self = Self(0xF7);
    pub const CUE_CLUSTER_POSITION: Self = Self(0xF1);

    pub const ATTACHMENTS: Self = Self(0x1941_A469);
    pub const CHAPTERS: Self = Self(0x1043_A770);
    pub const TAGS: Self = Self(0x1254_C367);

    /// Catalog entry for this ID, if known.
    pub fn info(self) -> Option<&'static ElementInfo> {
        lookup(self.0)
    }

    /// Decoding kind; unknown IDs are binary.
    pub fn kind(self) -> ElementKind {
        self.info().map_or(ElementKind::Binary, |info| info.kind)
    }

    /// Catalog name, or `"Unknown"`.
    pub fn name(self) -> &'static str {
        self.info().map_or("Unknown", |info| info.name)
    }
}

impl From<u32> for ElementId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.info() {
            Some(info) => write!(f, "{}", info.name),
            None => write!(f, "0x{:X}", self.0),
        }
    }
}

/// How an element's payload is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Children are read as a subtree.
    Master,
    /// Top-level container (Segment, Cluster) that is walked
    /// incrementally instead of being read whole.
    Container,
    Unsigned,
    Signed,
    TextAscii,
    TextUtf8,
    Binary,
    Float,
    Date,
}

impl ElementKind {
    /// Whether the payload is a sequence of child elements.
    pub fn has_children(self) -> bool {
        matches!(self, Self::Master | Self::Container)
    }
}

/// One catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementInfo {
    pub id: u32,
    pub kind: ElementKind,
    pub name: &'static str,
}

impl ElementInfo {
    const fn new(id: u32, kind: ElementKind, name: &'static str) -> Self {
        Self { id, kind, name }
    }
}

/// Look up an element ID.
pub fn lookup(id: u32) -> Option<&'static ElementInfo> {
    CATALOG
        .binary_search_by_key(&id, |info| info.id)
        .ok()
        .map(|index| &CATALOG[index])
}

/// Sorted by ID for binary search.
static CATALOG: &[ElementInfo] = &[
    ElementInfo::new(0x80, Master, "ChapterDisplay"),
    ElementInfo::new(0x83, Unsigned, "TrackType"),
    ElementInfo::new(0x85, TextUtf8, "ChapString"),
    ElementInfo::new(0x86, TextAscii, "CodecID"),
    ElementInfo::new(0x88, Unsigned, "FlagDefault"),
    ElementInfo::new(0x89, Unsigned, "ChapterTrackNumber"),
    ElementInfo::new(0x8E, Master, "Slices"),
    ElementInfo::new(0x8F, Master, "ChapterTrack"),
    ElementInfo::new(0x91, Unsigned, "ChapterTimeStart"),
    ElementInfo::new(0x92, Unsigned, "ChapterTimeEnd"),
    ElementInfo::new(0x96, Unsigned, "CueRefTime"),
    ElementInfo::new(0x97, Unsigned, "CueRefCluster"),
    ElementInfo::new(0x98, Unsigned, "ChapterFlagHidden"),
    ElementInfo::new(0x9A, Unsigned, "FlagInterlaced"),
    ElementInfo::new(0x9B, Unsigned, "BlockDuration"),
    ElementInfo::new(0x9C, Unsigned, "FlagLacing"),
    ElementInfo::new(0x9F, Unsigned, "Channels"),
    ElementInfo::new(0xA0, Master, "BlockGroup"),
    ElementInfo::new(0xA1, Binary, "Block"),
    ElementInfo::new(0xA2, Binary, "BlockVirtual"),
    ElementInfo::new(0xA3, Binary, "SimpleBlock"),
    ElementInfo::new(0xA4, Binary, "CodecState"),
    ElementInfo::new(0xA5, Binary, "BlockAdditional"),
    ElementInfo::new(0xA6, Master, "BlockMore"),
    ElementInfo::new(0xA7, Unsigned, "Position"),
    ElementInfo::new(0xAA, Unsigned, "CodecDecodeAll"),
    ElementInfo::new(0xAB, Unsigned, "PrevSize"),
    ElementInfo::new(0xAE, Master, "TrackEntry"),
    ElementInfo::new(0xAF, Binary, "EncryptedBlock"),
    ElementInfo::new(0xB0, Unsigned, "PixelWidth"),
    ElementInfo::new(0xB3, Unsigned, "CueTime"),
    ElementInfo::new(0xB5, Float, "SamplingFrequency"),
    ElementInfo::new(0xB6, Master, "ChapterAtom"),
    ElementInfo::new(0xB7, Master, "CueTrackPositions"),
    ElementInfo::new(0xB9, Unsigned, "FlagEnabled"),
    ElementInfo::new(0xBA, Unsigned, "PixelHeight"),
    ElementInfo::new(0xBB, Master, "CuePoint"),
    ElementInfo::new(0xBF, Binary, "CRC-32"),
    ElementInfo::new(0xC0, Unsigned, "TrickTrackUID"),
    ElementInfo::new(0xC1, Binary, "TrickTrackSegmentUID"),
    ElementInfo::new(0xC4, Binary, "TrickMasterTrackSegmentUID"),
    ElementInfo::new(0xC6, Unsigned, "TrickTrackFlag"),
    ElementInfo::new(0xC7, Unsigned, "TrickMasterTrackUID"),
    ElementInfo::new(0xC8, Master, "ReferenceFrame"),
    ElementInfo::new(0xC9, Unsigned, "ReferenceOffset"),
    ElementInfo::new(0xCA, Unsigned, "ReferenceTimeCode"),
    ElementInfo::new(0xCB, Unsigned, "BlockAdditionID"),
    ElementInfo::new(0xCC, Unsigned, "LaceNumber"),
    ElementInfo::new(0xCD, Unsigned, "FrameNumber"),
    ElementInfo::new(0xCE, Unsigned, "Delay"),
    ElementInfo::new(0xCF, Unsigned, "SliceDuration"),
    ElementInfo::new(0xD7, Unsigned, "TrackNumber"),
    ElementInfo::new(0xDB, Master, "CueReference"),
    ElementInfo::new(0xE0, Master, "Video"),
    ElementInfo::new(0xE1, Master, "Audio"),
    ElementInfo::new(0xE2, Master, "TrackOperation"),
    ElementInfo::new(0xE3, Master, "TrackCombinePlanes"),
    ElementInfo::new(0xE4, Master, "TrackPlane"),
    ElementInfo::new(0xE5, Unsigned, "TrackPlaneUID"),
    ElementInfo::new(0xE6, Unsigned, "TrackPlaneType"),
    ElementInfo::new(0xE7, Unsigned, "Timecode"),
    ElementInfo::new(0xE8, Master, "TimeSlice"),
    ElementInfo::new(0xE9, Master, "TrackJoinBlocks"),
    ElementInfo::new(0xEA, Unsigned, "CueCodecState"),
    ElementInfo::new(0xEB, Unsigned, "CueRefCodecState"),
    ElementInfo::new(0xEC, Binary, "Void"),
    ElementInfo::new(0xED, Unsigned, "TrackJoinUID"),
    ElementInfo::new(0xEE, Unsigned, "BlockAddID"),
    ElementInfo::new(0xF1, Unsigned, "CueClusterPosition"),
    ElementInfo::new(0xF7, Unsigned, "CueTrack"),
    ElementInfo::new(0xFA, Unsigned, "ReferencePriority"),
    ElementInfo::new(0xFB, Signed, "ReferenceBlock"),
    ElementInfo::new(0xFD, Signed, "ReferenceVirtual"),
    ElementInfo::new(0x4254, Unsigned, "ContentCompAlgo"),
    ElementInfo::new(0x4255, Binary, "ContentCompSettings"),
    ElementInfo::new(0x4282, TextAscii, "DocType"),
    ElementInfo::new(0x4285, Unsigned, "DocTypeReadVersion"),
    ElementInfo::new(0x4286, Unsigned, "EBMLVersion"),
    ElementInfo::new(0x4287, Unsigned, "DocTypeVersion"),
    ElementInfo::new(0x42F2, Unsigned, "EBMLMaxIDLength"),
    ElementInfo::new(0x42F3, Unsigned, "EBMLMaxSizeLength"),
    ElementInfo::new(0x42F7, Unsigned, "EBMLReadVersion"),
    ElementInfo::new(0x437C, TextAscii, "ChapLanguage"),
    ElementInfo::new(0x437E, TextAscii, "ChapCountry"),
    ElementInfo::new(0x4444, Binary, "SegmentFamily"),
    ElementInfo::new(0x4461, Date, "DateUTC"),
    ElementInfo::new(0x447A, TextAscii, "TagLanguage"),
    ElementInfo::new(0x4484, Unsigned, "TagDefault"),
    ElementInfo::new(0x4485, Binary, "TagBinary"),
    ElementInfo::new(0x4487, TextUtf8, "TagString"),
    ElementInfo::new(0x4489, Float, "Duration"),
    ElementInfo::new(0x450D, Binary, "ChapProcessPrivate"),
    ElementInfo::new(0x4598, Unsigned, "ChapterFlagEnabled"),
    ElementInfo::new(0x45A3, TextUtf8, "TagName"),
    ElementInfo::new(0x45B9, Master, "EditionEntry"),
    ElementInfo::new(0x45BC, Unsigned, "EditionUID"),
    ElementInfo::new(0x45BD, Unsigned, "EditionFlagHidden"),
    ElementInfo::new(0x45DB, Unsigned, "EditionFlagDefault"),
    ElementInfo::new(0x45DD, Unsigned, "EditionFlagOrdered"),
    ElementInfo::new(0x465C, Binary, "FileData"),
    ElementInfo::new(0x4660, TextAscii, "FileMimeType"),
    ElementInfo::new(0x4661, Unsigned, "FileUsedStartTime"),
    ElementInfo::new(0x4662, Unsigned, "FileUsedEndTime"),
    ElementInfo::new(0x466E, TextUtf8, "FileName"),
    ElementInfo::new(0x4675, Binary, "FileReferral"),
    ElementInfo::new(0x467E, TextUtf8, "FileDescription"),
    ElementInfo::new(0x46AE, Unsigned, "FileUID"),
    ElementInfo::new(0x47E1, Unsigned, "ContentEncAlgo"),
    ElementInfo::new(0x47E2, Binary, "ContentEncKeyID"),
    ElementInfo::new(0x47E3, Binary, "ContentSignature"),
    ElementInfo::new(0x47E4, Binary, "ContentSigKeyID"),
    ElementInfo::new(0x47E5, Unsigned, "ContentSigAlgo"),
    ElementInfo::new(0x47E6, Unsigned, "ContentSigHashAlgo"),
    ElementInfo::new(0x4D80, TextUtf8, "MuxingApp"),
    ElementInfo::new(0x4DBB, Master, "Seek"),
    ElementInfo::new(0x5031, Unsigned, "ContentEncodingOrder"),
    ElementInfo::new(0x5032, Unsigned, "ContentEncodingScope"),
    ElementInfo::new(0x5033, Unsigned, "ContentEncodingType"),
    ElementInfo::new(0x5034, Master, "ContentCompression"),
    ElementInfo::new(0x5035, Master, "ContentEncryption"),
    ElementInfo::new(0x535F, Unsigned, "CueRefNumber"),
    ElementInfo::new(0x536E, TextUtf8, "Name"),
    ElementInfo::new(0x5378, Unsigned, "CueBlockNumber"),
    ElementInfo::new(0x537F, Signed, "TrackOffset"),
    ElementInfo::new(0x53AB, Binary, "SeekID"),
    ElementInfo::new(0x53AC, Unsigned, "SeekPosition"),
    ElementInfo::new(0x53B8, Unsigned, "StereoMode"),
    ElementInfo::new(0x53B9, Unsigned, "OldStereoMode"),
    ElementInfo::new(0x54AA, Unsigned, "PixelCropBottom"),
    ElementInfo::new(0x54B0, Unsigned, "DisplayWidth"),
    ElementInfo::new(0x54B2, Unsigned, "DisplayUnit"),
    ElementInfo::new(0x54B3, Unsigned, "AspectRatioType"),
    ElementInfo::new(0x54BA, Unsigned, "DisplayHeight"),
    ElementInfo::new(0x54BB, Unsigned, "PixelCropTop"),
    ElementInfo::new(0x54CC, Unsigned, "PixelCropLeft"),
    ElementInfo::new(0x54DD, Unsigned, "PixelCropRight"),
    ElementInfo::new(0x55AA, Unsigned, "FlagForced"),
    ElementInfo::new(0x55EE, Unsigned, "MaxBlockAdditionID"),
    ElementInfo::new(0x5741, TextUtf8, "WritingApp"),
    ElementInfo::new(0x5854, Master, "SilentTracks"),
    ElementInfo::new(0x58D7, Unsigned, "SilentTrackNumber"),
    ElementInfo::new(0x61A7, Master, "AttachedFile"),
    ElementInfo::new(0x6240, Master, "ContentEncoding"),
    ElementInfo::new(0x6264, Unsigned, "BitDepth"),
    ElementInfo::new(0x63A2, Binary, "CodecPrivate"),
    ElementInfo::new(0x63C0, Master, "Targets"),
    ElementInfo::new(0x63C3, Unsigned, "ChapterPhysicalEquiv"),
    ElementInfo::new(0x63C4, Unsigned, "TagChapterUID"),
    ElementInfo::new(0x63C5, Unsigned, "TagTrackUID"),
    ElementInfo::new(0x63C6, Unsigned, "TagAttachmentUID"),
    ElementInfo::new(0x63C9, Unsigned, "TagEditionUID"),
    ElementInfo::new(0x63CA, TextAscii, "TargetType"),
    ElementInfo::new(0x6532, Binary, "SignedElement"),
    ElementInfo::new(0x6624, Master, "TrackTranslate"),
    ElementInfo::new(0x66A5, Binary, "TrackTranslateTrackID"),
    ElementInfo::new(0x66BF, Unsigned, "TrackTranslateCodec"),
    ElementInfo::new(0x66FC, Unsigned, "TrackTranslateEditionUID"),
    ElementInfo::new(0x67C8, Master, "SimpleTag"),
    ElementInfo::new(0x68CA, Unsigned, "TargetTypeValue"),
    ElementInfo::new(0x6911, Master, "ChapProcessCommand"),
    ElementInfo::new(0x6922, Unsigned, "ChapProcessTime"),
    ElementInfo::new(0x6924, Master, "ChapterTranslate"),
    ElementInfo::new(0x6933, Binary, "ChapProcessData"),
    ElementInfo::new(0x6944, Master, "ChapProcess"),
    ElementInfo::new(0x6955, Unsigned, "ChapProcessCodecID"),
    ElementInfo::new(0x69A5, Binary, "ChapterTranslateID"),
    ElementInfo::new(0x69BF, Unsigned, "ChapterTranslateCodec"),
    ElementInfo::new(0x69FC, Unsigned, "ChapterTranslateEditionUID"),
    ElementInfo::new(0x6D80, Master, "ContentEncodings"),
    ElementInfo::new(0x6DE7, Unsigned, "MinCache"),
    ElementInfo::new(0x6DF8, Unsigned, "MaxCache"),
    ElementInfo::new(0x6E67, Binary, "ChapterSegmentUID"),
    ElementInfo::new(0x6EBC, Unsigned, "ChapterSegmentEditionUID"),
    ElementInfo::new(0x6FAB, Unsigned, "TrackOverlay"),
    ElementInfo::new(0x7373, Master, "Tag"),
    ElementInfo::new(0x7384, TextUtf8, "SegmentFilename"),
    ElementInfo::new(0x73A4, Binary, "SegmentUID"),
    ElementInfo::new(0x73C4, Unsigned, "ChapterUID"),
    ElementInfo::new(0x73C5, Unsigned, "TrackUID"),
    ElementInfo::new(0x7446, Unsigned, "AttachmentLink"),
    ElementInfo::new(0x75A1, Master, "BlockAdditions"),
    ElementInfo::new(0x78B5, Float, "OutputSamplingFrequency"),
    ElementInfo::new(0x7BA9, TextUtf8, "Title"),
    ElementInfo::new(0x7D7B, Binary, "ChannelPositions"),
    ElementInfo::new(0x7E5B, Master, "SignatureElements"),
    ElementInfo::new(0x7E7B, Master, "SignatureElementList"),
    ElementInfo::new(0x7E8A, Unsigned, "SignatureAlgo"),
    ElementInfo::new(0x7E9A, Unsigned, "SignatureHash"),
    ElementInfo::new(0x7EA5, Binary, "SignaturePublicKey"),
    ElementInfo::new(0x7EB5, Binary, "Signature"),
    ElementInfo::new(0x22_B59C, TextAscii, "Language"),
    ElementInfo::new(0x23_314F, Float, "TrackTimecodeScale"),
    ElementInfo::new(0x23_83E3, Float, "FrameRate"),
    ElementInfo::new(0x23_E383, Unsigned, "DefaultDuration"),
    ElementInfo::new(0x25_8688, TextUtf8, "CodecName"),
    ElementInfo::new(0x26_B240, TextAscii, "CodecDownloadURL"),
    ElementInfo::new(0x2A_D7B1, Unsigned, "TimecodeScale"),
    ElementInfo::new(0x2E_B524, Binary, "ColourSpace"),
    ElementInfo::new(0x2F_B523, Float, "GammaValue"),
    ElementInfo::new(0x3A_9697, TextUtf8, "CodecSettings"),
    ElementInfo::new(0x3B_4040, TextAscii, "CodecInfoURL"),
    ElementInfo::new(0x3C_83AB, TextUtf8, "PrevFilename"),
    ElementInfo::new(0x3C_B923, Binary, "PrevUID"),
    ElementInfo::new(0x3E_83BB, TextUtf8, "NextFilename"),
    ElementInfo::new(0x3E_B923, Binary, "NextUID"),
    ElementInfo::new(0x1043_A770, Master, "Chapters"),
    ElementInfo::new(0x114D_9B74, Master, "SeekHead"),
    ElementInfo::new(0x1254_C367, Master, "Tags"),
    ElementInfo::new(0x1549_A966, Master, "Info"),
    ElementInfo::new(0x1654_AE6B, Master, "Tracks"),
    ElementInfo::new(0x1853_8067, Container, "Segment"),
    ElementInfo::new(0x1941_A469, Master, "Attachments"),
    ElementInfo::new(0x1A45_DFA3, Master, "EBML"),
    ElementInfo::new(0x1B53_8667, Master, "SignatureSlot"),
    ElementInfo::new(0x1C53_BB6B, Master, "Cues"),
    ElementInfo::new(0x1F43_B675, Container, "Cluster"),
];
