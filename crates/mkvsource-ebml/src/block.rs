//! SimpleBlock / Block header and lacing decoding.
//!
//! ```text
//! [track: vint][timecode: i16 BE][flags: u8][lace header?][frame data...]
//! ```
//!
//! Flag bits:
//! - 0x80: keyframe (SimpleBlock only)
//! - 0x08: invisible
//! - 0x06: lacing (00 none, 01 Xiph, 11 EBML, 10 fixed-size)
//! - 0x01: discardable

use crate::error::{EbmlError, Result};
use crate::vint::{read_signed_var_int, read_unsigned_var_int};

/// Track number, timecode and flags.
pub const BLOCK_HEADER_LEN: usize = 4;

/// Lacing mode of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lacing {
    None,
    Xiph,
    Ebml,
    FixedSize,
}

/// Block flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockFlags(pub u8);

impl BlockFlags {
    pub fn is_keyframe(self) -> bool {
        self.0 & 0x80 != 0
    }

    pub fn is_invisible(self) -> bool {
        self.0 & 0x08 != 0
    }

    pub fn is_discardable(self) -> bool {
        self.0 & 0x01 != 0
    }

    pub fn lacing(self) -> Lacing {
        match self.0 & 0x06 {
            0x00 => Lacing::None,
            0x02 => Lacing::Xiph,
            0x06 => Lacing::Ebml,
            _ => Lacing::FixedSize,
        }
    }
}

/// Decoded block header with the byte length of every frame in the block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub track_number: u64,
    /// Timecode relative to the enclosing cluster.
    pub relative_timecode: i16,
    pub flags: BlockFlags,
    /// Frame lengths in stored order.
    pub frame_lengths: Vec<u64>,
    /// Bytes before the first frame: the 4 fixed bytes plus any lace header.
    pub header_len: usize,
}

impl BlockHeader {
    pub fn is_keyframe(&self) -> bool {
        self.flags.is_keyframe()
    }

    pub fn lacing(&self) -> Lacing {
        self.flags.lacing()
    }
}

/// Parse the header of a block whose payload is `block_size` bytes.
///
/// `data` starts at the block payload and must hold at least the header;
/// frame data does not need to be resident. `max_frames` is the room left in
/// the caller's frame queue.
pub fn parse_block_header(data: &[u8], block_size: u64, max_frames: usize) -> Result<BlockHeader> {
    if block_size < BLOCK_HEADER_LEN as u64 {
        return Err(EbmlError::malformed_block(format!(
            "block of {} bytes is shorter than its header",
            block_size
        )));
    }
    need(data, BLOCK_HEADER_LEN)?;

    let track_byte = data[0];
    if track_byte & 0x80 == 0 {
        return Err(EbmlError::UnsupportedTrackNumber(track_byte));
    }
    let track_number = (track_byte - 0x80) as u64;
    let relative_timecode = i16::from_be_bytes([data[1], data[2]]);
    let flags = BlockFlags(data[3]);

    let body = block_size - BLOCK_HEADER_LEN as u64;
    let (frame_lengths, lace_len) = match flags.lacing() {
        Lacing::None => (vec![body], 0),
        Lacing::Xiph => return Err(EbmlError::XiphLacing),
        Lacing::FixedSize => fixed_size_lacing(&data[BLOCK_HEADER_LEN..], body, max_frames)?,
        Lacing::Ebml => ebml_lacing(&data[BLOCK_HEADER_LEN..], body, max_frames)?,
    };

    if frame_lengths.len() > max_frames {
        return Err(EbmlError::TooManyFrames {
            count: frame_lengths.len(),
            capacity: max_frames,
        });
    }

    Ok(BlockHeader {
        track_number,
        relative_timecode,
        flags,
        frame_lengths,
        header_len: BLOCK_HEADER_LEN + lace_len,
    })
}

fn need(data: &[u8], len: usize) -> Result<()> {
    if data.len() < len {
        return Err(EbmlError::Incomplete {
            needed: len - data.len(),
        });
    }
    Ok(())
}

/// Stored frame count is `count - 1`.
fn read_frame_count(data: &[u8], body: u64, max_frames: usize) -> Result<usize> {
    if body == 0 {
        return Err(EbmlError::malformed_block("laced block has no frame count"));
    }
    need(data, 1)?;
    let count = data[0] as usize + 1;
    if count > max_frames {
        return Err(EbmlError::TooManyFrames {
            count,
            capacity: max_frames,
        });
    }
    Ok(count)
}

/// Every frame is `(body - 1) / count` bytes. A body that does not split
/// evenly is rejected as malformed rather than truncated by floor division.
fn fixed_size_lacing(data: &[u8], body: u64, max_frames: usize) -> Result<(Vec<u64>, usize)> {
    let count = read_frame_count(data, body, max_frames)?;
    let payload = body - 1;
    if payload % count as u64 != 0 {
        return Err(EbmlError::malformed_block(format!(
            "{} bytes cannot be split into {} equal frames",
            payload, count
        )));
    }
    Ok((vec![payload / count as u64; count], 1))
}

fn ebml_lacing(data: &[u8], body: u64, max_frames: usize) -> Result<(Vec<u64>, usize)> {
    let count = read_frame_count(data, body, max_frames)?;
    let mut pos = 1;
    let mut lengths = Vec::with_capacity(count);

    if count > 1 {
        let (first, len) = read_unsigned_var_int(&data[pos..])?;
        pos += len;
        lengths.push(first);

        for _ in 2..count {
            let (delta, len) = read_signed_var_int(&data[pos..])?;
            pos += len;
            let previous = lengths.last().copied().unwrap_or_default() as i64;
            let length = previous + delta;
            if length < 0 {
                return Err(EbmlError::malformed_block("negative laced frame length"));
            }
            lengths.push(length as u64);
        }
    }

    // The last frame takes whatever the lace header and earlier frames leave.
    let used = pos as u64 + lengths.iter().sum::<u64>();
    if used > body {
        return Err(EbmlError::malformed_block(format!(
            "laced frames need {} bytes, block has {}",
            used, body
        )));
    }
    lengths.push(body - used);

    Ok((lengths, pos))
}
