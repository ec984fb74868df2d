//! Growable byte window over the input.
//!
//! The window holds bytes read from the source that the parser has not
//! consumed yet. It also remembers the absolute input offset of its first
//! live byte, so `[position, position + len)` always mirrors the input.

use crate::error::{DemuxError, Result};

/// Resizable buffer with a consumed-prefix cursor.
///
/// Invariant: `begin <= end <= allocated`. Live bytes are always contiguous.
#[derive(Debug, Default)]
pub struct ByteWindow {
    buf: Vec<u8>,
    begin: usize,
    end: usize,
    position: u64,
}

impl ByteWindow {
    /// Create a window with `capacity` bytes allocated up front.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity],
            begin: 0,
            end: 0,
            position: 0,
        }
    }

    /// Live bytes.
    pub fn data(&self) -> &[u8] {
        &self.buf[self.begin..self.end]
    }

    /// Number of live bytes (`end - begin`).
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    pub fn begin(&self) -> usize {
        self.begin
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn allocated(&self) -> usize {
        self.buf.len()
    }

    /// Absolute input offset of the first live byte.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Absolute input offset just past the last live byte.
    pub fn end_position(&self) -> u64 {
        self.position + self.len() as u64
    }

    /// Make room for at least `n` more bytes after `end`.
    ///
    /// Live bytes are moved to the front before the buffer is grown.
    pub fn reserve(&mut self, n: usize) {
        if self.buf.len() - self.end >= n {
            return;
        }
        if self.begin > 0 {
            self.buf.copy_within(self.begin..self.end, 0);
            self.end -= self.begin;
            self.begin = 0;
        }
        if self.buf.len() - self.end < n {
            self.buf.resize(self.end + n, 0);
        }
    }

    /// Writable space after `end`. Call [`reserve`](Self::reserve) first.
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.end..]
    }

    /// Mark `n` bytes of [`spare_mut`](Self::spare_mut) as filled.
    pub fn move_end(&mut self, n: usize) -> Result<()> {
        let spare = self.buf.len() - self.end;
        if n > spare {
            return Err(DemuxError::BufferUnderflow {
                need: n,
                have: spare,
            });
        }
        self.end += n;
        Ok(())
    }

    /// Consume `n` live bytes from the front.
    pub fn move_start(&mut self, n: usize) -> Result<()> {
        if n > self.len() {
            return Err(DemuxError::BufferUnderflow {
                need: n,
                have: self.len(),
            });
        }
        self.begin += n;
        self.position += n as u64;
        if self.begin == self.end {
            self.begin = 0;
            self.end = 0;
        }
        Ok(())
    }

    /// Append bytes after the live region.
    pub fn extend_from_slice(&mut self, data: &[u8]) {
        self.reserve(data.len());
        self.buf[self.end..self.end + data.len()].copy_from_slice(data);
        self.end += data.len();
    }

    /// Drop all live bytes and continue at absolute offset `position`.
    pub fn reset_to(&mut self, position: u64) {
        self.begin = 0;
        self.end = 0;
        self.position = position;
    }
}
