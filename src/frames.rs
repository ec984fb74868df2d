//! Pending frames of the current block.

use crate::error::{DemuxError, Result};

/// Default number of frames one block may hold.
pub const DEFAULT_RING_CAPACITY: usize = 30;

/// One elementary frame inside a block, waiting for its bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDescriptor {
    pub track_number: u64,
    pub byte_length: usize,
    /// Presentation time in segment ticks (TimecodeScale units).
    pub timestamp_ticks: i64,
    pub is_keyframe: bool,
}

/// Fixed-capacity circular queue of [`FrameDescriptor`]s.
///
/// Pushing past capacity is an error; frames are never dropped.
#[derive(Debug)]
pub struct FrameRing {
    slots: Vec<Option<FrameDescriptor>>,
    head: usize,
    len: usize,
    pushed: u64,
}

impl FrameRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            head: 0,
            len: 0,
            pushed: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Free slots.
    pub fn remaining(&self) -> usize {
        self.capacity() - self.len
    }

    /// Frames pushed since creation.
    pub fn total_pushed(&self) -> u64 {
        self.pushed
    }

    /// Append a frame at the back.
    pub fn push(&mut self, frame: FrameDescriptor) -> Result<()> {
        if self.len == self.capacity() {
            return Err(DemuxError::FrameRingFull {
                capacity: self.capacity(),
            });
        }
        let tail = (self.head + self.len) % self.capacity();
        self.slots[tail] = Some(frame);
        self.len += 1;
        self.pushed += 1;
        Ok(())
    }

    /// Oldest frame without removing it.
    pub fn peek(&self) -> Option<&FrameDescriptor> {
        if self.is_empty() {
            return None;
        }
        self.slots[self.head].as_ref()
    }

    /// Remove and return the oldest frame.
    pub fn pop(&mut self) -> Option<FrameDescriptor> {
        if self.is_empty() {
            return None;
        }
        let frame = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        if self.len == 0 {
            self.head = 0;
        }
        frame
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.len = 0;
    }
}

impl Default for FrameRing {
    fn default() -> Self {
        Self::new(DEFAULT_RING_CAPACITY)
    }
}
