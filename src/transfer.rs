//! Fragmented transfer reassembly
//!
//! Tracks the declared total size of an incoming pack and the set of
//! fragments received so far, writing each fragment into a single
//! preallocated buffer. Duplicate and out-of-range fragments are logged and
//! ignored so a session can still complete after resending correct data.

use crate::error::{PackError, Result};
use tracing::warn;

/// Reassembles a byte buffer delivered as fixed-offset fragments.
///
/// Fragment `i` occupies the byte range starting at `i * max_fragment_size`.
/// The buffer is complete once every fragment index has been received.
#[derive(Debug)]
pub struct FragmentAssembler {
    buffer: Vec<u8>,
    max_fragment_size: u32,
    received: Vec<bool>,
    remaining: usize,
}

impl FragmentAssembler {
    /// Allocate the assembly buffer and fragment bitmap.
    pub fn new(length: u32, max_fragment_size: u32) -> Result<Self> {
        if max_fragment_size == 0 {
            return Err(PackError::InvalidDeclaration {
                length,
                max_fragment_size,
            });
        }
        let slots = length.div_ceil(max_fragment_size) as usize;
        Ok(FragmentAssembler {
            buffer: vec![0; length as usize],
            max_fragment_size,
            received: vec![false; slots],
            remaining: slots,
        })
    }

    /// Declared total length in bytes.
    pub fn length(&self) -> usize {
        self.buffer.len()
    }

    /// Number of fragment slots.
    pub fn fragment_count(&self) -> usize {
        self.received.len()
    }

    /// Number of distinct fragments received so far.
    pub fn received_count(&self) -> usize {
        self.received.len() - self.remaining
    }

    /// True once every fragment slot has been filled.
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    /// Write one fragment at its declared offset.
    ///
    /// Returns `true` iff this call fills the last outstanding slot.
    /// Duplicate and out-of-range fragments are logged and ignored; the
    /// transfer stays incomplete and can still succeed once every slot is
    /// filled with valid data.
    pub fn submit(&mut self, index: u32, data: &[u8]) -> bool {
        let slots = self.received.len();
        let Some(received) = self.received.get_mut(index as usize) else {
            warn!("Fragment index {} out of range ({} slots)", index, slots);
            return false;
        };
        if *received {
            warn!("Duplicate fragment {}", index);
            return false;
        }
        let offset = index as usize * self.max_fragment_size as usize;
        let end = offset + data.len();
        if end > self.buffer.len() {
            warn!(
                "Fragment {} with {} bytes exceeds declared pack size",
                index,
                data.len()
            );
            return false;
        }
        self.buffer[offset..end].copy_from_slice(data);
        *received = true;
        self.remaining -= 1;
        self.is_complete()
    }

    /// Consume the assembler and return the reassembled buffer.
    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }
}
