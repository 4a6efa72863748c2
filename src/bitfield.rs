//! Piece bitfield and interval compression
//!
//! The engine tracks which pieces are fully downloaded as a packed bitmap.
//! The loading bar only needs the contiguous runs of present pieces, so
//! `compress` turns the bitmap into a short list of intervals once per render.

use serde::{Deserialize, Serialize};

/// Packed presence bitmap, most significant bit first (BitTorrent wire layout)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bitfield {
    bytes: Vec<u8>,
    len: usize,
}

impl Bitfield {
    /// Bitfield of `len` pieces with nothing present
    pub fn new(len: usize) -> Self {
        Self {
            bytes: vec![0; len.div_ceil(8)],
            len,
        }
    }

    /// Bitfield of `len` pieces with everything present
    pub fn full(len: usize) -> Self {
        let mut bits = Self::new(len);
        for i in 0..len {
            bits.set(i, true);
        }
        bits
    }

    /// Wrap raw bytes received from the engine.
    ///
    /// Missing bytes read as unset; spare bits past `len` are ignored.
    pub fn from_bytes(bytes: Vec<u8>, len: usize) -> Self {
        let mut bytes = bytes;
        bytes.resize(len.div_ceil(8), 0);
        Self { bytes, len }
    }

    /// Number of pieces
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether piece `index` is present (out of range reads as absent)
    pub fn get(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        self.bytes
            .get(index / 8)
            .map(|byte| byte & (0x80 >> (index % 8)) != 0)
            .unwrap_or(false)
    }

    /// Mark piece `index` present or absent (out of range is ignored)
    pub fn set(&mut self, index: usize, present: bool) {
        if index >= self.len {
            return;
        }
        if let Some(byte) = self.bytes.get_mut(index / 8) {
            let mask = 0x80 >> (index % 8);
            if present {
                *byte |= mask;
            } else {
                *byte &= !mask;
            }
        }
    }

    /// Number of present pieces
    pub fn count_ones(&self) -> usize {
        (0..self.len).filter(|&i| self.get(i)).count()
    }
}

impl FromIterator<bool> for Bitfield {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let values: Vec<bool> = iter.into_iter().collect();
        let mut bits = Bitfield::new(values.len());
        for (i, present) in values.into_iter().enumerate() {
            bits.set(i, present);
        }
        bits
    }
}

/// A maximal run of present pieces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: usize,
    pub count: usize,
}

impl Interval {
    /// One past the last piece of the run
    pub fn end(&self) -> usize {
        self.start + self.count
    }
}

/// Run-length encode the present pieces of a bitfield.
///
/// Single left-to-right pass. Intervals come out sorted, each maximal, so no
/// two of them touch.
pub fn compress(bits: &Bitfield) -> Vec<Interval> {
    let mut parts: Vec<Interval> = Vec::new();
    let mut open: Option<Interval> = None;

    for i in 0..bits.len() {
        match (bits.get(i), open.as_mut()) {
            (true, Some(run)) => run.count += 1,
            (true, None) => open = Some(Interval { start: i, count: 1 }),
            (false, Some(_)) => parts.extend(open.take()),
            (false, None) => {}
        }
    }
    parts.extend(open);
    parts
}
