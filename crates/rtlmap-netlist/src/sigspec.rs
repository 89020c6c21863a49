//! Signals
//!
//! A [`SigSpec`] is an ordered concatenation of chunks, each either a
//! constant slice or a contiguous bit range of a named wire. Chunks are
//! stored least-significant first; appending adds more significant bits.
//!
//! Wire references are logical: a chunk names its wire and is resolved
//! through the owning module's wire table. This keeps bulk cloning and
//! renaming simple — clone by value, rebind names, re-resolve.

use crate::constant::{Const, State};
use crate::ident::IdString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One chunk of a signal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigChunk {
    /// A contiguous bit range `[offset, offset + width)` of a wire.
    Wire {
        /// Name of the referenced wire.
        name: IdString,
        /// First referenced bit.
        offset: usize,
        /// Number of referenced bits.
        width: usize,
    },
    /// A literal constant slice.
    Const(Const),
}

impl SigChunk {
    /// Bit width of this chunk.
    pub fn width(&self) -> usize {
        match self {
            SigChunk::Wire { width, .. } => *width,
            SigChunk::Const(c) => c.width(),
        }
    }
}

/// A single bit of a signal, used by bit-level rewriting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigBit {
    /// A constant bit.
    Const(State),
    /// Bit `offset` of the named wire.
    Wire {
        /// Name of the referenced wire.
        name: IdString,
        /// Referenced bit index.
        offset: usize,
    },
}

/// An ordered concatenation of chunks; the first chunk holds the LSBs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SigSpec {
    chunks: Vec<SigChunk>,
}

impl SigSpec {
    /// The empty (zero-width) signal.
    pub fn empty() -> Self {
        SigSpec { chunks: Vec::new() }
    }

    /// The whole of a wire of known width.
    pub fn wire(name: IdString, width: usize) -> Self {
        SigSpec::from(SigChunk::Wire { name, offset: 0, width })
    }

    /// A slice of a wire.
    pub fn wire_slice(name: IdString, offset: usize, width: usize) -> Self {
        SigSpec::from(SigChunk::Wire { name, offset, width })
    }

    /// Total bit width.
    pub fn width(&self) -> usize {
        self.chunks.iter().map(SigChunk::width).sum()
    }

    /// True when the signal has no bits.
    pub fn is_empty(&self) -> bool {
        self.width() == 0
    }

    /// The chunks, least significant first.
    pub fn chunks(&self) -> &[SigChunk] {
        &self.chunks
    }

    /// Mutable access to the chunks, for in-place renaming.
    pub fn chunks_mut(&mut self) -> &mut [SigChunk] {
        &mut self.chunks
    }

    /// Append `other` as more significant bits.
    pub fn append(&mut self, other: impl Into<SigSpec>) {
        for chunk in other.into().chunks {
            if chunk.width() == 0 {
                continue;
            }
            if let Some(last) = self.chunks.last_mut() {
                match (last, &chunk) {
                    (
                        SigChunk::Wire { name, offset, width },
                        SigChunk::Wire { name: n2, offset: o2, width: w2 },
                    ) if name == n2 && *offset + *width == *o2 => {
                        *width += *w2;
                        continue;
                    }
                    (SigChunk::Const(c1), SigChunk::Const(c2)) => {
                        c1.bits.extend_from_slice(&c2.bits);
                        continue;
                    }
                    _ => {}
                }
            }
            self.chunks.push(chunk);
        }
    }

    /// Decompose into individual bits, least significant first.
    pub fn bits(&self) -> Vec<SigBit> {
        let mut bits = Vec::with_capacity(self.width());
        for chunk in &self.chunks {
            match chunk {
                SigChunk::Wire { name, offset, width } => {
                    for i in 0..*width {
                        bits.push(SigBit::Wire { name: name.clone(), offset: offset + i });
                    }
                }
                SigChunk::Const(c) => {
                    bits.extend(c.bits.iter().map(|&b| SigBit::Const(b)));
                }
            }
        }
        bits
    }

    /// Rebuild a signal from bits, merging adjacent compatible bits back
    /// into chunks.
    pub fn from_bits(bits: impl IntoIterator<Item = SigBit>) -> Self {
        let mut sig = SigSpec::empty();
        for bit in bits {
            let chunk = match bit {
                SigBit::Wire { name, offset } => SigChunk::Wire { name, offset, width: 1 },
                SigBit::Const(s) => SigChunk::Const(Const::from_bits(vec![s])),
            };
            sig.append(chunk);
        }
        sig
    }

    /// Remove `count` bits starting at bit `offset`.
    pub fn remove(&mut self, offset: usize, count: usize) {
        let mut bits = self.bits();
        let end = (offset + count).min(bits.len());
        bits.drain(offset..end);
        *self = SigSpec::from_bits(bits);
    }

    /// Copy out `count` bits starting at bit `offset`.
    pub fn extract(&self, offset: usize, count: usize) -> SigSpec {
        let bits = self.bits();
        let end = (offset + count).min(bits.len());
        SigSpec::from_bits(bits[offset..end].iter().cloned())
    }

    /// True when every chunk is a constant.
    pub fn is_fully_const(&self) -> bool {
        self.chunks.iter().all(|c| matches!(c, SigChunk::Const(_)))
    }

    /// The constant value, when the signal is fully constant.
    pub fn as_const(&self) -> Option<Const> {
        let mut bits = Vec::with_capacity(self.width());
        for chunk in &self.chunks {
            match chunk {
                SigChunk::Const(c) => bits.extend_from_slice(&c.bits),
                SigChunk::Wire { .. } => return None,
            }
        }
        Some(Const::from_bits(bits))
    }
}

impl From<SigChunk> for SigSpec {
    fn from(chunk: SigChunk) -> Self {
        let mut sig = SigSpec::empty();
        sig.append_chunk(chunk);
        sig
    }
}

impl From<Const> for SigSpec {
    fn from(c: Const) -> Self {
        SigSpec::from(SigChunk::Const(c))
    }
}

impl SigSpec {
    fn append_chunk(&mut self, chunk: SigChunk) {
        if chunk.width() > 0 {
            self.chunks.push(chunk);
        }
    }
}

impl fmt::Display for SigSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.chunks.len() == 1 {
            return write!(f, "{}", self.chunks[0]);
        }
        // Concatenations print most significant first.
        write!(f, "{{")?;
        for chunk in self.chunks.iter().rev() {
            write!(f, " {}", chunk)?;
        }
        write!(f, " }}")
    }
}

impl fmt::Display for SigChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigChunk::Const(c) => write!(f, "{}", c),
            SigChunk::Wire { name, offset, width } => {
                write!(f, "{}", name)?;
                if *offset != 0 || *width != 1 {
                    if *width == 1 {
                        write!(f, " [{}]", offset)?;
                    } else {
                        write!(f, " [{}:{}]", offset + width - 1, offset)?;
                    }
                }
                Ok(())
            }
        }
    }
}
