//! Q2_K block format: constants and pure layout helpers.
//!
//! A Q2_K block is 72 bytes: a little-endian `f32` scale `d`, a little-endian
//! `f32` bias `dmin`, then 64 bytes of packed 2-bit indices. Each byte packs
//! four indices; the index at position `p` of byte `b` is
//! `(qs[b] >> (2*p)) & 0x3`. See `original_source`'s `block_q2_k` struct,
//! which this layout mirrors field-for-field.

use crate::error::VextraError;

/// Size in bytes of one Q2_K block.
pub const BLOCK_BYTES: usize = 72;

/// Number of logical elements a single Q2_K block expands to.
pub const ELEMENTS_PER_BLOCK: usize = 256;

/// Number of 2-bit indices packed into a single `qs` byte.
pub const INDICES_PER_BYTE: usize = 4;

/// Byte offset of the `d` (scale) field within a block.
pub const D_OFFSET: usize = 0;

/// Byte offset of the `dmin` (bias) field within a block.
pub const DMIN_OFFSET: usize = 4;

/// Byte offset of the packed index bytes within a block.
pub const QS_OFFSET: usize = 8;

/// A read-only view over a single 72-byte Q2_K block.
///
/// Not used by the hot kernel loops (they index straight into the tensor's
/// byte slice, since an arbitrary offset into a larger buffer need not be
/// 4-byte aligned for `d`/`dmin`), but useful for tests and for callers
/// constructing a single block by hand.
#[derive(Debug, Clone, Copy)]
pub struct Q2KBlockView<'a> {
    bytes: &'a [u8; BLOCK_BYTES],
}

impl<'a> Q2KBlockView<'a> {
    pub fn new(bytes: &'a [u8; BLOCK_BYTES]) -> Self {
        Self { bytes }
    }

    /// Block-level scale factor.
    pub fn d(&self) -> f32 {
        f32::from_le_bytes(self.bytes[D_OFFSET..D_OFFSET + 4].try_into().unwrap())
    }

    /// Block-level bias (sometimes called minimum).
    pub fn dmin(&self) -> f32 {
        f32::from_le_bytes(self.bytes[DMIN_OFFSET..DMIN_OFFSET + 4].try_into().unwrap())
    }

    /// The 64 packed index bytes.
    pub fn qs(&self) -> &[u8] {
        &self.bytes[QS_OFFSET..QS_OFFSET + 64]
    }

    /// Extract the 2-bit index at logical position `i` (0..256) within this
    /// block.
    pub fn index(&self, i: usize) -> u8 {
        extract_index(self.qs(), i)
    }
}

/// Extract the 2-bit index at logical position `i` (0..256) from a block's
/// 64-byte `qs` slice.
///
/// `b = i mod 64` selects the byte, `p = i div 64` selects which of the
/// four bit pairs packed into that byte: `(qs[b] >> (2*p)) & 0x3`. Position
/// 0 of every byte feeds output positions `0..64`, position 1 feeds
/// `64..128`, and so on — the four quarters of a block's output correspond
/// to the four bit-pair positions, not to the raw byte order.
#[inline]
pub fn extract_index(qs: &[u8], i: usize) -> u8 {
    debug_assert_eq!(qs.len(), 64);
    debug_assert!(i < ELEMENTS_PER_BLOCK);
    let b = i % 64;
    let p = i / 64;
    (qs[b] >> (2 * p)) & 0x3
}

/// Number of Q2_K blocks that make up `k` elements.
///
/// Returns [`VextraError::NotBlockAligned`] if `k` is not a positive
/// multiple of 256.
pub fn block_count(k: usize) -> Result<usize, VextraError> {
    if k == 0 || k % ELEMENTS_PER_BLOCK != 0 {
        return Err(VextraError::NotBlockAligned(k));
    }
    Ok(k / ELEMENTS_PER_BLOCK)
}

/// Size in bytes of the packed storage for a Q2_K tensor of `k` elements.
pub fn tensor_bytes(k: usize) -> Result<usize, VextraError> {
    Ok(block_count(k)? * BLOCK_BYTES)
}
