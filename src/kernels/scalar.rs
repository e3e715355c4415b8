//! Portable scalar dequantization kernel.
//!
//! This is the reference implementation: no intrinsics, available on every
//! target, and checked rather than `unsafe`. The wide kernels are required
//! to agree with this one within 1 ULP per element.

use crate::block::{self, BLOCK_BYTES, ELEMENTS_PER_BLOCK};
use crate::error::{VextraError, VextraResult};

/// Dequantize `k` Q2_K-packed elements from `src` into `dst`.
///
/// `src` must hold `block_count(k) * 72` bytes and `dst` must hold exactly
/// `k` `f32` slots. Returns an error rather than panicking if either
/// precondition is violated, or if `k` isn't a multiple of 256.
pub fn dequantize_scalar(src: &[u8], dst: &mut [f32], k: usize) -> VextraResult<()> {
    let nb = block::block_count(k)?;
    let expected_src = nb * BLOCK_BYTES;
    if src.len() != expected_src {
        return Err(VextraError::SizeMismatch {
            expected: expected_src,
            actual: src.len(),
        });
    }
    if dst.len() != k {
        return Err(VextraError::SizeMismatch {
            expected: k,
            actual: dst.len(),
        });
    }

    for block_idx in 0..nb {
        let block_bytes = &src[block_idx * BLOCK_BYTES..(block_idx + 1) * BLOCK_BYTES];
        let d = f32::from_le_bytes(block_bytes[0..4].try_into().unwrap());
        let dmin = f32::from_le_bytes(block_bytes[4..8].try_into().unwrap());
        let qs = &block_bytes[8..72];

        let out = &mut dst[block_idx * ELEMENTS_PER_BLOCK..(block_idx + 1) * ELEMENTS_PER_BLOCK];
        for (i, slot) in out.iter_mut().enumerate() {
            let q = block::extract_index(qs, i) as f32;
            *slot = q.mul_add(d, dmin);
        }
    }

    Ok(())
}
