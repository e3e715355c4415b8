//! AVX2/FMA wide dequantization kernel.
//!
//! Unpacks a block's 64 `qs` bytes one quarter at a time: quarter `p`'s 64
//! indices are exactly `(qs[b] >> (2*p)) & 0x3` for `b in 0..64`, so each
//! quarter can be produced from a straight widen-shift-mask-convert-FMA
//! pipeline with no byte shuffling at all — `_mm256_cvtepu8_epi32` widens 8
//! packed bytes to 8 `i32` lanes, a per-quarter-constant shift (0, 2, 4, 6)
//! and `& 0x3` isolates the index, and `_mm256_fmadd_ps` applies
//! `q*d + dmin` in one rounding step. Processing quarters outermost keeps
//! the store order `dst[b*256 + i]` for `i = 0..256` ascending, matching
//! the scalar kernel exactly (quarter `p` owns output range
//! `[p*64, p*64+64)`), per the mandated output ordering.
//!
//! # Safety
//!
//! Callers must have confirmed AVX2 and FMA are available (see
//! [`super::select`]) and must uphold the same size preconditions as
//! [`super::scalar::dequantize_scalar`]: `src.len() == block_count(k) * 72`
//! and `dst.len() == k`. This function does not validate either and is
//! undefined behavior if they don't hold.
#[target_feature(enable = "avx2,fma")]
pub unsafe fn dequantize_avx2(src: &[u8], dst: &mut [f32], k: usize) {
    use std::arch::x86_64::*;

    const LANES: usize = 8;
    let nb = k / 256;
    let m3 = _mm256_set1_epi32(0x03);

    for i in 0..nb {
        let block = &src[i * 72..(i + 1) * 72];
        let d = f32::from_le_bytes(block[0..4].try_into().unwrap());
        let dmin = f32::from_le_bytes(block[4..8].try_into().unwrap());
        let qs = block[8..72].as_ptr();

        let v_scale = _mm256_set1_ps(d);
        let v_bias = _mm256_set1_ps(dmin);
        let y = dst[i * 256..(i + 1) * 256].as_mut_ptr();

        let mut b = 0isize;
        while b < 64 {
            // 8 contiguous qs bytes widened to 8 i32 lanes, one lane per byte.
            let raw = _mm_loadl_epi64(qs.offset(b) as *const __m128i);
            let widened = _mm256_cvtepu8_epi32(raw);

            // Quarter 0: shift 0.
            let q0 = _mm256_and_si256(widened, m3);
            store_quarter(y, 0, b, q0, v_scale, v_bias);

            // Quarter 1: shift 2.
            let q1 = _mm256_and_si256(_mm256_srli_epi32(widened, 2), m3);
            store_quarter(y, 1, b, q1, v_scale, v_bias);

            // Quarter 2: shift 4.
            let q2 = _mm256_and_si256(_mm256_srli_epi32(widened, 4), m3);
            store_quarter(y, 2, b, q2, v_scale, v_bias);

            // Quarter 3: shift 6.
            let q3 = _mm256_and_si256(_mm256_srli_epi32(widened, 6), m3);
            store_quarter(y, 3, b, q3, v_scale, v_bias);

            b += LANES as isize;
        }
    }
}

/// Convert 8 lanes of extracted 2-bit indices to float, FMA with the
/// block's scale/bias, and store to quarter `p`'s output range at byte
/// offset `b` within the quarter.
#[target_feature(enable = "avx2,fma")]
#[inline]
unsafe fn store_quarter(
    y: *mut f32,
    p: isize,
    b: isize,
    idx: std::arch::x86_64::__m256i,
    v_scale: std::arch::x86_64::__m256,
    v_bias: std::arch::x86_64::__m256,
) {
    use std::arch::x86_64::*;
    let f = _mm256_fmadd_ps(_mm256_cvtepi32_ps(idx), v_scale, v_bias);
    _mm256_storeu_ps(y.offset(p * 64 + b), f);
}
