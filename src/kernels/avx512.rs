//! AVX-512 wide dequantization kernel.
//!
//! Same widen-shift-mask-FMA strategy as [`super::avx2`], but
//! `_mm512_cvtepu8_epi32` widens 16 packed bytes to 16 `i32` lanes per
//! pass instead of 8, so a 64-byte `qs` window needs 4 chunks per quarter
//! instead of 8. See [`super::avx2`]'s module docs for why processing
//! quarters outermost is what keeps the store order matching the scalar
//! kernel's `dst[b*256 + i]` for ascending `i`.
//!
//! # Safety
//!
//! See [`super::avx2::dequantize_avx2`]'s safety section; the same
//! preconditions apply here, gated on `avx512f,avx512bw,avx512vl,avx512dq`
//! instead.
#[target_feature(enable = "avx512f,avx512bw,avx512vl,avx512dq")]
pub unsafe fn dequantize_avx512(src: &[u8], dst: &mut [f32], k: usize) {
    use std::arch::x86_64::*;

    const LANES: usize = 16;
    let nb = k / 256;
    let m3 = _mm512_set1_epi32(0x03);

    for i in 0..nb {
        let block = &src[i * 72..(i + 1) * 72];
        let d = f32::from_le_bytes(block[0..4].try_into().unwrap());
        let dmin = f32::from_le_bytes(block[4..8].try_into().unwrap());
        let qs = block[8..72].as_ptr();

        let v_scale = _mm512_set1_ps(d);
        let v_bias = _mm512_set1_ps(dmin);
        let y = dst[i * 256..(i + 1) * 256].as_mut_ptr();

        let mut b = 0isize;
        while b < 64 {
            // 16 contiguous qs bytes widened to 16 i32 lanes, one lane per byte.
            let raw = _mm_loadu_si128(qs.offset(b) as *const __m128i);
            let widened = _mm512_cvtepu8_epi32(raw);

            let q0 = _mm512_and_si512(widened, m3);
            store_quarter(y, 0, b, q0, v_scale, v_bias);

            let q1 = _mm512_and_si512(_mm512_srli_epi32(widened, 2), m3);
            store_quarter(y, 1, b, q1, v_scale, v_bias);

            let q2 = _mm512_and_si512(_mm512_srli_epi32(widened, 4), m3);
            store_quarter(y, 2, b, q2, v_scale, v_bias);

            let q3 = _mm512_and_si512(_mm512_srli_epi32(widened, 6), m3);
            store_quarter(y, 3, b, q3, v_scale, v_bias);

            b += LANES as isize;
        }
    }
}

#[target_feature(enable = "avx512f,avx512bw,avx512vl,avx512dq")]
#[inline]
unsafe fn store_quarter(
    y: *mut f32,
    p: isize,
    b: isize,
    idx: std::arch::x86_64::__m512i,
    v_scale: std::arch::x86_64::__m512,
    v_bias: std::arch::x86_64::__m512,
) {
    use std::arch::x86_64::*;
    let f = _mm512_fmadd_ps(_mm512_cvtepi32_ps(idx), v_scale, v_bias);
    _mm512_storeu_ps(y.offset(p * 64 + b), f);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::scalar::dequantize_scalar;

    fn single_block(d: f32, dmin: f32, qs_byte: u8) -> Vec<u8> {
        let mut bytes = vec![0u8; 72];
        bytes[0..4].copy_from_slice(&d.to_le_bytes());
        bytes[4..8].copy_from_slice(&dmin.to_le_bytes());
        bytes[8..72].fill(qs_byte);
        bytes
    }

    fn non_uniform_block(d: f32, dmin: f32) -> Vec<u8> {
        let mut bytes = vec![0u8; 72];
        bytes[0..4].copy_from_slice(&d.to_le_bytes());
        bytes[4..8].copy_from_slice(&dmin.to_le_bytes());
        for (i, byte) in bytes[8..72].iter_mut().enumerate() {
            *byte = ((i * 53 + 7) % 256) as u8;
        }
        bytes
    }

    #[test]
    fn matches_scalar_reference_on_uniform_blocks() {
        if !is_x86_feature_detected!("avx512f")
            || !is_x86_feature_detected!("avx512bw")
            || !is_x86_feature_detected!("avx512vl")
            || !is_x86_feature_detected!("avx512dq")
        {
            return;
        }
        let mut src = single_block(2.0, 0.5, 0xE4);
        src.extend(single_block(-3.25, 1.125, 0x1B));
        let k = 512;

        let mut expected = vec![0f32; k];
        dequantize_scalar(&src, &mut expected, k).unwrap();

        let mut actual = vec![0f32; k];
        unsafe { dequantize_avx512(&src, &mut actual, k) };

        for (e, a) in expected.iter().zip(actual.iter()) {
            assert!((e - a).abs() <= e.abs() * f32::EPSILON * 4.0 + f32::EPSILON);
        }
    }

    #[test]
    fn matches_scalar_reference_on_non_uniform_blocks() {
        if !is_x86_feature_detected!("avx512f")
            || !is_x86_feature_detected!("avx512bw")
            || !is_x86_feature_detected!("avx512vl")
            || !is_x86_feature_detected!("avx512dq")
        {
            return;
        }
        let mut src = non_uniform_block(1.75, -0.25);
        src.extend(non_uniform_block(0.125, 4.0));
        let k = 512;

        let mut expected = vec![0f32; k];
        dequantize_scalar(&src, &mut expected, k).unwrap();

        let mut actual = vec![0f32; k];
        unsafe { dequantize_avx512(&src, &mut actual, k) };

        for (i, (e, a)) in expected.iter().zip(actual.iter()).enumerate() {
            assert!(
                (e - a).abs() <= e.abs() * f32::EPSILON * 4.0 + f32::EPSILON,
                "mismatch at element {i}: expected {e}, got {a}"
            );
        }
    }
}
