//! Dequantization kernel selection and dispatch.
//!
//! A host picks a kernel once at startup (capability detection is not free
//! and has no reason to run per call) and reuses that choice for the life
//! of the process. [`select`] performs and caches that detection; [`dequantize`]
//! is the convenience entry point hosts that don't care which kernel ran
//! should call.

pub mod scalar;

#[cfg(target_arch = "x86_64")]
pub mod avx2;

#[cfg(target_arch = "x86_64")]
pub mod avx512;

use std::sync::OnceLock;

use crate::config;
use crate::error::VextraResult;

/// Which concrete kernel a [`select`] call resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    Scalar,
    Avx2,
    Avx512,
}

/// Detects (or returns the forced, or cached) kernel for this process.
///
/// Detection order: an explicit `VEXTRA_FORCE_KERNEL` override always wins
/// (for testing kernel-specific code paths on hardware that doesn't match);
/// otherwise the widest available instruction set wins, falling back to
/// [`Kernel::Scalar`] on any non-`x86_64` target or a target lacking both
/// wide kernels' required features.
pub fn select() -> Kernel {
    static SELECTED: OnceLock<Kernel> = OnceLock::new();
    *SELECTED.get_or_init(detect)
}

fn detect() -> Kernel {
    if let Some(forced) = config::forced_kernel() {
        let kernel = match forced {
            config::ForcedKernel::Scalar => Kernel::Scalar,
            config::ForcedKernel::Avx2 => Kernel::Avx2,
            config::ForcedKernel::Avx512 => Kernel::Avx512,
        };
        tracing::info!(?kernel, "kernel forced via VEXTRA_FORCE_KERNEL");
        return kernel;
    }

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx512f")
            && is_x86_feature_detected!("avx512bw")
            && is_x86_feature_detected!("avx512vl")
            && is_x86_feature_detected!("avx512dq")
        {
            tracing::debug!("selected avx512 kernel");
            return Kernel::Avx512;
        }
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            tracing::debug!("selected avx2 kernel");
            return Kernel::Avx2;
        }
    }

    tracing::debug!("selected scalar kernel");
    Kernel::Scalar
}

/// Dequantize `k` Q2_K-packed elements from `src` into `dst` using the
/// kernel [`select`] resolves to.
///
/// Validates sizes up front (see
/// [`scalar::dequantize_scalar`]) before dispatching to the unsafe wide
/// kernels, so the safety preconditions those kernels document are
/// satisfied by construction here.
pub fn dequantize(src: &[u8], dst: &mut [f32], k: usize) -> VextraResult<()> {
    use crate::block::{BLOCK_BYTES, block_count};
    use crate::error::VextraError;

    let nb = block_count(k)?;
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

    match select() {
        Kernel::Scalar => scalar::dequantize_scalar(src, dst, k),
        #[cfg(target_arch = "x86_64")]
        Kernel::Avx2 => {
            unsafe { avx2::dequantize_avx2(src, dst, k) };
            Ok(())
        }
        #[cfg(target_arch = "x86_64")]
        Kernel::Avx512 => {
            unsafe { avx512::dequantize_avx512(src, dst, k) };
            Ok(())
        }
        #[cfg(not(target_arch = "x86_64"))]
        Kernel::Avx2 | Kernel::Avx512 => unreachable!("select() never returns a wide kernel off x86_64"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_is_stable_across_calls() {
        assert_eq!(select(), select());
    }

    #[test]
    fn dequantize_rejects_bad_shapes() {
        let src = vec![0u8; 71];
        let mut dst = vec![0f32; 256];
        assert!(dequantize(&src, &mut dst, 256).is_err());
    }

    #[test]
    fn dequantize_matches_scalar_for_selected_kernel() {
        let mut src = vec![0u8; 72];
        src[0..4].copy_from_slice(&1.5f32.to_le_bytes());
        src[4..8].copy_from_slice(&(-0.5f32).to_le_bytes());
        src[8..72].fill(0x93);

        let mut via_dispatch = vec![0f32; 256];
        dequantize(&src, &mut via_dispatch, 256).unwrap();

        let mut via_scalar = vec![0f32; 256];
        scalar::dequantize_scalar(&src, &mut via_scalar, 256).unwrap();

        for (a, b) in via_dispatch.iter().zip(via_scalar.iter()) {
            assert!((a - b).abs() <= b.abs() * f32::EPSILON * 4.0 + f32::EPSILON);
        }
    }
}
