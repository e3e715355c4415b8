//! This crate's own startup tunables.
//!
//! The adapter's contract is explicit that CLI/env/file configuration of
//! the adapter's behavior toward the host graph runtime is out of scope:
//! the host decides what graph to run and when. What lives here is this
//! crate's own internal knobs, read once and cached for the life of the
//! process like any other ambient server default.

use std::env;
use std::sync::OnceLock;

/// CPU kernel family, used to force a specific dequantization kernel for
/// testing on hosts whose detected features don't match the build machine
/// (e.g. CI runners without AVX-512).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedKernel {
    Scalar,
    Avx2,
    Avx512,
}

/// Environment variable consulted once by `kernels::select()`.
pub const FORCE_KERNEL_ENV: &str = "VEXTRA_FORCE_KERNEL";

/// Default maximum element count a freshly-prepared GPU device context
/// reserves space for. Chosen to cover a handful of typical matmul weight
/// rows without forcing a `prepare` reallocation on first use; hosts that
/// need more simply call `DeviceContext::prepare` with a larger `k`.
pub const DEFAULT_GPU_MAX_K: usize = 1 << 16;

/// Reads `VEXTRA_FORCE_KERNEL` from the environment, cached for the
/// lifetime of the process since kernel selection itself is cached.
pub fn forced_kernel() -> Option<ForcedKernel> {
    static FORCED: OnceLock<Option<ForcedKernel>> = OnceLock::new();
    *FORCED.get_or_init(|| match env::var(FORCE_KERNEL_ENV) {
        Ok(value) => match value.as_str() {
            "scalar" => Some(ForcedKernel::Scalar),
            "avx2" => Some(ForcedKernel::Avx2),
            "avx512" => Some(ForcedKernel::Avx512),
            _ => None,
        },
        Err(_) => None,
    })
}
