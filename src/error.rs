use thiserror::Error;

/// Error taxonomy for the Vextra dequantization and dispatch layer.
///
/// Precondition violations inside the unsafe wide-SIMD kernels (`kernels::avx2`,
/// `kernels::avx512`) are deliberately *not* represented here — those kernels
/// assume their caller already validated shapes and are undefined behavior on
/// misuse, per the contract those kernels document. This type covers the
/// checked entry points: the scalar kernel, the GPU device context, and the
/// graph backend adapter.
#[derive(Error, Debug)]
pub enum VextraError {
    /// An element count is not a multiple of 256, so it cannot be expressed
    /// as a whole number of Q2_K blocks.
    #[error("element count {0} is not a multiple of the Q2_K block width (256)")]
    NotBlockAligned(usize),

    /// A source or destination slice did not have the length its `k`
    /// implies.
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// A GPU buffer or staging allocation failed, or no memory type
    /// satisfied the requested usage/property flags.
    #[error("device allocation failed: {0}")]
    DeviceAllocationFailed(String),

    /// No adapter exposing compute capability could be found, or device
    /// creation otherwise failed during `init`.
    #[error("no suitable compute device: {0}")]
    NoComputeCapability(String),

    /// The external routing oracle failed to return telemetry. The oracle's
    /// contract is documented as total, so this should not occur in
    /// practice; it exists so FFI failures don't panic across the boundary.
    #[error("routing oracle call failed: {0}")]
    RoutingOracleFailed(String),
}

pub type VextraResult<T> = Result<T, VextraError>;
