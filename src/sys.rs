//! `repr(C)` types describing the host graph runtime's tensor/graph ABI.
//!
//! There is no header to bind against here (the host is an arbitrary
//! external graph runtime, out of scope for this crate), so this module
//! documents the assumed layout by hand, the same way a safe wrapper over
//! an opaque `-sys` crate documents the C types it's matching rather than
//! generating bindings from a header it doesn't have.

use std::os::raw::c_void;

/// Element type tags the host attaches to a tensor. Only the two this
/// adapter cares about are distinguished; anything else is carried as
/// `Other` and left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub enum CElemType {
    F32 = 0,
    Q2K = 1,
    Other = 0xffff,
}

impl CElemType {
    /// Byte size the routing calculation in [`crate::backend`] multiplies
    /// by `n_elements`, mirroring `ggml_type_size`: for `F32` that's the
    /// true per-element size, but for `Q2_K` the reference backend's
    /// `data_size = ggml_nelements(src) * ggml_type_size(src->type)` uses
    /// the *block* byte size here, not a per-element size (`Q2_K` has none
    /// — 2 bits packed four-to-a-byte plus a block header). This crate
    /// keeps that literally, per Open Question decision #3 in
    /// `DESIGN.md`: `Other` is unknown to this adapter and reports 0 so
    /// routing telemetry stays well-defined rather than guessing.
    pub fn size_bytes(self) -> usize {
        match self {
            CElemType::F32 => 4,
            CElemType::Q2K => crate::block::BLOCK_BYTES,
            CElemType::Other => 0,
        }
    }
}

/// Graph node operation code. Only the two ops this adapter intercepts are
/// distinguished; every other op is carried as `Other` and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub enum COpCode {
    MatMul = 0,
    Copy = 1,
    Other = 0xffff,
}

/// A tensor node as the host graph runtime represents it.
///
/// `data` points to host-owned storage; this adapter never allocates or
/// frees it. `n_elements` is the logical element count (`k` for Q2_K
/// tensors).
#[repr(C)]
pub struct CTensor {
    pub elem_type: CElemType,
    pub op: COpCode,
    pub data: *mut c_void,
    pub n_elements: u64,
    pub src: [*const CTensor; 2],
}

/// A computation graph: a flat array of node pointers, host-owned.
#[repr(C)]
pub struct CGraph {
    pub n_nodes: i32,
    pub nodes: *mut *mut CTensor,
}

impl CGraph {
    /// Borrow the graph's nodes as a safe slice.
    ///
    /// # Safety
    ///
    /// `nodes` must point to `n_nodes` valid, non-null `*mut CTensor`
    /// pointers, and each of those must point to a live `CTensor` for the
    /// duration of the borrow.
    pub unsafe fn nodes(&self) -> &[*mut CTensor] {
        if self.n_nodes <= 0 || self.nodes.is_null() {
            &[]
        } else {
            std::slice::from_raw_parts(self.nodes, self.n_nodes as usize)
        }
    }
}
