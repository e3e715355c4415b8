//! Graph backend adapter: buffer type registration and graph execution.
//!
//! Mirrors the reference adapter's two halves. The buffer type is a
//! trivial host-memory allocator registered under the name "Vextra" with
//! 32-byte alignment (matching wide-SIMD load requirements); the backend's
//! `graph_compute` walks a host-supplied graph and intercepts exactly two
//! node shapes, leaving every other op for the host to run elsewhere (no
//! fallback path exists here by design).

use std::alloc::{Layout, alloc, dealloc};
use std::os::raw::c_void;
use std::sync::OnceLock;

use crate::error::{VextraError, VextraResult};
use crate::kernels;
use crate::routing;
use crate::sys::{CElemType, COpCode, CGraph, CTensor};

/// Alignment the buffer type guarantees allocations at, matching the
/// widest SIMD load width the kernels use.
pub const BUFFER_ALIGNMENT: usize = 32;

/// Name the buffer type and backend report themselves as.
pub const NAME: &str = "Vextra";

/// A host-memory allocation owned by this buffer type.
///
/// Freed via [`VextraBuffer::release`], which the host must call exactly
/// once and only once no GPU dispatch against this allocation is in
/// flight.
pub struct VextraBuffer {
    ptr: *mut u8,
    layout: Layout,
}

impl VextraBuffer {
    /// Allocate `size` bytes aligned to [`BUFFER_ALIGNMENT`].
    pub fn allocate(size: usize) -> VextraResult<Self> {
        let layout = Layout::from_size_align(size.max(1), BUFFER_ALIGNMENT)
            .map_err(|e| VextraError::DeviceAllocationFailed(e.to_string()))?;
        // Safety: layout has non-zero size (we max(1) above) and valid
        // alignment by construction.
        let ptr = unsafe { alloc(layout) };
        if ptr.is_null() {
            return Err(VextraError::DeviceAllocationFailed(format!(
                "allocation of {size} bytes failed"
            )));
        }
        Ok(Self { ptr, layout })
    }

    /// Base address of the allocation, for the host to hand back as a
    /// tensor's `data` pointer.
    pub fn base(&self) -> *mut c_void {
        self.ptr as *mut c_void
    }
}

impl Drop for VextraBuffer {
    fn drop(&mut self) {
        // Safety: ptr/layout pair was produced by `allocate`'s matching
        // `alloc` call and is only ever freed once, here.
        unsafe { dealloc(self.ptr, self.layout) };
    }
}

/// The graph backend itself. `graph_compute` is the only interesting
/// entry point; an optional GPU device context lets `Copy(Q2_K→F32)`
/// nodes dispatch to the GPU kernel instead of the CPU one.
#[derive(Default)]
pub struct VextraBackend {
    gpu: Option<std::sync::Mutex<crate::gpu::DeviceContext>>,
}

static BACKEND_NAME: OnceLock<&'static str> = OnceLock::new();

impl VextraBackend {
    /// A backend that always dequantizes `Copy` nodes on the CPU.
    pub fn new() -> Self {
        BACKEND_NAME.get_or_init(|| NAME);
        Self { gpu: None }
    }

    /// A backend that dequantizes `Copy` nodes on the given GPU device
    /// context instead of the CPU kernel.
    pub fn with_gpu(device: crate::gpu::DeviceContext) -> Self {
        BACKEND_NAME.get_or_init(|| NAME);
        Self {
            gpu: Some(std::sync::Mutex::new(device)),
        }
    }

    pub fn name(&self) -> &'static str {
        NAME
    }

    /// No asynchronous work is ever left outstanding by this backend
    /// (every dispatch in `graph_compute` already runs to completion), so
    /// synchronization is a no-op, matching the reference adapter.
    pub fn synchronize(&self) {}

    /// Walk `graph`'s nodes and handle the two node shapes this adapter
    /// understands:
    ///
    /// - `MatMul`: ask the routing oracle which provider it would pick,
    ///   for telemetry only, and continue — the host still executes the
    ///   matmul itself.
    /// - `Copy` from a `Q2_K` tensor into an `F32` tensor: dequantize in
    ///   place using the selected CPU kernel and consume the node (the
    ///   host does not need to also run a generic copy for it).
    ///
    /// Every other node is left untouched; this backend never executes an
    /// op the host didn't explicitly hand it via one of these two shapes.
    ///
    /// Per-node failures (a malformed `Copy` node, a GPU dequantize
    /// failure) are logged at `warn!` and otherwise swallowed: this method
    /// always returns `Ok(())`, matching the reference adapter's
    /// unconditional `GGML_STATUS_SUCCESS` — appropriate for a best-effort
    /// interception layer (see DESIGN.md for the rationale).
    ///
    /// # Safety
    ///
    /// See [`CGraph::nodes`]: the graph and every node it points to must
    /// be valid for the duration of this call, and any `Q2_K`/`F32` node
    /// pair's `data` pointers must be valid for `n_elements`-worth of
    /// their respective element types.
    pub unsafe fn graph_compute(&self, graph: &CGraph) -> VextraResult<()> {
        for &node_ptr in unsafe { graph.nodes() } {
            if node_ptr.is_null() {
                continue;
            }
            let node = unsafe { &*node_ptr };

            match node.op {
                COpCode::MatMul => self.route_matmul(node),
                COpCode::Copy => {
                    if let Err(err) = self.maybe_dequantize_copy(node) {
                        tracing::warn!(%err, "Copy(Q2_K->F32) dequantization failed, node left unhandled");
                    }
                }
                COpCode::Other => {}
            }
        }
        Ok(())
    }

    fn route_matmul(&self, node: &CTensor) {
        let Some(src) = (unsafe { node.src[0].as_ref() }) else {
            return;
        };
        let data_size = src.n_elements * src.elem_type.size_bytes() as u64;
        match routing::route(data_size) {
            Ok(provider) => tracing::debug!(%provider, data_size, "routing decision (informational)"),
            Err(err) => tracing::warn!(%err, "routing oracle call failed"),
        }
    }

    fn maybe_dequantize_copy(&self, node: &CTensor) -> VextraResult<()> {
        let Some(src) = (unsafe { node.src[0].as_ref() }) else {
            return Ok(());
        };

        if src.elem_type != CElemType::Q2K || node.elem_type != CElemType::F32 {
            return Ok(());
        }

        let k = src.n_elements as usize;
        let nb = crate::block::block_count(k)?;
        let src_bytes = unsafe {
            std::slice::from_raw_parts(src.data as *const u8, nb * crate::block::BLOCK_BYTES)
        };
        let dst_floats =
            unsafe { std::slice::from_raw_parts_mut(node.data as *mut f32, k) };

        match &self.gpu {
            Some(device) => {
                let mut device = device
                    .lock()
                    .map_err(|e| VextraError::DeviceAllocationFailed(e.to_string()))?;
                device.dequantize(src_bytes, dst_floats, k)
            }
            None => kernels::dequantize(src_bytes, dst_floats, k),
        }
    }
}
