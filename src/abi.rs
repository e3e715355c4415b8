//! The C ABI surface a host graph runtime links against.
//!
//! Exactly three symbols make up the registration contract
//! (`vextra_buffer_type`, `vextra_init`, `vextra_is`), matching the
//! reference adapter's `ggml_backend_vextra_buffer_type` /
//! `ggml_backend_vextra_init` / `ggml_backend_is_vextra`. The one owning
//! handle this surface hands across the boundary (the backend instance
//! from `vextra_init`) gets a matching release function,
//! `vextra_backend_free`, the same pairing convention the Metal FFI
//! wrapper this crate's ambient stack is modeled on follows for each of
//! its `create_*`/`release_*` pairs. Routing-decision strings never cross
//! this boundary — [`crate::routing::route`] frees the oracle's string
//! itself after logging it — so there is no matching release function for
//! one here.

use std::os::raw::c_char;

use crate::backend::{self, VextraBackend};

/// Opaque handle to a registered backend instance, returned by
/// [`vextra_init`] and consumed by [`vextra_is`] / [`vextra_backend_free`].
#[repr(C)]
pub struct VextraBackendHandle {
    backend: VextraBackend,
}

/// Opaque handle describing the "Vextra" buffer type (host-memory
/// allocator, 32-byte aligned). The same handle is valid for the lifetime
/// of the process; callers do not need to free it.
#[repr(C)]
pub struct VextraBufferType {
    name: *const c_char,
    alignment: usize,
    is_host: bool,
}

static BUFFER_TYPE_NAME: &[u8] = b"Vextra\0";

/// Returns the process-wide "Vextra" buffer type descriptor.
///
/// The returned pointer is valid for the lifetime of the process; it is
/// never freed by the caller.
#[unsafe(no_mangle)]
pub extern "C" fn vextra_buffer_type() -> *const VextraBufferType {
    use std::sync::OnceLock;
    static BUFFER_TYPE: OnceLock<VextraBufferType> = OnceLock::new();
    BUFFER_TYPE.get_or_init(|| VextraBufferType {
        name: BUFFER_TYPE_NAME.as_ptr() as *const c_char,
        alignment: backend::BUFFER_ALIGNMENT,
        is_host: true,
    })
}

/// Construct a new Vextra backend instance, always dequantizing `Copy`
/// nodes on the CPU kernel selected at process startup.
///
/// Returns a non-null, owning handle that must be released exactly once
/// via [`vextra_backend_free`].
#[unsafe(no_mangle)]
pub extern "C" fn vextra_init() -> *mut VextraBackendHandle {
    Box::into_raw(Box::new(VextraBackendHandle {
        backend: VextraBackend::new(),
    }))
}

/// Returns whether `handle` is a Vextra backend. This adapter only ever
/// hands out Vextra backends, so this always returns `true` for a
/// non-null pointer produced by [`vextra_init`] and `false` for null.
///
/// # Safety
///
/// `handle` must either be null or a pointer previously returned by
/// [`vextra_init`] that has not yet been released.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vextra_is(handle: *const VextraBackendHandle) -> bool {
    !handle.is_null()
}

/// Release a backend handle returned by [`vextra_init`].
///
/// # Safety
///
/// `handle` must be a pointer previously returned by [`vextra_init`] that
/// has not already been released, and no GPU dispatch issued through it
/// may be in flight.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn vextra_backend_free(handle: *mut VextraBackendHandle) {
    if !handle.is_null() {
        drop(unsafe { Box::from_raw(handle) });
    }
}
