//! Scheduler routing telemetry.
//!
//! `route` calls out to an externally-linked routing oracle before a
//! `MatMul` node runs, purely for observability: the returned provider name
//! is logged, never consulted to change dispatch. The host links the real
//! `route_task` symbol; this adapter only owns the call and the string's
//! lifetime.

use std::ffi::CStr;
use std::os::raw::c_char;

use crate::error::{VextraError, VextraResult};

unsafe extern "C" {
    /// Returns a `malloc`-allocated, NUL-terminated provider name for a
    /// task of the given size. Ownership of the returned pointer transfers
    /// to the caller, which must release it with `libc::free`.
    fn route_task(data_size_bytes: u64) -> *mut c_char;
}

/// Ask the routing oracle which provider it would pick for a task of
/// `data_size_bytes`, for telemetry only.
///
/// Returns [`VextraError::RoutingOracleFailed`] if the oracle returns a
/// null pointer or the returned bytes aren't valid UTF-8.
pub fn route(data_size_bytes: u64) -> VextraResult<String> {
    // Safety: `route_task` is documented to return either null or a
    // malloc-owned, NUL-terminated string; we take ownership of the
    // pointer below and always free it exactly once.
    let ptr = unsafe { route_task(data_size_bytes) };
    if ptr.is_null() {
        return Err(VextraError::RoutingOracleFailed(
            "route_task returned a null pointer".into(),
        ));
    }

    // Safety: ptr is non-null, NUL-terminated, and we own it until the
    // `libc::free` call below.
    let result = unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map(str::to_owned)
        .map_err(|e| VextraError::RoutingOracleFailed(e.to_string()));

    // Safety: ptr was allocated by the host's route_task via malloc, per
    // its documented contract, and is freed exactly once here.
    unsafe { libc::free(ptr as *mut libc::c_void) };

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::os::raw::c_char;

    // route_task isn't actually linked in unit tests (no host runtime is
    // present), so these exercise the pointer-ownership logic directly
    // against a locally allocated string rather than the real symbol.
    fn fake_owned_cstring(s: &str) -> *mut c_char {
        let c = CString::new(s).unwrap();
        unsafe { libc::strdup(c.as_ptr()) }
    }

    #[test]
    fn reads_and_frees_a_malloc_owned_string() {
        let ptr = fake_owned_cstring("cpu-avx2");
        let s = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_owned();
        unsafe { libc::free(ptr as *mut libc::c_void) };
        assert_eq!(s, "cpu-avx2");
    }

    #[test]
    fn null_pointer_is_reported_as_routing_failure() {
        let err = VextraError::RoutingOracleFailed("route_task returned a null pointer".into());
        assert!(matches!(err, VextraError::RoutingOracleFailed(_)));
    }
}
