//! End-to-end scenarios: fixed-input dequantization cases and one adapter
//! dispatch check, against concrete expected values.

use std::ffi::{CString, c_char, c_void};
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};

use vextra::block::BLOCK_BYTES;
use vextra::kernels;
use vextra::sys::{CElemType, CGraph, COpCode, CTensor};
use vextra::{VextraBackend, dequantize};

static ROUTE_TASK_CALLS: AtomicU64 = AtomicU64::new(0);

/// Stand-in for the host's routing oracle, linked into this test binary so
/// the adapter's `MatMul` branch has a symbol to call. Counts invocations
/// for the S5/property-6 assertion and always reports "cpu-avx2".
#[unsafe(no_mangle)]
pub extern "C" fn route_task(_data_size_bytes: u64) -> *mut c_char {
    ROUTE_TASK_CALLS.fetch_add(1, Ordering::SeqCst);
    CString::new("cpu-avx2").unwrap().into_raw()
}

fn single_block(d: f32, dmin: f32, qs_byte: u8) -> Vec<u8> {
    let mut bytes = vec![0u8; BLOCK_BYTES];
    bytes[0..4].copy_from_slice(&d.to_le_bytes());
    bytes[4..8].copy_from_slice(&dmin.to_le_bytes());
    bytes[8..72].fill(qs_byte);
    bytes
}

/// S1: uniform index pattern, d=2.0, dmin=0.5, qs=0xE4 everywhere.
#[test]
fn s1_uniform_index_pattern() {
    let src = single_block(2.0, 0.5, 0xE4);
    let mut dst = vec![0f32; 256];
    dequantize(&src, &mut dst, 256).unwrap();

    for i in 0..64 {
        assert_eq!(dst[i], 0.5, "quarter 0 element {i}");
    }
    for i in 64..128 {
        assert_eq!(dst[i], 2.5, "quarter 1 element {i}");
    }
    for i in 128..192 {
        assert_eq!(dst[i], 4.5, "quarter 2 element {i}");
    }
    for i in 192..256 {
        assert_eq!(dst[i], 6.5, "quarter 3 element {i}");
    }
}

/// S2: zero scale collapses every output to `dmin`, regardless of `qs`.
#[test]
fn s2_zero_scale() {
    let src = single_block(0.0, 3.25, 0x7A);
    let mut dst = vec![0f32; 256];
    dequantize(&src, &mut dst, 256).unwrap();
    assert!(dst.iter().all(|&y| y == 3.25));
}

/// S3: negative scale reverses the ordering of the four quarters.
#[test]
fn s3_negative_scale() {
    let src = single_block(-1.0, 3.0, 0xE4);
    let mut dst = vec![0f32; 256];
    dequantize(&src, &mut dst, 256).unwrap();

    assert!(dst[0..64].iter().all(|&y| y == 3.0));
    assert!(dst[64..128].iter().all(|&y| y == 2.0));
    assert!(dst[128..192].iter().all(|&y| y == 1.0));
    assert!(dst[192..256].iter().all(|&y| y == 0.0));
}

/// S4: four-block tensor, each block scaled differently, index pattern
/// constant across blocks.
#[test]
fn s4_four_block_tensor() {
    let mut src = Vec::new();
    for b in 0..4 {
        src.extend(single_block(1.0 + b as f32, 0.0, 0xE4));
    }
    let k = 1024;
    let mut dst = vec![0f32; k];
    dequantize(&src, &mut dst, k).unwrap();

    for b in 0..4u32 {
        let scale = 1.0 + b as f32;
        let base = b as usize * 256;
        assert!(dst[base..base + 64].iter().all(|&y| y == 0.0 * scale));
        assert!(dst[base + 64..base + 128].iter().all(|&y| y == 1.0 * scale));
        assert!(dst[base + 128..base + 192].iter().all(|&y| y == 2.0 * scale));
        assert!(dst[base + 192..base + 256].iter().all(|&y| y == 3.0 * scale));
    }
}

/// S5 / property 6: a `MatMul` followed by a `Copy(Q2_K -> F32)` calls the
/// routing oracle exactly once and produces the same output as the scalar
/// oracle for the copy.
#[test]
fn s5_adapter_dispatch_routes_matmul_and_dequantizes_copy() {
    let before = ROUTE_TASK_CALLS.load(Ordering::SeqCst);

    let mut weight_bytes = single_block(2.0, 0.5, 0xE4);
    let weight_tensor = CTensor {
        elem_type: CElemType::Q2K,
        op: COpCode::Other,
        data: weight_bytes.as_mut_ptr() as *mut c_void,
        n_elements: 256,
        src: [ptr::null(), ptr::null()],
    };
    let mut matmul_tensor = CTensor {
        elem_type: CElemType::F32,
        op: COpCode::MatMul,
        data: ptr::null_mut(),
        n_elements: 256,
        src: [&weight_tensor as *const CTensor, ptr::null()],
    };

    let mut copy_src_bytes = single_block(2.0, 0.5, 0xE4);
    let copy_src_tensor = CTensor {
        elem_type: CElemType::Q2K,
        op: COpCode::Other,
        data: copy_src_bytes.as_mut_ptr() as *mut c_void,
        n_elements: 256,
        src: [ptr::null(), ptr::null()],
    };
    let mut copy_dst = vec![0f32; 256];
    let mut copy_dst_tensor = CTensor {
        elem_type: CElemType::F32,
        op: COpCode::Copy,
        data: copy_dst.as_mut_ptr() as *mut c_void,
        n_elements: 256,
        src: [&copy_src_tensor as *const CTensor, ptr::null()],
    };

    let mut node_ptrs: [*mut CTensor; 2] =
        [&mut matmul_tensor as *mut CTensor, &mut copy_dst_tensor as *mut CTensor];
    let graph = CGraph {
        n_nodes: 2,
        nodes: node_ptrs.as_mut_ptr(),
    };

    let backend = VextraBackend::new();
    unsafe { backend.graph_compute(&graph) }.unwrap();

    assert_eq!(ROUTE_TASK_CALLS.load(Ordering::SeqCst) - before, 1);

    let mut expected = vec![0f32; 256];
    kernels::dequantize(&copy_src_bytes, &mut expected, 256).unwrap();
    assert_eq!(copy_dst, expected);
}
