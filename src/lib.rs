//! Pluggable Q2_K dequantization kernels and a graph backend adapter that
//! wires them into an external host graph runtime.
//!
//! The crate is organized around the two things it offers a host:
//!
//! - Dequantization kernels ([`kernels`], [`block`], [`gpu`]): scalar,
//!   AVX2, AVX-512, and GPU implementations of Q2_K→F32 dequantization,
//!   all agreeing within 1 ULP per element.
//! - A graph backend adapter ([`backend`], [`sys`], [`abi`]) that a host
//!   graph runtime can register to intercept `Copy(Q2_K→F32)` nodes and
//!   route `MatMul` nodes through [`routing`] for telemetry.

pub mod abi;
pub mod backend;
pub mod block;
pub mod config;
pub mod error;
pub mod gpu;
pub mod kernels;
pub mod logging;
pub mod routing;
pub mod sys;

pub use backend::VextraBackend;
pub use error::{VextraError, VextraResult};
pub use kernels::{Kernel, dequantize};
