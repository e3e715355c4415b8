//! GPU-backed dequantization, offered alongside the CPU kernels for hosts
//! that prefer to keep dequantized weights resident on-device.

pub mod context;

pub use context::DeviceContext;
