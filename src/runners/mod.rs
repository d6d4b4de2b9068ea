//! Runner implementations for different compute backends
pub mod cpu;
#[cfg(feature = "wgpu")]
pub mod wgpu;

// Re-export runners at module level for convenience
pub use self::cpu::CpuRunner;
#[cfg(feature = "wgpu")]
pub use self::wgpu::{AcceleratorContext, AcceleratorOptions, WgpuRunner};
