//! GPU Selector (spec §4.1) — maps required VRAM + optional tier to an
//! ordered list of provider GPU type ids.

pub mod registry;
pub mod selector;

pub use registry::GpuType;
pub use selector::select_candidates;
