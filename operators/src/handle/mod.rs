#[cfg(use_cpu)]
pub mod common_cpu;
