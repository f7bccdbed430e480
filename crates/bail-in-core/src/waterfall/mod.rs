pub mod allocation;

#[cfg(feature = "scenarios")]
pub mod scenario;
