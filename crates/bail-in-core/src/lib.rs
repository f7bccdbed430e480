pub mod bank;
pub mod error;
pub mod hierarchy;
pub mod types;
pub mod waterfall;

#[cfg(feature = "presets")]
pub mod presets;

pub use error::BailInError;
pub use types::*;

/// Standard result type for all bail-in operations
pub type BailInResult<T> = Result<T, BailInError>;
