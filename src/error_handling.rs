// Error types shared across modules
pub mod types;

pub use types::*;
