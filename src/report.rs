//! PDF reports handed back to the user.

pub mod acuse;
pub mod fonts;
pub mod pdf;

pub use acuse::{build_acuse, ACUSE_FILE_NAME};
