//! Service layer module

pub mod recognition;
pub mod types;

pub use recognition::RecognitionService;
pub use types::*;
