// src/utils/mod.rs
pub mod error;
pub mod logging;
pub mod timing;

pub use error::AppError; // Re-export main error type for convenience
pub use timing::TimingLog;
