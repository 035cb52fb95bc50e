//! Trade execution adapters

mod paper;

pub use paper::PaperExecutor;
