//! Store adapters
//!
//! - `MemoryStore`: volatile, per-process
//! - `JsonFileStore`: one directory of JSON files per wallet

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
