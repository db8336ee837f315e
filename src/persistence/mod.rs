pub mod jsonl_store;
pub mod memory_store;

pub use jsonl_store::JsonLinesStore;
pub use memory_store::MemoryStore;
