//! Storage abstractions for service layer
//!
//! `EntityStore` is pure byte storage addressed by key; it never interprets
//! record contents. Backends: in-process `MemoryStore`, file-backed
//! `JsonFileStore`, and the `TimedStore` decorator that bounds every call.

pub mod entity_store;
pub mod memory_store;
pub mod json_file_store;
pub mod timed_store;

pub use entity_store::{key_matches, CasOutcome, EntityStore, ALL_KEYS};
pub use json_file_store::JsonFileStore;
pub use memory_store::MemoryStore;
pub use timed_store::TimedStore;
