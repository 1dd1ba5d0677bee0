//! Long-term memory: record types, pure ranking, and the authoritative store.

pub mod rank;
pub mod store;
pub mod types;

pub use store::{MemoryStats, MemoryStore, SearchHit};
pub use types::{MemoryRecord, MemoryType};
