//! In-memory implementations for testing
pub mod stream;

pub use stream::{InMemoryEventStream, StoredRecord};
