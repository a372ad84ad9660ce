//! tickwire-middleware: Event stream abstraction
//!
//! Provides the `EventStream` trait records are appended through, with a
//! NATS JetStream implementation and an in-memory one for testing.

pub mod error;
pub mod factory;
pub mod memory;
pub mod nats;
pub mod stream;

pub use error::StreamError;
pub use factory::{FactoryError, MiddlewareFactory};
pub use memory::{InMemoryEventStream, StoredRecord};
pub use nats::{sanitize_subject_token, JetStreamEventStream, SubjectBuilder, PARTITION_KEY_HEADER};
pub use stream::{EventStream, PutRecordOutput};
