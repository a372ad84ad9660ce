mod stream;
pub mod subjects;

pub use stream::{JetStreamEventStream, PARTITION_KEY_HEADER};
pub use subjects::{sanitize_subject_token, SubjectBuilder};
