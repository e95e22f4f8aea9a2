pub mod error;
pub mod models;
pub mod payloads;
pub mod transform;

pub use error::NormalizationError;
pub use models::{IssueRecord, NormalizedBatch};
pub use payloads::RawIssue;
pub use transform::{normalize, normalize_batch, parse_timestamp, TimestampError};
