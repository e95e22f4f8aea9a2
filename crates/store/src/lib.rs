pub mod csv_sink;
pub mod errors;
pub mod schema;

pub use csv_sink::{CsvSink, IssueSink, SinkReceipt};
pub use errors::SinkError;
pub use schema::{IssueRow, COLUMNS};
