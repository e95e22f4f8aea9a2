pub mod bins;
pub mod classify;
pub mod error;
pub mod report;
pub mod stats;
pub mod table;

pub use bins::CommentBin;
pub use classify::{classify_title, IssueCategory};
pub use error::AnalysisError;
pub use report::{analyze_group, AnalysisReport, GroupReport};
pub use table::{load_table, parse_comment_count, AnalysisRow};
