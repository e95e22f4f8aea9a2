pub mod error;
pub mod fetcher;
pub mod metrics;
pub mod paginator;
pub mod report;
pub mod service;

pub use error::{TransportCause, TransportError};
pub use fetcher::{GraphqlIssueFetcher, IssueFetcher, Page, SharedFetcher};
pub use paginator::Paginator;
pub use report::{CollectionResult, RunReport, RunSummary, TargetCollection, TargetOutcome};
pub use service::Collector;
