pub mod cache;
pub mod google_auth;
pub mod metrics;
pub mod providers;
pub mod wikipedia;

pub use cache::{FileSummaryCache, InMemorySummaryCache, NoopSummaryCache, SummaryCache};
pub use google_auth::{ServiceAccountKey, TokenSource};
pub use metrics::{get_metrics, init_metrics};
pub use wikipedia::{PageSummary, WikipediaClient, WikipediaConfig};
