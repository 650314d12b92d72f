pub mod api;
pub mod metrics;
pub mod token_store;

pub use api::ForumClient;
pub use metrics::{ApiMetrics, MetricsCollector};
pub use token_store::TokenStore;
