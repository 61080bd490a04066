pub mod defaults;
pub mod model;
pub mod paths;
pub mod service;
pub mod validation;

pub use model::{
    AdapterMethod, AppConfig, ChatConfig, FineTuneConfig, GitHubSourceConfig, ProviderKind,
    RetrievalConfig, RetrievalStrategy, ScrapingConfig, ServerConfig, UpstreamConfig,
};
pub use paths::AppPaths;
pub use service::{require_secret, resolve_secret, ConfigService};
