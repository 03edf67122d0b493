pub mod args;
pub mod censys;
pub mod config;
pub mod domain;
pub mod error;
pub mod github;
pub mod http;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod s3;
pub mod sink;
pub mod sources;
pub mod summary;
pub mod utils;
pub mod uswds;

pub use args::Args;
pub use config::{init_default_config, Config};
pub use domain::{base_domain, DomainRecord};
pub use error::{FetchError, PersistError, PipelineError};
pub use pipeline::{Pipeline, RunReport};
pub use reconcile::reconcile;
pub use sources::{Source, SourceList, SourceLists};
