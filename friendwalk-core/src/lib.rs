pub mod approve;
pub mod ban;
pub mod config;
pub mod crawl;
pub mod data;
pub mod error;
pub mod friends;
pub mod model;
pub mod photos;
pub mod report;

pub use ban::{BanRecovery, BanState, LeadingMarkupClassifier, PageClass, PageClassifier};
pub use config::CrawlConfig;
pub use crawl::{CrawlLoop, CrawlOptions, CrawlSummary};
pub use data::{Database, VisitedSet, WorkQueue};
pub use error::CrawlError;
pub use model::NodeId;
