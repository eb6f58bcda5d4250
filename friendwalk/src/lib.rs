pub mod commands;
pub mod handlers;

pub use commands::command_argument_builder;

// Re-export the pieces of friendwalk-core the handlers drive
pub use friendwalk_core::approve::approve_all;
pub use friendwalk_core::crawl::{CrawlLoop, CrawlProgressCallback, CrawlSummary};
pub use friendwalk_core::report::{generate_crawl_report, generate_stats_report};

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
