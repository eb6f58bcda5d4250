// Plain-text summaries for the terminal

use crate::crawl::CrawlSummary;

const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";

/// Generate a crawl report from a run summary and the remaining state
pub fn generate_crawl_report(summary: &CrawlSummary, visited: u64, queued: u64) -> String {
    let mut report = String::new();
    report.push_str(DIVIDER);
    report.push('\n');
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Nodes processed: {}\n", summary.processed));
    report.push_str(&format!("  Already visited (skipped): {}\n", summary.skipped));
    report.push_str(&format!("  Neighbors enqueued: {}\n", summary.neighbors_enqueued));
    report.push_str(&format!("  Photos saved: {}\n", summary.photos_saved));
    report.push_str(&format!("  Photos already on disk: {}\n", summary.photos_present));
    if summary.media_failures > 0 {
        report.push_str(&format!("  Photos failed: {}\n", summary.media_failures));
    }
    if summary.fetch_failures > 0 {
        report.push_str(&format!("  Page fetch failures: {}\n", summary.fetch_failures));
    }
    if summary.bans > 0 {
        report.push_str(&format!("  Ban cooldowns: {}\n", summary.bans));
    }
    report.push('\n');
    report.push_str(DIVIDER);
    report.push('\n');
    report.push_str(&generate_stats_report(visited, queued));
    if !summary.exhausted {
        report.push_str("\n  Queue not exhausted; run crawl again to resume.\n");
    }
    report
}

/// Record counts of the crawl database
pub fn generate_stats_report(visited: u64, queued: u64) -> String {
    format!("  Visited records: {}\n  Queued entries: {}\n", visited, queued)
}
