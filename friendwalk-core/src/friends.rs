// Neighbor discovery across paginated friend listings

use crate::ban::BanRecovery;
use crate::error::{CrawlError, Result};
use crate::model::NodeId;
use friendwalk_scanner::extract::{extract_link_ids, find_link_by_text};
use friendwalk_scanner::{Authenticator, Page, PageFetcher};
use regex::Regex;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

pub struct FriendListExtractor {
    pattern: Regex,
    next_page_text: String,
    delay: Duration,
}

impl FriendListExtractor {
    pub fn new(friend_href_pattern: &str, next_page_text: &str, delay: Duration) -> Result<Self> {
        let pattern = Regex::new(friend_href_pattern).map_err(|e| {
            CrawlError::Config(format!("invalid friend link pattern '{}': {}", friend_href_pattern, e))
        })?;
        Ok(Self {
            pattern,
            next_page_text: next_page_text.to_string(),
            delay,
        })
    }

    /// Collect neighbor ids starting from the first listing page, following
    /// next-page links with a fixed delay between fetches.
    ///
    /// Ids are deduplicated within this call only, first occurrence wins.
    /// Every page is checked for a ban; a ban (after recovery) or a failed
    /// next-page fetch ends pagination with the ids gathered so far.
    pub async fn collect<S>(
        &self,
        session: &S,
        bans: &mut BanRecovery,
        first: Page,
    ) -> Result<Vec<NodeId>>
    where
        S: PageFetcher + Authenticator,
    {
        let mut ids = Vec::new();
        let mut seen = HashSet::new();
        let mut fetched = HashSet::from([first.url.clone()]);
        let mut current = first;
        let mut pages = 1usize;

        loop {
            if bans.inspect(&current, session).await? {
                break;
            }

            for raw in extract_link_ids(&current, &self.pattern) {
                if seen.insert(raw.clone()) {
                    ids.push(NodeId::from(raw));
                }
            }

            let Some(next) = find_link_by_text(&current, &self.next_page_text) else {
                break;
            };
            if !fetched.insert(next.clone()) {
                warn!("Listing pagination revisits {}, stopping", next);
                break;
            }

            tokio::time::sleep(self.delay).await;
            match session.fetch(&next, Some(&current.url)).await {
                Ok(page) => {
                    current = page;
                    pages += 1;
                }
                Err(e) => {
                    warn!("Failed to fetch listing page {}: {}", next, e);
                    break;
                }
            }
        }

        debug!("Collected {} neighbors over {} listing page(s)", ids.len(), pages);
        Ok(ids)
    }
}
