use crate::ban::{BanRecovery, BanState};
use crate::config::CrawlConfig;
use crate::data::Database;
use crate::error::{CrawlError, Result};
use crate::friends::FriendListExtractor;
use crate::model::{NodeId, node_url};
use crate::photos::PhotoExtractor;
use friendwalk_scanner::{Authenticator, PageFetcher, ScanError};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Options for configuring a crawl run
pub struct CrawlOptions {
    /// Pushed only when the queue is empty at startup.
    pub seed: NodeId,
    /// `{id}` URL template for a node's friend listing.
    pub listing_url: String,
    /// `{id}` URL template for a node's photo page.
    pub node_url: String,
    /// Stop after processing this many nodes; the queue keeps the rest.
    pub limit: Option<usize>,
}

impl CrawlOptions {
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self {
            seed: NodeId::from(config.seed.as_str()),
            listing_url: config.site.listing_url.clone(),
            node_url: config.site.node_url.clone(),
            limit: None,
        }
    }
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub processed: usize,
    pub skipped: usize,
    pub neighbors_enqueued: usize,
    pub photos_saved: usize,
    pub photos_present: usize,
    pub media_failures: usize,
    pub fetch_failures: usize,
    pub bans: u64,
    /// True when the run ended because the queue was empty.
    pub exhausted: bool,
}

fn fatal_fetch(e: ScanError) -> CrawlError {
    error!("Fetch failed fatally: {}", e);
    CrawlError::Authentication(e)
}

/// Sequential breadth-first traversal over the durable queue.
pub struct CrawlLoop<'a, S> {
    session: &'a S,
    db: &'a Database,
    friends: FriendListExtractor,
    photos: PhotoExtractor,
    bans: BanRecovery,
    options: CrawlOptions,
    progress: Option<CrawlProgressCallback>,
}

impl<'a, S> CrawlLoop<'a, S>
where
    S: PageFetcher + Authenticator,
{
    pub fn new(
        session: &'a S,
        db: &'a Database,
        friends: FriendListExtractor,
        photos: PhotoExtractor,
        bans: BanRecovery,
        options: CrawlOptions,
    ) -> Self {
        Self {
            session,
            db,
            friends,
            photos,
            bans,
            options,
            progress: None,
        }
    }

    pub fn from_config(session: &'a S, db: &'a Database, config: &CrawlConfig) -> Result<Self> {
        let friends = FriendListExtractor::new(
            &config.site.friend_href_pattern,
            &config.site.next_page_text,
            config.pagination_delay(),
        )?;
        let photos = PhotoExtractor::new(&config.media_dir)?;
        let bans = BanRecovery::new(config.ban_cooldown());
        Ok(Self::new(
            session,
            db,
            friends,
            photos,
            bans,
            CrawlOptions::from_config(config),
        ))
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.options.limit = limit;
        self
    }

    pub fn with_progress_callback(mut self, callback: CrawlProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn ban_state(&self) -> BanState {
        self.bans.state()
    }

    /// Push the seed id when nothing is pending. Returns whether it was pushed.
    pub fn seed(&self) -> Result<bool> {
        let queue = self.db.queue();
        if !queue.is_empty()? {
            return Ok(false);
        }
        queue.push(&self.options.seed)?;
        info!("Queue empty, seeded with {}", self.options.seed);
        Ok(true)
    }

    /// Log in, then process queue entries until the queue is empty (or the
    /// node limit is reached). Fetch failures never end the run; storage and
    /// authentication failures do.
    pub async fn run(&mut self) -> Result<CrawlSummary> {
        self.seed()?;

        self.session.login().await.map_err(|e| {
            error!("Login failed: {}", e);
            CrawlError::Authentication(e)
        })?;

        let mut summary = CrawlSummary::default();
        loop {
            if let Some(limit) = self.options.limit
                && summary.processed >= limit
            {
                info!("Processed {} node(s), stopping at limit", limit);
                break;
            }

            // Sole arbiter of who processes `id`: marked as it leaves the queue.
            let Some((id, claimed)) = self.db.claim_next()? else {
                summary.exhausted = true;
                break;
            };
            if !claimed {
                info!("Skip {}", id);
                summary.skipped += 1;
                continue;
            }

            self.process(&id, &mut summary).await?;
        }

        summary.bans = self.bans.bans();
        info!(
            "Crawl finished: {} processed, {} skipped, {} photos saved",
            summary.processed, summary.skipped, summary.photos_saved
        );
        Ok(summary)
    }

    async fn process(&mut self, id: &NodeId, summary: &mut CrawlSummary) -> Result<()> {
        if let Some(ref callback) = self.progress {
            callback(format!("Crawling {}", id));
        }

        let listing_url = node_url(&self.options.listing_url, id);
        let neighbors = match self.session.fetch(&listing_url, None).await {
            Ok(page) => self.friends.collect(self.session, &mut self.bans, page).await?,
            Err(e) if !e.is_recoverable() => return Err(fatal_fetch(e)),
            Err(e) => {
                warn!("Friend list for {} unavailable ({}): {}", id, listing_url, e);
                summary.fetch_failures += 1;
                Vec::new()
            }
        };
        summary.neighbors_enqueued += self.db.queue().push_all(&neighbors)?;

        let photo_url = node_url(&self.options.node_url, id);
        match self.session.fetch(&photo_url, None).await {
            Ok(page) => {
                let report = self.photos.harvest(self.session, &page).await?;
                summary.photos_saved += report.saved;
                summary.photos_present += report.present;
                summary.media_failures += report.failed;
            }
            Err(e) if !e.is_recoverable() => return Err(fatal_fetch(e)),
            Err(e) => {
                warn!("Photo page for {} unavailable ({}): {}", id, photo_url, e);
                summary.fetch_failures += 1;
            }
        }

        summary.processed += 1;
        Ok(())
    }
}
