// Ban detection and the logout -> cooldown -> login recovery cycle

use crate::error::{CrawlError, Result};
use friendwalk_scanner::{Authenticator, Page};
use std::time::Duration;
use tracing::{error, info, warn};

/// Lives for one crawl run only; a restarted process always starts `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanState {
    Active,
    Banned,
    CoolingDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageClass {
    Normal,
    Blocked,
}

/// Decides whether a fetched page is real content or a blocking interstitial.
pub trait PageClassifier: Send + Sync {
    fn classify(&self, page: &Page) -> PageClass;
}

/// Blocked when the body's first line is exactly the bare marker. The
/// site's block page starts with a lone `<html>` line while real pages
/// open with a doctype or an attributed root element.
pub struct LeadingMarkupClassifier {
    marker: String,
}

impl LeadingMarkupClassifier {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }
}

impl Default for LeadingMarkupClassifier {
    fn default() -> Self {
        Self::new("<html>")
    }
}

impl PageClassifier for LeadingMarkupClassifier {
    fn classify(&self, page: &Page) -> PageClass {
        match page.text().lines().next() {
            Some(first) if first == self.marker => PageClass::Blocked,
            _ => PageClass::Normal,
        }
    }
}

pub struct BanRecovery {
    state: BanState,
    cooldown: Duration,
    classifier: Box<dyn PageClassifier>,
    bans: u64,
}

impl BanRecovery {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            state: BanState::Active,
            cooldown,
            classifier: Box::new(LeadingMarkupClassifier::default()),
            bans: 0,
        }
    }

    pub fn with_classifier(mut self, classifier: Box<dyn PageClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn state(&self) -> BanState {
        self.state
    }

    pub fn bans(&self) -> u64 {
        self.bans
    }

    /// Inspect a fetched listing page. A blocked page runs the whole
    /// recovery cycle before this returns, so the caller issues no fetch
    /// while cooling down. Returns whether a ban was handled.
    ///
    /// A failed re-login is fatal and surfaces as `CrawlError::Authentication`.
    pub async fn inspect<A: Authenticator>(&mut self, page: &Page, auth: &A) -> Result<bool> {
        if self.classifier.classify(page) == PageClass::Normal {
            return Ok(false);
        }

        self.state = BanState::Banned;
        self.bans += 1;
        warn!(
            "Crawler banned at {}. Waiting {} minutes before logging in again.",
            page.url,
            self.cooldown.as_secs() / 60
        );

        if let Err(e) = auth.logout().await {
            warn!("Logout during ban recovery failed: {}", e);
        }

        self.state = BanState::CoolingDown;
        tokio::time::sleep(self.cooldown).await;

        auth.login().await.map_err(|e| {
            error!("Re-authentication after ban failed: {}", e);
            CrawlError::Authentication(e)
        })?;

        self.state = BanState::Active;
        info!("Re-authenticated after ban, resuming crawl");
        Ok(true)
    }
}
