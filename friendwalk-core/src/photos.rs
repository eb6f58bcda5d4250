// Media discovery on node pages and skip-if-exists local storage

use crate::error::{CrawlError, Result};
use friendwalk_scanner::extract::{extract_background_images, media_file_name};
use friendwalk_scanner::{Page, PageFetcher};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Persists a fetched response of a given content type.
pub trait ContentHandler: Send + Sync {
    /// Writes `media` to `path` unless the path already exists. Returns
    /// whether anything was written; never overwrites.
    fn save(&self, media: &Page, path: &Path) -> io::Result<bool>;
}

/// Writes the response body verbatim.
pub struct RawFileSaver;

impl ContentHandler for RawFileSaver {
    fn save(&self, media: &Page, path: &Path) -> io::Result<bool> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                file.write_all(&media.body)?;
                file.sync_all()?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Handlers keyed by media type. A `major/*` key covers a whole family.
#[derive(Clone)]
pub struct ContentHandlers {
    handlers: HashMap<String, Arc<dyn ContentHandler>>,
}

impl ContentHandlers {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, content_type: &str, handler: Arc<dyn ContentHandler>) {
        self.handlers
            .insert(content_type.to_ascii_lowercase(), handler);
    }

    pub fn for_content_type(&self, mime: &str) -> Option<&Arc<dyn ContentHandler>> {
        self.handlers.get(mime).or_else(|| {
            let major = mime.split('/').next()?;
            self.handlers.get(&format!("{}/*", major))
        })
    }
}

impl Default for ContentHandlers {
    fn default() -> Self {
        let mut handlers = Self::empty();
        let raw: Arc<dyn ContentHandler> = Arc::new(RawFileSaver);
        handlers.register("image/*", raw.clone());
        handlers.register("application/octet-stream", raw);
        handlers
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Written,
    AlreadyPresent,
    Unhandled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoReport {
    pub found: usize,
    pub saved: usize,
    pub present: usize,
    pub failed: usize,
}

/// Errors that mean nothing more can be written to the media directory,
/// as opposed to a single asset the filesystem rejects.
fn store_unwritable(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::PermissionDenied
            | ErrorKind::ReadOnlyFilesystem
            | ErrorKind::StorageFull
            | ErrorKind::NotFound
    )
}

pub struct PhotoExtractor {
    media_dir: PathBuf,
    handlers: ContentHandlers,
}

impl PhotoExtractor {
    /// Creates the media directory if needed; failure is a storage error.
    pub fn new(media_dir: impl Into<PathBuf>) -> Result<Self> {
        let media_dir = media_dir.into();
        fs::create_dir_all(&media_dir).map_err(|source| CrawlError::MediaStorage {
            path: media_dir.clone(),
            source,
        })?;
        Ok(Self {
            media_dir,
            handlers: ContentHandlers::default(),
        })
    }

    pub fn with_handlers(mut self, handlers: ContentHandlers) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    pub fn local_path(&self, url: &str) -> Option<PathBuf> {
        media_file_name(url).map(|name| self.media_dir.join(name))
    }

    /// Fetch and store every media URL on a node page. A failed asset is
    /// logged and skipped; only an unwritable media directory aborts.
    pub async fn harvest<F: PageFetcher>(&self, fetcher: &F, page: &Page) -> Result<PhotoReport> {
        let urls = extract_background_images(page);
        let mut report = PhotoReport {
            found: urls.len(),
            ..Default::default()
        };

        for url in urls {
            let Some(path) = self.local_path(&url) else {
                warn!("No usable file name in media URL {}", url);
                report.failed += 1;
                continue;
            };
            if path.exists() {
                debug!("Already have {}", path.display());
                report.present += 1;
                continue;
            }

            let media = match fetcher.fetch(&url, Some(&page.url)).await {
                Ok(media) => media,
                Err(e) => {
                    warn!("Failed to fetch media {}: {}", url, e);
                    report.failed += 1;
                    continue;
                }
            };

            match self.store(&media, &path) {
                Ok(SaveOutcome::Written) => {
                    info!("Saved {}", path.display());
                    report.saved += 1;
                }
                Ok(SaveOutcome::AlreadyPresent) => report.present += 1,
                Ok(SaveOutcome::Unhandled) => report.failed += 1,
                Err(CrawlError::MediaStorage { path, source }) if !store_unwritable(&source) => {
                    warn!("Failed to save {}: {}", path.display(), source);
                    report.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(report)
    }

    /// Hand a fetched asset to the handler registered for its content type.
    pub fn store(&self, media: &Page, path: &Path) -> Result<SaveOutcome> {
        let handler = media
            .mime_type()
            .and_then(|mime| self.handlers.for_content_type(&mime).cloned());
        let Some(handler) = handler else {
            warn!(
                "No content handler for {} ({})",
                media.content_type.as_deref().unwrap_or("unknown type"),
                media.url
            );
            return Ok(SaveOutcome::Unhandled);
        };

        match handler.save(media, path) {
            Ok(true) => Ok(SaveOutcome::Written),
            Ok(false) => Ok(SaveOutcome::AlreadyPresent),
            Err(source) => Err(CrawlError::MediaStorage {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}
