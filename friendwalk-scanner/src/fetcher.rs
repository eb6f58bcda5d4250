//! Contracts the crawl engine consumes. `HttpSession` is the production
//! implementation; tests substitute in-memory fakes.

use crate::error::Result;
use crate::forms::Form;
use crate::page::Page;

/// Fetches a URL with the caller's session state applied transparently.
#[allow(async_fn_in_trait)]
pub trait PageFetcher {
    async fn fetch(&self, url: &str, referrer: Option<&str>) -> Result<Page>;
}

#[allow(async_fn_in_trait)]
pub trait Authenticator {
    async fn login(&self) -> Result<()>;
    async fn logout(&self) -> Result<()>;
}

/// Submits a parsed HTML form, optionally naming the clicked button by index.
#[allow(async_fn_in_trait)]
pub trait FormSubmitter {
    async fn submit(&self, form: &Form, button: Option<usize>) -> Result<Page>;
}
