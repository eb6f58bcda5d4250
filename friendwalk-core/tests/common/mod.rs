// In-memory site used by the integration tests

#![allow(dead_code)]

use friendwalk_scanner::error::Result;
use friendwalk_scanner::{Authenticator, Form, FormSubmitter, Page, PageFetcher, ScanError};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::time::Instant;

pub const BANNED_BODY: &str = "<html>\n<body>Access temporarily restricted</body>\n</html>";

#[derive(Clone)]
pub enum Reply {
    Page(Page),
    Status(u16),
    Timeout,
    /// The site no longer accepts the session.
    SignedOut,
}

#[derive(Default)]
pub struct FakeSite {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    events: Mutex<Vec<(String, Instant)>>,
    submissions: Mutex<Vec<(String, Vec<(String, String)>)>>,
    logins: Mutex<usize>,
    /// Logins beyond this count are rejected.
    pub allowed_logins: Option<usize>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// A site that rejects every login after the first `max`.
    pub fn with_allowed_logins(max: usize) -> Self {
        Self {
            allowed_logins: Some(max),
            ..Self::default()
        }
    }

    /// Queue a reply for `key` (a URL, or `POST <action>` for submissions).
    /// The last reply queued for a key is repeated once the others are used.
    pub fn reply(&self, key: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn html(&self, url: &str, body: &str) {
        self.reply(url, Reply::Page(Page::html(url, body)));
    }

    /// Page returned when a form is submitted to `action`.
    pub fn post(&self, action: &str, body: &str) {
        self.reply(
            &format!("POST {}", action),
            Reply::Page(Page::html(action, body)),
        );
    }

    pub fn image(&self, url: &str, bytes: &[u8]) {
        self.reply(
            url,
            Reply::Page(Page::new(url, bytes).with_content_type("image/jpeg")),
        );
    }

    pub fn events(&self) -> Vec<(String, Instant)> {
        self.events.lock().unwrap().clone()
    }

    pub fn event_names(&self) -> Vec<String> {
        self.events().into_iter().map(|(name, _)| name).collect()
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        let wanted = format!("GET {}", url);
        self.event_names().iter().filter(|e| **e == wanted).count()
    }

    pub fn submissions(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.submissions.lock().unwrap().clone()
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push((event, Instant::now()));
    }

    fn next_reply(&self, key: &str) -> Option<Reply> {
        let mut replies = self.replies.lock().unwrap();
        let queue = replies.get_mut(key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    fn resolve(&self, key: &str, url: &str) -> Result<Page> {
        match self.next_reply(key) {
            Some(Reply::Page(page)) => Ok(page),
            Some(Reply::Status(status)) => Err(ScanError::BadResponse {
                status,
                url: url.to_string(),
            }),
            Some(Reply::Timeout) => Err(ScanError::Timeout {
                url: url.to_string(),
            }),
            Some(Reply::SignedOut) => Err(ScanError::Authentication(format!(
                "session rejected at {}",
                url
            ))),
            None => Err(ScanError::BadResponse {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

impl PageFetcher for FakeSite {
    async fn fetch(&self, url: &str, _referrer: Option<&str>) -> Result<Page> {
        self.record(format!("GET {}", url));
        self.resolve(url, url)
    }
}

impl FormSubmitter for FakeSite {
    async fn submit(&self, form: &Form, button: Option<usize>) -> Result<Page> {
        self.record(format!("POST {}", form.action));
        self.submissions
            .lock()
            .unwrap()
            .push((form.action.clone(), form.submission(button)));
        self.resolve(&format!("POST {}", form.action), &form.action)
    }
}

impl Authenticator for FakeSite {
    async fn login(&self) -> Result<()> {
        self.record("login".to_string());
        let mut logins = self.logins.lock().unwrap();
        *logins += 1;
        match self.allowed_logins {
            Some(max) if *logins > max => {
                Err(ScanError::Authentication("credentials rejected".to_string()))
            }
            _ => Ok(()),
        }
    }

    async fn logout(&self) -> Result<()> {
        self.record("logout".to_string());
        Ok(())
    }
}

/// Listing markup with friend links and an optional next-page link.
pub fn listing(friends: &[&str], next: Option<&str>) -> String {
    let mut html = String::from("<!DOCTYPE html>\n<html><body><ul>");
    for id in friends {
        html.push_str(&format!(r#"<li><a href="show_friend.pl?id={}">friend</a></li>"#, id));
    }
    html.push_str("</ul>");
    if let Some(next) = next {
        html.push_str(&format!(r#"<a href="{}">次を表示</a>"#, next));
    }
    html.push_str("</body></html>");
    html
}

/// Photo page markup with one background-image div per URL.
pub fn photo_page(images: &[&str]) -> String {
    let mut html = String::from("<!DOCTYPE html>\n<html><body>");
    for url in images {
        html.push_str(&format!(r#"<div style="background-image:url({})"></div>"#, url));
    }
    html.push_str("</body></html>");
    html
}
