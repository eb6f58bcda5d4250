use serde::Serialize;
use std::borrow::Cow;
use std::time::Duration;

/// A fetched document: HTML page or binary media.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub response_time: Duration,
    #[serde(skip)]
    pub body: Vec<u8>,
}

impl Page {
    pub fn new(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            status_code: 200,
            content_type: None,
            response_time: Duration::from_secs(0),
            body: body.into(),
        }
    }

    pub fn html(url: impl Into<String>, body: &str) -> Self {
        Self::new(url, body.as_bytes()).with_content_type("text/html")
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Media type without parameters, lowercased (`image/jpeg; q=1` -> `image/jpeg`).
    pub fn mime_type(&self) -> Option<String> {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .filter(|ct| !ct.is_empty())
    }
}
