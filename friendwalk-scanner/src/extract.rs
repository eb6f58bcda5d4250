// Pattern-based extraction over fetched pages

use crate::page::Page;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static STYLED_DIV_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body div[style]").unwrap());
static BACKGROUND_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"background-image\s*:\s*url\(\s*['"]?([^'")\s]+)['"]?\s*\)"#).unwrap()
});

/// Resolve `href` against `base`, skipping non-navigational schemes and
/// dropping the fragment.
pub fn resolve_url(base: &str, href: &str) -> Option<String> {
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let base_url = Url::parse(base).ok()?;
    let mut resolved = base_url.join(href).ok()?;
    resolved.set_fragment(None);

    Some(resolved.to_string())
}

/// Capture group 1 of `pattern` for every link href on the page, in page
/// order. Duplicates are kept; callers decide how to dedup.
pub fn extract_link_ids(page: &Page, pattern: &Regex) -> Vec<String> {
    let document = Html::parse_document(&page.text());
    document
        .select(&LINK_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| pattern.captures(href))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// First link whose visible text contains `text`, resolved to an absolute URL.
pub fn find_link_by_text(page: &Page, text: &str) -> Option<String> {
    let document = Html::parse_document(&page.text());
    document
        .select(&LINK_SELECTOR)
        .find(|a| a.text().collect::<String>().contains(text))
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| resolve_url(&page.url, href.trim()))
}

/// Unique URLs declared as `background-image:url(...)` on the page's divs.
pub fn extract_background_images(page: &Page) -> Vec<String> {
    let document = Html::parse_document(&page.text());
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for div in document.select(&STYLED_DIV_SELECTOR) {
        let Some(style) = div.value().attr("style") else {
            continue;
        };
        for caps in BACKGROUND_IMAGE.captures_iter(style) {
            let raw = &caps[1];
            let Some(url) = resolve_url(&page.url, raw) else {
                debug!("Ignoring unresolvable image reference {}", raw);
                continue;
            };
            if seen.insert(url.clone()) {
                urls.push(url);
            }
        }
    }

    urls
}

/// Local file name for a media URL: its final path segment.
pub fn media_file_name(url: &str) -> Option<String> {
    let segment = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string),
        Err(_) => url.rsplit('/').next().map(str::to_string),
    }?;

    match segment.as_str() {
        "" | "." | ".." => None,
        _ => Some(segment),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url_relative() {
        assert_eq!(
            resolve_url("http://example.com/a/list.pl?id=1", "show.pl?id=2#top").as_deref(),
            Some("http://example.com/a/show.pl?id=2")
        );
    }

    #[test]
    fn test_resolve_url_skips_non_navigational() {
        assert_eq!(resolve_url("http://example.com/", "javascript:void(0)"), None);
        assert_eq!(resolve_url("http://example.com/", "mailto:a@b.c"), None);
        assert_eq!(resolve_url("http://example.com/", "#frag"), None);
        assert_eq!(resolve_url("http://example.com/", ""), None);
    }

    #[test]
    fn test_extract_link_ids_in_page_order() {
        let html = r#"<html><body>
            <a href="show_friend.pl?id=30">c</a>
            <a href="show_friend.pl?id=10">a</a>
            <a href="/other.pl?id=99">x</a>
            <a href="show_friend.pl?id=30">c again</a>
            <a href="http://example.com/show_friend.pl?id=77">absolute</a>
        </body></html>"#;
        let page = Page::html("http://example.com/list_friend.pl?id=1", html);
        let pattern = Regex::new(r"^show_friend.pl\?id=(\d+)").unwrap();

        assert_eq!(extract_link_ids(&page, &pattern), vec!["30", "10", "30"]);
    }

    #[test]
    fn test_find_link_by_text() {
        let html = r#"<a href="list_friend.pl?id=1&page=2">次を表示</a><a href="/logout.pl">ログアウト</a>"#;
        let page = Page::html("http://example.com/list_friend.pl?id=1", html);

        assert_eq!(
            find_link_by_text(&page, "次を表示").as_deref(),
            Some("http://example.com/list_friend.pl?id=1&page=2")
        );
        assert_eq!(
            find_link_by_text(&page, "ログアウト").as_deref(),
            Some("http://example.com/logout.pl")
        );
        assert_eq!(find_link_by_text(&page, "missing"), None);
    }

    #[test]
    fn test_extract_background_images() {
        let html = r#"<html><body>
            <div style="background-image:url(http://img.example.com/p/1.jpg)"></div>
            <div style="width: 10px; background-image: url('http://img.example.com/p/2.jpg');"></div>
            <div style="background-image:url(http://img.example.com/p/1.jpg)"></div>
            <div style="color: red"></div>
            <div><span style="background-image:url(http://img.example.com/p/3.jpg)"></span></div>
        </body></html>"#;
        let page = Page::html("http://example.com/show_photo.pl?id=1", html);

        assert_eq!(
            extract_background_images(&page),
            vec![
                "http://img.example.com/p/1.jpg".to_string(),
                "http://img.example.com/p/2.jpg".to_string(),
            ]
        );
    }

    #[test]
    fn test_media_file_name() {
        assert_eq!(
            media_file_name("http://img.example.com/p/abc_123.jpg").as_deref(),
            Some("abc_123.jpg")
        );
        assert_eq!(
            media_file_name("http://img.example.com/p/abc.jpg?v=2").as_deref(),
            Some("abc.jpg")
        );
        assert_eq!(media_file_name("http://img.example.com/p/"), None);
        assert_eq!(media_file_name("http://img.example.com/p/.."), None);
    }
}
