// Approve pending friend requests, replying to each with a short greeting

use crate::error::{CrawlError, Result};
use friendwalk_scanner::{Authenticator, Form, FormSubmitter, PageFetcher};
use tracing::{error, info, warn};

/// Index of the approve-button form on the request list page.
const APPROVE_FORM_INDEX: usize = 1;
const REPLY_FORM_NAME: &str = "replyForm";
const REPLY_FIELD: &str = "body";

const REPLY_TO_PLEASE: &str = "\nこちらこそょろしくおねがぃします[m:66]";
const REPLY_TO_REGARDS: &str = "\nこちらこそょろしくね[m:66]";
const REPLY_DEFAULT: &str = "\nょろしくね[m:66]";

/// The requester's message with our greeting appended.
pub fn compose_reply(existing: &str) -> String {
    let suffix = if existing.contains("おねがいし") || existing.contains("お願いし") {
        REPLY_TO_PLEASE
    } else if existing.contains("よろしく") || existing.contains("宜しく") {
        REPLY_TO_REGARDS
    } else {
        REPLY_DEFAULT
    };
    format!("{}{}", existing, suffix)
}

/// Approve the first pending request. Returns the reply sent, or `None`
/// when there is nothing (left) to approve or the page is not as expected.
pub async fn approve_next<S>(session: &S, request_list_url: &str) -> Option<String>
where
    S: PageFetcher + FormSubmitter,
{
    let page = match session.fetch(request_list_url, None).await {
        Ok(page) => page,
        Err(e) => {
            warn!("Request list unavailable ({}): {}", request_list_url, e);
            return None;
        }
    };

    let Some(approve) = Form::parse_all(&page).into_iter().nth(APPROVE_FORM_INDEX) else {
        warn!("No approve button on {}", page.url);
        return None;
    };
    let page = match session.submit(&approve, Some(0)).await {
        Ok(page) => page,
        Err(e) => {
            warn!("Approving request failed: {}", e);
            return None;
        }
    };

    let Some(mut reply) = Form::find_named(&page, REPLY_FORM_NAME) else {
        warn!("No reply form on {}", page.url);
        return None;
    };
    let Some(existing) = reply.field(REPLY_FIELD).map(str::to_string) else {
        warn!("Reply form has no '{}' field", REPLY_FIELD);
        return None;
    };

    let message = compose_reply(&existing);
    reply.set_field(REPLY_FIELD, &message);
    if let Err(e) = session.submit(&reply, Some(0)).await {
        warn!("Sending reply failed: {}", e);
        return None;
    }

    info!("Approved request, replied:\n{}", message);
    Some(message)
}

/// Log in and approve requests until none remain (or `limit` is reached).
pub async fn approve_all<S>(session: &S, request_list_url: &str, limit: Option<usize>) -> Result<usize>
where
    S: PageFetcher + FormSubmitter + Authenticator,
{
    session.login().await.map_err(|e| {
        error!("Login failed: {}", e);
        CrawlError::Authentication(e)
    })?;

    let mut approved = 0;
    while limit.is_none_or(|max| approved < max) {
        if approve_next(session, request_list_url).await.is_none() {
            break;
        }
        approved += 1;
    }

    info!("Approved {} request(s)", approved);
    Ok(approved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_to_please() {
        assert_eq!(
            compose_reply("マイミクおねがいします"),
            "マイミクおねがいします\nこちらこそょろしくおねがぃします[m:66]"
        );
        assert!(compose_reply("お願いします！").ends_with(REPLY_TO_PLEASE));
    }

    #[test]
    fn test_reply_to_regards() {
        assert!(compose_reply("よろしくです").ends_with(REPLY_TO_REGARDS));
        assert!(compose_reply("宜しく").ends_with(REPLY_TO_REGARDS));
    }

    #[test]
    fn test_please_wins_over_regards() {
        assert!(compose_reply("よろしくおねがいします").ends_with(REPLY_TO_PLEASE));
    }

    #[test]
    fn test_default_reply() {
        assert_eq!(compose_reply(""), "\nょろしくね[m:66]");
    }
}
