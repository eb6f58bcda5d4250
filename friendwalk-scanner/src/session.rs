use crate::error::{Result, ScanError};
use crate::extract::find_link_by_text;
use crate::fetcher::{Authenticator, FormSubmitter, PageFetcher};
use crate::forms::{Form, FormMethod, has_password_field};
use crate::page::Page;
use rand::Rng;
use reqwest::header::{CONTENT_TYPE, REFERER};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Site root; serves the login form and the logout link.
    pub base_url: String,
    /// Where the site should land after a successful login.
    pub home_path: String,
    pub logout_text: String,
    pub user_agent: String,
    pub timeout: Duration,
    /// After each successful fetch, sleep `jitter_step * rand(0..jitter_steps)`.
    pub jitter_step: Duration,
    pub jitter_steps: u32,
    pub login_settle: Duration,
    pub credentials: Credentials,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            base_url: "http://mixi.jp/".to_string(),
            home_path: "/home.pl".to_string(),
            logout_text: "ログアウト".to_string(),
            user_agent: "Mozilla/4.0 (compatible; MSIE 7.0; Windows NT 6.0)".to_string(),
            timeout: Duration::from_secs(30),
            jitter_step: Duration::from_secs(3),
            jitter_steps: 10,
            login_settle: Duration::from_secs(5),
            credentials: Credentials::default(),
        }
    }
}

/// Authenticated browsing context: one cookie-carrying client shared by every
/// fetch, login and form submission of a run.
pub struct HttpSession {
    client: Client,
    options: SessionOptions,
}

impl HttpSession {
    pub fn new(options: SessionOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(options.user_agent.clone())
            .cookie_store(true)
            .timeout(options.timeout)
            .connect_timeout(options.timeout / 2)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self { client, options })
    }

    async fn get(&self, url: &str, referrer: Option<&str>) -> Result<Page> {
        debug!("Fetching {}", url);
        let mut request = self.client.get(url);
        if let Some(referrer) = referrer {
            request = request.header(REFERER, referrer);
        }
        self.execute(request, url).await
    }

    async fn execute(&self, request: RequestBuilder, url: &str) -> Result<Page> {
        let start = Instant::now();
        let response = request.send().await.map_err(|e| classify(e, url))?;
        let response_time = start.elapsed();

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::BadResponse {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response.bytes().await.map_err(|e| classify(e, url))?;

        Ok(Page {
            url: final_url,
            status_code: status.as_u16(),
            content_type,
            response_time,
            body: body.to_vec(),
        })
    }

    async fn send_form(&self, form: &Form, button: Option<usize>) -> Result<Page> {
        let pairs = form.submission(button);
        debug!("Submitting form to {} ({} fields)", form.action, pairs.len());

        let request = match form.method {
            FormMethod::Post => self.client.post(&form.action).form(&pairs),
            FormMethod::Get => self.client.get(&form.action).query(&pairs),
        }
        .header(REFERER, &form.origin);

        self.execute(request, &form.action).await
    }

    /// Politeness delay between consecutive requests.
    async fn pause(&self) {
        if self.options.jitter_steps == 0 || self.options.jitter_step.is_zero() {
            return;
        }
        let steps = rand::rng().random_range(0..self.options.jitter_steps);
        tokio::time::sleep(self.options.jitter_step * steps).await;
    }
}

fn classify(error: reqwest::Error, url: &str) -> ScanError {
    if error.is_timeout() {
        ScanError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_builder() {
        ScanError::InvalidUrl(format!("{}: {}", url, error))
    } else {
        ScanError::HttpError(error)
    }
}

impl PageFetcher for HttpSession {
    async fn fetch(&self, url: &str, referrer: Option<&str>) -> Result<Page> {
        let page = self.get(url, referrer).await?;
        self.pause().await;
        Ok(page)
    }
}

impl FormSubmitter for HttpSession {
    async fn submit(&self, form: &Form, button: Option<usize>) -> Result<Page> {
        let page = self.send_form(form, button).await?;
        self.pause().await;
        Ok(page)
    }
}

impl Authenticator for HttpSession {
    async fn login(&self) -> Result<()> {
        let credentials = &self.options.credentials;
        if !credentials.is_complete() {
            return Err(ScanError::Authentication(
                "username and password must both be configured".to_string(),
            ));
        }

        info!("Logging in to {} as {}", self.options.base_url, credentials.username);
        let page = self
            .get(&self.options.base_url, None)
            .await
            .map_err(|e| ScanError::Authentication(format!("could not load login page: {}", e)))?;

        let mut form = Form::parse_all(&page)
            .into_iter()
            .next()
            .ok_or_else(|| ScanError::Authentication(format!("no login form at {}", page.url)))?;
        form.set_field("email", &credentials.username);
        form.set_field("password", &credentials.password);
        form.set_field("next_url", &self.options.home_path);

        let landing = self
            .send_form(&form, Some(0))
            .await
            .map_err(|e| ScanError::Authentication(format!("login submission failed: {}", e)))?;

        if has_password_field(&landing) {
            return Err(ScanError::Authentication(
                "login form served again, credentials rejected".to_string(),
            ));
        }

        tokio::time::sleep(self.options.login_settle).await;
        info!("Logged in");
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        let page = self.get(&self.options.base_url, None).await?;
        let Some(link) = find_link_by_text(&page, &self.options.logout_text) else {
            debug!("No logout link on {}, session already closed", page.url);
            return Ok(());
        };
        self.get(&link, Some(&page.url)).await?;
        info!("Logged out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string_contains, header, method, path},
    };

    fn quick_options(server: &MockServer) -> SessionOptions {
        SessionOptions {
            base_url: format!("{}/", server.uri()),
            timeout: Duration::from_secs(5),
            jitter_steps: 0,
            login_settle: Duration::ZERO,
            credentials: Credentials::new("me@example.com", "secret"),
            ..SessionOptions::default()
        }
    }

    fn html(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/html")
            .set_body_bytes(body.as_bytes())
    }

    #[tokio::test]
    async fn test_fetch_returns_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list_friend.pl"))
            .and(header("referer", "http://example.com/home.pl"))
            .respond_with(html("<html><body>friends</body></html>"))
            .mount(&server)
            .await;

        let session = HttpSession::new(quick_options(&server)).unwrap();
        let url = format!("{}/list_friend.pl?id=1", server.uri());
        let page = session.fetch(&url, Some("http://example.com/home.pl")).await.unwrap();

        assert_eq!(page.status_code, 200);
        assert_eq!(page.mime_type().as_deref(), Some("text/html"));
        assert!(page.text().contains("friends"));
    }

    #[tokio::test]
    async fn test_fetch_maps_error_status_to_bad_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let session = HttpSession::new(quick_options(&server)).unwrap();
        let err = session
            .fetch(&format!("{}/gone", server.uri()), None)
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::BadResponse { status: 404, .. }));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_fetch_maps_slow_response_to_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(html("late").set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let options = SessionOptions {
            timeout: Duration::from_millis(200),
            ..quick_options(&server)
        };
        let session = HttpSession::new(options).unwrap();
        let err = session
            .fetch(&format!("{}/slow", server.uri()), None)
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_login_submits_credentials_and_keeps_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html(
                r#"<form action="/login.pl" method="post">
                    <input name="email"><input type="password" name="password">
                    <input type="hidden" name="next_url" value="/">
                    <input type="submit" value="login">
                </form>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login.pl"))
            .and(body_string_contains("email=me%40example.com"))
            .and(body_string_contains("password=secret"))
            .and(body_string_contains("next_url=%2Fhome.pl"))
            .respond_with(html("<html><body>welcome</body></html>").insert_header("set-cookie", "session=abc; Path=/"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/home.pl"))
            .and(header("cookie", "session=abc"))
            .respond_with(html("<html><body>home</body></html>"))
            .expect(1)
            .mount(&server)
            .await;

        let session = HttpSession::new(quick_options(&server)).unwrap();
        session.login().await.unwrap();
        session
            .fetch(&format!("{}/home.pl", server.uri()), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_login_rejected_when_form_served_again() {
        let server = MockServer::start().await;
        let login_form = r#"<form action="/login.pl" method="post">
            <input name="email"><input type="password" name="password"></form>"#;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html(login_form))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login.pl"))
            .respond_with(html(login_form))
            .mount(&server)
            .await;

        let session = HttpSession::new(quick_options(&server)).unwrap();
        let err = session.login().await.unwrap_err();
        assert!(matches!(err, ScanError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_login_requires_credentials() {
        let server = MockServer::start().await;
        let options = SessionOptions {
            credentials: Credentials::default(),
            ..quick_options(&server)
        };
        let session = HttpSession::new(options).unwrap();
        assert!(matches!(
            session.login().await.unwrap_err(),
            ScanError::Authentication(_)
        ));
    }

    #[tokio::test]
    async fn test_logout_follows_logout_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html(r#"<a href="/logout.pl">ログアウト</a>"#))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/logout.pl"))
            .respond_with(html("bye"))
            .expect(1)
            .mount(&server)
            .await;

        let session = HttpSession::new(quick_options(&server)).unwrap();
        session.logout().await.unwrap();
    }

    #[tokio::test]
    async fn test_logout_without_link_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html("<html><body>not logged in</body></html>"))
            .mount(&server)
            .await;

        let session = HttpSession::new(quick_options(&server)).unwrap();
        session.logout().await.unwrap();
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("me", "hunter2");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("me"));
        assert!(!rendered.contains("hunter2"));
    }
}
