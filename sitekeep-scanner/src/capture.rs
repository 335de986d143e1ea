use crate::error::Result;
use crate::types::{ArchiveDraft, Link, PageArchive};
use reqwest::Client;
use scraper::{Html, Selector};
use std::future::Future;
use tracing::{debug, warn};
use url::Url;

/// Fetches and packages pages on behalf of the crawler.
///
/// Implementations own everything about how a page is turned into storable
/// content; the crawler only ever sees the resulting [`PageArchive`].
pub trait PageCapture: Send + Sync + 'static {
    /// Content-type probe for a URL. `None` means the probe itself failed
    /// and nothing is known about the resource.
    fn probe_html(&self, url: &str) -> impl Future<Output = Option<bool>> + Send;

    /// Captures an HTML page and extracts its outbound links.
    fn capture_html(&self, link: &Link) -> impl Future<Output = Result<Option<PageArchive>>> + Send;

    /// Captures a non-HTML resource (image, PDF, ...) without link extraction.
    fn capture_other(&self, link: &Link) -> impl Future<Output = Result<PageArchive>> + Send;
}

/// Persists captured content as an archive node in the bookmark tree.
pub trait ArchiveSink: Send + Sync + 'static {
    /// Writes the captured bytes and returns the new node's id.
    fn persist(
        &self,
        draft: ArchiveDraft,
        content: Vec<u8>,
        content_type: String,
    ) -> impl Future<Output = Result<i64>> + Send;
}

/// [`PageCapture`] over plain HTTP.
pub struct HttpCapture {
    client: Client,
}

impl HttpCapture {
    pub fn new() -> Self {
        Self::with_timeout(10)
    }

    pub fn with_timeout(timeout_secs: u64) -> Self {
        let client = Client::builder()
            .user_agent("sitekeep/0.2 (https://github.com/sitekeep/sitekeep)")
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .connect_timeout(std::time::Duration::from_secs(timeout_secs / 2))
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .tcp_keepalive(std::time::Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }
}

impl Default for HttpCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl PageCapture for HttpCapture {
    async fn probe_html(&self, url: &str) -> Option<bool> {
        let response = match self.client.head(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("HEAD probe failed for {}: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            return None;
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        Some(content_type.to_lowercase().starts_with("text/html"))
    }

    async fn capture_html(&self, link: &Link) -> Result<Option<PageArchive>> {
        debug!("Fetching {}", link.url);

        let response = self
            .client
            .get(link.url.as_str())
            .send()
            .await?
            .error_for_status()?;

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_else(|| "text/html".to_string());

        let body = response.text().await?;
        let (title, icon, links) = extract_page_parts(&body, &link.url, link.level);

        let mut page = PageArchive::new(&link.url, link.level);
        page.title = if title.is_empty() {
            link.text.clone()
        } else {
            title
        };
        page.icon = icon;
        page.links = links;
        page.content = body.into_bytes();
        page.content_type = content_type;

        Ok(Some(page))
    }

    async fn capture_other(&self, link: &Link) -> Result<PageArchive> {
        let mut page = PageArchive::new(&link.url, link.level);
        page.title = link.text.clone();

        // Mirror the lenient original behavior: a failed fetch still yields
        // an (empty) archive entry rather than aborting the link.
        let response = match self.client.get(link.url.as_str()).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Fetch failed for {}: {}", link.url, e);
                return Ok(page);
            }
        };

        if response.status().is_success() {
            if let Some(content_type) = response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok())
            {
                page.content_type = content_type.to_string();
            }
            page.content = response.bytes().await?.to_vec();
        }

        Ok(page)
    }
}

/// Pulls the title, favicon, and outbound anchors out of an HTML document.
fn extract_page_parts(html: &str, page_url: &str, level: usize) -> (String, Option<String>, Vec<Link>) {
    let document = Html::parse_document(html);

    let title_selector = Selector::parse("title").unwrap();
    let title = document
        .select(&title_selector)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let icon_selector = Selector::parse("link[rel*=\"icon\"]").unwrap();
    let icon = document
        .select(&icon_selector)
        .next()
        .and_then(|e| e.value().attr("href"))
        .and_then(|href| resolve_url(page_url, href));

    let link_selector = Selector::parse("a[href]").unwrap();
    let mut links = Vec::new();

    for element in document.select(&link_selector) {
        if let Some(href) = element.value().attr("href")
            && let Some(absolute_url) = resolve_url(page_url, href)
        {
            let text = element.text().collect::<String>().trim().to_string();
            links.push(Link::new(absolute_url, text, level));
        }
    }

    (title, icon, links)
}

/// Resolves an href against its page URL. Fragments are kept; whether
/// `page#a` and `page#b` count as one page is the frontier's decision, not
/// the extractor's.
fn resolve_url(base: &str, href: &str) -> Option<String> {
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let base_url = Url::parse(base).ok()?;
    let resolved = base_url.join(href).ok()?;

    Some(resolved.to_string())
}
