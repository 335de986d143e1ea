use serde::{Deserialize, Serialize};

/// A link discovered while crawling. `level` is the BFS depth at which it
/// was found; the crawl root sits at level 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    pub text: String,
    pub level: usize,
}

impl Link {
    pub fn new(url: impl Into<String>, text: impl Into<String>, level: usize) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
            level,
        }
    }
}

/// User-supplied site-capture settings, fixed for the lifetime of a crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureOptions {
    /// Maximum link depth to follow from the root page.
    pub depth: usize,
    /// Upper bound on concurrently running capture workers.
    pub threads: usize,
    /// Politeness pause before each dispatch, per worker, in seconds.
    pub delay_secs: f64,
    /// Treat URLs differing only in their `#fragment` as the same page.
    pub ignore_hashes: bool,
    /// Newline-delimited include rule text; empty means "allow everything".
    pub include_rules: String,
    /// Newline-delimited exclude rule text; empty means "exclude nothing".
    pub exclude_rules: String,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            depth: 2,
            threads: 3,
            delay_secs: 0.0,
            ignore_hashes: false,
            include_rules: String::new(),
            exclude_rules: String::new(),
        }
    }
}

/// The bookmark a site capture starts from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedBookmark {
    pub uri: String,
    pub name: String,
    pub capture: CaptureOptions,
}

/// A captured page as returned by a [`PageCapture`](crate::capture::PageCapture)
/// implementation. `links` is empty for non-HTML resources.
#[derive(Debug, Clone)]
pub struct PageArchive {
    pub url: String,
    pub title: String,
    pub icon: Option<String>,
    pub level: usize,
    pub links: Vec<Link>,
    pub content: Vec<u8>,
    pub content_type: String,
}

impl PageArchive {
    pub fn new(url: impl Into<String>, level: usize) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            icon: None,
            level,
            links: Vec::new(),
            content: Vec::new(),
            content_type: "text/html".to_string(),
        }
    }
}

/// The bookmark-shaped part of a captured page handed to an
/// [`ArchiveSink`](crate::capture::ArchiveSink) for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveDraft {
    pub uri: String,
    pub title: String,
    pub icon: Option<String>,
}

impl From<&PageArchive> for ArchiveDraft {
    fn from(page: &PageArchive) -> Self {
        Self {
            uri: page.url.clone(),
            title: page.title.clone(),
            icon: page.icon.clone(),
        }
    }
}
