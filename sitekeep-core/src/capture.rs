use crate::data::Database;
use crate::model::ArchivedPage;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sitekeep_scanner::capture::{ArchiveSink, PageCapture};
use sitekeep_scanner::crawler::{CaptureRegistry, FinishCallback, ProgressCallback};
use sitekeep_scanner::error::{Result as ScanResult, ScanError};
use sitekeep_scanner::types::{ArchiveDraft, CaptureOptions, Link, PageArchive, SeedBookmark};
use sitekeep_scanner::HttpCapture;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, mpsc};
use tracing::{info, warn};
use url::Url;

/// Options for running one site capture end to end
pub struct SiteCaptureJob {
    pub url: String,
    pub name: Option<String>,
    pub capture: CaptureOptions,
    pub show_progress: bool,
}

/// What a finished (or aborted) capture produced
pub struct CaptureSummary {
    pub folder_id: i64,
    pub folder_name: String,
    pub pages: Vec<ArchivedPage>,
}

/// [`ArchiveSink`] that writes captured pages as archive nodes under one
/// site folder, the way the browser-side capture files pages under the
/// bookmark it started from.
pub struct SqliteArchiveSink {
    db: Mutex<Database>,
    parent_id: i64,
}

impl SqliteArchiveSink {
    pub fn new(db: Database, parent_id: i64) -> Self {
        Self {
            db: Mutex::new(db),
            parent_id,
        }
    }

    pub fn parent_id(&self) -> i64 {
        self.parent_id
    }

    pub async fn archived_pages(&self) -> ScanResult<Vec<ArchivedPage>> {
        self.db
            .lock()
            .await
            .archived_pages(self.parent_id)
            .map_err(|e| ScanError::Storage(e.to_string()))
    }
}

impl ArchiveSink for SqliteArchiveSink {
    async fn persist(
        &self,
        draft: ArchiveDraft,
        content: Vec<u8>,
        content_type: String,
    ) -> ScanResult<i64> {
        let db = self.db.lock().await;

        let name = if draft.title.is_empty() {
            draft.uri.clone()
        } else {
            draft.title.clone()
        };

        let node_id = db
            .add_archive_node(Some(self.parent_id), &name, &draft.uri, draft.icon.as_deref())
            .map_err(|e| ScanError::Storage(e.to_string()))?;
        db.store_archive(node_id, &content, &content_type)
            .map_err(|e| ScanError::Storage(e.to_string()))?;

        Ok(node_id)
    }
}

/// Runs a whole site capture: creates the site folder, archives the root
/// page, feeds its links to the crawler, and blocks until the capture
/// finalizes. Ctrl-C while the crawl is running requests a cooperative
/// abort; whatever was already archived stays archived.
pub async fn execute_site_capture(
    db: Database,
    job: SiteCaptureJob,
) -> Result<CaptureSummary, String> {
    let parsed = Url::parse(&job.url).map_err(|e| format!("Invalid URL {}: {}", job.url, e))?;
    let folder_name = job.name.clone().unwrap_or_else(|| {
        parsed
            .host_str()
            .map(|h| h.to_string())
            .unwrap_or_else(|| job.url.clone())
    });

    let folder_id = db
        .add_folder(None, &folder_name)
        .map_err(|e| format!("Failed to create site folder: {}", e))?;

    let options_json = serde_json::to_string(&job.capture)
        .map_err(|e| format!("Failed to encode capture options: {}", e))?;
    db.set_capture_options(folder_id, &options_json)
        .map_err(|e| format!("Failed to store capture options: {}", e))?;

    let capture = Arc::new(HttpCapture::new());
    let sink = Arc::new(SqliteArchiveSink::new(db, folder_id));

    // Progress spinner fed from the worker progress callback (only if enabled)
    let progress_bar = if job.show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap(),
        );
        pb.set_message("Starting site capture...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let visited_count = Arc::new(AtomicUsize::new(0));

    let internal_progress: ProgressCallback = {
        let pb = progress_bar.clone();
        let count = visited_count.clone();
        Arc::new(move |_worker_id: usize, url: String| {
            let n = count.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(ref pb) = pb {
                pb.set_message(format!("Capturing... {} pages visited ({})", n, url));
                pb.tick();
            }
        })
    };

    let (finished_tx, mut finished_rx) = mpsc::unbounded_channel();
    let on_finish: FinishCallback = Arc::new(move || {
        let _ = finished_tx.send(());
    });

    let registry = CaptureRegistry::with_progress_callback(on_finish, internal_progress);

    let seed = SeedBookmark {
        uri: job.url.clone(),
        name: folder_name.clone(),
        capture: job.capture.clone(),
    };
    registry
        .initialize(&seed, capture.clone(), sink.clone())
        .await
        .map_err(|e| e.to_string())?;

    // Map Ctrl-C onto the cooperative abort
    {
        let registry = registry.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, aborting site capture");
                registry.abort().await;
            }
        });
    }

    // The root page is captured here, outside the worker pool; its links
    // seed the crawl.
    let root_link = Link::new(&job.url, &folder_name, 0);
    let root_page = capture_root(capture.as_ref(), &root_link).await;

    let Some(mut root_page) = root_page else {
        registry.abort().await;
        if let Some(ref pb) = progress_bar {
            pb.finish_and_clear();
        }
        return Err(format!("Failed to capture root page {}", job.url));
    };

    let draft = ArchiveDraft::from(&root_page);
    let content = std::mem::take(&mut root_page.content);
    sink.persist(draft, content, root_page.content_type.clone())
        .await
        .map_err(|e| format!("Failed to store root archive: {}", e))?;

    registry.crawl(&root_page).await;
    finished_rx.recv().await;

    let pages = sink.archived_pages().await.map_err(|e| e.to_string())?;

    if let Some(ref pb) = progress_bar {
        pb.finish_with_message(format!(
            "Site capture complete! {} pages archived",
            pages.len()
        ));
    }

    info!(
        "Captured {} pages of {} into folder {}",
        pages.len(),
        folder_name,
        folder_id
    );

    Ok(CaptureSummary {
        folder_id,
        folder_name,
        pages,
    })
}

async fn capture_root<C: PageCapture>(capture: &C, root_link: &Link) -> Option<PageArchive> {
    match capture.probe_html(&root_link.url).await {
        Some(true) => match capture.capture_html(root_link).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Root capture failed for {}: {}", root_link.url, e);
                None
            }
        },
        Some(false) => match capture.capture_other(root_link).await {
            Ok(page) => Some(page),
            Err(e) => {
                warn!("Root fetch failed for {}: {}", root_link.url, e);
                None
            }
        },
        None => None,
    }
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Human-readable byte count for the capture report
pub fn format_bytes(bytes: i64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;

    let bytes = bytes as f64;
    if bytes >= MIB {
        format!("{:.1} MiB", bytes / MIB)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes / KIB)
    } else {
        format!("{} B", bytes)
    }
}

/// Generate a capture report from a finished summary
pub fn generate_capture_report(summary: &CaptureSummary) -> String {
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Site folder: {}\n", summary.folder_name));
    report.push_str(&format!("  Pages archived: {}\n", summary.pages.len()));

    let total_bytes: i64 = summary.pages.iter().map(|p| p.byte_size).sum();
    report.push_str(&format!("  Stored content: {}\n", format_bytes(total_bytes)));

    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    // Group pages by host
    let mut by_host: HashMap<String, Vec<&ArchivedPage>> = HashMap::new();

    for page in &summary.pages {
        let host = Url::parse(&page.uri)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_else(|| "unknown".to_string());
        by_host.entry(host).or_default().push(page);
    }

    for (host, host_pages) in by_host.iter() {
        report.push_str(&format!("## {}\n", host));
        report.push_str(&format!("  {} pages archived\n\n", host_pages.len()));

        for page in host_pages {
            let path = extract_url_path(&page.uri);

            let mut line = format!("  {} {}", path, format_bytes(page.byte_size).dimmed());

            // Only show MIME type if it's not text/html
            if !page.content_type.starts_with("text/html") {
                line.push_str(&format!(" {}", page.content_type.bright_black()));
            }

            report.push_str(&line);
            report.push('\n');
        }
        report.push('\n');
    }

    report
}
