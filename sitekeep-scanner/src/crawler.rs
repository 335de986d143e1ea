use crate::capture::{ArchiveSink, PageCapture};
use crate::error::{Result, ScanError};
use crate::frontier::Frontier;
use crate::rules::RuleSet;
use crate::types::{ArchiveDraft, CaptureOptions, Link, PageArchive, SeedBookmark};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;
pub type FinishCallback = Arc<dyn Fn() + Send + Sync>;

/// How long an aborted capture waits for in-flight requests to land before
/// it is forced to finalize.
const ABORT_GRACE: Duration = Duration::from_millis(500);

/// Drives one site capture: a bounded pool of workers pulling links from
/// the shared [`Frontier`], capturing them through a [`PageCapture`], and
/// feeding admissible discoveries back in.
pub struct SiteCrawler<C, S> {
    options: CaptureOptions,
    include_rules: RuleSet,
    exclude_rules: RuleSet,
    frontier: Frontier,
    capture: Arc<C>,
    sink: Arc<S>,
    started: AtomicBool,
    aborted: AtomicBool,
    active_workers: AtomicUsize,
    progress_callback: Option<ProgressCallback>,
    on_finish: FinishCallback,
}

impl<C: PageCapture, S: ArchiveSink> SiteCrawler<C, S> {
    pub fn new(
        seed: &SeedBookmark,
        capture: Arc<C>,
        sink: Arc<S>,
        progress_callback: Option<ProgressCallback>,
        on_finish: FinishCallback,
    ) -> Self {
        let options = seed.capture.clone();

        Self {
            include_rules: RuleSet::compile(&options.include_rules),
            exclude_rules: RuleSet::compile(&options.exclude_rules),
            frontier: Frontier::new(&seed.uri, options.ignore_hashes),
            options,
            capture,
            sink,
            started: AtomicBool::new(false),
            aborted: AtomicBool::new(false),
            active_workers: AtomicUsize::new(0),
            progress_callback,
            on_finish,
        }
    }

    /// Requests cooperative cancellation. Workers stop pulling new links
    /// once their current step completes; in-flight requests are not cut.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Feeds a captured page's outbound links into the frontier (subject to
    /// the depth limit and the include/exclude rules) and makes sure the
    /// worker pool is running.
    pub async fn enqueue(self: Arc<Self>, page: &PageArchive) {
        if page.level < self.options.depth && !page.links.is_empty() {
            for link in &page.links {
                if self.is_link_allowed(link) {
                    self.frontier
                        .push(Link::new(&link.url, &link.text, page.level + 1))
                        .await;
                } else {
                    debug!("Link filtered out: {}", link.url);
                }
            }
        }

        self.start_workers().await;
    }

    /// A link passes if the include rules accept it and the exclude rules,
    /// when any exist, do not. An empty exclude set never removes anything.
    fn is_link_allowed(&self, link: &Link) -> bool {
        let include = self.include_rules.matches(link);
        let exclude = !self.exclude_rules.is_empty() && self.exclude_rules.matches(link);
        include && !exclude
    }

    /// Sizes and launches the worker pool. This happens exactly once per
    /// crawl, at the first enqueue; the pool is sized to the frontier at
    /// that instant and later enqueues never grow it.
    fn start_workers(
        self: Arc<Self>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
        Box::pin(async move {
            if self.started.swap(true, Ordering::SeqCst) {
                return;
            }

            let count = self.options.threads.min(self.frontier.len().await);
            info!("Starting {} capture workers", count);

            if count == 0 {
                // Nothing admissible was enqueued; finalize right away instead
                // of leaving the capture registered forever.
                (self.on_finish)();
                return;
            }

            self.active_workers.store(count, Ordering::SeqCst);
            for worker_id in 0..count {
                let crawler = Arc::clone(&self);
                tokio::spawn(async move {
                    crawler.worker_loop(worker_id).await;
                });
            }
        })
    }

    async fn worker_loop(self: Arc<Self>, worker_id: usize) {
        debug!("Worker {} started", worker_id);

        while let Some(link) = self.frontier.pop().await {
            if self.options.delay_secs > 0.0 {
                tokio::time::sleep(Duration::from_secs_f64(self.options.delay_secs)).await;
            }

            if let Some(page) = self.visit_link(worker_id, &link).await {
                self.clone().enqueue(&page).await;
            }

            if self.aborted.load(Ordering::SeqCst) {
                debug!("Worker {} observed abort", worker_id);
                break;
            }
        }

        debug!("Worker {} retiring", worker_id);
        if self.active_workers.fetch_sub(1, Ordering::SeqCst) == 1 {
            info!("All capture workers retired");
            (self.on_finish)();
        }
    }

    /// Captures one link and persists the result. Every failure here is
    /// local to the link: it is logged and the crawl moves on.
    async fn visit_link(&self, worker_id: usize, link: &Link) -> Option<PageArchive> {
        if let Some(callback) = &self.progress_callback {
            callback(worker_id, link.url.clone());
        }

        let page = match self.capture.probe_html(&link.url).await {
            Some(true) => match self.capture.capture_html(link).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("Capture failed for {}: {}", link.url, e);
                    None
                }
            },
            Some(false) => match self.capture.capture_other(link).await {
                Ok(page) => Some(page),
                Err(e) => {
                    warn!("Fetch failed for {}: {}", link.url, e);
                    None
                }
            },
            None => {
                warn!("Skipping {}: content probe failed", link.url);
                None
            }
        };

        let mut page = page?;

        let draft = ArchiveDraft::from(&page);
        let content = std::mem::take(&mut page.content);
        if let Err(e) = self
            .sink
            .persist(draft, content, page.content_type.clone())
            .await
        {
            warn!("Failed to store archive for {}: {}", page.url, e);
        }

        Some(page)
    }
}

struct RegistryInner<C, S> {
    current: Mutex<Option<Arc<SiteCrawler<C, S>>>>,
    on_finish: FinishCallback,
    progress_callback: Option<ProgressCallback>,
}

/// The "current capture" slot. At most one site capture runs at a time;
/// [`initialize`](CaptureRegistry::initialize) refuses a second one until
/// the first has finalized.
pub struct CaptureRegistry<C, S> {
    inner: Arc<RegistryInner<C, S>>,
}

impl<C, S> Clone for CaptureRegistry<C, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: PageCapture, S: ArchiveSink> CaptureRegistry<C, S> {
    pub fn new(on_finish: FinishCallback) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                current: Mutex::new(None),
                on_finish,
                progress_callback: None,
            }),
        }
    }

    pub fn with_progress_callback(on_finish: FinishCallback, progress: ProgressCallback) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                current: Mutex::new(None),
                on_finish,
                progress_callback: Some(progress),
            }),
        }
    }

    /// Registers a new capture. Fails with
    /// [`ScanError::CaptureInProgress`] while another capture occupies the
    /// slot. Does not start any work by itself.
    pub async fn initialize(
        &self,
        seed: &SeedBookmark,
        capture: Arc<C>,
        sink: Arc<S>,
    ) -> Result<()> {
        let mut current = self.inner.current.lock().await;
        if current.is_some() {
            info!("Rejecting site capture for {}: another capture is running", seed.uri);
            return Err(ScanError::CaptureInProgress);
        }

        let registry = self.clone();
        let finish: FinishCallback = Arc::new(move || {
            let registry = registry.clone();
            tokio::spawn(async move {
                registry.finalize().await;
            });
        });

        let crawler = SiteCrawler::new(
            seed,
            capture,
            sink,
            self.inner.progress_callback.clone(),
            finish,
        );

        info!("Site capture initialized for {}", seed.uri);
        *current = Some(Arc::new(crawler));
        Ok(())
    }

    /// Enqueues a captured page's links and (on the first call) starts the
    /// worker pool. A no-op when no capture is initialized.
    pub async fn crawl(&self, page: &PageArchive) {
        let crawler = self.inner.current.lock().await.clone();
        if let Some(crawler) = crawler {
            crawler.enqueue(page).await;
        }
    }

    /// Requests cancellation of the active capture and schedules a forced
    /// finalize after a grace period. A no-op when nothing is running.
    pub async fn abort(&self) {
        let crawler = self.inner.current.lock().await.clone();
        if let Some(crawler) = crawler {
            info!("Aborting site capture");
            crawler.abort();

            let registry = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(ABORT_GRACE).await;
                registry.finalize().await;
            });
        }
    }

    pub async fn is_running(&self) -> bool {
        self.inner.current.lock().await.is_some()
    }

    /// Clears the slot and fires the finish callback. Both the normal
    /// drain path and the abort grace timer land here; whichever arrives
    /// first wins and the other becomes a no-op.
    async fn finalize(&self) {
        let finished = self.inner.current.lock().await.take();
        if finished.is_some() {
            info!("Site capture finalized");
            (self.inner.on_finish)();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::mpsc;

    /// In-memory site map standing in for real page capture.
    struct MockCapture {
        // url -> (text, outbound hrefs)
        pages: HashMap<String, Vec<(String, String)>>,
        // urls that probe as non-HTML resources
        binaries: Vec<String>,
        captured: StdMutex<Vec<String>>,
        step_delay: Duration,
    }

    impl MockCapture {
        fn new(pages: &[(&str, &[(&str, &str)])]) -> Self {
            let pages = pages
                .iter()
                .map(|(url, links)| {
                    (
                        url.to_string(),
                        links
                            .iter()
                            .map(|(u, t)| (u.to_string(), t.to_string()))
                            .collect(),
                    )
                })
                .collect();

            Self {
                pages,
                binaries: Vec::new(),
                captured: StdMutex::new(Vec::new()),
                step_delay: Duration::ZERO,
            }
        }

        fn with_step_delay(mut self, delay: Duration) -> Self {
            self.step_delay = delay;
            self
        }

        fn with_binaries(mut self, urls: &[&str]) -> Self {
            self.binaries = urls.iter().map(|u| u.to_string()).collect();
            self
        }

        fn captured(&self) -> Vec<String> {
            self.captured.lock().unwrap().clone()
        }

        fn page_for(&self, link: &Link) -> PageArchive {
            let mut page = PageArchive::new(&link.url, link.level);
            page.title = link.text.clone();
            page.links = self
                .pages
                .get(&link.url)
                .map(|links| {
                    links
                        .iter()
                        .map(|(url, text)| Link::new(url, text, link.level))
                        .collect()
                })
                .unwrap_or_default();
            page.content = b"content".to_vec();
            page
        }
    }

    impl PageCapture for MockCapture {
        async fn probe_html(&self, url: &str) -> Option<bool> {
            Some(!self.binaries.iter().any(|b| b == url))
        }

        async fn capture_html(&self, link: &Link) -> Result<Option<PageArchive>> {
            if !self.step_delay.is_zero() {
                tokio::time::sleep(self.step_delay).await;
            }
            self.captured.lock().unwrap().push(link.url.clone());
            Ok(Some(self.page_for(link)))
        }

        async fn capture_other(&self, link: &Link) -> Result<PageArchive> {
            self.captured.lock().unwrap().push(link.url.clone());
            let mut page = PageArchive::new(&link.url, link.level);
            page.title = link.text.clone();
            page.content_type = "application/octet-stream".to_string();
            Ok(page)
        }
    }

    /// Records persisted drafts instead of writing anywhere.
    #[derive(Default)]
    struct RecordingSink {
        persisted: StdMutex<Vec<(ArchiveDraft, String)>>,
    }

    impl RecordingSink {
        fn urls(&self) -> Vec<String> {
            self.persisted
                .lock()
                .unwrap()
                .iter()
                .map(|(draft, _)| draft.uri.clone())
                .collect()
        }
    }

    impl ArchiveSink for RecordingSink {
        async fn persist(
            &self,
            draft: ArchiveDraft,
            _content: Vec<u8>,
            content_type: String,
        ) -> Result<i64> {
            let mut persisted = self.persisted.lock().unwrap();
            persisted.push((draft, content_type));
            Ok(persisted.len() as i64)
        }
    }

    fn seed(uri: &str, options: CaptureOptions) -> SeedBookmark {
        SeedBookmark {
            uri: uri.to_string(),
            name: "Test site".to_string(),
            capture: options,
        }
    }

    fn root_page(uri: &str, links: &[(&str, &str)]) -> PageArchive {
        let mut page = PageArchive::new(uri, 0);
        page.links = links
            .iter()
            .map(|(url, text)| Link::new(*url, *text, 0))
            .collect();
        page
    }

    fn finish_channel() -> (FinishCallback, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let callback: FinishCallback = Arc::new(move || {
            let _ = tx.send(());
        });
        (callback, rx)
    }

    async fn wait_finished(rx: &mut mpsc::UnboundedReceiver<()>) {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("capture did not finalize in time");
    }

    #[tokio::test]
    async fn test_end_to_end_include_rule_scenario() {
        let capture = Arc::new(MockCapture::new(&[
            ("http://site/a", &[]),
            ("http://site/b", &[]),
        ]));
        let sink = Arc::new(RecordingSink::default());

        let options = CaptureOptions {
            depth: 1,
            threads: 2,
            include_rules: "/site\\//".to_string(),
            ..CaptureOptions::default()
        };

        let (on_finish, mut finished) = finish_channel();
        let registry = CaptureRegistry::new(on_finish);

        registry
            .initialize(&seed("http://site/index", options), capture.clone(), sink.clone())
            .await
            .unwrap();

        let root = root_page(
            "http://site/index",
            &[
                ("http://site/a", "A"),
                ("http://site/b", "B"),
                ("http://other/c", "C"),
            ],
        );
        registry.crawl(&root).await;
        wait_finished(&mut finished).await;

        let mut archived = sink.urls();
        archived.sort();
        assert_eq!(archived, vec!["http://site/a", "http://site/b"]);
        assert!(!capture.captured().contains(&"http://other/c".to_string()));
        assert!(!registry.is_running().await);
    }

    #[tokio::test]
    async fn test_depth_bound_stops_enqueueing() {
        let capture = Arc::new(MockCapture::new(&[
            ("http://site/a", &[("http://site/b", "B")]),
            ("http://site/b", &[("http://site/c", "C")]),
            ("http://site/c", &[]),
        ]));
        let sink = Arc::new(RecordingSink::default());

        let options = CaptureOptions {
            depth: 2,
            threads: 1,
            ..CaptureOptions::default()
        };

        let (on_finish, mut finished) = finish_channel();
        let registry = CaptureRegistry::new(on_finish);
        registry
            .initialize(&seed("http://site/index", options), capture.clone(), sink.clone())
            .await
            .unwrap();

        registry
            .crawl(&root_page("http://site/index", &[("http://site/a", "A")]))
            .await;
        wait_finished(&mut finished).await;

        // a sits at level 1 and gets its children considered; b sits at the
        // depth limit, so c is never pushed.
        let mut archived = sink.urls();
        archived.sort();
        assert_eq!(archived, vec!["http://site/a", "http://site/b"]);
    }

    #[tokio::test]
    async fn test_worker_pool_sized_to_frontier() {
        // Two pending links with room for five workers: only workers 0 and
        // 1 may ever report progress, even after ten more links arrive.
        let fanout: Vec<(String, String)> = (0..10)
            .map(|i| (format!("http://site/deep{}", i), format!("d{}", i)))
            .collect();
        let fanout_refs: Vec<(&str, &str)> = fanout
            .iter()
            .map(|(u, t)| (u.as_str(), t.as_str()))
            .collect();

        let no_links: &[(&str, &str)] = &[];
        let mut pages: Vec<(&str, &[(&str, &str)])> = vec![
            ("http://site/a", fanout_refs.as_slice()),
            ("http://site/b", no_links),
        ];
        for (url, _) in &fanout {
            pages.push((url.as_str(), no_links));
        }

        let capture =
            Arc::new(MockCapture::new(&pages).with_step_delay(Duration::from_millis(5)));
        let sink = Arc::new(RecordingSink::default());

        let options = CaptureOptions {
            depth: 3,
            threads: 5,
            ..CaptureOptions::default()
        };

        let worker_ids = Arc::new(StdMutex::new(Vec::new()));
        let ids = worker_ids.clone();
        let progress: ProgressCallback = Arc::new(move |worker_id, _url| {
            ids.lock().unwrap().push(worker_id);
        });

        let (on_finish, mut finished) = finish_channel();
        let registry = CaptureRegistry::with_progress_callback(on_finish, progress);
        registry
            .initialize(&seed("http://site/index", options), capture.clone(), sink.clone())
            .await
            .unwrap();

        registry
            .crawl(&root_page(
                "http://site/index",
                &[("http://site/a", "A"), ("http://site/b", "B")],
            ))
            .await;
        wait_finished(&mut finished).await;

        let ids = worker_ids.lock().unwrap();
        assert!(!ids.is_empty());
        assert!(
            ids.iter().all(|id| *id < 2),
            "expected only workers 0 and 1, saw {:?}",
            *ids
        );
        assert_eq!(sink.urls().len(), 12);
    }

    #[tokio::test]
    async fn test_exclude_rules_filter_links() {
        let capture = Arc::new(MockCapture::new(&[
            ("http://site/keep", &[]),
            ("http://site/private/x", &[]),
        ]));
        let sink = Arc::new(RecordingSink::default());

        let options = CaptureOptions {
            depth: 1,
            threads: 2,
            exclude_rules: "/private/".to_string(),
            ..CaptureOptions::default()
        };

        let (on_finish, mut finished) = finish_channel();
        let registry = CaptureRegistry::new(on_finish);
        registry
            .initialize(&seed("http://site/", options), capture.clone(), sink.clone())
            .await
            .unwrap();

        registry
            .crawl(&root_page(
                "http://site/",
                &[
                    ("http://site/keep", "Keep"),
                    ("http://site/private/x", "Secret"),
                ],
            ))
            .await;
        wait_finished(&mut finished).await;

        assert_eq!(sink.urls(), vec!["http://site/keep"]);
    }

    #[tokio::test]
    async fn test_empty_rule_sets_allow_everything() {
        let capture = Arc::new(MockCapture::new(&[
            ("http://site/a", &[]),
            ("http://elsewhere/b", &[]),
        ]));
        let sink = Arc::new(RecordingSink::default());

        let (on_finish, mut finished) = finish_channel();
        let registry = CaptureRegistry::new(on_finish);
        registry
            .initialize(
                &seed(
                    "http://site/",
                    CaptureOptions {
                        depth: 1,
                        threads: 2,
                        ..CaptureOptions::default()
                    },
                ),
                capture.clone(),
                sink.clone(),
            )
            .await
            .unwrap();

        registry
            .crawl(&root_page(
                "http://site/",
                &[("http://site/a", "A"), ("http://elsewhere/b", "B")],
            ))
            .await;
        wait_finished(&mut finished).await;

        assert_eq!(sink.urls().len(), 2);
    }

    #[tokio::test]
    async fn test_non_html_resources_fetch_without_link_extraction() {
        let capture = Arc::new(
            MockCapture::new(&[("http://site/page", &[])])
                .with_binaries(&["http://site/logo.png"]),
        );
        let sink = Arc::new(RecordingSink::default());

        let (on_finish, mut finished) = finish_channel();
        let registry = CaptureRegistry::new(on_finish);
        registry
            .initialize(
                &seed(
                    "http://site/",
                    CaptureOptions {
                        depth: 1,
                        threads: 2,
                        ..CaptureOptions::default()
                    },
                ),
                capture.clone(),
                sink.clone(),
            )
            .await
            .unwrap();

        registry
            .crawl(&root_page(
                "http://site/",
                &[
                    ("http://site/page", "Page"),
                    ("http://site/logo.png", "Logo"),
                ],
            ))
            .await;
        wait_finished(&mut finished).await;

        let persisted = sink.persisted.lock().unwrap();
        let logo = persisted
            .iter()
            .find(|(draft, _)| draft.uri == "http://site/logo.png")
            .expect("logo archived");
        assert_eq!(logo.1, "application/octet-stream");
    }

    #[tokio::test]
    async fn test_second_initialize_rejected_while_running() {
        let capture = Arc::new(
            MockCapture::new(&[("http://site/a", &[])])
                .with_step_delay(Duration::from_millis(50)),
        );
        let sink = Arc::new(RecordingSink::default());

        let (on_finish, mut finished) = finish_channel();
        let registry = CaptureRegistry::new(on_finish);
        let options = CaptureOptions {
            depth: 1,
            threads: 1,
            ..CaptureOptions::default()
        };

        registry
            .initialize(&seed("http://site/", options.clone()), capture.clone(), sink.clone())
            .await
            .unwrap();
        registry
            .crawl(&root_page("http://site/", &[("http://site/a", "A")]))
            .await;

        let second = registry
            .initialize(&seed("http://two/", options.clone()), capture.clone(), sink.clone())
            .await;
        assert!(matches!(second, Err(ScanError::CaptureInProgress)));

        wait_finished(&mut finished).await;

        // Once finalized the slot is free again.
        registry
            .initialize(&seed("http://two/", options), capture, sink)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_crawl_without_initialize_is_noop() {
        let (on_finish, _finished) = finish_channel();
        let registry: CaptureRegistry<MockCapture, RecordingSink> =
            CaptureRegistry::new(on_finish);

        registry
            .crawl(&root_page("http://site/", &[("http://site/a", "A")]))
            .await;
        assert!(!registry.is_running().await);
    }

    #[tokio::test]
    async fn test_root_with_no_admissible_links_finalizes() {
        let capture = Arc::new(MockCapture::new(&[]));
        let sink = Arc::new(RecordingSink::default());

        let (on_finish, mut finished) = finish_channel();
        let registry = CaptureRegistry::new(on_finish);
        registry
            .initialize(
                &seed(
                    "http://site/",
                    CaptureOptions {
                        depth: 1,
                        threads: 3,
                        ..CaptureOptions::default()
                    },
                ),
                capture,
                sink.clone(),
            )
            .await
            .unwrap();

        registry.crawl(&root_page("http://site/", &[])).await;
        wait_finished(&mut finished).await;

        assert!(sink.urls().is_empty());
        assert!(!registry.is_running().await);
    }

    #[tokio::test]
    async fn test_abort_stops_workers_and_finalizes_once() {
        let pages: Vec<(String, String)> = (0..40)
            .map(|i| (format!("http://site/p{}", i), format!("p{}", i)))
            .collect();
        let page_refs: Vec<(&str, &str)> =
            pages.iter().map(|(u, t)| (u.as_str(), t.as_str())).collect();
        let no_links: &[(&str, &str)] = &[];
        let mut site: Vec<(&str, &[(&str, &str)])> = Vec::new();
        for (url, _) in &pages {
            site.push((url.as_str(), no_links));
        }

        let capture = Arc::new(
            MockCapture::new(&site).with_step_delay(Duration::from_millis(20)),
        );
        let sink = Arc::new(RecordingSink::default());

        let finish_count = Arc::new(AtomicUsize::new(0));
        let (tx, mut finished) = mpsc::unbounded_channel();
        let count = finish_count.clone();
        let on_finish: FinishCallback = Arc::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(());
        });

        let registry = CaptureRegistry::new(on_finish);
        registry
            .initialize(
                &seed(
                    "http://site/",
                    CaptureOptions {
                        depth: 1,
                        threads: 2,
                        ..CaptureOptions::default()
                    },
                ),
                capture.clone(),
                sink.clone(),
            )
            .await
            .unwrap();

        registry
            .crawl(&root_page("http://site/", &page_refs))
            .await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        registry.abort().await;
        registry.abort().await; // idempotent

        wait_finished(&mut finished).await;
        assert!(!registry.is_running().await);

        let captured_at_finish = capture.captured().len();
        assert!(
            captured_at_finish < 40,
            "abort should leave most of the site uncaptured"
        );

        // No worker keeps pulling after finalization, and the finish
        // callback never fires twice (the grace timer loses the race).
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(capture.captured().len(), captured_at_finish);
        assert_eq!(finish_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_abort_before_crawl_is_noop() {
        let (on_finish, _finished) = finish_channel();
        let registry: CaptureRegistry<MockCapture, RecordingSink> =
            CaptureRegistry::new(on_finish);
        registry.abort().await;
        assert!(!registry.is_running().await);
    }
}
