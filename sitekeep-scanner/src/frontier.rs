use crate::types::Link;
use std::collections::{HashSet, VecDeque};
use tokio::sync::Mutex;
use tracing::debug;

struct FrontierState {
    visited: HashSet<String>,
    pending: VecDeque<Link>,
}

/// The shared work list of a crawl: a FIFO queue of discovered links plus
/// the set of every URL ever pushed.
///
/// A URL enters `visited` the instant it is pushed, not when it is popped,
/// so the same page can be pushed at most once over the whole crawl no
/// matter how many pages link to it. Both halves live under one lock; the
/// check-insert-append in [`push`](Frontier::push) is atomic with respect
/// to concurrent workers.
pub struct Frontier {
    state: Mutex<FrontierState>,
    ignore_hashes: bool,
}

impl Frontier {
    /// Creates a frontier rooted at `root_url`. The root is pre-marked
    /// visited so it can never be re-enqueued by its own pages.
    pub fn new(root_url: &str, ignore_hashes: bool) -> Self {
        let mut visited = HashSet::new();
        visited.insert(normalize(root_url, ignore_hashes));

        Self {
            state: Mutex::new(FrontierState {
                visited,
                pending: VecDeque::new(),
            }),
            ignore_hashes,
        }
    }

    /// Enqueues a link unless its normalized URL was already pushed.
    /// Duplicates are silently absorbed.
    pub async fn push(&self, link: Link) {
        let normalized = normalize(&link.url, self.ignore_hashes);
        let mut state = self.state.lock().await;

        if state.visited.contains(&normalized) {
            debug!("Skipping already-seen URL {}", link.url);
            return;
        }

        state.visited.insert(normalized);
        state.pending.push_back(link);
    }

    /// Removes and returns the earliest-pushed pending link. The popped URL
    /// stays marked visited.
    pub async fn pop(&self) -> Option<Link> {
        self.state.lock().await.pending.pop_front()
    }

    /// Count of pending, not-yet-popped links.
    pub async fn len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn normalize(url: &str, ignore_hashes: bool) -> String {
    let url = if ignore_hashes {
        url.split('#').next().unwrap_or(url)
    } else {
        url
    };

    url.to_lowercase()
}
