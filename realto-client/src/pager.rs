//! Paginated, infinite-scroll realty list loading
//!
//! Accumulates pages into one sequence: `load_more` appends the next page,
//! `reload` clears everything and starts over from page 1. At most one list
//! request is in flight at any time; overlapping load requests are silently
//! dropped rather than queued.

use async_trait::async_trait;
use realto_core::{RealtoResult, RealtySummary};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::filters::RealtyFilterService;
use crate::http::ListPayload;

/// Anything that can serve one page of a realty list
#[async_trait]
pub trait ListSource: Send + Sync {
    async fn fetch_page(
        &self,
        page: u32,
        params: &[(String, String)],
    ) -> RealtoResult<ListPayload<RealtySummary>>;
}

#[derive(Debug, Default)]
struct PagerState {
    page: u32,
    page_count: u32,
    total_count: u64,
    items: Vec<RealtySummary>,
    last_page: bool,
    first_load: bool,
}

/// Accumulating list loader with a reentrancy guard
pub struct RealtyPager {
    source: Arc<dyn ListSource>,
    filters: Arc<RealtyFilterService>,
    state: Mutex<PagerState>,
    in_flight: AtomicBool,
}

impl RealtyPager {
    pub fn new(source: Arc<dyn ListSource>, filters: Arc<RealtyFilterService>) -> Self {
        Self {
            source,
            filters,
            state: Mutex::new(PagerState {
                page: 1,
                page_count: 1,
                first_load: true,
                ..Default::default()
            }),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn items(&self) -> Vec<RealtySummary> {
        self.state.lock().unwrap().items.clone()
    }

    pub fn page(&self) -> u32 {
        self.state.lock().unwrap().page
    }

    pub fn page_count(&self) -> u32 {
        self.state.lock().unwrap().page_count
    }

    pub fn total_count(&self) -> u64 {
        self.state.lock().unwrap().total_count
    }

    pub fn is_last_page(&self) -> bool {
        self.state.lock().unwrap().last_page
    }

    /// Whether the first page has not finished loading yet
    pub fn is_first_load(&self) -> bool {
        self.state.lock().unwrap().first_load
    }

    /// Reset to page 1 and refetch. The accumulated list is cleared before
    /// the request goes out. Dropped when a request is already in flight.
    pub async fn reload(&self) -> RealtoResult<()> {
        if !self.acquire() {
            debug!("Reload dropped, a list request is already in flight");
            return Ok(());
        }

        {
            let mut state = self.state.lock().unwrap();
            state.page = 1;
            state.items.clear();
            state.first_load = true;
        }

        self.run_fetch().await
    }

    /// Fetch the next page and append it to the accumulated sequence.
    /// Silently ignored when a request is in flight or the last page has
    /// been reached.
    pub async fn load_more(&self) -> RealtoResult<()> {
        if !self.acquire() {
            debug!("Load-more dropped, a list request is already in flight");
            return Ok(());
        }

        {
            let mut state = self.state.lock().unwrap();
            if state.page_count == 0 || state.page >= state.page_count {
                drop(state);
                self.release();
                return Ok(());
            }
            state.page += 1;
        }

        self.run_fetch().await
    }

    /// Pump filter-change notifications into reloads until the filter
    /// service goes away.
    pub fn spawn_filter_watcher(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let pager = Arc::clone(self);
        let mut changes = pager.filters.subscribe();

        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        if let Err(error) = pager.reload().await {
                            warn!(error = %error, "Reload after filter change failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    fn acquire(&self) -> bool {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn release(&self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }

    // The in-flight guard must be held on entry and is released on every
    // path out.
    async fn run_fetch(&self) -> RealtoResult<()> {
        let page = self.state.lock().unwrap().page;
        let params = self.filters.filters().to_query_params();

        let outcome = self.source.fetch_page(page, &params).await;

        let result = {
            let mut state = self.state.lock().unwrap();
            match outcome {
                Ok(payload) => {
                    state.page_count = payload.pages;
                    state.total_count = payload.total_count;
                    state.last_page = page >= payload.pages;
                    state.items.extend(payload.items);
                    state.first_load = false;
                    Ok(())
                }
                Err(error) => {
                    state.items.clear();
                    state.first_load = false;
                    Err(error)
                }
            }
        };

        self.release();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use realto_core::{ErrorContext, RealtoError};
    use tokio::sync::Notify;

    struct StubSource {
        pages: u32,
        calls: Mutex<Vec<u32>>,
        blocking: AtomicBool,
        failing: AtomicBool,
        gate: Notify,
    }

    impl StubSource {
        fn new(pages: u32) -> Arc<Self> {
            Arc::new(Self {
                pages,
                calls: Mutex::new(Vec::new()),
                blocking: AtomicBool::new(false),
                failing: AtomicBool::new(false),
                gate: Notify::new(),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn block(&self) {
            self.blocking.store(true, Ordering::SeqCst);
        }

        fn release(&self) {
            self.blocking.store(false, Ordering::SeqCst);
            self.gate.notify_one();
        }

        fn fail_next(&self) {
            self.failing.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ListSource for StubSource {
        async fn fetch_page(
            &self,
            page: u32,
            _params: &[(String, String)],
        ) -> RealtoResult<ListPayload<RealtySummary>> {
            self.calls.lock().unwrap().push(page);

            if self.blocking.load(Ordering::SeqCst) {
                self.gate.notified().await;
            }

            if self.failing.swap(false, Ordering::SeqCst) {
                return Err(RealtoError::Network {
                    message: "list fetch refused".to_string(),
                    status: Some(500),
                    source: None,
                    context: ErrorContext::new("stub_source"),
                });
            }

            Ok(ListPayload {
                items: vec![RealtySummary {
                    guid: format!("r{}", page),
                    ..Default::default()
                }],
                pages: self.pages,
                total_count: self.pages as u64,
            })
        }
    }

    fn pager(source: Arc<StubSource>) -> (Arc<RealtyPager>, Arc<RealtyFilterService>) {
        let filters = Arc::new(RealtyFilterService::new());
        (
            Arc::new(RealtyPager::new(source, filters.clone())),
            filters,
        )
    }

    #[tokio::test]
    async fn test_reload_then_load_more_accumulates_pages() {
        let source = StubSource::new(3);
        let (pager, _filters) = pager(source.clone());

        pager.reload().await.unwrap();
        assert_eq!(pager.page(), 1);
        assert_eq!(pager.page_count(), 3);
        assert!(!pager.is_last_page());

        pager.load_more().await.unwrap();
        pager.load_more().await.unwrap();

        assert_eq!(pager.page(), 3);
        assert!(pager.is_last_page());
        assert_eq!(
            pager
                .items()
                .iter()
                .map(|r| r.guid.clone())
                .collect::<Vec<_>>(),
            vec!["r1", "r2", "r3"]
        );
    }

    #[tokio::test]
    async fn test_load_more_past_last_page_is_a_no_op() {
        let source = StubSource::new(1);
        let (pager, _filters) = pager(source.clone());

        pager.reload().await.unwrap();
        pager.load_more().await.unwrap();

        assert_eq!(source.call_count(), 1);
        assert_eq!(pager.page(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_load_more_issues_exactly_one_request() {
        let source = StubSource::new(3);
        let (pager, _filters) = pager(source.clone());

        pager.reload().await.unwrap();
        assert_eq!(source.call_count(), 1);

        source.block();

        let first = tokio::spawn({
            let pager = pager.clone();
            async move { pager.load_more().await }
        });

        // Wait for the first load to acquire the guard and hit the source.
        while source.call_count() < 2 {
            tokio::task::yield_now().await;
        }

        // Second call while the first is outstanding: silently dropped.
        pager.load_more().await.unwrap();
        assert_eq!(source.call_count(), 2);

        source.release();
        first.await.unwrap().unwrap();

        assert_eq!(source.call_count(), 2);
        assert_eq!(pager.page(), 2);
        assert_eq!(pager.items().len(), 2);
    }

    #[tokio::test]
    async fn test_filter_change_resets_to_page_one_before_new_data_arrives() {
        let source = StubSource::new(5);
        let (pager, filters) = pager(source.clone());

        pager.reload().await.unwrap();
        pager.load_more().await.unwrap();
        pager.load_more().await.unwrap();
        assert_eq!(pager.page(), 3);
        assert_eq!(pager.items().len(), 3);

        let watcher = pager.spawn_filter_watcher();

        source.block();
        filters.update(|filter| filter.city = Some("Riga".to_string()));

        // Wait for the watcher's reload to reach the source.
        while source.call_count() < 4 {
            tokio::task::yield_now().await;
        }

        // Back on page 1 with an empty accumulated list while the new
        // page-1 request is still outstanding.
        assert_eq!(pager.page(), 1);
        assert!(pager.items().is_empty());

        source.release();
        while pager.items().is_empty() {
            tokio::task::yield_now().await;
        }
        assert_eq!(pager.items().len(), 1);

        watcher.abort();
    }

    #[tokio::test]
    async fn test_failed_fetch_clears_accumulated_list_and_releases_guard() {
        let source = StubSource::new(3);
        let (pager, _filters) = pager(source.clone());

        pager.reload().await.unwrap();
        assert_eq!(pager.items().len(), 1);

        source.fail_next();
        assert!(pager.load_more().await.is_err());
        assert!(pager.items().is_empty());

        // The guard was released, so the next reload goes through.
        pager.reload().await.unwrap();
        assert_eq!(pager.items().len(), 1);
    }
}
