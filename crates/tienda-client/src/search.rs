//! # Debounced Search
//!
//! Search-as-you-type for the client and product pickers.
//!
//! ## Timeline
//! ```text
//! keystrokes:   a ─ ab ─ abc ──────────────┐
//!                                          │ pause ≥ debounce
//! timers:       ✗    ✗     ●───────────────┤
//!               (aborted)  (seq 3)         ▼
//! requests:                          search("abc") ──► publish if seq 3
//!                                                      is still the latest
//! ```
//!
//! Every input gets a sequence number. A newer input aborts the pending
//! task of the older one, timer or request, and a result that completes
//! anyway is dropped unless its sequence number is still the latest; the
//! check and the publish happen under the channel lock.
//! Queries shorter than the minimum clear the results without a request,
//! and queries that fail validation do the same with the error shown.

use futures_util::future::BoxFuture;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use tienda_core::validation::validate_search_query;
use tienda_core::{Client, Product};

use crate::config::WorkflowSettings;
use crate::error::ClientResult;
use crate::services::{ClientService, PageRequest, ProductService};

/// Products fetched per picker search.
const PRODUCT_PICKER_LIMIT: u64 = 200;

// =============================================================================
// Sources
// =============================================================================

/// Something that can answer a search query.
pub trait SearchSource: Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;

    fn search(&self, query: String) -> BoxFuture<'static, ClientResult<Vec<Self::Item>>>;
}

impl SearchSource for ClientService {
    type Item = Client;

    fn search(&self, query: String) -> BoxFuture<'static, ClientResult<Vec<Client>>> {
        let service = self.clone();
        Box::pin(async move { service.search(&query).await })
    }
}

impl SearchSource for ProductService {
    type Item = Product;

    fn search(&self, query: String) -> BoxFuture<'static, ClientResult<Vec<Product>>> {
        let service = self.clone();
        Box::pin(async move {
            let page = service
                .search(&query, PageRequest::new(0, PRODUCT_PICKER_LIMIT))
                .await?;
            Ok(page.items)
        })
    }
}

/// Adapts a closure into a [`SearchSource`].
pub struct FnSource<F>(pub F);

impl<F, T> SearchSource for FnSource<F>
where
    F: Fn(String) -> BoxFuture<'static, ClientResult<Vec<T>>> + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    type Item = T;

    fn search(&self, query: String) -> BoxFuture<'static, ClientResult<Vec<T>>> {
        (self.0)(query)
    }
}

// =============================================================================
// State
// =============================================================================

/// What the picker renders.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState<T> {
    /// Sequence number of the input this state belongs to.
    pub seq: u64,
    pub query: String,
    pub loading: bool,
    pub results: Vec<T>,
    pub error: Option<String>,
}

impl<T> SearchState<T> {
    fn idle(seq: u64, query: String) -> Self {
        SearchState {
            seq,
            query,
            loading: false,
            results: Vec::new(),
            error: None,
        }
    }

    /// A request for `query` finished, successfully or not.
    pub fn is_settled(&self) -> bool {
        !self.loading
    }
}

// =============================================================================
// Debounced Search
// =============================================================================

pub struct DebouncedSearch<S: SearchSource> {
    source: Arc<S>,
    delay: Duration,
    min_chars: usize,
    latest: Arc<AtomicU64>,
    pending: Mutex<Option<JoinHandle<()>>>,
    state: Arc<watch::Sender<SearchState<S::Item>>>,
}

impl<S: SearchSource> DebouncedSearch<S> {
    pub fn new(source: S, delay: Duration, min_chars: usize) -> Self {
        let (state, _) = watch::channel(SearchState::idle(0, String::new()));
        DebouncedSearch {
            source: Arc::new(source),
            delay,
            min_chars,
            latest: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
            state: Arc::new(state),
        }
    }

    pub fn with_settings(source: S, settings: &WorkflowSettings) -> Self {
        Self::new(source, settings.search_debounce(), settings.search_min_chars)
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState<S::Item>> {
        self.state.subscribe()
    }

    pub fn current(&self) -> SearchState<S::Item> {
        self.state.borrow().clone()
    }

    /// Records a keystroke. Must be called inside a Tokio runtime.
    pub fn input(&self, query: impl Into<String>) {
        let query = query.into();
        let seq = self.latest.fetch_add(1, Ordering::AcqRel) + 1;

        if let Some(previous) = self.pending_slot().take() {
            previous.abort();
        }

        if query.trim().chars().count() < self.min_chars {
            self.state.send_replace(SearchState::idle(seq, query));
            return;
        }
        let trimmed = match validate_search_query(&query) {
            Ok(trimmed) => trimmed,
            Err(e) => {
                self.state.send_replace(SearchState {
                    error: Some(e.to_string()),
                    ..SearchState::idle(seq, query)
                });
                return;
            }
        };

        let source = Arc::clone(&self.source);
        let latest = Arc::clone(&self.latest);
        let state = Arc::clone(&self.state);
        let delay = self.delay;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if latest.load(Ordering::Acquire) != seq {
                return;
            }

            let loading = SearchState {
                loading: true,
                ..SearchState::idle(seq, query.clone())
            };
            if !publish_if_latest(&state, &latest, seq, loading) {
                return;
            }
            debug!(seq, query = %query, "Search issued");

            let result = source.search(trimmed).await;
            let mut settled = SearchState::idle(seq, query);
            match result {
                Ok(results) => settled.results = results,
                Err(e) => settled.error = Some(e.user_message()),
            }
            if !publish_if_latest(&state, &latest, seq, settled) {
                debug!(seq, "Discarding stale search result");
            }
        });

        *self.pending_slot() = Some(handle);
    }

    /// Cancels any pending search and clears the results.
    pub fn clear(&self) {
        self.input(String::new());
    }

    fn pending_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Replaces the state only while `seq` is still the latest input.
///
/// `input` bumps `latest` before publishing, so a newer input either
/// lands before this check or overwrites what it published.
fn publish_if_latest<T>(
    state: &watch::Sender<SearchState<T>>,
    latest: &AtomicU64,
    seq: u64,
    next: SearchState<T>,
) -> bool {
    state.send_if_modified(|current| {
        if latest.load(Ordering::Acquire) != seq {
            return false;
        }
        *current = next;
        true
    })
}

impl<S: SearchSource> Drop for DebouncedSearch<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending_slot().take() {
            handle.abort();
        }
    }
}
