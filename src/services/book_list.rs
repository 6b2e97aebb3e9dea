//! Paginated book list
//!
//! Drives one list screen: which source it reads, the accumulated pages, the
//! has-more flag and a local genre filter. Every fetch is tagged with the
//! generation and page it was issued for; a result whose tag no longer matches
//! the current state is dropped instead of applied.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::{sync::Mutex, task::JoinHandle};

use super::friends::FriendDirectory;
use crate::{
    client::ApiClient,
    error::ClientResult,
    models::BookEntry,
};

/// Which backing source a list reads from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListMode {
    Catalog,
    PersonalLibrary,
    Wishlist,
    /// Wishlist of an accepted friend, by profile id
    FriendWishlist(String),
}

impl ListMode {
    /// A friend's wishlist comes back whole; everything else is paged
    pub fn is_paginated(&self) -> bool {
        !matches!(self, ListMode::FriendWishlist(_))
    }
}

impl std::fmt::Display for ListMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListMode::Catalog => write!(f, "catalog"),
            ListMode::PersonalLibrary => write!(f, "library"),
            ListMode::Wishlist => write!(f, "wishlist"),
            ListMode::FriendWishlist(id) => write!(f, "wishlist of {}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListStatus {
    Idle,
    Loading { reset: bool },
    Loaded,
    Error(String),
}

/// What happened to a list operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The fetched page was applied to the list
    Applied,
    /// A newer query superseded the request; its result was dropped
    Stale,
    /// Nothing was requested (already loading, no more pages, or same mode)
    Skipped,
}

/// Where list pages come from
#[async_trait]
pub trait BookSource: Send + Sync {
    async fn fetch_page(&self, mode: &ListMode, page: u32, query: &str) -> ClientResult<Vec<BookEntry>>;

    async fn toggle_wishlist(&self, book_id: &str) -> ClientResult<()>;
}

#[async_trait]
impl BookSource for ApiClient {
    async fn fetch_page(&self, mode: &ListMode, page: u32, query: &str) -> ClientResult<Vec<BookEntry>> {
        let entries = match mode {
            ListMode::Catalog => into_entries(self.fetch_catalog(page, query).await?),
            ListMode::PersonalLibrary => into_entries(self.fetch_personal_books(page, false).await?),
            ListMode::Wishlist => into_entries(self.fetch_personal_books(page, true).await?),
            ListMode::FriendWishlist(friend_id) => {
                into_entries(FriendDirectory::new(self.clone()).wishlist(friend_id).await?)
            }
        };
        Ok(entries)
    }

    async fn toggle_wishlist(&self, book_id: &str) -> ClientResult<()> {
        ApiClient::toggle_wishlist(self, book_id).await
    }
}

fn into_entries<T: Into<BookEntry>>(items: Vec<T>) -> Vec<BookEntry> {
    items.into_iter().map(Into::into).collect()
}

/// Point-in-time view of a list for rendering
#[derive(Debug, Clone)]
pub struct ListSnapshot {
    pub mode: Option<ListMode>,
    pub status: ListStatus,
    pub page: u32,
    pub has_more: bool,
    pub query: String,
    pub genre: Option<String>,
    /// Accumulated entries after the genre filter
    pub visible: Vec<BookEntry>,
    /// Accumulated entries before the genre filter
    pub loaded: usize,
}

impl ListSnapshot {
    /// First page failed and there is nothing to show
    pub fn is_empty_error(&self) -> bool {
        matches!(self.status, ListStatus::Error(_)) && self.loaded == 0
    }
}

#[derive(Debug, Clone)]
struct PageRequest {
    generation: u64,
    page: u32,
    mode: ListMode,
    query: String,
    reset: bool,
}

#[derive(Debug)]
struct ListState {
    mode: Option<ListMode>,
    status: ListStatus,
    page: u32,
    items: Vec<BookEntry>,
    has_more: bool,
    query: String,
    genre: Option<String>,
    generation: u64,
    toggles: HashMap<String, PendingToggle>,
}

/// Wishlist toggles still in flight for one entry
#[derive(Debug)]
struct PendingToggle {
    /// Flag as last confirmed by the server
    confirmed: bool,
    in_flight: u32,
}

impl Default for ListState {
    fn default() -> Self {
        Self {
            mode: None,
            status: ListStatus::Idle,
            page: 1,
            items: Vec::new(),
            has_more: true,
            query: String::new(),
            genre: None,
            generation: 0,
            toggles: HashMap::new(),
        }
    }
}

impl ListState {
    fn is_loading(&self) -> bool {
        matches!(self.status, ListStatus::Loading { .. })
    }

    /// Start over at page 1; invalidates anything in flight
    fn begin_reset(&mut self, mode: ListMode, query: String) -> PageRequest {
        self.generation += 1;
        self.toggles.clear();
        self.page = 1;
        self.items.clear();
        self.has_more = true;
        self.query = query.clone();
        self.status = ListStatus::Loading { reset: true };
        PageRequest {
            generation: self.generation,
            page: 1,
            mode,
            query,
            reset: true,
        }
    }

    fn begin_next(&mut self) -> Option<PageRequest> {
        let mode = self.mode.clone()?;
        if self.is_loading() || !self.has_more {
            return None;
        }
        self.page += 1;
        self.status = ListStatus::Loading { reset: false };
        Some(PageRequest {
            generation: self.generation,
            page: self.page,
            mode,
            query: self.query.clone(),
            reset: false,
        })
    }

    fn complete(
        &mut self,
        request: &PageRequest,
        result: ClientResult<Vec<BookEntry>>,
        page_size: usize,
    ) -> ClientResult<LoadOutcome> {
        if request.generation != self.generation || request.page != self.page {
            tracing::debug!(
                "Dropping stale page {} of {} (generation {}, current {})",
                request.page,
                request.mode,
                request.generation,
                self.generation
            );
            return Ok(LoadOutcome::Stale);
        }

        match result {
            Ok(entries) => {
                let received = entries.len();
                if request.reset {
                    self.items.clear();
                }
                let mut seen: HashSet<String> = self.items.iter().map(|e| e.id().to_string()).collect();
                self.items
                    .extend(entries.into_iter().filter(|e| seen.insert(e.id().to_string())));

                self.has_more = request.mode.is_paginated() && received >= page_size;
                self.status = ListStatus::Loaded;
                tracing::debug!(
                    "Applied page {} of {}: {} received, {} loaded, has_more={}",
                    request.page,
                    request.mode,
                    received,
                    self.items.len(),
                    self.has_more
                );
                Ok(LoadOutcome::Applied)
            }
            Err(e) => {
                tracing::warn!("Page {} of {} failed: {}", request.page, request.mode, e);
                self.status = ListStatus::Error(e.to_string());
                self.has_more = false;
                if !request.reset {
                    self.page -= 1;
                }
                Err(e)
            }
        }
    }

    /// Record the outcome of one toggle; the last one to settle writes the
    /// confirmed flag back to the entry.
    fn settle_toggle(&mut self, generation: u64, book_id: &str, succeeded: bool) {
        if generation != self.generation {
            return;
        }
        let Some(pending) = self.toggles.get_mut(book_id) else {
            return;
        };
        pending.in_flight -= 1;
        if succeeded {
            pending.confirmed = !pending.confirmed;
        }
        if pending.in_flight > 0 {
            return;
        }

        let confirmed = pending.confirmed;
        self.toggles.remove(book_id);
        if let Some(entry) = self.items.iter_mut().find(|e| e.id() == book_id) {
            if entry.book().wished != confirmed {
                tracing::debug!("Reverting wishlist flag of {} to {}", book_id, confirmed);
                entry.book_mut().wished = confirmed;
            }
        }
    }

    fn visible(&self) -> Vec<BookEntry> {
        match &self.genre {
            Some(genre) => self
                .items
                .iter()
                .filter(|e| e.book().has_genre(genre))
                .cloned()
                .collect(),
            None => self.items.clone(),
        }
    }
}

/// State machine behind one paginated book list
#[derive(Clone)]
pub struct BookListController {
    source: Arc<dyn BookSource>,
    page_size: usize,
    state: Arc<Mutex<ListState>>,
}

impl BookListController {
    pub fn new(source: Arc<dyn BookSource>, page_size: u32) -> Self {
        Self {
            source,
            page_size: page_size.max(1) as usize,
            state: Arc::new(Mutex::new(ListState::default())),
        }
    }

    /// Load page 1 of `mode`. Repeated calls for the current mode do nothing,
    /// so returning to an already-loaded list does not refetch it.
    pub async fn initialize(&self, mode: ListMode) -> ClientResult<LoadOutcome> {
        let request = {
            let mut state = self.state.lock().await;
            if state.mode.as_ref() == Some(&mode) {
                return Ok(LoadOutcome::Skipped);
            }
            tracing::debug!("Initializing list for {}", mode);
            state.mode = Some(mode.clone());
            state.genre = None;
            state.begin_reset(mode, String::new())
        };
        self.run(request).await
    }

    /// Replace the query and reload from page 1
    pub async fn submit_query(&self, text: &str) -> ClientResult<LoadOutcome> {
        let request = {
            let mut state = self.state.lock().await;
            let Some(mode) = state.mode.clone() else {
                return Ok(LoadOutcome::Skipped);
            };
            state.begin_reset(mode, text.trim().to_string())
        };
        self.run(request).await
    }

    /// Reload the current query from page 1 (pull-to-refresh)
    pub async fn refresh(&self) -> ClientResult<LoadOutcome> {
        let request = {
            let mut state = self.state.lock().await;
            let Some(mode) = state.mode.clone() else {
                return Ok(LoadOutcome::Skipped);
            };
            let query = state.query.clone();
            state.begin_reset(mode, query)
        };
        self.run(request).await
    }

    /// Fetch and append the next page unless loading or exhausted
    pub async fn load_more(&self) -> ClientResult<LoadOutcome> {
        let request = match self.state.lock().await.begin_next() {
            Some(request) => request,
            None => return Ok(LoadOutcome::Skipped),
        };
        self.run(request).await
    }

    /// Local genre filter; `None` shows everything
    pub async fn set_genre_filter(&self, genre: Option<&str>) {
        let genre = genre.map(str::trim).filter(|g| !g.is_empty()).map(str::to_string);
        self.state.lock().await.genre = genre;
    }

    pub async fn snapshot(&self) -> ListSnapshot {
        let state = self.state.lock().await;
        ListSnapshot {
            mode: state.mode.clone(),
            status: state.status.clone(),
            page: state.page,
            has_more: state.has_more,
            query: state.query.clone(),
            genre: state.genre.clone(),
            visible: state.visible(),
            loaded: state.items.len(),
        }
    }

    pub async fn visible(&self) -> Vec<BookEntry> {
        self.state.lock().await.visible()
    }

    /// Drop an entry locally, e.g. after deleting it server-side
    pub async fn forget(&self, book_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let before = state.items.len();
        state.items.retain(|e| e.id() != book_id);
        state.items.len() != before
    }

    /// Swap in a re-fetched snapshot of an entry already in the list
    pub async fn replace(&self, entry: BookEntry) -> bool {
        let mut state = self.state.lock().await;
        match state.items.iter_mut().find(|e| e.id() == entry.id()) {
            Some(slot) => {
                *slot = entry;
                true
            }
            None => false,
        }
    }

    /// Flip the wishlist flag locally and send the toggle in the background.
    ///
    /// Returns `None` when the book is not in the list. Once every toggle sent
    /// for an entry has settled, its flag is set to what the server confirmed,
    /// so failed toggles are undone. A reset of the list drops that bookkeeping.
    pub async fn toggle_wishlist(&self, book_id: &str) -> Option<JoinHandle<ClientResult<()>>> {
        let generation = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            let entry = state.items.iter_mut().find(|e| e.id() == book_id)?;
            let book = entry.book_mut();
            let pending = state.toggles.entry(book_id.to_string()).or_insert(PendingToggle {
                confirmed: book.wished,
                in_flight: 0,
            });
            pending.in_flight += 1;
            book.wished = !book.wished;
            state.generation
        };

        let source = self.source.clone();
        let state = self.state.clone();
        let book_id = book_id.to_string();

        Some(tokio::spawn(async move {
            let result = source.toggle_wishlist(&book_id).await;
            if let Err(e) = &result {
                tracing::warn!("Wishlist toggle for {} failed: {}", book_id, e);
            }
            state
                .lock()
                .await
                .settle_toggle(generation, &book_id, result.is_ok());
            result
        }))
    }

    async fn run(&self, request: PageRequest) -> ClientResult<LoadOutcome> {
        let result = self
            .source
            .fetch_page(&request.mode, request.page, &request.query)
            .await;
        self.state.lock().await.complete(&request, result, self.page_size)
    }
}
