//! The book catalog: one place that owns what the front end shows.
//!
//! Holds two observable lists. `all_books` mirrors the local store and is rebuilt
//! after every mutation. `search_results` holds whatever the latest search found,
//! local matches for an empty query and remote volumes otherwise.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::book::Book;
use crate::catalog::{CatalogClient, CatalogError};
use crate::config::{Config, DEFAULT_MAX_RESULTS, DEFAULT_TIMEOUT_SECS};
use crate::store::{contains_pattern, BookStore, StoreError};

/// Knobs for remote searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogOptions {
    pub max_results: u32,
    /// Upper bound on a single remote search.
    pub timeout: Duration,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl From<&Config> for CatalogOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_results: config.max_results,
            timeout: config.request_timeout(),
        }
    }
}

/// What a search did to `search_results`.
#[derive(Debug)]
pub enum SearchOutcome {
    /// Local title match; holds the number of books found.
    Local(usize),
    /// Remote search succeeded; holds the number of volumes found.
    Remote(usize),
    /// Remote search failed. `search_results` was cleared, same as an empty answer.
    RemoteFailed(CatalogError),
    /// A newer search was issued while this one ran; its results were dropped.
    Superseded,
}

impl SearchOutcome {
    /// Number of books published, zero for failed or superseded searches.
    pub fn count(&self) -> usize {
        match self {
            SearchOutcome::Local(n) | SearchOutcome::Remote(n) => *n,
            SearchOutcome::RemoteFailed(_) | SearchOutcome::Superseded => 0,
        }
    }
}

/// Coordinates the local store and the remote catalog behind two observable lists.
pub struct BookCatalog {
    store: Arc<dyn BookStore>,
    remote: Arc<dyn CatalogClient>,
    options: CatalogOptions,
    all_books: watch::Sender<Vec<Book>>,
    search_results: watch::Sender<Vec<Book>>,
    /// Id of the most recently issued search.
    latest_search: AtomicU64,
}

impl BookCatalog {
    /// Build with default options and load `all_books` from the store.
    pub async fn new(
        store: Arc<dyn BookStore>,
        remote: Arc<dyn CatalogClient>,
    ) -> Result<Self, CoordinatorError> {
        Self::with_options(store, remote, CatalogOptions::default()).await
    }

    /// Build and load `all_books` from the store before returning.
    pub async fn with_options(
        store: Arc<dyn BookStore>,
        remote: Arc<dyn CatalogClient>,
        options: CatalogOptions,
    ) -> Result<Self, CoordinatorError> {
        let (all_books, _) = watch::channel(Vec::new());
        let (search_results, _) = watch::channel(Vec::new());
        let catalog = Self {
            store,
            remote,
            options,
            all_books,
            search_results,
            latest_search: AtomicU64::new(0),
        };
        catalog.refresh().await?;
        Ok(catalog)
    }

    pub fn options(&self) -> CatalogOptions {
        self.options
    }

    /// Snapshot of every stored book.
    pub fn all_books(&self) -> Vec<Book> {
        self.all_books.borrow().clone()
    }

    /// Snapshot of the latest search results.
    pub fn search_results(&self) -> Vec<Book> {
        self.search_results.borrow().clone()
    }

    pub fn subscribe_all_books(&self) -> watch::Receiver<Vec<Book>> {
        self.all_books.subscribe()
    }

    pub fn subscribe_search_results(&self) -> watch::Receiver<Vec<Book>> {
        self.search_results.subscribe()
    }

    /// Reload `all_books` from the store, replacing it wholesale.
    pub async fn refresh(&self) -> Result<(), CoordinatorError> {
        let books = self.store.get_all().await?;
        tracing::debug!(count = books.len(), "refreshed all books");
        self.all_books.send_replace(books);
        Ok(())
    }

    /// Empty query lists every stored book; anything else goes to the remote catalog.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome, CoordinatorError> {
        if query.is_empty() {
            self.search_locally("").await
        } else {
            Ok(self.search_online(query).await)
        }
    }

    /// Stored books whose title contains `fragment`.
    pub async fn search_locally(&self, fragment: &str) -> Result<SearchOutcome, CoordinatorError> {
        let ticket = self.next_search();
        let books = self.store.find_by_title(&contains_pattern(fragment)).await?;
        let count = books.len();
        if self.publish_search(ticket, books) {
            Ok(SearchOutcome::Local(count))
        } else {
            Ok(SearchOutcome::Superseded)
        }
    }

    /// Ask the remote catalog. Failures are logged and show up as an empty result list.
    pub async fn search_online(&self, query: &str) -> SearchOutcome {
        let ticket = self.next_search();
        let request = self.remote.search(query, self.options.max_results);
        let response = match tokio::time::timeout(self.options.timeout, request).await {
            Ok(response) => response,
            Err(_) => Err(CatalogError::Timeout(self.options.timeout)),
        };

        match response {
            Ok(volumes) => {
                let books: Vec<Book> = volumes.into_iter().map(Book::from).collect();
                let count = books.len();
                if self.publish_search(ticket, books) {
                    SearchOutcome::Remote(count)
                } else {
                    SearchOutcome::Superseded
                }
            }
            Err(e) => {
                tracing::warn!(query, error = %e, "online search failed");
                if self.publish_search(ticket, Vec::new()) {
                    SearchOutcome::RemoteFailed(e)
                } else {
                    SearchOutcome::Superseded
                }
            }
        }
    }

    /// Store a new book and reload. Returns the generated id. Duplicates are allowed.
    pub async fn save_book(&self, book: &Book) -> Result<i64, CoordinatorError> {
        let id = self.store.insert(book).await?;
        tracing::info!(id, title = %book.title, "saved book");
        self.refresh().await?;
        Ok(id)
    }

    /// Overwrite the stored book with `book.id` and reload. Zero rows touched is fine.
    pub async fn update_book(&self, book: &Book) -> Result<usize, CoordinatorError> {
        let rows = self.store.update(book).await?;
        tracing::info!(id = ?book.id, rows, "updated book");
        self.refresh().await?;
        Ok(rows)
    }

    /// Remove the stored book with `book.id` and reload. Zero rows touched is fine.
    pub async fn delete_book(&self, book: &Book) -> Result<usize, CoordinatorError> {
        let rows = self.store.delete(book).await?;
        tracing::info!(id = ?book.id, rows, "deleted book");
        self.refresh().await?;
        Ok(rows)
    }

    /// Stored book with the given id, from the current `all_books` snapshot.
    pub fn find_book(&self, id: i64) -> Option<Book> {
        self.all_books
            .borrow()
            .iter()
            .find(|b| b.id == Some(id))
            .cloned()
    }

    fn next_search(&self) -> u64 {
        self.latest_search.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Write `books` into `search_results` unless a newer search has been issued.
    fn publish_search(&self, ticket: u64, books: Vec<Book>) -> bool {
        self.search_results.send_if_modified(|current| {
            if self.latest_search.load(Ordering::SeqCst) != ticket {
                return false;
            }
            *current = books;
            true
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::catalog::RemoteVolume;
    use crate::store::SqliteBookStore;

    /// Remote catalog that blocks on `gate` for queries named "slow".
    #[derive(Default)]
    struct GatedCatalog {
        gate: Notify,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CatalogClient for GatedCatalog {
        async fn search(&self, query: &str, _max: u32) -> Result<Vec<RemoteVolume>, CatalogError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if query == "slow" {
                self.gate.notified().await;
            }
            Ok(vec![RemoteVolume {
                title: query.to_string(),
                ..RemoteVolume::default()
            }])
        }
    }

    /// Remote catalog that never answers.
    struct HungCatalog;

    #[async_trait]
    impl CatalogClient for HungCatalog {
        async fn search(&self, _q: &str, _max: u32) -> Result<Vec<RemoteVolume>, CatalogError> {
            std::future::pending().await
        }
    }

    async fn catalog_with(remote: Arc<dyn CatalogClient>, options: CatalogOptions) -> BookCatalog {
        let store = Arc::new(SqliteBookStore::open_in_memory().unwrap());
        BookCatalog::with_options(store, remote, options).await.unwrap()
    }

    #[tokio::test]
    async fn stale_search_does_not_overwrite_newer_one() {
        let remote = Arc::new(GatedCatalog::default());
        let catalog = catalog_with(remote.clone(), CatalogOptions::default()).await;

        let slow = catalog.search("slow");
        let fast = async {
            // Let the slow search register its ticket first.
            tokio::task::yield_now().await;
            let outcome = catalog.search("fast").await.unwrap();
            remote.gate.notify_one();
            outcome
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert!(matches!(fast, SearchOutcome::Remote(1)));
        assert!(matches!(slow.unwrap(), SearchOutcome::Superseded));
        let results = catalog.search_results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "fast");
        assert_eq!(remote.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn hung_remote_times_out_to_empty_results() {
        let options = CatalogOptions {
            timeout: Duration::from_millis(20),
            ..CatalogOptions::default()
        };
        let catalog = catalog_with(Arc::new(HungCatalog), options).await;

        let outcome = catalog.search("anything").await.unwrap();
        assert!(matches!(
            outcome,
            SearchOutcome::RemoteFailed(CatalogError::Timeout(_))
        ));
        assert!(catalog.search_results().is_empty());
    }

    #[tokio::test]
    async fn subscribers_see_mutations() {
        let catalog = catalog_with(Arc::new(GatedCatalog::default()), CatalogOptions::default()).await;
        let mut rx = catalog.subscribe_all_books();
        assert!(rx.borrow_and_update().is_empty());

        let id = catalog
            .save_book(&Book::new("Dune", "Frank Herbert", ""))
            .await
            .unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update()[0].id, Some(id));
        assert_eq!(catalog.find_book(id).map(|b| b.title), Some("Dune".to_string()));
    }

    #[test]
    fn options_follow_config() {
        let config = Config {
            max_results: 40,
            request_timeout_secs: 2,
            ..Config::default()
        };
        let options = CatalogOptions::from(&config);
        assert_eq!(options.max_results, 40);
        assert_eq!(options.timeout, Duration::from_secs(2));
    }
}
