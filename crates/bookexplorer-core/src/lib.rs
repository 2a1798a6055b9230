//! All backend logic independent of how the app is run.
//!
//! Books the user keeps live in a local SQLite database; searches go to a
//! remote catalog. Both are injected into [BookCatalog], which owns the lists
//! the front end renders. Config and the database default to the app data
//! directory (see [app_data]).

pub mod app_data;
pub mod book;
pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod store;

pub use app_data::{app_data_dir, default_database_path};
pub use book::{Book, BookError, NO_DESCRIPTION, UNKNOWN_AUTHOR};
pub use catalog::{CatalogClient, CatalogError, GoogleBooksClient, ImageLinks, RemoteVolume};
pub use config::{config_path, load_config, save_config, Config, ConfigError};
pub use coordinator::{BookCatalog, CatalogOptions, CoordinatorError, SearchOutcome};
pub use store::{BookStore, SqliteBookStore, StoreError};

/// Returns a short status string. Used to verify the backend is wired up.
pub fn status() -> &'static str {
    "bookexplorer-core ready"
}
