#![forbid(unsafe_code)]

pub mod catalog;
pub mod repository;
pub mod sqlite;

pub use catalog::{CatalogError, JsonCatalog};
pub use repository::{
    AttemptId, AttemptRepository, AttemptRow, ContentRepository, InMemoryRepository,
    ProgressRepository, Storage, StorageError,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
