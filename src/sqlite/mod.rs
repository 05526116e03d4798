/// SQLite support for the IMDb datasets
///
/// This module holds the fixed table definitions, the bulk TSV loader, and
/// the runner that executes the stored query and writes its results.
pub mod loader;
pub mod query;
pub mod schema;

pub use loader::{LoadError, LoadSummary, Loader};
pub use query::{QueryError, QueryRunner, QueryStats, MAX_QUERY_BYTES};
pub use schema::{Dataset, DATASETS};
