//! moviedb library - loading and querying the IMDb datasets.
//!
//! The `moviedb` binary is a thin driver over this library. It resets the
//! database, loads every dataset with [`Loader`], and then runs the stored
//! query with [`QueryRunner`] each time the user asks for it.
//!
//! # Modules
//!
//! - [`config`] - Paths used by a run
//! - [`sqlite`] - Table definitions, bulk loader and query runner
//! - [`driver`] - Database lifecycle and the interactive prompt
//!
//! # Example
//!
//! ```no_run
//! use moviedb::{Loader, QueryRunner, DATASETS};
//! use rusqlite::Connection;
//! use std::path::Path;
//!
//! let conn = Connection::open("moviedb.sqlite").unwrap();
//! let loader = Loader::new(&conn);
//! for dataset in DATASETS {
//!     loader.load_dataset(dataset, Path::new("data")).unwrap();
//! }
//!
//! QueryRunner::new(&conn)
//!     .run(Path::new("query.txt"), Path::new("result.txt"))
//!     .unwrap();
//! ```

pub mod config;
pub mod driver;
pub mod sqlite;

pub use config::Config;
pub use sqlite::{
    Dataset, LoadError, LoadSummary, Loader, QueryError, QueryRunner, QueryStats, DATASETS,
};
