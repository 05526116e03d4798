//! Runtime configuration for a moviedb run.

use std::path::{Path, PathBuf};

/// Paths and options used by the driver.
///
/// All paths default to fixed locations relative to the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// SQLite database file
    pub database: PathBuf,
    /// Directory holding the dataset TSV files
    pub data_dir: PathBuf,
    /// File holding the stored query
    pub query_file: PathBuf,
    /// File the query results are written to
    pub result_file: PathBuf,
    /// Reuse the existing database instead of deleting and reloading it
    pub preserve: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database: PathBuf::from("moviedb.sqlite"),
            data_dir: PathBuf::from("data"),
            query_file: PathBuf::from("query.txt"),
            result_file: PathBuf::from("result.txt"),
            preserve: false,
        }
    }
}

impl Config {
    /// Default configuration with every path placed under `root`.
    pub fn rooted_at(root: &Path) -> Self {
        let defaults = Config::default();
        Config {
            database: root.join(defaults.database),
            data_dir: root.join(defaults.data_dir),
            query_file: root.join(defaults.query_file),
            result_file: root.join(defaults.result_file),
            preserve: defaults.preserve,
        }
    }
}
