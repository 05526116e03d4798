//! Bulk loading of tab-separated files into SQLite
//!
//! `Loader` creates the destination table and inserts every data row of a
//! TSV file inside a single transaction. The connection is switched to a
//! relaxed durability mode for the duration of the load and restored after.
//!
//! Rows that fail to insert are logged and counted in the returned
//! [`LoadSummary`]; they never abort the load.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::sqlite::schema::{insert_sql, Dataset};

/// Number of progress updates printed over a whole file
const PROGRESS_UPDATES: u64 = 1000;

/// Errors that abort a load
#[derive(Error, Debug)]
pub enum LoadError {
    /// The source file could not be opened
    #[error("Cannot open file: {}: {error}", path.display())]
    FileOpen { path: PathBuf, error: io::Error },

    /// Reading the source file failed part way through
    #[error("Failed to read {}: {error}", path.display())]
    Read { path: PathBuf, error: io::Error },

    /// The CREATE TABLE statement failed
    #[error("SQL error creating table {table}: {error}")]
    SchemaCreate {
        table: String,
        error: rusqlite::Error,
    },

    /// The INSERT statement could not be prepared
    #[error("Failed to prepare statement for {table}: {error}")]
    StatementPrepare {
        table: String,
        error: rusqlite::Error,
    },

    /// The file has no data rows after the header
    #[error("No data rows in file: {}", path.display())]
    EmptyFile { path: PathBuf },

    /// BEGIN or COMMIT failed
    #[error("Transaction failed while loading {table}: {error}")]
    Transaction {
        table: String,
        error: rusqlite::Error,
    },
}

/// Outcome of a completed load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub table: String,
    /// Data rows found in the file (header excluded)
    pub total_rows: u64,
    /// Rows inserted successfully
    pub inserted: u64,
    /// Rows whose INSERT failed
    pub failed: u64,
    /// Rows whose field count did not match the table's column count
    pub malformed: u64,
    /// Data row number (1-based, header excluded) and message of the first failed row
    pub first_error: Option<(u64, String)>,
}

impl LoadSummary {
    fn new(table: &str, total_rows: u64) -> Self {
        Self {
            table: table.to_string(),
            total_rows,
            ..Self::default()
        }
    }

    fn record_failure(&mut self, line: u64, message: String) {
        self.failed += 1;
        if self.first_error.is_none() {
            self.first_error = Some((line, message));
        }
    }

    /// True when every data row was inserted
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.inserted == self.total_rows
    }
}

/// Throttles the percentage indicator to roughly `PROGRESS_UPDATES` prints.
#[derive(Debug, Clone, Copy)]
struct Progress {
    total: u64,
    step: u64,
}

impl Progress {
    fn new(total: u64) -> Self {
        Self {
            total,
            step: total / PROGRESS_UPDATES + 1,
        }
    }

    fn should_report(&self, current: u64) -> bool {
        current % self.step == 0 || current == self.total
    }

    fn percent(&self, current: u64) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        current as f64 / self.total as f64 * 100.0
    }

    fn report(&self, current: u64) {
        if self.should_report(current) {
            let mut stdout = io::stdout().lock();
            let _ = write!(stdout, "\rLoading: {:.2}%", self.percent(current));
            let _ = stdout.flush();
        }
    }
}

/// Loads TSV files into tables of a borrowed connection.
pub struct Loader<'conn> {
    conn: &'conn Connection,
}

impl<'conn> Loader<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Load one of the fixed datasets from `data_dir`.
    pub fn load_dataset(
        &self,
        dataset: &Dataset,
        data_dir: &Path,
    ) -> Result<LoadSummary, LoadError> {
        self.load(
            &dataset.source_path(data_dir),
            dataset.table,
            dataset.create_sql,
            dataset.columns,
        )
    }

    /// Create `table` with `create_sql` and insert every data row of `source`.
    ///
    /// The first line of the file is a header and is skipped. Each remaining
    /// line is split on tabs; the first `columns` fields are bound in order,
    /// missing trailing fields are stored as NULL and extra fields are
    /// dropped.
    pub fn load(
        &self,
        source: &Path,
        table: &str,
        create_sql: &str,
        columns: usize,
    ) -> Result<LoadSummary, LoadError> {
        let file = File::open(source).map_err(|error| LoadError::FileOpen {
            path: source.to_path_buf(),
            error,
        })?;
        let mut reader = BufReader::new(file);

        self.conn
            .execute_batch(create_sql)
            .map_err(|error| LoadError::SchemaCreate {
                table: table.to_string(),
                error,
            })?;

        self.set_bulk_mode(true);
        let result = self.insert_rows(&mut reader, source, table, columns);
        self.set_bulk_mode(false);

        if let Ok(summary) = &result {
            info!(
                "Loaded {}: {} of {} rows inserted, {} failed, {} malformed",
                summary.table,
                summary.inserted,
                summary.total_rows,
                summary.failed,
                summary.malformed
            );
        }
        result
    }

    /// Runs inside one transaction; any early return rolls it back.
    fn insert_rows<R: BufRead + Seek>(
        &self,
        reader: &mut R,
        source: &Path,
        table: &str,
        columns: usize,
    ) -> Result<LoadSummary, LoadError> {
        let read_err = |error| LoadError::Read {
            path: source.to_path_buf(),
            error,
        };
        let tx_err = |error| LoadError::Transaction {
            table: table.to_string(),
            error,
        };

        let tx = self.conn.unchecked_transaction().map_err(tx_err)?;

        let mut line = Vec::new();
        if reader.read_until(b'\n', &mut line).map_err(read_err)? == 0 {
            return Err(LoadError::EmptyFile {
                path: source.to_path_buf(),
            });
        }

        let data_start = reader.stream_position().map_err(read_err)?;
        let total = count_lines(reader).map_err(read_err)?;
        if total == 0 {
            return Err(LoadError::EmptyFile {
                path: source.to_path_buf(),
            });
        }
        reader
            .seek(SeekFrom::Start(data_start))
            .map_err(read_err)?;

        let mut stmt = tx
            .prepare(&insert_sql(table, columns))
            .map_err(|error| LoadError::StatementPrepare {
                table: table.to_string(),
                error,
            })?;

        println!("Loading table {table} with {total} entries:");

        let progress = Progress::new(total);
        let mut summary = LoadSummary::new(table, total);
        let mut current = 0u64;

        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line).map_err(read_err)? == 0 {
                break;
            }
            current += 1;

            let (fields, found) = split_fields(strip_line_terminator(&line), columns);
            if found != columns {
                summary.malformed += 1;
                debug!(
                    "{}: row {} has {} fields, expected {}",
                    table,
                    current,
                    found,
                    columns
                );
            }

            // Bytes are bound as TEXT unchanged, valid UTF-8 or not
            let values = fields
                .iter()
                .map(|field| field.map(|bytes| ToSqlOutput::Borrowed(ValueRef::Text(bytes))));
            match stmt.execute(params_from_iter(values)) {
                Ok(_) => summary.inserted += 1,
                Err(e) => {
                    warn!("Execution failed on {} row {}: {}", table, current, e);
                    summary.record_failure(current, e.to_string());
                }
            }

            progress.report(current);
        }

        println!("\nFinished loading {table}");

        drop(stmt);
        tx.commit().map_err(tx_err)?;

        Ok(summary)
    }

    /// Toggle the relaxed durability settings used during a load. Failures
    /// only cost speed or durability, so they are logged and ignored.
    fn set_bulk_mode(&self, enabled: bool) {
        let (synchronous, journal_mode) = if enabled {
            ("OFF", "MEMORY")
        } else {
            ("FULL", "DELETE")
        };

        if let Err(e) = self.conn.pragma_update(None, "synchronous", synchronous) {
            warn!("Failed to set synchronous = {}: {}", synchronous, e);
        }

        match self
            .conn
            .pragma_update_and_check(None, "journal_mode", journal_mode, |row| {
                row.get::<_, String>(0)
            }) {
            Ok(mode) => debug!("journal_mode is now {}", mode),
            Err(e) => warn!("Failed to set journal_mode = {}: {}", journal_mode, e),
        }
    }
}

/// Count the remaining lines of `reader`, including a final unterminated one.
fn count_lines<R: BufRead>(reader: &mut R) -> io::Result<u64> {
    let mut count = 0;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(count);
        }
        count += 1;
    }
}

fn strip_line_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Split a line into exactly `columns` bind values.
///
/// Returns the values and the number of fields actually present in the line.
fn split_fields(line: &[u8], columns: usize) -> (Vec<Option<&[u8]>>, usize) {
    let mut fields: Vec<Option<&[u8]>> = Vec::with_capacity(columns);
    let mut found = 0;
    for field in line.split(|&b| b == b'\t') {
        found += 1;
        if fields.len() < columns {
            fields.push(Some(field));
        }
    }
    fields.resize(columns, None);
    (fields, found)
}
