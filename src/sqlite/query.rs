//! Running the stored query and writing its results
//!
//! The query file is read wholesale and prepared as a single statement. Every
//! result row is written to the result file as tab-separated column text, one
//! row per line, with `NULL` for SQL NULL values.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, Statement};
use thiserror::Error;
use tracing::debug;

/// Largest query file accepted, in bytes.
pub const MAX_QUERY_BYTES: u64 = 1 << 20;

/// Errors from running the stored query
#[derive(Error, Debug)]
pub enum QueryError {
    /// The query file could not be read or the result file could not be created
    #[error("Cannot open {}: {error}", path.display())]
    FileOpen { path: PathBuf, error: io::Error },

    /// The query file exceeds `MAX_QUERY_BYTES`
    #[error("Query file {} is {size} bytes, the limit is {limit} bytes", path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    /// The query file holds no SQL
    #[error("Query file {} is empty", path.display())]
    EmptyQuery { path: PathBuf },

    /// The SQL could not be prepared
    #[error("Failed to prepare query: {error}")]
    Prepare { error: rusqlite::Error },

    /// Stepping through the result rows failed
    #[error("Failed to execute query: {error}")]
    Execution { error: rusqlite::Error },

    /// Writing the result file failed
    #[error("Failed to write results to {}: {error}", path.display())]
    Write { path: PathBuf, error: io::Error },
}

/// Shape of a completed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryStats {
    pub rows: u64,
    pub columns: usize,
}

/// Read the whole query file, refusing files over `MAX_QUERY_BYTES`.
pub fn read_query(path: &Path) -> Result<String, QueryError> {
    let open_err = |error| QueryError::FileOpen {
        path: path.to_path_buf(),
        error,
    };

    let size = fs::metadata(path).map_err(open_err)?.len();
    if size > MAX_QUERY_BYTES {
        return Err(QueryError::TooLarge {
            path: path.to_path_buf(),
            size,
            limit: MAX_QUERY_BYTES,
        });
    }

    let sql = fs::read_to_string(path).map_err(open_err)?;
    if sql.trim().is_empty() {
        return Err(QueryError::EmptyQuery {
            path: path.to_path_buf(),
        });
    }
    Ok(sql)
}

/// SQLite's own text for a REAL value, e.g. `7.0`, `0.3` or `1.0e+20`.
///
/// The conversion is done by the engine so the output is byte-for-byte what
/// `sqlite3_column_text` produces.
pub fn real_to_text(conn: &Connection, n: f64) -> rusqlite::Result<String> {
    let mut stmt = conn.prepare_cached("SELECT CAST(?1 AS TEXT)")?;
    let text: Option<String> = stmt.query_row([n], |row| row.get(0))?;
    Ok(text.unwrap_or_else(|| "NULL".to_string()))
}

/// Write one result column as text; `NULL` for SQL NULL, raw bytes otherwise.
fn write_value<W: Write>(
    out: &mut W,
    conn: &Connection,
    value: ValueRef<'_>,
    result_file: &Path,
) -> Result<(), QueryError> {
    let written = match value {
        ValueRef::Null => out.write_all(b"NULL"),
        ValueRef::Integer(n) => write!(out, "{n}"),
        ValueRef::Real(n) => {
            let text = real_to_text(conn, n).map_err(|error| QueryError::Execution { error })?;
            out.write_all(text.as_bytes())
        }
        ValueRef::Text(s) | ValueRef::Blob(s) => out.write_all(s),
    };
    written.map_err(|error| QueryError::Write {
        path: result_file.to_path_buf(),
        error,
    })
}

/// Runs query files against a borrowed connection.
pub struct QueryRunner<'conn> {
    conn: &'conn Connection,
}

impl<'conn> QueryRunner<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Execute the SQL in `query_file` and overwrite `result_file` with its rows.
    pub fn run(&self, query_file: &Path, result_file: &Path) -> Result<QueryStats, QueryError> {
        let sql = read_query(query_file)?;
        println!("Executing query: {sql}");

        let mut stmt = self
            .conn
            .prepare(sql.trim_end())
            .map_err(|error| QueryError::Prepare { error })?;

        let file = File::create(result_file).map_err(|error| QueryError::FileOpen {
            path: result_file.to_path_buf(),
            error,
        })?;
        let mut out = BufWriter::new(file);

        let stats = write_rows(self.conn, &mut stmt, &mut out, result_file)?;
        out.flush().map_err(|error| QueryError::Write {
            path: result_file.to_path_buf(),
            error,
        })?;

        debug!(
            "Wrote {} rows of {} columns to {}",
            stats.rows,
            stats.columns,
            result_file.display()
        );
        Ok(stats)
    }
}

fn write_rows<W: Write>(
    conn: &Connection,
    stmt: &mut Statement<'_>,
    out: &mut W,
    result_file: &Path,
) -> Result<QueryStats, QueryError> {
    let write_err = |error| QueryError::Write {
        path: result_file.to_path_buf(),
        error,
    };

    let columns = stmt.column_count();
    let mut rows = stmt
        .query([])
        .map_err(|error| QueryError::Execution { error })?;

    let mut count = 0;
    while let Some(row) = rows
        .next()
        .map_err(|error| QueryError::Execution { error })?
    {
        for i in 0..columns {
            let value = row
                .get_ref(i)
                .map_err(|error| QueryError::Execution { error })?;
            write_value(out, conn, value, result_file)?;
            let sep: &[u8] = if i + 1 < columns { b"\t" } else { b"\n" };
            out.write_all(sep).map_err(write_err)?;
        }
        count += 1;
    }

    Ok(QueryStats {
        rows: count,
        columns,
    })
}
