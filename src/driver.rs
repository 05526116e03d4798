//! Database lifecycle and the interactive query prompt.
//!
//! A run either starts from a fresh database and loads every dataset, or
//! (with `preserve` set) reuses the existing file untouched. It then asks the
//! user whether to run the stored query until they decline.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::config::Config;
use crate::sqlite::{LoadSummary, Loader, QueryRunner, DATASETS};

const PROMPT: &str = "Type 'y' to execute the stored query, or 'n' to exit the program: ";

/// A line of user input at the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Run,
    Exit,
    Invalid,
}

impl Choice {
    /// Only the trailing newline is removed; everything else must match exactly.
    pub fn parse(line: &str) -> Self {
        match line.strip_suffix('\n').unwrap_or(line) {
            "y" => Choice::Run,
            "n" => Choice::Exit,
            _ => Choice::Invalid,
        }
    }
}

/// Delete the database file if it exists.
pub fn reset_database(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!("Deleted existing database {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| {
            format!("Failed to delete existing database {}", path.display())
        }),
    }
}

/// Open the database for a run, deleting any previous file unless preserving.
pub fn open_database(config: &Config) -> Result<Connection> {
    if !config.preserve {
        reset_database(&config.database)?;
    }
    Connection::open(&config.database)
        .with_context(|| format!("Can't open database {}", config.database.display()))
}

/// Load every dataset from `data_dir`, stopping at the first failure.
pub fn load_datasets(conn: &Connection, data_dir: &Path) -> Result<Vec<LoadSummary>> {
    let loader = Loader::new(conn);
    DATASETS
        .iter()
        .map(|dataset| {
            let summary = loader
                .load_dataset(dataset, data_dir)
                .with_context(|| format!("Failed to load {} into database", dataset.file_name))?;
            if !summary.is_complete() {
                if let Some((row, message)) = &summary.first_error {
                    warn!(
                        "{} of {} rows failed to load into {}; first failure at row {}: {}",
                        summary.failed, summary.total_rows, summary.table, row, message
                    );
                }
            }
            Ok(summary)
        })
        .collect()
}

/// Prompt until the user answers `n` or input ends.
///
/// `run_query` is called for every `y`; its wall-clock time is reported on
/// `output`. An error from `run_query` ends the loop and is returned. Returns
/// the number of queries run.
pub fn prompt_loop<R, W, F>(input: &mut R, output: &mut W, mut run_query: F) -> Result<u32>
where
    R: BufRead,
    W: Write,
    F: FnMut() -> Result<()>,
{
    let mut runs = 0;
    let mut line = String::new();

    loop {
        write!(output, "{PROMPT}")?;
        output.flush()?;

        line.clear();
        match input.read_line(&mut line) {
            Ok(0) => {
                writeln!(output)?;
                writeln!(output, "Exiting the program.")?;
                break;
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                writeln!(output, "Error reading input.")?;
                continue;
            }
            Err(e) => return Err(e).context("Failed to read from stdin"),
        }

        match Choice::parse(&line) {
            Choice::Run => {
                let start = Instant::now();
                run_query()?;
                let elapsed = start.elapsed().as_secs_f64();
                info!("Query finished in {:.6}s", elapsed);
                writeln!(output, "Query executed in {elapsed:.6} seconds")?;
                runs += 1;
            }
            Choice::Exit => {
                writeln!(output, "Exiting the program.")?;
                break;
            }
            Choice::Invalid => {
                writeln!(output, "Invalid input. Please enter 'y' or 'n'.")?;
            }
        }
    }

    Ok(runs)
}

/// Run the whole program against `config`, reading answers from stdin.
pub fn run(config: &Config) -> Result<()> {
    let conn = open_database(config)?;

    if !config.preserve {
        load_datasets(&conn, &config.data_dir)?;
    }

    let runner = QueryRunner::new(&conn);
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    prompt_loop(&mut input, &mut output, || {
        runner
            .run(&config.query_file, &config.result_file)
            .context("Failed to execute query and write results")?;
        Ok(())
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn run_prompt(input: &str) -> (u32, String) {
        let mut input = Cursor::new(input.as_bytes().to_vec());
        let mut output = Vec::new();
        let runs = prompt_loop(&mut input, &mut output, || Ok(())).unwrap();
        (runs, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_choice_parse() {
        assert_eq!(Choice::parse("y\n"), Choice::Run);
        assert_eq!(Choice::parse("n\n"), Choice::Exit);
        assert_eq!(Choice::parse("n"), Choice::Exit);
        assert_eq!(Choice::parse("Y\n"), Choice::Invalid);
        assert_eq!(Choice::parse(" y\n"), Choice::Invalid);
        assert_eq!(Choice::parse("yes\n"), Choice::Invalid);
        assert_eq!(Choice::parse("\n"), Choice::Invalid);
    }

    #[test]
    fn test_prompt_runs_until_no() {
        let (runs, output) = run_prompt("y\nmaybe\ny\nn\ny\n");
        assert_eq!(runs, 2);
        assert_eq!(output.matches(PROMPT).count(), 4);
        assert_eq!(output.matches("Query executed in ").count(), 2);
        assert_eq!(output.matches("Invalid input. Please enter 'y' or 'n'.").count(), 1);
        assert!(output.ends_with("Exiting the program.\n"));
    }

    #[test]
    fn test_prompt_stops_at_end_of_input() {
        let (runs, output) = run_prompt("y\n");
        assert_eq!(runs, 1);
        assert!(output.ends_with("Exiting the program.\n"));
    }

    #[test]
    fn test_prompt_query_error_is_fatal() {
        let mut input = Cursor::new(b"y\ny\nn\n".to_vec());
        let mut output = Vec::new();
        let mut calls = 0;
        let err = prompt_loop(&mut input, &mut output, || {
            calls += 1;
            anyhow::bail!("no such table: title_basics")
        })
        .unwrap_err();

        assert_eq!(calls, 1);
        assert!(err.to_string().contains("no such table"));
    }

    #[test]
    fn test_reset_database() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("moviedb.sqlite");

        // Missing file is fine
        reset_database(&path).unwrap();

        fs::write(&path, b"old").unwrap();
        reset_database(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_open_database_preserve() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::rooted_at(dir.path());

        {
            let conn = open_database(&config).unwrap();
            conn.execute_batch("CREATE TABLE kept (x TEXT); INSERT INTO kept VALUES ('a');")
                .unwrap();
        }

        config.preserve = true;
        {
            let conn = open_database(&config).unwrap();
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM kept", [], |row| row.get(0))
                .unwrap();
            assert_eq!(count, 1);
        }

        config.preserve = false;
        let conn = open_database(&config).unwrap();
        let tables: i64 = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get(0))
            .unwrap();
        assert_eq!(tables, 0, "Database should be recreated empty");
    }

    #[test]
    fn test_load_datasets_stops_at_first_failure() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("data");
        fs::create_dir(&data_dir).unwrap();
        // Only the first dataset exists
        fs::write(
            data_dir.join(DATASETS[0].file_name),
            "titleId\tordering\ttitle\tregion\tlanguage\ttypes\tattributes\tisOriginalTitle\n\
             tt0000001\t1\tCarmencita\tUS\t\\N\t\\N\t\\N\t0\n",
        )
        .unwrap();
        let conn = Connection::open_in_memory().unwrap();

        let err = load_datasets(&conn, &data_dir).unwrap_err();
        let message = format!("{err:#}");
        assert!(
            message.contains("Failed to load title.basics.tsv into database"),
            "unexpected error: {message}"
        );

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(tables, vec!["title_akas"]);
    }
}
