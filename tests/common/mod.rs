//! Common test utilities for moviedb integration tests.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use moviedb::DATASETS;

/// Small `title.basics.tsv` with one NULL-able title and two 1994 titles.
pub const TITLE_BASICS: &str = "\
tconst\ttitleType\tprimaryTitle\toriginalTitle\tisAdult\tstartYear\tendYear\truntimeMinutes\tgenres
tt0109830\tmovie\tForrest Gump\tForrest Gump\t0\t1994\t\\N\t142\tDrama,Romance
tt0110912\tmovie\tPulp Fiction\tPulp Fiction\t0\t1994\t\\N\t154\tCrime,Drama
tt0133093\tmovie\tThe Matrix\tThe Matrix\t0\t1999\t\\N\t136\tAction,Sci-Fi
tt0111161\tmovie
";

/// Write every dataset under `root/data`. `title.basics.tsv` gets
/// [`TITLE_BASICS`]; every other file gets a header and `rows` generated rows.
pub fn write_datasets(root: &Path, rows: usize) {
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).expect("Failed to create data dir");

    for dataset in DATASETS {
        let path = dataset.source_path(&data_dir);
        if dataset.table == "title_basics" {
            fs::write(&path, TITLE_BASICS).expect("Failed to write title.basics.tsv");
            continue;
        }

        let header: Vec<String> = (0..dataset.columns).map(|c| format!("col{c}")).collect();
        let mut contents = header.join("\t");
        contents.push('\n');
        for row in 0..rows {
            let fields: Vec<String> = (0..dataset.columns)
                .map(|c| format!("{row}{c}"))
                .collect();
            contents.push_str(&fields.join("\t"));
            contents.push('\n');
        }
        fs::write(&path, contents).expect("Failed to write dataset");
    }
}

/// Run the moviedb binary in `dir`, feeding `stdin` to the prompt.
pub fn run_moviedb(dir: &Path, args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_moviedb"))
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to run moviedb");

    // The process may exit before reading stdin, so a broken pipe is fine
    if let Some(mut pipe) = child.stdin.take() {
        let _ = pipe.write_all(stdin.as_bytes());
    }

    child.wait_with_output().expect("Failed to wait for moviedb")
}

/// Row count of `table` in the database at `path`.
pub fn count_rows(path: &Path, table: &str) -> i64 {
    let conn = rusqlite::Connection::open(path).expect("Failed to open database");
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })
    .expect("Failed to count rows")
}
