//! Table definitions for the IMDb datasets
//!
//! Each dataset is a tab-separated file with a header line. The tables keep the
//! column names from the IMDb headers and declare SQLite affinities only; all
//! values are bound as text during the load and SQLite converts them where the
//! declared affinity allows it.

use std::path::{Path, PathBuf};

/// Static description of one input file and the table it is loaded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dataset {
    /// File name relative to the data directory
    pub file_name: &'static str,
    /// Destination table
    pub table: &'static str,
    /// Number of columns in the table (and expected fields per row)
    pub columns: usize,
    /// CREATE TABLE statement for `table`
    pub create_sql: &'static str,
}

impl Dataset {
    /// Full path of the source file inside `data_dir`.
    pub fn source_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(self.file_name)
    }
}

/// Build `INSERT INTO <table> VALUES (?1, ?2, ...)` for `columns` columns.
pub fn insert_sql(table: &str, columns: usize) -> String {
    let placeholders: Vec<String> = (1..=columns).map(|i| format!("?{i}")).collect();
    format!("INSERT INTO {} VALUES ({});", table, placeholders.join(", "))
}

/// All datasets, in load order.
pub static DATASETS: &[Dataset] = &[
    Dataset {
        file_name: "title.akas.tsv",
        table: "title_akas",
        columns: 8,
        create_sql: "CREATE TABLE title_akas (titleId TEXT, ordering INTEGER, title TEXT, \
                     region TEXT, language TEXT, types TEXT, attributes TEXT, \
                     isOriginalTitle INTEGER);",
    },
    Dataset {
        file_name: "title.basics.tsv",
        table: "title_basics",
        columns: 9,
        create_sql: "CREATE TABLE title_basics (tconst TEXT, titleType TEXT, primaryTitle TEXT, \
                     originalTitle TEXT, isAdult INTEGER, startYear TEXT, endYear TEXT, \
                     runtimeMinutes TEXT, genres TEXT);",
    },
    Dataset {
        file_name: "title.crew.tsv",
        table: "title_crew",
        columns: 3,
        create_sql: "CREATE TABLE title_crew (tconst TEXT, directors TEXT, writers TEXT);",
    },
    Dataset {
        file_name: "title.episode.tsv",
        table: "title_episode",
        columns: 4,
        create_sql: "CREATE TABLE title_episode (tconst TEXT, parentTconst TEXT, \
                     seasonNumber INTEGER, episodeNumber INTEGER);",
    },
    Dataset {
        file_name: "title.principals.tsv",
        table: "title_principals",
        columns: 6,
        create_sql: "CREATE TABLE title_principals (tconst TEXT, ordering INTEGER, nconst TEXT, \
                     category TEXT, job TEXT, characters TEXT);",
    },
    Dataset {
        file_name: "title.ratings.tsv",
        table: "title_ratings",
        columns: 3,
        create_sql: "CREATE TABLE title_ratings (tconst TEXT, averageRating REAL, \
                     numVotes INTEGER);",
    },
    Dataset {
        file_name: "name.basics.tsv",
        table: "name_basics",
        columns: 6,
        create_sql: "CREATE TABLE name_basics (nconst TEXT, primaryName TEXT, birthYear TEXT, \
                     deathYear TEXT, primaryProfession TEXT, knownForTitles TEXT);",
    },
];
