//! On-disk layout and append-only record logs.
//!
//! Every fetched artifact lives under one results directory:
//!
//! ```text
//! <results>/rest/repositories.csv      id,full_name
//! <results>/rest/repositories.cursor   last listed repository id
//! <results>/rest/contributions.csv     repository id,user id,contributions
//! <results>/rest/users.csv             id,login
//! <results>/rest/contributors.cursor   last processed repository id
//! <results>/rest/gephi/                nodes.csv, edges.csv
//! <results>/graphql/graphql_data.txt   one raw user node per line
//! <results>/graphql/page_cursors.txt   one search cursor per line
//! <results>/graphql/data.json          snapshot of graphql_data.txt
//! <results>/graphql/{users,repositories,contributions}.csv
//! <results>/graphql/gephi/             nodes.csv, edges.csv
//! ```
//!
//! The data logs are headerless and only ever appended to. Each page is
//! written with a single `write_all` followed by `sync_data`, so a crash can
//! lose at most the page in flight.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors raised by the file-backed stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {} (line {line}): {source}", path.display())]
    Json {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("malformed cursor in {}: {line:?}", path.display())]
    MalformedCursor { path: PathBuf, line: String },

    #[error("{} does not exist; run `{step}` first", path.display())]
    MissingPrerequisite { path: PathBuf, step: &'static str },
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether a prerequisite step has not been run yet.
    pub fn is_missing_prerequisite(&self) -> bool {
        matches!(self, Self::MissingPrerequisite { .. })
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Step names used in missing-prerequisite messages.
pub mod steps {
    pub const REST_REPOSITORIES: &str = "repograph rest repositories";
    pub const REST_CONTRIBUTORS: &str = "repograph rest contributors";
    pub const GRAPHQL_FETCH: &str = "repograph graphql fetch";
    pub const GRAPHQL_TABLES: &str = "repograph graphql tables";
    pub const GRAPH: &str = "repograph rest graph` or `repograph graphql graph";
}

/// Fail with [`StoreError::MissingPrerequisite`] unless `path` exists.
pub fn require(path: &Path, step: &'static str) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(StoreError::MissingPrerequisite {
            path: path.to_path_buf(),
            step,
        })
    }
}

/// Create the parent directory of `path` if needed.
pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    Ok(())
}

/// A set of derived CSV files replaced together.
///
/// Each file is written to a hidden `.<name>.tmp` sibling. Nothing is
/// renamed into place until [`commit`](Self::commit); dropping an
/// uncommitted set removes its temporaries and leaves the old files intact.
#[derive(Debug, Default)]
pub(crate) struct StagedFiles {
    /// (temporary, destination)
    staged: Vec<(PathBuf, PathBuf)>,
}

impl StagedFiles {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stage `rows` for `path`, preceded by `header` unless it is empty.
    pub(crate) fn csv<T: Serialize>(
        &mut self,
        path: &Path,
        header: &[&str],
        rows: &[T],
    ) -> Result<()> {
        ensure_parent(path)?;
        let temp = temp_sibling(path);
        self.staged.push((temp.clone(), path.to_path_buf()));

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&temp)
            .map_err(|e| StoreError::csv(path, e))?;
        if !header.is_empty() {
            writer
                .write_record(header)
                .map_err(|e| StoreError::csv(path, e))?;
        }
        for row in rows {
            writer.serialize(row).map_err(|e| StoreError::csv(path, e))?;
        }
        let file = writer
            .into_inner()
            .map_err(|e| StoreError::io(path, e.into_error()))?;
        file.sync_data().map_err(|e| StoreError::io(path, e))
    }

    /// Move every staged file over its destination.
    pub(crate) fn commit(mut self) -> Result<()> {
        for (temp, destination) in std::mem::take(&mut self.staged) {
            fs::rename(&temp, &destination).map_err(|e| StoreError::io(&destination, e))?;
        }
        Ok(())
    }
}

impl Drop for StagedFiles {
    fn drop(&mut self) {
        for (temp, _) in &self.staged {
            if let Err(e) = fs::remove_file(temp)
                && e.kind() != io::ErrorKind::NotFound
            {
                tracing::warn!(path = %temp.display(), error = %e, "Failed to remove staged file");
            }
        }
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

/// Append `bytes` to `path` in one write and flush it to disk.
pub(crate) fn append_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Ok(());
    }
    ensure_parent(path)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| StoreError::io(path, e))?;
    file.write_all(bytes).map_err(|e| StoreError::io(path, e))?;
    file.sync_data().map_err(|e| StoreError::io(path, e))
}

/// Paths of every artifact under one results directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsDir {
    root: PathBuf,
}

impl ResultsDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn rest(&self) -> PathBuf {
        self.root.join("rest")
    }

    pub fn graphql(&self) -> PathBuf {
        self.root.join("graphql")
    }

    pub fn rest_repositories(&self) -> PathBuf {
        self.rest().join("repositories.csv")
    }

    pub fn rest_repositories_cursor(&self) -> PathBuf {
        self.rest().join("repositories.cursor")
    }

    pub fn rest_contributions(&self) -> PathBuf {
        self.rest().join("contributions.csv")
    }

    pub fn rest_users(&self) -> PathBuf {
        self.rest().join("users.csv")
    }

    pub fn rest_contributors_cursor(&self) -> PathBuf {
        self.rest().join("contributors.cursor")
    }

    pub fn rest_gephi(&self) -> PathBuf {
        self.rest().join("gephi")
    }

    pub fn graphql_raw(&self) -> PathBuf {
        self.graphql().join("graphql_data.txt")
    }

    pub fn graphql_cursors(&self) -> PathBuf {
        self.graphql().join("page_cursors.txt")
    }

    pub fn graphql_snapshot(&self) -> PathBuf {
        self.graphql().join("data.json")
    }

    pub fn graphql_users(&self) -> PathBuf {
        self.graphql().join("users.csv")
    }

    pub fn graphql_repositories(&self) -> PathBuf {
        self.graphql().join("repositories.csv")
    }

    pub fn graphql_contributions(&self) -> PathBuf {
        self.graphql().join("contributions.csv")
    }

    pub fn graphql_gephi(&self) -> PathBuf {
        self.graphql().join("gephi")
    }
}

/// Append-only log holding one JSON document per line.
#[derive(Debug, Clone)]
pub struct JsonLinesLog {
    path: PathBuf,
}

impl JsonLinesLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append every record as its own line, in one write.
    pub fn append<T: Serialize>(&self, records: &[T]) -> Result<()> {
        let mut buf = Vec::new();
        for (i, record) in records.iter().enumerate() {
            serde_json::to_writer(&mut buf, record).map_err(|source| StoreError::Json {
                path: self.path.clone(),
                line: i + 1,
                source,
            })?;
            buf.push(b'\n');
        }
        append_bytes(&self.path, &buf)
    }

    /// Read every record; blank lines are skipped.
    pub fn read_all<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let file = File::open(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        let mut records = Vec::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| StoreError::io(&self.path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|source| StoreError::Json {
                path: self.path.clone(),
                line: i + 1,
                source,
            })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Rewrite the whole log as one JSON array at `destination`.
    ///
    /// Returns the number of records written.
    pub fn write_snapshot(&self, destination: &Path) -> Result<usize> {
        let records: Vec<serde_json::Value> = self.read_all()?;
        ensure_parent(destination)?;
        let bytes = serde_json::to_vec(&records).map_err(|source| StoreError::Json {
            path: destination.to_path_buf(),
            line: 0,
            source,
        })?;
        fs::write(destination, bytes).map_err(|e| StoreError::io(destination, e))?;
        Ok(records.len())
    }
}

/// Append-only headerless CSV log.
#[derive(Debug, Clone)]
pub struct CsvLog {
    path: PathBuf,
}

impl CsvLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Append `rows` in a single write.
    pub fn append<T: Serialize>(&self, rows: &[T]) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        for row in rows {
            writer
                .serialize(row)
                .map_err(|e| StoreError::csv(&self.path, e))?;
        }
        let bytes = writer.into_inner().map_err(|e| StoreError::Io {
            path: self.path.clone(),
            source: e.into_error(),
        })?;
        append_bytes(&self.path, &bytes)
    }

    /// Read every row, with fields trimmed. Rows may have varying widths.
    pub fn read_records(&self) -> Result<Vec<csv::StringRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| StoreError::csv(&self.path, e))?;
        reader
            .records()
            .map(|r| r.map_err(|e| StoreError::csv(&self.path, e)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn layout_matches_results_tree() {
        let dir = ResultsDir::new("/data/results");
        assert_eq!(
            dir.rest_repositories(),
            PathBuf::from("/data/results/rest/repositories.csv")
        );
        assert_eq!(
            dir.graphql_cursors(),
            PathBuf::from("/data/results/graphql/page_cursors.txt")
        );
        assert_eq!(
            dir.graphql_gephi(),
            PathBuf::from("/data/results/graphql/gephi")
        );
    }

    #[test]
    fn staged_files_replace_only_on_commit() {
        let tmp = TempDir::new().unwrap();
        let users = tmp.path().join("users.csv");
        fs::write(&users, "old\n").unwrap();

        let mut files = StagedFiles::new();
        files.csv(&users, &["id", "login"], &[(7, "octocat")]).unwrap();
        assert_eq!(fs::read_to_string(&users).unwrap(), "old\n");
        files.commit().unwrap();

        assert_eq!(fs::read_to_string(&users).unwrap(), "id,login\n7,octocat\n");
        assert!(!tmp.path().join(".users.csv.tmp").exists());
    }

    #[test]
    fn dropped_staged_files_leave_no_temporaries() {
        let tmp = TempDir::new().unwrap();
        let users = tmp.path().join("users.csv");

        let mut files = StagedFiles::new();
        files.csv(&users, &[], &[(7, "octocat")]).unwrap();
        drop(files);

        assert!(!users.exists());
        assert!(!tmp.path().join(".users.csv.tmp").exists());
    }

    #[test]
    fn require_names_the_missing_step() {
        let tmp = TempDir::new().unwrap();
        let err = require(&tmp.path().join("nope.csv"), steps::REST_REPOSITORIES).unwrap_err();
        assert!(err.is_missing_prerequisite());
        assert!(err.to_string().contains("repograph rest repositories"));
    }

    #[test]
    fn json_lines_append_and_snapshot() {
        let tmp = TempDir::new().unwrap();
        let dir = ResultsDir::new(tmp.path());
        let log = JsonLinesLog::new(dir.graphql_raw());

        log.append(&[json!({"id": "U1"}), json!({"id": "U2"})]).unwrap();
        log.append(&[json!({"id": "U3"})]).unwrap();

        let raw = fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw.lines().count(), 3);

        let count = log.write_snapshot(&dir.graphql_snapshot()).unwrap();
        assert_eq!(count, 3);
        let snapshot: serde_json::Value =
            serde_json::from_slice(&fs::read(dir.graphql_snapshot()).unwrap()).unwrap();
        assert_eq!(snapshot[2]["id"], "U3");
    }

    #[test]
    fn json_lines_reports_bad_line_number() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("raw.txt");
        fs::write(&path, "{\"id\":1}\n{oops\n").unwrap();

        let err = JsonLinesLog::new(&path)
            .read_all::<serde_json::Value>()
            .unwrap_err();
        assert!(matches!(err, StoreError::Json { line: 2, .. }));
    }

    #[test]
    fn csv_log_is_headerless_and_append_only() {
        let tmp = TempDir::new().unwrap();
        let log = CsvLog::new(tmp.path().join("rest/repositories.csv"));

        log.append(&[(1u64, "a/one"), (2, "b/two")]).unwrap();
        log.append(&[(3u64, "c/three")]).unwrap();

        let raw = fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw, "1,a/one\n2,b/two\n3,c/three\n");

        let rows = log.read_records().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[2][1], "c/three");
    }

    #[test]
    fn csv_log_trims_padded_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("users.csv");
        fs::write(&path, "7, octocat\n").unwrap();

        let rows = CsvLog::new(&path).read_records().unwrap();
        assert_eq!(&rows[0][1], "octocat");
    }

    #[test]
    fn empty_append_does_not_create_file() {
        let tmp = TempDir::new().unwrap();
        let log = CsvLog::new(tmp.path().join("x.csv"));
        log.append::<(u64, u64)>(&[]).unwrap();
        assert!(!log.exists());
    }
}
