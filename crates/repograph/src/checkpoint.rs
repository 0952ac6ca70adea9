//! Durable fetch progress.
//!
//! A checkpoint file holds one cursor per line and is only ever appended to.
//! The last non-empty line is the resume point; earlier lines are history.

use std::fmt;
use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::store::{StoreError, append_bytes};

/// A resumable position in a paginated result set.
pub trait Cursor: Sized + Clone + PartialEq + fmt::Debug + Send + Sync {
    /// Single-line text form written to the checkpoint file.
    fn encode(&self) -> String;

    /// Parse a line written by [`encode`](Self::encode).
    fn decode(line: &str) -> Option<Self>;
}

/// Opaque GraphQL pagination cursor, used verbatim as `after`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageCursor(pub String);

impl PageCursor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Cursor for PageCursor {
    fn encode(&self) -> String {
        self.0.clone()
    }

    fn decode(line: &str) -> Option<Self> {
        let line = line.trim();
        (!line.is_empty() && !line.contains(char::is_whitespace)).then(|| Self(line.to_string()))
    }
}

/// Numeric REST repository id, used as an exclusive lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepositoryId(pub u64);

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Cursor for RepositoryId {
    fn encode(&self) -> String {
        self.0.to_string()
    }

    fn decode(line: &str) -> Option<Self> {
        line.trim().parse().ok().map(Self)
    }
}

/// Append-only cursor log.
#[derive(Debug, Clone)]
pub struct CheckpointStore<C> {
    path: PathBuf,
    _cursor: PhantomData<fn() -> C>,
}

impl<C: Cursor> CheckpointStore<C> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _cursor: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The most recently written cursor.
    ///
    /// A missing or empty file means "no checkpoint". A last line that does
    /// not parse is an error rather than a silent restart from scratch.
    pub fn last_cursor(&self) -> Result<Option<C>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        let Some(line) = contents.lines().rev().find(|l| !l.trim().is_empty()) else {
            return Ok(None);
        };

        C::decode(line)
            .map(Some)
            .ok_or_else(|| StoreError::MalformedCursor {
                path: self.path.clone(),
                line: line.to_string(),
            })
    }

    /// Append one cursor line and flush it to disk.
    pub fn append(&self, cursor: &C) -> Result<(), StoreError> {
        let mut line = cursor.encode();
        line.push('\n');
        append_bytes(&self.path, line.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_no_checkpoint() {
        let tmp = TempDir::new().unwrap();
        let store: CheckpointStore<PageCursor> = CheckpointStore::new(tmp.path().join("none.txt"));
        assert_eq!(store.last_cursor().unwrap(), None);
    }

    #[test]
    fn empty_file_is_no_checkpoint() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("page_cursors.txt");
        fs::write(&path, "\n\n").unwrap();

        let store: CheckpointStore<PageCursor> = CheckpointStore::new(&path);
        assert_eq!(store.last_cursor().unwrap(), None);
    }

    #[test]
    fn last_line_wins_and_history_is_kept() {
        let tmp = TempDir::new().unwrap();
        let store: CheckpointStore<RepositoryId> =
            CheckpointStore::new(tmp.path().join("rest/repositories.cursor"));

        store.append(&RepositoryId(10)).unwrap();
        store.append(&RepositoryId(25)).unwrap();
        assert_eq!(store.last_cursor().unwrap(), Some(RepositoryId(25)));

        let raw = fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, "10\n25\n");
    }

    #[test]
    fn reopened_store_sees_previous_appends() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("page_cursors.txt");

        CheckpointStore::<PageCursor>::new(&path)
            .append(&PageCursor("Y3Vyc29yOjE=".into()))
            .unwrap();
        let reopened = CheckpointStore::<PageCursor>::new(&path);
        assert_eq!(
            reopened.last_cursor().unwrap(),
            Some(PageCursor("Y3Vyc29yOjE=".into()))
        );
    }

    #[test]
    fn unparsable_last_line_is_malformed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("repositories.cursor");
        fs::write(&path, "12\nabc\n").unwrap();

        let err = CheckpointStore::<RepositoryId>::new(&path)
            .last_cursor()
            .unwrap_err();
        assert!(matches!(err, StoreError::MalformedCursor { ref line, .. } if line == "abc"));
    }

    #[test]
    fn trailing_newline_is_not_part_of_cursor() {
        assert_eq!(
            PageCursor::decode("abc==\r"),
            Some(PageCursor("abc==".into()))
        );
        assert_eq!(RepositoryId::decode(" 42 "), Some(RepositoryId(42)));
        assert_eq!(PageCursor::decode("   "), None);
    }
}
