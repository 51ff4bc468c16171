use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid output identifier {0:?}")]
    InvalidId(String),

    #[error("failed to write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Destination for rendered diff images.
pub trait OutputSink {
    /// Persist `png` under `id` and return a locator the caller can hand out.
    fn put(&self, id: &str, png: &[u8]) -> Result<String, StoreError>;
}

/// Identifiers become file names, so only a conservative alphabet is allowed.
pub fn validate_id(id: &str) -> Result<(), StoreError> {
    let ok = !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_owned()))
    }
}

fn ensure_dir(dir: &Path) -> Result<(), StoreError> {
    std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

/// Writes `<dir>/<id>.png`, creating `dir` on demand.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.png"))
    }
}

impl OutputSink for DirectorySink {
    fn put(&self, id: &str, png: &[u8]) -> Result<String, StoreError> {
        validate_id(id)?;
        ensure_dir(&self.dir)?;
        let path = self.path_for(id);
        std::fs::write(&path, png).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), bytes = png.len(), "wrote diff image");
        Ok(path.display().to_string())
    }
}

/// Keeps images in memory; the locator is the id itself.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemorySink {
    pub fn get(&self, id: &str) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl OutputSink for MemorySink {
    fn put(&self, id: &str, png: &[u8]) -> Result<String, StoreError> {
        validate_id(id)?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_owned(), png.to_vec());
        Ok(id.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_path_like_ids() {
        for id in ["", "..", "../escape", "a/b", ".hidden", "sp ace"] {
            assert!(validate_id(id).is_err(), "{id:?} should be rejected");
        }
        for id in ["abc", "0b5c-11_diff", "x.y"] {
            assert!(validate_id(id).is_ok(), "{id:?} should be accepted");
        }
    }

    #[test]
    fn directory_sink_creates_dir_and_writes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(tmp.path().join("nested").join("results"));
        let locator = sink.put("run_diff", b"png-bytes").unwrap();

        let path = sink.path_for("run_diff");
        assert_eq!(locator, path.display().to_string());
        assert_eq!(std::fs::read(&path).unwrap(), b"png-bytes");
    }

    #[test]
    fn directory_sink_overwrites_existing_id() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(tmp.path());
        sink.put("same", b"first").unwrap();
        sink.put("same", b"second").unwrap();
        assert_eq!(std::fs::read(sink.path_for("same")).unwrap(), b"second");
    }

    #[test]
    fn directory_sink_reports_unwritable_target() {
        let tmp = tempfile::tempdir().unwrap();
        // A regular file where the directory should be.
        let blocker = tmp.path().join("blocked");
        std::fs::write(&blocker, b"").unwrap();
        let sink = DirectorySink::new(&blocker);
        let err = sink.put("x", b"data").unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn memory_sink_round_trip() {
        let sink = MemorySink::default();
        assert!(sink.is_empty());
        assert_eq!(sink.put("k", b"v").unwrap(), "k");
        assert_eq!(sink.get("k").as_deref(), Some(&b"v"[..]));
        assert!(sink.get("missing").is_none());
    }
}
