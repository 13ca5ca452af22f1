use crate::extract::{DocFormat, extract_paragraphs};
use crate::reflow::reflow;
use crate::session::{RESERVED_PREFIX, SessionStore, StoreError};
use log::{debug, warn};
use std::path::Path;

/// One row in the cross-document library view. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    pub path: String,
    pub scroll: usize,
    pub total_lines: usize,
    pub progress: usize,
    pub timestamp: String,
}

impl LibraryEntry {
    /// File name without extension, for display.
    pub fn display_name(&self) -> String {
        Path::new(&self.path)
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.clone())
    }
}

/// Progress through a document as a percentage of scrollable lines.
/// The denominator floors at 1, so a one-line document reads 0% at the top
/// instead of dividing by zero.
pub fn progress_percent(scroll: usize, total_lines: usize) -> usize {
    let denominator = total_lines.saturating_sub(1).max(1);
    let percent = (scroll as f64 / denominator as f64 * 100.0).round() as usize;
    percent.min(100)
}

/// Build the library view from every persisted session whose file still
/// exists on disk. Sessions missing a line count get one recomputed by
/// re-running extraction and reflow, and the recomputed counts are written
/// back to the store before returning. Entries come back sorted most
/// recently read first; entries without a timestamp sort last.
pub fn build(store: &SessionStore, width: usize) -> Result<Vec<LibraryEntry>, StoreError> {
    let mut map = store.read_all()?;
    let mut entries = Vec::new();

    let doc_paths: Vec<String> = map
        .keys()
        .filter(|key| !key.starts_with(RESERVED_PREFIX))
        .cloned()
        .collect();

    for doc_path in doc_paths {
        if !Path::new(&doc_path).exists() {
            debug!("library: skipping missing file {doc_path}");
            continue;
        }
        let mut state = store.load(&doc_path)?;
        if state.total_lines == 0 {
            state.total_lines = recount_lines(&doc_path, width);
            map.insert(
                doc_path.clone(),
                serde_json::to_value(&state).expect("SessionState serializes"),
            );
        }
        entries.push(LibraryEntry {
            progress: progress_percent(state.scroll, state.total_lines),
            path: doc_path,
            scroll: state.scroll,
            total_lines: state.total_lines,
            timestamp: state.timestamp,
        });
    }

    store.write_all(&map)?;

    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(entries)
}

/// Lazy recount of a document's reflowed line total. Extraction failures
/// are swallowed here: the library should still list the document, so the
/// count decays to 1 and progress becomes degenerate instead of erroring.
fn recount_lines(doc_path: &str, width: usize) -> usize {
    let path = Path::new(doc_path);
    let format = DocFormat::from_path(path);
    match extract_paragraphs(path, format) {
        Ok(paragraphs) => reflow(&paragraphs, width).len().max(1),
        Err(e) => {
            warn!("library: could not recount {doc_path}: {e}");
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;
    use std::fs;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SessionStore {
        SessionStore::at(dir.path().join("sessions.json"))
    }

    #[test]
    fn test_progress_formula() {
        assert_eq!(progress_percent(50, 101), 50);
        assert_eq!(progress_percent(0, 1), 0);
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(100, 101), 100);
        assert_eq!(progress_percent(500, 10), 100);
    }

    #[test]
    fn test_missing_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .save_position("/definitely/not/here.txt", 3, 10)
            .unwrap();
        let entries = build(&store, 70).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_sorted_by_recency() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        for (name, stamp) in [("a", "2024-01-01"), ("b", "2024-03-01"), ("c", "2024-02-01")] {
            let path = dir.path().join(format!("{name}.txt"));
            fs::write(&path, "content").unwrap();
            let state = SessionState {
                scroll: 0,
                total_lines: 2,
                timestamp: format!("{stamp}T00:00:00+00:00"),
                bookmarks: Vec::new(),
            };
            store.save_state(&path.to_string_lossy(), &state).unwrap();
        }
        let entries = build(&store, 70).unwrap();
        let names: Vec<String> = entries.iter().map(|e| e.display_name()).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_missing_line_count_is_recomputed_and_cached() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let path = dir.path().join("doc.txt");
        fs::write(&path, "one two\n\nthree").unwrap();
        let key = path.to_string_lossy().to_string();
        let state = SessionState {
            scroll: 1,
            total_lines: 0,
            timestamp: "2024-01-01T00:00:00+00:00".to_string(),
            bookmarks: Vec::new(),
        };
        store.save_state(&key, &state).unwrap();

        let entries = build(&store, 70).unwrap();
        // two paragraphs reflow to 4 lines (one line + separator each)
        assert_eq!(entries[0].total_lines, 4);

        // and the recount is cached back into the store
        let reloaded = store.load(&key).unwrap();
        assert_eq!(reloaded.total_lines, 4);
        assert_eq!(reloaded.timestamp, state.timestamp);
    }

    #[test]
    fn test_unreadable_file_decays_to_one_line() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let path = dir.path().join("bad.pdf");
        fs::write(&path, b"not a pdf at all").unwrap();
        let key = path.to_string_lossy().to_string();
        let state = SessionState {
            scroll: 0,
            total_lines: 0,
            timestamp: String::new(),
            bookmarks: Vec::new(),
        };
        store.save_state(&key, &state).unwrap();
        let entries = build(&store, 70).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].total_lines, 1);
        assert_eq!(entries[0].progress, 0);
    }
}
