use crate::session::{Bookmark, SessionState, now_stamp};
use log::debug;

/// Two bookmarks within this many lines of each other are the same
/// bookmark: adding the second overwrites the first.
pub const DEFAULT_TOLERANCE: usize = 2;

/// Maximum preview length in characters.
const PREVIEW_LEN: usize = 50;

/// Add a bookmark at `scroll`, merging with any existing bookmark within
/// `tolerance` lines. A merge overwrites the existing entry in place, so
/// the list keeps its order. Either way the session's position and
/// timestamp are refreshed: bookmarking doubles as a save-point.
pub fn add_or_merge(state: &mut SessionState, scroll: usize, preview: String, tolerance: usize) {
    match state
        .bookmarks
        .iter_mut()
        .find(|b| b.scroll.abs_diff(scroll) <= tolerance)
    {
        Some(existing) => {
            debug!(
                "merging bookmark at {} into existing at {}",
                scroll, existing.scroll
            );
            existing.scroll = scroll;
            existing.preview = preview;
        }
        None => state.bookmarks.push(Bookmark { scroll, preview }),
    }
    state.scroll = scroll;
    state.timestamp = now_stamp();
}

/// Remove the bookmark at `index`. Out-of-range indices are ignored.
pub fn delete(state: &mut SessionState, index: usize) {
    if index < state.bookmarks.len() {
        state.bookmarks.remove(index);
    }
}

/// Preview text for a bookmark at `scroll`: the first non-empty line at or
/// after the position, truncated to 50 characters. Page sentinels shorten
/// to "Page N".
pub fn preview_for_line(lines: &[String], scroll: usize) -> String {
    let line = lines[scroll.min(lines.len().saturating_sub(1))..]
        .iter()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
        .unwrap_or("");
    if let Some(marker) = crate::outline::build_page_map(&[line.to_string()]).first() {
        return format!("Page {}", marker.page);
    }
    line.chars().take(PREVIEW_LEN).collect()
}
