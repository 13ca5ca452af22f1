/// Default wrap width in columns.
pub const DEFAULT_WIDTH: usize = 70;

/// Wrap every paragraph to `width` columns and flatten the result into a
/// single line sequence, with one empty separator line after each paragraph
/// (including the last one).
///
/// All saved positions (scroll offsets, bookmarks, TOC lines, page markers)
/// are indices into this sequence, so the output must be byte-identical
/// across runs for the same input and width.
pub fn reflow(paragraphs: &[String], width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in paragraphs {
        lines.extend(wrap_paragraph(paragraph, width));
        lines.push(String::new());
    }
    lines
}

/// Greedy word-wrap at whitespace boundaries.
///
/// Whitespace is never dropped or collapsed: concatenating the returned
/// lines reconstructs the input exactly. A single token wider than `width`
/// gets its own line unmodified.
pub fn wrap_paragraph(text: &str, width: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for chunk in split_chunks(text) {
        let chunk_len = chunk.chars().count();
        if current_len + chunk_len <= width {
            current.push_str(chunk);
            current_len += chunk_len;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if chunk_len <= width {
            current.push_str(chunk);
            current_len = chunk_len;
        } else {
            lines.push(chunk.to_string());
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Split text into maximal runs of whitespace and non-whitespace, in order.
fn split_chunks(text: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut prev_is_ws: Option<bool> = None;

    for (idx, ch) in text.char_indices() {
        let is_ws = ch.is_whitespace();
        if let Some(prev) = prev_is_ws {
            if prev != is_ws {
                chunks.push(&text[start..idx]);
                start = idx;
            }
        }
        prev_is_ws = Some(is_ws);
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}
