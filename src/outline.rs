use regex::Regex;
use std::sync::LazyLock;

/// One Markdown heading in the reflowed line sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub line: usize,
    pub level: usize,
    pub title: String,
}

/// One PDF page boundary in the reflowed line sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMarker {
    pub page: usize,
    pub line: usize,
}

static PAGE_SENTINEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^--- Page (\d+) ---$").expect("valid page sentinel regex"));

/// Build a heading outline from reflowed lines. Only meaningful for
/// Markdown documents; callers gate on the format.
///
/// A heading is a line that, after left-trimming, starts with one or more
/// `#` followed by a non-empty title. Level is the number of `#`.
pub fn build_toc(lines: &[String]) -> Vec<TocEntry> {
    let mut entries = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if !trimmed.starts_with('#') {
            continue;
        }
        let level = trimmed.chars().take_while(|c| *c == '#').count();
        let title = trimmed[level..].trim();
        if title.is_empty() {
            continue;
        }
        entries.push(TocEntry {
            line: idx,
            level,
            title: title.to_string(),
        });
    }
    entries
}

/// Map PDF page numbers to their sentinel lines. Sentinels whose page
/// number fails to parse are skipped silently.
pub fn build_page_map(lines: &[String]) -> Vec<PageMarker> {
    let mut markers = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let Some(captures) = PAGE_SENTINEL_RE.captures(line) else {
            continue;
        };
        if let Ok(page) = captures[1].parse::<usize>() {
            markers.push(PageMarker { page, line: idx });
        }
    }
    markers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_toc() {
        let toc = build_toc(&lines(&["# Title", "text", "## Sub", "", "###"]));
        assert_eq!(
            toc,
            vec![
                TocEntry {
                    line: 0,
                    level: 1,
                    title: "Title".to_string()
                },
                TocEntry {
                    line: 2,
                    level: 2,
                    title: "Sub".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_toc_accepts_indented_headings() {
        let toc = build_toc(&lines(&["   ## Indented"]));
        assert_eq!(toc.len(), 1);
        assert_eq!(toc[0].level, 2);
        assert_eq!(toc[0].title, "Indented");
    }

    #[test]
    fn test_page_map_matches_exact_sentinels() {
        let markers = build_page_map(&lines(&[
            "--- Page 1 ---",
            "content",
            "--- Page 12 ---",
            "-- Page 3 --",
            " --- Page 4 ---",
        ]));
        assert_eq!(
            markers,
            vec![
                PageMarker { page: 1, line: 0 },
                PageMarker { page: 12, line: 2 },
            ]
        );
    }

    #[test]
    fn test_page_map_skips_unparsable_numbers() {
        // 40 digits overflow usize; the sentinel is dropped, not an error
        let markers = build_page_map(&lines(&[
            "--- Page 9999999999999999999999999999999999999999 ---",
            "--- Page 2 ---",
        ]));
        assert_eq!(markers, vec![PageMarker { page: 2, line: 1 }]);
    }
}
