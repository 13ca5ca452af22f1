use log::debug;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse PDF {path}: {message}")]
    PdfParse { path: String, message: String },
    #[error("no extractable text in {path}")]
    NoText { path: String },
}

/// Document format, derived from the file extension and immutable for the
/// lifetime of the document. Unrecognized extensions read as plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocFormat {
    Text,
    Markdown,
    Pdf,
}

impl DocFormat {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("md") | Some("markdown") => DocFormat::Markdown,
            Some("pdf") => DocFormat::Pdf,
            _ => DocFormat::Text,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DocFormat::Text => "text",
            DocFormat::Markdown => "markdown",
            DocFormat::Pdf => "pdf",
        }
    }
}

/// Extract the ordered paragraph sequence for a document.
///
/// Returns non-empty, trimmed paragraphs. Callers are expected to substitute
/// a placeholder paragraph on error instead of surfacing the failure.
pub fn extract_paragraphs(path: &Path, format: DocFormat) -> Result<Vec<String>, ExtractError> {
    match format {
        DocFormat::Text | DocFormat::Markdown => extract_plain(path),
        DocFormat::Pdf => extract_pdf(path),
    }
}

fn extract_plain(path: &Path) -> Result<Vec<String>, ExtractError> {
    let content = fs::read_to_string(path).map_err(|source| ExtractError::Unreadable {
        path: path.display().to_string(),
        source,
    })?;
    Ok(split_paragraphs(&content))
}

/// Split file content on blank-line boundaries. Runs of separators collapse:
/// the extra splits produce empty chunks, which are dropped.
pub fn split_paragraphs(content: &str) -> Vec<String> {
    content
        .split("\n\n")
        .map(|chunk| chunk.trim())
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| chunk.to_string())
        .collect()
}

fn extract_pdf(path: &Path) -> Result<Vec<String>, ExtractError> {
    let bytes = fs::read(path).map_err(|source| ExtractError::Unreadable {
        path: path.display().to_string(),
        source,
    })?;
    let text =
        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ExtractError::PdfParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    if text.trim().is_empty() {
        return Err(ExtractError::NoText {
            path: path.display().to_string(),
        });
    }
    let paragraphs = paragraphs_from_pdf_text(&text);
    debug!(
        "extracted {} paragraphs from {}",
        paragraphs.len(),
        path.display()
    );
    Ok(paragraphs)
}

/// Turn extracted PDF text into paragraphs with page-boundary sentinels.
///
/// `pdf-extract` inserts a form feed between pages. Each page with content
/// contributes a `--- Page N ---` sentinel (N is the 1-based position in
/// document order, not whatever number is printed on the page) followed by
/// one paragraph per blank-line-delimited run, lines joined with single
/// spaces. Blank pages contribute nothing, but still advance N.
pub fn paragraphs_from_pdf_text(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    for (idx, page) in text.split('\x0c').enumerate() {
        let runs = page_runs(page);
        if runs.is_empty() {
            continue;
        }
        paragraphs.push(format!("--- Page {} ---", idx + 1));
        paragraphs.extend(runs);
    }
    paragraphs
}

fn page_runs(page: &str) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in page.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !current.is_empty() {
                runs.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(trimmed);
        }
    }
    if !current.is_empty() {
        runs.push(current.join(" "));
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DocFormat::from_path(Path::new("a.txt")), DocFormat::Text);
        assert_eq!(DocFormat::from_path(Path::new("a.md")), DocFormat::Markdown);
        assert_eq!(DocFormat::from_path(Path::new("a.PDF")), DocFormat::Pdf);
        assert_eq!(DocFormat::from_path(Path::new("notes.org")), DocFormat::Text);
        assert_eq!(DocFormat::from_path(Path::new("no_extension")), DocFormat::Text);
    }

    #[test]
    fn test_split_paragraphs_basic() {
        let paras = split_paragraphs("first para\n\nsecond para\n\n\n\nthird");
        assert_eq!(paras, vec!["first para", "second para", "third"]);
    }

    #[test]
    fn test_split_paragraphs_trims_and_drops_empties() {
        let paras = split_paragraphs("\n\n  padded  \n\n\n\n");
        assert_eq!(paras, vec!["padded"]);
    }

    #[test]
    fn test_pdf_pages_get_sentinels() {
        let text = "Intro line\nsecond line\n\nnext para\x0cPage two text";
        let paras = paragraphs_from_pdf_text(text);
        assert_eq!(
            paras,
            vec![
                "--- Page 1 ---",
                "Intro line second line",
                "next para",
                "--- Page 2 ---",
                "Page two text",
            ]
        );
    }

    #[test]
    fn test_blank_pdf_page_skipped_but_numbering_advances() {
        let text = "first\x0c   \n\x0cthird";
        let paras = paragraphs_from_pdf_text(text);
        assert_eq!(
            paras,
            vec!["--- Page 1 ---", "first", "--- Page 3 ---", "third"]
        );
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        let err = extract_paragraphs(Path::new("/nonexistent/x.txt"), DocFormat::Text);
        assert!(matches!(err, Err(ExtractError::Unreadable { .. })));
    }

    #[test]
    fn test_garbage_bytes_are_not_a_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        fs::write(&path, b"this is not a pdf").unwrap();
        let err = extract_paragraphs(&path, DocFormat::Pdf);
        assert!(err.is_err());
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        fs::write(&path, "alpha\n\nbeta gamma\n\ndelta").unwrap();
        let a = extract_paragraphs(&path, DocFormat::Text).unwrap();
        let b = extract_paragraphs(&path, DocFormat::Text).unwrap();
        assert_eq!(a, b);
    }
}
