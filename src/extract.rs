//! Text and metadata extraction for `.txt` and `.pdf` files.
//!
//! Extraction failures are returned as [`ExtractError`]; callers log them
//! and skip the file. Inside a PDF a single unreadable page does not fail
//! the file: it leaves an `(extraction error)` page marker instead.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use lopdf::Object;
use rag_assistant_core::models::{Document, Metadata, SOURCE_KEY};
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not valid UTF-8 text", .0.display())]
    Encoding(PathBuf),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("unsupported file type: {}", .0.display())]
    Unsupported(PathBuf),
}

/// File kinds the assistant can ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Pdf,
}

impl FileKind {
    /// Classify by extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(Self::Text),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read a supported file into a [`Document`] whose `source` is the file name.
pub fn extract_file(path: &Path) -> Result<Document, ExtractError> {
    let kind =
        FileKind::from_path(path).ok_or_else(|| ExtractError::Unsupported(path.to_path_buf()))?;
    let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = file_name(path);

    match kind {
        FileKind::Text => {
            let content =
                String::from_utf8(bytes).map_err(|_| ExtractError::Encoding(path.to_path_buf()))?;
            Ok(text_document(content, &name))
        }
        FileKind::Pdf => extract_pdf(&bytes, &name),
    }
}

/// Wrap plain text, attaching the content-derived metadata.
pub fn text_document(content: String, source: &str) -> Document {
    let mut metadata = content_metadata(&content);
    metadata.insert(SOURCE_KEY.to_string(), Value::String(source.to_string()));
    Document { content, metadata }
}

/// Extract a PDF page by page.
///
/// Every page's text is followed by a `--- Page N ---` marker. Text comes
/// from pdf-extract when it yields one string per page, and from lopdf's
/// per-page extraction otherwise.
pub fn extract_pdf(bytes: &[u8], source: &str) -> Result<Document, ExtractError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;
    let pages = doc.get_pages();
    let total_pages = pages.len();

    let primary = primary_page_texts(bytes).filter(|texts| texts.len() == total_pages);
    if primary.is_none() {
        debug!(source, "Falling back to per-page lopdf extraction");
    }

    let mut parts: Vec<String> = Vec::with_capacity(total_pages * 2);
    for (i, page_num) in pages.keys().enumerate() {
        let text = match &primary {
            Some(texts) => Ok(texts[i].clone()),
            None => doc.extract_text(&[*page_num]).map_err(|e| e.to_string()),
        };
        match text {
            Ok(text) => {
                if !text.trim().is_empty() {
                    parts.push(text);
                }
                parts.push(format!("\n--- Page {} ---\n", page_num));
            }
            Err(e) => {
                warn!(source, page = page_num, error = %e, "Could not extract page");
                parts.push(format!("\n--- Page {} (extraction error) ---\n", page_num));
            }
        }
    }
    let content = parts.join("\n");

    let mut metadata = Metadata::new();
    metadata.insert("total_pages".to_string(), Value::from(total_pages as u64));
    for (key, field) in [
        ("pdf_title", b"Title".as_slice()),
        ("pdf_author", b"Author".as_slice()),
        ("pdf_subject", b"Subject".as_slice()),
        ("pdf_creator", b"Creator".as_slice()),
    ] {
        if let Some(value) = info_field(&doc, field) {
            metadata.insert(key.to_string(), Value::String(value));
        }
    }
    metadata.extend(content_metadata(&content));
    metadata.insert(SOURCE_KEY.to_string(), Value::String(source.to_string()));
    metadata.insert(
        "file_size_kb".to_string(),
        Value::from(bytes.len() as f64 / 1024.0),
    );

    Ok(Document { content, metadata })
}

/// pdf-extract's page texts, or `None` when it fails.
fn primary_page_texts(bytes: &[u8]) -> Option<Vec<String>> {
    // pdf-extract panics on some malformed inputs
    let result =
        std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes)).ok()?;
    match result {
        Ok(texts) => Some(texts),
        Err(e) => {
            debug!(error = %e, "pdf-extract failed");
            None
        }
    }
}

/// A string entry of the document information dictionary.
fn info_field(doc: &lopdf::Document, key: &[u8]) -> Option<String> {
    let info = match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    match info.as_dict().ok()?.get(key).ok()? {
        Object::String(bytes, _) => {
            let s = decode_pdf_string(bytes);
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        _ => None,
    }
}

/// PDF text strings are UTF-16BE with a BOM, or PDFDocEncoding (Latin-1 superset).
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

fn date_patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"(?i)Published?:?\s*([A-Za-z]+\s+\d{4})").expect("valid regex"),
            Regex::new(r"(?i)Publication Date:?\s*([A-Za-z]+\s+\d{1,2},?\s+\d{4})")
                .expect("valid regex"),
            Regex::new(r"(?i)Report Date:?\s*([A-Za-z]+\s+\d{4})").expect("valid regex"),
        ]
    })
}

fn period_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)Data Period:?\s*([^.]+\d{4}[^.])").expect("valid regex")
    })
}

/// Metadata found by scanning report text.
///
/// - `publication_date`: first match among the three date patterns, tried in order
/// - `data_period`: text after "Data Period", up to the sentence end
/// - `report_type`: Census, Survey, Report or Document by keyword
/// - `organization`: `KNBS` when the bureau is mentioned
pub fn content_metadata(content: &str) -> Metadata {
    let mut metadata = Metadata::new();

    if let Some(date) = date_patterns()
        .iter()
        .find_map(|re| re.captures(content))
        .and_then(|c| c.get(1))
    {
        metadata.insert(
            "publication_date".to_string(),
            Value::String(date.as_str().to_string()),
        );
    }

    if let Some(period) = period_pattern().captures(content).and_then(|c| c.get(1)) {
        metadata.insert(
            "data_period".to_string(),
            Value::String(period.as_str().trim().to_string()),
        );
    }

    let lower = content.to_lowercase();
    let report_type = if lower.contains("census") {
        "Census"
    } else if lower.contains("survey") {
        "Survey"
    } else if lower.contains("report") {
        "Report"
    } else {
        "Document"
    };
    metadata.insert("report_type".to_string(), Value::String(report_type.to_string()));

    if lower.contains("knbs") || lower.contains("national bureau of statistics") {
        metadata.insert("organization".to_string(), Value::String("KNBS".to_string()));
    }

    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One-page PDF with an information dictionary.
    fn minimal_pdf_with_info() -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n");
        let o1 = out.len();
        out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
        let o2 = out.len();
        out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
        let o3 = out.len();
        out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
        let o4 = out.len();
        out.extend_from_slice(b"4 0 obj << /Length 49 >> stream\nBT /F1 12 Tf 100 700 Td (Census population) Tj ET\nendstream endobj\n");
        let o5 = out.len();
        out.extend_from_slice(
            b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
        );
        let o6 = out.len();
        out.extend_from_slice(
            b"6 0 obj << /Title (County Statistical Abstract) /Author (KNBS) >> endobj\n",
        );
        let xref_start = out.len();
        out.extend_from_slice(b"xref\n0 7\n");
        out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
        for offset in [o1, o2, o3, o4, o5, o6] {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(b"trailer << /Size 7 /Root 1 0 R /Info 6 0 R >>\nstartxref\n");
        out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
        out.extend_from_slice(b"%%EOF\n");
        out
    }

    #[test]
    fn test_content_metadata_knbs_report() {
        let text = "Kenya National Bureau of Statistics\nPublished: March 2020\n\
                    Data Period: January 2019 to December 2019 inclusive. The census covered...";
        let m = content_metadata(text);
        assert_eq!(m["publication_date"], "March 2020");
        assert_eq!(m["data_period"], "January 2019 to December 2019");
        assert_eq!(m["report_type"], "Census");
        assert_eq!(m["organization"], "KNBS");
    }

    #[test]
    fn test_content_metadata_date_pattern_order() {
        let m = content_metadata("Publication Date: June 5, 2021");
        assert_eq!(m["publication_date"], "June 5, 2021");

        let m = content_metadata("Report Date: May 2018 survey results");
        assert_eq!(m["publication_date"], "May 2018");
        assert_eq!(m["report_type"], "Survey");
    }

    #[test]
    fn test_content_metadata_defaults() {
        let m = content_metadata("Plain notes without keywords.");
        assert!(m.get("publication_date").is_none());
        assert!(m.get("data_period").is_none());
        assert!(m.get("organization").is_none());
        assert_eq!(m["report_type"], "Document");
        assert_eq!(content_metadata("Annual report")["report_type"], "Report");
    }

    #[test]
    fn test_file_kind() {
        assert_eq!(FileKind::from_path(Path::new("a/B.PDF")), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_path(Path::new("notes.txt")), Some(FileKind::Text));
        assert_eq!(FileKind::from_path(Path::new("sheet.xlsx")), None);
        assert_eq!(FileKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_extract_text_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nairobi.txt");
        std::fs::write(&path, "Nairobi census summary.").unwrap();

        let doc = extract_file(&path).unwrap();
        assert_eq!(doc.content, "Nairobi census summary.");
        assert_eq!(doc.source(), Some("nairobi.txt"));
        assert_eq!(doc.metadata["report_type"], "Census");
    }

    #[test]
    fn test_extract_rejects_invalid_utf8_and_unknown_types() {
        let tmp = tempfile::tempdir().unwrap();
        let bad = tmp.path().join("bad.txt");
        std::fs::write(&bad, [0xff, 0xfe, 0x00, 0xc3]).unwrap();
        assert!(matches!(extract_file(&bad), Err(ExtractError::Encoding(_))));

        let other = tmp.path().join("data.csv");
        std::fs::write(&other, "a,b").unwrap();
        assert!(matches!(extract_file(&other), Err(ExtractError::Unsupported(_))));

        let missing = tmp.path().join("missing.txt");
        assert!(matches!(extract_file(&missing), Err(ExtractError::Io { .. })));
    }

    #[test]
    fn test_invalid_pdf_returns_error() {
        let err = extract_pdf(b"not a pdf", "bad.pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn test_pdf_metadata_and_page_markers() {
        let bytes = minimal_pdf_with_info();
        let doc = extract_pdf(&bytes, "abstract.pdf").unwrap();

        assert_eq!(doc.source(), Some("abstract.pdf"));
        assert_eq!(doc.metadata["total_pages"], 1);
        assert_eq!(doc.metadata["pdf_title"], "County Statistical Abstract");
        assert_eq!(doc.metadata["pdf_author"], "KNBS");
        assert!(doc.metadata.get("pdf_subject").is_none());
        assert!(doc.metadata["file_size_kb"].as_f64().unwrap() > 0.0);
        assert!(doc.content.contains("--- Page 1"));
    }

    #[test]
    fn test_decode_pdf_string() {
        assert_eq!(decode_pdf_string(b"Plain"), "Plain");
        assert_eq!(decode_pdf_string(&[0xFE, 0xFF, 0x00, 0x4B, 0x00, 0x45]), "KE");
    }
}
