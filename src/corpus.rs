//! Corpus loading.
//!
//! Consumes the external crawler's output: a JSON array of document records
//! with `source_url`, `section_title`, `content`, and absolute character
//! offsets. Records are validated on the way in; the crawler itself is an
//! external collaborator and is never invoked from here.

use std::path::Path;

use crate::error::CorpusError;
use crate::models::Document;

/// Load and validate the corpus file.
///
/// # Errors
///
/// - [`CorpusError::Io`] / [`CorpusError::Parse`] for unreadable or
///   malformed files.
/// - [`CorpusError::InvalidRecord`] when a record has inverted offsets or a
///   missing source URL.
/// - [`CorpusError::Empty`] when the file parses to zero records.
pub fn load_documents(path: &Path) -> Result<Vec<Document>, CorpusError> {
    let content = std::fs::read_to_string(path).map_err(|source| CorpusError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let documents: Vec<Document> =
        serde_json::from_str(&content).map_err(|source| CorpusError::Parse {
            path: path.display().to_string(),
            source,
        })?;

    for (index, doc) in documents.iter().enumerate() {
        if doc.source_url.trim().is_empty() {
            return Err(CorpusError::InvalidRecord {
                index,
                reason: "source_url is empty".to_string(),
            });
        }
        if doc.end_char <= doc.start_char {
            return Err(CorpusError::InvalidRecord {
                index,
                reason: format!(
                    "end_char ({}) must be > start_char ({})",
                    doc.end_char, doc.start_char
                ),
            });
        }
    }

    if documents.is_empty() {
        return Err(CorpusError::Empty("corpus file contains no documents".to_string()));
    }

    tracing::info!(documents = documents.len(), path = %path.display(), "loaded corpus");
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_corpus(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_corpus() {
        let file = write_corpus(
            r#"[
                {
                    "source_url": "https://docs.example.com/values",
                    "section_title": "Values",
                    "content": "Transparency is one of our core values.",
                    "start_char": 0,
                    "end_char": 39
                }
            ]"#,
        );
        let docs = load_documents(file.path()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].section_title, "Values");
    }

    #[test]
    fn test_empty_corpus_is_an_error() {
        let file = write_corpus("[]");
        assert!(matches!(
            load_documents(file.path()),
            Err(CorpusError::Empty(_))
        ));
    }

    #[test]
    fn test_inverted_offsets_rejected() {
        let file = write_corpus(
            r#"[
                {
                    "source_url": "https://docs.example.com/x",
                    "section_title": "X",
                    "content": "text",
                    "start_char": 10,
                    "end_char": 10
                }
            ]"#,
        );
        assert!(matches!(
            load_documents(file.path()),
            Err(CorpusError::InvalidRecord { index: 0, .. })
        ));
    }

    #[test]
    fn test_missing_url_rejected() {
        let file = write_corpus(
            r#"[
                {
                    "source_url": "  ",
                    "section_title": "X",
                    "content": "text",
                    "start_char": 0,
                    "end_char": 4
                }
            ]"#,
        );
        assert!(matches!(
            load_documents(file.path()),
            Err(CorpusError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let file = write_corpus("{not json");
        assert!(matches!(
            load_documents(file.path()),
            Err(CorpusError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file_rejected() {
        let err = load_documents(Path::new("/nonexistent/corpus.json")).unwrap_err();
        assert!(matches!(err, CorpusError::Io { .. }));
    }
}
