use crate::storage::note::Note;
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fixed export filename, matching what the web version downloads.
pub const EXPORT_FILE_NAME: &str = "my_journals.json";

const EMAIL_SUBJECT: &str = "My journals";

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("invalid journal document: {0}")]
    InvalidDocument(String),
    #[error("could not read {0}")]
    Unreadable(String),
}

/// Pretty-printed JSON document of the full collection.
pub fn export_document(notes: &[Note]) -> Result<String> {
    Ok(serde_json::to_string_pretty(notes)?)
}

/// Write the export document next to the current working directory, the way
/// single-note markdown exports are written.
pub fn export_to_file(notes: &[Note]) -> Result<PathBuf> {
    let path = PathBuf::from(EXPORT_FILE_NAME);
    fs::write(&path, export_document(notes)?)?;
    Ok(path)
}

/// Compose a mail draft carrying the export document in its body and hand it
/// to the platform opener. The recipient is user-supplied.
pub fn export_via_email(recipient: &str, notes: &[Note]) -> Result<()> {
    open::that(compose_mailto(recipient, notes)?)?;
    Ok(())
}

pub fn compose_mailto(recipient: &str, notes: &[Note]) -> Result<String> {
    let document = export_document(notes)?;
    Ok(format!(
        "mailto:{}?subject={}&body={}",
        recipient,
        urlencoding::encode(EMAIL_SUBJECT),
        urlencoding::encode(&document),
    ))
}

/// Parse a document into note records. Files, pasted text, and clipboard
/// reads all come through here; failure leaves the store untouched because
/// nothing is merged until parsing has succeeded.
pub fn parse_document(text: &str) -> Result<Vec<Note>, TransferError> {
    serde_json::from_str(text).map_err(|e| TransferError::InvalidDocument(e.to_string()))
}

pub fn import_file(path: &Path) -> Result<Vec<Note>, TransferError> {
    let text = fs::read_to_string(path)
        .map_err(|e| TransferError::Unreadable(format!("{}: {}", path.display(), e)))?;
    parse_document(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::note::NoteColor;
    use tempfile::tempdir;

    fn sample_notes() -> Vec<Note> {
        vec![
            Note {
                id: 1,
                title: "Caf\u{e9} notes".to_string(),
                content: "Met Ay\u{15f}e \u{2615}".to_string(),
                color: NoteColor::Purple,
                date: "10/15/2024".to_string(),
                has_star: true,
            },
            Note {
                id: 2,
                title: String::new(),
                content: "untitled body".to_string(),
                color: NoteColor::Yellow,
                date: "10/16/2024".to_string(),
                has_star: false,
            },
        ]
    }

    #[test]
    fn test_document_round_trip() {
        let notes = sample_notes();
        let document = export_document(&notes).expect("Failed to export");
        let parsed = parse_document(&document).expect("Failed to parse");
        assert_eq!(parsed, notes);
    }

    #[test]
    fn test_malformed_document_is_invalid() {
        let result = parse_document("{\"not\": \"an array\"}");
        assert!(matches!(result, Err(TransferError::InvalidDocument(_))));

        let result = parse_document("[{\"id\": ");
        assert!(matches!(result, Err(TransferError::InvalidDocument(_))));
    }

    #[test]
    fn test_import_file_round_trip() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join(EXPORT_FILE_NAME);
        let notes = sample_notes();

        fs::write(&path, export_document(&notes).expect("Failed to export"))
            .expect("Failed to write file");

        let parsed = import_file(&path).expect("Failed to import");
        assert_eq!(parsed, notes);
    }

    #[test]
    fn test_import_missing_file_is_unreadable() {
        let result = import_file(Path::new("/no/such/file.json"));
        assert!(matches!(result, Err(TransferError::Unreadable(_))));
    }

    #[test]
    fn test_mailto_draft_embeds_document() {
        let url = compose_mailto("me@example.com", &sample_notes()).expect("Failed to compose");
        assert!(url.starts_with("mailto:me@example.com?subject="));
        // The body is urlencoded JSON.
        assert!(url.contains("%22hasStar%22"));
    }
}
