//! PDF attachments: text extraction and composition of the text sent upstream.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{ExtractionError, ValidationError};

pub const ATTACHMENT_HEADER: &str = "--- Attached PDF Content ---";
pub const ATTACHMENT_FOOTER: &str = "--- End Attached PDF Content ---";

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Turns a document on disk into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Extracts page text with `lopdf`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl PdfExtractor {
    /// Pages in order, each collapsed to single-spaced text, joined by a blank line
    pub fn extract_from_bytes(bytes: &[u8]) -> Result<String, ExtractionError> {
        let document =
            lopdf::Document::load_mem(bytes).map_err(|e| ExtractionError::Parse(e.to_string()))?;

        let pages = document.get_pages();
        if pages.is_empty() {
            return Err(ExtractionError::Parse("document has no pages".to_string()));
        }

        let mut page_texts = Vec::with_capacity(pages.len());
        for page_number in pages.keys() {
            let raw = document
                .extract_text(&[*page_number])
                .map_err(|e| ExtractionError::Parse(e.to_string()))?;
            page_texts.push(raw.split_whitespace().collect::<Vec<_>>().join(" "));
        }

        Ok(page_texts.join("\n\n"))
    }
}

impl TextExtractor for PdfExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            return Err(ExtractionError::NotPdf(path.to_path_buf()));
        }

        let bytes = fs::read(path).map_err(|source| ExtractionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(ExtractionError::NotPdf(path.to_path_buf()));
        }

        let text = Self::extract_from_bytes(&bytes)?;
        debug!(path = %path.display(), chars = text.len(), "extracted PDF text");
        Ok(text)
    }
}

/// Extracted document waiting to be sent with the next message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub text: String,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            text: text.into(),
        }
    }

    /// Extract `path` and keep the result; blank documents are refused.
    pub fn load(extractor: &dyn TextExtractor, path: &Path) -> Result<Self, ExtractionError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let text = extractor.extract_text(path)?;
        if text.trim().is_empty() {
            return Err(ExtractionError::NoText(file_name));
        }

        Ok(Self::new(file_name, text))
    }
}

/// The two faces of an outgoing user message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    /// What the user typed, shown in the UI
    pub display: String,
    /// What the model receives
    pub api: String,
}

impl Outgoing {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.display.is_empty() && self.api == self.display {
            return Err(ValidationError::EmptyMessage);
        }
        Ok(())
    }
}

/// Build the display/api pair for typed text and an optional attachment.
pub fn compose(typed: &str, attachment: Option<&Attachment>) -> Outgoing {
    let display = typed.trim().to_string();
    let api = match attachment {
        Some(attachment) => format!(
            "{display}\n\n{ATTACHMENT_HEADER}\n{}\n{ATTACHMENT_FOOTER}",
            attachment.text
        ),
        None => display.clone(),
    };

    Outgoing { display, api }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct Fixed(&'static str);

    /// In-memory PDF with one page per entry, each drawing its text once
    fn pdf_with_pages(texts: &[&str]) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{Document, Object, Stream, dictionary};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in texts {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn extracts_pages_in_order_with_collapsed_whitespace() {
        let bytes = pdf_with_pages(&["Hello   first page", "Second page"]);
        assert_eq!(
            PdfExtractor::extract_from_bytes(&bytes).unwrap(),
            "Hello first page\n\nSecond page"
        );
    }

    #[test]
    fn extracts_pdf_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        fs::write(&path, pdf_with_pages(&["Doc body"])).unwrap();

        let attachment = Attachment::load(&PdfExtractor, &path).unwrap();
        assert_eq!(attachment.file_name, "doc.pdf");
        assert_eq!(attachment.text, "Doc body");
    }

    impl TextExtractor for Fixed {
        fn extract_text(&self, _path: &Path) -> Result<String, ExtractionError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn compose_without_attachment_is_identity() {
        let outgoing = compose("Hello", None);
        assert_eq!(outgoing.display, "Hello");
        assert_eq!(outgoing.api, "Hello");
    }

    #[test]
    fn compose_appends_delimited_pdf_text() {
        let attachment = Attachment::new("doc.pdf", "Doc body");
        let outgoing = compose("Q:", Some(&attachment));

        assert_eq!(outgoing.display, "Q:");
        assert_eq!(
            outgoing.api,
            "Q:\n\n--- Attached PDF Content ---\nDoc body\n--- End Attached PDF Content ---"
        );
        assert!(outgoing.validate().is_ok());
    }

    #[test]
    fn compose_trims_typed_text() {
        let outgoing = compose("  spaced out \n", None);
        assert_eq!(outgoing.display, "spaced out");
    }

    #[test]
    fn blank_input_without_attachment_fails_validation() {
        assert_eq!(
            compose("   ", None).validate(),
            Err(ValidationError::EmptyMessage)
        );
    }

    #[test]
    fn attachment_alone_passes_validation() {
        let attachment = Attachment::new("doc.pdf", "text");
        let outgoing = compose("", Some(&attachment));
        assert_eq!(outgoing.display, "");
        assert!(outgoing.validate().is_ok());
    }

    #[test]
    fn load_keeps_file_name() {
        let attachment = Attachment::load(&Fixed("body"), Path::new("/tmp/report.pdf")).unwrap();
        assert_eq!(attachment.file_name, "report.pdf");
        assert_eq!(attachment.text, "body");
    }

    #[test]
    fn load_refuses_blank_documents() {
        let err = Attachment::load(&Fixed("  \n\n "), Path::new("scan.pdf")).unwrap_err();
        assert!(matches!(err, ExtractionError::NoText(name) if name == "scan.pdf"));
    }

    #[test]
    fn non_pdf_extension_is_rejected() {
        let err = PdfExtractor.extract_text(Path::new("notes.txt")).unwrap_err();
        assert!(matches!(err, ExtractionError::NotPdf(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("absent.pdf");
        let err = PdfExtractor.extract_text(&path).unwrap_err();
        assert!(matches!(err, ExtractionError::Io { .. }));
    }

    #[test]
    fn wrong_magic_bytes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        fs::write(&path, b"just some text").unwrap();

        let err = PdfExtractor.extract_text(&path).unwrap_err();
        assert!(matches!(err, ExtractionError::NotPdf(_)));
    }

    #[test]
    fn corrupt_pdf_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.PDF");
        fs::write(&path, b"%PDF-1.4\nthis is not really a pdf").unwrap();

        let err = PdfExtractor.extract_text(&path).unwrap_err();
        assert!(matches!(err, ExtractionError::Parse(_)));
    }
}
