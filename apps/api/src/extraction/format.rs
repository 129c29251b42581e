//! Format Detector: classifies an upload by its declared file extension.

use std::fmt;
use std::path::Path;

use crate::extraction::ExtractionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Txt,
}

impl DocumentFormat {
    /// Derives the format from a filename. Never looks at file bytes.
    pub fn detect(filename: &str) -> Result<Self, ExtractionError> {
        if filename.trim().is_empty() {
            return Err(ExtractionError::EmptyInput("No selected file"));
        }

        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default();

        match extension.as_str() {
            ".pdf" => Ok(DocumentFormat::Pdf),
            ".docx" => Ok(DocumentFormat::Docx),
            ".txt" => Ok(DocumentFormat::Txt),
            _ => Err(ExtractionError::UnsupportedFormat(extension)),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => ".pdf",
            DocumentFormat::Docx => ".docx",
            DocumentFormat::Txt => ".txt",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "application/pdf",
            DocumentFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentFormat::Txt => "text/plain",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentFormat::Pdf => "PDF",
            DocumentFormat::Docx => "DOCX",
            DocumentFormat::Txt => "TXT",
        };
        f.write_str(name)
    }
}

/// An upload as received at ingress. Immutable; dropped once extraction is done.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    filename: String,
    format: DocumentFormat,
    bytes: Vec<u8>,
}

impl UploadedDocument {
    /// Detects the format first so unsupported uploads are rejected before
    /// their bytes are inspected.
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ExtractionError> {
        let filename = filename.into();
        let format = DocumentFormat::detect(&filename)?;
        if bytes.is_empty() {
            return Err(ExtractionError::EmptyInput("Uploaded file is empty"));
        }
        Ok(Self {
            filename,
            format,
            bytes,
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_known_extensions_case_insensitive() {
        assert_eq!(DocumentFormat::detect("cv.pdf").unwrap(), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::detect("CV.PDF").unwrap(), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::detect("resume.Docx").unwrap(), DocumentFormat::Docx);
        assert_eq!(DocumentFormat::detect("notes.txt").unwrap(), DocumentFormat::Txt);
        assert_eq!(
            DocumentFormat::detect("uploads/2024/jane.doe.pdf").unwrap(),
            DocumentFormat::Pdf
        );
    }

    #[test]
    fn test_detect_unsupported_reports_extension() {
        match DocumentFormat::detect("photo.JPG") {
            Err(ExtractionError::UnsupportedFormat(ext)) => assert_eq!(ext, ".jpg"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
        match DocumentFormat::detect("README") {
            Err(ExtractionError::UnsupportedFormat(ext)) => assert_eq!(ext, ""),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_detect_empty_filename() {
        assert!(matches!(
            DocumentFormat::detect(""),
            Err(ExtractionError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_unsupported_format_rejected_before_bytes() {
        // Empty bytes would be EmptyInput; format is checked first.
        assert!(matches!(
            UploadedDocument::new("cv.odt", Vec::new()),
            Err(ExtractionError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_empty_upload_rejected() {
        assert!(matches!(
            UploadedDocument::new("cv.txt", Vec::new()),
            Err(ExtractionError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_uploaded_document_accessors() {
        let doc = UploadedDocument::new("cv.txt", b"hello".to_vec()).unwrap();
        assert_eq!(doc.filename(), "cv.txt");
        assert_eq!(doc.format(), DocumentFormat::Txt);
        assert_eq!(doc.bytes(), b"hello");
        assert_eq!(doc.format().mime_type(), "text/plain");
        assert_eq!(doc.format().extension(), ".txt");
    }
}
