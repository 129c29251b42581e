//! Direct-text extractor: local, deterministic, no network.
//!
//! PDF: reads the embedded text layer page by page. DOCX: paragraph text in
//! document order. TXT: strict UTF-8.

use async_trait::async_trait;
use docx_rs::{DocumentChild, ParagraphChild, RunChild, TableCellContent, TableChild, TableRowChild};
use tracing::debug;

use crate::extraction::{DocumentFormat, ExtractionError, Extractor, UploadedDocument};

const PAGE_SEPARATOR: &str = "\n\n";

pub struct DirectTextExtractor {
    /// When false, PDFs are left entirely to OCR.
    pdf_text_layer: bool,
}

impl DirectTextExtractor {
    pub fn new(pdf_text_layer: bool) -> Self {
        Self { pdf_text_layer }
    }
}

#[async_trait]
impl Extractor for DirectTextExtractor {
    fn name(&self) -> &str {
        "direct-text"
    }

    fn supports(&self, format: DocumentFormat) -> bool {
        format != DocumentFormat::Pdf || self.pdf_text_layer
    }

    async fn extract(&self, document: &UploadedDocument) -> Result<String, ExtractionError> {
        match document.format() {
            DocumentFormat::Pdf => extract_pdf_text_layer(document.bytes().to_vec()).await,
            DocumentFormat::Docx => extract_docx(document.bytes()),
            DocumentFormat::Txt => decode_txt(document.bytes()),
        }
    }
}

/// Runs the PDF parser on the blocking pool. A panic inside the parser is
/// reported as an unreadable document.
async fn extract_pdf_text_layer(bytes: Vec<u8>) -> Result<String, ExtractionError> {
    let pages = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
    })
    .await
    .map_err(|e| unreadable_pdf(format!("PDF parser aborted: {e}")))?
    .map_err(|e| unreadable_pdf(e.to_string()))?;

    debug!("PDF text layer: {} page(s)", pages.len());
    Ok(join_pages(&pages))
}

fn unreadable_pdf(detail: String) -> ExtractionError {
    ExtractionError::Unreadable {
        format: DocumentFormat::Pdf,
        detail,
    }
}

/// Pages without a text layer contribute an empty string.
fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .map(|p| p.trim())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| ExtractionError::Unreadable {
        format: DocumentFormat::Docx,
        detail: e.to_string(),
    })?;

    let mut text = String::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => push_paragraph(&mut text, paragraph),
            DocumentChild::Table(table) => {
                for TableChild::TableRow(row) in &table.rows {
                    for TableRowChild::TableCell(cell) in &row.cells {
                        for content in &cell.children {
                            if let TableCellContent::Paragraph(paragraph) = content {
                                push_paragraph(&mut text, paragraph);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
    Ok(text)
}

fn push_paragraph(out: &mut String, paragraph: &docx_rs::Paragraph) {
    push_paragraph_children(out, &paragraph.children);
    out.push('\n');
}

fn push_paragraph_children(out: &mut String, children: &[ParagraphChild]) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for run_child in &run.children {
                    match run_child {
                        RunChild::Text(t) => out.push_str(&t.text),
                        RunChild::Tab(_) => out.push('\t'),
                        RunChild::Break(_) => out.push('\n'),
                        _ => {}
                    }
                }
            }
            // Links (emails, profile URLs) carry their own runs.
            ParagraphChild::Hyperlink(link) => push_paragraph_children(out, &link.children),
            _ => {}
        }
    }
}

fn decode_txt(bytes: &[u8]) -> Result<String, ExtractionError> {
    let text = std::str::from_utf8(bytes)?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
}

/// Builds a one-page PDF whose text layer holds `text` in Helvetica.
#[cfg(test)]
pub(crate) fn text_layer_pdf(text: &str) -> Vec<u8> {
    let content = format!("BT /F1 24 Tf 72 720 Td ({text}) Tj ET");
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>"
            .to_string(),
        format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }

    let xref_at = pdf.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        xref.push_str(&format!("{offset:010} 00000 n \n"));
    }
    xref.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
        objects.len() + 1
    ));
    pdf.extend_from_slice(xref.as_bytes());
    pdf
}
