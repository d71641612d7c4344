use std::panic::{self, AssertUnwindSafe};

use super::ExtractionError;

const UNPARSEABLE: &str = "PDF could not be parsed";

/// Text pulled from a PDF, with page markers already inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: usize,
    pub pages_with_text: usize,
}

/// PDF text extractor using the pdf-extract crate.
/// Handles digital PDFs with embedded text layers.
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    /// Extract every page, joined as `\n--- Page N ---\n<text>`.
    /// Pages with only whitespace are skipped but keep their number.
    pub fn extract(&self, pdf_bytes: &[u8]) -> Result<ExtractedText, ExtractionError> {
        // pdf-extract panics on some malformed inputs (e.g. undeclared fonts).
        let page_texts = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        }))
        .map_err(|_| {
            tracing::warn!(bytes = pdf_bytes.len(), "PDF parser panicked");
            ExtractionError::PdfParsing(UNPARSEABLE.to_string())
        })?
        .map_err(|e| ExtractionError::PdfParsing(e.to_string()))?;

        let page_count = page_texts.len();
        let mut text = String::new();
        let mut pages_with_text = 0;
        for (i, page) in page_texts.iter().enumerate() {
            if page.trim().is_empty() {
                continue;
            }
            pages_with_text += 1;
            text.push_str(&format!("\n--- Page {} ---\n", i + 1));
            text.push_str(page);
        }

        if text.trim().is_empty() {
            return Err(ExtractionError::NoText);
        }

        tracing::info!(pages = page_count, chars = text.len(), "Extracted PDF text");
        Ok(ExtractedText {
            text,
            page_count,
            pages_with_text,
        })
    }
}

/// `%PDF-` magic check, used before handing bytes to the parser.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}


#[cfg(test)]
mod tests {
    use super::test_pdf::{make_pdf_with_undeclared_font, make_test_pdf};
    use super::*;

    #[test]
    fn extract_text_from_digital_pdf() {
        let pdf_bytes = make_test_pdf(&["Hemoglobin 10.2 g/dL"]);
        let extracted = PdfTextExtractor.extract(&pdf_bytes).unwrap();

        assert_eq!(extracted.page_count, 1);
        assert!(extracted.text.contains("--- Page 1 ---"));
        assert!(
            extracted.text.contains("Hemoglobin"),
            "got: {}",
            extracted.text
        );
    }

    #[test]
    fn page_markers_keep_original_numbers() {
        let pdf_bytes = make_test_pdf(&["First page", "", "Third page"]);
        let extracted = PdfTextExtractor.extract(&pdf_bytes).unwrap();

        assert_eq!(extracted.page_count, 3);
        assert_eq!(extracted.pages_with_text, 2);
        assert!(extracted.text.contains("--- Page 1 ---"));
        assert!(!extracted.text.contains("--- Page 2 ---"));
        assert!(extracted.text.contains("--- Page 3 ---"));
    }

    #[test]
    fn blank_pdf_has_no_text() {
        let pdf_bytes = make_test_pdf(&[""]);
        let result = PdfTextExtractor.extract(&pdf_bytes);
        assert!(matches!(result, Err(ExtractionError::NoText)));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let result = PdfTextExtractor.extract(b"not a pdf");
        assert!(matches!(result, Err(ExtractionError::PdfParsing(_))));
    }

    #[test]
    fn undeclared_font_is_a_parse_error() {
        let pdf_bytes = make_pdf_with_undeclared_font();
        let result = PdfTextExtractor.extract(&pdf_bytes);
        assert!(
            matches!(&result, Err(ExtractionError::PdfParsing(msg)) if msg == UNPARSEABLE),
            "got: {result:?}"
        );
    }

    #[test]
    fn magic_bytes_check() {
        assert!(looks_like_pdf(b"%PDF-1.4\n..."));
        assert!(!looks_like_pdf(b"PK\x03\x04"));
    }
}
