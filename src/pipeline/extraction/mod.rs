pub mod pdf;

pub use pdf::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("No readable text found in PDF")]
    NoText,
}
