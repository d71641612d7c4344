use super::parser::parse_extraction_response;
use super::prompt::{
    build_extraction_prompt, build_summary_prompt, EXTRACTION_SYSTEM_PROMPT,
    EXTRACTION_TEMPERATURE, SUMMARY_SYSTEM_PROMPT, SUMMARY_TEMPERATURE,
};
use super::types::ExtractedReport;
use super::StructuringError;
use crate::pipeline::llm::{GenerationOptions, LlmClient};

/// Fresh LLM calls after an unparsable extraction response.
const MAX_PARSE_RETRIES: usize = 1;

/// Runs field extraction and summarisation against one LLM.
pub struct ReportStructurer<'a, L: LlmClient + ?Sized> {
    llm: &'a L,
}

impl<'a, L: LlmClient + ?Sized> ReportStructurer<'a, L> {
    pub fn new(llm: &'a L) -> Self {
        Self { llm }
    }

    /// Extract structured fields. A response that fails to parse is retried
    /// once; LLM transport errors are returned immediately.
    pub fn try_extract_fields(&self, raw_text: &str) -> Result<ExtractedReport, StructuringError> {
        if raw_text.trim().is_empty() {
            return Err(StructuringError::EmptyInput);
        }
        let prompt = build_extraction_prompt(raw_text);
        let options = GenerationOptions::with_temperature(EXTRACTION_TEMPERATURE);

        let mut attempt = 0;
        loop {
            let response = self.llm.generate(EXTRACTION_SYSTEM_PROMPT, &prompt, &options)?;
            match parse_extraction_response(&response) {
                Ok(report) => return Ok(report),
                Err(e) if attempt < MAX_PARSE_RETRIES => {
                    tracing::warn!(attempt = attempt + 1, error = %e, "Extraction response unparsable, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Extract structured fields, degrading to an empty extraction on any failure.
    pub fn extract_report_fields(&self, raw_text: &str) -> ExtractedReport {
        match self.try_extract_fields(raw_text) {
            Ok(report) => {
                tracing::info!(
                    llm = %self.llm.label(),
                    test_results = report.test_results.len(),
                    "Report fields extracted"
                );
                report
            }
            Err(e) => {
                tracing::warn!(error = %e, "Field extraction failed, continuing without fields");
                ExtractedReport::default()
            }
        }
    }

    pub fn try_generate_summary(&self, raw_text: &str) -> Result<String, StructuringError> {
        if raw_text.trim().is_empty() {
            return Err(StructuringError::EmptyInput);
        }
        let prompt = build_summary_prompt(raw_text);
        let options = GenerationOptions::with_temperature(SUMMARY_TEMPERATURE);
        let summary = self.llm.generate(SUMMARY_SYSTEM_PROMPT, &prompt, &options)?;
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(StructuringError::MalformedResponse("Empty summary".into()));
        }
        Ok(summary.to_string())
    }

    /// Summary text, or `None` when the LLM fails; the caller picks a fallback.
    pub fn generate_summary(&self, raw_text: &str) -> Option<String> {
        self.try_generate_summary(raw_text)
            .map_err(|e| tracing::warn!(error = %e, "Summary generation failed"))
            .ok()
    }
}
