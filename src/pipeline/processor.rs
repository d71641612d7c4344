//! Report processing pipeline.
//!
//! PDF → text → chunks → embeddings → fields → summary, then the report row,
//! its test results and its chunk index are written in one transaction.
//! LLM and embedding calls each hold an inference guard for their duration.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::{repository, DatabaseError};
use crate::inference_service::{InferenceService, InferenceServiceError, OperationKind};
use crate::models::enums::{Gender, ReportStatus};
use crate::models::{Report, DEFAULT_REPORT_TYPE};
use crate::pipeline::extraction::{ExtractionError, PdfTextExtractor};
use crate::pipeline::llm::LlmClient;
use crate::pipeline::storage::chunker::RecursiveChunker;
use crate::pipeline::storage::types::{Chunker, EmbeddingModel, VectorStore};
use crate::pipeline::storage::vectordb::SqliteVectorStore;
use crate::pipeline::storage::StorageError;
use crate::pipeline::structuring::prompt::truncate_chars;
use crate::pipeline::structuring::{ExtractedReport, ReportStructurer};

/// Stored summary when the LLM produced none.
pub const FALLBACK_SUMMARY: &str = "Report processed. Ask questions to explore.";

/// Characters of raw text kept on the report row.
pub const MAX_STORED_TEXT_CHARS: usize = 65_000;

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Indexing failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Patient not found: {0}")]
    UnknownPatient(Uuid),

    #[error("No text provided")]
    EmptyText,

    #[error(transparent)]
    Inference(#[from] InferenceServiceError),
}

impl From<rusqlite::Error> for ProcessingError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(DatabaseError::from(err))
    }
}

/// An uploaded PDF awaiting processing.
pub struct UploadInput<'a> {
    pub file_name: &'a str,
    pub pdf_bytes: &'a [u8],
    /// Registered patient named on the upload form, if any.
    pub owner_patient_id: Option<Uuid>,
}

/// What an upload produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedReport {
    pub report: Report,
    pub page_count: usize,
    pub chunks_indexed: usize,
    pub test_results_saved: usize,
}

/// Which LLM passes to run over raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMode {
    /// Extract fields, summarise, and save the report (no index).
    Full,
    ExtractOnly,
    SummaryOnly,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextAnalysis {
    pub extracted: Option<ExtractedReport>,
    pub summary: Option<String>,
    /// Set when `Full` analysis saved a report row.
    pub report_id: Option<String>,
}

pub struct ReportProcessor<'a, L: LlmClient + ?Sized, E: EmbeddingModel + ?Sized> {
    llm: &'a L,
    embedder: &'a E,
    inference: &'a InferenceService,
    chunker: RecursiveChunker,
}

impl<'a, L: LlmClient + ?Sized, E: EmbeddingModel + ?Sized> ReportProcessor<'a, L, E> {
    pub fn new(
        llm: &'a L,
        embedder: &'a E,
        inference: &'a InferenceService,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        Self {
            llm,
            embedder,
            inference,
            chunker: RecursiveChunker::new(chunk_size, chunk_overlap),
        }
    }

    /// Run the full pipeline for an uploaded PDF and persist the result.
    pub fn process_report(
        &self,
        conn: &mut Connection,
        input: &UploadInput<'_>,
        now: NaiveDateTime,
    ) -> Result<ProcessedReport, ProcessingError> {
        if let Some(patient_id) = input.owner_patient_id {
            if !repository::patient_exists(conn, &patient_id)? {
                return Err(ProcessingError::UnknownPatient(patient_id));
            }
        }

        let extracted_text = PdfTextExtractor.extract(input.pdf_bytes)?;
        let raw_text = extracted_text.text;

        let chunks = self.chunker.chunk(&raw_text);
        let embeddings = {
            let _guard = self
                .inference
                .acquire(OperationKind::ReportIndexing, self.embedder.model_name())?;
            let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
            self.embedder.embed_batch(&texts)?
        };
        tracing::info!(file = %input.file_name, chunks = chunks.len(), "Report text embedded");

        let (fields, summary) = self.run_llm_passes(&raw_text, AnalysisMode::Full)?;
        let fields = fields.unwrap_or_default();

        let mut report = report_from_extraction(input.file_name, &fields, now);
        report.owner_patient_id = input.owner_patient_id;
        report.summary = Some(summary.unwrap_or_else(|| FALLBACK_SUMMARY.to_string()));
        report.raw_text = Some(truncate_chars(&raw_text, MAX_STORED_TEXT_CHARS).to_string());
        report.status = ReportStatus::Processed;

        let tx = conn.transaction()?;
        repository::insert_report(&tx, &report)?;
        let test_results_saved =
            repository::insert_test_results(&tx, &report.id, &fields.new_test_results())?;
        let chunks_indexed = SqliteVectorStore::new(&tx).store_chunks(&report.id, &chunks, &embeddings)?;
        tx.commit()?;

        tracing::info!(
            report_id = %report.id,
            pages = extracted_text.page_count,
            chunks = chunks_indexed,
            test_results = test_results_saved,
            "Report processed"
        );

        Ok(ProcessedReport {
            report,
            page_count: extracted_text.page_count,
            chunks_indexed,
            test_results_saved,
        })
    }

    /// LLM passes over raw text without building an index.
    ///
    /// `Full` also saves a report row with its test results; a failed save is
    /// logged and leaves `report_id` empty.
    pub fn analyze_text(
        &self,
        conn: &Connection,
        file_name: &str,
        raw_text: &str,
        mode: AnalysisMode,
        now: NaiveDateTime,
    ) -> Result<TextAnalysis, ProcessingError> {
        if raw_text.trim().is_empty() {
            return Err(ProcessingError::EmptyText);
        }
        let (extracted, summary) = self.run_llm_passes(raw_text, mode)?;

        let report_id = if mode == AnalysisMode::Full {
            let fields = extracted.clone().unwrap_or_default();
            let mut report = report_from_extraction(file_name, &fields, now);
            report.summary = Some(
                summary
                    .clone()
                    .unwrap_or_else(|| format!("Report uploaded on {}", now.format("%Y-%m-%d %H:%M"))),
            );
            report.raw_text = Some(truncate_chars(raw_text, MAX_STORED_TEXT_CHARS).to_string());
            report.status = ReportStatus::Processed;

            match save_with_test_results(conn, &report, &fields) {
                Ok(()) => Some(report.id),
                Err(e) => {
                    tracing::warn!(error = %e, "Could not save analysed report");
                    None
                }
            }
        } else {
            None
        };

        Ok(TextAnalysis {
            extracted,
            summary,
            report_id,
        })
    }

    fn run_llm_passes(
        &self,
        raw_text: &str,
        mode: AnalysisMode,
    ) -> Result<(Option<ExtractedReport>, Option<String>), ProcessingError> {
        let structurer = ReportStructurer::new(self.llm);
        let model = self.llm.label();

        let extracted = if mode != AnalysisMode::SummaryOnly {
            let _guard = self.inference.acquire(OperationKind::ReportExtraction, &model)?;
            Some(structurer.extract_report_fields(raw_text))
        } else {
            None
        };
        let summary = if mode != AnalysisMode::ExtractOnly {
            let _guard = self.inference.acquire(OperationKind::ReportSummary, &model)?;
            structurer.generate_summary(raw_text)
        } else {
            None
        };
        Ok((extracted, summary))
    }
}

fn save_with_test_results(
    conn: &Connection,
    report: &Report,
    fields: &ExtractedReport,
) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    repository::insert_report(&tx, report)?;
    repository::insert_test_results(&tx, &report.id, &fields.new_test_results())?;
    tx.commit()?;
    Ok(())
}

/// New report row populated from extracted fields, with defaults for gaps.
fn report_from_extraction(file_name: &str, fields: &ExtractedReport, now: NaiveDateTime) -> Report {
    let mut report = Report::new(file_name, now);
    report.patient_name = fields.patient_name.clone();
    report.patient_age = fields.patient_age;
    report.patient_gender = fields
        .patient_gender
        .as_deref()
        .map(Gender::from_loose)
        .unwrap_or(Gender::Unknown);
    report.patient_ref = fields.patient_id.clone();
    report.report_date = fields.report_date.clone();
    report.report_type = fields
        .report_type
        .clone()
        .unwrap_or_else(|| DEFAULT_REPORT_TYPE.to_string());
    report.hospital_name = fields.hospital_name.clone();
    report.doctor_name = fields.doctor_name.clone();
    report.diagnosis = fields.diagnosis.clone();
    report.key_findings = fields.key_findings.clone();
    report.recommendations = fields.recommendations.clone();
    report
}
