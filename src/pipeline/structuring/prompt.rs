/// Characters of report text placed in any prompt.
pub const MAX_PROMPT_TEXT_CHARS: usize = 15_000;

pub const EXTRACTION_TEMPERATURE: f32 = 0.1;
pub const SUMMARY_TEMPERATURE: f32 = 0.3;

pub const EXTRACTION_SYSTEM_PROMPT: &str = "\
You extract structured data from medical reports. Use only information \
explicitly present in the report. Never guess or add interpretation. \
Use null for any field that is missing.";

pub const SUMMARY_SYSTEM_PROMPT: &str = "\
You write clear, factual summaries of medical reports for patients and \
their doctors. Only state what the report says.";

/// Build the field-extraction prompt.
pub fn build_extraction_prompt(raw_text: &str) -> String {
    let report = truncate_chars(raw_text, MAX_PROMPT_TEXT_CHARS);
    format!(
        r#"Analyze the following medical report and extract information in JSON format.
Return ONLY valid JSON, no additional text.

Extract these fields (use null if not found):
- patient_name: Full name
- patient_age: Age as number
- patient_gender: Male/Female/Other
- patient_id: Patient ID or registration number
- report_date: Date in YYYY-MM-DD format
- report_type: Blood Test/X-Ray/MRI/CT/Pathology/etc
- hospital_name: Hospital/clinic name
- doctor_name: Doctor's name
- diagnosis: Main diagnosis/findings
- key_findings: Important observations
- recommendations: Doctor's recommendations
- test_results: Array of {{"test_name", "test_value", "unit", "normal_range", "status"}} where status is Normal/Abnormal/Critical

Medical Report:
{report}"#
    )
}

/// Build the summary prompt.
pub fn build_summary_prompt(raw_text: &str) -> String {
    let report = truncate_chars(raw_text, MAX_PROMPT_TEXT_CHARS);
    format!(
        r#"Generate a comprehensive medical summary from this report.

Include:
1. Patient Overview (demographics, reason for the report)
2. Key Test Results and Values
3. Main Diagnosis/Findings
4. Notable Abnormalities
5. Recommendations and Follow-up

Keep it concise (200-400 words).

Report:
{report}"#
    )
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
