use serde_json::{Map, Value};

use super::types::{ExtractedReport, ExtractedTestResult};
use super::StructuringError;

/// Upper bound for a believable age.
const MAX_AGE: u64 = 150;

/// Parse the extraction response into report fields.
///
/// Accepts bare JSON, fenced JSON, or JSON surrounded by prose. Field values
/// are read leniently: numbers where text was asked for become text, numeric
/// strings become ages, and test results without a name are skipped.
pub fn parse_extraction_response(response: &str) -> Result<ExtractedReport, StructuringError> {
    let json_str = isolate_json_object(strip_code_fences(response))
        .ok_or_else(|| StructuringError::MalformedResponse("No JSON object found".into()))?;

    let value: Value =
        serde_json::from_str(json_str).map_err(|e| StructuringError::JsonParsing(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| StructuringError::MalformedResponse("Top-level JSON is not an object".into()))?;

    Ok(ExtractedReport {
        patient_name: text_field(obj, "patient_name"),
        patient_age: age_field(obj.get("patient_age")),
        patient_gender: text_field(obj, "patient_gender"),
        patient_id: text_field(obj, "patient_id"),
        report_date: text_field(obj, "report_date"),
        report_type: text_field(obj, "report_type"),
        hospital_name: text_field(obj, "hospital_name"),
        doctor_name: text_field(obj, "doctor_name"),
        diagnosis: text_field(obj, "diagnosis"),
        key_findings: text_field(obj, "key_findings"),
        recommendations: text_field(obj, "recommendations"),
        test_results: parse_test_results_lenient(obj.get("test_results")),
    })
}

/// Remove a surrounding Markdown code fence (```json ... ``` or ``` ... ```).
pub fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };
    let after_open = &trimmed[open + 3..];
    // Drop the info string (e.g. "json") up to the end of the fence line.
    let body = match after_open.find('\n') {
        Some(nl) if after_open[..nl].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
            &after_open[nl + 1..]
        }
        _ => after_open,
    };
    let end = body.find("```").unwrap_or(body.len());
    body[..end].trim()
}

fn isolate_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Text value, or a number rendered as text. Blank and "null"-like strings are absent.
fn text_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let s = s.trim();
            let placeholder = matches!(
                s.to_ascii_lowercase().as_str(),
                "" | "null" | "none" | "n/a" | "na" | "unknown" | "not found" | "not specified"
            );
            (!placeholder).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(|v| text_value(Some(v))).collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        _ => None,
    }
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    text_value(obj.get(key))
}

/// Age from `45`, `45.0`, `"45"` or `"45 years"`.
fn age_field(value: Option<&Value>) -> Option<u32> {
    let age = match value? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))?,
        Value::String(s) => {
            let digits: String = s
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse().ok()?
        }
        _ => return None,
    };
    (age <= MAX_AGE).then_some(age as u32)
}

/// Keep well-formed test results, skip the rest.
fn parse_test_results_lenient(value: Option<&Value>) -> Vec<ExtractedTestResult> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            Some(ExtractedTestResult {
                test_name: text_field(obj, "test_name")?,
                test_value: text_field(obj, "test_value"),
                unit: text_field(obj, "unit"),
                normal_range: text_field(obj, "normal_range"),
                status: text_field(obj, "status"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response() -> String {
        r#"```json
{
  "patient_name": "Ravi Kumar",
  "patient_age": 52,
  "patient_gender": "Male",
  "patient_id": "MRN-2231",
  "report_date": "2024-03-14",
  "report_type": "Blood Test",
  "hospital_name": "City General Hospital",
  "doctor_name": "Dr. Meera Iyer",
  "diagnosis": "Iron deficiency anemia",
  "key_findings": "Low hemoglobin and ferritin",
  "recommendations": "Oral iron supplements, repeat CBC in 6 weeks",
  "test_results": [
    {"test_name": "Hemoglobin", "test_value": 10.2, "unit": "g/dL", "normal_range": "13.5-17.5", "status": "Low"},
    {"test_name": "Ferritin", "test_value": "8", "unit": "ng/mL", "normal_range": "30-400", "status": "Abnormal"}
  ]
}
```"#
            .to_string()
    }

    #[test]
    fn parses_fenced_response() {
        let report = parse_extraction_response(&sample_response()).unwrap();
        assert_eq!(report.patient_name.as_deref(), Some("Ravi Kumar"));
        assert_eq!(report.patient_age, Some(52));
        assert_eq!(report.report_type.as_deref(), Some("Blood Test"));
        assert_eq!(report.test_results.len(), 2);
        assert_eq!(report.test_results[0].test_value.as_deref(), Some("10.2"));
    }

    #[test]
    fn parses_bare_and_prose_wrapped_json() {
        let bare = r#"{"diagnosis": "Hypertension"}"#;
        assert_eq!(
            parse_extraction_response(bare).unwrap().diagnosis.as_deref(),
            Some("Hypertension")
        );

        let wrapped = r#"Here is the data: {"diagnosis": "Hypertension"} Hope this helps."#;
        assert_eq!(
            parse_extraction_response(wrapped).unwrap().diagnosis.as_deref(),
            Some("Hypertension")
        );
    }

    #[test]
    fn age_accepts_numeric_strings() {
        let report = parse_extraction_response(r#"{"patient_age": "45 years"}"#).unwrap();
        assert_eq!(report.patient_age, Some(45));

        let report = parse_extraction_response(r#"{"patient_age": 45.0}"#).unwrap();
        assert_eq!(report.patient_age, Some(45));

        let report = parse_extraction_response(r#"{"patient_age": "unknown"}"#).unwrap();
        assert_eq!(report.patient_age, None);

        let report = parse_extraction_response(r#"{"patient_age": 400}"#).unwrap();
        assert_eq!(report.patient_age, None);
    }

    #[test]
    fn null_and_placeholder_fields_are_absent() {
        let report =
            parse_extraction_response(r#"{"hospital_name": null, "doctor_name": "N/A", "diagnosis": "  "}"#)
                .unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn malformed_test_results_are_skipped() {
        let json = r#"{"test_results": [
            {"test_name": "TSH", "test_value": "2.1"},
            {"test_value": "no name"},
            "not an object",
            {"test_name": "", "test_value": "blank name"}
        ]}"#;
        let report = parse_extraction_response(json).unwrap();
        assert_eq!(report.test_results.len(), 1);
        assert_eq!(report.test_results[0].test_name, "TSH");
    }

    #[test]
    fn non_array_test_results_ignored() {
        let report = parse_extraction_response(r#"{"test_results": "none"}"#).unwrap();
        assert!(report.test_results.is_empty());
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(
            parse_extraction_response("I could not read this report."),
            Err(StructuringError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_extraction_response("{\"diagnosis\": }"),
            Err(StructuringError::JsonParsing(_))
        ));
    }

    #[test]
    fn strip_fences_variants() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }
}
