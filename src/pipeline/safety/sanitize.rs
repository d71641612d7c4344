//! Cleaning of user questions before they are placed inside an LLM prompt.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum question length in characters.
pub const MAX_QUESTION_LENGTH: usize = 2_000;

/// A question after cleaning, with a record of what changed.
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizedInput {
    pub text: String,
    pub was_modified: bool,
    pub modifications: Vec<InputModification>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputModification {
    InvisibleUnicodeRemoved,
    ControlCharacterRemoved,
    InjectionPatternRemoved,
    Truncated,
}

static INJECTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Role override attempts
        r"(?i)ignore\s+(?:previous|above|all\s+prior|the\s+above)\s+(?:instructions?|rules?|prompts?)",
        r"(?i)disregard\s+(?:the\s+)?(?:context|instructions?|rules?)",
        r"(?i)forget\s+(?:everything|all|your)\s+(?:previous|prior)?",
        r"(?i)new\s+instructions?:",
        r"(?i)you\s+are\s+now\s+(?:a|an)\s+",
        // Role tags
        r"(?i)system\s*:",
        r"(?i)assistant\s*:",
        r"<<SYS>>",
        r"\[INST\]",
        r"<\|im_start\|>",
        r"<\|im_end\|>",
        // Jailbreaks
        r"(?i)(?:DAN|do\s+anything\s+now)\s+mode",
        r"(?i)reveal\s+(?:your|the)\s+(?:system\s+)?prompt",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Clean a question: strip invisible and control characters (newline and tab
/// survive), replace prompt-injection phrases with `[FILTERED]`, and cap the
/// length at `max_chars` characters on a word boundary.
pub fn sanitize_question(raw: &str, max_chars: usize) -> SanitizedInput {
    let mut modifications = Vec::new();

    let text = remove_invisible_unicode(raw);
    if text != raw {
        modifications.push(InputModification::InvisibleUnicodeRemoved);
    }

    let cleaned = remove_control_characters(&text);
    if cleaned != text {
        modifications.push(InputModification::ControlCharacterRemoved);
    }

    let filtered = remove_injection_patterns(&cleaned);
    if filtered != cleaned {
        modifications.push(InputModification::InjectionPatternRemoved);
    }

    let mut text = filtered;
    if text.chars().count() > max_chars {
        text = truncate_at_word_boundary(&text, max_chars);
        modifications.push(InputModification::Truncated);
    }

    if !modifications.is_empty() {
        tracing::debug!(?modifications, "Question sanitized");
    }

    SanitizedInput {
        text: text.trim().to_string(),
        was_modified: !modifications.is_empty(),
        modifications,
    }
}

fn remove_invisible_unicode(text: &str) -> String {
    text.chars()
        .filter(|c| {
            !matches!(
                *c,
                '\u{200B}'..='\u{200F}'
                    | '\u{202A}'..='\u{202E}'
                    | '\u{2060}'..='\u{2064}'
                    | '\u{2066}'..='\u{2069}'
                    | '\u{FEFF}'
                    | '\u{00AD}'
                    | '\u{034F}'
                    | '\u{061C}'
                    | '\u{180E}'
            )
        })
        .collect()
}

fn remove_control_characters(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

fn remove_injection_patterns(text: &str) -> String {
    INJECTION_PATTERNS
        .iter()
        .fold(text.to_string(), |acc, pattern| {
            pattern.replace_all(&acc, "[FILTERED]").into_owned()
        })
}

/// Cut to `max_chars` characters, backing off to the last whitespace if any.
fn truncate_at_word_boundary(text: &str, max_chars: usize) -> String {
    let end = text
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let truncated = &text[..end];
    match truncated.rfind(char::is_whitespace) {
        Some(pos) if pos > 0 => truncated[..pos].to_string(),
        _ => truncated.to_string(),
    }
}

/// Delimit a sanitized question inside a prompt.
pub fn wrap_question_for_prompt(question: &str) -> String {
    format!("<QUESTION>\n{question}\n</QUESTION>")
}
