use crate::error::ModelError;
use crate::models::{CareSummary, TermExplanation};
use crate::redact::Redactor;
use crate::traits::LanguageModel;
use serde_json::{Map, Value};
use tracing::{debug, warn};

pub const CAREGIVER_SYSTEM_PROMPT: &str = "You are a compassionate, clear medical-notes translator for a non-medical caregiver. \
Your task: summarize, explain medical terms, and list brief actionable points. Do NOT give medical advice.";

const EMPTY_NOTES_RESPONSE: &str = "Please provide the medical notes you would like summarized.";
const MAX_FALLBACK_BULLETS: usize = 6;

/// Summarizes medical notes into plain language for a caregiver.
pub struct CaregiverCompanion<L> {
    model: L,
    redactor: Redactor,
    redact_phi: bool,
}

impl<L> CaregiverCompanion<L>
where
    L: LanguageModel + Send + Sync,
{
    pub fn new(model: L) -> Result<Self, regex::Error> {
        Ok(Self {
            model,
            redactor: Redactor::new()?,
            redact_phi: true,
        })
    }

    pub fn with_redaction(mut self, enabled: bool) -> Self {
        self.redact_phi = enabled;
        self
    }

    pub async fn summarize(&self, notes: &str) -> Result<CareSummary, ModelError> {
        if notes.trim().is_empty() {
            return Ok(CareSummary::default());
        }

        let notes = if self.redact_phi {
            self.redactor.redact(notes)
        } else {
            notes.to_string()
        };

        let prompt = format!(
            "Given the medical notes below:\n\
             1. Write a 2-4 sentence plain-language summary.\n\
             2. Explain up to 8 medical terms.\n\
             3. Provide up to 6 actionable items.\n\
             4. Mention unclear information if any.\n\
             Return JSON with keys: summary, explanations, action_items, unclear.\n\n\
             {notes}"
        );

        let raw = self.model.complete(&prompt).await?;
        debug!(response_chars = raw.len(), "caregiver model responded");
        Ok(parse_care_summary(&raw))
    }

    /// Summary rendered as text; model failures become the response text.
    pub async fn respond(&self, notes: &str) -> String {
        if notes.trim().is_empty() {
            return EMPTY_NOTES_RESPONSE.to_string();
        }

        match self.summarize(notes).await {
            Ok(summary) => render_care_summary(&summary),
            Err(error) => {
                warn!(error = %error, "note summarization failed");
                format!("Failed to summarize notes: {error}")
            }
        }
    }
}

/// Reads a model reply as JSON, as JSON embedded in prose, or as a first-line
/// summary followed by bullet lines.
pub fn parse_care_summary(raw: &str) -> CareSummary {
    if let Some(fields) = parse_object(raw.trim()) {
        return summary_from_fields(&fields);
    }

    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if start < end {
            if let Some(fields) = parse_object(&raw[start..=end]) {
                return summary_from_fields(&fields);
            }
        }
    }

    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    CareSummary {
        summary: lines.first().map(|line| line.to_string()).unwrap_or_default(),
        explanations: Vec::new(),
        action_items: lines
            .iter()
            .skip(1)
            .filter(|line| line.starts_with('-') || line.starts_with('*'))
            .map(|line| line.trim_start_matches(['-', '*', ' ']).trim().to_string())
            .take(MAX_FALLBACK_BULLETS)
            .collect(),
        unclear: Vec::new(),
    }
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(fields)) => Some(fields),
        _ => None,
    }
}

fn summary_from_fields(fields: &Map<String, Value>) -> CareSummary {
    CareSummary {
        summary: first_string(fields, &["summary", "Summary"]),
        explanations: explanations(first_present(fields, &["explanations", "terms"])),
        action_items: string_list(first_present(fields, &["action_items", "actions"])),
        unclear: string_list(fields.get("unclear")),
    }
}

fn first_present<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find(|value| !is_blank(value))
}

fn first_string(fields: &Map<String, Value>, keys: &[&str]) -> String {
    first_present(fields, keys)
        .and_then(Value::as_str)
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

fn explanations(value: Option<&Value>) -> Vec<TermExplanation> {
    match value {
        Some(Value::Object(terms)) => terms
            .iter()
            .map(|(term, explanation)| TermExplanation {
                term: term.clone(),
                explanation: value_text(explanation),
            })
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(entry) => Some(TermExplanation {
                    term: entry
                        .get("term")
                        .map(value_text)
                        .filter(|term| !term.is_empty())
                        .unwrap_or_else(|| "Term".to_string()),
                    explanation: entry.get("explanation").map(value_text).unwrap_or_default(),
                }),
                Value::Null => None,
                other => Some(TermExplanation {
                    term: value_text(other),
                    explanation: String::new(),
                }),
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(value_text)
            .filter(|item| !item.is_empty())
            .collect(),
        Some(Value::String(text)) if !text.trim().is_empty() => vec![text.trim().to_string()],
        _ => Vec::new(),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn render_care_summary(summary: &CareSummary) -> String {
    let mut sections = Vec::new();

    if !summary.summary.is_empty() {
        sections.push(format!("=== Summary ===\n{}", summary.summary));
    }
    if !summary.explanations.is_empty() {
        let lines = summary
            .explanations
            .iter()
            .map(|entry| {
                if entry.explanation.is_empty() {
                    format!("- {}", entry.term)
                } else {
                    format!("- {}: {}", entry.term, entry.explanation)
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(format!("=== Explanations ===\n{lines}"));
    }
    if !summary.action_items.is_empty() {
        sections.push(format!("=== Action Items ===\n{}", bullet_list(&summary.action_items)));
    }
    if !summary.unclear.is_empty() {
        sections.push(format!("=== Unclear / Missing ===\n{}", bullet_list(&summary.unclear)));
    }

    if sections.is_empty() {
        "No summary could be produced from these notes.".to_string()
    } else {
        sections.join("\n\n")
    }
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
