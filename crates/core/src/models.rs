use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const UNKNOWN_PROVIDER: &str = "Unknown Provider";

/// One provider at one street address. An organization listing several
/// addresses becomes several records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderRecord {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    /// Always exactly five ASCII digits.
    pub zip: String,
    pub specialty: String,
    pub website: String,
    /// Source entry, kept for diagnostics only.
    pub raw: Value,
}

impl ProviderRecord {
    /// Pipe-delimited display line. Empty fields are left out.
    pub fn display_line(&self) -> String {
        let name = if self.name.is_empty() {
            "Unknown".to_string()
        } else {
            self.name.clone()
        };
        let state_zip = format!("{} {}", self.state, self.zip);
        let location = [self.address.as_str(), self.city.as_str(), state_zip.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        [
            format!("**{name}**"),
            self.specialty.clone(),
            location,
            self.phone.clone(),
            self.website.clone(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostalArea<'a> {
    pub zip: &'a str,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRequest {
    pub zip_code: String,
    pub radius_miles: f64,
    pub procedure: String,
}

impl SearchRequest {
    pub fn procedure_label(&self) -> &str {
        if self.procedure.trim().is_empty() {
            "general care"
        } else {
            &self.procedure
        }
    }

    /// Comma-separated specialty phrases, as handed to the specialty matcher.
    pub fn requested_terms(&self) -> Vec<String> {
        if self.procedure.trim().is_empty() {
            Vec::new()
        } else {
            vec![self.procedure.clone()]
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Mode {
    Caregiver,
    Provider,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Caregiver => f.write_str("caregiver"),
            Mode::Provider => f.write_str("provider"),
        }
    }
}

/// Which stage of the fallback policy produced the results.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MatchTier {
    Initial,
    ExpandedRadius,
    NearbyFallback,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found {
        request: SearchRequest,
        providers: Vec<ProviderRecord>,
        tier: MatchTier,
        summary: String,
    },
    NoProviders {
        request: SearchRequest,
        max_radius_miles: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TermExplanation {
    pub term: String,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CareSummary {
    pub summary: String,
    pub explanations: Vec<TermExplanation>,
    pub action_items: Vec<String>,
    pub unclear: Vec<String>,
}

impl CareSummary {
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
            && self.explanations.is_empty()
            && self.action_items.is_empty()
            && self.unclear.is_empty()
    }
}
