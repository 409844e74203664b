use crate::models::ProviderRecord;
use std::collections::BTreeSet;

const DEFAULT_SYNONYMS: &[(&str, &[&str])] = &[
    // gastroenterology
    ("gastro", &["digestive", "colon", "rectal", "bowel", "endoscopy", "colorectal"]),
    ("colorectal", &["colon", "rectal", "proctology", "colon and rectal"]),
    ("digestive", &["gastro", "colon", "bowel"]),
    // radiology and imaging
    (
        "radiology",
        &[
            "imaging",
            "diagnostic",
            "mri",
            "ct",
            "scan",
            "x-ray",
            "ultrasound",
            "nuclear medicine",
            "mammogram",
            "breast imaging",
        ],
    ),
    ("mri", &["radiology", "imaging", "diagnostic", "magnetic resonance"]),
    ("x-ray", &["radiology", "imaging", "diagnostic"]),
    ("ultrasound", &["radiology", "imaging", "sonography"]),
    ("mammogram", &["radiology", "breast imaging"]),
    // cardiology
    (
        "cardiology",
        &["cardiac", "heart", "vascular", "echocardiography", "cardiovascular", "angiogram"],
    ),
    ("cardiac", &["cardiology", "heart", "cardiothoracic"]),
    // women's health
    ("obstetric", &["obstetrics", "gynecology", "women", "pregnancy", "ob/gyn", "obgyn"]),
    ("gynecology", &["obstetrics", "women", "ob/gyn", "obgyn", "female"]),
    // primary care
    ("family", &["primary care", "general practice", "internal medicine", "pediatrics"]),
    ("internal", &["internal medicine", "primary care", "general practice"]),
    ("pediatric", &["child", "children", "pediatrics", "family"]),
    // orthopedics and rehab
    (
        "orthopedic",
        &["sports medicine", "physical therapy", "rehabilitation", "joint", "musculoskeletal"],
    ),
    ("rehabilitation", &["physical therapy", "occupational therapy", "sports medicine"]),
    ("therapy", &["physical therapy", "occupational therapy", "rehab", "speech therapy"]),
    // surgery
    (
        "surgery",
        &[
            "surgical",
            "general surgery",
            "orthopedic surgery",
            "colorectal surgery",
            "cardiac surgery",
            "plastic surgery",
        ],
    ),
    ("plastic", &["cosmetic", "reconstructive", "aesthetic surgery"]),
    ("urology", &["urinary", "kidney", "bladder", "prostate"]),
    // dental and vision
    ("dental", &["dentistry", "oral", "teeth"]),
    ("optometry", &["eye", "vision", "ophthalmology"]),
    ("ophthalmology", &["optometry", "eye", "vision"]),
    // mental health
    ("psychiatry", &["mental health", "psychology", "behavioral health", "therapy"]),
    ("psychology", &["counseling", "mental health", "behavioral health"]),
];

/// Canonical specialty token to related tokens, in table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynonymTable {
    entries: Vec<(String, Vec<String>)>,
}

impl SynonymTable {
    pub fn new<K, V>(entries: impl IntoIterator<Item = (K, Vec<V>)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(key, synonyms)| {
                    (
                        key.into().to_lowercase(),
                        synonyms.into_iter().map(Into::into).collect(),
                    )
                })
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Synonym sets whose key overlaps `token` as a substring in either direction.
    pub fn related<'a>(&'a self, token: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        self.entries
            .iter()
            .filter(move |(key, _)| key.contains(token) || token.contains(key.as_str()))
            .flat_map(|(_, synonyms)| synonyms.iter())
    }
}

impl Default for SynonymTable {
    fn default() -> Self {
        Self::new(
            DEFAULT_SYNONYMS
                .iter()
                .map(|(key, synonyms)| (*key, synonyms.to_vec())),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfilteredReason {
    /// Nothing was requested.
    NoTerms,
    /// Terms were requested but no record matched any of them.
    NoMatch,
}

/// Result of a specialty match. `Unfiltered` still carries every input record
/// so callers can show nearby options, but is distinguishable from a real match.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecialtyMatch {
    Filtered(Vec<ProviderRecord>),
    Unfiltered {
        records: Vec<ProviderRecord>,
        reason: UnfilteredReason,
    },
}

impl SpecialtyMatch {
    pub fn is_filtered(&self) -> bool {
        matches!(self, SpecialtyMatch::Filtered(_))
    }

    pub fn records(&self) -> &[ProviderRecord] {
        match self {
            SpecialtyMatch::Filtered(records) => records,
            SpecialtyMatch::Unfiltered { records, .. } => records,
        }
    }

    /// Records from a real match only.
    pub fn into_filtered(self) -> Option<Vec<ProviderRecord>> {
        match self {
            SpecialtyMatch::Filtered(records) => Some(records),
            SpecialtyMatch::Unfiltered { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpecialtyMatcher {
    synonyms: SynonymTable,
}

impl SpecialtyMatcher {
    pub fn new(synonyms: SynonymTable) -> Self {
        Self { synonyms }
    }

    /// Atomic request tokens plus their synonym expansion, punctuation-normalized.
    pub fn expand_terms(&self, requested: &[String]) -> BTreeSet<String> {
        let base: BTreeSet<String> = requested
            .iter()
            .flat_map(|term| term.split([',', '/']))
            .map(|part| part.trim().to_lowercase())
            .filter(|part| !part.is_empty())
            .collect();

        let mut expanded = base.clone();
        for token in &base {
            expanded.extend(self.synonyms.related(token).cloned());
        }

        expanded
            .iter()
            .map(|token| normalize_specialty(token))
            .filter(|token| !token.is_empty())
            .collect()
    }

    pub fn match_records(&self, records: &[ProviderRecord], requested: &[String]) -> SpecialtyMatch {
        let tokens = self.expand_terms(requested);
        if tokens.is_empty() {
            return SpecialtyMatch::Unfiltered {
                records: records.to_vec(),
                reason: UnfilteredReason::NoTerms,
            };
        }

        let matched: Vec<ProviderRecord> = records
            .iter()
            .filter(|record| {
                let specialty = normalize_specialty(&record.specialty);
                !specialty.is_empty() && tokens.iter().any(|token| specialty.contains(token.as_str()))
            })
            .cloned()
            .collect();

        if matched.is_empty() {
            SpecialtyMatch::Unfiltered {
                records: records.to_vec(),
                reason: UnfilteredReason::NoMatch,
            }
        } else {
            SpecialtyMatch::Filtered(matched)
        }
    }
}

/// Lower-cases and turns every non-alphanumeric character into a space, so
/// "OB/GYN" reads as "ob gyn".
pub fn normalize_specialty(text: &str) -> String {
    let spaced: String = text
        .to_lowercase()
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == ' ' { ch } else { ' ' })
        .collect();
    spaced.trim().to_string()
}
