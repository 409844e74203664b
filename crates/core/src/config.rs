//! Immutable tables and tunables injected into the search and routing layers.

const DEFAULT_PROCEDURES: &[(&str, &str)] = &[
    ("colonoscopy", "gastroenterology, colorectal surgery, general surgery"),
    ("mri", "radiology, diagnostic imaging"),
    ("ct scan", "radiology, diagnostic imaging"),
    ("ultrasound", "radiology, diagnostic imaging"),
    ("mammogram", "radiology, breast imaging"),
    ("obgyn", "obstetrics, gynecology, women's health"),
    ("pregnancy", "obstetrics, gynecology"),
    ("physical therapy", "physical therapy, rehabilitation, orthopedics"),
    ("rehab", "physical therapy, rehabilitation"),
    ("internal medicine", "internal medicine, primary care, general practice"),
    ("pediatric", "pediatrics, family medicine"),
];

const DEFAULT_PROVIDER_HINTS: &[&str] = &[
    "find provider",
    "providers near",
    "doctor near",
    "mri",
    "x-ray",
    "xray",
    "scan",
    "colonoscopy",
    "obgyn",
    "pediatric",
    "cardiology",
    "gastro",
    "orthopedic",
    "therapy",
    "imaging",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    pub initial_radius_miles: f64,
    pub expanded_radius_miles: f64,
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            initial_radius_miles: 15.0,
            expanded_radius_miles: 30.0,
            max_results: 5,
        }
    }
}

/// Request keyword to comma-separated specialty phrase. The first keyword
/// found in the request (in table order) wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureTable {
    entries: Vec<(String, String)>,
}

impl ProcedureTable {
    pub fn new<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(keyword, specialty)| (keyword.into().to_lowercase(), specialty.into()))
                .collect(),
        }
    }

    pub fn lookup(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.entries
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword.as_str()))
            .map(|(_, specialty)| specialty.as_str())
    }
}

impl Default for ProcedureTable {
    fn default() -> Self {
        Self::new(DEFAULT_PROCEDURES.iter().copied())
    }
}

/// Phrases that mark a request as a provider search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderHints {
    phrases: Vec<String>,
}

impl ProviderHints {
    pub fn new<S: Into<String>>(phrases: impl IntoIterator<Item = S>) -> Self {
        Self {
            phrases: phrases
                .into_iter()
                .map(|phrase| phrase.into().to_lowercase())
                .collect(),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.phrases
            .iter()
            .any(|phrase| lowered.contains(phrase.as_str()))
    }
}

impl Default for ProviderHints {
    fn default() -> Self {
        Self::new(DEFAULT_PROVIDER_HINTS.iter().copied())
    }
}
