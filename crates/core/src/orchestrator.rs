use crate::config::{ProcedureTable, SearchConfig};
use crate::directory::{extract_zip5, load_directory};
use crate::geo::GeoFilter;
use crate::specialty::SpecialtyMatcher;
use crate::traits::{DirectorySource, LanguageModel};
use crate::{MatchTier, ProviderRecord, SearchError, SearchOutcome, SearchRequest};
use regex::Regex;
use tracing::{info, warn};

pub const PROVIDER_SYSTEM_PROMPT: &str = "You are ProviderCompanion, an empathetic healthcare provider assistant.
Your job is to find and summarize nearby healthcare providers for a user's request.
Be concise, accurate, and friendly. Never give a medical diagnosis.";

const CLASSIFY_INSTRUCTION: &str =
    "Return only the most likely specialty names, comma-separated (no explanations).";

const REPLY_PREAMBLE: &str = r"the most likely.*?is";
const REPLY_DISALLOWED: &str = r"[^a-z, ]";

/// Finds nearby providers for a free-text request, widening the search when
/// the requested specialty is not found close by.
pub struct ProviderSearch<D, L> {
    directory: D,
    model: L,
    geo: GeoFilter,
    matcher: SpecialtyMatcher,
    procedures: ProcedureTable,
    config: SearchConfig,
    reply_preamble: Regex,
    reply_disallowed: Regex,
}

impl<D, L> ProviderSearch<D, L>
where
    D: DirectorySource + Send + Sync,
    L: LanguageModel + Send + Sync,
{
    pub fn new(directory: D, model: L, geo: GeoFilter) -> Result<Self, regex::Error> {
        Ok(Self {
            directory,
            model,
            geo,
            matcher: SpecialtyMatcher::default(),
            procedures: ProcedureTable::default(),
            config: SearchConfig::default(),
            reply_preamble: Regex::new(REPLY_PREAMBLE)?,
            reply_disallowed: Regex::new(REPLY_DISALLOWED)?,
        })
    }

    pub fn with_matcher(mut self, matcher: SpecialtyMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_procedures(mut self, procedures: ProcedureTable) -> Self {
        self.procedures = procedures;
        self
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Full search rendered as the user-facing response.
    pub async fn search(&self, user_query: &str) -> String {
        match self.run(user_query).await {
            Ok(outcome) => render_outcome(&outcome),
            Err(SearchError::MissingZip) => {
                "Please include a 5-digit ZIP code so I can look for providers near you.".to_string()
            }
            Err(SearchError::Directory(error)) => format!("Failed to load provider data: {error}"),
        }
    }

    pub async fn run(&self, user_query: &str) -> Result<SearchOutcome, SearchError> {
        let request = self.plan(user_query).await?;
        let initial = self.config.initial_radius_miles;
        let expanded = self.config.expanded_radius_miles;

        info!(
            procedure = %request.procedure,
            zip = %request.zip_code,
            radius_miles = initial,
            "searching providers"
        );

        let directory = load_directory(&self.directory).await?;
        let terms = request.requested_terms();

        let mut tier = MatchTier::Initial;
        let mut nearby = self.geo.filter_by_zip(&directory, &request.zip_code, initial);
        let mut matched = self.matcher.match_records(&nearby, &terms).into_filtered();

        if matched.is_none() {
            warn!(
                from_miles = initial,
                to_miles = expanded,
                "no specialty match, expanding search radius"
            );
            tier = MatchTier::ExpandedRadius;
            nearby = self.geo.filter_by_zip(&directory, &request.zip_code, expanded);
            matched = self.matcher.match_records(&nearby, &terms).into_filtered();
        }

        let mut providers = match matched {
            Some(providers) => providers,
            None if nearby.is_empty() => {
                info!(zip = %request.zip_code, radius_miles = expanded, "no providers found");
                return Ok(SearchOutcome::NoProviders {
                    request,
                    max_radius_miles: expanded,
                });
            }
            None => {
                warn!(
                    radius_miles = expanded,
                    available = nearby.len(),
                    "still no specialty match, showing closest providers"
                );
                tier = MatchTier::NearbyFallback;
                nearby
            }
        };
        providers.truncate(self.config.max_results);

        let summary = self.summarize(user_query, &providers, tier).await;

        Ok(SearchOutcome::Found {
            request,
            providers,
            tier,
            summary,
        })
    }

    /// Pulls the ZIP and requested procedure out of the query.
    pub async fn plan(&self, user_query: &str) -> Result<SearchRequest, SearchError> {
        let zip_code = extract_zip5(user_query).ok_or(SearchError::MissingZip)?;
        let procedure = self.detect_procedure(user_query).await;

        Ok(SearchRequest {
            zip_code,
            radius_miles: self.config.initial_radius_miles,
            procedure,
        })
    }

    /// Keyword table first, then the language model. A model failure leaves
    /// the procedure empty, which later selects the generic fallback.
    pub async fn detect_procedure(&self, user_query: &str) -> String {
        if let Some(specialty) = self.procedures.lookup(user_query) {
            return specialty.to_string();
        }

        let prompt = format!(
            "You map a healthcare request to likely specialties or procedures.\n\
             User asked: '{user_query}'. {CLASSIFY_INSTRUCTION}"
        );

        match self.model.complete(&prompt).await {
            Ok(reply) => self.clean_specialty_reply(&reply),
            Err(error) => {
                warn!(error = %error, "specialty classification failed");
                String::new()
            }
        }
    }

    /// Lower-cases a classification reply, drops "the most likely ... is"
    /// preambles and keeps only letters, commas and spaces.
    pub fn clean_specialty_reply(&self, reply: &str) -> String {
        let lowered = reply.trim().to_lowercase();
        let without_preamble = self.reply_preamble.replace_all(&lowered, "");
        self.reply_disallowed
            .replace_all(&without_preamble, "")
            .trim()
            .to_string()
    }

    async fn summarize(&self, user_query: &str, providers: &[ProviderRecord], tier: MatchTier) -> String {
        let listing = provider_listing(providers);
        let note = match tier {
            MatchTier::Initial => format!(
                "These providers are within {} miles.",
                self.config.initial_radius_miles
            ),
            MatchTier::ExpandedRadius => format!(
                "The search radius was expanded from {} to {} miles to find a match.",
                self.config.initial_radius_miles, self.config.expanded_radius_miles
            ),
            MatchTier::NearbyFallback => format!(
                "No provider matched the requested specialty within {} miles, so the search criteria \
                 were broadened to the closest providers of any specialty.",
                self.config.expanded_radius_miles
            ),
        };

        let prompt = format!(
            "User asked: \"{user_query}\"\n\
             Here are nearby providers found in the provider directory:\n\
             {listing}\n\
             {note}\n\
             Provide a short, friendly summary (2-3 sentences) describing these options and note if the \
             search radius was expanded or the criteria broadened."
        );

        match self.model.complete(&prompt).await {
            Ok(summary) => summary.trim().to_string(),
            Err(error) => {
                warn!(error = %error, "provider summary failed");
                format!("(Summary unavailable: {error})")
            }
        }
    }
}

pub fn provider_listing(providers: &[ProviderRecord]) -> String {
    providers
        .iter()
        .map(ProviderRecord::display_line)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_outcome(outcome: &SearchOutcome) -> String {
    match outcome {
        SearchOutcome::Found {
            providers, summary, ..
        } => format!("{}\n\n{}", provider_listing(providers), summary),
        SearchOutcome::NoProviders {
            request,
            max_radius_miles,
        } => format!(
            "No providers found near {} within {} miles for '{}'.",
            request.zip_code,
            max_radius_miles,
            request.procedure_label()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{testing, DirectoryConfig, HttpDirectory};
    use crate::geo::{PostalTable, ZipCentroid};
    use crate::{DirectoryError, ModelError};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    struct FakeDirectory {
        body: Result<Value, String>,
    }

    impl FakeDirectory {
        fn with(entries: Value) -> Self {
            Self { body: Ok(entries) }
        }
    }

    #[async_trait]
    impl DirectorySource for FakeDirectory {
        async fn fetch(&self) -> Result<Vec<u8>, DirectoryError> {
            match &self.body {
                Ok(value) => Ok(value.to_string().into_bytes()),
                Err(message) => Err(DirectoryError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    message.clone(),
                ))),
            }
        }
    }

    #[derive(Default)]
    struct FakeModel {
        classification: Option<String>,
        fail_summary: bool,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeModel {
        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().map(|guard| guard.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl LanguageModel for FakeModel {
        async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.to_string());
            }
            if prompt.contains(CLASSIFY_INSTRUCTION) {
                return self
                    .classification
                    .clone()
                    .ok_or_else(|| ModelError::Network("offline".to_string()));
            }
            if self.fail_summary {
                return Err(ModelError::Api("rate limited".to_string()));
            }
            Ok("  Here are some nearby options.  ".to_string())
        }
    }

    fn entry(name: &str, zip: &str, specialty: &str) -> Value {
        json!({
            "facility_name": name,
            "specialty": [specialty],
            "addresses": [{"address": "1 Main St", "city": "Town", "state": "CA", "zip": zip}]
        })
    }

    fn general_directory() -> Value {
        json!([
            entry("Skin Clinic", "91706", "Dermatology"),
            entry("Family Care", "91706", "Family Medicine"),
            entry("Kids First", "91706", "Pediatrics"),
            entry("Foot Center", "91706", "Podiatry"),
            entry("Allergy Group", "91706", "Allergy"),
            entry("Kidney Care", "91706", "Nephrology"),
            entry("Brain Health", "91706", "Neurology"),
            entry("Far GI", "10001", "Gastroenterology"),
        ])
    }

    fn postal_table() -> PostalTable {
        PostalTable::new(vec![
            ZipCentroid {
                zip5: "91706".to_string(),
                lat: 34.0967,
                lon: -117.9690,
            },
            ZipCentroid {
                zip5: "90001".to_string(),
                lat: 33.9731,
                lon: -118.2479,
            },
        ])
    }

    fn search(directory: FakeDirectory, model: FakeModel) -> ProviderSearch<FakeDirectory, FakeModel> {
        ProviderSearch::new(directory, model, GeoFilter::default()).expect("reply patterns compile")
    }

    #[tokio::test]
    async fn falls_back_to_five_nearby_providers() -> Result<(), SearchError> {
        let search = search(FakeDirectory::with(general_directory()), FakeModel::default());

        let outcome = search.run("colonoscopy in 91706").await?;
        let SearchOutcome::Found {
            providers, tier, ..
        } = &outcome
        else {
            panic!("expected providers, got {outcome:?}");
        };
        assert_eq!(*tier, MatchTier::NearbyFallback);
        assert_eq!(providers.len(), 5);
        assert_eq!(providers[0].name, "Skin Clinic");

        let response = render_outcome(&outcome);
        let (listing, summary) = response.split_once("\n\n").expect("listing and summary");
        assert_eq!(listing.lines().count(), 5);
        assert_eq!(summary, "Here are some nearby options.");

        let prompts = search.model.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("broadened"));
        Ok(())
    }

    #[tokio::test]
    async fn empty_directory_reports_no_providers_without_model_call() {
        let search = search(FakeDirectory::with(json!([])), FakeModel::default());

        let response = search.search("colonoscopy in 91706").await;
        assert_eq!(
            response,
            "No providers found near 91706 within 30 miles for \
             'gastroenterology, colorectal surgery, general surgery'."
        );
        assert!(search.model.prompts().is_empty());
    }

    #[tokio::test]
    async fn specialty_match_within_initial_radius() -> Result<(), SearchError> {
        let mut entries = general_directory();
        if let Some(list) = entries.as_array_mut() {
            list.push(entry("Valley GI", "91706", "Gastroenterology"));
        }
        let search = search(FakeDirectory::with(entries), FakeModel::default());

        let outcome = search.run("I need a colonoscopy near 91706").await?;
        let SearchOutcome::Found {
            providers, tier, ..
        } = outcome
        else {
            panic!("expected providers");
        };
        assert_eq!(tier, MatchTier::Initial);
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].name, "Valley GI");
        Ok(())
    }

    #[tokio::test]
    async fn expands_radius_before_giving_up_on_specialty() -> Result<(), SearchError> {
        let directory = FakeDirectory::with(json!([
            entry("Family Care", "91706", "Family Medicine"),
            entry("City GI", "90001", "Gastroenterology"),
        ]));
        let search = ProviderSearch::new(
            directory,
            FakeModel::default(),
            GeoFilter::with_table(postal_table()),
        )
        .expect("reply patterns compile");

        let outcome = search.run("colonoscopy 91706").await?;
        let SearchOutcome::Found {
            providers, tier, ..
        } = outcome
        else {
            panic!("expected providers");
        };
        assert_eq!(tier, MatchTier::ExpandedRadius);
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].name, "City GI");

        let prompts = search.model.prompts();
        assert!(prompts[0].contains("expanded from 15 to 30 miles"));
        Ok(())
    }

    #[tokio::test]
    async fn fetch_failure_becomes_error_text() {
        let directory = FakeDirectory {
            body: Err("operation timed out".to_string()),
        };
        let search = search(directory, FakeModel::default());

        let response = search.search("mri near 91770").await;
        assert!(response.starts_with("Failed to load provider data:"));
        assert!(response.contains("operation timed out"));
        assert!(search.model.prompts().is_empty());
    }

    #[tokio::test]
    async fn malformed_directory_is_surfaced() {
        let search = search(
            FakeDirectory::with(json!({"error": "maintenance"})),
            FakeModel::default(),
        );

        let response = search.search("mri near 91770").await;
        assert!(response.starts_with("Failed to load provider data: malformed directory"));
    }

    #[tokio::test]
    async fn missing_zip_asks_for_one() {
        let search = search(FakeDirectory::with(json!([])), FakeModel::default());
        assert!(matches!(
            search.run("mri somewhere").await,
            Err(SearchError::MissingZip)
        ));
        assert!(search.search("mri somewhere").await.contains("5-digit ZIP"));
    }

    #[tokio::test]
    async fn unknown_procedure_is_classified_by_the_model() -> Result<(), SearchError> {
        let model = FakeModel {
            classification: Some("The most likely specialty is Dermatology.".to_string()),
            ..Default::default()
        };
        let search = search(FakeDirectory::with(general_directory()), model);

        let request = search.plan("rash on my arm, 91706").await?;
        assert_eq!(request.procedure, "dermatology");
        assert_eq!(request.zip_code, "91706");
        assert_eq!(request.radius_miles, 15.0);

        let outcome = search.run("rash on my arm, 91706").await?;
        let SearchOutcome::Found {
            providers, tier, ..
        } = outcome
        else {
            panic!("expected providers");
        };
        assert_eq!(tier, MatchTier::Initial);
        assert_eq!(providers[0].name, "Skin Clinic");
        Ok(())
    }

    #[tokio::test]
    async fn classification_failure_uses_generic_fallback() -> Result<(), SearchError> {
        let search = search(FakeDirectory::with(general_directory()), FakeModel::default());

        let outcome = search.run("something hurts 91706").await?;
        let SearchOutcome::Found { request, tier, .. } = outcome else {
            panic!("expected providers");
        };
        assert!(request.procedure.is_empty());
        assert_eq!(tier, MatchTier::NearbyFallback);
        Ok(())
    }

    #[tokio::test]
    async fn summary_failure_keeps_the_listing() {
        let model = FakeModel {
            fail_summary: true,
            ..Default::default()
        };
        let search = search(FakeDirectory::with(general_directory()), model);

        let response = search.search("colonoscopy in 91706").await;
        assert!(response.starts_with("**Skin Clinic**"));
        assert!(response.ends_with("(Summary unavailable: model api error: rate limited)"));
    }

    #[test]
    fn classification_reply_is_cleaned() {
        let search = search(FakeDirectory::with(json!([])), FakeModel::default());
        assert_eq!(
            search.clean_specialty_reply("Cardiology, Vascular Surgery!"),
            "cardiology, vascular surgery"
        );
        assert_eq!(
            search.clean_specialty_reply("The most likely specialties are... the most likely is ENT"),
            "ent"
        );
        assert_eq!(
            search.clean_specialty_reply("The most likely specialty is Dermatology."),
            "dermatology"
        );
    }

    #[test]
    fn preamble_removal_stays_on_one_line() {
        let search = search(FakeDirectory::with(json!([])), FakeModel::default());
        assert_eq!(
            search.clean_specialty_reply("The most likely\nis ENT"),
            "the most likelyis ent"
        );
    }

    #[tokio::test]
    async fn http_error_becomes_load_failure_text() -> Result<(), Box<dyn std::error::Error>> {
        let endpoint =
            testing::serve_status_once("HTTP/1.1 500 Internal Server Error").await?;
        let directory = HttpDirectory::new(&DirectoryConfig {
            endpoint: endpoint.clone(),
            ..Default::default()
        })?;
        let search = ProviderSearch::new(directory, FakeModel::default(), GeoFilter::default())?;

        let response = search.search("mri near 91770").await;
        assert_eq!(
            response,
            format!("Failed to load provider data: directory request to {endpoint} returned 500")
        );
        assert!(search.model.prompts().is_empty());
        Ok(())
    }
}
