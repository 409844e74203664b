use crate::caregiver::CaregiverCompanion;
use crate::config::ProviderHints;
use crate::directory::extract_zip5;
use crate::orchestrator::ProviderSearch;
use crate::traits::{DirectorySource, LanguageModel};
use crate::Mode;
use std::str::FromStr;
use tracing::info;

impl FromStr for Mode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "caregiver" => Ok(Mode::Caregiver),
            "provider" => Ok(Mode::Provider),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

/// Chooses a pipeline per request. Stateless.
#[derive(Debug, Clone, Default)]
pub struct Router {
    hints: ProviderHints,
}

impl Router {
    pub fn new(hints: ProviderHints) -> Self {
        Self { hints }
    }

    /// An explicit mode wins; otherwise a ZIP code or a provider phrase
    /// selects the provider pipeline.
    pub fn route(&self, explicit: Option<Mode>, text: &str) -> Mode {
        if let Some(mode) = explicit {
            return mode;
        }

        if extract_zip5(text).is_some() || self.hints.matches(text) {
            Mode::Provider
        } else {
            Mode::Caregiver
        }
    }
}

/// Routes a request and runs the chosen pipeline.
pub struct Navigator<D, P, C> {
    router: Router,
    providers: ProviderSearch<D, P>,
    caregiver: CaregiverCompanion<C>,
}

impl<D, P, C> Navigator<D, P, C>
where
    D: DirectorySource + Send + Sync,
    P: LanguageModel + Send + Sync,
    C: LanguageModel + Send + Sync,
{
    pub fn new(router: Router, providers: ProviderSearch<D, P>, caregiver: CaregiverCompanion<C>) -> Self {
        Self {
            router,
            providers,
            caregiver,
        }
    }

    pub async fn respond(&self, explicit: Option<Mode>, text: &str) -> String {
        let text = text.trim();
        let mode = self.router.route(explicit, text);
        info!(mode = %mode, explicit = explicit.is_some(), "routed request");

        match mode {
            Mode::Provider => self.providers.search(text).await,
            Mode::Caregiver => self.caregiver.respond(text).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoFilter;
    use crate::{DirectoryError, ModelError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn explicit_mode_wins() {
        let router = Router::default();
        assert_eq!(router.route(Some(Mode::Caregiver), "MRI near 91770"), Mode::Caregiver);
        assert_eq!(router.route(Some(Mode::Provider), "notes about a cough"), Mode::Provider);
    }

    #[test]
    fn zip_or_hint_routes_to_provider() {
        let router = Router::default();
        assert_eq!(router.route(None, "anything in 91706"), Mode::Provider);
        assert_eq!(router.route(None, "Where can I get Imaging done?"), Mode::Provider);
        assert_eq!(router.route(None, "Patient has acute rhinitis."), Mode::Caregiver);
        assert_eq!(router.route(None, ""), Mode::Caregiver);
        assert_eq!(router.route(None, "order 123456 filed"), Mode::Caregiver);
    }

    #[test]
    fn custom_hints_replace_defaults() {
        let router = Router::new(ProviderHints::new(["dentist"]));
        assert_eq!(router.route(None, "need a dentist"), Mode::Provider);
        assert_eq!(router.route(None, "need an mri"), Mode::Caregiver);
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Provider".parse::<Mode>(), Ok(Mode::Provider));
        assert_eq!(" caregiver ".parse::<Mode>(), Ok(Mode::Caregiver));
        assert!("auto".parse::<Mode>().is_err());
    }

    struct CountingDirectory {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl DirectorySource for CountingDirectory {
        async fn fetch(&self) -> Result<Vec<u8>, DirectoryError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(br#"[{"name": "Clinic", "specialty": "Radiology", "addresses": [{"zip": "91770"}]}]"#.to_vec())
        }
    }

    struct EchoModel(&'static str);

    #[async_trait]
    impl LanguageModel for EchoModel {
        async fn complete(&self, _prompt: &str) -> Result<String, ModelError> {
            Ok(self.0.to_string())
        }
    }

    fn navigator() -> Navigator<CountingDirectory, EchoModel, EchoModel> {
        let directory = CountingDirectory {
            fetches: AtomicUsize::new(0),
        };
        let providers = ProviderSearch::new(directory, EchoModel("One radiology clinic nearby."), GeoFilter::default())
            .expect("reply patterns compile");
        let caregiver = CaregiverCompanion::new(EchoModel(r#"{"summary": "Mild cold."}"#))
            .expect("redaction patterns compile");
        Navigator::new(Router::default(), providers, caregiver)
    }

    #[tokio::test]
    async fn provider_requests_reach_the_directory() {
        let navigator = navigator();
        let response = navigator.respond(None, "MRI near 91770").await;

        assert_eq!(
            response,
            "**Clinic** | Radiology | 91770\n\nOne radiology clinic nearby."
        );
        assert_eq!(navigator.providers_fetches(), 1);
    }

    #[tokio::test]
    async fn notes_go_to_the_caregiver() {
        let navigator = navigator();
        let response = navigator.respond(None, "Patient has acute rhinitis.").await;

        assert_eq!(response, "=== Summary ===\nMild cold.");
        assert_eq!(navigator.providers_fetches(), 0);
    }

    impl Navigator<CountingDirectory, EchoModel, EchoModel> {
        fn providers_fetches(&self) -> usize {
            self.providers.directory().fetches.load(Ordering::SeqCst)
        }
    }
}
