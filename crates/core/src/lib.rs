pub mod caregiver;
pub mod config;
pub mod directory;
pub mod error;
pub mod geo;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod redact;
pub mod router;
pub mod specialty;
pub mod traits;

pub use caregiver::{parse_care_summary, render_care_summary, CaregiverCompanion, CAREGIVER_SYSTEM_PROMPT};
pub use config::{ProcedureTable, ProviderHints, SearchConfig};
pub use directory::{
    extract_zip5, load_directory, normalize, DirectoryConfig, FileDirectory, HttpDirectory,
    DEFAULT_DIRECTORY_URL, DEFAULT_FETCH_TIMEOUT,
};
pub use error::{DirectoryError, GeoError, ModelError, SearchError};
pub use geo::{BoundingBox, GeoFilter, PostalTable, ZipCentroid};
pub use llm::{ChatModel, ChatModelConfig};
pub use models::{
    CareSummary, MatchTier, Mode, PostalArea, ProviderRecord, SearchOutcome, SearchRequest,
    TermExplanation, UNKNOWN_PROVIDER,
};
pub use orchestrator::{render_outcome, ProviderSearch, PROVIDER_SYSTEM_PROMPT};
pub use redact::Redactor;
pub use router::{Navigator, Router};
pub use specialty::{SpecialtyMatch, SpecialtyMatcher, SynonymTable, UnfilteredReason};
pub use traits::{DirectorySource, LanguageModel};
