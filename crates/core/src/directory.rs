use crate::error::{DirectoryError, Result};
use crate::models::{ProviderRecord, UNKNOWN_PROVIDER};
use crate::traits::DirectorySource;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_DIRECTORY_URL: &str = "https://www22.anthem.com/CMS/PROVIDERS_CAM.json";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(25);

const NAME_KEYS: [&str; 3] = ["facility_name", "provider_name", "name"];
const WEBSITE_KEYS: [&str; 2] = ["website", "url"];
const STREET_KEYS: [&str; 2] = ["address", "Address1"];
const CITY_KEYS: [&str; 2] = ["city", "City"];
const STATE_KEYS: [&str; 2] = ["state", "State"];
const ZIP_KEYS: [&str; 2] = ["zip", "PostalCode"];

const ZIP5_PATTERN: &str = r"\b([0-9]{5})\b";
static ZIP5: OnceLock<Option<Regex>> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_DIRECTORY_URL.to_string(),
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Fetches the directory document over HTTP with a fixed timeout.
pub struct HttpDirectory {
    endpoint: Url,
    client: Client,
}

impl HttpDirectory {
    pub fn new(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        let endpoint = Url::parse(config.endpoint.trim())?;
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl DirectorySource for HttpDirectory {
    async fn fetch(&self) -> Result<Vec<u8>, DirectoryError> {
        let response = self.client.get(self.endpoint.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!(endpoint = %self.endpoint, status = %status, "directory fetch failed");
            return Err(DirectoryError::Status {
                endpoint: self.endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        debug!(endpoint = %self.endpoint, bytes = body.len(), "directory fetched");
        Ok(body.to_vec())
    }
}

/// Reads the directory document from a local JSON file.
pub struct FileDirectory {
    path: PathBuf,
}

impl FileDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DirectorySource for FileDirectory {
    async fn fetch(&self) -> Result<Vec<u8>, DirectoryError> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}

/// Fetches the directory and flattens it in one step.
pub async fn load_directory<D>(source: &D) -> Result<Vec<ProviderRecord>>
where
    D: DirectorySource + ?Sized,
{
    let bytes = source.fetch().await?;
    normalize(&bytes)
}

/// Flattens a provider directory into one record per address.
///
/// The top level may be an array of entries or an object, in which case the
/// first array-valued field (in document order) is the entry list. Addresses
/// without a resolvable 5-digit ZIP are skipped.
pub fn normalize(bytes: &[u8]) -> Result<Vec<ProviderRecord>> {
    let document: Value = serde_json::from_slice(bytes)?;
    let entries = provider_list(&document)?;

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for entry in entries {
        let Some(item) = entry.as_object() else {
            continue;
        };

        let name = provider_name(item);
        let specialty = join_specialty(item.get("specialty"));
        let website = first_text(item, &WEBSITE_KEYS);
        let entry_phone = text_of(item.get("phone"));

        for address in address_entries(item) {
            let zip = ZIP_KEYS
                .iter()
                .filter_map(|key| address.get(*key))
                .map(scalar_text)
                .find(|value| !value.is_empty())
                .and_then(|value| extract_zip5(&value))
                .unwrap_or_default();

            if zip.is_empty() {
                skipped += 1;
                continue;
            }

            let phone = match text_of(address.get("phone")) {
                phone if phone.is_empty() => entry_phone.clone(),
                phone => phone,
            };

            records.push(ProviderRecord {
                name: name.clone(),
                phone,
                address: first_text(address, &STREET_KEYS),
                city: first_text(address, &CITY_KEYS),
                state: first_text(address, &STATE_KEYS),
                zip,
                specialty: specialty.clone(),
                website: website.clone(),
                raw: entry.clone(),
            });
        }
    }

    debug!(
        entries = entries.len(),
        records = records.len(),
        skipped_without_zip = skipped,
        "directory normalized"
    );

    Ok(records)
}

/// Returns the first standalone 5-digit token in `value`: a run of exactly
/// five ASCII digits not touching another letter, digit or underscore.
pub fn extract_zip5(value: &str) -> Option<String> {
    let captures = zip5_regex()?.captures(value)?;
    Some(captures[1].to_string())
}

fn zip5_regex() -> Option<&'static Regex> {
    ZIP5.get_or_init(|| Regex::new(ZIP5_PATTERN).ok()).as_ref()
}

fn provider_list(document: &Value) -> Result<&Vec<Value>> {
    match document {
        Value::Array(entries) => Ok(entries),
        Value::Object(fields) => fields
            .values()
            .find_map(Value::as_array)
            .ok_or_else(|| {
                DirectoryError::MalformedDirectory(
                    "expected a JSON array (or an object containing an array) of providers"
                        .to_string(),
                )
            }),
        other => Err(DirectoryError::MalformedDirectory(format!(
            "expected a JSON array of providers, found {}",
            json_kind(other)
        ))),
    }
}

fn provider_name(item: &Map<String, Value>) -> String {
    let nested = item
        .get("name")
        .and_then(Value::as_object)
        .map(|name| {
            [text_of(name.get("first")), text_of(name.get("last"))]
                .into_iter()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    if !nested.is_empty() {
        return nested;
    }

    match first_text(item, &NAME_KEYS) {
        name if name.is_empty() => UNKNOWN_PROVIDER.to_string(),
        name => name,
    }
}

fn address_entries(item: &Map<String, Value>) -> Vec<&Map<String, Value>> {
    match item.get("addresses") {
        Some(Value::Array(addresses)) => addresses.iter().filter_map(Value::as_object).collect(),
        Some(Value::Object(single)) => vec![single],
        _ => Vec::new(),
    }
}

fn join_specialty(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.trim().to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    }
}

fn first_text(fields: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .map(|key| text_of(fields.get(*key)))
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

fn text_of(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}

// ZIP fields are sometimes published as bare numbers.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => String::new(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
