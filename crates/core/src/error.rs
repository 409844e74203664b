use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("malformed directory: {0}")]
    MalformedDirectory(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("directory request to {endpoint} returned {status}")]
    Status { endpoint: String, status: u16 },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("postal table line {line}: {details}")]
    Parse { line: usize, details: String },
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model configuration error: {0}")]
    Config(String),

    #[error("model network error: {0}")]
    Network(String),

    #[error("model api error: {0}")]
    Api(String),

    #[error("model response parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("no 5-digit ZIP code found in request")]
    MissingZip,

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

pub type Result<T, E = DirectoryError> = std::result::Result<T, E>;
