use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(Box<csv::Error>),

    #[error("Reqwest error: {0}")]
    Reqwest(Box<reqwest::Error>),

    #[error("setting {0} not found")]
    UnknownSetting(String),

    #[error("setting {key} has an invalid value: {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("{0} is not configured")]
    MissingCredential(&'static str),

    #[error("jpdb returned no vocabulary for {0:?}")]
    NoVocabulary(String),

    #[error("jpdb error: {message}")]
    Api { message: String },

    #[error("review page has no review number input")]
    ReviewTokenMissing,

    #[error("review number {0:?} is not an integer")]
    InvalidReviewToken(String),

    #[error("ease must be between 1 and 4, got {0}")]
    InvalidEase(u8),

    #[error("word {0:?} is not cached")]
    NotCached(String),

    #[error("unexpected response from {endpoint}: {detail}")]
    UnexpectedResponse { endpoint: String, detail: String },

    #[error("HTTP error {status} from {url}")]
    Status { status: u16, url: String },
}

impl SyncError {
    pub fn unexpected(endpoint: &str, detail: impl Into<String>) -> Self {
        SyncError::UnexpectedResponse { endpoint: endpoint.to_string(), detail: detail.into() }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(error: std::io::Error) -> Self {
        SyncError::Io(Box::new(error))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(error: reqwest::Error) -> Self {
        SyncError::Reqwest(Box::new(error))
    }
}

impl From<csv::Error> for SyncError {
    fn from(error: csv::Error) -> Self {
        SyncError::Csv(Box::new(error))
    }
}
