use reqwest::blocking::Client;

use crate::{
    core::{
        http::http_client,
        DeckState,
        Ease,
        ReviewGrade,
        SyncError,
        VocabularyRef,
    },
    settings::Settings,
};

pub mod api;
pub mod review;

pub const DEFAULT_BASE_URL: &str = "https://jpdb.io";

/// The four calls the sync needs from jpdb. Each one is a single exchange
/// and none of them retry.
pub trait VocabularyService {
    fn parse_word(&self, word: &str) -> Result<VocabularyRef, SyncError>;

    fn lookup_state(&self, vocab: VocabularyRef) -> Result<DeckState, SyncError>;

    fn add_to_deck(&self, vocab: VocabularyRef, deck_id: u64) -> Result<(), SyncError>;

    fn submit_review(&self, vocab: VocabularyRef, ease: Ease) -> Result<ReviewGrade, SyncError>;
}

pub struct JpdbClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    session_token: Option<String>,
}

impl JpdbClient {
    pub fn new(api_key: Option<String>, session_token: Option<String>) -> Result<Self, SyncError> {
        Ok(Self { http: http_client()?, base_url: DEFAULT_BASE_URL.to_string(), api_key, session_token })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, SyncError> {
        Self::new(settings.api_key()?, settings.session_token()?)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn api_key(&self) -> Result<&str, SyncError> {
        self.api_key.as_deref().ok_or(SyncError::MissingCredential("jpdb_api_key"))
    }

    fn session_token(&self) -> Result<&str, SyncError> {
        self.session_token.as_deref().ok_or(SyncError::MissingCredential("jpdb_session_token"))
    }
}

impl VocabularyService for JpdbClient {
    fn parse_word(&self, word: &str) -> Result<VocabularyRef, SyncError> {
        self.parse(word)
    }

    fn lookup_state(&self, vocab: VocabularyRef) -> Result<DeckState, SyncError> {
        self.lookup_vocabulary(vocab)
    }

    fn add_to_deck(&self, vocab: VocabularyRef, deck_id: u64) -> Result<(), SyncError> {
        self.add_vocabulary(vocab, deck_id)
    }

    fn submit_review(&self, vocab: VocabularyRef, ease: Ease) -> Result<ReviewGrade, SyncError> {
        self.review(vocab, ease)
    }
}
