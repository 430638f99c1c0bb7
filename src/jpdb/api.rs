use serde::{
    de::DeserializeOwned,
    Deserialize,
};
use serde_json::{
    json,
    Value,
};
use tracing::{
    debug,
    info,
};

use super::JpdbClient;
use crate::core::{
    http::JSON_TIMEOUT,
    DeckState,
    SyncError,
    VocabularyRef,
};

const PARSE: &str = "/api/v1/parse";
const LOOKUP_VOCABULARY: &str = "/api/v1/lookup-vocabulary";
const ADD_VOCABULARY: &str = "/api/v1/deck/add-vocabulary";

#[derive(Debug, Deserialize)]
pub struct ParseResponse {
    #[serde(default)]
    pub vocabulary: Vec<Vec<Value>>, // [vid, sid, rid] per vocabulary_fields
}

#[derive(Debug, Deserialize)]
pub struct LookupResponse {
    #[serde(default)]
    pub vocabulary_info: Vec<Value>, // one [card_state] row per requested pair
}

/// jpdb reports failures on every endpoint as `{"error": ..., "error_message": ...}`.
fn api_error(body: &Value) -> Option<SyncError> {
    let error = body.get("error")?;
    let mut message = match error {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if let Some(detail) = body.get("error_message").and_then(Value::as_str) {
        message = format!("{message}: {detail}");
    }
    Some(SyncError::Api { message })
}

impl JpdbClient {
    fn post_json<T: DeserializeOwned>(&self, path: &str, payload: Value) -> Result<T, SyncError> {
        let api_key = self.api_key()?;
        debug!("POST {}", path);

        let body: Value = self
            .http
            .post(self.url(path))
            .bearer_auth(api_key)
            .timeout(JSON_TIMEOUT)
            .json(&payload)
            .send()?
            .json()?;

        if let Some(error) = api_error(&body) {
            return Err(error);
        }

        serde_json::from_value(body).map_err(|e| SyncError::unexpected(path, e.to_string()))
    }

    pub fn parse(&self, word: &str) -> Result<VocabularyRef, SyncError> {
        let payload = json!({
            "text": [word],
            "position_length_encoding": "utf16",
            "token_fields": [],
            "vocabulary_fields": ["vid", "sid", "rid"]
        });
        let response: ParseResponse = self.post_json(PARSE, payload)?;

        let first =
            response.vocabulary.first().ok_or_else(|| SyncError::NoVocabulary(word.to_string()))?;
        match (first.first().and_then(Value::as_u64), first.get(1).and_then(Value::as_u64)) {
            (Some(vid), Some(sid)) => Ok(VocabularyRef::new(vid, sid)),
            _ => Err(SyncError::unexpected(PARSE, format!("bad vocabulary entry {first:?}"))),
        }
    }

    pub fn lookup_vocabulary(&self, vocab: VocabularyRef) -> Result<DeckState, SyncError> {
        let payload = json!({
            "fields": ["card_state"],
            "list": [[vocab.vid, vocab.sid]]
        });
        let response: LookupResponse = self.post_json(LOOKUP_VOCABULARY, payload)?;

        let row = response
            .vocabulary_info
            .first()
            .and_then(Value::as_array)
            .ok_or_else(|| SyncError::unexpected(LOOKUP_VOCABULARY, "no vocabulary_info row"))?;

        let state = row
            .first()
            .and_then(Value::as_array)
            .and_then(|states| states.first())
            .and_then(Value::as_str)
            .map(DeckState::from)
            .unwrap_or(DeckState::NotInDeck);
        Ok(state)
    }

    pub fn add_vocabulary(&self, vocab: VocabularyRef, deck_id: u64) -> Result<(), SyncError> {
        let payload = json!({
            "id": deck_id,
            "vocabulary": [[vocab.vid, vocab.sid]]
        });
        let _: Value = self.post_json(ADD_VOCABULARY, payload)?;
        info!("Added vid {} sid {} to deck {}", vocab.vid, vocab.sid, deck_id);
        Ok(())
    }
}
