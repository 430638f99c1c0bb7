use std::{
    thread,
    time::Duration,
};

use tracing::{
    debug,
    info,
    warn,
};

use super::Host;
use crate::{
    cache::{
        CacheEntry,
        WordCache,
    },
    core::{
        Card,
        DeckState,
        Ease,
        Note,
        ReviewGrade,
        SyncError,
    },
    jpdb::VocabularyService,
    settings::Settings,
};

pub const DEFAULT_BULK_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedStep {
    Resolve,
    AddToDeck,
    Review,
}

impl FailedStep {
    pub fn message(&self) -> &'static str {
        match self {
            FailedStep::Resolve => "Error 1: could not connect to JPDB.io",
            FailedStep::AddToDeck => "Error 2: could not add the word to the deck",
            FailedStep::Review => "Error 3: could not send the review to JPDB.io",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The note has none of the configured word fields.
    Ignored,
    AlreadyCached,
    Synced(CacheEntry),
    Reviewed(ReviewGrade),
    Failed(FailedStep),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BulkReport {
    pub synced: usize,
    pub failed: usize,
    pub ignored: usize,
    pub stopped_at: Option<String>, // first word found already cached
}

/// Everything the event handlers need, owned in one place: settings, the
/// word cache, the jpdb client and the host's UI primitives.
pub struct JpdbSync<S, H> {
    settings: Settings,
    cache: WordCache,
    service: S,
    host: H,
}

impl<S: VocabularyService, H: Host> JpdbSync<S, H> {
    pub fn new(settings: Settings, cache: WordCache, service: S, host: H) -> Self {
        Self { settings, cache, service, host }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache(&self) -> &WordCache {
        &self.cache
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    fn target_word(&self, note: &Note) -> Result<Option<String>, SyncError> {
        let fields = self.settings.word_fields()?;
        Ok(note.first_field(fields.iter().map(String::as_str)).map(str::to_string))
    }

    fn fail(&self, step: FailedStep, word: &str, error: &SyncError) -> Outcome {
        warn!("{} ({:?}): {}", step.message(), word, error);
        self.host.show_critical(&format!("{} {}", step.message(), word));
        Outcome::Failed(step)
    }

    fn ensure_entry(&mut self, word: &str) -> Result<CacheEntry, Outcome> {
        self.cache.resolve(word, &self.service).map_err(|e| self.fail(FailedStep::Resolve, word, &e))
    }

    fn ensure_in_deck(&mut self, entry: &mut CacheEntry, deck_id: u64) -> Result<(), Outcome> {
        if entry.state.is_in_deck() {
            return Ok(());
        }

        let added = self
            .service
            .add_to_deck(entry.vocab, deck_id)
            .and_then(|()| self.cache.mark_in_deck(&entry.word));
        match added {
            Ok(()) => {
                info!("Added {:?} to jpdb deck {}", entry.word, deck_id);
                entry.state = DeckState::InYourDeck;
                Ok(())
            }
            Err(e) => Err(self.fail(FailedStep::AddToDeck, &entry.word, &e)),
        }
    }

    fn sync_word(&mut self, word: &str, deck_id: u64) -> Outcome {
        let mut entry = match self.ensure_entry(word) {
            Ok(entry) => entry,
            Err(outcome) => return outcome,
        };
        match self.ensure_in_deck(&mut entry, deck_id) {
            Ok(()) => Outcome::Synced(entry),
            Err(outcome) => outcome,
        }
    }

    /// A new note is being added locally. Words that are already cached are
    /// left alone, including their deck membership.
    pub fn on_note_will_be_added(&mut self, note: &Note) -> Result<Outcome, SyncError> {
        let Some(word) = self.target_word(note)? else {
            return Ok(Outcome::Ignored);
        };
        if self.cache.contains(&word) {
            debug!("{:?} is already cached, skipping", word);
            return Ok(Outcome::AlreadyCached);
        }

        let deck_id = self.settings.mining_deck()?;
        Ok(self.sync_word(&word, deck_id))
    }

    /// A card was answered in the reviewer: make sure the word is in the
    /// jpdb deck, then pass the grade on.
    pub fn on_card_answered(&mut self, note: &Note, ease: Ease) -> Result<Outcome, SyncError> {
        let Some(word) = self.target_word(note)? else {
            return Ok(Outcome::Ignored);
        };
        let deck_id = self.settings.mining_deck()?;

        let entry = match self.sync_word(&word, deck_id) {
            Outcome::Synced(entry) => entry,
            other => return Ok(other),
        };

        match self.service.submit_review(entry.vocab, ease) {
            Ok(grade) => Ok(Outcome::Reviewed(grade)),
            Err(e) => Ok(self.fail(FailedStep::Review, &word, &e)),
        }
    }

    /// Walks the new cards one at a time, pausing `delay` between remote
    /// syncs. Reaching a word that is already cached ends the walk.
    pub fn sync_new_cards(&mut self, cards: &[Card], delay: Duration) -> Result<BulkReport, SyncError> {
        let new_cards: Vec<&Card> = cards.iter().filter(|card| card.is_new).collect();
        let total = new_cards.len();
        let deck_id = self.settings.mining_deck()?;
        let mut report = BulkReport::default();

        for (i, card) in new_cards.into_iter().enumerate() {
            self.host.report_progress(i, total, &format!("Syncing card {} of {}", i + 1, total));

            let Some(word) = self.target_word(&card.note)? else {
                report.ignored += 1;
                continue;
            };
            if self.cache.contains(&word) {
                info!("{:?} is already cached, stopping after {} cards", word, i);
                self.host.report_progress(i, total, &format!("Stopped at {word}"));
                report.stopped_at = Some(word);
                return Ok(report);
            }

            if report.synced + report.failed > 0 && !delay.is_zero() {
                thread::sleep(delay);
            }

            match self.sync_word(&word, deck_id) {
                Outcome::Synced(_) => report.synced += 1,
                _ => report.failed += 1,
            }
        }

        self.host.report_progress(total, total, "Done");
        Ok(report)
    }

    /// Flushes the word cache to disk.
    pub fn on_profile_will_close(&mut self) -> Result<(), SyncError> {
        if let Err(e) = self.cache.persist() {
            warn!("Failed to save the word cache: {}", e);
            self.host.show_critical(&format!("Could not save the word cache: {e}"));
            return Err(e);
        }
        info!("Saved {} cached words", self.cache.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        collections::HashMap,
        time::Instant,
    };

    use serde_json::json;

    use super::*;
    use crate::core::VocabularyRef;

    #[derive(Default)]
    struct FakeJpdb {
        words: HashMap<String, (VocabularyRef, DeckState)>,
        add_error: Option<String>,
        review_fails: bool,
        calls: RefCell<Vec<String>>,
        parsed_at: RefCell<Vec<Instant>>,
    }

    impl FakeJpdb {
        fn with_word(mut self, word: &str, vid: u64, sid: u64, state: DeckState) -> Self {
            self.words.insert(word.to_string(), (VocabularyRef::new(vid, sid), state));
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl VocabularyService for FakeJpdb {
        fn parse_word(&self, word: &str) -> Result<VocabularyRef, SyncError> {
            self.calls.borrow_mut().push(format!("parse {word}"));
            self.parsed_at.borrow_mut().push(Instant::now());
            self.words.get(word).map(|(v, _)| *v).ok_or_else(|| SyncError::NoVocabulary(word.to_string()))
        }

        fn lookup_state(&self, vocab: VocabularyRef) -> Result<DeckState, SyncError> {
            self.calls.borrow_mut().push(format!("lookup {}", vocab.vid));
            Ok(self
                .words
                .values()
                .find(|(v, _)| *v == vocab)
                .map(|(_, state)| state.clone())
                .unwrap_or(DeckState::NotInDeck))
        }

        fn add_to_deck(&self, vocab: VocabularyRef, deck_id: u64) -> Result<(), SyncError> {
            self.calls.borrow_mut().push(format!("add {} to {deck_id}", vocab.vid));
            match &self.add_error {
                Some(message) => Err(SyncError::Api { message: message.clone() }),
                None => Ok(()),
            }
        }

        fn submit_review(&self, vocab: VocabularyRef, ease: Ease) -> Result<ReviewGrade, SyncError> {
            let grade = ease.grade();
            self.calls.borrow_mut().push(format!("review {} g={}", vocab.vid, grade.code()));
            if self.review_fails {
                return Err(SyncError::ReviewTokenMissing);
            }
            Ok(grade)
        }
    }

    #[derive(Default)]
    struct RecordingHost {
        criticals: RefCell<Vec<String>>,
        progress: RefCell<Vec<(usize, usize, String)>>,
    }

    impl Host for RecordingHost {
        fn show_critical(&self, message: &str) {
            self.criticals.borrow_mut().push(message.to_string());
        }

        fn report_progress(&self, done: usize, total: usize, label: &str) {
            self.progress.borrow_mut().push((done, total, label.to_string()));
        }
    }

    fn sync(service: FakeJpdb) -> JpdbSync<FakeJpdb, RecordingHost> {
        let settings = match json!({"word_fields": "Target, Word", "jpdb_mining_deck": 3}) {
            serde_json::Value::Object(map) => Settings::new(map),
            _ => unreachable!(),
        };
        JpdbSync::new(settings, WordCache::new(), service, RecordingHost::default())
    }

    fn note(word: &str) -> Note {
        Note::new().with_field("Word", word).with_field("Meaning", "cat")
    }

    fn cat() -> FakeJpdb {
        FakeJpdb::default().with_word("猫", 1234, 5, DeckState::NotInDeck)
    }

    #[test]
    fn test_note_without_word_field_is_ignored() {
        let mut sync = sync(cat());
        let note = Note::new().with_field("Front", "猫");

        assert_eq!(sync.on_note_will_be_added(&note).unwrap(), Outcome::Ignored);
        assert_eq!(sync.on_card_answered(&note, Ease::GOOD).unwrap(), Outcome::Ignored);
        assert!(sync.service().calls().is_empty());
        assert!(sync.host().criticals.borrow().is_empty());
    }

    #[test]
    fn test_answer_card_adds_and_reviews() {
        let mut sync = sync(cat());

        let outcome = sync.on_card_answered(&note("猫"), Ease::GOOD).unwrap();
        assert_eq!(outcome, Outcome::Reviewed(ReviewGrade::Pass));
        assert_eq!(
            sync.service().calls(),
            vec!["parse 猫", "lookup 1234", "add 1234 to 3", "review 1234 g=4"]
        );

        let entry = sync.cache().lookup("猫").unwrap();
        assert_eq!(entry.vocab, VocabularyRef::new(1234, 5));
        assert_eq!(entry.state, DeckState::InYourDeck);

        let outcome = sync.on_card_answered(&note("猫"), Ease::AGAIN).unwrap();
        assert_eq!(outcome, Outcome::Reviewed(ReviewGrade::Fail));
        assert_eq!(sync.service().calls().last().unwrap(), "review 1234 g=1");
        assert_eq!(sync.service().calls().len(), 5);
    }

    #[test]
    fn test_add_error_skips_review() {
        let mut sync = sync(FakeJpdb { add_error: Some("deck not found".to_string()), ..cat() });

        let outcome = sync.on_card_answered(&note("猫"), Ease::GOOD).unwrap();
        assert_eq!(outcome, Outcome::Failed(FailedStep::AddToDeck));
        assert_eq!(sync.cache().lookup("猫").unwrap().state, DeckState::NotInDeck);
        assert!(!sync.service().calls().iter().any(|call| call.starts_with("review")));
        assert_eq!(sync.host().criticals.borrow().len(), 1);
        assert!(sync.host().criticals.borrow()[0].starts_with("Error 2"));
    }

    #[test]
    fn test_resolve_failure_notifies() {
        let mut sync = sync(FakeJpdb::default());

        let outcome = sync.on_card_answered(&note("犬"), Ease::GOOD).unwrap();
        assert_eq!(outcome, Outcome::Failed(FailedStep::Resolve));
        assert!(sync.host().criticals.borrow()[0].starts_with("Error 1"));
        assert!(sync.cache().is_empty());
    }

    #[test]
    fn test_review_failure_notifies() {
        let mut sync = sync(FakeJpdb { review_fails: true, ..cat() });

        let outcome = sync.on_card_answered(&note("猫"), Ease::EASY).unwrap();
        assert_eq!(outcome, Outcome::Failed(FailedStep::Review));
        assert!(sync.host().criticals.borrow()[0].starts_with("Error 3"));
        assert_eq!(sync.cache().lookup("猫").unwrap().state, DeckState::InYourDeck);
    }

    #[test]
    fn test_word_already_in_deck_is_not_added() {
        let service = FakeJpdb::default().with_word("猫", 1234, 5, DeckState::Other("known".into()));
        let mut sync = sync(service);

        sync.on_card_answered(&note("猫"), Ease::GOOD).unwrap();
        assert!(!sync.service().calls().iter().any(|call| call.starts_with("add")));
    }

    #[test]
    fn test_note_added_skips_cached_words() {
        let mut sync = sync(cat());

        match sync.on_note_will_be_added(&note("猫")).unwrap() {
            Outcome::Synced(entry) => assert_eq!(entry.state, DeckState::InYourDeck),
            other => panic!("expected Synced, got {other:?}"),
        }
        let calls = sync.service().calls().len();

        assert_eq!(sync.on_note_will_be_added(&note("猫")).unwrap(), Outcome::AlreadyCached);
        assert_eq!(sync.service().calls().len(), calls);
    }

    #[test]
    fn test_bad_setting_propagates() {
        let settings = match json!({"word_fields": 5}) {
            serde_json::Value::Object(map) => Settings::new(map),
            _ => unreachable!(),
        };
        let mut sync = JpdbSync::new(settings, WordCache::new(), cat(), RecordingHost::default());

        assert!(matches!(
            sync.on_note_will_be_added(&note("猫")),
            Err(SyncError::InvalidSetting { .. })
        ));
        assert!(sync.host().criticals.borrow().is_empty());
    }

    #[test]
    fn test_bulk_stops_at_first_cached_word() {
        let service = cat()
            .with_word("犬", 42, 1, DeckState::NotInDeck)
            .with_word("鳥", 7, 2, DeckState::NotInDeck);
        let mut sync = sync(service);
        sync.on_note_will_be_added(&note("鳥")).unwrap();

        let cards = vec![
            Card { id: 1, note: note("猫"), is_new: true },
            Card { id: 2, note: note("魚"), is_new: false },
            Card { id: 3, note: Note::new().with_field("Front", "?"), is_new: true },
            Card { id: 4, note: note("犬"), is_new: true },
            Card { id: 5, note: note("鳥"), is_new: true },
            Card { id: 6, note: note("蛙"), is_new: true },
        ];

        let report = sync.sync_new_cards(&cards, Duration::ZERO).unwrap();
        assert_eq!(
            report,
            BulkReport { synced: 2, failed: 0, ignored: 1, stopped_at: Some("鳥".to_string()) }
        );
        assert!(sync.cache().contains("犬"));
        assert!(!sync.cache().contains("魚"));
        assert!(!sync.service().calls().iter().any(|call| call.contains("蛙")));
        assert_eq!(
            sync.host().progress.borrow().last(),
            Some(&(3, 5, "Stopped at 鳥".to_string()))
        );
    }

    #[test]
    fn test_bulk_pauses_between_synced_cards_only() {
        let delay = Duration::from_millis(150);
        let service = cat()
            .with_word("犬", 42, 1, DeckState::NotInDeck)
            .with_word("鳥", 7, 2, DeckState::NotInDeck);
        let mut sync = sync(service);

        let cards = vec![
            Card { id: 1, note: note("猫"), is_new: true },
            Card { id: 2, note: Note::new().with_field("Front", "?"), is_new: true },
            Card { id: 3, note: note("犬"), is_new: true },
            Card { id: 4, note: note("鳥"), is_new: true },
        ];

        let start = Instant::now();
        let report = sync.sync_new_cards(&cards, delay).unwrap();
        let elapsed = start.elapsed();

        assert_eq!(report, BulkReport { synced: 3, failed: 0, ignored: 1, stopped_at: None });
        assert!(elapsed >= delay * 2, "walk took {elapsed:?}");

        let parsed_at = sync.service().parsed_at.borrow().clone();
        assert_eq!(parsed_at.len(), 3);
        // first card goes out right away
        assert!(parsed_at[0] - start < delay);
        // the ignored card between 猫 and 犬 adds no pause of its own
        let first_gap = parsed_at[1] - parsed_at[0];
        assert!(first_gap >= delay && first_gap < delay * 2, "gap was {first_gap:?}");
        assert!(parsed_at[2] - parsed_at[1] >= delay);

        assert_eq!(sync.host().progress.borrow().last(), Some(&(4, 4, "Done".to_string())));
    }

    #[test]
    fn test_profile_close_persists_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("word_cache.csv");
        let settings = Settings::default();
        let cache = WordCache::load(&path).unwrap();
        let mut sync = JpdbSync::new(settings, cache, cat(), RecordingHost::default());

        sync.on_card_answered(&Note::new().with_field("Target", "猫"), Ease::GOOD).unwrap();
        sync.on_profile_will_close().unwrap();

        let reloaded = WordCache::load(&path).unwrap();
        assert_eq!(reloaded.lookup("猫").unwrap().state, DeckState::InYourDeck);
    }
}
