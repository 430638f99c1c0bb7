use std::{
    collections::HashMap,
    path::{
        Path,
        PathBuf,
    },
};

use serde::Deserialize;
use tracing::{
    debug,
    info,
    warn,
};

use crate::{
    core::{
        DeckState,
        SyncError,
        VocabularyRef,
    },
    jpdb::VocabularyService,
    persistence::ensure_parent_dir,
};

pub const HEADER: [&str; 4] = ["word", "vid", "sid", "state"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub word: String,
    pub vocab: VocabularyRef,
    pub state: DeckState,
}

#[derive(Debug, Default, Deserialize)]
struct CacheRow {
    #[serde(default)]
    word: String,
    #[serde(default)]
    vid: String,
    #[serde(default)]
    sid: String,
    #[serde(default)]
    state: String,
}

impl CacheRow {
    fn into_entry(self) -> Option<CacheEntry> {
        let vid = self.vid.trim().parse().ok()?;
        let sid = self.sid.trim().parse().ok()?;
        Some(CacheEntry {
            state: DeckState::from(self.state.as_str()),
            vocab: VocabularyRef::new(vid, sid),
            word: self.word,
        })
    }
}

/// Word text → jpdb vocabulary, kept for the whole session and flushed to a
/// CSV file when the profile closes.
///
/// The surface text is the only key, so two senses written the same way
/// share one entry: whichever was resolved first.
#[derive(Debug, Default)]
pub struct WordCache {
    entries: Vec<CacheEntry>,
    index: HashMap<String, usize>,
    file_path: Option<PathBuf>,
}

impl WordCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A missing file is not an error: it is created with just the header.
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let mut cache = Self { file_path: Some(path.to_path_buf()), ..Self::default() };

        if !path.exists() {
            info!("No word cache at {}, starting empty", path.display());
            cache.persist()?;
            return Ok(cache);
        }

        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        for (line, row) in reader.deserialize::<CacheRow>().enumerate() {
            let row = row?;
            let word = row.word.clone();
            match row.into_entry() {
                Some(entry) => {
                    if cache.index.contains_key(&entry.word) {
                        debug!("Duplicate cache row for {:?}, keeping the first", entry.word);
                        continue;
                    }
                    cache.insert(entry);
                }
                None => warn!("Skipping cache row {} ({:?}): vid/sid are not integers", line + 2, word),
            }
        }

        info!("Loaded {} cached words from {}", cache.len(), path.display());
        Ok(cache)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    pub fn lookup(&self, word: &str) -> Option<&CacheEntry> {
        self.index.get(word).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.iter()
    }

    fn insert(&mut self, entry: CacheEntry) {
        self.index.insert(entry.word.clone(), self.entries.len());
        self.entries.push(entry);
    }

    /// Returns the cached entry, asking jpdb for it (parse, then state
    /// lookup) on a miss. Nothing is cached if either call fails.
    pub fn resolve<S>(&mut self, word: &str, service: &S) -> Result<CacheEntry, SyncError>
    where
        S: VocabularyService + ?Sized,
    {
        if let Some(entry) = self.lookup(word) {
            return Ok(entry.clone());
        }

        let vocab = service.parse_word(word)?;
        let state = service.lookup_state(vocab)?;
        debug!("Resolved {:?} to vid {} sid {} ({})", word, vocab.vid, vocab.sid, state);

        let entry = CacheEntry { word: word.to_string(), vocab, state };
        self.insert(entry.clone());
        Ok(entry)
    }

    /// Repeat calls on a word already in the deck are a no-op.
    pub fn mark_in_deck(&mut self, word: &str) -> Result<(), SyncError> {
        let i = *self.index.get(word).ok_or_else(|| SyncError::NotCached(word.to_string()))?;
        self.entries[i].state = DeckState::InYourDeck;
        Ok(())
    }

    /// Overwrites the cache file with every entry, in insertion order.
    pub fn persist(&self) -> Result<(), SyncError> {
        let path = self
            .file_path
            .as_deref()
            .ok_or_else(|| SyncError::unexpected("word cache", "no cache file configured"))?;
        self.persist_to(path)
    }

    pub fn persist_to(&self, path: &Path) -> Result<(), SyncError> {
        ensure_parent_dir(path)?;

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(HEADER)?;
        for entry in &self.entries {
            let vid = entry.vocab.vid.to_string();
            let sid = entry.vocab.sid.to_string();
            writer.write_record([entry.word.as_str(), vid.as_str(), sid.as_str(), entry.state.as_str()])?;
        }
        writer.flush()?;

        debug!("Saved {} cached words to {}", self.entries.len(), path.display());
        Ok(())
    }
}
