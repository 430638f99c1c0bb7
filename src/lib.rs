//! Keeps a jpdb.io deck in step with local flashcard activity: words from new
//! notes are added to the mining deck, and reviews are forwarded as pass/fail
//! grades.

pub mod cache;
pub mod core;
pub mod hooks;
pub mod jpdb;
pub mod persistence;
pub mod settings;

pub use crate::{
    cache::{
        CacheEntry,
        WordCache,
    },
    core::SyncError,
    hooks::{
        register,
        Host,
        HookRegistry,
        JpdbSync,
        Outcome,
    },
    jpdb::{
        JpdbClient,
        VocabularyService,
    },
    settings::Settings,
};
