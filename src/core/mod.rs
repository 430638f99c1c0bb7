pub mod errors;
pub mod http;
pub mod models;

pub use errors::SyncError;
pub use models::{
    Card,
    DeckState,
    Ease,
    Note,
    ReviewGrade,
    VocabularyRef,
};
