use std::{
    cell::RefCell,
    rc::Rc,
};

use tracing::debug;

use crate::jpdb::VocabularyService;

pub mod handlers;
pub mod registry;

pub use handlers::{
    BulkReport,
    FailedStep,
    JpdbSync,
    Outcome,
    DEFAULT_BULK_DELAY,
};
pub use registry::{
    CardAnsweredEvent,
    HookChannel,
    HookEvent,
    HookRegistry,
    NoteAddedEvent,
};

/// UI primitives the host application lends us.
pub trait Host {
    /// Blocking error dialog.
    fn show_critical(&self, message: &str);

    fn report_progress(&self, _done: usize, _total: usize, _label: &str) {}
}

/// Attaches the sync handlers to the host's event channels. The host is
/// single threaded, so the handlers share one `JpdbSync` through `Rc<RefCell<_>>`.
pub fn register<S, H>(registry: &mut HookRegistry, sync: Rc<RefCell<JpdbSync<S, H>>>)
where
    S: VocabularyService + 'static,
    H: Host + 'static,
{
    let handler = Rc::clone(&sync);
    registry.on_note_will_be_added(move |event| {
        let outcome = handler.borrow_mut().on_note_will_be_added(event.note)?;
        debug!("{} -> {:?}", HookChannel::NoteWillBeAdded.name(), outcome);
        Ok(())
    });

    let handler = Rc::clone(&sync);
    registry.on_card_answered(move |event| {
        let outcome = handler.borrow_mut().on_card_answered(&event.card.note, event.ease)?;
        debug!("{} -> {:?}", HookChannel::CardAnswered.name(), outcome);
        Ok(())
    });

    registry.on_profile_will_close(move || sync.borrow_mut().on_profile_will_close());
}
