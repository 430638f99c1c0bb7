use tracing::debug;

use crate::core::{
    Card,
    Ease,
    Note,
    SyncError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookChannel {
    NoteWillBeAdded,
    CardAnswered,
    ProfileWillClose,
}

impl HookChannel {
    pub fn name(&self) -> &'static str {
        match self {
            HookChannel::NoteWillBeAdded => "note_will_be_added",
            HookChannel::CardAnswered => "card_answered",
            HookChannel::ProfileWillClose => "profile_will_close",
        }
    }

    /// Host versions differ in what they call these events.
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "note_will_be_added" | "add_cards_did_add_note" => Some(HookChannel::NoteWillBeAdded),
            "card_answered" | "reviewer_did_answer_card" => Some(HookChannel::CardAnswered),
            "profile_will_close" | "unloadProfile" => Some(HookChannel::ProfileWillClose),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NoteAddedEvent<'a> {
    pub note: &'a Note,
    pub deck_id: u64, // local deck the note goes into
}

#[derive(Debug, Clone, Copy)]
pub struct CardAnsweredEvent<'a> {
    pub card: &'a Card,
    pub ease: Ease,
}

/// An event as the host hands it over, for hosts that dispatch by hook name.
#[derive(Debug, Clone, Copy)]
pub enum HookEvent<'a> {
    NoteWillBeAdded(NoteAddedEvent<'a>),
    CardAnswered(CardAnsweredEvent<'a>),
    ProfileWillClose,
}

impl HookEvent<'_> {
    pub fn channel(&self) -> HookChannel {
        match self {
            HookEvent::NoteWillBeAdded(_) => HookChannel::NoteWillBeAdded,
            HookEvent::CardAnswered(_) => HookChannel::CardAnswered,
            HookEvent::ProfileWillClose => HookChannel::ProfileWillClose,
        }
    }
}

pub type NoteAddedCallback = Box<dyn for<'a> FnMut(&NoteAddedEvent<'a>) -> Result<(), SyncError>>;
pub type CardAnsweredCallback =
    Box<dyn for<'a> FnMut(&CardAnsweredEvent<'a>) -> Result<(), SyncError>>;
pub type ProfileCloseCallback = Box<dyn FnMut() -> Result<(), SyncError>>;

/// The host's event channels. Callbacks run in registration order; the
/// first error stops dispatch and is handed back to the host.
#[derive(Default)]
pub struct HookRegistry {
    note_will_be_added: Vec<NoteAddedCallback>,
    card_answered: Vec<CardAnsweredCallback>,
    profile_will_close: Vec<ProfileCloseCallback>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_note_will_be_added<F>(&mut self, callback: F)
    where
        F: for<'a> FnMut(&NoteAddedEvent<'a>) -> Result<(), SyncError> + 'static,
    {
        self.note_will_be_added.push(Box::new(callback));
    }

    pub fn on_card_answered<F>(&mut self, callback: F)
    where
        F: for<'a> FnMut(&CardAnsweredEvent<'a>) -> Result<(), SyncError> + 'static,
    {
        self.card_answered.push(Box::new(callback));
    }

    pub fn on_profile_will_close<F>(&mut self, callback: F)
    where
        F: FnMut() -> Result<(), SyncError> + 'static,
    {
        self.profile_will_close.push(Box::new(callback));
    }

    pub fn callback_count(&self, channel: HookChannel) -> usize {
        match channel {
            HookChannel::NoteWillBeAdded => self.note_will_be_added.len(),
            HookChannel::CardAnswered => self.card_answered.len(),
            HookChannel::ProfileWillClose => self.profile_will_close.len(),
        }
    }

    pub fn note_will_be_added(&mut self, event: &NoteAddedEvent<'_>) -> Result<(), SyncError> {
        self.note_will_be_added.iter_mut().try_for_each(|callback| callback(event))
    }

    pub fn card_answered(&mut self, event: &CardAnsweredEvent<'_>) -> Result<(), SyncError> {
        self.card_answered.iter_mut().try_for_each(|callback| callback(event))
    }

    pub fn profile_will_close(&mut self) -> Result<(), SyncError> {
        self.profile_will_close.iter_mut().try_for_each(|callback| callback())
    }

    /// Dispatches `event` on the channel the host calls `name`. Returns
    /// `Ok(false)` for hooks we don't listen on.
    pub fn emit(&mut self, name: &str, event: &HookEvent<'_>) -> Result<bool, SyncError> {
        let Some(channel) = HookChannel::from_name(name) else {
            debug!("Ignoring unknown hook {:?}", name);
            return Ok(false);
        };
        if channel != event.channel() {
            return Err(SyncError::unexpected(
                name,
                format!("got a {} event", event.channel().name()),
            ));
        }

        match event {
            HookEvent::NoteWillBeAdded(event) => self.note_will_be_added(event)?,
            HookEvent::CardAnswered(event) => self.card_answered(event)?,
            HookEvent::ProfileWillClose => self.profile_will_close()?,
        }
        Ok(true)
    }
}
