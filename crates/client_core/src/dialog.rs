use shared::domain::MutationIntent;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DialogError {
    #[error("key must not be empty")]
    EmptyKey,
    #[error("value must not be empty")]
    EmptyValue,
    #[error("the key of an existing record cannot be changed")]
    KeyImmutable,
    #[error("a submission is already in flight")]
    SubmissionInFlight,
    #[error("dialog is already committed")]
    Committed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogMode {
    Add,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogPhase {
    Editing,
    Submitting,
    Committed,
}

/// One bounded editing session over a single add or update.
///
/// The state machine is `Editing -> Submitting -> {Committed | Editing}`:
/// `begin_submit` validates the inputs and yields the intent exactly once,
/// and a failed completion returns to `Editing` with both inputs and the
/// failure message preserved. At most one submission is outstanding at any
/// time; the async relay call itself happens outside this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationDialog {
    id: Uuid,
    mode: DialogMode,
    key: String,
    value: String,
    phase: DialogPhase,
    last_error: Option<String>,
}

impl MutationDialog {
    pub fn add() -> Self {
        Self {
            id: Uuid::new_v4(),
            mode: DialogMode::Add,
            key: String::new(),
            value: String::new(),
            phase: DialogPhase::Editing,
            last_error: None,
        }
    }

    /// Opens an update session for an existing record; the key is fixed for
    /// the lifetime of the dialog.
    pub fn update(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode: DialogMode::Update,
            key: key.into(),
            value: value.into(),
            phase: DialogPhase::Editing,
            last_error: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> DialogMode {
        self.mode
    }

    pub fn phase(&self) -> DialogPhase {
        self.phase
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether the key field accepts input. In update mode it never does.
    pub fn key_editable(&self) -> bool {
        self.mode == DialogMode::Add && self.phase == DialogPhase::Editing
    }

    pub fn set_key(&mut self, key: impl Into<String>) -> Result<(), DialogError> {
        self.ensure_editing()?;
        if self.mode == DialogMode::Update {
            return Err(DialogError::KeyImmutable);
        }
        self.key = key.into();
        Ok(())
    }

    pub fn set_value(&mut self, value: impl Into<String>) -> Result<(), DialogError> {
        self.ensure_editing()?;
        self.value = value.into();
        Ok(())
    }

    /// Validates the inputs and enters `Submitting`, yielding the intent for
    /// the caller to hand to the relay. Rejected while a submission is
    /// already outstanding.
    pub fn begin_submit(&mut self) -> Result<MutationIntent, DialogError> {
        match self.phase {
            DialogPhase::Editing => {}
            DialogPhase::Submitting => return Err(DialogError::SubmissionInFlight),
            DialogPhase::Committed => return Err(DialogError::Committed),
        }
        if self.key.trim().is_empty() {
            return Err(DialogError::EmptyKey);
        }
        if self.value.trim().is_empty() {
            return Err(DialogError::EmptyValue);
        }
        self.phase = DialogPhase::Submitting;
        self.last_error = None;
        let key = self.key.trim().to_string();
        let value = self.value.trim().to_string();
        Ok(match self.mode {
            DialogMode::Add => MutationIntent::Add { key, value },
            DialogMode::Update => MutationIntent::Update { key, value },
        })
    }

    /// Delivers the relay outcome. Success commits and closes the session;
    /// failure returns to `Editing` with the inputs untouched and the error
    /// retained for display. Ignored unless a submission is outstanding.
    pub fn complete(&mut self, outcome: Result<(), String>) {
        if self.phase != DialogPhase::Submitting {
            return;
        }
        match outcome {
            Ok(()) => self.phase = DialogPhase::Committed,
            Err(message) => {
                self.phase = DialogPhase::Editing;
                self.last_error = Some(message);
            }
        }
    }

    fn ensure_editing(&self) -> Result<(), DialogError> {
        match self.phase {
            DialogPhase::Editing => Ok(()),
            DialogPhase::Submitting => Err(DialogError::SubmissionInFlight),
            DialogPhase::Committed => Err(DialogError::Committed),
        }
    }
}

/// Owns the dialog currently on screen. Relay responses arriving for a
/// session that has since been closed or replaced are dropped here instead
/// of mutating a dead dialog.
#[derive(Debug, Default)]
pub struct DialogHost {
    active: Option<MutationDialog>,
}

impl DialogHost {
    pub fn open(&mut self, dialog: MutationDialog) -> Uuid {
        let id = dialog.id();
        self.active = Some(dialog);
        id
    }

    pub fn close(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<&MutationDialog> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut MutationDialog> {
        self.active.as_mut()
    }

    /// Routes a completion to the active dialog. Returns false when the
    /// session is gone and the outcome was discarded.
    pub fn deliver(&mut self, session: Uuid, outcome: Result<(), String>) -> bool {
        match self.active.as_mut() {
            Some(dialog) if dialog.id() == session => {
                dialog.complete(outcome);
                if dialog.phase() == DialogPhase::Committed {
                    self.active = None;
                }
                true
            }
            _ => {
                warn!(%session, "discarding completion for a closed dialog session");
                false
            }
        }
    }
}
