// 🪟 Edit Dialog - how a host window drives an edit session
//
// The host binds text fields through the converters, calls `accept` when the
// user confirms and `cancel` when they back out. Committed maps to
// "accept and close", Cancelled to "discard and close".

use crate::convert::{Conversion, NumericConverter};
use crate::entities::Editable;
use crate::error::{SessionError, ValidationError};
use crate::session::{EditSession, SessionOutcome, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogResult {
    Accepted,
    Discarded,
}

impl<R> From<&SessionOutcome<R>> for DialogResult {
    fn from(outcome: &SessionOutcome<R>) -> Self {
        if outcome.is_committed() {
            DialogResult::Accepted
        } else {
            DialogResult::Discarded
        }
    }
}

#[derive(Debug)]
pub struct EditDialog<R: Editable> {
    title: String,
    session: EditSession<R>,
    /// Message of the last rejected accept, shown under the form
    last_error: Option<ValidationError>,
}

impl<R: Editable> EditDialog<R> {
    /// "New Bus" for a fresh record, "Edit Bus #3" for a saved one.
    pub fn open(seed: Option<&R>) -> Self {
        let title = match seed.and_then(Editable::id) {
            Some(id) => format!("Edit {} #{}", R::KIND, id),
            None => format!("New {}", R::KIND),
        };

        EditDialog {
            title,
            session: EditSession::open(seed),
            last_error: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn record(&self) -> &R {
        self.session.working()
    }

    pub fn has_changes(&self) -> bool {
        self.session.has_changes()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.last_error.as_ref().map(|e| e.message.as_str())
    }

    pub fn edit<F>(&mut self, update_fn: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut R),
    {
        self.session.edit(update_fn)
    }

    /// Push text from a bound numeric field into the record.
    ///
    /// The converter never fails; a zero fallback is reported through the
    /// returned `Conversion`.
    pub fn set_number<C, F>(
        &mut self,
        converter: &C,
        text: &str,
        apply: F,
    ) -> Result<Conversion<C::Value>, SessionError>
    where
        C: NumericConverter,
        F: FnOnce(&mut R, C::Value),
    {
        let conversion = converter.parse(text);
        self.session.edit(|record| apply(record, conversion.value))?;
        Ok(conversion)
    }

    /// Text to show in a bound numeric field.
    pub fn display_number<C, F>(&self, converter: &C, get: F) -> String
    where
        C: NumericConverter,
        F: FnOnce(&R) -> Option<C::Value>,
    {
        converter.to_display(get(self.session.working()))
    }

    /// User pressed OK. On a rule violation the dialog stays open and keeps
    /// the message for display.
    pub fn accept(&mut self) -> Result<R, SessionError> {
        match self.session.request_commit() {
            Ok(record) => {
                self.last_error = None;
                Ok(record)
            }
            Err(SessionError::Validation(err)) => {
                self.last_error = Some(err.clone());
                Err(SessionError::Validation(err))
            }
            Err(err) => Err(err),
        }
    }

    pub fn cancel(&mut self) -> Result<(), SessionError> {
        self.session.request_cancel()
    }

    pub fn is_open(&self) -> bool {
        self.session.state() == SessionState::Open
    }

    /// `None` while the dialog is still open.
    pub fn result(&self) -> Option<DialogResult> {
        match self.session.state() {
            SessionState::Open => None,
            SessionState::Committed => Some(DialogResult::Accepted),
            SessionState::Cancelled => Some(DialogResult::Discarded),
        }
    }

    /// Close the dialog and hand the outcome to the caller.
    pub fn into_outcome(self) -> Option<SessionOutcome<R>> {
        self.session.into_outcome()
    }
}
