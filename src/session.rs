// 📝 Edit Session - copy on open, validate on commit
//
// A session owns a working copy of one record. The caller's original is
// never touched: committing hands back a new value, cancelling drops the copy.
//
//   Open ──commit ok──▶ Committed
//     │ ▲
//     │ └─commit failed (stays Open, retry freely)
//     └───cancel──────▶ Cancelled

use std::fmt;

use log::debug;

use crate::entities::Editable;
use crate::error::SessionError;
use crate::validation::Validator;

// ============================================================================
// STATE & OUTCOME
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Committed,
    Cancelled,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Open => "open",
            SessionState::Committed => "committed",
            SessionState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::Open)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal signal delivered to whoever opened the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome<R> {
    Committed(R),
    Cancelled,
}

impl<R> SessionOutcome<R> {
    pub fn is_committed(&self) -> bool {
        matches!(self, SessionOutcome::Committed(_))
    }

    pub fn record(&self) -> Option<&R> {
        match self {
            SessionOutcome::Committed(record) => Some(record),
            SessionOutcome::Cancelled => None,
        }
    }

    pub fn into_record(self) -> Option<R> {
        match self {
            SessionOutcome::Committed(record) => Some(record),
            SessionOutcome::Cancelled => None,
        }
    }
}

// ============================================================================
// EDIT SESSION
// ============================================================================

/// Single-use edit of one record.
pub struct EditSession<R: Editable> {
    working: R,
    /// Snapshot of the seed, used only for change detection
    seed: Option<R>,
    validator: Validator<R>,
    state: SessionState,
    attempts: u32,
}

impl<R: Editable> EditSession<R> {
    /// Open with the record kind's own rules.
    ///
    /// With a seed the working copy is a clone of it; without one it starts
    /// from `R::default()`.
    pub fn open(seed: Option<&R>) -> Self {
        Self::open_with(seed, R::validator())
    }

    pub fn open_with(seed: Option<&R>, validator: Validator<R>) -> Self {
        let working = seed.cloned().unwrap_or_default();
        debug!(
            "opened {} edit session (id={:?}, seeded={})",
            R::KIND,
            working.id(),
            seed.is_some()
        );

        EditSession {
            working,
            seed: seed.cloned(),
            validator,
            state: SessionState::Open,
            attempts: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    /// Number of commit requests made so far, failed ones included.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn working(&self) -> &R {
        &self.working
    }

    /// Mutable access for field edits; refused once the session has ended.
    pub fn working_mut(&mut self) -> Result<&mut R, SessionError> {
        self.ensure_open()?;
        Ok(&mut self.working)
    }

    /// Apply an edit to the working copy.
    pub fn edit<F>(&mut self, update_fn: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut R),
    {
        update_fn(self.working_mut()?);
        Ok(())
    }

    /// Whether the working copy differs from what the session was opened with.
    pub fn has_changes(&self) -> bool {
        match &self.seed {
            Some(seed) => seed != &self.working,
            None => self.working != R::default(),
        }
    }

    /// Validate and, on success, freeze the working copy.
    ///
    /// A validation failure leaves the session open; the caller may fix the
    /// working copy and try again as often as needed.
    pub fn request_commit(&mut self) -> Result<R, SessionError> {
        self.ensure_open()?;
        self.attempts += 1;

        if let Err(err) = self.validator.check(&self.working) {
            debug!(
                "{} commit attempt {} rejected by {}: {}",
                self.validator.kind(),
                self.attempts,
                err.rule,
                err.message
            );
            return Err(err.into());
        }

        self.state = SessionState::Committed;
        debug!("{} edit session committed", R::KIND);
        Ok(self.working.clone())
    }

    /// End the session without validating; the working copy is discarded.
    pub fn request_cancel(&mut self) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.state = SessionState::Cancelled;
        debug!("{} edit session cancelled", R::KIND);
        Ok(())
    }

    /// Terminal outcome, if the session has ended.
    pub fn outcome(&self) -> Option<SessionOutcome<R>> {
        match self.state {
            SessionState::Open => None,
            SessionState::Committed => Some(SessionOutcome::Committed(self.working.clone())),
            SessionState::Cancelled => Some(SessionOutcome::Cancelled),
        }
    }

    /// Consume the session; `None` if it never ended.
    pub fn into_outcome(self) -> Option<SessionOutcome<R>> {
        match self.state {
            SessionState::Open => None,
            SessionState::Committed => Some(SessionOutcome::Committed(self.working)),
            SessionState::Cancelled => Some(SessionOutcome::Cancelled),
        }
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.state.is_terminal() {
            return Err(SessionError::InvalidState {
                kind: R::KIND,
                state: self.state,
            });
        }
        Ok(())
    }
}

impl<R: Editable> fmt::Debug for EditSession<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditSession")
            .field("kind", &R::KIND)
            .field("state", &self.state)
            .field("working", &self.working)
            .field("attempts", &self.attempts)
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Dismissal, Position};
    use crate::validation::Rule;

    fn driver_position() -> Position {
        Position {
            id: Some(7),
            position_name: "Driver".to_string(),
            base_salary: Some(42000.0),
            bonus_percent: Some(10.0),
            description: "Category D licence".to_string(),
        }
    }

    #[test]
    fn test_open_without_seed_starts_from_default() {
        let session = EditSession::<Position>::open(None);
        assert!(session.is_open());
        assert_eq!(session.working(), &Position::default());
        assert!(!session.has_changes());
    }

    #[test]
    fn test_cancel_leaves_original_untouched() {
        let original = driver_position();
        let snapshot = original.clone();

        let mut session = EditSession::open(Some(&original));
        session
            .edit(|p| {
                p.position_name = "Senior driver".to_string();
                p.base_salary = Some(-1.0);
            })
            .unwrap();
        assert!(session.has_changes());

        session.request_cancel().unwrap();

        assert_eq!(original, snapshot);
        assert_eq!(session.state(), SessionState::Cancelled);
        assert_eq!(session.outcome(), Some(SessionOutcome::Cancelled));
    }

    #[test]
    fn test_cancel_skips_validation() {
        let mut session = EditSession::<Position>::open(None);
        // Empty name would fail commit
        assert!(session.request_cancel().is_ok());
        assert_eq!(session.attempts(), 0);
    }

    #[test]
    fn test_empty_name_keeps_session_open() {
        let mut session = EditSession::<Position>::open(None);

        let err = session.request_commit().unwrap_err();
        assert!(err.is_validation());
        assert_eq!(session.state(), SessionState::Open);
        assert!(session.outcome().is_none());
    }

    #[test]
    fn test_retry_after_fix_commits() {
        let mut session = EditSession::<Position>::open(None);
        session.working_mut().unwrap().base_salary = Some(-1.0);

        assert!(session.request_commit().is_err());

        session.edit(|p| p.position_name = "Mechanic".to_string()).unwrap();
        let err = session.request_commit().unwrap_err();
        assert_eq!(err.validation_message(), Some("Base salary must not be negative"));

        session.edit(|p| p.base_salary = None).unwrap();
        let committed = session.request_commit().unwrap();

        assert_eq!(committed.position_name, "Mechanic");
        assert_eq!(committed.base_salary, None);
        assert_eq!(session.attempts(), 3);
        assert_eq!(session.state(), SessionState::Committed);
    }

    #[test]
    fn test_commit_returns_independent_copy() {
        let original = driver_position();
        let mut session = EditSession::open(Some(&original));
        session.edit(|p| p.bonus_percent = Some(100.0)).unwrap();

        let committed = session.request_commit().unwrap();

        assert_eq!(committed.bonus_percent, Some(100.0));
        assert_eq!(committed.id, original.id);
        assert_eq!(original.bonus_percent, Some(10.0));
    }

    #[test]
    fn test_terminal_session_rejects_further_requests() {
        let mut session = EditSession::open(Some(&driver_position()));
        session.request_commit().unwrap();

        let again = session.request_commit().unwrap_err();
        assert_eq!(
            again,
            SessionError::InvalidState {
                kind: "Position",
                state: SessionState::Committed,
            }
        );
        assert!(session.request_cancel().is_err());
        assert!(session.working_mut().is_err());
        assert!(session.edit(|p| p.bonus_percent = None).is_err());

        // Outcome is unaffected by the rejected calls
        let outcome = session.into_outcome().unwrap();
        assert_eq!(outcome.into_record(), Some(driver_position()));
    }

    #[test]
    fn test_cancelled_session_rejects_commit() {
        let mut session = EditSession::open(Some(&driver_position()));
        session.request_cancel().unwrap();

        let err = session.request_commit().unwrap_err();
        assert_eq!(err.to_string(), "Position edit session is already cancelled");
        assert!(session.request_cancel().is_err());
        assert_eq!(session.into_outcome(), Some(SessionOutcome::Cancelled));
    }

    #[test]
    fn test_open_session_has_no_outcome() {
        let session = EditSession::open(Some(&driver_position()));
        assert!(session.into_outcome().is_none());
    }

    #[test]
    fn test_dismissal_reason_is_returned_verbatim() {
        let mut session = EditSession::<Dismissal>::open(None);
        session
            .edit(|d| {
                d.employee_name = "I. Petrov".to_string();
                d.reason = "   ".to_string();
            })
            .unwrap();
        assert!(session.request_commit().is_err());

        session
            .edit(|d| d.reason = "Voluntary resignation".to_string())
            .unwrap();
        let committed = session.request_commit().unwrap();
        assert_eq!(committed.reason, "Voluntary resignation");
    }

    #[test]
    fn test_custom_validator() {
        let strict = crate::validation::Validator::new("Position").rule(Rule::non_negative(
            "base_salary",
            "Salary is mandatory here",
            |p: &Position| Some(p.base_salary.unwrap_or(-1.0)),
        ));

        let mut session = EditSession::open_with(None, strict);
        assert_eq!(
            session.request_commit().unwrap_err().validation_message(),
            Some("Salary is mandatory here")
        );
    }
}
