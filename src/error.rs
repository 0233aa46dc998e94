// ⚠️ Error taxonomy for the edit workflow
//
// Validation failures are user-correctable; the rest are caller bugs.
// Conversion failures never show up here (see convert.rs).

use thiserror::Error;

use crate::session::SessionState;

/// First violated rule of a record under edit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{kind}] {field}: {message}")]
pub struct ValidationError {
    /// Record kind ("Position", "Bus", ...)
    pub kind: &'static str,
    /// Rule name, stable across releases
    pub rule: &'static str,
    /// Field the rule guards
    pub field: &'static str,
    /// Message shown to the user
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The working copy broke a rule; the session is still open.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The session already reached a terminal state.
    #[error("{kind} edit session is already {state}")]
    InvalidState {
        kind: &'static str,
        state: SessionState,
    },
}

impl SessionError {
    pub fn is_validation(&self) -> bool {
        matches!(self, SessionError::Validation(_))
    }

    /// Message of the violated rule, if this is a validation failure.
    pub fn validation_message(&self) -> Option<&str> {
        match self {
            SessionError::Validation(err) => Some(&err.message),
            SessionError::InvalidState { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("service not registered: {type_name}")]
    NotRegistered { type_name: &'static str },

    #[error("service already registered: {type_name}")]
    AlreadyRegistered { type_name: &'static str },
}
