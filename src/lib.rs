// Depot Desk - Core Library
// Record editing for a bus depot: fleet, routes, trips, positions, dismissals.
// Used by the CLI host and by tests.

pub mod config;
pub mod convert;     // Text field <-> number converters
pub mod db;          // SQLite repository + audit events
pub mod depot;       // Composition root
pub mod dialog;      // Dialog-to-caller signaling
pub mod entities;    // Editable record kinds
pub mod error;
pub mod import;      // Fleet CSV import
pub mod registry;    // Typed service lookup
pub mod session;     // Copy-on-open edit sessions
pub mod validation;  // Ordered business rules

// Re-export commonly used types
pub use config::Config;
pub use convert::{Conversion, DecimalConverter, IntConverter, NumberLocale, NumericConverter};
pub use db::{setup_database, Event, Persist, Repository};
pub use depot::{Converters, Depot, ImportSummary};
pub use dialog::{DialogResult, EditDialog};
pub use entities::{Bus, BusState, Dismissal, Editable, Position, Route, Trip};
pub use error::{RegistryError, SessionError, ValidationError};
pub use import::{load_buses_csv, BusImport, RejectedRow};
pub use registry::ServiceRegistry;
pub use session::{EditSession, SessionOutcome, SessionState};
pub use validation::{FieldCheck, Rule, ValidationPolicy, Validator};
