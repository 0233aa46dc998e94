// Depot records - every kind that can be opened in an edit dialog

pub mod bus;
pub mod dismissal;
pub mod position;
pub mod route;
pub mod trip;

pub use bus::{Bus, BusState};
pub use dismissal::Dismissal;
pub use position::Position;
pub use route::Route;
pub use trip::Trip;

use std::fmt;

use crate::validation::Validator;

/// A record kind that can be edited through an `EditSession`.
///
/// Records are plain values: cloning one yields a working copy that shares
/// nothing mutable with the original.
pub trait Editable: Clone + Default + PartialEq + fmt::Debug + 'static {
    /// Kind name used in messages and the audit log ("Position", "Bus", ...)
    const KIND: &'static str;

    /// Repository identity; `None` until first saved.
    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: i64);

    /// Ordered rules checked before a commit is accepted.
    fn validator() -> Validator<Self>;

    fn is_new(&self) -> bool {
        self.id().is_none()
    }
}
