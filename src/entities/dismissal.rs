// 🚪 Dismissal - reason captured before an employee is let go
//
// Dismissal cannot be undone from the application, so the reason is
// mandatory and must contain more than whitespace.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Editable;
use crate::validation::{Rule, Validator};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dismissal {
    pub id: Option<i64>,

    pub employee_name: String,

    /// Stored exactly as entered
    pub reason: String,

    /// Effective date; None means the day the dismissal is recorded
    pub dismissed_on: Option<NaiveDate>,
}

impl Dismissal {
    pub fn new(employee_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Dismissal {
            employee_name: employee_name.into(),
            reason: reason.into(),
            ..Default::default()
        }
    }
}

impl Editable for Dismissal {
    const KIND: &'static str = "Dismissal";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn validator() -> Validator<Self> {
        Validator::new(Self::KIND)
            .rule(Rule::required_text(
                "reason",
                "A dismissal reason is required",
                |d: &Dismissal| d.reason.as_str(),
            ))
            .rule(Rule::required_text(
                "employee_name",
                "Employee name must not be empty",
                |d: &Dismissal| d.employee_name.as_str(),
            ))
    }
}
