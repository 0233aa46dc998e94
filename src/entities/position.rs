// 💼 Position Entity - staff positions and their pay
//
// Salary and bonus are optional: a position can be created before
// payroll has settled its numbers.

use serde::{Deserialize, Serialize};

use super::Editable;
use crate::validation::{Rule, Validator};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Row id; None for a position not saved yet
    pub id: Option<i64>,

    /// Title shown in staff lists (e.g. "Driver", "Mechanic")
    pub position_name: String,

    /// Monthly base salary
    pub base_salary: Option<f64>,

    /// Bonus on top of base salary, percent in [0, 100]
    pub bonus_percent: Option<f64>,

    #[serde(default)]
    pub description: String,
}

impl Position {
    pub fn new(position_name: impl Into<String>) -> Self {
        Position {
            position_name: position_name.into(),
            ..Default::default()
        }
    }

    /// Base salary plus bonus, when the salary is known.
    pub fn monthly_pay(&self) -> Option<f64> {
        let base = self.base_salary?;
        let bonus = self.bonus_percent.unwrap_or(0.0);
        Some(base * (1.0 + bonus / 100.0))
    }
}

impl Editable for Position {
    const KIND: &'static str = "Position";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn validator() -> Validator<Self> {
        Validator::new(Self::KIND)
            .rule(Rule::required_text(
                "position_name",
                "Position name must not be empty",
                |p: &Position| p.position_name.as_str(),
            ))
            .rule(Rule::non_negative(
                "base_salary",
                "Base salary must not be negative",
                |p: &Position| p.base_salary,
            ))
            .rule(Rule::percentage(
                "bonus_percent",
                "Bonus percent must be between 0 and 100",
                |p: &Position| p.bonus_percent,
            ))
    }
}
