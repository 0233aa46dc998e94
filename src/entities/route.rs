// 🗺️ Route Entity

use serde::{Deserialize, Serialize};

use super::Editable;
use crate::validation::{Rule, Validator};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: Option<i64>,

    /// Public route number, may contain letters ("12", "42K")
    pub route_number: String,

    pub start_point: String,
    pub end_point: String,

    pub length_km: Option<f64>,

    /// Scheduled one-way running time
    pub duration_minutes: Option<i64>,
}

impl Route {
    pub fn new(
        route_number: impl Into<String>,
        start_point: impl Into<String>,
        end_point: impl Into<String>,
    ) -> Self {
        Route {
            route_number: route_number.into(),
            start_point: start_point.into(),
            end_point: end_point.into(),
            ..Default::default()
        }
    }

    /// "12: Depot -> Central Station"
    pub fn title(&self) -> String {
        format!(
            "{}: {} -> {}",
            self.route_number.trim(),
            self.start_point.trim(),
            self.end_point.trim()
        )
    }

    /// Average speed in km/h when both length and duration are known.
    pub fn average_speed(&self) -> Option<f64> {
        match (self.length_km, self.duration_minutes) {
            (Some(length), Some(minutes)) if minutes > 0 => Some(length / (minutes as f64 / 60.0)),
            _ => None,
        }
    }
}

impl Editable for Route {
    const KIND: &'static str = "Route";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn validator() -> Validator<Self> {
        Validator::new(Self::KIND)
            .rule(Rule::required_text(
                "route_number",
                "Route number must not be empty",
                |r: &Route| r.route_number.as_str(),
            ))
            .rule(Rule::required_text(
                "start_point",
                "Start point must not be empty",
                |r: &Route| r.start_point.as_str(),
            ))
            .rule(Rule::required_text(
                "end_point",
                "End point must not be empty",
                |r: &Route| r.end_point.as_str(),
            ))
            .rule(Rule::non_negative(
                "length_km",
                "Route length must not be negative",
                |r: &Route| r.length_km,
            ))
            .rule(Rule::non_negative(
                "duration_minutes",
                "Duration must not be negative",
                |r: &Route| r.duration_minutes,
            ))
    }
}
