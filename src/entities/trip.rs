// 🎫 Trip Entity - one run of a bus along a route

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::Editable;
use crate::validation::{Rule, Validator};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: Option<i64>,

    /// Route the trip runs on (foreign key to Route)
    pub route_id: Option<i64>,

    /// Bus assigned to the trip (foreign key to Bus)
    pub bus_id: Option<i64>,

    pub driver_name: String,

    pub departure: Option<NaiveDateTime>,
    pub arrival: Option<NaiveDateTime>,

    pub passengers: Option<i64>,

    /// Fare revenue collected on the trip
    pub revenue: Option<f64>,
}

impl Trip {
    pub fn new(route_id: i64, bus_id: i64, driver_name: impl Into<String>) -> Self {
        Trip {
            route_id: Some(route_id),
            bus_id: Some(bus_id),
            driver_name: driver_name.into(),
            ..Default::default()
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        Some(self.arrival? - self.departure?)
    }

    /// Arrival must come after departure; unknown times are not checked.
    fn times_ordered(&self) -> bool {
        match (self.departure, self.arrival) {
            (Some(departure), Some(arrival)) => arrival > departure,
            _ => true,
        }
    }
}

impl Editable for Trip {
    const KIND: &'static str = "Trip";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn validator() -> Validator<Self> {
        Validator::new(Self::KIND)
            .rule(Rule::required("route_id", "Select a route", |t: &Trip| t.route_id))
            .rule(Rule::required("bus_id", "Select a bus", |t: &Trip| t.bus_id))
            .rule(Rule::required_text(
                "driver_name",
                "Driver name must not be empty",
                |t: &Trip| t.driver_name.as_str(),
            ))
            .rule(Rule::non_negative(
                "passengers",
                "Passenger count must not be negative",
                |t: &Trip| t.passengers,
            ))
            .rule(Rule::non_negative(
                "revenue",
                "Revenue must not be negative",
                |t: &Trip| t.revenue,
            ))
            .rule(Rule::new(
                "arrival_after_departure",
                "arrival",
                "Arrival must be later than departure",
                Trip::times_ordered,
            ))
    }
}
