// 🚌 Bus Entity - the fleet
//
// A bus is identified by its registration plate (state number).
// Mileage, capacity and year are optional until the vehicle is inspected.

use serde::{Deserialize, Serialize};

use super::Editable;
use crate::validation::{Rule, Validator};

// ============================================================================
// BUS STATE
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusState {
    /// Available for trips
    #[default]
    InService,

    /// In the workshop
    UnderRepair,

    /// Parked, can be put on a route at short notice
    Reserve,

    /// Written off
    Decommissioned,
}

impl BusState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusState::InService => "In service",
            BusState::UnderRepair => "Under repair",
            BusState::Reserve => "Reserve",
            BusState::Decommissioned => "Decommissioned",
        }
    }

    /// Stable key used in storage and CSV files
    pub fn key(&self) -> &'static str {
        match self {
            BusState::InService => "in_service",
            BusState::UnderRepair => "under_repair",
            BusState::Reserve => "reserve",
            BusState::Decommissioned => "decommissioned",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::all().into_iter().find(|s| s.key() == key.trim())
    }

    pub fn all() -> [BusState; 4] {
        [
            BusState::InService,
            BusState::UnderRepair,
            BusState::Reserve,
            BusState::Decommissioned,
        ]
    }

    /// Whether a bus in this state may be assigned to a trip
    pub fn can_run_trips(&self) -> bool {
        matches!(self, BusState::InService | BusState::Reserve)
    }
}

// ============================================================================
// BUS ENTITY
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    pub id: Option<i64>,

    /// Registration plate, e.g. "A123BC77"
    pub state_number: String,

    pub model: String,

    #[serde(default)]
    pub color: String,

    #[serde(default)]
    pub state: BusState,

    pub mileage_km: Option<i64>,

    /// Passenger seats + standing places
    pub capacity: Option<i64>,

    pub manufacture_year: Option<i64>,
}

impl Bus {
    pub fn new(state_number: impl Into<String>, model: impl Into<String>) -> Self {
        Bus {
            state_number: state_number.into(),
            model: model.into(),
            ..Default::default()
        }
    }
}

impl Editable for Bus {
    const KIND: &'static str = "Bus";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn validator() -> Validator<Self> {
        Validator::new(Self::KIND)
            .rule(Rule::required_text(
                "state_number",
                "State number must not be empty",
                |b: &Bus| b.state_number.as_str(),
            ))
            .rule(Rule::required_text(
                "model",
                "Model must not be empty",
                |b: &Bus| b.model.as_str(),
            ))
            .rule(Rule::non_negative(
                "mileage_km",
                "Mileage must not be negative",
                |b: &Bus| b.mileage_km,
            ))
            .rule(Rule::non_negative(
                "capacity",
                "Capacity must not be negative",
                |b: &Bus| b.capacity,
            ))
            .rule(Rule::non_negative(
                "manufacture_year",
                "Manufacture year must not be negative",
                |b: &Bus| b.manufacture_year,
            ))
    }
}
