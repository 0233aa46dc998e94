// 🗄️ Repository - SQLite storage for committed records
//
// Only committed records reach this module. Every record kind maps to one
// table whose first column is the rowid-backed `id`; the `events` table is
// the append-only audit trail.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use log::info;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Params, Row};
use serde::{Deserialize, Serialize};

use crate::entities::{Bus, BusState, Dismissal, Editable, Position, Route, Trip};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// AUDIT EVENTS
// ============================================================================

/// Audit trail entry: one per committed edit.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery; in-memory databases silently keep "memory"
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS positions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            position_name TEXT NOT NULL,
            base_salary REAL,
            bonus_percent REAL,
            description TEXT NOT NULL DEFAULT '',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS buses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            state_number TEXT UNIQUE NOT NULL,
            model TEXT NOT NULL,
            color TEXT NOT NULL DEFAULT '',
            state TEXT NOT NULL,
            mileage_km INTEGER,
            capacity INTEGER,
            manufacture_year INTEGER,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS routes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            route_number TEXT NOT NULL,
            start_point TEXT NOT NULL,
            end_point TEXT NOT NULL,
            length_km REAL,
            duration_minutes INTEGER,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS trips (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            route_id INTEGER NOT NULL REFERENCES routes(id),
            bus_id INTEGER NOT NULL REFERENCES buses(id),
            driver_name TEXT NOT NULL,
            departure TEXT,
            arrival TEXT,
            passengers INTEGER,
            revenue REAL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS dismissals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            employee_name TEXT NOT NULL,
            reason TEXT NOT NULL,
            dismissed_on TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_trips_route ON trips(route_id);
        CREATE INDEX IF NOT EXISTS idx_trips_bus ON trips(bus_id);
        CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id);
        CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);",
    )?;

    Ok(())
}

// ============================================================================
// ROW MAPPING
// ============================================================================

/// Table mapping for a record kind.
///
/// `COLUMNS` excludes `id`; `values()` and `from_row()` use the same order,
/// with `id` at row index 0.
pub trait Persist: Editable {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    fn values(&self) -> Vec<Value>;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Fill in values decided at save time.
    fn prepare_for_save(&mut self) {}
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn opt_int(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

fn opt_real(value: Option<f64>) -> Value {
    value.map_or(Value::Null, Value::Real)
}

fn opt_datetime(value: Option<NaiveDateTime>) -> Value {
    value.map_or(Value::Null, |v| Value::Text(v.format(DATETIME_FORMAT).to_string()))
}

fn opt_date(value: Option<NaiveDate>) -> Value {
    value.map_or(Value::Null, |v| Value::Text(v.format(DATE_FORMAT).to_string()))
}

fn get_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        NaiveDateTime::parse_from_str(&s, DATETIME_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn get_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        NaiveDate::parse_from_str(&s, DATE_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

impl Persist for Position {
    const TABLE: &'static str = "positions";
    const COLUMNS: &'static [&'static str] =
        &["position_name", "base_salary", "bonus_percent", "description"];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.position_name),
            opt_real(self.base_salary),
            opt_real(self.bonus_percent),
            text(&self.description),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Position {
            id: Some(row.get(0)?),
            position_name: row.get(1)?,
            base_salary: row.get(2)?,
            bonus_percent: row.get(3)?,
            description: row.get(4)?,
        })
    }
}

impl Persist for Bus {
    const TABLE: &'static str = "buses";
    const COLUMNS: &'static [&'static str] = &[
        "state_number",
        "model",
        "color",
        "state",
        "mileage_km",
        "capacity",
        "manufacture_year",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            // Plates are matched trimmed, so they are stored trimmed
            text(self.state_number.trim()),
            text(&self.model),
            text(&self.color),
            text(self.state.key()),
            opt_int(self.mileage_km),
            opt_int(self.capacity),
            opt_int(self.manufacture_year),
        ]
    }

    fn prepare_for_save(&mut self) {
        let trimmed = self.state_number.trim();
        if trimmed.len() != self.state_number.len() {
            self.state_number = trimmed.to_string();
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let state_key: String = row.get(4)?;
        let state = BusState::from_key(&state_key).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                Type::Text,
                format!("unknown bus state {:?}", state_key).into(),
            )
        })?;

        Ok(Bus {
            id: Some(row.get(0)?),
            state_number: row.get(1)?,
            model: row.get(2)?,
            color: row.get(3)?,
            state,
            mileage_km: row.get(5)?,
            capacity: row.get(6)?,
            manufacture_year: row.get(7)?,
        })
    }
}

impl Persist for Route {
    const TABLE: &'static str = "routes";
    const COLUMNS: &'static [&'static str] = &[
        "route_number",
        "start_point",
        "end_point",
        "length_km",
        "duration_minutes",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.route_number),
            text(&self.start_point),
            text(&self.end_point),
            opt_real(self.length_km),
            opt_int(self.duration_minutes),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Route {
            id: Some(row.get(0)?),
            route_number: row.get(1)?,
            start_point: row.get(2)?,
            end_point: row.get(3)?,
            length_km: row.get(4)?,
            duration_minutes: row.get(5)?,
        })
    }
}

impl Persist for Trip {
    const TABLE: &'static str = "trips";
    const COLUMNS: &'static [&'static str] = &[
        "route_id",
        "bus_id",
        "driver_name",
        "departure",
        "arrival",
        "passengers",
        "revenue",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            opt_int(self.route_id),
            opt_int(self.bus_id),
            text(&self.driver_name),
            opt_datetime(self.departure),
            opt_datetime(self.arrival),
            opt_int(self.passengers),
            opt_real(self.revenue),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Trip {
            id: Some(row.get(0)?),
            route_id: row.get(1)?,
            bus_id: row.get(2)?,
            driver_name: row.get(3)?,
            departure: get_datetime(row, 4)?,
            arrival: get_datetime(row, 5)?,
            passengers: row.get(6)?,
            revenue: row.get(7)?,
        })
    }
}

impl Persist for Dismissal {
    const TABLE: &'static str = "dismissals";
    const COLUMNS: &'static [&'static str] = &["employee_name", "reason", "dismissed_on"];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.employee_name),
            text(&self.reason),
            opt_date(self.dismissed_on),
        ]
    }

    fn prepare_for_save(&mut self) {
        if self.dismissed_on.is_none() {
            self.dismissed_on = Some(Local::now().date_naive());
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Dismissal {
            id: Some(row.get(0)?),
            employee_name: row.get(1)?,
            reason: row.get(2)?,
            dismissed_on: get_date(row, 3)?,
        })
    }
}

// ============================================================================
// REPOSITORY
// ============================================================================

/// Single SQLite connection shared by everything that persists records.
pub struct Repository {
    conn: Mutex<Connection>,
}

impl Repository {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn).context("Failed to set up database schema")?;
        Ok(Repository {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a new record or update an existing one; returns its id.
    pub fn save<R: Persist>(&self, record: &R) -> Result<i64> {
        let conn = self.conn();
        let values = record.values();

        match record.id() {
            None => {
                let placeholders: Vec<String> =
                    (1..=R::COLUMNS.len()).map(|i| format!("?{}", i)).collect();
                let sql = format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    R::TABLE,
                    R::COLUMNS.join(", "),
                    placeholders.join(", ")
                );
                conn.execute(&sql, params_from_iter(values))
                    .with_context(|| format!("Failed to insert {}", R::KIND))?;

                let id = conn.last_insert_rowid();
                info!("inserted {} {}", R::KIND, id);
                Ok(id)
            }
            Some(id) => {
                let assignments: Vec<String> = R::COLUMNS
                    .iter()
                    .enumerate()
                    .map(|(i, column)| format!("{} = ?{}", column, i + 1))
                    .collect();
                let sql = format!(
                    "UPDATE {} SET {} WHERE id = ?{}",
                    R::TABLE,
                    assignments.join(", "),
                    R::COLUMNS.len() + 1
                );

                let mut bound = values;
                bound.push(Value::Integer(id));
                let changed = conn
                    .execute(&sql, params_from_iter(bound))
                    .with_context(|| format!("Failed to update {} {}", R::KIND, id))?;
                if changed == 0 {
                    return Err(anyhow!("{} {} not found", R::KIND, id));
                }

                info!("updated {} {}", R::KIND, id);
                Ok(id)
            }
        }
    }

    pub fn get<R: Persist>(&self, id: i64) -> Result<Option<R>> {
        let sql = format!(
            "SELECT id, {} FROM {} WHERE id = ?1",
            R::COLUMNS.join(", "),
            R::TABLE
        );
        let record = self
            .conn()
            .query_row(&sql, params![id], |row| R::from_row(row))
            .optional()
            .with_context(|| format!("Failed to load {} {}", R::KIND, id))?;
        Ok(record)
    }

    /// All records of a kind, oldest first.
    pub fn list<R: Persist>(&self) -> Result<Vec<R>> {
        let sql = format!(
            "SELECT id, {} FROM {} ORDER BY id",
            R::COLUMNS.join(", "),
            R::TABLE
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map([], |row| R::from_row(row))?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to load {} records", R::KIND))?;
        Ok(records)
    }

    pub fn count<R: Persist>(&self) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", R::TABLE);
        let count: i64 = self.conn().query_row(&sql, [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn find_bus_by_state_number(&self, state_number: &str) -> Result<Option<Bus>> {
        let sql = format!(
            "SELECT id, {} FROM buses WHERE state_number = ?1",
            Bus::COLUMNS.join(", ")
        );
        let bus = self
            .conn()
            .query_row(&sql, params![state_number.trim()], |row| Bus::from_row(row))
            .optional()?;
        Ok(bus)
    }

    pub fn insert_event(&self, event: &Event) -> Result<()> {
        let data_json = serde_json::to_string(&event.data)?;

        self.conn().execute(
            "INSERT INTO events (
                event_id, timestamp, event_type, entity_type, entity_id, data, actor
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.event_id,
                event.timestamp.to_rfc3339(),
                event.event_type,
                event.entity_type,
                event.entity_id,
                data_json,
                event.actor,
            ],
        )?;

        Ok(())
    }

    /// Events for one record, newest first.
    pub fn events_for_entity(&self, entity_type: &str, entity_id: &str) -> Result<Vec<Event>> {
        self.query_events(
            "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
             FROM events
             WHERE entity_type = ?1 AND entity_id = ?2
             ORDER BY id DESC",
            params![entity_type, entity_id],
        )
    }

    /// Most recent events across all records.
    pub fn recent_events(&self, limit: usize) -> Result<Vec<Event>> {
        self.query_events(
            "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
             FROM events
             ORDER BY id DESC
             LIMIT ?1",
            params![limit as i64],
        )
    }

    fn query_events<P: Params>(&self, sql: &str, args: P) -> Result<Vec<Event>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;

        let events = stmt
            .query_map(args, |row| {
                let timestamp_str: String = row.get(1)?;
                let data_json: String = row.get(5)?;

                Ok(Event {
                    event_id: row.get(0)?,
                    timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                        .map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e))
                        })?
                        .with_timezone(&Utc),
                    event_type: row.get(2)?,
                    entity_type: row.get(3)?,
                    entity_id: row.get(4)?,
                    data: serde_json::from_str(&data_json).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
                    })?,
                    actor: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(events)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> Repository {
        Repository::open_in_memory().unwrap()
    }

    fn liaz() -> Bus {
        Bus {
            color: "White".to_string(),
            state: BusState::Reserve,
            mileage_km: Some(120_500),
            capacity: Some(110),
            manufacture_year: Some(2019),
            ..Bus::new("A123BC77", "LiAZ-5292")
        }
    }

    #[test]
    fn test_save_assigns_id_and_round_trips() {
        let repo = repo();

        let mut position = Position::new("Driver");
        position.base_salary = Some(42000.5);
        let id = repo.save(&position).unwrap();

        let loaded: Position = repo.get(id).unwrap().unwrap();
        position.id = Some(id);
        assert_eq!(loaded, position);
        assert_eq!(repo.count::<Position>().unwrap(), 1);
    }

    #[test]
    fn test_update_in_place() {
        let repo = repo();

        let id = repo.save(&liaz()).unwrap();
        let mut bus: Bus = repo.get(id).unwrap().unwrap();
        bus.state = BusState::UnderRepair;
        bus.mileage_km = None;

        assert_eq!(repo.save(&bus).unwrap(), id);
        assert_eq!(repo.count::<Bus>().unwrap(), 1);

        let reloaded: Bus = repo.get(id).unwrap().unwrap();
        assert_eq!(reloaded.state, BusState::UnderRepair);
        assert_eq!(reloaded.mileage_km, None);
    }

    #[test]
    fn test_update_missing_record_fails() {
        let repo = repo();
        let ghost = Route {
            id: Some(99),
            ..Route::new("12", "Depot", "Station")
        };

        let err = repo.save(&ghost).unwrap_err();
        assert!(err.to_string().contains("Route 99 not found"));
    }

    #[test]
    fn test_trip_round_trip_with_times() {
        let repo = repo();
        let route_id = repo.save(&Route::new("12", "Depot", "Station")).unwrap();
        let bus_id = repo.save(&liaz()).unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let trip = Trip {
            departure: day.and_hms_opt(7, 30, 0),
            arrival: day.and_hms_opt(8, 45, 0),
            passengers: Some(64),
            revenue: Some(3200.0),
            ..Trip::new(route_id, bus_id, "A. Ivanov")
        };
        let id = repo.save(&trip).unwrap();

        let loaded: Trip = repo.get(id).unwrap().unwrap();
        assert_eq!(loaded.departure, trip.departure);
        assert_eq!(loaded.arrival, trip.arrival);
        assert_eq!(loaded.route_id, Some(route_id));
    }

    #[test]
    fn test_trip_requires_existing_route() {
        let repo = repo();
        let bus_id = repo.save(&liaz()).unwrap();

        // Foreign keys are enforced
        assert!(repo.save(&Trip::new(404, bus_id, "A. Ivanov")).is_err());
    }

    #[test]
    fn test_list_in_insertion_order() {
        let repo = repo();
        repo.save(&Dismissal::new("I. Petrov", "Voluntary resignation"))
            .unwrap();
        repo.save(&Dismissal {
            dismissed_on: NaiveDate::from_ymd_opt(2024, 5, 31),
            ..Dismissal::new("S. Sidorov", "Contract ended")
        })
        .unwrap();

        let all: Vec<Dismissal> = repo.list().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].reason, "Voluntary resignation");
        assert_eq!(all[0].dismissed_on, None);
        assert_eq!(all[1].dismissed_on, NaiveDate::from_ymd_opt(2024, 5, 31));
    }

    #[test]
    fn test_duplicate_state_number_rejected() {
        let repo = repo();
        repo.save(&liaz()).unwrap();
        assert!(repo.save(&liaz()).is_err());

        let found = repo.find_bus_by_state_number(" A123BC77 ").unwrap();
        assert_eq!(found.unwrap().model, "LiAZ-5292");
        assert!(repo.find_bus_by_state_number("X000XX00").unwrap().is_none());
    }

    #[test]
    fn test_state_number_stored_trimmed() {
        let repo = repo();
        let id = repo.save(&Bus::new("A123BC77 ", "LiAZ-5292")).unwrap();

        let found = repo.find_bus_by_state_number("A123BC77").unwrap().unwrap();
        assert_eq!(found.id, Some(id));
        assert_eq!(found.state_number, "A123BC77");

        // Same plate with padding still hits the unique index
        assert!(repo.save(&Bus::new(" A123BC77", "PAZ-3205")).is_err());
    }

    #[test]
    fn test_event_log() {
        let repo = repo();

        let event = Event::new(
            "updated",
            "Position",
            "3",
            serde_json::json!({"position_name": "Driver"}),
            "dispatcher",
        );
        repo.insert_event(&event).unwrap();
        repo.insert_event(&Event::new("created", "Bus", "1", serde_json::json!({}), "dispatcher"))
            .unwrap();

        let events = repo.events_for_entity("Position", "3").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id, event.event_id);
        assert_eq!(events[0].data["position_name"], "Driver");

        let recent = repo.recent_events(1).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].entity_type, "Bus");
    }
}
