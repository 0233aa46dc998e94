// 📥 Fleet Import - buses from a CSV export
//
// Each row goes through the same edit session a user would see, so an
// imported bus obeys exactly the rules of the Bus dialog. Numeric columns are
// read with the text-field converters; a blank cell means "unknown".

use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use csv::{Position, StringRecord};
use serde::Deserialize;

use crate::convert::{IntConverter, NumberLocale, NumericConverter};
use crate::entities::{Bus, BusState};
use crate::session::EditSession;

/// One CSV row as exported by the depot's spreadsheet.
#[derive(Debug, Deserialize)]
pub struct BusRow {
    #[serde(rename = "State_Number")]
    pub state_number: String,

    #[serde(rename = "Model")]
    pub model: String,

    #[serde(rename = "Color", default)]
    pub color: String,

    #[serde(rename = "State", default)]
    pub state: String,

    #[serde(rename = "Mileage_Km", default)]
    pub mileage_km: String,

    #[serde(rename = "Capacity", default)]
    pub capacity: String,

    #[serde(rename = "Year", default)]
    pub manufacture_year: String,
}

/// A row that did not make it into the fleet.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    /// 1-based line in the file, header included
    pub line: usize,
    pub state_number: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct BusImport {
    pub accepted: Vec<Bus>,
    pub rejected: Vec<RejectedRow>,
}

/// Blank cells stay absent; anything else goes through the converter.
fn optional_int(converter: &IntConverter, column: &str, text: &str, line: usize) -> Option<i64> {
    if text.trim().is_empty() {
        return None;
    }

    let conversion = converter.parse(text);
    if conversion.failed {
        warn!("line {}: {} {:?} is not a number, read as 0", line, column, text);
    }
    Some(conversion.value)
}

fn record_line(position: &Position) -> usize {
    position.line() as usize
}

impl BusRow {
    fn into_bus(self, converter: &IntConverter, line: usize) -> Result<Bus, String> {
        let state = match self.state.trim() {
            "" => BusState::default(),
            key => BusState::from_key(key).ok_or_else(|| format!("Unknown bus state {:?}", key))?,
        };

        Ok(Bus {
            id: None,
            mileage_km: optional_int(converter, "Mileage_Km", &self.mileage_km, line),
            capacity: optional_int(converter, "Capacity", &self.capacity, line),
            manufacture_year: optional_int(converter, "Year", &self.manufacture_year, line),
            state_number: self.state_number.trim().to_string(),
            model: self.model.trim().to_string(),
            color: self.color.trim().to_string(),
            state,
        })
    }
}

/// Read and validate a fleet CSV. Only unreadable files are errors; bad rows
/// are collected in `rejected`.
pub fn load_buses_csv(csv_path: &Path, locale: NumberLocale) -> Result<BusImport> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;
    let headers = rdr
        .headers()
        .with_context(|| format!("Failed to read header of {}", csv_path.display()))?
        .clone();
    let converter = IntConverter::new(locale);

    let mut import = BusImport::default();
    let mut record = StringRecord::new();

    loop {
        match rdr.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) if err.is_io_error() => {
                return Err(err).with_context(|| format!("Failed to read {}", csv_path.display()));
            }
            Err(err) => {
                let line = err.position().map_or(0, record_line);
                let message = match err.kind() {
                    csv::ErrorKind::UnequalLengths { expected_len, len, .. } => {
                        format!("Row has {} fields, expected {}", len, expected_len)
                    }
                    _ => err.to_string(),
                };
                warn!("line {}: {}", line, message);
                import.rejected.push(RejectedRow {
                    line,
                    state_number: record.get(0).unwrap_or_default().trim().to_string(),
                    message,
                });
                continue;
            }
        }

        // Quoted fields may span lines, so count from the reader
        let line = record.position().map_or(0, record_line);
        let state_number = record.get(0).unwrap_or_default().trim().to_string();

        let parsed = record
            .deserialize::<BusRow>(Some(&headers))
            .map_err(|err| err.to_string())
            .and_then(|row| row.into_bus(&converter, line));
        let bus = match parsed {
            Ok(bus) => bus,
            Err(message) => {
                warn!("line {}: {}", line, message);
                import.rejected.push(RejectedRow {
                    line,
                    state_number,
                    message,
                });
                continue;
            }
        };

        let mut session = EditSession::open(Some(&bus));
        match session.request_commit() {
            Ok(bus) => import.accepted.push(bus),
            Err(err) => {
                let message = err
                    .validation_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| err.to_string());
                warn!("line {}: {}", line, message);
                import.rejected.push(RejectedRow {
                    line,
                    state_number,
                    message,
                });
            }
        }
    }

    info!(
        "read {}: {} buses accepted, {} rejected",
        csv_path.display(),
        import.accepted.len(),
        import.rejected.len()
    );
    Ok(import)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_rows() {
        let file = write_csv(
            "State_Number,Model,Color,State,Mileage_Km,Capacity,Year\n\
             A123BC77,LiAZ-5292,White,in_service,\"120,500\",110,2019\n\
             B456CD77,PAZ-3205,Yellow,reserve,,,\n",
        );

        let import = load_buses_csv(file.path(), NumberLocale::invariant()).unwrap();

        assert_eq!(import.accepted.len(), 2);
        assert!(import.rejected.is_empty());

        let liaz = &import.accepted[0];
        assert_eq!(liaz.state_number, "A123BC77");
        assert_eq!(liaz.mileage_km, Some(120_500));
        assert_eq!(liaz.capacity, Some(110));

        let paz = &import.accepted[1];
        assert_eq!(paz.state, BusState::Reserve);
        assert_eq!(paz.mileage_km, None);
        assert_eq!(paz.capacity, None);
    }

    #[test]
    fn test_invalid_rows_are_reported() {
        let file = write_csv(
            "State_Number,Model,Color,State,Mileage_Km,Capacity,Year\n\
             ,LiAZ-5292,White,in_service,10,110,2019\n\
             C789EF77,MAZ-203,Blue,in_service,-4,100,2015\n\
             D000AA77,MAZ-203,Blue,scrapped,1,100,2015\n\
             E111BB77,MAZ-203,Blue,,abc,100,2015\n",
        );

        let import = load_buses_csv(file.path(), NumberLocale::invariant()).unwrap();

        let rejected: Vec<(usize, &str)> = import
            .rejected
            .iter()
            .map(|r| (r.line, r.message.as_str()))
            .collect();
        assert_eq!(
            rejected,
            vec![
                (2, "State number must not be empty"),
                (3, "Mileage must not be negative"),
                (4, "Unknown bus state \"scrapped\""),
            ]
        );

        // Unreadable mileage falls back to zero, which is valid
        assert_eq!(import.accepted.len(), 1);
        assert_eq!(import.accepted[0].mileage_km, Some(0));
        assert_eq!(import.accepted[0].state, BusState::InService);
    }

    #[test]
    fn test_ragged_row_is_rejected_and_import_continues() {
        let file = write_csv(
            "State_Number,Model,Color,State,Mileage_Km,Capacity,Year\n\
             A123BC77,LiAZ-5292,White,in_service,10,110,2019\n\
             B456CD77,PAZ\n\
             C789EF77,MAZ-203,Blue,reserve,20,100,2015\n",
        );

        let import = load_buses_csv(file.path(), NumberLocale::invariant()).unwrap();

        let plates: Vec<&str> = import
            .accepted
            .iter()
            .map(|b| b.state_number.as_str())
            .collect();
        assert_eq!(plates, vec!["A123BC77", "C789EF77"]);

        assert_eq!(import.rejected.len(), 1);
        assert_eq!(import.rejected[0].line, 3);
        assert_eq!(import.rejected[0].message, "Row has 2 fields, expected 7");
    }

    #[test]
    fn test_line_numbers_follow_multiline_fields() {
        let file = write_csv(
            "State_Number,Model,Color,State,Mileage_Km,Capacity,Year\n\
             A123BC77,\"LiAZ-5292\narticulated\",White,in_service,10,110,2019\n\
             C789EF77,MAZ-203,Blue,in_service,-4,100,2015\n",
        );

        let import = load_buses_csv(file.path(), NumberLocale::invariant()).unwrap();

        assert_eq!(import.accepted.len(), 1);
        assert_eq!(import.accepted[0].model, "LiAZ-5292\narticulated");
        assert_eq!(
            import.rejected,
            vec![RejectedRow {
                line: 4,
                state_number: "C789EF77".to_string(),
                message: "Mileage must not be negative".to_string(),
            }]
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = load_buses_csv(Path::new("/nonexistent/fleet.csv"), NumberLocale::invariant());
        assert!(result.is_err());
    }
}
