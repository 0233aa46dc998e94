// 🏢 Depot - composition root
//
// Builds the repository and converters once and hands them to everything
// that needs them. The same instances are published in a service registry
// for lookup by type.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use log::info;
use serde::Serialize;

use crate::config::Config;
use crate::convert::{DecimalConverter, IntConverter, NumberLocale};
use crate::db::{Event, Persist, Repository};
use crate::dialog::EditDialog;
use crate::entities::Bus;
use crate::import::{load_buses_csv, RejectedRow};
use crate::registry::ServiceRegistry;
use crate::session::SessionOutcome;

const DEFAULT_ACTOR: &str = "dispatcher";

/// Converters for bound text fields, in the configured locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Converters {
    pub ints: IntConverter,
    pub decimals: DecimalConverter,
}

impl Converters {
    pub fn new(locale: NumberLocale) -> Self {
        Converters {
            ints: IntConverter::new(locale),
            decimals: DecimalConverter::new(locale),
        }
    }
}

/// Result of a fleet import.
#[derive(Debug, Default)]
pub struct ImportSummary {
    pub inserted: usize,
    /// Rows whose state number is already in the fleet
    pub duplicates: usize,
    pub rejected: Vec<RejectedRow>,
}

pub struct Depot {
    repository: Arc<Repository>,
    converters: Converters,
    services: ServiceRegistry,
    actor: String,
}

impl Depot {
    pub fn open(config: &Config) -> Result<Self> {
        let repository = Repository::open(&config.database_path)?;
        info!("opened depot database {}", config.database_path.display());
        Self::assemble(repository, config.locale)
    }

    pub fn open_in_memory(locale: NumberLocale) -> Result<Self> {
        Self::assemble(Repository::open_in_memory()?, locale)
    }

    fn assemble(repository: Repository, locale: NumberLocale) -> Result<Self> {
        let repository = Arc::new(repository);
        let converters = Converters::new(locale);

        let services = ServiceRegistry::new();
        services.register_arc(repository.clone())?;
        services.register(converters)?;

        Ok(Depot {
            repository,
            converters,
            services,
            actor: DEFAULT_ACTOR.to_string(),
        })
    }

    /// Name recorded as the actor of audit events.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn repository(&self) -> &Arc<Repository> {
        &self.repository
    }

    pub fn converters(&self) -> Converters {
        self.converters
    }

    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    pub fn new_dialog<R: Persist>(&self) -> EditDialog<R> {
        EditDialog::open(None)
    }

    /// Dialog seeded from the stored record.
    pub fn edit_dialog<R: Persist>(&self, id: i64) -> Result<EditDialog<R>> {
        let record: R = self
            .repository
            .get(id)?
            .ok_or_else(|| anyhow!("{} {} not found", R::KIND, id))?;
        Ok(EditDialog::open(Some(&record)))
    }

    /// Close a dialog: persist a committed record, drop a cancelled one.
    ///
    /// Returns the saved record (with its id) or `None` when discarded.
    pub fn close<R: Persist + Serialize>(&self, dialog: EditDialog<R>) -> Result<Option<R>> {
        let outcome = dialog
            .into_outcome()
            .ok_or_else(|| anyhow!("dialog closed while still open"))?;

        let mut record = match outcome {
            SessionOutcome::Committed(record) => record,
            SessionOutcome::Cancelled => return Ok(None),
        };

        let event_type = if record.is_new() { "created" } else { "updated" };
        record.prepare_for_save();
        let id = self.repository.save(&record)?;
        record.set_id(id);

        let event = Event::new(
            event_type,
            R::KIND,
            &id.to_string(),
            serde_json::to_value(&record)?,
            &self.actor,
        );
        self.repository.insert_event(&event)?;

        Ok(Some(record))
    }

    /// Import buses from CSV, skipping state numbers already in the fleet.
    pub fn import_buses(&self, csv_path: &Path) -> Result<ImportSummary> {
        let import = load_buses_csv(csv_path, self.converters.ints.locale)?;
        let mut summary = ImportSummary {
            rejected: import.rejected,
            ..Default::default()
        };

        for bus in import.accepted {
            if self
                .repository
                .find_bus_by_state_number(&bus.state_number)?
                .is_some()
            {
                summary.duplicates += 1;
                continue;
            }

            let mut dialog = EditDialog::<Bus>::open(Some(&bus));
            dialog.accept()?;
            self.close(dialog)?;
            summary.inserted += 1;
        }

        info!(
            "imported {} buses ({} duplicates, {} rejected)",
            summary.inserted,
            summary.duplicates,
            summary.rejected.len()
        );
        Ok(summary)
    }
}
