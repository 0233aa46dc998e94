use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use log::warn;
use serde::Serialize;

use depot_desk::config;
use depot_desk::{
    Bus, BusState, Config, Depot, Dismissal, EditDialog, NumericConverter, Persist, Position,
    Route, SessionError, Trip,
};

#[derive(Debug, Parser)]
#[command(
    name = "depot-desk",
    about = "Bus depot records: fleet, routes, trips and staff",
    version
)]
struct Cli {
    /// SQLite database file (overrides DEPOT_DB)
    #[arg(long, global = true, value_name = "path")]
    db: Option<PathBuf>,

    /// Number format for numeric input, e.g. en-US, ru-RU (overrides DEPOT_LOCALE)
    #[arg(long, global = true, value_name = "tag")]
    locale: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the database schema
    Init,
    /// Staff positions
    #[command(subcommand)]
    Position(PositionCommand),
    /// Fleet
    #[command(subcommand)]
    Bus(BusCommand),
    /// Routes
    #[command(subcommand)]
    Route(RouteCommand),
    /// Trips
    #[command(subcommand)]
    Trip(TripCommand),
    /// Record an employee dismissal
    Dismiss(DismissArgs),
    /// Show the audit trail
    Events {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Debug, Subcommand)]
enum PositionCommand {
    Add(PositionArgs),
    Edit {
        id: i64,
        #[command(flatten)]
        fields: PositionArgs,
    },
    List,
}

#[derive(Debug, Args)]
struct PositionArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    salary: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    bonus: Option<String>,
    #[arg(long)]
    description: Option<String>,
}

#[derive(Debug, Subcommand)]
enum BusCommand {
    Add(BusArgs),
    Edit {
        id: i64,
        #[command(flatten)]
        fields: BusArgs,
    },
    /// Import buses from a CSV export
    Import { path: PathBuf },
    List,
}

#[derive(Debug, Args)]
struct BusArgs {
    /// Registration plate
    #[arg(long)]
    state_number: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    color: Option<String>,
    /// in_service, under_repair, reserve or decommissioned
    #[arg(long, value_parser = parse_bus_state)]
    state: Option<BusState>,
    #[arg(long, allow_hyphen_values = true)]
    mileage: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    capacity: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    year: Option<String>,
}

#[derive(Debug, Subcommand)]
enum RouteCommand {
    Add(RouteArgs),
    Edit {
        id: i64,
        #[command(flatten)]
        fields: RouteArgs,
    },
    List,
}

#[derive(Debug, Args)]
struct RouteArgs {
    #[arg(long)]
    number: Option<String>,
    #[arg(long)]
    from: Option<String>,
    #[arg(long)]
    to: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    length: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    duration: Option<String>,
}

#[derive(Debug, Subcommand)]
enum TripCommand {
    Add(TripArgs),
    List,
}

#[derive(Debug, Args)]
struct TripArgs {
    #[arg(long)]
    route: Option<i64>,
    #[arg(long)]
    bus: Option<i64>,
    #[arg(long)]
    driver: Option<String>,
    /// "YYYY-MM-DD HH:MM"
    #[arg(long, value_parser = parse_datetime)]
    departure: Option<NaiveDateTime>,
    #[arg(long, value_parser = parse_datetime)]
    arrival: Option<NaiveDateTime>,
    #[arg(long, allow_hyphen_values = true)]
    passengers: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    revenue: Option<String>,
}

#[derive(Debug, Args)]
struct DismissArgs {
    #[arg(long)]
    employee: String,
    #[arg(long, default_value = "")]
    reason: String,
    /// Effective date, defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,
}

fn parse_bus_state(value: &str) -> Result<BusState, String> {
    BusState::from_key(value).ok_or_else(|| {
        let keys: Vec<&str> = BusState::all().iter().map(|s| s.key()).collect();
        format!("expected one of: {}", keys.join(", "))
    })
}

fn parse_datetime(value: &str) -> Result<NaiveDateTime, String> {
    ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value.trim(), format).ok())
        .ok_or_else(|| format!("expected YYYY-MM-DD HH:MM, got {:?}", value))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logger first, so locale warnings from the environment are not lost
    let log_filter = config::log_filter_from_lookup(|key| std::env::var(key).ok());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter))
        .init();
    let config = Config::from_env().with_overrides(cli.db, cli.locale.as_deref());

    let depot = Depot::open(&config)?;

    match cli.command {
        Command::Init => {
            println!("✓ Database ready at {}", config.database_path.display());
        }
        Command::Position(command) => run_position(&depot, command)?,
        Command::Bus(command) => run_bus(&depot, command)?,
        Command::Route(command) => run_route(&depot, command)?,
        Command::Trip(command) => run_trip(&depot, command)?,
        Command::Dismiss(args) => {
            let mut dialog = depot.new_dialog::<Dismissal>();
            dialog.edit(|d| {
                d.employee_name = args.employee;
                d.reason = args.reason;
                d.dismissed_on = args.date;
            })?;
            finish(&depot, dialog)?;
        }
        Command::Events { limit } => {
            for event in depot.repository().recent_events(limit)? {
                println!(
                    "{}  {:<8} {:<9} #{:<5} by {}",
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    event.event_type,
                    event.entity_type,
                    event.entity_id,
                    event.actor
                );
            }
        }
    }

    Ok(())
}

// ============================================================================
// DIALOG HELPERS
// ============================================================================

/// Bind a numeric flag the way a text box is bound: the converter decides.
fn set_number_flag<R, C, F>(
    dialog: &mut EditDialog<R>,
    converter: &C,
    flag: &str,
    text: Option<&str>,
    apply: F,
) -> Result<()>
where
    R: Persist,
    C: NumericConverter,
    F: FnOnce(&mut R, C::Value),
{
    if let Some(text) = text {
        let conversion = dialog.set_number(converter, text, apply)?;
        if conversion.failed {
            warn!("--{} {:?} is not a number, using 0", flag, text);
        }
    }
    Ok(())
}

/// Accept the dialog and persist, or report the first broken rule.
fn finish<R: Persist + Serialize>(depot: &Depot, mut dialog: EditDialog<R>) -> Result<()> {
    if !dialog.record().is_new() && !dialog.has_changes() {
        dialog.cancel()?;
        depot.close(dialog)?;
        println!("Nothing to change");
        return Ok(());
    }

    match dialog.accept() {
        Ok(_) => {}
        Err(SessionError::Validation(err)) => {
            let title = dialog.title().to_string();
            dialog.cancel()?;
            return Err(anyhow!("{}: {}", title, err.message));
        }
        Err(err) => return Err(err.into()),
    }

    let saved = depot
        .close(dialog)?
        .ok_or_else(|| anyhow!("{} was not saved", R::KIND))?;
    println!("✓ {} saved (id {})", R::KIND, saved.id().unwrap_or_default());
    Ok(())
}

fn open_dialog<R: Persist>(depot: &Depot, id: Option<i64>) -> Result<EditDialog<R>> {
    match id {
        Some(id) => depot.edit_dialog(id),
        None => Ok(depot.new_dialog()),
    }
}

// ============================================================================
// COMMANDS
// ============================================================================

fn run_position(depot: &Depot, command: PositionCommand) -> Result<()> {
    let (id, fields) = match command {
        PositionCommand::Add(fields) => (None, fields),
        PositionCommand::Edit { id, fields } => (Some(id), fields),
        PositionCommand::List => {
            let decimals = depot.converters().decimals;
            for p in depot.repository().list::<Position>()? {
                println!(
                    "{:>4}  {:<24} salary {:>10}  bonus {:>5}%",
                    p.id.unwrap_or_default(),
                    p.position_name,
                    decimals.to_display(p.base_salary),
                    decimals.to_display(p.bonus_percent),
                );
            }
            return Ok(());
        }
    };

    let decimals = depot.converters().decimals;
    let mut dialog = open_dialog::<Position>(depot, id)?;
    dialog.edit(|p| {
        if let Some(name) = fields.name {
            p.position_name = name;
        }
        if let Some(description) = fields.description {
            p.description = description;
        }
    })?;
    set_number_flag(&mut dialog, &decimals, "salary", fields.salary.as_deref(), |p, v| {
        p.base_salary = Some(v)
    })?;
    set_number_flag(&mut dialog, &decimals, "bonus", fields.bonus.as_deref(), |p, v| {
        p.bonus_percent = Some(v)
    })?;
    finish(depot, dialog)
}

fn run_bus(depot: &Depot, command: BusCommand) -> Result<()> {
    let (id, fields) = match command {
        BusCommand::Add(fields) => (None, fields),
        BusCommand::Edit { id, fields } => (Some(id), fields),
        BusCommand::Import { path } => {
            println!("📂 Importing {}...", path.display());
            let summary = depot.import_buses(&path)?;
            for row in &summary.rejected {
                println!("  ✗ line {} {}: {}", row.line, row.state_number, row.message);
            }
            println!(
                "✓ {} imported, {} already in fleet, {} rejected",
                summary.inserted,
                summary.duplicates,
                summary.rejected.len()
            );
            return Ok(());
        }
        BusCommand::List => {
            let ints = depot.converters().ints;
            for b in depot.repository().list::<Bus>()? {
                println!(
                    "{:>4}  {:<10} {:<14} {:<8} {:<14} {:>8} km  {:>4} places",
                    b.id.unwrap_or_default(),
                    b.state_number,
                    b.model,
                    b.color,
                    b.state.as_str(),
                    ints.to_display(b.mileage_km),
                    ints.to_display(b.capacity),
                );
            }
            return Ok(());
        }
    };

    let ints = depot.converters().ints;
    let mut dialog = open_dialog::<Bus>(depot, id)?;
    dialog.edit(|b| {
        if let Some(state_number) = fields.state_number {
            b.state_number = state_number;
        }
        if let Some(model) = fields.model {
            b.model = model;
        }
        if let Some(color) = fields.color {
            b.color = color;
        }
        if let Some(state) = fields.state {
            b.state = state;
        }
    })?;
    set_number_flag(&mut dialog, &ints, "mileage", fields.mileage.as_deref(), |b, v| {
        b.mileage_km = Some(v)
    })?;
    set_number_flag(&mut dialog, &ints, "capacity", fields.capacity.as_deref(), |b, v| {
        b.capacity = Some(v)
    })?;
    set_number_flag(&mut dialog, &ints, "year", fields.year.as_deref(), |b, v| {
        b.manufacture_year = Some(v)
    })?;
    finish(depot, dialog)
}

fn run_route(depot: &Depot, command: RouteCommand) -> Result<()> {
    let (id, fields) = match command {
        RouteCommand::Add(fields) => (None, fields),
        RouteCommand::Edit { id, fields } => (Some(id), fields),
        RouteCommand::List => {
            let decimals = depot.converters().decimals;
            for r in depot.repository().list::<Route>()? {
                println!(
                    "{:>4}  {:<40} {:>7} km",
                    r.id.unwrap_or_default(),
                    r.title(),
                    decimals.to_display(r.length_km),
                );
            }
            return Ok(());
        }
    };

    let converters = depot.converters();
    let mut dialog = open_dialog::<Route>(depot, id)?;
    dialog.edit(|r| {
        if let Some(number) = fields.number {
            r.route_number = number;
        }
        if let Some(from) = fields.from {
            r.start_point = from;
        }
        if let Some(to) = fields.to {
            r.end_point = to;
        }
    })?;
    set_number_flag(&mut dialog, &converters.decimals, "length", fields.length.as_deref(), |r, v| {
        r.length_km = Some(v)
    })?;
    set_number_flag(&mut dialog, &converters.ints, "duration", fields.duration.as_deref(), |r, v| {
        r.duration_minutes = Some(v)
    })?;
    finish(depot, dialog)
}

fn run_trip(depot: &Depot, command: TripCommand) -> Result<()> {
    let fields = match command {
        TripCommand::Add(fields) => fields,
        TripCommand::List => {
            let decimals = depot.converters().decimals;
            for t in depot.repository().list::<Trip>()? {
                let departure = t
                    .departure
                    .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{:>4}  route {:<4} bus {:<4} {:<20} {:<16} revenue {}",
                    t.id.unwrap_or_default(),
                    t.route_id.unwrap_or_default(),
                    t.bus_id.unwrap_or_default(),
                    t.driver_name,
                    departure,
                    decimals.to_display(t.revenue),
                );
            }
            return Ok(());
        }
    };

    if let Some(bus_id) = fields.bus {
        if let Some(bus) = depot.repository().get::<Bus>(bus_id)? {
            if !bus.state.can_run_trips() {
                warn!("bus {} is {}", bus.state_number, bus.state.as_str());
            }
        }
    }

    let converters = depot.converters();
    let mut dialog = depot.new_dialog::<Trip>();
    dialog.edit(|t| {
        t.route_id = fields.route;
        t.bus_id = fields.bus;
        t.driver_name = fields.driver.unwrap_or_default();
        t.departure = fields.departure;
        t.arrival = fields.arrival;
    })?;
    set_number_flag(&mut dialog, &converters.ints, "passengers", fields.passengers.as_deref(), |t, v| {
        t.passengers = Some(v)
    })?;
    set_number_flag(&mut dialog, &converters.decimals, "revenue", fields.revenue.as_deref(), |t, v| {
        t.revenue = Some(v)
    })?;
    finish(depot, dialog)
}
