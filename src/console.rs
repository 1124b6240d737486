//! Operator console: line commands read from stdin.

use std::io::Write;

use anyhow::{bail, Result};
use carewatch_engine::{selectors, Engine, SummaryState};
use carewatch_types::{ActivityLevel, Patient};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub const HELP: &str = "\
commands:
  facilities            list facilities
  select <facility-id>  switch facility
  patient <patient-id>  switch patient
  status                show the active patient
  fall [patient-id]     raise a fall (default: active patient)
  dismiss [patient-id]  dismiss a fall (default: active patient)
  help                  show this help
  quit                  stop the engine and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Facilities,
    Select(String),
    Patient(String),
    Status,
    Fall(Option<String>),
    Dismiss(Option<String>),
    Help,
    Quit,
}

/// Parse one console line. Blank lines parse to `None`.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next().map(str::to_string);
    if words.next().is_some() {
        bail!("too many arguments for '{verb}'");
    }

    let command = match (verb.to_ascii_lowercase().as_str(), arg) {
        ("facilities" | "ls", None) => Command::Facilities,
        ("select", Some(id)) => Command::Select(id),
        ("patient", Some(id)) => Command::Patient(id),
        ("status", None) => Command::Status,
        ("fall", id) => Command::Fall(id),
        ("dismiss", id) => Command::Dismiss(id),
        ("help" | "?", None) => Command::Help,
        ("quit" | "exit", None) => Command::Quit,
        ("select" | "patient", None) => bail!("'{verb}' needs an id"),
        ("facilities" | "ls" | "status" | "help" | "?" | "quit" | "exit", Some(_)) => {
            bail!("'{verb}' takes no arguments")
        }
        _ => bail!("unknown command '{verb}', try 'help'"),
    };
    Ok(Some(command))
}

fn trend(patient: &Patient) -> String {
    patient
        .movement_history
        .iter()
        .map(|level| match level {
            ActivityLevel::Normal => '#',
            ActivityLevel::Low => '+',
            ActivityLevel::None => '.',
        })
        .collect()
}

/// One-screen description of a patient.
pub fn describe(patient: &Patient) -> String {
    let mut out = format!(
        "{} ({}), {}\n  moving: {} ({})\n  steps: {}/{} ({:.0}%)\n  temperature: {:.1}°C\n  last meal: {} at {} ({:?})\n  trend: {}",
        patient.name,
        patient.age,
        patient.location,
        if patient.is_moving { "yes" } else { "no" },
        patient.activity_level,
        patient.step_count,
        patient.step_goal,
        patient.step_progress(),
        patient.room_temperature,
        patient.last_meal.meal_type.label(),
        patient.last_meal.time.format("%H:%M"),
        patient.last_meal.status,
        trend(patient),
    );
    if let Some(at) = patient.fall_timestamp {
        out.push_str(&format!("\n  FALL DETECTED at {}", at.format("%H:%M:%S")));
    }
    out
}

fn target(engine: &Engine, id: Option<&str>) -> Result<String> {
    match id {
        Some(id) => Ok(id.to_string()),
        None => match engine.active_patient() {
            Some(patient) => Ok(patient.id.clone()),
            None => bail!("no active patient"),
        },
    }
}

/// Run a command against the engine and return what to print.
pub fn execute(engine: &Engine, command: &Command) -> Result<String> {
    match command {
        Command::Facilities => {
            let snapshot = engine.snapshot();
            let active = snapshot.selection.facility_id.as_deref();
            let lines: Vec<_> = snapshot
                .facilities
                .iter()
                .map(|f| {
                    let marker = if Some(f.id.as_str()) == active { '*' } else { ' ' };
                    format!(
                        "{marker} {}  {} ({} patients, {} falls)",
                        f.id,
                        f.name,
                        f.len(),
                        f.active_falls()
                    )
                })
                .collect();
            Ok(lines.join("\n"))
        }
        Command::Select(id) => {
            engine.select_facility(id)?;
            let snapshot = engine.snapshot();
            let facility = selectors::active_facility(&snapshot)?;
            let roster: Vec<_> = facility
                .patients
                .iter()
                .map(|p| format!("  {}  {}", p.id, p.name))
                .collect();
            if roster.is_empty() {
                Ok(format!("{}: no patients", facility.name))
            } else {
                Ok(format!("{}:\n{}", facility.name, roster.join("\n")))
            }
        }
        Command::Patient(id) => {
            engine.select_patient(id)?;
            Ok(engine.active_patient().map(|p| describe(&p)).unwrap_or_default())
        }
        Command::Status => {
            let patient = engine.active_patient();
            let mut out = match &patient {
                Some(patient) => describe(patient),
                None => "no active patient".to_string(),
            };
            if let Some(summaries) = engine.summaries() {
                match &*summaries.borrow() {
                    SummaryState::Ready { patient_id, text }
                        if patient.as_ref().is_some_and(|p| &p.id == patient_id) =>
                    {
                        out.push_str(&format!("\n  summary: {text}"));
                    }
                    SummaryState::Pending { .. } => out.push_str("\n  summary: generating..."),
                    _ => {}
                }
            }
            Ok(out)
        }
        Command::Fall(id) => {
            let id = target(engine, id.as_deref())?;
            engine.raise_fall(&id)?;
            Ok(format!("fall raised for {id}"))
        }
        Command::Dismiss(id) => {
            let id = target(engine, id.as_deref())?;
            engine.dismiss_fall_alert(&id);
            Ok(format!("fall dismissed for {id}"))
        }
        Command::Help => Ok(HELP.to_string()),
        Command::Quit => Ok(String::new()),
    }
}

/// Read commands line by line until `quit` or end of input.
pub async fn run<R, W>(engine: &Engine, reader: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                writeln!(out, "error: {e}")?;
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        match execute(engine, &command) {
            Ok(text) if text.is_empty() => {}
            Ok(text) => writeln!(out, "{text}")?,
            Err(e) => writeln!(out, "error: {e}")?,
        }
        out.flush()?;
    }
    Ok(())
}
