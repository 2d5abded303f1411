//! Command replay against a [`SchedulingService`] with a simulated calendar.

use std::io::Read;

use chrono::{Days, NaiveDate};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::commands::{read_script, Command, CommandError};
use crate::report::{self, ReportError, Row, RowWriter};
use crate::scheduling::{
    NotificationSink, ReconciliationError, ReconciliationReport, SchedulingRepository,
    SchedulingService, ServiceError,
};

/// A command the session refused, with the script line it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedCommand {
    pub line: u64,
    pub message: String,
}

/// Outcome of replaying one script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScriptSummary {
    pub commands: usize,
    pub rejected: Vec<RejectedCommand>,
    pub reconciliations: Vec<ReconciliationReport>,
}

/// Owns the service, the current simulated date and the row output.
///
/// `today` starts at the configured date and moves forward one day after every
/// successful `ENDDAY`.
pub struct Session<R, N> {
    service: SchedulingService<R, N>,
    today: NaiveDate,
    output: RowWriter,
    reconciliations: Vec<ReconciliationReport>,
}

impl<R, N> Session<R, N>
where
    R: SchedulingRepository,
    N: NotificationSink,
{
    pub fn new(service: SchedulingService<R, N>, start: NaiveDate, output: RowWriter) -> Self {
        Self {
            service,
            today: start,
            output,
            reconciliations: Vec::new(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn service(&self) -> &SchedulingService<R, N> {
        &self.service
    }

    /// Runs one command and returns the rows it produced without writing them.
    pub fn execute(&mut self, command: Command) -> Result<Vec<Row>, SessionError> {
        let rows = match command {
            Command::CreateFacility(draft) => {
                self.service.create_facility(draft)?;
                Vec::new()
            }
            Command::CreateRegistrant(draft) => {
                self.service.create_registrant(draft, self.today)?;
                Vec::new()
            }
            Command::Register {
                registrant,
                facilities,
                windows,
            } => {
                self.service.register(registrant, facilities, windows)?;
                Vec::new()
            }
            Command::ChangeFacilities {
                registrant,
                changes,
            } => {
                self.service.change_facilities(registrant, changes)?;
                Vec::new()
            }
            Command::ChangeTimes {
                registrant,
                changes,
            } => {
                self.service.change_windows(registrant, changes)?;
                Vec::new()
            }
            Command::SetOutput(path) => {
                self.output.flush()?;
                self.output = RowWriter::append(&path)?;
                debug!(path = %path.display(), "output redirected");
                Vec::new()
            }
            Command::PrintRegistered { limit } => self
                .service
                .registered(limit)?
                .iter()
                .map(report::registered_row)
                .collect(),
            Command::PrintFreeFacilities { district } => self
                .service
                .free_facilities(district)?
                .iter()
                .map(report::facility_row)
                .collect(),
            Command::PrintValidTimes(filters) => self
                .service
                .valid_times(&filters)?
                .iter()
                .map(report::window_row)
                .collect(),
            Command::EndDay(deltas) => {
                let outcome = self.service.end_day(self.today, &deltas)?;
                let rows = outcome
                    .notifications
                    .iter()
                    .map(report::notification_row)
                    .collect();
                self.today = self
                    .today
                    .checked_add_days(Days::new(1))
                    .ok_or(SessionError::CalendarExhausted(self.today))?;
                self.reconciliations.push(outcome);
                rows
            }
            Command::FindAppointments(filters) => self
                .service
                .find_appointments(&filters)?
                .iter()
                .map(report::appointment_row)
                .collect(),
            Command::FindVaccinations(filters) => self
                .service
                .logged_vaccinations(&filters)?
                .iter()
                .map(report::vaccination_row)
                .collect(),
            Command::Statistics => report::statistics_rows(&self.service.statistics()?),
        };
        Ok(rows)
    }

    /// Runs one command and writes its rows to the current output.
    pub fn apply(&mut self, command: Command) -> Result<(), SessionError> {
        let rows = self.execute(command)?;
        self.output.write_rows(&rows)?;
        Ok(())
    }

    /// Replays a whole script. Malformed or refused commands are logged and skipped;
    /// output and store failures stop the replay.
    pub fn run_script<S: Read>(&mut self, script: S) -> Result<ScriptSummary, SessionError> {
        let lines = read_script(script)?;
        let mut summary = ScriptSummary::default();

        for line in lines {
            summary.commands += 1;
            let result = line
                .parse()
                .map_err(SessionError::from)
                .and_then(|command| {
                    let keyword = command.keyword();
                    debug!(line = line.line, command = keyword, "executing command");
                    self.apply(command)
                });

            match result {
                Ok(()) => {}
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(line = line.line, error = %err, "command rejected");
                    summary.rejected.push(RejectedCommand {
                        line: line.line,
                        message: err.to_string(),
                    });
                }
            }
        }

        self.output.flush()?;
        summary.reconciliations = std::mem::take(&mut self.reconciliations);
        info!(
            commands = summary.commands,
            rejected = summary.rejected.len(),
            days = summary.reconciliations.len(),
            "script finished"
        );
        Ok(summary)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Output(#[from] ReportError),
    #[error("no calendar date after {0}")]
    CalendarExhausted(NaiveDate),
}

impl SessionError {
    /// Whether the replay has to stop instead of skipping the command.
    pub fn is_fatal(&self) -> bool {
        match self {
            SessionError::Command(CommandError::Script(_)) => true,
            SessionError::Command(_) => false,
            SessionError::Service(ServiceError::Repository(_))
            | SessionError::Service(ServiceError::Reconciliation(
                ReconciliationError::Repository(_) | ReconciliationError::Notification(_),
            )) => true,
            SessionError::Service(_) => false,
            SessionError::Output(ReportError::Open { .. }) => false,
            SessionError::Output(_) | SessionError::CalendarExhausted(_) => true,
        }
    }
}
