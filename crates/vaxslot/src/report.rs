//! Pipe-delimited row output for command results.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::scheduling::{
    Appointment, AvailabilityWindow, Facility, FullyVaccinated, RegisteredView, Statistics,
    VaccinationRecord,
};

/// One output line, one field per column.
pub type Row = Vec<String>;

const TIME_FORMAT: &str = "%H:%M:%S";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Writes rows to stdout or to a file, `|` between fields.
pub struct RowWriter {
    writer: csv::Writer<Box<dyn Write>>,
}

impl RowWriter {
    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    /// Truncates `path` if it exists.
    pub fn create(path: &Path) -> Result<Self, ReportError> {
        let file = File::create(path).map_err(|source| ReportError::open(path, source))?;
        Ok(Self::from_writer(file))
    }

    /// Keeps whatever `path` already holds and writes after it.
    pub fn append(path: &Path) -> Result<Self, ReportError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| ReportError::open(path, source))?;
        Ok(Self::from_writer(file))
    }

    pub fn from_writer(writer: impl Write + 'static) -> Self {
        let boxed: Box<dyn Write> = Box::new(writer);
        let writer = csv::WriterBuilder::new()
            .delimiter(b'|')
            .has_headers(false)
            .flexible(true)
            .from_writer(boxed);
        Self { writer }
    }

    pub fn write_rows(&mut self, rows: &[Row]) -> Result<(), ReportError> {
        for row in rows {
            self.writer.write_record(row)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ReportError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("could not open output '{path}': {source}")]
    Open { path: String, source: io::Error },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl ReportError {
    fn open(path: &Path, source: io::Error) -> Self {
        Self::Open {
            path: path.display().to_string(),
            source,
        }
    }
}

pub fn registered_row(view: &RegisteredView) -> Row {
    vec![
        view.entry.registration_id.to_string(),
        view.registrant.id.to_string(),
        view.registrant.first_name.clone(),
        view.registrant.last_name.clone(),
        view.registrant.priority.to_string(),
    ]
}

pub fn facility_row(facility: &Facility) -> Row {
    vec![facility.id.to_string()]
}

pub fn window_row(window: &AvailabilityWindow) -> Row {
    vec![
        window.registrant.to_string(),
        window.day.to_string(),
        window.window.from.format(TIME_FORMAT).to_string(),
        window.window.to.format(TIME_FORMAT).to_string(),
    ]
}

pub fn notification_row(event: &FullyVaccinated) -> Row {
    vec![event.message()]
}

pub fn appointment_row(appointment: &Appointment) -> Row {
    vec![
        appointment.registration_id.to_string(),
        appointment.facility.to_string(),
        appointment.starts_at.format(TIMESTAMP_FORMAT).to_string(),
    ]
}

pub fn vaccination_row(record: &VaccinationRecord) -> Row {
    vec![
        record.registrant.to_string(),
        record.registration_id.to_string(),
        record.dose_number.to_string(),
        record.facility.to_string(),
        record.administered_at.format(TIMESTAMP_FORMAT).to_string(),
    ]
}

/// `label|value` lines; missing figures print as `none`.
pub fn statistics_rows(statistics: &Statistics) -> Vec<Row> {
    fn optional<T: ToString>(value: Option<T>) -> String {
        value.map_or_else(|| "none".to_string(), |value| value.to_string())
    }

    vec![
        vec![
            "vaccinated_registrants".to_string(),
            statistics.vaccinated_registrants.to_string(),
        ],
        vec![
            "best_vaccinated_district".to_string(),
            optional(statistics.best_vaccinated_district),
        ],
        vec![
            "favourite_district".to_string(),
            optional(statistics.favourite_district),
        ],
        vec![
            "favourite_facility".to_string(),
            optional(statistics.favourite_facility),
        ],
        vec![
            "first_fully_vaccinated".to_string(),
            optional(statistics.first_fully_vaccinated),
        ],
        vec![
            "favourite_date".to_string(),
            optional(statistics.favourite_date),
        ],
        vec![
            "favourite_weekday".to_string(),
            optional(statistics.favourite_weekday),
        ],
    ]
}
