use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{
    Appointment, AvailabilityWindow, DayOfWeek, FacilityId, RegistrantId, TimeWindow,
    VaccinationRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValidTimeFilter {
    Registrant(RegistrantId),
    RegistrantOnDay(RegistrantId, DayOfWeek),
    Day(DayOfWeek),
    /// Windows on the day that fit entirely inside the range.
    DayWithin(DayOfWeek, TimeWindow),
}

impl ValidTimeFilter {
    pub fn matches(&self, window: &AvailabilityWindow) -> bool {
        match *self {
            ValidTimeFilter::Registrant(id) => window.registrant == id,
            ValidTimeFilter::RegistrantOnDay(id, day) => {
                window.registrant == id && window.day == day
            }
            ValidTimeFilter::Day(day) => window.day == day,
            ValidTimeFilter::DayWithin(day, range) => {
                window.day == day && range.contains_window(&window.window)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AppointmentFilter {
    Registrant(RegistrantId),
    Date(NaiveDate),
    Facility(FacilityId),
    FacilityOnDate(FacilityId, NaiveDate),
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        match *self {
            AppointmentFilter::Registrant(id) => appointment.registrant == id,
            AppointmentFilter::Date(date) => appointment.date() == date,
            AppointmentFilter::Facility(id) => appointment.facility == id,
            AppointmentFilter::FacilityOnDate(id, date) => {
                appointment.facility == id && appointment.date() == date
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VaccinationFilter {
    Registrant(RegistrantId),
    Date(NaiveDate),
    Facility(FacilityId),
    FacilityOnDate(FacilityId, NaiveDate),
    Dose(u32),
}

impl VaccinationFilter {
    pub fn matches(&self, record: &VaccinationRecord) -> bool {
        let date = record.administered_at.date();
        match *self {
            VaccinationFilter::Registrant(id) => record.registrant == id,
            VaccinationFilter::Date(when) => date == when,
            VaccinationFilter::Facility(id) => record.facility == id,
            VaccinationFilter::FacilityOnDate(id, when) => record.facility == id && date == when,
            VaccinationFilter::Dose(dose) => record.dose_number == dose,
        }
    }
}

/// Rows matching any filter, each row once.
pub(crate) fn matching_any<T, F>(
    rows: Vec<T>,
    filters: &[F],
    matches: impl Fn(&F, &T) -> bool,
) -> Vec<T> {
    rows.into_iter()
        .filter(|row| filters.iter().any(|filter| matches(filter, row)))
        .collect()
}
