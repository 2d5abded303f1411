use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use super::domain::{DayOfWeek, FacilityId, RegistrantId, TimeWindow};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacilityDraft {
    pub id: FacilityId,
    pub district: u32,
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
    pub capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrantDraft {
    pub id: RegistrantId,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub district: u32,
    pub dose_count: u32,
    pub special_eligible: bool,
}

/// Which facilities a registrant accepts at registration time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FacilitySelection {
    /// Every facility in the registrant's district.
    pub whole_district: bool,
    pub explicit: Vec<FacilityId>,
}

/// One availability declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WindowSpec {
    Always,
    WholeDay(DayOfWeek),
    Range(DayOfWeek, TimeWindow),
}

impl WindowSpec {
    /// Expands into (weekday, window) pairs.
    pub fn expand(&self) -> Vec<(DayOfWeek, TimeWindow)> {
        match *self {
            WindowSpec::Always => DayOfWeek::all()
                .map(|day| (day, TimeWindow::whole_day()))
                .collect(),
            WindowSpec::WholeDay(day) => vec![(day, TimeWindow::whole_day())],
            WindowSpec::Range(day, window) => vec![(day, window)],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FacilityChange {
    Add(FacilityId),
    Remove(FacilityId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WindowChange {
    /// `Always` replaces every existing window; the other specs replace one weekday.
    Set(WindowSpec),
    Clear(DayOfWeek),
}
