use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Identifier of a person awaiting or receiving vaccination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegistrantId(pub u32);

/// Identifier of a vaccination facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FacilityId(pub u32);

/// Monotonic waitlist ticket, carried over to the appointment and the vaccination record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegistrationId(pub u64);

impl fmt::Display for RegistrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Day of the week, Monday = 0 through Sunday = 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DayOfWeek(u8);

impl DayOfWeek {
    pub const MIN: Self = Self(0);
    pub const MAX: Self = Self(6);

    pub fn new(index: u8) -> Option<Self> {
        (index < 7).then_some(Self(index))
    }

    pub fn of(date: NaiveDate) -> Self {
        // num_days_from_monday is always < 7
        Self(date.weekday().num_days_from_monday() as u8)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (0..7).map(Self)
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Half-open time-of-day range `[from, to)` recurring every week on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: NaiveTime,
    pub to: NaiveTime,
}

impl TimeWindow {
    pub fn new(from: NaiveTime, to: NaiveTime) -> Option<Self> {
        (from < to).then_some(Self { from, to })
    }

    /// 00:00 to 23:59, used for "any time that day" preferences.
    pub fn whole_day() -> Self {
        let midnight = NaiveTime::default();
        Self {
            from: midnight,
            to: midnight + Duration::minutes(23 * 60 + 59),
        }
    }

    pub fn length(&self) -> Duration {
        self.to - self.from
    }

    pub fn contains_window(&self, other: &TimeWindow) -> bool {
        other.from >= self.from && other.to <= self.to
    }
}

/// A registrant's declared willingness to attend on one weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AvailabilityWindow {
    pub registrant: RegistrantId,
    pub day: DayOfWeek,
    pub window: TimeWindow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registrant {
    pub id: RegistrantId,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub district: u32,
    pub dose_count: u32,
    /// Lower values are served first.
    pub priority: i64,
}

impl Registrant {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_fully_vaccinated(&self, dose_limit: u32) -> bool {
        self.dose_count >= dose_limit
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facility {
    pub id: FacilityId,
    pub district: u32,
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
    pub remaining_capacity: u32,
}

impl Facility {
    pub fn hours(&self) -> TimeWindow {
        TimeWindow {
            from: self.opens_at,
            to: self.closes_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub registration_id: RegistrationId,
    pub registrant: RegistrantId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub registration_id: RegistrationId,
    pub facility: FacilityId,
    pub starts_at: NaiveDateTime,
    pub registrant: RegistrantId,
}

impl Appointment {
    pub fn date(&self) -> NaiveDate {
        self.starts_at.date()
    }
}

/// Immutable history row written when an appointment is completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaccinationRecord {
    pub registration_id: RegistrationId,
    pub registrant: RegistrantId,
    pub dose_number: u32,
    pub facility: FacilityId,
    pub administered_at: NaiveDateTime,
}

/// Emitted once when a registrant reaches the dose limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullyVaccinated {
    pub registrant: RegistrantId,
    pub name: String,
    pub completed_at: NaiveDateTime,
}

impl FullyVaccinated {
    pub fn new(registrant: &Registrant, completed_at: NaiveDateTime) -> Self {
        Self {
            registrant: registrant.id,
            name: registrant.full_name(),
            completed_at,
        }
    }

    pub fn message(&self) -> String {
        format!("{} with ID: {} is fully vaccinated", self.name, self.registrant)
    }
}
