use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::config::SchedulingConfig;
use crate::scheduling::domain::{
    AvailabilityWindow, DayOfWeek, Facility, FacilityId, FullyVaccinated, Registrant,
    RegistrantId, TimeWindow, WaitlistEntry,
};
use crate::scheduling::memory::{InMemoryNotificationSink, InMemorySchedulingRepository};
use crate::scheduling::reconciliation::ReconciliationEngine;
use crate::scheduling::repository::{NotificationError, NotificationSink, SchedulingRepository};
use crate::scheduling::service::SchedulingService;
use crate::scheduling::slots::SlotPolicy;

pub(super) const MONDAY: u8 = 0;
pub(super) const WEDNESDAY: u8 = 2;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

/// 2021-03-21, a Sunday.
pub(super) fn sunday() -> NaiveDate {
    date(2021, 3, 21)
}

/// 2021-03-22, the Monday after [`sunday`].
pub(super) fn monday() -> NaiveDate {
    date(2021, 3, 22)
}

pub(super) fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

pub(super) fn at(day: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    day.and_time(time(hour, minute))
}

pub(super) fn weekday(index: u8) -> DayOfWeek {
    DayOfWeek::new(index).expect("valid weekday")
}

pub(super) fn span(from: (u32, u32), to: (u32, u32)) -> TimeWindow {
    TimeWindow::new(time(from.0, from.1), time(to.0, to.1)).expect("valid window")
}

pub(super) fn config() -> SchedulingConfig {
    SchedulingConfig::default()
}

pub(super) fn policy() -> SlotPolicy {
    config().slot_policy()
}

pub(super) fn facility(id: u32, capacity: u32) -> Facility {
    Facility {
        id: FacilityId(id),
        district: 1,
        opens_at: time(8, 0),
        closes_at: time(12, 0),
        remaining_capacity: capacity,
    }
}

pub(super) fn registrant(id: u32, dose_count: u32, priority: i64) -> Registrant {
    Registrant {
        id: RegistrantId(id),
        first_name: format!("First{id}"),
        last_name: format!("Last{id}"),
        birth_date: date(1960, 5, 17),
        district: 1,
        dose_count,
        priority,
    }
}

pub(super) fn window(registrant: u32, day: u8, from: (u32, u32), to: (u32, u32)) -> AvailabilityWindow {
    AvailabilityWindow {
        registrant: RegistrantId(registrant),
        day: weekday(day),
        window: span(from, to),
    }
}

pub(super) fn store() -> Arc<InMemorySchedulingRepository> {
    Arc::new(InMemorySchedulingRepository::default())
}

pub(super) fn engine(
    repository: &Arc<InMemorySchedulingRepository>,
) -> (
    ReconciliationEngine<InMemorySchedulingRepository, InMemoryNotificationSink>,
    Arc<InMemoryNotificationSink>,
) {
    let notifier = Arc::new(InMemoryNotificationSink::default());
    let engine = ReconciliationEngine::new(repository.clone(), notifier.clone(), config());
    (engine, notifier)
}

pub(super) fn service() -> (
    SchedulingService<InMemorySchedulingRepository, InMemoryNotificationSink>,
    Arc<InMemorySchedulingRepository>,
    Arc<InMemoryNotificationSink>,
) {
    let repository = store();
    let notifier = Arc::new(InMemoryNotificationSink::default());
    let service = SchedulingService::new(repository.clone(), notifier.clone(), config());
    (service, repository, notifier)
}

/// Stores the registrant, waitlists it for `facilities` and declares `windows`.
pub(super) fn enqueue(
    repository: &InMemorySchedulingRepository,
    registrant: Registrant,
    facilities: &[u32],
    windows: &[AvailabilityWindow],
) -> WaitlistEntry {
    let id = registrant.id;
    repository
        .insert_registrant(registrant)
        .expect("registrant stored");
    for facility in facilities {
        repository
            .add_eligible_facility(id, FacilityId(*facility))
            .expect("eligibility stored");
    }
    for window in windows {
        repository
            .upsert_availability_window(*window)
            .expect("window stored");
    }
    let entry = WaitlistEntry {
        registration_id: repository.next_registration_id().expect("next id"),
        registrant: id,
    };
    repository
        .insert_waitlist_entry(entry)
        .expect("waitlist stored");
    entry
}

/// Sink whose transport is always down.
#[derive(Debug, Default)]
pub(super) struct FailingSink;

impl NotificationSink for FailingSink {
    fn publish(&self, _notice: FullyVaccinated) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("reporting endpoint offline".to_string()))
    }
}
