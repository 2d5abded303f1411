use std::sync::Arc;

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info};

use super::availability::Interval;
use super::domain::{Appointment, DayOfWeek, Facility, WaitlistEntry};
use super::repository::{RepositoryError, SchedulingRepository};
use super::slots::{search_slot, SlotPolicy};

/// Result of walking the calendar for a free slot, before anything is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPlan {
    Found(NaiveDateTime),
    NoEligibleInterval,
    HorizonExceeded,
}

/// Result of one allocation attempt for a registrant/facility pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationOutcome {
    Scheduled(Appointment),
    NoEligibleInterval,
    CapacityExhausted,
    HorizonExceeded,
}

impl AllocationOutcome {
    pub fn appointment(&self) -> Option<&Appointment> {
        match self {
            AllocationOutcome::Scheduled(appointment) => Some(appointment),
            _ => None,
        }
    }

    pub fn defer_reason(&self) -> Option<DeferReason> {
        match self {
            AllocationOutcome::Scheduled(_) => None,
            AllocationOutcome::NoEligibleInterval => Some(DeferReason::NoEligibleInterval),
            AllocationOutcome::CapacityExhausted => Some(DeferReason::CapacityExhausted),
            AllocationOutcome::HorizonExceeded => Some(DeferReason::HorizonExceeded),
        }
    }
}

/// Why a waiting registrant stayed on the waitlist for a facility this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferReason {
    NoEligibleInterval,
    CapacityExhausted,
    HorizonExceeded,
}

/// Walks weeks starting at `reference` and tries every interval in order until a start
/// time is free, giving up after `max_weeks` calendar weeks.
///
/// `booked_on` returns the starts already booked at the facility on a date.
pub fn first_free_slot<E>(
    intervals: &[Interval],
    reference: NaiveDate,
    max_weeks: u32,
    policy: SlotPolicy,
    mut booked_on: impl FnMut(NaiveDate) -> Result<Vec<NaiveDateTime>, E>,
) -> Result<SlotPlan, E> {
    if intervals.is_empty() {
        return Ok(SlotPlan::NoEligibleInterval);
    }

    for week in 0..max_weeks {
        for interval in intervals {
            let Some(date) = date_in_week(reference, week, interval.day) else {
                continue;
            };
            let booked = booked_on(date)?;
            let mut candidate = date.and_time(interval.start);

            loop {
                let probe = search_slot(&booked, candidate, policy);
                let retry_at = match probe.retry_at {
                    None => return Ok(SlotPlan::Found(candidate)),
                    Some(retry_at) => retry_at,
                };
                if retry_at <= candidate
                    || retry_at.date() != date
                    || retry_at.time() >= interval.end
                {
                    break;
                }
                candidate = retry_at;
            }
        }
    }

    Ok(SlotPlan::HorizonExceeded)
}

/// First date in `[reference + 7 * week, reference + 7 * week + 6]` falling on `day`.
fn date_in_week(reference: NaiveDate, week: u32, day: DayOfWeek) -> Option<NaiveDate> {
    let week_start = reference.checked_add_days(Days::new(u64::from(week) * 7))?;
    (0..7)
        .filter_map(|offset| week_start.checked_add_days(Days::new(offset)))
        .find(|date| DayOfWeek::of(*date) == day)
}

/// Books the earliest free slot for a waiting registrant and commits it to the store.
pub struct AppointmentAllocator<R> {
    repository: Arc<R>,
    policy: SlotPolicy,
    max_week_horizon: u32,
}

impl<R> AppointmentAllocator<R>
where
    R: SchedulingRepository,
{
    pub fn new(repository: Arc<R>, policy: SlotPolicy, max_week_horizon: u32) -> Self {
        Self {
            repository,
            policy,
            max_week_horizon,
        }
    }

    /// On success the appointment is stored, the facility loses one unit of capacity and
    /// the waitlist entry is removed. Every other outcome leaves the store untouched.
    pub fn allocate(
        &self,
        entry: &WaitlistEntry,
        facility: &Facility,
        intervals: &[Interval],
        reference: NaiveDate,
    ) -> Result<AllocationOutcome, RepositoryError> {
        let Some(remaining_capacity) = facility.remaining_capacity.checked_sub(1) else {
            return Ok(AllocationOutcome::CapacityExhausted);
        };

        let plan = first_free_slot(
            intervals,
            reference,
            self.max_week_horizon,
            self.policy,
            |date| self.repository.booked_starts(facility.id, date),
        )?;

        let starts_at = match plan {
            SlotPlan::Found(starts_at) => starts_at,
            SlotPlan::NoEligibleInterval => {
                debug!(
                    registrant = %entry.registrant,
                    facility = %facility.id,
                    "no interval overlaps facility hours"
                );
                return Ok(AllocationOutcome::NoEligibleInterval);
            }
            SlotPlan::HorizonExceeded => {
                debug!(
                    registrant = %entry.registrant,
                    facility = %facility.id,
                    weeks = self.max_week_horizon,
                    "no free slot within horizon"
                );
                return Ok(AllocationOutcome::HorizonExceeded);
            }
        };

        let appointment = Appointment {
            registration_id: entry.registration_id,
            facility: facility.id,
            starts_at,
            registrant: entry.registrant,
        };
        self.repository.insert_appointment(appointment)?;
        self.repository.update_facility(Facility {
            remaining_capacity,
            ..facility.clone()
        })?;
        self.repository.remove_waitlist_entry(entry.registration_id)?;

        info!(
            registrant = %entry.registrant,
            facility = %facility.id,
            %starts_at,
            "appointment scheduled"
        );
        Ok(AllocationOutcome::Scheduled(appointment))
    }
}
