use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::allocator::{AllocationOutcome, AppointmentAllocator, DeferReason};
use super::availability::resolve_availability;
use super::domain::{
    Appointment, FacilityId, FullyVaccinated, Registrant, RegistrantId, VaccinationRecord,
    WaitlistEntry,
};
use super::repository::{
    NotificationError, NotificationSink, RepositoryError, SchedulingRepository,
};
use crate::config::SchedulingConfig;

/// Capacity added to (or taken from) a facility at the start of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapacityDelta {
    pub facility: FacilityId,
    pub delta: i64,
}

/// Steps of one end-of-day transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationPhase {
    Idle,
    CapacityReplenishment,
    CompletionPass,
    AllocationPass,
}

impl fmt::Display for ReconciliationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReconciliationPhase::Idle => "idle",
            ReconciliationPhase::CapacityReplenishment => "capacity_replenishment",
            ReconciliationPhase::CompletionPass => "completion_pass",
            ReconciliationPhase::AllocationPass => "allocation_pass",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeferredAllocation {
    pub registrant: RegistrantId,
    pub facility: FacilityId,
    pub reason: DeferReason,
}

/// Everything one pass changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub today: NaiveDate,
    pub replenished: Vec<CapacityDelta>,
    pub completed: Vec<VaccinationRecord>,
    pub notifications: Vec<FullyVaccinated>,
    pub allocations: Vec<Appointment>,
    pub deferred: Vec<DeferredAllocation>,
}

impl ReconciliationReport {
    fn new(today: NaiveDate) -> Self {
        Self {
            today,
            replenished: Vec::new(),
            completed: Vec::new(),
            notifications: Vec::new(),
            allocations: Vec::new(),
            deferred: Vec::new(),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "end of {}: {} completed, {} fully vaccinated, {} scheduled, {} deferred",
            self.today,
            self.completed.len(),
            self.notifications.len(),
            self.allocations.len(),
            self.deferred.len()
        )
    }
}

/// Drives the end-of-day transition: replenish capacity, complete due appointments,
/// then allocate slots to the waitlist facility by facility.
pub struct ReconciliationEngine<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    allocator: AppointmentAllocator<R>,
    config: SchedulingConfig,
}

impl<R, N> ReconciliationEngine<R, N>
where
    R: SchedulingRepository,
    N: NotificationSink,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, config: SchedulingConfig) -> Self {
        let allocator = AppointmentAllocator::new(
            repository.clone(),
            config.slot_policy(),
            config.max_week_horizon,
        );
        Self {
            repository,
            notifier,
            allocator,
            config,
        }
    }

    /// Runs one full pass for `today`. Malformed capacity deltas reject the whole pass
    /// before anything is written.
    pub fn reconcile(
        &self,
        today: NaiveDate,
        deltas: &[CapacityDelta],
    ) -> Result<ReconciliationReport, ReconciliationError> {
        let mut report = ReconciliationReport::new(today);
        let planned = self.plan_replenishment(deltas)?;

        enter(ReconciliationPhase::CapacityReplenishment, today);
        for (facility, capacity) in planned {
            let mut current = self
                .repository
                .facility(facility)?
                .ok_or(ReconciliationError::UnknownFacility(facility))?;
            current.remaining_capacity = capacity;
            self.repository.update_facility(current)?;
        }
        report.replenished = deltas.to_vec();

        enter(ReconciliationPhase::CompletionPass, today);
        self.complete_due_appointments(today, &mut report)?;

        enter(ReconciliationPhase::AllocationPass, today);
        let reference = today.checked_add_days(Days::new(1)).unwrap_or(today);
        self.allocate_waitlist(reference, &mut report)?;

        enter(ReconciliationPhase::Idle, today);
        info!(%today, summary = %report.summary(), "reconciliation finished");
        Ok(report)
    }

    /// Deletes every eligible facility, availability window and waitlist entry of a
    /// registrant. Safe to call repeatedly.
    pub fn revoke(&self, registrant: RegistrantId) -> Result<(), RepositoryError> {
        self.repository.clear_eligible_facilities(registrant)?;
        self.repository.clear_availability_windows(registrant)?;
        if let Some(entry) = self.repository.waitlist_entry_for(registrant)? {
            self.repository.remove_waitlist_entry(entry.registration_id)?;
        }
        Ok(())
    }

    fn plan_replenishment(
        &self,
        deltas: &[CapacityDelta],
    ) -> Result<BTreeMap<FacilityId, u32>, ReconciliationError> {
        let mut totals: BTreeMap<FacilityId, i64> = BTreeMap::new();
        for delta in deltas {
            *totals.entry(delta.facility).or_default() += delta.delta;
        }

        let mut planned = BTreeMap::new();
        for (facility, delta) in totals {
            let current = self
                .repository
                .facility(facility)?
                .ok_or(ReconciliationError::UnknownFacility(facility))?;
            let resulting = i64::from(current.remaining_capacity) + delta;
            let capacity = u32::try_from(resulting)
                .map_err(|_| ReconciliationError::InvalidCapacity { facility, resulting })?;
            planned.insert(facility, capacity);
        }
        Ok(planned)
    }

    fn complete_due_appointments(
        &self,
        today: NaiveDate,
        report: &mut ReconciliationReport,
    ) -> Result<(), ReconciliationError> {
        let due: Vec<Appointment> = self
            .repository
            .appointments()?
            .into_iter()
            .filter(|appointment| appointment.date() <= today)
            .collect();

        for appointment in due {
            let mut registrant = self
                .repository
                .registrant(appointment.registrant)?
                .ok_or(RepositoryError::NotFound)?;
            self.repository.remove_appointment(appointment.registration_id)?;

            if registrant.is_fully_vaccinated(self.config.dose_limit) {
                warn!(
                    registrant = %registrant.id,
                    "dropping appointment for registrant already at the dose limit"
                );
                continue;
            }

            registrant.dose_count += 1;
            let record = VaccinationRecord {
                registration_id: appointment.registration_id,
                registrant: registrant.id,
                dose_number: registrant.dose_count,
                facility: appointment.facility,
                administered_at: appointment.starts_at,
            };
            self.repository.insert_vaccination_record(record)?;
            self.repository.update_registrant(registrant.clone())?;
            report.completed.push(record);
            debug!(
                registrant = %registrant.id,
                dose = registrant.dose_count,
                "vaccination recorded"
            );

            if registrant.dose_count == self.config.dose_limit {
                let notice = FullyVaccinated::new(&registrant, appointment.starts_at);
                self.notifier.publish(notice.clone())?;
                self.revoke(registrant.id)?;
                info!(registrant = %registrant.id, "registrant fully vaccinated");
                report.notifications.push(notice);
            }
        }
        Ok(())
    }

    fn allocate_waitlist(
        &self,
        reference: NaiveDate,
        report: &mut ReconciliationReport,
    ) -> Result<(), ReconciliationError> {
        let slot = self.config.slot_policy().duration;

        for facility in self.repository.facilities()? {
            let queue = self.waiting_for(facility.id)?;
            debug!(facility = %facility.id, waiting = queue.len(), "allocating facility");

            for (entry, _) in queue {
                let current = self
                    .repository
                    .facility(facility.id)?
                    .ok_or(ReconciliationError::UnknownFacility(facility.id))?;
                let windows = self.repository.availability_windows(entry.registrant)?;
                let intervals = resolve_availability(&windows, current.hours(), slot);

                let outcome = self
                    .allocator
                    .allocate(&entry, &current, &intervals, reference)?;
                match outcome {
                    AllocationOutcome::Scheduled(appointment) => {
                        report.allocations.push(appointment)
                    }
                    other => {
                        if let Some(reason) = other.defer_reason() {
                            report.deferred.push(DeferredAllocation {
                                registrant: entry.registrant,
                                facility: facility.id,
                                reason,
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Waiting registrants eligible for `facility`, most urgent first, FIFO on ties.
    fn waiting_for(
        &self,
        facility: FacilityId,
    ) -> Result<Vec<(WaitlistEntry, Registrant)>, RepositoryError> {
        let mut queue = Vec::new();
        for entry in self.repository.waitlist()? {
            if !self
                .repository
                .eligible_facilities(entry.registrant)?
                .contains(&facility)
            {
                continue;
            }
            let registrant = self
                .repository
                .registrant(entry.registrant)?
                .ok_or(RepositoryError::NotFound)?;
            queue.push((entry, registrant));
        }
        queue.sort_by_key(|(entry, registrant)| (registrant.priority, entry.registration_id));
        Ok(queue)
    }
}

fn enter(phase: ReconciliationPhase, today: NaiveDate) {
    debug!(%today, %phase, "reconciliation phase");
}

/// Error raised by a reconciliation pass.
#[derive(Debug, thiserror::Error)]
pub enum ReconciliationError {
    #[error("facility {0} does not exist")]
    UnknownFacility(FacilityId),
    #[error("capacity of facility {facility} would become {resulting}")]
    InvalidCapacity { facility: FacilityId, resulting: i64 },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
}
