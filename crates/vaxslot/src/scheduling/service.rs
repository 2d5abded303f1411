use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use super::domain::{
    Appointment, AvailabilityWindow, Facility, FacilityId, Registrant, RegistrantId,
    VaccinationRecord, WaitlistEntry,
};
use super::priority::compute_priority;
use super::queries::{matching_any, AppointmentFilter, ValidTimeFilter, VaccinationFilter};
use super::reconciliation::{
    CapacityDelta, ReconciliationEngine, ReconciliationError, ReconciliationReport,
};
use super::repository::{NotificationSink, RepositoryError, SchedulingRepository};
use super::requests::{
    FacilityChange, FacilityDraft, FacilitySelection, RegistrantDraft, WindowChange, WindowSpec,
};
use super::statistics::Statistics;
use crate::config::SchedulingConfig;

/// Waitlist row joined with the registrant it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredView {
    pub entry: WaitlistEntry,
    pub registrant: Registrant,
}

/// Service composing the store, the notification sink and the reconciliation engine.
///
/// Each method either applies its whole change or rejects the request without touching
/// the store.
pub struct SchedulingService<R, N> {
    repository: Arc<R>,
    engine: ReconciliationEngine<R, N>,
    config: SchedulingConfig,
}

impl<R, N> SchedulingService<R, N>
where
    R: SchedulingRepository,
    N: NotificationSink,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, config: SchedulingConfig) -> Self {
        let engine = ReconciliationEngine::new(repository.clone(), notifier, config);
        Self {
            repository,
            engine,
            config,
        }
    }

    pub fn config(&self) -> &SchedulingConfig {
        &self.config
    }

    pub fn create_facility(&self, draft: FacilityDraft) -> Result<Facility, ServiceError> {
        if draft.opens_at >= draft.closes_at {
            return Err(ServiceError::InvalidHours(draft.id));
        }
        if self.repository.facility(draft.id)?.is_some() {
            return Err(ServiceError::DuplicateFacility(draft.id));
        }

        let facility = Facility {
            id: draft.id,
            district: draft.district,
            opens_at: draft.opens_at,
            closes_at: draft.closes_at,
            remaining_capacity: draft.capacity,
        };
        self.repository.insert_facility(facility.clone())?;
        debug!(facility = %facility.id, district = facility.district, "facility created");
        Ok(facility)
    }

    /// Stores a registrant with the priority derived from its age on `today`.
    pub fn create_registrant(
        &self,
        draft: RegistrantDraft,
        today: NaiveDate,
    ) -> Result<Registrant, ServiceError> {
        if draft.birth_date > today {
            return Err(ServiceError::BornInFuture(draft.id));
        }
        if draft.dose_count > self.config.dose_limit {
            return Err(ServiceError::DoseCountAboveLimit {
                registrant: draft.id,
                doses: draft.dose_count,
                limit: self.config.dose_limit,
            });
        }
        if self.repository.registrant(draft.id)?.is_some() {
            return Err(ServiceError::DuplicateRegistrant(draft.id));
        }

        let age_days = (today - draft.birth_date).num_days();
        let priority = compute_priority(
            age_days,
            self.config.old_age_years,
            self.config.dose_limit,
            draft.dose_count,
            draft.special_eligible,
        );
        let registrant = Registrant {
            id: draft.id,
            first_name: draft.first_name,
            last_name: draft.last_name,
            birth_date: draft.birth_date,
            district: draft.district,
            dose_count: draft.dose_count,
            priority,
        };
        self.repository.insert_registrant(registrant.clone())?;
        debug!(registrant = %registrant.id, priority, "registrant created");
        Ok(registrant)
    }

    /// Puts a registrant on the waitlist with its accepted facilities and availability.
    pub fn register(
        &self,
        id: RegistrantId,
        selection: FacilitySelection,
        windows: Vec<WindowSpec>,
    ) -> Result<WaitlistEntry, ServiceError> {
        let registrant = self.require_registrant(id)?;
        if registrant.is_fully_vaccinated(self.config.dose_limit) {
            return Err(ServiceError::FullyVaccinated(id));
        }
        let scheduled = self
            .repository
            .appointments()?
            .iter()
            .any(|appointment| appointment.registrant == id);
        if scheduled || self.repository.waitlist_entry_for(id)?.is_some() {
            return Err(ServiceError::AlreadyRegistered(id));
        }
        if windows.is_empty() {
            return Err(ServiceError::NoAvailability(id));
        }

        let facilities = self.resolve_selection(&registrant, &selection)?;
        if facilities.is_empty() {
            return Err(ServiceError::NoEligibleFacility(id));
        }

        let entry = WaitlistEntry {
            registration_id: self.repository.next_registration_id()?,
            registrant: id,
        };
        self.repository.insert_waitlist_entry(entry)?;
        self.repository.clear_eligible_facilities(id)?;
        self.repository.clear_availability_windows(id)?;
        for facility in facilities {
            self.repository.add_eligible_facility(id, facility)?;
        }
        for declared in windows {
            self.apply_window(id, declared)?;
        }

        info!(registrant = %id, registration = %entry.registration_id, "registrant waitlisted");
        Ok(entry)
    }

    /// Adds or removes accepted facilities. A removal that would leave the set empty is
    /// skipped.
    pub fn change_facilities(
        &self,
        id: RegistrantId,
        changes: Vec<FacilityChange>,
    ) -> Result<BTreeSet<FacilityId>, ServiceError> {
        let registrant = self.require_registrant(id)?;
        if registrant.is_fully_vaccinated(self.config.dose_limit) {
            return Err(ServiceError::FullyVaccinated(id));
        }
        for change in &changes {
            if let FacilityChange::Add(facility) = change {
                self.require_facility(*facility)?;
            }
        }

        for change in changes {
            match change {
                FacilityChange::Add(facility) => {
                    self.repository.add_eligible_facility(id, facility)?;
                }
                FacilityChange::Remove(facility) => {
                    let current = self.repository.eligible_facilities(id)?;
                    if current.contains(&facility) && current.len() > 1 {
                        self.repository.remove_eligible_facility(id, facility)?;
                    } else {
                        debug!(registrant = %id, facility = %facility, "facility removal skipped");
                    }
                }
            }
        }
        Ok(self.repository.eligible_facilities(id)?)
    }

    pub fn change_windows(
        &self,
        id: RegistrantId,
        changes: Vec<WindowChange>,
    ) -> Result<Vec<AvailabilityWindow>, ServiceError> {
        let registrant = self.require_registrant(id)?;
        if registrant.is_fully_vaccinated(self.config.dose_limit) {
            return Err(ServiceError::FullyVaccinated(id));
        }

        for change in changes {
            match change {
                WindowChange::Set(declared) => self.apply_window(id, declared)?,
                WindowChange::Clear(day) => self.repository.remove_availability_window(id, day)?,
            }
        }
        Ok(self.repository.availability_windows(id)?)
    }

    pub fn end_day(
        &self,
        today: NaiveDate,
        deltas: &[CapacityDelta],
    ) -> Result<ReconciliationReport, ServiceError> {
        Ok(self.engine.reconcile(today, deltas)?)
    }

    /// First `limit` waitlist rows in registration order.
    pub fn registered(&self, limit: usize) -> Result<Vec<RegisteredView>, ServiceError> {
        let mut rows = Vec::new();
        for entry in self.repository.waitlist()?.into_iter().take(limit) {
            let registrant = self.require_registrant(entry.registrant)?;
            rows.push(RegisteredView { entry, registrant });
        }
        Ok(rows)
    }

    /// Facilities in `district` with capacity left, by id.
    pub fn free_facilities(&self, district: u32) -> Result<Vec<Facility>, ServiceError> {
        Ok(self
            .repository
            .facilities()?
            .into_iter()
            .filter(|facility| facility.district == district && facility.remaining_capacity > 0)
            .collect())
    }

    /// Windows matching any filter, ordered by registrant then weekday.
    pub fn valid_times(
        &self,
        filters: &[ValidTimeFilter],
    ) -> Result<Vec<AvailabilityWindow>, ServiceError> {
        Ok(matching_any(
            self.repository.all_availability_windows()?,
            filters,
            ValidTimeFilter::matches,
        ))
    }

    /// Appointments matching any filter, ordered by start then registration id.
    pub fn find_appointments(
        &self,
        filters: &[AppointmentFilter],
    ) -> Result<Vec<Appointment>, ServiceError> {
        Ok(matching_any(
            self.repository.appointments()?,
            filters,
            AppointmentFilter::matches,
        ))
    }

    /// History rows matching any filter, ordered by registrant then registration id.
    pub fn logged_vaccinations(
        &self,
        filters: &[VaccinationFilter],
    ) -> Result<Vec<VaccinationRecord>, ServiceError> {
        let mut records = matching_any(
            self.repository.vaccination_records()?,
            filters,
            VaccinationFilter::matches,
        );
        records.sort_by_key(|record| (record.registrant, record.registration_id));
        Ok(records)
    }

    pub fn statistics(&self) -> Result<Statistics, ServiceError> {
        Ok(Statistics::compute(
            &self.repository.registrants()?,
            &self.repository.facilities()?,
            &self.repository.vaccination_records()?,
            &self.repository.appointments()?,
            self.config.dose_limit,
        ))
    }

    fn resolve_selection(
        &self,
        registrant: &Registrant,
        selection: &FacilitySelection,
    ) -> Result<BTreeSet<FacilityId>, ServiceError> {
        let district: BTreeSet<FacilityId> = self
            .repository
            .facilities()?
            .into_iter()
            .filter(|facility| facility.district == registrant.district)
            .map(|facility| facility.id)
            .collect();

        let mut chosen = if selection.whole_district {
            district.clone()
        } else {
            BTreeSet::new()
        };

        let mut explicit_found = false;
        for id in &selection.explicit {
            if self.repository.facility(*id)?.is_some() {
                explicit_found = true;
                chosen.insert(*id);
            } else {
                debug!(registrant = %registrant.id, facility = %id, "unknown facility ignored");
            }
        }
        if !selection.explicit.is_empty() && !explicit_found {
            chosen.extend(district);
        }
        Ok(chosen)
    }

    fn apply_window(
        &self,
        id: RegistrantId,
        declared: WindowSpec,
    ) -> Result<(), RepositoryError> {
        if declared == WindowSpec::Always {
            self.repository.clear_availability_windows(id)?;
        }
        for (day, window) in declared.expand() {
            self.repository.upsert_availability_window(AvailabilityWindow {
                registrant: id,
                day,
                window,
            })?;
        }
        Ok(())
    }

    fn require_registrant(&self, id: RegistrantId) -> Result<Registrant, ServiceError> {
        self.repository
            .registrant(id)?
            .ok_or(ServiceError::UnknownRegistrant(id))
    }

    fn require_facility(&self, id: FacilityId) -> Result<Facility, ServiceError> {
        self.repository
            .facility(id)?
            .ok_or(ServiceError::UnknownFacility(id))
    }
}

/// Error raised by the scheduling service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("facility {0} already exists")]
    DuplicateFacility(FacilityId),
    #[error("facility {0} must open before it closes")]
    InvalidHours(FacilityId),
    #[error("facility {0} does not exist")]
    UnknownFacility(FacilityId),
    #[error("registrant {0} already exists")]
    DuplicateRegistrant(RegistrantId),
    #[error("registrant {0} does not exist")]
    UnknownRegistrant(RegistrantId),
    #[error("registrant {0} has a birth date in the future")]
    BornInFuture(RegistrantId),
    #[error("registrant {registrant} has {doses} doses, above the limit of {limit}")]
    DoseCountAboveLimit {
        registrant: RegistrantId,
        doses: u32,
        limit: u32,
    },
    #[error("registrant {0} is already fully vaccinated")]
    FullyVaccinated(RegistrantId),
    #[error("registrant {0} is already on the waitlist or scheduled")]
    AlreadyRegistered(RegistrantId),
    #[error("registrant {0} declared no availability")]
    NoAvailability(RegistrantId),
    #[error("registrant {0} has no eligible facility")]
    NoEligibleFacility(RegistrantId),
    #[error(transparent)]
    Reconciliation(#[from] ReconciliationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
