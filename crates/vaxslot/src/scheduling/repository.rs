use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};

use super::domain::{
    Appointment, AvailabilityWindow, DayOfWeek, Facility, FacilityId, FullyVaccinated,
    Registrant, RegistrantId, RegistrationId, VaccinationRecord, WaitlistEntry,
};

/// Storage abstraction over the scheduling entities.
///
/// Listing methods return owned snapshots in a stable order so callers can mutate the
/// store while walking a result set.
pub trait SchedulingRepository: Send + Sync {
    fn insert_facility(&self, facility: Facility) -> Result<(), RepositoryError>;
    fn update_facility(&self, facility: Facility) -> Result<(), RepositoryError>;
    fn facility(&self, id: FacilityId) -> Result<Option<Facility>, RepositoryError>;
    /// All facilities ordered by id.
    fn facilities(&self) -> Result<Vec<Facility>, RepositoryError>;

    fn insert_registrant(&self, registrant: Registrant) -> Result<(), RepositoryError>;
    fn update_registrant(&self, registrant: Registrant) -> Result<(), RepositoryError>;
    fn registrant(&self, id: RegistrantId) -> Result<Option<Registrant>, RepositoryError>;
    /// All registrants ordered by id.
    fn registrants(&self) -> Result<Vec<Registrant>, RepositoryError>;

    /// Windows of one registrant ordered by weekday.
    fn availability_windows(
        &self,
        registrant: RegistrantId,
    ) -> Result<Vec<AvailabilityWindow>, RepositoryError>;
    /// Every stored window ordered by registrant then weekday.
    fn all_availability_windows(&self) -> Result<Vec<AvailabilityWindow>, RepositoryError>;
    /// Inserts or replaces the window for the window's weekday.
    fn upsert_availability_window(&self, window: AvailabilityWindow)
        -> Result<(), RepositoryError>;
    fn remove_availability_window(
        &self,
        registrant: RegistrantId,
        day: DayOfWeek,
    ) -> Result<(), RepositoryError>;
    fn clear_availability_windows(&self, registrant: RegistrantId) -> Result<(), RepositoryError>;

    fn eligible_facilities(
        &self,
        registrant: RegistrantId,
    ) -> Result<BTreeSet<FacilityId>, RepositoryError>;
    fn add_eligible_facility(
        &self,
        registrant: RegistrantId,
        facility: FacilityId,
    ) -> Result<(), RepositoryError>;
    fn remove_eligible_facility(
        &self,
        registrant: RegistrantId,
        facility: FacilityId,
    ) -> Result<(), RepositoryError>;
    fn clear_eligible_facilities(&self, registrant: RegistrantId) -> Result<(), RepositoryError>;

    /// Next free registration id: one past the highest ever issued, starting at zero.
    fn next_registration_id(&self) -> Result<RegistrationId, RepositoryError>;
    fn insert_waitlist_entry(&self, entry: WaitlistEntry) -> Result<(), RepositoryError>;
    /// Waitlist in FIFO order (ascending registration id).
    fn waitlist(&self) -> Result<Vec<WaitlistEntry>, RepositoryError>;
    fn waitlist_entry_for(
        &self,
        registrant: RegistrantId,
    ) -> Result<Option<WaitlistEntry>, RepositoryError>;
    fn remove_waitlist_entry(&self, id: RegistrationId) -> Result<(), RepositoryError>;

    fn insert_appointment(&self, appointment: Appointment) -> Result<(), RepositoryError>;
    /// Appointments ordered by start time, then registration id.
    fn appointments(&self) -> Result<Vec<Appointment>, RepositoryError>;
    /// Booked start times at one facility on one date, ascending.
    fn booked_starts(
        &self,
        facility: FacilityId,
        date: NaiveDate,
    ) -> Result<Vec<NaiveDateTime>, RepositoryError>;
    fn remove_appointment(&self, id: RegistrationId) -> Result<(), RepositoryError>;

    fn insert_vaccination_record(&self, record: VaccinationRecord) -> Result<(), RepositoryError>;
    /// History ordered by administration time, then registration id.
    fn vaccination_records(&self) -> Result<Vec<VaccinationRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook for completion events (reports, e-mail adapters, test doubles).
pub trait NotificationSink: Send + Sync {
    fn publish(&self, notice: FullyVaccinated) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
