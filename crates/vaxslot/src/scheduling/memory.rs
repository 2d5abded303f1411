use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{NaiveDate, NaiveDateTime};

use super::domain::{
    Appointment, AvailabilityWindow, DayOfWeek, Facility, FacilityId, FullyVaccinated,
    Registrant, RegistrantId, RegistrationId, VaccinationRecord, WaitlistEntry,
};
use super::repository::{
    NotificationError, NotificationSink, RepositoryError, SchedulingRepository,
};

#[derive(Debug, Default)]
struct Tables {
    facilities: BTreeMap<FacilityId, Facility>,
    registrants: BTreeMap<RegistrantId, Registrant>,
    windows: BTreeMap<(RegistrantId, DayOfWeek), AvailabilityWindow>,
    eligible: BTreeSet<(RegistrantId, FacilityId)>,
    waitlist: BTreeMap<RegistrationId, WaitlistEntry>,
    appointments: BTreeMap<RegistrationId, Appointment>,
    history: Vec<VaccinationRecord>,
    highest_registration: Option<RegistrationId>,
}

impl Tables {
    fn note_registration(&mut self, id: RegistrationId) {
        if self.highest_registration.map_or(true, |highest| id > highest) {
            self.highest_registration = Some(id);
        }
    }
}

/// Process-local store backing the command-line driver and the tests.
#[derive(Debug, Default, Clone)]
pub struct InMemorySchedulingRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemorySchedulingRepository {
    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl SchedulingRepository for InMemorySchedulingRepository {
    fn insert_facility(&self, facility: Facility) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if tables.facilities.contains_key(&facility.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.facilities.insert(facility.id, facility);
        Ok(())
    }

    fn update_facility(&self, facility: Facility) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        match tables.facilities.get_mut(&facility.id) {
            Some(slot) => {
                *slot = facility;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn facility(&self, id: FacilityId) -> Result<Option<Facility>, RepositoryError> {
        Ok(self.lock()?.facilities.get(&id).cloned())
    }

    fn facilities(&self) -> Result<Vec<Facility>, RepositoryError> {
        Ok(self.lock()?.facilities.values().cloned().collect())
    }

    fn insert_registrant(&self, registrant: Registrant) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if tables.registrants.contains_key(&registrant.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.registrants.insert(registrant.id, registrant);
        Ok(())
    }

    fn update_registrant(&self, registrant: Registrant) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        match tables.registrants.get_mut(&registrant.id) {
            Some(slot) => {
                *slot = registrant;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn registrant(&self, id: RegistrantId) -> Result<Option<Registrant>, RepositoryError> {
        Ok(self.lock()?.registrants.get(&id).cloned())
    }

    fn registrants(&self) -> Result<Vec<Registrant>, RepositoryError> {
        Ok(self.lock()?.registrants.values().cloned().collect())
    }

    fn availability_windows(
        &self,
        registrant: RegistrantId,
    ) -> Result<Vec<AvailabilityWindow>, RepositoryError> {
        Ok(self
            .lock()?
            .windows
            .range((registrant, DayOfWeek::MIN)..=(registrant, DayOfWeek::MAX))
            .map(|(_, window)| *window)
            .collect())
    }

    fn all_availability_windows(&self) -> Result<Vec<AvailabilityWindow>, RepositoryError> {
        Ok(self.lock()?.windows.values().copied().collect())
    }

    fn upsert_availability_window(
        &self,
        window: AvailabilityWindow,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.registrants.contains_key(&window.registrant) {
            return Err(RepositoryError::NotFound);
        }
        tables.windows.insert((window.registrant, window.day), window);
        Ok(())
    }

    fn remove_availability_window(
        &self,
        registrant: RegistrantId,
        day: DayOfWeek,
    ) -> Result<(), RepositoryError> {
        self.lock()?.windows.remove(&(registrant, day));
        Ok(())
    }

    fn clear_availability_windows(&self, registrant: RegistrantId) -> Result<(), RepositoryError> {
        self.lock()?
            .windows
            .retain(|(owner, _), _| *owner != registrant);
        Ok(())
    }

    fn eligible_facilities(
        &self,
        registrant: RegistrantId,
    ) -> Result<BTreeSet<FacilityId>, RepositoryError> {
        Ok(self
            .lock()?
            .eligible
            .iter()
            .filter(|(owner, _)| *owner == registrant)
            .map(|(_, facility)| *facility)
            .collect())
    }

    fn add_eligible_facility(
        &self,
        registrant: RegistrantId,
        facility: FacilityId,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.facilities.contains_key(&facility) {
            return Err(RepositoryError::NotFound);
        }
        tables.eligible.insert((registrant, facility));
        Ok(())
    }

    fn remove_eligible_facility(
        &self,
        registrant: RegistrantId,
        facility: FacilityId,
    ) -> Result<(), RepositoryError> {
        self.lock()?.eligible.remove(&(registrant, facility));
        Ok(())
    }

    fn clear_eligible_facilities(&self, registrant: RegistrantId) -> Result<(), RepositoryError> {
        self.lock()?
            .eligible
            .retain(|(owner, _)| *owner != registrant);
        Ok(())
    }

    fn next_registration_id(&self) -> Result<RegistrationId, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .highest_registration
            .map_or(RegistrationId(0), |highest| RegistrationId(highest.0 + 1)))
    }

    fn insert_waitlist_entry(&self, entry: WaitlistEntry) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if tables.waitlist.contains_key(&entry.registration_id) {
            return Err(RepositoryError::Conflict);
        }
        tables.note_registration(entry.registration_id);
        tables.waitlist.insert(entry.registration_id, entry);
        Ok(())
    }

    fn waitlist(&self) -> Result<Vec<WaitlistEntry>, RepositoryError> {
        Ok(self.lock()?.waitlist.values().copied().collect())
    }

    fn waitlist_entry_for(
        &self,
        registrant: RegistrantId,
    ) -> Result<Option<WaitlistEntry>, RepositoryError> {
        Ok(self
            .lock()?
            .waitlist
            .values()
            .find(|entry| entry.registrant == registrant)
            .copied())
    }

    fn remove_waitlist_entry(&self, id: RegistrationId) -> Result<(), RepositoryError> {
        self.lock()?
            .waitlist
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn insert_appointment(&self, appointment: Appointment) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if tables.appointments.contains_key(&appointment.registration_id) {
            return Err(RepositoryError::Conflict);
        }
        tables.note_registration(appointment.registration_id);
        tables
            .appointments
            .insert(appointment.registration_id, appointment);
        Ok(())
    }

    fn appointments(&self) -> Result<Vec<Appointment>, RepositoryError> {
        let mut appointments: Vec<Appointment> =
            self.lock()?.appointments.values().copied().collect();
        appointments.sort_by_key(|appointment| (appointment.starts_at, appointment.registration_id));
        Ok(appointments)
    }

    fn booked_starts(
        &self,
        facility: FacilityId,
        date: NaiveDate,
    ) -> Result<Vec<NaiveDateTime>, RepositoryError> {
        let mut starts: Vec<NaiveDateTime> = self
            .lock()?
            .appointments
            .values()
            .filter(|appointment| appointment.facility == facility && appointment.date() == date)
            .map(|appointment| appointment.starts_at)
            .collect();
        starts.sort_unstable();
        Ok(starts)
    }

    fn remove_appointment(&self, id: RegistrationId) -> Result<(), RepositoryError> {
        self.lock()?
            .appointments
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn insert_vaccination_record(&self, record: VaccinationRecord) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        tables.note_registration(record.registration_id);
        tables.history.push(record);
        Ok(())
    }

    fn vaccination_records(&self) -> Result<Vec<VaccinationRecord>, RepositoryError> {
        let mut records = self.lock()?.history.clone();
        records.sort_by_key(|record| (record.administered_at, record.registration_id));
        Ok(records)
    }
}

/// Collects completion notices so callers can report them after a pass.
#[derive(Debug, Default, Clone)]
pub struct InMemoryNotificationSink {
    events: Arc<Mutex<Vec<FullyVaccinated>>>,
}

impl NotificationSink for InMemoryNotificationSink {
    fn publish(&self, notice: FullyVaccinated) -> Result<(), NotificationError> {
        let mut guard = self
            .events
            .lock()
            .map_err(|_| NotificationError::Transport("sink mutex poisoned".to_string()))?;
        guard.push(notice);
        Ok(())
    }
}

impl InMemoryNotificationSink {
    pub fn events(&self) -> Vec<FullyVaccinated> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}
