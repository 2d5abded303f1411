use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{
    Appointment, DayOfWeek, Facility, FacilityId, Registrant, RegistrantId, VaccinationRecord,
};

/// Aggregate figures over the vaccination history and the open appointments.
///
/// Every "favourite" is `None` when there is no data; ties resolve to the smallest key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub vaccinated_registrants: usize,
    pub best_vaccinated_district: Option<u32>,
    pub favourite_district: Option<u32>,
    pub favourite_facility: Option<FacilityId>,
    pub first_fully_vaccinated: Option<RegistrantId>,
    pub favourite_date: Option<NaiveDate>,
    pub favourite_weekday: Option<DayOfWeek>,
}

impl Statistics {
    pub(crate) fn compute(
        registrants: &[Registrant],
        facilities: &[Facility],
        history: &[VaccinationRecord],
        appointments: &[Appointment],
        dose_limit: u32,
    ) -> Self {
        let vaccinated_registrants = history
            .iter()
            .map(|record| record.registrant)
            .collect::<BTreeSet<_>>()
            .len();

        let best_vaccinated_district = most_frequent(
            registrants
                .iter()
                .filter(|registrant| registrant.is_fully_vaccinated(dose_limit))
                .map(|registrant| registrant.district),
        );

        let districts: BTreeMap<FacilityId, u32> = facilities
            .iter()
            .map(|facility| (facility.id, facility.district))
            .collect();
        let favourite_district = most_frequent(
            history
                .iter()
                .filter_map(|record| districts.get(&record.facility).copied()),
        );

        let favourite_facility = most_frequent(history.iter().map(|record| record.facility));

        let first_fully_vaccinated = history
            .iter()
            .filter(|record| record.dose_number == dose_limit)
            .min_by_key(|record| (record.administered_at, record.registration_id))
            .map(|record| record.registrant);

        let dates = || {
            history
                .iter()
                .map(|record| record.administered_at.date())
                .chain(appointments.iter().map(Appointment::date))
        };
        let favourite_date = most_frequent(dates());
        let favourite_weekday = most_frequent(dates().map(DayOfWeek::of));

        Self {
            vaccinated_registrants,
            best_vaccinated_district,
            favourite_district,
            favourite_facility,
            first_fully_vaccinated,
            favourite_date,
            favourite_weekday,
        }
    }
}

fn most_frequent<K: Ord + Copy>(items: impl Iterator<Item = K>) -> Option<K> {
    let mut counts: BTreeMap<K, usize> = BTreeMap::new();
    for item in items {
        *counts.entry(item).or_default() += 1;
    }

    let mut best: Option<(K, usize)> = None;
    for (key, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((key, count));
        }
    }
    best.map(|(key, _)| key)
}
