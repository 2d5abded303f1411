use chrono::NaiveDate;

use super::common::*;
use crate::scheduling::domain::{DayOfWeek, FacilityId, RegistrantId, RegistrationId, TimeWindow};
use crate::scheduling::queries::{AppointmentFilter, ValidTimeFilter, VaccinationFilter};
use crate::scheduling::repository::SchedulingRepository;
use crate::scheduling::requests::{
    FacilityChange, FacilityDraft, FacilitySelection, RegistrantDraft, WindowChange, WindowSpec,
};
use crate::scheduling::service::ServiceError;
use crate::scheduling::statistics::Statistics;

fn facility_draft(id: u32, district: u32, capacity: u32) -> FacilityDraft {
    FacilityDraft {
        id: FacilityId(id),
        district,
        opens_at: time(8, 0),
        closes_at: time(12, 0),
        capacity,
    }
}

fn registrant_draft(id: u32, birth_date: NaiveDate, dose_count: u32) -> RegistrantDraft {
    RegistrantDraft {
        id: RegistrantId(id),
        first_name: "Grace".to_string(),
        last_name: format!("Hopper{id}"),
        birth_date,
        district: 1,
        dose_count,
        special_eligible: false,
    }
}

fn whole_district() -> FacilitySelection {
    FacilitySelection {
        whole_district: true,
        explicit: Vec::new(),
    }
}

fn monday_morning() -> Vec<WindowSpec> {
    vec![WindowSpec::Range(weekday(MONDAY), span((9, 0), (10, 0)))]
}

#[test]
fn create_facility_rejects_duplicates_and_inverted_hours() {
    let (service, _, _) = service();
    service
        .create_facility(facility_draft(1, 1, 5))
        .expect("facility created");

    assert!(matches!(
        service.create_facility(facility_draft(1, 2, 5)),
        Err(ServiceError::DuplicateFacility(FacilityId(1)))
    ));

    let inverted = FacilityDraft {
        opens_at: time(12, 0),
        closes_at: time(8, 0),
        ..facility_draft(2, 1, 5)
    };
    assert!(matches!(
        service.create_facility(inverted),
        Err(ServiceError::InvalidHours(FacilityId(2)))
    ));
}

#[test]
fn create_registrant_derives_priority_from_age() {
    let (service, _, _) = service();

    let elder = service
        .create_registrant(registrant_draft(1, date(1950, 1, 1), 0), sunday())
        .expect("registrant created");
    let young = service
        .create_registrant(registrant_draft(2, date(1990, 1, 1), 0), sunday())
        .expect("registrant created");

    assert_eq!(elder.priority, 2);
    assert_eq!(young.priority, 1);
}

#[test]
fn create_registrant_validates_input() {
    let (service, _, _) = service();

    assert!(matches!(
        service.create_registrant(registrant_draft(1, date(2022, 1, 1), 0), sunday()),
        Err(ServiceError::BornInFuture(RegistrantId(1)))
    ));
    assert!(matches!(
        service.create_registrant(registrant_draft(1, date(1990, 1, 1), 3), sunday()),
        Err(ServiceError::DoseCountAboveLimit { doses: 3, limit: 2, .. })
    ));
    service
        .create_registrant(registrant_draft(1, date(1990, 1, 1), 0), sunday())
        .expect("registrant created");
    assert!(matches!(
        service.create_registrant(registrant_draft(1, date(1991, 1, 1), 0), sunday()),
        Err(ServiceError::DuplicateRegistrant(RegistrantId(1)))
    ));
}

#[test]
fn register_resolves_facility_selection() {
    let (service, repository, _) = service();
    service.create_facility(facility_draft(1, 1, 5)).unwrap();
    service.create_facility(facility_draft(2, 1, 5)).unwrap();
    service.create_facility(facility_draft(3, 2, 5)).unwrap();
    for id in 1..=3 {
        service
            .create_registrant(registrant_draft(id, date(1990, 1, 1), 0), sunday())
            .unwrap();
    }

    let first = service
        .register(RegistrantId(1), whole_district(), monday_morning())
        .expect("registered");
    let second = service
        .register(
            RegistrantId(2),
            FacilitySelection {
                whole_district: false,
                explicit: vec![FacilityId(3), FacilityId(99)],
            },
            monday_morning(),
        )
        .expect("registered");
    service
        .register(
            RegistrantId(3),
            FacilitySelection {
                whole_district: false,
                explicit: vec![FacilityId(99)],
            },
            monday_morning(),
        )
        .expect("registered");

    assert_eq!(first.registration_id, RegistrationId(0));
    assert_eq!(second.registration_id, RegistrationId(1));
    let eligible = |id| {
        repository
            .eligible_facilities(RegistrantId(id))
            .unwrap()
            .into_iter()
            .map(|facility| facility.0)
            .collect::<Vec<_>>()
    };
    assert_eq!(eligible(1), vec![1, 2]);
    assert_eq!(eligible(2), vec![3]);
    assert_eq!(eligible(3), vec![1, 2]);
}

#[test]
fn register_rejects_ineligible_registrants() {
    let (service, repository, _) = service();
    service.create_facility(facility_draft(1, 1, 5)).unwrap();
    service
        .create_registrant(registrant_draft(1, date(1990, 1, 1), 0), sunday())
        .unwrap();
    service
        .create_registrant(registrant_draft(2, date(1990, 1, 1), 2), sunday())
        .unwrap();
    service
        .create_registrant(
            RegistrantDraft {
                district: 7,
                ..registrant_draft(3, date(1990, 1, 1), 0)
            },
            sunday(),
        )
        .unwrap();

    assert!(matches!(
        service.register(RegistrantId(1), whole_district(), Vec::new()),
        Err(ServiceError::NoAvailability(RegistrantId(1)))
    ));
    assert!(matches!(
        service.register(RegistrantId(2), whole_district(), monday_morning()),
        Err(ServiceError::FullyVaccinated(RegistrantId(2)))
    ));
    assert!(matches!(
        service.register(RegistrantId(3), whole_district(), monday_morning()),
        Err(ServiceError::NoEligibleFacility(RegistrantId(3)))
    ));
    assert!(matches!(
        service.register(RegistrantId(42), whole_district(), monday_morning()),
        Err(ServiceError::UnknownRegistrant(RegistrantId(42)))
    ));

    service
        .register(RegistrantId(1), whole_district(), monday_morning())
        .expect("registered");
    assert!(matches!(
        service.register(RegistrantId(1), whole_district(), monday_morning()),
        Err(ServiceError::AlreadyRegistered(RegistrantId(1)))
    ));
    assert_eq!(repository.waitlist().unwrap().len(), 1);
    assert!(repository.availability_windows(RegistrantId(3)).unwrap().is_empty());
}

#[test]
fn change_facilities_never_empties_the_set() {
    let (service, _, _) = service();
    for id in 1..=3 {
        service.create_facility(facility_draft(id, 1, 5)).unwrap();
    }
    service
        .create_registrant(registrant_draft(1, date(1990, 1, 1), 0), sunday())
        .unwrap();
    service
        .register(
            RegistrantId(1),
            FacilitySelection {
                whole_district: false,
                explicit: vec![FacilityId(1), FacilityId(2)],
            },
            monday_morning(),
        )
        .unwrap();

    let remaining = service
        .change_facilities(
            RegistrantId(1),
            vec![
                FacilityChange::Remove(FacilityId(1)),
                FacilityChange::Remove(FacilityId(2)),
            ],
        )
        .expect("changes applied");
    assert_eq!(remaining.into_iter().collect::<Vec<_>>(), vec![FacilityId(2)]);

    let grown = service
        .change_facilities(RegistrantId(1), vec![FacilityChange::Add(FacilityId(3))])
        .expect("changes applied");
    assert_eq!(grown.len(), 2);

    assert!(matches!(
        service.change_facilities(RegistrantId(1), vec![FacilityChange::Add(FacilityId(9))]),
        Err(ServiceError::UnknownFacility(FacilityId(9)))
    ));
}

#[test]
fn change_windows_sets_clears_and_replaces() {
    let (service, _, _) = service();
    service.create_facility(facility_draft(1, 1, 5)).unwrap();
    service
        .create_registrant(registrant_draft(1, date(1990, 1, 1), 0), sunday())
        .unwrap();
    service
        .register(RegistrantId(1), whole_district(), monday_morning())
        .unwrap();

    let windows = service
        .change_windows(
            RegistrantId(1),
            vec![
                WindowChange::Set(WindowSpec::WholeDay(weekday(WEDNESDAY))),
                WindowChange::Clear(weekday(MONDAY)),
            ],
        )
        .expect("changes applied");
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].day, weekday(WEDNESDAY));
    assert_eq!(windows[0].window, TimeWindow::whole_day());

    let windows = service
        .change_windows(RegistrantId(1), vec![WindowChange::Set(WindowSpec::Always)])
        .expect("changes applied");
    let days: Vec<DayOfWeek> = windows.iter().map(|window| window.day).collect();
    assert_eq!(days, DayOfWeek::all().collect::<Vec<_>>());
}

#[test]
fn completed_registrant_below_limit_can_register_again() {
    let (service, repository, notifier) = service();
    service.create_facility(facility_draft(1, 1, 5)).unwrap();
    service
        .create_registrant(registrant_draft(1, date(1990, 1, 1), 0), sunday())
        .unwrap();
    service
        .register(RegistrantId(1), whole_district(), monday_morning())
        .unwrap();

    let report = service.end_day(sunday(), &[]).expect("sunday pass");
    assert_eq!(report.allocations.len(), 1);
    let booked = service
        .find_appointments(&[AppointmentFilter::Registrant(RegistrantId(1))])
        .unwrap();
    assert_eq!(booked[0].starts_at, at(monday(), 9, 0));
    assert_eq!(
        repository.facility(FacilityId(1)).unwrap().unwrap().remaining_capacity,
        4
    );

    let report = service.end_day(monday(), &[]).expect("monday pass");
    assert_eq!(report.completed.len(), 1);
    assert!(notifier.events().is_empty());

    service
        .register(
            RegistrantId(1),
            whole_district(),
            vec![WindowSpec::Range(weekday(WEDNESDAY), span((10, 0), (11, 0)))],
        )
        .expect("registered again");
    let windows = service
        .valid_times(&[ValidTimeFilter::Registrant(RegistrantId(1))])
        .unwrap();
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].day, weekday(WEDNESDAY));

    let statistics = service.statistics().unwrap();
    assert_eq!(statistics.vaccinated_registrants, 1);
    assert_eq!(statistics.favourite_facility, Some(FacilityId(1)));
    assert_eq!(statistics.favourite_date, Some(monday()));
    assert_eq!(statistics.favourite_weekday, Some(weekday(MONDAY)));
    assert_eq!(statistics.first_fully_vaccinated, None);
    assert_eq!(statistics.best_vaccinated_district, None);
}

#[test]
fn fully_vaccinated_registrant_cannot_register_again() {
    let (service, _, notifier) = service();
    service.create_facility(facility_draft(1, 1, 5)).unwrap();
    service
        .create_registrant(registrant_draft(1, date(1990, 1, 1), 1), sunday())
        .unwrap();
    service
        .register(RegistrantId(1), whole_district(), monday_morning())
        .unwrap();

    service.end_day(sunday(), &[]).unwrap();
    service.end_day(monday(), &[]).unwrap();

    assert_eq!(notifier.events().len(), 1);
    assert!(matches!(
        service.register(RegistrantId(1), whole_district(), monday_morning()),
        Err(ServiceError::FullyVaccinated(RegistrantId(1)))
    ));
    let doses = service
        .logged_vaccinations(&[VaccinationFilter::Dose(2)])
        .unwrap();
    assert_eq!(doses.len(), 1);

    let statistics = service.statistics().unwrap();
    assert_eq!(statistics.first_fully_vaccinated, Some(RegistrantId(1)));
    assert_eq!(statistics.best_vaccinated_district, Some(1));
    assert_eq!(statistics.favourite_district, Some(1));
}

#[test]
fn queries_union_filters_without_duplicates() {
    let (service, _, _) = service();
    service.create_facility(facility_draft(1, 1, 5)).unwrap();
    service.create_facility(facility_draft(2, 1, 0)).unwrap();
    service.create_facility(facility_draft(3, 2, 5)).unwrap();
    for id in 1..=2 {
        service
            .create_registrant(registrant_draft(id, date(1990, 1, 1), 0), sunday())
            .unwrap();
        service
            .register(RegistrantId(id), whole_district(), monday_morning())
            .unwrap();
    }

    let free: Vec<FacilityId> = service
        .free_facilities(1)
        .unwrap()
        .into_iter()
        .map(|facility| facility.id)
        .collect();
    assert_eq!(free, vec![FacilityId(1)]);

    service.end_day(sunday(), &[]).unwrap();
    let appointments = service
        .find_appointments(&[
            AppointmentFilter::Registrant(RegistrantId(1)),
            AppointmentFilter::Facility(FacilityId(1)),
            AppointmentFilter::Date(monday()),
        ])
        .unwrap();
    assert_eq!(appointments.len(), 2);
    assert!(appointments[0].starts_at < appointments[1].starts_at);

    let windows = service
        .valid_times(&[ValidTimeFilter::DayWithin(
            weekday(MONDAY),
            span((8, 30), (10, 0)),
        )])
        .unwrap();
    assert_eq!(windows.len(), 2);
    let none = service
        .valid_times(&[ValidTimeFilter::DayWithin(
            weekday(MONDAY),
            span((9, 30), (10, 0)),
        )])
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn statistics_on_empty_store_are_empty() {
    let (service, _, _) = service();
    assert_eq!(service.statistics().unwrap(), Statistics::default());
}
