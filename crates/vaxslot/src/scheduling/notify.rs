use tracing::info;

use super::domain::FullyVaccinated;
use super::repository::{NotificationError, NotificationSink};

/// Logs each completion notice and keeps nothing.
///
/// The notices themselves reach callers through the reconciliation report.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn publish(&self, notice: FullyVaccinated) -> Result<(), NotificationError> {
        info!(
            registrant = %notice.registrant,
            completed_at = %notice.completed_at,
            "{}",
            notice.message()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, NaiveTime};

    use super::*;
    use crate::config::SchedulingConfig;
    use crate::scheduling::{
        FacilityDraft, FacilityId, FacilitySelection, InMemorySchedulingRepository,
        RegistrantDraft, RegistrantId, SchedulingService, WindowSpec,
    };

    #[test]
    fn completion_notices_still_reach_the_report() {
        let service = SchedulingService::new(
            Arc::new(InMemorySchedulingRepository::default()),
            Arc::new(TracingNotificationSink),
            SchedulingConfig::default(),
        );
        let today = NaiveDate::from_ymd_opt(2021, 3, 21).unwrap();
        service
            .create_facility(FacilityDraft {
                id: FacilityId(1),
                district: 1,
                opens_at: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                closes_at: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
                capacity: 5,
            })
            .expect("facility created");
        service
            .create_registrant(
                RegistrantDraft {
                    id: RegistrantId(7),
                    first_name: "Ada".to_string(),
                    last_name: "Lovelace".to_string(),
                    birth_date: NaiveDate::from_ymd_opt(1950, 12, 10).unwrap(),
                    district: 1,
                    dose_count: 1,
                    special_eligible: false,
                },
                today,
            )
            .expect("registrant created");
        service
            .register(
                RegistrantId(7),
                FacilitySelection {
                    whole_district: true,
                    explicit: Vec::new(),
                },
                vec![WindowSpec::Always],
            )
            .expect("registered");

        let booked = service
            .end_day(today, &[])
            .expect("first pass");
        assert_eq!(booked.allocations.len(), 1);

        let completed = service
            .end_day(booked.allocations[0].date(), &[])
            .expect("second pass");
        assert_eq!(completed.notifications.len(), 1);
        assert_eq!(
            completed.notifications[0].message(),
            "Ada Lovelace with ID: 7 is fully vaccinated"
        );
    }
}
