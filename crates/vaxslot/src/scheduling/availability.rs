use chrono::{Duration, NaiveTime};
use serde::Serialize;

use super::domain::{AvailabilityWindow, DayOfWeek, TimeWindow};

/// Weekly interval during which both the registrant and the facility are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub day: DayOfWeek,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Interval {
    pub fn length(&self) -> Duration {
        self.end - self.start
    }
}

/// Intersects each availability window with the facility's daily hours.
///
/// The result is ordered by weekday and only holds intervals long enough for one slot.
/// An empty result means the registrant cannot be seen at this facility.
pub fn resolve_availability(
    windows: &[AvailabilityWindow],
    hours: TimeWindow,
    min_slot: Duration,
) -> Vec<Interval> {
    let mut ordered: Vec<&AvailabilityWindow> = windows.iter().collect();
    ordered.sort_by_key(|window| window.day);

    ordered
        .into_iter()
        .filter_map(|window| {
            let (start, end) = intersect(window.window.from, window.window.to, hours.from, hours.to)?;
            Some(Interval {
                day: window.day,
                start,
                end,
            })
        })
        .filter(|interval| interval.length() >= min_slot)
        .collect()
}

fn intersect(
    from: NaiveTime,
    to: NaiveTime,
    opens_at: NaiveTime,
    closes_at: NaiveTime,
) -> Option<(NaiveTime, NaiveTime)> {
    let starts_inside = from >= opens_at && from <= closes_at;
    let ends_inside = to >= opens_at && to <= closes_at;

    match (starts_inside, ends_inside) {
        (true, true) => Some((from, to)),
        (true, false) if to > closes_at => Some((from, closes_at)),
        (false, true) if from < opens_at => Some((opens_at, to)),
        (false, false) if from < opens_at && to > closes_at => Some((opens_at, closes_at)),
        _ => None,
    }
}
