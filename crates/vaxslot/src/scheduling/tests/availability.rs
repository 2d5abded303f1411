use chrono::Duration;

use super::common::*;
use crate::scheduling::availability::{resolve_availability, Interval};
use crate::scheduling::domain::{AvailabilityWindow, RegistrantId, TimeWindow};

fn resolve(windows: &[AvailabilityWindow]) -> Vec<Interval> {
    resolve_availability(windows, facility(1, 1).hours(), Duration::minutes(9))
}

#[test]
fn keeps_windows_inside_opening_hours() {
    let intervals = resolve(&[window(1, MONDAY, (9, 0), (10, 0))]);
    assert_eq!(
        intervals,
        vec![Interval {
            day: weekday(MONDAY),
            start: time(9, 0),
            end: time(10, 0),
        }]
    );
}

#[test]
fn clips_windows_to_opening_hours() {
    let intervals = resolve(&[
        window(1, 0, (7, 0), (9, 30)),
        window(1, 1, (11, 0), (13, 0)),
        window(1, 2, (6, 0), (20, 0)),
    ]);
    let bounds: Vec<_> = intervals
        .iter()
        .map(|interval| (interval.start, interval.end))
        .collect();
    assert_eq!(
        bounds,
        vec![
            (time(8, 0), time(9, 30)),
            (time(11, 0), time(12, 0)),
            (time(8, 0), time(12, 0)),
        ]
    );
}

#[test]
fn drops_windows_outside_hours_or_shorter_than_a_slot() {
    let intervals = resolve(&[
        window(1, 0, (6, 0), (7, 30)),
        window(1, 1, (13, 0), (15, 0)),
        window(1, 2, (11, 55), (14, 0)),
        window(1, 3, (9, 0), (9, 5)),
    ]);
    assert!(intervals.is_empty(), "got {intervals:?}");
}

#[test]
fn orders_intervals_by_weekday() {
    let intervals = resolve(&[
        window(1, 5, (9, 0), (10, 0)),
        window(1, 1, (9, 0), (10, 0)),
        window(1, 3, (9, 0), (10, 0)),
    ]);
    let days: Vec<u8> = intervals.iter().map(|interval| interval.day.index()).collect();
    assert_eq!(days, vec![1, 3, 5]);
}

#[test]
fn whole_day_window_resolves_to_opening_hours() {
    let whole_day = AvailabilityWindow {
        registrant: RegistrantId(1),
        day: weekday(MONDAY),
        window: TimeWindow::whole_day(),
    };
    let intervals = resolve(&[whole_day]);
    assert_eq!(intervals.len(), 1);
    assert_eq!((intervals[0].start, intervals[0].end), (time(8, 0), time(12, 0)));
}
