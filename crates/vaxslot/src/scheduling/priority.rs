const DAYS_PER_YEAR: i64 = 365;

/// Priority score for a registrant; lower values are served first.
///
/// Every dose already received pushes the registrant back by four points, and within a
/// dose band the ordering is: young non-special, old non-special, young special, old
/// special. Doses above the limit are clamped so the function stays total.
pub fn compute_priority(
    age_days: i64,
    old_age_years: u32,
    dose_limit: u32,
    dose_count: u32,
    special_eligible: bool,
) -> i64 {
    let doses = i64::from(dose_count.min(dose_limit));
    let base = (doses + 1) * 4;
    let is_old = age_days > i64::from(old_age_years) * DAYS_PER_YEAR;

    match (special_eligible, is_old) {
        (true, false) => base - 1,
        (false, true) => base - 2,
        (false, false) => base - 3,
        (true, true) => base,
    }
}
