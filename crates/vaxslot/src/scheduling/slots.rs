use chrono::{Duration, NaiveDateTime};

/// Length of a slot and the gap enforced after a booked slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPolicy {
    pub duration: Duration,
    pub buffer: Duration,
}

/// Outcome of probing a single candidate start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotProbe {
    pub is_free: bool,
    /// Earliest start worth trying next; only set when the candidate is taken.
    pub retry_at: Option<NaiveDateTime>,
}

impl SlotProbe {
    fn free() -> Self {
        Self {
            is_free: true,
            retry_at: None,
        }
    }

    fn taken(retry_at: NaiveDateTime) -> Self {
        Self {
            is_free: false,
            retry_at: Some(retry_at),
        }
    }
}

/// Checks `candidate` against the starts already booked at one facility on one date.
///
/// A booked slot covers `[start, start + duration]`, both ends inclusive, so a candidate
/// that merely touches a booked slot is rejected too.
pub fn search_slot(
    booked_starts: &[NaiveDateTime],
    candidate: NaiveDateTime,
    policy: SlotPolicy,
) -> SlotProbe {
    let mut ordered = booked_starts.to_vec();
    ordered.sort_unstable();

    let candidate_end = candidate + policy.duration;
    ordered
        .into_iter()
        .find_map(|start| {
            let end = start + policy.duration;
            let overlaps = (start <= candidate && candidate <= end)
                || (start <= candidate_end && candidate_end <= end);
            overlaps.then(|| end + policy.buffer)
        })
        .map_or_else(SlotProbe::free, SlotProbe::taken)
}
