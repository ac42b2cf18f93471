use crate::domain::model::{DateWindow, DayTally, NominationRecord, Slot};
use std::collections::BTreeMap;

/// Registrations per slot at which a bar is drawn full.
pub const BAR_SATURATION: u32 = 10;

/// Per-day morning/evening counts for every day of the window, in order.
///
/// Records dated outside the window, or with a missing/unknown slot, are skipped.
pub fn tally(records: &[NominationRecord], window: &DateWindow) -> Vec<DayTally> {
    let mut days: BTreeMap<_, DayTally> = window
        .days()
        .map(|date| (date, DayTally::empty(date)))
        .collect();

    let mut skipped = 0usize;
    for record in records {
        let Some(date) = record.parsed_date() else {
            skipped += 1;
            continue;
        };
        match (days.get_mut(&date), record.parsed_slot()) {
            (Some(day), Some(Slot::Morning)) => day.morning += 1,
            (Some(day), Some(Slot::Evening)) => day.evening += 1,
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::debug!("Skipped {} records outside the window or without a slot", skipped);
    }

    days.into_values().collect()
}

/// Bar width in percent for a count: `min(100, count * 10)`.
pub fn bar_width_percent(count: u32) -> u32 {
    count.saturating_mul(100 / BAR_SATURATION).min(100)
}
