use chrono::{Months, NaiveDate};

use crate::model::*;

use super::pricing::rate_for_day;

/// Resolve one day with the fixed precedence: a block beats a booking,
/// a booking beats open. Pure read; never mutates an interval.
pub fn day_availability(room: &RoomState, day: NaiveDate) -> DayAvailability {
    if let Some(block) = room.block_covering(day) {
        return DayAvailability {
            date: day,
            status: DayStatus::Blocked {
                reason: block.reason,
            },
        };
    }
    if room.booked_on(day) {
        return DayAvailability {
            date: day,
            status: DayStatus::Booked,
        };
    }
    let (rate, season) = rate_for_day(room, day);
    DayAvailability {
        date: day,
        status: DayStatus::Open {
            rate,
            season: season.and_then(|s| s.label.clone()),
        },
    }
}

/// First and last day of a calendar month. None when the month token is
/// out of range (month 0, month 13, unrepresentable year).
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = first.checked_add_months(Months::new(1))?.pred_opt()?;
    Some((first, last))
}

/// One record per day of `[first, last]`, in date order.
pub fn monthly_calendar(room: &RoomState, first: NaiveDate, last: NaiveDate) -> Vec<DayAvailability> {
    first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|d| day_availability(room, d))
        .collect()
}
