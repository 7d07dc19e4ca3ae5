use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::model::*;

/// Nightly rate for one day: the covering seasonal override, else the base
/// rate. Overlapping seasons resolve deterministically to the smallest id,
/// which under ULIDs is creation order.
pub fn rate_for_day(room: &RoomState, day: NaiveDate) -> (Decimal, Option<&Season>) {
    let window = DateRange { start: day, end: day };
    match room.seasons_overlapping(&window).min_by_key(|s| s.id) {
        Some(season) => (season.rate, Some(season)),
        None => (room.base_rate, None),
    }
}

/// Total charge for a stay: the sum of nightly rates over
/// `[check_in, check_out)`. The checkout day is never charged. All
/// arithmetic stays in `Decimal`.
pub fn price_for_stay(room: &RoomState, stay: &StayRange) -> Decimal {
    stay.nights_iter()
        .map(|night| rate_for_day(room, night).0)
        .sum()
}
