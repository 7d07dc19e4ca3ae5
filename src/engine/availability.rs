use chrono::{Datelike, NaiveDate};

use crate::limits::*;
use crate::model::*;

use super::{ConflictKind, EngineError};

// ── Stay validation ───────────────────────────────────────────────

fn validate_date(day: NaiveDate) -> Result<(), EngineError> {
    if day.year() < MIN_VALID_YEAR || day.year() > MAX_VALID_YEAR {
        return Err(EngineError::LimitExceeded("date out of supported range"));
    }
    Ok(())
}

/// Validate raw check-in/check-out dates into a stay. Rejects zero and
/// negative-length stays before any state is touched.
pub fn validate_stay(check_in: NaiveDate, check_out: NaiveDate) -> Result<StayRange, EngineError> {
    if check_out <= check_in {
        return Err(EngineError::InvalidRange {
            start: check_in,
            end: check_out,
        });
    }
    validate_date(check_in)?;
    validate_date(check_out)?;
    let stay = StayRange::new(check_in, check_out);
    if stay.nights() > MAX_STAY_NIGHTS {
        return Err(EngineError::LimitExceeded("stay too long"));
    }
    Ok(stay)
}

/// Validate raw start/end dates into an inclusive range for blocks and
/// seasons. A single-day range (start == end) is valid.
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<DateRange, EngineError> {
    if end < start {
        return Err(EngineError::InvalidRange { start, end });
    }
    validate_date(start)?;
    validate_date(end)?;
    let range = DateRange::new(start, end);
    if range.days() > MAX_RANGE_DAYS {
        return Err(EngineError::LimitExceeded("range too long"));
    }
    Ok(range)
}

// ── Availability check ────────────────────────────────────────────

/// The booking-path availability decision. A stay is bookable iff the room
/// is open, no non-cancelled booking overlaps it, and no blocked period
/// covers any of its nights. Blocks are as authoritative as bookings here,
/// not just calendar decoration.
pub fn check_bookable(room: &RoomState, stay: &StayRange) -> Result<(), EngineError> {
    check_bookable_excluding(room, stay, None)
}

/// Like `check_bookable`, ignoring one booking id so a reschedule does not
/// collide with itself.
pub fn check_bookable_excluding(
    room: &RoomState,
    stay: &StayRange,
    exclude: Option<ulid::Ulid>,
) -> Result<(), EngineError> {
    if !room.open {
        return Err(EngineError::RoomClosed(room.id));
    }

    for booking in room.bookings_overlapping(stay) {
        if booking.blocks_availability() && Some(booking.id) != exclude {
            return Err(EngineError::Conflict {
                kind: ConflictKind::ActiveBooking,
                with: booking.id,
            });
        }
    }

    // Match blocks against occupied nights only: a block covering just the
    // checkout day does not prevent the stay.
    let nights = stay.nights_range();
    if let Some(block) = room.blocks_overlapping(&nights).next() {
        return Err(EngineError::Conflict {
            kind: ConflictKind::BlockedPeriod,
            with: block.id,
        });
    }

    Ok(())
}

/// Boolean projection for the read path.
pub fn is_bookable(room: &RoomState, stay: &StayRange) -> bool {
    check_bookable(room, stay).is_ok()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use ulid::Ulid;

    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn stay(ci: NaiveDate, co: NaiveDate) -> StayRange {
        StayRange::new(ci, co)
    }

    fn booking(status: BookingStatus, ci: NaiveDate, co: NaiveDate) -> Booking {
        Booking {
            id: Ulid::new(),
            guest_id: Ulid::new(),
            stay: stay(ci, co),
            total: Decimal::ZERO,
            status,
            cancelled_at: None,
            cancellation_reason: None,
            modified_at: None,
            original_stay: None,
        }
    }

    fn block(start: NaiveDate, end: NaiveDate) -> Block {
        Block {
            id: Ulid::new(),
            range: DateRange::new(start, end),
            reason: BlockReason::Maintenance,
            note: None,
        }
    }

    fn room(bookings: Vec<Booking>, blocks: Vec<Block>) -> RoomState {
        let mut rs = RoomState::new(
            Ulid::new(),
            Ulid::new(),
            Ulid::new(),
            "101".into(),
            Decimal::new(10000, 2),
            2,
        );
        for b in bookings {
            rs.insert_booking(b);
        }
        for b in blocks {
            rs.insert_block(b);
        }
        rs
    }

    #[test]
    fn empty_open_room_is_bookable() {
        let rs = room(vec![], vec![]);
        assert!(check_bookable(&rs, &stay(d(2025, 6, 1), d(2025, 6, 5))).is_ok());
    }

    #[test]
    fn closed_room_never_bookable() {
        let mut rs = room(vec![], vec![]);
        rs.open = false;
        let err = check_bookable(&rs, &stay(d(2025, 6, 1), d(2025, 6, 5))).unwrap_err();
        assert!(matches!(err, EngineError::RoomClosed(_)));
    }

    #[test]
    fn pending_booking_already_holds_its_dates() {
        let rs = room(
            vec![booking(BookingStatus::Pending, d(2025, 6, 1), d(2025, 6, 5))],
            vec![],
        );
        let err = check_bookable(&rs, &stay(d(2025, 6, 4), d(2025, 6, 7))).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Conflict {
                kind: ConflictKind::ActiveBooking,
                ..
            }
        ));
    }

    #[test]
    fn confirmed_and_completed_block_cancelled_frees() {
        let mk = |status| {
            room(
                vec![booking(status, d(2025, 6, 1), d(2025, 6, 5))],
                vec![],
            )
        };
        let q = stay(d(2025, 6, 2), d(2025, 6, 4));
        assert!(check_bookable(&mk(BookingStatus::Confirmed), &q).is_err());
        assert!(check_bookable(&mk(BookingStatus::Completed), &q).is_err());
        assert!(check_bookable(&mk(BookingStatus::Cancelled), &q).is_ok());
    }

    #[test]
    fn back_to_back_stays_share_turnover_day() {
        let rs = room(
            vec![booking(BookingStatus::Confirmed, d(2025, 6, 1), d(2025, 6, 5))],
            vec![],
        );
        // Check in on the earlier guest's checkout day
        assert!(check_bookable(&rs, &stay(d(2025, 6, 5), d(2025, 6, 8))).is_ok());
        // And check out on the earlier guest's check-in day
        assert!(check_bookable(&rs, &stay(d(2025, 5, 28), d(2025, 6, 1))).is_ok());
    }

    #[test]
    fn block_overlap_rejects_booking() {
        let rs = room(vec![], vec![block(d(2025, 6, 3), d(2025, 6, 10))]);
        let err = check_bookable(&rs, &stay(d(2025, 6, 1), d(2025, 6, 5))).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Conflict {
                kind: ConflictKind::BlockedPeriod,
                ..
            }
        ));
    }

    #[test]
    fn block_occupies_its_end_date() {
        // Block [06-01, 06-05]: inclusive end means checking in on 06-05 conflicts
        let rs = room(vec![], vec![block(d(2025, 6, 1), d(2025, 6, 5))]);
        assert!(check_bookable(&rs, &stay(d(2025, 6, 5), d(2025, 6, 8))).is_err());
        assert!(check_bookable(&rs, &stay(d(2025, 6, 6), d(2025, 6, 8))).is_ok());
    }

    #[test]
    fn block_on_checkout_day_only_is_fine() {
        // Stay occupies nights 06-01..06-04; a block starting 06-05 doesn't touch them
        let rs = room(vec![], vec![block(d(2025, 6, 5), d(2025, 6, 7))]);
        assert!(check_bookable(&rs, &stay(d(2025, 6, 1), d(2025, 6, 5))).is_ok());
    }

    #[test]
    fn exclusion_skips_self_but_not_others() {
        let mine = booking(BookingStatus::Pending, d(2025, 6, 1), d(2025, 6, 5));
        let my_id = mine.id;
        let other = booking(BookingStatus::Confirmed, d(2025, 6, 10), d(2025, 6, 12));
        let other_id = other.id;
        let rs = room(vec![mine, other], vec![]);

        // Extending my own stay over itself is fine
        assert!(check_bookable_excluding(&rs, &stay(d(2025, 6, 1), d(2025, 6, 7)), Some(my_id)).is_ok());
        // But not over the other booking
        let err = check_bookable_excluding(&rs, &stay(d(2025, 6, 1), d(2025, 6, 11)), Some(my_id))
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict { with, .. } if with == other_id));
    }

    #[test]
    fn is_bookable_projection() {
        let rs = room(
            vec![booking(BookingStatus::Pending, d(2025, 6, 1), d(2025, 6, 5))],
            vec![],
        );
        assert!(!is_bookable(&rs, &stay(d(2025, 6, 4), d(2025, 6, 7))));
        assert!(is_bookable(&rs, &stay(d(2025, 6, 5), d(2025, 6, 7))));
    }

    #[test]
    fn validate_stay_rejects_degenerate_ranges() {
        // Zero nights
        assert!(matches!(
            validate_stay(d(2025, 6, 1), d(2025, 6, 1)),
            Err(EngineError::InvalidRange { .. })
        ));
        // Checkout before check-in
        assert!(matches!(
            validate_stay(d(2025, 6, 5), d(2025, 6, 1)),
            Err(EngineError::InvalidRange { .. })
        ));
        // One night is the minimum valid stay
        assert!(validate_stay(d(2025, 6, 1), d(2025, 6, 2)).is_ok());
    }

    #[test]
    fn validate_stay_enforces_limits() {
        assert!(matches!(
            validate_stay(d(2025, 1, 1), d(2026, 6, 1)),
            Err(EngineError::LimitExceeded(_))
        ));
        assert!(matches!(
            validate_stay(d(1999, 12, 30), d(2000, 1, 2)),
            Err(EngineError::LimitExceeded(_))
        ));
        assert!(validate_stay(d(2025, 1, 1), d(2025, 12, 31)).is_ok());
    }

    #[test]
    fn validate_date_range_allows_single_day() {
        assert!(validate_date_range(d(2025, 6, 1), d(2025, 6, 1)).is_ok());
        assert!(matches!(
            validate_date_range(d(2025, 6, 2), d(2025, 6, 1)),
            Err(EngineError::InvalidRange { .. })
        ));
    }
}
