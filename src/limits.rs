//! Hard engine limits. Exceeding any of these fails the operation with
//! `EngineError::LimitExceeded` (or `InvalidRange` for date-window checks).

/// Maximum number of registered rooms.
pub const MAX_ROOMS: usize = 100_000;

/// Maximum bookings held per room. Cancelled bookings are retained for
/// audit, so this bounds total history, not just active stays.
pub const MAX_BOOKINGS_PER_ROOM: usize = 50_000;

/// Maximum blocked-date ranges per room.
pub const MAX_BLOCKS_PER_ROOM: usize = 10_000;

/// Maximum seasonal-rate rules per room.
pub const MAX_SEASONS_PER_ROOM: usize = 1_000;

/// Maximum room name length in bytes.
pub const MAX_NAME_LEN: usize = 256;

/// Maximum season label length in bytes.
pub const MAX_LABEL_LEN: usize = 256;

/// Maximum block note length in bytes.
pub const MAX_NOTE_LEN: usize = 1_024;

/// Maximum cancellation reason length in bytes.
pub const MAX_REASON_LEN: usize = 1_024;

/// Longest bookable stay.
pub const MAX_STAY_NIGHTS: i64 = 365;

/// Longest block or season range, inclusive of both end dates.
pub const MAX_RANGE_DAYS: i64 = 1_830;

/// All dates must fall within this year window.
pub const MIN_VALID_YEAR: i32 = 2000;
pub const MAX_VALID_YEAR: i32 = 2100;
