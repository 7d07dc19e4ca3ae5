use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds, for audit timestamps only. Calendar logic runs on dates.
pub type Ms = i64;

/// Half-open stay `[check_in, check_out)`. The checkout day belongs to the
/// next guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayRange {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl StayRange {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Self {
        debug_assert!(check_in < check_out, "stay must be at least one night");
        Self { check_in, check_out }
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Half-open overlap: `[a,b)` meets `[c,d)` iff `a < d && b > c`.
    /// Back-to-back stays sharing a checkout/check-in day do not overlap.
    pub fn overlaps(&self, other: &StayRange) -> bool {
        self.check_in < other.check_out && self.check_out > other.check_in
    }

    /// True if the guest occupies the room on the night of `day`.
    pub fn covers(&self, day: NaiveDate) -> bool {
        self.check_in <= day && day < self.check_out
    }

    /// The charged nights, check-in first. The checkout day is not yielded.
    pub fn nights_iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.check_in.iter_days().take_while(|d| *d < self.check_out)
    }

    /// The occupied nights as an inclusive range, for matching against
    /// blocks and seasons. A one-night stay collapses to a single day.
    pub fn nights_range(&self) -> DateRange {
        DateRange {
            start: self.check_in,
            end: self.check_out.pred_opt().unwrap_or(self.check_in),
        }
    }
}

/// Inclusive date range `[start, end]`. A block or season fully occupies its
/// end date, unlike a stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start <= end, "range end must not precede start");
        Self { start, end }
    }

    /// Inclusive overlap: `[a,b]` meets `[c,d]` iff `a <= d && b >= c`.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Number of days covered, both endpoints counted.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }

    /// Everything except CANCELLED occupies its dates. A PENDING booking is
    /// already a hold.
    pub fn blocks_availability(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Some(BookingStatus::Pending),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            "COMPLETED" => Some(BookingStatus::Completed),
            _ => None,
        }
    }
}

/// Why the owner took dates off the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockReason {
    Maintenance,
    Renovation,
    PersonalUse,
    Other,
}

impl BlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::Maintenance => "MAINTENANCE",
            BlockReason::Renovation => "RENOVATION",
            BlockReason::PersonalUse => "PERSONAL_USE",
            BlockReason::Other => "OTHER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "MAINTENANCE" => Some(BlockReason::Maintenance),
            "RENOVATION" => Some(BlockReason::Renovation),
            "PERSONAL_USE" => Some(BlockReason::PersonalUse),
            "OTHER" => Some(BlockReason::Other),
            _ => None,
        }
    }
}

/// A guest's reservation. Never removed from the room; cancellation flips
/// the status and the overlap queries skip it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    pub id: Ulid,
    pub guest_id: Ulid,
    pub stay: StayRange,
    pub total: Decimal,
    pub status: BookingStatus,
    pub cancelled_at: Option<Ms>,
    pub cancellation_reason: Option<String>,
    /// Set on reschedule.
    pub modified_at: Option<Ms>,
    /// The stay as first booked, recorded on the first reschedule only.
    pub original_stay: Option<StayRange>,
}

impl Booking {
    pub fn blocks_availability(&self) -> bool {
        self.status.blocks_availability()
    }
}

/// Owner-imposed blocked range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: Ulid,
    pub range: DateRange,
    pub reason: BlockReason,
    pub note: Option<String>,
}

/// Seasonal nightly-rate override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Season {
    pub id: Ulid,
    pub range: DateRange,
    pub rate: Decimal,
    pub label: Option<String>,
}

/// Everything the engine knows about one room: identity plus the three
/// interval collections, each kept sorted by range start.
#[derive(Debug, Clone)]
pub struct RoomState {
    pub id: Ulid,
    pub hotel_id: Ulid,
    pub owner_id: Ulid,
    pub name: String,
    pub base_rate: Decimal,
    /// Max guests. Descriptive only; occupancy per night is exclusive.
    pub capacity: u32,
    /// Hard switch. A closed room is never bookable.
    pub open: bool,
    pub bookings: Vec<Booking>,
    pub blocks: Vec<Block>,
    pub seasons: Vec<Season>,
}

impl RoomState {
    pub fn new(
        id: Ulid,
        hotel_id: Ulid,
        owner_id: Ulid,
        name: String,
        base_rate: Decimal,
        capacity: u32,
    ) -> Self {
        Self {
            id,
            hotel_id,
            owner_id,
            name,
            base_rate,
            capacity,
            open: true,
            bookings: Vec::new(),
            blocks: Vec::new(),
            seasons: Vec::new(),
        }
    }

    /// Insert maintaining sort order by check-in.
    pub fn insert_booking(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .binary_search_by_key(&booking.stay.check_in, |b| b.stay.check_in)
            .unwrap_or_else(|e| e);
        self.bookings.insert(pos, booking);
    }

    /// Remove by id. Only reschedule uses this, to re-insert at the new
    /// sort position; cancellation never removes.
    pub fn remove_booking(&mut self, id: Ulid) -> Option<Booking> {
        let pos = self.bookings.iter().position(|b| b.id == id)?;
        Some(self.bookings.remove(pos))
    }

    pub fn booking(&self, id: Ulid) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    pub fn booking_mut(&mut self, id: Ulid) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == id)
    }

    /// Bookings whose stay overlaps the query, any status. Binary search
    /// bounds the scan: everything at index >= the partition point checks
    /// in on or after `query.check_out` and cannot overlap.
    pub fn bookings_overlapping(&self, query: &StayRange) -> impl Iterator<Item = &Booking> {
        let right = self
            .bookings
            .partition_point(|b| b.stay.check_in < query.check_out);
        self.bookings[..right]
            .iter()
            .filter(move |b| b.stay.check_out > query.check_in)
    }

    /// True if any non-cancelled booking occupies the night of `day`.
    pub fn booked_on(&self, day: NaiveDate) -> bool {
        let right = self.bookings.partition_point(|b| b.stay.check_in <= day);
        self.bookings[..right]
            .iter()
            .any(|b| b.blocks_availability() && b.stay.covers(day))
    }

    pub fn insert_block(&mut self, block: Block) {
        let pos = self
            .blocks
            .binary_search_by_key(&block.range.start, |b| b.range.start)
            .unwrap_or_else(|e| e);
        self.blocks.insert(pos, block);
    }

    pub fn remove_block(&mut self, id: Ulid) -> Option<Block> {
        let pos = self.blocks.iter().position(|b| b.id == id)?;
        Some(self.blocks.remove(pos))
    }

    pub fn block(&self, id: Ulid) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// The block covering `day`, if any. Blocks never overlap each other,
    /// so at most one can match.
    pub fn block_covering(&self, day: NaiveDate) -> Option<&Block> {
        let right = self.blocks.partition_point(|b| b.range.start <= day);
        self.blocks[..right].iter().find(|b| b.range.contains(day))
    }

    /// Blocks overlapping the query under the inclusive rule: a block
    /// ending exactly on `query.start` still overlaps.
    pub fn blocks_overlapping(&self, query: &DateRange) -> impl Iterator<Item = &Block> {
        let right = self.blocks.partition_point(|b| b.range.start <= query.end);
        self.blocks[..right]
            .iter()
            .filter(move |b| b.range.end >= query.start)
    }

    pub fn insert_season(&mut self, season: Season) {
        let pos = self
            .seasons
            .binary_search_by_key(&season.range.start, |s| s.range.start)
            .unwrap_or_else(|e| e);
        self.seasons.insert(pos, season);
    }

    pub fn remove_season(&mut self, id: Ulid) -> Option<Season> {
        let pos = self.seasons.iter().position(|s| s.id == id)?;
        Some(self.seasons.remove(pos))
    }

    pub fn season(&self, id: Ulid) -> Option<&Season> {
        self.seasons.iter().find(|s| s.id == id)
    }

    pub fn seasons_overlapping(&self, query: &DateRange) -> impl Iterator<Item = &Season> {
        let right = self.seasons.partition_point(|s| s.range.start <= query.end);
        self.seasons[..right]
            .iter()
            .filter(move |s| s.range.end >= query.start)
    }
}

/// The event types, one flat variant per state change. This is the WAL
/// record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    RoomRegistered {
        id: Ulid,
        hotel_id: Ulid,
        owner_id: Ulid,
        name: String,
        base_rate: Decimal,
        capacity: u32,
        open: bool,
    },
    /// Full snapshot of the mutable fields, so replay never merges.
    RoomUpdated {
        id: Ulid,
        base_rate: Decimal,
        capacity: u32,
        open: bool,
    },
    BookingCreated {
        id: Ulid,
        room_id: Ulid,
        guest_id: Ulid,
        stay: StayRange,
        total: Decimal,
    },
    BookingConfirmed {
        id: Ulid,
        room_id: Ulid,
    },
    BookingCancelled {
        id: Ulid,
        room_id: Ulid,
        at: Ms,
        reason: Option<String>,
    },
    BookingCompleted {
        id: Ulid,
        room_id: Ulid,
    },
    BookingRescheduled {
        id: Ulid,
        room_id: Ulid,
        stay: StayRange,
        total: Decimal,
        at: Ms,
    },
    BlockAdded {
        id: Ulid,
        room_id: Ulid,
        range: DateRange,
        reason: BlockReason,
        note: Option<String>,
    },
    BlockRemoved {
        id: Ulid,
        room_id: Ulid,
    },
    SeasonAdded {
        id: Ulid,
        room_id: Ulid,
        range: DateRange,
        rate: Decimal,
        label: Option<String>,
    },
    SeasonRemoved {
        id: Ulid,
        room_id: Ulid,
    },
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub id: Ulid,
    pub hotel_id: Ulid,
    pub owner_id: Ulid,
    pub name: String,
    pub base_rate: Decimal,
    pub capacity: u32,
    pub open: bool,
}

/// Priced candidate stay. Nothing is reserved by quoting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StayQuote {
    pub room_id: Ulid,
    pub stay: StayRange,
    pub nights: i64,
    pub total: Decimal,
}

/// One calendar day's resolution. Precedence is baked into the compositor:
/// a block wins over a booking, a booking wins over open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayStatus {
    Blocked { reason: BlockReason },
    Booked,
    Open { rate: Decimal, season: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub status: DayStatus,
}

impl DayAvailability {
    pub fn is_available(&self) -> bool {
        matches!(self.status, DayStatus::Open { .. })
    }

    /// Nightly price for an open day, NULL otherwise.
    pub fn price(&self) -> Option<Decimal> {
        match &self.status {
            DayStatus::Open { rate, .. } => Some(*rate),
            _ => None,
        }
    }

    /// Unavailability cause or season label, for presentation.
    pub fn reason(&self) -> Option<&str> {
        match &self.status {
            DayStatus::Blocked { reason } => Some(reason.as_str()),
            DayStatus::Booked => Some("BOOKED"),
            DayStatus::Open { season, .. } => season.as_deref(),
        }
    }
}
