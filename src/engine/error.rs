use chrono::NaiveDate;
use rust_decimal::Decimal;
use ulid::Ulid;

use crate::model::BookingStatus;

/// What a requested stay collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    ActiveBooking,
    BlockedPeriod,
}

#[derive(Debug)]
pub enum EngineError {
    NotFound(Ulid),
    AlreadyExists(Ulid),
    /// Actor is not the room owner / booking guest the operation requires.
    Forbidden(Ulid),
    Conflict {
        kind: ConflictKind,
        with: Ulid,
    },
    InvalidRange {
        start: NaiveDate,
        end: NaiveDate,
    },
    /// Transition not allowed from the booking's current status.
    InvalidState {
        booking: Ulid,
        status: BookingStatus,
    },
    RoomClosed(Ulid),
    InvalidRate(Decimal),
    LimitExceeded(&'static str),
    WalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            EngineError::Forbidden(actor) => write!(f, "forbidden for user: {actor}"),
            EngineError::Conflict { kind, with } => match kind {
                ConflictKind::ActiveBooking => {
                    write!(f, "dates conflict with booking: {with}")
                }
                ConflictKind::BlockedPeriod => {
                    write!(f, "dates fall in blocked period: {with}")
                }
            },
            EngineError::InvalidRange { start, end } => {
                write!(f, "invalid date range: {start}..{end}")
            }
            EngineError::InvalidState { booking, status } => {
                write!(
                    f,
                    "booking {booking} is {}: transition not allowed",
                    status.as_str()
                )
            }
            EngineError::RoomClosed(id) => write!(f, "room {id} is closed"),
            EngineError::InvalidRate(rate) => write!(f, "rate must be positive: {rate}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
