use chrono::NaiveDate;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::availability::{self, validate_stay};
use super::{Engine, EngineError, calendar, pricing};

impl Engine {
    /// The authorization capability: who may mutate this room.
    pub async fn room_owner(&self, room_id: Ulid) -> Result<Ulid, EngineError> {
        let room = self.get_room(&room_id).ok_or(EngineError::NotFound(room_id))?;
        let guard = room.read().await;
        Ok(guard.owner_id)
    }

    /// Availability probe: could this stay be booked right now.
    pub async fn is_bookable(
        &self,
        room_id: Ulid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<bool, EngineError> {
        let stay = validate_stay(check_in, check_out)?;
        let room = self.get_room(&room_id).ok_or(EngineError::NotFound(room_id))?;
        let guard = room.read().await;
        Ok(availability::is_bookable(&guard, &stay))
    }

    /// Price a candidate stay. Nothing is reserved.
    pub async fn quote_stay(
        &self,
        room_id: Ulid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<StayQuote, EngineError> {
        let stay = validate_stay(check_in, check_out)?;
        let room = self.get_room(&room_id).ok_or(EngineError::NotFound(room_id))?;
        let guard = room.read().await;
        Ok(StayQuote {
            room_id,
            stay,
            nights: stay.nights(),
            total: pricing::price_for_stay(&guard, &stay),
        })
    }

    /// One `DayAvailability` per day of `year`-`month`. A slightly stale
    /// view under concurrent writes is acceptable; the read lock only
    /// guarantees a consistent snapshot.
    pub async fn monthly_calendar(
        &self,
        room_id: Ulid,
        year: i32,
        month: u32,
    ) -> Result<Vec<DayAvailability>, EngineError> {
        if !(MIN_VALID_YEAR..=MAX_VALID_YEAR).contains(&year) {
            return Err(EngineError::LimitExceeded("calendar month out of range"));
        }
        let (first, last) = calendar::month_bounds(year, month)
            .ok_or(EngineError::LimitExceeded("calendar month out of range"))?;
        let room = self.get_room(&room_id).ok_or(EngineError::NotFound(room_id))?;
        let guard = room.read().await;
        Ok(calendar::monthly_calendar(&guard, first, last))
    }

    pub async fn list_rooms(&self) -> Vec<RoomInfo> {
        let arcs: Vec<_> = self.rooms.iter().map(|e| e.value().clone()).collect();
        let mut rooms = Vec::with_capacity(arcs.len());
        for arc in arcs {
            let guard = arc.read().await;
            rooms.push(RoomInfo {
                id: guard.id,
                hotel_id: guard.hotel_id,
                owner_id: guard.owner_id,
                name: guard.name.clone(),
                base_rate: guard.base_rate,
                capacity: guard.capacity,
                open: guard.open,
            });
        }
        rooms.sort_by_key(|r| r.id);
        rooms
    }

    pub async fn get_room_info(&self, id: Ulid) -> Result<RoomInfo, EngineError> {
        let room = self.get_room(&id).ok_or(EngineError::NotFound(id))?;
        let guard = room.read().await;
        Ok(RoomInfo {
            id: guard.id,
            hotel_id: guard.hotel_id,
            owner_id: guard.owner_id,
            name: guard.name.clone(),
            base_rate: guard.base_rate,
            capacity: guard.capacity,
            open: guard.open,
        })
    }

    pub async fn get_booking(&self, id: Ulid) -> Result<Booking, EngineError> {
        let room_id = self
            .get_room_for_entity(&id)
            .ok_or(EngineError::NotFound(id))?;
        let room = self.get_room(&room_id).ok_or(EngineError::NotFound(room_id))?;
        let guard = room.read().await;
        guard.booking(id).cloned().ok_or(EngineError::NotFound(id))
    }

    /// All bookings on a room, cancelled ones included. An unknown room
    /// reads as empty, matching what a SELECT with no matches returns.
    pub async fn get_bookings(&self, room_id: Ulid) -> Result<Vec<Booking>, EngineError> {
        let room = match self.get_room(&room_id) {
            Some(room) => room,
            None => return Ok(vec![]),
        };
        let guard = room.read().await;
        Ok(guard.bookings.clone())
    }

    /// Every booking a guest has made, across all rooms.
    pub async fn bookings_for_guest(&self, guest_id: Ulid) -> Vec<Booking> {
        let arcs: Vec<_> = self.rooms.iter().map(|e| e.value().clone()).collect();
        let mut bookings = Vec::new();
        for arc in arcs {
            let guard = arc.read().await;
            bookings.extend(
                guard
                    .bookings
                    .iter()
                    .filter(|b| b.guest_id == guest_id)
                    .cloned(),
            );
        }
        bookings.sort_by_key(|b| (b.stay.check_in, b.id));
        bookings
    }

    pub async fn get_blocks(&self, room_id: Ulid) -> Result<Vec<Block>, EngineError> {
        let room = match self.get_room(&room_id) {
            Some(room) => room,
            None => return Ok(vec![]),
        };
        let guard = room.read().await;
        Ok(guard.blocks.clone())
    }

    pub async fn get_seasons(&self, room_id: Ulid) -> Result<Vec<Season>, EngineError> {
        let room = match self.get_room(&room_id) {
            Some(room) => room,
            None => return Ok(vec![]),
        };
        let guard = room.read().await;
        Ok(guard.seasons.clone())
    }
}
