use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio::sync::{RwLock, oneshot};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::availability::{check_bookable, check_bookable_excluding, validate_date_range, validate_stay};
use super::pricing::price_for_stay;
use super::{ConflictKind, Engine, EngineError, WalCommand, now_ms};

impl Engine {
    pub async fn register_room(
        &self,
        id: Ulid,
        hotel_id: Ulid,
        owner_id: Ulid,
        name: String,
        base_rate: Decimal,
        capacity: u32,
    ) -> Result<(), EngineError> {
        if self.rooms.len() >= MAX_ROOMS {
            return Err(EngineError::LimitExceeded("too many rooms"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("room name too long"));
        }
        if base_rate <= Decimal::ZERO {
            return Err(EngineError::InvalidRate(base_rate));
        }
        if self.rooms.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }

        let event = Event::RoomRegistered {
            id,
            hotel_id,
            owner_id,
            name: name.clone(),
            base_rate,
            capacity,
            open: true,
        };
        self.wal_append(&event).await?;
        let room = RoomState::new(id, hotel_id, owner_id, name, base_rate, capacity);
        self.rooms.insert(id, Arc::new(RwLock::new(room)));
        Ok(())
    }

    /// Owner-only. `None` fields keep their current value; the logged event
    /// carries the resulting snapshot so replay never needs the old one.
    pub async fn update_room(
        &self,
        actor: Ulid,
        id: Ulid,
        base_rate: Option<Decimal>,
        capacity: Option<u32>,
        open: Option<bool>,
    ) -> Result<(), EngineError> {
        if let Some(rate) = base_rate
            && rate <= Decimal::ZERO
        {
            return Err(EngineError::InvalidRate(rate));
        }
        let room = self.get_room(&id).ok_or(EngineError::NotFound(id))?;
        let mut guard = room.write().await;
        if guard.owner_id != actor {
            return Err(EngineError::Forbidden(actor));
        }

        let event = Event::RoomUpdated {
            id,
            base_rate: base_rate.unwrap_or(guard.base_rate),
            capacity: capacity.unwrap_or(guard.capacity),
            open: open.unwrap_or(guard.open),
        };
        self.persist_and_apply(&mut guard, &event).await
    }

    /// Book a stay. The write guard is held across the availability check,
    /// the price computation, the WAL append, and the in-memory insert, so
    /// two overlapping requests for the same room serialize and exactly one
    /// wins. The guest lookup happens before the lock is taken.
    pub async fn create_booking(
        &self,
        guest_id: Ulid,
        id: Ulid,
        room_id: Ulid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Booking, EngineError> {
        let stay = validate_stay(check_in, check_out)?;
        self.directory
            .find_user(guest_id)
            .await
            .ok_or(EngineError::NotFound(guest_id))?;
        let room = self.get_room(&room_id).ok_or(EngineError::NotFound(room_id))?;
        let mut guard = room.write().await;
        if self.entity_to_room.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }
        if guard.bookings.len() >= MAX_BOOKINGS_PER_ROOM {
            return Err(EngineError::LimitExceeded("too many bookings on room"));
        }

        check_bookable(&guard, &stay)?;
        let total = price_for_stay(&guard, &stay);

        let event = Event::BookingCreated {
            id,
            room_id,
            guest_id,
            stay,
            total,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        Ok(Booking {
            id,
            guest_id,
            stay,
            total,
            status: BookingStatus::Pending,
            cancelled_at: None,
            cancellation_reason: None,
            modified_at: None,
            original_stay: None,
        })
    }

    /// Booker-only soft cancel. Terminal bookings are rejected without
    /// touching the recorded cancellation timestamp.
    pub async fn cancel_booking(
        &self,
        actor: Ulid,
        id: Ulid,
        reason: Option<String>,
    ) -> Result<(), EngineError> {
        if let Some(ref r) = reason
            && r.len() > MAX_REASON_LEN
        {
            return Err(EngineError::LimitExceeded("cancellation reason too long"));
        }
        let (room_id, mut guard) = self.resolve_entity_write(&id).await?;
        let booking = guard.booking(id).ok_or(EngineError::NotFound(id))?;
        if booking.guest_id != actor {
            return Err(EngineError::Forbidden(actor));
        }
        if booking.status.is_terminal() {
            return Err(EngineError::InvalidState {
                booking: id,
                status: booking.status,
            });
        }

        let event = Event::BookingCancelled {
            id,
            room_id,
            at: now_ms(),
            reason,
        };
        self.persist_and_apply(&mut guard, &event).await
    }

    /// Room-owner-only. PENDING → CONFIRMED.
    pub async fn confirm_booking(&self, actor: Ulid, id: Ulid) -> Result<(), EngineError> {
        let (room_id, mut guard) = self.resolve_entity_write(&id).await?;
        if guard.owner_id != actor {
            return Err(EngineError::Forbidden(actor));
        }
        let booking = guard.booking(id).ok_or(EngineError::NotFound(id))?;
        if booking.status != BookingStatus::Pending {
            return Err(EngineError::InvalidState {
                booking: id,
                status: booking.status,
            });
        }

        let event = Event::BookingConfirmed { id, room_id };
        self.persist_and_apply(&mut guard, &event).await
    }

    /// Room-owner-only. CONFIRMED → COMPLETED.
    pub async fn complete_booking(&self, actor: Ulid, id: Ulid) -> Result<(), EngineError> {
        let (room_id, mut guard) = self.resolve_entity_write(&id).await?;
        if guard.owner_id != actor {
            return Err(EngineError::Forbidden(actor));
        }
        let booking = guard.booking(id).ok_or(EngineError::NotFound(id))?;
        if booking.status != BookingStatus::Confirmed {
            return Err(EngineError::InvalidState {
                booking: id,
                status: booking.status,
            });
        }

        let event = Event::BookingCompleted { id, room_id };
        self.persist_and_apply(&mut guard, &event).await
    }

    /// Booker-only, while PENDING or CONFIRMED. Conflict-checked excluding
    /// the booking itself, re-priced at current rates. The stay as first
    /// booked is preserved on the first reschedule.
    pub async fn reschedule_booking(
        &self,
        actor: Ulid,
        id: Ulid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Booking, EngineError> {
        let stay = validate_stay(check_in, check_out)?;
        let (room_id, mut guard) = self.resolve_entity_write(&id).await?;
        let booking = guard.booking(id).ok_or(EngineError::NotFound(id))?;
        if booking.guest_id != actor {
            return Err(EngineError::Forbidden(actor));
        }
        if booking.status.is_terminal() {
            return Err(EngineError::InvalidState {
                booking: id,
                status: booking.status,
            });
        }

        check_bookable_excluding(&guard, &stay, Some(id))?;
        let total = price_for_stay(&guard, &stay);

        let event = Event::BookingRescheduled {
            id,
            room_id,
            stay,
            total,
            at: now_ms(),
        };
        self.persist_and_apply(&mut guard, &event).await?;
        guard.booking(id).cloned().ok_or(EngineError::NotFound(id))
    }

    /// Owner-only maintenance/closure block. Overlapping an existing block
    /// is rejected; overlapping a booking is allowed (the block wins on the
    /// calendar and the dates stop being bookable).
    pub async fn add_block(
        &self,
        actor: Ulid,
        id: Ulid,
        room_id: Ulid,
        start: NaiveDate,
        end: NaiveDate,
        reason: BlockReason,
        note: Option<String>,
    ) -> Result<Block, EngineError> {
        let range = validate_date_range(start, end)?;
        if let Some(ref n) = note
            && n.len() > MAX_NOTE_LEN
        {
            return Err(EngineError::LimitExceeded("block note too long"));
        }
        let room = self.get_room(&room_id).ok_or(EngineError::NotFound(room_id))?;
        let mut guard = room.write().await;
        if guard.owner_id != actor {
            return Err(EngineError::Forbidden(actor));
        }
        if self.entity_to_room.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }
        if guard.blocks.len() >= MAX_BLOCKS_PER_ROOM {
            return Err(EngineError::LimitExceeded("too many blocks on room"));
        }
        if let Some(existing) = guard.blocks_overlapping(&range).next() {
            return Err(EngineError::Conflict {
                kind: ConflictKind::BlockedPeriod,
                with: existing.id,
            });
        }

        let event = Event::BlockAdded {
            id,
            room_id,
            range,
            reason,
            note: note.clone(),
        };
        self.persist_and_apply(&mut guard, &event).await?;
        Ok(Block {
            id,
            range,
            reason,
            note,
        })
    }

    pub async fn remove_block(&self, actor: Ulid, id: Ulid) -> Result<Ulid, EngineError> {
        let (room_id, mut guard) = self.resolve_entity_write(&id).await?;
        if guard.owner_id != actor {
            return Err(EngineError::Forbidden(actor));
        }
        if guard.block(id).is_none() {
            return Err(EngineError::NotFound(id));
        }

        let event = Event::BlockRemoved { id, room_id };
        self.persist_and_apply(&mut guard, &event).await?;
        Ok(room_id)
    }

    /// Owner-only seasonal rate. Overlapping seasons are allowed; the
    /// resolver picks the smallest id per night.
    pub async fn add_season(
        &self,
        actor: Ulid,
        id: Ulid,
        room_id: Ulid,
        start: NaiveDate,
        end: NaiveDate,
        rate: Decimal,
        label: Option<String>,
    ) -> Result<Season, EngineError> {
        let range = validate_date_range(start, end)?;
        if rate <= Decimal::ZERO {
            return Err(EngineError::InvalidRate(rate));
        }
        if let Some(ref l) = label
            && l.len() > MAX_LABEL_LEN
        {
            return Err(EngineError::LimitExceeded("season label too long"));
        }
        let room = self.get_room(&room_id).ok_or(EngineError::NotFound(room_id))?;
        let mut guard = room.write().await;
        if guard.owner_id != actor {
            return Err(EngineError::Forbidden(actor));
        }
        if self.entity_to_room.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }
        if guard.seasons.len() >= MAX_SEASONS_PER_ROOM {
            return Err(EngineError::LimitExceeded("too many seasons on room"));
        }

        let event = Event::SeasonAdded {
            id,
            room_id,
            range,
            rate,
            label: label.clone(),
        };
        self.persist_and_apply(&mut guard, &event).await?;
        Ok(Season {
            id,
            range,
            rate,
            label,
        })
    }

    pub async fn remove_season(&self, actor: Ulid, id: Ulid) -> Result<Ulid, EngineError> {
        let (room_id, mut guard) = self.resolve_entity_write(&id).await?;
        if guard.owner_id != actor {
            return Err(EngineError::Forbidden(actor));
        }
        if guard.season(id).is_none() {
            return Err(EngineError::NotFound(id));
        }

        let event = Event::SeasonRemoved { id, room_id };
        self.persist_and_apply(&mut guard, &event).await?;
        Ok(room_id)
    }

    /// Sweep candidates: PENDING bookings whose check-in has passed.
    /// Non-blocking reads; a room contended right now is picked up on the
    /// next tick.
    pub fn collect_expired_pending(&self, today: NaiveDate) -> Vec<(Ulid, Ulid)> {
        let mut expired = Vec::new();
        for entry in self.rooms.iter() {
            let room = entry.value().clone();
            if let Ok(guard) = room.try_read() {
                for booking in &guard.bookings {
                    if booking.status == BookingStatus::Pending && booking.stay.check_in < today {
                        expired.push((booking.id, guard.id));
                    }
                }
            }
        }
        expired
    }

    /// Expire one sweep candidate. Status and check-in are re-checked under
    /// the write lock: a booking confirmed or rescheduled since collection
    /// is left alone (`Ok(false)`).
    pub async fn expire_booking(&self, id: Ulid, today: NaiveDate) -> Result<bool, EngineError> {
        let (room_id, mut guard) = self.resolve_entity_write(&id).await?;
        let booking = guard.booking(id).ok_or(EngineError::NotFound(id))?;
        if booking.status != BookingStatus::Pending || booking.stay.check_in >= today {
            return Ok(false);
        }

        let event = Event::BookingCancelled {
            id,
            room_id,
            at: now_ms(),
            reason: None,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        Ok(true)
    }

    /// Cancel every PENDING booking whose check-in has passed. Fail-safe
    /// per item: one failure is logged by the caller and the sweep moves
    /// on. Returns how many bookings were actually expired.
    pub async fn expire_stale_pending(&self, today: NaiveDate) -> usize {
        let mut expired = 0usize;
        for (booking_id, room_id) in self.collect_expired_pending(today) {
            match self.expire_booking(booking_id, today).await {
                Ok(true) => expired += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(%booking_id, %room_id, error = %e, "expiry sweep: skipping booking");
                }
            }
        }
        expired
    }

    /// Compact the WAL by rewriting it with only the events needed to
    /// recreate the current state. Cancelled and completed bookings are
    /// kept; they are audit history, not dead weight.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let mut events = Vec::new();

        let room_arcs: Vec<_> = self.rooms.iter().map(|e| e.value().clone()).collect();
        for room in room_arcs {
            let guard = room.read().await;

            events.push(Event::RoomRegistered {
                id: guard.id,
                hotel_id: guard.hotel_id,
                owner_id: guard.owner_id,
                name: guard.name.clone(),
                base_rate: guard.base_rate,
                capacity: guard.capacity,
                open: guard.open,
            });

            for booking in &guard.bookings {
                // Replay the original stay first so a rescheduled booking
                // keeps its audit trail.
                match booking.original_stay {
                    Some(original) => {
                        events.push(Event::BookingCreated {
                            id: booking.id,
                            room_id: guard.id,
                            guest_id: booking.guest_id,
                            stay: original,
                            total: booking.total,
                        });
                        events.push(Event::BookingRescheduled {
                            id: booking.id,
                            room_id: guard.id,
                            stay: booking.stay,
                            total: booking.total,
                            at: booking.modified_at.unwrap_or(0),
                        });
                    }
                    None => events.push(Event::BookingCreated {
                        id: booking.id,
                        room_id: guard.id,
                        guest_id: booking.guest_id,
                        stay: booking.stay,
                        total: booking.total,
                    }),
                }
                match booking.status {
                    BookingStatus::Pending => {}
                    BookingStatus::Confirmed => events.push(Event::BookingConfirmed {
                        id: booking.id,
                        room_id: guard.id,
                    }),
                    BookingStatus::Cancelled => events.push(Event::BookingCancelled {
                        id: booking.id,
                        room_id: guard.id,
                        at: booking.cancelled_at.unwrap_or(0),
                        reason: booking.cancellation_reason.clone(),
                    }),
                    BookingStatus::Completed => events.push(Event::BookingCompleted {
                        id: booking.id,
                        room_id: guard.id,
                    }),
                }
            }

            for block in &guard.blocks {
                events.push(Event::BlockAdded {
                    id: block.id,
                    room_id: guard.id,
                    range: block.range,
                    reason: block.reason,
                    note: block.note.clone(),
                });
            }
            for season in &guard.seasons {
                events.push(Event::SeasonAdded {
                    id: season.id,
                    room_id: guard.id,
                    range: season.range,
                    rate: season.rate,
                    label: season.label.clone(),
                });
            }
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
