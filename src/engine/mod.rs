mod availability;
mod calendar;
mod error;
mod mutations;
mod pricing;
mod queries;

pub use availability::{
    check_bookable, check_bookable_excluding, is_bookable, validate_date_range, validate_stay,
};
pub use calendar::{day_availability, month_bounds};
pub use error::{ConflictKind, EngineError};
pub use pricing::{price_for_stay, rate_for_day};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use tokio::sync::{RwLock, mpsc, oneshot};
use ulid::Ulid;

use crate::directory::UserDirectory;
use crate::model::*;
use crate::wal::Wal;

pub type SharedRoomState = Arc<RwLock<RoomState>>;

/// Milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> Ms {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Drain all immediately available Appends (the batch window).
/// 3. Buffer and single flush_sync for the whole batch.
/// 4. Respond to all senders.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];

                // Drain all immediately available appends
                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush current batch first, then handle the
                            // non-append command so ordering is preserved
                            metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE)
                                .record(batch.len() as f64);
                            let flush_start = std::time::Instant::now();
                            let result = flush_batch(&mut wal, &mut batch);
                            metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
                                .record(flush_start.elapsed().as_secs_f64());
                            respond_batch(&mut batch, &result);
                            handle_non_append(&mut wal, other);
                            break;
                        }
                        Err(_) => break, // channel empty, flush batch
                    }
                }

                if !batch.is_empty() {
                    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE)
                        .record(batch.len() as f64);
                    let flush_start = std::time::Instant::now();
                    let result = flush_batch(&mut wal, &mut batch);
                    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
                        .record(flush_start.elapsed().as_secs_f64());
                    respond_batch(&mut batch, &result);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn flush_batch(
    wal: &mut Wal,
    batch: &mut [(Event, oneshot::Sender<io::Result<()>>)],
) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch.iter() {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush, even on append error, so partially buffered bytes
    // don't leak into the next batch (callers were told this batch failed).
    let flush_err = wal.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn respond_batch(batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>, result: &io::Result<()>) {
    for (_, tx) in batch.drain(..) {
        let r = match result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let path = wal.path().to_path_buf();
            let result =
                Wal::write_compact_file(&path, &events).and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

pub struct Engine {
    pub rooms: DashMap<Ulid, SharedRoomState>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    /// Reverse lookup: entity (booking/block/season) id → room id
    pub(super) entity_to_room: DashMap<Ulid, Ulid>,
    /// Platform user store, consulted before a booking is accepted.
    pub(super) directory: Arc<dyn UserDirectory>,
}

/// Apply an event directly to a RoomState (no locking; caller holds the lock).
/// Shared by live mutations and replay, so each event's in-memory effect is
/// defined in exactly one place.
fn apply_to_room(room: &mut RoomState, event: &Event, entity_map: &DashMap<Ulid, Ulid>) {
    match event {
        Event::RoomUpdated {
            base_rate,
            capacity,
            open,
            ..
        } => {
            room.base_rate = *base_rate;
            room.capacity = *capacity;
            room.open = *open;
        }
        Event::BookingCreated {
            id,
            room_id,
            guest_id,
            stay,
            total,
        } => {
            room.insert_booking(Booking {
                id: *id,
                guest_id: *guest_id,
                stay: *stay,
                total: *total,
                status: BookingStatus::Pending,
                cancelled_at: None,
                cancellation_reason: None,
                modified_at: None,
                original_stay: None,
            });
            entity_map.insert(*id, *room_id);
        }
        Event::BookingConfirmed { id, .. } => {
            if let Some(booking) = room.booking_mut(*id) {
                booking.status = BookingStatus::Confirmed;
            }
        }
        Event::BookingCancelled { id, at, reason, .. } => {
            if let Some(booking) = room.booking_mut(*id) {
                booking.status = BookingStatus::Cancelled;
                booking.cancelled_at = Some(*at);
                booking.cancellation_reason = reason.clone();
            }
        }
        Event::BookingCompleted { id, .. } => {
            if let Some(booking) = room.booking_mut(*id) {
                booking.status = BookingStatus::Completed;
            }
        }
        Event::BookingRescheduled {
            id,
            stay,
            total,
            at,
            ..
        } => {
            // Remove + re-insert keeps the booking vec sorted by check-in.
            if let Some(mut booking) = room.remove_booking(*id) {
                let previous = booking.stay;
                booking.stay = *stay;
                booking.total = *total;
                booking.modified_at = Some(*at);
                if booking.original_stay.is_none() {
                    booking.original_stay = Some(previous);
                }
                room.insert_booking(booking);
            }
        }
        Event::BlockAdded {
            id,
            room_id,
            range,
            reason,
            note,
        } => {
            room.insert_block(Block {
                id: *id,
                range: *range,
                reason: *reason,
                note: note.clone(),
            });
            entity_map.insert(*id, *room_id);
        }
        Event::BlockRemoved { id, .. } => {
            room.remove_block(*id);
            entity_map.remove(id);
        }
        Event::SeasonAdded {
            id,
            room_id,
            range,
            rate,
            label,
        } => {
            room.insert_season(Season {
                id: *id,
                range: *range,
                rate: *rate,
                label: label.clone(),
            });
            entity_map.insert(*id, *room_id);
        }
        Event::SeasonRemoved { id, .. } => {
            room.remove_season(*id);
            entity_map.remove(id);
        }
        // RoomRegistered is handled at the DashMap level, not here
        Event::RoomRegistered { .. } => {}
    }
}

impl Engine {
    pub fn new(wal_path: PathBuf, directory: Arc<dyn UserDirectory>) -> std::io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            rooms: DashMap::new(),
            wal_tx,
            entity_to_room: DashMap::new(),
            directory,
        };

        // Replay: we're the sole owner of these Arcs, so try_write always
        // succeeds instantly (no contention). Never use blocking_write here
        // because this may run inside an async context.
        for event in &events {
            match event {
                Event::RoomRegistered {
                    id,
                    hotel_id,
                    owner_id,
                    name,
                    base_rate,
                    capacity,
                    open,
                } => {
                    let mut room = RoomState::new(
                        *id,
                        *hotel_id,
                        *owner_id,
                        name.clone(),
                        *base_rate,
                        *capacity,
                    );
                    room.open = *open;
                    engine.rooms.insert(*id, Arc::new(RwLock::new(room)));
                }
                other => {
                    if let Some(room_id) = event_room_id(other)
                        && let Some(entry) = engine.rooms.get(&room_id)
                    {
                        let room_arc = entry.clone();
                        let mut guard = room_arc.try_write().expect("replay: uncontended write");
                        apply_to_room(&mut guard, other, &engine.entity_to_room);
                    }
                }
            }
        }

        Ok(engine)
    }

    /// Write event to WAL via the background group-commit writer.
    async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub fn get_room(&self, id: &Ulid) -> Option<SharedRoomState> {
        self.rooms.get(id).map(|e| e.value().clone())
    }

    pub fn get_room_for_entity(&self, entity_id: &Ulid) -> Option<Ulid> {
        self.entity_to_room.get(entity_id).map(|e| *e.value())
    }

    /// WAL-append + apply in one call. The caller holds the room's write
    /// lock across validate + persist + apply, so no other writer can slip
    /// a conflicting change in between.
    pub(super) async fn persist_and_apply(
        &self,
        room: &mut RoomState,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        apply_to_room(room, event, &self.entity_to_room);
        Ok(())
    }

    /// Lookup entity → room, get room, acquire write lock.
    pub(super) async fn resolve_entity_write(
        &self,
        entity_id: &Ulid,
    ) -> Result<(Ulid, tokio::sync::OwnedRwLockWriteGuard<RoomState>), EngineError> {
        let room_id = self
            .get_room_for_entity(entity_id)
            .ok_or(EngineError::NotFound(*entity_id))?;
        let room = self
            .get_room(&room_id)
            .ok_or(EngineError::NotFound(room_id))?;
        let guard = room.write_owned().await;
        Ok((room_id, guard))
    }
}

/// Extract the room id from an event (for non-Register events).
fn event_room_id(event: &Event) -> Option<Ulid> {
    match event {
        Event::BookingCreated { room_id, .. }
        | Event::BookingConfirmed { room_id, .. }
        | Event::BookingCancelled { room_id, .. }
        | Event::BookingCompleted { room_id, .. }
        | Event::BookingRescheduled { room_id, .. }
        | Event::BlockAdded { room_id, .. }
        | Event::BlockRemoved { room_id, .. }
        | Event::SeasonAdded { room_id, .. }
        | Event::SeasonRemoved { room_id, .. } => Some(*room_id),
        Event::RoomUpdated { id, .. } => Some(*id),
        Event::RoomRegistered { .. } => None,
    }
}
