//! Process-wide room registry.

use crate::error::RoomError;
use crate::room::{GameSnapshot, Room, RoomId};
use duelroom_rules::{RuleSet, TicTacToe};
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

/// Default length of generated room codes.
pub const DEFAULT_ROOM_CODE_LENGTH: usize = 6;

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

type SharedRoom = Arc<Mutex<Room>>;

/// Owns every room. Callers hold only [`RoomId`]s.
///
/// Cloning is cheap and yields a handle to the same registry. The map lock
/// is held only for insert, lookup, removal and listing; room mutations take
/// the room's own lock. A room lock is never held while taking the map lock.
#[derive(Debug, Clone)]
pub struct RoomRegistry {
    rooms: Arc<Mutex<HashMap<RoomId, SharedRoom>>>,
    next_sequence: Arc<AtomicU64>,
    rules: Arc<dyn RuleSet>,
    code_length: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Generates a random uppercase alphanumeric code.
pub fn generate_room_code(length: usize) -> RoomId {
    let mut rng = rand::rng();
    let code: String = (0..length)
        .map(|_| ROOM_CODE_ALPHABET[rng.random_range(0..ROOM_CODE_ALPHABET.len())] as char)
        .collect();
    RoomId::from(code)
}

impl RoomRegistry {
    /// Creates an empty registry whose rooms use `rules`.
    #[instrument(skip(rules), fields(rules = rules.name()))]
    pub fn new(rules: Arc<dyn RuleSet>, code_length: usize) -> Self {
        info!(code_length, "Creating room registry");
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            next_sequence: Arc::new(AtomicU64::new(0)),
            rules,
            code_length,
        }
    }

    /// Allocates a fresh, empty room and returns its id.
    ///
    /// The code is regenerated until it does not collide with a live room.
    pub fn create_room(&self) -> RoomId {
        self.create_room_with(|_| ()).0
    }

    /// Allocates a fresh room and runs `seat` on it before it is published.
    ///
    /// No other caller can reach the room until `seat` returns, so a creator
    /// seated here always holds the first seat.
    #[instrument(skip(self, seat))]
    pub fn create_room_with<R>(&self, seat: impl FnOnce(&mut Room) -> R) -> (RoomId, R) {
        let mut rooms = lock(&self.rooms);
        let id = loop {
            let candidate = generate_room_code(self.code_length);
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
            warn!(room_id = %candidate, "Room code collision, regenerating");
        };
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let mut room = Room::new(id.clone(), sequence, Arc::clone(&self.rules));
        let seated = seat(&mut room);
        rooms.insert(id.clone(), Arc::new(Mutex::new(room)));
        info!(room_id = %id, total = rooms.len(), "Registered room");
        (id, seated)
    }

    fn lookup(&self, id: &str) -> Result<SharedRoom, RoomError> {
        lock(&self.rooms)
            .get(id)
            .cloned()
            .ok_or_else(|| RoomError::RoomNotFound(RoomId::from(id)))
    }

    /// Runs `f` under the room's lock.
    ///
    /// Closed rooms (last participant gone, removal pending) report
    /// `RoomNotFound`.
    pub fn with_room<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Room) -> R,
    ) -> Result<R, RoomError> {
        let shared = self.lookup(id)?;
        let mut room = lock(&shared);
        if room.is_closed() {
            return Err(RoomError::RoomNotFound(room.id().clone()));
        }
        Ok(f(&mut *room))
    }

    /// Returns the room's current board state.
    #[instrument(skip(self))]
    pub fn get(&self, id: &str) -> Result<GameSnapshot, RoomError> {
        self.with_room(id, |room| room.snapshot())
    }

    /// True if a live room has this id.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_ok()
    }

    /// Ids of rooms with exactly one participant, oldest first.
    #[instrument(skip(self))]
    pub fn list_joinable(&self) -> Vec<RoomId> {
        let rooms = lock(&self.rooms);
        let mut joinable: Vec<(u64, RoomId)> = rooms
            .values()
            .filter_map(|shared| {
                let room = lock(shared);
                room.is_joinable()
                    .then(|| (room.sequence(), room.id().clone()))
            })
            .collect();
        joinable.sort_unstable_by_key(|(sequence, _)| *sequence);
        debug!(count = joinable.len(), "Listed joinable rooms");
        joinable.into_iter().map(|(_, id)| id).collect()
    }

    /// Deletes a room. Called once its last participant left.
    #[instrument(skip(self))]
    pub fn remove(&self, id: &str) -> bool {
        let removed = lock(&self.rooms).remove(id).is_some();
        if removed {
            info!(room_id = id, "Removed room");
        } else {
            debug!(room_id = id, "Room already removed");
        }
        removed
    }

    /// Number of registered rooms.
    pub fn room_count(&self) -> usize {
        lock(&self.rooms).len()
    }

    /// Rule set shared by every room.
    pub fn rules(&self) -> &Arc<dyn RuleSet> {
        &self.rules
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(Arc::new(TicTacToe), DEFAULT_ROOM_CODE_LENGTH)
    }
}
