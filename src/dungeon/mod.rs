use serde::{Deserialize, Serialize};
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use crate::character::{Enemy, Merchant};

pub mod generator;
pub mod persistence;

pub use generator::*;
pub use persistence::*;

pub type RoomId = u32;

/// Integer grid cell. Persisted as an `[x, y]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct RoomCoord {
    pub x: i32,
    pub y: i32,
}

impl RoomCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn is_adjacent(&self, other: &RoomCoord) -> bool {
        (self.x - other.x).abs() + (self.y - other.y).abs() == 1
    }
}

impl From<(i32, i32)> for RoomCoord {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl From<RoomCoord> for (i32, i32) {
    fn from(coord: RoomCoord) -> Self {
        (coord.x, coord.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::North, Direction::South, Direction::East, Direction::West];

    /// Grid offset; north is towards y = 0.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::North => "North",
            Direction::South => "South",
            Direction::East => "East",
            Direction::West => "West",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "north" | "n" => Ok(Direction::North),
            "south" | "s" => Ok(Direction::South),
            "east" | "e" => Ok(Direction::East),
            "west" | "w" => Ok(Direction::West),
            other => Err(format!("unknown direction '{}'", other)),
        }
    }
}

/// An enemy bound to a room until it is defeated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub enemy: Enemy,
    pub appearance: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub id: RoomId,
    pub coord: RoomCoord,
    pub connections: BTreeSet<RoomId>,
    pub description: Option<String>,
    pub encounter: Option<Encounter>,
}

impl Room {
    fn new(id: RoomId, coord: RoomCoord) -> Self {
        Self {
            id,
            coord,
            connections: BTreeSet::new(),
            description: None,
            encounter: None,
        }
    }
}

/// One floor of the dungeon.
///
/// `rooms` (with their connection lists) and `index` (coordinate to room id)
/// are only ever changed together through `add_room`, and are rebuilt
/// together when a snapshot is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "DungeonSnapshot", try_from = "DungeonSnapshot")]
pub struct Dungeon {
    pub width: i32,
    pub height: i32,
    pub num_rooms: usize,
    pub floor_level: u32,
    rooms: BTreeMap<RoomId, Room>,
    index: HashMap<RoomCoord, RoomId>,
    pub start: RoomId,
    pub exit: RoomId,
    pub merchant: Option<RoomId>,
    pub merchant_stock: Option<Merchant>,
}

impl Dungeon {
    pub(crate) fn empty(width: i32, height: i32, num_rooms: usize, floor_level: u32) -> Self {
        Self {
            width,
            height,
            num_rooms,
            floor_level,
            rooms: BTreeMap::new(),
            index: HashMap::new(),
            start: 0,
            exit: 0,
            merchant: None,
            merchant_stock: None,
        }
    }

    /// Places a new room at `coord` and returns its id. The caller guarantees
    /// the cell is in bounds and unoccupied.
    pub(crate) fn add_room(&mut self, coord: RoomCoord) -> RoomId {
        let id = self.rooms.len() as RoomId;
        self.rooms.insert(id, Room::new(id, coord));
        self.index.insert(coord, id);
        id
    }

    pub(crate) fn insert_room(&mut self, room: Room) {
        self.index.insert(room.coord, room.id);
        self.rooms.insert(room.id, room);
    }

    pub(crate) fn connect(&mut self, a: RoomId, b: RoomId) {
        if a == b {
            return;
        }
        if let Some(room) = self.rooms.get_mut(&a) {
            room.connections.insert(b);
        }
        if let Some(room) = self.rooms.get_mut(&b) {
            room.connections.insert(a);
        }
    }

    pub fn in_bounds(&self, coord: RoomCoord) -> bool {
        coord.x >= 0 && coord.x < self.width && coord.y >= 0 && coord.y < self.height
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub fn room_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(&id)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn room_ids(&self) -> impl Iterator<Item = RoomId> + '_ {
        self.rooms.keys().copied()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room_at(&self, coord: RoomCoord) -> Option<RoomId> {
        self.index.get(&coord).copied()
    }

    pub fn is_connected(&self, a: RoomId, b: RoomId) -> bool {
        self.rooms.get(&a).map(|room| room.connections.contains(&b)).unwrap_or(false)
    }

    /// Movement legality: the rooms on the four neighbouring grid cells.
    /// Unknown rooms have no exits.
    pub fn valid_directions(&self, room_id: RoomId) -> BTreeMap<Direction, RoomId> {
        let mut directions = BTreeMap::new();
        let Some(room) = self.rooms.get(&room_id) else {
            return directions;
        };

        for direction in Direction::ALL {
            if let Some(neighbor) = self.room_at(room.coord.step(direction)) {
                directions.insert(direction, neighbor);
            }
        }

        directions
    }

    /// Rooms reachable from `from` along stored connections.
    pub fn reachable_from(&self, from: RoomId) -> BTreeSet<RoomId> {
        let mut seen = BTreeSet::new();
        if !self.rooms.contains_key(&from) {
            return seen;
        }

        let mut queue = VecDeque::from([from]);
        seen.insert(from);
        while let Some(id) = queue.pop_front() {
            for &next in &self.rooms[&id].connections {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        seen
    }

    pub fn encounter(&self, room_id: RoomId) -> Option<&Encounter> {
        self.rooms.get(&room_id)?.encounter.as_ref()
    }

    pub fn clear_encounter(&mut self, room_id: RoomId) -> Option<Encounter> {
        self.rooms.get_mut(&room_id)?.encounter.take()
    }

    pub fn is_exit(&self, room_id: RoomId) -> bool {
        self.exit == room_id
    }

    pub fn is_merchant(&self, room_id: RoomId) -> bool {
        self.merchant == Some(room_id)
    }
}

/// Bernoulli roll tolerant of out-of-range configuration values.
pub(crate) fn roll<R: Rng + ?Sized>(rng: &mut R, chance: f64) -> bool {
    rng.gen_bool(chance.clamp(0.0, 1.0))
}
