use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use crate::character::{Enemy, Merchant};
use crate::error::GameError;
use super::{Dungeon, Encounter, Room, RoomCoord, RoomId};

/// The persisted and transmitted form of a floor. Room ids are string keys
/// once encoded as JSON; locations are `[id, [x, y]]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DungeonSnapshot {
    pub width: i32,
    pub height: i32,
    pub num_rooms: usize,
    pub floor_level: u32,
    pub room_positions: BTreeMap<RoomId, RoomCoord>,
    pub connections: BTreeMap<RoomId, Vec<RoomId>>,
    pub start_location: (RoomId, RoomCoord),
    pub exit_location: (RoomId, RoomCoord),
    #[serde(default)]
    pub merchant_location: Option<(RoomId, RoomCoord)>,
    #[serde(default)]
    pub room_descriptions: BTreeMap<RoomId, String>,
    #[serde(default)]
    pub room_enemies: BTreeMap<RoomId, Enemy>,
    #[serde(default)]
    pub room_enemy_descriptions: BTreeMap<RoomId, String>,
    #[serde(default)]
    pub merchant_inventory: Option<Merchant>,
}

impl From<&Dungeon> for DungeonSnapshot {
    fn from(dungeon: &Dungeon) -> Self {
        let mut room_positions = BTreeMap::new();
        let mut connections = BTreeMap::new();
        let mut room_descriptions = BTreeMap::new();
        let mut room_enemies = BTreeMap::new();
        let mut room_enemy_descriptions = BTreeMap::new();

        for room in dungeon.rooms() {
            room_positions.insert(room.id, room.coord);
            connections.insert(room.id, room.connections.iter().copied().collect());
            if let Some(description) = &room.description {
                room_descriptions.insert(room.id, description.clone());
            }
            if let Some(encounter) = &room.encounter {
                room_enemies.insert(room.id, encounter.enemy.clone());
                if let Some(appearance) = &encounter.appearance {
                    room_enemy_descriptions.insert(room.id, appearance.clone());
                }
            }
        }

        let locate = |id: RoomId| (id, room_positions.get(&id).copied().unwrap_or(RoomCoord::new(0, 0)));
        let start_location = locate(dungeon.start);
        let exit_location = locate(dungeon.exit);
        let merchant_location = dungeon.merchant.map(locate);

        DungeonSnapshot {
            width: dungeon.width,
            height: dungeon.height,
            num_rooms: dungeon.num_rooms,
            floor_level: dungeon.floor_level,
            start_location,
            exit_location,
            merchant_location,
            room_positions,
            connections,
            room_descriptions,
            room_enemies,
            room_enemy_descriptions,
            merchant_inventory: dungeon.merchant_stock.clone(),
        }
    }
}

impl From<Dungeon> for DungeonSnapshot {
    fn from(dungeon: Dungeon) -> Self {
        DungeonSnapshot::from(&dungeon)
    }
}

impl TryFrom<DungeonSnapshot> for Dungeon {
    type Error = GameError;

    /// Rebuilds rooms, connection lists and the coordinate index together,
    /// rejecting snapshots that break the floor's invariants.
    fn try_from(snapshot: DungeonSnapshot) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| GameError::CorruptDungeon(reason);

        if snapshot.room_positions.is_empty() {
            return Err(corrupt("dungeon has no rooms".to_string()));
        }

        let mut dungeon = Dungeon::empty(snapshot.width, snapshot.height, snapshot.num_rooms, snapshot.floor_level);
        let mut occupied = BTreeSet::new();

        for (&id, &coord) in &snapshot.room_positions {
            if !dungeon.in_bounds(coord) {
                return Err(corrupt(format!("room {} at {:?} lies outside the grid", id, coord)));
            }
            if !occupied.insert(coord) {
                return Err(corrupt(format!("room {} shares cell {:?} with another room", id, coord)));
            }
            dungeon.insert_room(Room {
                id,
                coord,
                connections: BTreeSet::new(),
                description: snapshot.room_descriptions.get(&id).cloned(),
                encounter: None,
            });
        }

        for (&id, neighbors) in &snapshot.connections {
            let Some(coord) = snapshot.room_positions.get(&id) else {
                return Err(corrupt(format!("connections listed for unknown room {}", id)));
            };
            for neighbor in neighbors {
                let Some(other) = snapshot.room_positions.get(neighbor) else {
                    return Err(corrupt(format!("room {} connects to unknown room {}", id, neighbor)));
                };
                if !coord.is_adjacent(other) {
                    return Err(corrupt(format!("rooms {} and {} are connected but not adjacent", id, neighbor)));
                }
                dungeon.connect(id, *neighbor);
            }
        }

        for (id, enemy) in snapshot.room_enemies {
            let appearance = snapshot.room_enemy_descriptions.get(&id).cloned();
            match dungeon.room_mut(id) {
                Some(room) => room.encounter = Some(Encounter { enemy, appearance }),
                None => return Err(corrupt(format!("enemy placed in unknown room {}", id))),
            }
        }

        let check_location = |label: &str, (id, coord): (RoomId, RoomCoord)| {
            match snapshot.room_positions.get(&id) {
                Some(found) if *found == coord => Ok(id),
                Some(found) => Err(corrupt(format!("{} room {} recorded at {:?} but sits at {:?}", label, id, coord, found))),
                None => Err(corrupt(format!("{} room {} does not exist", label, id))),
            }
        };

        dungeon.start = check_location("start", snapshot.start_location)?;
        dungeon.exit = check_location("exit", snapshot.exit_location)?;
        dungeon.merchant = match snapshot.merchant_location {
            Some(location) => Some(check_location("merchant", location)?),
            None => None,
        };
        dungeon.merchant_stock = snapshot.merchant_inventory;

        if !dungeon.reachable_from(dungeon.start).contains(&dungeon.exit) {
            return Err(corrupt("exit is not reachable from the start".to_string()));
        }

        Ok(dungeon)
    }
}

impl Dungeon {
    pub fn to_snapshot(&self) -> DungeonSnapshot {
        DungeonSnapshot::from(self)
    }

    pub fn from_snapshot(snapshot: DungeonSnapshot) -> Result<Self, GameError> {
        Dungeon::try_from(snapshot)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Skill;
    use crate::dungeon::generate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn populated() -> Dungeon {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let mut dungeon = generate(6, 6, 10, 2, &mut rng).unwrap();
        let id = dungeon.room_ids().find(|&id| id != dungeon.start && id != dungeon.exit).unwrap();
        let room = dungeon.room_mut(id).unwrap();
        room.description = Some("Water drips from the ceiling.".to_string());
        room.encounter = Some(Encounter {
            enemy: Enemy::new("goblin", 8, 1, vec![Skill::new("stab", 2)]),
            appearance: Some("A goblin leers at you.".to_string()),
        });
        dungeon
    }

    #[test]
    fn json_round_trip_is_lossless() {
        let dungeon = populated();
        let json = dungeon.to_json().unwrap();
        let restored = Dungeon::from_json(&json).unwrap();
        assert_eq!(restored, dungeon);
        for room in dungeon.rooms() {
            assert_eq!(restored.room_at(room.coord), Some(room.id));
        }
    }

    #[test]
    fn persisted_shape_uses_string_keys_and_pairs() {
        let dungeon = populated();
        let value: serde_json::Value = serde_json::from_str(&dungeon.to_json().unwrap()).unwrap();

        let start = &value["start_location"];
        assert_eq!(start[0], serde_json::json!(dungeon.start));
        assert!(start[1].is_array());
        assert!(value["room_positions"]["0"].is_array());
        assert!(value["connections"]["0"].is_array());
        assert_eq!(value["floor_level"], serde_json::json!(2));
    }

    #[test]
    fn rejects_connections_between_distant_rooms() {
        let mut snapshot = populated().to_snapshot();
        let far = snapshot
            .room_positions
            .iter()
            .find(|(_, coord)| !coord.is_adjacent(&snapshot.room_positions[&0]) && **coord != snapshot.room_positions[&0])
            .map(|(&id, _)| id)
            .unwrap();
        snapshot.connections.get_mut(&0).unwrap().push(far);

        assert!(matches!(Dungeon::from_snapshot(snapshot), Err(GameError::CorruptDungeon(_))));
    }

    #[test]
    fn rejects_duplicate_cells() {
        let mut snapshot = populated().to_snapshot();
        let first = snapshot.room_positions[&0];
        snapshot.room_positions.insert(1, first);
        assert!(Dungeon::from_snapshot(snapshot).is_err());
    }

    #[test]
    fn rejects_mismatched_start_coordinate() {
        let mut snapshot = populated().to_snapshot();
        snapshot.start_location.1 = RoomCoord::new(-1, -1);
        assert!(Dungeon::from_snapshot(snapshot).is_err());
    }

    #[test]
    fn rejects_unreachable_exit() {
        let mut snapshot = populated().to_snapshot();
        for neighbors in snapshot.connections.values_mut() {
            neighbors.clear();
        }
        assert!(Dungeon::from_snapshot(snapshot).is_err());
    }
}
