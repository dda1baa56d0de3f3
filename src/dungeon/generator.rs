use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;
use crate::config::DungeonSettings;
use crate::error::GameError;
use super::{roll, Direction, Dungeon, RoomCoord, RoomId};

pub struct DungeonGenerator {
    settings: DungeonSettings,
}

impl DungeonGenerator {
    pub fn new(settings: DungeonSettings) -> Self {
        Self { settings }
    }

    /// Builds a floor using the configured grid size and room schedule.
    pub fn generate_floor<R: Rng + ?Sized>(&self, floor_level: u32, rng: &mut R) -> Result<Dungeon, GameError> {
        let rooms = self.settings.rooms_for_floor(floor_level);
        self.generate(self.settings.width, self.settings.height, rooms, floor_level, rng)
    }

    /// Randomized depth-first growth from a random cell, followed by an extra
    /// connectivity pass and start/exit/merchant selection.
    ///
    /// A grid too small for `num_rooms` (or a growth that runs out of
    /// frontier) yields fewer rooms than requested.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        width: i32,
        height: i32,
        num_rooms: usize,
        floor_level: u32,
        rng: &mut R,
    ) -> Result<Dungeon, GameError> {
        if width <= 0 || height <= 0 || num_rooms == 0 {
            return Err(GameError::InvalidDimensions { width, height, rooms: num_rooms });
        }

        let mut dungeon = Dungeon::empty(width, height, num_rooms, floor_level);
        self.grow_rooms(&mut dungeon, rng);
        self.connect_extra_paths(&mut dungeon, rng);
        self.choose_start_and_exit(&mut dungeon, rng);
        self.choose_merchant(&mut dungeon, rng);

        debug!(
            floor = floor_level,
            requested = num_rooms,
            placed = dungeon.room_count(),
            start = dungeon.start,
            exit = dungeon.exit,
            merchant = ?dungeon.merchant,
            "generated dungeon floor"
        );

        Ok(dungeon)
    }

    fn grow_rooms<R: Rng + ?Sized>(&self, dungeon: &mut Dungeon, rng: &mut R) {
        let origin = RoomCoord::new(rng.gen_range(0..dungeon.width), rng.gen_range(0..dungeon.height));
        let first = dungeon.add_room(origin);

        let mut stack: Vec<(RoomCoord, RoomId)> = vec![(origin, first)];
        let mut directions = Direction::ALL;

        while let Some(&(coord, current)) = stack.last() {
            if dungeon.room_count() >= dungeon.num_rooms {
                break;
            }

            directions.shuffle(rng);
            let mut placed = false;

            for direction in directions {
                let next = coord.step(direction);
                if !dungeon.in_bounds(next) || dungeon.room_at(next).is_some() {
                    continue;
                }

                let id = dungeon.add_room(next);
                dungeon.connect(current, id);
                stack.push((next, id));
                placed = true;

                // Dropping an older frontier entry forces earlier backtracking,
                // which turns one long corridor into branches.
                if roll(rng, self.settings.branch_chance) && stack.len() > 3 {
                    let victim = rng.gen_range(0..=stack.len() - 3);
                    stack.remove(victim);
                }
                break;
            }

            if !placed {
                stack.pop();
            }
        }
    }

    /// Adds loops between grid neighbours the spanning growth left unlinked.
    fn connect_extra_paths<R: Rng + ?Sized>(&self, dungeon: &mut Dungeon, rng: &mut R) {
        let ids: Vec<RoomId> = dungeon.room_ids().collect();

        for id in ids {
            let Some(coord) = dungeon.room(id).map(|room| room.coord) else {
                continue;
            };

            for direction in Direction::ALL {
                let Some(neighbor) = dungeon.room_at(coord.step(direction)) else {
                    continue;
                };

                if neighbor != id
                    && !dungeon.is_connected(id, neighbor)
                    && roll(rng, self.settings.extra_connection_chance)
                {
                    dungeon.connect(id, neighbor);
                }
            }
        }
    }

    fn choose_start_and_exit<R: Rng + ?Sized>(&self, dungeon: &mut Dungeon, rng: &mut R) {
        let min_id = dungeon.room_ids().next().unwrap_or(0);
        let max_id = dungeon.room_ids().last().unwrap_or(0);

        let start = if rng.gen_bool(0.5) { min_id } else { max_id };
        let exit = if start == max_id { min_id } else { max_id };

        dungeon.start = start;
        dungeon.exit = exit;
    }

    fn choose_merchant<R: Rng + ?Sized>(&self, dungeon: &mut Dungeon, rng: &mut R) {
        dungeon.merchant = None;
        if !roll(rng, self.settings.merchant_chance) {
            return;
        }

        let candidates: Vec<RoomId> = dungeon
            .room_ids()
            .filter(|&id| id != dungeon.start && id != dungeon.exit)
            .collect();

        dungeon.merchant = candidates.choose(rng).copied();
    }
}

impl Default for DungeonGenerator {
    fn default() -> Self {
        Self::new(DungeonSettings::default())
    }
}

/// Generates a floor with the default branching and merchant chances.
pub fn generate<R: Rng + ?Sized>(
    width: i32,
    height: i32,
    num_rooms: usize,
    floor_level: u32,
    rng: &mut R,
) -> Result<Dungeon, GameError> {
    DungeonGenerator::default().generate(width, height, num_rooms, floor_level, rng)
}
