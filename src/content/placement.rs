use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;
use tracing::{debug, warn};
use crate::character::{Enemy, Merchant};
use crate::config::PlacementSettings;
use crate::dungeon::{roll, Dungeon, Encounter, RoomId};
use super::ContentRepository;

pub const FALLBACK_ROOM: &str = "A dim, featureless chamber.";
pub const FALLBACK_MERCHANT: &str = "A merchant nods as you approach.";

fn fallback_entrance(floor_level: u32) -> String {
    format!("You stand at the entrance to floor {}.", floor_level)
}

fn fallback_exit(floor_level: u32) -> String {
    format!("Stairs lead down from floor {}.", floor_level)
}

fn fallback_appearance(enemy: &str) -> String {
    format!("A {} blocks your path.", enemy)
}

/// Draws lines from a pool while avoiding handing out the same line twice in
/// a row. After `attempts` draws a repeat is accepted.
#[derive(Debug, Clone)]
pub struct DescriptionPicker {
    attempts: u32,
    last: Option<String>,
}

impl DescriptionPicker {
    pub fn new(attempts: u32) -> Self {
        Self { attempts: attempts.max(1), last: None }
    }

    pub fn pick<R: Rng + ?Sized>(&mut self, pool: &[String], rng: &mut R) -> Option<String> {
        let mut choice = pool.choose(rng)?;
        let mut tries = 1;

        while pool.len() > 1 && Some(choice) == self.last.as_ref() && tries < self.attempts {
            choice = pool.choose(rng)?;
            tries += 1;
        }

        self.last = Some(choice.clone());
        Some(choice.clone())
    }

    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }
}

/// Annotates a generated floor with descriptions, enemy encounters and the
/// merchant's stock.
pub fn place_content<C, R>(dungeon: &mut Dungeon, content: &C, settings: &PlacementSettings, rng: &mut R)
where
    C: ContentRepository + ?Sized,
    R: Rng + ?Sized,
{
    let floor = dungeon.floor_level;
    let ids: Vec<RoomId> = dungeon.room_ids().collect();

    let mut rooms = DescriptionPicker::new(settings.description_attempts);
    let room_pool = content.room_descriptions(floor);
    for &id in &ids {
        if let Some(room) = dungeon.room_mut(id) {
            if room.description.is_none() {
                let text = rooms.pick(room_pool, rng).unwrap_or_else(|| FALLBACK_ROOM.to_string());
                room.description = Some(text);
            }
        }
    }

    let exit_text = DescriptionPicker::new(settings.description_attempts)
        .pick(content.exit_descriptions(floor), rng)
        .unwrap_or_else(|| fallback_exit(floor));
    let entrance_text = DescriptionPicker::new(settings.description_attempts)
        .pick(content.entrance_descriptions(floor), rng)
        .unwrap_or_else(|| fallback_entrance(floor));

    // The entrance wins on a single-room floor.
    let (start, exit) = (dungeon.start, dungeon.exit);
    if let Some(room) = dungeon.room_mut(exit) {
        room.description = Some(exit_text);
    }
    if let Some(room) = dungeon.room_mut(start) {
        room.description = Some(entrance_text);
    }

    if let Some(merchant_room) = dungeon.merchant {
        let greeting = DescriptionPicker::new(settings.description_attempts)
            .pick(content.merchant_descriptions(), rng)
            .unwrap_or_else(|| FALLBACK_MERCHANT.to_string());
        if let Some(room) = dungeon.room_mut(merchant_room) {
            room.description = Some(greeting);
        }
        if dungeon.merchant_stock.is_none() {
            dungeon.merchant_stock = Some(Merchant::stock_for_floor(floor, content, rng));
        }
    }

    let names = content.enemy_names(floor);
    let mut appearances: HashMap<String, DescriptionPicker> = HashMap::new();
    let mut placed = 0;

    for &id in &ids {
        if id == start || id == exit || dungeon.is_merchant(id) {
            continue;
        }
        if dungeon.encounter(id).is_some() || !roll(rng, settings.encounter_chance) {
            continue;
        }
        let Some(&name) = names.choose(rng) else {
            continue;
        };
        let Some(template) = content.enemy(floor, name) else {
            warn!(floor, enemy = name, "enemy listed without stats, skipping encounter");
            continue;
        };

        let enemy = Enemy::from_template(name, template);
        let appearance = appearances
            .entry(name.to_string())
            .or_insert_with(|| DescriptionPicker::new(settings.description_attempts))
            .pick(content.enemy_descriptions(floor, name), rng)
            .unwrap_or_else(|| fallback_appearance(name));

        if let Some(room) = dungeon.room_mut(id) {
            room.encounter = Some(Encounter { enemy, appearance: Some(appearance) });
            placed += 1;
        }
    }

    debug!(floor, encounters = placed, merchant = ?dungeon.merchant, "placed content");
}
