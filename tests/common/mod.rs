#![allow(dead_code)]

use descent::character::{Enemy, Gear, Item, Merchant, Player, PlayerClass, Skill, StockItem};
use descent::config::GameConfig;
use descent::content::ContentTables;
use descent::database::{MemorySaveStore, SaveKey, SaveStore};
use descent::dungeon::{Dungeon, DungeonSnapshot, RoomCoord};
use descent::game::TurnEngine;
use std::collections::BTreeMap;

pub const USER: &str = "ayla";
pub const SLOT: u8 = 1;

pub const START: u32 = 0;
pub const LAIR: u32 = 1;
pub const EXIT: u32 = 2;
pub const SHOP: u32 = 3;

pub fn goblin() -> Enemy {
    Enemy::new("goblin", 8, 1, vec![Skill::new("Stab", 4)])
}

/// A hand-built floor:
///
/// ```text
/// [0 start] [1 goblin] [2 exit]
/// [3 shop ]
/// ```
pub fn arena(enemy: Enemy) -> Dungeon {
    let at = |x, y| RoomCoord::new(x, y);
    let snapshot = DungeonSnapshot {
        width: 3,
        height: 2,
        num_rooms: 4,
        floor_level: 1,
        room_positions: BTreeMap::from([(START, at(0, 0)), (LAIR, at(1, 0)), (EXIT, at(2, 0)), (SHOP, at(0, 1))]),
        connections: BTreeMap::from([
            (START, vec![LAIR, SHOP]),
            (LAIR, vec![START, EXIT]),
            (EXIT, vec![LAIR]),
            (SHOP, vec![START]),
        ]),
        start_location: (START, at(0, 0)),
        exit_location: (EXIT, at(2, 0)),
        merchant_location: Some((SHOP, at(0, 1))),
        room_descriptions: BTreeMap::from([
            (START, "The entrance hall.".to_string()),
            (LAIR, "A foul-smelling den.".to_string()),
            (EXIT, "Stairs lead down.".to_string()),
            (SHOP, "A merchant waves you closer.".to_string()),
        ]),
        room_enemy_descriptions: BTreeMap::from([(LAIR, format!("A {} leers at you.", enemy.name))]),
        room_enemies: BTreeMap::from([(LAIR, enemy)]),
        merchant_inventory: Some(Merchant {
            gold: 30,
            stock: vec![
                StockItem { name: "health potion".to_string(), value: 3, quantity: Some(2) },
                StockItem { name: "iron dagger".to_string(), value: 6, quantity: None },
            ],
        }),
    };
    Dungeon::from_snapshot(snapshot).unwrap()
}

pub fn warrior() -> Player {
    let mut player = Player::new("Ayla", PlayerClass::Warrior, vec![Skill::new("Slash", 6)], SLOT);
    player.inventory.add_item(Item::Gear(Gear::new("bone charm", 3)));
    player
}

pub fn key() -> SaveKey {
    SaveKey::new(USER, SLOT).unwrap()
}

pub fn engine_with<S: SaveStore>(mut store: S, player: &Player, dungeon: &Dungeon) -> TurnEngine<S, ContentTables> {
    store.save_game(&key(), player, dungeon).unwrap();
    TurnEngine::with_seed(store, ContentTables::builtin().unwrap(), GameConfig::default(), 42)
}

pub fn engine() -> TurnEngine<MemorySaveStore, ContentTables> {
    engine_with(MemorySaveStore::new(), &warrior(), &arena(goblin()))
}

pub fn saved<S: SaveStore>(engine: &TurnEngine<S, ContentTables>) -> (Player, Dungeon) {
    let store = engine.store();
    (
        store.load_player(&key()).unwrap().unwrap(),
        store.load_dungeon(&key()).unwrap().unwrap(),
    )
}
