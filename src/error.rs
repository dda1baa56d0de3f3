use thiserror::Error;
use crate::dungeon::{Direction, RoomId};

/// Invalid player input. Always recovered locally: the turn is rejected and
/// nothing is mutated or persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("You can't go {0} from here.")]
    IllegalMove(Direction),
    #[error("You don't know a skill called '{0}'.")]
    UnknownSkill(String),
    #[error("You don't have any health potions left.")]
    NoPotions,
    #[error("{0} blocks your way. You can't leave while in combat!")]
    InCombat(String),
    #[error("There is nothing here to fight.")]
    NotInCombat,
    #[error("There are no stairs leading down in this room.")]
    NotAtExit,
    #[error("There is no merchant here.")]
    NotAtMerchant,
    #[error("'{0}' isn't available.")]
    UnknownItem(String),
    #[error("You need {needed} gold but only have {available}.")]
    InsufficientGold { needed: u32, available: u32 },
    #[error("Your pack is full. You can't carry '{0}'.")]
    InventoryFull(String),
    #[error("The merchant can't afford '{0}'.")]
    MerchantCannotPay(String),
    #[error("You have fallen. Your journey is over.")]
    Fallen,
    #[error("Unrecognised action '{0}'.")]
    Unrecognised(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("save store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("save record could not be encoded or decoded: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("save store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("no saved game in slot {slot} for '{user}'")]
    NoSave { user: String, slot: u8 },
    #[error("save slot must be between 1 and 3, got {0}")]
    InvalidSlot(u8),
    #[error("cannot build a {width}x{height} dungeon with {rooms} rooms")]
    InvalidDimensions { width: i32, height: i32, rooms: usize },
    #[error("dungeon snapshot is corrupt: {0}")]
    CorruptDungeon(String),
    #[error("player stands in room {0} which does not exist on this floor")]
    PlayerOffMap(RoomId),
    /// Invalid input inside a turn. The engine turns this into a rejected
    /// response before it reaches a caller.
    #[error(transparent)]
    Rejected(#[from] ActionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
