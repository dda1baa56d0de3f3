use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use crate::character::{Player, PlayerClass};
use crate::dungeon::Dungeon;
use crate::error::{GameError, StoreError};

/// One of the three independent progress slots of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SaveSlot(u8);

impl SaveSlot {
    pub const FIRST: u8 = 1;
    pub const LAST: u8 = 3;

    pub fn new(slot: u8) -> Result<Self, GameError> {
        if (Self::FIRST..=Self::LAST).contains(&slot) {
            Ok(Self(slot))
        } else {
            Err(GameError::InvalidSlot(slot))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = SaveSlot> {
        (Self::FIRST..=Self::LAST).map(SaveSlot)
    }
}

impl TryFrom<u8> for SaveSlot {
    type Error = GameError;

    fn try_from(slot: u8) -> Result<Self, Self::Error> {
        SaveSlot::new(slot)
    }
}

impl From<SaveSlot> for u8 {
    fn from(slot: SaveSlot) -> Self {
        slot.0
    }
}

impl fmt::Display for SaveSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SaveKey {
    pub user: String,
    pub slot: SaveSlot,
}

impl SaveKey {
    pub fn new(user: &str, slot: u8) -> Result<Self, GameError> {
        Ok(Self {
            user: user.to_string(),
            slot: SaveSlot::new(slot)?,
        })
    }
}

impl fmt::Display for SaveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/slot{}", self.user, self.slot)
    }
}

/// What the slot select screen shows for an occupied slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSummary {
    pub slot: u8,
    pub name: String,
    pub player_class: PlayerClass,
    pub level: u32,
    pub floor: u32,
    pub health: u32,
}

impl SlotSummary {
    fn of(slot: SaveSlot, player: &Player) -> Self {
        Self {
            slot: slot.get(),
            name: player.name.clone(),
            player_class: player.player_class,
            level: player.level,
            floor: player.dungeon_floor,
            health: player.health,
        }
    }
}

/// Load/save of the Player and Dungeon aggregates of one save.
///
/// `save_game` commits both aggregates as a single unit; a store must never
/// leave one written without the other.
pub trait SaveStore {
    fn load_player(&self, key: &SaveKey) -> Result<Option<Player>, StoreError>;
    fn save_player(&mut self, key: &SaveKey, player: &Player) -> Result<(), StoreError>;
    fn load_dungeon(&self, key: &SaveKey) -> Result<Option<Dungeon>, StoreError>;
    fn save_dungeon(&mut self, key: &SaveKey, dungeon: &Dungeon) -> Result<(), StoreError>;
    fn save_game(&mut self, key: &SaveKey, player: &Player, dungeon: &Dungeon) -> Result<(), StoreError>;

    fn list_slots(&self, user: &str) -> Result<Vec<SlotSummary>, StoreError> {
        let mut slots = Vec::new();
        for slot in SaveSlot::all() {
            let key = SaveKey { user: user.to_string(), slot };
            if let Some(player) = self.load_player(&key)? {
                slots.push(SlotSummary::of(slot, &player));
            }
        }
        Ok(slots)
    }
}

/// The on-disk document for one save.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveRecord {
    #[serde(default)]
    pub player: Option<Player>,
    #[serde(default)]
    pub dungeon: Option<Dungeon>,
    #[serde(default)]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// One JSON document per save, named after a hash of the user so any
/// identity maps to a safe file name.
pub struct FileSaveStore {
    directory: PathBuf,
}

impl FileSaveStore {
    pub fn new(directory: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(directory)?;
        Ok(Self {
            directory: directory.to_path_buf(),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn path_for(&self, key: &SaveKey) -> PathBuf {
        let digest = Sha256::digest(key.user.as_bytes());
        self.directory.join(format!("{}_slot{}.json", hex::encode(digest), key.slot))
    }

    fn read_record(&self, key: &SaveKey) -> Result<Option<SaveRecord>, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read_to_string(&path)?;
        let record = serde_json::from_str(&data)?;
        Ok(Some(record))
    }

    fn write_record(&self, key: &SaveKey, mut record: SaveRecord) -> Result<(), StoreError> {
        record.updated_at = Some(chrono::Utc::now());
        let content = serde_json::to_string_pretty(&record)?;

        // Write to a temporary file first, then rename over the old save
        let path = self.path_for(key);
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &path)?;

        debug!(save = %key, path = %path.display(), "wrote save record");
        Ok(())
    }
}

impl SaveStore for FileSaveStore {
    fn load_player(&self, key: &SaveKey) -> Result<Option<Player>, StoreError> {
        Ok(self.read_record(key)?.and_then(|record| record.player))
    }

    fn save_player(&mut self, key: &SaveKey, player: &Player) -> Result<(), StoreError> {
        let mut record = self.read_record(key)?.unwrap_or_default();
        record.player = Some(player.clone());
        self.write_record(key, record)
    }

    fn load_dungeon(&self, key: &SaveKey) -> Result<Option<Dungeon>, StoreError> {
        Ok(self.read_record(key)?.and_then(|record| record.dungeon))
    }

    fn save_dungeon(&mut self, key: &SaveKey, dungeon: &Dungeon) -> Result<(), StoreError> {
        let mut record = self.read_record(key)?.unwrap_or_default();
        record.dungeon = Some(dungeon.clone());
        self.write_record(key, record)
    }

    fn save_game(&mut self, key: &SaveKey, player: &Player, dungeon: &Dungeon) -> Result<(), StoreError> {
        let record = SaveRecord {
            player: Some(player.clone()),
            dungeon: Some(dungeon.clone()),
            updated_at: None,
        };
        self.write_record(key, record)
    }
}

#[derive(Debug, Default)]
pub struct MemorySaveStore {
    players: HashMap<SaveKey, Player>,
    dungeons: HashMap<SaveKey, Dungeon>,
}

impl MemorySaveStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SaveStore for MemorySaveStore {
    fn load_player(&self, key: &SaveKey) -> Result<Option<Player>, StoreError> {
        Ok(self.players.get(key).cloned())
    }

    fn save_player(&mut self, key: &SaveKey, player: &Player) -> Result<(), StoreError> {
        self.players.insert(key.clone(), player.clone());
        Ok(())
    }

    fn load_dungeon(&self, key: &SaveKey) -> Result<Option<Dungeon>, StoreError> {
        Ok(self.dungeons.get(key).cloned())
    }

    fn save_dungeon(&mut self, key: &SaveKey, dungeon: &Dungeon) -> Result<(), StoreError> {
        self.dungeons.insert(key.clone(), dungeon.clone());
        Ok(())
    }

    fn save_game(&mut self, key: &SaveKey, player: &Player, dungeon: &Dungeon) -> Result<(), StoreError> {
        self.players.insert(key.clone(), player.clone());
        self.dungeons.insert(key.clone(), dungeon.clone());
        Ok(())
    }
}
