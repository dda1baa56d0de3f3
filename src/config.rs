use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use anyhow::{Result, Context};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub dungeon: DungeonSettings,
    pub placement: PlacementSettings,
    pub loot: LootSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DungeonSettings {
    pub width: i32,
    pub height: i32,
    pub base_rooms: usize,
    pub rooms_per_floor: usize,
    pub max_rooms: usize,
    pub branch_chance: f64,            // Chance to abandon an older frontier room
    pub extra_connection_chance: f64,  // Chance to link two adjacent, unlinked rooms
    pub merchant_chance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementSettings {
    pub encounter_chance: f64,
    pub description_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LootSettings {
    pub min_items: usize,
    pub max_items: usize,
    pub gear_chance: f64,
    pub max_gear: usize,
    pub gold_min: u32,
    pub gold_max: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            dungeon: DungeonSettings::default(),
            placement: PlacementSettings::default(),
            loot: LootSettings::default(),
        }
    }
}

impl Default for DungeonSettings {
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
            base_rooms: 8,
            rooms_per_floor: 2,
            max_rooms: 20,
            branch_chance: 0.4,
            extra_connection_chance: 0.3,
            merchant_chance: 0.7,
        }
    }
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            encounter_chance: 0.65,
            description_attempts: 10,
        }
    }
}

impl Default for LootSettings {
    fn default() -> Self {
        Self {
            min_items: 0,
            max_items: 2,
            gear_chance: 0.25,
            max_gear: 2,
            gold_min: 0,
            gold_max: 10,
        }
    }
}

impl DungeonSettings {
    /// Rooms requested for a floor; deeper floors grow until `max_rooms`.
    pub fn rooms_for_floor(&self, floor_level: u32) -> usize {
        let extra = self.rooms_per_floor * floor_level.saturating_sub(1) as usize;
        (self.base_rooms + extra).min(self.max_rooms).max(1)
    }
}

impl GameConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read game config from {}", path.display()))?;

        let config: GameConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse game config {}", path.display()))?;

        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_schedule_grows_and_caps() {
        let settings = DungeonSettings::default();
        assert_eq!(settings.rooms_for_floor(1), 8);
        assert_eq!(settings.rooms_for_floor(2), 10);
        assert_eq!(settings.rooms_for_floor(50), 20);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: GameConfig = serde_json::from_str(r#"{"dungeon": {"width": 6}}"#).unwrap();
        assert_eq!(config.dungeon.width, 6);
        assert_eq!(config.dungeon.height, 10);
        assert_eq!(config.placement.description_attempts, 10);
        assert_eq!(config.loot.gold_max, 10);
    }
}
