use serde::{Deserialize, Serialize};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use crate::character::{Gear, PlayerClass, Skill};

pub mod placement;

pub use placement::*;

const BUILTIN_DESCRIPTIONS: &str = include_str!("../../data/descriptions.json");
const BUILTIN_ENEMIES: &str = include_str!("../../data/enemies.json");
const BUILTIN_LOOT: &str = include_str!("../../data/loot.json");
const BUILTIN_CLASS_SKILLS: &str = include_str!("../../data/class_skills.json");

/// Base stats an enemy is instantiated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyTemplate {
    pub health: u32,
    #[serde(default)]
    pub defense: u32,
    #[serde(default)]
    pub skills: Vec<Skill>,
}

/// An entry of a floor's consumable loot table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEntry {
    pub name: String,
    #[serde(default)]
    pub value: u32,
}

/// Read-only keyed access to the static game content.
///
/// Lookups never fail: a missing key yields an empty pool (or `None`) and
/// callers fall back to generic text.
pub trait ContentRepository {
    fn room_descriptions(&self, floor_level: u32) -> &[String];
    fn entrance_descriptions(&self, floor_level: u32) -> &[String];
    fn exit_descriptions(&self, floor_level: u32) -> &[String];
    fn merchant_descriptions(&self) -> &[String];

    /// Enemy names available on a floor, sorted.
    fn enemy_names(&self, floor_level: u32) -> Vec<&str>;
    fn enemy(&self, floor_level: u32, name: &str) -> Option<&EnemyTemplate>;
    fn enemy_descriptions(&self, floor_level: u32, name: &str) -> &[String];

    fn loot_items(&self, floor_level: u32) -> &[ItemEntry];
    fn loot_gear(&self, floor_level: u32) -> &[Gear];

    fn class_skills(&self, class: PlayerClass) -> Vec<Skill>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FloorDescriptions {
    #[serde(default)]
    pub rooms: Vec<String>,
    #[serde(default)]
    pub entrance: Vec<String>,
    #[serde(default)]
    pub exit: Vec<String>,
    #[serde(default)]
    pub enemies: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptionTable {
    #[serde(default)]
    pub merchant: Vec<String>,
    #[serde(flatten)]
    pub floors: BTreeMap<String, FloorDescriptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LootTable {
    #[serde(default)]
    pub items: BTreeMap<String, Vec<ItemEntry>>,
    #[serde(default)]
    pub gear: BTreeMap<String, Vec<Gear>>,
}

/// JSON-backed content: `floor_<N>` keyed descriptions and enemies,
/// `level_<N>` keyed loot and class keyed skill lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentTables {
    pub descriptions: DescriptionTable,
    pub enemies: BTreeMap<String, BTreeMap<String, EnemyTemplate>>,
    pub loot: LootTable,
    pub class_skills: BTreeMap<String, Vec<Skill>>,
}

const FLOOR_PREFIX: &str = "floor_";
const LEVEL_PREFIX: &str = "level_";

/// The `<prefix><N>` entry for a floor. Floors deeper than the tables reuse
/// the deepest entry defined below them.
fn by_floor<'a, V>(table: &'a BTreeMap<String, V>, prefix: &str, floor_level: u32) -> Option<&'a V> {
    if let Some(exact) = table.get(&format!("{}{}", prefix, floor_level)) {
        return Some(exact);
    }

    let deepest = table
        .iter()
        .filter_map(|(key, value)| Some((key.strip_prefix(prefix)?.parse::<u32>().ok()?, value)))
        .filter(|(level, _)| *level < floor_level)
        .max_by_key(|(level, _)| *level);

    if let Some((level, _)) = deepest {
        debug!(floor = floor_level, using = level, table = prefix, "reusing deepest defined floor");
    }
    deepest.map(|(_, value)| value)
}

impl ContentTables {
    /// The tables compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Ok(Self {
            descriptions: serde_json::from_str(BUILTIN_DESCRIPTIONS)
                .context("Failed to parse built-in descriptions")?,
            enemies: serde_json::from_str(BUILTIN_ENEMIES)
                .context("Failed to parse built-in enemies")?,
            loot: serde_json::from_str(BUILTIN_LOOT)
                .context("Failed to parse built-in loot")?,
            class_skills: serde_json::from_str(BUILTIN_CLASS_SKILLS)
                .context("Failed to parse built-in class skills")?,
        })
    }

    /// Loads `descriptions.json`, `enemies.json`, `loot.json` and
    /// `class_skills.json` from `dir`. Files that are absent keep the
    /// built-in table.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let mut tables = Self::builtin()?;

        if let Some(descriptions) = read_table(dir, "descriptions.json")? {
            tables.descriptions = descriptions;
        }
        if let Some(enemies) = read_table(dir, "enemies.json")? {
            tables.enemies = enemies;
        }
        if let Some(loot) = read_table(dir, "loot.json")? {
            tables.loot = loot;
        }
        if let Some(class_skills) = read_table(dir, "class_skills.json")? {
            tables.class_skills = class_skills;
        }

        Ok(tables)
    }

    fn floor(&self, floor_level: u32) -> Option<&FloorDescriptions> {
        let floor = by_floor(&self.descriptions.floors, FLOOR_PREFIX, floor_level);
        if floor.is_none() {
            warn!(floor = floor_level, "no descriptions for floor");
        }
        floor
    }
}

fn read_table<T: serde::de::DeserializeOwned>(dir: &Path, file: &str) -> Result<Option<T>> {
    let path = dir.join(file);
    if !path.exists() {
        warn!(path = %path.display(), "content file missing, using built-in table");
        return Ok(None);
    }

    let data = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read content from {}", path.display()))?;
    let table = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse content in {}", path.display()))?;
    Ok(Some(table))
}

impl ContentRepository for ContentTables {
    fn room_descriptions(&self, floor_level: u32) -> &[String] {
        self.floor(floor_level).map(|f| f.rooms.as_slice()).unwrap_or(&[])
    }

    fn entrance_descriptions(&self, floor_level: u32) -> &[String] {
        self.floor(floor_level).map(|f| f.entrance.as_slice()).unwrap_or(&[])
    }

    fn exit_descriptions(&self, floor_level: u32) -> &[String] {
        self.floor(floor_level).map(|f| f.exit.as_slice()).unwrap_or(&[])
    }

    fn merchant_descriptions(&self) -> &[String] {
        &self.descriptions.merchant
    }

    fn enemy_names(&self, floor_level: u32) -> Vec<&str> {
        match by_floor(&self.enemies, FLOOR_PREFIX, floor_level) {
            Some(enemies) => enemies.keys().map(String::as_str).collect(),
            None => {
                warn!(floor = floor_level, "no enemies for floor");
                Vec::new()
            }
        }
    }

    fn enemy(&self, floor_level: u32, name: &str) -> Option<&EnemyTemplate> {
        let template = by_floor(&self.enemies, FLOOR_PREFIX, floor_level)?.get(name);
        if template.is_none() {
            warn!(floor = floor_level, enemy = name, "unknown enemy");
        }
        template
    }

    fn enemy_descriptions(&self, floor_level: u32, name: &str) -> &[String] {
        self.floor(floor_level)
            .and_then(|f| f.enemies.get(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn loot_items(&self, floor_level: u32) -> &[ItemEntry] {
        by_floor(&self.loot.items, LEVEL_PREFIX, floor_level).map(Vec::as_slice).unwrap_or(&[])
    }

    fn loot_gear(&self, floor_level: u32) -> &[Gear] {
        by_floor(&self.loot.gear, LEVEL_PREFIX, floor_level).map(Vec::as_slice).unwrap_or(&[])
    }

    fn class_skills(&self, class: PlayerClass) -> Vec<Skill> {
        match self.class_skills.get(class.as_str()) {
            Some(skills) => skills.clone(),
            None => {
                warn!(class = %class, "no skills for class");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn builtin_tables_cover_the_first_floors() {
        let content = ContentTables::builtin().unwrap();
        for floor in 1..=3 {
            assert!(!content.room_descriptions(floor).is_empty());
            assert!(!content.entrance_descriptions(floor).is_empty());
            assert!(!content.exit_descriptions(floor).is_empty());
            assert!(!content.loot_items(floor).is_empty());
            assert!(!content.loot_gear(floor).is_empty());

            let names = content.enemy_names(floor);
            assert!(!names.is_empty());
            for name in names {
                let template = content.enemy(floor, name).unwrap();
                assert!(template.health > 0);
                assert!(!content.enemy_descriptions(floor, name).is_empty());
            }
        }
        assert!(!content.merchant_descriptions().is_empty());
    }

    #[test]
    fn every_class_has_skills() {
        let content = ContentTables::builtin().unwrap();
        for class in [PlayerClass::Mage, PlayerClass::Warrior, PlayerClass::Rogue] {
            assert!(!content.class_skills(class).is_empty(), "{}", class);
        }
    }

    #[test]
    fn missing_keys_degrade_to_empty() {
        let content = ContentTables::default();
        assert!(content.room_descriptions(1).is_empty());
        assert!(content.enemy_names(1).is_empty());
        assert!(content.enemy(1, "goblin").is_none());
        assert!(content.loot_gear(7).is_empty());
        assert!(content.class_skills(PlayerClass::Mage).is_empty());
    }

    #[test]
    fn deeper_floors_reuse_the_deepest_tables() {
        let content = ContentTables::builtin().unwrap();
        assert_eq!(content.room_descriptions(7), content.room_descriptions(3));
        assert_eq!(content.exit_descriptions(4), content.exit_descriptions(3));
        assert_eq!(content.enemy_names(12), content.enemy_names(3));
        assert!(content.enemy(12, "troll").is_some());
        assert!(!content.enemy_descriptions(12, "troll").is_empty());
        assert_eq!(content.loot_items(5), content.loot_items(3));
        assert_eq!(content.loot_gear(5), content.loot_gear(3));
        assert!(content.room_descriptions(0).is_empty());
    }

    #[test]
    fn gaps_fall_back_to_the_floor_above() {
        let mut table = BTreeMap::new();
        table.insert("floor_1".to_string(), 1);
        table.insert("floor_4".to_string(), 4);
        table.insert("floor_x".to_string(), 99);
        assert_eq!(by_floor(&table, FLOOR_PREFIX, 3), Some(&1));
        assert_eq!(by_floor(&table, FLOOR_PREFIX, 4), Some(&4));
        assert_eq!(by_floor(&table, FLOOR_PREFIX, 9), Some(&4));
        assert_eq!(by_floor(&table, LEVEL_PREFIX, 9), None);
    }

    #[test]
    fn enemy_names_are_sorted() {
        let content = ContentTables::builtin().unwrap();
        let names = content.enemy_names(1);
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn directory_overrides_single_tables() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("class_skills.json"),
            r#"{"mage": [{"name": "Spark", "damage": 2}]}"#,
        )
        .unwrap();

        let content = ContentTables::load_from_dir(dir.path()).unwrap();
        assert_eq!(content.class_skills(PlayerClass::Mage), vec![Skill::new("Spark", 2)]);
        assert!(content.class_skills(PlayerClass::Rogue).is_empty());
        assert!(!content.room_descriptions(1).is_empty());
    }

    #[test]
    fn malformed_files_are_errors() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("loot.json"), "{ not json").unwrap();
        assert!(ContentTables::load_from_dir(dir.path()).is_err());
    }
}
