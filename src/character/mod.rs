use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::dungeon::{Direction, Dungeon, RoomId};
use crate::error::ActionError;

pub mod enemy;
pub mod merchant;

pub use enemy::*;
pub use merchant::*;

pub const EQUIPMENT_SLOTS: usize = 5;
pub const HEAL_AMOUNT: u32 = 5;

pub const STARTING_HEALTH: u32 = 20;
pub const STARTING_DEFENSE: u32 = 3;
pub const STARTING_GOLD: u32 = 5;
pub const STARTING_POTIONS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub damage: u32,
}

impl Skill {
    pub fn new(name: &str, damage: u32) -> Self {
        Self { name: name.to_string(), damage }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerClass {
    Mage,
    Warrior,
    Rogue,
}

impl PlayerClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerClass::Mage => "mage",
            PlayerClass::Warrior => "warrior",
            PlayerClass::Rogue => "rogue",
        }
    }
}

impl fmt::Display for PlayerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayerClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mage" => Ok(PlayerClass::Mage),
            "warrior" => Ok(PlayerClass::Warrior),
            "rogue" => Ok(PlayerClass::Rogue),
            other => Err(format!("unknown class '{}'", other)),
        }
    }
}

/// A piece of equipment; `value` is its price in gold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gear {
    pub name: String,
    #[serde(default)]
    pub value: u32,
}

impl Gear {
    pub fn new(name: &str, value: u32) -> Self {
        Self { name: name.to_string(), value }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Item {
    Gold(u32),
    HealthPotions(u32),
    Gear(Gear),
}

impl Item {
    pub fn describe(&self) -> String {
        match self {
            Item::Gold(amount) => format!("{} gold", amount),
            Item::HealthPotions(1) => "a health potion".to_string(),
            Item::HealthPotions(amount) => format!("{} health potions", amount),
            Item::Gear(gear) => gear.name.clone(),
        }
    }
}

/// Inventory slot a name refers to: the two counters, or equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Gold,
    HealthPotion,
    Equipment,
}

impl ItemKind {
    pub fn from_name(name: &str) -> Self {
        let normalized = name.trim().to_lowercase().replace('_', " ");
        match normalized.as_str() {
            "gold" => ItemKind::Gold,
            "health potion" | "health potions" => ItemKind::HealthPotion,
            _ => ItemKind::Equipment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub gold: u32,
    pub health_potions: u32,
    pub equipment: Vec<Gear>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            gold: STARTING_GOLD,
            health_potions: STARTING_POTIONS,
            equipment: Vec::new(),
        }
    }
}

impl Inventory {
    pub fn has_free_slot(&self) -> bool {
        self.equipment.len() < EQUIPMENT_SLOTS
    }

    /// Counters are unbounded; equipment fails without mutation when all
    /// slots are taken.
    pub fn add_item(&mut self, item: Item) -> bool {
        match item {
            Item::Gold(amount) => {
                self.gold = self.gold.saturating_add(amount);
                true
            }
            Item::HealthPotions(amount) => {
                self.health_potions = self.health_potions.saturating_add(amount);
                true
            }
            Item::Gear(gear) => {
                if !self.has_free_slot() {
                    return false;
                }
                self.equipment.push(gear);
                true
            }
        }
    }

    pub fn remove_item(&mut self, name: &str, amount: u32) -> bool {
        match ItemKind::from_name(name) {
            ItemKind::Gold => take_from(&mut self.gold, amount),
            ItemKind::HealthPotion => take_from(&mut self.health_potions, amount),
            ItemKind::Equipment => match self.find_gear(name) {
                Some(index) => {
                    self.equipment.remove(index);
                    true
                }
                None => false,
            },
        }
    }

    pub fn has_item(&self, name: &str, amount: u32) -> bool {
        match ItemKind::from_name(name) {
            ItemKind::Gold => self.gold >= amount,
            ItemKind::HealthPotion => self.health_potions >= amount,
            ItemKind::Equipment => self.find_gear(name).is_some(),
        }
    }

    pub fn find_gear(&self, name: &str) -> Option<usize> {
        self.equipment.iter().position(|gear| gear.name.eq_ignore_ascii_case(name.trim()))
    }
}

fn take_from(counter: &mut u32, amount: u32) -> bool {
    if *counter < amount {
        return false;
    }
    *counter -= amount;
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackOutcome {
    pub skill: String,
    pub damage_dealt: u32,
    pub defeated: bool,
    pub enemy_health: u32,
    pub enemy_max_health: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub player_class: PlayerClass,
    pub level: u32,
    pub experience: u32,
    pub health: u32,
    pub max_health: u32,
    pub defense: u32,
    pub inventory: Inventory,
    pub skills: Vec<Skill>,
    pub dungeon_floor: u32,
    pub player_location: RoomId,
    pub save_slot: u8,
}

impl Player {
    pub fn new(name: &str, player_class: PlayerClass, skills: Vec<Skill>, save_slot: u8) -> Self {
        Self {
            name: name.to_string(),
            player_class,
            level: 0,
            experience: 0,
            health: STARTING_HEALTH,
            max_health: STARTING_HEALTH,
            defense: STARTING_DEFENSE,
            inventory: Inventory::default(),
            skills,
            dungeon_floor: 1,
            player_location: 0,
            save_slot,
        }
    }

    pub fn is_fallen(&self) -> bool {
        self.health == 0
    }

    /// Applies `amount - defense` (never negative) and returns what landed.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let applied = amount.saturating_sub(self.defense);
        self.health = self.health.saturating_sub(applied);
        applied
    }

    /// Drinks one potion and returns the health actually restored.
    pub fn heal(&mut self) -> Result<u32, ActionError> {
        if self.inventory.health_potions == 0 {
            return Err(ActionError::NoPotions);
        }

        let before = self.health;
        self.health = (self.health + HEAL_AMOUNT).min(self.max_health);
        self.inventory.health_potions -= 1;
        Ok(self.health - before)
    }

    pub fn find_skill(&self, skill_name: &str) -> Option<&Skill> {
        let wanted = skill_name.trim();
        self.skills.iter().find(|skill| skill.name.eq_ignore_ascii_case(wanted))
    }

    pub fn attack_enemy(&self, enemy: &mut Enemy, skill_name: &str) -> Result<AttackOutcome, ActionError> {
        let skill = self
            .find_skill(skill_name)
            .ok_or_else(|| ActionError::UnknownSkill(skill_name.trim().to_string()))?;

        let hit = enemy.take_damage(skill.damage);
        let message = if hit.defeated {
            format!("{} used {} and defeated {}!", self.name, skill.name, enemy.name)
        } else {
            format!(
                "{} used {} and dealt {} damage to {} (HP: {}/{})",
                self.name, skill.name, hit.damage, enemy.name, enemy.health, enemy.max_health
            )
        };

        Ok(AttackOutcome {
            skill: skill.name.clone(),
            damage_dealt: hit.damage,
            defeated: hit.defeated,
            enemy_health: enemy.health,
            enemy_max_health: enemy.max_health,
            message,
        })
    }

    /// Moves to the grid neighbour in `direction`. Illegal moves leave the
    /// player where they are.
    pub fn move_to(&mut self, direction: Direction, dungeon: &Dungeon) -> Result<RoomId, ActionError> {
        match dungeon.valid_directions(self.player_location).get(&direction) {
            Some(&next) => {
                self.player_location = next;
                Ok(next)
            }
            None => Err(ActionError::IllegalMove(direction)),
        }
    }

    pub fn experience_to_next_level(&self) -> u32 {
        (self.level + 1) * 10
    }

    /// Returns the number of levels gained.
    pub fn gain_experience(&mut self, amount: u32) -> u32 {
        self.experience += amount;
        let mut gained = 0;

        while self.experience >= self.experience_to_next_level() {
            self.experience -= self.experience_to_next_level();
            self.level += 1;
            self.max_health += 2;
            self.health = (self.health + 2).min(self.max_health);
            gained += 1;
        }

        gained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dungeon::generate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn warrior() -> Player {
        Player::new("TestPlayer", PlayerClass::Warrior, vec![Skill::new("Slash", 6)], 1)
    }

    #[test]
    fn new_player_defaults() {
        let player = warrior();
        assert_eq!(player.health, 20);
        assert_eq!(player.max_health, 20);
        assert_eq!(player.defense, 3);
        assert_eq!(player.inventory.gold, 5);
        assert_eq!(player.inventory.health_potions, 3);
        assert_eq!(player.dungeon_floor, 1);
    }

    #[test]
    fn damage_is_reduced_by_defense() {
        let mut player = warrior();
        player.health = 10;
        assert_eq!(player.take_damage(10), 7);
        assert_eq!(player.health, 3);
    }

    #[test]
    fn damage_at_or_below_defense_is_absorbed() {
        let mut player = warrior();
        assert_eq!(player.take_damage(3), 0);
        assert_eq!(player.take_damage(0), 0);
        assert_eq!(player.health, 20);
    }

    #[test]
    fn health_never_goes_below_zero() {
        let mut player = warrior();
        player.health = 2;
        assert_eq!(player.take_damage(50), 47);
        assert_eq!(player.health, 0);
        assert!(player.is_fallen());
    }

    #[test]
    fn heal_consumes_a_potion() {
        let mut player = warrior();
        player.health = 10;
        assert_eq!(player.heal(), Ok(5));
        assert_eq!(player.health, 15);
        assert_eq!(player.inventory.health_potions, 2);
    }

    #[test]
    fn heal_is_capped_at_max_health() {
        let mut player = warrior();
        player.health = 18;
        assert_eq!(player.heal(), Ok(2));
        assert_eq!(player.health, 20);
    }

    #[test]
    fn heal_without_potions_changes_nothing() {
        let mut player = warrior();
        player.health = 7;
        player.inventory.health_potions = 0;
        assert_eq!(player.heal(), Err(ActionError::NoPotions));
        assert_eq!(player.health, 7);
        assert_eq!(player.inventory.health_potions, 0);
    }

    #[test]
    fn attack_matches_skill_names_case_insensitively() {
        let player = warrior();
        let mut enemy = Enemy::new("goblin", 10, 2, vec![]);
        let outcome = player.attack_enemy(&mut enemy, "SLASH").unwrap();
        assert_eq!(outcome.damage_dealt, 4);
        assert!(!outcome.defeated);
        assert_eq!(enemy.health, 6);
        assert!(outcome.message.contains("(HP: 6/10)"));
    }

    #[test]
    fn attack_reports_defeat() {
        let player = warrior();
        let mut enemy = Enemy::new("rat", 3, 0, vec![]);
        let outcome = player.attack_enemy(&mut enemy, "slash").unwrap();
        assert!(outcome.defeated);
        assert_eq!(outcome.message, "TestPlayer used Slash and defeated rat!");
    }

    #[test]
    fn unknown_skill_leaves_enemy_untouched() {
        let player = warrior();
        let mut enemy = Enemy::new("goblin", 10, 2, vec![]);
        assert_eq!(
            player.attack_enemy(&mut enemy, "fireball"),
            Err(ActionError::UnknownSkill("fireball".to_string()))
        );
        assert_eq!(enemy.health, 10);
    }

    #[test]
    fn illegal_move_keeps_location() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let dungeon = generate(5, 5, 10, 1, &mut rng).unwrap();
        let mut player = warrior();
        player.player_location = dungeon.start;

        let valid = dungeon.valid_directions(dungeon.start);
        let blocked = Direction::ALL.into_iter().find(|d| !valid.contains_key(d));
        if let Some(direction) = blocked {
            assert_eq!(player.move_to(direction, &dungeon), Err(ActionError::IllegalMove(direction)));
            assert_eq!(player.player_location, dungeon.start);
        }

        let (&direction, &target) = valid.iter().next().expect("start has a neighbour");
        assert_eq!(player.move_to(direction, &dungeon), Ok(target));
        assert_eq!(player.player_location, target);
    }

    #[test]
    fn equipment_is_capped_at_five() {
        let mut inventory = Inventory::default();
        for i in 0..EQUIPMENT_SLOTS {
            assert!(inventory.add_item(Item::Gear(Gear::new(&format!("ring {}", i), 1))));
        }
        assert!(!inventory.add_item(Item::Gear(Gear::new("iron sword", 4))));
        assert_eq!(inventory.equipment.len(), EQUIPMENT_SLOTS);
        assert!(!inventory.has_item("iron sword", 1));

        // counters are unaffected by the cap
        assert!(inventory.add_item(Item::Gold(100)));
        assert_eq!(inventory.gold, 105);
    }

    #[test]
    fn remove_and_has_item() {
        let mut inventory = Inventory::default();
        inventory.add_item(Item::Gear(Gear::new("Iron Sword", 4)));

        assert!(inventory.has_item("iron sword", 1));
        assert!(inventory.has_item("health_potions", 3));
        assert!(!inventory.has_item("health potion", 4));

        assert!(!inventory.remove_item("gold", 6));
        assert_eq!(inventory.gold, 5);
        assert!(inventory.remove_item("gold", 5));
        assert_eq!(inventory.gold, 0);
        assert!(inventory.remove_item("iron sword", 1));
        assert!(!inventory.remove_item("iron sword", 1));
    }

    #[test]
    fn levelling_raises_max_health() {
        let mut player = warrior();
        assert_eq!(player.gain_experience(9), 0);
        assert_eq!(player.gain_experience(1), 1);
        assert_eq!(player.level, 1);
        assert_eq!(player.max_health, 22);
        assert_eq!(player.experience, 0);
        assert_eq!(player.gain_experience(50), 2);
        assert_eq!(player.level, 3);
    }

    #[test]
    fn class_names_parse() {
        assert_eq!("Mage".parse::<PlayerClass>(), Ok(PlayerClass::Mage));
        assert!("bard".parse::<PlayerClass>().is_err());
    }
}
