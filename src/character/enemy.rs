use serde::{Deserialize, Serialize};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::warn;
use crate::config::LootSettings;
use crate::content::{ContentRepository, EnemyTemplate};
use super::{Gear, Item, ItemKind, Player, Skill};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub name: String,
    pub health: u32,
    pub max_health: u32,
    pub defense: u32,
    pub skills: Vec<Skill>,
}

/// Result of damage landing on an enemy. `defeated` is set exactly when the
/// hit brought health to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnemyHit {
    pub damage: u32,
    pub defeated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum EnemyAttack {
    NoSkills {
        enemy: String,
    },
    Struck {
        enemy: String,
        skill_used: String,
        damage_attempted: u32,
        damage_dealt: u32,
        player_health: u32,
    },
}

impl EnemyAttack {
    pub fn narrative(&self) -> String {
        match self {
            EnemyAttack::NoSkills { enemy } => format!("{} has no skills to attack with.", enemy),
            EnemyAttack::Struck { enemy, skill_used, damage_dealt, player_health, .. } => format!(
                "{} uses {} and deals {} damage! (Your HP: {})",
                enemy, skill_used, damage_dealt, player_health
            ),
        }
    }

    pub fn damage_dealt(&self) -> u32 {
        match self {
            EnemyAttack::NoSkills { .. } => 0,
            EnemyAttack::Struck { damage_dealt, .. } => *damage_dealt,
        }
    }
}

/// Items dropped by a defeated enemy. Never persisted with the encounter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Loot {
    pub items: Vec<Item>,
}

impl Loot {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Enemy {
    pub fn new(name: &str, health: u32, defense: u32, skills: Vec<Skill>) -> Self {
        Self {
            name: name.to_string(),
            health,
            max_health: health,
            defense,
            skills,
        }
    }

    pub fn from_template(name: &str, template: &EnemyTemplate) -> Self {
        Self::new(name, template.health, template.defense, template.skills.clone())
    }

    pub fn is_defeated(&self) -> bool {
        self.health == 0
    }

    pub fn take_damage(&mut self, amount: u32) -> EnemyHit {
        let damage = amount.saturating_sub(self.defense);
        self.health = self.health.saturating_sub(damage);
        EnemyHit {
            damage,
            defeated: self.health == 0,
        }
    }

    /// Strikes with a random skill for its base damage plus 0..=2.
    pub fn attack_player<R: Rng + ?Sized>(&self, player: &mut Player, rng: &mut R) -> EnemyAttack {
        let Some(skill) = self.skills.choose(rng) else {
            return EnemyAttack::NoSkills { enemy: self.name.clone() };
        };

        let damage = skill.damage + rng.gen_range(0..=2);
        let damage_dealt = player.take_damage(damage);

        EnemyAttack::Struck {
            enemy: self.name.clone(),
            skill_used: skill.name.clone(),
            damage_attempted: damage,
            damage_dealt,
            player_health: player.health,
        }
    }

    /// Rolls a drop from the floor's loot tables: a few consumables and,
    /// sometimes, gear.
    pub fn generate_loot<C, R>(&self, floor_level: u32, content: &C, settings: &LootSettings, rng: &mut R) -> Loot
    where
        C: ContentRepository + ?Sized,
        R: Rng + ?Sized,
    {
        let mut loot = Loot::default();

        let items = content.loot_items(floor_level);
        if items.is_empty() {
            warn!(floor = floor_level, enemy = %self.name, "no loot items for floor");
        }

        let max_items = settings.max_items.max(settings.min_items);
        let count = rng.gen_range(settings.min_items..=max_items).min(items.len());
        for entry in items.choose_multiple(rng, count) {
            let item = match ItemKind::from_name(&entry.name) {
                ItemKind::Gold => {
                    let max_gold = settings.gold_max.max(settings.gold_min);
                    Item::Gold(rng.gen_range(settings.gold_min..=max_gold))
                }
                ItemKind::HealthPotion => Item::HealthPotions(rng.gen_range(1..=3)),
                ItemKind::Equipment => Item::Gear(Gear::new(&entry.name, entry.value)),
            };
            loot.items.push(item);
        }

        let gear = content.loot_gear(floor_level);
        if !gear.is_empty() && settings.max_gear > 0 && rng.gen_bool(settings.gear_chance.clamp(0.0, 1.0)) {
            let count = rng.gen_range(1..=settings.max_gear).min(gear.len());
            for piece in gear.choose_multiple(rng, count) {
                loot.items.push(Item::Gear(piece.clone()));
            }
        }

        loot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::PlayerClass;
    use crate::content::ContentTables;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn defense_reduces_damage() {
        let mut enemy = Enemy::new("goblin", 10, 2, vec![]);
        let hit = enemy.take_damage(5);
        assert_eq!(hit, EnemyHit { damage: 3, defeated: false });
        assert_eq!(enemy.health, 7);
    }

    #[test]
    fn exact_kill_reports_defeat() {
        let mut enemy = Enemy::new("slime", 5, 0, vec![]);
        let hit = enemy.take_damage(5);
        assert!(hit.defeated);
        assert_eq!(enemy.health, 0);
    }

    #[test]
    fn overkill_floors_health() {
        let mut enemy = Enemy::new("slime", 5, 0, vec![]);
        let hit = enemy.take_damage(6);
        assert_eq!(hit, EnemyHit { damage: 6, defeated: true });
        assert_eq!(enemy.health, 0);
        assert!(enemy.is_defeated());
    }

    #[test]
    fn absorbed_hit_is_not_a_defeat() {
        let mut enemy = Enemy::new("golem", 5, 10, vec![]);
        assert_eq!(enemy.take_damage(4), EnemyHit { damage: 0, defeated: false });
    }

    #[test]
    fn enemy_without_skills_cannot_attack() {
        let enemy = Enemy::new("statue", 5, 0, vec![]);
        let mut player = Player::new("Ayla", PlayerClass::Rogue, vec![], 1);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let attack = enemy.attack_player(&mut player, &mut rng);
        assert_eq!(attack, EnemyAttack::NoSkills { enemy: "statue".to_string() });
        assert_eq!(player.health, 20);
    }

    #[test]
    fn attack_adds_a_small_bonus_and_respects_defense() {
        let enemy = Enemy::new("goblin", 5, 0, vec![Skill::new("stab", 4)]);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..20 {
            let mut player = Player::new("Ayla", PlayerClass::Rogue, vec![], 1);
            match enemy.attack_player(&mut player, &mut rng) {
                EnemyAttack::Struck { damage_attempted, damage_dealt, player_health, skill_used, .. } => {
                    assert!((4..=6).contains(&damage_attempted));
                    assert_eq!(damage_dealt, damage_attempted - 3);
                    assert_eq!(player_health, 20 - damage_dealt);
                    assert_eq!(skill_used, "stab");
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn loot_respects_settings() {
        let content = ContentTables::builtin().unwrap();
        let enemy = Enemy::new("goblin", 5, 0, vec![]);
        let settings = LootSettings {
            min_items: 1,
            max_items: 2,
            gear_chance: 1.0,
            max_gear: 1,
            gold_min: 3,
            gold_max: 3,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for _ in 0..20 {
            let loot = enemy.generate_loot(1, &content, &settings, &mut rng);
            let gear = loot.items.iter().filter(|i| matches!(i, Item::Gear(_))).count();
            assert!(gear >= 1);
            for item in &loot.items {
                if let Item::Gold(amount) = item {
                    assert_eq!(*amount, 3);
                }
            }
        }
    }

    #[test]
    fn loot_without_tables_is_empty() {
        let content = ContentTables::default();
        let enemy = Enemy::new("goblin", 5, 0, vec![]);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let loot = enemy.generate_loot(1, &content, &LootSettings::default(), &mut rng);
        assert!(loot.is_empty());
    }
}
