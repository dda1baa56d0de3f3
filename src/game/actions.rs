use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::character::{Merchant, Player};
use crate::dungeon::{Direction, Dungeon};
use crate::error::ActionError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum Action {
    Move(Direction),
    Skill(String),
    Heal,
    Descend,
    Buy(String),
    Sell(String),
}

impl Action {
    /// The wire form, e.g. `move:north` or `skill:Fireball`.
    pub fn value(&self) -> String {
        match self {
            Action::Move(direction) => format!("move:{}", direction),
            Action::Skill(name) => format!("skill:{}", name),
            Action::Heal => "heal".to_string(),
            Action::Descend => "descend".to_string(),
            Action::Buy(item) => format!("buy:{}", item),
            Action::Sell(item) => format!("sell:{}", item),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value())
    }
}

fn target(input: &str, rest: &str) -> Result<String, ActionError> {
    let rest = rest.trim();
    if rest.is_empty() {
        return Err(ActionError::Unrecognised(input.to_string()));
    }
    Ok(rest.to_string())
}

impl FromStr for Action {
    type Err = ActionError;

    /// Accepts `kind:target` and the older `kind_target` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let lowered = input.to_lowercase();

        match lowered.as_str() {
            "heal" => return Ok(Action::Heal),
            "descend" | "descend_next_floor" => return Ok(Action::Descend),
            _ => {}
        }

        // Legacy spellings use underscores for the spaces in a target too.
        let (kind, rest) = match input.split_once(':') {
            Some((kind, rest)) => (kind, rest.to_string()),
            None => input
                .split_once('_')
                .map(|(kind, rest)| (kind, rest.replace('_', " ")))
                .ok_or_else(|| ActionError::Unrecognised(input.to_string()))?,
        };

        match kind.trim().to_lowercase().as_str() {
            "move" => rest
                .parse::<Direction>()
                .map(Action::Move)
                .map_err(|_| ActionError::Unrecognised(input.to_string())),
            "skill" => Ok(Action::Skill(target(input, &rest)?)),
            "buy" => Ok(Action::Buy(target(input, &rest)?)),
            "sell" => Ok(Action::Sell(target(input, &rest)?)),
            _ => Err(ActionError::Unrecognised(input.to_string())),
        }
    }
}

/// One entry of the action menu sent with every turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOption {
    pub label: String,
    pub value: Option<String>,
    pub enabled: bool,
}

impl ActionOption {
    fn enabled(label: String, action: Action) -> Self {
        Self { label, value: Some(action.value()), enabled: true }
    }

    fn disabled(label: String) -> Self {
        Self { label, value: None, enabled: false }
    }

    fn when(enabled: bool, label: String, action: Action) -> Self {
        if enabled {
            Self::enabled(label, action)
        } else {
            Self::disabled(label)
        }
    }
}

fn movement_actions(player: &Player, dungeon: &Dungeon) -> Vec<ActionOption> {
    let valid = dungeon.valid_directions(player.player_location);
    Direction::ALL
        .into_iter()
        .map(|direction| {
            ActionOption::when(
                valid.contains_key(&direction),
                format!("Move {}", direction.label()),
                Action::Move(direction),
            )
        })
        .collect()
}

pub fn exploring_actions(player: &Player, dungeon: &Dungeon) -> Vec<ActionOption> {
    let mut actions = movement_actions(player, dungeon);
    if dungeon.is_exit(player.player_location) {
        actions.push(ActionOption::enabled("Descend to the Next Floor".to_string(), Action::Descend));
    }
    actions
}

pub fn combat_actions(player: &Player) -> Vec<ActionOption> {
    let mut actions: Vec<ActionOption> = player
        .skills
        .iter()
        .map(|skill| {
            ActionOption::enabled(
                format!("{} (Damage: {})", skill.name, skill.damage),
                Action::Skill(skill.name.clone()),
            )
        })
        .collect();

    actions.push(ActionOption::when(
        player.inventory.health_potions > 0,
        format!("Heal (Potions: {})", player.inventory.health_potions),
        Action::Heal,
    ));
    actions
}

pub fn merchant_actions(player: &Player, dungeon: &Dungeon, merchant: &Merchant) -> Vec<ActionOption> {
    let mut actions = exploring_actions(player, dungeon);

    for item in &merchant.stock {
        let label = match item.quantity {
            Some(quantity) => format!("Buy {} ({} gold, {} left)", item.name, item.value, quantity),
            None => format!("Buy {} ({} gold)", item.name, item.value),
        };
        actions.push(ActionOption::when(
            player.inventory.gold >= item.value,
            label,
            Action::Buy(item.name.clone()),
        ));
    }

    for gear in &player.inventory.equipment {
        actions.push(ActionOption::when(
            merchant.gold >= gear.value,
            format!("Sell {} ({} gold)", gear.name, gear.value),
            Action::Sell(gear.name.clone()),
        ));
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{Gear, Item, PlayerClass, Skill, StockItem};
    use crate::dungeon::generate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn parses_colon_forms() {
        assert_eq!("move:north".parse(), Ok(Action::Move(Direction::North)));
        assert_eq!("skill:Fireball".parse(), Ok(Action::Skill("Fireball".to_string())));
        assert_eq!("heal".parse(), Ok(Action::Heal));
        assert_eq!("descend".parse(), Ok(Action::Descend));
        assert_eq!("buy:iron sword".parse(), Ok(Action::Buy("iron sword".to_string())));
        assert_eq!("sell:bone charm".parse(), Ok(Action::Sell("bone charm".to_string())));
    }

    #[test]
    fn parses_underscore_forms() {
        assert_eq!("move_west".parse(), Ok(Action::Move(Direction::West)));
        assert_eq!("skill_Frost Bolt".parse(), Ok(Action::Skill("Frost Bolt".to_string())));
        assert_eq!("descend_next_floor".parse(), Ok(Action::Descend));
        assert_eq!("skill_frost_bolt".parse(), Ok(Action::Skill("frost bolt".to_string())));
        assert_eq!("buy_health_potion".parse(), Ok(Action::Buy("health potion".to_string())));
        assert_eq!("sell_iron_sword".parse(), Ok(Action::Sell("iron sword".to_string())));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!("dance".parse::<Action>(), Err(ActionError::Unrecognised(_))));
        assert!(matches!("move:up".parse::<Action>(), Err(ActionError::Unrecognised(_))));
        assert!(matches!("skill:".parse::<Action>(), Err(ActionError::Unrecognised(_))));
    }

    #[test]
    fn values_parse_back() {
        for action in [Action::Move(Direction::East), Action::Skill("Backstab".to_string()), Action::Descend] {
            assert_eq!(action.value().parse(), Ok(action));
        }
    }

    #[test]
    fn movement_entries_mirror_valid_directions() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let dungeon = generate(5, 5, 10, 1, &mut rng).unwrap();
        let mut player = Player::new("Ayla", PlayerClass::Rogue, vec![], 1);
        player.player_location = dungeon.start;

        let actions = exploring_actions(&player, &dungeon);
        let valid = dungeon.valid_directions(dungeon.start);
        for (option, direction) in actions.iter().zip(Direction::ALL) {
            assert_eq!(option.enabled, valid.contains_key(&direction));
            assert_eq!(option.value.is_some(), option.enabled);
        }
        let descend = actions.iter().any(|a| a.value.as_deref() == Some("descend"));
        assert_eq!(descend, dungeon.start == dungeon.exit);
    }

    #[test]
    fn combat_lists_skills_and_heal() {
        let mut player = Player::new("Ayla", PlayerClass::Mage, vec![Skill::new("Fireball", 6)], 1);
        let actions = combat_actions(&player);
        assert_eq!(actions[0].label, "Fireball (Damage: 6)");
        assert_eq!(actions[0].value.as_deref(), Some("skill:Fireball"));
        assert!(actions[1].enabled);

        player.inventory.health_potions = 0;
        assert!(!combat_actions(&player)[1].enabled);
    }

    #[test]
    fn merchant_entries_respect_gold() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let dungeon = generate(5, 5, 10, 1, &mut rng).unwrap();
        let mut player = Player::new("Ayla", PlayerClass::Rogue, vec![], 1);
        player.player_location = dungeon.start;
        player.inventory.add_item(Item::Gear(Gear::new("bone charm", 5)));

        let merchant = Merchant {
            gold: 2,
            stock: vec![
                StockItem { name: "health potion".to_string(), value: 3, quantity: Some(1) },
                StockItem { name: "iron sword".to_string(), value: 8, quantity: None },
            ],
        };
        let actions = merchant_actions(&player, &dungeon, &merchant);
        let find = |prefix: &str| actions.iter().find(|a| a.label.starts_with(prefix)).unwrap();

        assert!(find("Buy health potion").enabled);
        assert!(!find("Buy iron sword").enabled);
        assert!(!find("Sell bone charm").enabled);
    }
}
