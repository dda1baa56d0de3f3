use serde::{Deserialize, Serialize};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info};
use crate::character::{Enemy, Inventory, Item, Merchant, Player, PlayerClass};
use crate::config::GameConfig;
use crate::content::{place_content, ContentRepository};
use crate::database::{SaveKey, SaveStore, SlotSummary};
use crate::dungeon::{Dungeon, DungeonGenerator, RoomId};
use crate::error::{ActionError, GameError};

pub mod actions;

pub use actions::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    Exploring,
    InCombat,
    AtMerchant,
    /// Reported on the turn the player takes the stairs.
    Descending,
    Fallen,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub name: String,
    pub player_class: PlayerClass,
    pub level: u32,
    pub experience: u32,
    pub health: u32,
    pub max_health: u32,
    pub defense: u32,
    pub inventory: Inventory,
    pub floor: u32,
}

impl From<&Player> for PlayerStatus {
    fn from(player: &Player) -> Self {
        Self {
            name: player.name.clone(),
            player_class: player.player_class,
            level: player.level,
            experience: player.experience,
            health: player.health,
            max_health: player.max_health,
            defense: player.defense,
            inventory: player.inventory.clone(),
            floor: player.dungeon_floor,
        }
    }
}

/// Everything a client needs to render the result of one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResponse {
    pub state: GameState,
    /// False when the action was invalid; nothing changed and nothing was saved.
    pub accepted: bool,
    pub narrative: String,
    pub room: Option<String>,
    pub interaction: Option<String>,
    pub actions: Vec<ActionOption>,
    pub player: PlayerStatus,
    pub enemy: Option<Enemy>,
    /// Set only on the turn an enemy falls.
    pub enemy_defeated: bool,
    pub loot: Vec<Item>,
    pub merchant: Option<Merchant>,
}

#[derive(Debug, Default)]
struct TurnLog {
    lines: Vec<String>,
    enemy_defeated: bool,
    loot: Vec<Item>,
    descended: bool,
}

impl TurnLog {
    fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }
}

/// Resolves player actions against one save at a time.
///
/// Every call loads the save, resolves the action on copies of the player and
/// the floor, and commits both through a single `save_game` call before the
/// response is built. Rejected actions are never persisted.
pub struct TurnEngine<S, C> {
    store: S,
    content: C,
    config: GameConfig,
    generator: DungeonGenerator,
    rng: ChaCha8Rng,
}

impl<S: SaveStore, C: ContentRepository> TurnEngine<S, C> {
    pub fn new(store: S, content: C, config: GameConfig) -> Self {
        Self::with_rng(store, content, config, ChaCha8Rng::from_entropy())
    }

    pub fn with_seed(store: S, content: C, config: GameConfig, seed: u64) -> Self {
        Self::with_rng(store, content, config, ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn with_rng(store: S, content: C, config: GameConfig, rng: ChaCha8Rng) -> Self {
        let generator = DungeonGenerator::new(config.dungeon.clone());
        Self { store, content, config, generator, rng }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn list_slots(&self, user: &str) -> Result<Vec<SlotSummary>, GameError> {
        Ok(self.store.list_slots(user)?)
    }

    /// Builds and populates a fresh floor.
    pub fn build_floor(&mut self, floor_level: u32) -> Result<Dungeon, GameError> {
        let mut dungeon = self.generator.generate_floor(floor_level, &mut self.rng)?;
        place_content(&mut dungeon, &self.content, &self.config.placement, &mut self.rng);
        Ok(dungeon)
    }

    /// Starts over in `slot`, replacing whatever was saved there.
    pub fn new_game(&mut self, user: &str, slot: u8, name: &str, class: PlayerClass) -> Result<TurnResponse, GameError> {
        let key = SaveKey::new(user, slot)?;
        let skills = self.content.class_skills(class);
        let mut player = Player::new(name.trim(), class, skills, slot);
        let dungeon = self.build_floor(1)?;
        player.player_location = dungeon.start;

        self.commit(&key, &player, &dungeon)?;
        info!(save = %key, name = %player.name, class = %class, "started new game");

        let narrative = format!(
            "Welcome, {} the {}! Your journey begins now. Prepare yourself, for the dungeon depths await.",
            player.name,
            capitalize(class.as_str())
        );
        Ok(self.respond(&player, &dungeon, None, true, narrative, TurnLog::default()))
    }

    /// The current view of a save. Nothing is mutated.
    pub fn resume(&mut self, user: &str, slot: u8) -> Result<TurnResponse, GameError> {
        let key = SaveKey::new(user, slot)?;
        let (player, dungeon) = self.load(&key)?;
        let narrative = if player.is_fallen() {
            ActionError::Fallen.to_string()
        } else {
            format!("You are on floor {}.", dungeon.floor_level)
        };
        Ok(self.respond(&player, &dungeon, None, true, narrative, TurnLog::default()))
    }

    /// Parses and resolves a wire-form action such as `move:north`.
    pub fn act(&mut self, user: &str, slot: u8, action: &str) -> Result<TurnResponse, GameError> {
        let key = SaveKey::new(user, slot)?;
        let (player, dungeon) = self.load(&key)?;

        match action.parse::<Action>() {
            Ok(action) => self.resolve(&key, player, dungeon, action),
            Err(rejection) => Ok(self.reject(&player, &dungeon, rejection)),
        }
    }

    fn load(&self, key: &SaveKey) -> Result<(Player, Dungeon), GameError> {
        let no_save = || GameError::NoSave { user: key.user.clone(), slot: key.slot.get() };
        let player = self.store.load_player(key)?.ok_or_else(no_save)?;
        let dungeon = self.store.load_dungeon(key)?.ok_or_else(no_save)?;

        if dungeon.room(player.player_location).is_none() {
            return Err(GameError::PlayerOffMap(player.player_location));
        }
        Ok((player, dungeon))
    }

    fn commit(&mut self, key: &SaveKey, player: &Player, dungeon: &Dungeon) -> Result<(), GameError> {
        self.store.save_game(key, player, dungeon).map_err(|e| {
            error!(save = %key, error = %e, "failed to persist turn");
            GameError::from(e)
        })
    }

    fn resolve(&mut self, key: &SaveKey, player: Player, dungeon: Dungeon, action: Action) -> Result<TurnResponse, GameError> {
        let mut next_player = player.clone();
        let mut next_dungeon = dungeon.clone();

        match self.apply(&mut next_player, &mut next_dungeon, &action) {
            Ok(log) => {
                self.commit(key, &next_player, &next_dungeon)?;
                debug!(save = %key, action = %action, "resolved turn");
                let state = log.descended.then_some(GameState::Descending);
                let narrative = log.lines.join("\n");
                Ok(self.respond(&next_player, &next_dungeon, state, true, narrative, log))
            }
            Err(GameError::Rejected(rejection)) => {
                debug!(save = %key, action = %action, reason = %rejection, "rejected action");
                Ok(self.reject(&player, &dungeon, rejection))
            }
            Err(other) => Err(other),
        }
    }

    fn apply(&mut self, player: &mut Player, dungeon: &mut Dungeon, action: &Action) -> Result<TurnLog, GameError> {
        if player.is_fallen() {
            return Err(ActionError::Fallen.into());
        }

        let mut log = TurnLog::default();
        let location = player.player_location;

        match action {
            Action::Move(direction) => {
                if let Some(enemy) = live_enemy(dungeon, location) {
                    return Err(ActionError::InCombat(enemy.name.clone()).into());
                }
                let next = player.move_to(*direction, dungeon)?;
                log.push(format!("You move {}.", direction));
                if let Some(encounter) = dungeon.encounter(next).filter(|e| e.enemy.health > 0) {
                    log.push(format!("A {} stands in your way!", encounter.enemy.name));
                }
            }
            Action::Skill(skill) => {
                let enemy = dungeon
                    .room_mut(location)
                    .and_then(|room| room.encounter.as_mut())
                    .map(|encounter| &mut encounter.enemy)
                    .filter(|enemy| enemy.health > 0)
                    .ok_or(ActionError::NotInCombat)?;

                let outcome = player.attack_enemy(enemy, skill)?;
                log.push(outcome.message);

                if outcome.defeated {
                    let defeated = enemy.clone();
                    dungeon.clear_encounter(location);
                    self.reward(player, &defeated, &mut log);
                } else {
                    let attack = enemy.attack_player(player, &mut self.rng);
                    log.push(attack.narrative());
                }
            }
            Action::Heal => {
                let restored = player.heal()?;
                log.push(format!(
                    "You drink a health potion and recover {} HP. (HP: {}/{})",
                    restored, player.health, player.max_health
                ));
                if let Some(enemy) = live_enemy(dungeon, location) {
                    let attack = enemy.attack_player(player, &mut self.rng);
                    log.push(attack.narrative());
                }
            }
            Action::Descend => {
                if let Some(enemy) = live_enemy(dungeon, location) {
                    return Err(ActionError::InCombat(enemy.name.clone()).into());
                }
                if !dungeon.is_exit(location) {
                    return Err(ActionError::NotAtExit.into());
                }

                let floor = dungeon.floor_level + 1;
                *dungeon = self.build_floor(floor)?;
                player.dungeon_floor = floor;
                player.player_location = dungeon.start;
                log.descended = true;
                log.push(format!("You descend to floor {}.", floor));
                info!(name = %player.name, floor, "player descended");
            }
            Action::Buy(item) => {
                let merchant = merchant_here(dungeon, location)?;
                let price = player.inventory.gold;
                let bought = merchant.sell_to_player(item, player)?;
                let price = price - player.inventory.gold;
                log.push(format!("You buy {} for {} gold.", bought.describe(), price));
            }
            Action::Sell(item) => {
                let merchant = merchant_here(dungeon, location)?;
                let index = player.inventory.find_gear(item);
                let name = index.map(|i| player.inventory.equipment[i].name.clone());
                let paid = merchant.buy_from_player(item, player)?;
                log.push(format!("You sell {} for {} gold.", name.unwrap_or_else(|| item.clone()), paid));
            }
        }

        if player.is_fallen() {
            log.push(ActionError::Fallen.to_string());
            info!(name = %player.name, floor = player.dungeon_floor, "player has fallen");
        }

        Ok(log)
    }

    /// Experience and loot for a defeated enemy.
    fn reward(&mut self, player: &mut Player, enemy: &Enemy, log: &mut TurnLog) {
        log.enemy_defeated = true;

        let levels = player.gain_experience(enemy.max_health);
        log.push(format!("You gain {} experience.", enemy.max_health));
        if levels > 0 {
            log.push(format!(
                "You reached level {}! (Max HP: {})",
                player.level, player.max_health
            ));
        }

        let loot = enemy.generate_loot(player.dungeon_floor, &self.content, &self.config.loot, &mut self.rng);
        for item in &loot.items {
            if player.inventory.add_item(item.clone()) {
                log.push(format!("You found {}.", item.describe()));
            } else {
                log.push(format!("You found {} but have no room to carry it.", item.describe()));
            }
        }
        log.loot = loot.items;
    }

    fn reject(&self, player: &Player, dungeon: &Dungeon, rejection: ActionError) -> TurnResponse {
        self.respond(player, dungeon, None, false, rejection.to_string(), TurnLog::default())
    }

    fn respond(
        &self,
        player: &Player,
        dungeon: &Dungeon,
        state: Option<GameState>,
        accepted: bool,
        narrative: String,
        log: TurnLog,
    ) -> TurnResponse {
        let location = player.player_location;
        let state = state.unwrap_or_else(|| state_of(player, dungeon));
        let room = dungeon.room(location);
        let enemy = live_enemy(dungeon, location).cloned();
        let interaction = match state {
            GameState::InCombat => room
                .and_then(|r| r.encounter.as_ref())
                .and_then(|e| e.appearance.clone()),
            _ => None,
        };
        let merchant = match state {
            GameState::AtMerchant => dungeon.merchant_stock.clone(),
            _ => None,
        };

        let actions = match state {
            GameState::Fallen => Vec::new(),
            GameState::InCombat => combat_actions(player),
            GameState::AtMerchant => match &merchant {
                Some(stock) => merchant_actions(player, dungeon, stock),
                None => exploring_actions(player, dungeon),
            },
            GameState::Exploring | GameState::Descending => exploring_actions(player, dungeon),
        };

        TurnResponse {
            state,
            accepted,
            narrative,
            room: room.and_then(|r| r.description.clone()),
            interaction,
            actions,
            player: PlayerStatus::from(player),
            enemy,
            enemy_defeated: log.enemy_defeated,
            loot: log.loot,
            merchant,
        }
    }
}

pub fn state_of(player: &Player, dungeon: &Dungeon) -> GameState {
    let location = player.player_location;
    if player.is_fallen() {
        GameState::Fallen
    } else if live_enemy(dungeon, location).is_some() {
        GameState::InCombat
    } else if dungeon.is_merchant(location) {
        GameState::AtMerchant
    } else {
        GameState::Exploring
    }
}

fn live_enemy(dungeon: &Dungeon, location: RoomId) -> Option<&Enemy> {
    dungeon
        .encounter(location)
        .map(|encounter| &encounter.enemy)
        .filter(|enemy| enemy.health > 0)
}

fn merchant_here(dungeon: &mut Dungeon, location: RoomId) -> Result<&mut Merchant, ActionError> {
    if !dungeon.is_merchant(location) || live_enemy(dungeon, location).is_some() {
        return Err(ActionError::NotAtMerchant);
    }
    dungeon.merchant_stock.as_mut().ok_or(ActionError::NotAtMerchant)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
