use serde::{Deserialize, Serialize};
use rand::seq::SliceRandom;
use rand::Rng;
use crate::content::ContentRepository;
use crate::error::ActionError;
use super::{Gear, Item, ItemKind, Player};

pub const MAX_POTION_STOCK: u32 = 3;
pub const MAX_GEAR_STOCK: usize = 4;
pub const PURSE_PER_FLOOR: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    pub name: String,
    pub value: u32,
    /// Consumables carry a count; gear is a single piece.
    #[serde(default)]
    pub quantity: Option<u32>,
}

impl StockItem {
    fn to_item(&self) -> Item {
        match ItemKind::from_name(&self.name) {
            ItemKind::HealthPotion => Item::HealthPotions(1),
            ItemKind::Gold => Item::Gold(1),
            ItemKind::Equipment => Item::Gear(Gear::new(&self.name, self.value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merchant {
    pub gold: u32,
    pub stock: Vec<StockItem>,
}

impl Merchant {
    /// Potions (if the floor sells them) plus up to four pieces of the
    /// floor's gear.
    pub fn stock_for_floor<C, R>(floor_level: u32, content: &C, rng: &mut R) -> Self
    where
        C: ContentRepository + ?Sized,
        R: Rng + ?Sized,
    {
        let mut stock = Vec::new();

        let potion = content
            .loot_items(floor_level)
            .iter()
            .find(|entry| ItemKind::from_name(&entry.name) == ItemKind::HealthPotion);
        if let Some(potion) = potion {
            stock.push(StockItem {
                name: potion.name.clone(),
                value: potion.value,
                quantity: Some(rng.gen_range(1..=MAX_POTION_STOCK)),
            });
        }

        let gear = content.loot_gear(floor_level);
        for piece in gear.choose_multiple(rng, MAX_GEAR_STOCK.min(gear.len())) {
            stock.push(StockItem {
                name: piece.name.clone(),
                value: piece.value,
                quantity: None,
            });
        }

        Self {
            gold: PURSE_PER_FLOOR * floor_level.max(1),
            stock,
        }
    }

    fn find_stock(&self, name: &str) -> Option<usize> {
        self.stock.iter().position(|item| item.name.eq_ignore_ascii_case(name.trim()))
    }

    /// The player buys `item_name`. Nothing changes unless the whole trade
    /// can go through.
    pub fn sell_to_player(&mut self, item_name: &str, player: &mut Player) -> Result<Item, ActionError> {
        let index = self
            .find_stock(item_name)
            .ok_or_else(|| ActionError::UnknownItem(item_name.trim().to_string()))?;
        let offer = self.stock[index].clone();
        let item = offer.to_item();

        if player.inventory.gold < offer.value {
            return Err(ActionError::InsufficientGold {
                needed: offer.value,
                available: player.inventory.gold,
            });
        }
        if matches!(item, Item::Gear(_)) && !player.inventory.has_free_slot() {
            return Err(ActionError::InventoryFull(offer.name));
        }

        player.inventory.gold -= offer.value;
        player.inventory.add_item(item.clone());
        self.gold += offer.value;

        match self.stock[index].quantity.as_mut() {
            Some(quantity) if *quantity > 1 => *quantity -= 1,
            _ => {
                self.stock.remove(index);
            }
        }

        Ok(item)
    }

    /// The player sells a piece of equipment. Returns the gold paid.
    pub fn buy_from_player(&mut self, item_name: &str, player: &mut Player) -> Result<u32, ActionError> {
        let index = player
            .inventory
            .find_gear(item_name)
            .ok_or_else(|| ActionError::UnknownItem(item_name.trim().to_string()))?;
        let price = player.inventory.equipment[index].value;

        if self.gold < price {
            return Err(ActionError::MerchantCannotPay(player.inventory.equipment[index].name.clone()));
        }

        let gear = player.inventory.equipment.remove(index);
        player.inventory.gold += price;
        self.gold -= price;

        // Counted entries absorb the piece; single pieces get their own entry.
        let counted = self
            .find_stock(&gear.name)
            .and_then(|existing| self.stock[existing].quantity.as_mut());
        match counted {
            Some(quantity) => *quantity += 1,
            None => self.stock.push(StockItem {
                name: gear.name,
                value: gear.value,
                quantity: None,
            }),
        }

        Ok(price)
    }
}
