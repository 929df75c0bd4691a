use std::collections::BTreeMap;
use std::path::PathBuf;

use log::warn;
use serde::Serialize;
use thiserror::Error;

use crate::store_io::{installation_file, read_json, write_json_atomic};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ShopItem {
    pub id: &'static str,
    pub name: &'static str,
    pub cost: u64,
    pub glyph: &'static str,
    pub description: &'static str,
    #[serde(rename = "maxStack")]
    pub max_stack: u32,
}

pub const SHOP_ITEMS: [ShopItem; 3] = [
    ShopItem {
        id: "shield",
        name: "Shield",
        cost: 500,
        glyph: "🛡️",
        description: "Blocks one zombie hit",
        max_stack: 10,
    },
    ShopItem {
        id: "extra_heart",
        name: "Extra Heart",
        cost: 750,
        glyph: "💚",
        description: "Adds +1 life to your current lives",
        max_stack: 5,
    },
    ShopItem {
        id: "speed_boost",
        name: "Speed Boost",
        cost: 1000,
        glyph: "⚡",
        description: "Move twice per reaction for 5 moves",
        max_stack: 5,
    },
];

pub fn find_item(id: &str) -> Option<&'static ShopItem> {
    SHOP_ITEMS.iter().find(|item| item.id == id)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShopError {
    #[error("item not found in shop")]
    UnknownItem,
    #[error("insufficient xp: need {cost}, have {available}")]
    InsufficientXp { cost: u64, available: u64 },
    #[error("already holding the maximum of {max}")]
    MaxStack { max: u32 },
    #[error("inventory file could not be read or written")]
    Storage,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PurchaseReceipt {
    pub item: &'static ShopItem,
    pub count: u32,
    pub cost: u64,
}

type Inventories = BTreeMap<String, BTreeMap<String, u32>>;

/// Purchased power-ups per player, one JSON file per installation.
/// XP is checked here but deducted by the caller.
pub struct ShopLedger {
    dir: PathBuf,
}

impl ShopLedger {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn inventory(&self, installation: &str, player_id: &str) -> BTreeMap<String, u32> {
        self.load(installation)
            .remove(player_id)
            .unwrap_or_default()
    }

    pub fn has_item(&self, installation: &str, player_id: &str, item_id: &str) -> bool {
        self.inventory(installation, player_id)
            .get(item_id)
            .is_some_and(|count| *count > 0)
    }

    pub fn purchase(
        &self,
        installation: &str,
        player_id: &str,
        item_id: &str,
        player_xp: u64,
    ) -> Result<PurchaseReceipt, ShopError> {
        let item = find_item(item_id).ok_or(ShopError::UnknownItem)?;
        if player_xp < item.cost {
            return Err(ShopError::InsufficientXp {
                cost: item.cost,
                available: player_xp,
            });
        }

        let mut inventories = self.load_for_update(installation).ok_or(ShopError::Storage)?;
        let owned = inventories.entry(player_id.to_string()).or_default();
        let count = owned.get(item.id).copied().unwrap_or(0);
        if count >= item.max_stack {
            return Err(ShopError::MaxStack {
                max: item.max_stack,
            });
        }
        owned.insert(item.id.to_string(), count + 1);

        if !self.save(installation, &inventories) {
            return Err(ShopError::Storage);
        }
        Ok(PurchaseReceipt {
            item,
            count: count + 1,
            cost: item.cost,
        })
    }

    /// Uses up one unit. False when the player holds none or the file cannot be read or written.
    pub fn consume(&self, installation: &str, player_id: &str, item_id: &str) -> bool {
        let Some(mut inventories) = self.load_for_update(installation) else {
            return false;
        };
        let Some(owned) = inventories.get_mut(player_id) else {
            return false;
        };
        let count = owned.get(item_id).copied().unwrap_or(0);
        if count == 0 {
            return false;
        }
        if count == 1 {
            owned.remove(item_id);
        } else {
            owned.insert(item_id.to_string(), count - 1);
        }
        self.save(installation, &inventories)
    }

    fn load(&self, installation: &str) -> Inventories {
        let path = installation_file(&self.dir, installation);
        match read_json::<Inventories>(&path) {
            Ok(value) => value.unwrap_or_default(),
            Err(error) => {
                warn!("[shop] {error}");
                Inventories::new()
            }
        }
    }

    fn load_for_update(&self, installation: &str) -> Option<Inventories> {
        let path = installation_file(&self.dir, installation);
        match read_json::<Inventories>(&path) {
            Ok(value) => Some(value.unwrap_or_default()),
            Err(error) => {
                warn!("[shop] refusing to update: {error}");
                None
            }
        }
    }

    fn save(&self, installation: &str, inventories: &Inventories) -> bool {
        let path = installation_file(&self.dir, installation);
        match write_json_atomic(&path, inventories) {
            Ok(()) => true,
            Err(error) => {
                warn!("[shop] {error}");
                false
            }
        }
    }
}
