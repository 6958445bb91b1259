//! Hero and item reference tables
//!
//! Loaded from OpenDota-style constants, which come either as an array of
//! records or as a map keyed by id (heroes) or internal name (items).

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A hero as referenced by picks and player rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroRef {
    pub id: u32,
    /// Internal name (e.g. "npc_dota_hero_antimage")
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "localized_name")]
    pub localized_name: String,
    #[serde(default, alias = "primary_attr", skip_serializing_if = "Option::is_none")]
    pub primary_attr: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl HeroRef {
    pub fn new(id: u32, localized_name: impl Into<String>) -> Self {
        Self {
            id,
            name: String::new(),
            localized_name: localized_name.into(),
            primary_attr: None,
            roles: Vec::new(),
        }
    }

    /// Stand-in for a hero missing from the table
    pub fn placeholder(id: u32) -> Self {
        Self::new(id, format!("Hero {}", id))
    }

    pub fn display_name(&self) -> &str {
        if self.localized_name.is_empty() {
            &self.name
        } else {
            &self.localized_name
        }
    }
}

/// An item as shown in a player's inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRef {
    pub id: u32,
    /// Internal name (e.g. "blink")
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "dname")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<u32>,
}

impl ItemRef {
    pub fn new(id: u32, display_name: impl Into<String>) -> Self {
        Self {
            id,
            name: String::new(),
            display_name: display_name.into(),
            cost: None,
        }
    }

    /// Stand-in for an item missing from the table
    pub fn placeholder(id: u32) -> Self {
        Self::new(id, format!("Item {}", id))
    }
}

pub type HeroTable = HashMap<u32, HeroRef>;
pub type ItemTable = HashMap<u32, ItemRef>;

#[derive(Deserialize)]
#[serde(untagged)]
enum Records<T> {
    List(Vec<T>),
    Keyed(HashMap<String, T>),
}

impl<T> Records<T> {
    fn into_pairs(self) -> Vec<(Option<String>, T)> {
        match self {
            Records::List(items) => items.into_iter().map(|item| (None, item)).collect(),
            Records::Keyed(map) => map.into_iter().map(|(k, item)| (Some(k), item)).collect(),
        }
    }
}

/// Parse a hero table from JSON
pub fn heroes_from_json(json: &str) -> Result<HeroTable> {
    let records: Records<HeroRef> = serde_json::from_str(json)?;
    Ok(records
        .into_pairs()
        .into_iter()
        .map(|(_, hero)| (hero.id, hero))
        .collect())
}

/// Parse an item table from JSON; map keys fill in missing internal names
pub fn items_from_json(json: &str) -> Result<ItemTable> {
    let records: Records<ItemRef> = serde_json::from_str(json)?;
    Ok(records
        .into_pairs()
        .into_iter()
        .map(|(key, mut item)| {
            if item.name.is_empty() {
                if let Some(key) = key {
                    item.name = key;
                }
            }
            (item.id, item)
        })
        .collect())
}

/// Both reference tables, shared by every pipeline call
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub heroes: HeroTable,
    pub items: ItemTable,
}

impl ReferenceData {
    pub fn new(heroes: HeroTable, items: ItemTable) -> Self {
        Self { heroes, items }
    }

    pub fn from_lists(heroes: Vec<HeroRef>, items: Vec<ItemRef>) -> Self {
        Self {
            heroes: heroes.into_iter().map(|h| (h.id, h)).collect(),
            items: items.into_iter().map(|i| (i.id, i)).collect(),
        }
    }

    pub fn from_json(heroes_json: &str, items_json: &str) -> Result<Self> {
        Ok(Self::new(heroes_from_json(heroes_json)?, items_from_json(items_json)?))
    }

    pub fn hero(&self, id: u32) -> Option<&HeroRef> {
        self.heroes.get(&id)
    }

    pub fn item(&self, id: u32) -> Option<&ItemRef> {
        self.items.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heroes_from_keyed_constants() {
        let json = r#"{
            "1": {"id": 1, "name": "npc_dota_hero_antimage", "localized_name": "Anti-Mage",
                  "primary_attr": "agi", "roles": ["Carry", "Escape"]},
            "2": {"id": 2, "name": "npc_dota_hero_axe", "localized_name": "Axe"}
        }"#;
        let heroes = heroes_from_json(json).unwrap();

        assert_eq!(heroes.len(), 2);
        assert_eq!(heroes[&1].localized_name, "Anti-Mage");
        assert_eq!(heroes[&1].primary_attr.as_deref(), Some("agi"));
        assert_eq!(heroes[&2].display_name(), "Axe");
    }

    #[test]
    fn test_items_from_keyed_constants_take_name_from_key() {
        let json = r#"{"blink": {"id": 1, "dname": "Blink Dagger", "cost": 2250}}"#;
        let items = items_from_json(json).unwrap();

        let blink = &items[&1];
        assert_eq!(blink.name, "blink");
        assert_eq!(blink.display_name, "Blink Dagger");
        assert_eq!(blink.cost, Some(2250));
    }

    #[test]
    fn test_tables_from_lists() {
        let heroes = heroes_from_json(r#"[{"id": 5, "localizedName": "Crystal Maiden"}]"#).unwrap();
        assert_eq!(heroes[&5].display_name(), "Crystal Maiden");

        let data = ReferenceData::from_lists(vec![HeroRef::new(1, "Anti-Mage")], vec![]);
        assert!(data.hero(1).is_some());
        assert!(data.item(1).is_none());
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(HeroRef::placeholder(999).display_name(), "Hero 999");
        assert_eq!(ItemRef::placeholder(42).display_name, "Item 42");
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(heroes_from_json("not json").is_err());
    }
}
