//! Normalized match model
//!
//! Built once per raw payload by [`process_match_data`](super::process_match_data)
//! and immutable afterwards. Serialized in camelCase for the dashboard.

use crate::matches::reference::{HeroRef, ItemRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Sides
// =============================================================================

/// One of the two teams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Radiant,
    Dire,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Radiant => Side::Dire,
            Side::Dire => Side::Radiant,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Radiant => "Radiant",
            Side::Dire => "Dire",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side credited with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSide {
    Radiant,
    Dire,
    Neutral,
}

impl EventSide {
    pub fn side(self) -> Option<Side> {
        match self {
            EventSide::Radiant => Some(Side::Radiant),
            EventSide::Dire => Some(Side::Dire),
            EventSide::Neutral => None,
        }
    }
}

impl From<Side> for EventSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Radiant => EventSide::Radiant,
            Side::Dire => EventSide::Dire,
        }
    }
}

// =============================================================================
// Teams & Draft
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamInfo {
    pub id: Option<u64>,
    pub name: String,
    pub tag: String,
    pub logo_url: Option<String>,
}

/// Position a player filled, inferred from lane and ward usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerRole {
    Carry,
    Mid,
    Offlane,
    Support,
    #[serde(rename = "Hard Support")]
    HardSupport,
    Roaming,
}

impl PlayerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerRole::Carry => "Carry",
            PlayerRole::Mid => "Mid",
            PlayerRole::Offlane => "Offlane",
            PlayerRole::Support => "Support",
            PlayerRole::HardSupport => "Hard Support",
            PlayerRole::Roaming => "Roaming",
        }
    }
}

impl fmt::Display for PlayerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A drafted hero. `role` is omitted entirely when unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroPick {
    pub account_id: Option<u64>,
    pub hero: HeroRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<PlayerRole>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub radiant_picks: Vec<HeroPick>,
    pub dire_picks: Vec<HeroPick>,
    /// Banned hero ids
    pub radiant_bans: Vec<String>,
    pub dire_bans: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickPosition {
    First,
    Second,
}

/// Which side picked first; both None when the draft has no picks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickOrder {
    pub radiant: Option<PickPosition>,
    pub dire: Option<PickPosition>,
}

// =============================================================================
// Events
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    FirstBlood,
    RoshanKill,
    AegisPickup,
    TowerKill,
    BarracksKill,
    TeamFight,
}

/// Type-specific event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventDetails {
    FirstBlood {
        #[serde(rename = "killerSlot")]
        killer_slot: Option<u16>,
    },
    Roshan {
        /// 1 for the first Roshan of the game
        #[serde(rename = "killNumber")]
        kill_number: u32,
    },
    Aegis {
        #[serde(rename = "playerSlot")]
        player_slot: Option<u16>,
    },
    Building {
        /// Upstream building name
        name: String,
        lane: Option<String>,
        tier: Option<u8>,
        owner: EventSide,
    },
    TeamFight {
        end: i64,
        deaths: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEvent {
    /// Game time in seconds
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub side: EventSide,
    pub details: EventDetails,
}

// =============================================================================
// Players
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub last_hits: u32,
    pub denies: u32,
    pub gpm: u32,
    pub xpm: u32,
    pub net_worth: u64,
    pub level: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroStats {
    pub damage_dealt: u64,
    pub healing_done: u64,
    pub tower_damage: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMatchData {
    pub account_id: u64,
    pub player_name: String,
    pub player_slot: u16,
    pub hero: HeroRef,
    pub role: Option<PlayerRole>,
    pub items: Vec<ItemRef>,
    pub stats: PlayerStats,
    pub hero_stats: HeroStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchPlayers {
    pub radiant: Vec<PlayerMatchData>,
    pub dire: Vec<PlayerMatchData>,
}

// =============================================================================
// Statistics
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub radiant: u32,
    pub dire: u32,
}

/// Per-minute advantage; `dire[i] == -radiant[i]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvantageSeries {
    pub minutes: Vec<u32>,
    pub radiant: Vec<i64>,
    pub dire: Vec<i64>,
}

impl AdvantageSeries {
    pub fn from_radiant(radiant: &[i64]) -> Self {
        Self {
            minutes: (0..radiant.len() as u32).collect(),
            radiant: radiant.to_vec(),
            dire: radiant.iter().map(|v| -v).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.minutes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.minutes.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStatistics {
    pub scores: Scores,
    pub gold_advantage_series: AdvantageSeries,
    pub xp_advantage_series: AdvantageSeries,
}

// =============================================================================
// Match
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: u64,
    pub date: DateTime<Utc>,
    /// Seconds
    pub duration: u32,
    pub radiant_team: TeamInfo,
    pub dire_team: TeamInfo,
    pub draft: Draft,
    pub players: MatchPlayers,
    pub events: Vec<MatchEvent>,
    pub statistics: MatchStatistics,
    pub result: Side,
    pub pick_order: PickOrder,
}

// =============================================================================
// Derived Views
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FightRecord {
    pub wins: u32,
    pub losses: u32,
}

/// Team fights won and lost by each side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamFightTally {
    pub radiant: FightRecord,
    pub dire: FightRecord,
    /// Fights won by the side that won the match
    pub won_by_winner: u32,
    /// Fights with no clear winner
    pub even: u32,
}

/// One row of the presentation timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub timestamp: i64,
    /// `mm:ss` game clock
    pub clock: String,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub side: EventSide,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_names() {
        assert_eq!(serde_json::to_value(PlayerRole::HardSupport).unwrap(), json!("Hard Support"));
        assert_eq!(PlayerRole::Offlane.to_string(), "Offlane");
    }

    #[test]
    fn test_pick_without_role_omits_field() {
        let pick = HeroPick {
            account_id: Some(1),
            hero: HeroRef::new(1, "Anti-Mage"),
            role: None,
        };
        let value = serde_json::to_value(&pick).unwrap();
        assert!(value.as_object().unwrap().get("role").is_none());
        assert_eq!(value["accountId"], json!(1));
    }

    #[test]
    fn test_pick_order_serializes_nulls() {
        let order = PickOrder::default();
        assert_eq!(
            serde_json::to_value(order).unwrap(),
            json!({"radiant": null, "dire": null})
        );
    }

    #[test]
    fn test_advantage_series_negates() {
        let series = AdvantageSeries::from_radiant(&[0, 200, -150]);
        assert_eq!(series.minutes, vec![0, 1, 2]);
        assert_eq!(series.dire, vec![0, -200, 150]);
    }

    #[test]
    fn test_event_serialization() {
        let event = MatchEvent {
            timestamp: 600,
            kind: EventType::TowerKill,
            side: EventSide::Radiant,
            details: EventDetails::Building {
                name: "npc_dota_badguys_tower1_mid".into(),
                lane: Some("mid".into()),
                tier: Some(1),
                owner: EventSide::Dire,
            },
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], json!("tower_kill"));
        assert_eq!(value["side"], json!("radiant"));
        assert_eq!(value["details"]["kind"], json!("building"));
        assert_eq!(value["details"]["owner"], json!("dire"));

        let back: MatchEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }
}
