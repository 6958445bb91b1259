//! Upstream match payload
//!
//! Mirrors the OpenDota `/matches/{id}` response. Every field is optional
//! upstream and schemas drift, so fields deserialize leniently: a missing,
//! null or mistyped value becomes its default rather than failing the whole
//! payload.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Deserialize any value, substituting the default when it has the wrong shape
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    if let Ok(parsed) = serde_json::from_value(value.clone()) {
        return Ok(parsed);
    }

    // Numbers sometimes arrive as floats or strings
    let number = value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
        .filter(|n| n.is_finite());

    Ok(number
        .and_then(|n| serde_json::from_value(Value::from(n.trunc() as i64)).ok())
        .unwrap_or_default())
}

/// List of records; elements that do not decode are dropped individually
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Positional list; elements that do not decode become their default
fn lenient_slots<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    })
}

/// Per-minute series; non-numeric points become 0
fn lenient_series<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(points) => points
            .iter()
            .map(|p| p.as_i64().or_else(|| p.as_f64().map(|f| f.round() as i64)).unwrap_or(0))
            .collect(),
        _ => Vec::new(),
    })
}

// =============================================================================
// Match
// =============================================================================

/// One raw match record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMatch {
    #[serde(deserialize_with = "lenient")]
    pub match_id: u64,
    /// Start time (unix seconds)
    #[serde(deserialize_with = "lenient")]
    pub start_time: i64,
    /// Duration in seconds
    #[serde(deserialize_with = "lenient")]
    pub duration: u32,
    #[serde(deserialize_with = "lenient")]
    pub radiant_win: bool,
    #[serde(deserialize_with = "lenient")]
    pub radiant_score: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub dire_score: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub radiant_team_id: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub dire_team_id: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub radiant_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub dire_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub radiant_team: Option<RawTeam>,
    #[serde(deserialize_with = "lenient")]
    pub dire_team: Option<RawTeam>,
    #[serde(deserialize_with = "lenient_list")]
    pub players: Vec<RawPlayer>,
    #[serde(deserialize_with = "lenient_list")]
    pub picks_bans: Vec<RawPickBan>,
    #[serde(deserialize_with = "lenient_list")]
    pub objectives: Vec<RawObjective>,
    #[serde(deserialize_with = "lenient_list")]
    pub teamfights: Vec<RawTeamfight>,
    #[serde(deserialize_with = "lenient_series")]
    pub radiant_gold_adv: Vec<i64>,
    #[serde(deserialize_with = "lenient_series")]
    pub radiant_xp_adv: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTeam {
    #[serde(deserialize_with = "lenient")]
    pub team_id: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub tag: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub logo_url: Option<String>,
}

// =============================================================================
// Player
// =============================================================================

/// Lane codes reported in `lane_role`
pub mod lane {
    pub const SAFE: u8 = 1;
    pub const MID: u8 = 2;
    pub const OFF: u8 = 3;
    pub const JUNGLE: u8 = 4;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPlayer {
    #[serde(deserialize_with = "lenient")]
    pub account_id: Option<u64>,
    /// 0-4 radiant, 128-132 dire
    #[serde(deserialize_with = "lenient")]
    pub player_slot: Option<u16>,
    #[serde(rename = "isRadiant", deserialize_with = "lenient")]
    pub is_radiant: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub hero_id: u32,
    #[serde(deserialize_with = "lenient")]
    pub personaname: Option<String>,
    /// Pro name, when registered
    #[serde(deserialize_with = "lenient")]
    pub name: Option<String>,

    #[serde(deserialize_with = "lenient")]
    pub kills: u32,
    #[serde(deserialize_with = "lenient")]
    pub deaths: u32,
    #[serde(deserialize_with = "lenient")]
    pub assists: u32,
    #[serde(deserialize_with = "lenient")]
    pub last_hits: u32,
    #[serde(deserialize_with = "lenient")]
    pub denies: u32,
    #[serde(deserialize_with = "lenient")]
    pub gold_per_min: u32,
    #[serde(deserialize_with = "lenient")]
    pub xp_per_min: u32,
    #[serde(deserialize_with = "lenient")]
    pub net_worth: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub total_gold: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub level: u32,
    #[serde(deserialize_with = "lenient")]
    pub hero_damage: u64,
    #[serde(deserialize_with = "lenient")]
    pub hero_healing: u64,
    #[serde(deserialize_with = "lenient")]
    pub tower_damage: u64,

    #[serde(deserialize_with = "lenient")]
    pub item_0: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub item_1: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub item_2: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub item_3: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub item_4: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub item_5: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub item_neutral: Option<u32>,

    /// Lane code, see [`lane`]
    #[serde(deserialize_with = "lenient")]
    pub lane_role: Option<u8>,
    #[serde(deserialize_with = "lenient")]
    pub is_roaming: Option<bool>,
    /// Uses per item name (e.g. "ward_observer")
    #[serde(deserialize_with = "lenient")]
    pub item_uses: HashMap<String, u32>,
}

impl RawPlayer {
    /// Inventory slots followed by the neutral slot
    pub fn item_slots(&self) -> [Option<u32>; 7] {
        [
            self.item_0,
            self.item_1,
            self.item_2,
            self.item_3,
            self.item_4,
            self.item_5,
            self.item_neutral,
        ]
    }

    pub fn item_use_count(&self, item: &str) -> u32 {
        self.item_uses.get(item).copied().unwrap_or(0)
    }
}

// =============================================================================
// Draft, Objectives, Team Fights
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPickBan {
    #[serde(deserialize_with = "lenient")]
    pub is_pick: bool,
    #[serde(deserialize_with = "lenient")]
    pub hero_id: u32,
    /// 0 radiant, 1 dire
    #[serde(deserialize_with = "lenient")]
    pub team: u8,
    #[serde(deserialize_with = "lenient")]
    pub order: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawObjective {
    /// Game time in seconds (negative before the horn)
    #[serde(deserialize_with = "lenient")]
    pub time: i64,
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub kind: String,
    #[serde(deserialize_with = "lenient")]
    pub player_slot: Option<u16>,
    /// 2 radiant, 3 dire
    #[serde(deserialize_with = "lenient")]
    pub team: Option<u8>,
    /// Building name for building kills; victim index for first blood
    pub key: Option<Value>,
    #[serde(deserialize_with = "lenient")]
    pub unit: Option<String>,
}

impl RawObjective {
    pub fn key_str(&self) -> Option<&str> {
        self.key.as_ref().and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTeamfight {
    #[serde(deserialize_with = "lenient")]
    pub start: i64,
    #[serde(deserialize_with = "lenient")]
    pub end: i64,
    #[serde(deserialize_with = "lenient")]
    pub deaths: u32,
    /// Aligned with the match's player list
    #[serde(deserialize_with = "lenient_slots")]
    pub players: Vec<RawTeamfightPlayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTeamfightPlayer {
    #[serde(deserialize_with = "lenient")]
    pub gold_delta: i64,
    #[serde(deserialize_with = "lenient")]
    pub deaths: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields_default() {
        let raw: RawMatch = serde_json::from_value(json!({"match_id": 7})).unwrap();
        assert_eq!(raw.match_id, 7);
        assert_eq!(raw.duration, 0);
        assert!(raw.players.is_empty());
        assert!(raw.radiant_gold_adv.is_empty());
    }

    #[test]
    fn test_mistyped_fields_default() {
        let raw: RawMatch = serde_json::from_value(json!({
            "match_id": 7,
            "duration": "2400",
            "radiant_win": "yes",
            "picks_bans": null,
            "players": [{"hero_id": 1, "kills": null, "gold_per_min": 612.7, "lane_role": "x"}]
        }))
        .unwrap();

        assert_eq!(raw.duration, 2400);
        assert!(!raw.radiant_win);
        assert!(raw.picks_bans.is_empty());

        let player = &raw.players[0];
        assert_eq!(player.kills, 0);
        assert_eq!(player.gold_per_min, 612);
        assert_eq!(player.lane_role, None);
    }

    #[test]
    fn test_bad_list_elements_dropped_individually() {
        let raw: RawMatch = serde_json::from_value(json!({
            "players": [{"player_slot": 0}, null, {"player_slot": 128}],
            "picks_bans": [{"is_pick": true, "hero_id": 5}, "garbage"],
            "teamfights": [{"start": 100, "players": [{"gold_delta": 50}, 7]}]
        }))
        .unwrap();

        assert_eq!(raw.players.len(), 2);
        assert_eq!(raw.players[0].player_slot, Some(0));
        assert_eq!(raw.players[1].player_slot, Some(128));
        assert_eq!(raw.picks_bans.len(), 1);
        assert_eq!(raw.picks_bans[0].hero_id, 5);
        // Team fight rows stay aligned with the roster
        let fight = &raw.teamfights[0].players;
        assert_eq!(fight.len(), 2);
        assert_eq!(fight[0].gold_delta, 50);
        assert_eq!(fight[1], RawTeamfightPlayer::default());
    }

    #[test]
    fn test_series_tolerates_bad_points() {
        let raw: RawMatch =
            serde_json::from_value(json!({"radiant_gold_adv": [0, 150.4, null, -300]})).unwrap();
        assert_eq!(raw.radiant_gold_adv, vec![0, 150, 0, -300]);
    }

    #[test]
    fn test_player_fields() {
        let player: RawPlayer = serde_json::from_value(json!({
            "player_slot": 130,
            "isRadiant": false,
            "item_0": 1,
            "item_1": 0,
            "item_uses": {"ward_observer": 4, "ward_sentry": 2}
        }))
        .unwrap();

        assert_eq!(player.is_radiant, Some(false));
        assert_eq!(player.item_slots()[0], Some(1));
        assert_eq!(player.item_use_count("ward_sentry"), 2);
        assert_eq!(player.item_use_count("tango"), 0);
    }

    #[test]
    fn test_objective_key_shapes() {
        let building: RawObjective = serde_json::from_value(json!({
            "time": 600, "type": "building_kill", "key": "npc_dota_badguys_tower1_mid"
        }))
        .unwrap();
        assert_eq!(building.key_str(), Some("npc_dota_badguys_tower1_mid"));

        let first_blood: RawObjective = serde_json::from_value(json!({
            "time": 90, "type": "CHAT_MESSAGE_FIRSTBLOOD", "key": 6, "player_slot": 2
        }))
        .unwrap();
        assert_eq!(first_blood.key_str(), None);
        assert_eq!(first_blood.player_slot, Some(2));
    }
}
