//! Player conversion

use crate::matches::model::{HeroStats, PlayerMatchData, PlayerRole, PlayerStats};
use crate::matches::raw::RawPlayer;
use crate::matches::reference::{HeroRef, HeroTable, ItemRef, ItemTable};

/// Display name: pro name, then persona name, then "Player {id}"
pub fn player_name(player: &RawPlayer) -> String {
    [player.name.as_deref(), player.personaname.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Player {}", player.account_id.unwrap_or(0)))
}

pub fn convert_player(
    player: &RawPlayer,
    role: Option<PlayerRole>,
    heroes: &HeroTable,
    items: &ItemTable,
) -> PlayerMatchData {
    let hero = heroes
        .get(&player.hero_id)
        .cloned()
        .unwrap_or_else(|| HeroRef::placeholder(player.hero_id));

    let inventory = player
        .item_slots()
        .into_iter()
        .flatten()
        .filter(|&id| id != 0)
        .map(|id| items.get(&id).cloned().unwrap_or_else(|| ItemRef::placeholder(id)))
        .collect();

    PlayerMatchData {
        account_id: player.account_id.unwrap_or(0),
        player_name: player_name(player),
        player_slot: player.player_slot.unwrap_or(0),
        hero,
        role,
        items: inventory,
        stats: PlayerStats {
            kills: player.kills,
            deaths: player.deaths,
            assists: player.assists,
            last_hits: player.last_hits,
            denies: player.denies,
            gpm: player.gold_per_min,
            xpm: player.xp_per_min,
            net_worth: player.net_worth.or(player.total_gold).unwrap_or(0),
            level: player.level,
        },
        hero_stats: HeroStats {
            damage_dealt: player.hero_damage,
            healing_done: player.hero_healing,
            tower_damage: player.tower_damage,
        },
    }
}
