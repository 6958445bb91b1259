//! Role detection
//!
//! Heuristic classifier run independently per side. Players are grouped by
//! lane code; within a lane, support score (observer uses + 2 × sentry uses)
//! ranks who played the support position:
//!
//! ```text
//!   mid  : first player                 → Mid
//!   safe : 1 → Carry
//!          2 → [Carry, Hard Support]              (ascending score)
//!   off  : 1 → Offlane
//!          2 → [Offlane, Support]
//!          3 → [Offlane, Support, Hard Support]
//!   rest : Roaming if flagged roaming, else unassigned
//! ```
//!
//! Lanes holding any other player count are left unassigned. Ties keep
//! roster order.

use crate::matches::model::PlayerRole;
use crate::matches::raw::{lane, RawPlayer};

/// Observer uses plus twice the sentry uses
pub fn support_score(player: &RawPlayer) -> u32 {
    player.item_use_count("ward_observer") + 2 * player.item_use_count("ward_sentry")
}

/// Indices of `players` in `lane_code`, stably sorted by ascending support score
fn lane_by_score(players: &[&RawPlayer], lane_code: u8) -> Vec<usize> {
    let mut indices: Vec<usize> = players
        .iter()
        .enumerate()
        .filter(|(_, p)| p.lane_role == Some(lane_code))
        .map(|(i, _)| i)
        .collect();
    indices.sort_by_key(|&i| support_score(players[i]));
    indices
}

/// Detect roles for one side; the result is aligned with `players`
pub fn detect_roles(players: &[&RawPlayer]) -> Vec<Option<PlayerRole>> {
    let mut roles: Vec<Option<PlayerRole>> = vec![None; players.len()];

    if let Some(first_mid) = players.iter().position(|p| p.lane_role == Some(lane::MID)) {
        roles[first_mid] = Some(PlayerRole::Mid);
    }

    let safe = lane_by_score(players, lane::SAFE);
    let safe_roles: &[PlayerRole] = match safe.len() {
        1 => &[PlayerRole::Carry],
        2 => &[PlayerRole::Carry, PlayerRole::HardSupport],
        _ => &[],
    };
    for (&index, &role) in safe.iter().zip(safe_roles) {
        roles[index] = Some(role);
    }

    let off = lane_by_score(players, lane::OFF);
    let off_roles: &[PlayerRole] = match off.len() {
        1 => &[PlayerRole::Offlane],
        2 => &[PlayerRole::Offlane, PlayerRole::Support],
        3 => &[PlayerRole::Offlane, PlayerRole::Support, PlayerRole::HardSupport],
        _ => &[],
    };
    for (&index, &role) in off.iter().zip(off_roles) {
        roles[index] = Some(role);
    }

    for (role, player) in roles.iter_mut().zip(players) {
        if role.is_none() && player.is_roaming == Some(true) {
            *role = Some(PlayerRole::Roaming);
        }
    }

    roles
}
