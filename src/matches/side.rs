//! Side assignment
//!
//! A player's explicit `isRadiant` flag wins; otherwise the slot decides
//! (slots below 128 are radiant). Every stage that needs a side goes
//! through these functions.

use crate::matches::model::{EventSide, Side};
use crate::matches::raw::RawPlayer;

/// First dire player slot
pub const DIRE_SLOT_BASE: u16 = 128;

/// Side for a bare player slot
pub fn side_of_slot(slot: u16) -> Side {
    if slot < DIRE_SLOT_BASE {
        Side::Radiant
    } else {
        Side::Dire
    }
}

/// Side of a player
pub fn player_side(player: &RawPlayer) -> Side {
    match player.is_radiant {
        Some(true) => Side::Radiant,
        Some(false) => Side::Dire,
        None => side_of_slot(player.player_slot.unwrap_or(0)),
    }
}

/// Side of whoever holds `slot`, preferring the roster's own flag
pub fn side_for_slot(players: &[RawPlayer], slot: u16) -> Side {
    players
        .iter()
        .find(|p| p.player_slot == Some(slot))
        .map(player_side)
        .unwrap_or_else(|| side_of_slot(slot))
}

/// Objective team code (2 radiant, 3 dire)
pub fn side_of_team_code(team: u8) -> Option<Side> {
    match team {
        2 => Some(Side::Radiant),
        3 => Some(Side::Dire),
        _ => None,
    }
}

/// Draft team code (0 radiant, 1 dire)
pub fn side_of_draft_team(team: u8) -> Option<Side> {
    match team {
        0 => Some(Side::Radiant),
        1 => Some(Side::Dire),
        _ => None,
    }
}

/// Split the roster, preserving upstream order within each side
pub fn split_by_side(players: &[RawPlayer]) -> (Vec<&RawPlayer>, Vec<&RawPlayer>) {
    players.iter().partition(|p| player_side(p) == Side::Radiant)
}

impl From<Option<Side>> for EventSide {
    fn from(side: Option<Side>) -> Self {
        side.map(EventSide::from).unwrap_or(EventSide::Neutral)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(slot: Option<u16>, is_radiant: Option<bool>) -> RawPlayer {
        RawPlayer {
            player_slot: slot,
            is_radiant,
            ..Default::default()
        }
    }

    #[test]
    fn test_slot_rule() {
        assert_eq!(side_of_slot(0), Side::Radiant);
        assert_eq!(side_of_slot(4), Side::Radiant);
        assert_eq!(side_of_slot(127), Side::Radiant);
        assert_eq!(side_of_slot(128), Side::Dire);
        assert_eq!(side_of_slot(132), Side::Dire);
    }

    #[test]
    fn test_flag_overrides_slot() {
        assert_eq!(player_side(&player(Some(130), Some(true))), Side::Radiant);
        assert_eq!(player_side(&player(Some(1), Some(false))), Side::Dire);
        assert_eq!(player_side(&player(Some(129), None)), Side::Dire);
        assert_eq!(player_side(&player(None, None)), Side::Radiant);
    }

    #[test]
    fn test_split_preserves_order() {
        let players = vec![
            player(Some(0), None),
            player(Some(128), None),
            player(Some(1), None),
            player(Some(2), Some(false)),
        ];
        let (radiant, dire) = split_by_side(&players);
        assert_eq!(radiant.len(), 2);
        assert_eq!(radiant[1].player_slot, Some(1));
        assert_eq!(dire.len(), 2);
        assert_eq!(dire[1].player_slot, Some(2));
    }

    #[test]
    fn test_slot_lookup_uses_roster_flag() {
        let players = vec![player(Some(3), Some(false))];
        assert_eq!(side_for_slot(&players, 3), Side::Dire);
        assert_eq!(side_for_slot(&players, 130), Side::Dire);
        assert_eq!(side_for_slot(&players, 4), Side::Radiant);
    }

    #[test]
    fn test_team_codes() {
        assert_eq!(side_of_team_code(2), Some(Side::Radiant));
        assert_eq!(side_of_team_code(3), Some(Side::Dire));
        assert_eq!(side_of_team_code(0), None);
        assert_eq!(side_of_draft_team(0), Some(Side::Radiant));
        assert_eq!(side_of_draft_team(1), Some(Side::Dire));
        assert_eq!(side_of_draft_team(2), None);
    }
}
