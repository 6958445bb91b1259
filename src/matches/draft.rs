//! Draft reconstruction
//!
//! Picks and bans come as one ordered log. Entries naming a hero that is not
//! in the reference table, or an unknown team code, are skipped.

use crate::matches::model::{Draft, HeroPick, PickOrder, PickPosition, PlayerRole, Side};
use crate::matches::raw::{RawPickBan, RawPlayer};
use crate::matches::reference::HeroTable;
use crate::matches::side::side_of_draft_team;

/// Which side made the first pick.
///
/// Both sides are None when the log has no picks.
pub fn determine_pick_order(picks_bans: &[RawPickBan]) -> PickOrder {
    let first = picks_bans
        .iter()
        .find(|entry| entry.is_pick)
        .and_then(|entry| side_of_draft_team(entry.team));

    match first {
        Some(Side::Radiant) => PickOrder {
            radiant: Some(PickPosition::First),
            dire: Some(PickPosition::Second),
        },
        Some(Side::Dire) => PickOrder {
            radiant: Some(PickPosition::Second),
            dire: Some(PickPosition::First),
        },
        None => PickOrder::default(),
    }
}

/// Convert the log into per-side picks (roles unassigned) and bans
pub fn convert_draft(picks_bans: &[RawPickBan], heroes: &HeroTable) -> Draft {
    let mut draft = Draft::default();

    for entry in picks_bans {
        let Some(hero) = heroes.get(&entry.hero_id) else {
            continue;
        };
        let Some(side) = side_of_draft_team(entry.team) else {
            continue;
        };

        if entry.is_pick {
            let pick = HeroPick {
                account_id: None,
                hero: hero.clone(),
                role: None,
            };
            match side {
                Side::Radiant => draft.radiant_picks.push(pick),
                Side::Dire => draft.dire_picks.push(pick),
            }
        } else {
            let ban = entry.hero_id.to_string();
            match side {
                Side::Radiant => draft.radiant_bans.push(ban),
                Side::Dire => draft.dire_bans.push(ban),
            }
        }
    }

    draft
}

/// Copy each roster player's role and account onto the pick of their hero.
///
/// A pick with no matching player loses its role.
pub fn backfill_pick_roles(picks: &mut [HeroPick], roster: &[&RawPlayer], roles: &[Option<PlayerRole>]) {
    for pick in picks.iter_mut() {
        let matched = roster
            .iter()
            .zip(roles)
            .find(|(player, _)| player.hero_id == pick.hero.id);

        match matched {
            Some((player, role)) => {
                pick.role = *role;
                if player.account_id.is_some() {
                    pick.account_id = player.account_id;
                }
            }
            None => pick.role = None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matches::reference::HeroRef;

    fn entry(is_pick: bool, hero_id: u32, team: u8) -> RawPickBan {
        RawPickBan {
            is_pick,
            hero_id,
            team,
            order: 0,
        }
    }

    fn heroes() -> HeroTable {
        [
            HeroRef::new(1, "Anti-Mage"),
            HeroRef::new(2, "Axe"),
            HeroRef::new(3, "Bane"),
        ]
        .into_iter()
        .map(|h| (h.id, h))
        .collect()
    }

    #[test]
    fn test_pick_order_radiant_first() {
        let log = vec![entry(false, 1, 1), entry(true, 2, 0), entry(true, 3, 1)];
        assert_eq!(
            determine_pick_order(&log),
            PickOrder {
                radiant: Some(PickPosition::First),
                dire: Some(PickPosition::Second),
            }
        );
    }

    #[test]
    fn test_pick_order_dire_first() {
        let log = vec![entry(true, 2, 1)];
        assert_eq!(determine_pick_order(&log).dire, Some(PickPosition::First));
    }

    #[test]
    fn test_pick_order_unknown_without_picks() {
        assert_eq!(determine_pick_order(&[]), PickOrder::default());
        assert_eq!(determine_pick_order(&[entry(false, 1, 0)]), PickOrder::default());
    }

    #[test]
    fn test_convert_draft() {
        let log = vec![
            entry(false, 3, 0),
            entry(false, 1, 1),
            entry(true, 2, 0),
            entry(true, 1, 1),
        ];
        let draft = convert_draft(&log, &heroes());

        assert_eq!(draft.radiant_bans, vec!["3"]);
        assert_eq!(draft.dire_bans, vec!["1"]);
        assert_eq!(draft.radiant_picks.len(), 1);
        assert_eq!(draft.radiant_picks[0].hero.localized_name, "Axe");
        assert!(draft.radiant_picks[0].role.is_none());
        assert_eq!(draft.dire_picks[0].hero.id, 1);
    }

    #[test]
    fn test_unknown_hero_dropped() {
        let log = vec![entry(true, 999, 0), entry(false, 998, 1), entry(true, 1, 0)];
        let draft = convert_draft(&log, &heroes());

        assert_eq!(draft.radiant_picks.len(), 1);
        assert!(draft.dire_bans.is_empty());
        assert!(draft.dire_picks.is_empty());
    }

    #[test]
    fn test_backfill_sets_and_clears_roles() {
        let carry = RawPlayer {
            account_id: Some(42),
            hero_id: 1,
            ..Default::default()
        };
        let roster = vec![&carry];
        let roles = vec![Some(PlayerRole::Carry)];

        let mut picks = vec![
            HeroPick {
                account_id: None,
                hero: HeroRef::new(1, "Anti-Mage"),
                role: None,
            },
            HeroPick {
                account_id: None,
                hero: HeroRef::new(2, "Axe"),
                role: Some(PlayerRole::Offlane),
            },
        ];

        backfill_pick_roles(&mut picks, &roster, &roles);

        assert_eq!(picks[0].role, Some(PlayerRole::Carry));
        assert_eq!(picks[0].account_id, Some(42));
        assert_eq!(picks[1].role, None);

        let value = serde_json::to_value(&picks[1]).unwrap();
        assert!(value.get("role").is_none());
    }
}
