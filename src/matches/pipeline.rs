//! Match processing pipeline
//!
//! ```text
//!   RawMatch ──► side split ──► advantage series ──► pick order ──► draft
//!                    │                                               │
//!                    ▼                                               ▼
//!                 events ──► roles (per side) ──► pick-role backfill ──► players
//!                                                                        │
//!                                                                        ▼
//!                                                                      Match
//! ```
//!
//! Pure and synchronous: no I/O, inputs are only borrowed. Missing or
//! malformed optional fields never fail processing.

use crate::matches::draft::{backfill_pick_roles, convert_draft, determine_pick_order};
use crate::matches::events::{game_event_timeline, generate_events, team_fight_tally};
use crate::matches::model::{
    AdvantageSeries, GameEvent, Match, MatchPlayers, MatchStatistics, Scores, Side, TeamFightTally,
    TeamInfo,
};
use crate::matches::players::convert_player;
use crate::matches::raw::{RawMatch, RawPlayer, RawTeam};
use crate::matches::reference::{HeroTable, ItemTable, ReferenceData};
use crate::matches::roles::detect_roles;
use crate::matches::side::split_by_side;
use chrono::{DateTime, Utc};

fn team_info(team: Option<&RawTeam>, id: Option<u64>, name: Option<&str>, side: Side) -> TeamInfo {
    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };

    TeamInfo {
        id: team.and_then(|t| t.team_id).or(id),
        name: team
            .and_then(|t| t.name.as_deref())
            .or(name)
            .and_then(non_empty)
            .unwrap_or_else(|| side.as_str().to_string()),
        tag: team
            .and_then(|t| t.tag.as_deref())
            .and_then(non_empty)
            .unwrap_or_default(),
        logo_url: team.and_then(|t| t.logo_url.clone()),
    }
}

fn kills(roster: &[&RawPlayer]) -> u32 {
    roster.iter().map(|p| p.kills).sum()
}

/// Normalize one raw match
pub fn process_match_data(raw: &RawMatch, heroes: &HeroTable, items: &ItemTable) -> Match {
    let (radiant, dire) = split_by_side(&raw.players);

    let statistics = MatchStatistics {
        scores: Scores {
            radiant: raw.radiant_score.unwrap_or_else(|| kills(&radiant)),
            dire: raw.dire_score.unwrap_or_else(|| kills(&dire)),
        },
        gold_advantage_series: AdvantageSeries::from_radiant(&raw.radiant_gold_adv),
        xp_advantage_series: AdvantageSeries::from_radiant(&raw.radiant_xp_adv),
    };

    let pick_order = determine_pick_order(&raw.picks_bans);
    let mut draft = convert_draft(&raw.picks_bans, heroes);
    let events = generate_events(raw);

    let radiant_roles = detect_roles(&radiant);
    let dire_roles = detect_roles(&dire);

    backfill_pick_roles(&mut draft.radiant_picks, &radiant, &radiant_roles);
    backfill_pick_roles(&mut draft.dire_picks, &dire, &dire_roles);

    let players = MatchPlayers {
        radiant: radiant
            .iter()
            .zip(&radiant_roles)
            .map(|(p, role)| convert_player(p, *role, heroes, items))
            .collect(),
        dire: dire
            .iter()
            .zip(&dire_roles)
            .map(|(p, role)| convert_player(p, *role, heroes, items))
            .collect(),
    };

    Match {
        id: raw.match_id,
        date: DateTime::<Utc>::from_timestamp(raw.start_time, 0).unwrap_or_default(),
        duration: raw.duration,
        radiant_team: team_info(
            raw.radiant_team.as_ref(),
            raw.radiant_team_id,
            raw.radiant_name.as_deref(),
            Side::Radiant,
        ),
        dire_team: team_info(
            raw.dire_team.as_ref(),
            raw.dire_team_id,
            raw.dire_name.as_deref(),
            Side::Dire,
        ),
        draft,
        players,
        events,
        statistics,
        result: if raw.radiant_win { Side::Radiant } else { Side::Dire },
        pick_order,
    }
}

/// Normalize one raw match against loaded reference data
pub fn process_with(raw: &RawMatch, reference: &ReferenceData) -> Match {
    process_match_data(raw, &reference.heroes, &reference.items)
}

impl Match {
    /// Team fights won and lost per side
    pub fn team_fight_tally(&self) -> TeamFightTally {
        team_fight_tally(&self.events, self.result)
    }

    /// Chronological rows with readable descriptions
    pub fn game_events(&self) -> Vec<GameEvent> {
        game_event_timeline(&self.events)
    }

    pub fn winner(&self) -> &TeamInfo {
        match self.result {
            Side::Radiant => &self.radiant_team,
            Side::Dire => &self.dire_team,
        }
    }
}
