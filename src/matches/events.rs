//! Event timeline
//!
//! Raw objectives and team fights become [`MatchEvent`]s sorted by game
//! time. Unrecognized objective types are dropped so new upstream types do
//! not break processing.
//!
//! Side credited with an objective, first match wins:
//!
//! ```text
//!   player_slot present   → side of that slot's player
//!   team code (2/3)       → radiant / dire
//!   building owner known  → owner's opponent
//!   otherwise             → neutral
//! ```

use crate::matches::model::{
    EventDetails, EventSide, EventType, FightRecord, GameEvent, MatchEvent, Side, TeamFightTally,
};
use crate::matches::raw::{RawMatch, RawObjective, RawPlayer, RawTeamfight};
use crate::matches::side::{player_side, side_for_slot, side_of_team_code};

// =============================================================================
// Objective Types
// =============================================================================

const FIRST_BLOOD: &str = "CHAT_MESSAGE_FIRSTBLOOD";
const ROSHAN_KILL: &str = "CHAT_MESSAGE_ROSHAN_KILL";
const AEGIS: &str = "CHAT_MESSAGE_AEGIS";
const BUILDING_KILL: &str = "building_kill";
const TOWER_KILL: &str = "CHAT_MESSAGE_TOWER_KILL";
const BARRACKS_KILL: &str = "CHAT_MESSAGE_BARRACKS_KILL";

/// A destroyed building parsed from its upstream name
#[derive(Debug, Clone, PartialEq)]
struct Building {
    kind: EventType,
    owner: Option<Side>,
    lane: Option<String>,
    tier: Option<u8>,
}

/// Parse names like `npc_dota_badguys_tower2_bot` or `npc_dota_goodguys_melee_rax_top`
fn parse_building(name: &str) -> Option<Building> {
    let kind = if name.contains("tower") {
        EventType::TowerKill
    } else if name.contains("rax") {
        EventType::BarracksKill
    } else {
        return None;
    };

    let owner = if name.contains("goodguys") {
        Some(Side::Radiant)
    } else if name.contains("badguys") {
        Some(Side::Dire)
    } else {
        None
    };

    let lane = ["top", "mid", "bot"]
        .into_iter()
        .find(|lane| name.ends_with(lane))
        .map(str::to_string);

    let tier = name
        .split('_')
        .find_map(|part| part.strip_prefix("tower"))
        .and_then(|digits| digits.parse::<u8>().ok());

    Some(Building {
        kind,
        owner,
        lane,
        tier,
    })
}

fn credited_side(objective: &RawObjective, players: &[RawPlayer], owner: Option<Side>) -> EventSide {
    if let Some(slot) = objective.player_slot {
        return side_for_slot(players, slot).into();
    }
    if let Some(side) = objective.team.and_then(side_of_team_code) {
        return side.into();
    }
    owner.map(Side::opposite).into()
}

fn building_event(objective: &RawObjective, players: &[RawPlayer]) -> Option<MatchEvent> {
    let name = objective.key_str().unwrap_or_default();
    let parsed = parse_building(name);

    let building = match (objective.kind.as_str(), parsed) {
        (BUILDING_KILL, parsed) => parsed?,
        (TOWER_KILL, Some(b)) if b.kind == EventType::TowerKill => b,
        (BARRACKS_KILL, Some(b)) if b.kind == EventType::BarracksKill => b,
        (TOWER_KILL, _) => Building {
            kind: EventType::TowerKill,
            owner: None,
            lane: None,
            tier: None,
        },
        (BARRACKS_KILL, _) => Building {
            kind: EventType::BarracksKill,
            owner: None,
            lane: None,
            tier: None,
        },
        _ => return None,
    };

    Some(MatchEvent {
        timestamp: objective.time,
        kind: building.kind,
        side: credited_side(objective, players, building.owner),
        details: EventDetails::Building {
            name: name.to_string(),
            lane: building.lane,
            tier: building.tier,
            owner: building.owner.into(),
        },
    })
}

/// Map one objective; `roshan_kills` counts Roshan kills seen so far
fn objective_event(
    objective: &RawObjective,
    players: &[RawPlayer],
    roshan_kills: &mut u32,
) -> Option<MatchEvent> {
    let (kind, details) = match objective.kind.as_str() {
        FIRST_BLOOD => (
            EventType::FirstBlood,
            EventDetails::FirstBlood {
                killer_slot: objective.player_slot,
            },
        ),
        ROSHAN_KILL => {
            *roshan_kills += 1;
            (
                EventType::RoshanKill,
                EventDetails::Roshan {
                    kill_number: *roshan_kills,
                },
            )
        }
        AEGIS => (
            EventType::AegisPickup,
            EventDetails::Aegis {
                player_slot: objective.player_slot,
            },
        ),
        BUILDING_KILL | TOWER_KILL | BARRACKS_KILL => return building_event(objective, players),
        _ => return None,
    };

    Some(MatchEvent {
        timestamp: objective.time,
        kind,
        side: credited_side(objective, players, None),
        details,
    })
}

/// Team fight won by the side whose players gained more gold
fn team_fight_event(fight: &RawTeamfight, players: &[RawPlayer]) -> MatchEvent {
    let (mut radiant_gain, mut dire_gain) = (0i64, 0i64);

    for (index, delta) in fight.players.iter().enumerate() {
        match players.get(index).map(player_side) {
            Some(Side::Radiant) => radiant_gain += delta.gold_delta,
            Some(Side::Dire) => dire_gain += delta.gold_delta,
            None => {}
        }
    }

    let side = match radiant_gain.cmp(&dire_gain) {
        std::cmp::Ordering::Greater => EventSide::Radiant,
        std::cmp::Ordering::Less => EventSide::Dire,
        std::cmp::Ordering::Equal => EventSide::Neutral,
    };

    MatchEvent {
        timestamp: fight.start,
        kind: EventType::TeamFight,
        side,
        details: EventDetails::TeamFight {
            end: fight.end,
            deaths: fight.deaths,
        },
    }
}

/// Build the event list, sorted by timestamp ascending
pub fn generate_events(raw: &RawMatch) -> Vec<MatchEvent> {
    let mut objectives: Vec<&RawObjective> = raw.objectives.iter().collect();
    objectives.sort_by_key(|objective| objective.time);

    let mut roshan_kills = 0u32;
    let mut events: Vec<MatchEvent> = objectives
        .into_iter()
        .filter_map(|objective| objective_event(objective, &raw.players, &mut roshan_kills))
        .collect();

    events.extend(
        raw.teamfights
            .iter()
            .map(|fight| team_fight_event(fight, &raw.players)),
    );

    events.sort_by_key(|event| event.timestamp);
    events
}

// =============================================================================
// Derived Views
// =============================================================================

/// Tally team fights per side, relative to the match winner
pub fn team_fight_tally(events: &[MatchEvent], winner: Side) -> TeamFightTally {
    let mut tally = TeamFightTally::default();

    for event in events.iter().filter(|e| e.kind == EventType::TeamFight) {
        let (won, lost): (&mut FightRecord, &mut FightRecord) = match event.side {
            EventSide::Radiant => (&mut tally.radiant, &mut tally.dire),
            EventSide::Dire => (&mut tally.dire, &mut tally.radiant),
            EventSide::Neutral => {
                tally.even += 1;
                continue;
            }
        };
        won.wins += 1;
        lost.losses += 1;

        if event.side.side() == Some(winner) {
            tally.won_by_winner += 1;
        }
    }

    tally
}

/// Format seconds as a `mm:ss` game clock (negative before the horn)
pub fn format_clock(seconds: i64) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let total = seconds.unsigned_abs();
    format!("{}{}:{:02}", sign, total / 60, total % 60)
}

fn describe(event: &MatchEvent) -> String {
    let actor = match event.side.side() {
        Some(side) => side.as_str(),
        None => "",
    };

    match (&event.details, actor) {
        (EventDetails::FirstBlood { .. }, "") => "First blood".to_string(),
        (EventDetails::FirstBlood { .. }, actor) => format!("{} drew first blood", actor),
        (EventDetails::Roshan { kill_number }, "") => format!("Roshan slain (#{})", kill_number),
        (EventDetails::Roshan { kill_number }, actor) => {
            format!("{} slew Roshan (#{})", actor, kill_number)
        }
        (EventDetails::Aegis { .. }, "") => "Aegis claimed".to_string(),
        (EventDetails::Aegis { .. }, actor) => format!("{} picked up the Aegis", actor),
        (EventDetails::Building { lane, tier, .. }, actor) => {
            let what = match (event.kind, lane, tier) {
                (EventType::TowerKill, Some(lane), Some(tier)) => format!("tier {} {} tower", tier, lane),
                (EventType::TowerKill, _, _) => "a tower".to_string(),
                (_, Some(lane), _) => format!("{} barracks", lane),
                _ => "barracks".to_string(),
            };
            if actor.is_empty() {
                format!("Destroyed {}", what)
            } else {
                format!("{} destroyed {}", actor, what)
            }
        }
        (EventDetails::TeamFight { deaths, .. }, "") => format!("Even team fight ({} deaths)", deaths),
        (EventDetails::TeamFight { deaths, .. }, actor) => {
            format!("{} won a team fight ({} deaths)", actor, deaths)
        }
    }
}

/// Flatten events into presentation rows
pub fn game_event_timeline(events: &[MatchEvent]) -> Vec<GameEvent> {
    events
        .iter()
        .map(|event| GameEvent {
            timestamp: event.timestamp,
            clock: format_clock(event.timestamp),
            kind: event.kind,
            side: event.side,
            description: describe(event),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matches::raw::RawTeamfightPlayer;
    use serde_json::json;

    fn objective(time: i64, kind: &str) -> RawObjective {
        RawObjective {
            time,
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    fn roster() -> Vec<RawPlayer> {
        (0..5u16)
            .map(|s| RawPlayer {
                player_slot: Some(s),
                ..Default::default()
            })
            .chain((128..133u16).map(|s| RawPlayer {
                player_slot: Some(s),
                ..Default::default()
            }))
            .collect()
    }

    #[test]
    fn test_events_sorted_by_time() {
        let raw = RawMatch {
            objectives: vec![
                objective(50, ROSHAN_KILL),
                objective(10, FIRST_BLOOD),
                objective(30, AEGIS),
            ],
            ..Default::default()
        };
        let timestamps: Vec<i64> = generate_events(&raw).iter().map(|e| e.timestamp).collect();
        assert_eq!(timestamps, vec![10, 30, 50]);
    }

    #[test]
    fn test_unknown_objective_dropped() {
        let raw = RawMatch {
            objectives: vec![objective(5, "CHAT_MESSAGE_COURIER_LOST"), objective(8, FIRST_BLOOD)],
            ..Default::default()
        };
        let events = generate_events(&raw);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventType::FirstBlood);
    }

    #[test]
    fn test_first_blood_side_from_slot() {
        let raw = RawMatch {
            players: roster(),
            objectives: vec![RawObjective {
                player_slot: Some(130),
                ..objective(95, FIRST_BLOOD)
            }],
            ..Default::default()
        };
        let events = generate_events(&raw);
        assert_eq!(events[0].side, EventSide::Dire);
        assert_eq!(events[0].details, EventDetails::FirstBlood { killer_slot: Some(130) });
    }

    #[test]
    fn test_roshan_team_code_and_numbering() {
        let raw = RawMatch {
            objectives: vec![
                RawObjective {
                    team: Some(3),
                    ..objective(2400, ROSHAN_KILL)
                },
                RawObjective {
                    team: Some(2),
                    ..objective(1200, ROSHAN_KILL)
                },
            ],
            ..Default::default()
        };
        let events = generate_events(&raw);
        assert_eq!(events[0].side, EventSide::Radiant);
        assert_eq!(events[0].details, EventDetails::Roshan { kill_number: 1 });
        assert_eq!(events[1].side, EventSide::Dire);
        assert_eq!(events[1].details, EventDetails::Roshan { kill_number: 2 });
    }

    #[test]
    fn test_building_kills() {
        let raw = RawMatch {
            objectives: vec![
                RawObjective {
                    key: Some(json!("npc_dota_badguys_tower1_mid")),
                    ..objective(600, BUILDING_KILL)
                },
                RawObjective {
                    key: Some(json!("npc_dota_goodguys_melee_rax_bot")),
                    ..objective(1800, BUILDING_KILL)
                },
                RawObjective {
                    key: Some(json!("npc_dota_goodguys_fort")),
                    ..objective(2500, BUILDING_KILL)
                },
            ],
            ..Default::default()
        };
        let events = generate_events(&raw);
        assert_eq!(events.len(), 2);

        assert_eq!(events[0].kind, EventType::TowerKill);
        assert_eq!(events[0].side, EventSide::Radiant);
        assert_eq!(
            events[0].details,
            EventDetails::Building {
                name: "npc_dota_badguys_tower1_mid".into(),
                lane: Some("mid".into()),
                tier: Some(1),
                owner: EventSide::Dire,
            }
        );

        assert_eq!(events[1].kind, EventType::BarracksKill);
        assert_eq!(events[1].side, EventSide::Dire);
    }

    #[test]
    fn test_legacy_tower_message_without_key() {
        let raw = RawMatch {
            objectives: vec![RawObjective {
                team: Some(2),
                ..objective(700, TOWER_KILL)
            }],
            ..Default::default()
        };
        let events = generate_events(&raw);
        assert_eq!(events[0].kind, EventType::TowerKill);
        assert_eq!(events[0].side, EventSide::Radiant);
    }

    #[test]
    fn test_team_fight_side_by_gold() {
        let mut players = vec![RawTeamfightPlayer::default(); 10];
        players[0].gold_delta = 900;
        players[5].gold_delta = 300;
        let raw = RawMatch {
            players: roster(),
            teamfights: vec![
                RawTeamfight {
                    start: 1500,
                    end: 1540,
                    deaths: 4,
                    players,
                },
                RawTeamfight {
                    start: 900,
                    end: 920,
                    deaths: 2,
                    players: vec![],
                },
            ],
            ..Default::default()
        };
        let events = generate_events(&raw);
        assert_eq!(events[0].side, EventSide::Neutral);
        assert_eq!(events[1].side, EventSide::Radiant);
        assert_eq!(events[1].details, EventDetails::TeamFight { end: 1540, deaths: 4 });
    }

    fn fight(side: EventSide) -> MatchEvent {
        MatchEvent {
            timestamp: 0,
            kind: EventType::TeamFight,
            side,
            details: EventDetails::TeamFight { end: 0, deaths: 0 },
        }
    }

    #[test]
    fn test_team_fight_tally() {
        let events = vec![
            fight(EventSide::Radiant),
            fight(EventSide::Radiant),
            fight(EventSide::Dire),
            fight(EventSide::Neutral),
            MatchEvent {
                timestamp: 0,
                kind: EventType::FirstBlood,
                side: EventSide::Dire,
                details: EventDetails::FirstBlood { killer_slot: None },
            },
        ];
        let tally = team_fight_tally(&events, Side::Radiant);

        assert_eq!(tally.radiant, FightRecord { wins: 2, losses: 1 });
        assert_eq!(tally.dire, FightRecord { wins: 1, losses: 2 });
        assert_eq!(tally.won_by_winner, 2);
        assert_eq!(tally.even, 1);
    }

    #[test]
    fn test_clock_format() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(95), "1:35");
        assert_eq!(format_clock(3725), "62:05");
        assert_eq!(format_clock(-30), "-0:30");
    }

    #[test]
    fn test_timeline_descriptions() {
        let raw = RawMatch {
            players: roster(),
            objectives: vec![
                RawObjective {
                    player_slot: Some(1),
                    ..objective(95, FIRST_BLOOD)
                },
                RawObjective {
                    key: Some(json!("npc_dota_goodguys_tower2_top")),
                    ..objective(900, BUILDING_KILL)
                },
                objective(1300, ROSHAN_KILL),
            ],
            ..Default::default()
        };
        let timeline = game_event_timeline(&generate_events(&raw));

        assert_eq!(timeline[0].clock, "1:35");
        assert_eq!(timeline[0].description, "Radiant drew first blood");
        assert_eq!(timeline[1].description, "Dire destroyed tier 2 top tower");
        assert_eq!(timeline[2].description, "Roshan slain (#1)");
    }

    #[test]
    fn test_parse_building() {
        let b = parse_building("npc_dota_badguys_range_rax_top").unwrap();
        assert_eq!(b.kind, EventType::BarracksKill);
        assert_eq!(b.owner, Some(Side::Dire));
        assert_eq!(b.lane.as_deref(), Some("top"));
        assert_eq!(b.tier, None);

        assert!(parse_building("npc_dota_badguys_healers").is_none());
    }
}
