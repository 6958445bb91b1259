//! Match Processing
//!
//! Turns one raw upstream match record plus hero/item reference tables into
//! a normalized [`Match`]: side split, draft with pick order, role
//! detection, advantage series and an event timeline.
//!
//! ```ignore
//! use dotaboard::matches::{process_with, RawMatch, ReferenceData};
//!
//! let raw: RawMatch = serde_json::from_str(&payload)?;
//! let processed = process_with(&raw, &reference);
//! println!("{} won", processed.winner().name);
//! ```

pub mod draft;
pub mod events;
pub mod model;
pub mod pipeline;
pub mod players;
pub mod raw;
pub mod reference;
pub mod roles;
pub mod side;
pub mod store;

pub use model::{
    AdvantageSeries, Draft, EventDetails, EventSide, EventType, GameEvent, HeroPick, Match,
    MatchEvent, MatchPlayers, PickOrder, PickPosition, PlayerMatchData, PlayerRole, Side,
    TeamFightTally, TeamInfo,
};
pub use pipeline::{process_match_data, process_with};
pub use raw::RawMatch;
pub use reference::{HeroRef, HeroTable, ItemRef, ItemTable, ReferenceData};
pub use store::MatchStore;
