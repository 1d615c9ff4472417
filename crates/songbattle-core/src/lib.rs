pub mod affinity;
pub mod catalog;
pub mod config;
pub mod elo;
pub mod error;
pub mod matchmaker;
pub mod outcome;
pub mod protocol;
pub mod ranking;
pub mod recency;
pub mod store;

pub use catalog::{Catalog, Song, SongId};
pub use config::MatchConfig;
pub use elo::{DEFAULT_RATING, update_ratings};
pub use error::{BattleError, Result};
pub use matchmaker::{next_battle, select_pair};
pub use outcome::record_outcome;
pub use protocol::{BattleResponse, OutcomeRequest, OutcomeResponse};
pub use store::{GlobalRating, OutcomeTx, PersonalRating, RatingStore};
