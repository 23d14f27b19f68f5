//! `routewatch` — hazard-aware route scoring.
//!
//! Given several candidate routes between the same two points and a list of
//! reported road hazards, every route is charged a fixed penalty per distinct
//! hazard within a proximity threshold of its path, and the route with the
//! lowest adjusted duration is selected.
//!
//! | Module        | Contents                                                |
//! |---------------|---------------------------------------------------------|
//! | [`geo`]       | `GeoPoint`, haversine `distance_meters`                 |
//! | [`hazard`]    | `Hazard`, `HazardId`, `HazardKey`                       |
//! | [`proximity`] | brute-force and R-tree hazard-near-path search          |
//! | [`scorer`]    | `Route`, `ScoringRequest`, `Scorer`, `score_and_select` |
//! | [`error`]     | `ScoringError`, `ScoreResult<T>`                        |
//! | [`config`]    | environment configuration for the service               |
//! | [`api`]       | axum router exposing `POST /score`                      |

pub mod api;
pub mod config;
pub mod error;
pub mod geo;
pub mod hazard;
pub mod proximity;
pub mod scorer;

pub use error::{ScoreResult, ScoringError};
pub use geo::{GeoPoint, distance_meters};
pub use hazard::{Hazard, HazardId, HazardKey};
pub use proximity::{ProximityStrategy, count_near_hazards};
pub use scorer::{
    Route, ScoredRoute, Scorer, ScorerOptions, ScoringRequest, ScoringResult, score_and_select,
};
