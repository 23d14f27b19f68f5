//! Candidate route scoring and selection.
//!
//! Each candidate's cost is its provider-reported duration plus a fixed
//! penalty for every distinct hazard close to its path. The cheapest
//! candidate wins; exact ties go to the one listed first.

use std::cmp::Ordering;

use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ScoreResult, ScoringError};
use crate::geo::GeoPoint;
use crate::hazard::{Hazard, HazardKey};
use crate::proximity::{PathIndex, ProximityStrategy, near_hazards};

/// Default `points * hazards` product at which `Auto` builds an R-tree.
pub const DEFAULT_RTREE_CUTOFF: usize = 4096;

/// One candidate route as supplied by the routing provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub path: Vec<GeoPoint>,
    pub base_duration_seconds: f64,
    /// Free-form caller tag, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Route {
    pub fn new(path: Vec<GeoPoint>, base_duration_seconds: f64) -> Self {
        Self {
            path,
            base_duration_seconds,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRoute {
    pub route: Route,
    pub near_hazard_count: usize,
    /// Hazards counted in `near_hazard_count`, in hazard input order.
    pub near_hazards: Vec<HazardKey>,
    pub adjusted_duration_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRequest {
    pub candidates: Vec<Route>,
    #[serde(default)]
    pub hazards: Vec<Hazard>,
    pub proximity_threshold_meters: f64,
    pub penalty_seconds_per_hazard: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    /// Position of `chosen` in the request's candidate list.
    pub chosen_index: usize,
    pub chosen: ScoredRoute,
    /// Every candidate, in request order.
    pub all_scored: Vec<ScoredRoute>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScorerOptions {
    pub proximity: ProximityStrategy,
    pub rtree_cutoff: usize,
    /// Score candidates on the rayon pool.
    pub parallel: bool,
    pub parallel_min_candidates: usize,
}

impl Default for ScorerOptions {
    fn default() -> Self {
        Self {
            proximity: ProximityStrategy::Auto,
            rtree_cutoff: DEFAULT_RTREE_CUTOFF,
            parallel: true,
            parallel_min_candidates: 2,
        }
    }
}

/// Stateless scorer; holds only its tuning options.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scorer {
    options: ScorerOptions,
}

impl Scorer {
    pub fn new(options: ScorerOptions) -> Self {
        Self { options }
    }

    pub fn score_and_select(&self, request: &ScoringRequest) -> ScoreResult<ScoringResult> {
        validate(request)?;

        let all_scored: Vec<ScoredRoute> = if self.options.parallel
            && request.candidates.len() >= self.options.parallel_min_candidates
        {
            // indexed collect keeps request order regardless of completion order
            request
                .candidates
                .par_iter()
                .enumerate()
                .map(|(i, route)| self.score_route(i, route, request))
                .collect()
        } else {
            request
                .candidates
                .iter()
                .enumerate()
                .map(|(i, route)| self.score_route(i, route, request))
                .collect()
        };

        let chosen_index = select_best(&all_scored)
            .ok_or_else(|| ScoringError::InvalidRequest("no candidate routes".into()))?;
        let chosen = all_scored[chosen_index].clone();

        info!(
            candidates = all_scored.len(),
            hazards = request.hazards.len(),
            chosen = chosen_index,
            near = chosen.near_hazard_count,
            base_s = chosen.route.base_duration_seconds,
            adjusted_s = chosen.adjusted_duration_seconds,
            "route selected"
        );

        Ok(ScoringResult {
            chosen_index,
            chosen,
            all_scored,
        })
    }

    fn score_route(&self, index: usize, route: &Route, request: &ScoringRequest) -> ScoredRoute {
        let use_tree = self.options.proximity.uses_tree(
            route.path.len(),
            request.hazards.len(),
            self.options.rtree_cutoff,
        );
        let path_index = PathIndex::build(&route.path, use_tree);
        let near = near_hazards(&path_index, &request.hazards, request.proximity_threshold_meters);

        let near_hazard_count = near.len();
        let adjusted_duration_seconds = route.base_duration_seconds
            + near_hazard_count as f64 * request.penalty_seconds_per_hazard;

        debug!(
            candidate = index,
            points = route.path.len(),
            rtree = path_index.is_tree(),
            near = near_hazard_count,
            adjusted_s = adjusted_duration_seconds,
            "candidate scored"
        );

        ScoredRoute {
            route: route.clone(),
            near_hazard_count,
            near_hazards: near,
            adjusted_duration_seconds,
        }
    }
}

/// Scores every candidate with default options and returns the cheapest.
pub fn score_and_select(request: &ScoringRequest) -> ScoreResult<ScoringResult> {
    Scorer::default().score_and_select(request)
}

/// Index of the lowest adjusted duration; the first one wins a tie.
fn select_best(scored: &[ScoredRoute]) -> Option<usize> {
    scored.iter().position_min_by(|a, b| {
        a.adjusted_duration_seconds
            .partial_cmp(&b.adjusted_duration_seconds)
            .unwrap_or(Ordering::Equal)
    })
}

fn validate(request: &ScoringRequest) -> ScoreResult<()> {
    if request.candidates.is_empty() {
        return Err(ScoringError::InvalidRequest("no candidate routes".into()));
    }

    let threshold = request.proximity_threshold_meters;
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(ScoringError::InvalidRequest(format!(
            "proximity threshold must be a positive number of meters, got {threshold}"
        )));
    }

    let penalty = request.penalty_seconds_per_hazard;
    if !penalty.is_finite() || penalty < 0.0 {
        return Err(ScoringError::InvalidRequest(format!(
            "penalty per hazard must be a non-negative number of seconds, got {penalty}"
        )));
    }

    if let Some((i, hazard)) = request
        .hazards
        .iter()
        .enumerate()
        .find(|(_, h)| !h.location.is_valid())
    {
        return Err(ScoringError::InvalidRequest(format!(
            "hazard {i} has invalid location {}",
            hazard.location
        )));
    }

    for (index, route) in request.candidates.iter().enumerate() {
        let invalid = |reason: String| ScoringError::InvalidRoute { index, reason };

        if route.path.is_empty() {
            return Err(invalid("path has no points".into()));
        }
        let base = route.base_duration_seconds;
        if !base.is_finite() || base < 0.0 {
            return Err(invalid(format!("base duration must be non-negative, got {base}")));
        }
        if let Some((p, point)) = route.path.iter().enumerate().find(|(_, p)| !p.is_valid()) {
            return Err(invalid(format!("point {p} is out of range: {point}")));
        }
    }

    Ok(())
}
