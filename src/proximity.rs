//! Hazard-to-route proximity search.
//!
//! The baseline walks a route's points in order and stops at the first one
//! within the threshold of the hazard. Long routes can instead be loaded
//! into an R-tree keyed on each point's position on the unit sphere; the
//! tree only narrows the scan, every hit is confirmed with
//! [`distance_meters`], so both give the same near/not-near answer.

use std::collections::HashSet;
use std::f64::consts::PI;
use std::str::FromStr;

use rstar::{AABB, PointDistance, RTree, RTreeObject};
use serde::{Deserialize, Serialize};

use crate::geo::{EARTH_RADIUS_M, GeoPoint, distance_meters};
use crate::hazard::{Hazard, HazardKey};

/// Relative padding on the R-tree search radius. The tree is a prefilter,
/// so it must never be tighter than the haversine check that follows.
const CHORD_SLACK: f64 = 1e-9;
/// Absolute padding (unit-sphere units) for very small thresholds.
const CHORD_FLOOR: f64 = 1e-12;

/// How a route's points are searched for hazards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProximityStrategy {
    BruteForce,
    RTree,
    /// R-tree once `points * hazards` reaches the configured cutoff.
    #[default]
    Auto,
}

impl ProximityStrategy {
    pub fn uses_tree(self, path_len: usize, hazard_count: usize, cutoff: usize) -> bool {
        match self {
            Self::BruteForce => false,
            Self::RTree => true,
            Self::Auto => hazard_count > 0 && path_len.saturating_mul(hazard_count) >= cutoff,
        }
    }
}

impl FromStr for ProximityStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "brute" | "brute_force" | "linear" => Ok(Self::BruteForce),
            "rtree" | "r_tree" | "tree" => Ok(Self::RTree),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown proximity strategy '{other}'")),
        }
    }
}

// ── R-tree entry ──────────────────────────────────────────────────────────────

/// A route point on the unit sphere plus its position in the path.
#[derive(Clone)]
struct PathEntry {
    point: [f64; 3],
    index: usize,
}

impl RTreeObject for PathEntry {
    type Envelope = AABB<[f64; 3]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for PathEntry {
    /// Squared chord length. Monotonic in great-circle distance.
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        let dz = self.point[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

/// Squared chord radius covering every point within `threshold_m`.
fn search_radius_2(threshold_m: f64) -> f64 {
    let angle = (threshold_m / EARTH_RADIUS_M).min(PI);
    let chord = 2.0 * (angle * 0.5).sin();
    let padded = chord * (1.0 + CHORD_SLACK) + CHORD_FLOOR;
    padded * padded
}

// ── PathIndex ─────────────────────────────────────────────────────────────────

/// Searchable view of one route's path.
pub struct PathIndex<'a> {
    path: &'a [GeoPoint],
    tree: Option<RTree<PathEntry>>,
}

impl<'a> PathIndex<'a> {
    pub fn linear(path: &'a [GeoPoint]) -> Self {
        Self { path, tree: None }
    }

    pub fn tree(path: &'a [GeoPoint]) -> Self {
        let entries: Vec<PathEntry> = path
            .iter()
            .enumerate()
            .map(|(index, p)| PathEntry {
                point: p.to_unit_vector(),
                index,
            })
            .collect();
        Self {
            path,
            tree: Some(RTree::bulk_load(entries)),
        }
    }

    pub fn build(path: &'a [GeoPoint], use_tree: bool) -> Self {
        if use_tree { Self::tree(path) } else { Self::linear(path) }
    }

    pub fn is_tree(&self) -> bool {
        self.tree.is_some()
    }

    /// True when some path point lies within `threshold_m` (inclusive) of
    /// `target`. Stops at the first qualifying point.
    pub fn any_within(&self, target: GeoPoint, threshold_m: f64) -> bool {
        match &self.tree {
            None => self
                .path
                .iter()
                .any(|&p| distance_meters(target, p) <= threshold_m),
            Some(tree) => tree
                .locate_within_distance(target.to_unit_vector(), search_radius_2(threshold_m))
                .any(|entry| distance_meters(target, self.path[entry.index]) <= threshold_m),
        }
    }
}

/// Keys of the distinct hazards near the indexed path, in hazard input
/// order. A hazard counts once no matter how many points are close to it,
/// and repeated entries sharing an id count once between them.
pub fn near_hazards(index: &PathIndex<'_>, hazards: &[Hazard], threshold_m: f64) -> Vec<HazardKey> {
    let mut counted = HashSet::new();
    let mut near = Vec::new();

    for (i, hazard) in hazards.iter().enumerate() {
        let key = hazard.key(i);
        if counted.contains(&key) {
            continue;
        }
        if index.any_within(hazard.location, threshold_m) {
            counted.insert(key);
            near.push(key);
        }
    }

    near
}

/// Number of distinct hazards within `threshold_m` of any point of `path`,
/// using the brute-force scan.
pub fn count_near_hazards(path: &[GeoPoint], hazards: &[Hazard], threshold_m: f64) -> usize {
    near_hazards(&PathIndex::linear(path), hazards, threshold_m).len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hazard::HazardId;

    fn north(p: GeoPoint, meters: f64) -> GeoPoint {
        GeoPoint::new(p.latitude + (meters / EARTH_RADIUS_M).to_degrees(), p.longitude)
    }

    const ORIGIN: GeoPoint = GeoPoint::new(43.6532, -79.3832);

    #[test]
    fn many_close_points_count_one_hazard() {
        let hazard = Hazard::new(ORIGIN, "pothole");
        let path: Vec<_> = (0..20).map(|i| north(ORIGIN, i as f64 * 2.0)).collect();
        assert_eq!(count_near_hazards(&path, &[hazard], 150.0), 1);
    }

    #[test]
    fn shared_coordinates_stay_distinct() {
        let hazards = vec![Hazard::new(ORIGIN, "a"), Hazard::new(ORIGIN, "b")];
        assert_eq!(count_near_hazards(&[ORIGIN], &hazards, 10.0), 2);
    }

    #[test]
    fn repeated_id_counts_once() {
        let far = north(ORIGIN, 5_000.0);
        let hazards = vec![
            Hazard::new(far, "reported twice").with_id(HazardId(1)),
            Hazard::new(ORIGIN, "reported twice").with_id(HazardId(1)),
            Hazard::new(ORIGIN, "other").with_id(HazardId(2)),
            Hazard::new(ORIGIN, "duplicate").with_id(HazardId(2)),
        ];
        let near = near_hazards(&PathIndex::linear(&[ORIGIN]), &hazards, 50.0);
        assert_eq!(near, vec![HazardKey::Id(HazardId(1)), HazardKey::Id(HazardId(2))]);
    }

    #[test]
    fn threshold_is_inclusive() {
        let point = north(ORIGIN, 150.0);
        let exact = distance_meters(ORIGIN, point);
        let hazards = [Hazard::new(ORIGIN, "edge")];

        let path = [point];
        for index in [PathIndex::linear(&path), PathIndex::tree(&path)] {
            assert!(index.any_within(ORIGIN, exact));
            assert!(!index.any_within(ORIGIN, exact - 1e-6));
        }
        assert_eq!(count_near_hazards(&[point], &hazards, exact), 1);
    }

    #[test]
    fn just_past_threshold_is_not_near() {
        let point = north(ORIGIN, 150.01);
        let hazards = [Hazard::new(ORIGIN, "edge")];
        assert_eq!(count_near_hazards(&[point], &hazards, 150.0), 0);
        let path = [point];
        let tree = PathIndex::tree(&path);
        assert!(near_hazards(&tree, &hazards, 150.0).is_empty());
    }

    #[test]
    fn tree_handles_global_threshold() {
        let antipode = GeoPoint::new(-ORIGIN.latitude, ORIGIN.longitude + 180.0);
        let path = [antipode];
        let tree = PathIndex::tree(&path);
        assert!(tree.any_within(ORIGIN, 2.5e7));
    }

    #[test]
    fn auto_switches_on_cutoff() {
        assert!(!ProximityStrategy::Auto.uses_tree(10, 10, 4096));
        assert!(ProximityStrategy::Auto.uses_tree(64, 64, 4096));
        assert!(!ProximityStrategy::Auto.uses_tree(10_000, 0, 4096));
        assert!(ProximityStrategy::RTree.uses_tree(1, 1, 4096));
        assert!(!ProximityStrategy::BruteForce.uses_tree(10_000, 10_000, 4096));
    }

    #[test]
    fn parses_strategy_names() {
        assert_eq!("brute".parse::<ProximityStrategy>(), Ok(ProximityStrategy::BruteForce));
        assert_eq!(" RTree ".parse::<ProximityStrategy>(), Ok(ProximityStrategy::RTree));
        assert_eq!("auto".parse::<ProximityStrategy>(), Ok(ProximityStrategy::Auto));
        assert!("kd".parse::<ProximityStrategy>().is_err());
    }
}
