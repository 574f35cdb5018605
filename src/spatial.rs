//! Nearest-neighbour index over flattened grid points.
//!
//! The default [`DistanceMetric::Planar`] treats degrees of latitude and
//! longitude as a flat Cartesian plane. [`DistanceMetric::Haversine`] ranks
//! points by great-circle distance instead, by indexing unit-sphere vectors
//! (chord length is monotonic in great-circle distance). The two metrics can
//! pick different cells away from the equator.
//!
//! When several grid points are equidistant from a query the point returned
//! is whichever the tree visits first; ties are not broken deterministically.

use crate::constants::EARTH_RADIUS_KM;
use crate::error::{GridJoinError, Result};
use kd_tree::{KdTree2, KdTree3};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How distance between a station and a grid point is measured
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum DistanceMetric {
    /// Euclidean distance in raw degrees
    #[default]
    Planar,
    /// Great-circle distance in kilometres
    Haversine,
}

impl DistanceMetric {
    /// Distance between two `[lat, lon]` points in this metric's units
    pub fn distance(&self, a: [f64; 2], b: [f64; 2]) -> f64 {
        match self {
            DistanceMetric::Planar => ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt(),
            DistanceMetric::Haversine => {
                let (lat1, lat2) = (a[0].to_radians(), b[0].to_radians());
                let dlat = lat2 - lat1;
                let dlon = (b[1] - a[1]).to_radians();
                let h = (dlat / 2.0).sin().powi(2)
                    + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
                2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
            }
        }
    }

    /// Units the metric reports distances in
    pub fn units(&self) -> &'static str {
        match self {
            DistanceMetric::Planar => "degrees",
            DistanceMetric::Haversine => "km",
        }
    }
}

/// Nearest grid point for a query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest {
    /// Flat (row-major) grid index
    pub index: usize,
    pub distance: f64,
}

enum IndexTree {
    Planar(KdTree2<(usize, [f64; 2])>),
    Spherical(KdTree3<(usize, [f64; 3])>),
}

/// Kd-tree over grid points, built once and read-only afterwards
pub struct SpatialIndex {
    tree: IndexTree,
    metric: DistanceMetric,
    len: usize,
}

impl fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("metric", &self.metric)
            .field("len", &self.len)
            .finish()
    }
}

impl SpatialIndex {
    /// Build the index over `[lat, lon]` points; an empty point set is rejected
    pub fn build(points: &[[f64; 2]], metric: DistanceMetric) -> Result<Self> {
        if points.is_empty() {
            return Err(GridJoinError::invalid_state(
                "cannot build a spatial index from zero grid points",
            ));
        }

        let tree = match metric {
            DistanceMetric::Planar => {
                let items: Vec<(usize, [f64; 2])> = points.iter().copied().enumerate().collect();
                IndexTree::Planar(KdTree2::build_by_key(items, |item, k| {
                    OrderedFloat(item.1[k])
                }))
            }
            DistanceMetric::Haversine => {
                let items: Vec<(usize, [f64; 3])> = points
                    .iter()
                    .map(|&[lat, lon]| unit_vector(lat, lon))
                    .enumerate()
                    .collect();
                IndexTree::Spherical(KdTree3::build_by_key(items, |item, k| {
                    OrderedFloat(item.1[k])
                }))
            }
        };

        Ok(Self {
            tree,
            metric,
            len: points.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Closest grid point to `(lat, lon)`; no extent check is applied, so
    /// queries far outside the grid still resolve to an edge point
    pub fn nearest(&self, lat: f64, lon: f64) -> Result<Nearest> {
        let found = match &self.tree {
            IndexTree::Planar(tree) => tree
                .nearest_by(&[lat, lon], |item, k| item.1[k])
                .map(|hit| Nearest {
                    index: hit.item.0,
                    distance: hit.squared_distance.sqrt(),
                }),
            IndexTree::Spherical(tree) => tree
                .nearest_by(&unit_vector(lat, lon), |item, k| item.1[k])
                .map(|hit| Nearest {
                    index: hit.item.0,
                    distance: chord_to_km(hit.squared_distance.sqrt()),
                }),
        };

        found.ok_or_else(|| {
            GridJoinError::invalid_state(format!(
                "spatial index returned no point for ({}, {})",
                lat, lon
            ))
        })
    }
}

/// Linear scan for the nearest point. Reference implementation for the index.
pub fn brute_force_nearest(
    points: &[[f64; 2]],
    lat: f64,
    lon: f64,
    metric: DistanceMetric,
) -> Option<Nearest> {
    points
        .iter()
        .enumerate()
        .map(|(index, &point)| Nearest {
            index,
            distance: metric.distance([lat, lon], point),
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

fn unit_vector(lat: f64, lon: f64) -> [f64; 3] {
    let (lat, lon) = (lat.to_radians(), lon.to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

fn chord_to_km(chord: f64) -> f64 {
    2.0 * EARTH_RADIUS_KM * (chord / 2.0).min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::FlatGrid;

    /// Small deterministic generator so the comparison grid is reproducible
    struct Lcg(u64);

    impl Lcg {
        fn next_f64(&mut self) -> f64 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (self.0 >> 11) as f64 / (1u64 << 53) as f64
        }
    }

    fn regional_grid() -> FlatGrid {
        let latitudes: Vec<f64> = (0..16).map(|i| 54.0 - i as f64 * 0.25).collect();
        let longitudes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64 * 0.25).collect();
        FlatGrid::new(&latitudes, &longitudes)
    }

    #[test]
    fn test_empty_index_is_invalid_state() {
        let result = SpatialIndex::build(&[], DistanceMetric::Planar);
        assert!(matches!(result, Err(GridJoinError::InvalidState { .. })));
    }

    #[test]
    fn test_nearest_matches_brute_force_planar() {
        let grid = regional_grid();
        let index = SpatialIndex::build(grid.points(), DistanceMetric::Planar).unwrap();
        let mut rng = Lcg(42);

        for _ in 0..500 {
            let lat = 49.0 + rng.next_f64() * 6.0;
            let lon = 99.0 + rng.next_f64() * 6.5;

            let indexed = index.nearest(lat, lon).unwrap();
            let scanned =
                brute_force_nearest(grid.points(), lat, lon, DistanceMetric::Planar).unwrap();

            // Compare distances rather than indices: equidistant points may differ
            assert!(
                (indexed.distance - scanned.distance).abs() < 1e-12,
                "({}, {}): index {:?} vs scan {:?}",
                lat,
                lon,
                indexed,
                scanned
            );
        }
    }

    #[test]
    fn test_nearest_matches_brute_force_haversine() {
        let grid = regional_grid();
        let index = SpatialIndex::build(grid.points(), DistanceMetric::Haversine).unwrap();
        let mut rng = Lcg(7);

        for _ in 0..500 {
            let lat = 49.0 + rng.next_f64() * 6.0;
            let lon = 99.0 + rng.next_f64() * 6.5;

            let indexed = index.nearest(lat, lon).unwrap();
            let scanned =
                brute_force_nearest(grid.points(), lat, lon, DistanceMetric::Haversine).unwrap();

            assert!(
                (indexed.distance - scanned.distance).abs() < 1e-6,
                "({}, {}): index {:?} vs scan {:?}",
                lat,
                lon,
                indexed,
                scanned
            );
        }
    }

    #[test]
    fn test_single_point_always_matches() {
        let grid = FlatGrid::new(&[30.0], &[120.0]);
        let index = SpatialIndex::build(grid.points(), DistanceMetric::Planar).unwrap();

        for (lat, lon) in [(30.0, 120.0), (-80.0, -170.0), (89.0, 0.0)] {
            assert_eq!(index.nearest(lat, lon).unwrap().index, 0);
        }
    }

    #[test]
    fn test_far_outside_extent_resolves_to_edge() {
        let grid = FlatGrid::new(&[10.0, 20.0], &[100.0, 110.0]);
        let index = SpatialIndex::build(grid.points(), DistanceMetric::Planar).unwrap();

        let nearest = index.nearest(60.0, 150.0).unwrap();
        assert_eq!(grid.unravel(nearest.index), (1, 1));
        assert!(nearest.distance > 40.0);
    }

    #[test]
    fn test_haversine_distance_known_value() {
        // One degree of latitude is ~111.2 km
        let d = DistanceMetric::Haversine.distance([0.0, 0.0], [1.0, 0.0]);
        assert!((d - 111.19).abs() < 0.1);
    }

    #[test]
    fn test_metrics_disagree_at_high_latitude() {
        // At 80N a degree of longitude is far shorter than a degree of latitude
        let points = [[81.0, 0.0], [80.0, 1.5]];
        let planar = SpatialIndex::build(&points, DistanceMetric::Planar).unwrap();
        let haversine = SpatialIndex::build(&points, DistanceMetric::Haversine).unwrap();

        assert_eq!(planar.nearest(80.0, 0.0).unwrap().index, 0);
        assert_eq!(haversine.nearest(80.0, 0.0).unwrap().index, 1);
    }
}
