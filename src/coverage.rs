//! Rasterized coverage and gap detection over a region.
//!
//! The region is cut into square cells using an equirectangular
//! approximation (one degree ≈ 111.32 km on both axes). A cell counts as
//! covered when any surveyed point lies within the coverage radius of its
//! centre. Gaps are found by sampling the region on a finer lattice and
//! merging nearby uncovered samples.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cluster::Cluster;
use crate::error::{EngineError, Result};
use crate::haversine::haversine_km;
use crate::model::{Coordinates, Priority, VisitPoint, count_by_municipality};

/// Kilometres per degree used to size grid cells.
pub const KM_PER_DEGREE: f64 = 111.32;
pub const DEFAULT_CELL_SIZE_KM: f64 = 2.0;
pub const DEFAULT_COVERAGE_RADIUS_KM: f64 = 3.0;
/// Fraction of the point extent added on each side of a derived box.
pub const BOUNDS_MARGIN: f64 = 0.05;
pub const DEFAULT_SAMPLE_STEP_DEG: f64 = 0.01;
pub const DEFAULT_GAP_DEDUP_DEG: f64 = 0.05;
pub const DEFAULT_MAX_GAPS: usize = 10;
/// Upper bound on grid cells for a single analysis.
pub const MAX_CELLS: usize = 4_000_000;
/// Upper bound on gap samples for a single analysis.
pub const MAX_SAMPLES: usize = 4_000_000;

const LOW_COVERAGE_PERCENT: f64 = 70.0;
const MANY_GAPS: usize = 5;
const MANY_CLUSTERS: usize = 3;
const LOW_P1_SHARE: f64 = 0.3;

/// Axis-aligned box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    pub const fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Extent of `points` widened by [`BOUNDS_MARGIN`] of the span per axis.
    pub fn around(points: &[Coordinates]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = Self::new(first.lat, first.lat, first.lng, first.lng);
        for c in &points[1..] {
            bbox.north = bbox.north.max(c.lat);
            bbox.south = bbox.south.min(c.lat);
            bbox.east = bbox.east.max(c.lng);
            bbox.west = bbox.west.min(c.lng);
        }
        let lat_margin = bbox.lat_span() * BOUNDS_MARGIN;
        let lng_margin = bbox.lng_span() * BOUNDS_MARGIN;
        Some(Self::new(
            bbox.north + lat_margin,
            bbox.south - lat_margin,
            bbox.east + lng_margin,
            bbox.west - lng_margin,
        ))
    }

    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    pub fn lng_span(&self) -> f64 {
        self.east - self.west
    }

    pub fn is_valid(&self) -> bool {
        [self.north, self.south, self.east, self.west]
            .iter()
            .all(|v| v.is_finite())
            && self.north >= self.south
            && self.east >= self.west
    }

    pub fn contains(&self, c: Coordinates) -> bool {
        (self.south..=self.north).contains(&c.lat) && (self.west..=self.east).contains(&c.lng)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    pub cell_size_km: f64,
    /// Distance from a surveyed point within which an area counts as covered.
    pub coverage_radius_km: f64,
    /// Region to analyze. Derived from the points when absent.
    pub bounds: Option<BoundingBox>,
    pub sample_step_deg: f64,
    /// Planar distance in degrees under which uncovered samples merge.
    pub gap_dedup_deg: f64,
    pub max_gaps: usize,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            cell_size_km: DEFAULT_CELL_SIZE_KM,
            coverage_radius_km: DEFAULT_COVERAGE_RADIUS_KM,
            bounds: None,
            sample_step_deg: DEFAULT_SAMPLE_STEP_DEG,
            gap_dedup_deg: DEFAULT_GAP_DEDUP_DEG,
            max_gaps: DEFAULT_MAX_GAPS,
        }
    }
}

impl CoverageConfig {
    pub fn with_radius(mut self, coverage_radius_km: f64) -> Self {
        self.coverage_radius_km = coverage_radius_km;
        self
    }

    pub fn with_bounds(mut self, bounds: BoundingBox) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.cell_size_km.is_finite() && self.cell_size_km > 0.0) {
            return Err(EngineError::InvalidCellSize(self.cell_size_km));
        }
        if !(self.sample_step_deg.is_finite() && self.sample_step_deg > 0.0) {
            return Err(EngineError::InvalidCellSize(self.sample_step_deg));
        }
        if !(self.coverage_radius_km.is_finite() && self.coverage_radius_km >= 0.0) {
            return Err(EngineError::InvalidRadius(self.coverage_radius_km));
        }
        if !(self.gap_dedup_deg.is_finite() && self.gap_dedup_deg >= 0.0) {
            return Err(EngineError::InvalidRadius(self.gap_dedup_deg));
        }
        if let Some(bounds) = self.bounds {
            if !bounds.is_valid() {
                return Err(EngineError::InvalidBounds);
            }
            Lattice::fit(bounds, self)?;
        }
        Ok(())
    }
}

/// Grid and sample dimensions of a region, checked against
/// [`MAX_CELLS`] and [`MAX_SAMPLES`] before anything is allocated.
#[derive(Debug, Clone, Copy)]
struct Lattice {
    edge_deg: f64,
    rows: usize,
    cols: usize,
    lat_samples: usize,
    lng_samples: usize,
}

impl Lattice {
    fn fit(bounds: BoundingBox, config: &CoverageConfig) -> Result<Self> {
        let edge_deg = config.cell_size_km / KM_PER_DEGREE;
        let too_fine = || EngineError::InvalidCellSize(config.cell_size_km);
        let rows = lattice_len(bounds.lat_span(), edge_deg, MAX_CELLS).ok_or_else(too_fine)?;
        let cols = lattice_len(bounds.lng_span(), edge_deg, MAX_CELLS).ok_or_else(too_fine)?;
        let (rows, cols) = (rows.max(1), cols.max(1));
        rows.checked_mul(cols)
            .filter(|&cells| cells <= MAX_CELLS)
            .ok_or_else(too_fine)?;

        let step = config.sample_step_deg;
        let too_dense = || EngineError::InvalidCellSize(step);
        let lat_samples = lattice_len(bounds.lat_span(), step, MAX_SAMPLES).ok_or_else(too_dense)?;
        let lng_samples = lattice_len(bounds.lng_span(), step, MAX_SAMPLES).ok_or_else(too_dense)?;
        lat_samples
            .checked_mul(lng_samples)
            .filter(|&samples| samples <= MAX_SAMPLES)
            .ok_or_else(too_dense)?;

        Ok(Self {
            edge_deg,
            rows,
            cols,
            lat_samples,
            lng_samples,
        })
    }
}

/// What a coverage analysis suggests doing next.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoverageRecommendation {
    /// Less than 70% of the region is covered.
    ExpandCoverage { coverage_percent: f64 },
    /// More than five gaps were found.
    ScheduleGapVisits { gaps: usize },
    /// More than three clusters: plan routes cluster by cluster.
    RouteByCluster { clusters: usize },
    /// P1 entities make up less than 30% of the points.
    RaisePriorityShare { p1_share: f64 },
}

/// An uncovered area, represented by the first sample that found it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gap {
    pub centre: Coordinates,
    pub estimated_size_km2: f64,
    /// Uncovered samples merged into this gap, the centre included.
    pub sample_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageGrid {
    cell_size_km: f64,
    bounds: Option<BoundingBox>,
    rows: usize,
    cols: usize,
    /// Row-major, row 0 at the southern edge.
    cells: Vec<bool>,
    covered_cells: usize,
    gaps: Vec<Gap>,
    /// Points per square kilometre of analyzed area, by municipality.
    density_by_municipality: BTreeMap<String, f64>,
    recommendations: Vec<CoverageRecommendation>,
}

impl CoverageGrid {
    fn empty(cell_size_km: f64) -> Self {
        Self {
            cell_size_km,
            bounds: None,
            rows: 0,
            cols: 0,
            cells: Vec::new(),
            covered_cells: 0,
            gaps: Vec::new(),
            density_by_municipality: BTreeMap::new(),
            recommendations: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell_size_km(&self) -> f64 {
        self.cell_size_km
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn total_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn covered_cells(&self) -> usize {
        self.covered_cells
    }

    pub fn is_covered(&self, row: usize, col: usize) -> Option<bool> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get(row * self.cols + col).copied()
    }

    pub fn covered_area_km2(&self) -> f64 {
        self.covered_cells as f64 * self.cell_size_km * self.cell_size_km
    }

    /// Area of every cell in the grid.
    pub fn analyzed_area_km2(&self) -> f64 {
        self.cells.len() as f64 * self.cell_size_km * self.cell_size_km
    }

    pub fn coverage_percent(&self) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        self.covered_cells as f64 / self.cells.len() as f64 * 100.0
    }

    pub fn gaps(&self) -> &[Gap] {
        &self.gaps
    }

    pub fn density_by_municipality(&self) -> &BTreeMap<String, f64> {
        &self.density_by_municipality
    }

    pub fn recommendations(&self) -> &[CoverageRecommendation] {
        &self.recommendations
    }
}

fn is_covered(centre: Coordinates, points: &[Coordinates], radius_km: f64) -> bool {
    points.iter().any(|&p| haversine_km(centre, p) <= radius_km)
}

/// Steps of `step` needed to span `span`, or `None` beyond `limit`.
fn lattice_len(span: f64, step: f64, limit: usize) -> Option<usize> {
    let steps = (span / step).ceil();
    (steps.is_finite() && steps <= limit as f64).then_some(steps as usize)
}

/// Rasterizes coverage of `points` and collects up to `max_gaps` gaps.
///
/// `clusters` only feed the recommendations.
pub fn analyze(
    points: &[VisitPoint],
    config: &CoverageConfig,
    clusters: &[Cluster],
) -> Result<CoverageGrid> {
    config.validate()?;
    let locations: Vec<Coordinates> = points.iter().map(|p| p.location).collect();

    let Some(bounds) = config.bounds.or_else(|| BoundingBox::around(&locations)) else {
        return Ok(CoverageGrid::empty(config.cell_size_km));
    };

    let lattice = Lattice::fit(bounds, config)?;
    let Lattice {
        edge_deg,
        rows,
        cols,
        ..
    } = lattice;
    let radius = config.coverage_radius_km;

    let sites: &[Coordinates] = &locations;
    let cells: Vec<bool> = (0..rows)
        .into_par_iter()
        .flat_map_iter(move |row| {
            let lat = bounds.south + (row as f64 + 0.5) * edge_deg;
            (0..cols).map(move |col| {
                let lng = bounds.west + (col as f64 + 0.5) * edge_deg;
                is_covered(Coordinates::new(lat, lng), sites, radius)
            })
        })
        .collect();
    let covered_cells = cells.iter().filter(|&&covered| covered).count();

    let gaps = detect_gaps(&locations, bounds, lattice, config);
    debug!(rows, cols, covered_cells, gaps = gaps.len(), "rasterized coverage");

    let mut grid = CoverageGrid {
        cell_size_km: config.cell_size_km,
        bounds: Some(bounds),
        rows,
        cols,
        cells,
        covered_cells,
        gaps,
        density_by_municipality: BTreeMap::new(),
        recommendations: Vec::new(),
    };
    grid.density_by_municipality = density_by_municipality(points, grid.analyzed_area_km2());
    grid.recommendations = recommend(
        points,
        grid.coverage_percent(),
        grid.gaps.len(),
        clusters.len(),
    );
    Ok(grid)
}

fn density_by_municipality(points: &[VisitPoint], area_km2: f64) -> BTreeMap<String, f64> {
    if area_km2 <= 0.0 {
        return BTreeMap::new();
    }
    count_by_municipality(points)
        .into_iter()
        .map(|(municipality, count)| (municipality.to_owned(), count as f64 / area_km2))
        .collect()
}

fn recommend(
    points: &[VisitPoint],
    coverage_percent: f64,
    gaps: usize,
    clusters: usize,
) -> Vec<CoverageRecommendation> {
    let mut recommendations = Vec::new();
    if points.is_empty() {
        return recommendations;
    }

    if coverage_percent < LOW_COVERAGE_PERCENT {
        recommendations.push(CoverageRecommendation::ExpandCoverage { coverage_percent });
    }
    if gaps > MANY_GAPS {
        recommendations.push(CoverageRecommendation::ScheduleGapVisits { gaps });
    }
    if clusters > MANY_CLUSTERS {
        recommendations.push(CoverageRecommendation::RouteByCluster { clusters });
    }
    let p1 = points.iter().filter(|p| p.priority == Priority::P1).count();
    let p1_share = p1 as f64 / points.len() as f64;
    if p1_share < LOW_P1_SHARE {
        recommendations.push(CoverageRecommendation::RaisePriorityShare { p1_share });
    }
    recommendations
}

fn detect_gaps(
    locations: &[Coordinates],
    bounds: BoundingBox,
    lattice: Lattice,
    config: &CoverageConfig,
) -> Vec<Gap> {
    let step = config.sample_step_deg;
    let Lattice {
        lat_samples,
        lng_samples,
        ..
    } = lattice;
    let radius = config.coverage_radius_km;

    // Sampling is parallel; merging depends on sample order and is not.
    let uncovered: Vec<Coordinates> = (0..lat_samples)
        .into_par_iter()
        .flat_map_iter(move |i| {
            let lat = bounds.south + i as f64 * step;
            (0..lng_samples)
                .map(move |j| Coordinates::new(lat, bounds.west + j as f64 * step))
                .filter(move |&sample| !is_covered(sample, locations, radius))
        })
        .collect();

    let cell_area = config.cell_size_km * config.cell_size_km;
    let mut gaps: Vec<Gap> = Vec::new();
    for sample in uncovered {
        let nearby = gaps.iter().position(|gap| {
            (gap.centre.lat - sample.lat).hypot(gap.centre.lng - sample.lng) < config.gap_dedup_deg
        });
        match nearby {
            Some(idx) => gaps[idx].sample_count += 1,
            None if gaps.len() < config.max_gaps => gaps.push(Gap {
                centre: sample,
                estimated_size_km2: cell_area,
                sample_count: 1,
            }),
            None => {}
        }
    }
    gaps
}
