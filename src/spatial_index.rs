//! Spatial hash grid over 2D bounding boxes
//!
//! Used to find candidate neighbours without all-pairs scans: top-level
//! polygons during nesting, vertices during snapping and edge insertion.
//! Entries live in a uniform grid of square cells keyed by integer cell
//! coordinates. Boxes spanning too many cells go to an overflow list that
//! every query checks.

use crate::geometry::{BoundingBox, Point2};
use std::collections::HashMap;

/// Minimum cell size, keeps degenerate extents from exploding the grid
const MIN_CELL_SIZE: f64 = 1e-3;

/// Cell size multiplier applied to the per-item share of the extent
const CELL_SIZE_FACTOR: f64 = 2.0;

/// Entries touching more cells than this go to the overflow list
const MAX_CELLS_PER_ENTRY: i64 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CellCoord {
    x: i64,
    y: i64,
}

impl CellCoord {
    fn from_position(x: f64, y: f64, cell_size: f64) -> Self {
        Self {
            x: (x / cell_size).floor() as i64,
            y: (y / cell_size).floor() as i64,
        }
    }
}

/// Identifier returned by [`SpatialIndex::insert`]
pub type EntryId = usize;

/// Hash grid mapping boxes to values
#[derive(Debug, Clone)]
pub struct SpatialIndex<T> {
    cell_size: f64,
    grid: HashMap<CellCoord, Vec<EntryId>>,
    overflow: Vec<EntryId>,
    entries: Vec<Option<(BoundingBox, T)>>,
    live: usize,
}

impl<T> SpatialIndex<T> {
    /// Create an index with a fixed cell size
    pub fn new(cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() {
            cell_size.max(MIN_CELL_SIZE)
        } else {
            MIN_CELL_SIZE
        };
        Self {
            cell_size,
            grid: HashMap::new(),
            overflow: Vec::new(),
            entries: Vec::new(),
            live: 0,
        }
    }

    /// Create an index sized for `item_count` entries spread over `extent`
    pub fn for_extent(extent: &BoundingBox, item_count: usize) -> Self {
        if extent.is_empty() || item_count == 0 {
            return Self::new(1.0);
        }
        let span = extent.width().max(extent.height());
        let cell_size = span / (item_count as f64).sqrt() * CELL_SIZE_FACTOR;
        Self::new(cell_size)
    }

    /// Cell edge length in drawing units
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.live
    }

    /// True when no entries are stored
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    fn cell_range(&self, bbox: &BoundingBox) -> Option<(CellCoord, CellCoord)> {
        if bbox.is_empty()
            || !bbox.min_x.is_finite()
            || !bbox.min_y.is_finite()
            || !bbox.max_x.is_finite()
            || !bbox.max_y.is_finite()
        {
            return None;
        }
        let lo = CellCoord::from_position(bbox.min_x, bbox.min_y, self.cell_size);
        let hi = CellCoord::from_position(bbox.max_x, bbox.max_y, self.cell_size);
        Some((lo, hi))
    }

    fn is_oversized(lo: &CellCoord, hi: &CellCoord) -> bool {
        let w = hi.x.saturating_sub(lo.x).saturating_add(1);
        let h = hi.y.saturating_sub(lo.y).saturating_add(1);
        w.saturating_mul(h) > MAX_CELLS_PER_ENTRY
    }

    /// Insert a value covering `bbox`
    pub fn insert(&mut self, bbox: BoundingBox, value: T) -> EntryId {
        let id = self.entries.len();
        match self.cell_range(&bbox) {
            Some((lo, hi)) if !Self::is_oversized(&lo, &hi) => {
                for cx in lo.x..=hi.x {
                    for cy in lo.y..=hi.y {
                        self.grid
                            .entry(CellCoord { x: cx, y: cy })
                            .or_default()
                            .push(id);
                    }
                }
            }
            _ => self.overflow.push(id),
        }
        self.entries.push(Some((bbox, value)));
        self.live += 1;
        id
    }

    /// Insert a value at a single point
    pub fn insert_point(&mut self, point: Point2, value: T) -> EntryId {
        self.insert(BoundingBox::from_points([&point]), value)
    }

    /// Remove an entry, returning its value
    pub fn remove(&mut self, id: EntryId) -> Option<T> {
        let (bbox, value) = self.entries.get_mut(id)?.take()?;
        match self.cell_range(&bbox) {
            Some((lo, hi)) if !Self::is_oversized(&lo, &hi) => {
                for cx in lo.x..=hi.x {
                    for cy in lo.y..=hi.y {
                        let cell = CellCoord { x: cx, y: cy };
                        if let Some(ids) = self.grid.get_mut(&cell) {
                            ids.retain(|&e| e != id);
                            if ids.is_empty() {
                                self.grid.remove(&cell);
                            }
                        }
                    }
                }
            }
            _ => self.overflow.retain(|&e| e != id),
        }
        self.live -= 1;
        Some(value)
    }

    /// Value stored under `id`
    pub fn get(&self, id: EntryId) -> Option<&T> {
        self.entries
            .get(id)
            .and_then(|e| e.as_ref())
            .map(|(_, v)| v)
    }

    /// Box stored under `id`
    pub fn bounds(&self, id: EntryId) -> Option<&BoundingBox> {
        self.entries
            .get(id)
            .and_then(|e| e.as_ref())
            .map(|(b, _)| b)
    }

    /// Ids of live entries whose box intersects `bbox`, ascending
    pub fn query(&self, bbox: &BoundingBox) -> Vec<EntryId> {
        let mut found: Vec<EntryId> = Vec::new();

        if let Some((lo, hi)) = self.cell_range(bbox) {
            if Self::is_oversized(&lo, &hi) {
                // A huge query box is cheaper to answer by scanning
                found.extend(
                    self.entries
                        .iter()
                        .enumerate()
                        .filter_map(|(id, e)| e.as_ref().map(|_| id)),
                );
            } else {
                for cx in lo.x..=hi.x {
                    for cy in lo.y..=hi.y {
                        if let Some(ids) = self.grid.get(&CellCoord { x: cx, y: cy }) {
                            found.extend_from_slice(ids);
                        }
                    }
                }
                found.extend_from_slice(&self.overflow);
            }
        }

        found.sort_unstable();
        found.dedup();
        found.retain(|&id| self.bounds(id).is_some_and(|b| b.intersects(bbox)));
        found
    }

    /// Ids of live entries whose box contains `point`, ascending
    pub fn query_point(&self, point: &Point2) -> Vec<EntryId> {
        self.query(&BoundingBox::from_points([point]))
    }

    /// Iterate over live entries
    pub fn iter(&self) -> impl Iterator<Item = (EntryId, &BoundingBox, &T)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(id, e)| e.as_ref().map(|(b, v)| (id, b, v)))
    }
}
