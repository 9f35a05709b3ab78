use nonceling_data::DVec3;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

/// Upper bound on grid cells; the cell size grows if the bounds would exceed it.
const MAX_CELLS: usize = 1 << 21;

#[derive(Clone, Debug, Default)]
/// Uniform 3-D grid over particle positions for neighborhood queries.
///
/// The grid is rebuilt from scratch each step around the bounding box of the
/// current positions, so no particle ever falls outside it.
///
/// # Performance Characteristics
/// - Construction: O(n) with Rayon-parallel cell counting
/// - Radius query: O(cells touched + entities in those cells)
/// - Memory: O(n) for entity indices + O(cells) for offsets
///
/// # Implementation Notes
/// - Uses the "offset array" pattern (like compressed sparse rows):
///   `cell_offsets[i]..cell_offsets[i+1]` indexes the entities of cell `i`
/// - Entities inside one cell are stored in ascending index order
/// - Non-finite positions are left out of the grid
///
/// # Examples
/// ```
/// use nonceling_core::spatial_hash::SpatialHash;
/// use nonceling_data::DVec3;
///
/// let mut spatial = SpatialHash::new(5.0);
/// let positions = vec![DVec3::ZERO, DVec3::new(1.0, 0.0, 0.0), DVec3::new(40.0, 0.0, 0.0)];
/// spatial.build_parallel(&positions);
///
/// let mut nearby = Vec::new();
/// spatial.query_into(DVec3::ZERO, 2.0, &mut nearby);
/// assert_eq!(nearby.len(), 2);
/// ```
pub struct SpatialHash {
    /// Requested cell edge length.
    pub cell_size: f64,
    /// Edge length actually used by the last build.
    pub effective_cell_size: f64,
    pub origin: DVec3,
    pub dims: [usize; 3],
    pub cell_offsets: Vec<usize>,
    pub entity_indices: Vec<usize>,
}

impl SpatialHash {
    /// Creates an empty grid whose cells are `cell_size` wide.
    ///
    /// Pick the cell size equal to the largest query radius so that a query
    /// touches at most 27 cells.
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            effective_cell_size: cell_size,
            origin: DVec3::ZERO,
            dims: [0; 3],
            cell_offsets: vec![0],
            entity_indices: Vec::new(),
        }
    }

    #[inline]
    fn cell_count(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    #[inline]
    fn coord_of(&self, value: f64, axis: usize) -> Option<i64> {
        let rel = (value - self.origin[axis]) / self.effective_cell_size;
        // Guard the float to int cast
        if !rel.is_finite() || rel.abs() > i32::MAX as f64 {
            return None;
        }
        Some(rel.floor() as i64)
    }

    /// Flat cell index containing `pos`, or `None` if it lies outside the grid.
    #[inline]
    pub fn get_cell_idx(&self, pos: DVec3) -> Option<usize> {
        if !pos.is_finite() || self.cell_count() == 0 {
            return None;
        }
        let mut c = [0usize; 3];
        for axis in 0..3 {
            let v = self.coord_of(pos[axis], axis)?;
            if v < 0 || v >= self.dims[axis] as i64 {
                return None;
            }
            c[axis] = v as usize;
        }
        Some((c[2] * self.dims[1] + c[1]) * self.dims[0] + c[0])
    }

    /// Rebuilds the grid around `positions`.
    pub fn build_parallel(&mut self, positions: &[DVec3]) {
        let (min, max) = positions
            .iter()
            .filter(|p| p.is_finite())
            .fold((DVec3::splat(f64::MAX), DVec3::splat(f64::MIN)), |(lo, hi), p| {
                (lo.min(*p), hi.max(*p))
            });

        if min.x > max.x {
            // Nothing finite to index
            self.dims = [0; 3];
            self.cell_offsets.clear();
            self.cell_offsets.push(0);
            self.entity_indices.clear();
            return;
        }

        let extent = max - min;
        let mut size = self.cell_size;
        let dims_for = |size: f64| -> [usize; 3] {
            [
                (extent.x / size).floor() as usize + 1,
                (extent.y / size).floor() as usize + 1,
                (extent.z / size).floor() as usize + 1,
            ]
        };
        let mut dims = dims_for(size);
        while dims.iter().product::<usize>() > MAX_CELLS {
            size *= 2.0;
            dims = dims_for(size);
        }
        self.effective_cell_size = size;
        self.origin = min;
        self.dims = dims;

        let cell_count = self.cell_count();
        let entity_count = positions.len();

        let atomic_counts: Vec<AtomicUsize> =
            (0..cell_count).map(|_| AtomicUsize::new(0)).collect();
        positions.par_iter().for_each(|&p| {
            if let Some(idx) = self.get_cell_idx(p) {
                atomic_counts[idx].fetch_add(1, AtomicOrdering::Relaxed);
            }
        });
        let counts: Vec<usize> = atomic_counts.into_iter().map(|a| a.into_inner()).collect();

        self.cell_offsets.resize(cell_count + 1, 0);
        let mut total = 0;
        for (i, &count) in counts.iter().enumerate() {
            self.cell_offsets[i] = total;
            total += count;
        }
        self.cell_offsets[cell_count] = total;

        self.entity_indices.clear();
        self.entity_indices.resize(total, 0);

        let mut current_offsets = self.cell_offsets[..cell_count].to_vec();
        for (entity_idx, &p) in positions.iter().enumerate().take(entity_count) {
            if let Some(cell_idx) = self.get_cell_idx(p) {
                let write_idx = current_offsets[cell_idx];
                self.entity_indices[write_idx] = entity_idx;
                current_offsets[cell_idx] += 1;
            }
        }
    }

    /// Calls `callback` with every entity in cells overlapping the cube of
    /// half-width `radius` around `center`. Callers filter by exact distance.
    pub fn query_callback<F>(&self, center: DVec3, radius: f64, mut callback: F)
    where
        F: FnMut(usize),
    {
        if self.cell_count() == 0 || !center.is_finite() {
            return;
        }
        let mut lo = [0i64; 3];
        let mut hi = [0i64; 3];
        for axis in 0..3 {
            let (Some(a), Some(b)) = (
                self.coord_of(center[axis] - radius, axis),
                self.coord_of(center[axis] + radius, axis),
            ) else {
                return;
            };
            lo[axis] = a.max(0);
            hi[axis] = b.min(self.dims[axis] as i64 - 1);
            if lo[axis] > hi[axis] {
                return;
            }
        }

        for cz in lo[2]..=hi[2] {
            for cy in lo[1]..=hi[1] {
                for cx in lo[0]..=hi[0] {
                    let cell_idx = ((cz as usize * self.dims[1]) + cy as usize) * self.dims[0]
                        + cx as usize;
                    let start = self.cell_offsets[cell_idx];
                    let end = self.cell_offsets[cell_idx + 1];
                    for &entity_idx in &self.entity_indices[start..end] {
                        callback(entity_idx);
                    }
                }
            }
        }
    }

    /// Collects candidate neighbors of `center` into `result`, sorted ascending.
    #[inline]
    pub fn query_into(&self, center: DVec3, radius: f64, result: &mut Vec<usize>) {
        result.clear();
        self.query_callback(center, radius, |idx| result.push(idx));
        result.sort_unstable();
    }

    pub fn count_nearby(&self, center: DVec3, radius: f64) -> usize {
        let mut count = 0;
        self.query_callback(center, radius, |_| count += 1);
        count
    }
}
