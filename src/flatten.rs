//! Row-major flattening of the latitude/longitude grid.
//!
//! Flat index `i` maps to `row = i / LO`, `column = i % LO`, where rows
//! follow the latitude axis and columns the longitude axis.

/// Flattened spatial grid: one `[lat, lon]` point per cell in row-major order
#[derive(Debug, Clone)]
pub struct FlatGrid {
    points: Vec<[f64; 2]>,
    rows: usize,
    columns: usize,
}

impl FlatGrid {
    /// Cartesian product of the latitude and longitude axes
    pub fn new(latitudes: &[f64], longitudes: &[f64]) -> Self {
        let points = latitudes
            .iter()
            .flat_map(|&lat| longitudes.iter().map(move |&lon| [lat, lon]))
            .collect();

        Self {
            points,
            rows: latitudes.len(),
            columns: longitudes.len(),
        }
    }

    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// `(row, column)` for a flat index
    pub fn unravel(&self, index: usize) -> (usize, usize) {
        debug_assert!(index < self.points.len());
        (index / self.columns, index % self.columns)
    }

    /// Flat index for `(row, column)`
    pub fn ravel(&self, row: usize, column: usize) -> usize {
        debug_assert!(row < self.rows && column < self.columns);
        row * self.columns + column
    }
}
