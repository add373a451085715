//! Neighbour search strategies
//!
//! Both finders share the same contract: for every particle in the slice
//! they return the indices of all particles whose border-to-border distance
//! is at most `rc`. Links are always symmetric.
//!
//! - `BruteForce` compares every unordered pair once, O(N^2)
//! - `CellIndex` buckets particles into a grid and only compares a cell with
//!   itself and four neighbouring cells, O(N) for uniform density

use std::collections::BTreeSet;

use crate::error::SimulationError;
use crate::simulation::states::{NVec2, Particle};

/// `neighbours[i]` holds the indices linked to particle `i`
pub type Neighbours = Vec<BTreeSet<usize>>;

pub trait NeighboursFinder {
    fn find(&self, particles: &[Particle]) -> Result<Neighbours, SimulationError>;
}

/// Border-to-border distance between `a` and `b` shifted by `offset`
fn shifted_distance(a: &Particle, b: &Particle, offset: NVec2) -> f64 {
    (a.position - (b.position + offset)).norm() - a.radius - b.radius
}

fn link(neighbours: &mut Neighbours, i: usize, j: usize) {
    neighbours[i].insert(j);
    neighbours[j].insert(i);
}

/// Exhaustive pairwise scan
#[derive(Debug, Clone)]
pub struct BruteForce {
    pub rc: f64, // interaction radius, 0 for pure contact detection
    pub periodic: Option<(f64, f64)>, // (width, length) of a periodic domain
}

impl BruteForce {
    pub fn new(rc: f64) -> Self {
        Self { rc, periodic: None }
    }

    pub fn periodic(rc: f64, width: f64, length: f64) -> Self {
        Self {
            rc,
            periodic: Some((width, length)),
        }
    }

    fn within_range(&self, a: &Particle, b: &Particle) -> bool {
        match self.periodic {
            None => shifted_distance(a, b, NVec2::zeros()) <= self.rc,
            Some((width, length)) => {
                // nearest periodic image of b
                for dx in [-1.0, 0.0, 1.0] {
                    for dy in [-1.0, 0.0, 1.0] {
                        let offset = NVec2::new(dx * width, dy * length);
                        if shifted_distance(a, b, offset) <= self.rc {
                            return true;
                        }
                    }
                }
                false
            }
        }
    }
}

impl NeighboursFinder for BruteForce {
    fn find(&self, particles: &[Particle]) -> Result<Neighbours, SimulationError> {
        let n = particles.len();
        let mut neighbours = vec![BTreeSet::new(); n];

        for i in 0..n {
            for j in (i + 1)..n {
                if self.within_range(&particles[i], &particles[j]) {
                    link(&mut neighbours, i, j);
                }
            }
        }
        Ok(neighbours)
    }
}

/// Stencil visited from every cell: itself, up, up-right, right, down-right.
/// Each unordered pair of adjacent cells is covered exactly once.
const DIRECTIONS: [(i64, i64); 5] = [(0, 0), (-1, 0), (-1, 1), (0, 1), (1, 1)];

/// Uniform grid over a `width x length` domain.
///
/// Row 0 is the top of the domain. The cell side must be at least
/// `rc + 2 * r_max`; this is not re-checked here.
#[derive(Debug, Clone)]
pub struct CellIndex {
    pub width: f64,
    pub length: f64,
    pub rows: usize,
    pub cols: usize,
    pub rc: f64,
    pub periodic: bool,
}

impl CellIndex {
    /// Square `m x m` grid
    pub fn new(width: f64, length: f64, m: usize, rc: f64, periodic: bool) -> Self {
        Self::with_grid(width, length, m, m, rc, periodic)
    }

    pub fn with_grid(width: f64, length: f64, rows: usize, cols: usize, rc: f64, periodic: bool) -> Self {
        Self {
            width,
            length,
            rows: rows.max(1),
            cols: cols.max(1),
            rc,
            periodic,
        }
    }

    fn cell_width(&self) -> f64 {
        self.width / self.cols as f64
    }

    fn cell_length(&self) -> f64 {
        self.length / self.rows as f64
    }

    /// (row, col) of a particle, vertical axis inverted
    pub fn cell_of(&self, p: &Particle) -> Result<(usize, usize), SimulationError> {
        let col = (p.position.x / self.cell_width()).floor() as i64;
        let row = self.rows as i64 - 1 - (p.position.y / self.cell_length()).floor() as i64;

        if row < 0 || row >= self.rows as i64 || col < 0 || col >= self.cols as i64 {
            return Err(SimulationError::OutsideGrid { particle: p.id, row, col });
        }
        Ok((row as usize, col as usize))
    }

    /// Resolve a stencil target. Returns the real cell and the offset to apply
    /// to its particles, or `None` when the cell lies off a bounded grid.
    fn resolve(&self, row: i64, col: i64) -> Option<(usize, usize, NVec2)> {
        let rows = self.rows as i64;
        let cols = self.cols as i64;
        let mut offset = NVec2::zeros();
        let mut row = row;
        let mut col = col;

        if row < 0 || row >= rows || col >= cols {
            if !self.periodic {
                return None;
            }
            if row < 0 {
                row = rows - 1;
                offset.y += self.length;
            } else if row >= rows {
                row = 0;
                offset.y -= self.length;
            }
            if col >= cols {
                col = 0;
                offset.x += self.width;
            }
        }
        Some((row as usize, col as usize, offset))
    }
}

impl NeighboursFinder for CellIndex {
    fn find(&self, particles: &[Particle]) -> Result<Neighbours, SimulationError> {
        let n = particles.len();
        let mut neighbours = vec![BTreeSet::new(); n];
        let mut cells: Vec<Vec<usize>> = vec![Vec::new(); self.rows * self.cols];

        for (i, p) in particles.iter().enumerate() {
            let (row, col) = self.cell_of(p)?;
            cells[row * self.cols + col].push(i);
        }

        for row in 0..self.rows {
            for col in 0..self.cols {
                let here = &cells[row * self.cols + col];
                if here.is_empty() {
                    continue;
                }

                for &(dr, dc) in DIRECTIONS.iter() {
                    let target = self.resolve(row as i64 + dr, col as i64 + dc);
                    let Some((o_row, o_col, offset)) = target else {
                        continue;
                    };
                    let other = &cells[o_row * self.cols + o_col];
                    let same_cell = (dr, dc) == (0, 0);

                    for (a, &i) in here.iter().enumerate() {
                        // upper triangle only when scanning the cell against itself
                        let start = if same_cell { a + 1 } else { 0 };
                        for &j in &other[start.min(other.len())..] {
                            if i == j {
                                continue;
                            }
                            if shifted_distance(&particles[i], &particles[j], offset) <= self.rc {
                                link(&mut neighbours, i, j);
                            }
                        }
                    }
                }
            }
        }
        Ok(neighbours)
    }
}

/// Largest cell count along a side of length `side` that keeps every
/// interacting pair in adjacent cells
pub fn optimal_cells(side: f64, rc: f64, max_radius: f64) -> usize {
    let min_cell = rc + 2.0 * max_radius;
    if min_cell <= 0.0 {
        return 1;
    }
    ((side / min_cell).floor() as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::states::{ParticleId, ParticleKind};

    #[test]
    fn cell_rows_are_counted_from_the_top() {
        let grid = CellIndex::new(6.0, 6.0, 2, 1.5, false);
        let low = Particle::new(ParticleId(0), ParticleKind::Ordinary, NVec2::new(1.0, 1.0), 0.5, 1.0);
        let high = Particle::new(ParticleId(1), ParticleKind::Ordinary, NVec2::new(4.0, 5.5), 0.5, 1.0);
        assert_eq!(grid.cell_of(&low).unwrap(), (1, 0));
        assert_eq!(grid.cell_of(&high).unwrap(), (0, 1));
    }

    #[test]
    fn particle_outside_grid_is_an_error() {
        let grid = CellIndex::new(6.0, 6.0, 2, 1.5, false);
        let p = Particle::new(ParticleId(7), ParticleKind::Ordinary, NVec2::new(1.0, -0.5), 0.5, 1.0);
        assert!(matches!(
            grid.find(&[p]),
            Err(SimulationError::OutsideGrid { particle: ParticleId(7), .. })
        ));
    }

    #[test]
    fn optimal_cells_respects_minimum_side() {
        assert_eq!(optimal_cells(6.0, 1.5, 0.5), 2);
        assert_eq!(optimal_cells(1.0, 1.5, 0.5), 1);
        assert_eq!(optimal_cells(10.0, 0.0, 0.0), 1);
    }
}
