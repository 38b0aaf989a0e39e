use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::grid::{Grid, neighbors8_indexed};
use crate::noise::fbm;
use crate::rng::seed_u32;

const SALT_GROW: u64 = 0x6120_7700_CAFE_0002;

/// Priority queue entry for noise-weighted Voronoi growth.
/// Implements Ord with reversed cost for min-heap behavior; ties break on
/// the lower plate index so multi-source growth stays deterministic
/// regardless of heap internals (spec: "ties broken by lowest seed index").
#[derive(PartialEq)]
struct Entry {
    cost: f32,
    x: usize,
    y: usize,
    pid: u16,
}

impl Eq for Entry {}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.pid.cmp(&self.pid))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Grow plates via noise-weighted Dijkstra expansion from seed positions.
///
/// This realizes the nearest-seed-plus-noise assignment as a warped
/// shortest-path metric rather than a per-candidate additive offset (a
/// constant added to every candidate for one fixed cell can't change which
/// candidate is nearest): the noise field perturbs the cost of *crossing*
/// a cell, so the frontier each seed reaches bends around noise contours
/// instead of following straight Voronoi edges, while the multi-source
/// Dijkstra still assigns every cell to a single nearest seed and keeps
/// each plate region contiguous.
pub fn grow_plates(w: usize, h: usize, seeds: &[[f32; 2]], seed: u64, boundary_noise: f32) -> Grid<u16> {
    let mut plate_id = Grid::<u16>::new(w, h);
    for v in &mut plate_id.data {
        *v = u16::MAX;
    }

    let noise_seed = seed_u32(seed, SALT_GROW);
    let mut heap = BinaryHeap::new();

    // Seed each plate at cost 0.
    for (i, s) in seeds.iter().enumerate() {
        let x = (s[0] as usize).min(w.saturating_sub(1));
        let y = (s[1] as usize).min(h.saturating_sub(1));
        if plate_id.get(x, y) == u16::MAX {
            plate_id.set(x, y, i as u16);
            heap.push(Entry {
                cost: 0.0,
                x,
                y,
                pid: i as u16,
            });
        }
    }

    // Multi-source Dijkstra: first (lowest-cost, then lowest-index) plate to
    // reach a cell claims it. Noise modulates step cost so boundaries
    // wiggle organically instead of forming straight Voronoi edges.
    while let Some(Entry { cost, x, y, pid }) = heap.pop() {
        // Skip stale entries (cell already claimed by a closer plate).
        if plate_id.get(x, y) != pid {
            continue;
        }

        for (_d, nx, ny) in neighbors8_indexed(x, y, w, h) {
            if plate_id.get(nx, ny) != u16::MAX {
                continue;
            }

            let step = if nx != x && ny != y { std::f32::consts::SQRT_2 } else { 1.0 };

            let u = nx as f32 / w as f32;
            let v = ny as f32 / h as f32;
            let noise = fbm(u, v, noise_seed, 4, 6.0, 2.0, 0.5);
            let cost_mult = (1.0 + noise * boundary_noise).max(0.05);

            let new_cost = cost + step * cost_mult;
            plate_id.set(nx, ny, pid);
            heap.push(Entry {
                cost: new_cost,
                x: nx,
                y: ny,
                pid,
            });
        }
    }

    plate_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::neighbors4;
    use std::collections::HashSet;

    #[test]
    fn every_cell_gets_a_plate() {
        let seeds = vec![[4.0, 4.0], [28.0, 4.0], [4.0, 28.0], [28.0, 28.0]];
        let pid = grow_plates(32, 32, &seeds, 1, 1.5);
        assert!(pid.data.iter().all(|&v| v != u16::MAX));
    }

    #[test]
    fn plates_are_4_connected_contiguous() {
        let seeds = vec![[8.0, 8.0], [56.0, 8.0], [8.0, 56.0], [56.0, 56.0]];
        let pid = grow_plates(64, 64, &seeds, 2, 1.0);

        for p in 0..seeds.len() {
            let cells: Vec<(usize, usize)> = (0..64)
                .flat_map(|y| (0..64).map(move |x| (x, y)))
                .filter(|&(x, y)| pid.get(x, y) as usize == p)
                .collect();
            if cells.is_empty() {
                continue;
            }
            let mut visited = HashSet::new();
            let mut stack = vec![cells[0]];
            visited.insert(cells[0]);
            while let Some((x, y)) = stack.pop() {
                for (nx, ny) in neighbors4(x, y, 64, 64) {
                    if pid.get(nx, ny) as usize == p && !visited.contains(&(nx, ny)) {
                        visited.insert((nx, ny));
                        stack.push((nx, ny));
                    }
                }
            }
            assert_eq!(visited.len(), cells.len(), "plate {p} is not 4-connected contiguous");
        }
    }
}
